use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;

use super::{EmbedContext, Embedder, MARGIN_TOP, iframe};
use crate::dom::{Container, EmbedNode};
use crate::error::EmbedError;

static VIDEO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:youtu\.be/|(?:www\.)?youtube\.com/watch\?v=)(?P<id>[\w-]+)(?:&t=(?P<start>\d+)s)?")
        .unwrap()
});

static PLAYLIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?youtube\.com/playlist\?list=(?P<list>[\w-]+)").unwrap()
});

/// Resolve a video or playlist link to its embed URL.
///
/// `&t=<n>s` timestamps on watch links become `?start=<n>`.
pub fn embed_url(url: &str) -> Option<String> {
    let url = url.trim();
    if let Some(caps) = VIDEO_RE.captures(url) {
        let id = caps.name("id")?.as_str();
        return Some(match caps.name("start") {
            Some(start) => format!("https://www.youtube.com/embed/{id}?start={}", start.as_str()),
            None => format!("https://www.youtube.com/embed/{id}"),
        });
    }
    let caps = PLAYLIST_RE.captures(url)?;
    let list = caps.name("list")?.as_str();
    Some(format!("https://www.youtube.com/embed/videoseries?list={list}"))
}

fn player(src: &str) -> EmbedNode {
    iframe(src)
        .with_attr("width", "560")
        .with_attr("height", "315")
        .with_attr("style", MARGIN_TOP)
        .with_attr("title", "YouTube video player")
        .with_attr(
            "allow",
            "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture",
        )
}

/// YouTube videos and playlists.
#[derive(Debug, Default, Clone, Copy)]
pub struct YoutubeEmbedder;

impl Embedder for YoutubeEmbedder {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn can_add_embed(&self, url: &str) -> bool {
        embed_url(url).is_some()
    }

    fn add_embed(
        &self,
        container: &Rc<dyn Container>,
        url: &str,
        _ctx: &EmbedContext<'_>,
    ) -> Result<(), EmbedError> {
        let src = embed_url(url).ok_or_else(|| EmbedError::unsupported(self.name(), url))?;
        tracing::debug!(%src, "embedding youtube player");
        container.append(&player(&src));
        Ok(())
    }
}
