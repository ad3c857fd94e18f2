use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;

use super::{EmbedContext, Embedder, iframe};
use crate::dom::{Container, EmbedNode};
use crate::error::EmbedError;

static APPLE_MUSIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:embed\.)?music\.apple\.com/(?P<slug>\S+/(?:album|station|playlist)/\S+)$")
        .unwrap()
});

const SANDBOX: &str = "allow-forms allow-popups allow-same-origin allow-scripts  allow-top-navigation-by-user-activation";

/// Resolve a music.apple.com link to its embed player URL.
pub fn embed_url(url: &str) -> Option<String> {
    let caps = APPLE_MUSIC_RE.captures(url.trim())?;
    let slug = caps.name("slug")?.as_str();
    Some(format!("https://embed.music.apple.com/{slug}"))
}

/// Player height: a single song (`?i=`) gets the compact player.
pub fn player_height(embed_url: &str) -> &'static str {
    if embed_url.contains("?i=") { "150" } else { "450" }
}

fn player(embed_url: &str) -> EmbedNode {
    iframe(embed_url)
        .with_attr("allow", "autoplay *; encrypted-media *; fullscreen *")
        .with_attr("height", player_height(embed_url))
        .with_attr(
            "style",
            "width:100%; max-width:660px; overflow:hidden; background:transparent; margin-top: 10px;",
        )
        .with_attr("sandbox", SANDBOX)
}

/// Albums, stations and playlists on Apple Music.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppleMusicEmbedder;

impl Embedder for AppleMusicEmbedder {
    fn name(&self) -> &'static str {
        "apple-music"
    }

    fn can_add_embed(&self, url: &str) -> bool {
        APPLE_MUSIC_RE.is_match(url.trim())
    }

    fn add_embed(
        &self,
        container: &Rc<dyn Container>,
        url: &str,
        _ctx: &EmbedContext<'_>,
    ) -> Result<(), EmbedError> {
        let src = embed_url(url).ok_or_else(|| EmbedError::unsupported(self.name(), url))?;
        tracing::debug!(%src, "embedding apple music player");
        container.append(&player(&src));
        Ok(())
    }
}
