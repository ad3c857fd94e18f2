use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;

use super::{EmbedContext, Embedder, iframe};
use crate::dom::{Container, EmbedNode};
use crate::error::EmbedError;

static SPOTIFY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(?:open\.)?spotify\.com/(?P<kind>album|artist|track|episode|user|playlist)/(?P<rest>\S+)$",
    )
    .unwrap()
});

/// A resolved Spotify player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyEmbed {
    pub src: String,
    pub height: &'static str,
}

impl SpotifyEmbed {
    pub fn parse(url: &str) -> Option<Self> {
        let caps = SPOTIFY_RE.captures(url.trim())?;
        let kind = caps.name("kind")?.as_str();
        let rest = caps.name("rest")?.as_str();
        // single tracks get the compact player
        let height = if kind == "track" { "400" } else { "650" };
        Some(Self {
            src: format!("https://open.spotify.com/embed/{kind}/{rest}"),
            height,
        })
    }

    pub fn to_node(&self) -> EmbedNode {
        iframe(&self.src)
            .with_attr("style", "width:100%; max-width: 660px; margin-top: 10px;")
            .with_attr("height", self.height)
            .with_attr("allowtransparency", "true")
            .with_attr("allow", "encrypted-media")
    }
}

/// Albums, artists, tracks, episodes, users and playlists on
/// `open.spotify.com`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpotifyEmbedder;

impl Embedder for SpotifyEmbedder {
    fn name(&self) -> &'static str {
        "spotify"
    }

    fn can_add_embed(&self, url: &str) -> bool {
        SPOTIFY_RE.is_match(url.trim())
    }

    fn add_embed(
        &self,
        container: &Rc<dyn Container>,
        url: &str,
        _ctx: &EmbedContext<'_>,
    ) -> Result<(), EmbedError> {
        let embed = SpotifyEmbed::parse(url).ok_or_else(|| EmbedError::unsupported(self.name(), url))?;
        tracing::debug!(src = %embed.src, "embedding spotify player");
        container.append(&embed.to_node());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryContainer;
    use crate::settings::{Settings, UiTheme};

    #[test]
    fn test_recognizes_kinds() {
        let embedder = SpotifyEmbedder;
        assert!(embedder.can_add_embed("https://open.spotify.com/album/1DFixLWuPkv3KT3TnV35m3"));
        assert!(embedder.can_add_embed(" https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC "));
        assert!(embedder.can_add_embed("http://spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M"));
        assert!(!embedder.can_add_embed("https://open.spotify.com/genre/pop"));
        assert!(!embedder.can_add_embed("https://open.spotify.com/album/"));
        assert!(!embedder.can_add_embed("not a url"));
    }

    #[test]
    fn test_embed_url_and_height() {
        let track = SpotifyEmbed::parse("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC").unwrap();
        assert_eq!(track.src, "https://open.spotify.com/embed/track/4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(track.height, "400");

        let album = SpotifyEmbed::parse("https://open.spotify.com/album/1DFixLWuPkv3KT3TnV35m3?si=abc").unwrap();
        assert_eq!(album.src, "https://open.spotify.com/embed/album/1DFixLWuPkv3KT3TnV35m3?si=abc");
        assert_eq!(album.height, "650");
    }

    #[test]
    fn test_renders_iframe() {
        let settings = Settings::default();
        let ctx = EmbedContext::new(UiTheme::Light, &settings);
        let memory = Rc::new(MemoryContainer::new("embed-container"));
        let container: Rc<dyn Container> = memory.clone();
        SpotifyEmbedder
            .add_embed(&container, "https://open.spotify.com/track/abc", &ctx)
            .unwrap();
        insta::assert_snapshot!(
            memory.to_html(),
            @r#"<div class="embed-container"><iframe src="https://open.spotify.com/embed/track/abc" frameborder="0" style="width:100%; max-width: 660px; margin-top: 10px;" height="400" allowtransparency="true" allow="encrypted-media"></iframe></div>"#
        );
    }
}
