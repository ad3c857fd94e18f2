//! Embedders: strategies that turn a recognized URL into embed content.
//!
//! Each embedder owns the patterns for the URLs it understands. The
//! [`EmbedderRegistry`] consults them in order and the first one that
//! accepts a URL renders it.

use std::rc::Rc;

use crate::dom::{Container, EmbedNode};
use crate::error::EmbedError;
use crate::settings::{Settings, UiTheme};

pub mod apple_music;
pub mod dropbox;
pub mod registry;
pub mod spotify;
pub mod twitter;
pub mod youtube;

pub use apple_music::AppleMusicEmbedder;
pub use dropbox::{DropboxDropins, DropboxEmbedder};
pub use registry::EmbedderRegistry;
pub use spotify::SpotifyEmbedder;
pub use twitter::{TweetOptions, TwitterEmbedder, TwitterWidgets};
pub use youtube::YoutubeEmbedder;

/// Render-time context passed to embedders.
#[derive(Debug, Clone, Copy)]
pub struct EmbedContext<'a> {
    pub ui_theme: UiTheme,
    pub settings: &'a Settings,
}

impl<'a> EmbedContext<'a> {
    pub fn new(ui_theme: UiTheme, settings: &'a Settings) -> Self {
        Self { ui_theme, settings }
    }
}

/// A URL-to-content strategy.
pub trait Embedder {
    /// Short stable name, used in CSS classes (`easy-embed-<name>`) and logs.
    fn name(&self) -> &'static str;

    /// Whether this embedder handles `url`. Pure and total: malformed input
    /// is simply `false`.
    fn can_add_embed(&self, url: &str) -> bool;

    /// Render `url` into `container`.
    ///
    /// May defer the actual rendering until a third-party library is
    /// ready. Only called with URLs for which `can_add_embed` returned true.
    fn add_embed(
        &self,
        container: &Rc<dyn Container>,
        url: &str,
        ctx: &EmbedContext<'_>,
    ) -> Result<(), EmbedError>;
}

/// Spacing every embed gets above it.
pub(crate) const MARGIN_TOP: &str = "margin-top: 10px;";

/// An `<iframe>` pointing at `src` with `frameborder="0"`.
pub(crate) fn iframe(src: &str) -> EmbedNode {
    EmbedNode::new("iframe")
        .with_attr("src", src)
        .with_attr("frameborder", "0")
}
