//! embedloom-core: link recognition and embed decorations without DOM
//! dependencies.
//!
//! This crate provides:
//! - `SyntaxTree`/`SyntaxNode` traits over a host's highlighter tokens, and
//!   `TokenTree` as a flat implementation
//! - URL classification (`classify_token`) and the `Embedder` strategies for
//!   Twitter/X, Dropbox, Spotify, Apple Music and YouTube
//! - `build_decorations` and `EmbedView` for the incremental live-view
//! - `ExternalLibrary` for one-time third-party script loading
//! - `Settings` with per-field validation and pluggable persistence
//!
//! Everything that touches a page goes through the `Container`, `ScriptHost`
//! and `WidgetHost` traits, implemented for the browser in
//! `embedloom-browser`.

pub mod classify;
pub mod decoration;
pub mod dom;
pub mod embed;
pub mod error;
pub mod preview;
pub mod script;
pub mod settings;
pub mod syntax;
pub mod text;
pub mod tweet_block;
pub mod view;
pub mod widget;

#[cfg(test)]
mod testing;

pub use classify::{EmbeddableUrl, Rejection, classify_token, parse_external_url};
pub use decoration::{
    Decoration, DecorationSet, RangeOutcome, RangeReport, Rebuild, RebuildError,
    build_decorations,
};
pub use dom::{Container, EmbedNode, MemoryContainer};
pub use embed::{
    AppleMusicEmbedder, DropboxDropins, DropboxEmbedder, EmbedContext, Embedder,
    EmbedderRegistry, SpotifyEmbedder, TweetOptions, TwitterEmbedder, TwitterWidgets,
    YoutubeEmbedder,
};
pub use error::EmbedError;
pub use preview::{LinkElementKind, PreviewDocument, PreviewElement, PreviewReport, process_preview};
pub use script::{
    ExternalLibrary, LoadCallbacks, LoadStatus, LogNotifier, Notifier, ScriptError, ScriptHost,
    ScriptSpec,
};
pub use settings::{MemoryStore, Settings, SettingsError, SettingsManager, SettingsStore, Theme, UiTheme, Width};
pub use smol_str::SmolStr;
pub use syntax::{SyntaxError, SyntaxNode, SyntaxTree, TokenClasses, TokenSpan, TokenTree};
pub use text::{EditorRope, TextBuffer};
pub use tweet_block::{TweetBlock, TweetBlockError, parse_tweet_block, render_tweet_block};
pub use view::{BufferView, EditorView, EmbedView, ViewUpdate};
pub use widget::{CONTAINER_CLASS, EmbedWidget, ReconcileReport, WidgetHost, WidgetMounts};
