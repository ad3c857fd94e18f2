//! Error types for embedloom

use miette::Diagnostic;
use smol_str::SmolStr;

pub use crate::classify::Rejection;
pub use crate::script::ScriptError;
pub use crate::settings::SettingsError;
pub use crate::syntax::SyntaxError;
pub use crate::tweet_block::TweetBlockError;

/// Main error type for embedloom operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum EmbedError {
    /// Third-party library failed to load
    #[error(transparent)]
    #[diagnostic_source]
    Script(#[from] ScriptError),

    /// Settings could not be loaded or saved
    #[error(transparent)]
    #[diagnostic_source]
    Settings(#[from] SettingsError),

    /// Syntax tree could not be walked
    #[error(transparent)]
    #[diagnostic_source]
    Syntax(#[from] SyntaxError),

    /// Tweet code block was malformed
    #[error(transparent)]
    #[diagnostic_source]
    TweetBlock(#[from] TweetBlockError),

    /// Link text was not an embeddable URL
    #[error(transparent)]
    #[diagnostic_source]
    Rejected(#[from] Rejection),

    /// An embedder was asked to render a URL it does not handle
    #[error("{embedder} cannot embed {url:?}")]
    #[diagnostic(code(embedloom::embed::unsupported))]
    Unsupported { embedder: &'static str, url: String },

    /// A third-party widget call failed
    #[error("{embedder} widget error: {message}")]
    #[diagnostic(code(embedloom::embed::widget))]
    Widget {
        embedder: &'static str,
        message: SmolStr,
    },
}

impl EmbedError {
    pub fn unsupported(embedder: &'static str, url: impl Into<String>) -> Self {
        EmbedError::Unsupported {
            embedder,
            url: url.into(),
        }
    }

    pub fn widget(embedder: &'static str, message: impl Into<SmolStr>) -> Self {
        EmbedError::Widget {
            embedder,
            message: message.into(),
        }
    }
}
