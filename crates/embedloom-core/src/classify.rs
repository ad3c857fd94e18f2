//! Token classification: deciding whether a syntax node is an embeddable URL.

use miette::Diagnostic;
use smol_str::SmolStr;
use url::Url;

use crate::syntax::{SyntaxNode, TokenClasses, class};
use crate::text::TextBuffer;

/// Why a token was not considered embeddable.
///
/// Most variants are routine (the vast majority of tokens are not URLs);
/// only [`Rejection::InvalidUrl`] and [`Rejection::Unreadable`] are worth
/// surfacing as diagnostics.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum Rejection {
    #[error("token is not classified as a url")]
    #[diagnostic(code(embedloom::classify::not_url))]
    NotUrl,

    #[error("token is link formatting")]
    #[diagnostic(code(embedloom::classify::formatting))]
    Formatting,

    #[error("token text {0:?} has no scheme separator")]
    #[diagnostic(code(embedloom::classify::no_scheme))]
    NoScheme(SmolStr),

    #[error("token text {text:?} is not a valid url: {reason}")]
    #[diagnostic(
        code(embedloom::classify::invalid_url),
        help("the tokenizer marked this as a url but it does not parse")
    )]
    InvalidUrl {
        text: SmolStr,
        #[source]
        reason: url::ParseError,
    },

    #[error("token is the source of a markdown image")]
    #[diagnostic(code(embedloom::classify::image_source))]
    ImageSource,

    #[error("token span {start}..{end} is outside the text buffer")]
    #[diagnostic(code(embedloom::classify::unreadable))]
    Unreadable { start: usize, end: usize },
}

impl Rejection {
    /// Whether this rejection indicates something unexpected rather than a
    /// token that simply isn't a link.
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Rejection::InvalidUrl { .. } | Rejection::Unreadable { .. })
    }
}

/// A token that passed classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddableUrl {
    /// Trimmed token text, exactly as written in the document.
    pub text: SmolStr,
    pub url: Url,
}

/// Whether a class list marks a url token that is not link punctuation.
pub fn is_url_token(classes: TokenClasses<'_>) -> Result<(), Rejection> {
    if !classes.has(class::URL) {
        return Err(Rejection::NotUrl);
    }
    if classes.has(class::FORMATTING) {
        return Err(Rejection::Formatting);
    }
    Ok(())
}

/// Check the text of a candidate link: it must contain `://` and parse as
/// an absolute URL.
pub fn parse_external_url(text: &str) -> Result<Url, Rejection> {
    let text = text.trim();
    if !text.contains("://") {
        return Err(Rejection::NoScheme(SmolStr::new(text)));
    }
    Url::parse(text).map_err(|reason| {
        tracing::debug!(text, %reason, "url token failed to parse");
        Rejection::InvalidUrl {
            text: SmolStr::new(text),
            reason,
        }
    })
}

/// Whether the node's sibling two steps to the left is classified `image`.
///
/// For `![alt](url)` the host tokenizer emits `image` tokens for the alt
/// part, then the `(` formatting token, then the url. An absent sibling
/// never suppresses.
pub fn is_image_source<N: SyntaxNode>(node: &N) -> bool {
    node.prev_sibling()
        .and_then(|prev| prev.prev_sibling())
        .is_some_and(|prev_prev| {
            prev_prev
                .token_classes()
                .is_some_and(|classes| classes.has(class::IMAGE))
        })
}

/// Classify one syntax node against the document text.
pub fn classify_token<N, T>(node: &N, text: &T) -> Result<EmbeddableUrl, Rejection>
where
    N: SyntaxNode,
    T: TextBuffer + ?Sized,
{
    let classes = node.token_classes().ok_or(Rejection::NotUrl)?;
    is_url_token(classes)?;

    let range = node.range();
    let raw = text
        .slice(range.clone())
        .ok_or(Rejection::Unreadable {
            start: range.start,
            end: range.end,
        })?;
    let trimmed = raw.trim();

    let url = parse_external_url(trimmed)?;

    if is_image_source(node) {
        tracing::trace!(text = trimmed, "skipping markdown image source");
        return Err(Rejection::ImageSource);
    }

    Ok(EmbeddableUrl {
        text: SmolStr::new(trimmed),
        url,
    })
}
