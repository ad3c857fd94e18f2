//! Inline ` ```tweet ` code blocks.
//!
//! The block body is YAML with a required `url` and optional overrides for
//! the tweet options:
//!
//! ```yaml
//! url: https://twitter.com/jack/status/20
//! theme: dark
//! cards: hidden
//! ```
//!
//! A malformed block renders as a visible error instead of a tweet.

use std::rc::Rc;

use miette::Diagnostic;
use smol_str::SmolStr;
use yaml_rust2::{Yaml, YamlLoader};

use crate::dom::{Container, EmbedNode};
use crate::embed::{EmbedContext, TweetOptions, TwitterEmbedder, twitter};
use crate::settings::{Settings, Theme, UiTheme};

pub const ERROR_HEADER: &str = "--- Twitter Embeds ERROR ---";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum TweetBlockError {
    #[error("Could not parse options from code block due to the following error:\n\n{0}")]
    #[diagnostic(code(embedloom::tweet_block::yaml))]
    Yaml(String),

    #[error("Code block is blank")]
    #[diagnostic(code(embedloom::tweet_block::blank))]
    Blank,

    #[error("Missing required key \"url\"")]
    #[diagnostic(code(embedloom::tweet_block::missing_url))]
    MissingUrl,

    #[error("Required key \"url\" cannot be blank")]
    #[diagnostic(code(embedloom::tweet_block::blank_url))]
    BlankUrl,

    #[error("Could not parse status ID from url: \"{0}\"")]
    #[diagnostic(code(embedloom::tweet_block::no_status))]
    NoStatus(String),

    #[error("Invalid value for \"{key}\": {reason}")]
    #[diagnostic(code(embedloom::tweet_block::invalid_option))]
    InvalidOption { key: String, reason: String },
}

/// A successfully parsed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetBlock {
    pub status: SmolStr,
    pub url: String,
    pub options: TweetOptions,
}

/// Scalar YAML value as text. `None` for null, collections and aliases.
fn scalar_text(value: &Yaml) -> Option<String> {
    match value {
        Yaml::String(s) | Yaml::Real(s) => Some(s.clone()),
        Yaml::Integer(i) => Some(i.to_string()),
        Yaml::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_option<T>(key: &str, value: &Yaml) -> Result<T, TweetBlockError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let text = scalar_text(value).ok_or_else(|| TweetBlockError::InvalidOption {
        key: key.to_string(),
        reason: "expected a single value".to_string(),
    })?;
    text.parse().map_err(|err: T::Err| TweetBlockError::InvalidOption {
        key: key.to_string(),
        reason: err.to_string(),
    })
}

/// Parse a block body, applying its overrides on top of `defaults`.
pub fn parse_tweet_block(
    source: &str,
    defaults: &Settings,
    ui: UiTheme,
) -> Result<TweetBlock, TweetBlockError> {
    let docs = YamlLoader::load_from_str(source).map_err(|err| TweetBlockError::Yaml(err.to_string()))?;
    let doc = match docs.into_iter().next() {
        None | Some(Yaml::Null) => return Err(TweetBlockError::Blank),
        Some(doc) => doc,
    };
    let hash = doc.as_hash().ok_or(TweetBlockError::MissingUrl)?;

    let url = hash
        .get(&Yaml::String("url".to_string()))
        .ok_or(TweetBlockError::MissingUrl)?;
    let url = scalar_text(url).unwrap_or_default();
    let url = url.trim();
    if url.is_empty() {
        return Err(TweetBlockError::BlankUrl);
    }
    let status = twitter::status_id(url).ok_or_else(|| TweetBlockError::NoStatus(url.to_string()))?;

    let mut options = TweetOptions::from_settings(defaults, ui);
    for (key, value) in hash {
        let Some(key) = scalar_text(key) else {
            continue;
        };
        match key.as_str() {
            "url" => {}
            "conversation" => options.conversation = parse_option(&key, value)?,
            "cards" => options.cards = parse_option(&key, value)?,
            "width" => options.width = parse_option(&key, value)?,
            "align" => options.align = parse_option(&key, value)?,
            "theme" => options.theme = parse_option::<Theme>(&key, value)?.resolve(ui),
            _ => match scalar_text(value) {
                Some(text) => {
                    options.extra.insert(key, text);
                }
                None if value.is_null() => {
                    tracing::debug!(%key, "ignoring empty tweet option");
                }
                None => {
                    return Err(TweetBlockError::InvalidOption {
                        key,
                        reason: "expected a single value".to_string(),
                    });
                }
            },
        }
    }

    Ok(TweetBlock {
        status,
        url: url.to_string(),
        options,
    })
}

/// The `<pre>` shown in place of a malformed block.
pub fn error_node(err: &TweetBlockError) -> EmbedNode {
    EmbedNode::new("pre").with_text(format!("{ERROR_HEADER}\n\n{err}"))
}

/// Code block processor: parse `source` and render it into `container`.
///
/// Errors are rendered, not returned. Returns the status ID on success.
pub fn render_tweet_block(
    source: &str,
    container: &Rc<dyn Container>,
    twitter: &TwitterEmbedder,
    ctx: &EmbedContext<'_>,
) -> Option<SmolStr> {
    match parse_tweet_block(source, ctx.settings, ctx.ui_theme) {
        Ok(block) => {
            tracing::debug!(status = %block.status, theme = %block.options.theme, "rendering tweet block");
            let status = block.status.clone();
            twitter.embed_status(container, block.status, block.options);
            Some(status)
        }
        Err(err) => {
            tracing::debug!(error = %err, "tweet block rejected");
            container.append(&error_node(&err));
            None
        }
    }
}
