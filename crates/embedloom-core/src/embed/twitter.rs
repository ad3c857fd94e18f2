//! Tweets, rendered through Twitter's `widgets.js`.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use smol_str::SmolStr;

use super::{EmbedContext, Embedder};
use crate::dom::Container;
use crate::error::EmbedError;
use crate::script::{ExternalLibrary, LoadStatus, Notifier, ScriptHost, ScriptSpec};
use crate::settings::{Align, Cards, Conversation, Settings, UiTheme, Width};

pub const SCRIPT_ID: &str = "twitter-wjs";
pub const SCRIPT_SRC: &str = "https://platform.twitter.com/widgets.js";
pub const SCRIPT_GLOBAL: &str = "twttr";

// http(s)://(mobile.|www.)(twitter|x).com/<user>/status/<id>(/anything?with=params)
static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:mobile\.|www\.)?(?:twitter|x)\.com/(?:#!/)?(?:\w+)/status(?:es)?/(?P<status_id>\d+)")
        .unwrap()
});

/// Extract the status ID from a tweet URL.
pub fn status_id(url: &str) -> Option<SmolStr> {
    STATUS_RE
        .captures(url.trim())
        .and_then(|caps| caps.name("status_id"))
        .map(|m| SmolStr::new(m.as_str()))
}

/// The `script` element that loads `widgets.js`.
pub fn script_spec() -> ScriptSpec {
    ScriptSpec::new(SCRIPT_ID, SCRIPT_SRC, SCRIPT_GLOBAL).async_load(true)
}

/// Options passed to `twttr.widgets.createTweet`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetOptions {
    pub conversation: Conversation,
    pub cards: Cards,
    pub width: Width,
    pub align: Align,
    /// Already resolved against the UI theme.
    pub theme: UiTheme,
    /// Unrecognized code block keys, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl TweetOptions {
    pub fn from_settings(settings: &Settings, ui: UiTheme) -> Self {
        Self {
            conversation: settings.conversation,
            cards: settings.cards,
            width: settings.width,
            align: settings.align,
            theme: settings.theme.resolve(ui),
            extra: BTreeMap::new(),
        }
    }
}

/// The page-global Twitter widget API.
pub trait TwitterWidgets {
    /// Render tweet `status` into `container`.
    fn create_tweet(
        &self,
        status: &str,
        container: &Rc<dyn Container>,
        options: &TweetOptions,
    ) -> Result<(), EmbedError>;

    /// Rescan the page for unprocessed tweet markup.
    fn load(&self) -> Result<(), EmbedError>;
}

/// Twitter/X status links.
pub struct TwitterEmbedder {
    library: Rc<ExternalLibrary>,
    host: Rc<dyn ScriptHost>,
    widgets: Rc<dyn TwitterWidgets>,
}

impl std::fmt::Debug for TwitterEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterEmbedder")
            .field("library", &self.library)
            .finish_non_exhaustive()
    }
}

impl TwitterEmbedder {
    pub fn new(
        host: Rc<dyn ScriptHost>,
        widgets: Rc<dyn TwitterWidgets>,
        notifier: Rc<dyn Notifier>,
    ) -> Self {
        let library = ExternalLibrary::new("Twitter", script_spec(), notifier);
        Self {
            library,
            host,
            widgets,
        }
    }

    pub fn library(&self) -> &Rc<ExternalLibrary> {
        &self.library
    }

    /// Start loading `widgets.js` if it isn't already.
    pub fn ensure_loaded(&self) -> LoadStatus {
        self.library.ensure_loaded(&*self.host)
    }

    /// Render a known status into `container` once the library is ready.
    pub fn embed_status(&self, container: &Rc<dyn Container>, status: SmolStr, options: TweetOptions) {
        self.ensure_loaded();
        let widgets = self.widgets.clone();
        let container = container.clone();
        self.library.on_ready(move || {
            if !container.is_attached() {
                tracing::debug!(%status, "rendering tweet into a detached container");
            }
            if let Err(err) = widgets.create_tweet(&status, &container, &options) {
                tracing::warn!(%status, error = %err, "could not create tweet");
            }
        });
    }

    /// Ask `widgets.js` to re-process the page, e.g. after a settings change.
    pub fn refresh(&self) {
        let widgets = self.widgets.clone();
        self.library.on_ready(move || {
            if let Err(err) = widgets.load() {
                tracing::warn!(error = %err, "could not refresh tweets");
            }
        });
    }
}

impl Embedder for TwitterEmbedder {
    fn name(&self) -> &'static str {
        "twitter"
    }

    fn can_add_embed(&self, url: &str) -> bool {
        status_id(url).is_some_and(|status| !status.is_empty())
    }

    fn add_embed(
        &self,
        container: &Rc<dyn Container>,
        url: &str,
        ctx: &EmbedContext<'_>,
    ) -> Result<(), EmbedError> {
        let status = status_id(url).ok_or_else(|| EmbedError::unsupported(self.name(), url))?;
        let options = TweetOptions::from_settings(ctx.settings, ctx.ui_theme);
        self.embed_status(container, status, options);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryContainer;
    use crate::settings::Theme;
    use crate::testing::{FakeScriptHost, RecordingNotifier, RecordingTwitter};

    fn embedder() -> (TwitterEmbedder, Rc<FakeScriptHost>, Rc<RecordingTwitter>) {
        let host = Rc::new(FakeScriptHost::default());
        let widgets = Rc::new(RecordingTwitter::default());
        let notifier = Rc::new(RecordingNotifier::default());
        let embedder = TwitterEmbedder::new(host.clone(), widgets.clone(), notifier);
        (embedder, host, widgets)
    }

    #[test]
    fn test_status_ids() {
        assert_eq!(
            status_id("https://twitter.com/jack/status/20").as_deref(),
            Some("20")
        );
        assert_eq!(
            status_id("https://mobile.twitter.com/user_1/statuses/1234567890?s=20").as_deref(),
            Some("1234567890")
        );
        assert_eq!(
            status_id("https://x.com/someone/status/1700000000000000000/photo/1").as_deref(),
            Some("1700000000000000000")
        );
        assert_eq!(
            status_id("https://twitter.com/#!/old/status/42").as_deref(),
            Some("42")
        );
        assert_eq!(status_id("https://twitter.com/jack"), None);
        assert_eq!(status_id("https://nottwitter.com/jack/status/20"), None);
        assert_eq!(status_id("twitter.com/jack/status/20"), None);
    }

    #[test]
    fn test_options_serialize_for_widgets() {
        let settings = Settings {
            theme: Theme::Auto,
            width: Width::Pixels(550),
            ..Default::default()
        };
        let mut options = TweetOptions::from_settings(&settings, UiTheme::Dark);
        options.extra.insert("dnt".into(), "true".into());
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            serde_json::json!({
                "conversation": "all",
                "cards": "visible",
                "width": 550,
                "align": "center",
                "theme": "dark",
                "dnt": "true"
            })
        );
    }

    #[test]
    fn test_embed_waits_for_library() {
        let (embedder, host, widgets) = embedder();
        let settings = Settings::default();
        let ctx = EmbedContext::new(UiTheme::Light, &settings);
        let container: Rc<dyn Container> = Rc::new(MemoryContainer::new("embed-container"));

        assert!(embedder.can_add_embed("https://twitter.com/jack/status/20"));
        embedder
            .add_embed(&container, "https://twitter.com/jack/status/20", &ctx)
            .unwrap();
        assert_eq!(host.injected().len(), 1);
        assert_eq!(host.injected()[0].id, SCRIPT_ID);
        assert!(widgets.tweets().is_empty());

        host.load(SCRIPT_ID);
        let tweets = widgets.tweets();
        assert_eq!(tweets.len(), 1);
        assert_eq!(tweets[0].0, "20");
        assert_eq!(tweets[0].1.theme, UiTheme::Light);

        // second embed renders immediately and does not re-inject
        embedder
            .add_embed(&container, "https://x.com/jack/status/21", &ctx)
            .unwrap();
        assert_eq!(widgets.tweets().len(), 2);
        assert_eq!(host.injected().len(), 1);
    }

    #[test]
    fn test_refresh_after_ready() {
        let (embedder, host, widgets) = embedder();
        embedder.refresh();
        assert_eq!(widgets.load_count(), 0);
        embedder.ensure_loaded();
        host.load(SCRIPT_ID);
        assert_eq!(widgets.load_count(), 1);
    }

    #[test]
    fn test_unsupported_url_is_an_error() {
        let (embedder, _, _) = embedder();
        let settings = Settings::default();
        let ctx = EmbedContext::new(UiTheme::Light, &settings);
        let container: Rc<dyn Container> = Rc::new(MemoryContainer::new(""));
        let err = embedder
            .add_embed(&container, "https://twitter.com/jack", &ctx)
            .unwrap_err();
        assert!(matches!(err, EmbedError::Unsupported { embedder: "twitter", .. }));
    }
}
