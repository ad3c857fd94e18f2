//! Dropbox shared links.
//!
//! Direct image links are shown as a plain `<img>` (much faster than the
//! Dropbox iframe). Everything else goes through the Dropbox "embedder"
//! drop-in, which needs `dropins.js` loaded with the user's app key.

use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::{EmbedContext, Embedder, MARGIN_TOP};
use crate::dom::{Container, EmbedNode};
use crate::error::EmbedError;
use crate::script::{ExternalLibrary, LoadStatus, Notifier, ScriptHost, ScriptSpec};

pub const SCRIPT_ID: &str = "dropboxjs";
pub const SCRIPT_SRC: &str = "https://www.dropbox.com/static/api/2/dropins.js";
pub const SCRIPT_GLOBAL: &str = "Dropbox";

const CONTAINER_STYLE: &str = "height: 450px; margin-top: 10px;";

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:www\.)?dropbox\.com/(?P<slug>s/\w+/\S+\.(?:png|jpeg|gif|jpg))(?:\?dl=0)?$")
        .unwrap()
});

/// The `script` element that loads `dropins.js` for `app_key`.
pub fn script_spec(app_key: &str) -> ScriptSpec {
    ScriptSpec::new(SCRIPT_ID, SCRIPT_SRC, SCRIPT_GLOBAL)
        .with_attr("type", "text/javascript")
        .with_attr("data-app-key", app_key)
}

/// Raw image URL for a direct image share link.
pub fn image_url(url: &str) -> Option<String> {
    let caps = IMAGE_RE.captures(url.trim())?;
    let slug = caps.name("slug")?.as_str();
    Some(format!("https://www.dropbox.com/{slug}?raw=1"))
}

/// Whether `url` parses and points at dropbox.com or one of its subdomains.
pub fn is_dropbox_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    parsed
        .host_str()
        .is_some_and(|host| host == "dropbox.com" || host.ends_with(".dropbox.com"))
}

/// The page-global `Dropbox` drop-ins API.
pub trait DropboxDropins {
    /// `Dropbox.embed({ link }, container)`
    fn embed(&self, link: &str, container: &Rc<dyn Container>) -> Result<(), EmbedError>;
}

pub struct DropboxEmbedder {
    library: Rc<ExternalLibrary>,
    host: Rc<dyn ScriptHost>,
    dropins: Rc<dyn DropboxDropins>,
}

impl std::fmt::Debug for DropboxEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropboxEmbedder")
            .field("library", &self.library)
            .finish_non_exhaustive()
    }
}

impl DropboxEmbedder {
    pub fn new(
        app_key: &str,
        host: Rc<dyn ScriptHost>,
        dropins: Rc<dyn DropboxDropins>,
        notifier: Rc<dyn Notifier>,
    ) -> Self {
        let library = ExternalLibrary::new("Dropbox", script_spec(app_key), notifier);
        Self {
            library,
            host,
            dropins,
        }
    }

    pub fn library(&self) -> &Rc<ExternalLibrary> {
        &self.library
    }

    pub fn ensure_loaded(&self) -> LoadStatus {
        self.library.ensure_loaded(&*self.host)
    }

    /// Reload `dropins.js` with a new app key. Embeds still waiting for the
    /// old script are carried over.
    pub fn set_app_key(&self, app_key: &str) -> LoadStatus {
        if self.library.spec().attr("data-app-key") == Some(app_key) {
            return self.library.status();
        }
        tracing::info!("dropbox app key changed");
        self.library.replace_script(&*self.host, script_spec(app_key))
    }
}

impl Embedder for DropboxEmbedder {
    fn name(&self) -> &'static str {
        "dropbox"
    }

    fn can_add_embed(&self, url: &str) -> bool {
        is_dropbox_url(url)
    }

    fn add_embed(
        &self,
        container: &Rc<dyn Container>,
        url: &str,
        _ctx: &EmbedContext<'_>,
    ) -> Result<(), EmbedError> {
        if let Some(src) = image_url(url) {
            tracing::debug!(%src, "embedding dropbox image");
            container.append(
                &EmbedNode::new("img")
                    .with_attr("style", MARGIN_TOP)
                    .with_attr("alt", "Dropbox embedded image")
                    .with_attr("src", src),
            );
            return Ok(());
        }

        container.set_style(CONTAINER_STYLE);
        self.ensure_loaded();
        let dropins = self.dropins.clone();
        let container = container.clone();
        let link = url.trim().to_string();
        self.library.on_ready(move || {
            if let Err(err) = dropins.embed(&link, &container) {
                tracing::warn!(%link, error = %err, "dropbox embed failed");
            }
        });
        Ok(())
    }
}
