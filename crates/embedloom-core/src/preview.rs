//! Reading-view post-processor.
//!
//! Runs once over rendered preview HTML: every external link or image whose
//! target an embedder accepts is swapped for an embed container.

use std::rc::Rc;

use crate::classify::parse_external_url;
use crate::dom::Container;
use crate::embed::{EmbedContext, EmbedderRegistry};
use crate::error::EmbedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkElementKind {
    /// `a.external-link`
    Anchor,
    /// `img`
    Image,
}

/// A link-bearing element in rendered preview output.
pub trait PreviewElement {
    fn kind(&self) -> LinkElementKind;

    /// `href` for anchors, `src` for images.
    fn target(&self) -> Option<String>;

    /// Replace this element with a new `div` of the given class and return
    /// it as a container.
    fn replace_with_container(&self, class: &str) -> Rc<dyn Container>;
}

/// A rendered preview section.
pub trait PreviewDocument {
    type Element: PreviewElement;

    /// External-link anchors and images, in document order.
    fn link_elements(&self) -> Vec<Self::Element>;
}

/// One substituted element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewEmbed {
    pub kind: LinkElementKind,
    pub url: String,
    pub embedder: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewReport {
    pub embedded: Vec<PreviewEmbed>,
    /// Elements left alone (no target, not a URL, or no embedder).
    pub skipped: usize,
    pub errors: Vec<EmbedError>,
}

/// Class of a preview embed container.
pub fn container_class(embedder: &str) -> String {
    format!("easy-embed easy-embed-{embedder}")
}

/// Substitute embeds for every embeddable link in `doc`.
pub fn process_preview<D: PreviewDocument>(
    doc: &D,
    registry: &EmbedderRegistry,
    ctx: &EmbedContext<'_>,
) -> PreviewReport {
    let mut report = PreviewReport::default();

    for element in doc.link_elements() {
        let Some(target) = element.target() else {
            report.skipped += 1;
            continue;
        };
        let url = match parse_external_url(&target) {
            Ok(_) => target.trim(),
            Err(rejection) => {
                if rejection.is_diagnostic() {
                    report.errors.push(rejection.into());
                }
                report.skipped += 1;
                continue;
            }
        };
        let Some(embedder) = registry.find(url) else {
            report.skipped += 1;
            continue;
        };

        let container = element.replace_with_container(&container_class(embedder.name()));
        match embedder.add_embed(&container, url, ctx) {
            Ok(()) => report.embedded.push(PreviewEmbed {
                kind: element.kind(),
                url: url.to_string(),
                embedder: embedder.name(),
            }),
            Err(err) => {
                tracing::warn!(url, error = %err, "preview embed failed");
                report.errors.push(err);
            }
        }
    }

    tracing::debug!(
        embedded = report.embedded.len(),
        skipped = report.skipped,
        "preview processed"
    );
    report
}
