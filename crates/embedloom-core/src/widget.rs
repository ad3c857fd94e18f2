//! Embed widgets and their mounted containers.

use std::fmt;
use std::rc::Rc;

use smol_str::SmolStr;

use crate::decoration::DecorationSet;
use crate::dom::Container;
use crate::embed::{EmbedContext, Embedder};
use crate::error::EmbedError;

/// CSS class of every live-view widget container.
pub const CONTAINER_CLASS: &str = "embed-container";

/// A URL paired with the embedder that claimed it.
///
/// Two widgets are equal when their URLs are, regardless of embedder, so a
/// rebuild that produces the same URL keeps the existing DOM.
#[derive(Clone)]
pub struct EmbedWidget {
    url: SmolStr,
    embedder: Rc<dyn Embedder>,
}

impl EmbedWidget {
    /// Height hint for layout before the embed has loaded.
    pub const ESTIMATED_HEIGHT: u32 = 400;

    pub fn new(url: impl Into<SmolStr>, embedder: Rc<dyn Embedder>) -> Self {
        Self {
            url: url.into(),
            embedder,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn embedder(&self) -> &Rc<dyn Embedder> {
        &self.embedder
    }

    pub fn estimated_height(&self) -> u32 {
        Self::ESTIMATED_HEIGHT
    }

    /// Create a container and have the embedder render into it.
    ///
    /// On failure the container is detached and the error returned.
    pub fn to_dom(
        &self,
        host: &dyn WidgetHost,
        ctx: &EmbedContext<'_>,
    ) -> Result<Rc<dyn Container>, EmbedError> {
        let container = host.create_container(CONTAINER_CLASS);
        match self.embedder.add_embed(&container, &self.url, ctx) {
            Ok(()) => Ok(container),
            Err(err) => {
                container.detach();
                Err(err)
            }
        }
    }
}

impl PartialEq for EmbedWidget {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for EmbedWidget {}

impl fmt::Debug for EmbedWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbedWidget")
            .field("url", &self.url)
            .field("embedder", &self.embedder.name())
            .finish()
    }
}

/// Where widget containers come from and where they go.
pub trait WidgetHost {
    /// A new, empty container with the given class.
    fn create_container(&self, class: &str) -> Rc<dyn Container>;

    /// Put `container` at document offset `pos` (after the end of its line).
    /// Called again with a new position when a reused widget moves.
    fn place(&self, container: &Rc<dyn Container>, pos: usize);
}

/// Counts from one [`WidgetMounts::reconcile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub reused: usize,
    pub removed: usize,
    pub failed: usize,
}

struct Mount {
    url: SmolStr,
    pos: usize,
    container: Rc<dyn Container>,
}

/// Containers currently on screen, keyed by widget URL.
#[derive(Default)]
pub struct WidgetMounts {
    mounts: Vec<Mount>,
}

impl fmt::Debug for WidgetMounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.mounts.iter().map(|m| (m.pos, &m.url)))
            .finish()
    }
}

impl WidgetMounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// `(pos, url)` of each mounted widget, in document order.
    pub fn mounted(&self) -> Vec<(usize, SmolStr)> {
        self.mounts.iter().map(|m| (m.pos, m.url.clone())).collect()
    }

    /// Make the mounted widgets match `set`.
    ///
    /// A decoration whose URL is already mounted reuses that container
    /// (moving it if its position changed) without rendering again. New URLs
    /// are rendered and placed. Mounts no longer referenced are detached.
    pub fn reconcile(
        &mut self,
        set: &DecorationSet,
        host: &dyn WidgetHost,
        ctx: &EmbedContext<'_>,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut previous = std::mem::take(&mut self.mounts);
        let mut next = Vec::with_capacity(set.len());

        for decoration in set.iter() {
            let url = decoration.widget.url();
            // prefer an exact (pos, url) match so repeated links keep their own containers
            let reuse = previous
                .iter()
                .position(|m| m.url == url && m.pos == decoration.pos)
                .or_else(|| previous.iter().position(|m| m.url == url));

            if let Some(index) = reuse {
                let mut mount = previous.remove(index);
                if mount.pos != decoration.pos {
                    host.place(&mount.container, decoration.pos);
                    mount.pos = decoration.pos;
                }
                report.reused += 1;
                next.push(mount);
                continue;
            }

            match decoration.widget.to_dom(host, ctx) {
                Ok(container) => {
                    host.place(&container, decoration.pos);
                    report.created += 1;
                    next.push(Mount {
                        url: decoration.widget.url().into(),
                        pos: decoration.pos,
                        container,
                    });
                }
                Err(err) => {
                    tracing::warn!(url, error = %err, "could not materialize widget");
                    report.failed += 1;
                }
            }
        }

        for stale in previous {
            stale.container.detach();
            report.removed += 1;
        }

        self.mounts = next;
        tracing::debug!(?report, "widgets reconciled");
        report
    }

    /// Detach everything.
    pub fn clear(&mut self) -> usize {
        let count = self.mounts.len();
        for mount in self.mounts.drain(..) {
            mount.container.detach();
        }
        count
    }
}
