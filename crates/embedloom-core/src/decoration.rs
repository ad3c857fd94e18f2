//! Decoration rebuilds: visible ranges in, positioned widgets out.

use std::collections::HashSet;
use std::ops::Range;

use miette::Diagnostic;
use smol_str::SmolStr;

use crate::classify::{Rejection, classify_token};
use crate::embed::EmbedderRegistry;
use crate::syntax::{SyntaxError, SyntaxNode, SyntaxTree};
use crate::text::TextBuffer;
use crate::widget::EmbedWidget;

/// A widget anchored at a document offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    /// End of the line the originating token starts on.
    pub pos: usize,
    /// Char range of the originating token.
    pub source: Range<usize>,
    pub widget: EmbedWidget,
}

impl Decoration {
    pub fn new(pos: usize, source: Range<usize>, widget: EmbedWidget) -> Self {
        Self {
            pos,
            source,
            widget,
        }
    }
}

/// Immutable, position-sorted set of decorations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecorationSet {
    decorations: Vec<Decoration>,
}

impl DecorationSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sort by position (stable, so document order breaks ties) and drop
    /// exact duplicates: same position and same URL.
    pub fn from_decorations(mut decorations: Vec<Decoration>) -> Self {
        decorations.sort_by_key(|d| d.pos);
        let mut seen: HashSet<(usize, SmolStr)> = HashSet::with_capacity(decorations.len());
        decorations.retain(|d| seen.insert((d.pos, SmolStr::new(d.widget.url()))));
        Self { decorations }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Decoration> {
        self.decorations.iter()
    }

    pub fn len(&self) -> usize {
        self.decorations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }

    /// `(pos, url)` pairs, handy for comparing sets.
    pub fn entries(&self) -> Vec<(usize, &str)> {
        self.decorations
            .iter()
            .map(|d| (d.pos, d.widget.url()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a DecorationSet {
    type Item = &'a Decoration;
    type IntoIter = std::slice::Iter<'a, Decoration>;

    fn into_iter(self) -> Self::IntoIter {
        self.decorations.iter()
    }
}

/// Something that went wrong during a rebuild without stopping it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum RebuildError {
    /// The whole range could not be walked.
    #[error("could not walk range: {0}")]
    #[diagnostic(code(embedloom::rebuild::range))]
    Range(#[source] SyntaxError),

    /// One node could not be read; the walk continued.
    #[error("skipped a syntax node: {0}")]
    #[diagnostic(code(embedloom::rebuild::node))]
    Node(#[source] SyntaxError),

    /// A url token that failed classification unexpectedly.
    #[error("token at {span:?} rejected: {rejection}")]
    #[diagnostic(code(embedloom::rebuild::classify))]
    Classify {
        span: Range<usize>,
        #[source]
        rejection: Rejection,
    },

    /// The token's line could not be located.
    #[error("no line end for offset {offset}")]
    #[diagnostic(code(embedloom::rebuild::line_end))]
    LineEnd { offset: usize },
}

impl RebuildError {
    /// Whether this may have cost a decoration. Classification diagnostics
    /// are about malformed text, not about the walk.
    pub fn is_loss(&self) -> bool {
        !matches!(self, RebuildError::Classify { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    Complete,
    Partial,
}

/// What happened in one visible range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeReport {
    pub range: Range<usize>,
    pub matched: usize,
    pub diagnostics: Vec<RebuildError>,
}

impl RangeReport {
    fn new(range: Range<usize>) -> Self {
        Self {
            range,
            matched: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn outcome(&self) -> RangeOutcome {
        if self.diagnostics.iter().any(RebuildError::is_loss) {
            RangeOutcome::Partial
        } else {
            RangeOutcome::Complete
        }
    }
}

/// Result of [`build_decorations`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rebuild {
    pub decorations: DecorationSet,
    pub ranges: Vec<RangeReport>,
}

impl Rebuild {
    pub fn is_complete(&self) -> bool {
        self.ranges
            .iter()
            .all(|r| r.outcome() == RangeOutcome::Complete)
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &RebuildError> {
        self.ranges.iter().flat_map(|r| r.diagnostics.iter())
    }
}

/// Scan the visible ranges for embeddable links.
///
/// Every node overlapping a visible range is classified; the first embedder
/// in `registry` that accepts its URL gets a decoration at the end of the
/// node's line. Errors are collected per range and never abort the rebuild.
pub fn build_decorations<T, B>(
    tree: &T,
    text: &B,
    visible: &[Range<usize>],
    registry: &EmbedderRegistry,
) -> Rebuild
where
    T: SyntaxTree,
    B: TextBuffer + ?Sized,
{
    let mut decorations = Vec::new();
    let mut ranges = Vec::with_capacity(visible.len());

    for range in visible {
        let mut report = RangeReport::new(range.clone());
        scan_range(tree, text, registry, &mut report, &mut decorations);
        if report.outcome() == RangeOutcome::Partial {
            tracing::warn!(
                range = ?report.range,
                diagnostics = report.diagnostics.len(),
                "partial decoration rebuild"
            );
        }
        ranges.push(report);
    }

    let decorations = DecorationSet::from_decorations(decorations);
    tracing::debug!(
        ranges = ranges.len(),
        decorations = decorations.len(),
        "decorations rebuilt"
    );
    Rebuild {
        decorations,
        ranges,
    }
}

fn scan_range<T, B>(
    tree: &T,
    text: &B,
    registry: &EmbedderRegistry,
    report: &mut RangeReport,
    out: &mut Vec<Decoration>,
) where
    T: SyntaxTree,
    B: TextBuffer + ?Sized,
{
    let nodes = match tree.walk(report.range.clone()) {
        Ok(nodes) => nodes,
        Err(err) => {
            report.diagnostics.push(RebuildError::Range(err));
            return;
        }
    };

    for node in nodes {
        let node = match node {
            Ok(node) => node,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable node");
                report.diagnostics.push(RebuildError::Node(err));
                continue;
            }
        };
        let span = node.range();

        let found = match classify_token(&node, text) {
            Ok(found) => found,
            Err(rejection) => {
                if rejection.is_diagnostic() {
                    report.diagnostics.push(RebuildError::Classify { span, rejection });
                }
                continue;
            }
        };

        let Some(embedder) = registry.find(&found.text) else {
            tracing::trace!(url = %found.text, "no embedder for url");
            continue;
        };

        let Some(pos) = text.line_end(span.start) else {
            report
                .diagnostics
                .push(RebuildError::LineEnd { offset: span.start });
            continue;
        };

        tracing::trace!(url = %found.text, embedder = embedder.name(), pos, "matched");
        report.matched += 1;
        out.push(Decoration::new(
            pos,
            span,
            EmbedWidget::new(found.text, embedder.clone()),
        ));
    }
}
