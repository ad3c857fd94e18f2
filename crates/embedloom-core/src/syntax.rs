//! Read-only contract for the host's syntax tree.
//!
//! The engine never parses markdown itself. Hosts hand it a tree of
//! classified token spans (the class string is the space-separated token
//! class list a stream tokenizer attaches to each token, e.g.
//! `"string url"` or `"formatting formatting-image image image-marker"`).
//!
//! [`TokenTree`] is the flat sibling-list implementation used when the host
//! serializes its tokens across a boundary (JS bindings, tests).

use std::ops::Range;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Well-known token classes.
pub mod class {
    /// Token is (part of) a URL.
    pub const URL: &str = "url";
    /// Token is link punctuation (`[`, `](`, `)`, `<`, `>`).
    pub const FORMATTING: &str = "formatting";
    /// Token belongs to markdown image syntax.
    pub const IMAGE: &str = "image";
}

/// Errors surfaced while walking the host's syntax tree.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SyntaxError {
    #[error("range {start}..{end} is outside the document (length {len})")]
    #[diagnostic(code(embedloom::syntax::out_of_bounds))]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("token span {start}..{end} is inverted")]
    #[diagnostic(code(embedloom::syntax::inverted_span))]
    InvertedSpan { start: usize, end: usize },

    #[error("syntax tree unavailable: {0}")]
    #[diagnostic(
        code(embedloom::syntax::unavailable),
        help("the host has not produced a tree for this range yet")
    )]
    Unavailable(String),
}

/// Space-separated token class list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClasses<'a>(&'a str);

impl<'a> TokenClasses<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self(raw)
    }

    /// Check whether `class` is one of the listed classes.
    pub fn has(&self, class: &str) -> bool {
        self.0.split_ascii_whitespace().any(|c| c == class)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.0.split_ascii_whitespace()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn as_str(&self) -> &'a str {
        self.0
    }
}

/// A node of the host's syntax tree.
///
/// `prev_sibling` is used for markdown image detection: the URL of
/// `![alt](url)` sits two siblings after a token classified `image`. This is
/// a heuristic tied to how the host tokenizer splits image syntax, not a
/// structural guarantee of the tree.
pub trait SyntaxNode: Sized {
    /// Raw class string. `None` for unclassified nodes (most of them).
    fn classes(&self) -> Option<&str>;

    /// Source char range.
    fn range(&self) -> Range<usize>;

    /// The sibling immediately to the left, if any.
    fn prev_sibling(&self) -> Option<Self>;

    fn token_classes(&self) -> Option<TokenClasses<'_>> {
        self.classes().map(TokenClasses::new)
    }
}

/// Iterator over nodes yielded by [`SyntaxTree::walk`].
pub type NodeIter<'a, N> = Box<dyn Iterator<Item = Result<N, SyntaxError>> + 'a>;

/// A syntax tree that can be walked depth-first over a char range.
pub trait SyntaxTree {
    type Node<'a>: SyntaxNode
    where
        Self: 'a;

    /// Walk every node overlapping `range`, depth-first, in document order.
    ///
    /// Nodes that only touch `range` at its ends are excluded. An empty
    /// `range` is a point query and yields the nodes containing that offset.
    ///
    /// An `Err` item means one node could not be produced; walking may
    /// continue. An `Err` return means the whole range is unavailable.
    fn walk<'a>(&'a self, range: Range<usize>) -> Result<NodeIter<'a, Self::Node<'a>>, SyntaxError>;
}

/// A single classified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpan {
    pub range: Range<usize>,
    #[serde(default)]
    pub classes: SmolStr,
}

impl TokenSpan {
    pub fn new(range: Range<usize>, classes: impl Into<SmolStr>) -> Self {
        Self {
            range,
            classes: classes.into(),
        }
    }

    /// A token with no classes.
    pub fn plain(range: Range<usize>) -> Self {
        Self {
            range,
            classes: SmolStr::default(),
        }
    }
}

/// Flat tree of sibling tokens in document order.
///
/// This is the shape a line-oriented stream tokenizer produces: every token
/// is a direct child of the document, so a token's previous sibling is
/// simply the token before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenTree {
    spans: Vec<TokenSpan>,
}

impl TokenTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from spans, sorting them by start offset.
    pub fn from_spans(spans: impl IntoIterator<Item = TokenSpan>) -> Self {
        let mut spans: Vec<TokenSpan> = spans.into_iter().collect();
        spans.sort_by_key(|s| s.range.start);
        Self { spans }
    }

    /// Append a span. Spans must be pushed in document order.
    pub fn push(&mut self, span: TokenSpan) {
        debug_assert!(
            self.spans
                .last()
                .is_none_or(|last| last.range.start <= span.range.start),
            "spans must be pushed in document order"
        );
        self.spans.push(span);
    }

    pub fn spans(&self) -> &[TokenSpan] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn clear(&mut self) {
        self.spans.clear();
    }
}

/// A borrowed node of a [`TokenTree`].
#[derive(Debug, Clone, Copy)]
pub struct TokenRef<'a> {
    tree: &'a TokenTree,
    index: usize,
}

impl<'a> TokenRef<'a> {
    pub fn span(&self) -> &'a TokenSpan {
        &self.tree.spans[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl SyntaxNode for TokenRef<'_> {
    fn classes(&self) -> Option<&str> {
        let classes = self.span().classes.as_str();
        if classes.trim().is_empty() {
            None
        } else {
            Some(classes)
        }
    }

    fn range(&self) -> Range<usize> {
        self.span().range.clone()
    }

    fn prev_sibling(&self) -> Option<Self> {
        let index = self.index.checked_sub(1)?;
        Some(TokenRef {
            tree: self.tree,
            index,
        })
    }
}

fn overlaps(span: &Range<usize>, range: &Range<usize>) -> bool {
    if range.is_empty() {
        span.start <= range.start && range.start <= span.end
    } else {
        span.start < range.end && span.end > range.start
    }
}

impl SyntaxTree for TokenTree {
    type Node<'a> = TokenRef<'a>;

    fn walk<'a>(&'a self, range: Range<usize>) -> Result<NodeIter<'a, TokenRef<'a>>, SyntaxError> {
        if range.start > range.end {
            return Err(SyntaxError::InvertedSpan {
                start: range.start,
                end: range.end,
            });
        }

        let iter = self
            .spans
            .iter()
            .enumerate()
            .skip_while(move |(_, span)| span.range.end < range.start)
            .take_while(move |(_, span)| span.range.start <= range.end)
            .filter(move |(_, span)| {
                span.range.start > span.range.end || overlaps(&span.range, &range)
            })
            .map(move |(index, span)| {
                if span.range.start > span.range.end {
                    Err(SyntaxError::InvertedSpan {
                        start: span.range.start,
                        end: span.range.end,
                    })
                } else {
                    Ok(TokenRef { tree: self, index })
                }
            });

        Ok(Box::new(iter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> TokenTree {
        TokenTree::from_spans([
            TokenSpan::plain(0..4),
            TokenSpan::new(4..5, "formatting formatting-link link"),
            TokenSpan::new(5..30, "string url"),
            TokenSpan::new(30..31, "formatting formatting-link-string string url"),
            TokenSpan::plain(40..50),
        ])
    }

    #[test]
    fn test_token_classes() {
        let classes = TokenClasses::new("formatting  formatting-image image");
        assert!(classes.has("image"));
        assert!(classes.has("formatting"));
        assert!(!classes.has("format"));
        assert!(!classes.has("url"));
        assert_eq!(classes.iter().count(), 3);
        assert!(TokenClasses::new("   ").is_empty());
    }

    #[test]
    fn test_unclassified_nodes_have_no_classes() {
        let tree = tree();
        let nodes: Vec<_> = tree.walk(0..4).unwrap().map(Result::unwrap).collect();
        assert_eq!(nodes[0].classes(), None);
        assert!(nodes[0].token_classes().is_none());
    }

    #[test]
    fn test_walk_only_overlapping() {
        let tree = tree();
        let indices: Vec<usize> = tree
            .walk(6..20)
            .unwrap()
            .map(|n| n.unwrap().index())
            .collect();
        assert_eq!(indices, vec![2]);

        let indices: Vec<usize> = tree
            .walk(32..39)
            .unwrap()
            .map(|n| n.unwrap().index())
            .collect();
        assert!(indices.is_empty());
    }

    #[test]
    fn test_touching_tokens_are_not_visible() {
        let tree = tree();
        let indices: Vec<usize> = tree
            .walk(0..4)
            .unwrap()
            .map(|n| n.unwrap().index())
            .collect();
        assert_eq!(indices, vec![0]);

        let indices: Vec<usize> = tree
            .walk(30..40)
            .unwrap()
            .map(|n| n.unwrap().index())
            .collect();
        assert_eq!(indices, vec![3]);

        let indices: Vec<usize> = tree
            .walk(5..5)
            .unwrap()
            .map(|n| n.unwrap().index())
            .collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn test_prev_sibling_chain() {
        let tree = tree();
        let url = tree.walk(10..10).unwrap().next().unwrap().unwrap();
        assert_eq!(url.range(), 5..30);
        let prev = url.prev_sibling().unwrap();
        assert_eq!(prev.range(), 4..5);
        let prev_prev = prev.prev_sibling().unwrap();
        assert_eq!(prev_prev.range(), 0..4);
        assert!(prev_prev.prev_sibling().is_none());
    }

    #[test]
    fn test_inverted_range_is_an_error() {
        let tree = tree();
        #[allow(clippy::reversed_empty_ranges)]
        let result = tree.walk(10..2);
        assert!(matches!(result, Err(SyntaxError::InvertedSpan { .. })));
    }

    #[test]
    fn test_inverted_span_yields_node_error() {
        let tree = TokenTree::from_spans([
            TokenSpan::new(0..3, "url"),
            TokenSpan::new(9..5, "url"),
            TokenSpan::new(10..12, "url"),
        ]);
        let items: Vec<_> = tree.walk(0..20).unwrap().collect();
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(SyntaxError::InvertedSpan { start: 9, end: 5 })));
        assert!(items[2].is_ok());
    }
}
