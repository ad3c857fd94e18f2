//! Keeping decorations in step with an editor view.

use std::ops::Range;

use crate::decoration::{DecorationSet, Rebuild, build_decorations};
use crate::embed::EmbedderRegistry;
use crate::syntax::{SyntaxTree, TokenSpan, TokenTree};
use crate::text::{EditorRope, TextBuffer};

/// What the host editor exposes to the view layer.
pub trait EditorView {
    type Tree: SyntaxTree;
    type Text: TextBuffer + ?Sized;

    /// Currently rendered char ranges, in any order.
    fn visible_ranges(&self) -> Vec<Range<usize>>;

    fn tree(&self) -> &Self::Tree;

    fn text(&self) -> &Self::Text;
}

/// Flags describing one editor transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewUpdate {
    pub doc_changed: bool,
    pub viewport_changed: bool,
}

impl ViewUpdate {
    pub fn doc_changed() -> Self {
        Self {
            doc_changed: true,
            viewport_changed: false,
        }
    }

    pub fn viewport_changed() -> Self {
        Self {
            doc_changed: false,
            viewport_changed: true,
        }
    }

    pub fn needs_rebuild(&self) -> bool {
        self.doc_changed || self.viewport_changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Rebuilding,
}

/// The live-view plugin instance: owns the registry and the current
/// decoration set for one editor.
#[derive(Debug)]
pub struct EmbedView {
    registry: EmbedderRegistry,
    state: ViewState,
    last: Rebuild,
    rebuilds: usize,
}

impl EmbedView {
    /// Create the plugin for `view` and build its first decoration set.
    pub fn mount<V: EditorView>(registry: EmbedderRegistry, view: &V) -> Self {
        let mut this = Self {
            registry,
            state: ViewState::Idle,
            last: Rebuild::default(),
            rebuilds: 0,
        };
        this.rebuild(view);
        this
    }

    /// Rebuild if the document or viewport changed. Returns whether the
    /// decoration set was replaced.
    pub fn update<V: EditorView>(&mut self, view: &V, update: ViewUpdate) -> bool {
        if !update.needs_rebuild() {
            return false;
        }
        self.rebuild(view);
        true
    }

    /// Unconditionally rebuild from `view`.
    pub fn rebuild<V: EditorView>(&mut self, view: &V) -> &Rebuild {
        debug_assert_eq!(self.state, ViewState::Idle);
        self.state = ViewState::Rebuilding;
        let visible = view.visible_ranges();
        let rebuild = build_decorations(view.tree(), view.text(), &visible, &self.registry);
        self.last = rebuild;
        self.rebuilds += 1;
        self.state = ViewState::Idle;
        &self.last
    }

    pub fn decorations(&self) -> &DecorationSet {
        &self.last.decorations
    }

    pub fn last_rebuild(&self) -> &Rebuild {
        &self.last
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    pub fn registry(&self) -> &EmbedderRegistry {
        &self.registry
    }

    /// Swap the registry. Takes effect on the next rebuild.
    pub fn set_registry(&mut self, registry: EmbedderRegistry) {
        self.registry = registry;
    }
}

/// An [`EditorView`] over a rope and a flat token tree, for hosts that push
/// their text and tokens across a boundary.
///
/// Until the host reports a viewport the whole document is visible. Reported
/// ranges are mapped through later edits.
#[derive(Debug, Clone, Default)]
pub struct BufferView {
    text: EditorRope,
    tree: TokenTree,
    visible: Option<Vec<Range<usize>>>,
}

impl BufferView {
    /// Whole document visible.
    pub fn new(text: &str, tokens: impl IntoIterator<Item = TokenSpan>) -> Self {
        Self {
            text: EditorRope::from_str(text),
            tree: TokenTree::from_spans(tokens),
            visible: None,
        }
    }

    pub fn text_buffer(&self) -> &EditorRope {
        &self.text
    }

    /// Replace `range` with `insert` and install the re-tokenized spans.
    pub fn apply_change(
        &mut self,
        range: Range<usize>,
        insert: &str,
        tokens: impl IntoIterator<Item = TokenSpan>,
    ) -> ViewUpdate {
        let change = ChangeMap {
            from: range.start,
            to: range.end,
            inserted: insert.chars().count(),
        };
        self.text.replace(range, insert);
        self.tree = TokenTree::from_spans(tokens);
        if let Some(visible) = &mut self.visible {
            for r in visible.iter_mut() {
                *r = change.map_range(r);
            }
        }
        ViewUpdate::doc_changed()
    }

    /// Replace all tokens without touching the text (e.g. the host's
    /// parser caught up).
    pub fn set_tokens(&mut self, tokens: impl IntoIterator<Item = TokenSpan>) -> ViewUpdate {
        self.tree = TokenTree::from_spans(tokens);
        ViewUpdate::doc_changed()
    }

    pub fn set_visible(&mut self, visible: Vec<Range<usize>>) -> ViewUpdate {
        self.visible = Some(visible);
        ViewUpdate::viewport_changed()
    }

    /// Forget the reported viewport; the whole document is visible again.
    pub fn reset_visible(&mut self) -> ViewUpdate {
        self.visible = None;
        ViewUpdate::viewport_changed()
    }
}

/// One replacement, for mapping offsets from before it to after it.
#[derive(Debug, Clone, Copy)]
struct ChangeMap {
    from: usize,
    to: usize,
    inserted: usize,
}

impl ChangeMap {
    /// Text inserted at either edge of a range ends up inside it.
    fn map_range(&self, range: &Range<usize>) -> Range<usize> {
        let start = if range.start <= self.from {
            range.start
        } else {
            self.map_after(range.start)
        };
        let end = if range.end < self.from {
            range.end
        } else {
            self.map_after(range.end)
        };
        start..end.max(start)
    }

    fn map_after(&self, pos: usize) -> usize {
        if pos >= self.to {
            pos - (self.to - self.from) + self.inserted
        } else {
            self.from + self.inserted
        }
    }
}

impl EditorView for BufferView {
    type Tree = TokenTree;
    type Text = EditorRope;

    fn visible_ranges(&self) -> Vec<Range<usize>> {
        let len = self.text.len_chars();
        match &self.visible {
            None => vec![0..len],
            Some(visible) => visible
                .iter()
                .map(|r| r.start.min(len)..r.end.min(len))
                .collect(),
        }
    }

    fn tree(&self) -> &TokenTree {
        &self.tree
    }

    fn text(&self) -> &EditorRope {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::standard_registry;

    fn url(range: Range<usize>) -> TokenSpan {
        TokenSpan::new(range, "url")
    }

    #[test]
    fn test_mount_builds_initial_set() {
        let (registry, _) = standard_registry();
        let view = BufferView::new("https://youtu.be/abc", [url(0..20)]);
        let embed_view = EmbedView::mount(registry, &view);
        assert_eq!(embed_view.rebuild_count(), 1);
        assert_eq!(embed_view.decorations().entries(), vec![(20, "https://youtu.be/abc")]);
        assert_eq!(embed_view.state(), ViewState::Idle);
    }

    #[test]
    fn test_update_only_on_change() {
        let (registry, _) = standard_registry();
        let view = BufferView::new("https://youtu.be/abc", [url(0..20)]);
        let mut embed_view = EmbedView::mount(registry, &view);

        assert!(!embed_view.update(&view, ViewUpdate::default()));
        assert_eq!(embed_view.rebuild_count(), 1);
        assert!(embed_view.update(&view, ViewUpdate::viewport_changed()));
        assert_eq!(embed_view.rebuild_count(), 2);
    }

    #[test]
    fn test_edit_then_rebuild() {
        let (registry, _) = standard_registry();
        let mut view = BufferView::new("hello", []);
        let mut embed_view = EmbedView::mount(registry, &view);
        assert!(embed_view.decorations().is_empty());

        // type a link after "hello "
        let update = view.apply_change(5..5, " https://youtu.be/abc", [TokenSpan::plain(0..5), url(6..26)]);
        assert_eq!(view.visible_ranges(), vec![0..26]);
        assert!(embed_view.update(&view, update));
        assert_eq!(embed_view.decorations().entries(), vec![(26, "https://youtu.be/abc")]);

        // delete it again
        let update = view.apply_change(5..26, "", [TokenSpan::plain(0..5)]);
        assert_eq!(view.visible_ranges(), vec![0..5]);
        embed_view.update(&view, update);
        assert!(embed_view.decorations().is_empty());
    }

    #[test]
    fn test_reported_viewport_follows_edits() {
        let (registry, _) = standard_registry();
        let source = "intro\nhttps://youtu.be/aaa\n";
        let mut view = BufferView::new(source, [TokenSpan::plain(0..5), url(6..26)]);
        let mut embed_view = EmbedView::mount(registry, &view);
        let update = view.set_visible(vec![6..27]);
        embed_view.update(&view, update);
        assert_eq!(embed_view.decorations().entries(), vec![(26, "https://youtu.be/aaa")]);

        // three chars above the viewport shift it down
        let update = view.apply_change(0..0, "ab\n", [TokenSpan::plain(3..8), url(9..29)]);
        assert_eq!(view.visible_ranges(), vec![9..30]);
        embed_view.update(&view, update);
        assert_eq!(embed_view.decorations().entries(), vec![(29, "https://youtu.be/aaa")]);

        // typing at the viewport's end grows it
        let update = view.apply_change(30..30, "https://youtu.be/bbb", [
            TokenSpan::plain(3..8),
            url(9..29),
            url(30..50),
        ]);
        assert_eq!(view.visible_ranges(), vec![9..50]);
        embed_view.update(&view, update);
        assert_eq!(embed_view.decorations().len(), 2);

        // deleting across the viewport start clamps it to the change
        view.apply_change(5..20, "", [TokenSpan::plain(3..5)]);
        assert_eq!(view.visible_ranges(), vec![5..35]);

        view.reset_visible();
        assert_eq!(view.visible_ranges(), vec![0..35]);
    }

    #[test]
    fn test_stale_viewport_is_clamped() {
        let mut view = BufferView::new("short", []);
        view.set_visible(vec![2..40, 60..80]);
        assert_eq!(view.visible_ranges(), vec![2..5, 5..5]);
    }

    #[test]
    fn test_scrolling_changes_visible_set() {
        let (registry, _) = standard_registry();
        let source = "https://youtu.be/aaa\nhttps://youtu.be/bbb";
        let mut view = BufferView::new(source, [url(0..20), url(21..41)]);
        let mut embed_view = EmbedView::mount(registry, &view);
        assert_eq!(embed_view.decorations().len(), 2);

        let update = view.set_visible(vec![21..41]);
        embed_view.update(&view, update);
        assert_eq!(embed_view.decorations().entries(), vec![(41, "https://youtu.be/bbb")]);
    }

    #[test]
    fn test_registry_swap_applies_next_rebuild() {
        let (registry, _) = standard_registry();
        let view = BufferView::new("https://youtu.be/abc", [url(0..20)]);
        let mut embed_view = EmbedView::mount(registry, &view);
        embed_view.set_registry(EmbedderRegistry::new());
        assert_eq!(embed_view.decorations().len(), 1);
        embed_view.update(&view, ViewUpdate::doc_changed());
        assert!(embed_view.decorations().is_empty());
        assert!(embed_view.registry().is_empty());
    }
}
