//! In-memory hosts and recording fakes shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use smol_str::SmolStr;

use crate::dom::{Container, EmbedNode, MemoryContainer};
use crate::embed::{
    DropboxDropins, DropboxEmbedder, EmbedContext, Embedder, EmbedderRegistry, TweetOptions,
    TwitterEmbedder, TwitterWidgets,
};
use crate::error::EmbedError;
use crate::preview::{LinkElementKind, PreviewDocument, PreviewElement};
use crate::script::{LoadCallbacks, Notifier, ScriptError, ScriptHost, ScriptSpec};
use crate::widget::WidgetHost;

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: RefCell<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}

#[derive(Default)]
struct FakeElement {
    global: Option<SmolStr>,
    callbacks: Option<LoadCallbacks>,
}

/// Script host whose elements load or fail only when told to.
#[derive(Default)]
pub struct FakeScriptHost {
    elements: RefCell<HashMap<SmolStr, FakeElement>>,
    globals: RefCell<Vec<SmolStr>>,
    injected: RefCell<Vec<ScriptSpec>>,
    removed: RefCell<Vec<SmolStr>>,
    settle_immediately: Cell<bool>,
    refuse_injection: Cell<bool>,
}

impl FakeScriptHost {
    /// Loaded element with its global already defined.
    pub fn preload(&self, id: &str, global: &str) {
        self.elements.borrow_mut().insert(id.into(), FakeElement::default());
        self.globals.borrow_mut().push(global.into());
    }

    /// Element that exists but hasn't loaded yet.
    pub fn add_element(&self, id: &str) {
        self.elements.borrow_mut().insert(id.into(), FakeElement::default());
    }

    pub fn settle_immediately(&self, yes: bool) {
        self.settle_immediately.set(yes);
    }

    pub fn refuse_injection(&self, yes: bool) {
        self.refuse_injection.set(yes);
    }

    pub fn injected(&self) -> Vec<ScriptSpec> {
        self.injected.borrow().clone()
    }

    pub fn removed(&self) -> Vec<SmolStr> {
        self.removed.borrow().clone()
    }

    pub fn take_callbacks(&self, id: &str) -> Option<LoadCallbacks> {
        self.elements
            .borrow_mut()
            .get_mut(id)
            .and_then(|el| el.callbacks.take())
    }

    /// Fire the load event of element `id`.
    pub fn load(&self, id: &str) {
        let global = self
            .elements
            .borrow()
            .get(id)
            .and_then(|el| el.global.clone());
        if let Some(global) = global {
            self.globals.borrow_mut().push(global);
        }
        if let Some(callbacks) = self.take_callbacks(id) {
            (callbacks.on_load)();
        }
    }

    /// Fire the error event of element `id`.
    pub fn fail(&self, id: &str, reason: &str) {
        if let Some(callbacks) = self.take_callbacks(id) {
            (callbacks.on_error)(reason.to_string());
        }
    }
}

impl ScriptHost for FakeScriptHost {
    fn has_element(&self, id: &str) -> bool {
        self.elements.borrow().contains_key(id)
    }

    fn global_ready(&self, global: &str) -> bool {
        self.globals.borrow().iter().any(|g| g == global)
    }

    fn inject(&self, spec: &ScriptSpec, callbacks: LoadCallbacks) -> Result<(), ScriptError> {
        if self.refuse_injection.get() {
            return Err(ScriptError::Inject {
                library: spec.id.clone(),
                reason: "refused".to_string(),
            });
        }
        self.injected.borrow_mut().push(spec.clone());
        if self.settle_immediately.get() {
            self.elements.borrow_mut().insert(
                spec.id.clone(),
                FakeElement {
                    global: Some(spec.global.clone()),
                    callbacks: None,
                },
            );
            self.globals.borrow_mut().push(spec.global.clone());
            (callbacks.on_load)();
            return Ok(());
        }
        self.elements.borrow_mut().insert(
            spec.id.clone(),
            FakeElement {
                global: Some(spec.global.clone()),
                callbacks: Some(callbacks),
            },
        );
        Ok(())
    }

    fn listen(&self, id: &str, callbacks: LoadCallbacks) -> Result<(), ScriptError> {
        if let Some(el) = self.elements.borrow_mut().get_mut(id) {
            el.callbacks = Some(callbacks);
        }
        Ok(())
    }

    fn remove(&self, id: &str) {
        self.elements.borrow_mut().remove(id);
        self.removed.borrow_mut().push(id.into());
    }
}

#[derive(Default)]
pub struct RecordingTwitter {
    tweets: RefCell<Vec<(String, TweetOptions)>>,
    loads: Cell<usize>,
}

impl RecordingTwitter {
    pub fn tweets(&self) -> Vec<(String, TweetOptions)> {
        self.tweets.borrow().clone()
    }

    pub fn load_count(&self) -> usize {
        self.loads.get()
    }
}

impl TwitterWidgets for RecordingTwitter {
    fn create_tweet(
        &self,
        status: &str,
        container: &Rc<dyn Container>,
        options: &TweetOptions,
    ) -> Result<(), EmbedError> {
        container.append(&EmbedNode::new("blockquote").with_attr("data-tweet-id", status));
        self.tweets
            .borrow_mut()
            .push((status.to_string(), options.clone()));
        Ok(())
    }

    fn load(&self) -> Result<(), EmbedError> {
        self.loads.set(self.loads.get() + 1);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingDropins {
    links: RefCell<Vec<String>>,
}

impl RecordingDropins {
    pub fn links(&self) -> Vec<String> {
        self.links.borrow().clone()
    }
}

impl DropboxDropins for RecordingDropins {
    fn embed(&self, link: &str, _container: &Rc<dyn Container>) -> Result<(), EmbedError> {
        self.links.borrow_mut().push(link.to_string());
        Ok(())
    }
}

/// Widget host that hands out [`MemoryContainer`]s and records placements
/// as `(container index, pos)`.
#[derive(Default)]
pub struct FakeWidgetHost {
    containers: RefCell<Vec<Rc<MemoryContainer>>>,
    placements: RefCell<Vec<(usize, usize)>>,
}

impl FakeWidgetHost {
    pub fn containers(&self) -> Vec<Rc<MemoryContainer>> {
        self.containers.borrow().clone()
    }

    pub fn placements(&self) -> Vec<(usize, usize)> {
        self.placements.borrow().clone()
    }
}

impl WidgetHost for FakeWidgetHost {
    fn create_container(&self, class: &str) -> Rc<dyn Container> {
        let container = Rc::new(MemoryContainer::new(class));
        self.containers.borrow_mut().push(container.clone());
        container
    }

    fn place(&self, container: &Rc<dyn Container>, pos: usize) {
        let index = self
            .containers
            .borrow()
            .iter()
            .position(|c| std::ptr::addr_eq(Rc::as_ptr(c), Rc::as_ptr(container)));
        if let Some(index) = index {
            self.placements.borrow_mut().push((index, pos));
        }
    }
}

/// Accepts any URL containing `domain` and renders a plain link.
pub struct StaticEmbedder {
    name: &'static str,
    domain: &'static str,
    calls: Cell<usize>,
    fail_next: Cell<bool>,
}

impl StaticEmbedder {
    pub fn new(name: &'static str, domain: &'static str) -> Self {
        Self {
            name,
            domain,
            calls: Cell::new(0),
            fail_next: Cell::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn fail_next(&self) {
        self.fail_next.set(true);
    }
}

impl Embedder for StaticEmbedder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn can_add_embed(&self, url: &str) -> bool {
        url.contains(self.domain)
    }

    fn add_embed(
        &self,
        container: &Rc<dyn Container>,
        url: &str,
        _ctx: &EmbedContext<'_>,
    ) -> Result<(), EmbedError> {
        self.calls.set(self.calls.get() + 1);
        if self.fail_next.replace(false) {
            return Err(EmbedError::widget(self.name, "failed on purpose"));
        }
        container.append(
            &EmbedNode::new("a")
                .with_attr("data-embedder", self.name)
                .with_attr("href", url),
        );
        Ok(())
    }
}

pub struct Fixtures {
    pub host: Rc<FakeScriptHost>,
    pub widgets: Rc<RecordingTwitter>,
    pub dropins: Rc<RecordingDropins>,
    pub notifier: Rc<RecordingNotifier>,
    pub twitter: Rc<TwitterEmbedder>,
    pub dropbox: Rc<DropboxEmbedder>,
}

/// The standard registry wired to recording fakes.
pub fn standard_registry() -> (EmbedderRegistry, Fixtures) {
    let host = Rc::new(FakeScriptHost::default());
    let widgets = Rc::new(RecordingTwitter::default());
    let dropins = Rc::new(RecordingDropins::default());
    let notifier = Rc::new(RecordingNotifier::default());
    let twitter = Rc::new(TwitterEmbedder::new(
        host.clone(),
        widgets.clone(),
        notifier.clone(),
    ));
    let dropbox = Rc::new(DropboxEmbedder::new(
        "",
        host.clone(),
        dropins.clone(),
        notifier.clone(),
    ));
    let registry = EmbedderRegistry::standard(twitter.clone(), dropbox.clone());
    (
        registry,
        Fixtures {
            host,
            widgets,
            dropins,
            notifier,
            twitter,
            dropbox,
        },
    )
}

pub struct FakeLink {
    kind: LinkElementKind,
    target: Option<String>,
    replacement: RefCell<Option<Rc<MemoryContainer>>>,
}

impl PreviewElement for Rc<FakeLink> {
    fn kind(&self) -> LinkElementKind {
        self.kind
    }

    fn target(&self) -> Option<String> {
        self.target.clone()
    }

    fn replace_with_container(&self, class: &str) -> Rc<dyn Container> {
        let container = Rc::new(MemoryContainer::new(class));
        *self.replacement.borrow_mut() = Some(container.clone());
        container
    }
}

/// Rendered preview made of bare links.
#[derive(Default)]
pub struct FakePreview {
    links: Vec<Rc<FakeLink>>,
}

impl FakePreview {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, kind: LinkElementKind, target: Option<&str>) -> Self {
        self.links.push(Rc::new(FakeLink {
            kind,
            target: target.map(str::to_string),
            replacement: RefCell::new(None),
        }));
        self
    }

    pub fn anchor(self, href: &str) -> Self {
        self.push(LinkElementKind::Anchor, Some(href))
    }

    pub fn anchor_without_target(self) -> Self {
        self.push(LinkElementKind::Anchor, None)
    }

    pub fn image(self, src: &str) -> Self {
        self.push(LinkElementKind::Image, Some(src))
    }

    pub fn replacement(&self, index: usize) -> Option<Rc<MemoryContainer>> {
        self.links.get(index)?.replacement.borrow().clone()
    }
}

impl PreviewDocument for FakePreview {
    type Element = Rc<FakeLink>;

    fn link_elements(&self) -> Vec<Rc<FakeLink>> {
        self.links.clone()
    }
}
