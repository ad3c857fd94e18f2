//! Third-party script libraries and their readiness latch.
//!
//! Twitter and Dropbox render through JavaScript libraries that have to be
//! injected into the page once. [`ExternalLibrary`] owns that lifecycle:
//! injection is idempotent (keyed by the script element's ID), work queued
//! before the library is ready runs once it is, and a failed load is
//! reported to the user at most once.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures_channel::oneshot;
use miette::Diagnostic;
use smol_str::SmolStr;

/// Description of a `<script>` element to inject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSpec {
    /// Element ID. Its presence in the document means the script was
    /// already injected.
    pub id: SmolStr,
    pub src: String,
    /// Name of the global the script defines once loaded.
    pub global: SmolStr,
    /// Extra attributes (e.g. `data-app-key`).
    pub attributes: Vec<(SmolStr, String)>,
    pub async_load: bool,
}

impl ScriptSpec {
    pub fn new(id: impl Into<SmolStr>, src: impl Into<String>, global: impl Into<SmolStr>) -> Self {
        Self {
            id: id.into(),
            src: src.into(),
            global: global.into(),
            attributes: Vec::new(),
            async_load: false,
        }
    }

    pub fn with_attr(mut self, name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn async_load(mut self, async_load: bool) -> Self {
        self.async_load = async_load;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Callbacks a [`ScriptHost`] invokes when a script element settles.
///
/// Exactly one of the two should be called. Hosts may call them
/// synchronously from within `inject`/`listen`.
pub struct LoadCallbacks {
    pub on_load: Box<dyn FnOnce()>,
    pub on_error: Box<dyn FnOnce(String)>,
}

impl std::fmt::Debug for LoadCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadCallbacks").finish_non_exhaustive()
    }
}

/// The document a script is injected into.
pub trait ScriptHost {
    /// Whether an element with this ID exists.
    fn has_element(&self, id: &str) -> bool;

    /// Whether the library's global is defined and usable.
    fn global_ready(&self, global: &str) -> bool;

    /// Create and append the script element.
    fn inject(&self, spec: &ScriptSpec, callbacks: LoadCallbacks) -> Result<(), ScriptError>;

    /// Attach load/error listeners to an existing element.
    fn listen(&self, id: &str, callbacks: LoadCallbacks) -> Result<(), ScriptError>;

    /// Remove the element with this ID, if any.
    fn remove(&self, id: &str);
}

/// User-facing notices.
pub trait Notifier {
    fn notify(&self, message: &str);
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::warn!(target: "embedloom::notice", "{message}");
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ScriptError {
    #[error("failed to load {library} JS: {reason}")]
    #[diagnostic(
        code(embedloom::script::load_failed),
        help("check the network connection and any content blockers")
    )]
    LoadFailed { library: SmolStr, reason: String },

    #[error("could not inject the {library} script: {reason}")]
    #[diagnostic(code(embedloom::script::inject))]
    Inject { library: SmolStr, reason: String },

    #[error("{library} load attempt was superseded")]
    #[diagnostic(code(embedloom::script::superseded))]
    Superseded { library: SmolStr },
}

/// Observable state of an [`ExternalLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug)]
enum Phase {
    Unloaded,
    Loading,
    Ready,
    Failed(ScriptError),
}

#[derive(Default)]
struct Pending {
    continuations: Vec<Box<dyn FnOnce()>>,
    waiters: Vec<oneshot::Sender<Result<(), ScriptError>>>,
}

/// A lazily injected third-party library with a one-shot readiness latch.
pub struct ExternalLibrary {
    name: SmolStr,
    spec: RefCell<ScriptSpec>,
    phase: RefCell<Phase>,
    pending: RefCell<Pending>,
    attempt: Cell<u64>,
    notified: Cell<bool>,
    notifier: Rc<dyn Notifier>,
}

impl std::fmt::Debug for ExternalLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalLibrary")
            .field("name", &self.name)
            .field("spec", &self.spec.borrow())
            .field("phase", &self.phase.borrow())
            .field("attempt", &self.attempt.get())
            .finish_non_exhaustive()
    }
}

impl ExternalLibrary {
    /// `name` is the human-readable library name used in notices.
    pub fn new(name: impl Into<SmolStr>, spec: ScriptSpec, notifier: Rc<dyn Notifier>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            spec: RefCell::new(spec),
            phase: RefCell::new(Phase::Unloaded),
            pending: RefCell::new(Pending::default()),
            attempt: Cell::new(0),
            notified: Cell::new(false),
            notifier,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> ScriptSpec {
        self.spec.borrow().clone()
    }

    pub fn status(&self) -> LoadStatus {
        match &*self.phase.borrow() {
            Phase::Unloaded => LoadStatus::Unloaded,
            Phase::Loading => LoadStatus::Loading,
            Phase::Ready => LoadStatus::Ready,
            Phase::Failed(_) => LoadStatus::Failed,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == LoadStatus::Ready
    }

    /// Number of queued continuations.
    pub fn pending_len(&self) -> usize {
        self.pending.borrow().continuations.len()
    }

    /// Start loading the library unless it is loading or loaded.
    ///
    /// A previous failure is retried: the failed element is removed and the
    /// script injected again.
    #[tracing::instrument(level = "debug", skip_all, fields(library = %self.name))]
    pub fn ensure_loaded(self: &Rc<Self>, host: &dyn ScriptHost) -> LoadStatus {
        let retry = match self.status() {
            status @ (LoadStatus::Loading | LoadStatus::Ready) => return status,
            LoadStatus::Failed => true,
            LoadStatus::Unloaded => false,
        };

        let attempt = self.attempt.get() + 1;
        self.attempt.set(attempt);
        let spec = self.spec();
        *self.phase.borrow_mut() = Phase::Loading;

        if retry {
            tracing::info!(attempt, "retrying after failed load");
            host.remove(&spec.id);
        }

        // No borrows may be held past this point: hosts can settle the load
        // synchronously from inside these calls.
        let result = if host.has_element(&spec.id) {
            if host.global_ready(&spec.global) {
                tracing::debug!(id = %spec.id, "script already present and ready");
                self.finish(attempt, Ok(()));
                return self.status();
            }
            tracing::debug!(id = %spec.id, "script element exists, waiting for it");
            host.listen(&spec.id, self.callbacks(attempt))
        } else {
            tracing::debug!(id = %spec.id, src = %spec.src, "injecting script");
            host.inject(&spec, self.callbacks(attempt))
        };

        if let Err(err) = result {
            self.finish(attempt, Err(err));
        }
        self.status()
    }

    /// Swap in a different script (e.g. a new Dropbox app key).
    ///
    /// The old element is removed. If the library had been requested, a new
    /// load attempt starts; continuations still waiting on the old attempt
    /// carry over to the new one.
    pub fn replace_script(self: &Rc<Self>, host: &dyn ScriptHost, spec: ScriptSpec) -> LoadStatus {
        let old = std::mem::replace(&mut *self.spec.borrow_mut(), spec);
        if self.status() == LoadStatus::Unloaded {
            return LoadStatus::Unloaded;
        }

        tracing::info!(library = %self.name, id = %old.id, "replacing script");
        host.remove(&old.id);
        // invalidates callbacks for the old element
        self.attempt.set(self.attempt.get() + 1);
        *self.phase.borrow_mut() = Phase::Unloaded;
        self.ensure_loaded(host)
    }

    /// Run `f` once the library is ready. Runs immediately if it already is.
    pub fn on_ready(&self, f: impl FnOnce() + 'static) {
        if self.is_ready() {
            f();
            return;
        }
        self.pending.borrow_mut().continuations.push(Box::new(f));
    }

    /// Resolve once the current load attempt settles.
    pub async fn ready(&self) -> Result<(), ScriptError> {
        let rx = {
            match &*self.phase.borrow() {
                Phase::Ready => return Ok(()),
                Phase::Failed(err) => return Err(err.clone()),
                Phase::Unloaded | Phase::Loading => {}
            }
            let (tx, rx) = oneshot::channel();
            self.pending.borrow_mut().waiters.push(tx);
            rx
        };
        rx.await.map_err(|_| ScriptError::Superseded {
            library: self.name.clone(),
        })?
    }

    fn callbacks(self: &Rc<Self>, attempt: u64) -> LoadCallbacks {
        let on_load: Weak<Self> = Rc::downgrade(self);
        let on_error = on_load.clone();
        LoadCallbacks {
            on_load: Box::new(move || {
                if let Some(lib) = on_load.upgrade() {
                    lib.finish(attempt, Ok(()));
                }
            }),
            on_error: Box::new(move |reason| {
                if let Some(lib) = on_error.upgrade() {
                    let err = ScriptError::LoadFailed {
                        library: lib.name.clone(),
                        reason,
                    };
                    lib.finish(attempt, Err(err));
                }
            }),
        }
    }

    fn finish(&self, attempt: u64, result: Result<(), ScriptError>) {
        if attempt != self.attempt.get() {
            tracing::debug!(library = %self.name, attempt, "ignoring stale load result");
            return;
        }
        if !matches!(*self.phase.borrow(), Phase::Loading) {
            tracing::trace!(library = %self.name, attempt, "load attempt already settled");
            return;
        }

        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        match result {
            Ok(()) => {
                *self.phase.borrow_mut() = Phase::Ready;
                tracing::info!(
                    library = %self.name,
                    queued = pending.continuations.len(),
                    "library ready"
                );
                for waiter in pending.waiters {
                    let _ = waiter.send(Ok(()));
                }
                for continuation in pending.continuations {
                    continuation();
                }
            }
            Err(err) => {
                *self.phase.borrow_mut() = Phase::Failed(err.clone());
                tracing::error!(
                    library = %self.name,
                    dropped = pending.continuations.len(),
                    error = %err,
                    "library failed to load"
                );
                for waiter in pending.waiters {
                    let _ = waiter.send(Err(err.clone()));
                }
                if !self.notified.replace(true) {
                    self.notifier
                        .notify(&format!("Embeds error: Failed to load {} JS", self.name));
                }
            }
        }
    }
}
