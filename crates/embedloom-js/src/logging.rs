//! Logging setup and in-memory capture for bug reports.
//!
//! Console output goes through `tracing-wasm`, filtered by an `EnvFilter`
//! built from per-module directives (`"info,embedloom_core::decoration=trace"`).
//! Independently of that filter, debug+ events from our own crates are
//! recorded as structured entries. Warnings and errors (failed loads, rebuild
//! diagnostics, rejected settings) go to a separate buffer so a burst of
//! rebuild chatter cannot push them out before the user copies the report.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;

use serde::Serialize;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

/// Recent entries of any captured level.
const RECENT_CAPACITY: usize = 100;

/// Warnings and errors, kept longer.
const PROBLEM_CAPACITY: usize = 50;

/// Console filter used when none (or an invalid one) is given.
pub const DEFAULT_DIRECTIVES: &str = "info";

const CAPTURE_MIN_LEVEL: Level = Level::DEBUG;

/// One captured event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tsify)]
pub struct LogEntry {
    pub level: String,
    pub target: String,
    pub message: String,
    /// Structured fields in recording order, e.g. `("url", "https://...")`.
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    fn line(&self) -> String {
        let mut line = format!("[{}] {}: {}", self.target, self.level, self.message);
        for (i, (name, value)) in self.fields.iter().enumerate() {
            let sep = if i == 0 && self.message.is_empty() { "" } else { ", " };
            let _ = write!(line, "{sep}{name}={value}");
        }
        line
    }

    fn is_problem(&self) -> bool {
        self.level == "WARN" || self.level == "ERROR"
    }
}

#[derive(Default)]
struct Captured {
    recent: VecDeque<LogEntry>,
    problems: VecDeque<LogEntry>,
}

fn push_bounded(buf: &mut VecDeque<LogEntry>, capacity: usize, entry: LogEntry) {
    if buf.len() >= capacity {
        buf.pop_front();
    }
    buf.push_back(entry);
}

thread_local! {
    static CAPTURED: RefCell<Captured> = RefCell::new(Captured::default());
}

/// Whether events from `target` are captured.
fn is_ours(target: &str) -> bool {
    target == "embedloom" || target.starts_with("embedloom::") || target.starts_with("embedloom_")
}

/// Records our debug+ events into the capture buffers.
pub struct CaptureLayer;

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > CAPTURE_MIN_LEVEL || !is_ours(metadata.target()) {
            return;
        }

        let mut entry = LogEntry {
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message: String::new(),
            fields: Vec::new(),
        };
        event.record(&mut EntryVisitor(&mut entry));

        CAPTURED.with(|captured| {
            let mut captured = captured.borrow_mut();
            if entry.is_problem() {
                push_bounded(&mut captured.problems, PROBLEM_CAPACITY, entry.clone());
            }
            push_bounded(&mut captured.recent, RECENT_CAPACITY, entry);
        });
    }
}

struct EntryVisitor<'a>(&'a mut LogEntry);

impl EntryVisitor<'_> {
    fn record(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.0.message = value;
        } else {
            self.0.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for EntryVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record(field, value.to_string());
    }
}

/// Console filter from `directives`, falling back to [`DEFAULT_DIRECTIVES`].
pub fn console_filter(directives: Option<&str>) -> EnvFilter {
    let directives = directives
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DIRECTIVES);
    EnvFilter::try_new(directives).unwrap_or_else(|err| {
        web_console_warn(&format!("invalid log directives {directives:?}: {err}"));
        EnvFilter::new(DEFAULT_DIRECTIVES)
    })
}

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
fn web_console_warn(message: &str) {
    web_sys::console::warn_1(&JsValue::from_str(message));
}

#[cfg(not(all(target_arch = "wasm32", target_os = "unknown")))]
fn web_console_warn(message: &str) {
    eprintln!("{message}");
}

/// Install the global subscriber. Later calls are no-ops.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(directives: Option<String>) {
    let filter = console_filter(directives.as_deref());

    #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
    {
        use tracing_subscriber::Registry;
        use tracing_subscriber::layer::SubscriberExt;

        let wasm_layer = tracing_wasm::WASMLayer::new(
            tracing_wasm::WASMLayerConfigBuilder::new()
                .set_max_level(Level::TRACE)
                .build(),
        );
        let reg = Registry::default()
            .with(wasm_layer.with_filter(filter))
            .with(CaptureLayer);
        let _ = tracing::subscriber::set_global_default(reg);
    }

    #[cfg(not(all(target_arch = "wasm32", target_os = "unknown")))]
    drop(filter);
}

/// Captured entries as text, one per line: warnings and errors that already
/// left the recent window first, then the recent entries.
#[wasm_bindgen(js_name = getLogs)]
pub fn get_logs() -> String {
    CAPTURED.with(|captured| {
        let captured = captured.borrow();
        let earlier = captured
            .problems
            .iter()
            .filter(|p| !captured.recent.contains(p))
            .map(LogEntry::line);
        let recent = captured.recent.iter().map(LogEntry::line);
        earlier.chain(recent).collect::<Vec<_>>().join("\n")
    })
}

fn problems() -> Vec<LogEntry> {
    CAPTURED.with(|captured| captured.borrow().problems.iter().cloned().collect())
}

/// Captured warnings and errors as structured `LogEntry` objects.
#[wasm_bindgen(js_name = getProblems)]
pub fn get_problems() -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(&problems())
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

#[wasm_bindgen(js_name = clearLogs)]
pub fn clear_logs() {
    CAPTURED.with(|captured| *captured.borrow_mut() = Captured::default());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::Registry;
    use tracing_subscriber::layer::SubscriberExt;

    fn capture(f: impl FnOnce()) -> String {
        clear_logs();
        let subscriber = Registry::default().with(CaptureLayer);
        tracing::subscriber::with_default(subscriber, f);
        get_logs()
    }

    #[test]
    fn test_captures_our_events_with_fields() {
        let logs = capture(|| {
            tracing::debug!(created = 2, reused = 1, "widgets reconciled");
            tracing::trace!("too chatty");
        });
        insta::assert_snapshot!(
            logs,
            @"[embedloom_js::logging::tests] DEBUG: widgets reconciled, created=2, reused=1"
        );
    }

    #[test]
    fn test_ignores_foreign_targets() {
        let logs = capture(|| {
            tracing::warn!(target: "some_dependency", "noise");
            tracing::warn!(target: "embedloomish", "lookalike");
            tracing::warn!(target: "embedloom::notice", "Embeds error: Failed to load Twitter JS");
        });
        assert_eq!(logs, "[embedloom::notice] WARN: Embeds error: Failed to load Twitter JS");
    }

    #[test]
    fn test_problems_outlive_recent_entries() {
        let logs = capture(|| {
            tracing::error!(library = "Dropbox", "script failed to load");
            for i in 0..(RECENT_CAPACITY + 5) {
                tracing::debug!(i, "rebuild");
            }
        });
        let lines: Vec<_> = logs.lines().collect();
        assert_eq!(lines.len(), RECENT_CAPACITY + 1);
        assert_eq!(
            lines[0],
            "[embedloom_js::logging::tests] ERROR: script failed to load, library=Dropbox"
        );
        assert!(lines[1].ends_with("rebuild, i=5"));

        let problems = problems();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].fields, vec![("library".to_string(), "Dropbox".to_string())]);
    }

    #[test]
    fn test_recent_problems_are_not_repeated() {
        let logs = capture(|| {
            tracing::warn!(url = "https://youtu.be/x", "could not materialize widget");
        });
        assert_eq!(logs.lines().count(), 1);
        assert_eq!(problems().len(), 1);
    }

    #[test]
    fn test_invalid_directives_fall_back() {
        assert_eq!(console_filter(Some("embedloom=[")).to_string(), DEFAULT_DIRECTIVES);
        assert_eq!(console_filter(None).to_string(), DEFAULT_DIRECTIVES);
        assert_eq!(console_filter(Some("   ")).to_string(), DEFAULT_DIRECTIVES);
    }
}
