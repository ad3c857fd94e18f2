//! WASM bindings for the embedloom link embed engine.
//!
//! Exposes `EmbedPlugin` to JavaScript hosts: decoration rebuilds over
//! host-supplied highlighter tokens, widget placement through a callback,
//! preview and `tweet` code block processing, and settings persisted through
//! host callbacks. `initLogging` sets up console logging; `getLogs` and
//! `getProblems` read back captured entries for bug reports.

mod logging;
mod plugin;
mod store;
mod types;

pub use logging::*;
pub use plugin::*;
pub use store::*;
pub use types::*;

use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}
