//! Browser DOM layer for embedloom.
//!
//! Implements the host traits from `embedloom-core` on top of `web-sys`. It
//! assumes a `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `container`: `DomContainer` and the callback-driven `BrowserWidgetHost`
//! - `script`: `<script>` injection and load/error listeners (`DomScriptHost`)
//! - `widgets`: the page-global `twttr.widgets` and `Dropbox` APIs
//! - `preview`: link elements of rendered preview HTML
//! - `meta`: Twitter widget `<meta>` tags
//! - `notice`: user-visible failure notices
//!
//! # Re-exports
//!
//! This crate re-exports `embedloom-core` for convenience, so consumers
//! only need to depend on `embedloom-browser`.

pub use embedloom_core;
pub use embedloom_core::*;

pub mod container;
pub mod meta;
pub mod notice;
pub mod preview;
pub mod script;
pub mod widgets;

pub use container::{BrowserWidgetHost, DomContainer, build_element};
pub use meta::publish_widget_meta;
pub use notice::FunctionNotifier;
pub use preview::{DomLinkElement, DomPreview};
pub use script::DomScriptHost;
pub use widgets::{GlobalDropboxDropins, GlobalTwitterWidgets};

use wasm_bindgen::JsValue;

/// The current window's document.
pub fn document() -> Result<web_sys::Document, JsValue> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))
}

/// Class on `<body>` that marks a dark host UI.
pub const DARK_THEME_CLASS: &str = "theme-dark";

/// The host UI theme, read from the `<body>` class list.
pub fn body_ui_theme(document: &web_sys::Document) -> UiTheme {
    let dark = document
        .body()
        .is_some_and(|body| body.class_list().contains(DARK_THEME_CLASS));
    if dark { UiTheme::Dark } else { UiTheme::Light }
}
