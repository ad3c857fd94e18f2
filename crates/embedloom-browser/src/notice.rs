//! User-visible notices through a host callback.

use embedloom_core::{LogNotifier, Notifier};
use wasm_bindgen::JsValue;

/// Shows notices through a host-supplied `(message: string) => void`.
/// Falls back to logging if the callback throws.
#[derive(Debug, Clone)]
pub struct FunctionNotifier {
    callback: js_sys::Function,
}

impl FunctionNotifier {
    pub fn new(callback: js_sys::Function) -> Self {
        Self { callback }
    }
}

impl Notifier for FunctionNotifier {
    fn notify(&self, message: &str) {
        if let Err(e) = self.callback.call1(&JsValue::NULL, &JsValue::from_str(message)) {
            tracing::warn!("notice callback threw: {:?}", e);
            LogNotifier.notify(message);
        }
    }
}
