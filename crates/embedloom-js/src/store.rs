//! Settings persisted through host callbacks.

use embedloom_core::{Settings, SettingsError, SettingsStore};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::JsValue;

/// [`SettingsStore`] backed by `load(): object | null` and
/// `save(settings: object): void` functions supplied by the host.
///
/// Persistence on the host side may be asynchronous; `save` only hands the
/// data over.
pub struct JsSettingsStore {
    load: js_sys::Function,
    save: js_sys::Function,
}

impl JsSettingsStore {
    pub fn new(load: js_sys::Function, save: js_sys::Function) -> Self {
        Self { load, save }
    }
}

fn js_error(e: JsValue) -> SettingsError {
    SettingsError::Store(format!("{e:?}"))
}

impl SettingsStore for JsSettingsStore {
    fn load(&self) -> Result<Option<Value>, SettingsError> {
        let data = self.load.call0(&JsValue::NULL).map_err(js_error)?;
        if data.is_undefined() || data.is_null() {
            return Ok(None);
        }
        serde_wasm_bindgen::from_value(data)
            .map(Some)
            .map_err(|e| SettingsError::Parse(e.to_string()))
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        let data = settings
            .serialize(&serializer)
            .map_err(|e| SettingsError::Store(e.to_string()))?;
        self.save.call1(&JsValue::NULL, &data).map_err(js_error)?;
        Ok(())
    }
}
