//! `<meta>` tags read by `widgets.js`.

use wasm_bindgen::JsValue;
use web_sys::Element;

/// Create or update `<meta name=.. content=..>` children of `parent`.
///
/// Existing tags with the same name are updated in place, so calling this
/// again after a settings change doesn't pile up duplicates.
pub fn publish_widget_meta(parent: &Element, tags: &[(&str, &str)]) -> Result<(), JsValue> {
    let document = parent
        .owner_document()
        .ok_or_else(|| JsValue::from_str("element has no owner document"))?;

    for (name, content) in tags {
        let selector = format!("meta[name=\"{name}\"]");
        let meta = match parent.query_selector(&selector)? {
            Some(existing) => existing,
            None => {
                let meta = document.create_element("meta")?;
                meta.set_attribute("name", name)?;
                parent.append_child(&meta)?;
                meta
            }
        };
        meta.set_attribute("content", content)?;
    }
    tracing::debug!(count = tags.len(), "widget meta published");
    Ok(())
}
