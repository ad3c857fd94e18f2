//! `<script>` injection for third-party embed libraries.

use std::cell::RefCell;
use std::collections::HashMap;

use embedloom_core::{LoadCallbacks, ScriptError, ScriptHost, ScriptSpec};
use gloo_events::EventListener;
use smol_str::SmolStr;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, EventTarget, HtmlScriptElement};

/// [`ScriptHost`] over the live document.
///
/// Scripts are inserted before the first existing `<script>` (or appended to
/// `<head>` when there is none). Load and error listeners stay registered
/// until the element is removed.
pub struct DomScriptHost {
    document: Document,
    listeners: RefCell<HashMap<SmolStr, Vec<EventListener>>>,
}

impl DomScriptHost {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            listeners: RefCell::new(HashMap::new()),
        }
    }

    fn attach(&self, id: &str, target: &EventTarget, callbacks: LoadCallbacks, src: String) {
        let LoadCallbacks { on_load, on_error } = callbacks;
        let load = EventListener::once(target, "load", move |_| on_load());
        let error = EventListener::once(target, "error", move |_| {
            on_error(format!("could not load {src}"))
        });
        self.listeners
            .borrow_mut()
            .insert(id.into(), vec![load, error]);
    }

    fn create_script(&self, spec: &ScriptSpec) -> Result<HtmlScriptElement, JsValue> {
        let script = self
            .document
            .create_element("script")?
            .dyn_into::<HtmlScriptElement>()
            .map_err(JsValue::from)?;
        script.set_id(&spec.id);
        script.set_src(&spec.src);
        script.set_async(spec.async_load);
        for (name, value) in &spec.attributes {
            script.set_attribute(name, value)?;
        }
        Ok(script)
    }

    fn insert(&self, script: &HtmlScriptElement) -> Result<(), JsValue> {
        let first = self.document.get_elements_by_tag_name("script").item(0);
        if let Some(parent) = first.as_ref().and_then(|f| f.parent_node()) {
            parent.insert_before(script, first.as_deref())?;
            return Ok(());
        }
        let head = self
            .document
            .head()
            .ok_or_else(|| JsValue::from_str("document has no head"))?;
        head.append_child(script)?;
        Ok(())
    }
}

fn inject_error(spec: &ScriptSpec, e: JsValue) -> ScriptError {
    ScriptError::Inject {
        library: spec.id.clone(),
        reason: format!("{e:?}"),
    }
}

impl ScriptHost for DomScriptHost {
    fn has_element(&self, id: &str) -> bool {
        self.document.get_element_by_id(id).is_some()
    }

    fn global_ready(&self, global: &str) -> bool {
        js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str(global))
            .map(|value| !value.is_undefined() && !value.is_null())
            .unwrap_or(false)
    }

    fn inject(&self, spec: &ScriptSpec, callbacks: LoadCallbacks) -> Result<(), ScriptError> {
        let script = self.create_script(spec).map_err(|e| inject_error(spec, e))?;
        // listeners go on before insertion so a cached script can't load unobserved
        self.attach(&spec.id, &script, callbacks, spec.src.clone());
        if let Err(e) = self.insert(&script) {
            self.listeners.borrow_mut().remove(spec.id.as_str());
            return Err(inject_error(spec, e));
        }
        tracing::debug!(id = %spec.id, src = %spec.src, "script injected");
        Ok(())
    }

    fn listen(&self, id: &str, callbacks: LoadCallbacks) -> Result<(), ScriptError> {
        let element = self
            .document
            .get_element_by_id(id)
            .ok_or_else(|| ScriptError::Inject {
                library: id.into(),
                reason: "element disappeared".to_string(),
            })?;
        let src = element.get_attribute("src").unwrap_or_default();
        self.attach(id, &element, callbacks, src);
        Ok(())
    }

    fn remove(&self, id: &str) {
        self.listeners.borrow_mut().remove(id);
        if let Some(element) = self.document.get_element_by_id(id) {
            element.remove();
        }
    }
}
