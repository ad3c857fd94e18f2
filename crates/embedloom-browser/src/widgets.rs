//! Calls into the page globals defined by `widgets.js` and `dropins.js`.

use std::rc::Rc;

use embedloom_core::embed::{dropbox, twitter};
use embedloom_core::{Container, DropboxDropins, EmbedError, TweetOptions, TwitterWidgets};
use js_sys::{Function, Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::container::DomContainer;

/// Walk `path` from the global object.
fn lookup(path: &[&str]) -> Result<JsValue, String> {
    let mut value: JsValue = js_sys::global().into();
    for key in path {
        value = Reflect::get(&value, &JsValue::from_str(key)).map_err(|e| format!("{e:?}"))?;
        if value.is_undefined() || value.is_null() {
            return Err(format!("`{}` is not defined", path.join(".")));
        }
    }
    Ok(value)
}

fn method(path: &[&str]) -> Result<(JsValue, Function), String> {
    let (name, parent) = path.split_last().ok_or("empty path")?;
    let this = lookup(parent)?;
    let func = Reflect::get(&this, &JsValue::from_str(name))
        .map_err(|e| format!("{e:?}"))?
        .dyn_into::<Function>()
        .map_err(|_| format!("`{}` is not a function", path.join(".")))?;
    Ok((this, func))
}

fn container_element(
    embedder: &'static str,
    container: &Rc<dyn Container>,
) -> Result<JsValue, EmbedError> {
    DomContainer::element_of(container)
        .map(JsValue::from)
        .ok_or_else(|| EmbedError::widget(embedder, "container is not a DOM element"))
}

/// `window.twttr.widgets`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalTwitterWidgets;

impl TwitterWidgets for GlobalTwitterWidgets {
    fn create_tweet(
        &self,
        status: &str,
        container: &Rc<dyn Container>,
        options: &TweetOptions,
    ) -> Result<(), EmbedError> {
        let element = container_element("twitter", container)?;
        let options = serde_json::to_string(options)
            .map_err(|e| EmbedError::widget("twitter", e.to_string()))?;
        let options = js_sys::JSON::parse(&options)
            .map_err(|e| EmbedError::widget("twitter", format!("{e:?}")))?;
        let (this, create) = method(&[twitter::SCRIPT_GLOBAL, "widgets", "createTweet"])
            .map_err(|e| EmbedError::widget("twitter", e))?;

        let promise = create
            .call3(&this, &JsValue::from_str(status), &element, &options)
            .map_err(|e| EmbedError::widget("twitter", format!("{e:?}")))?;

        if let Ok(promise) = promise.dyn_into::<js_sys::Promise>() {
            let status = status.to_string();
            wasm_bindgen_futures::spawn_local(async move {
                match JsFuture::from(promise).await {
                    Ok(value) if value.is_undefined() => {
                        tracing::warn!(%status, "tweet could not be rendered (deleted or private?)")
                    }
                    Ok(_) => tracing::trace!(%status, "tweet rendered"),
                    Err(e) => tracing::warn!(%status, "createTweet rejected: {:?}", e),
                }
            });
        }
        Ok(())
    }

    fn load(&self) -> Result<(), EmbedError> {
        let (this, load) = method(&[twitter::SCRIPT_GLOBAL, "widgets", "load"])
            .map_err(|e| EmbedError::widget("twitter", e))?;
        load.call0(&this)
            .map_err(|e| EmbedError::widget("twitter", format!("{e:?}")))?;
        Ok(())
    }
}

/// `window.Dropbox`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalDropboxDropins;

impl DropboxDropins for GlobalDropboxDropins {
    fn embed(&self, link: &str, container: &Rc<dyn Container>) -> Result<(), EmbedError> {
        let element = container_element("dropbox", container)?;
        let (this, embed) = method(&[dropbox::SCRIPT_GLOBAL, "embed"])
            .map_err(|e| EmbedError::widget("dropbox", e))?;

        let options = Object::new();
        Reflect::set(&options, &JsValue::from_str("link"), &JsValue::from_str(link))
            .map_err(|e| EmbedError::widget("dropbox", format!("{e:?}")))?;
        embed
            .call2(&this, &options, &element)
            .map_err(|e| EmbedError::widget("dropbox", format!("{e:?}")))?;
        Ok(())
    }
}
