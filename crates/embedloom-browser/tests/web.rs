//! WASM browser tests for embedloom-browser.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`
#![cfg(all(target_arch = "wasm32", target_os = "unknown"))]

use std::rc::Rc;

use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

use embedloom_browser::{
    Container, DomContainer, DomPreview, DomScriptHost, EmbedContext, EmbedNode, EmbedderRegistry,
    LinkElementKind, PreviewDocument, PreviewElement, ScriptHost, ScriptSpec, Settings, Theme, UiTheme,
    DARK_THEME_CLASS, YoutubeEmbedder, body_ui_theme, build_element, document, process_preview,
    publish_widget_meta,
};
use embedloom_core::LoadCallbacks;

fn fixture(html: &str) -> web_sys::Element {
    let document = document().unwrap();
    let root = document.create_element("div").unwrap();
    root.set_inner_html(html);
    document.body().unwrap().append_child(&root).unwrap();
    root
}

fn noop_callbacks() -> LoadCallbacks {
    LoadCallbacks {
        on_load: Box::new(|| {}),
        on_error: Box::new(|_| {}),
    }
}

// === Element building ===

#[wasm_bindgen_test]
fn test_build_element_nested() {
    let document = document().unwrap();
    let node = EmbedNode::new("div")
        .with_attr("class", "outer")
        .with_child(EmbedNode::new("span").with_text("<hi>"));
    let element = build_element(&document, &node).unwrap();
    assert_eq!(
        element.outer_html(),
        r#"<div class="outer"><span>&lt;hi&gt;</span></div>"#
    );
}

#[wasm_bindgen_test]
fn test_dom_container_lifecycle() {
    let document = document().unwrap();
    let container = DomContainer::create(&document, "embed-container").unwrap();
    assert!(!container.is_attached());

    document.body().unwrap().append_child(container.element()).unwrap();
    assert!(container.is_attached());

    container.set_style("height: 450px;");
    container.append(&EmbedNode::new("iframe").with_attr("src", "about:blank"));
    assert_eq!(container.element().child_element_count(), 1);
    assert_eq!(
        container.element().style().get_property_value("height").unwrap(),
        "450px"
    );

    container.clear();
    assert_eq!(container.element().child_element_count(), 0);

    container.detach();
    assert!(!container.is_attached());
    container.detach();
}

#[wasm_bindgen_test]
fn test_element_of_shared_container() {
    let document = document().unwrap();
    let container: Rc<dyn Container> =
        Rc::new(DomContainer::create(&document, "x").unwrap());
    assert!(DomContainer::element_of(&container).is_some());

    let memory: Rc<dyn Container> = Rc::new(embedloom_core::MemoryContainer::new("x"));
    assert!(DomContainer::element_of(&memory).is_none());
}

// === Script host ===

#[wasm_bindgen_test]
fn test_inject_creates_one_element() {
    let host = DomScriptHost::new(document().unwrap());
    let spec = ScriptSpec::new("embedloom-test-js", "about:blank", "__embedloomTest")
        .with_attr("data-app-key", "abc");

    assert!(!host.has_element("embedloom-test-js"));
    host.inject(&spec, noop_callbacks()).unwrap();
    assert!(host.has_element("embedloom-test-js"));

    let element = document()
        .unwrap()
        .get_element_by_id("embedloom-test-js")
        .unwrap();
    assert_eq!(element.get_attribute("data-app-key").as_deref(), Some("abc"));

    host.remove("embedloom-test-js");
    assert!(!host.has_element("embedloom-test-js"));
}

#[wasm_bindgen_test]
fn test_global_ready() {
    let host = DomScriptHost::new(document().unwrap());
    assert!(!host.global_ready("__embedloomGlobal"));
    js_sys::Reflect::set(
        &js_sys::global(),
        &JsValue::from_str("__embedloomGlobal"),
        &js_sys::Object::new(),
    )
    .unwrap();
    assert!(host.global_ready("__embedloomGlobal"));
}

#[wasm_bindgen_test]
fn test_listen_to_missing_element_errors() {
    let host = DomScriptHost::new(document().unwrap());
    assert!(host.listen("embedloom-nope", noop_callbacks()).is_err());
}

// === Preview ===

#[wasm_bindgen_test]
fn test_preview_link_elements() {
    let root = fixture(
        r#"<p><a class="external-link" href="https://youtu.be/abc">v</a>
        <a class="internal-link" href="note">n</a>
        <img src="https://example.com/cat.png"></p>"#,
    );
    let preview = DomPreview::new(root);
    let links = preview.link_elements();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].kind(), LinkElementKind::Anchor);
    assert_eq!(links[0].target().as_deref(), Some("https://youtu.be/abc"));
    assert_eq!(links[1].kind(), LinkElementKind::Image);
}

#[wasm_bindgen_test]
fn test_process_preview_replaces_link() {
    let root = fixture(
        r#"<p><a class="external-link" href="https://youtu.be/abc">v</a>
        <a class="external-link" href="https://example.com">e</a></p>"#,
    );
    let registry = EmbedderRegistry::new().with(Rc::new(YoutubeEmbedder));
    let settings = Settings::default();
    let ctx = EmbedContext::new(UiTheme::Dark, &settings);

    let report = process_preview(&DomPreview::new(root.clone()), &registry, &ctx);
    assert_eq!(report.embedded.len(), 1);
    assert_eq!(report.skipped, 1);

    let embed = root.query_selector("div.easy-embed-youtube").unwrap().unwrap();
    assert_eq!(embed.class_name(), "easy-embed easy-embed-youtube");
    assert!(embed.query_selector("iframe").unwrap().is_some());
    assert!(root.query_selector("a[href=\"https://youtu.be/abc\"]").unwrap().is_none());
}

// === Meta tags ===

#[wasm_bindgen_test]
fn test_publish_widget_meta_upserts() {
    let root = fixture("");
    let settings = Settings {
        theme: Theme::Auto,
        ..Settings::default()
    };
    publish_widget_meta(&root, &settings.widget_meta(UiTheme::Dark)).unwrap();
    publish_widget_meta(&root, &settings.widget_meta(UiTheme::Light)).unwrap();

    let metas = root.query_selector_all("meta").unwrap();
    assert_eq!(metas.length(), 2);
    let theme = root
        .query_selector("meta[name=\"twitter:widgets:theme\"]")
        .unwrap()
        .unwrap();
    assert_eq!(theme.get_attribute("content").as_deref(), Some("light"));
}

#[wasm_bindgen_test]
fn test_body_ui_theme() {
    let document = document().unwrap();
    let body = document.body().unwrap();
    body.class_list().remove_1(DARK_THEME_CLASS).unwrap();
    assert_eq!(body_ui_theme(&document), UiTheme::Light);
    body.class_list().add_1(DARK_THEME_CLASS).unwrap();
    assert_eq!(body_ui_theme(&document), UiTheme::Dark);
    body.class_list().remove_1(DARK_THEME_CLASS).unwrap();
}
