//! The `EmbedPlugin` class: one instance per host editor/workspace.

use std::rc::Rc;

use embedloom_browser::{
    BrowserWidgetHost, BufferView, Container, DomContainer, DomPreview, DomScriptHost,
    DropboxEmbedder, EmbedContext, EmbedView, EmbedderRegistry, FunctionNotifier,
    GlobalDropboxDropins, GlobalTwitterWidgets, LogNotifier, Notifier, ScriptHost, SettingsManager,
    TextBuffer, TokenSpan, TwitterEmbedder, UiTheme, ViewUpdate, WidgetMounts,
    body_ui_theme, process_preview, publish_widget_meta, render_tweet_block,
};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;

use crate::store::JsSettingsStore;
use crate::types::{
    JsDecoration, JsPreviewReport, JsRange, JsRebuildReport, JsTokenSpan, warning_messages,
};

fn tokens_from(value: JsValue) -> Result<Vec<TokenSpan>, JsError> {
    let spans: Vec<JsTokenSpan> = serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsError::new(&format!("Invalid tokens: {}", e)))?;
    Ok(spans.into_iter().map(TokenSpan::from).collect())
}

/// Link embeds for a host editor and its rendered preview.
#[wasm_bindgen]
pub struct EmbedPlugin {
    settings: SettingsManager<JsSettingsStore>,
    ui_theme: UiTheme,
    twitter: Rc<TwitterEmbedder>,
    dropbox: Rc<DropboxEmbedder>,
    buffer: BufferView,
    view: EmbedView,
    mounts: WidgetMounts,
    widget_host: BrowserWidgetHost,
}

#[wasm_bindgen]
impl EmbedPlugin {
    /// Activate the plugin.
    ///
    /// - `loadSettings(): object | null` returns the persisted settings
    /// - `saveSettings(settings: object): void` persists them
    /// - `placeWidget(element: HTMLElement, pos: number): void` inserts a
    ///   widget container after the line ending at char offset `pos`
    /// - `notice(message: string): void` shows a user-visible notice
    ///
    /// Starts loading the Twitter and Dropbox scripts.
    #[wasm_bindgen(constructor)]
    pub fn new(
        load_settings: js_sys::Function,
        save_settings: js_sys::Function,
        place_widget: js_sys::Function,
        notice: Option<js_sys::Function>,
    ) -> Result<EmbedPlugin, JsError> {
        let document = embedloom_browser::document()
            .map_err(|e| JsError::new(&format!("No document: {:?}", e)))?;

        let settings = SettingsManager::load(JsSettingsStore::new(load_settings, save_settings));
        for warning in settings.warnings() {
            tracing::warn!(%warning, "settings");
        }

        let notifier: Rc<dyn Notifier> = match notice {
            Some(callback) => Rc::new(FunctionNotifier::new(callback)),
            None => Rc::new(LogNotifier),
        };
        let script_host: Rc<dyn ScriptHost> = Rc::new(DomScriptHost::new(document.clone()));
        let twitter = Rc::new(TwitterEmbedder::new(
            script_host.clone(),
            Rc::new(GlobalTwitterWidgets),
            notifier.clone(),
        ));
        let dropbox = Rc::new(DropboxEmbedder::new(
            &settings.settings().dropbox.app_key,
            script_host,
            Rc::new(GlobalDropboxDropins),
            notifier,
        ));
        twitter.ensure_loaded();
        dropbox.ensure_loaded();

        let registry = EmbedderRegistry::standard(twitter.clone(), dropbox.clone());
        tracing::info!(embedders = ?registry.names(), "embed plugin activated");

        let buffer = BufferView::new("", []);
        let view = EmbedView::mount(registry, &buffer);

        Ok(Self {
            settings,
            ui_theme: body_ui_theme(&document),
            twitter,
            dropbox,
            buffer,
            view,
            mounts: WidgetMounts::new(),
            widget_host: BrowserWidgetHost::new(document, place_widget),
        })
    }

    /// Warnings from loading the persisted settings.
    #[wasm_bindgen(js_name = settingsWarnings)]
    pub fn settings_warnings(&self) -> Vec<String> {
        warning_messages(self.settings.warnings())
    }

    #[wasm_bindgen(js_name = getSettings)]
    pub fn get_settings(&self) -> Result<JsValue, JsError> {
        self.settings
            .settings()
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
    }

    /// Apply a partial settings object and persist the result.
    ///
    /// Returns a message for each field that was rejected. A changed Dropbox
    /// app key reloads the Dropbox script; rendered tweets are refreshed.
    #[wasm_bindgen(js_name = updateSettings)]
    pub fn update_settings(&mut self, patch: JsValue) -> Result<Vec<String>, JsError> {
        let patch: Value = serde_wasm_bindgen::from_value(patch)
            .map_err(|e| JsError::new(&format!("Invalid settings: {}", e)))?;
        let (next, warnings) = self.settings.settings().merged_with(&patch);

        let before = self
            .settings
            .update(|settings| *settings = next)
            .map_err(|e| JsError::new(&format!("Could not save settings: {}", e)))?;

        let after = self.settings.settings();
        if before.dropbox.app_key != after.dropbox.app_key {
            self.dropbox.set_app_key(&after.dropbox.app_key);
        }
        if before != *after {
            self.twitter.refresh();
        }
        Ok(warning_messages(&warnings))
    }

    /// `"light"` or `"dark"`.
    #[wasm_bindgen(js_name = setUiTheme)]
    pub fn set_ui_theme(&mut self, theme: &str) -> Result<(), JsError> {
        self.ui_theme = theme
            .parse::<UiTheme>()
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(())
    }

    /// Write the Twitter widget `<meta>` tags under `parent`.
    #[wasm_bindgen(js_name = publishMeta)]
    pub fn publish_meta(&self, parent: &web_sys::Element) -> Result<(), JsError> {
        let tags = self.settings.settings().widget_meta(self.ui_theme);
        publish_widget_meta(parent, &tags)
            .map_err(|e| JsError::new(&format!("Could not publish meta tags: {:?}", e)))
    }

    /// Replace the whole document. The full text is considered visible until
    /// `setVisibleRanges` says otherwise.
    #[wasm_bindgen(js_name = setDocument)]
    pub fn set_document(&mut self, text: &str, tokens: JsValue) -> Result<JsRebuildReport, JsError> {
        let tokens = tokens_from(tokens)?;
        self.buffer = BufferView::new(text, tokens);
        Ok(self.sync(ViewUpdate::doc_changed()))
    }

    /// Replace chars `from..to` with `insert`, along with the re-tokenized
    /// document.
    #[wasm_bindgen(js_name = applyChange)]
    pub fn apply_change(
        &mut self,
        from: usize,
        to: usize,
        insert: &str,
        tokens: JsValue,
    ) -> Result<JsRebuildReport, JsError> {
        let len = self.buffer.text_buffer().len_chars();
        if from > to || to > len {
            return Err(JsError::new(&format!(
                "Change {}..{} out of bounds for document of {} chars",
                from, to, len
            )));
        }
        let tokens = tokens_from(tokens)?;
        let update = self.buffer.apply_change(from..to, insert, tokens);
        Ok(self.sync(update))
    }

    /// Fresh tokens for unchanged text (e.g. the highlighter caught up).
    #[wasm_bindgen(js_name = setTokens)]
    pub fn set_tokens(&mut self, tokens: JsValue) -> Result<JsRebuildReport, JsError> {
        let tokens = tokens_from(tokens)?;
        let update = self.buffer.set_tokens(tokens);
        Ok(self.sync(update))
    }

    /// Report the rendered char ranges. Later `applyChange` calls map them
    /// through each edit until the next report.
    #[wasm_bindgen(js_name = setVisibleRanges)]
    pub fn set_visible_ranges(&mut self, ranges: JsValue) -> Result<JsRebuildReport, JsError> {
        let ranges: Vec<JsRange> = serde_wasm_bindgen::from_value(ranges)
            .map_err(|e| JsError::new(&format!("Invalid ranges: {}", e)))?;
        let update = self
            .buffer
            .set_visible(ranges.into_iter().map(|r| r.from..r.to).collect());
        Ok(self.sync(update))
    }

    /// The current decorations.
    pub fn decorations(&self) -> Result<JsValue, JsError> {
        serde_wasm_bindgen::to_value(&JsDecoration::from_set(self.view.decorations()))
            .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
    }

    /// Swap embeddable links in a rendered preview section for embeds.
    #[wasm_bindgen(js_name = processPreview)]
    pub fn process_preview(&self, root: web_sys::Element) -> JsPreviewReport {
        let ctx = EmbedContext::new(self.ui_theme, self.settings.settings());
        process_preview(&DomPreview::new(root), self.view.registry(), &ctx).into()
    }

    /// Render a `tweet` code block body into `el`. Returns the status ID, or
    /// nothing if an error block was rendered instead.
    #[wasm_bindgen(js_name = renderTweetBlock)]
    pub fn render_tweet_block(&self, source: &str, el: web_sys::HtmlElement) -> Option<String> {
        let container: Rc<dyn Container> = Rc::new(DomContainer::new(el));
        let ctx = EmbedContext::new(self.ui_theme, self.settings.settings());
        render_tweet_block(source, &container, &self.twitter, &ctx).map(|s| s.to_string())
    }

    /// Have `widgets.js` rescan the page for tweet markup.
    #[wasm_bindgen(js_name = refreshTweets)]
    pub fn refresh_tweets(&self) {
        self.twitter.refresh();
    }

    /// Detach every widget. The plugin can keep being used afterwards.
    pub fn unload(&mut self) -> usize {
        let removed = self.mounts.clear();
        tracing::info!(removed, "embed widgets unloaded");
        removed
    }
}

impl EmbedPlugin {
    fn sync(&mut self, update: ViewUpdate) -> JsRebuildReport {
        self.view.update(&self.buffer, update);
        let ctx = EmbedContext::new(self.ui_theme, self.settings.settings());
        let widgets = self
            .mounts
            .reconcile(self.view.decorations(), &self.widget_host, &ctx);
        JsRebuildReport::new(self.view.last_rebuild(), widgets)
    }
}
