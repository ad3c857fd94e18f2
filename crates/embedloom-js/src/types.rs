//! Types exposed to JavaScript via wasm-bindgen.

use embedloom_core::{
    DecorationSet, PreviewReport, ReconcileReport, Rebuild, SettingsError, TokenSpan,
};
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

/// A highlighter token, in char offsets.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct JsTokenSpan {
    pub from: usize,
    pub to: usize,
    /// Space-separated token classes, e.g. `"url"` or `"string url"`.
    #[serde(default)]
    pub classes: String,
}

impl From<JsTokenSpan> for TokenSpan {
    fn from(span: JsTokenSpan) -> Self {
        TokenSpan::new(span.from..span.to, span.classes)
    }
}

/// A visible char range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct JsRange {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct JsDecoration {
    pub pos: usize,
    pub url: String,
    pub embedder: String,
}

impl JsDecoration {
    pub fn from_set(set: &DecorationSet) -> Vec<Self> {
        set.iter()
            .map(|d| JsDecoration {
                pos: d.pos,
                url: d.widget.url().to_string(),
                embedder: d.widget.embedder().name().to_string(),
            })
            .collect()
    }
}

/// Widget reconcile counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct JsWidgetCounts {
    pub created: usize,
    pub reused: usize,
    pub removed: usize,
    pub failed: usize,
}

impl From<ReconcileReport> for JsWidgetCounts {
    fn from(r: ReconcileReport) -> Self {
        Self {
            created: r.created,
            reused: r.reused,
            removed: r.removed,
            failed: r.failed,
        }
    }
}

/// Result of one decoration rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct JsRebuildReport {
    pub decorations: Vec<JsDecoration>,
    /// False if any visible range was lost to a tree error.
    pub complete: bool,
    pub diagnostics: Vec<String>,
    pub widgets: JsWidgetCounts,
}

impl JsRebuildReport {
    pub fn new(rebuild: &Rebuild, widgets: ReconcileReport) -> Self {
        Self {
            decorations: JsDecoration::from_set(&rebuild.decorations),
            complete: rebuild.is_complete(),
            diagnostics: rebuild.diagnostics().map(|d| d.to_string()).collect(),
            widgets: widgets.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct JsPreviewEmbed {
    pub url: String,
    pub embedder: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct JsPreviewReport {
    pub embedded: Vec<JsPreviewEmbed>,
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl From<PreviewReport> for JsPreviewReport {
    fn from(report: PreviewReport) -> Self {
        Self {
            embedded: report
                .embedded
                .into_iter()
                .map(|e| JsPreviewEmbed {
                    url: e.url,
                    embedder: e.embedder.to_string(),
                })
                .collect(),
            skipped: report.skipped,
            errors: report.errors.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Messages for settings that were ignored on load or update.
pub fn warning_messages(warnings: &[SettingsError]) -> Vec<String> {
    warnings.iter().map(|w| w.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_span_conversion() {
        let span: TokenSpan = JsTokenSpan {
            from: 3,
            to: 10,
            classes: "string url".into(),
        }
        .into();
        assert_eq!(span.range, 3..10);
        assert_eq!(span.classes, "string url");
    }

    #[test]
    fn test_token_span_classes_default() {
        let span: JsTokenSpan = serde_json::from_str(r#"{"from":0,"to":4}"#).unwrap();
        assert_eq!(span.classes, "");
    }

    #[test]
    fn test_rebuild_report_shape() {
        let report = JsRebuildReport {
            decorations: vec![JsDecoration {
                pos: 20,
                url: "https://youtu.be/abc".into(),
                embedder: "youtube".into(),
            }],
            complete: true,
            diagnostics: vec![],
            widgets: JsWidgetCounts {
                created: 1,
                ..Default::default()
            },
        };
        insta::assert_snapshot!(
            serde_json::to_string(&report).unwrap(),
            @r#"{"decorations":[{"pos":20,"url":"https://youtu.be/abc","embedder":"youtube"}],"complete":true,"diagnostics":[],"widgets":{"created":1,"reused":0,"removed":0,"failed":0}}"#
        );
    }
}
