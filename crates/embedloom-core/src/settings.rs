//! Plugin settings and their persistence.

use std::fmt;
use std::str::FromStr;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SettingsError {
    #[error("invalid value {value:?} for setting `{field}`, expected {expected}")]
    #[diagnostic(
        code(embedloom::settings::invalid),
        help("the default is used instead")
    )]
    Invalid {
        field: SmolStr,
        value: String,
        expected: &'static str,
    },

    #[error("stored settings are not a JSON object")]
    #[diagnostic(code(embedloom::settings::not_an_object))]
    NotAnObject,

    #[error("could not parse settings: {0}")]
    #[diagnostic(code(embedloom::settings::parse))]
    Parse(String),

    #[error("settings storage failed: {0}")]
    #[diagnostic(code(embedloom::settings::store))]
    Store(String),

    #[error("unsupported settings file format: {0}")]
    #[diagnostic(code(embedloom::settings::format), help("use a .json file"))]
    UnsupportedFormat(String),
}

impl From<serde_json::Error> for SettingsError {
    fn from(err: serde_json::Error) -> Self {
        SettingsError::Parse(err.to_string())
    }
}

/// Error for a string that is not one of an enum's spellings.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("expected one of {expected}, got {value:?}")]
pub struct UnknownVariant {
    pub expected: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $first:ident => $first_text:literal
            $(, $variant:ident => $text:literal)* $(,)?
        }
        default $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $first,
            $($variant),*
        }

        impl $name {
            pub const EXPECTED: &'static str =
                concat!("`", $first_text, "`" $(, ", `", $text, "`")*);

            pub fn as_str(&self) -> &'static str {
                match self {
                    $name::$first => $first_text,
                    $($name::$variant => $text),*
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $first_text => Ok($name::$first),
                    $($text => Ok($name::$variant),)*
                    other => Err(UnknownVariant {
                        expected: Self::EXPECTED,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    /// Widget theme. `Auto` follows the host UI.
    pub enum Theme { Light => "light", Dark => "dark", Auto => "auto" }
    default Light
}

string_enum! {
    /// The host application's current UI theme.
    pub enum UiTheme { Light => "light", Dark => "dark" }
    default Light
}

string_enum! {
    /// Whether widgets hide content-security-policy warnings.
    pub enum ContentSecurityPolicy { On => "on", Off => "off" }
    default On
}

string_enum! {
    /// Whether a reply tweet shows its parent.
    pub enum Conversation { All => "all", None => "none" }
    default All
}

string_enum! {
    /// Whether tweets show media and link cards.
    pub enum Cards { Visible => "visible", Hidden => "hidden" }
    default Visible
}

string_enum! {
    pub enum Align { Left => "left", Center => "center", Right => "right" }
    default Center
}

impl Theme {
    pub fn resolve(self, ui: UiTheme) -> UiTheme {
        match self {
            Theme::Light => UiTheme::Light,
            Theme::Dark => UiTheme::Dark,
            Theme::Auto => ui,
        }
    }
}

/// Widget width: `"auto"` or a pixel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "WidthRepr", into = "WidthRepr")]
pub enum Width {
    #[default]
    Auto,
    Pixels(u32),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WidthRepr {
    Pixels(u32),
    Text(String),
}

impl TryFrom<WidthRepr> for Width {
    type Error = UnknownVariant;

    fn try_from(repr: WidthRepr) -> Result<Self, Self::Error> {
        match repr {
            WidthRepr::Pixels(px) => Ok(Width::Pixels(px)),
            WidthRepr::Text(text) => text.parse(),
        }
    }
}

impl From<Width> for WidthRepr {
    fn from(width: Width) -> Self {
        match width {
            Width::Auto => WidthRepr::Text("auto".to_string()),
            Width::Pixels(px) => WidthRepr::Pixels(px),
        }
    }
}

impl FromStr for Width {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "auto" {
            return Ok(Width::Auto);
        }
        s.strip_suffix("px")
            .unwrap_or(s)
            .parse::<u32>()
            .map(Width::Pixels)
            .map_err(|_| UnknownVariant {
                expected: "`auto` or a pixel width",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Width::Auto => f.write_str("auto"),
            Width::Pixels(px) => write!(f, "{px}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DropboxSettings {
    pub app_key: String,
}

/// All persisted settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: Theme,
    pub csp: ContentSecurityPolicy,
    pub conversation: Conversation,
    pub cards: Cards,
    pub width: Width,
    pub align: Align,
    pub dropbox: DropboxSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            csp: ContentSecurityPolicy::On,
            conversation: Conversation::All,
            cards: Cards::Visible,
            width: Width::Auto,
            align: Align::Center,
            dropbox: DropboxSettings::default(),
        }
    }
}

impl Settings {
    /// Merge stored data over the defaults field by field.
    ///
    /// Unknown keys are ignored. A field with an invalid value keeps its
    /// default and is reported in the returned warnings, so one bad entry
    /// never discards the rest.
    pub fn merged_over_defaults(stored: &Value) -> (Settings, Vec<SettingsError>) {
        Settings::default().merged_with(stored)
    }

    /// Apply a partial update over these settings with the same per-field
    /// rules as [`Settings::merged_over_defaults`]. Invalid fields keep their
    /// current value.
    pub fn merged_with(&self, patch: &Value) -> (Settings, Vec<SettingsError>) {
        let mut settings = self.clone();
        let mut warnings = Vec::new();

        let Some(map) = patch.as_object() else {
            if !patch.is_null() {
                warnings.push(SettingsError::NotAnObject);
            }
            return (settings, warnings);
        };

        merge_field(map, "theme", &mut settings.theme, &mut warnings);
        merge_field(map, "csp", &mut settings.csp, &mut warnings);
        merge_field(map, "conversation", &mut settings.conversation, &mut warnings);
        merge_field(map, "cards", &mut settings.cards, &mut warnings);
        merge_field(map, "width", &mut settings.width, &mut warnings);
        merge_field(map, "align", &mut settings.align, &mut warnings);

        match map.get("dropbox") {
            None | Some(Value::Null) => {}
            Some(Value::Object(dropbox)) => {
                merge_field(
                    dropbox,
                    "appKey",
                    &mut settings.dropbox.app_key,
                    &mut warnings,
                );
            }
            Some(other) => warnings.push(SettingsError::Invalid {
                field: "dropbox".into(),
                value: other.to_string(),
                expected: "an object",
            }),
        }

        (settings, warnings)
    }

    /// `<meta>` name/content pairs that configure the Twitter widget script
    /// page-wide.
    pub fn widget_meta(&self, ui: UiTheme) -> [(&'static str, &'static str); 2] {
        [
            ("twitter:widgets:theme", self.theme.resolve(ui).as_str()),
            ("twitter:widgets:csp", self.csp.as_str()),
        ]
    }
}

fn merge_field<T>(
    map: &serde_json::Map<String, Value>,
    key: &str,
    slot: &mut T,
    warnings: &mut Vec<SettingsError>,
) where
    T: serde::de::DeserializeOwned,
{
    let Some(value) = map.get(key) else {
        return;
    };
    if value.is_null() {
        return;
    }
    match serde_json::from_value::<T>(value.clone()) {
        Ok(parsed) => *slot = parsed,
        Err(err) => {
            tracing::warn!(field = key, %value, error = %err, "ignoring invalid setting");
            warnings.push(SettingsError::Invalid {
                field: key.into(),
                value: value.to_string(),
                expected: expected_for(key),
            });
        }
    }
}

fn expected_for(key: &str) -> &'static str {
    match key {
        "theme" => Theme::EXPECTED,
        "csp" => ContentSecurityPolicy::EXPECTED,
        "conversation" => Conversation::EXPECTED,
        "cards" => Cards::EXPECTED,
        "align" => Align::EXPECTED,
        "width" => "`auto` or a pixel width",
        _ => "a string",
    }
}

/// Where settings live between sessions.
pub trait SettingsStore {
    /// Raw stored data, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<Value>, SettingsError>;

    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// Store that keeps the last saved value in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: std::cell::RefCell<Option<Value>>,
    saves: std::cell::Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: Value) -> Self {
        Self {
            data: std::cell::RefCell::new(Some(data)),
            saves: Default::default(),
        }
    }

    pub fn data(&self) -> Option<Value> {
        self.data.borrow().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Option<Value>, SettingsError> {
        Ok(self.data.borrow().clone())
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        *self.data.borrow_mut() = Some(serde_json::to_value(settings)?);
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file_store::FileStore;

#[cfg(not(target_arch = "wasm32"))]
mod file_store {
    use std::path::{Path, PathBuf};

    use serde_json::Value;

    use super::{Settings, SettingsError, SettingsStore};

    /// Settings stored as a JSON file on disk.
    #[derive(Debug, Clone)]
    pub struct FileStore {
        path: PathBuf,
    }

    impl FileStore {
        /// Only `.json` files are supported.
        pub fn new(path: impl AsRef<Path>) -> Self {
            Self {
                path: path.as_ref().to_path_buf(),
            }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        fn check_format(&self) -> Result<(), SettingsError> {
            match self.path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => Ok(()),
                other => Err(SettingsError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                )),
            }
        }
    }

    impl SettingsStore for FileStore {
        fn load(&self) -> Result<Option<Value>, SettingsError> {
            self.check_format()?;
            match std::fs::read_to_string(&self.path) {
                Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(SettingsError::Store(err.to_string())),
            }
        }

        fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
            self.check_format()?;
            let text = serde_json::to_string_pretty(settings)?;
            std::fs::write(&self.path, text).map_err(|err| SettingsError::Store(err.to_string()))
        }
    }
}

/// Loaded settings plus the store they persist to.
pub struct SettingsManager<S: SettingsStore> {
    store: S,
    settings: Settings,
    warnings: Vec<SettingsError>,
}

impl<S: SettingsStore> SettingsManager<S> {
    /// Load once from `store`. A store that fails to load yields defaults
    /// and a warning rather than an error.
    pub fn load(store: S) -> Self {
        let (settings, warnings) = match store.load() {
            Ok(Some(stored)) => Settings::merged_over_defaults(&stored),
            Ok(None) => (Settings::default(), Vec::new()),
            Err(err) => {
                tracing::warn!(error = %err, "could not load settings, using defaults");
                (Settings::default(), vec![err])
            }
        };
        if !warnings.is_empty() {
            tracing::warn!(count = warnings.len(), "settings loaded with warnings");
        }
        Self {
            store,
            settings,
            warnings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Problems found while loading.
    pub fn warnings(&self) -> &[SettingsError] {
        &self.warnings
    }

    /// Mutate and persist. Returns the settings before the change so callers
    /// can react to specific fields (e.g. the Dropbox app key).
    pub fn update(&mut self, f: impl FnOnce(&mut Settings)) -> Result<Settings, SettingsError> {
        let before = self.settings.clone();
        f(&mut self.settings);
        self.store.save(&self.settings)?;
        tracing::debug!(settings = ?self.settings, "settings saved");
        Ok(before)
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: SettingsStore + fmt::Debug> fmt::Debug for SettingsManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsManager")
            .field("store", &self.store)
            .field("settings", &self.settings)
            .field("warnings", &self.warnings)
            .finish()
    }
}
