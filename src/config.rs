use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::Storage;
use crate::wrap::{WrapStyle, DEFAULT_EXTRA_SPACING, DEFAULT_FONT_SIZE};

/// Where the optional configuration file lives, relative to the data root.
pub const CONFIG_PATH: &str = "data/system/TranslationConfig.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enabled: bool,
    /// Wrap width in pixels; 0 disables word-wrapping.
    pub width: u32,
    pub font_size: u32,
    /// Active language code; empty selects the default language.
    pub current_language: String,
    pub default_language: String,
    /// Folders whose images may have per-language replacements.
    pub image_folders: Vec<String>,
    /// Folder name for translated image siblings.
    pub translation_folder: String,
    /// Folder holding scenarios and their translation tables.
    pub scenario_folder: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            enabled: true,
            width: 0,
            font_size: DEFAULT_FONT_SIZE,
            current_language: String::new(),
            default_language: "jp".to_string(),
            image_folders: vec![
                "title".to_string(),
                "bgimage".to_string(),
                "fgimage".to_string(),
            ],
            translation_folder: "translated".to_string(),
            scenario_folder: "data/scenario".to_string(),
        }
    }
}

impl Config {
    pub fn parse(text: &str) -> Result<Config> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load the configuration from storage, falling back to defaults when
    /// the file is absent or malformed. Never fatal.
    pub fn load(storage: &dyn Storage) -> Config {
        let text = storage.read_text(CONFIG_PATH);
        if text.is_empty() {
            tracing::debug!("no translator configuration at {CONFIG_PATH}, using defaults");
            return Config::default();
        }
        match Config::parse(&text) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("could not parse {CONFIG_PATH}: {err}; using defaults");
                Config::default()
            }
        }
    }

    /// The `_lang` filename suffix for the active language; empty for the
    /// default language.
    pub fn lang_suffix(&self) -> String {
        if self.current_language.is_empty() || self.current_language == self.default_language {
            String::new()
        } else {
            format!("_{}", self.current_language)
        }
    }

    pub fn wrap_style(&self) -> WrapStyle {
        WrapStyle {
            max_width: self.width,
            font_size: self.font_size,
            extra_spacing: DEFAULT_EXTRA_SPACING,
        }
    }
}
