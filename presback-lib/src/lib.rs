use serde::{Deserialize, Serialize};

pub mod display;
pub mod preset;
pub mod sanitise;

pub const DEFAULT_PRESETS_DIR: &str = "Presets";
pub const DEFAULT_OUTPUT_ROOT: &str = "BackUps";
pub const DEFAULT_DATE_FORMAT: &str = "%d.%m.%y";

/// Settings shared by every layer (environment, config file, CLI).
///
/// Every field is optional so layers can be merged field by field; use the
/// accessor methods to read a value with its default applied.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub config: Option<String>,
    pub preset: Option<String>,
    pub presets_dir: Option<String>,
    pub output_root: Option<String>,
    pub date_format: Option<String>,
    pub compress: Option<bool>,
    pub dry: Option<bool>,
    pub progress: Option<bool>,
    pub skip: Option<Vec<String>>,
}

impl Config {
    pub fn presets_dir(&self) -> &str {
        self.presets_dir.as_deref().unwrap_or(DEFAULT_PRESETS_DIR)
    }

    pub fn output_root(&self) -> &str {
        self.output_root.as_deref().unwrap_or(DEFAULT_OUTPUT_ROOT)
    }

    pub fn date_format(&self) -> &str {
        self.date_format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT)
    }

    pub fn compress(&self) -> bool {
        self.compress.unwrap_or(true)
    }

    pub fn dry(&self) -> bool {
        self.dry.unwrap_or(false)
    }

    pub fn progress(&self) -> bool {
        self.progress.unwrap_or(true)
    }

    pub fn skip(&self) -> &[String] {
        self.skip.as_deref().unwrap_or(&[])
    }
}
