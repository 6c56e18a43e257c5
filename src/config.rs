//! Engine configuration: timezone, streak policy, due-soon windows and named
//! threshold tables.
//!
//! Configuration is always passed explicitly. `load_config` reads the JSON
//! file; nothing in the crate reads it implicitly.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::{self, ThresholdTable};
use crate::error::EngineError;
use crate::normalize::DayNormalizer;
use crate::schedule::ProximityWindows;
use crate::streak::StreakPolicy;

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// IANA name of the reference timezone for day keys.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Read timestamps without an offset as UTC instead of rejecting them.
    #[serde(default)]
    pub assume_utc_for_naive: bool,
    #[serde(default)]
    pub streak: StreakPolicy,
    #[serde(default)]
    pub proximity: ProximityWindows,
    /// Named threshold tables. Built-in presets ("conspiracy", "expiry")
    /// are available without being listed here.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub thresholds: HashMap<String, ThresholdTable>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            assume_utc_for_naive: false,
            streak: StreakPolicy::default(),
            proximity: ProximityWindows::default(),
            thresholds: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Validate fields serde cannot check on its own. Threshold tables are
    /// validated as they deserialize.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.normalizer()?;
        self.proximity.validate()?;
        Ok(())
    }

    /// Day normalizer for the configured timezone.
    pub fn normalizer(&self) -> Result<DayNormalizer, EngineError> {
        let normalizer = DayNormalizer::from_name(&self.timezone)?;
        Ok(normalizer.assume_utc_for_naive(self.assume_utc_for_naive))
    }

    /// Look up a table by name; configured tables shadow built-in presets.
    pub fn table(&self, name: &str) -> Result<ThresholdTable, EngineError> {
        self.thresholds
            .get(name)
            .cloned()
            .or_else(|| classify::preset(name))
            .ok_or_else(|| EngineError::UnknownTable(name.to_string()))
    }
}

/// Default config location: `~/.cadence/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".cadence").join("config.json"))
}

/// Read, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<EngineConfig, EngineError> {
    let content = fs::read_to_string(path).map_err(|e| EngineError::ConfigRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let config = parse_config(&content)?;
    log::info!(
        "Loaded engine config from {} (timezone {})",
        path.display(),
        config.timezone
    );
    Ok(config)
}

/// Parse and validate config JSON.
pub fn parse_config(content: &str) -> Result<EngineConfig, EngineError> {
    let config: EngineConfig =
        serde_json::from_str(content).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Load the config at `path` if it exists, otherwise fall back to defaults.
pub fn load_config_or_default(path: &Path) -> Result<EngineConfig, EngineError> {
    if !path.exists() {
        log::info!("No engine config at {}, using defaults", path.display());
        return Ok(EngineConfig::default());
    }
    load_config(path)
}
