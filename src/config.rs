//! Config module.
//! Planner settings: receiver bandwidth, recorder budget, per-source defaults and file locations.
//! Loaded from an optional JSON file (missing keys fall back to defaults), then overridden by CLI flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::allocate::RecorderBudget;
use crate::error::{PlanError, PlanResult};
use crate::plan::Hz;
use crate::radioreference::BASE_URL;

/// Fields copied verbatim into every generated source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceDefaults {
    pub ppm: i32,
    pub gain: f64,
    pub agc: bool,
    pub analog_recorders: u32,
    pub driver: String,
}

impl Default for SourceDefaults {
    fn default() -> Self {
        Self {
            ppm: 0,
            gain: 49.0,
            agc: false,
            analog_recorders: 0,
            driver: "osmosdr".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Instantaneous bandwidth of every receiver, in Hz.
    pub bandwidth: Hz,
    pub budget: RecorderBudget,
    pub source: SourceDefaults,
    pub talkgroups_file: String,
    pub capture_dir: String,
    pub log_dir: String,
    pub base_url: String,
    /// Searched in order for a previous config.json to offer upload defaults from.
    pub previous_config_paths: Vec<PathBuf>,
    /// Tried in order when writing siteinfo.json; relative paths land in the output directory.
    pub siteinfo_paths: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bandwidth: 2_400_000,
            budget: RecorderBudget::default(),
            source: SourceDefaults::default(),
            talkgroups_file: "/etc/trunk-recorder/talkgroup.csv".to_string(),
            capture_dir: "/trunkrecorder/recordings".to_string(),
            log_dir: "/trunkrecorder/logs".to_string(),
            base_url: BASE_URL.to_string(),
            previous_config_paths: vec![
                PathBuf::from("/etc/trunk-recorder/config.json"),
                PathBuf::from("config.json"),
            ],
            siteinfo_paths: vec![
                PathBuf::from("/etc/trunk-recorder/siteinfo.json"),
                PathBuf::from("siteinfo.json"),
            ],
        }
    }
}

impl Settings {
    /// Reads settings from `path`, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    /// Checks the values every command relies on, after CLI overrides are applied.
    pub fn validate(&self) -> PlanResult<()> {
        if self.bandwidth == 0 {
            return Err(PlanError::InvalidBandwidth {
                bandwidth: self.bandwidth,
            });
        }
        self.budget.validate()
    }
}
