//! trunk-recorder `config.json` document.
//! Built from an allocation plan plus the pass-through fields trunk-recorder needs, and loaded back
//! for upload defaults and analysis. Unknown keys are ignored on load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::plan::{AllocationPlan, Hz};
use crate::uploads::UploadConfig;

const BROADCASTIFY_CALLS_SERVER: &str = "https://api.broadcastify.com/call-upload";
const OPENMHZ_UPLOAD_SERVER: &str = "https://api.openmhz.com";
pub const RDIO_PLUGIN_NAME: &str = "rdioscanner_uploader";
const RDIO_PLUGIN_LIBRARY: &str = "librdioscanner_uploader.so";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrunkRecorderConfig {
    pub ver: u32,
    pub sources: Vec<Source>,
    pub systems: Vec<System>,
    pub capture_dir: String,
    pub log_level: String,
    pub broadcast_signals: bool,
    pub frequency_format: String,
    pub log_file: bool,
    pub log_dir: String,
    pub call_timeout: u32,
    pub transmission_timeout: u32,
    pub audio_format: String,
    pub remove_recording: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcastify_calls_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_server: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<Plugin>,
}

impl Default for TrunkRecorderConfig {
    fn default() -> Self {
        Self {
            ver: 2,
            sources: Vec::new(),
            systems: Vec::new(),
            capture_dir: "/trunkrecorder/recordings".to_string(),
            log_level: "info".to_string(),
            broadcast_signals: true,
            frequency_format: "mhz".to_string(),
            log_file: true,
            log_dir: "/trunkrecorder/logs".to_string(),
            call_timeout: 120,
            transmission_timeout: 30,
            audio_format: "wav".to_string(),
            remove_recording: true,
            broadcastify_calls_server: None,
            upload_server: None,
            plugins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Source {
    pub center: Hz,
    pub rate: Hz,
    pub ppm: i32,
    pub gain: f64,
    pub agc: bool,
    pub digital_recorders: u32,
    pub analog_recorders: u32,
    pub driver: String,
    pub device: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct System {
    #[serde(rename = "control_channels")]
    pub control_channels: Vec<Hz>,
    #[serde(rename = "type")]
    pub system_type: String,
    pub digital_levels: u32,
    pub talkgroups_file: String,
    pub short_name: String,
    pub modulation: String,
    pub hide_encrypted: bool,
    pub talkgroup_display_format: String,
    pub compress_wav: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nac: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcastify_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcastify_system_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for System {
    fn default() -> Self {
        Self {
            control_channels: Vec::new(),
            system_type: "p25".to_string(),
            digital_levels: 1,
            talkgroups_file: String::new(),
            short_name: String::new(),
            modulation: "qpsk".to_string(),
            hide_encrypted: false,
            talkgroup_display_format: "id_tag".to_string(),
            compress_wav: true,
            nac: None,
            broadcastify_api_key: None,
            broadcastify_system_id: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Plugin {
    pub name: String,
    pub library: String,
    pub server: String,
    pub systems: Vec<PluginSystem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginSystem {
    pub short_name: String,
    pub api_key: String,
    pub system_id: i64,
}

/// Parses a NAC as written in the sites feed (`"1A3"` or `"0x1A3"`).
pub fn parse_nac(nac: &str) -> Option<u32> {
    let digits = nac.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    u32::from_str_radix(digits, 16).ok()
}

impl TrunkRecorderConfig {
    /// Builds the document for one P25 system from an allocated plan.
    pub fn from_plan(
        plan: &AllocationPlan,
        control_channels: &[Hz],
        nac: Option<&str>,
        short_name: &str,
        settings: &Settings,
    ) -> Self {
        let sources = plan
            .receivers
            .iter()
            .map(|rx| Source {
                center: rx.center,
                rate: rx.bandwidth,
                ppm: settings.source.ppm,
                gain: settings.source.gain,
                agc: settings.source.agc,
                digital_recorders: rx.recorder_count,
                analog_recorders: settings.source.analog_recorders,
                driver: settings.source.driver.clone(),
                device: format!("rtl={}", rx.index),
            })
            .collect();

        let nac = nac.and_then(|raw| {
            let parsed = parse_nac(raw);
            if parsed.is_none() {
                warn!(nac = raw, "ignoring unparseable NAC");
            }
            parsed
        });

        let system = System {
            control_channels: control_channels.to_vec(),
            talkgroups_file: settings.talkgroups_file.clone(),
            short_name: short_name.to_string(),
            nac,
            ..System::default()
        };

        Self {
            sources,
            systems: vec![system],
            capture_dir: settings.capture_dir.clone(),
            log_dir: settings.log_dir.clone(),
            ..Self::default()
        }
    }

    /// Adds the upload service settings chosen by the operator.
    pub fn apply_uploads(&mut self, uploads: &UploadConfig) {
        if let Some(system) = self.systems.first_mut() {
            if let Some(broadcastify) = &uploads.broadcastify {
                system.broadcastify_api_key = Some(broadcastify.api_key.clone());
                system.broadcastify_system_id = Some(broadcastify.system_id);
            }
            if let Some(openmhz) = &uploads.openmhz {
                system.api_key = Some(openmhz.api_key.clone());
            }
        }
        if uploads.broadcastify.is_some() {
            self.broadcastify_calls_server = Some(BROADCASTIFY_CALLS_SERVER.to_string());
        }
        if uploads.openmhz.is_some() {
            self.upload_server = Some(OPENMHZ_UPLOAD_SERVER.to_string());
        }
        if let Some(rdio) = &uploads.rdio {
            self.plugins.push(Plugin {
                name: RDIO_PLUGIN_NAME.to_string(),
                library: RDIO_PLUGIN_LIBRARY.to_string(),
                server: rdio.server.clone(),
                systems: vec![PluginSystem {
                    short_name: rdio.short_name.clone(),
                    api_key: rdio.api_key.clone(),
                    system_id: rdio.system_id,
                }],
            });
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// First of `paths` that can be read and parsed.
    pub fn load_previous(paths: &[PathBuf]) -> Option<(PathBuf, Self)> {
        paths.iter().find_map(|path| match Self::load(path) {
            Ok(config) => Some((path.clone(), config)),
            Err(e) => {
                debug!("No previous config at {}: {:#}", path.display(), e);
                None
            }
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }
}
