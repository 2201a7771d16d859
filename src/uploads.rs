//! Upload service selections and the defaults recovered from a previous config.

use crate::recorder_config::{RDIO_PLUGIN_NAME, TrunkRecorderConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcastify {
    pub api_key: String,
    pub system_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenMhz {
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdioScanner {
    pub server: String,
    pub api_key: String,
    pub short_name: String,
    pub system_id: i64,
}

/// Services the operator enabled; `None` means disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadConfig {
    pub broadcastify: Option<Broadcastify>,
    pub openmhz: Option<OpenMhz>,
    pub rdio: Option<RdioScanner>,
}

impl UploadConfig {
    pub fn any_enabled(&self) -> bool {
        self.broadcastify.is_some() || self.openmhz.is_some() || self.rdio.is_some()
    }
}

/// Values from an earlier config.json, offered as prompt defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviousUploads {
    pub broadcastify_api_key: Option<String>,
    pub broadcastify_system_id: Option<String>,
    pub openmhz_api_key: Option<String>,
    pub rdio_server: Option<String>,
    pub rdio_api_key: Option<String>,
    pub rdio_short_name: Option<String>,
    pub rdio_system_id: Option<String>,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl PreviousUploads {
    pub fn from_config(config: &TrunkRecorderConfig) -> Self {
        let mut previous = Self::default();

        if let Some(system) = config.systems.first() {
            previous.broadcastify_api_key = system.broadcastify_api_key.as_deref().and_then(non_empty);
            previous.broadcastify_system_id = system.broadcastify_system_id.map(|id| id.to_string());
            previous.openmhz_api_key = system.api_key.as_deref().and_then(non_empty);
        }

        // Last matching plugin wins
        for plugin in config.plugins.iter().filter(|p| p.name == RDIO_PLUGIN_NAME) {
            previous.rdio_server = non_empty(&plugin.server);
            if let Some(system) = plugin.systems.first() {
                previous.rdio_api_key = non_empty(&system.api_key);
                previous.rdio_short_name = non_empty(&system.short_name);
                previous.rdio_system_id = Some(system.system_id.to_string());
            }
        }

        previous
    }
}
