//! Files written next to config.json: talkgroup CSV variants, siteinfo.json and siteid.txt.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::PlanResult;
use crate::feed::{Site, join_record, split_record};
use crate::partition::receivers_needed;
use crate::plan::{Hz, to_mhz};
use crate::radioreference::SystemInfo;

const DESCRIPTION_COLUMN: usize = 4;
const CATEGORY_COLUMN: usize = 6;
const OPENMHZ_DESCRIPTION_LEN: usize = 25;

/// Rewrites the raw talkgroup feed: categories are prefixed with the system abbreviation and,
/// for OpenMHz, descriptions are cut to 25 characters. The header row passes through unchanged.
pub fn rewrite_talkgroups(raw: &str, abbrev: &str, truncate_description: bool) -> String {
    let abbrev = abbrev.to_uppercase();
    let mut out = String::new();

    for (i, line) in raw.trim().lines().enumerate() {
        let mut row = split_record(line);
        if i > 0 {
            if let Some(category) = row.get_mut(CATEGORY_COLUMN) {
                *category = if category.trim().is_empty() {
                    abbrev.clone()
                } else {
                    format!("{} - {}", abbrev, category)
                };
            }
            if truncate_description {
                if let Some(description) = row.get_mut(DESCRIPTION_COLUMN) {
                    *description = description.chars().take(OPENMHZ_DESCRIPTION_LEN).collect();
                }
            }
        }
        out.push_str(&join_record(&row));
        out.push_str("\r\n");
    }
    out
}

/// Writes talkgroup.csv, plus the RDIOScanner and OpenMHz variants unless `update_only`.
pub fn write_talkgroup_files(raw: &str, abbrev: &str, dir: &Path, update_only: bool) -> Result<Vec<PathBuf>> {
    let mut variants = vec![("talkgroup.csv", false)];
    if !update_only {
        variants.push(("talkgroup-rdio.csv", false));
        variants.push(("talkgroup-openmhz.csv", true));
    }

    variants
        .into_iter()
        .map(|(name, truncate)| {
            let path = dir.join(name);
            std::fs::write(&path, rewrite_talkgroups(raw, abbrev, truncate))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(path)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyRange {
    pub min_mhz: f64,
    pub max_mhz: f64,
    pub span_mhz: f64,
}

/// Contents of siteinfo.json.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteInfo {
    pub system_name: String,
    pub system_location: String,
    pub sid: u32,
    pub siteid: String,
    pub nac: Option<String>,
    pub control_channels: Vec<Hz>,
    pub all_frequencies: Vec<Hz>,
    pub frequency_range: FrequencyRange,
    pub rtl_sdr_count: usize,
}

impl SiteInfo {
    pub fn new(system: &SystemInfo, site: &Site, bandwidth: Hz) -> PlanResult<Self> {
        let min = site.frequencies.iter().copied().min().unwrap_or(0);
        let max = site.frequencies.iter().copied().max().unwrap_or(0);
        Ok(Self {
            system_name: system.name.clone(),
            system_location: system.location.clone(),
            sid: system.sid,
            siteid: site.id.clone(),
            nac: (!site.nac.is_empty()).then(|| format!("0x{}", site.nac)),
            control_channels: site.control_channels.clone(),
            all_frequencies: site.frequencies.clone(),
            frequency_range: FrequencyRange {
                min_mhz: to_mhz(min),
                max_mhz: to_mhz(max),
                span_mhz: to_mhz(max - min),
            },
            rtl_sdr_count: receivers_needed(max - min, bandwidth)?,
        })
    }
}

/// Relative paths are taken from `dir`.
fn resolve(dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

/// Writes siteinfo.json to the first of `paths` that accepts it.
pub fn write_site_info(info: &SiteInfo, paths: &[PathBuf], dir: &Path) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(info).context("Failed to serialize site information")?;
    let mut last_error = None;

    for path in paths.iter().map(|p| resolve(dir, p)) {
        match std::fs::write(&path, &json) {
            Ok(()) => return Ok(path),
            Err(e) => {
                debug!("Could not write {}: {}", path.display(), e);
                last_error = Some(anyhow::Error::new(e).context(format!("Failed to write {}", path.display())));
            }
        }
    }

    warn!("Could not save site information to any location");
    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("No siteinfo.json location configured")))
}

/// Saves the selected site id for later `--siteid` runs.
pub fn write_site_id(dir: &Path, site_id: &str) -> Result<PathBuf> {
    let path = dir.join("siteid.txt");
    std::fs::write(&path, site_id).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
