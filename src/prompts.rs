//! Interactive prompts: system confirmation, site selection and upload service setup.
//! Defaults come from an explicit `PreviousUploads` value; nothing here reads files.

use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Select};
use tracing::warn;

use crate::feed::Site;
use crate::radioreference::SystemInfo;
use crate::uploads::{Broadcastify, OpenMhz, PreviousUploads, RdioScanner, UploadConfig};

const DEFAULT_RDIO_SYSTEM_ID: i64 = 1;
const DETAILS_WIDTH: usize = 47;

/// How the site is picked before any prompting happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteChoice {
    /// The site id given on the command line.
    Requested(usize),
    /// The requested id was not found; first site used instead.
    Fallback(usize),
    /// Only one site exists.
    Only(usize),
    /// Several sites and no request: the operator chooses.
    Ask,
}

pub fn choose_site(sites: &[Site], requested: Option<&str>) -> SiteChoice {
    if let Some(id) = requested {
        return match sites.iter().position(|s| s.id == id) {
            Some(i) => SiteChoice::Requested(i),
            None => SiteChoice::Fallback(0),
        };
    }
    if sites.len() == 1 {
        SiteChoice::Only(0)
    } else {
        SiteChoice::Ask
    }
}

pub fn confirm_system(info: &SystemInfo) -> Result<bool> {
    println!("\n📡 System Found:");
    println!("   Name: {}", info.name);
    println!("   Location: {}", info.location);
    println!("   SID: {}", info.sid);

    Confirm::new()
        .with_prompt("Is this the correct system?")
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

/// One table row per site: id, description, NAC and the joined detail columns.
pub fn site_label(site: &Site) -> String {
    let details: Vec<&str> = site
        .details
        .iter()
        .map(|d| d.as_str())
        .filter(|d| !d.is_empty())
        .collect();
    let mut details = details.join(" | ");
    if details.chars().count() > DETAILS_WIDTH {
        details = details.chars().take(DETAILS_WIDTH).collect::<String>() + "...";
    }
    format!("{:<6} {:<30} {:<6} {}", site.id, site.description, site.nac, details)
}

/// Resolves the site to use, asking the operator only when it is ambiguous.
pub fn select_site<'a>(sites: &'a [Site], requested: Option<&str>) -> Result<&'a Site> {
    if sites.is_empty() {
        anyhow::bail!("No sites to select from");
    }
    let index = match choose_site(sites, requested) {
        SiteChoice::Requested(i) => {
            println!("Using specified site: {} (ID: {})", sites[i].description, sites[i].id);
            i
        }
        SiteChoice::Fallback(i) => {
            warn!(
                "Site ID {} not found, using first available site",
                requested.unwrap_or_default()
            );
            i
        }
        SiteChoice::Only(i) => {
            println!("Using site: {} (ID: {})", sites[i].description, sites[i].id);
            i
        }
        SiteChoice::Ask => {
            println!("\n📍 Multiple sites found:");
            println!("{:<6} {:<30} {:<6} {}", "ID", "Description", "NAC", "Additional Info");
            let labels: Vec<String> = sites.iter().map(site_label).collect();
            Select::new()
                .with_prompt("Select site")
                .items(&labels)
                .default(0)
                .interact()
                .context("Failed to read site selection")?
        }
    };
    sites.get(index).context("Selected site is out of range")
}

pub fn parse_system_id(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

/// Asks which upload services to enable, offering previous values as defaults.
pub struct UploadPrompter<'a> {
    previous: &'a PreviousUploads,
    short_name: &'a str,
}

impl<'a> UploadPrompter<'a> {
    pub fn new(previous: &'a PreviousUploads, short_name: &'a str) -> Self {
        Self {
            previous,
            short_name,
        }
    }

    pub fn prompt(&self) -> Result<UploadConfig> {
        let mut uploads = UploadConfig::default();

        if enable("Use Broadcastify upload?")? {
            let api_key = ask("Broadcastify API Key", self.previous.broadcastify_api_key.as_deref())?;
            let id = ask("Broadcastify System ID", self.previous.broadcastify_system_id.as_deref())?;
            match parse_system_id(&id) {
                Some(system_id) => uploads.broadcastify = Some(Broadcastify { api_key, system_id }),
                None => println!("   Error: Broadcastify System ID must be a number"),
            }
        }

        if enable("Use OpenMHz upload?")? {
            let api_key = ask("OpenMHz API Key", self.previous.openmhz_api_key.as_deref())?;
            uploads.openmhz = Some(OpenMhz { api_key });
        }

        if enable("Use RDIOScanner upload?")? {
            let server = ask("RDIOScanner Server URL", self.previous.rdio_server.as_deref())?;
            let api_key = ask("RDIOScanner API Key", self.previous.rdio_api_key.as_deref())?;
            let default_name = self
                .previous
                .rdio_short_name
                .as_deref()
                .or((!self.short_name.is_empty()).then_some(self.short_name))
                .unwrap_or("system");
            let short_name = ask("System short name for RDIOScanner", Some(default_name))?;
            let id = ask("RDIOScanner System ID (numeric)", self.previous.rdio_system_id.as_deref())?;
            let system_id = parse_system_id(&id).unwrap_or_else(|| {
                println!("   Error: System ID must be a number, using default {}", DEFAULT_RDIO_SYSTEM_ID);
                DEFAULT_RDIO_SYSTEM_ID
            });
            uploads.rdio = Some(RdioScanner {
                server,
                api_key,
                short_name,
                system_id,
            });
        }

        Ok(uploads)
    }
}

fn enable(prompt: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .interact()
        .with_context(|| format!("Failed to read answer to {:?}", prompt))
}

/// Free-text question. Without a default an empty answer is accepted rather than re-asked.
struct Question<'a> {
    prompt: &'a str,
    default: Option<&'a str>,
}

impl<'a> Question<'a> {
    fn new(prompt: &'a str, default: Option<&'a str>) -> Self {
        Self { prompt, default }
    }

    fn allows_empty(&self) -> bool {
        self.default.is_none()
    }

    fn input(&self) -> Input<'static, String> {
        let input = Input::<String>::new()
            .with_prompt(self.prompt)
            .allow_empty(self.allows_empty());
        match self.default {
            Some(default) => input.default(default.to_string()),
            None => input,
        }
    }
}

fn ask(prompt: &str, default: Option<&str>) -> Result<String> {
    Question::new(prompt, default)
        .input()
        .interact_text()
        .map(|s| s.trim().to_string())
        .with_context(|| format!("Failed to read {}", prompt))
}
