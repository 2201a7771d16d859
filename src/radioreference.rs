//! RadioReference.com client
//! Logs in with a cookie-backed session, looks up a trunked system by SID and downloads the
//! talkgroup and site CSV feeds. Parsing of the feeds lives in `feed`.
//! Latency: a few hundred ms per request (network dependent)

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{info, warn};

pub const BASE_URL: &str = "https://www.radioreference.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const MAX_RETRIES: u32 = 2; // Retries for network errors and 5xx responses
const RETRY_DELAY_MS: u64 = 500;
const TIMEOUT_SECS: u64 = 30;
const LOGGED_IN_MARKERS: [&str; 3] = ["logout", "sign out", "my account"];
const MAX_LOCATION_LEN: usize = 50;

// *************** Types ***************

/// Basic facts about a system, scraped from its database page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub sid: u32,
    pub name: String,
    pub location: String,
}

pub struct RadioReference {
    client: Client,
    base_url: String,
}

// *************** Public API ***************

impl RadioReference {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Authenticates the session. Fails if the response page does not look logged in.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let form = [
            ("username", username),
            ("password", password),
            ("action", "auth"),
            ("redirect", BASE_URL),
        ];
        let response = self
            .client
            .post(format!("{}/login/", self.base_url))
            .form(&form)
            .send()
            .await
            .context("Failed to send login request to RadioReference")?;

        let body = response
            .text()
            .await
            .context("Failed to read login response")?
            .to_lowercase();

        if !LOGGED_IN_MARKERS.iter().any(|m| body.contains(m)) {
            anyhow::bail!("Failed to login to RadioReference.com - check your username and password");
        }
        info!("Logged into RadioReference.com");
        Ok(())
    }

    /// Name and location of system `sid`, or `None` if the page does not exist.
    pub async fn system_info(&self, sid: u32) -> Result<Option<SystemInfo>> {
        let response = self.get(&format!("/db/sid/{}", sid)).await?;
        if response.status() != StatusCode::OK {
            return Ok(None);
        }
        let html = response
            .text()
            .await
            .context("Failed to read system page")?;

        Ok(Some(SystemInfo {
            sid,
            name: scrape_system_name(&html),
            location: scrape_location(&html),
        }))
    }

    pub async fn talkgroups_csv(&self, sid: u32) -> Result<String> {
        self.download_csv(&format!("/db/download/trs/tgs/?type=csv&sid={}", sid), "talkgroups", sid)
            .await
    }

    pub async fn sites_csv(&self, sid: u32) -> Result<String> {
        self.download_csv(&format!("/db/download/trs/sites/?type=csv&sid={}", sid), "sites", sid)
            .await
    }
}

// *************** Internal Functions ***************

impl RadioReference {
    async fn download_csv(&self, path: &str, what: &str, sid: u32) -> Result<String> {
        let response = self.get(path).await?;
        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to download {} CSV for SID {}: HTTP {}",
                what,
                sid,
                response.status()
            );
        }
        response
            .text()
            .await
            .with_context(|| format!("Failed to read {} CSV for SID {}", what, sid))
    }

    /// GET with retry on transport errors and server errors. Client errors are returned as-is.
    async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES + 1 {
            match self.client.get(&url).send().await {
                Ok(response) if !response.status().is_server_error() => return Ok(response),
                Ok(response) => {
                    warn!(
                        "GET {} attempt {}/{} failed: HTTP {}",
                        path,
                        attempt,
                        MAX_RETRIES + 1,
                        response.status()
                    );
                    last_error = Some(anyhow::anyhow!("HTTP {} from {}", response.status(), url));
                }
                Err(e) => {
                    warn!("GET {} attempt {}/{} failed: {}", path, attempt, MAX_RETRIES + 1, e);
                    last_error = Some(anyhow::Error::new(e).context(format!("Request to {} failed", url)));
                }
            }
            if attempt <= MAX_RETRIES {
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request to {} failed", url)))
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&#039;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

fn scrape_system_name(html: &str) -> String {
    let title = Regex::new(r"(?is)<title[^>]*>(.*?)</title>")
        .ok()
        .and_then(|re| re.captures(html))
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(m.as_str().trim()));

    match title {
        Some(t) if t.contains("Trunked Radio System") => t.replace("Trunked Radio System", "").trim().to_string(),
        Some(t) if t.contains("Radio System") => t.replace("Radio System", "").trim().to_string(),
        _ => "Unknown System".to_string(),
    }
}

/// First short text node mentioning a county.
fn scrape_location(html: &str) -> String {
    let Ok(text_nodes) = Regex::new(r">([^<>]+)<") else {
        return "Unknown Location".to_string();
    };
    text_nodes
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .find(|t| t.contains("County") && t.len() < MAX_LOCATION_LEN)
        .unwrap_or_else(|| "Unknown Location".to_string())
}

// *************** Tests ***************
