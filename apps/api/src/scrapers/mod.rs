// Job board scrapers. Each board has a pure `parse_*` function from its public
// JSON API to `RawPosting`s, plus a `JobSource` impl that fetches over HTTP.

pub mod arbeitnow;
pub mod ashby;
pub mod greenhouse;
pub mod lever;
pub mod remoteok;
pub mod remotive;
pub mod runner;
pub mod scheduler;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ScrapeConfig;
use crate::dedup::PostingFields;

const USER_AGENT: &str = concat!("jobwatch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{source_name} returned status {status}")]
    Status { source_name: String, status: u16 },

    #[error("Unexpected payload from {source_name}: {message}")]
    Payload {
        source_name: String,
        message: String,
    },
}

/// A posting as scraped, before dedup and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPosting {
    pub source: String,
    pub external_id: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub remote: bool,
    pub url: String,
    pub description: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub salary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RawPosting {
    /// Postings without a title or URL are unusable and skipped.
    pub fn is_usable(&self) -> bool {
        !self.title.trim().is_empty() && !self.url.trim().is_empty()
    }

    pub fn fields(&self) -> PostingFields<'_> {
        PostingFields {
            source: &self.source,
            external_id: &self.external_id,
            url: &self.url,
            title: &self.title,
            company: &self.company,
            description: &self.description,
        }
    }
}

/// A job board that can be scraped.
#[async_trait]
pub trait JobSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<RawPosting>, ScrapeError>;
}

/// HTTP client shared by all scrapers.
pub fn http_client() -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .unwrap_or_default()
}

/// Instantiates every source enabled in config.
pub fn build_sources(config: &ScrapeConfig, client: &Client) -> Vec<Arc<dyn JobSource>> {
    let mut sources: Vec<Arc<dyn JobSource>> = Vec::new();
    for board in &config.greenhouse_boards {
        sources.push(Arc::new(greenhouse::GreenhouseSource::new(client.clone(), board)));
    }
    for company in &config.lever_companies {
        sources.push(Arc::new(lever::LeverSource::new(client.clone(), company)));
    }
    for board in &config.ashby_boards {
        sources.push(Arc::new(ashby::AshbySource::new(client.clone(), board)));
    }
    if config.remotive_enabled {
        sources.push(Arc::new(remotive::RemotiveSource::new(client.clone())));
    }
    if config.remoteok_enabled {
        sources.push(Arc::new(remoteok::RemoteOkSource::new(client.clone())));
    }
    if config.arbeitnow_enabled {
        sources.push(Arc::new(arbeitnow::ArbeitnowSource::new(client.clone())));
    }
    sources
}

/// GETs `url` and deserializes the JSON body.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    client: &Client,
    source_name: &str,
    url: &str,
) -> Result<T, ScrapeError> {
    debug!("Fetching {source_name}: {url}");
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Status {
            source_name: source_name.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.json::<T>().await?)
}

/// Drops unusable postings, logging each one.
pub(crate) fn keep_usable(postings: Vec<RawPosting>) -> Vec<RawPosting> {
    postings
        .into_iter()
        .filter(|p| {
            let usable = p.is_usable();
            if !usable {
                debug!(
                    "Skipping {} posting {}: missing title or url",
                    p.source, p.external_id
                );
            }
            usable
        })
        .collect()
}

/// Parses RFC 3339 timestamps, falling back to naive `YYYY-MM-DDTHH:MM:SS` as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

pub(crate) fn from_epoch_secs(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

pub(crate) fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Decodes the handful of HTML entities boards double-escape.
pub(crate) fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

pub(crate) fn looks_remote(location: Option<&str>) -> bool {
    location
        .map(|l| {
            let l = l.to_ascii_lowercase();
            l.contains("remote") || l.contains("anywhere")
        })
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
pub(crate) struct Named {
    pub name: Option<String>,
}
