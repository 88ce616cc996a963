//! RemoteOK API. The first array element is a legal notice, not a job.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{fetch_json, from_epoch_secs, keep_usable, JobSource, RawPosting, ScrapeError};

pub const SOURCE: &str = "remoteok";
const API_URL: &str = "https://remoteok.com/api";

#[derive(Debug, Deserialize)]
struct RemoteOkJob {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    epoch: Option<i64>,
    #[serde(default)]
    company: String,
    #[serde(default)]
    position: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    description: String,
    location: Option<String>,
    salary_min: Option<u64>,
    salary_max: Option<u64>,
    #[serde(default)]
    url: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

pub struct RemoteOkSource {
    client: Client,
}

impl RemoteOkSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobSource for RemoteOkSource {
    fn name(&self) -> &str {
        SOURCE
    }

    async fn fetch(&self) -> Result<Vec<RawPosting>, ScrapeError> {
        let body: serde_json::Value = fetch_json(&self.client, SOURCE, API_URL).await?;
        parse_jobs(&body).map_err(|message| ScrapeError::Payload {
            source_name: SOURCE.to_string(),
            message,
        })
    }
}

pub fn parse_jobs(body: &serde_json::Value) -> Result<Vec<RawPosting>, String> {
    let items = body
        .as_array()
        .ok_or_else(|| "expected a JSON array".to_string())?;

    let postings = items
        .iter()
        .filter(|item| item.get("id").is_some())
        .filter_map(|item| match serde_json::from_value::<RemoteOkJob>(item.clone()) {
            Ok(job) => Some(job),
            Err(e) => {
                debug!("Skipping malformed remoteok item: {e}");
                None
            }
        })
        .map(|job| RawPosting {
            source: SOURCE.to_string(),
            external_id: job.id,
            title: job.position.trim().to_string(),
            company: job.company,
            location: job.location.filter(|l| !l.trim().is_empty()),
            remote: true,
            url: job.url,
            description: job.description,
            posted_at: job.epoch.and_then(from_epoch_secs),
            salary: match (job.salary_min, job.salary_max) {
                (Some(min), Some(max)) if max > 0 => Some(format!("USD {min}-{max}")),
                _ => None,
            },
            tags: job.tags,
        })
        .collect();

    Ok(keep_usable(postings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_jobs_skips_legal_notice() {
        let body = json!([
            {"last_updated": 1714650000, "legal": "API Terms of Service"},
            {
                "id": "1094321",
                "epoch": 1714600000,
                "company": "Pied Piper",
                "position": "Senior Backend Engineer",
                "tags": ["rust", "backend"],
                "description": "Compression at scale.",
                "location": "",
                "salary_min": 120000,
                "salary_max": 160000,
                "url": "https://remoteOK.com/remote-jobs/1094321"
            },
            {
                "id": 1094322,
                "position": "Designer",
                "url": "https://remoteOK.com/remote-jobs/1094322",
                "salary_min": 0,
                "salary_max": 0
            }
        ]);

        let postings = parse_jobs(&body).unwrap();
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].external_id, "1094321");
        assert_eq!(postings[0].salary.as_deref(), Some("USD 120000-160000"));
        assert!(postings[0].location.is_none());
        assert_eq!(postings[1].external_id, "1094322");
        assert!(postings[1].salary.is_none());
    }

    #[test]
    fn test_parse_jobs_requires_array() {
        assert!(parse_jobs(&json!({"jobs": []})).is_err());
    }
}
