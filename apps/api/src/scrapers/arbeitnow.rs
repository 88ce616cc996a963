//! Arbeitnow job board API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{fetch_json, from_epoch_secs, keep_usable, JobSource, RawPosting, ScrapeError};

pub const SOURCE: &str = "arbeitnow";
const API_URL: &str = "https://www.arbeitnow.com/api/job-board-api";

#[derive(Debug, Deserialize)]
struct ArbeitnowResponse {
    #[serde(default)]
    data: Vec<ArbeitnowJob>,
}

#[derive(Debug, Deserialize)]
struct ArbeitnowJob {
    slug: String,
    #[serde(default)]
    company_name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    remote: bool,
    #[serde(default)]
    url: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    job_types: Vec<String>,
    location: Option<String>,
    created_at: Option<i64>,
}

pub struct ArbeitnowSource {
    client: Client,
}

impl ArbeitnowSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobSource for ArbeitnowSource {
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
    let response: ArbeitnowResponse =
        serde_json::from_value(body.clone()).map_err(|e| e.to_string())?;

    let postings = response
        .data
        .into_iter()
        .map(|job| {
            let mut tags = job.tags;
            tags.extend(job.job_types);
            RawPosting {
                source: SOURCE.to_string(),
                external_id: job.slug,
                title: job.title.trim().to_string(),
                company: job.company_name,
                location: job.location,
                remote: job.remote,
                url: job.url,
                description: job.description,
                posted_at: job.created_at.and_then(from_epoch_secs),
                salary: None,
                tags,
            }
        })
        .collect();

    Ok(keep_usable(postings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_jobs_fixture() {
        let body = json!({
            "data": [{
                "slug": "backend-developer-berlin-123",
                "company_name": "Initech GmbH",
                "title": "Backend Developer (m/w/d)",
                "description": "<p>Go und Rust.</p>",
                "remote": false,
                "url": "https://www.arbeitnow.com/jobs/companies/initech/backend-developer-berlin-123",
                "tags": ["Software Development"],
                "job_types": ["full time"],
                "location": "Berlin",
                "created_at": 1714500000
            }],
            "links": {},
            "meta": {}
        });

        let postings = parse_jobs(&body).unwrap();
        assert_eq!(postings.len(), 1);
        let p = &postings[0];
        assert_eq!(p.external_id, "backend-developer-berlin-123");
        assert!(!p.remote);
        assert_eq!(p.tags, vec!["Software Development", "full time"]);
        assert_eq!(p.location.as_deref(), Some("Berlin"));
    }
}
