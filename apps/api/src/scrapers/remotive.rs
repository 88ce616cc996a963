//! Remotive remote jobs API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{fetch_json, keep_usable, parse_timestamp, JobSource, RawPosting, ScrapeError};

pub const SOURCE: &str = "remotive";
const API_URL: &str = "https://remotive.com/api/remote-jobs";

#[derive(Debug, Deserialize)]
struct RemotiveResponse {
    #[serde(default)]
    jobs: Vec<RemotiveJob>,
}

#[derive(Debug, Deserialize)]
struct RemotiveJob {
    id: u64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    company_name: String,
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    publication_date: Option<String>,
    candidate_required_location: Option<String>,
    salary: Option<String>,
    #[serde(default)]
    description: String,
}

pub struct RemotiveSource {
    client: Client,
}

impl RemotiveSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobSource for RemotiveSource {
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
    let response: RemotiveResponse =
        serde_json::from_value(body.clone()).map_err(|e| e.to_string())?;

    let postings = response
        .jobs
        .into_iter()
        .map(|job| {
            let mut tags = job.tags;
            if let Some(category) = job.category {
                tags.insert(0, category);
            }
            RawPosting {
                source: SOURCE.to_string(),
                external_id: job.id.to_string(),
                title: job.title.trim().to_string(),
                company: job.company_name,
                location: job.candidate_required_location,
                remote: true,
                url: job.url,
                description: job.description,
                posted_at: job.publication_date.as_deref().and_then(parse_timestamp),
                salary: job.salary.filter(|s| !s.trim().is_empty()),
                tags,
            }
        })
        .collect();

    Ok(keep_usable(postings))
}
