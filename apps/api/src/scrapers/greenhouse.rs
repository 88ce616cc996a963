//! Greenhouse job board API (`boards-api.greenhouse.io`).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{
    fetch_json, keep_usable, looks_remote, parse_timestamp, unescape_html, JobSource, Named,
    RawPosting, ScrapeError,
};

pub const SOURCE: &str = "greenhouse";

#[derive(Debug, Deserialize)]
struct BoardResponse {
    #[serde(default)]
    jobs: Vec<GreenhouseJob>,
}

#[derive(Debug, Deserialize)]
struct GreenhouseJob {
    id: u64,
    #[serde(default)]
    title: String,
    updated_at: Option<String>,
    first_published: Option<String>,
    location: Option<Named>,
    #[serde(default)]
    absolute_url: String,
    content: Option<String>,
    company_name: Option<String>,
    #[serde(default)]
    departments: Vec<Named>,
}

pub struct GreenhouseSource {
    client: Client,
    board: String,
    name: String,
}

impl GreenhouseSource {
    pub fn new(client: Client, board: &str) -> Self {
        Self {
            client,
            board: board.to_string(),
            name: format!("{SOURCE}:{board}"),
        }
    }
}

#[async_trait]
impl JobSource for GreenhouseSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawPosting>, ScrapeError> {
        let url = format!(
            "https://boards-api.greenhouse.io/v1/boards/{}/jobs?content=true",
            self.board
        );
        let body: serde_json::Value = fetch_json(&self.client, &self.name, &url).await?;
        parse_board(&body, &self.board).map_err(|message| ScrapeError::Payload {
            source_name: self.name.clone(),
            message,
        })
    }
}

/// Parses a Greenhouse board response. `board` is used as the company name when
/// the payload does not carry one.
pub fn parse_board(body: &serde_json::Value, board: &str) -> Result<Vec<RawPosting>, String> {
    let response: BoardResponse =
        serde_json::from_value(body.clone()).map_err(|e| e.to_string())?;

    let postings = response
        .jobs
        .into_iter()
        .map(|job| {
            let location = job.location.and_then(|l| l.name);
            let posted = job
                .first_published
                .as_deref()
                .or(job.updated_at.as_deref())
                .and_then(parse_timestamp);
            RawPosting {
                source: SOURCE.to_string(),
                external_id: job.id.to_string(),
                title: job.title.trim().to_string(),
                company: job.company_name.unwrap_or_else(|| board.to_string()),
                remote: looks_remote(location.as_deref()),
                location,
                url: job.absolute_url,
                description: job.content.as_deref().map(unescape_html).unwrap_or_default(),
                posted_at: posted,
                salary: None,
                tags: job.departments.into_iter().filter_map(|d| d.name).collect(),
            }
        })
        .collect();

    Ok(keep_usable(postings))
}
