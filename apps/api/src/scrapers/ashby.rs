//! Ashby public job board API (`api.ashbyhq.com/posting-api/job-board`).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{fetch_json, keep_usable, parse_timestamp, JobSource, RawPosting, ScrapeError};

pub const SOURCE: &str = "ashby";

#[derive(Debug, Deserialize)]
struct BoardResponse {
    #[serde(default)]
    jobs: Vec<AshbyJob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AshbyJob {
    id: String,
    #[serde(default)]
    title: String,
    location: Option<String>,
    #[serde(default)]
    is_remote: bool,
    #[serde(default)]
    job_url: String,
    description_plain: Option<String>,
    published_at: Option<String>,
    department: Option<String>,
    employment_type: Option<String>,
    compensation: Option<Compensation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Compensation {
    compensation_tier_summary: Option<String>,
}

pub struct AshbySource {
    client: Client,
    board: String,
    name: String,
}

impl AshbySource {
    pub fn new(client: Client, board: &str) -> Self {
        Self {
            client,
            board: board.to_string(),
            name: format!("{SOURCE}:{board}"),
        }
    }
}

#[async_trait]
impl JobSource for AshbySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawPosting>, ScrapeError> {
        let url = format!(
            "https://api.ashbyhq.com/posting-api/job-board/{}?includeCompensation=true",
            self.board
        );
        let body: serde_json::Value = fetch_json(&self.client, &self.name, &url).await?;
        parse_board(&body, &self.board).map_err(|message| ScrapeError::Payload {
            source_name: self.name.clone(),
            message,
        })
    }
}

pub fn parse_board(body: &serde_json::Value, board: &str) -> Result<Vec<RawPosting>, String> {
    let response: BoardResponse =
        serde_json::from_value(body.clone()).map_err(|e| e.to_string())?;

    let postings = response
        .jobs
        .into_iter()
        .map(|job| RawPosting {
            source: SOURCE.to_string(),
            external_id: job.id,
            title: job.title.trim().to_string(),
            company: board.to_string(),
            location: job.location,
            remote: job.is_remote,
            url: job.job_url,
            description: job.description_plain.unwrap_or_default(),
            posted_at: job.published_at.as_deref().and_then(parse_timestamp),
            salary: job.compensation.and_then(|c| c.compensation_tier_summary),
            tags: [job.department, job.employment_type]
                .into_iter()
                .flatten()
                .collect(),
        })
        .collect();

    Ok(keep_usable(postings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_board_fixture() {
        let body = json!({
            "apiVersion": "1",
            "jobs": [{
                "id": "b7e0c1d2",
                "title": "Founding Engineer",
                "location": "New York",
                "isRemote": true,
                "jobUrl": "https://jobs.ashbyhq.com/globex/b7e0c1d2",
                "descriptionPlain": "Ship the first version of our product.",
                "publishedAt": "2024-04-10T09:00:00.000+00:00",
                "department": "Engineering",
                "employmentType": "FullTime",
                "compensation": {"compensationTierSummary": "$160K – $200K"}
            }]
        });

        let postings = parse_board(&body, "globex").unwrap();
        assert_eq!(postings.len(), 1);
        let p = &postings[0];
        assert_eq!(p.company, "globex");
        assert!(p.remote);
        assert_eq!(p.salary.as_deref(), Some("$160K – $200K"));
        assert_eq!(p.tags, vec!["Engineering", "FullTime"]);
        assert!(p.posted_at.is_some());
    }
}
