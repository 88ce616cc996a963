//! Lever postings API (`api.lever.co/v0/postings`).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{
    fetch_json, from_epoch_millis, keep_usable, looks_remote, JobSource, RawPosting, ScrapeError,
};

pub const SOURCE: &str = "lever";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeverPosting {
    id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    hosted_url: String,
    created_at: Option<i64>,
    #[serde(default)]
    categories: Categories,
    description_plain: Option<String>,
    additional_plain: Option<String>,
    workplace_type: Option<String>,
    salary_range: Option<SalaryRange>,
}

#[derive(Debug, Default, Deserialize)]
struct Categories {
    location: Option<String>,
    team: Option<String>,
    commitment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SalaryRange {
    min: Option<f64>,
    max: Option<f64>,
    currency: Option<String>,
}

pub struct LeverSource {
    client: Client,
    company: String,
    name: String,
}

impl LeverSource {
    pub fn new(client: Client, company: &str) -> Self {
        Self {
            client,
            company: company.to_string(),
            name: format!("{SOURCE}:{company}"),
        }
    }
}

#[async_trait]
impl JobSource for LeverSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawPosting>, ScrapeError> {
        let url = format!("https://api.lever.co/v0/postings/{}?mode=json", self.company);
        let body: serde_json::Value = fetch_json(&self.client, &self.name, &url).await?;
        parse_postings(&body, &self.company).map_err(|message| ScrapeError::Payload {
            source_name: self.name.clone(),
            message,
        })
    }
}

pub fn parse_postings(body: &serde_json::Value, company: &str) -> Result<Vec<RawPosting>, String> {
    let postings: Vec<LeverPosting> =
        serde_json::from_value(body.clone()).map_err(|e| e.to_string())?;

    let postings = postings
        .into_iter()
        .map(|p| {
            let remote = p
                .workplace_type
                .as_deref()
                .map(|w| w.eq_ignore_ascii_case("remote"))
                .unwrap_or(false)
                || looks_remote(p.categories.location.as_deref());
            let description = [p.description_plain, p.additional_plain]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join("\n\n");
            let tags = [p.categories.team, p.categories.commitment]
                .into_iter()
                .flatten()
                .collect();
            RawPosting {
                source: SOURCE.to_string(),
                external_id: p.id,
                title: p.text.trim().to_string(),
                company: company.to_string(),
                location: p.categories.location,
                remote,
                url: p.hosted_url,
                description,
                posted_at: p.created_at.and_then(from_epoch_millis),
                salary: p.salary_range.and_then(format_salary),
                tags,
            }
        })
        .collect();

    Ok(keep_usable(postings))
}

fn format_salary(range: SalaryRange) -> Option<String> {
    let currency = range.currency.unwrap_or_default();
    match (range.min, range.max) {
        (Some(min), Some(max)) => Some(format!("{currency} {min:.0}-{max:.0}").trim().to_string()),
        (Some(min), None) => Some(format!("{currency} {min:.0}+").trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_postings_fixture() {
        let body = json!([
            {
                "id": "5f1c-aa",
                "text": "Platform Engineer",
                "hostedUrl": "https://jobs.lever.co/initech/5f1c-aa",
                "createdAt": 1714651200000_i64,
                "categories": {"location": "Austin, TX", "team": "Infra", "commitment": "Full-time"},
                "descriptionPlain": "Own our Kubernetes clusters.",
                "additionalPlain": "Hybrid two days a week.",
                "workplaceType": "hybrid",
                "salaryRange": {"min": 150000, "max": 190000, "currency": "USD", "interval": "per-year-salary"}
            },
            {
                "id": "5f1c-bb",
                "text": "Support Engineer",
                "hostedUrl": "https://jobs.lever.co/initech/5f1c-bb",
                "categories": {},
                "workplaceType": "remote"
            }
        ]);

        let postings = parse_postings(&body, "initech").unwrap();
        assert_eq!(postings.len(), 2);
        let first = &postings[0];
        assert_eq!(first.external_id, "5f1c-aa");
        assert!(!first.remote);
        assert_eq!(first.tags, vec!["Infra", "Full-time"]);
        assert_eq!(
            first.description,
            "Own our Kubernetes clusters.\n\nHybrid two days a week."
        );
        assert_eq!(first.salary.as_deref(), Some("USD 150000-190000"));
        assert_eq!(first.posted_at.unwrap().timestamp(), 1714651200);
        assert!(postings[1].remote);
        assert!(postings[1].salary.is_none());
    }

    #[test]
    fn test_parse_postings_requires_array() {
        assert!(parse_postings(&json!({"ok": false}), "initech").is_err());
    }
}
