use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ingest::IngestResult;
use super::repository::{get_job, list_duplicates, list_jobs, JobFilter};
use crate::dedup::{shingle::canonical_url, DuplicateReason, IndexStats};
use crate::errors::AppError;
use crate::models::job::JobRow;
use crate::scrapers::RawPosting;
use crate::state::AppState;

pub const MANUAL_SOURCE: &str = "manual";
const MAX_PAGE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub q: Option<String>,
    pub source: Option<String>,
    pub remote: Option<bool>,
    #[serde(default)]
    pub include_duplicates: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListJobsQuery {
    pub fn into_filter(self) -> JobFilter {
        JobFilter {
            query: self.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
            source: self.source.filter(|s| !s.trim().is_empty()),
            remote: self.remote,
            include_duplicates: self.include_duplicates,
            limit: self.limit.unwrap_or(50).clamp(1, MAX_PAGE),
            offset: self.offset.unwrap_or(0).max(0),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub company: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    pub location: Option<String>,
    #[serde(default)]
    pub remote: bool,
    pub salary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateJobRequest {
    /// Converts a manual entry into a posting keyed by its canonical URL.
    pub fn into_posting(self) -> Result<RawPosting, AppError> {
        let title = self.title.trim().to_string();
        let company = self.company.trim().to_string();
        if title.is_empty() || company.is_empty() {
            return Err(AppError::Validation(
                "title and company cannot be empty".to_string(),
            ));
        }
        let canonical = canonical_url(&self.url);
        if canonical.is_empty() {
            return Err(AppError::Validation("url cannot be empty".to_string()));
        }
        Ok(RawPosting {
            source: MANUAL_SOURCE.to_string(),
            external_id: canonical,
            title,
            company,
            location: self.location,
            remote: self.remote,
            url: self.url.trim().to_string(),
            description: self.description,
            posted_at: None,
            salary: self.salary,
            tags: self.tags,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct JobDetailResponse {
    pub job: JobRow,
    pub duplicates: Vec<JobRow>,
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    let filter = params.into_filter();
    Ok(Json(list_jobs(&state.db, &filter).await?))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobDetailResponse>, AppError> {
    let job = get_job(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    let duplicates = list_duplicates(&state.db, id).await?;
    Ok(Json(JobDetailResponse { job, duplicates }))
}

/// GET /api/v1/jobs/:id/duplicates
pub async fn handle_list_duplicates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    if get_job(&state.db, id).await?.is_none() {
        return Err(AppError::NotFound(format!("Job {id} not found")));
    }
    Ok(Json(list_duplicates(&state.db, id).await?))
}

/// POST /api/v1/jobs
///
/// Manually tracked postings go through the same dedup pipeline as scraped ones.
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    let posting = request.into_posting()?;
    let (mut results, _) = state.ingestor.ingest(vec![posting]).await;

    match results.pop() {
        Some(IngestResult::Inserted { job }) => Ok((StatusCode::CREATED, Json(*job))),
        Some(IngestResult::Duplicate { of, reason, .. }) => Err(AppError::Duplicate {
            existing_id: of,
            reason: describe_reason(&reason),
        }),
        Some(IngestResult::Skipped { reason }) => Err(AppError::Validation(reason)),
        Some(IngestResult::Failed { reason }) => Err(AppError::Internal(anyhow::anyhow!(reason))),
        None => Err(AppError::Internal(anyhow::anyhow!(
            "ingest returned no result for a single posting"
        ))),
    }
}

/// GET /api/v1/dedup/stats
pub async fn handle_dedup_stats(State(state): State<AppState>) -> Json<IndexStats> {
    Json(state.ingestor.index().read().await.stats())
}

fn describe_reason(reason: &DuplicateReason) -> String {
    match reason {
        DuplicateReason::SameListing => "already tracked".to_string(),
        DuplicateReason::SameUrl => "same url".to_string(),
        DuplicateReason::NearDuplicate { similarity } => {
            format!("{:.0}% similar", similarity * 100.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_clamps_paging() {
        let filter = ListJobsQuery {
            q: Some("  ".into()),
            source: None,
            remote: Some(true),
            include_duplicates: false,
            limit: Some(10_000),
            offset: Some(-5),
        }
        .into_filter();
        assert!(filter.query.is_none());
        assert_eq!(filter.limit, MAX_PAGE);
        assert_eq!(filter.offset, 0);
        assert_eq!(filter.remote, Some(true));
    }

    #[test]
    fn test_manual_posting_keyed_by_canonical_url() {
        let posting = CreateJobRequest {
            title: " Rust Engineer ".into(),
            company: "Acme".into(),
            url: "https://www.acme.io/careers/42?src=li".into(),
            description: String::new(),
            location: None,
            remote: true,
            salary: None,
            tags: vec![],
        }
        .into_posting()
        .unwrap();
        assert_eq!(posting.source, MANUAL_SOURCE);
        assert_eq!(posting.external_id, "https://acme.io/careers/42");
        assert_eq!(posting.title, "Rust Engineer");
    }

    #[test]
    fn test_manual_posting_requires_title_and_url() {
        let base = || CreateJobRequest {
            title: "Engineer".into(),
            company: "Acme".into(),
            url: "https://acme.io/1".into(),
            description: String::new(),
            location: None,
            remote: false,
            salary: None,
            tags: vec![],
        };
        let mut no_title = base();
        no_title.title = " ".into();
        assert!(no_title.into_posting().is_err());
        let mut no_url = base();
        no_url.url = "".into();
        assert!(no_url.into_posting().is_err());
    }

    #[test]
    fn test_describe_reason() {
        assert_eq!(
            describe_reason(&DuplicateReason::NearDuplicate { similarity: 0.91 }),
            "91% similar"
        );
    }
}
