//! Axum route handlers for the Generation API.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::cover_letter::{generate_cover_letter, CoverLetterRequest, CoverLetterResponse};
use crate::jobs::repository::get_job;
use crate::state::AppState;

/// POST /api/v1/jobs/:id/cover-letter
pub async fn handle_cover_letter(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<CoverLetterRequest>,
) -> Result<Json<CoverLetterResponse>, AppError> {
    if request.candidate_summary.trim().is_empty() {
        return Err(AppError::Validation(
            "candidate_summary cannot be empty".to_string(),
        ));
    }

    let job = get_job(&state.db, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    debug!(
        "Cover letter requested by user {} for job {job_id}",
        request.user_id
    );
    let response = generate_cover_letter(&state.llm, &job, &request).await?;
    Ok(Json(response))
}
