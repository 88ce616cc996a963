use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repository::{
    delete_application, get_application, insert_application, list_applications, status_counts,
    update_application, NewApplication,
};
use super::status::ApplicationStatus;
use crate::errors::AppError;
use crate::jobs::repository::get_job;
use crate::models::application::ApplicationRow;
use crate::notifications::messages::{msg_types, ServerMessage};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListApplicationsQuery {
    pub user_id: Uuid,
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    pub user_id: Uuid,
    pub job_id: Option<Uuid>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub status: Option<ApplicationStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApplicationRequest {
    pub user_id: Uuid,
    pub status: Option<ApplicationStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationStats {
    pub total: i64,
    pub by_status: BTreeMap<&'static str, i64>,
}

/// Resolved effect of a PATCH against the stored row.
#[derive(Debug, PartialEq)]
pub struct PlannedUpdate {
    pub status: ApplicationStatus,
    pub notes: Option<String>,
    pub applied_at: Option<DateTime<Utc>>,
    pub status_changed: bool,
}

pub fn plan_update(
    row: &ApplicationRow,
    request: &UpdateApplicationRequest,
    now: DateTime<Utc>,
) -> Result<PlannedUpdate, AppError> {
    let current: ApplicationStatus = row
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    let target = request.status.unwrap_or(current);

    if !current.can_transition_to(target) {
        return Err(AppError::Validation(format!(
            "cannot move an application from {current} to {target}"
        )));
    }

    let applied_at = (target == ApplicationStatus::Applied && row.applied_at.is_none()).then_some(now);
    let notes = match &request.notes {
        Some(n) => Some(n.trim().to_string()).filter(|n| !n.is_empty()),
        None => row.notes.clone(),
    };

    Ok(PlannedUpdate {
        status: target,
        notes,
        applied_at,
        status_changed: target != current,
    })
}

pub fn summarize(counts: &[(String, i64)]) -> ApplicationStats {
    let mut by_status: BTreeMap<&'static str, i64> = ApplicationStatus::ALL
        .iter()
        .map(|s| (s.as_str(), 0))
        .collect();
    let mut total = 0;
    for (status, count) in counts {
        if let Ok(parsed) = status.parse::<ApplicationStatus>() {
            *by_status.entry(parsed.as_str()).or_default() += count;
        }
        total += count;
    }
    ApplicationStats { total, by_status }
}

async fn owned_application(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
) -> Result<ApplicationRow, AppError> {
    get_application(&state.db, user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}

/// GET /api/v1/applications
pub async fn handle_list_applications(
    State(state): State<AppState>,
    Query(params): Query<ListApplicationsQuery>,
) -> Result<Json<Vec<ApplicationRow>>, AppError> {
    Ok(Json(
        list_applications(&state.db, params.user_id, params.status).await?,
    ))
}

/// POST /api/v1/applications
///
/// With a `job_id`, company and role default to the tracked posting's.
pub async fn handle_create_application(
    State(state): State<AppState>,
    Json(request): Json<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<ApplicationRow>), AppError> {
    let job = match request.job_id {
        Some(job_id) => Some(
            get_job(&state.db, job_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?,
        ),
        None => None,
    };

    let pick = |given: Option<String>, from_job: Option<&String>| {
        given
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .or_else(|| from_job.cloned())
            .unwrap_or_default()
    };
    let company = pick(request.company, job.as_ref().map(|j| &j.company));
    let role = pick(request.role, job.as_ref().map(|j| &j.title));
    if company.is_empty() || role.is_empty() {
        return Err(AppError::Validation(
            "company and role are required without a job_id".to_string(),
        ));
    }

    let row = insert_application(
        &state.db,
        NewApplication {
            user_id: request.user_id,
            job_id: request.job_id,
            company: &company,
            role: &role,
            status: request.status.unwrap_or(ApplicationStatus::Saved),
            notes: request.notes.as_deref(),
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ApplicationRow>, AppError> {
    Ok(Json(owned_application(&state, params.user_id, id).await?))
}

/// PATCH /api/v1/applications/:id
pub async fn handle_update_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateApplicationRequest>,
) -> Result<Json<ApplicationRow>, AppError> {
    let row = owned_application(&state, request.user_id, id).await?;
    let plan = plan_update(&row, &request, Utc::now())?;

    let updated = update_application(
        &state.db,
        id,
        plan.status,
        plan.notes.as_deref(),
        plan.applied_at,
    )
    .await?;

    if plan.status_changed {
        state
            .notifications
            .push(
                updated.user_id,
                ServerMessage::new(msg_types::APPLICATION_UPDATED, &updated),
            )
            .await;
    }
    Ok(Json(updated))
}

/// DELETE /api/v1/applications/:id
pub async fn handle_delete_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    if delete_application(&state.db, params.user_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Application {id} not found")))
    }
}

/// GET /api/v1/applications/stats
pub async fn handle_application_stats(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ApplicationStats>, AppError> {
    let counts = status_counts(&state.db, params.user_id).await?;
    Ok(Json(summarize(&counts)))
}
