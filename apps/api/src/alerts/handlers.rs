use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::repository::{delete_alert, insert_alert, list_alerts, NewAlert};
use crate::errors::AppError;
use crate::models::alert::JobAlertRow;
use crate::state::AppState;

const MAX_KEYWORDS: usize = 20;

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub user_id: Uuid,
    pub name: String,
    pub keywords: Vec<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub remote_only: bool,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl CreateAlertRequest {
    /// Trims input and rejects alerts that would match everything.
    pub fn validated(mut self) -> Result<Self, AppError> {
        self.name = self.name.trim().to_string();
        self.keywords = self
            .keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        self.sources = self
            .sources
            .into_iter()
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        self.location = self
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        if self.name.is_empty() {
            return Err(AppError::Validation("name cannot be empty".to_string()));
        }
        if self.keywords.is_empty() {
            return Err(AppError::Validation(
                "at least one keyword is required".to_string(),
            ));
        }
        if self.keywords.len() > MAX_KEYWORDS {
            return Err(AppError::Validation(format!(
                "at most {MAX_KEYWORDS} keywords are allowed"
            )));
        }
        Ok(self)
    }
}

/// GET /api/v1/alerts
pub async fn handle_list_alerts(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<JobAlertRow>>, AppError> {
    Ok(Json(list_alerts(&state.db, params.user_id).await?))
}

/// POST /api/v1/alerts
pub async fn handle_create_alert(
    State(state): State<AppState>,
    Json(request): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<JobAlertRow>), AppError> {
    let request = request.validated()?;
    let row = insert_alert(
        &state.db,
        NewAlert {
            user_id: request.user_id,
            name: &request.name,
            keywords: &request.keywords,
            location: request.location.as_deref(),
            remote_only: request.remote_only,
            sources: &request.sources,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// DELETE /api/v1/alerts/:id
pub async fn handle_delete_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    if delete_alert(&state.db, params.user_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Alert {id} not found")))
    }
}
