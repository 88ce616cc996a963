use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::messages::{msg_types, system, ServerMessage};
use super::repository::{list_notifications, mark_all_read, mark_read};
use crate::errors::AppError;
use crate::models::notification::NotificationRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: Uuid,
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UserBody {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// GET /api/v1/notifications
pub async fn handle_list_notifications(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<NotificationRow>>, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let rows = list_notifications(&state.db, params.user_id, params.unread_only, limit).await?;
    Ok(Json(rows))
}

/// POST /api/v1/notifications/:id/read
pub async fn handle_mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UserBody>,
) -> Result<Json<NotificationRow>, AppError> {
    let row = mark_read(&state.db, body.user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification {id} not found")))?;

    state
        .notifications
        .push(
            body.user_id,
            ServerMessage::new(
                msg_types::NOTIFICATION_READ,
                system::NotificationRead {
                    notification_id: Some(id),
                    all: false,
                },
            ),
        )
        .await;
    Ok(Json(row))
}

/// POST /api/v1/notifications/read-all
pub async fn handle_mark_all_read(
    State(state): State<AppState>,
    Json(body): Json<UserBody>,
) -> Result<Json<MarkAllReadResponse>, AppError> {
    let updated = mark_all_read(&state.db, body.user_id).await?;
    if updated > 0 {
        state
            .notifications
            .push(
                body.user_id,
                ServerMessage::new(
                    msg_types::NOTIFICATION_READ,
                    system::NotificationRead {
                        notification_id: None,
                        all: true,
                    },
                ),
            )
            .await;
    }
    Ok(Json(MarkAllReadResponse { updated }))
}
