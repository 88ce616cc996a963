use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobAlertRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub keywords: Vec<String>,
    pub location: Option<String>,
    pub remote_only: bool,
    pub sources: Vec<String>,
    pub created_at: DateTime<Utc>,
}
