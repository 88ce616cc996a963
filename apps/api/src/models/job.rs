use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub source: String,
    pub external_id: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub remote: bool,
    pub url: String,
    pub description: String,
    pub salary: Option<String>,
    pub tags: Vec<String>,
    pub posted_at: Option<DateTime<Utc>>,
    /// Set when this posting was recorded as a duplicate of an earlier one.
    pub duplicate_of: Option<Uuid>,
    pub similarity: Option<f64>,
    pub created_at: DateTime<Utc>,
}
