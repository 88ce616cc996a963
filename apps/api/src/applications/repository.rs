use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::status::ApplicationStatus;
use crate::models::application::ApplicationRow;

pub struct NewApplication<'a> {
    pub user_id: Uuid,
    pub job_id: Option<Uuid>,
    pub company: &'a str,
    pub role: &'a str,
    pub status: ApplicationStatus,
    pub notes: Option<&'a str>,
}

pub async fn insert_application(pool: &PgPool, new: NewApplication<'_>) -> Result<ApplicationRow> {
    let applied_at = (new.status != ApplicationStatus::Saved).then(Utc::now);
    Ok(sqlx::query_as::<_, ApplicationRow>(
        r#"
        INSERT INTO applications (id, user_id, job_id, company, role, status, notes, applied_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.job_id)
    .bind(new.company)
    .bind(new.role)
    .bind(new.status.as_str())
    .bind(new.notes)
    .bind(applied_at)
    .fetch_one(pool)
    .await?)
}

pub async fn get_application(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<ApplicationRow>> {
    Ok(sqlx::query_as::<_, ApplicationRow>(
        "SELECT * FROM applications WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?)
}

pub async fn list_applications(
    pool: &PgPool,
    user_id: Uuid,
    status: Option<ApplicationStatus>,
) -> Result<Vec<ApplicationRow>> {
    Ok(sqlx::query_as::<_, ApplicationRow>(
        r#"
        SELECT * FROM applications
        WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2)
        ORDER BY updated_at DESC
        "#,
    )
    .bind(user_id)
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?)
}

/// Writes the new status and notes. `applied_at` is only ever set once.
pub async fn update_application(
    pool: &PgPool,
    id: Uuid,
    status: ApplicationStatus,
    notes: Option<&str>,
    applied_at: Option<DateTime<Utc>>,
) -> Result<ApplicationRow> {
    Ok(sqlx::query_as::<_, ApplicationRow>(
        r#"
        UPDATE applications
        SET status = $2,
            notes = $3,
            applied_at = COALESCE(applied_at, $4),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(notes)
    .bind(applied_at)
    .fetch_one(pool)
    .await?)
}

pub async fn delete_application(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM applications WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// (status, count) pairs for the user's applications.
pub async fn status_counts(pool: &PgPool, user_id: Uuid) -> Result<Vec<(String, i64)>> {
    Ok(sqlx::query_as::<_, (String, i64)>(
        "SELECT status, COUNT(*) FROM applications WHERE user_id = $1 GROUP BY status",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}
