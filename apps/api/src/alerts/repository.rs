use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::alert::JobAlertRow;

pub struct NewAlert<'a> {
    pub user_id: Uuid,
    pub name: &'a str,
    pub keywords: &'a [String],
    pub location: Option<&'a str>,
    pub remote_only: bool,
    pub sources: &'a [String],
}

pub async fn insert_alert(pool: &PgPool, new: NewAlert<'_>) -> Result<JobAlertRow> {
    Ok(sqlx::query_as::<_, JobAlertRow>(
        r#"
        INSERT INTO job_alerts (id, user_id, name, keywords, location, remote_only, sources)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.name)
    .bind(new.keywords)
    .bind(new.location)
    .bind(new.remote_only)
    .bind(new.sources)
    .fetch_one(pool)
    .await?)
}

pub async fn list_alerts(pool: &PgPool, user_id: Uuid) -> Result<Vec<JobAlertRow>> {
    Ok(sqlx::query_as::<_, JobAlertRow>(
        "SELECT * FROM job_alerts WHERE user_id = $1 ORDER BY created_at ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

/// Every alert in the system; matched against each new posting.
pub async fn all_alerts(pool: &PgPool) -> Result<Vec<JobAlertRow>> {
    Ok(sqlx::query_as::<_, JobAlertRow>("SELECT * FROM job_alerts")
        .fetch_all(pool)
        .await?)
}

pub async fn delete_alert(pool: &PgPool, user_id: Uuid, alert_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM job_alerts WHERE id = $1 AND user_id = $2")
        .bind(alert_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
