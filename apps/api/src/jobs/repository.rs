use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::job::JobRow;
use crate::scrapers::RawPosting;

/// Inserts a posting. Returns `None` when `(source, external_id)` already exists.
pub async fn insert_job(
    pool: &PgPool,
    id: Uuid,
    posting: &RawPosting,
    duplicate_of: Option<Uuid>,
    similarity: Option<f64>,
) -> Result<Option<JobRow>> {
    Ok(sqlx::query_as::<_, JobRow>(
        r#"
        INSERT INTO jobs
            (id, source, external_id, title, company, location, remote, url,
             description, salary, tags, posted_at, duplicate_of, similarity)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        ON CONFLICT (source, external_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&posting.source)
    .bind(&posting.external_id)
    .bind(&posting.title)
    .bind(&posting.company)
    .bind(&posting.location)
    .bind(posting.remote)
    .bind(&posting.url)
    .bind(&posting.description)
    .bind(&posting.salary)
    .bind(&posting.tags)
    .bind(posting.posted_at)
    .bind(duplicate_of)
    .bind(similarity)
    .fetch_optional(pool)
    .await?)
}

pub async fn get_job(pool: &PgPool, id: Uuid) -> Result<Option<JobRow>> {
    Ok(sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_by_listing(
    pool: &PgPool,
    source: &str,
    external_id: &str,
) -> Result<Option<JobRow>> {
    Ok(sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE source = $1 AND external_id = $2",
    )
    .bind(source)
    .bind(external_id)
    .fetch_optional(pool)
    .await?)
}

/// Listing filters. `None` means "any".
#[derive(Debug, Default)]
pub struct JobFilter {
    pub query: Option<String>,
    pub source: Option<String>,
    pub remote: Option<bool>,
    pub include_duplicates: bool,
    pub limit: i64,
    pub offset: i64,
}

pub async fn list_jobs(pool: &PgPool, filter: &JobFilter) -> Result<Vec<JobRow>> {
    let pattern = filter.query.as_ref().map(|q| format!("%{}%", escape_like(q)));
    Ok(sqlx::query_as::<_, JobRow>(
        r#"
        SELECT * FROM jobs
        WHERE ($1::text IS NULL OR title ILIKE $1 OR company ILIKE $1 OR description ILIKE $1)
          AND ($2::text IS NULL OR source = $2)
          AND ($3::boolean IS NULL OR remote = $3)
          AND ($4 OR duplicate_of IS NULL)
        ORDER BY COALESCE(posted_at, created_at) DESC
        LIMIT $5 OFFSET $6
        "#,
    )
    .bind(pattern)
    .bind(&filter.source)
    .bind(filter.remote)
    .bind(filter.include_duplicates)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?)
}

/// Postings recorded as duplicates of `id`.
pub async fn list_duplicates(pool: &PgPool, id: Uuid) -> Result<Vec<JobRow>> {
    Ok(sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE duplicate_of = $1 ORDER BY created_at ASC",
    )
    .bind(id)
    .fetch_all(pool)
    .await?)
}

/// Canonical (non-duplicate) postings stored since `since`, oldest first.
pub async fn canonical_jobs_since(pool: &PgPool, since: DateTime<Utc>) -> Result<Vec<JobRow>> {
    Ok(sqlx::query_as::<_, JobRow>(
        r#"
        SELECT * FROM jobs
        WHERE created_at >= $1 AND duplicate_of IS NULL
        ORDER BY created_at ASC
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await?)
}

fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_rust\\"), "100\\%\\_rust\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
