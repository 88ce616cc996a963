//! Ingest pipeline: dedup, persist, then notify users whose alerts match.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::alerts::matcher::matching_alerts;
use crate::alerts::repository::all_alerts;
use crate::dedup::{DedupDecision, DedupIndex, DuplicateReason, PostingFields};
use crate::errors::AppError;
use crate::jobs::repository::{canonical_jobs_since, find_by_listing, insert_job};
use crate::models::job::JobRow;
use crate::notifications::messages::kinds;
use crate::notifications::repository::NewNotification;
use crate::notifications::NotificationService;
use crate::scrapers::RawPosting;

pub type SharedDedupIndex = Arc<RwLock<DedupIndex>>;

/// What happened to one posting.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestResult {
    Inserted { job: Box<JobRow> },
    Duplicate {
        of: Uuid,
        reason: DuplicateReason,
        /// Id of the audit row recorded for this duplicate, if one was written.
        recorded: Option<Uuid>,
    },
    Skipped { reason: String },
    /// Storage failed for this posting; the rest of the batch went ahead.
    Failed { reason: String },
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct IngestSummary {
    pub received: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub failed: usize,
    pub notifications: usize,
}

impl IngestSummary {
    pub fn from_results(results: &[IngestResult], notifications: usize) -> Self {
        let mut summary = IngestSummary {
            received: results.len(),
            notifications,
            ..Default::default()
        };
        for result in results {
            match result {
                IngestResult::Inserted { .. } => summary.inserted += 1,
                IngestResult::Duplicate { .. } => summary.duplicates += 1,
                IngestResult::Skipped { .. } => summary.skipped += 1,
                IngestResult::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

/// Storage action implied by a dedup decision.
#[derive(Debug, PartialEq)]
enum WritePlan {
    /// New canonical posting.
    Canonical,
    /// Stored as an audit row pointing at the original.
    AuditRow {
        of: Uuid,
        reason: DuplicateReason,
        similarity: f64,
    },
    /// The listing is already stored; nothing to write.
    Nothing { of: Uuid, reason: DuplicateReason },
}

fn plan_write(decision: DedupDecision) -> WritePlan {
    match decision {
        DedupDecision::Unique => WritePlan::Canonical,
        DedupDecision::Duplicate {
            of,
            reason: DuplicateReason::SameListing,
        } => WritePlan::Nothing {
            of,
            reason: DuplicateReason::SameListing,
        },
        DedupDecision::Duplicate { of, reason } => {
            let similarity = match reason {
                DuplicateReason::NearDuplicate { similarity } => similarity,
                _ => 1.0,
            };
            WritePlan::AuditRow {
                of,
                reason,
                similarity,
            }
        }
    }
}

/// For a listing the window had forgotten but the table still holds: the
/// canonical id it resolves to, and whether it should re-enter the window.
fn resolve_stored_listing(existing: &JobRow) -> (Uuid, bool) {
    match existing.duplicate_of {
        Some(original) => (original, false),
        None => (existing.id, true),
    }
}

#[derive(Clone)]
pub struct Ingestor {
    db: PgPool,
    index: SharedDedupIndex,
    notifications: NotificationService,
}

impl Ingestor {
    pub fn new(db: PgPool, index: SharedDedupIndex, notifications: NotificationService) -> Self {
        Self {
            db,
            index,
            notifications,
        }
    }

    pub fn index(&self) -> &SharedDedupIndex {
        &self.index
    }

    /// Runs a batch through dedup and storage, then fans out alert notifications
    /// for every posting that was inserted.
    ///
    /// The index write lock is held across each posting's database write so two
    /// concurrent batches cannot both accept the same posting. A storage error
    /// fails only the posting it happened on.
    pub async fn ingest(&self, postings: Vec<RawPosting>) -> (Vec<IngestResult>, IngestSummary) {
        let mut results = Vec::with_capacity(postings.len());

        for posting in postings {
            if !posting.is_usable() {
                results.push(IngestResult::Skipped {
                    reason: "missing title or url".to_string(),
                });
                continue;
            }
            match self.ingest_one(&posting).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(
                        "Failed to ingest {}:{}: {e}",
                        posting.source, posting.external_id
                    );
                    results.push(IngestResult::Failed {
                        reason: e.to_string(),
                    });
                }
            }
        }

        let inserted: Vec<&JobRow> = results
            .iter()
            .filter_map(|r| match r {
                IngestResult::Inserted { job } => Some(job.as_ref()),
                _ => None,
            })
            .collect();
        let notifications = if inserted.is_empty() {
            0
        } else {
            self.notify_matches(&inserted).await
        };

        let summary = IngestSummary::from_results(&results, notifications);
        info!(
            "Ingested {} postings: {} new, {} duplicates, {} skipped, {} failed, {} notifications",
            summary.received,
            summary.inserted,
            summary.duplicates,
            summary.skipped,
            summary.failed,
            summary.notifications
        );
        (results, summary)
    }

    async fn ingest_one(&self, posting: &RawPosting) -> Result<IngestResult, AppError> {
        let mut index = self.index.write().await;
        let now = Utc::now();
        let candidate = index.candidate(posting.fields());
        let decision = index.check(&candidate, now);

        match plan_write(decision) {
            WritePlan::Canonical => {
                let id = Uuid::new_v4();
                if let Some(job) = insert_job(&self.db, id, posting, None, None).await? {
                    index.insert(job.id, candidate, now);
                    return Ok(IngestResult::Inserted { job: Box::new(job) });
                }
                let existing = find_by_listing(&self.db, &posting.source, &posting.external_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal(anyhow::anyhow!(
                            "listing {}:{} vanished after conflict",
                            posting.source,
                            posting.external_id
                        ))
                    })?;
                let (canonical, readmit) = resolve_stored_listing(&existing);
                if readmit {
                    index.insert(existing.id, candidate, now);
                }
                Ok(IngestResult::Duplicate {
                    of: canonical,
                    reason: DuplicateReason::SameListing,
                    recorded: None,
                })
            }
            WritePlan::AuditRow {
                of,
                reason,
                similarity,
            } => {
                let recorded =
                    insert_job(&self.db, Uuid::new_v4(), posting, Some(of), Some(similarity))
                        .await?
                        .map(|row| row.id);
                debug!(
                    "{}:{} duplicates {of} ({reason:?})",
                    posting.source, posting.external_id
                );
                Ok(IngestResult::Duplicate {
                    of,
                    reason,
                    recorded,
                })
            }
            WritePlan::Nothing { of, reason } => Ok(IngestResult::Duplicate {
                of,
                reason,
                recorded: None,
            }),
        }
    }

    /// One notification per (user, job), however many of the user's alerts match.
    async fn notify_matches(&self, jobs: &[&JobRow]) -> usize {
        let alerts = match all_alerts(&self.db).await {
            Ok(alerts) => alerts,
            Err(e) => {
                error!("Could not load alerts; {} new job(s) not matched: {e}", jobs.len());
                return 0;
            }
        };
        if alerts.is_empty() {
            return 0;
        }

        let mut sent = 0;
        for job in jobs {
            let mut notified_users = HashSet::new();
            for alert in matching_alerts(&alerts, job) {
                if !notified_users.insert(alert.user_id) {
                    continue;
                }
                let new = NewNotification {
                    user_id: alert.user_id,
                    kind: kinds::JOB_ALERT.to_string(),
                    title: format!("{} at {}", job.title, job.company),
                    body: format!("New posting matches your alert \"{}\"", alert.name),
                    job_id: Some(job.id),
                };
                match self.notifications.notify(new).await {
                    Ok(_) => sent += 1,
                    Err(e) => warn!(
                        "Failed to notify user {} about job {}: {e}",
                        alert.user_id, job.id
                    ),
                }
            }
        }
        sent
    }
}

/// Rebuilds the dedup window from canonical postings stored within it.
pub async fn warm_start(db: &PgPool, index: &SharedDedupIndex) -> anyhow::Result<usize> {
    let mut index = index.write().await;
    let since = Utc::now()
        .checked_sub_signed(index.params().window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let jobs = canonical_jobs_since(db, since).await?;
    for job in &jobs {
        let candidate = index.candidate(PostingFields {
            source: &job.source,
            external_id: &job.external_id,
            url: &job.url,
            title: &job.title,
            company: &job.company,
            description: &job.description,
        });
        index.insert(job.id, candidate, job.created_at);
    }
    info!("Dedup window warmed with {} postings", jobs.len());
    Ok(jobs.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_outcomes() {
        let results = vec![
            IngestResult::Duplicate {
                of: Uuid::new_v4(),
                reason: DuplicateReason::SameUrl,
                recorded: None,
            },
            IngestResult::Skipped {
                reason: "missing title or url".into(),
            },
            IngestResult::Duplicate {
                of: Uuid::new_v4(),
                reason: DuplicateReason::NearDuplicate { similarity: 0.9 },
                recorded: Some(Uuid::new_v4()),
            },
        ];
        let summary = IngestSummary::from_results(&results, 4);
        assert_eq!(
            summary,
            IngestSummary {
                received: 3,
                inserted: 0,
                duplicates: 2,
                skipped: 1,
                failed: 0,
                notifications: 4,
            }
        );
    }

    #[test]
    fn test_duplicate_result_serializes_reason() {
        let of = Uuid::nil();
        let result = IngestResult::Duplicate {
            of,
            reason: DuplicateReason::NearDuplicate { similarity: 0.875 },
            recorded: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["outcome"], "duplicate");
        assert_eq!(value["reason"]["kind"], "near_duplicate");
        assert_eq!(value["reason"]["similarity"], 0.875);
    }

    #[test]
    fn test_unique_becomes_canonical_row() {
        assert_eq!(plan_write(DedupDecision::Unique), WritePlan::Canonical);
    }

    #[test]
    fn test_rescrape_writes_nothing() {
        let of = Uuid::new_v4();
        assert_eq!(
            plan_write(DedupDecision::Duplicate {
                of,
                reason: DuplicateReason::SameListing,
            }),
            WritePlan::Nothing {
                of,
                reason: DuplicateReason::SameListing,
            }
        );
    }

    #[test]
    fn test_same_url_and_near_duplicates_get_audit_rows() {
        let of = Uuid::new_v4();
        assert_eq!(
            plan_write(DedupDecision::Duplicate {
                of,
                reason: DuplicateReason::SameUrl,
            }),
            WritePlan::AuditRow {
                of,
                reason: DuplicateReason::SameUrl,
                similarity: 1.0,
            }
        );
        assert_eq!(
            plan_write(DedupDecision::Duplicate {
                of,
                reason: DuplicateReason::NearDuplicate { similarity: 0.86 },
            }),
            WritePlan::AuditRow {
                of,
                reason: DuplicateReason::NearDuplicate { similarity: 0.86 },
                similarity: 0.86,
            }
        );
    }

    fn stored(duplicate_of: Option<Uuid>) -> JobRow {
        JobRow {
            id: Uuid::new_v4(),
            source: "lever:acme".into(),
            external_id: "abc".into(),
            title: "Platform Engineer".into(),
            company: "Acme".into(),
            location: None,
            remote: true,
            url: "https://jobs.lever.co/acme/abc".into(),
            description: String::new(),
            salary: None,
            tags: vec![],
            posted_at: None,
            duplicate_of,
            similarity: duplicate_of.map(|_| 0.9),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_forgotten_canonical_listing_is_readmitted() {
        let row = stored(None);
        assert_eq!(resolve_stored_listing(&row), (row.id, true));
    }

    #[test]
    fn test_forgotten_audit_row_points_at_original() {
        let original = Uuid::new_v4();
        let row = stored(Some(original));
        assert_eq!(resolve_stored_listing(&row), (original, false));
    }

    fn posting(external_id: &str, title: &str) -> RawPosting {
        RawPosting {
            source: "remotive".into(),
            external_id: external_id.into(),
            title: title.into(),
            company: "Acme".into(),
            location: None,
            remote: true,
            url: format!("https://remotive.com/jobs/{external_id}"),
            description: format!("{title} working on our data platform."),
            posted_at: None,
            salary: None,
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn test_storage_errors_fail_single_postings_not_the_batch() {
        let state = crate::state::offline_state();
        let (results, summary) = state
            .ingestor
            .ingest(vec![
                posting("1", "Backend Engineer"),
                posting("2", " "),
                posting("3", "Site Reliability Engineer"),
            ])
            .await;

        assert_eq!(results.len(), 3);
        assert!(matches!(results[0], IngestResult::Failed { .. }));
        assert!(matches!(results[1], IngestResult::Skipped { .. }));
        assert!(matches!(results[2], IngestResult::Failed { .. }));
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.notifications, 0);
        assert!(state.ingestor.index().read().await.is_empty());
    }
}
