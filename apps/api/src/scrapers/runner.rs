//! One scrape run: fetch every source concurrently, then ingest what came back.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use super::{JobSource, RawPosting};
use crate::jobs::ingest::{IngestSummary, Ingestor};

/// Outcome of fetching one source.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SourceReport {
    pub source: String,
    pub fetched: usize,
    pub error: Option<String>,
}

impl SourceReport {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u128,
    pub sources: Vec<SourceReport>,
    pub failed_sources: usize,
    pub ingest: IngestSummary,
    pub evicted: usize,
}

#[derive(Clone)]
pub struct ScrapeRunner {
    sources: Arc<Vec<Arc<dyn JobSource>>>,
    ingestor: Ingestor,
}

impl ScrapeRunner {
    pub fn new(sources: Vec<Arc<dyn JobSource>>, ingestor: Ingestor) -> Self {
        Self {
            sources: Arc::new(sources),
            ingestor,
        }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Scrapes every source once. A failing source is reported, never fatal.
    pub async fn run_once(&self) -> ScrapeReport {
        let started_at = Utc::now();
        let timer = Instant::now();
        info!("Scrape run started across {} source(s)", self.sources.len());

        let (sources, postings) = fetch_all(&self.sources).await;
        let failed_sources = sources.iter().filter(|s| s.failed()).count();

        let (_, ingest) = self.ingestor.ingest(postings).await;
        let evicted = self
            .ingestor
            .index()
            .write()
            .await
            .evict_expired(Utc::now());

        let report = ScrapeReport {
            started_at,
            duration_ms: timer.elapsed().as_millis(),
            sources,
            failed_sources,
            ingest,
            evicted,
        };
        info!(
            "Scrape run finished in {}ms: {} new, {} duplicates, {} failed source(s)",
            report.duration_ms, report.ingest.inserted, report.ingest.duplicates, failed_sources
        );
        report
    }
}

/// Fetches all sources concurrently, keeping results in source order.
pub async fn fetch_all(sources: &[Arc<dyn JobSource>]) -> (Vec<SourceReport>, Vec<RawPosting>) {
    let results = join_all(sources.iter().map(|source| async move {
        (source.name().to_string(), source.fetch().await)
    }))
    .await;

    let mut reports = Vec::with_capacity(results.len());
    let mut postings = Vec::new();
    for (name, result) in results {
        match result {
            Ok(batch) => {
                reports.push(SourceReport {
                    source: name,
                    fetched: batch.len(),
                    error: None,
                });
                postings.extend(batch);
            }
            Err(e) => {
                warn!("Source {name} failed: {e}");
                reports.push(SourceReport {
                    source: name,
                    fetched: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }
    (reports, postings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::ScrapeError;
    use async_trait::async_trait;

    struct FixedSource {
        name: &'static str,
        count: usize,
    }

    #[async_trait]
    impl JobSource for FixedSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self) -> Result<Vec<RawPosting>, ScrapeError> {
            Ok((0..self.count)
                .map(|n| RawPosting {
                    source: self.name.to_string(),
                    external_id: n.to_string(),
                    title: format!("Engineer {n}"),
                    company: "Acme".into(),
                    location: None,
                    remote: true,
                    url: format!("https://acme.io/jobs/{n}"),
                    description: String::new(),
                    posted_at: None,
                    salary: None,
                    tags: vec![],
                })
                .collect())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl JobSource for BrokenSource {
        fn name(&self) -> &str {
            "broken"
        }

        async fn fetch(&self) -> Result<Vec<RawPosting>, ScrapeError> {
            Err(ScrapeError::Status {
                source_name: "broken".into(),
                status: 503,
            })
        }
    }

    #[tokio::test]
    async fn test_failing_source_does_not_abort_run() {
        let sources: Vec<Arc<dyn JobSource>> = vec![
            Arc::new(FixedSource { name: "a", count: 2 }),
            Arc::new(BrokenSource),
            Arc::new(FixedSource { name: "b", count: 3 }),
        ];
        let (reports, postings) = fetch_all(&sources).await;

        assert_eq!(postings.len(), 5);
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].fetched, 2);
        assert!(reports[1].failed());
        assert!(reports[1].error.as_deref().unwrap().contains("503"));
        assert_eq!(reports[2].source, "b");
    }

    #[tokio::test]
    async fn test_no_sources_yields_empty_run() {
        let (reports, postings) = fetch_all(&[]).await;
        assert!(reports.is_empty());
        assert!(postings.is_empty());
    }
}
