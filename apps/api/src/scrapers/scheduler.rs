//! Periodic scraping. Every instance ticks, but a redis lock held for one
//! interval lets only the first instance per interval actually scrape.

use std::time::Duration;

use axum::{extract::State, Json};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::runner::{ScrapeReport, ScrapeRunner};
use crate::db::RedisHandle;
use crate::state::AppState;

pub const LOCK_KEY: &str = "jobwatch:scrape-lock";

pub struct ScrapeScheduler {
    runner: ScrapeRunner,
    redis: RedisHandle,
    interval: Duration,
    instance_id: Uuid,
}

impl ScrapeScheduler {
    pub fn new(runner: ScrapeRunner, redis: RedisHandle, interval_secs: u64) -> Self {
        Self {
            runner,
            redis,
            interval: Duration::from_secs(interval_secs.max(1)),
            instance_id: Uuid::new_v4(),
        }
    }

    /// Runs forever; spawn it.
    pub async fn run(self) {
        info!(
            "Scrape scheduler started: every {}s, sources: {:?}",
            self.interval.as_secs(),
            self.runner.source_names()
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            match self.try_lock().await {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Another instance holds {LOCK_KEY}; skipping this tick");
                    continue;
                }
                Err(e) => {
                    error!("Could not take scrape lock: {e}");
                    continue;
                }
            }

            let report = self.runner.run_once().await;
            if report.ingest.failed > 0 {
                warn!(
                    "Scheduled scrape could not store {} posting(s)",
                    report.ingest.failed
                );
            }
        }
    }

    async fn try_lock(&self) -> Result<bool, redis::RedisError> {
        let mut conn = self.redis.connection().await?;
        let reply: Option<String> = lock_command(self.instance_id, self.interval.as_secs())
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }
}

/// `SET jobwatch:scrape-lock <instance> NX EX <ttl>`; replies nil when already held.
fn lock_command(instance_id: Uuid, ttl_secs: u64) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(LOCK_KEY)
        .arg(instance_id.to_string())
        .arg("NX")
        .arg("EX")
        .arg(ttl_secs);
    cmd
}

/// POST /api/v1/scrape/run
pub async fn handle_run_scrape(State(state): State<AppState>) -> Json<ScrapeReport> {
    Json(state.scraper.run_once().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_command_is_set_nx_ex() {
        let id = Uuid::nil();
        let packed = String::from_utf8(lock_command(id, 3600).get_packed_command()).unwrap();
        assert!(packed.contains("SET"));
        assert!(packed.contains(LOCK_KEY));
        assert!(packed.contains(&id.to_string()));
        let nx = packed.find("NX").unwrap();
        let ex = packed.find("EX").unwrap();
        assert!(nx < ex);
        assert!(packed.ends_with("3600\r\n"));
    }
}
