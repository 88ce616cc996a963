mod alerts;
mod applications;
mod config;
mod db;
mod dedup;
mod errors;
mod generation;
mod jobs;
mod llm_client;
mod models;
mod notifications;
mod routes;
mod scrapers;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, RedisHandle};
use crate::dedup::DedupIndex;
use crate::jobs::ingest::warm_start;
use crate::jobs::Ingestor;
use crate::llm_client::LlmClient;
use crate::notifications::{ConnectionHub, NotificationService};
use crate::routes::build_router;
use crate::scrapers::runner::ScrapeRunner;
use crate::scrapers::scheduler::ScrapeScheduler;
use crate::scrapers::{build_sources, http_client};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Jobwatch API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis
    let redis = RedisHandle::new(redis::Client::open(config.redis_url.clone())?);
    info!("Redis client initialized");

    // Initialize LLM client
    let llm = LlmClient::new(config.llm_provider, config.llm_api_key.clone());
    info!(
        "LLM client initialized (provider: {}, model: {})",
        llm.provider(),
        llm.provider().model()
    );

    // Dedup window, rebuilt from recent canonical postings
    let index = Arc::new(RwLock::new(DedupIndex::new(config.dedup.clone())?));
    warm_start(&db, &index).await?;

    // Notifications: local hub plus cross-instance fan-out
    let notifications =
        NotificationService::new(db.clone(), Arc::new(ConnectionHub::new()), redis.clone());
    tokio::spawn(notifications.clone().run_fanout_listener());

    let ingestor = Ingestor::new(db.clone(), index, notifications.clone());

    let sources = build_sources(&config.scrape, &http_client());
    info!("{} job source(s) configured", sources.len());
    let scraper = ScrapeRunner::new(sources, ingestor.clone());

    if config.scrape.scheduler_enabled {
        let scheduler =
            ScrapeScheduler::new(scraper.clone(), redis.clone(), config.scrape.interval_secs);
        tokio::spawn(scheduler.run());
    } else {
        info!("Scrape scheduler disabled; use POST /api/v1/scrape/run");
    }

    // Build app state
    let state = AppState {
        db,
        llm,
        notifications,
        ingestor,
        scraper,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
