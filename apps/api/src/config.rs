use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::Duration;

use crate::dedup::{DedupParams, MAX_WINDOW_DAYS};
use crate::llm_client::Provider;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub rust_log: String,
    pub llm_provider: Provider,
    pub llm_api_key: String,
    pub scrape: ScrapeConfig,
    pub dedup: DedupParams,
}

/// Which boards to scrape and how often.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub interval_secs: u64,
    pub scheduler_enabled: bool,
    pub greenhouse_boards: Vec<String>,
    pub lever_companies: Vec<String>,
    pub ashby_boards: Vec<String>,
    pub remotive_enabled: bool,
    pub remoteok_enabled: bool,
    pub arbeitnow_enabled: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let llm_provider: Provider = parse_or(&lookup, "LLM_PROVIDER", Provider::Anthropic)?;
        let llm_api_key = match llm_provider {
            Provider::Anthropic => require("ANTHROPIC_API_KEY")?,
            Provider::OpenAi => require("OPENAI_API_KEY")?,
        };

        let scrape = ScrapeConfig {
            interval_secs: parse_or(&lookup, "SCRAPE_INTERVAL_SECS", 3600)?,
            scheduler_enabled: parse_or(&lookup, "SCHEDULER_ENABLED", true)?,
            greenhouse_boards: parse_list(lookup("GREENHOUSE_BOARDS")),
            lever_companies: parse_list(lookup("LEVER_COMPANIES")),
            ashby_boards: parse_list(lookup("ASHBY_BOARDS")),
            remotive_enabled: parse_or(&lookup, "REMOTIVE_ENABLED", true)?,
            remoteok_enabled: parse_or(&lookup, "REMOTEOK_ENABLED", true)?,
            arbeitnow_enabled: parse_or(&lookup, "ARBEITNOW_ENABLED", true)?,
        };
        if scrape.interval_secs == 0 {
            return Err(anyhow!("SCRAPE_INTERVAL_SECS must be greater than zero"));
        }

        let defaults = DedupParams::default();
        let dedup = DedupParams {
            num_hashes: parse_or(&lookup, "DEDUP_NUM_HASHES", defaults.num_hashes)?,
            bands: parse_or(&lookup, "DEDUP_BANDS", defaults.bands)?,
            shingle_size: parse_or(&lookup, "DEDUP_SHINGLE_SIZE", defaults.shingle_size)?,
            threshold: parse_or(&lookup, "DEDUP_THRESHOLD", defaults.threshold)?,
            window: window_days(parse_or(&lookup, "DEDUP_WINDOW_DAYS", 14_i64)?)?,
            max_entries: parse_or(&lookup, "DEDUP_MAX_ENTRIES", defaults.max_entries)?,
        };
        dedup
            .validate()
            .context("Invalid DEDUP_* configuration")?;

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            redis_url: require("REDIS_URL")?,
            port: parse_or(&lookup, "PORT", 8080_u16)
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            llm_provider,
            llm_api_key,
            scrape,
            dedup,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("Invalid value for '{key}': {e}")),
        _ => Ok(default),
    }
}

fn window_days(days: i64) -> Result<Duration> {
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(anyhow!(
            "Invalid value for 'DEDUP_WINDOW_DAYS': must be between 1 and {MAX_WINDOW_DAYS}, got {days}"
        ));
    }
    Duration::try_days(days)
        .ok_or_else(|| anyhow!("Invalid value for 'DEDUP_WINDOW_DAYS': {days} is out of range"))
}

fn parse_list(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/jobwatch"),
        ("REDIS_URL", "redis://localhost"),
        ("ANTHROPIC_API_KEY", "sk-test"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(BASE)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.llm_provider, Provider::Anthropic);
        assert_eq!(config.scrape.interval_secs, 3600);
        assert!(config.scrape.scheduler_enabled);
        assert!(config.scrape.greenhouse_boards.is_empty());
        assert_eq!(config.dedup.num_hashes, 128);
        assert_eq!(config.dedup.window, Duration::days(14));
    }

    #[test]
    fn test_missing_database_url_fails() {
        let err = Config::from_lookup(lookup_from(&[
            ("REDIS_URL", "redis://localhost"),
            ("ANTHROPIC_API_KEY", "sk-test"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_openai_provider_requires_openai_key() {
        let mut pairs = BASE.to_vec();
        pairs.push(("LLM_PROVIDER", "openai"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        pairs.push(("OPENAI_API_KEY", "sk-openai"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.llm_provider, Provider::OpenAi);
        assert_eq!(config.llm_api_key, "sk-openai");
    }

    #[test]
    fn test_board_lists_are_split_and_trimmed() {
        let mut pairs = BASE.to_vec();
        pairs.push(("GREENHOUSE_BOARDS", " acme, globex ,,initech "));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.scrape.greenhouse_boards, vec!["acme", "globex", "initech"]);
    }

    #[test]
    fn test_invalid_numbers_name_the_variable() {
        let mut pairs = BASE.to_vec();
        pairs.push(("PORT", "eighty"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(format!("{err:#}").contains("PORT"));
    }

    #[test]
    fn test_window_days_out_of_range_is_an_error() {
        for raw in ["9223372036854775807", "1000000000", "0"] {
            let mut pairs = BASE.to_vec();
            pairs.push(("DEDUP_WINDOW_DAYS", raw));
            let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
            assert!(format!("{err:#}").contains("DEDUP_WINDOW_DAYS"), "{raw}: {err:#}");
        }
    }

    #[test]
    fn test_invalid_dedup_params_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("DEDUP_BANDS", "7"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }
}
