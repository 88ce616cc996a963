// Job deduplication: shingling, MinHash signatures, and a rolling-window LSH index.
// Pure and synchronous; callers hold the shared index behind a tokio RwLock.

pub mod index;
pub mod minhash;
pub mod shingle;

use chrono::Duration;
use serde::Serialize;
use thiserror::Error;

pub use index::{DedupDecision, DedupIndex, DuplicateReason, IndexStats, PostingFields};

/// Longest rolling window accepted, in days.
pub const MAX_WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Error, PartialEq)]
pub enum DedupError {
    #[error("invalid dedup parameter: {0}")]
    InvalidParam(String),
}

/// Tuning knobs for the dedup index.
#[derive(Debug, Clone, Serialize)]
pub struct DedupParams {
    /// Signature length (number of hash functions).
    pub num_hashes: usize,
    /// LSH bands; must divide `num_hashes`.
    pub bands: usize,
    /// Tokens per shingle.
    pub shingle_size: usize,
    /// Minimum estimated Jaccard similarity to flag a near-duplicate.
    pub threshold: f64,
    #[serde(skip)]
    pub window: Duration,
    pub max_entries: usize,
}

impl Default for DedupParams {
    fn default() -> Self {
        Self {
            num_hashes: 128,
            bands: 32,
            shingle_size: 3,
            threshold: 0.8,
            window: Duration::days(14),
            max_entries: 50_000,
        }
    }
}

impl DedupParams {
    pub fn validate(&self) -> Result<(), DedupError> {
        if self.num_hashes == 0 || self.bands == 0 || self.shingle_size == 0 {
            return Err(DedupError::InvalidParam(
                "num_hashes, bands and shingle_size must be >= 1".to_string(),
            ));
        }
        if self.num_hashes % self.bands != 0 {
            return Err(DedupError::InvalidParam(format!(
                "num_hashes ({}) must be divisible by bands ({})",
                self.num_hashes, self.bands
            )));
        }
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(DedupError::InvalidParam(format!(
                "threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }
        if self.window <= Duration::zero() {
            return Err(DedupError::InvalidParam("window must be positive".to_string()));
        }
        if self.window > Duration::days(MAX_WINDOW_DAYS) {
            return Err(DedupError::InvalidParam(format!(
                "window must be at most {MAX_WINDOW_DAYS} days"
            )));
        }
        if self.max_entries == 0 {
            return Err(DedupError::InvalidParam("max_entries must be >= 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        assert!(DedupParams::default().validate().is_ok());
    }

    #[test]
    fn test_threshold_out_of_range() {
        let params = DedupParams {
            threshold: 1.5,
            ..DedupParams::default()
        };
        assert!(params.validate().is_err());
        let params = DedupParams {
            threshold: 0.0,
            ..DedupParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_window_bounds() {
        let params = DedupParams {
            window: Duration::days(1_000_000_000),
            ..DedupParams::default()
        };
        assert!(params.validate().is_err());
        let params = DedupParams {
            window: Duration::days(MAX_WINDOW_DAYS),
            ..DedupParams::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_bands_must_divide_hashes() {
        let params = DedupParams {
            num_hashes: 120,
            bands: 16,
            ..DedupParams::default()
        };
        assert!(matches!(params.validate(), Err(DedupError::InvalidParam(_))));
    }
}
