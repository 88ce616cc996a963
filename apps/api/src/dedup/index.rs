//! Rolling-window dedup index with LSH banding for candidate lookup.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::minhash::{MinHasher, Signature};
use super::shingle::{canonical_url, posting_text, shingles};
use super::{DedupError, DedupParams};

/// Why a posting was classified as a duplicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DuplicateReason {
    /// Same source and external id, i.e. a re-scrape.
    SameListing,
    /// Same canonical URL.
    SameUrl,
    /// Estimated Jaccard similarity above the threshold.
    NearDuplicate { similarity: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum DedupDecision {
    Unique,
    Duplicate { of: Uuid, reason: DuplicateReason },
}

/// A posting reduced to what the index compares.
#[derive(Debug, Clone)]
pub struct Candidate {
    listing: (String, String),
    url: String,
    signature: Signature,
    bands: Vec<u64>,
}

/// Borrowed view of a posting's identifying fields.
#[derive(Debug, Clone, Copy)]
pub struct PostingFields<'a> {
    pub source: &'a str,
    pub external_id: &'a str,
    pub url: &'a str,
    pub title: &'a str,
    pub company: &'a str,
    pub description: &'a str,
}

struct Entry {
    listing: (String, String),
    url: String,
    signature: Signature,
    bands: Vec<u64>,
    seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub entries: usize,
    pub indexed_signatures: usize,
    pub window_days: i64,
    pub threshold: f64,
}

/// Postings seen within the rolling window.
///
/// `order` stays sorted by `seen_at`, so eviction only ever looks at the front.
pub struct DedupIndex {
    params: DedupParams,
    hasher: MinHasher,
    entries: HashMap<Uuid, Entry>,
    order: VecDeque<(DateTime<Utc>, Uuid)>,
    by_listing: HashMap<(String, String), Uuid>,
    by_url: HashMap<String, Uuid>,
    buckets: Vec<HashMap<u64, Vec<Uuid>>>,
}

impl DedupIndex {
    pub fn new(params: DedupParams) -> Result<Self, DedupError> {
        params.validate()?;
        Ok(Self {
            hasher: MinHasher::new(params.num_hashes),
            buckets: (0..params.bands).map(|_| HashMap::new()).collect(),
            params,
            entries: HashMap::new(),
            order: VecDeque::new(),
            by_listing: HashMap::new(),
            by_url: HashMap::new(),
        })
    }

    pub fn params(&self) -> &DedupParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            entries: self.len(),
            indexed_signatures: self
                .entries
                .values()
                .filter(|e| !e.signature.is_empty())
                .count(),
            window_days: self.params.window.num_days(),
            threshold: self.params.threshold,
        }
    }

    /// Builds the comparison form of a posting.
    pub fn candidate(&self, posting: PostingFields<'_>) -> Candidate {
        let text = posting_text(posting.title, posting.company, posting.description);
        let signature = self
            .hasher
            .signature(&shingles(&text, self.params.shingle_size));
        let bands = signature.band_hashes(self.params.bands);
        Candidate {
            listing: (posting.source.to_string(), posting.external_id.to_string()),
            url: canonical_url(posting.url),
            signature,
            bands,
        }
    }

    /// Evicts expired entries, then classifies `candidate` against the window.
    pub fn check(&mut self, candidate: &Candidate, now: DateTime<Utc>) -> DedupDecision {
        self.evict_expired(now);
        if self.is_empty() {
            return DedupDecision::Unique;
        }

        if let Some(&id) = self.by_listing.get(&candidate.listing) {
            return DedupDecision::Duplicate {
                of: id,
                reason: DuplicateReason::SameListing,
            };
        }

        if !candidate.url.is_empty() {
            if let Some(&id) = self.by_url.get(&candidate.url) {
                return DedupDecision::Duplicate {
                    of: id,
                    reason: DuplicateReason::SameUrl,
                };
            }
        }

        if candidate.signature.is_empty() {
            return DedupDecision::Unique;
        }

        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut best: Option<(Uuid, f64, DateTime<Utc>)> = None;
        for (band_idx, key) in candidate.bands.iter().enumerate() {
            let Some(ids) = self.buckets[band_idx].get(key) else {
                continue;
            };
            for id in ids {
                if !seen.insert(*id) {
                    continue;
                }
                let Some(entry) = self.entries.get(id) else {
                    continue;
                };
                let similarity = candidate.signature.jaccard(&entry.signature);
                let better = match best {
                    None => true,
                    Some((_, best_sim, best_seen)) => {
                        similarity > best_sim
                            || (similarity == best_sim && entry.seen_at < best_seen)
                    }
                };
                if better {
                    best = Some((*id, similarity, entry.seen_at));
                }
            }
        }

        debug!("LSH produced {} candidates", seen.len());

        match best {
            Some((id, similarity, _)) if similarity >= self.params.threshold => {
                DedupDecision::Duplicate {
                    of: id,
                    reason: DuplicateReason::NearDuplicate { similarity },
                }
            }
            _ => DedupDecision::Unique,
        }
    }

    /// Adds a posting to the window. Degenerate signatures remain reachable by
    /// listing and URL but never enter the LSH buckets.
    pub fn insert(&mut self, id: Uuid, candidate: Candidate, seen_at: DateTime<Utc>) {
        if self.entries.contains_key(&id) {
            self.remove(id);
        }

        if !candidate.signature.is_empty() {
            for (band_idx, key) in candidate.bands.iter().enumerate() {
                self.buckets[band_idx].entry(*key).or_default().push(id);
            }
        }
        self.by_listing.insert(candidate.listing.clone(), id);
        if !candidate.url.is_empty() {
            self.by_url.insert(candidate.url.clone(), id);
        }
        self.entries.insert(
            id,
            Entry {
                listing: candidate.listing,
                url: candidate.url,
                signature: candidate.signature,
                bands: candidate.bands,
                seen_at,
            },
        );
        let pos = self.order.partition_point(|&(t, _)| t <= seen_at);
        self.order.insert(pos, (seen_at, id));

        while self.entries.len() > self.params.max_entries {
            let Some((seen_at, oldest)) = self.order.pop_front() else {
                break;
            };
            if self.is_current(oldest, seen_at) {
                self.remove(oldest);
            }
        }
    }

    /// Drops every entry first seen before `now - window`.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(self.params.window) else {
            return 0;
        };
        let mut evicted = 0;
        while let Some(&(seen_at, id)) = self.order.front() {
            if seen_at >= cutoff {
                break;
            }
            self.order.pop_front();
            if self.is_current(id, seen_at) && self.remove(id) {
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!("Evicted {evicted} postings from dedup window");
        }
        evicted
    }

    /// Whether `(seen_at, id)` in `order` still refers to the live entry.
    /// Re-inserting an id leaves its earlier pair behind.
    fn is_current(&self, id: Uuid, seen_at: DateTime<Utc>) -> bool {
        self.entries.get(&id).map(|e| e.seen_at) == Some(seen_at)
    }

    fn remove(&mut self, id: Uuid) -> bool {
        let Some(entry) = self.entries.remove(&id) else {
            return false;
        };
        if self.by_listing.get(&entry.listing) == Some(&id) {
            self.by_listing.remove(&entry.listing);
        }
        if self.by_url.get(&entry.url) == Some(&id) {
            self.by_url.remove(&entry.url);
        }
        for (band_idx, key) in entry.bands.iter().enumerate() {
            if let Some(ids) = self.buckets[band_idx].get_mut(key) {
                ids.retain(|other| *other != id);
                if ids.is_empty() {
                    self.buckets[band_idx].remove(key);
                }
            }
        }
        true
    }
}
