//! Text normalization and shingling for posting similarity.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

fn markup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>|&[a-zA-Z]+;|&#[0-9]+;").expect("valid markup regex"))
}

/// Strips HTML tags and entities, lowercases, replaces anything that is not
/// alphanumeric with a space and collapses runs of whitespace.
pub fn normalize(text: &str) -> String {
    let stripped = markup_re().replace_all(text, " ");
    let cleaned: String = stripped
        .chars()
        .flat_map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                vec![' ']
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Builds the set of contiguous `k`-token shingles of the normalized text.
///
/// A document with fewer than `k` tokens yields a single shingle holding all of
/// them; a document with no tokens yields the empty set.
pub fn shingles(text: &str, k: usize) -> HashSet<String> {
    let normalized = normalize(text);
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let k = k.max(1);

    if tokens.is_empty() {
        return HashSet::new();
    }
    if tokens.len() < k {
        return HashSet::from([tokens.join(" ")]);
    }
    tokens.windows(k).map(|w| w.join(" ")).collect()
}

/// The text that represents a posting for similarity purposes.
pub fn posting_text(title: &str, company: &str, description: &str) -> String {
    format!("{title} {company} {description}")
}

/// Canonical form of a posting URL used for exact-match dedup.
///
/// Lowercases scheme and host, drops query string, fragment and trailing slash.
/// Returns an empty string for blank input.
pub fn canonical_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);

    let (scheme, rest) = match without_query.split_once("://") {
        Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
        None => ("https".to_string(), without_query),
    };
    let (host, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };
    let host = host.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let path = path.trim_end_matches('/');

    format!("{scheme}://{host}{path}")
}
