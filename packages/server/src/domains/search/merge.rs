//! Merging, scoring and ordering of per-engine result lists.
//!
//! Merging is deterministic and commutative over arrival order: batches are
//! re-sorted by engine id before fusion, ties break on duplicate count and
//! earliest position, and `sort=random` shuffles with a seed derived from
//! the query text.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

use crate::domains::query::{Query, SortOrder};
use crate::domains::results::{normalize_url, Facets, SearchResult};

/// One engine's tagged output, pushed into the aggregation buffer.
#[derive(Debug, Clone)]
pub struct EngineBatch {
    pub engine_id: String,
    pub priority: u8,
    pub results: Vec<SearchResult>,
}

/// Fused output before pagination.
#[derive(Debug, Default)]
pub struct Merged {
    pub results: Vec<SearchResult>,
    pub facets: Facets,
    pub engines_used: Vec<String>,
}

/// Reciprocal-rank contribution of a result at 0-based position `p`,
/// weighted by the engine's priority.
fn position_weight(priority: u8, position: usize) -> f64 {
    priority as f64 * (1.0 / (1.0 + position as f64))
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Operator-derived filters most upstreams cannot apply themselves.
fn passes_filters(query: &Query, result: &SearchResult) -> bool {
    let filters = &query.filters;

    if let Some(site) = &filters.site {
        let site = site.trim_start_matches("www.");
        if !(result.domain == *site || result.domain.ends_with(&format!(".{site}"))) {
            return false;
        }
    }
    for site in &filters.exclude_sites {
        let site = site.trim_start_matches("www.");
        if result.domain == *site || result.domain.ends_with(&format!(".{site}")) {
            return false;
        }
    }
    for term in &filters.exclude_terms {
        if contains_ci(&result.title, term) || contains_ci(&result.content, term) {
            return false;
        }
    }
    if !filters.file_types.is_empty() {
        match &result.file_type {
            Some(ft) => {
                if !filters.file_types.iter().any(|w| w.eq_ignore_ascii_case(ft)) {
                    return false;
                }
            }
            None => {
                // Fall back to the URL extension.
                if !filters
                    .file_types
                    .iter()
                    .any(|w| result.url.to_lowercase().ends_with(&format!(".{w}")))
                {
                    return false;
                }
            }
        }
    }
    if let Some(needle) = &filters.in_url {
        if !contains_ci(&result.url, needle) {
            return false;
        }
    }
    if let Some(needle) = &filters.in_title {
        if !contains_ci(&result.title, needle) {
            return false;
        }
    }
    if let Some(needle) = &filters.in_text {
        if !contains_ci(&result.content, needle) {
            return false;
        }
    }
    if let Some(before) = filters.date_before {
        match result.published_at {
            Some(published) if published.date_naive() <= before => {}
            _ => return false,
        }
    }
    if let Some(after) = filters.date_after {
        match result.published_at {
            Some(published) if published.date_naive() >= after => {}
            _ => return false,
        }
    }
    true
}

/// Fuse per-engine batches into one deduplicated, ordered list.
pub fn merge(query: &Query, mut batches: Vec<EngineBatch>) -> Merged {
    // Arrival order reflects completion order; sort so the outcome does not.
    batches.sort_by(|a, b| a.engine_id.cmp(&b.engine_id));

    let mut merged: Vec<SearchResult> = Vec::new();
    let mut contributors: Vec<HashSet<String>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut engines_used: Vec<String> = Vec::new();

    for batch in &batches {
        if !batch.results.is_empty() {
            engines_used.push(batch.engine_id.clone());
        }
        let mut seen_in_batch: HashSet<String> = HashSet::new();

        for (position, result) in batch.results.iter().enumerate() {
            let mut result = result.clone();
            result.sanitize();
            if result.url.is_empty() || !passes_filters(query, &result) {
                continue;
            }

            let key = normalize_url(&result.url);
            if key.is_empty() || !seen_in_batch.insert(key.clone()) {
                continue;
            }
            let weight = position_weight(batch.priority, position);

            match index.get(&key) {
                Some(&i) => {
                    merged[i].score += weight;
                    contributors[i].insert(batch.engine_id.clone());
                    merged[i].duplicate_count = contributors[i].len();
                    merged[i].position = merged[i].position.min(position);
                    if merged[i].thumbnail.is_none() {
                        merged[i].thumbnail = result.thumbnail.clone();
                    }
                }
                None => {
                    result.engine = batch.engine_id.clone();
                    result.position = position;
                    result.score = weight;
                    result.duplicate_count = 1;
                    index.insert(key, merged.len());
                    contributors.push(HashSet::from([batch.engine_id.clone()]));
                    merged.push(result);
                }
            }
        }
    }

    sort_results(query.sort_by, &query.text, &mut merged);

    let mut facets = Facets::default();
    for result in &merged {
        if !result.domain.is_empty() {
            *facets.domains.entry(result.domain.clone()).or_insert(0) += 1;
        }
        if let Some(language) = &result.language {
            *facets.languages.entry(language.clone()).or_insert(0) += 1;
        }
    }

    Merged {
        results: merged,
        facets,
        engines_used,
    }
}

/// Seed for `sort=random`: identical query text gives an identical order.
fn shuffle_seed(text: &str) -> u64 {
    let digest = Sha256::digest(text.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

fn sort_results(sort: SortOrder, query_text: &str, results: &mut [SearchResult]) {
    match sort {
        SortOrder::Relevance => {
            results.sort_by(|a, b| {
                b.score
                    .total_cmp(&a.score)
                    .then(b.duplicate_count.cmp(&a.duplicate_count))
                    .then(a.position.cmp(&b.position))
            });
        }
        SortOrder::Date => {
            // Stable sort: dateless items sink, preserving relative order.
            results.sort_by(|a, b| match (a.published_at, b.published_at) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
        }
        SortOrder::DateAsc => {
            results.sort_by(|a, b| match (a.published_at, b.published_at) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
        }
        SortOrder::Popularity => {
            results.sort_by(|a, b| {
                let pa = a.popularity.unwrap_or(a.score);
                let pb = b.popularity.unwrap_or(b.score);
                pb.total_cmp(&pa).then(b.score.total_cmp(&a.score))
            });
        }
        SortOrder::Random => {
            let mut rng = StdRng::seed_from_u64(shuffle_seed(query_text));
            results.shuffle(&mut rng);
        }
    }
}
