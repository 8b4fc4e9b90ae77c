use std::cmp::Ordering;

use regex::RegexBuilder;

use crate::config::Config;
use crate::models::{CatalogItem, UserMeta};

/// Knobs for the scoring and fallback paths
#[derive(Debug, Clone, Copy)]
pub struct ScoringConfig {
    /// Cap on the keyword-scored result set
    pub recommend_limit: usize,
    /// Cap on the rating-ranked fallback set; intentionally smaller since
    /// this path has weaker precision
    pub fallback_limit: usize,
    /// Minimum total extracted-keyword count for the scoring path
    pub keyword_threshold: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            recommend_limit: 5,
            fallback_limit: 3,
            keyword_threshold: 5,
        }
    }
}

impl From<&Config> for ScoringConfig {
    fn from(config: &Config) -> Self {
        Self {
            recommend_limit: config.recommend_limit,
            fallback_limit: config.fallback_limit,
            keyword_threshold: config.keyword_threshold,
        }
    }
}

/// Category-overlap relevance score between an item and extracted keywords.
///
/// For each category present in the meta, the cardinality of the intersection
/// with the item's comma-split tokens is added; absent categories contribute
/// zero.
pub fn content_score(item: &CatalogItem, meta: &UserMeta) -> usize {
    meta.categories()
        .map(|(category, wanted)| {
            item.keyword_tokens(category)
                .filter(|token| wanted.iter().any(|w| w == token))
                .count()
        })
        .sum()
}

/// Ranks candidates by score descending and truncates to `limit`.
///
/// Score zero is a hard admission filter, not just a sort key. Ties keep the
/// input (catalog) order — the stable sort is the only determinism guarantee
/// offered.
pub fn rank_by_score<'a>(
    candidates: &[&'a CatalogItem],
    meta: &UserMeta,
    limit: usize,
) -> Vec<&'a CatalogItem> {
    let mut scored: Vec<(usize, &CatalogItem)> = candidates
        .iter()
        .map(|item| (content_score(item, meta), *item))
        .filter(|(score, _)| *score > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(limit).map(|(_, item)| item).collect()
}

/// Degraded selection for sparse keyword extractions.
///
/// All tokens are flattened into one case-insensitive literal alternation and
/// matched against each item's full document text; matching rows are ranked
/// by rating descending and truncated to `limit`. Any match admits a row.
pub fn fallback_by_rating<'a>(
    candidates: &[&'a CatalogItem],
    meta: &UserMeta,
    limit: usize,
) -> Vec<&'a CatalogItem> {
    let tokens = meta.flatten();
    if tokens.is_empty() {
        return Vec::new();
    }

    let pattern = tokens
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    let matcher = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to build fallback matcher");
            return Vec::new();
        }
    };

    let mut matched: Vec<&CatalogItem> = candidates
        .iter()
        .copied()
        .filter(|item| matcher.is_match(&item.document()))
        .collect();
    matched.sort_by(|a, b| {
        b.rating
            .partial_cmp(&a.rating)
            .unwrap_or(Ordering::Equal)
    });
    matched.truncate(limit);
    matched
}

/// Picks the scoring strategy for one recommendation call.
///
/// Sparse extractions produce unreliable category-overlap scores, so below
/// the threshold the cruder containment-plus-rating signal is used instead.
pub fn recommend<'a>(
    candidates: &[&'a CatalogItem],
    meta: &UserMeta,
    config: &ScoringConfig,
) -> Vec<&'a CatalogItem> {
    if meta.total_keywords() >= config.keyword_threshold {
        rank_by_score(candidates, meta, config.recommend_limit)
    } else {
        fallback_by_rating(candidates, meta, config.fallback_limit)
    }
}
