use std::collections::{HashMap, HashSet};

use crate::models::{Catalog, CatalogItem};

/// Per-item character cap for ephemeral follow-up indexes, respecting
/// downstream token limits
pub const DOCUMENT_CHAR_LIMIT: usize = 1200;

/// Number of documents handed to the composer per QA turn
pub const RETRIEVE_TOP_K: usize = 3;

/// One indexed document: the item title plus its (possibly truncated) text
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedDocument {
    pub title: String,
    pub text: String,
}

/// Lexical retrieval over item documents.
///
/// Scores documents by IDF-weighted query-token overlap. A global index over
/// the whole catalog backs general QA; ephemeral indexes over the last
/// recommendation set back follow-up questions and are rebuilt per call,
/// never cached across turns.
#[derive(Debug, Default)]
pub struct RetrievalIndex {
    docs: Vec<IndexedDocument>,
    doc_tokens: Vec<HashSet<String>>,
    idf: HashMap<String, f32>,
}

impl RetrievalIndex {
    /// Builds the session-global index from full item documents
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self::build(
            catalog
                .items()
                .iter()
                .map(|item| IndexedDocument {
                    title: item.title.clone(),
                    text: item.document(),
                })
                .collect(),
        )
    }

    /// Builds an ephemeral index from a recommendation set, truncating each
    /// document to the per-item cap
    pub fn from_items(items: &[CatalogItem]) -> Self {
        Self::build(
            items
                .iter()
                .map(|item| IndexedDocument {
                    title: item.title.clone(),
                    text: truncate_document(&item.document(), DOCUMENT_CHAR_LIMIT),
                })
                .collect(),
        )
    }

    fn build(docs: Vec<IndexedDocument>) -> Self {
        let doc_tokens: Vec<HashSet<String>> = docs
            .iter()
            .map(|doc| tokenize(&doc.text).into_iter().collect())
            .collect();

        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        for tokens in &doc_tokens {
            for token in tokens {
                *document_frequency.entry(token.clone()).or_insert(0) += 1;
            }
        }

        let total = docs.len().max(1) as f32;
        let idf = document_frequency
            .into_iter()
            .map(|(token, df)| (token, (total / df as f32).ln() + 1.0))
            .collect();

        Self {
            docs,
            doc_tokens,
            idf,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Top-k documents by IDF-weighted overlap with the query; documents with
    /// no overlapping token are never returned. Ties keep index order.
    pub fn retrieve(&self, query: &str, k: usize) -> Vec<&IndexedDocument> {
        let query_tokens: HashSet<String> = tokenize(query).into_iter().collect();
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f32, &IndexedDocument)> = self
            .docs
            .iter()
            .zip(&self.doc_tokens)
            .filter_map(|(doc, tokens)| {
                let score: f32 = query_tokens
                    .iter()
                    .filter(|t| tokens.contains(*t))
                    .map(|t| self.idf.get(t).copied().unwrap_or(1.0))
                    .sum();
                (score > 0.0).then_some((score, doc))
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(k).map(|(_, doc)| doc).collect()
    }
}

/// Lowercased alphanumeric tokens; Korean syllables count as alphabetic
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Truncates to a character cap, marking the cut with an ellipsis
pub fn truncate_document(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let truncated: String = text.chars().take(limit).collect();
    format!("{}...", truncated)
}
