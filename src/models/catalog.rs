use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::keyword::{KeywordCategory, UserMeta};

/// One recommendable item from the catalog snapshot.
///
/// Immutable after load. Keyword category fields hold comma-joined
/// controlled-vocabulary tokens exactly as they appear in the source data.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CatalogItem {
    #[serde(default)]
    pub content_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub actor: String,
    #[serde(default)]
    pub director: String,
    #[serde(default)]
    pub cp_name: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub running_time: Option<u32>,
    #[serde(rename = "Emotion", default)]
    pub emotion: String,
    #[serde(rename = "Subject", default)]
    pub subject: String,
    #[serde(default)]
    pub atmosphere: String,
    #[serde(default)]
    pub background: String,
    #[serde(rename = "character_A", default)]
    pub character_a: String,
    #[serde(rename = "character_B", default)]
    pub character_b: String,
    #[serde(rename = "character_C", default)]
    pub character_c: String,
    #[serde(default)]
    pub criminal: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub love: String,
    #[serde(default)]
    pub natural_science: String,
    #[serde(default)]
    pub religion: String,
    #[serde(default)]
    pub social_culture: String,
    #[serde(default)]
    pub style: String,
}

impl CatalogItem {
    /// Raw comma-joined keyword field for one category
    pub fn keyword_field(&self, category: KeywordCategory) -> &str {
        match category {
            KeywordCategory::Emotion => &self.emotion,
            KeywordCategory::Subject => &self.subject,
            KeywordCategory::Atmosphere => &self.atmosphere,
            KeywordCategory::Background => &self.background,
            KeywordCategory::CharacterA => &self.character_a,
            KeywordCategory::CharacterB => &self.character_b,
            KeywordCategory::CharacterC => &self.character_c,
            KeywordCategory::Criminal => &self.criminal,
            KeywordCategory::Family => &self.family,
            KeywordCategory::Genre => &self.genre,
            KeywordCategory::Love => &self.love,
            KeywordCategory::NaturalScience => &self.natural_science,
            KeywordCategory::Religion => &self.religion,
            KeywordCategory::SocialCulture => &self.social_culture,
            KeywordCategory::Style => &self.style,
        }
    }

    /// Trimmed, non-empty tokens of one keyword field
    pub fn keyword_tokens(&self, category: KeywordCategory) -> impl Iterator<Item = &str> {
        self.keyword_field(category)
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Textual value of a named column, used by dislike rules.
    ///
    /// Covers the free-text columns and every keyword category column;
    /// unknown names yield `None`.
    pub fn field_text(&self, column: &str) -> Option<&str> {
        match column {
            "actor" => Some(&self.actor),
            "director" => Some(&self.director),
            "description" => Some(&self.description),
            "cp_name" => Some(&self.cp_name),
            other => KeywordCategory::from_name(other).map(|c| self.keyword_field(c)),
        }
    }

    /// Derives a desired-keyword mapping from this item's own metadata,
    /// used by the similar-recommendation branch.
    pub fn as_user_meta(&self) -> UserMeta {
        let mut meta = UserMeta::new();
        for category in KeywordCategory::ALL {
            meta.extend(category, self.keyword_tokens(category));
        }
        meta
    }

    /// Full textual representation of the item, fed to the fallback selector
    /// and the retrieval indexes.
    pub fn document(&self) -> String {
        let running_time = self
            .running_time
            .map(|m| m.to_string())
            .unwrap_or_default();
        format!(
            "제목: \"{}\"\n\
             감독/연출: \"{}\"\n\
             출연/배우: \"{}\"\n\
             제작/배급사: \"{}\"\n\
             평점: \"{}\"\n\
             러닝타임(분): \"{}\"\n\
             줄거리: \"{}\"\n\
             메타:\n\
             - 주제: \"{}\"\n\
             - 장르: \"{}\"\n\
             - 감정: \"{}\"\n\
             - 분위기: \"{}\"\n\
             - 캐릭터: \"{}\"\n\
             - 판타지적 요소: \"{}\"\n\
             - 직업적 요소: \"{}\"\n\
             - 사랑 요소: \"{}\"\n\
             - 가족 요소: \"{}\"\n\
             - 범죄 요소: \"{}\"\n\
             - 사회 요소: \"{}\"\n\
             - 자연 요소: \"{}\"\n\
             - 배경 요소: \"{}\"\n\
             - 종교 요소: \"{}\"\n\
             - 영화 스타일: \"{}\"\n",
            self.title,
            self.director,
            self.actor,
            self.cp_name,
            self.rating,
            running_time,
            self.description,
            self.subject,
            self.genre,
            self.emotion,
            self.atmosphere,
            self.character_a,
            self.character_b,
            self.character_c,
            self.love,
            self.family,
            self.criminal,
            self.social_culture,
            self.natural_science,
            self.background,
            self.religion,
            self.style,
        )
    }
}

static ANNOTATION_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\(\[]?(더빙|자막|극장판)[\)\]]?\s*").expect("valid annotation pattern")
});

static NON_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid non-word pattern"));

/// Canonical title form used for exclusion and duplicate suppression.
///
/// A leading dubbed/subtitled/theatrical annotation is stripped and
/// surrounding whitespace trimmed; titles differing only in such annotations
/// are the same entity.
pub fn normalize_title(title: &str) -> String {
    ANNOTATION_PREFIX_RE.replace(title, "").trim().to_string()
}

/// Looser normal form for completion-turn matching: punctuation removed,
/// lowercased.
pub fn normalize_for_match(text: &str) -> String {
    NON_WORD_RE.replace_all(text, "").to_lowercase()
}

/// The static, read-only set of recommendable items for a session.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }

    /// Loads the catalog snapshot from a JSON array file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open catalog file at {}", path.display()))?;
        let items: Vec<CatalogItem> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse catalog file at {}", path.display()))?;
        Ok(Self::new(items))
    }

    /// Items in load order; this order is the ranking tie-break
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Exact-title lookup
    pub fn find_by_title(&self, title: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.title == title)
    }
}
