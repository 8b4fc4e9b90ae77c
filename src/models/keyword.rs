use std::collections::BTreeMap;

/// The closed set of keyword categories carried by every catalog item.
///
/// Category names arriving from the extractor are matched against this set;
/// anything outside it is dropped at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeywordCategory {
    Emotion,
    Subject,
    Atmosphere,
    Background,
    CharacterA,
    CharacterB,
    CharacterC,
    Criminal,
    Family,
    Genre,
    Love,
    NaturalScience,
    Religion,
    SocialCulture,
    Style,
}

impl KeywordCategory {
    pub const ALL: [KeywordCategory; 15] = [
        KeywordCategory::Emotion,
        KeywordCategory::Subject,
        KeywordCategory::Atmosphere,
        KeywordCategory::Background,
        KeywordCategory::CharacterA,
        KeywordCategory::CharacterB,
        KeywordCategory::CharacterC,
        KeywordCategory::Criminal,
        KeywordCategory::Family,
        KeywordCategory::Genre,
        KeywordCategory::Love,
        KeywordCategory::NaturalScience,
        KeywordCategory::Religion,
        KeywordCategory::SocialCulture,
        KeywordCategory::Style,
    ];

    /// Source-data column name for this category
    pub fn name(&self) -> &'static str {
        match self {
            KeywordCategory::Emotion => "Emotion",
            KeywordCategory::Subject => "Subject",
            KeywordCategory::Atmosphere => "atmosphere",
            KeywordCategory::Background => "background",
            KeywordCategory::CharacterA => "character_A",
            KeywordCategory::CharacterB => "character_B",
            KeywordCategory::CharacterC => "character_C",
            KeywordCategory::Criminal => "criminal",
            KeywordCategory::Family => "family",
            KeywordCategory::Genre => "genre",
            KeywordCategory::Love => "love",
            KeywordCategory::NaturalScience => "natural_science",
            KeywordCategory::Religion => "religion",
            KeywordCategory::SocialCulture => "social_culture",
            KeywordCategory::Style => "style",
        }
    }

    /// Resolve a column name back to a category, `None` for unknown names
    pub fn from_name(name: &str) -> Option<Self> {
        KeywordCategory::ALL
            .iter()
            .find(|c| c.name() == name.trim())
            .copied()
    }
}

impl std::fmt::Display for KeywordCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Category → keyword mapping extracted from a single query.
///
/// Tokens are trimmed and de-duplicated per category, insertion order is
/// preserved. A fresh mapping is produced per query; mappings are never merged
/// in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserMeta {
    entries: BTreeMap<KeywordCategory, Vec<String>>,
}

impl UserMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one token to a category; empty and duplicate tokens are ignored
    pub fn push(&mut self, category: KeywordCategory, token: &str) {
        let token = token.trim();
        if token.is_empty() {
            return;
        }
        let tokens = self.entries.entry(category).or_default();
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }

    pub fn extend<'a>(&mut self, category: KeywordCategory, tokens: impl IntoIterator<Item = &'a str>) {
        for token in tokens {
            self.push(category, token);
        }
    }

    /// Tokens recorded for one category, empty slice when absent
    pub fn tokens(&self, category: KeywordCategory) -> &[String] {
        self.entries.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn categories(&self) -> impl Iterator<Item = (KeywordCategory, &[String])> {
        self.entries.iter().map(|(c, t)| (*c, t.as_slice()))
    }

    /// Total token count across all categories; drives scoring-path dispatch
    pub fn total_keywords(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_keywords() == 0
    }

    /// All tokens flattened across categories, in category order
    pub fn flatten(&self) -> Vec<&str> {
        self.entries
            .values()
            .flat_map(|tokens| tokens.iter().map(String::as_str))
            .collect()
    }
}
