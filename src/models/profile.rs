use std::collections::HashSet;

use super::catalog::normalize_title;

/// A single dislike rule: drop items whose named column contains the value
/// as a literal substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DislikeRule {
    pub column: String,
    pub value: String,
}

/// Per-user aggregates assembled from the store at the start of a
/// recommending turn.
///
/// `previous_titles` grows monotonically across sessions and never shrinks;
/// both title sets hold normalized titles.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub user_id: i64,
    pub previous_titles: HashSet<String>,
    pub disliked_titles: HashSet<String>,
    pub dislike_rules: Vec<DislikeRule>,
}

impl UserProfile {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    /// Builds a profile from raw store records.
    ///
    /// Dislikes with category `title` join the title exclusion set; every
    /// other category becomes a column substring rule.
    pub fn from_records(
        user_id: i64,
        previous_titles: Vec<String>,
        dislikes: Vec<(String, String)>,
    ) -> Self {
        let mut profile = Self::new(user_id);
        profile.previous_titles = previous_titles
            .iter()
            .map(|t| normalize_title(t))
            .collect();
        for (category, value) in dislikes {
            if category == "title" {
                profile.disliked_titles.insert(normalize_title(&value));
            } else {
                profile.dislike_rules.push(DislikeRule {
                    column: category,
                    value,
                });
            }
        }
        profile
    }

    /// Whether a normalized title is excluded by history or dislikes
    pub fn is_excluded_title(&self, normalized: &str) -> bool {
        self.previous_titles.contains(normalized) || self.disliked_titles.contains(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_records_partitions_dislikes() {
        let profile = UserProfile::from_records(
            7,
            vec!["(더빙) 인셉션".to_string()],
            vec![
                ("title".to_string(), "곡성".to_string()),
                ("actor".to_string(), "류승룡".to_string()),
            ],
        );

        assert!(profile.previous_titles.contains("인셉션"));
        assert!(profile.disliked_titles.contains("곡성"));
        assert_eq!(
            profile.dislike_rules,
            vec![DislikeRule {
                column: "actor".to_string(),
                value: "류승룡".to_string(),
            }]
        );
    }

    #[test]
    fn test_is_excluded_title() {
        let profile = UserProfile::from_records(
            1,
            vec!["업".to_string()],
            vec![("title".to_string(), "곡성".to_string())],
        );

        assert!(profile.is_excluded_title("업"));
        assert!(profile.is_excluded_title("곡성"));
        assert!(!profile.is_excluded_title("인셉션"));
    }
}
