use serde::Serialize;

use super::catalog::CatalogItem;

/// Conversational branch resolved for a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    FirstRecommend,
    FollowUp,
    Similar,
    Retry,
    Complete,
    GeneralQa,
    Terminated,
}

/// The ordered result of one scoring call, tagged with the query and branch
/// that produced it.
///
/// Owned exclusively by [`SessionState`]; replaced wholesale on each
/// successful recommendation, never mutated in place.
#[derive(Debug, Clone)]
pub struct RecommendationSet {
    pub items: Vec<CatalogItem>,
    pub query: String,
    pub branch: Branch,
}

impl RecommendationSet {
    pub fn titles(&self) -> Vec<String> {
        self.items.iter().map(|item| item.title.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Per-session conversational memory.
///
/// Created at session start, mutated only by branch handlers, discarded at
/// session end. Only the user-profile aggregates persist across sessions.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub user_id: i64,
    pub user_name: String,
    pub first_turn: bool,
    pub last_recommendation: Option<RecommendationSet>,
    pub last_query: Option<String>,
    pub selected_title: Option<String>,
    pub last_interaction_id: Option<i64>,
    pub branch: Option<Branch>,
}

impl SessionState {
    pub fn new(user_id: i64, user_name: impl Into<String>) -> Self {
        Self {
            user_id,
            user_name: user_name.into(),
            first_turn: true,
            last_recommendation: None,
            last_query: None,
            selected_title: None,
            last_interaction_id: None,
            branch: None,
        }
    }

    /// Clears conversational memory for a fresh start, keeping user identity.
    /// Used by the exit branch; the session itself stays alive.
    pub fn reset(&mut self) {
        self.first_turn = true;
        self.last_recommendation = None;
        self.last_query = None;
        self.selected_title = None;
        self.last_interaction_id = None;
        self.branch = None;
    }

    /// Titles of the last recommendation set, empty when none exists
    pub fn last_titles(&self) -> Vec<String> {
        self.last_recommendation
            .as_ref()
            .map(RecommendationSet::titles)
            .unwrap_or_default()
    }

    /// Whether a non-empty prior recommendation exists
    pub fn has_recommendation(&self) -> bool {
        self.last_recommendation
            .as_ref()
            .is_some_and(|set| !set.is_empty())
    }

    /// Records a successful recommendation: the set is replaced wholesale,
    /// the producing query becomes the retry anchor and the first-turn flag
    /// is cleared.
    pub fn record_recommendation(&mut self, set: RecommendationSet) {
        self.last_query = Some(set.query.clone());
        self.last_recommendation = Some(set);
        self.first_turn = false;
    }
}
