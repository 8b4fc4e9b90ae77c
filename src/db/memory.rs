use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{AppError, AppResult};

use super::store::{FeedbackRecord, PersistenceStore};

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, i64>,
    // interaction id → (user id, input)
    interactions: HashMap<i64, (i64, String)>,
    // interaction id → titles
    recommendations: Vec<(i64, String)>,
    feedback: Vec<(i64, String, bool, bool)>,
    dislikes: Vec<(i64, String, String)>,
    next_id: i64,
}

/// In-memory store used by the test suites and for running without a
/// database file.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("memory store poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl PersistenceStore for MemoryStore {
    async fn get_or_create_user(&self, user_name: &str) -> AppResult<i64> {
        let mut state = self.lock()?;
        if let Some(id) = state.users.get(user_name) {
            return Ok(*id);
        }
        state.next_id += 1;
        let id = state.next_id;
        state.users.insert(user_name.to_string(), id);
        Ok(id)
    }

    async fn record_interaction(&self, user_id: i64, user_input: &str) -> AppResult<i64> {
        let mut state = self.lock()?;
        state.next_id += 1;
        let id = state.next_id;
        state
            .interactions
            .insert(id, (user_id, user_input.to_string()));
        Ok(id)
    }

    async fn log_recommendations(&self, interaction_id: i64, titles: &[String]) -> AppResult<()> {
        let mut state = self.lock()?;
        for title in titles {
            state.recommendations.push((interaction_id, title.clone()));
        }
        Ok(())
    }

    async fn record_feedback(
        &self,
        interaction_id: i64,
        title: &str,
        selected: bool,
        disliked: bool,
    ) -> AppResult<()> {
        let mut state = self.lock()?;
        state
            .feedback
            .push((interaction_id, title.to_string(), selected, disliked));
        Ok(())
    }

    async fn add_dislike(&self, user_id: i64, category: &str, value: &str) -> AppResult<()> {
        let mut state = self.lock()?;
        state
            .dislikes
            .push((user_id, category.to_string(), value.to_string()));
        Ok(())
    }

    async fn previous_titles(&self, user_id: i64) -> AppResult<Vec<String>> {
        let state = self.lock()?;
        Ok(state
            .recommendations
            .iter()
            .filter(|(interaction_id, _)| {
                state
                    .interactions
                    .get(interaction_id)
                    .is_some_and(|(owner, _)| *owner == user_id)
            })
            .map(|(_, title)| title.clone())
            .collect())
    }

    async fn dislikes(&self, user_id: i64) -> AppResult<Vec<(String, String)>> {
        let state = self.lock()?;
        Ok(state
            .dislikes
            .iter()
            .filter(|(owner, _, _)| *owner == user_id)
            .map(|(_, category, value)| (category.clone(), value.clone()))
            .collect())
    }

    async fn feedback_history(&self, user_id: i64) -> AppResult<Vec<FeedbackRecord>> {
        let state = self.lock()?;
        Ok(state
            .feedback
            .iter()
            .filter_map(|(interaction_id, title, selected, disliked)| {
                let (owner, input) = state.interactions.get(interaction_id)?;
                (*owner == user_id).then(|| FeedbackRecord {
                    user_input: input.clone(),
                    movie_title: title.clone(),
                    is_selected: *selected,
                    is_disliked: *disliked,
                    created_at: String::new(),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mirrors_sqlite_semantics() {
        let store = MemoryStore::new();
        let user = store.get_or_create_user("혜진").await.unwrap();
        assert_eq!(store.get_or_create_user("혜진").await.unwrap(), user);

        let interaction = store.record_interaction(user, "추천해줘").await.unwrap();
        store
            .log_recommendations(interaction, &["곡성".to_string()])
            .await
            .unwrap();
        store
            .record_feedback(interaction, "곡성", false, true)
            .await
            .unwrap();
        store.add_dislike(user, "title", "곡성").await.unwrap();

        assert_eq!(store.previous_titles(user).await.unwrap(), ["곡성"]);
        assert_eq!(
            store.dislikes(user).await.unwrap(),
            [("title".to_string(), "곡성".to_string())]
        );
        let history = store.feedback_history(user).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].is_disliked);
    }
}
