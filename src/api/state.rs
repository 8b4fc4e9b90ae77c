use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::db::PersistenceStore;
use crate::models::SessionState;
use crate::services::recommender::ChatEngine;

/// Shared application state.
///
/// The map lock is held only for lookup and insertion; each session carries
/// its own mutex so one session's turns are strictly sequential while
/// distinct sessions proceed in parallel.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
    pub store: Arc<dyn PersistenceStore>,
    pub sessions: Arc<RwLock<HashMap<Uuid, Arc<Mutex<SessionState>>>>>,
}

impl AppState {
    pub fn new(engine: Arc<ChatEngine>, store: Arc<dyn PersistenceStore>) -> Self {
        Self {
            engine,
            store,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Looks up a live session handle
    pub async fn session(&self, session_id: Uuid) -> Option<Arc<Mutex<SessionState>>> {
        self.sessions.read().await.get(&session_id).cloned()
    }
}
