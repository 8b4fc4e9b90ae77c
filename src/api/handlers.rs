use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::FeedbackRecord;
use crate::error::{AppError, AppResult};
use crate::models::{Branch, SessionState};
use crate::services::recommender::greeting_message;

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub user_name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub user_id: i64,
    pub greeting: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub branch: Branch,
    pub reply: String,
    pub titles: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub title: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub disliked: bool,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub titles: Vec<String>,
    pub query: Option<String>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Opens a conversational session for a named user
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> AppResult<(StatusCode, Json<CreateSessionResponse>)> {
    let user_name = request.user_name.trim();
    if user_name.is_empty() {
        return Err(AppError::InvalidInput("user_name must not be empty".to_string()));
    }

    let user_id = state.store.get_or_create_user(user_name).await?;
    let session_id = Uuid::new_v4();
    let session = Arc::new(Mutex::new(SessionState::new(user_id, user_name)));
    state.sessions.write().await.insert(session_id, session);

    tracing::info!(%session_id, user_id, "Session created");

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            user_id,
            greeting: greeting_message(user_name),
        }),
    ))
}

/// Processes one conversational turn
pub async fn chat(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    if request.message.trim().is_empty() {
        return Err(AppError::InvalidInput("message must not be empty".to_string()));
    }

    let session = state
        .session(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("session {} not found", session_id)))?;

    // Holding the session mutex across the turn serializes this session's
    // turns without blocking other sessions.
    let mut session = session.lock().await;
    let reply = state.engine.handle_turn(&mut session, &request.message).await;

    Ok(Json(ChatResponse {
        branch: reply.branch,
        reply: reply.message,
        titles: reply.titles,
    }))
}

/// Titles of the session's last recommendation set
pub async fn last_recommendations(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<RecommendationsResponse>> {
    let session = state
        .session(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("session {} not found", session_id)))?;

    let session = session.lock().await;
    let (titles, query) = match &session.last_recommendation {
        Some(set) => (set.titles(), Some(set.query.clone())),
        None => (Vec::new(), None),
    };

    Ok(Json(RecommendationsResponse { titles, query }))
}

/// Records selection/dislike feedback for a title in the current session
pub async fn feedback(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<FeedbackRequest>,
) -> AppResult<StatusCode> {
    let session = state
        .session(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("session {} not found", session_id)))?;

    let (user_id, interaction_id) = {
        let session = session.lock().await;
        (session.user_id, session.last_interaction_id)
    };
    let interaction_id = interaction_id.ok_or_else(|| {
        AppError::InvalidInput("no interaction to attach feedback to".to_string())
    })?;

    state
        .store
        .record_feedback(interaction_id, &request.title, request.selected, request.disliked)
        .await?;
    if request.disliked {
        state.store.add_dislike(user_id, "title", &request.title).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// A user's feedback history, oldest first
pub async fn user_feedback(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<FeedbackRecord>>> {
    let history = state.store.feedback_history(user_id).await?;
    Ok(Json(history))
}
