use std::sync::Arc;

use axum_test::TestServer;
use serde_json::json;

use curator_api::api::{create_router, AppState};
use curator_api::db::MemoryStore;
use curator_api::error::AppResult;
use curator_api::models::{Catalog, CatalogItem, KeywordCategory, UserMeta};
use curator_api::services::llm::{KeywordExtractor, ResponseComposer};
use curator_api::services::recommender::ChatEngine;
use curator_api::services::retrieval::{IndexedDocument, RetrievalIndex};
use curator_api::services::scoring::ScoringConfig;

/// Extractor stub: every query maps to a fixed horror-leaning keyword set
struct FixedExtractor;

#[async_trait::async_trait]
impl KeywordExtractor for FixedExtractor {
    async fn extract(&self, _text: &str) -> AppResult<UserMeta> {
        let mut meta = UserMeta::new();
        meta.extend(KeywordCategory::Emotion, ["무서운", "불길한", "불안한"]);
        meta.extend(KeywordCategory::Genre, ["공포", "스릴러"]);
        Ok(meta)
    }
}

/// Composer stub: deterministic text so assertions stay simple
struct EchoComposer;

#[async_trait::async_trait]
impl ResponseComposer for EchoComposer {
    async fn compose_recommendation(
        &self,
        _query: &str,
        items: &[CatalogItem],
        user_name: &str,
        is_retry: bool,
    ) -> AppResult<String> {
        Ok(format!(
            "{}님께 {}편 추천 (retry={})",
            user_name,
            items.len(),
            is_retry
        ))
    }

    async fn answer(&self, _query: &str, contexts: &[IndexedDocument]) -> AppResult<String> {
        Ok(format!("{}개 문서 기반 답변", contexts.len()))
    }
}

fn test_catalog() -> Catalog {
    let items: Vec<CatalogItem> = serde_json::from_value(json!([
        {
            "title": "곡성",
            "description": "낯선 외지인이 나타난 뒤 마을에 번지는 의심",
            "rating": 8.1,
            "Emotion": "무서운,불길한,불안한",
            "genre": "공포,스릴러"
        },
        {
            "title": "컨저링",
            "description": "초자연 현상을 조사하는 부부",
            "rating": 7.5,
            "Emotion": "무서운,불안한",
            "genre": "공포"
        },
        {
            "title": "업",
            "description": "풍선을 매단 집으로 떠나는 모험",
            "rating": 8.9,
            "Emotion": "감동적인",
            "genre": "드라마"
        }
    ]))
    .expect("valid test catalog");
    Catalog::new(items)
}

fn create_test_server() -> TestServer {
    let catalog = Arc::new(test_catalog());
    let global_index = Arc::new(RetrievalIndex::from_catalog(&catalog));
    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(ChatEngine::new(
        catalog,
        global_index,
        Arc::new(FixedExtractor),
        Arc::new(EchoComposer),
        store.clone(),
        ScoringConfig::default(),
    ));
    let state = AppState::new(engine, store);
    TestServer::new(create_router(state)).expect("test server")
}

async fn open_session(server: &TestServer) -> (String, i64) {
    let response = server
        .post("/sessions")
        .json(&json!({ "user_name": "혜진" }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    (
        body["session_id"].as_str().expect("session id").to_string(),
        body["user_id"].as_i64().expect("user id"),
    )
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_create_session_greets_user() {
    let server = create_test_server();
    let response = server
        .post("/sessions")
        .json(&json!({ "user_name": "혜진" }))
        .await;

    response.assert_status(axum::http::StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert!(body["greeting"].as_str().unwrap().contains("혜진"));
    assert!(body["session_id"].as_str().is_some());
}

#[tokio::test]
async fn test_create_session_rejects_blank_name() {
    let server = create_test_server();
    let response = server
        .post("/sessions")
        .json(&json!({ "user_name": "   " }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_requires_known_session() {
    let server = create_test_server();
    let response = server
        .post(&format!("/sessions/{}/chat", uuid::Uuid::new_v4()))
        .json(&json!({ "message": "추천해줘" }))
        .await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_rejects_empty_message() {
    let server = create_test_server();
    let (session_id, _) = open_session(&server).await;

    let response = server
        .post(&format!("/sessions/{}/chat", session_id))
        .json(&json!({ "message": "  " }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recommendation_turn_returns_ranked_titles() {
    let server = create_test_server();
    let (session_id, _) = open_session(&server).await;

    let response = server
        .post(&format!("/sessions/{}/chat", session_id))
        .json(&json!({ "message": "무서운 영화 추천해줘" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["branch"], "first_recommend");
    assert_eq!(body["titles"][0], "곡성");
    assert_eq!(body["titles"][1], "컨저링");
    assert!(body["reply"].as_str().unwrap().contains("혜진"));

    // The last set is queryable afterwards.
    let response = server
        .get(&format!("/sessions/{}/recommendations", session_id))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["titles"][0], "곡성");
    assert_eq!(body["query"], "무서운 영화 추천해줘");
}

#[tokio::test]
async fn test_completion_and_feedback_flow() {
    let server = create_test_server();
    let (session_id, user_id) = open_session(&server).await;

    server
        .post(&format!("/sessions/{}/chat", session_id))
        .json(&json!({ "message": "무서운 영화 추천해줘" }))
        .await
        .assert_status_ok();

    // Completion picks a recommended title by containment.
    let response = server
        .post(&format!("/sessions/{}/chat", session_id))
        .json(&json!({ "message": "완료 곡성" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["branch"], "complete");
    assert_eq!(body["titles"][0], "곡성");

    // Explicit dislike feedback on another title.
    let response = server
        .post(&format!("/sessions/{}/feedback", session_id))
        .json(&json!({ "title": "컨저링", "disliked": true }))
        .await;
    response.assert_status(axum::http::StatusCode::NO_CONTENT);

    let response = server.get(&format!("/users/{}/feedback", user_id)).await;
    response.assert_status_ok();
    let history: serde_json::Value = response.json();
    let rows = history.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|r| r["movie_title"] == "곡성" && r["is_selected"] == true));
    assert!(rows.iter().any(|r| r["movie_title"] == "컨저링" && r["is_disliked"] == true));
}

#[tokio::test]
async fn test_retry_turn_never_repeats_last_batch() {
    let server = create_test_server();
    let (session_id, _) = open_session(&server).await;

    let response = server
        .post(&format!("/sessions/{}/chat", session_id))
        .json(&json!({ "message": "무서운 영화 추천해줘" }))
        .await;
    let first: serde_json::Value = response.json();
    let first_titles: Vec<String> = first["titles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().unwrap().to_string())
        .collect();

    let response = server
        .post(&format!("/sessions/{}/chat", session_id))
        .json(&json!({ "message": "다른 영화 추천해줘" }))
        .await;
    response.assert_status_ok();
    let retry: serde_json::Value = response.json();
    assert_eq!(retry["branch"], "retry");
    for title in retry["titles"].as_array().unwrap() {
        assert!(!first_titles.contains(&title.as_str().unwrap().to_string()));
    }
}

#[tokio::test]
async fn test_follow_up_turn_answers_about_last_set() {
    let server = create_test_server();
    let (session_id, _) = open_session(&server).await;

    server
        .post(&format!("/sessions/{}/chat", session_id))
        .json(&json!({ "message": "무서운 영화 추천해줘" }))
        .await
        .assert_status_ok();

    let response = server
        .post(&format!("/sessions/{}/chat", session_id))
        .json(&json!({ "message": "이 중에 제일 무서운 게 뭐야?" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["branch"], "follow_up");
    assert!(body["reply"].as_str().unwrap().contains("답변"));
}

#[tokio::test]
async fn test_exit_phrase_resets_session() {
    let server = create_test_server();
    let (session_id, _) = open_session(&server).await;

    server
        .post(&format!("/sessions/{}/chat", session_id))
        .json(&json!({ "message": "무서운 영화 추천해줘" }))
        .await
        .assert_status_ok();

    let response = server
        .post(&format!("/sessions/{}/chat", session_id))
        .json(&json!({ "message": "종료" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["branch"], "terminated");

    let response = server
        .get(&format!("/sessions/{}/recommendations", session_id))
        .await;
    let body: serde_json::Value = response.json();
    assert!(body["titles"].as_array().unwrap().is_empty());
}
