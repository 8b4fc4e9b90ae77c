/// LLM collaborator seams.
///
/// Keyword extraction, recommendation response composition and
/// retrieval-grounded QA answering are opaque text-in/text-out services. The
/// engine only depends on these traits; the production implementation talks
/// to an OpenAI-compatible endpoint.
use crate::{
    error::AppResult,
    models::{CatalogItem, UserMeta},
    services::retrieval::IndexedDocument,
};

pub mod openai;

pub use openai::OpenAiClient;

/// Turns free text into a category → keyword mapping using the fixed
/// controlled vocabulary carried in the deployed prompt.
#[async_trait::async_trait]
pub trait KeywordExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> AppResult<UserMeta>;
}

/// Produces the user-facing natural-language replies.
#[async_trait::async_trait]
pub trait ResponseComposer: Send + Sync {
    /// Given at most five ranked items, references 3–5 of them with title,
    /// short synopsis and keyword hints; retry turns use an "updated pick"
    /// framing instead of the first-time greeting.
    async fn compose_recommendation(
        &self,
        query: &str,
        items: &[CatalogItem],
        user_name: &str,
        is_retry: bool,
    ) -> AppResult<String>;

    /// Answers a question grounded in the retrieved context documents.
    async fn answer(&self, query: &str, contexts: &[IndexedDocument]) -> AppResult<String>;
}
