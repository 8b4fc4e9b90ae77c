use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    db::PersistenceStore,
    models::{
        normalize_for_match, normalize_title, Branch, Catalog, CatalogItem, RecommendationSet,
        SessionState, UserMeta, UserProfile,
    },
    services::{
        filter,
        intent::{self, Intent, COMPLETION_TOKEN},
        llm::{KeywordExtractor, ResponseComposer},
        retrieval::{truncate_document, IndexedDocument, RetrievalIndex, RETRIEVE_TOP_K},
        scoring::{self, ScoringConfig},
    },
};

pub const FAREWELL_MESSAGE: &str = "👋 대화를 종료합니다. 좋은 하루 되세요! 💕";
pub const NO_PRIOR_RECOMMENDATION_MESSAGE: &str =
    "⚠️ 이전에 추천된 영화가 없습니다. 먼저 추천을 받아주세요.";
pub const MISSING_COMPLETION_TITLE_MESSAGE: &str =
    "⚠️ 선택한 영화 제목이 없습니다. 다시 입력해주세요.";
pub const NOTHING_FOUND_MESSAGE: &str = "죄송해요, 추천할 콘텐츠를 찾지 못했어요.";
pub const FIRST_NOTHING_FOUND_MESSAGE: &str = "죄송해요, 적절한 콘텐츠를 찾지 못했어요.";
pub const SIMILAR_NOTHING_FOUND_MESSAGE: &str = "죄송해요, 유사한 콘텐츠를 찾지 못했어요.";
pub const QA_APOLOGY_MESSAGE: &str = "죄송해요, 해당 질문에는 답변할 수 없습니다.";

/// First message of a session, shown right after the user gives their name
pub fn greeting_message(user_name: &str) -> String {
    format!(
        "안녕하세요, {user_name}님! ✨\n오늘 하루는 어떠셨나요? 기분 좋은 일이 있었나요?\n지금 기분이나 끌리는 분위기를 말씀해주시면 딱 맞는 영화를 골라드릴게요!😊"
    )
}

/// The outcome of one conversational turn
#[derive(Debug, Clone)]
pub struct TurnReply {
    pub branch: Branch,
    pub message: String,
    pub titles: Vec<String>,
}

impl TurnReply {
    fn plain(branch: Branch, message: impl Into<String>) -> Self {
        Self {
            branch,
            message: message.into(),
            titles: Vec::new(),
        }
    }
}

/// The dialogue-branch resolution engine.
///
/// Classifies each turn, runs the matching branch handler against the
/// read-only catalog, and mutates only the given session. Collaborator
/// failures degrade to fixed replies; a turn never fails outward.
pub struct ChatEngine {
    catalog: Arc<Catalog>,
    global_index: Arc<RetrievalIndex>,
    extractor: Arc<dyn KeywordExtractor>,
    composer: Arc<dyn ResponseComposer>,
    store: Arc<dyn PersistenceStore>,
    scoring: ScoringConfig,
}

impl ChatEngine {
    pub fn new(
        catalog: Arc<Catalog>,
        global_index: Arc<RetrievalIndex>,
        extractor: Arc<dyn KeywordExtractor>,
        composer: Arc<dyn ResponseComposer>,
        store: Arc<dyn PersistenceStore>,
        scoring: ScoringConfig,
    ) -> Self {
        Self {
            catalog,
            global_index,
            extractor,
            composer,
            store,
            scoring,
        }
    }

    /// Processes one turn for one session.
    ///
    /// Turns of a single session must be strictly sequential; the caller owns
    /// that serialization.
    pub async fn handle_turn(&self, session: &mut SessionState, query: &str) -> TurnReply {
        let query = query.trim();

        let interaction_id = match self.store.record_interaction(session.user_id, query).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to record interaction");
                None
            }
        };
        session.last_interaction_id = interaction_id;

        let intent = intent::classify(query, session);
        tracing::debug!(?intent, user_id = session.user_id, "Turn classified");

        match intent {
            Intent::Exit => {
                session.reset();
                session.branch = Some(Branch::Terminated);
                TurnReply::plain(Branch::Terminated, FAREWELL_MESSAGE)
            }
            Intent::Complete => self.handle_completion(session, query, interaction_id).await,
            Intent::FollowUp => self.handle_follow_up(session, query).await,
            Intent::Similar { reference } => {
                self.handle_similar(session, query, reference, interaction_id)
                    .await
            }
            Intent::Retry => self.handle_retry(session, interaction_id).await,
            Intent::Recommend => self.handle_recommend(session, query, interaction_id).await,
            Intent::GeneralQa => self.handle_general_qa(session, query).await,
        }
    }

    /// Completion: match the remaining text against the last recommendation
    /// set and record the pick as positive feedback.
    async fn handle_completion(
        &self,
        session: &mut SessionState,
        query: &str,
        interaction_id: Option<i64>,
    ) -> TurnReply {
        session.branch = Some(Branch::Complete);

        if !session.has_recommendation() {
            return TurnReply::plain(Branch::Complete, NO_PRIOR_RECOMMENDATION_MESSAGE);
        }
        let last_titles = session.last_titles();

        let remainder = query.replace(COMPLETION_TOKEN, "");
        let remainder = remainder.trim();
        if remainder.is_empty() {
            return TurnReply::plain(Branch::Complete, MISSING_COMPLETION_TITLE_MESSAGE);
        }

        let needle = normalize_for_match(remainder);
        let matched = last_titles
            .iter()
            .find(|title| normalize_for_match(title).contains(&needle))
            .cloned();

        match matched {
            Some(title) => {
                if let Some(id) = interaction_id {
                    if let Err(e) = self.store.record_feedback(id, &title, true, false).await {
                        tracing::warn!(error = %e, "Failed to record selection feedback");
                    }
                }
                session.selected_title = Some(title.clone());
                let message = format!("✅ '{}'을(를) 선택하셨습니다. 좋은 감상 되세요!", title);
                TurnReply {
                    branch: Branch::Complete,
                    message,
                    titles: vec![title],
                }
            }
            None => {
                let listing = last_titles
                    .iter()
                    .map(|title| format!("  - {}", title))
                    .collect::<Vec<_>>()
                    .join("\n");
                TurnReply::plain(
                    Branch::Complete,
                    format!(
                        "🧾 추천된 영화 목록:\n{}\n⚠️ 추천된 영화 중 해당 제목이 없습니다. 다시 확인해주세요.",
                        listing
                    ),
                )
            }
        }
    }

    /// Follow-up QA restricted to the documents backing the last
    /// recommendation. The index is ephemeral: the backing set can change
    /// between turns, so it is rebuilt per call and never cached.
    async fn handle_follow_up(&self, session: &mut SessionState, query: &str) -> TurnReply {
        session.branch = Some(Branch::FollowUp);

        let items = session
            .last_recommendation
            .as_ref()
            .map(|set| set.items.clone())
            .unwrap_or_default();
        let index = RetrievalIndex::from_items(&items);
        let contexts: Vec<IndexedDocument> = index
            .retrieve(query, RETRIEVE_TOP_K)
            .into_iter()
            .cloned()
            .collect();

        let message = match self.composer.answer(query, &contexts).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "Follow-up QA failed");
                QA_APOLOGY_MESSAGE.to_string()
            }
        };
        TurnReply::plain(Branch::FollowUp, message)
    }

    /// Similar-recommendation: the reference item's own keyword metadata
    /// becomes the desired keywords; the reference itself is excluded.
    async fn handle_similar(
        &self,
        session: &mut SessionState,
        query: &str,
        reference: Option<String>,
        interaction_id: Option<i64>,
    ) -> TurnReply {
        session.branch = Some(Branch::Similar);

        let Some(reference_item) = reference
            .as_deref()
            .and_then(|title| self.catalog.find_by_title(title))
        else {
            return TurnReply::plain(Branch::Similar, SIMILAR_NOTHING_FOUND_MESSAGE);
        };

        let meta = reference_item.as_user_meta();
        let profile = self.load_profile(session.user_id).await;
        let mut extra = filter::normalized_set([reference_item.title.as_str()]);
        if let Some(selected) = &session.selected_title {
            extra.insert(normalize_title(selected));
        }

        let candidates = filter::filter(&self.catalog, &profile, &extra);
        let ranked = scoring::rank_by_score(&candidates, &meta, self.scoring.recommend_limit);
        let picked: Vec<CatalogItem> = ranked.into_iter().cloned().collect();

        self.finish_recommendation(
            session,
            interaction_id,
            Branch::Similar,
            query,
            picked,
            false,
            SIMILAR_NOTHING_FOUND_MESSAGE,
        )
        .await
    }

    /// Retry: keywords come from the query that produced the batch being
    /// rejected, and that whole batch joins the exclusion set so the retry
    /// never repeats it.
    async fn handle_retry(
        &self,
        session: &mut SessionState,
        interaction_id: Option<i64>,
    ) -> TurnReply {
        session.branch = Some(Branch::Retry);

        let Some(previous_query) = session.last_query.clone() else {
            return TurnReply::plain(Branch::Retry, NO_PRIOR_RECOMMENDATION_MESSAGE);
        };

        let meta = self.extract_meta(&previous_query).await;
        let profile = self.load_profile(session.user_id).await;
        let extra = filter::normalized_set(session.last_titles());

        let candidates = filter::filter(&self.catalog, &profile, &extra);
        let ranked = scoring::recommend(&candidates, &meta, &self.scoring);
        let picked: Vec<CatalogItem> = ranked.into_iter().cloned().collect();

        self.finish_recommendation(
            session,
            interaction_id,
            Branch::Retry,
            &previous_query,
            picked,
            true,
            NOTHING_FOUND_MESSAGE,
        )
        .await
    }

    /// First or general recommendation from the current query
    async fn handle_recommend(
        &self,
        session: &mut SessionState,
        query: &str,
        interaction_id: Option<i64>,
    ) -> TurnReply {
        session.branch = Some(Branch::FirstRecommend);

        let meta = self.extract_meta(query).await;
        let profile = self.load_profile(session.user_id).await;
        let mut extra = HashSet::new();
        if let Some(selected) = &session.selected_title {
            extra.insert(normalize_title(selected));
        }

        let candidates = filter::filter(&self.catalog, &profile, &extra);
        let ranked = scoring::recommend(&candidates, &meta, &self.scoring);
        let picked: Vec<CatalogItem> = ranked.into_iter().cloned().collect();

        self.finish_recommendation(
            session,
            interaction_id,
            Branch::FirstRecommend,
            query,
            picked,
            false,
            FIRST_NOTHING_FOUND_MESSAGE,
        )
        .await
    }

    /// Open-domain QA over the whole catalog
    async fn handle_general_qa(&self, session: &mut SessionState, query: &str) -> TurnReply {
        session.branch = Some(Branch::GeneralQa);

        let contexts: Vec<IndexedDocument> = self
            .global_index
            .retrieve(query, RETRIEVE_TOP_K)
            .into_iter()
            .cloned()
            .collect();

        let message = match self.composer.answer(query, &contexts).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "General QA failed");
                QA_APOLOGY_MESSAGE.to_string()
            }
        };
        TurnReply::plain(Branch::GeneralQa, message)
    }

    /// Shared tail of the recommending branches: compose the reply, log the
    /// batch, and replace the session's recommendation state. An empty result
    /// leaves all prior state untouched so a later retry still has something
    /// to work from.
    #[allow(clippy::too_many_arguments)]
    async fn finish_recommendation(
        &self,
        session: &mut SessionState,
        interaction_id: Option<i64>,
        branch: Branch,
        producing_query: &str,
        items: Vec<CatalogItem>,
        is_retry: bool,
        empty_message: &str,
    ) -> TurnReply {
        if items.is_empty() {
            return TurnReply::plain(branch, empty_message);
        }

        let titles: Vec<String> = items.iter().map(|item| item.title.clone()).collect();

        let message = match self
            .composer
            .compose_recommendation(producing_query, &items, &session.user_name, is_retry)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Composer failed, using plain listing");
                plain_listing(&items, &session.user_name)
            }
        };

        if let Some(id) = interaction_id {
            if let Err(e) = self.store.log_recommendations(id, &titles).await {
                tracing::warn!(error = %e, "Failed to log recommendations");
            }
        }

        session.record_recommendation(RecommendationSet {
            items,
            query: producing_query.to_string(),
            branch,
        });

        TurnReply {
            branch,
            message,
            titles,
        }
    }

    /// Extraction failure degrades to an empty mapping, which routes the call
    /// to the fallback path.
    async fn extract_meta(&self, query: &str) -> UserMeta {
        match self.extractor.extract(query).await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(error = %e, "Keyword extraction failed, using empty meta");
                UserMeta::new()
            }
        }
    }

    /// Store failures degrade to an empty profile; the turn still answers.
    async fn load_profile(&self, user_id: i64) -> UserProfile {
        let previous = match self.store.previous_titles(user_id).await {
            Ok(titles) => titles,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load previous recommendations");
                Vec::new()
            }
        };
        let dislikes = match self.store.dislikes(user_id).await {
            Ok(dislikes) => dislikes,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load dislikes");
                Vec::new()
            }
        };
        UserProfile::from_records(user_id, previous, dislikes)
    }
}

/// Templated listing used when the composer is unavailable
fn plain_listing(items: &[CatalogItem], user_name: &str) -> String {
    let lines = items
        .iter()
        .map(|item| {
            format!(
                "🎬 {} — {}",
                item.title,
                truncate_document(&item.description, 80)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("{user_name}님, 이런 작품들을 준비해 봤어요:\n{lines}")
}
