use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::SessionState;

/// Fixed phrase and pattern tables driving branch classification.
///
/// Kept as data rather than control flow so each predicate can be tested and
/// extended without touching the router.
pub const EXIT_PHRASES: &[&str] = &["exit", "quit", "종료", "고마워 사만다"];
pub const FAREWELL_PHRASE: &str = "사만다 고마워";
pub const COMPLETION_TOKEN: &str = "완료";
pub const RETRY_EXCLUDE_PHRASES: &[&str] = &["제외", "빼고", "빼줘", "빼서", "뺀", "제외하고"];
pub const RETRY_AGAIN_PHRASES: &[&str] = &["다시 추천", "다른 영화"];
pub const RECOMMEND_PHRASES: &[&str] = &[
    "추천해줘",
    "추천해",
    "볼만한",
    "비슷한 영화",
    "유사한 영화",
    "영화 알려줘",
    "보고싶어",
    "추천해줄래",
];

static FOLLOW_UP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        "이 중에|이중에|여기서|영화들 중에|영화 중에|추천받은 영화 중에|추천한 영화 중에|알려준 영화 중에|방금 추천한",
    )
    .expect("valid follow-up pattern")
});

static SIMILAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(비슷한|유사한).*영화").expect("valid similar pattern"));

/// Reference-title capture patterns for "similar to <X>" phrasings,
/// tried in order.
static SIMILAR_TITLE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(.+?)(?:이랑|랑|과|와|같은|처럼.*?)\s*비슷한\s*영화",
        r"(.+?)\s*같은\s*영화",
        r"(.+?)\s*처럼\s*\S+\s*영화",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid similar-title pattern"))
    .collect()
});

/// The conversational intent resolved for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Exit,
    Complete,
    FollowUp,
    Similar { reference: Option<String> },
    Retry,
    Recommend,
    GeneralQa,
}

/// Exit: a fixed exit phrase, or the farewell phrase anywhere in the query
pub fn is_exit(query: &str) -> bool {
    let lowered = query.to_lowercase();
    EXIT_PHRASES.iter().any(|p| lowered == *p) || query.contains(FAREWELL_PHRASE)
}

/// Completion: the literal done-token anywhere in the query
pub fn is_completion(query: &str) -> bool {
    query.contains(COMPLETION_TOKEN)
}

/// Follow-up: a referential phrase, or any previously recommended title
/// verbatim in the query
pub fn is_follow_up(query: &str, previous_titles: &[String]) -> bool {
    if FOLLOW_UP_RE.is_match(query) {
        return true;
    }
    previous_titles.iter().any(|title| query.contains(title.as_str()))
}

pub fn is_similar_request(query: &str) -> bool {
    SIMILAR_RE.is_match(query)
}

/// Extracts the reference title from a "similar to <X>" query
pub fn similar_reference(query: &str) -> Option<String> {
    SIMILAR_TITLE_RES.iter().find_map(|re| {
        re.captures(query)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|title| !title.is_empty())
    })
}

pub fn is_retry_request(query: &str) -> bool {
    RETRY_EXCLUDE_PHRASES.iter().any(|p| query.contains(p))
        || RETRY_AGAIN_PHRASES.iter().any(|p| query.contains(p))
}

pub fn is_recommendation_request(query: &str) -> bool {
    RECOMMEND_PHRASES.iter().any(|p| query.contains(p))
}

/// Resolves the branch for an incoming query against the current session.
///
/// Predicates are evaluated in strict priority order; the first match wins.
/// Completion preempts everything below it whenever the done-token is present
/// (the branch itself handles the no-prior-recommendation case), and the
/// follow-up/similar/retry family is only reachable after a first
/// recommendation exists.
pub fn classify(query: &str, session: &SessionState) -> Intent {
    if is_exit(query) {
        return Intent::Exit;
    }
    if is_completion(query) {
        return Intent::Complete;
    }

    if !session.first_turn && session.has_recommendation() {
        if is_follow_up(query, &session.last_titles()) {
            return Intent::FollowUp;
        }
        if is_similar_request(query) {
            return Intent::Similar {
                reference: similar_reference(query),
            };
        }
        if is_retry_request(query) && session.last_query.is_some() {
            return Intent::Retry;
        }
    }

    if is_recommendation_request(query) {
        return Intent::Recommend;
    }
    Intent::GeneralQa
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Branch, RecommendationSet, SessionState};
    use crate::models::test_item;

    fn session_with_recommendation() -> SessionState {
        let mut session = SessionState::new(1, "혜진");
        session.record_recommendation(RecommendationSet {
            items: vec![test_item("인셉션"), test_item("업")],
            query: "무서운 영화 추천해줘".to_string(),
            branch: Branch::FirstRecommend,
        });
        session
    }

    #[test]
    fn test_exit_phrases() {
        assert!(is_exit("exit"));
        assert!(is_exit("QUIT"));
        assert!(is_exit("종료"));
        assert!(is_exit("오늘도 사만다 고마워"));
        assert!(!is_exit("종료하지 말아줘 영화 추천해줘"));
    }

    #[test]
    fn test_completion_preempts_other_intents() {
        // Contains a recommended title and a follow-up phrase, but the
        // done-token wins.
        let session = session_with_recommendation();
        let intent = classify("이 중에 인셉션 완료", &session);
        assert_eq!(intent, Intent::Complete);
    }

    #[test]
    fn test_completion_resolved_even_without_prior_recommendation() {
        let session = SessionState::new(1, "혜진");
        assert_eq!(classify("완료 인셉션", &session), Intent::Complete);
    }

    #[test]
    fn test_follow_up_requires_prior_recommendation() {
        let fresh = SessionState::new(1, "혜진");
        assert_ne!(classify("이 중에 제일 무서운 건?", &fresh), Intent::FollowUp);

        let session = session_with_recommendation();
        assert_eq!(
            classify("이 중에 제일 무서운 건?", &session),
            Intent::FollowUp
        );
    }

    #[test]
    fn test_follow_up_on_verbatim_title() {
        let session = session_with_recommendation();
        assert_eq!(classify("인셉션 결말이 뭐야?", &session), Intent::FollowUp);
    }

    #[test]
    fn test_similar_reference_extraction() {
        assert_eq!(
            similar_reference("기생충이랑 비슷한 영화 추천해줘"),
            Some("기생충".to_string())
        );
        assert_eq!(
            similar_reference("기생충 같은 영화 없을까"),
            Some("기생충".to_string())
        );
        assert_eq!(similar_reference("그냥 영화 추천해줘"), None);
    }

    #[test]
    fn test_similar_after_first_turn() {
        let session = session_with_recommendation();
        assert_eq!(
            classify("기생충이랑 비슷한 영화 추천해줘", &session),
            Intent::Similar {
                reference: Some("기생충".to_string())
            }
        );
    }

    #[test]
    fn test_similar_on_first_turn_is_plain_recommendation() {
        // "비슷한 영화" is also a recommendation-request phrase; before any
        // recommendation exists it routes to the plain branch.
        let session = SessionState::new(1, "혜진");
        assert_eq!(
            classify("기생충이랑 비슷한 영화 추천해줘", &session),
            Intent::Recommend
        );
    }

    #[test]
    fn test_retry_phrases() {
        assert!(is_retry_request("곡성은 빼고 다시 부탁해"));
        assert!(is_retry_request("다른 영화 보여줘"));
        assert!(is_retry_request("다시 추천해줘"));
        assert!(!is_retry_request("무서운 영화 추천해줘"));
    }

    #[test]
    fn test_retry_requires_prior_query() {
        let mut session = session_with_recommendation();
        assert_eq!(classify("다른 영화 보여줘", &session), Intent::Retry);

        session.last_query = None;
        assert_ne!(classify("다른 영화 보여줘", &session), Intent::Retry);
    }

    #[test]
    fn test_recommendation_request_phrases() {
        let session = SessionState::new(1, "혜진");
        assert_eq!(classify("통쾌한 액션 영화 추천해줘", &session), Intent::Recommend);
        assert_eq!(classify("볼만한 거 있어?", &session), Intent::Recommend);
    }

    #[test]
    fn test_general_qa_is_catch_all() {
        let session = SessionState::new(1, "혜진");
        assert_eq!(classify("기생충 감독이 누구야?", &session), Intent::GeneralQa);
    }
}
