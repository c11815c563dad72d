//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Field names are camelCase on the wire, matching the SPA.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Exercise, Test};
use crate::practice::{Phase, PracticeSession, PASS_THRESHOLD};
use crate::similarity::Similarity;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    /// Practice the exercises of a stored test, in membership order.
    StartPractice {
        #[serde(rename = "testId")]
        test_id: i64,
    },
    /// Practice a freshly generated, unsaved selection.
    StartPreview(CreateTestIn),
    /// Speech-to-text fragment appended to the pending attempt.
    Transcript {
        text: String,
    },
    /// Score `text`, or the pending transcript when omitted.
    Compare {
        #[serde(default)]
        text: Option<String>,
    },
    Next,
    Reset,
    Status,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        session: SessionOut,
    },
    Comparison {
        result: Similarity,
        passed: bool,
        session: SessionOut,
    },
    Error {
        code: String,
        message: String,
    },
}

/// Snapshot of a practice session as shown to the learner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
    pub test_id: Option<i64>,
    pub name: String,
    pub index: usize,
    pub total: usize,
    pub phase: Phase,
    pub exercise: PracticeExerciseOut,
    pub attempt: String,
    pub completed: Vec<usize>,
    pub completed_count: usize,
    /// Score of the current exercise once compared; cleared by `next` and `reset`.
    pub last_comparison: Option<Similarity>,
    /// 0..=100
    pub progress: f64,
    pub has_next: bool,
}

/// The current exercise; `content` stays hidden until an attempt is compared.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeExerciseOut {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub content: Option<String>,
}

pub fn session_out(s: &PracticeSession, test_id: Option<i64>, name: &str) -> SessionOut {
    let ex = s.current_exercise();
    let revealed = s.phase() != Phase::AwaitingInput;
    SessionOut {
        test_id,
        name: name.to_string(),
        index: s.current_index(),
        total: s.total(),
        phase: s.phase(),
        exercise: PracticeExerciseOut {
            id: ex.id,
            title: ex.title.clone(),
            description: ex.description.clone(),
            tags: ex.tags.clone(),
            content: revealed.then(|| ex.content.clone()),
        },
        attempt: s.attempt().to_string(),
        completed: (0..s.total()).filter(|&i| s.is_completed(i)).collect(),
        completed_count: s.completed_count(),
        last_comparison: s.last_comparison().cloned(),
        progress: s.progress() * 100.0,
        has_next: s.has_next(),
    }
}

//
// HTTP request/response DTOs
//

/// Body of test creation and preview generation.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestIn {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub exercise_count: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub exercise_ids: Option<Vec<i64>>,
}

/// A stored test with its exercises in practice order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOut {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub exercise_count: i32,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub exercises: Vec<Exercise>,
}

pub fn to_out(t: &Test, exercises: Vec<Exercise>) -> TestOut {
    TestOut {
        id: t.id,
        name: t.name.clone(),
        description: t.description.clone(),
        exercise_count: t.exercise_count,
        tags: t.tags.clone(),
        created_at: t.created_at,
        updated_at: t.updated_at,
        exercises,
    }
}

/// Unsaved test: `id` is always 0 and the requested count is not echoed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewOut {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub exercises: Vec<Exercise>,
}

/// Exercise search filters, read from raw query pairs so `tags` may repeat
/// (`?tags=a&tags=b`) as well as carry comma-separated values (`?tags=a,b`).
#[derive(Debug, Default, PartialEq)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub tags: Vec<String>,
}

impl SearchQuery {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut out = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "query" => out.query = Some(value),
                "tags" => out.tags.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_owned),
                ),
                _ => {}
            }
        }
        out
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportIn {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareIn {
    pub exercise_id: i64,
    pub attempt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareOut {
    #[serde(flatten)]
    pub result: Similarity,
    pub passed: bool,
}

impl From<Similarity> for CompareOut {
    fn from(result: Similarity) -> Self {
        let passed = result.score >= PASS_THRESHOLD;
        Self { result, passed }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomSubjectsIn {
    pub count: i32,
    #[serde(default, alias = "documentIds")]
    pub filter_ids: Option<Vec<i64>>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_from_tagged_json() {
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"start_practice","testId":3}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::StartPractice { test_id: 3 }));

        let m: ClientWsMessage =
            serde_json::from_str(r#"{"type":"start_preview","exerciseCount":2,"tags":["Git"]}"#).unwrap();
        match m {
            ClientWsMessage::StartPreview(request) => {
                assert_eq!(request.exercise_count, 2);
                assert_eq!(request.tags, vec!["Git"]);
            }
            other => panic!("unexpected {other:?}"),
        }

        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"compare"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::Compare { text: None }));
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn search_tags_split_on_commas() {
        let q = SearchQuery::from_pairs(pairs(&[("tags", " Git, ,SQL")]));
        assert_eq!(q.tags, vec!["Git", "SQL"]);
        assert_eq!(q.query, None);
    }

    #[test]
    fn search_tags_may_repeat_and_mix_forms() {
        let q = SearchQuery::from_pairs(pairs(&[("tags", "Git"), ("query", "flow"), ("tags", "SQL,Docker"), ("page", "2")]));
        assert_eq!(q.tags, vec!["Git", "SQL", "Docker"]);
        assert_eq!(q.query.as_deref(), Some("flow"));
    }

    #[test]
    fn random_subjects_accepts_document_ids_alias() {
        let r: RandomSubjectsIn = serde_json::from_str(r#"{"count":2,"documentIds":[1,2]}"#).unwrap();
        assert_eq!(r.filter_ids, Some(vec![1, 2]));
    }

    #[test]
    fn preview_has_no_exercise_count() {
        let p = PreviewOut { id: 0, name: "p".into(), description: None, created_at: Utc::now(), exercises: vec![] };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["id"], 0);
        assert!(v.get("exerciseCount").is_none());
    }
}
