//! WebSocket upgrade + practice loop. Each connection owns at most one practice
//! session; every client message gets exactly one JSON reply.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::error::AppError;
use crate::logic;
use crate::practice::PracticeSession;
use crate::protocol::{session_out, ClientWsMessage, ServerWsMessage};
use crate::state::AppState;
use crate::util::trunc_for_log;

/// Live session plus what the client needs to label it.
struct Active {
  session: PracticeSession,
  test_id: Option<i64>,
  name: String,
}

impl Active {
  fn snapshot(&self) -> ServerWsMessage {
    ServerWsMessage::Session { session: session_out(&self.session, self.test_id, &self.name) }
  }
}

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "recall_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "recall_backend", "WebSocket connected");
  let mut active: Option<Active> = None;

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "recall_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, &mut active)
              .await
              .unwrap_or_else(|e| error_msg(&e))
          }
          Err(e) => ServerWsMessage::Error {
            code: "invalid_argument".into(),
            message: format!("Invalid JSON: {}", e),
          },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "code": "internal", "message": format!("Serialization error: {}", e) })
            .to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "recall_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "recall_backend", "WebSocket disconnected");
}

fn error_msg(e: &AppError) -> ServerWsMessage {
  ServerWsMessage::Error { code: e.code().into(), message: e.to_string() }
}

fn require(active: &mut Option<Active>) -> Result<&mut Active, AppError> {
  active.as_mut().ok_or_else(|| AppError::invalid("no practice session; send start_practice first"))
}

/// Dispatch one client message against the connection's session.
async fn handle_client_ws(
  msg: ClientWsMessage,
  state: &AppState,
  active: &mut Option<Active>,
) -> Result<ServerWsMessage, AppError> {
  match msg {
    ClientWsMessage::Ping => Ok(ServerWsMessage::Pong),

    ClientWsMessage::StartPractice { test_id } => {
      let (session, name) = logic::start_practice(state, test_id).await?;
      let a = active.insert(Active { session, test_id: Some(test_id), name });
      Ok(a.snapshot())
    }

    ClientWsMessage::StartPreview(request) => {
      let (session, name) = logic::start_preview_practice(state, request).await?;
      let a = active.insert(Active { session, test_id: None, name });
      Ok(a.snapshot())
    }

    ClientWsMessage::Transcript { text } => {
      let a = require(active)?;
      a.session.append_transcript(&text);
      debug!(target: "practice", fragment = %trunc_for_log(&text, 60), "Transcript appended");
      Ok(a.snapshot())
    }

    ClientWsMessage::Compare { text } => {
      let a = require(active)?;
      let result = a.session.compare(text.as_deref())?.clone();
      let passed = result.score >= crate::practice::PASS_THRESHOLD;
      info!(
        target: "practice",
        index = a.session.current_index(),
        score = result.score,
        passed,
        "WS attempt compared"
      );
      let session = session_out(&a.session, a.test_id, &a.name);
      Ok(ServerWsMessage::Comparison { result, passed, session })
    }

    ClientWsMessage::Next => {
      let a = require(active)?;
      a.session.next()?;
      Ok(a.snapshot())
    }

    ClientWsMessage::Reset => {
      let a = require(active)?;
      a.session.reset();
      Ok(a.snapshot())
    }

    ClientWsMessage::Status => Ok(require(active)?.snapshot()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::NewExercise;
  use crate::practice::Phase;
  use crate::protocol::CreateTestIn;
  use crate::seeds::seed_tables;

  async fn seeded() -> AppState {
    let state = AppState::empty();
    state.store.transact(|t| seed_tables(t, true, vec![])).await.unwrap();
    state
  }

  #[tokio::test]
  async fn commands_before_start_are_rejected() {
    let state = seeded().await;
    let mut active = None;
    let err = handle_client_ws(ClientWsMessage::Next, &state, &mut active).await.unwrap_err();
    assert_eq!(err.code(), "invalid_argument");
    assert!(matches!(
      handle_client_ws(ClientWsMessage::Ping, &state, &mut active).await,
      Ok(ServerWsMessage::Pong)
    ));
  }

  #[tokio::test]
  async fn full_walkthrough_of_a_stored_test() {
    let state = AppState::empty();
    let mut ids = Vec::new();
    for (title, content) in [("Fox", "the quick brown fox"), ("Lorem", "lorem ipsum dolor sit amet")] {
      let new = NewExercise { title: title.into(), content: content.into(), ..Default::default() };
      ids.push(logic::create_exercise(&state, new).await.unwrap().id);
    }
    let req = CreateTestIn { name: "Two".into(), exercise_count: 2, exercise_ids: Some(ids.clone()), ..Default::default() };
    let test = logic::create_test(&state, req).await.unwrap();
    let mut active = None;

    let reply = handle_client_ws(ClientWsMessage::StartPractice { test_id: test.id }, &state, &mut active)
      .await
      .unwrap();
    match reply {
      ServerWsMessage::Session { session } => {
        assert_eq!(session.total, 2);
        assert_eq!(session.name, "Two");
        assert_eq!(session.exercise.id, ids[0]);
        assert!(session.exercise.content.is_none());
      }
      other => panic!("unexpected {other:?}"),
    }

    for fragment in ["The quick", "brown fox"] {
      handle_client_ws(ClientWsMessage::Transcript { text: fragment.into() }, &state, &mut active)
        .await
        .unwrap();
    }
    let reply = handle_client_ws(ClientWsMessage::Compare { text: None }, &state, &mut active).await.unwrap();
    match reply {
      ServerWsMessage::Comparison { result, passed, session } => {
        assert_eq!(result.score, 100);
        assert!(passed);
        assert_eq!(session.attempt, "The quick brown fox");
        assert_eq!(session.phase, Phase::Compared);
        assert_eq!(session.completed, vec![0]);
        assert_eq!(session.completed_count, 1);
        assert_eq!(session.last_comparison.map(|c| c.score), Some(100));
        assert!(session.exercise.content.is_some());
      }
      other => panic!("unexpected {other:?}"),
    }

    match handle_client_ws(ClientWsMessage::Next, &state, &mut active).await.unwrap() {
      ServerWsMessage::Session { session } => {
        assert_eq!(session.index, 1);
        assert!(session.last_comparison.is_none());
        assert_eq!(session.completed_count, 1);
      }
      other => panic!("unexpected {other:?}"),
    }
    let reply = handle_client_ws(ClientWsMessage::Compare { text: Some("nothing alike".into()) }, &state, &mut active)
      .await
      .unwrap();
    match reply {
      ServerWsMessage::Comparison { passed, session, .. } => {
        assert!(!passed);
        assert_eq!(session.phase, Phase::Finished);
        assert!(!session.has_next);
        assert_eq!(session.progress, 50.0);
      }
      other => panic!("unexpected {other:?}"),
    }

    let err = handle_client_ws(ClientWsMessage::Next, &state, &mut active).await.unwrap_err();
    assert_eq!(err.code(), "invalid_argument");
  }

  #[tokio::test]
  async fn preview_session_has_no_test_id() {
    let state = seeded().await;
    let mut active = None;
    let req = CreateTestIn { exercise_count: 3, ..Default::default() };
    match handle_client_ws(ClientWsMessage::StartPreview(req), &state, &mut active).await.unwrap() {
      ServerWsMessage::Session { session } => {
        assert_eq!(session.test_id, None);
        assert_eq!(session.total, 3);
        assert_eq!(session.name, "Practice");
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[tokio::test]
  async fn unknown_test_is_not_found() {
    let state = seeded().await;
    let mut active = None;
    let err = handle_client_ws(ClientWsMessage::StartPractice { test_id: 77 }, &state, &mut active)
      .await
      .unwrap_err();
    match error_msg(&err) {
      ServerWsMessage::Error { code, .. } => assert_eq!(code, "not_found"),
      other => panic!("unexpected {other:?}"),
    }
  }
}
