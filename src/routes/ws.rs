//! WebSocket upgrade + session loop. Each connection owns one quiz session:
//! client messages become reducer actions, async results re-enter through
//! the action channel, and every transition pushes a snapshot back out.
//! Dropping the connection tears the whole session down.

use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    Query, State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::domain::Category;
use crate::logic::SessionRunner;
use crate::protocol::{categories_out, ClientWsMessage, ServerWsMessage};
use crate::session::Action;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
  /// Pre-provisioned user identity; a fresh anonymous id is minted if absent.
  pub user: Option<String>,
}

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(
  ws: WebSocketUpgrade,
  Query(q): Query<WsQuery>,
  State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
  let user_id = q.user.filter(|u| !u.trim().is_empty()).unwrap_or_else(|| {
    format!("anon-{}", Uuid::new_v4())
  });
  info!(target: "codequiz_backend", %user_id, "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state, user_id))
}

#[instrument(level = "info", skip(socket, state), fields(%user_id))]
async fn handle_ws(socket: WebSocket, state: Arc<AppState>, user_id: String) {
  info!(target: "codequiz_backend", "WebSocket connected");

  let (mut sender, mut receiver) = socket.split();
  let (actions_tx, mut actions_rx) = mpsc::unbounded_channel::<Action>();
  let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerWsMessage>();
  let mut runner = SessionRunner::new(state, user_id, actions_tx, out_tx.clone());

  // Category set first, then the initial snapshot (which also kicks off the
  // high-score read for the default category).
  let _ = out_tx.send(ServerWsMessage::Categories { categories: categories_out() });
  runner.apply(Action::SelectCategory(Category::Cpp));

  loop {
    tokio::select! {
      maybe_msg = receiver.next() => {
        match maybe_msg {
          Some(Ok(Message::Text(txt))) => {
            match serde_json::from_str::<ClientWsMessage>(&txt) {
              Ok(incoming) => {
                debug!(target: "codequiz_backend", "WS received: {:?}", &incoming);
                handle_client_ws(incoming, &mut runner, &out_tx);
              }
              Err(e) => {
                let _ = out_tx.send(ServerWsMessage::Error {
                  message: format!("Invalid JSON: {}", e),
                });
              }
            }
          }
          Some(Ok(Message::Ping(payload))) => {
            let _ = sender.send(Message::Pong(payload)).await;
          }
          Some(Ok(Message::Close(_))) | None => break,
          Some(Ok(_)) => {}
          Some(Err(e)) => {
            error!(target: "codequiz_backend", error = %e, "WS receive error");
            break;
          }
        }
      }

      Some(action) = actions_rx.recv() => {
        runner.apply(action);
      }

      Some(outgoing) = out_rx.recv() => {
        let text = serde_json::to_string(&outgoing).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });
        if let Err(e) = sender.send(Message::Text(text)).await {
          error!(target: "codequiz_backend", error = %e, "WS send error");
          break;
        }
      }
    }
  }

  // No transition may execute after teardown.
  runner.shutdown();
  info!(target: "codequiz_backend", "WebSocket disconnected");
}

fn handle_client_ws(
  msg: ClientWsMessage,
  runner: &mut SessionRunner,
  out: &mpsc::UnboundedSender<ServerWsMessage>,
) {
  match msg {
    ClientWsMessage::Ping => {
      let _ = out.send(ServerWsMessage::Pong);
    }
    ClientWsMessage::SelectCategory { category } => {
      runner.apply(Action::SelectCategory(category));
    }
    ClientWsMessage::Begin { category, topic } => {
      runner.apply(Action::Begin { category, topic });
    }
    ClientWsMessage::Answer { option } => {
      runner.apply(Action::AnswerLocked(option));
    }
    ClientWsMessage::Hint => runner.request_hint(),
    ClientWsMessage::Explain => runner.request_explanation(),
    ClientWsMessage::Retry => runner.apply(Action::Retry),
    ClientWsMessage::TrySimilar => runner.apply(Action::TrySimilar),
    ClientWsMessage::Back => runner.apply(Action::Back),
  }
}
