//! Public protocol structs for the WebSocket and HTTP endpoints (serde
//! ready). Keep this small and stable to evolve backend and frontend
//! independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Category, Explanation, Question};
use crate::session::{Phase, Session};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
  Ping,
  /// Highlight a category on the start screen (loads its high score).
  SelectCategory { category: Category },
  /// Begin a quiz. Topic must be non-empty.
  Begin { category: Category, topic: String },
  /// Lock in one of the current question's options.
  Answer { option: String },
  /// Ask for a one-sentence hint on the current question.
  Hint,
  /// Ask why the correct answer of the last question was correct.
  Explain,
  /// From the end screen: fresh question, same topic, score reset.
  Retry,
  /// From the end screen: question similar to the one just missed.
  TrySimilar,
  /// Return to the start screen.
  Back,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
  Pong,
  /// The enumerated category set with theme data. Sent once on connect.
  Categories { categories: Vec<CategoryOut> },
  /// Full session snapshot. Sent after every state transition.
  Session { session: SessionOut },
  /// Result of an "explain" request (modal content, not session state).
  Explanation { explanation: Explanation },
  Error { message: String },
}

#[derive(Debug, Serialize)]
pub struct CategoryOut {
  pub id: Category,
  pub name: &'static str,
  pub accent_color: &'static str,
}

pub fn categories_out() -> Vec<CategoryOut> {
  Category::ALL
    .iter()
    .map(|c| CategoryOut { id: *c, name: c.display_name(), accent_color: c.accent_color() })
    .collect()
}

/// The current question as exposed to the client: no answer field.
#[derive(Debug, Serialize)]
pub struct QuestionOut {
  pub question: String,
  pub options: Vec<String>,
}

/// Reveal-phase payload: present only while an answer is locked, so the
/// client can style correctness during the reveal delay.
#[derive(Debug, Serialize)]
pub struct LockedOut {
  pub selected: String,
  pub correct: bool,
  pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct SessionOut {
  pub phase: Phase,
  pub category: Category,
  pub topic: String,
  pub score: u32,
  pub high_score: u32,
  pub fetching: bool,
  pub question: Option<QuestionOut>,
  pub locked: Option<LockedOut>,
  pub hint: Option<String>,
  pub error: Option<String>,
}

/// Convert the internal `Session` aggregate to the public snapshot.
pub fn to_out(s: &Session) -> SessionOut {
  let question = s.current.as_ref().map(|q: &Question| QuestionOut {
    question: q.question.clone(),
    options: q.options.clone(),
  });
  let locked = match (&s.selected, &s.current) {
    (Some(selected), Some(q)) => Some(LockedOut {
      selected: selected.clone(),
      correct: *selected == q.answer,
      answer: q.answer.clone(),
    }),
    _ => None,
  };
  SessionOut {
    phase: s.phase,
    category: s.category,
    topic: s.topic.clone(),
    score: s.score,
    high_score: s.high_score,
    fetching: s.fetching,
    question,
    locked,
    hint: s.hint.clone(),
    error: s.error.clone(),
  }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}

#[derive(Serialize)]
pub struct ErrorOut {
  pub error: String,
}
