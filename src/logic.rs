//! Effect interpreter: the bridge between the pure session reducer and the
//! outside world (Gemini, the score store, the reveal timer).
//!
//! Concurrency model (single session):
//! - One mpsc action channel feeds results back into the reducer; the WS
//!   loop is the only task that applies actions, so transitions are atomic.
//! - At most one live question-generation request: starting a new one
//!   cancels the prior token first, and a cancelled task never sends.
//! - The reveal timer is a cancellable scheduled callback.
//! - Hint/explanation requests are independent fire-and-forget tasks with
//!   their own child tokens; they degrade to fixed fallback text.
//! - Cancelling the root token on teardown kills everything; no action is
//!   applied after teardown because the channels close with the loop.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, instrument};

use crate::domain::{Category, Difficulty};
use crate::prompt::GenerationSeed;
use crate::protocol::{to_out, ServerWsMessage};
use crate::session::{reduce, Action, Effect, Session, REVEAL_DELAY_MS};
use crate::state::AppState;

pub const QUESTION_FAILED_MSG: &str =
  "Failed to generate a question. Please try again.";
pub const HINT_FALLBACK: &str = "Sorry, couldn't get a hint this time.";
pub const EXPLANATION_FALLBACK: &str = "Sorry, couldn't generate an explanation right now.";

pub struct SessionRunner {
  state: Arc<AppState>,
  pub session: Session,
  user_id: String,
  actions: UnboundedSender<Action>,
  out: UnboundedSender<ServerWsMessage>,
  root: CancellationToken,
  gen_cancel: CancellationToken,
  reveal_cancel: CancellationToken,
  hint_inflight: bool,
}

impl SessionRunner {
  pub fn new(
    state: Arc<AppState>,
    user_id: String,
    actions: UnboundedSender<Action>,
    out: UnboundedSender<ServerWsMessage>,
  ) -> Self {
    let root = CancellationToken::new();
    let gen_cancel = root.child_token();
    let reveal_cancel = root.child_token();
    Self {
      state,
      session: Session::new(Category::Cpp),
      user_id,
      actions,
      out,
      root,
      gen_cancel,
      reveal_cancel,
      hint_inflight: false,
    }
  }

  /// Run one action through the reducer, carry out its effects, and push a
  /// fresh snapshot to the client.
  #[instrument(level = "debug", skip(self, action), fields(user_id = %self.user_id))]
  pub fn apply(&mut self, action: Action) {
    if matches!(action, Action::HintReady(_)) {
      self.hint_inflight = false;
    }
    let effects = reduce(&mut self.session, action);
    for effect in effects {
      self.run_effect(effect);
    }
    self.push_snapshot();
  }

  /// Cancel all pending work. Nothing fires into the session afterwards.
  pub fn shutdown(&self) {
    self.root.cancel();
  }

  fn push_snapshot(&self) {
    let _ = self.out.send(ServerWsMessage::Session { session: to_out(&self.session) });
  }

  fn run_effect(&mut self, effect: Effect) {
    match effect {
      Effect::CancelPending => {
        self.gen_cancel.cancel();
        self.reveal_cancel.cancel();
      }
      Effect::Generate(seed) => self.spawn_generation(seed),
      Effect::ScheduleReveal { correct } => self.spawn_reveal(correct),
      Effect::PersistHighScore { category, value } => {
        // Best-effort: not tied to the session's token tree, so a flush on
        // "back" still lands even if the connection goes away right after.
        let store = self.state.store.clone();
        let user = self.user_id.clone();
        tokio::spawn(async move {
          store.write_if_higher(&user, category, value).await;
        });
      }
      Effect::LoadHighScore(category) => {
        let store = self.state.store.clone();
        let user = self.user_id.clone();
        let tx = self.actions.clone();
        let cancel = self.root.clone();
        tokio::spawn(async move {
          let value = store.read(&user, category).await;
          if cancel.is_cancelled() {
            return;
          }
          let _ = tx.send(Action::HighScoreLoaded(value));
        });
      }
    }
  }

  /// Start a question-generation request, superseding any prior one.
  fn spawn_generation(&mut self, seed: GenerationSeed) {
    self.gen_cancel.cancel();
    let cancel = self.root.child_token();
    self.gen_cancel = cancel.clone();

    let tx = self.actions.clone();
    let Some(gemini) = self.state.gemini.clone() else {
      let _ = tx.send(Action::QuestionFailed(
        "Question generation is not configured on this server.".into(),
      ));
      return;
    };

    let prompts = self.state.prompts.clone();
    let category = self.session.category;
    let difficulty = Difficulty::sample(&mut rand::thread_rng());
    let history: Vec<String> = self.session.history.iter().cloned().collect();

    tokio::spawn(async move {
      match gemini
        .generate_question(&prompts, category, difficulty, &seed, &history, &cancel)
        .await
      {
        Ok(mut q) => {
          if cancel.is_cancelled() {
            return;
          }
          q.shuffle_options(&mut rand::thread_rng());
          let _ = tx.send(Action::QuestionReady(q));
        }
        Err(e) if e.is_cancelled() => {}
        Err(e) => {
          error!(target: "quiz", category = category.id(), error = %e, "Question generation failed");
          let _ = tx.send(Action::QuestionFailed(QUESTION_FAILED_MSG.into()));
        }
      }
    });
  }

  /// Schedule the reveal-delay commit, superseding any prior timer.
  fn spawn_reveal(&mut self, correct: bool) {
    self.reveal_cancel.cancel();
    let cancel = self.root.child_token();
    self.reveal_cancel = cancel.clone();

    let tx = self.actions.clone();
    tokio::spawn(async move {
      tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(Duration::from_millis(REVEAL_DELAY_MS)) => {
          let _ = tx.send(Action::RevealElapsed { correct });
        }
      }
    });
  }

  /// Fire-and-forget hint request. At most one in flight, one per question.
  pub fn request_hint(&mut self) {
    let Some(question) = self.session.current.clone() else {
      return;
    };
    if self.session.selected.is_some() || self.session.hint.is_some() || self.hint_inflight {
      return;
    }
    self.hint_inflight = true;

    let tx = self.actions.clone();
    let Some(gemini) = self.state.gemini.clone() else {
      let _ = tx.send(Action::HintReady(HINT_FALLBACK.into()));
      return;
    };
    let prompts = self.state.prompts.clone();
    let cancel = self.root.child_token();

    tokio::spawn(async move {
      match gemini.generate_hint(&prompts, &question, &cancel).await {
        Ok(text) => {
          let _ = tx.send(Action::HintReady(text));
        }
        Err(e) if e.is_cancelled() => {}
        Err(e) => {
          error!(target: "quiz", error = %e, "Hint generation failed; using fallback");
          let _ = tx.send(Action::HintReady(HINT_FALLBACK.into()));
        }
      }
    });
  }

  /// Fire-and-forget explanation for the last-answered question.
  pub fn request_explanation(&mut self) {
    let Some(question) = self.session.last.clone() else {
      return;
    };

    let out = self.out.clone();
    let Some(gemini) = self.state.gemini.clone() else {
      let _ = out.send(ServerWsMessage::Explanation {
        explanation: crate::domain::Explanation {
          original_context: question.question,
          explanation_text: EXPLANATION_FALLBACK.into(),
        },
      });
      return;
    };
    let prompts = self.state.prompts.clone();
    let cancel = self.root.child_token();

    tokio::spawn(async move {
      match gemini.generate_explanation(&prompts, &question, &cancel).await {
        Ok(explanation) => {
          let _ = out.send(ServerWsMessage::Explanation { explanation });
        }
        Err(e) if e.is_cancelled() => {}
        Err(e) => {
          error!(target: "quiz", error = %e, "Explanation generation failed; using fallback");
          let _ = out.send(ServerWsMessage::Explanation {
            explanation: crate::domain::Explanation {
              original_context: question.question,
              explanation_text: EXPLANATION_FALLBACK.into(),
            },
          });
        }
      }
    });
  }
}
