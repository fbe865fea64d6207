//! Error taxonomy for generation and validation failures.
//!
//! Policy (summarized):
//! - Transport and malformed-response failures during question generation
//!   surface one user-visible message; the session waits for a manual retry.
//! - Hint/explanation failures degrade to fixed fallback text.
//! - `Cancelled` is never reported to the user or logged as an error.
//! - There is no automatic retry anywhere.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenError {
  /// Non-2xx from the provider (or the proxy in front of it).
  #[error("generation request failed with HTTP {status}: {message}")]
  TransportFailure { status: u16, message: String },

  /// The response arrived but lacked the expected nested text payload.
  #[error("malformed provider response: missing text payload")]
  MalformedResponse,

  /// Parsed JSON failed the question structural invariants.
  #[error("invalid question shape: {0}")]
  InvalidQuestionShape(String),

  /// Parsed JSON failed the explanation structural invariants.
  #[error("invalid explanation shape: {0}")]
  InvalidExplanationShape(String),

  /// The request was superseded or the session torn down. Not user-visible.
  #[error("request cancelled")]
  Cancelled,
}

impl GenError {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, GenError::Cancelled)
  }
}
