//! Minimal Gemini client for our use-cases.
//!
//! We only call `generateContent`, requesting either plain text or a strict
//! JSON object constrained by a response schema. Calls are instrumented and
//! log model name, latency, and response sizes (not contents).
//!
//! NOTE: We never log the API key. Cancellation is checked before the
//! request is sent and raced against the round trip; a cancelled call
//! returns `GenError::Cancelled` and must not be reported as a failure.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::config::Prompts;
use crate::domain::{Category, Difficulty, Explanation, Question};
use crate::error::GenError;
use crate::prompt::{
  explanation_prompt, explanation_schema, hint_prompt, question_prompt, question_schema,
  GenerationSeed,
};

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl Gemini {
  /// Construct the client if we find GEMINI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY").ok()?;
    let base_url = std::env::var("GEMINI_BASE_URL")
      .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  fn endpoint(&self) -> String {
    format!(
      "{}/models/{}:generateContent?key={}",
      self.base_url, self.model, self.api_key
    )
  }

  /// Single-turn generation. With a schema, the provider is constrained to
  /// emit one JSON object matching it; the raw text is returned either way
  /// and callers own parsing/validation.
  #[instrument(level = "info", skip(self, prompt, schema, cancel), fields(model = %self.model, prompt_len = prompt.len(), has_schema = schema.is_some()))]
  pub async fn generate(
    &self,
    prompt: &str,
    schema: Option<Value>,
    cancel: &CancellationToken,
  ) -> Result<String, GenError> {
    if cancel.is_cancelled() {
      return Err(GenError::Cancelled);
    }

    let req = GenerateContentRequest {
      contents: vec![Content {
        role: "user".into(),
        parts: vec![Part { text: prompt.to_string() }],
      }],
      generation_config: schema.map(|s| GenerationConfig {
        response_mime_type: "application/json".into(),
        response_schema: s,
      }),
    };

    let send = self
      .client
      .post(self.endpoint())
      .header(USER_AGENT, "codequiz-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&req)
      .send();

    let start = std::time::Instant::now();
    let res = tokio::select! {
      _ = cancel.cancelled() => return Err(GenError::Cancelled),
      res = send => res.map_err(|e| GenError::TransportFailure {
        status: 0,
        message: e.to_string(),
      })?,
    };

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_provider_error(&body).unwrap_or(body);
      return Err(GenError::TransportFailure { status, message });
    }

    let body = tokio::select! {
      _ = cancel.cancelled() => return Err(GenError::Cancelled),
      body = res.json::<GenerateContentResponse>() => {
        body.map_err(|_| GenError::MalformedResponse)?
      }
    };

    if let Some(usage) = &body.usage_metadata {
      info!(
        prompt_tokens = ?usage.prompt_token_count,
        candidate_tokens = ?usage.candidates_token_count,
        total_tokens = ?usage.total_token_count,
        "Gemini usage"
      );
    }

    let text = extract_candidate_text(&body).ok_or(GenError::MalformedResponse)?;
    info!(elapsed = ?start.elapsed(), text_len = text.len(), "Gemini response received");
    Ok(text)
  }

  /// Proxy passthrough: forward a client-built generation payload verbatim
  /// and hand back the provider's status and raw body unchanged.
  #[instrument(level = "info", skip(self, payload))]
  pub async fn forward_payload(
    &self,
    payload: Value,
  ) -> Result<(reqwest::StatusCode, String), reqwest::Error> {
    let res = self
      .client
      .post(self.endpoint())
      .header(USER_AGENT, "codequiz-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&payload)
      .send()
      .await?;
    let status = res.status();
    let body = res.text().await?;
    Ok((status, body))
  }

  // --- High-level helpers (domain-specialized) ---

  /// Generate, parse, and validate one quiz question. Options arrive in the
  /// model's order; the caller shuffles after acceptance.
  #[instrument(level = "info", skip(self, prompts, seed, history, cancel), fields(category = category.id(), difficulty = difficulty.label(), history_len = history.len()))]
  pub async fn generate_question(
    &self,
    prompts: &Prompts,
    category: Category,
    difficulty: Difficulty,
    seed: &GenerationSeed,
    history: &[String],
    cancel: &CancellationToken,
  ) -> Result<Question, GenError> {
    let prompt = question_prompt(prompts, category, difficulty, seed, history);
    let text = self.generate(&prompt, Some(question_schema()), cancel).await?;
    Question::from_model_json(&text)
  }

  /// One-sentence nudge. Plain text, no schema.
  #[instrument(level = "info", skip(self, prompts, question, cancel), fields(question_len = question.question.len()))]
  pub async fn generate_hint(
    &self,
    prompts: &Prompts,
    question: &Question,
    cancel: &CancellationToken,
  ) -> Result<String, GenError> {
    let prompt = hint_prompt(prompts, question);
    let text = self.generate(&prompt, None, cancel).await?;
    Ok(text.trim().to_string())
  }

  /// "Explain why the correct answer is correct" for the last question.
  #[instrument(level = "info", skip(self, prompts, question, cancel), fields(question_len = question.question.len()))]
  pub async fn generate_explanation(
    &self,
    prompts: &Prompts,
    question: &Question,
    cancel: &CancellationToken,
  ) -> Result<Explanation, GenError> {
    let prompt = explanation_prompt(prompts, question);
    let text = self.generate(&prompt, Some(explanation_schema()), cancel).await?;
    Explanation::from_model_json(&text)
  }
}

// --- Wire DTOs ---

#[derive(Serialize)]
struct GenerateContentRequest {
  contents: Vec<Content>,
  #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
  generation_config: Option<GenerationConfig>,
}
#[derive(Serialize)]
struct Content {
  role: String,
  parts: Vec<Part>,
}
#[derive(Serialize)]
struct Part {
  text: String,
}
#[derive(Serialize)]
struct GenerationConfig {
  #[serde(rename = "responseMimeType")]
  response_mime_type: String,
  #[serde(rename = "responseSchema")]
  response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
  #[serde(rename = "usageMetadata", default)]
  usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
struct Candidate {
  #[serde(default)]
  content: Option<CandidateContent>,
}
#[derive(Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<CandidatePart>,
}
#[derive(Deserialize)]
struct CandidatePart {
  #[serde(default)]
  text: Option<String>,
}
#[derive(Deserialize)]
struct UsageMetadata {
  #[serde(rename = "promptTokenCount", default)]
  prompt_token_count: Option<u32>,
  #[serde(rename = "candidatesTokenCount", default)]
  candidates_token_count: Option<u32>,
  #[serde(rename = "totalTokenCount", default)]
  total_token_count: Option<u32>,
}

fn extract_candidate_text(body: &GenerateContentResponse) -> Option<String> {
  body
    .candidates
    .first()
    .and_then(|c| c.content.as_ref())
    .and_then(|c| c.parts.first())
    .and_then(|p| p.text.clone())
}

/// Try to extract a clean error message from a provider error body.
fn extract_provider_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap {
    error: EObj,
  }
  #[derive(Deserialize)]
  struct EObj {
    message: String,
  }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
