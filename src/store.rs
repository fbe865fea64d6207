//! Score Store Adapter: per-user, per-category high scores in a remote
//! document store.
//!
//! Contract:
//! - `read` degrades to 0 on absence, malformed documents, or any transport
//!   error (the score is re-derivable from a fresh play-through).
//! - `write_if_higher` only writes when the candidate strictly exceeds the
//!   last-known value; failures are logged and swallowed.
//! - Without an identity token every operation is a no-op. The adapter is
//!   the sole writer path; the session layer never writes directly.
//!
//! All settings arrive explicitly through `StoreConfig` at construction
//! time, never from ambient globals.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

use crate::config::StoreCfg;
use crate::domain::Category;

#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
  pub base_url: Option<String>,
  pub app_id: String,
  pub auth_token: Option<String>,
}

impl StoreConfig {
  /// Merge TOML settings with environment overrides
  /// (STORE_BASE_URL, STORE_APP_ID, STORE_AUTH_TOKEN).
  pub fn resolve(cfg: &StoreCfg) -> StoreConfig {
    StoreConfig {
      base_url: std::env::var("STORE_BASE_URL").ok().or_else(|| cfg.base_url.clone()),
      app_id: std::env::var("STORE_APP_ID")
        .ok()
        .or_else(|| cfg.app_id.clone())
        .unwrap_or_else(|| "default-app-id".into()),
      auth_token: std::env::var("STORE_AUTH_TOKEN").ok(),
    }
  }
}

pub struct ScoreStore {
  client: reqwest::Client,
  config: StoreConfig,
  // Last-known value per (user, category); the monotone write gate.
  known: RwLock<HashMap<(String, Category), u32>>,
}

impl ScoreStore {
  pub fn new(config: StoreConfig) -> Arc<Self> {
    if config.base_url.is_none() {
      info!(target: "codequiz_backend", "Score store disabled (no base URL). High scores are session-local.");
    } else if config.auth_token.is_none() {
      info!(target: "codequiz_backend", "Score store has no identity token; operations are no-ops until one is provided.");
    }
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .unwrap_or_default();
    Arc::new(Self { client, config, known: RwLock::new(HashMap::new()) })
  }

  /// Store operations require both a remote endpoint and an identity token.
  fn endpoint_for(&self, user_id: &str, category: Category) -> Option<String> {
    let base = self.config.base_url.as_deref()?;
    self.config.auth_token.as_deref()?;
    Some(format!(
      "{}/{}/users/{}/quizData/highScore_{}",
      base.trim_end_matches('/'),
      self.config.app_id,
      user_id,
      category.id()
    ))
  }

  /// Read the stored high score. Absent or malformed documents and
  /// transport failures all degrade to 0.
  #[instrument(level = "info", skip(self), fields(user_id, category = category.id()))]
  pub async fn read(&self, user_id: &str, category: Category) -> u32 {
    let Some(url) = self.endpoint_for(user_id, category) else {
      return 0;
    };

    let score = match self.fetch_doc(&url).await {
      Ok(Some(doc)) => parse_score_doc(&doc),
      Ok(None) => 0,
      Err(e) => {
        warn!(target: "quiz", error = %e, "High-score read failed; degrading to 0");
        0
      }
    };

    self
      .known
      .write()
      .await
      .insert((user_id.to_string(), category), score);
    score
  }

  /// Best-effort write, gated on the last-known value: a no-op unless
  /// `value` strictly exceeds it.
  #[instrument(level = "info", skip(self), fields(user_id, category = category.id(), value))]
  pub async fn write_if_higher(&self, user_id: &str, category: Category, value: u32) {
    let Some(url) = self.endpoint_for(user_id, category) else {
      return;
    };

    let key = (user_id.to_string(), category);
    {
      let known = self.known.read().await;
      if let Some(current) = known.get(&key) {
        if value <= *current {
          return;
        }
      }
    }

    let body = serde_json::json!({ "score": value });
    let res = self
      .client
      .put(&url)
      .header(AUTHORIZATION, self.bearer())
      .json(&body)
      .send()
      .await;

    match res {
      Ok(r) if r.status().is_success() => {
        self.known.write().await.insert(key, value);
        info!(target: "quiz", value, "High score persisted");
      }
      Ok(r) => {
        error!(target: "quiz", status = %r.status(), "High-score write rejected; keeping local value");
      }
      Err(e) => {
        error!(target: "quiz", error = %e, "High-score write failed; keeping local value");
      }
    }
  }

  async fn fetch_doc(&self, url: &str) -> Result<Option<Value>, reqwest::Error> {
    let res = self
      .client
      .get(url)
      .header(AUTHORIZATION, self.bearer())
      .send()
      .await?;
    if res.status() == reqwest::StatusCode::NOT_FOUND {
      return Ok(None);
    }
    if !res.status().is_success() {
      // Treat any other non-success like a missing document.
      warn!(target: "quiz", status = %res.status(), "High-score read returned non-success");
      return Ok(None);
    }
    Ok(Some(res.json::<Value>().await?))
  }

  fn bearer(&self) -> String {
    format!("Bearer {}", self.config.auth_token.as_deref().unwrap_or_default())
  }
}

/// Pull a non-negative integer `score` out of a document; anything else is 0.
fn parse_score_doc(doc: &Value) -> u32 {
  doc
    .get("score")
    .and_then(Value::as_u64)
    .and_then(|v| u32::try_from(v).ok())
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn score_doc_parsing_degrades_to_zero() {
    assert_eq!(parse_score_doc(&serde_json::json!({ "score": 7 })), 7);
    assert_eq!(parse_score_doc(&serde_json::json!({ "score": "7" })), 0);
    assert_eq!(parse_score_doc(&serde_json::json!({ "score": -3 })), 0);
    assert_eq!(parse_score_doc(&serde_json::json!({})), 0);
    assert_eq!(parse_score_doc(&serde_json::json!(null)), 0);
  }

  #[tokio::test]
  async fn operations_are_noops_without_identity() {
    let store = ScoreStore::new(StoreConfig {
      base_url: Some("http://127.0.0.1:1".into()),
      app_id: "test".into(),
      auth_token: None,
    });
    // No identity token: read degrades to 0 without touching the network.
    assert_eq!(store.read("u1", Category::Cpp).await, 0);
    store.write_if_higher("u1", Category::Cpp, 5).await;
  }

  #[tokio::test]
  async fn operations_are_noops_without_endpoint() {
    let store = ScoreStore::new(StoreConfig {
      base_url: None,
      app_id: "test".into(),
      auth_token: Some("tok".into()),
    });
    assert_eq!(store.read("u1", Category::Misc).await, 0);
    store.write_if_higher("u1", Category::Misc, 5).await;
  }
}
