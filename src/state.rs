//! Shared application state: prompt templates, the Gemini client, and the
//! score store adapter. Per-connection session state lives in
//! `logic::SessionRunner`, not here.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::load_quiz_config_from_env;
use crate::config::Prompts;
use crate::gemini::Gemini;
use crate::store::{ScoreStore, StoreConfig};

pub struct AppState {
  pub prompts: Prompts,
  pub gemini: Option<Gemini>,
  pub store: Arc<ScoreStore>,
}

impl AppState {
  /// Build state from env: load TOML config, resolve the store settings,
  /// init the Gemini client if an API key is present.
  #[instrument(level = "info", skip_all)]
  pub fn new() -> Self {
    let cfg = load_quiz_config_from_env().unwrap_or_default();
    let prompts = cfg.prompts.clone();
    let store = ScoreStore::new(StoreConfig::resolve(&cfg.store));

    let gemini = Gemini::from_env();
    if let Some(g) = &gemini {
      info!(target: "codequiz_backend", base_url = %g.base_url, model = %g.model, "Gemini enabled.");
    } else {
      info!(target: "codequiz_backend", "Gemini disabled (no GEMINI_API_KEY). Question generation will fail until configured.");
    }

    Self { prompts, gemini, store }
  }
}
