//! Codequiz · Trivia Quiz Backend
//!
//! - Axum HTTP + WebSocket API (one quiz session per WS connection)
//! - Gemini integration for question/hint/explanation generation
//! - Remote document store for per-user, per-category high scores
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT              : u16 (default 3000)
//!   GEMINI_API_KEY    : enables question generation if present
//!   GEMINI_BASE_URL   : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL      : default "gemini-1.5-flash"
//!   QUIZ_CONFIG_PATH  : path to TOML config (prompt templates + store)
//!   STORE_BASE_URL    : document store endpoint (high scores disabled if unset)
//!   STORE_APP_ID      : application namespace (default "default-app-id")
//!   STORE_AUTH_TOKEN  : identity token; store operations are no-ops without it
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod config;
mod prompt;
mod gemini;
mod store;
mod session;
mod logic;
mod state;
mod protocol;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (prompts, Gemini client, score store).
  let state = Arc::new(AppState::new());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "codequiz_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
