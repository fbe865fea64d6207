//! HTTP endpoint handlers: health, the category list, and the generation
//! proxy that keeps the provider credential server-side.

use std::sync::Arc;

use axum::{
  extract::State,
  http::{header::CONTENT_TYPE, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use serde_json::Value;
use tracing::{error, instrument};

use crate::protocol::{categories_out, ErrorOut, HealthOut};
use crate::state::AppState;
use crate::util::trunc_for_log;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info")]
pub async fn http_get_categories() -> impl IntoResponse {
  Json(serde_json::json!({ "categories": categories_out() }))
}

/// Forward a generation payload verbatim to the provider.
///
/// Contract: missing credential → 500 `{error}`; upstream failure → the
/// upstream status with `{error}`; success → the provider's body and status
/// unchanged. Non-POST never reaches here (405 from method routing).
#[instrument(level = "info", skip(state, payload))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Json(payload): Json<Value>,
) -> Response {
  let Some(gemini) = &state.gemini else {
    return (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(ErrorOut { error: "API key not configured".into() }),
    )
      .into_response();
  };

  match gemini.forward_payload(payload).await {
    Ok((status, body)) if status.is_success() => {
      let status = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::OK);
      (status, [(CONTENT_TYPE, "application/json")], body).into_response()
    }
    Ok((status, body)) => {
      error!(target: "codequiz_backend", %status, body = %trunc_for_log(&body, 300), "Provider rejected proxied generation request");
      let status =
        StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
      (
        status,
        Json(ErrorOut { error: format!("Provider error: {}", trunc_for_log(&body, 300)) }),
      )
        .into_response()
    }
    Err(e) => {
      error!(target: "codequiz_backend", error = %e, "Proxy request failed");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorOut { error: "Internal Server Error".into() }),
      )
        .into_response()
    }
  }
}
