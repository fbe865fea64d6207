//! Tracing setup.
//!
//! LOG_LEVEL feeds the `EnvFilter` (a plain level or full directives);
//! LOG_FORMAT switches between "pretty" (default) and "json" output.
//! Targets, files, and line numbers are included so log lines can be traced
//! back to their source alongside the per-request TraceLayer spans.

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
  let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
    EnvFilter::new("info,quiz=debug,codequiz_backend=debug,tower_http=info,axum=info")
  });

  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(true)
    .with_file(true)
    .with_line_number(true);

  // The JSON and pretty builders are different types; init inside each arm.
  match std::env::var("LOG_FORMAT").as_deref() {
    Ok("json") => builder.json().init(),
    _ => builder.init(),
  }
}
