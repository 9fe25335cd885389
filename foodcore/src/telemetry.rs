//! Tracing/logging initialization, shared across all four services.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize a `tracing_subscriber` with an `EnvFilter` (`RUST_LOG`,
/// defaulting to `info`). JSON output in production, pretty output in
/// development, matching the teacher's default (non-otel) logging path.
pub fn init_tracing(service_name: &'static str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let is_production = std::env::var("APP_ENV").as_deref() == Ok("production");

    let subscriber = fmt().with_env_filter(env_filter).with_target(true);

    if is_production {
        subscriber.json().init();
    } else {
        subscriber.pretty().init();
    }

    tracing::info!(service = service_name, "telemetry initialized");
}
