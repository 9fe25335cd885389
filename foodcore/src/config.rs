//! Layered configuration (spec §6 "CLI / config").
//!
//! Each service loads from environment variables under its own prefix
//! (`ORDER_`, `STORE_`, `COURIER_`, `NOTIFICATION_`) via the `config`
//! crate, mirroring the teacher's `CONFIG_ENV_PREFIX` / `DATABASE_URL_ENV_VAR`
//! convention.

use serde::Deserialize;

use crate::outbox_publisher::OutboxPublisherConfig;

/// Database connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// Broker connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub url: String,
}

/// Raw, serde-deserializable view of outbox publisher tuning, before
/// conversion into `OutboxPublisherConfig` (which uses `Duration`/
/// `chrono::Duration`, neither of which implements `Deserialize` the
/// way we want for env-sourced seconds/days).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutboxTuning {
    pub batch_size: i64,
    pub tick_seconds: u64,
    pub retention_days: i64,
    pub cleanup_interval_seconds: u64,
    pub cleanup_batch_size: i64,
}

impl Default for OutboxTuning {
    fn default() -> Self {
        let defaults = OutboxPublisherConfig::default();
        Self {
            batch_size: defaults.batch_size,
            tick_seconds: defaults.tick.as_secs(),
            retention_days: defaults.retention.num_days(),
            cleanup_interval_seconds: defaults.cleanup_interval.as_secs(),
            cleanup_batch_size: defaults.cleanup_batch_size,
        }
    }
}

impl From<OutboxTuning> for OutboxPublisherConfig {
    fn from(t: OutboxTuning) -> Self {
        Self {
            batch_size: t.batch_size,
            tick: std::time::Duration::from_secs(t.tick_seconds),
            retention: chrono::Duration::days(t.retention_days),
            cleanup_interval: std::time::Duration::from_secs(t.cleanup_interval_seconds),
            cleanup_batch_size: t.cleanup_batch_size,
        }
    }
}

/// Common shape every service's config extends.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub database: DatabaseConfig,
    pub broker: BrokerConfig,
    #[serde(default)]
    pub outbox: OutboxTuning,
}

impl ServiceConfig {
    /// Load from environment variables prefixed with `prefix` (e.g.
    /// `ORDER_DATABASE__URL`, `ORDER_BROKER__URL`).
    pub fn load(prefix: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("database.max_connections", 10i64)?
            .set_default("outbox.batch_size", 50i64)?
            .set_default("outbox.tick_seconds", 2i64)?
            .set_default("outbox.retention_days", 2i64)?
            .set_default("outbox.cleanup_interval_seconds", 24 * 3600i64)?
            .set_default("outbox.cleanup_batch_size", 1000i64)?
            .add_source(
                config::Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
