//! Idempotency store (spec §3, §4.5).
//!
//! `eventKey` insertion is the authoritative "claim" to process an event
//! exactly once. A duplicate-key violation means the event was already
//! processed (or is being processed concurrently) and the caller should
//! log and return, not raise.

use chrono::Utc;
use sea_query::{Expr, PostgresQueryBuilder, Query};
use sqlx::{Executor, Postgres};
use tracing::info;

use crate::error::{CoreError, Result};

#[derive(sea_query::Iden)]
enum IdempotentEvents {
    Table,
    EventKey,
    CreatedAt,
}

/// Outcome of attempting to claim an event key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// This call inserted the key; the caller owns processing it.
    Claimed,
    /// The key already existed; this is a replay.
    AlreadyProcessed,
}

/// Format an idempotency key as `<OP>:<aggregate-id>` (spec §3, §4.5).
pub fn event_key(operation: &str, aggregate_id: impl std::fmt::Display) -> String {
    format!("{operation}:{aggregate_id}")
}

/// Attempt to claim `key` inside the caller's transaction.
///
/// On a duplicate-key violation this returns `Ok(Claim::AlreadyProcessed)`
/// rather than an error — duplicates are an expected, routine outcome of
/// at-least-once delivery, not a failure.
pub async fn claim<'e, E>(executor: E, key: &str) -> Result<Claim>
where
    E: Executor<'e, Database = Postgres>,
{
    let (sql, values) = Query::insert()
        .into_table(IdempotentEvents::Table)
        .columns([IdempotentEvents::EventKey, IdempotentEvents::CreatedAt])
        .values_panic([key.into(), Utc::now().into()])
        .build_sqlx(PostgresQueryBuilder);

    match sqlx::query_with(&sql, values).execute(executor).await {
        Ok(_) => Ok(Claim::Claimed),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            info!(event_key = %key, "event already processed, dropping duplicate");
            Ok(Claim::AlreadyProcessed)
        }
        Err(e) => Err(CoreError::Database(e)),
    }
}

/// Delete idempotency keys older than `before`. The idempotency store
/// only needs to cover the broker's redelivery window (spec §3), so it
/// is swept on the same retention horizon as the outbox.
pub async fn delete_older_than(
    pool: &sqlx::PgPool,
    before: chrono::DateTime<Utc>,
    batch_size: i64,
) -> Result<u64> {
    let select_keys = Query::select()
        .column(IdempotentEvents::EventKey)
        .from(IdempotentEvents::Table)
        .and_where(Expr::col(IdempotentEvents::CreatedAt).lt(before))
        .limit(batch_size as u64)
        .to_owned();

    let (sql, values) = Query::delete()
        .from_table(IdempotentEvents::Table)
        .and_where(Expr::col(IdempotentEvents::EventKey).in_subquery(select_keys))
        .build_sqlx(PostgresQueryBuilder);

    let result = sqlx::query_with(&sql, values).execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_key_format_matches_spec() {
        let id = uuid::Uuid::nil();
        assert_eq!(event_key("RESERVE_STOCK", id), format!("RESERVE_STOCK:{id}"));
    }
}
