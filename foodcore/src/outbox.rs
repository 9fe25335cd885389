//! Transactional outbox (spec §3, §4.4).
//!
//! `OutboxEvent` rows are written in the same local transaction as the
//! aggregate mutation that produced them; a separate periodic publisher
//! (`outbox_publisher`) drains unprocessed rows to the broker.

use chrono::{DateTime, Utc};
use sea_query::{Asc, Expr, PostgresQueryBuilder, Query};
use sqlx::{postgres::PgRow, Executor, FromRow, Postgres, Row};
use uuid::Uuid;

use crate::contracts::Event;
use crate::error::Result;

/// A row in the `outbox` table (spec §3).
#[derive(Debug, Clone)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
}

impl FromRow<'_, PgRow> for OutboxEvent {
    fn from_row(row: &PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(OutboxEvent {
            id: row.try_get("id")?,
            aggregate_type: row.try_get("aggregate_type")?,
            aggregate_id: row.try_get("aggregate_id")?,
            event_type: row.try_get("type")?,
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
            processed: row.try_get("processed")?,
        })
    }
}

#[derive(sea_query::Iden)]
enum Outbox {
    Table,
    Id,
    AggregateType,
    AggregateId,
    #[iden = "type"]
    Type,
    Payload,
    CreatedAt,
    Processed,
}

/// Appends an outbox row inside the caller's transaction.
///
/// Callers are expected to call this from within the same `sqlx`
/// transaction as the aggregate write it accompanies, satisfying the
/// "created in the same local transaction" invariant of spec §3.
pub async fn append<'e, E>(executor: E, aggregate_type: &str, aggregate_id: Uuid, event: &Event) -> Result<()>
where
    E: Executor<'e, Database = Postgres>,
{
    let payload = serde_json::to_value(event)?;
    let (sql, values) = Query::insert()
        .into_table(Outbox::Table)
        .columns([
            Outbox::Id,
            Outbox::AggregateType,
            Outbox::AggregateId,
            Outbox::Type,
            Outbox::Payload,
            Outbox::CreatedAt,
            Outbox::Processed,
        ])
        .values_panic([
            Uuid::new_v4().into(),
            aggregate_type.into(),
            aggregate_id.into(),
            event.routing_key().into(),
            payload.into(),
            Utc::now().into(),
            false.into(),
        ])
        .build_sqlx(PostgresQueryBuilder);

    sqlx::query_with(&sql, values).execute(executor).await?;
    Ok(())
}

/// Repository over the `outbox` table, used by the publisher and
/// retention reaper (spec §4.4).
#[derive(Clone)]
pub struct OutboxStore {
    pool: sqlx::PgPool,
}

impl OutboxStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a bounded batch of unprocessed rows, oldest first.
    pub async fn fetch_unprocessed_batch(&self, limit: i64) -> Result<Vec<OutboxEvent>> {
        let (sql, values) = Query::select()
            .columns([
                Outbox::Id,
                Outbox::AggregateType,
                Outbox::AggregateId,
                Outbox::Type,
                Outbox::Payload,
                Outbox::CreatedAt,
                Outbox::Processed,
            ])
            .from(Outbox::Table)
            .and_where(Expr::col(Outbox::Processed).eq(false))
            .order_by(Outbox::CreatedAt, Asc)
            .limit(limit as u64)
            .build_sqlx(PostgresQueryBuilder);

        let rows = sqlx::query_as_with::<_, OutboxEvent, _>(&sql, values)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Mark a single row processed. A failure here just leaves the row
    /// for the next tick (spec §4.4 point 3) — callers must not treat
    /// this as fatal for the whole batch.
    pub async fn mark_processed(&self, id: Uuid) -> Result<()> {
        let (sql, values) = Query::update()
            .table(Outbox::Table)
            .value(Outbox::Processed, true)
            .and_where(Expr::col(Outbox::Id).eq(id))
            .build_sqlx(PostgresQueryBuilder);
        sqlx::query_with(&sql, values).execute(&self.pool).await?;
        Ok(())
    }

    /// Delete processed rows older than `before`, in batches of at most
    /// `batch_size` (spec §4.4 second periodic task).
    pub async fn delete_processed_before(&self, before: DateTime<Utc>, batch_size: i64) -> Result<u64> {
        // Postgres doesn't support LIMIT on DELETE directly; delete via a
        // subquery selecting the oldest `batch_size` matching ids.
        let select_ids = Query::select()
            .column(Outbox::Id)
            .from(Outbox::Table)
            .and_where(Expr::col(Outbox::Processed).eq(true))
            .and_where(Expr::col(Outbox::CreatedAt).lt(before))
            .order_by(Outbox::CreatedAt, Asc)
            .limit(batch_size as u64)
            .to_owned();

        let (sql, values) = Query::delete()
            .from_table(Outbox::Table)
            .and_where(Expr::col(Outbox::Id).in_subquery(select_ids))
            .build_sqlx(PostgresQueryBuilder);

        let result = sqlx::query_with(&sql, values).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
