//! Postgres-backed checkpoint store
//!
//! One row per source unit in `source_checkpoint_log`, written with a single
//! upsert so the insert and update branches share one statement. The marker
//! column only moves when the run supplies a new value; `COALESCE` keeps the
//! previous one on empty and error outcomes.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use feedrelay_common::{FeedError, Result};
use sqlx::postgres::PgPool;

use crate::core::{Checkpoint, CheckpointStore, RunStatus, SourceUnit};

/// Load the configured source units, in run order
pub async fn load_source_units(pool: &PgPool) -> Result<Vec<SourceUnit>> {
    sqlx::query_as::<_, SourceUnit>(
        r#"
        SELECT id, display_code, remote_path, name_pattern,
               external_ref, category, classification, schedule_key
        FROM source_feeds
        ORDER BY schedule_key, id
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(FeedError::database)
}

/// Checkpoint store over the shared connection pool
#[derive(Clone)]
pub struct PgCheckpointStore {
    pool: PgPool,
}

impl PgCheckpointStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CheckpointRow {
    last_seen_at: Option<NaiveDateTime>,
    status_log: String,
}

#[async_trait]
impl CheckpointStore for PgCheckpointStore {
    async fn logged_ids(&self) -> Result<HashSet<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT source_id FROM source_checkpoint_log")
            .fetch_all(&self.pool)
            .await
            .map_err(FeedError::database)?;

        Ok(ids.into_iter().collect())
    }

    async fn get_checkpoint(&self, source_id: i64) -> Result<Option<Checkpoint>> {
        let row = sqlx::query_as::<_, CheckpointRow>(
            r#"
            SELECT last_seen_at, status_log
            FROM source_checkpoint_log
            WHERE source_id = $1
            "#,
        )
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(FeedError::database)?;

        Ok(row.map(|r| Checkpoint {
            marker: r.last_seen_at,
            status: r.status_log,
        }))
    }

    async fn upsert(
        &self,
        unit: &SourceUnit,
        items_found: i64,
        status: RunStatus,
        marker: Option<NaiveDateTime>,
    ) -> Result<()> {
        // Each outcome commits on its own; one failed unit never holds a
        // transaction open across the rest of the run.
        sqlx::query(
            r#"
            INSERT INTO source_checkpoint_log
                (source_id, display_code, new_items_found, status_log,
                 schedule_key, last_seen_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            ON CONFLICT (source_id) DO UPDATE SET
                display_code = EXCLUDED.display_code,
                new_items_found = EXCLUDED.new_items_found,
                status_log = EXCLUDED.status_log,
                schedule_key = EXCLUDED.schedule_key,
                last_seen_at = COALESCE(EXCLUDED.last_seen_at,
                                        source_checkpoint_log.last_seen_at),
                updated_at = NOW()
            "#,
        )
        .bind(unit.id)
        .bind(&unit.display_code)
        .bind(items_found)
        .bind(status.render(&unit.classification))
        .bind(unit.schedule_key)
        .bind(marker)
        .execute(&self.pool)
        .await
        .map_err(FeedError::database)?;

        Ok(())
    }
}
