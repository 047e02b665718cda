//! Checkpoint store contract
//!
//! One durable record per source unit, keyed by the unit's identity. The
//! record doubles as the run-outcome row: every write stores the items-found
//! count and the rendered status text, and optionally advances the last-seen
//! marker. Each write commits immediately and independently — a failure on
//! one source unit never rolls back or blocks the next.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use feedrelay_common::Result;

use super::outcome::RunStatus;
use super::SourceUnit;

/// Stored checkpoint state for one source unit
#[derive(Debug, Clone)]
pub struct Checkpoint {
    /// Last-seen marker, naive in the configured reference zone.
    /// `None` means the record exists but no scan ever completed for it, so
    /// every listed item counts as new.
    pub marker: Option<NaiveDateTime>,

    /// Most recently recorded status text
    pub status: String,
}

/// Durable source-id → checkpoint mapping with outcome history
#[async_trait]
pub trait CheckpointStore {
    /// Identities of every source unit that already has a record
    ///
    /// Loaded once per run; membership selects the insert or update branch.
    async fn logged_ids(&self) -> Result<HashSet<i64>>;

    /// The stored checkpoint, `None` if the unit was never processed
    async fn get_checkpoint(&self, source_id: i64) -> Result<Option<Checkpoint>>;

    /// Record the terminal outcome of one run for one source unit
    ///
    /// Inserts the first record or updates the existing one — never both,
    /// never a duplicate row. `marker` advances the stored last-seen marker
    /// when present; `None` leaves it untouched. The status is rendered to
    /// text here, at the persistence boundary.
    async fn upsert(
        &self,
        unit: &SourceUnit,
        items_found: i64,
        status: RunStatus,
        marker: Option<NaiveDateTime>,
    ) -> Result<()>;
}
