//! Incremental ingestion core
//!
//! The shared "compare a remote listing against a durable checkpoint, deliver
//! only the new items, record the outcome" machinery used by the watcher job.
//! Transport adapters (Postgres, FTP, SQS) implement the traits declared
//! here; the diff itself is pure and lives in [`diff`].
//!
//! Control flow per run: load the logged-id set, then for each source unit in
//! schedule order: read its checkpoint, list the remote location, diff,
//! deliver, record exactly one outcome. Strictly sequential — isolation comes
//! from per-unit commit boundaries, not from locking.

pub mod checkpoint;
pub mod diff;
pub mod emit;
pub mod listing;
pub mod outcome;
pub mod run;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use emit::DeliveryEmitter;
pub use listing::{ListingError, RemoteItem, RemoteListing};
pub use outcome::{Branch, RunStatus};
pub use run::{process_source_units, RunSummary};

/// One configured ingestion target
///
/// Immutable for the duration of a run; loaded fresh each run from the
/// configuration table, ordered by schedule key then identity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourceUnit {
    /// Unique identity, shared with the checkpoint record
    pub id: i64,

    /// Short display code carried in notifications
    pub display_code: String,

    /// Remote location to scan
    pub remote_path: String,

    /// Wildcard pattern the item names must match
    pub name_pattern: String,

    /// External reference id carried in notifications
    pub external_ref: String,

    /// Raw category tag; normalized before emission
    pub category: String,

    /// Classification tag, also the status-text prefix
    pub classification: String,

    /// Secondary ordering key for the run sequence
    pub schedule_key: i64,
}
