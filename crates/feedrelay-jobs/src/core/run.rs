//! Per-run processing loop
//!
//! Walks the configured source units strictly in order and gives each one an
//! isolated outcome: a listing or delivery failure for unit *k* is recorded
//! against unit *k* and never stops units *k+1..* from being processed. Only
//! the initial logged-id load is allowed to abort the run, because without it
//! no branch decision can be made.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use feedrelay_common::Result;
use tracing::{error, info, warn};

use super::checkpoint::CheckpointStore;
use super::diff::{self, normalize_local_marker};
use super::emit::{format_notification, DeliveryEmitter};
use super::listing::{ListingError, RemoteListing};
use super::outcome::{Branch, RunStatus};
use super::SourceUnit;

/// Aggregate result of one run, for the closing log line
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Source units processed
    pub processed: usize,
    /// Notifications delivered across all units
    pub emitted: usize,
    /// Units that ended in an error outcome
    pub errored: usize,
}

/// Process every source unit once, sequentially
///
/// `now` is the run time: successful outcomes advance the stored marker to
/// this instant, expressed in the reference zone. Outcome writes that fail
/// are logged and skipped; the loop always reaches the last unit.
pub async fn process_source_units<S, L, E>(
    units: &[SourceUnit],
    store: &S,
    listing: &L,
    emitter: &E,
    zone: Tz,
    now: DateTime<Utc>,
) -> Result<RunSummary>
where
    S: CheckpointStore,
    L: RemoteListing,
    E: DeliveryEmitter,
{
    let logged = store.logged_ids().await?;
    let run_marker = now.with_timezone(&zone).naive_local();
    let mut summary = RunSummary::default();

    for unit in units {
        summary.processed += 1;

        let branch = if logged.contains(&unit.id) {
            Branch::Update
        } else {
            Branch::Insert
        };

        let checkpoint = match branch {
            Branch::Insert => None,
            Branch::Update => match store.get_checkpoint(unit.id).await {
                Ok(record) => record
                    .and_then(|cp| cp.marker)
                    .map(|marker| normalize_local_marker(marker, zone)),
                Err(e) => {
                    error!(source_id = unit.id, error = %e, "Checkpoint read failed; skipping unit");
                    summary.errored += 1;
                    continue;
                },
            },
        };

        let (status, items_found) =
            match listing.list(&unit.remote_path, &unit.name_pattern).await {
                Ok(items) => {
                    let plan = diff::plan(branch, checkpoint, items);
                    let mut delivered = 0usize;
                    let mut delivery_failed = false;

                    for item in &plan.to_emit {
                        let message = format_notification(unit, item);
                        match emitter.emit(&message).await {
                            Ok(()) => {
                                info!(source_id = unit.id, message = %message, "Notification emitted");
                                delivered += 1;
                            },
                            Err(e) => {
                                error!(
                                    source_id = unit.id,
                                    path = %item.path,
                                    error = %e,
                                    "Delivery failed; unit falls to error outcome"
                                );
                                delivery_failed = true;
                                break;
                            },
                        }
                    }

                    summary.emitted += delivered;

                    if delivery_failed {
                        (RunStatus::error_for(branch), 0)
                    } else {
                        (plan.status, delivered as i64)
                    }
                },
                Err(ListingError::NotFound(location)) => {
                    warn!(source_id = unit.id, location = %location, "Remote location not found");
                    (RunStatus::error_for(branch), 0)
                },
                Err(e) => {
                    error!(source_id = unit.id, error = %e, "Listing failed");
                    (RunStatus::error_for(branch), 0)
                },
            };

        if matches!(
            status,
            RunStatus::InsertedError | RunStatus::UpdatedError
        ) {
            summary.errored += 1;
        }

        let marker = status.advances_marker().then_some(run_marker);
        if let Err(e) = store.upsert(unit, items_found, status, marker).await {
            // Per-unit commit isolation: log and keep going.
            error!(source_id = unit.id, error = %e, "Outcome write failed");
        }
    }

    info!(
        processed = summary.processed,
        emitted = summary.emitted,
        errored = summary.errored,
        "Run complete"
    );

    Ok(summary)
}
