//! Incremental diff engine
//!
//! Pure logic: given the checkpoint branch, the normalized checkpoint marker
//! and the current remote listing, decide which items to deliver, in which
//! order, and which terminal status to record. No I/O happens here, which is
//! what makes the boundary rules testable in isolation.
//!
//! Marker comparison is strict greater-than: an item whose marker exactly
//! equals the checkpoint is assumed already delivered. That boundary must not
//! move, or deliveries at the boundary instant get duplicated or dropped.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::listing::RemoteItem;
use super::outcome::{Branch, RunStatus};

/// What one source unit's run should do, as computed by the diff
#[derive(Debug, Clone)]
pub struct DiffPlan {
    /// Terminal status to record (error statuses never originate here)
    pub status: RunStatus,

    /// Items to deliver, already in emission order
    pub to_emit: Vec<RemoteItem>,
}

/// Compute the delivery plan for one source unit
///
/// - First run (`Branch::Insert`): the whole listing is new. Non-empty
///   listings are emitted in path order; an empty listing records the empty
///   outcome.
/// - Incremental run (`Branch::Update`): only items strictly newer than the
///   checkpoint are emitted, ascending by marker. A missing marker (the
///   record exists but no scan ever succeeded) treats everything as new.
///   Zero new items or an empty listing records the empty outcome — the
///   caller must not advance the marker in that case, so items arriving out
///   of order are still caught later.
pub fn plan(
    branch: Branch,
    checkpoint: Option<DateTime<Utc>>,
    listing: Vec<RemoteItem>,
) -> DiffPlan {
    match branch {
        Branch::Insert => {
            if listing.is_empty() {
                return DiffPlan {
                    status: RunStatus::InsertedEmpty,
                    to_emit: Vec::new(),
                };
            }
            let mut to_emit = listing;
            to_emit.sort_by(|a, b| a.path.cmp(&b.path));
            DiffPlan {
                status: RunStatus::InsertedSuccess,
                to_emit,
            }
        },
        Branch::Update => {
            let mut new_items: Vec<RemoteItem> = listing
                .into_iter()
                .filter(|item| match checkpoint {
                    Some(marker) => item.modified > marker,
                    None => true,
                })
                .collect();

            if new_items.is_empty() {
                return DiffPlan {
                    status: RunStatus::UpdatedEmpty,
                    to_emit: Vec::new(),
                };
            }

            // Marker order; path breaks ties so the order is deterministic.
            new_items.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
            DiffPlan {
                status: RunStatus::UpdatedSuccess,
                to_emit: new_items,
            }
        },
    }
}

/// Normalize a stored local marker to an absolute UTC instant
///
/// The offset applied is the one in effect at the *historical instant* being
/// converted, not the offset in effect now. A marker written in January and
/// compared in July (or vice versa) therefore resolves to the same absolute
/// instant it named when it was written.
///
/// Seasonal edge cases:
/// - the repeated fall-back hour maps to the earlier instant, so boundary
///   items re-emit rather than drop;
/// - a timestamp inside the spring-forward gap is pushed past the gap.
pub fn normalize_local_marker(local: NaiveDateTime, zone: Tz) -> DateTime<Utc> {
    match zone.from_local_datetime(&local) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(earliest, _latest) => earliest.with_timezone(&Utc),
        chrono::LocalResult::None => {
            let shifted = local + Duration::hours(1);
            zone.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&local))
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(path: &str, modified: DateTime<Utc>) -> RemoteItem {
        RemoteItem {
            name: path.rsplit('/').next().unwrap().to_string(),
            path: path.to_string(),
            modified,
        }
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_first_run_emits_everything_in_path_order() {
        let listing = vec![
            item("feeds/b.csv", utc(2024, 1, 12, 0, 0)),
            item("feeds/a.csv", utc(2024, 1, 11, 0, 0)),
            item("feeds/c.csv", utc(2024, 1, 10, 0, 0)),
        ];

        let plan = plan(Branch::Insert, None, listing);

        assert_eq!(plan.status, RunStatus::InsertedSuccess);
        let paths: Vec<&str> = plan.to_emit.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["feeds/a.csv", "feeds/b.csv", "feeds/c.csv"]);
    }

    #[test]
    fn test_first_run_empty_listing() {
        let plan = plan(Branch::Insert, None, Vec::new());
        assert_eq!(plan.status, RunStatus::InsertedEmpty);
        assert!(plan.to_emit.is_empty());
    }

    #[test]
    fn test_incremental_scenario_strictly_newer_in_marker_order() {
        // Checkpoint 2024-01-10T00:00:00Z; listing 01-09..01-12.
        // Expected: exactly {01-11, 01-12}, ascending by marker.
        let checkpoint = utc(2024, 1, 10, 0, 0);
        let listing = vec![
            item("feeds/d.csv", utc(2024, 1, 12, 0, 0)),
            item("feeds/a.csv", utc(2024, 1, 9, 0, 0)),
            item("feeds/c.csv", utc(2024, 1, 11, 0, 0)),
            item("feeds/b.csv", utc(2024, 1, 10, 0, 0)),
        ];

        let plan = plan(Branch::Update, Some(checkpoint), listing);

        assert_eq!(plan.status, RunStatus::UpdatedSuccess);
        assert_eq!(plan.to_emit.len(), 2);
        assert_eq!(plan.to_emit[0].path, "feeds/c.csv");
        assert_eq!(plan.to_emit[1].path, "feeds/d.csv");
    }

    #[test]
    fn test_boundary_marker_is_excluded() {
        let checkpoint = utc(2024, 1, 10, 0, 0);
        let listing = vec![item("feeds/a.csv", checkpoint)];

        let plan = plan(Branch::Update, Some(checkpoint), listing);

        assert_eq!(plan.status, RunStatus::UpdatedEmpty);
        assert!(plan.to_emit.is_empty());
    }

    #[test]
    fn test_second_run_after_advancing_checkpoint_is_empty() {
        let listing = vec![
            item("feeds/a.csv", utc(2024, 1, 11, 0, 0)),
            item("feeds/b.csv", utc(2024, 1, 12, 0, 0)),
        ];

        let first = plan(Branch::Update, Some(utc(2024, 1, 10, 0, 0)), listing.clone());
        assert_eq!(first.to_emit.len(), 2);

        // Marker advanced to the run time; same listing yields nothing new.
        let run_time = utc(2024, 1, 13, 6, 0);
        let second = plan(Branch::Update, Some(run_time), listing);
        assert_eq!(second.status, RunStatus::UpdatedEmpty);
        assert!(second.to_emit.is_empty());
    }

    #[test]
    fn test_update_without_marker_emits_everything() {
        let listing = vec![
            item("feeds/b.csv", utc(2024, 1, 12, 0, 0)),
            item("feeds/a.csv", utc(2024, 1, 11, 0, 0)),
        ];

        let plan = plan(Branch::Update, None, listing);

        assert_eq!(plan.status, RunStatus::UpdatedSuccess);
        assert_eq!(plan.to_emit[0].path, "feeds/a.csv");
        assert_eq!(plan.to_emit[1].path, "feeds/b.csv");
    }

    #[test]
    fn test_update_empty_listing() {
        let plan = plan(Branch::Update, Some(utc(2024, 1, 10, 0, 0)), Vec::new());
        assert_eq!(plan.status, RunStatus::UpdatedEmpty);
    }

    #[test]
    fn test_normalize_uses_historical_offset() {
        let zone = chrono_tz::America::New_York;

        // Winter marker: EST, UTC-5.
        let winter = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(normalize_local_marker(winter, zone), utc(2024, 1, 15, 17, 0));

        // Summer marker: EDT, UTC-4, regardless of when the conversion runs.
        let summer = NaiveDate::from_ymd_opt(2024, 7, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(normalize_local_marker(summer, zone), utc(2024, 7, 15, 16, 0));
    }

    #[test]
    fn test_normalize_across_offset_change_compares_correctly() {
        let zone = chrono_tz::America::New_York;

        // Checkpoint recorded just before the 2024 spring-forward change.
        let checkpoint_local = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(23, 30, 0)
            .unwrap();
        let checkpoint = normalize_local_marker(checkpoint_local, zone); // 04:30Z Mar 10

        let older = item("feeds/old.csv", utc(2024, 3, 10, 4, 0));
        let newer = item("feeds/new.csv", utc(2024, 3, 10, 5, 0));

        let plan = plan(Branch::Update, Some(checkpoint), vec![older, newer]);
        assert_eq!(plan.to_emit.len(), 1);
        assert_eq!(plan.to_emit[0].path, "feeds/new.csv");
    }

    #[test]
    fn test_normalize_ambiguous_hour_takes_earlier_instant() {
        let zone = chrono_tz::America::New_York;

        // 2024-11-03 01:30 happens twice (EDT then EST); earlier is EDT.
        let ambiguous = NaiveDate::from_ymd_opt(2024, 11, 3)
            .unwrap()
            .and_hms_opt(1, 30, 0)
            .unwrap();
        assert_eq!(normalize_local_marker(ambiguous, zone), utc(2024, 11, 3, 5, 30));
    }

    #[test]
    fn test_normalize_gap_hour_is_pushed_forward() {
        let zone = chrono_tz::America::New_York;

        // 2024-03-10 02:30 does not exist; pushed to 03:30 EDT.
        let gap = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        assert_eq!(normalize_local_marker(gap, zone), utc(2024, 3, 10, 7, 30));
    }
}
