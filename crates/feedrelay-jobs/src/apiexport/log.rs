//! Export progress log
//!
//! The launcher inserts one `LAUNCHED` row per export request into
//! `api_export_log`; this job finds that row by member key and launch time
//! and rewrites it exactly once with the terminal outcome. The next run's
//! start date is derived by query: the newest start date among prior
//! `SUCCESS`/`PARTIAL` rows, falling back to the epoch of the business.

use feedrelay_common::{FeedError, Result};
use sqlx::postgres::PgPool;
use tracing::debug;

/// Status the launcher leaves the row in; only such rows are updated
pub const STATUS_LAUNCHED: &str = "LAUNCHED";

/// Start date used when the member has no successful history
pub const FALLBACK_START_DATE: &str = "1900-01-01";

pub struct ExportLog {
    pool: PgPool,
}

impl ExportLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Start date for the next pull, `YYYY-MM-DD`
    pub async fn start_date(&self, member_key: &str) -> Result<String> {
        let latest: Option<chrono::NaiveDate> = sqlx::query_scalar(
            r#"
            SELECT MAX(date(create_start_date))
            FROM api_export_log
            WHERE member_key = $1
              AND status_indicator IN ('SUCCESS', 'PARTIAL')
            "#,
        )
        .bind(member_key)
        .fetch_one(&self.pool)
        .await
        .map_err(FeedError::database)?;

        let start_date = match latest {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => FALLBACK_START_DATE.to_string(),
        };

        debug!(member_key = %member_key, start_date = %start_date, "Resolved start date");
        Ok(start_date)
    }

    /// All pages pulled and exported
    pub async fn mark_success(
        &self,
        member_key: &str,
        launch_time: &str,
        rows_in_file: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE api_export_log
            SET status_indicator = 'SUCCESS',
                rows_in_file = $1
            WHERE status_indicator = $2
              AND member_key = $3
              AND create_start_date = CAST($4 AS timestamp)
            "#,
        )
        .bind(rows_in_file)
        .bind(STATUS_LAUNCHED)
        .bind(member_key)
        .bind(launch_time)
        .execute(&self.pool)
        .await
        .map_err(FeedError::database)?;

        Ok(())
    }

    /// Some pages pulled and exported before a failure; the start date
    /// advances to the high-water mark so the next run resumes there
    pub async fn mark_partial(
        &self,
        member_key: &str,
        launch_time: &str,
        rows_in_file: i64,
        high_water_mark: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE api_export_log
            SET status_indicator = 'PARTIAL',
                rows_in_file = $1,
                create_start_date = CAST($2 AS timestamp),
                error_description = 'API hit successful but not all records pulled'
            WHERE status_indicator = $3
              AND member_key = $4
              AND create_start_date = CAST($5 AS timestamp)
            "#,
        )
        .bind(rows_in_file)
        .bind(high_water_mark)
        .bind(STATUS_LAUNCHED)
        .bind(member_key)
        .bind(launch_time)
        .execute(&self.pool)
        .await
        .map_err(FeedError::database)?;

        Ok(())
    }

    /// The API answered but had no records in scope
    pub async fn mark_zero_records(&self, member_key: &str, launch_time: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE api_export_log
            SET status_indicator = 'COMPLETED WITH ERROR',
                rows_in_file = 0,
                error_description = 'API hit successful but unable to retrieve any records'
            WHERE status_indicator = $1
              AND member_key = $2
              AND create_start_date = CAST($3 AS timestamp)
            "#,
        )
        .bind(STATUS_LAUNCHED)
        .bind(member_key)
        .bind(launch_time)
        .execute(&self.pool)
        .await
        .map_err(FeedError::database)?;

        Ok(())
    }

    /// Nothing pulled; the error text lands in the row
    pub async fn mark_failed(
        &self,
        member_key: &str,
        launch_time: &str,
        error: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE api_export_log
            SET status_indicator = 'FAILED',
                rows_in_file = 0,
                error_description = $1
            WHERE status_indicator = $2
              AND member_key = $3
              AND create_start_date = CAST($4 AS timestamp)
            "#,
        )
        .bind(error)
        .bind(STATUS_LAUNCHED)
        .bind(member_key)
        .bind(launch_time)
        .execute(&self.pool)
        .await
        .map_err(FeedError::database)?;

        Ok(())
    }
}
