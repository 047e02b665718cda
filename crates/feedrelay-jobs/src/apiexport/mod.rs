//! Paginated API export job
//!
//! Drains a partner's REST export endpoint page by page into one
//! pipe-delimited file in the export bucket, tracking progress in the
//! `api_export_log` table. The start date comes from that table (checkpoint
//! by query); the terminal outcome is written back exactly once to the row
//! the launcher left in `LAUNCHED` state.

pub mod client;
pub mod log;

use std::time::Duration;

use chrono::{DateTime, Utc};
use feedrelay_common::{FeedError, Result};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::ApiExportConfig;
use crate::db::{self, DbConfig};
use crate::export::{observation_timestamp, write_delimited};
use crate::storage::Storage;

use client::{row_for, sanitize_record, ApiClient};
use log::ExportLog;

/// Parsed launch message
///
/// Wire format: `partner_id|auth_token|url|launch_time|tenant|member_key`,
/// sometimes wrapped in tuple-rendering artifacts by the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputMessage {
    pub partner_id: String,
    pub auth_token: String,
    pub url: String,
    pub launch_time: String,
    pub tenant: String,
    pub member_key: String,
}

impl InputMessage {
    pub fn parse(raw: &str) -> Result<Self> {
        let cleaned = raw.replace("('", "").replace("',)", "");
        let fields: Vec<&str> = cleaned.split('|').collect();
        if fields.len() != 6 {
            return Err(FeedError::parse(format!(
                "expected 6 pipe-delimited fields, got {}",
                fields.len()
            )));
        }

        Ok(Self {
            partner_id: fields[0].to_string(),
            auth_token: fields[1].to_string(),
            url: fields[2].to_string(),
            launch_time: fields[3].to_string(),
            tenant: fields[4].to_string(),
            member_key: fields[5].trim_end_matches("']").to_string(),
        })
    }
}

/// Execute one export run for one launch message
pub async fn run(message: &str) -> Result<()> {
    let config = ApiExportConfig::from_env()?;
    let input = InputMessage::parse(message)?;
    info!(partner_id = %input.partner_id, tenant = %input.tenant, "Export run starting");

    let pool = db::create_pool(&DbConfig::from_env()?).await?;
    let export_log = ExportLog::new(pool);
    let storage = Storage::from_env().await;

    let start_date = export_log.start_date(&input.member_key).await?;
    let api = ApiClient::new(
        input.url.clone(),
        input.auth_token.clone(),
        config.record_limit,
    );

    let recon = match api.recon(&start_date).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Recon failed; nothing pulled");
            export_log
                .mark_failed(&input.member_key, &input.launch_time, &e.to_string())
                .await?;
            return Err(e);
        },
    };

    if recon.total == 0 {
        warn!(start_date = %start_date, "Zero records in scope; terminating");
        export_log
            .mark_zero_records(&input.member_key, &input.launch_time)
            .await?;
        return Ok(());
    }

    // The API is throttled; pause between every call.
    let throttle = Duration::from_secs(config.delay_secs);
    let mut rows: Vec<Vec<String>> = vec![recon.headers.clone()];
    let mut high_water_mark = start_date.clone();
    let mut failure: Option<FeedError> = None;

    for page in 0..=recon.pages_remaining {
        match api.fetch_page(&start_date, page).await {
            Ok(records) => {
                for mut record in records {
                    sanitize_record(&mut record);
                    if let Some(Value::String(ts)) = record.get("creation_time") {
                        high_water_mark = ts.clone();
                    }
                    rows.push(row_for(&record, &recon.headers));
                }
                info!(page, of = recon.pages_remaining, rows = rows.len() - 1, "Page pulled");
            },
            Err(e) => {
                error!(page, error = %e, "Page pull failed; stopping the loop");
                failure = Some(e);
                break;
            },
        }
        tokio::time::sleep(throttle).await;
    }

    let row_count = (rows.len() - 1) as i64;

    match failure {
        None => {
            let key = export_key(&config.export_prefix, &config.source_name, &input.tenant, Utc::now());
            storage
                .upload(&config.export_bucket, &key, write_delimited(&rows)?)
                .await?;
            export_log
                .mark_success(&input.member_key, &input.launch_time, row_count)
                .await?;
            info!(rows = row_count, key = %key, "Export complete");
            Ok(())
        },
        Some(e) if row_count > 0 => {
            // Save what was pulled and advance the start date to the last
            // record's creation time, so the next run resumes from there.
            let key = export_key(&config.export_prefix, &config.source_name, &input.tenant, Utc::now());
            storage
                .upload(&config.export_bucket, &key, write_delimited(&rows)?)
                .await?;
            export_log
                .mark_partial(&input.member_key, &input.launch_time, row_count, &high_water_mark)
                .await?;
            warn!(
                rows = row_count,
                high_water_mark = %high_water_mark,
                "Partial export saved"
            );
            Err(e)
        },
        Some(e) => {
            export_log
                .mark_failed(&input.member_key, &input.launch_time, "No records pulled")
                .await?;
            Err(e)
        },
    }
}

/// Export object key: `archive/{tenant}/{source}/{date}/{prefix}-{tenant}-{ts}.txt`
fn export_key(prefix: &str, source_name: &str, tenant: &str, now: DateTime<Utc>) -> String {
    format!(
        "archive/{}/{}/{}/{}-{}-{}.txt",
        tenant,
        source_name,
        now.format("%Y-%m-%d"),
        prefix,
        tenant,
        observation_timestamp(now)
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_clean_message() {
        let msg = InputMessage::parse(
            "4401|tok-abc|https://api.example.com/v1/inquiries|2024-06-01 09:00:00|tenant-9|MK-77",
        )
        .unwrap();
        assert_eq!(msg.partner_id, "4401");
        assert_eq!(msg.auth_token, "tok-abc");
        assert_eq!(msg.url, "https://api.example.com/v1/inquiries");
        assert_eq!(msg.launch_time, "2024-06-01 09:00:00");
        assert_eq!(msg.tenant, "tenant-9");
        assert_eq!(msg.member_key, "MK-77");
    }

    #[test]
    fn test_parse_strips_launcher_artifacts() {
        let msg = InputMessage::parse(
            "('4401|tok|https://u|2024-06-01 09:00:00|t-9|MK-77']',)",
        )
        .unwrap();
        assert_eq!(msg.partner_id, "4401");
        assert_eq!(msg.member_key, "MK-77");
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        assert!(InputMessage::parse("a|b|c").is_err());
    }

    #[test]
    fn test_export_key_layout() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 16, 30, 45).unwrap();
        let key = export_key("tour-inquiry", "TourVisit/Inquiry", "tenant-9", now);
        assert_eq!(
            key,
            "archive/tenant-9/TourVisit/Inquiry/2024-06-01/tour-inquiry-tenant-9-2024-06-01_16-30-45-000.txt"
        );
    }
}
