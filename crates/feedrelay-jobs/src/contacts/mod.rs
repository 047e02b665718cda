//! Partner-contact aggregation job
//!
//! Collects the JSON contact files dropped into `inbox/partner-*` folders,
//! appends them into one pipe-delimited export per partner in the destination
//! bucket, then archives the consumed inputs to `outbox/`. The header row
//! comes from the first file of each partner, in that file's own key order;
//! later files contribute body rows only.
//!
//! Any storage failure aborts the run with a non-zero exit; partners already
//! exported before the failure stay exported.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use feedrelay_common::Result;
use serde_json::{Map, Value};
use tracing::info;

use crate::config::ContactsConfig;
use crate::export::write_delimited;
use crate::storage::Storage;

/// Execute one aggregation run
pub async fn run() -> Result<()> {
    let config = ContactsConfig::from_env()?;
    let storage = Storage::from_env().await;

    let keys = storage
        .list_keys(&config.source_bucket, &config.inbox_prefix, Some(".json"))
        .await?;

    if keys.is_empty() {
        info!("No new contact files in the inbox for any partner");
        return Ok(());
    }

    let partners: BTreeSet<String> = keys.iter().filter_map(|k| partner_id(k)).collect();
    info!(partners = ?partners, files = keys.len(), "Partners identified with contact files");

    for partner in &partners {
        let partner_keys = partner_file_list(&keys, partner);

        let mut rows: Vec<Vec<String>> = Vec::new();
        for key in &partner_keys {
            let data = storage.download(&config.source_bucket, key).await?;
            let contact: Map<String, Value> = serde_json::from_slice(&data)?;

            if rows.is_empty() {
                rows.push(header_row(&contact));
            }
            rows.push(body_row(&contact));
        }

        let body = write_delimited(&rows)?;
        let file_name = format!(
            "{}-{}-{}.txt",
            config.export_prefix,
            partner,
            export_timestamp(Utc::now(), config.reference_zone)
        );
        let export_key = format!("archive/{}/{}", partner, file_name);
        storage
            .upload(&config.destination_bucket, &export_key, body)
            .await?;

        info!(
            partner = %partner,
            files = partner_keys.len(),
            export = %file_name,
            "Contact files written to export"
        );

        for key in &partner_keys {
            let dest = outbox_key(key);
            storage.copy(&config.source_bucket, key, &dest).await?;
            storage.delete(&config.source_bucket, key).await?;
        }

        info!(partner = %partner, files = partner_keys.len(), "Inputs archived to outbox");
    }

    Ok(())
}

/// Partner id is the second path segment: `inbox/partner-444/x.json` → `partner-444`
fn partner_id(key: &str) -> Option<String> {
    key.split('/').nth(1).map(|s| s.to_string())
}

/// Keys belonging to one partner, in listing order
fn partner_file_list(keys: &[String], partner: &str) -> Vec<String> {
    keys.iter()
        .filter(|k| partner_id(k).as_deref() == Some(partner))
        .cloned()
        .collect()
}

/// Map a consumed inbox key to its outbox archive location
fn outbox_key(key: &str) -> String {
    match key.strip_prefix("inbox/") {
        Some(rest) => format!("outbox/{}", rest),
        None => format!("outbox/{}", key),
    }
}

/// Header row: the contact's field names in JSON key order
fn header_row(contact: &Map<String, Value>) -> Vec<String> {
    contact.keys().cloned().collect()
}

/// Body row: the contact's values in JSON key order
fn body_row(contact: &Map<String, Value>) -> Vec<String> {
    contact.values().map(render_value).collect()
}

/// Strings verbatim, null empty, everything else compact JSON
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Export timestamp in the reference zone, with a padded centisecond suffix
fn export_timestamp(now: DateTime<Utc>, zone: Tz) -> String {
    let local = now.with_timezone(&zone);
    format!(
        "{}-{:03}",
        local.format("%Y-%m-%d_%H-%M-%S"),
        now.timestamp_subsec_micros() / 10_000
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn contact(json: &str) -> Map<String, Value> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_header_row_keeps_key_order() {
        let c = contact(r#"{"fname": "Avi", "lname": "Patil"}"#);
        assert_eq!(header_row(&c), vec!["fname", "lname"]);
    }

    #[test]
    fn test_body_row_keeps_key_order() {
        let c = contact(r#"{"fname": "Avi", "lname": "Patil"}"#);
        assert_eq!(body_row(&c), vec!["Avi", "Patil"]);
    }

    #[test]
    fn test_render_value_variants() {
        assert_eq!(render_value(&Value::Null), "");
        assert_eq!(render_value(&Value::Bool(true)), "true");
        assert_eq!(render_value(&serde_json::json!(42)), "42");
        assert_eq!(render_value(&serde_json::json!("plain")), "plain");
    }

    #[test]
    fn test_partner_id_is_second_segment() {
        assert_eq!(
            partner_id("inbox/partner-444/xyz.json"),
            Some("partner-444".to_string())
        );
    }

    #[test]
    fn test_partner_file_list_filters_by_partner() {
        let keys = vec![
            "inbox/partner-234/xyz.txt".to_string(),
            "inbox/partner-456/abc.txt".to_string(),
            "inbox/partner-456/pqr.txt".to_string(),
        ];
        assert_eq!(
            partner_file_list(&keys, "partner-456"),
            vec!["inbox/partner-456/abc.txt", "inbox/partner-456/pqr.txt"]
        );
    }

    #[test]
    fn test_outbox_key_swaps_top_folder() {
        assert_eq!(
            outbox_key("inbox/partner-234/xyz.json"),
            "outbox/partner-234/xyz.json"
        );
    }

    #[test]
    fn test_export_timestamp_format() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 16, 30, 45).unwrap()
            + chrono::Duration::microseconds(250_000);
        let ts = export_timestamp(now, chrono_tz::America::New_York);
        // 16:30 UTC is 12:30 in New York during DST.
        assert_eq!(ts, "2024-06-01_12-30-45-025");
    }
}
