//! Delivery emitter contract and notification format
//!
//! One notification is published per new item, in the order the diff engine
//! computed. The wire format is a pipe-delimited UTF-8 string of exactly six
//! fields; field values are assumed delimiter-free (no escaping is performed,
//! matching the downstream consumer's parser).

use async_trait::async_trait;
use feedrelay_common::Result;

use super::listing::RemoteItem;
use super::SourceUnit;

/// Field separator of the notification format
pub const FIELD_DELIMITER: char = '|';

/// Publishes one notification to the downstream sink, at-least-once
#[async_trait]
pub trait DeliveryEmitter {
    async fn emit(&self, message: &str) -> Result<()>;
}

/// Build the six-field notification for one new item
///
/// Field order: target system identifier, source display code, external
/// reference id, full item path, normalized category, classification tag.
pub fn format_notification(unit: &SourceUnit, item: &RemoteItem) -> String {
    let target_id = unit.id.to_string();
    let category = normalize_category(&unit.category);
    [
        target_id.as_str(),
        unit.display_code.as_str(),
        unit.external_ref.as_str(),
        item.path.as_str(),
        category.as_str(),
        unit.classification.as_str(),
    ]
    .join(&FIELD_DELIMITER.to_string())
}

/// Normalize a category tag for the notification
///
/// Lower-cases the tag and replaces every character outside `[a-z0-9]` with a
/// single underscore, so downstream routing keys stay shell- and URL-safe.
pub fn normalize_category(category: &str) -> String {
    category
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn test_unit() -> SourceUnit {
        SourceUnit {
            id: 4401,
            display_code: "NWU".to_string(),
            remote_path: "partners/nwu/drops".to_string(),
            name_pattern: "acs*.csv".to_string(),
            external_ref: "0013x00002Qb".to_string(),
            category: "Direct Mail (Spring)".to_string(),
            classification: "first_year".to_string(),
            schedule_key: 7,
        }
    }

    #[test]
    fn test_notification_has_six_fields_in_order() {
        let unit = test_unit();
        let item = RemoteItem {
            name: "acs_jan.csv".to_string(),
            path: "partners/nwu/drops/acs_jan.csv".to_string(),
            modified: Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap(),
        };

        let message = format_notification(&unit, &item);
        let fields: Vec<&str> = message.split(FIELD_DELIMITER).collect();

        // Downstream parsers read the target system identifier from field 1
        // and the external reference id from field 3; that order is load-bearing.
        assert_eq!(
            fields,
            vec![
                "4401",
                "NWU",
                "0013x00002Qb",
                "partners/nwu/drops/acs_jan.csv",
                "direct_mail__spring_",
                "first_year",
            ]
        );
    }

    #[test]
    fn test_normalize_category_lowercases_and_replaces() {
        assert_eq!(normalize_category("Direct Mail"), "direct_mail");
        assert_eq!(normalize_category("A&B/C's list"), "a_b_c_s_list");
        assert_eq!(normalize_category("plain"), "plain");
        assert_eq!(normalize_category("2024"), "2024");
    }

    #[test]
    fn test_normalize_category_keeps_no_delimiter() {
        // The pipe is the wire delimiter; it must never survive normalization.
        assert!(!normalize_category("a|b|c").contains(FIELD_DELIMITER));
    }
}
