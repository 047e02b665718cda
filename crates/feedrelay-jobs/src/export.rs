//! Delimited export rendering shared by the aggregation and API export jobs

use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use feedrelay_common::{FeedError, Result};

/// Render rows pipe-delimited with minimal quoting and `\n` line terminator
pub fn write_delimited(rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'|')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in rows {
        writer.write_record(row).map_err(FeedError::parse)?;
    }

    writer
        .into_inner()
        .map_err(|e| FeedError::parse(e.to_string()))
}

/// Observation timestamp used in export file names: `YYYY-MM-dd_HH-MM-SS-mmm`
pub fn observation_timestamp(now: DateTime<Utc>) -> String {
    format!(
        "{}-{:03}",
        now.format("%Y-%m-%d_%H-%M-%S"),
        now.timestamp_subsec_micros() / 10_000
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_write_delimited_pipes_and_quotes_minimally() {
        let rows = vec![
            vec!["fname".to_string(), "lname".to_string()],
            vec!["Avi".to_string(), "Pa|til".to_string()],
        ];
        let out = String::from_utf8(write_delimited(&rows).unwrap()).unwrap();
        assert_eq!(out, "fname|lname\nAvi|\"Pa|til\"\n");
    }

    #[test]
    fn test_observation_timestamp_format() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 16, 30, 45).unwrap()
            + chrono::Duration::microseconds(250_000);
        assert_eq!(observation_timestamp(now), "2024-06-01_16-30-45-025");
    }
}
