//! Job configuration
//!
//! Every job reads its settings and secrets from the environment at startup,
//! validates them once, and carries them in a plain struct for the rest of
//! the run. `dotenvy` is honored for local development.

use chrono_tz::Tz;
use feedrelay_common::{FeedError, Result};

// ============================================================================
// Defaults
// ============================================================================

/// Default reference timezone for checkpoint markers.
pub const DEFAULT_REFERENCE_ZONE: &str = "America/New_York";

/// Default FTP control port.
pub const DEFAULT_FTP_PORT: u16 = 21;

/// Default inbox prefix scanned by the contacts job.
pub const DEFAULT_INBOX_PREFIX: &str = "inbox/partner";

/// Default page size for the API export job.
pub const DEFAULT_API_RECORD_LIMIT: u32 = 500;

/// Default delay between API calls in seconds (the API is throttled).
pub const DEFAULT_API_DELAY_SECS: u64 = 5;

fn required(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| FeedError::config(format!("{} not set", name)))
}

fn optional_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// FTP endpoint
// ============================================================================

/// Connection settings for an FTP endpoint (listing source or relay target)
#[derive(Debug, Clone)]
pub struct FtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl FtpConfig {
    /// Load from environment with the given variable prefix
    /// (e.g., `WATCHER_FTP_HOST`, `RELAY_FTP_HOST`)
    pub fn from_env(prefix: &str) -> Result<Self> {
        Ok(Self {
            host: required(&format!("{}_FTP_HOST", prefix))?,
            port: optional_parse(&format!("{}_FTP_PORT", prefix), DEFAULT_FTP_PORT),
            username: required(&format!("{}_FTP_USERNAME", prefix))?,
            password: required(&format!("{}_FTP_PASSWORD", prefix))?,
        })
    }
}

// ============================================================================
// Watcher job
// ============================================================================

/// Configuration for the file-watcher job
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Downstream notification queue URL
    pub queue_url: String,

    /// Listing source endpoint
    pub ftp: FtpConfig,

    /// Reference timezone the checkpoint markers are stored in
    pub reference_zone: Tz,
}

impl WatcherConfig {
    pub fn from_env() -> Result<Self> {
        let zone_name = std::env::var("FEEDRELAY_TIMEZONE")
            .unwrap_or_else(|_| DEFAULT_REFERENCE_ZONE.to_string());
        let reference_zone: Tz = zone_name
            .parse()
            .map_err(|_| FeedError::config(format!("invalid timezone: {}", zone_name)))?;

        Ok(Self {
            queue_url: required("FEEDRELAY_QUEUE_URL")?,
            ftp: FtpConfig::from_env("WATCHER")?,
            reference_zone,
        })
    }
}

// ============================================================================
// Contacts job
// ============================================================================

/// Configuration for the partner-contact aggregation job
#[derive(Debug, Clone)]
pub struct ContactsConfig {
    /// Bucket holding the inbox/outbox folders
    pub source_bucket: String,

    /// Bucket receiving the delimited exports
    pub destination_bucket: String,

    /// Key prefix scanned for new contact files
    pub inbox_prefix: String,

    /// File-name prefix of the exports
    pub export_prefix: String,

    /// Reference timezone for export file timestamps
    pub reference_zone: Tz,
}

impl ContactsConfig {
    pub fn from_env() -> Result<Self> {
        let zone_name = std::env::var("FEEDRELAY_TIMEZONE")
            .unwrap_or_else(|_| DEFAULT_REFERENCE_ZONE.to_string());
        let reference_zone: Tz = zone_name
            .parse()
            .map_err(|_| FeedError::config(format!("invalid timezone: {}", zone_name)))?;

        Ok(Self {
            source_bucket: required("SOURCE_BUCKET")?,
            destination_bucket: required("DESTINATION_BUCKET")?,
            inbox_prefix: std::env::var("INBOX_PREFIX")
                .unwrap_or_else(|_| DEFAULT_INBOX_PREFIX.to_string()),
            export_prefix: std::env::var("EXPORT_PREFIX")
                .unwrap_or_else(|_| "contacts".to_string()),
            reference_zone,
        })
    }
}

// ============================================================================
// Relay job
// ============================================================================

/// Configuration for the storage → FTP relay job
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Target endpoint
    pub ftp: FtpConfig,

    /// Remote directory uploads land in
    pub upload_dir: String,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            ftp: FtpConfig::from_env("RELAY")?,
            upload_dir: required("RELAY_UPLOAD_DIR")?,
        })
    }
}

// ============================================================================
// API export job
// ============================================================================

/// Configuration for the paginated API export job
#[derive(Debug, Clone)]
pub struct ApiExportConfig {
    /// Bucket receiving the delimited exports
    pub export_bucket: String,

    /// Records requested per page
    pub record_limit: u32,

    /// Fixed delay between API calls (throttle)
    pub delay_secs: u64,

    /// File-name prefix of the exports
    pub export_prefix: String,

    /// Source name used in the archive key layout
    pub source_name: String,
}

impl ApiExportConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            export_bucket: required("EXPORT_BUCKET")?,
            record_limit: optional_parse("API_RECORD_LIMIT", DEFAULT_API_RECORD_LIMIT),
            delay_secs: optional_parse("API_DELAY_SECONDS", DEFAULT_API_DELAY_SECS),
            export_prefix: std::env::var("EXPORT_PREFIX")
                .unwrap_or_else(|_| "tour-inquiry".to_string()),
            source_name: std::env::var("EXPORT_SOURCE_NAME")
                .unwrap_or_else(|_| "TourVisit/Inquiry".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.record_limit == 0 {
            return Err(FeedError::config("API_RECORD_LIMIT must be greater than 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_export_rejects_zero_limit() {
        let config = ApiExportConfig {
            export_bucket: "bucket".to_string(),
            record_limit: 0,
            delay_secs: 1,
            export_prefix: "x".to_string(),
            source_name: "y".to_string(),
        };
        assert!(config.validate().is_err());
    }
}
