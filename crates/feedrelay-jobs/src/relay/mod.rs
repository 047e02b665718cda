//! Storage → remote endpoint relay job
//!
//! Pushes one uploaded object from the bucket to the external FTP endpoint,
//! keeping the object's file name. The bucket and key arrive as CLI
//! arguments; the upstream storage-event trigger is outside this binary.
//!
//! Both outcomes produce a status line with a local timestamp so the
//! operations channel can tail the log; a failed transfer exits non-zero.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use feedrelay_common::{FeedError, Result};
use tracing::{error, info};

use crate::config::RelayConfig;
use crate::remote::FtpSession;
use crate::storage::Storage;

/// Relay one object to the remote endpoint
pub async fn run(bucket: &str, key: &str) -> Result<()> {
    let config = RelayConfig::from_env()?;
    info!(bucket = %bucket, key = %key, "Relay transfer requested");

    let storage = Storage::from_env().await;
    let ftp = FtpSession::connect(&config.ftp).await?;

    let result = transfer(&storage, &ftp, &config, bucket, key).await;
    ftp.quit().await;

    let zone: Tz = crate::config::DEFAULT_REFERENCE_ZONE.parse().map_err(|_| {
        FeedError::config(format!(
            "invalid timezone: {}",
            crate::config::DEFAULT_REFERENCE_ZONE
        ))
    })?;

    match result {
        Ok(bytes) => {
            info!(
                "{} File uploaded successfully: {} ({} bytes)",
                pretty_time(Utc::now(), zone),
                key,
                bytes
            );
            Ok(())
        },
        Err(e) => {
            error!(
                "{} Error while attempting to upload: {}: {}",
                pretty_time(Utc::now(), zone),
                key,
                e
            );
            Err(e)
        },
    }
}

async fn transfer(
    storage: &Storage,
    ftp: &FtpSession,
    config: &RelayConfig,
    bucket: &str,
    key: &str,
) -> Result<u64> {
    let data = storage.download(bucket, key).await?;
    let file_name = remote_file_name(key);
    ftp.upload(&config.upload_dir, file_name, data).await
}

/// The remote file keeps the object's base name
fn remote_file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Human-readable local timestamp for the status line
fn pretty_time(now: DateTime<Utc>, zone: Tz) -> String {
    now.with_timezone(&zone).format("%Y-%m-%d %I:%M:%S %p").to_string()
}
