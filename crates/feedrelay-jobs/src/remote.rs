//! FTP session adapter
//!
//! One session per run: opened at startup (fatal on failure), then reused by
//! every source unit's listing and by the relay upload. `suppaftp` is
//! synchronous, so each operation hops through `spawn_blocking`; the stream
//! sits behind a mutex because the run loop is strictly sequential anyway.
//!
//! Modification markers come from MDTM, which reports UTC per RFC 3659 —
//! exactly the fixed-point-in-time value the diff engine needs.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use feedrelay_common::{FeedError, Result};
use suppaftp::{FtpError, FtpStream, Status};
use tracing::{debug, info, warn};

use crate::config::FtpConfig;
use crate::core::listing::{ListingError, RemoteItem, RemoteListing};

/// Shared FTP session for one run
#[derive(Clone)]
pub struct FtpSession {
    stream: Arc<Mutex<FtpStream>>,
}

impl FtpSession {
    /// Connect and log in; failure here aborts the run before any unit is
    /// processed.
    pub async fn connect(config: &FtpConfig) -> Result<Self> {
        let config = config.clone();
        let stream = tokio::task::spawn_blocking(move || -> Result<FtpStream> {
            debug!("Connecting to FTP endpoint: {}:{}", config.host, config.port);

            let mut stream = FtpStream::connect(format!("{}:{}", config.host, config.port))
                .map_err(FeedError::remote)?;

            // Extended Passive Mode for NAT/firewall compatibility.
            stream.set_mode(suppaftp::Mode::ExtendedPassive);

            stream
                .login(&config.username, &config.password)
                .map_err(FeedError::remote)?;

            stream
                .transfer_type(suppaftp::types::FileType::Binary)
                .map_err(FeedError::remote)?;

            info!(host = %config.host, "FTP session established");
            Ok(stream)
        })
        .await
        .map_err(FeedError::remote)??;

        Ok(Self {
            stream: Arc::new(Mutex::new(stream)),
        })
    }

    /// Upload a file into a remote directory, creating or overwriting it
    pub async fn upload(&self, remote_dir: &str, file_name: &str, data: Vec<u8>) -> Result<u64> {
        let stream = Arc::clone(&self.stream);
        let remote_dir = remote_dir.to_string();
        let file_name = file_name.to_string();

        tokio::task::spawn_blocking(move || -> Result<u64> {
            let mut guard = stream.lock().unwrap_or_else(|e| e.into_inner());

            guard.cwd(&remote_dir).map_err(FeedError::remote)?;
            debug!(dir = %remote_dir, "Changed into remote upload directory");

            let written = guard
                .put_file(&file_name, &mut Cursor::new(data))
                .map_err(FeedError::remote)?;

            Ok(written)
        })
        .await
        .map_err(FeedError::remote)?
    }

    /// Close the session; best-effort, logged on failure
    pub async fn quit(self) {
        let stream = Arc::clone(&self.stream);
        let result = tokio::task::spawn_blocking(move || {
            let mut guard = stream.lock().unwrap_or_else(|e| e.into_inner());
            guard.quit()
        })
        .await;

        match result {
            Ok(Ok(())) => {},
            Ok(Err(e)) => warn!("Failed to quit FTP session gracefully: {}", e),
            Err(e) => warn!("FTP quit task panicked: {}", e),
        }
    }

    fn list_sync(
        stream: &mut FtpStream,
        location: &str,
        pattern: &str,
    ) -> std::result::Result<Vec<RemoteItem>, ListingError> {
        let lines = stream
            .list(Some(location))
            .map_err(|e| classify(location, e))?;

        let mut items = Vec::new();
        for line in lines {
            let Some(entry) = FtpEntry::parse(&line) else {
                continue;
            };
            if entry.is_directory || !matches_pattern(&entry.name, pattern) {
                continue;
            }

            let path = format!("{}/{}", location.trim_end_matches('/'), entry.name);
            let modified = stream.mdtm(&path).map_err(|e| classify(&path, e))?;

            items.push(RemoteItem {
                name: entry.name,
                path,
                modified: Utc.from_utc_datetime(&modified),
            });
        }

        debug!(location = %location, matched = items.len(), "Listed remote location");
        Ok(items)
    }
}

#[async_trait]
impl RemoteListing for FtpSession {
    async fn list(
        &self,
        location: &str,
        pattern: &str,
    ) -> std::result::Result<Vec<RemoteItem>, ListingError> {
        let stream = Arc::clone(&self.stream);
        let location = location.to_string();
        let pattern = pattern.to_string();

        tokio::task::spawn_blocking(move || {
            let mut guard = stream.lock().unwrap_or_else(|e| e.into_inner());
            Self::list_sync(&mut guard, &location, &pattern)
        })
        .await
        .map_err(|e| ListingError::Other {
            location: "listing task".to_string(),
            message: e.to_string(),
        })?
    }
}

/// Map FTP errors onto the run loop's two-way split: a 550-class reply means
/// the location is gone or renamed (recoverable per unit), anything else is a
/// generic listing failure.
fn classify(location: &str, err: FtpError) -> ListingError {
    match err {
        FtpError::UnexpectedResponse(ref response)
            if response.status == Status::FileUnavailable =>
        {
            ListingError::NotFound(location.to_string())
        },
        other => ListingError::Other {
            location: location.to_string(),
            message: other.to_string(),
        },
    }
}

/// Parsed FTP LIST entry (Unix-style listings)
#[derive(Debug, Clone)]
struct FtpEntry {
    name: String,
    is_directory: bool,
}

impl FtpEntry {
    /// Parse a LIST line like
    /// `-rw-r--r--   1 ftp ftp  1234 Jan 15 12:00 filename.txt`
    fn parse(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return None;
        }

        Some(Self {
            name: (*parts.last()?).to_string(),
            is_directory: parts[0].starts_with('d'),
        })
    }
}

/// Case-insensitive wildcard match supporting `*` and `?`
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    fn matches(name: &[u8], pattern: &[u8]) -> bool {
        match (pattern.first(), name.first()) {
            (None, None) => true,
            (Some(b'*'), _) => {
                matches(name, &pattern[1..]) || (!name.is_empty() && matches(&name[1..], pattern))
            },
            (Some(b'?'), Some(_)) => matches(&name[1..], &pattern[1..]),
            (Some(p), Some(n)) => p.eq_ignore_ascii_case(n) && matches(&name[1..], &pattern[1..]),
            _ => false,
        }
    }
    matches(name.as_bytes(), pattern.as_bytes())
}
