//! Remote listing contract
//!
//! A listing adapter enumerates the items currently visible at a source
//! location. Each item carries a marker — a fixed point in time independent
//! of any local clock offset — that the diff engine compares against the
//! stored checkpoint. Adapters must return UTC instants; normalization of
//! stored local markers happens in [`crate::core::diff`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// One discoverable unit at a source location
///
/// Ephemeral: recomputed by listing the source on every run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// Bare item name (e.g., file name)
    pub name: String,

    /// Full path/identity at the source, as delivered downstream
    pub path: String,

    /// Modification marker as an absolute UTC instant
    pub modified: DateTime<Utc>,
}

/// Listing failures, split by how the run loop must react
#[derive(Error, Debug)]
pub enum ListingError {
    /// The remote location does not exist or was renamed. Recoverable per
    /// source unit: the run records an error outcome and moves on.
    #[error("remote location not found: {0}")]
    NotFound(String),

    /// Any other listing failure (connection drop, protocol error)
    #[error("listing failed for {location}: {message}")]
    Other { location: String, message: String },
}

/// Enumerates items at a location whose names match a wildcard pattern
#[async_trait]
pub trait RemoteListing {
    async fn list(&self, location: &str, pattern: &str) -> Result<Vec<RemoteItem>, ListingError>;
}
