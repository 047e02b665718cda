//! Feedrelay Common Library
//!
//! Shared error handling and logging for the feedrelay jobs.
//!
//! Every job binary initializes logging through [`logging::init_logging`] and
//! reports failures through [`FeedError`]. Job-specific behavior lives in the
//! `feedrelay-jobs` crate; this crate stays free of any transport or database
//! dependency.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{FeedError, Result};
