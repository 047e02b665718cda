//! Feedrelay jobs
//!
//! Scheduled data-movement jobs around the partner file exchange:
//!
//! - **watcher** — scans remote FTP locations for newly arrived files and
//!   publishes one queue notification per new item, checkpointed in Postgres
//! - **contacts** — aggregates per-partner JSON contact drops into one
//!   pipe-delimited export per partner, archiving the inputs
//! - **relay** — pushes an uploaded object from the bucket to the external
//!   FTP endpoint
//! - **apiexport** — drains a partner's paginated REST export endpoint into a
//!   pipe-delimited file, progress tracked in a relational log
//!
//! The incremental-ingestion machinery shared by the watcher lives in
//! [`core`]; transport adapters (Postgres, FTP, S3, SQS, HTTP) sit in their
//! own modules and implement the core's traits.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod apiexport;
pub mod config;
pub mod contacts;
pub mod core;
pub mod db;
pub mod export;
pub mod relay;
pub mod remote;
pub mod storage;
pub mod watcher;
