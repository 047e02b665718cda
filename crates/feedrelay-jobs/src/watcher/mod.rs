//! File-watcher job
//!
//! Scans every configured remote location for items newer than the stored
//! checkpoint and publishes one queue notification per new item. All shared
//! resources (database pool, FTP session, queue client) are opened once here,
//! before the first unit is touched; any failure at this stage aborts the run
//! with nothing half-processed.

pub mod queue;
pub mod store;

use aws_config::BehaviorVersion;
use chrono::Utc;
use feedrelay_common::Result;
use tracing::info;

use crate::config::WatcherConfig;
use crate::core::{process_source_units, RunSummary, SourceUnit};
use crate::db::{self, DbConfig};
use crate::remote::FtpSession;

use queue::SqsEmitter;
use store::{load_source_units, PgCheckpointStore};

/// Everything one watcher run needs, built up front
///
/// The context is constructed once per run and handed down explicitly; no
/// connection or client lives in global state.
pub struct RunContext {
    pub config: WatcherConfig,
    pub units: Vec<SourceUnit>,
    pub store: PgCheckpointStore,
    pub ftp: FtpSession,
    pub emitter: SqsEmitter,
}

impl RunContext {
    /// Open every shared resource; any failure is run-fatal
    pub async fn initialize() -> Result<Self> {
        let config = WatcherConfig::from_env()?;

        let pool = db::create_pool(&DbConfig::from_env()?).await?;
        let units = load_source_units(&pool).await?;
        let store = PgCheckpointStore::new(pool);

        let ftp = FtpSession::connect(&config.ftp).await?;

        let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let emitter = SqsEmitter::new(
            aws_sdk_sqs::Client::new(&aws_config),
            config.queue_url.clone(),
        );

        Ok(Self {
            config,
            units,
            store,
            ftp,
            emitter,
        })
    }
}

/// Execute one watcher run
pub async fn run() -> Result<RunSummary> {
    let ctx = RunContext::initialize().await?;
    info!(
        units = ctx.units.len(),
        zone = %ctx.config.reference_zone,
        "Watcher run starting"
    );

    let summary = process_source_units(
        &ctx.units,
        &ctx.store,
        &ctx.ftp,
        &ctx.emitter,
        ctx.config.reference_zone,
        Utc::now(),
    )
    .await?;

    ctx.ftp.quit().await;
    Ok(summary)
}
