//! Feedrelay - partner data-movement jobs

use anyhow::Result;
use clap::Parser;
use feedrelay_common::logging::{init_logging, LogConfig, LogLevel};
use feedrelay_jobs::{apiexport, contacts, relay, watcher};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "feedrelay")]
#[command(author, version, about = "Partner data-movement jobs")]
struct Cli {
    /// Job to run
    #[command(subcommand)]
    job: Job,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Job {
    /// Scan remote locations for new files and queue notifications
    Watch,

    /// Aggregate partner contact drops into delimited exports
    Contacts,

    /// Relay one uploaded object to the external FTP endpoint
    Relay {
        /// Source bucket
        #[arg(long)]
        bucket: String,

        /// Object key
        #[arg(long)]
        key: String,
    },

    /// Drain a partner's API export endpoint into a delimited file
    ApiExport {
        /// Launch message: partner_id|auth_token|url|launch_time|tenant|member_key
        #[arg(long)]
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env()?.with_file_prefix("feedrelay");
    if cli.verbose {
        log_config = log_config.with_level(LogLevel::Debug);
    }
    init_logging(&log_config)?;

    match cli.job {
        Job::Watch => {
            let summary = watcher::run().await?;
            info!(
                processed = summary.processed,
                emitted = summary.emitted,
                errored = summary.errored,
                "Watcher finished"
            );
        },
        Job::Contacts => {
            contacts::run().await?;
            info!("Contacts aggregation finished");
        },
        Job::Relay { bucket, key } => {
            relay::run(&bucket, &key).await?;
        },
        Job::ApiExport { message } => {
            apiexport::run(&message).await?;
        },
    }

    Ok(())
}
