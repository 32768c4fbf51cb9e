//! Command-line and environment configuration

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

use crate::monitoring::MonitoringConfig;
use crate::processor::{ProcessorConfig, DEFAULT_SHARD_ID};
use crate::retry::RetryConfig;
use crate::store::DEFAULT_CHECKPOINT_PATH;

/// Forward records from a Kinesis shard to HTTP endpoints based on JSON filters
#[derive(Debug, Clone, Parser)]
#[command(name = "kinesis-forwarder", version, about)]
pub struct Config {
    /// Enable verbose output. (Specify twice for more verbosity.)
    #[arg(short = 'v', long, action = ArgAction::Count, default_value_t = 0)]
    verbose: u8,

    /// Name of the Kinesis stream to read
    #[arg(long, env = "KINESIS_STREAM")]
    pub stream: String,

    /// Shard to consume
    #[arg(long, env = "KINESIS_SHARD_ID", default_value = DEFAULT_SHARD_ID)]
    pub shard_id: String,

    /// Maximum records requested per GetRecords call
    #[arg(
        long,
        env = "KINESIS_MAX_RECORDS",
        default_value_t = 50,
        value_parser = clap::value_parser!(i32).range(1..=10000)
    )]
    pub max_records: i32,

    /// Path to the JSON routing rules
    #[arg(long, env = "FORWARDER_FILTERS", default_value = "filters.json")]
    pub filters: PathBuf,

    /// AWS region of the stream
    #[arg(long, env = "AWS_REGION", default_value = "us-west-2")]
    pub region: String,

    /// Override the Kinesis endpoint (e.g. a local emulator)
    #[arg(long, env = "KINESIS_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// File holding the last checkpointed sequence number
    #[arg(long, env = "FORWARDER_CHECKPOINT_PATH", default_value = DEFAULT_CHECKPOINT_PATH)]
    pub checkpoint_path: PathBuf,

    /// Wait after a failed fetch before retrying, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub fetch_error_backoff_ms: u64,

    /// Wait between successful fetches, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub poll_interval_ms: u64,

    /// Warn when the shard reports more lag than this, in milliseconds (0 disables)
    #[arg(long, default_value_t = 60_000)]
    pub lag_warning_ms: u64,

    /// Timeout for each HTTP delivery, in milliseconds
    #[arg(long)]
    pub request_timeout_ms: Option<u64>,

    /// Log aggregated metrics every N seconds
    #[arg(long)]
    pub metrics_interval_secs: Option<u64>,
}

impl Config {
    /// Gets the configured log level based on the user-supplied verbosity level.
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn metrics_interval(&self) -> Option<Duration> {
        self.metrics_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn processor_config(&self) -> ProcessorConfig {
        let monitoring = match self.metrics_interval() {
            Some(metrics_interval) => MonitoringConfig {
                enabled: true,
                metrics_interval,
                ..Default::default()
            },
            None => MonitoringConfig::default(),
        };

        ProcessorConfig {
            stream_name: self.stream.clone(),
            shard_id: self.shard_id.clone(),
            batch_size: self.max_records,
            retry: RetryConfig {
                fetch_error_backoff: Duration::from_millis(self.fetch_error_backoff_ms),
                poll_interval: Duration::from_millis(self.poll_interval_ms),
            },
            lag_warning_threshold: (self.lag_warning_ms > 0)
                .then(|| Duration::from_millis(self.lag_warning_ms)),
            monitoring,
        }
    }
}
