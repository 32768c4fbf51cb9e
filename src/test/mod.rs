//! Test utilities and mock implementations for testing the forwarder

pub mod mocks;

use std::sync::Once;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::client::StreamRecord;
use crate::monitoring::{MonitoringConfig, ProcessingEvent, ProcessingEventType};
use crate::processor::ProcessorConfig;
use crate::retry::RetryConfig;

static INIT: Once = Once::new();

/// Helper functions for creating test data
pub struct TestUtils;

impl TestUtils {
    /// Initialize logging for tests
    pub fn init_logging() {
        INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::from_default_env()
                        .add_directive("kinesis_forwarder=debug".parse().unwrap()),
                )
                .with_test_writer()
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .try_init()
                .ok();
        });
    }

    /// Create a test record with given sequence number and data
    pub fn create_test_record(sequence_number: &str, data: &[u8]) -> StreamRecord {
        StreamRecord::new(sequence_number, data.to_vec())
    }

    /// Create records `0..count` whose payload is `{"id": "<n>"}`
    pub fn create_test_records(count: usize) -> Vec<StreamRecord> {
        (0..count)
            .map(|i| {
                Self::create_test_record(
                    &format!("sequence-{}", i),
                    format!(r#"{{"id":"{}"}}"#, i).as_bytes(),
                )
            })
            .collect()
    }

    /// Processor config with short waits and monitoring enabled
    pub fn processor_config() -> ProcessorConfig {
        ProcessorConfig {
            stream_name: "test-stream".to_string(),
            shard_id: "shardId-000000000000".to_string(),
            batch_size: 100,
            retry: RetryConfig {
                fetch_error_backoff: Duration::from_millis(10),
                poll_interval: Duration::from_millis(5),
            },
            lag_warning_threshold: Some(Duration::from_secs(1)),
            monitoring: MonitoringConfig {
                enabled: true,
                channel_size: 1000,
                metrics_interval: Duration::from_secs(60),
            },
        }
    }

    /// Collects every event already published on the channel
    pub fn drain_events(rx: &mut mpsc::Receiver<ProcessingEvent>) -> Vec<ProcessingEventType> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event.event_type);
        }
        events
    }
}
