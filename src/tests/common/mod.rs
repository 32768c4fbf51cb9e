use anyhow::Result;

use crate::client::RecordBatch;
use crate::monitoring::ProcessingEventType;
use crate::processor::{ForwardingProcessor, ProcessorConfig};
use crate::rules::{Rule, RuleSet};
use crate::shutdown::ShutdownCoordinator;
use crate::test::mocks::{MockCheckpointStore, MockForwarder, MockKinesisClient};
use crate::test::TestUtils;
use std::time::Duration;

pub const DESTINATION: &str = "http://x/a";

/// The rule set used by the end-to-end scenarios
pub fn scenario_rules() -> RuleSet {
    RuleSet::new(vec![Rule::new(DESTINATION, "myKey", "myValue")])
}

/// Mocks plus a coordinator, wired the way the binary wires the real parts
pub struct TestContext {
    pub config: ProcessorConfig,
    pub rules: RuleSet,
    pub client: MockKinesisClient,
    pub forwarder: MockForwarder,
    pub store: MockCheckpointStore,
    pub coordinator: ShutdownCoordinator,
}

impl TestContext {
    pub fn new() -> Self {
        TestUtils::init_logging();
        Self {
            config: TestUtils::processor_config(),
            rules: scenario_rules(),
            client: MockKinesisClient::new(),
            forwarder: MockForwarder::new(),
            store: MockCheckpointStore::new(),
            coordinator: ShutdownCoordinator::new(),
        }
    }

    pub async fn mock_batch(&self, records: &[(&str, &str)], next_iterator: Option<&str>) {
        let records = records
            .iter()
            .map(|(seq, data)| TestUtils::create_test_record(seq, data.as_bytes()))
            .collect();
        self.client
            .mock_get_records(Ok(RecordBatch::new(
                records,
                next_iterator.map(String::from),
            )))
            .await;
    }

    /// Runs the processor to completion and returns the monitoring events
    pub async fn run(&self) -> Result<Vec<ProcessingEventType>> {
        let (processor, monitoring_rx) = ForwardingProcessor::new(
            self.config.clone(),
            self.rules.clone(),
            self.client.clone(),
            self.forwarder.clone(),
            self.store.clone(),
        );
        let mut monitoring_rx = monitoring_rx.expect("monitoring is enabled in tests");

        tokio::time::timeout(Duration::from_secs(5), processor.run(self.coordinator.signal()))
            .await??;

        Ok(TestUtils::drain_events(&mut monitoring_rx))
    }
}

pub fn count_fetch_retries(events: &[ProcessingEventType]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, ProcessingEventType::FetchRetry { .. }))
        .count()
}
