//! Monitoring for the consumption loop
//!
//! The processor publishes [`ProcessingEvent`]s on a bounded channel when
//! monitoring is enabled; [`MetricsAggregator`] turns them into counters that
//! are logged periodically.

mod metrics;
mod types;

pub use metrics::{ForwarderMetrics, MetricsAggregator};
pub use types::{IteratorEventType, MonitoringConfig, ProcessingEvent, ProcessingEventType};
