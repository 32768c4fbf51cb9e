use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kinesis_forwarder::config::Config;
use kinesis_forwarder::monitoring::MetricsAggregator;
use kinesis_forwarder::{
    FileCheckpointStore, ForwardingProcessor, HttpForwarder, RuleSet, ShutdownCoordinator,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(config.log_level().into())
                .from_env_lossy(),
        )
        .init();

    let rules = RuleSet::load(&config.filters)
        .with_context(|| format!("failed to load filters from {}", config.filters.display()))?;
    info!(path = %config.filters.display(), rules = rules.len(), "Loaded routing rules");

    let mut aws_config_builder = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));
    if let Some(endpoint) = &config.endpoint_url {
        aws_config_builder = aws_config_builder.endpoint_url(endpoint);
    }
    let aws_config = aws_config_builder.load().await;
    let client = aws_sdk_kinesis::Client::new(&aws_config);

    let forwarder = HttpForwarder::new(config.request_timeout())?;
    let store = FileCheckpointStore::new(config.checkpoint_path.clone());

    let coordinator = ShutdownCoordinator::new();
    let signal_listener = coordinator.listen_for_signals();

    let (processor, monitoring_rx) =
        ForwardingProcessor::new(config.processor_config(), rules, client, forwarder, store);

    let metrics_handle = match (monitoring_rx, config.metrics_interval()) {
        (Some(rx), Some(interval)) => Some(tokio::spawn(MetricsAggregator::new(interval, rx).run())),
        _ => None,
    };

    let signal = coordinator.signal();
    let processor_handle = tokio::spawn(async move { processor.run(signal).await });

    processor_handle
        .await
        .context("forwarder task panicked")?
        .context("forwarder failed to start")?;

    signal_listener.abort();

    if let Some(handle) = metrics_handle {
        match handle.await {
            Ok(metrics) => info!(?metrics, "Final forwarder metrics"),
            Err(e) => warn!(error = %e, "Metrics task failed"),
        }
    }

    Ok(())
}
