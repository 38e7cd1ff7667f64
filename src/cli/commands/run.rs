//! `run` command: wire up the bridge and poll until shut down.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::bridge::{Bridge, BridgeSettings};
use crate::chunk::Chunker;
use crate::cli::args::RunArgs;
use crate::error::BridgeError;
use crate::fetch::HttpFetcher;
use crate::message::Timestamper;
use crate::observability::init_metrics;
use crate::transport::{ChannelTable, Dispatcher, StdoutSink};

/// Runs the bridge.
///
/// Setup failures (configuration, metrics listener, channel resolution)
/// are returned before any polling starts.
///
/// # Errors
///
/// Returns the first setup failure, or the transport error of a failed
/// manual test message.
pub async fn run(args: &RunArgs, cancel: CancellationToken) -> Result<(), BridgeError> {
    let mut config = super::load_config(args.config.as_deref(), &args.overrides)?;
    if args.no_news {
        config.polling.news_enabled = false;
    }
    super::validate_config(&config)?;

    init_metrics(args.metrics_port)?;
    if let Some(port) = args.metrics_port {
        tracing::info!(port, "metrics listener on 127.0.0.1");
    }

    let table = ChannelTable::new(config.transport.channels.clone());
    let settings = BridgeSettings::resolve(&config, &table)?;

    let fetcher = HttpFetcher::new(&config.feeds.user_agent, config.feeds.max_body_bytes)?;
    let dispatcher = Dispatcher::new(
        Arc::new(StdoutSink::new()),
        Chunker::new(config.transport.chunk_limit),
        config.transport.fragment_delay,
    );
    let bridge = Bridge::new(
        Arc::new(fetcher),
        Arc::new(dispatcher),
        Timestamper::new(config.time.offset()?),
        config.labels.clone(),
        settings,
    );

    if let Some(areas) = args.test_areas() {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            result = bridge.send_test(areas) => {
                let fragments = result?;
                tracing::info!(areas, fragments, "manual test notification sent");
            }
        }
        if args.test_only.is_some() {
            return Ok(());
        }
    }

    bridge.run(cancel).await;
    Ok(())
}
