//! # Herald
//!
//! Timestamped hello-world relay: one producer publishing on a topic,
//! one delivery bridge pulling the same topic into a bounded feed. Runs
//! over the native DDS middleware when it is reachable and over an
//! in-process mock when it is not.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! herald
//!
//! # Run with custom config
//! # (searched at herald.toml, /etc/herald/herald.toml,
//! #  ~/.config/herald/herald.toml)
//!
//! # Run with environment variables
//! HERALD_TOPIC=hello_topic HERALD_DOMAIN=0 herald
//! ```

mod config;
mod feed;
mod metrics;
mod pipeline;

use std::sync::Arc;

use anyhow::Result;
use herald_backend::select_backend;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::feed::Feed;
use crate::pipeline::{Pipeline, PipelineConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herald=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    tracing::info!(topic = %config.topic, domain = config.domain, "Starting Herald relay");

    // Initialize metrics
    metrics::init_metrics();
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            tracing::error!("Failed to start metrics server: {}", e);
        }
    }

    // Select the backend exactly once, before any task starts.
    let selection = select_backend(&config.backend_config());
    match &selection.fallback_reason {
        Some(reason) => {
            tracing::info!(backend = %selection.kind, %reason, "Backend selected after fallback");
        }
        None => tracing::info!(backend = %selection.kind, "Backend selected"),
    }

    let feed = Arc::new(Feed::new(config.feed.retain));
    let pipeline = Pipeline::start(
        selection.publisher,
        selection.subscriber,
        Arc::clone(&feed),
        PipelineConfig {
            prefix: config.producer.prefix.clone(),
            interval: config.producer.interval(),
            poll: config.receive.poll(),
            grace: config.shutdown.grace(),
        },
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    pipeline.shutdown().await?;

    if !feed.is_empty() {
        for message in feed.snapshot() {
            tracing::debug!(
                content = %message.content,
                created_at = message.created_at,
                "Retained at shutdown"
            );
        }
    }

    tracing::info!(
        delivered = feed.total_delivered(),
        retained = feed.len(),
        "Herald relay stopped"
    );

    Ok(())
}
