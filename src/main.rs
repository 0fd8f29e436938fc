// Surplus listing engine.
//
// Pulls listings from every configured source on a fixed interval, classifies
// them, and serves grouped, filterable views plus source status as JSON.
// Ctrl+C stops the fetch loop and the endpoint, then exits.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use surplus_listing_engine::config::{self, Config};
use surplus_listing_engine::metrics::{self, ServiceState};
use surplus_listing_engine::models::DataSourceDescriptor;
use surplus_listing_engine::refresher;
use surplus_listing_engine::sources::http_source::HttpJsonSource;
use surplus_listing_engine::sources::mock_source::MockSource;
use surplus_listing_engine::sources::{registry, ListingSource};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_names(true)
            .with_line_number(true)
            .init();
    }
}

/// Mock sources first (registry order), then HTTP sources in config order.
fn build_sources(config: &Config) -> anyhow::Result<Vec<Arc<dyn ListingSource>>> {
    let mut sources: Vec<Arc<dyn ListingSource>> = Vec::new();

    if config.use_mock_sources {
        for descriptor in registry::all() {
            sources.push(Arc::new(MockSource::new(descriptor.clone())));
        }
    }

    for feed in &config.http_sources {
        let descriptor = registry::find(&feed.id).cloned().unwrap_or_else(|| {
            warn!(source = feed.id.as_str(), "HTTP source is not in the registry; no attribution");
            DataSourceDescriptor {
                id: feed.id.clone(),
                name: feed.id.clone(),
                country: "Unknown".to_string(),
                attribution: None,
            }
        });
        let source = HttpJsonSource::new(
            descriptor,
            feed.url.clone(),
            config.http_timeout,
            config.breaker_settings(),
        )
        .with_context(|| format!("building HTTP source {}", feed.id))?;
        sources.push(Arc::new(source));
    }

    Ok(sources)
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing(config::log_json_from_env());

    let config = Config::from_env();
    info!(
        refetch_secs = config.refetch_interval.as_secs(),
        status_addr = config.status_addr.as_str(),
        mock_sources = config.use_mock_sources,
        http_sources = config.http_sources.len(),
        "Configuration loaded"
    );

    let sources = build_sources(&config)?;
    if sources.is_empty() {
        warn!("No listing sources configured; every view will be empty");
    }

    let state = Arc::new(ServiceState::new(
        sources,
        config.view_cache_size,
        config.public_base_url.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let fetch_handle = tokio::spawn(refresher::run_fetch_loop(
        Arc::clone(&state),
        config.refetch_interval,
        shutdown_rx.clone(),
    ));

    let server_state = Arc::clone(&state);
    let status_addr = config.status_addr.clone();
    let server_shutdown = shutdown_rx.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = metrics::run_status_server(&status_addr, server_state, server_shutdown).await {
            error!(error = %e, "Status endpoint failed");
        }
    });

    info!("Surplus listing engine running; Ctrl+C to stop");

    match signal::ctrl_c().await {
        Ok(()) => warn!("Shutdown signal received"),
        Err(e) => error!(error = %e, "Signal listener error; shutting down"),
    }
    let _ = shutdown_tx.send(true);

    let drained = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(fetch_handle, server_handle)
    })
    .await;
    match drained {
        Ok((fetch_result, server_result)) => {
            if let Err(e) = fetch_result {
                error!(error = %e, "Fetch loop task ended abnormally");
            }
            if let Err(e) = server_result {
                error!(error = %e, "Status endpoint task ended abnormally");
            }
        }
        Err(_) => warn!("Tasks did not stop within 10s"),
    }

    info!("Surplus listing engine stopped");
    Ok(())
}
