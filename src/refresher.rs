// =============================================================================
// refresher.rs — THE FETCH LOOP
// =============================================================================
//
// Runs a fetch cycle immediately on startup, then every `refetch_interval`.
// Each cycle fetches every source, builds a catalog with the next generation
// number, and publishes it to the shared state. Readers never see a
// half-built catalog; they keep the previous one until the swap.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::metrics::ServiceState;
use crate::sources::fetch_all;

/// One fetch cycle. Returns the catalog it published.
pub async fn refresh(state: &ServiceState) -> Arc<Catalog> {
    let generation = state.catalog().generation() + 1;
    let outcome = fetch_all(state.sources()).await;
    let received = outcome.records.len();
    let errors = outcome.errors.len();

    let catalog = Catalog::ingest(outcome, generation);
    state
        .metrics
        .record_cycle(received, catalog.listings().len(), errors);
    state.publish(catalog);
    state.catalog()
}

/// Shortest period the loop accepts. `tokio::time::interval` panics on zero.
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(1);

/// Fetch now, then every `refetch_interval` until `shutdown` flips.
/// Intervals under one second are raised to one second.
pub async fn run_fetch_loop(
    state: Arc<ServiceState>,
    refetch_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let refetch_interval = if refetch_interval < MIN_REFETCH_INTERVAL {
        warn!(
            requested_ms = refetch_interval.as_millis() as u64,
            "Refetch interval too short; using 1s"
        );
        MIN_REFETCH_INTERVAL
    } else {
        refetch_interval
    };

    info!(
        refetch_secs = refetch_interval.as_secs(),
        sources = state.sources().len(),
        "Fetch loop online"
    );

    let mut ticker = tokio::time::interval(refetch_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // The first tick completes immediately.
            _ = ticker.tick() => {
                let catalog = refresh(&state).await;
                info!(
                    generation = catalog.generation(),
                    listings = catalog.listings().len(),
                    errors = catalog.errors().len(),
                    "Catalog published"
                );
            }
            _ = shutdown.changed() => {
                info!("Fetch loop shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawListing;
    use crate::sources::testing::StaticSource;
    use crate::sources::ListingSource;

    fn state() -> ServiceState {
        let mut dup_a = RawListing::new("a", "Sedan", "US");
        dup_a.is_active = true;
        let dup_b = dup_a.clone();
        let sources: Vec<Arc<dyn ListingSource>> = vec![
            Arc::new(StaticSource::ok("one", vec![dup_a, dup_b])),
            Arc::new(StaticSource::failing("two", "timed out")),
        ];
        ServiceState::new(sources, 8, "http://localhost/")
    }

    #[tokio::test]
    async fn test_refresh_bumps_generation_and_counts() {
        let state = state();
        assert_eq!(state.catalog().generation(), 0);

        let first = refresh(&state).await;
        assert_eq!(first.generation(), 1);
        assert_eq!(first.listings().len(), 1);
        assert_eq!(first.errors().len(), 1);

        let second = refresh(&state).await;
        assert_eq!(second.generation(), 2);

        let snap = state.metrics.snapshot();
        assert_eq!(snap.fetch_cycles, 2);
        assert_eq!(snap.duplicates_dropped, 2);
        assert_eq!(snap.source_errors, 2);
    }

    #[tokio::test]
    async fn test_loop_fetches_immediately_and_stops_on_shutdown() {
        let state = Arc::new(state());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_fetch_loop(
            Arc::clone(&state),
            Duration::from_secs(3600),
            rx,
        ));

        for _ in 0..100 {
            if state.catalog().generation() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(state.catalog().generation(), 1);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_interval_does_not_kill_the_loop() {
        let state = Arc::new(state());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_fetch_loop(Arc::clone(&state), Duration::ZERO, rx));

        for _ in 0..100 {
            if state.catalog().generation() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(state.catalog().generation() >= 1);

        tx.send(true).unwrap();
        let joined = handle.await;
        assert!(joined.is_ok(), "fetch loop panicked: {joined:?}");
    }
}
