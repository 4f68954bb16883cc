//! Market-data aggregation engine.
//!
//! Three independent cadences drive the system: the snapshot fetch timer
//! (coarse), the trade feed dispatch (feed-paced), and the render tick
//! (fine). The fetch loop and the feed task are the only writers; the
//! renderer reads cloned snapshots and never waits on the network.

pub mod calc;
pub mod config;
pub mod feed;
pub mod fetch;
pub mod limiter;
pub mod state;
pub mod types;
pub mod widget;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use self::config::SymbolConfig;
use self::fetch::SnapshotFetcher;
use self::limiter::RateLimiter;
use self::state::SharedAggregator;

/// Spawn the snapshot fetch loop: on every tick (the first fires
/// immediately) one fetch cycle is started per tracked product. Cycles run
/// concurrently but serialize their outbound requests through the shared
/// rate limiter.
pub fn spawn_fetch_loop(
    aggregator: SharedAggregator,
    fetcher: Arc<SnapshotFetcher>,
    limiter: Arc<RateLimiter>,
    configs: Vec<SymbolConfig>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for cfg in &configs {
                        let aggregator = Arc::clone(&aggregator);
                        let fetcher = Arc::clone(&fetcher);
                        let limiter = Arc::clone(&limiter);
                        let cfg = cfg.clone();
                        tokio::spawn(async move {
                            run_fetch_cycle(&aggregator, &fetcher, &limiter, &cfg).await;
                        });
                    }
                }
                _ = shutdown.changed() => {
                    debug!("fetch loop stopping");
                    break;
                }
            }
        }
    })
}

/// One rate-limited fetch cycle for one product. A failure skips the cycle:
/// stale-but-valid state beats partial state, so nothing is touched and the
/// next tick retries.
async fn run_fetch_cycle(
    aggregator: &SharedAggregator,
    fetcher: &SnapshotFetcher,
    limiter: &RateLimiter,
    cfg: &SymbolConfig,
) {
    limiter.acquire().await;

    match fetcher.fetch(cfg).await {
        Ok(series) => {
            // The network call is done; only the merge runs under the lock.
            let mut guard = aggregator.write().await;
            guard.merge_snapshot(&cfg.product, series);
        }
        Err(error) => {
            warn!(product = %cfg.product, %error, "snapshot fetch failed, skipping cycle");
        }
    }
}
