//! Per-host refresh loop
//!
//! One loop runs per configured host. It waits for its ticker, resolves the
//! host, and either replaces the host's cache entry (success) or leaves it
//! alone and switches to the error-retry cadence (failure).
//!
//! ```text
//!  initializing ──► waiting ──tick──► refreshing ──► waiting ...
//!                      │                   │
//!                      └──── shutdown ─────┴──► stopped
//! ```
//!
//! Shutdown is observed between ticks. An in-flight resolve is allowed to
//! finish; it is bounded by the resolver's own timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::lookup::lookup_host_prefixes;
use super::{EventSink, RangeEvent};
use crate::cache::AddressCache;
use crate::config::NotFoundPolicy;
use crate::traits::HostResolver;

/// Cadence used after a failed refresh, regardless of the configured interval
pub const ERROR_RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Background refresh loop for a single host
pub(crate) struct RefreshLoop {
    pub(crate) host: String,
    pub(crate) cache: AddressCache,
    pub(crate) resolver: Arc<dyn HostResolver>,
    pub(crate) not_found: NotFoundPolicy,
    pub(crate) interval: Duration,
    pub(crate) shutdown: CancellationToken,
    pub(crate) events: EventSink,
}

/// State private to one running loop
struct RefreshState {
    /// Period the ticker is currently armed with
    cadence: Duration,
    consecutive_failures: u32,
}

impl RefreshLoop {
    /// Run until the shutdown token is cancelled
    pub(crate) async fn run(self) {
        info!(host = %self.host, "starting DNS watcher");
        self.events.emit(RangeEvent::WatcherStarted {
            host: self.host.clone(),
        });

        let mut state = RefreshState {
            cadence: self.interval,
            consecutive_failures: 0,
        };
        let mut ticker = arm(state.cadence);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                _ = ticker.tick() => {}
            }

            let next = self.refresh(&mut state).await;

            // Rearm immediately instead of waiting out the old period
            if next != state.cadence {
                debug!(host = %self.host, from = ?state.cadence, to = ?next, "refresh cadence changed");
                ticker = arm(next);
                state.cadence = next;
            }
        }

        info!(host = %self.host, "stopping DNS watcher");
        self.events.emit(RangeEvent::WatcherStopped {
            host: self.host.clone(),
        });
    }

    /// One refresh attempt; returns the cadence to use next
    async fn refresh(&self, state: &mut RefreshState) -> Duration {
        match lookup_host_prefixes(self.resolver.as_ref(), &self.host, self.not_found).await {
            Ok(prefixes) => {
                let addresses = prefixes.len();
                self.cache.set(&self.host, prefixes);

                if state.consecutive_failures > 0 {
                    info!(
                        host = %self.host,
                        failures = state.consecutive_failures,
                        "DNS lookup recovered"
                    );
                }
                state.consecutive_failures = 0;

                self.events.emit(RangeEvent::Refreshed {
                    host: self.host.clone(),
                    addresses,
                });
                self.interval
            }
            Err(e) => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                warn!(
                    host = %self.host,
                    error = %e,
                    failures = state.consecutive_failures,
                    retry_in = ?ERROR_RETRY_INTERVAL,
                    "DNS lookup error"
                );

                self.events.emit(RangeEvent::RefreshFailed {
                    host: self.host.clone(),
                    error: e.to_string(),
                    retry_in: ERROR_RETRY_INTERVAL,
                });
                ERROR_RETRY_INTERVAL
            }
        }
    }
}

/// A ticker whose first tick is one full period from now
fn arm(period: Duration) -> Interval {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
