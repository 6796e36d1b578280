//! DNS range engine
//!
//! The [`DnsRange`] is responsible for:
//! - Validating the configuration
//! - Resolving every configured host once, before anything runs in the background
//! - Spawning one refresh loop per host
//! - Answering address range queries from the cache
//! - Stopping every loop on shutdown
//!
//! ## Architecture
//!
//! ```text
//!                      ┌──────────────┐
//!                      │ HostResolver │
//!                      └──────────────┘
//!                             ▲
//!          ┌──────────────────┼──────────────────┐
//!          │                  │                  │
//!  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!  │ RefreshLoop  │   │ RefreshLoop  │   │ RefreshLoop  │   one per host
//!  │   (host a)   │   │   (host b)   │   │   (host c)   │
//!  └──────────────┘   └──────────────┘   └──────────────┘
//!          │ set(a)           │ set(b)           │ set(c)
//!          ▼                  ▼                  ▼
//!  ┌─────────────────────────────────────────────────────┐
//!  │                    AddressCache                     │
//!  └─────────────────────────────────────────────────────┘
//!                             │ snapshot()
//!                             ▼
//!                 DnsRange::get_address_ranges()
//! ```
//!
//! ## Provisioning
//!
//! 1. Validate the configuration (empty host list, negative interval, ...)
//! 2. Look up each host; any failure aborts provisioning before a single
//!    loop is spawned
//! 3. Spawn the refresh loops
//!
//! ## Shutdown
//!
//! [`DnsRange::shutdown()`] cancels a token shared by all loops and returns
//! immediately. [`DnsRange::wait_stopped()`] waits for the loops to exit.

mod lookup;
mod refresh;

pub use lookup::lookup_host_prefixes;
pub use refresh::ERROR_RETRY_INTERVAL;

use ipnet::IpNet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use crate::cache::AddressCache;
use crate::config::DnsRangeConfig;
use crate::error::{Error, Result};
use crate::resolver::SystemResolver;
use crate::traits::HostResolver;
use refresh::RefreshLoop;

/// Events emitted by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeEvent {
    /// Every host resolved and the refresh loops are being started
    Provisioned {
        hosts: usize,
    },

    /// A host's refresh loop started
    WatcherStarted {
        host: String,
    },

    /// A refresh replaced the host's entry
    Refreshed {
        host: String,
        addresses: usize,
    },

    /// A refresh failed; the host's entry was left untouched
    RefreshFailed {
        host: String,
        error: String,
        retry_in: Duration,
    },

    /// A host's refresh loop exited
    WatcherStopped {
        host: String,
    },
}

/// Non-blocking event emitter shared by the loops
///
/// A full channel is reported at warn level once; further drops are logged
/// at debug level until an event gets through again.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: mpsc::Sender<RangeEvent>,
    overflowing: Arc<AtomicBool>,
}

impl EventSink {
    fn new(tx: mpsc::Sender<RangeEvent>) -> Self {
        Self {
            tx,
            overflowing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Emit an event without waiting for the consumer
    pub(crate) fn emit(&self, event: RangeEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {
                if self.overflowing.load(Ordering::Relaxed) {
                    self.overflowing.store(false, Ordering::Relaxed);
                }
            }
            Err(TrySendError::Full(event)) => {
                if self.overflowing.swap(true, Ordering::Relaxed) {
                    debug!(?event, "event channel still full, dropping event");
                } else {
                    warn!(?event, "Event channel full, dropping event. Consider increasing event_channel_capacity.");
                }
            }
            Err(TrySendError::Closed(_)) => {
                trace!("no event consumer, dropping event");
            }
        }
    }
}

/// Self-refreshing DNS address range source
///
/// Holds the latest resolved addresses of each configured host as
/// single-address prefixes and keeps them current in the background.
///
/// ## Lifecycle
///
/// 1. Create with [`DnsRange::provision()`] (inside a tokio runtime)
/// 2. Query with [`DnsRange::get_address_ranges()`] from anywhere, any time
/// 3. Stop with [`DnsRange::shutdown()`], or by dropping the value
///
/// ## Threading
///
/// `get_address_ranges()` is synchronous and never waits on the network;
/// it only takes the cache's read lock. All resolution happens on the
/// background tasks.
#[derive(Debug)]
pub struct DnsRange {
    /// Latest addresses per host
    cache: AddressCache,

    /// Effective refresh interval
    interval: Duration,

    /// Cancelled once, on shutdown
    shutdown: CancellationToken,

    /// Tracks the refresh loops
    watchers: TaskTracker,
}

impl DnsRange {
    /// Validate `config`, resolve every host, then start the refresh loops
    ///
    /// # Parameters
    ///
    /// - `config`: Hosts, interval and policies
    /// - `resolver`: Resolver shared by the initial lookups and every loop
    ///
    /// # Returns
    ///
    /// A tuple of (range, event_receiver) where event_receiver yields engine
    /// events. The receiver may be dropped if events are not needed.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`]: invalid configuration
    /// - [`Error::InitialResolution`]: a host's first lookup failed; no
    ///   loop has been started
    pub async fn provision(
        config: DnsRangeConfig,
        resolver: Arc<dyn HostResolver>,
    ) -> Result<(Self, mpsc::Receiver<RangeEvent>)> {
        config.validate()?;
        let interval = config.refresh_interval()?;
        let hosts = config.unique_hosts();

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);
        let events = EventSink::new(tx);

        let cache = AddressCache::new(hosts.iter().cloned());
        for host in &hosts {
            let prefixes = lookup_host_prefixes(resolver.as_ref(), host, config.not_found)
                .await
                .map_err(|e| Error::initial_resolution(host.clone(), e))?;
            cache.set(host, prefixes);
        }

        info!(
            hosts = hosts.len(),
            interval = ?interval,
            resolver = resolver.resolver_name(),
            "DNS range provisioned"
        );
        events.emit(RangeEvent::Provisioned { hosts: hosts.len() });

        let shutdown = CancellationToken::new();
        let watchers = TaskTracker::new();
        for host in hosts {
            let refresh = RefreshLoop {
                host,
                cache: cache.clone(),
                resolver: Arc::clone(&resolver),
                not_found: config.not_found,
                interval,
                shutdown: shutdown.clone(),
                events: events.clone(),
            };
            watchers.spawn(refresh.run());
        }
        watchers.close();

        let range = Self {
            cache,
            interval,
            shutdown,
            watchers,
        };

        Ok((range, rx))
    }

    /// [`provision()`](Self::provision) with the platform resolver
    pub async fn provision_with_system_resolver(
        config: DnsRangeConfig,
    ) -> Result<(Self, mpsc::Receiver<RangeEvent>)> {
        Self::provision(config, Arc::new(SystemResolver::new())).await
    }

    /// Most recently resolved addresses of all hosts
    ///
    /// Never fails and never blocks on I/O. Each host contributes its latest
    /// successful answer; hosts are not read at a single common instant.
    pub fn get_address_ranges(&self) -> Vec<IpNet> {
        self.cache.snapshot()
    }

    /// Signal every refresh loop to stop
    ///
    /// Returns immediately. Calling it more than once is harmless.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("stopping DNS watchers");
        }
        self.shutdown.cancel();
    }

    /// Whether [`shutdown()`](Self::shutdown) has been called
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Wait until every refresh loop has exited
    ///
    /// Only returns after [`shutdown()`](Self::shutdown) has been called.
    pub async fn wait_stopped(&self) {
        self.watchers.wait().await;
    }

    /// Number of refresh loops still running
    pub fn active_watchers(&self) -> usize {
        self.watchers.len()
    }

    /// Effective refresh interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The underlying cache
    pub fn cache(&self) -> &AddressCache {
        &self.cache
    }
}

impl Drop for DnsRange {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
