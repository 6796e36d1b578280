// # dnsrange-core
//
// Core library for the self-refreshing DNS address range cache.
//
// ## Architecture Overview
//
// This library resolves a fixed set of host names to IP addresses and keeps
// the answers current in the background:
// - **HostResolver**: Trait for turning a host name into address strings
// - **AddressCache**: Latest single-address prefixes per host, behind one RwLock
// - **DnsRange**: Provisions the cache, runs one refresh loop per host, answers queries
// - **DnsRangeConfig**: Hosts, refresh interval and not-found policy
//
// ## Design Principles
//
// 1. **Reads never wait on the network**: queries only take the cache's read lock
// 2. **Fail fast at startup, never at runtime**: a host that cannot be resolved
//    while provisioning is fatal; later failures keep the last good answer
// 3. **Independent hosts**: each host has its own loop and cadence
// 4. **Library-First**: the daemon is a thin wrapper over this crate

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod resolver;
pub mod traits;

// Re-export core types for convenience
pub use cache::{AddressCache, AddressEntry};
pub use config::{DnsRangeConfig, Interval, NotFoundPolicy, DEFAULT_INTERVAL};
pub use engine::{lookup_host_prefixes, DnsRange, RangeEvent, ERROR_RETRY_INTERVAL};
pub use error::{Error, Result};
pub use resolver::SystemResolver;
pub use traits::HostResolver;
