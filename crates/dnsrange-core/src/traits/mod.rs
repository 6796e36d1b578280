//! Core traits for the DNS range cache
//!
//! - [`HostResolver`]: Resolve a host name to address strings

pub mod host_resolver;

pub use host_resolver::HostResolver;
