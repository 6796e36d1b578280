//! Error types for the DNS range cache
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for DNS range operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DNS range cache
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (empty host list, negative or malformed interval,
    /// unparseable JSON)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A configured host could not be resolved while provisioning
    #[error("error looking up DNS name {host:?}: {source}")]
    InitialResolution {
        /// Host name that failed
        host: String,
        /// Underlying resolution failure
        #[source]
        source: Box<Error>,
    },

    /// The resolver reported that the name does not exist
    #[error("host not found: {0}")]
    HostNotFound(String),

    /// Any other resolver failure (network unreachable, timeout, ...)
    #[error("DNS resolution of {host:?} failed: {message}")]
    Resolution {
        /// Host name being resolved
        host: String,
        /// Resolver error message
        message: String,
    },

    /// The resolver returned addresses but none of them parsed
    #[error("all {count} returned IP addresses for {host:?} were invalid")]
    AllAddressesInvalid {
        /// Host name being resolved
        host: String,
        /// Number of addresses the resolver returned
        count: usize,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a "host not found" error
    pub fn host_not_found(host: impl Into<String>) -> Self {
        Self::HostNotFound(host.into())
    }

    /// Create a resolution error
    pub fn resolution(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create an "all addresses invalid" error
    pub fn all_addresses_invalid(host: impl Into<String>, count: usize) -> Self {
        Self::AllAddressesInvalid {
            host: host.into(),
            count,
        }
    }

    /// Wrap a failure of a host's first lookup
    pub fn initial_resolution(host: impl Into<String>, source: Error) -> Self {
        Self::InitialResolution {
            host: host.into(),
            source: Box::new(source),
        }
    }

    /// Whether this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Whether the resolver said the name does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::HostNotFound(_))
    }
}
