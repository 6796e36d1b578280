// # System Resolver
//
// HostResolver backed by the platform's name resolution (getaddrinfo on
// Unix), reached through `tokio::net::lookup_host`.
//
// ## Behavior
//
// - Honors /etc/hosts, nsswitch and the system resolver configuration
// - Timeouts are whatever the platform resolver applies
// - "Name not found" answers are reported as `Error::HostNotFound`
//
// ## Limitations
//
// getaddrinfo does not expose a structured NXDOMAIN signal through std, so
// not-found detection relies on the platform's error text. Unrecognized
// failures are reported as `Error::Resolution`.

use async_trait::async_trait;
use std::io;
use tracing::trace;

use crate::traits::HostResolver;
use crate::Error;

/// Error text fragments the platform resolver uses for a non-existent name
const NOT_FOUND_MARKERS: &[&str] = &[
    "name or service not known",
    "no address associated with hostname",
    "nodename nor servname provided",
    "no such host is known",
];

/// Platform resolver
///
/// # Example
///
/// ```rust,no_run
/// use dnsrange_core::resolver::SystemResolver;
/// use dnsrange_core::traits::HostResolver;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let addresses = SystemResolver::new().lookup_host("localhost").await?;
///     println!("{addresses:?}");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    /// Create a new system resolver
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HostResolver for SystemResolver {
    async fn lookup_host(&self, host: &str) -> Result<Vec<String>, Error> {
        let resolved = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| classify(host, &e))?;

        let mut addresses: Vec<String> = Vec::new();
        for socket_addr in resolved {
            let address = socket_addr.ip().to_string();
            if !addresses.contains(&address) {
                addresses.push(address);
            }
        }

        trace!(host, count = addresses.len(), "system resolver answered");
        Ok(addresses)
    }

    fn resolver_name(&self) -> &'static str {
        "system"
    }
}

fn classify(host: &str, err: &io::Error) -> Error {
    if is_not_found(err) {
        Error::host_not_found(host)
    } else {
        Error::resolution(host, err.to_string())
    }
}

fn is_not_found(err: &io::Error) -> bool {
    let message = err.to_string().to_lowercase();
    NOT_FOUND_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}
