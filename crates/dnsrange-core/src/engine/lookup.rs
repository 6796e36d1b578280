//! Resolve a host and normalize the answer into single-address prefixes

use ipnet::IpNet;
use std::net::IpAddr;
use tracing::{debug, warn};

use crate::config::NotFoundPolicy;
use crate::error::{Error, Result};
use crate::traits::HostResolver;

/// Look up `host` and turn each returned address into a single-address prefix
///
/// - Addresses that fail to parse (scoped or malformed resolver output) are
///   dropped with a warning; the lookup still succeeds.
/// - If the resolver returned addresses but none parsed, the lookup fails
///   with [`Error::AllAddressesInvalid`].
/// - An empty answer is a successful, empty entry.
/// - A [`Error::HostNotFound`] answer is an empty entry under
///   [`NotFoundPolicy::Empty`] and an error otherwise.
pub async fn lookup_host_prefixes(
    resolver: &dyn HostResolver,
    host: &str,
    not_found: NotFoundPolicy,
) -> Result<Vec<IpNet>> {
    let addresses = match resolver.lookup_host(host).await {
        Ok(addresses) => addresses,
        Err(e) if e.is_not_found() && not_found == NotFoundPolicy::Empty => {
            debug!(host, "DNS name not found, treating as no addresses");
            return Ok(Vec::new());
        }
        Err(e) => {
            warn!(host, resolver = resolver.resolver_name(), error = %e, "DNS error");
            return Err(e);
        }
    };

    let mut prefixes = Vec::with_capacity(addresses.len());
    for address in &addresses {
        match address.parse::<IpAddr>() {
            Ok(ip) => prefixes.push(IpNet::from(ip)),
            Err(e) => warn!(host, ip = %address, error = %e, "ignoring invalid IP address"),
        }
    }

    if prefixes.is_empty() && !addresses.is_empty() {
        return Err(Error::all_addresses_invalid(host, addresses.len()));
    }

    debug!(host, addresses = ?addresses, "DNS results");

    Ok(prefixes)
}
