// # Host Resolver Trait
//
// Defines the interface for turning a DNS name into address strings.
//
// ## Implementations
//
// - Platform resolver: `SystemResolver` (`crate::resolver::system`)
// - Test doubles: scripted resolvers in the contract tests
//
// ## Usage
//
// ```rust,ignore
// use dnsrange_core::HostResolver;
//
// #[tokio::main]
// async fn main() -> dnsrange_core::Result<()> {
//     let resolver = /* HostResolver implementation */;
//
//     for address in resolver.lookup_host("cloudflared").await? {
//         println!("{address}");
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for host name resolvers
///
/// A resolver answers one question: which addresses does this name have
/// right now? It returns them as strings, exactly as the underlying
/// facility reported them. Parsing, normalization and the decision of
/// what to do with a failure belong to the caller.
///
/// Implementations must be thread-safe: one resolver instance is shared
/// by every refresh loop.
///
/// ## Errors
///
/// - [`Error::HostNotFound`](crate::Error::HostNotFound) when the name
///   definitively does not exist. Callers may be configured to treat this
///   as an empty answer.
/// - [`Error::Resolution`](crate::Error::Resolution) (or any other
///   variant) for everything else: timeouts, unreachable servers, etc.
///
/// Implementations must not retry or cache; the refresh loop owns the
/// cadence.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Look up the addresses of `host`
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<String>)`: Zero or more address strings
    /// - `Err(Error)`: If the lookup failed
    async fn lookup_host(&self, host: &str) -> Result<Vec<String>, crate::Error>;

    /// Short name used in logs
    fn resolver_name(&self) -> &'static str {
        "custom"
    }
}
