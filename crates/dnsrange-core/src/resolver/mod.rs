// # Host Resolver Implementations
//
// This module provides implementations of the HostResolver trait.

pub mod system;

pub use system::SystemResolver;
