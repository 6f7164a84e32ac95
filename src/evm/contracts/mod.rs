/// Raffle contract interfaces and helpers
///
/// Type-safe bindings generated with the Alloy `sol!` macro.
///
/// # Available Contracts
///
/// - **AllowlisterFactory**: registry of raffle instances
/// - **Allowlister**: a single allowlist raffle
pub mod allowlister;
pub mod factory;

pub use allowlister::{Allowlister, IAllowlister};
pub use factory::{IAllowlisterFactory, RaffleFactory};
