pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod evm;
pub mod logging;
pub mod simulation;
pub mod view;

// Main client exports
pub use client::RaffleClient;
#[cfg(feature = "evm")]
pub use client::RaffleClientBuilder;
pub use config::RaffleConfig;
pub use error::Error;

// Discovery exports
pub use discovery::{
    BlockPin, DiscoveryEvent, DiscoveryOptions, DiscoveryReport, FetchFailure, FetchStage,
    Generation, ListPhase, RaffleDiscovery, RaffleId, RaffleListController, RaffleListState,
    RaffleOutcome, RaffleRow, RaffleSummary,
};

// Contract exports
pub use evm::contracts::{Allowlister, IAllowlister, IAllowlisterFactory, RaffleFactory};
#[cfg(feature = "evm")]
pub use evm::EvmClient;
pub use evm::{ContractReader, ContractWriter};

pub use simulation::{AllowlisterParams, SimulatedChain};
pub use view::RaffleTable;

// Re-export common primitives
pub use alloy_primitives::{Address, U256};
