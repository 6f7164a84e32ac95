/// EVM support for the raffle SDK
///
/// Contract bindings, the chain client seam and, with the `evm` feature, a live
/// JSON-RPC client.
///
/// # Example
///
/// ```rust,no_run
/// use allowlist_raffle::evm::client::EvmClient;
/// use allowlist_raffle::evm::contracts::RaffleFactory;
/// use alloy_primitives::address;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = EvmClient::new("http://127.0.0.1:8545", 1)?;
/// let factory = RaffleFactory::new(client, address!("0x5FbDB2315678afecb367f032d93F642f64180aa3"));
/// let count = factory.raffle_count(None).await?;
/// println!("{} raffles registered", count);
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "evm")]
pub mod client;
pub mod contracts;
pub mod transport;
pub mod types;

#[cfg(feature = "evm")]
pub use client::EvmClient;
pub use transport::{verify_chain_id, ContractReader, ContractWriter};
pub use types::{EvmCallRequest, EvmError, EvmTransactionRequest, TransactionOutcome};
