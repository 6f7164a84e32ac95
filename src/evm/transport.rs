/// Chain client seam
///
/// Everything above this module talks to a chain through these two traits, so the
/// same contract bindings run against a live RPC endpoint or the simulated chain.
use crate::error::Error;
use crate::evm::types::{EvmCallRequest, EvmError, EvmTransactionRequest, TransactionOutcome};
use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use async_trait::async_trait;

/// Read-only access to contract state
#[async_trait]
pub trait ContractReader: Send + Sync {
    /// Execute an `eth_call` and return the raw return data
    async fn call(&self, request: EvmCallRequest) -> Result<Vec<u8>, Error>;

    /// Current head block number
    async fn block_number(&self) -> Result<u64, Error>;

    /// Chain ID reported by the node
    async fn remote_chain_id(&self) -> Result<u64, Error>;
}

/// State-changing access to contracts
#[async_trait]
pub trait ContractWriter: ContractReader {
    /// Execute a transaction and wait for its outcome
    async fn send(&self, request: EvmTransactionRequest) -> Result<TransactionOutcome, Error>;
}

/// Encode `call`, run it against `address` and decode the typed return value
pub async fn call_contract<R, T>(
    reader: &R,
    address: Address,
    call: T,
    block: Option<u64>,
) -> Result<T::Return, Error>
where
    R: ContractReader + ?Sized,
    T: SolCall,
{
    let request = EvmCallRequest::new(address, call.abi_encode()).at_optional_block(block);
    let result = reader.call(request).await?;
    T::abi_decode_returns(&result, true).map_err(|e| {
        EvmError::AbiError(format!(
            "Failed to decode {} result from {}: {}",
            T::SIGNATURE,
            address,
            e
        ))
        .into()
    })
}

/// Fail with a configuration error unless the node serves chain `expected`
pub async fn verify_chain_id<R>(reader: &R, expected: u64) -> Result<(), Error>
where
    R: ContractReader + ?Sized,
{
    let remote = reader.remote_chain_id().await?;
    if remote != expected {
        return Err(Error::Config(format!(
            "RPC endpoint serves chain {} but chain {} is configured",
            remote, expected
        )));
    }
    Ok(())
}

/// Encode `call` and send it as a transaction from `from` to `address`
pub async fn send_contract_call<W, T>(
    writer: &W,
    from: Address,
    address: Address,
    call: T,
) -> Result<TransactionOutcome, Error>
where
    W: ContractWriter + ?Sized,
    T: SolCall,
{
    let request = EvmTransactionRequest::new(from, address).data(call.abi_encode());
    writer.send(request).await
}
