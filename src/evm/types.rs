use crate::error::Error;
/// EVM-specific request, receipt and error types
///
/// These are the values exchanged across the `ContractReader` / `ContractWriter`
/// seam, shared by the live RPC client and the simulated chain.
use alloy_primitives::{Address, Log, B256, U256};
use alloy_sol_types::SolEvent;
use std::str::FromStr;

/// Parse a hex Ethereum address (`0x` prefix required)
pub fn parse_address(s: &str) -> Result<Address, Error> {
    let s = s.trim();
    if !s.starts_with("0x") || s.len() != 42 {
        return Err(EvmError::InvalidAddress(s.to_string()).into());
    }
    Address::from_str(s).map_err(|e| EvmError::InvalidAddress(format!("{}: {}", s, e)).into())
}

/// Read-only contract call request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmCallRequest {
    /// Target contract address
    pub to: Address,
    /// Call data (encoded function call)
    pub data: Vec<u8>,
    /// Block number to execute against, `None` for latest
    pub block: Option<u64>,
}

impl EvmCallRequest {
    /// Create a new call request against the latest block
    pub fn new(to: Address, data: Vec<u8>) -> Self {
        Self {
            to,
            data,
            block: None,
        }
    }

    /// Pin the call to a block number
    pub fn at_block(mut self, block: u64) -> Self {
        self.block = Some(block);
        self
    }

    /// Pin the call to a block number if one is given
    pub fn at_optional_block(mut self, block: Option<u64>) -> Self {
        self.block = block;
        self
    }

    /// The 4-byte function selector, if the calldata carries one
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).and_then(|s| s.try_into().ok())
    }
}

/// State-changing contract call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmTransactionRequest {
    /// Sender address
    pub from: Address,
    /// Target contract address
    pub to: Address,
    /// Transaction value in wei
    pub value: U256,
    /// Transaction data
    pub data: Vec<u8>,
}

impl EvmTransactionRequest {
    /// Create a new transaction request with zero value
    pub fn new(from: Address, to: Address) -> Self {
        Self {
            from,
            to,
            value: U256::ZERO,
            data: Vec::new(),
        }
    }

    /// Set the transaction value
    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Set transaction data
    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }
}

/// Result of a mined transaction
#[derive(Debug, Clone)]
pub struct TransactionOutcome {
    /// Transaction hash
    pub tx_hash: B256,
    /// Block the transaction was included in
    pub block_number: u64,
    /// Logs emitted during execution
    pub logs: Vec<Log>,
}

impl TransactionOutcome {
    /// Decode every log matching event `E`
    pub fn events<E: SolEvent>(&self) -> Vec<E> {
        self.logs
            .iter()
            .filter(|log| log.data.topics().first() == Some(&E::SIGNATURE_HASH))
            .filter_map(|log| E::decode_log_data(&log.data, true).ok())
            .collect()
    }

    /// Whether any log matches event `E`
    pub fn emits<E: SolEvent>(&self) -> bool {
        !self.events::<E>().is_empty()
    }
}

/// EVM-specific errors
#[derive(Debug, thiserror::Error)]
pub enum EvmError {
    #[error("Invalid Ethereum address: {0}")]
    InvalidAddress(String),

    #[error("ABI encoding/decoding error: {0}")]
    AbiError(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Transaction reverted: {0}")]
    TransactionReverted(String),

    #[error("Call reverted: {0}")]
    CallReverted(String),
}

impl From<EvmError> for Error {
    fn from(err: EvmError) -> Self {
        match err {
            EvmError::RpcError(msg) => Error::Rpc(msg),
            EvmError::InvalidAddress(_) => Error::Config(err.to_string()),
            other => Error::Evm(other.to_string()),
        }
    }
}
