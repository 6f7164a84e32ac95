use crate::error::Error;
use crate::evm::transport::{verify_chain_id, ContractReader};
use crate::evm::types::{EvmCallRequest, EvmError};
use alloy_primitives::{Bytes, TxKind};
/// EVM Client for the raffle SDK
///
/// Read-only JSON-RPC client over HTTP. Contract bindings reach it through the
/// `ContractReader` trait.
use alloy_provider::{Provider, ProviderBuilder, RootProvider};
use alloy_rpc_types_eth::{BlockId, TransactionRequest};
use alloy_transport_http::{Client, Http};
use async_trait::async_trait;
use tracing::debug;

/// EVM client for read-only chain access
#[derive(Clone)]
pub struct EvmClient {
    /// Alloy provider for RPC communication
    provider: RootProvider<Http<Client>>,
    /// Chain ID the client was configured for
    chain_id: u64,
}

impl EvmClient {
    /// Create a new EVM client with the given RPC endpoint and chain ID
    pub fn new(rpc_url: &str, chain_id: u64) -> Result<Self, Error> {
        let url = url::Url::parse(rpc_url)
            .map_err(|e| Error::Config(format!("Invalid RPC URL: {}", e)))?;
        let provider = ProviderBuilder::new().on_http(url);

        Ok(Self { provider, chain_id })
    }

    /// Get the configured chain ID
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Check that the node serves the configured chain
    pub async fn verify_chain_id(&self) -> Result<(), Error> {
        verify_chain_id(self, self.chain_id).await
    }
}

#[async_trait]
impl ContractReader for EvmClient {
    async fn call(&self, request: EvmCallRequest) -> Result<Vec<u8>, Error> {
        let tx_request = TransactionRequest {
            to: Some(TxKind::Call(request.to)),
            input: Bytes::from(request.data).into(),
            ..Default::default()
        };

        let block = request
            .block
            .map(BlockId::number)
            .unwrap_or_else(BlockId::latest);

        debug!("eth_call to {} at {:?}", request.to, block);

        let result = self
            .provider
            .call(&tx_request)
            .block(block)
            .await
            .map_err(|e| EvmError::RpcError(e.to_string()))?;

        Ok(result.to_vec())
    }

    async fn block_number(&self) -> Result<u64, Error> {
        let block_number = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| EvmError::RpcError(e.to_string()))?;

        Ok(block_number)
    }

    async fn remote_chain_id(&self) -> Result<u64, Error> {
        let chain_id = self
            .provider
            .get_chain_id()
            .await
            .map_err(|e| EvmError::RpcError(e.to_string()))?;

        Ok(chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_rejects_invalid_url() {
        assert!(matches!(
            EvmClient::new("not a url", 1),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_client_keeps_chain_id() {
        let client = EvmClient::new("http://127.0.0.1:8545", 1).unwrap();
        assert_eq!(client.chain_id(), 1);
    }
}
