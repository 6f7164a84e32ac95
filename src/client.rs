/// Raffle SDK client
///
/// Entry point tying a chain client to the factory deployment and the discovery
/// settings. Works over any `ContractReader`: the live RPC client built by
/// `RaffleClientBuilder`, or a `SimulatedChain`.
use alloy_primitives::Address;

use crate::discovery::{
    DiscoveryOptions, RaffleDiscovery, RaffleListController, RaffleListState, RaffleSummary,
};
use crate::error::Error;
use crate::evm::contracts::{Allowlister, RaffleFactory};
use crate::evm::transport::{verify_chain_id, ContractReader};

#[cfg(feature = "evm")]
use crate::config::RaffleConfig;
#[cfg(feature = "evm")]
use crate::evm::client::EvmClient;

/// Client for one factory deployment
#[derive(Clone)]
pub struct RaffleClient<C> {
    factory: RaffleFactory<C>,
    options: DiscoveryOptions,
}

impl<C> RaffleClient<C>
where
    C: ContractReader + Clone + 'static,
{
    /// Create a client over `reader` for the factory at `factory_address`
    pub fn new(reader: C, factory_address: Address, options: DiscoveryOptions) -> Self {
        Self {
            factory: RaffleFactory::new(reader, factory_address),
            options,
        }
    }

    /// Get the factory binding
    pub fn factory(&self) -> &RaffleFactory<C> {
        &self.factory
    }

    /// Get the chain client
    pub fn reader(&self) -> &C {
        self.factory.client()
    }

    /// Bind to a single raffle instance
    pub fn raffle(&self, address: Address) -> Allowlister<C> {
        Allowlister::new(self.factory.client().clone(), address)
    }

    /// Discovery over this client's factory
    pub fn discovery(&self) -> RaffleDiscovery<C> {
        RaffleDiscovery::new(self.factory.clone(), self.options.clone())
    }

    /// Controller for an incrementally updated raffle list
    pub fn list_controller(&self) -> RaffleListController<C> {
        RaffleListController::new(Some(self.discovery()))
    }

    /// Discover every raffle and wait for all rows to settle
    pub async fn list_raffles(&self) -> Result<RaffleListState, Error> {
        self.discovery().discover_all().await
    }

    /// Summary of one raffle, read at the latest block
    pub async fn raffle_summary(&self, address: Address) -> Result<RaffleSummary, Error> {
        fetch_summary(self.reader(), address, &self.options.image_url).await
    }

    /// Check that the chain client serves chain `expected`
    pub async fn verify_chain_id(&self, expected: u64) -> Result<(), Error> {
        verify_chain_id(self.reader(), expected).await
    }
}

/// Read the summary of the raffle at `address` without going through a factory
pub async fn fetch_summary<C>(
    reader: &C,
    address: Address,
    image_url: &str,
) -> Result<RaffleSummary, Error>
where
    C: ContractReader + Clone,
{
    let name = Allowlister::new(reader.clone(), address)
        .display_name(None)
        .await?;
    Ok(RaffleSummary {
        name,
        image_url: image_url.to_string(),
        contract_address: address,
    })
}

/// Builder for a `RaffleClient` over a live RPC endpoint
#[cfg(feature = "evm")]
#[derive(Debug, Clone, Default)]
pub struct RaffleClientBuilder {
    config: RaffleConfig,
}

#[cfg(feature = "evm")]
impl RaffleClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded configuration
    pub fn config(mut self, config: RaffleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.config.network.rpc_url = rpc_url.into();
        self
    }

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.config.network.chain_id = chain_id;
        self
    }

    pub fn factory_address(mut self, address: Address) -> Self {
        self.config.network.factory_address = Some(address);
        self
    }

    pub fn max_concurrent_reads(mut self, limit: usize) -> Self {
        self.config.discovery.max_concurrent_reads = limit;
        self
    }

    /// Validate the configuration and create a chain client. No factory is
    /// needed and nothing is sent to the node.
    pub fn build_reader(&self) -> Result<EvmClient, Error> {
        self.config.validate()?;
        EvmClient::new(&self.config.network.rpc_url, self.config.network.chain_id)
    }

    /// Create a chain client and check the node serves the configured chain
    pub async fn connect_reader(self) -> Result<EvmClient, Error> {
        let evm = self.build_reader()?;
        evm.verify_chain_id().await?;
        Ok(evm)
    }

    /// Validate the configuration and create a client for the configured
    /// factory. Nothing is sent to the node.
    pub fn build(self) -> Result<RaffleClient<EvmClient>, Error> {
        let evm = self.build_reader()?;
        let factory = self.config.require_factory()?;
        Ok(RaffleClient::new(
            evm,
            factory,
            self.config.discovery.to_options(),
        ))
    }

    /// Like [`build`](Self::build), then check the node serves the configured chain
    pub async fn connect(self) -> Result<RaffleClient<EvmClient>, Error> {
        let client = self.build()?;
        client.reader().verify_chain_id().await?;
        Ok(client)
    }
}
