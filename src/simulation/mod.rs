//! In-memory simulated chain
//!
//! A single-node chain that hosts factory and raffle deployments and answers
//! ABI-encoded reads and transactions through [`ContractReader`] and
//! [`ContractWriter`]. Every deployment, registration and successful transaction
//! mines one block, and reads can be pinned to any past block.
//!
//! Faults (reverts, outages, hung calls, latency) can be injected per call to
//! exercise the error paths of code built on top of the chain client.

mod contracts;

pub use contracts::AllowlisterParams;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use alloy_primitives::{keccak256, Address};
use async_trait::async_trait;
use tracing::debug;

use crate::discovery::RaffleId;
use crate::error::Error;
use crate::evm::contracts::allowlister::IAllowlister;
use crate::evm::contracts::factory::IAllowlisterFactory;
use crate::evm::transport::{ContractReader, ContractWriter};
use crate::evm::types::{EvmCallRequest, EvmError, EvmTransactionRequest, TransactionOutcome};
use alloy_sol_types::SolCall;
use contracts::{SimulatedAllowlister, SimulatedFactory};

/// Number of funded accounts a new chain starts with
const ACCOUNT_COUNT: u8 = 10;

/// Chain ID a new simulated chain reports
pub const SIMULATED_CHAIN_ID: u64 = 31337;

/// Behaviour injected into reads
#[derive(Debug, Clone, PartialEq, Eq)]
enum Fault {
    Revert(String),
    Hang,
}

#[derive(Debug, Default)]
struct ChainState {
    block_number: u64,
    nonces: HashMap<Address, u64>,
    factories: HashMap<Address, SimulatedFactory>,
    raffles: HashMap<Address, SimulatedAllowlister>,

    faults: HashMap<(Address, Vec<u8>), Fault>,
    outage: Option<String>,
    latency: Option<Duration>,

    calls: HashMap<[u8; 4], usize>,
    in_flight: usize,
    max_in_flight: usize,
}

impl ChainState {
    fn next_nonce(&mut self, account: Address) -> u64 {
        let nonce = self.nonces.entry(account).or_insert(0);
        let current = *nonce;
        *nonce += 1;
        current
    }

    fn mine(&mut self) -> u64 {
        self.block_number += 1;
        self.block_number
    }
}

/// Handle to a simulated chain; clones share the same chain
#[derive(Clone)]
pub struct SimulatedChain {
    state: Arc<Mutex<ChainState>>,
    accounts: Arc<Vec<Address>>,
    chain_id: u64,
}

impl SimulatedChain {
    pub fn new() -> Self {
        let accounts = (1..=ACCOUNT_COUNT)
            .map(|i| Address::with_last_byte(i))
            .collect();
        Self {
            state: Arc::default(),
            accounts: Arc::new(accounts),
            chain_id: SIMULATED_CHAIN_ID,
        }
    }

    /// Report `chain_id` instead of the default
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Accounts available as transaction senders
    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    /// Current head block
    pub fn head(&self) -> u64 {
        self.state().block_number
    }

    /// Deploy an empty factory
    pub fn deploy_factory(&self, deployer: Address) -> Address {
        let mut state = self.state();
        let nonce = state.next_nonce(deployer);
        let address = deployer.create(nonce);
        state.mine();
        state.factories.insert(address, SimulatedFactory::default());
        debug!("Deployed factory at {}", address);
        address
    }

    /// Deploy a raffle instance without registering it anywhere
    pub fn deploy_allowlister(&self, deployer: Address, params: AllowlisterParams) -> Address {
        let mut state = self.state();
        let nonce = state.next_nonce(deployer);
        let address = deployer.create(nonce);
        let block = state.mine();
        debug!("Deployed raffle '{}' at {}", params.display_name, address);
        state
            .raffles
            .insert(address, SimulatedAllowlister::new(block, params));
        address
    }

    /// Register an existing raffle with a factory
    pub fn register_raffle(&self, factory: Address, raffle: Address) -> Result<RaffleId, Error> {
        let mut state = self.state();
        if !state.factories.contains_key(&factory) {
            return Err(Error::Contract(format!("No factory deployed at {}", factory)));
        }
        let block = state.mine();
        let index = state
            .factories
            .get_mut(&factory)
            .map(|f| f.register(block, raffle))
            .unwrap_or_default();
        Ok(RaffleId(index))
    }

    /// Deploy a raffle and register it with `factory`
    pub fn create_raffle(
        &self,
        factory: Address,
        deployer: Address,
        params: AllowlisterParams,
    ) -> Result<(RaffleId, Address), Error> {
        let raffle = self.deploy_allowlister(deployer, params);
        let id = self.register_raffle(factory, raffle)?;
        Ok((id, raffle))
    }

    /// Whether the raffle at `address` has been drawn
    pub fn is_drawn(&self, raffle: Address) -> bool {
        self.state()
            .raffles
            .get(&raffle)
            .map(SimulatedAllowlister::is_drawn)
            .unwrap_or(false)
    }

    /// Constructor arguments of the raffle at `address`
    pub fn raffle_params(&self, raffle: Address) -> Option<AllowlisterParams> {
        self.state().raffles.get(&raffle).map(|r| r.params().clone())
    }

    /// Make `raffles(id)` on `factory` revert
    pub fn fail_raffle_lookup(&self, factory: Address, id: RaffleId, reason: &str) {
        let data = IAllowlisterFactory::rafflesCall { index: id.into() }.abi_encode();
        self.state()
            .faults
            .insert((factory, data), Fault::Revert(reason.to_string()));
    }

    /// Make `displayName()` on `raffle` revert
    pub fn fail_display_name(&self, raffle: Address, reason: &str) {
        let data = IAllowlister::displayNameCall {}.abi_encode();
        self.state()
            .faults
            .insert((raffle, data), Fault::Revert(reason.to_string()));
    }

    /// Make `displayName()` on `raffle` never answer
    pub fn hang_display_name(&self, raffle: Address) {
        let data = IAllowlister::displayNameCall {}.abi_encode();
        self.state().faults.insert((raffle, data), Fault::Hang);
    }

    /// Fail every request as if the node were unreachable; `None` restores service
    pub fn set_outage(&self, reason: Option<&str>) {
        self.state().outage = reason.map(str::to_string);
    }

    /// Delay every read by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state().latency = latency;
    }

    /// Number of reads received for a function selector
    pub fn call_count(&self, selector: [u8; 4]) -> usize {
        self.state().calls.get(&selector).copied().unwrap_or(0)
    }

    /// Highest number of reads that were outstanding at once
    pub fn max_in_flight(&self) -> usize {
        self.state().max_in_flight
    }

    /// Register an incoming read and return its fault, latency and block
    fn admit(&self, request: &EvmCallRequest) -> Result<(Option<Fault>, Option<Duration>, u64), Error> {
        let mut state = self.state();
        if let Some(reason) = &state.outage {
            return Err(EvmError::RpcError(reason.clone()).into());
        }
        let block = match request.block {
            Some(block) if block > state.block_number => {
                return Err(EvmError::RpcError(format!("block {} not found", block)).into())
            }
            Some(block) => block,
            None => state.block_number,
        };
        if let Some(selector) = request.selector() {
            *state.calls.entry(selector).or_insert(0) += 1;
        }
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);

        let fault = state.faults.get(&(request.to, request.data.clone())).cloned();
        Ok((fault, state.latency, block))
    }

    fn execute_read(&self, request: &EvmCallRequest, block: u64) -> Result<Vec<u8>, Error> {
        let state = self.state();
        if let Some(factory) = state.factories.get(&request.to) {
            return factory.read(&request.data, block);
        }
        match state.raffles.get(&request.to) {
            Some(raffle) if raffle.deployed_at <= block => raffle.read(&request.data),
            // no code at this address (yet): eth_call returns empty data
            _ => Ok(Vec::new()),
        }
    }
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter when a read finishes or is abandoned
struct InFlight<'a>(&'a SimulatedChain);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.0.state();
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

#[async_trait]
impl ContractReader for SimulatedChain {
    async fn call(&self, request: EvmCallRequest) -> Result<Vec<u8>, Error> {
        let (fault, latency, block) = self.admit(&request)?;
        let _in_flight = InFlight(self);

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        match fault {
            Some(Fault::Revert(reason)) => Err(EvmError::CallReverted(reason).into()),
            Some(Fault::Hang) => {
                std::future::pending::<()>().await;
                Err(Error::Cancelled)
            }
            None => self.execute_read(&request, block),
        }
    }

    async fn block_number(&self) -> Result<u64, Error> {
        let state = self.state();
        if let Some(reason) = &state.outage {
            return Err(EvmError::RpcError(reason.clone()).into());
        }
        Ok(state.block_number)
    }

    async fn remote_chain_id(&self) -> Result<u64, Error> {
        let outage = self.state().outage.clone();
        match outage {
            Some(reason) => Err(EvmError::RpcError(reason).into()),
            None => Ok(self.chain_id),
        }
    }
}

#[async_trait]
impl ContractWriter for SimulatedChain {
    async fn send(&self, request: EvmTransactionRequest) -> Result<TransactionOutcome, Error> {
        let mut state = self.state();
        if let Some(reason) = &state.outage {
            return Err(EvmError::RpcError(reason.clone()).into());
        }

        let is_factory = state.factories.contains_key(&request.to);
        let logs = if let Some(raffle) = state.raffles.get_mut(&request.to) {
            raffle.execute(request.to, &request.data)?
        } else if is_factory {
            Vec::new()
        } else {
            return Err(EvmError::TransactionReverted(format!(
                "no contract code at {}",
                request.to
            ))
            .into());
        };

        let nonce = state.next_nonce(request.from);
        let block_number = state.mine();
        let mut preimage = Vec::with_capacity(20 + 8 + request.data.len());
        preimage.extend_from_slice(request.from.as_slice());
        preimage.extend_from_slice(&nonce.to_be_bytes());
        preimage.extend_from_slice(&request.data);

        Ok(TransactionOutcome {
            tx_hash: keccak256(&preimage),
            block_number,
            logs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evm::contracts::{Allowlister, RaffleFactory};
    use crate::evm::transport::verify_chain_id;

    #[tokio::test]
    async fn test_factory_reads_respect_block() {
        let chain = SimulatedChain::new();
        let owner = chain.accounts()[0];
        let factory = chain.deploy_factory(owner);

        chain
            .create_raffle(factory, owner, AllowlisterParams::new("first", 1, owner))
            .unwrap();
        let snapshot = chain.head();
        chain
            .create_raffle(factory, owner, AllowlisterParams::new("second", 1, owner))
            .unwrap();

        let binding = RaffleFactory::new(chain.clone(), factory);
        assert_eq!(binding.raffle_count(None).await.unwrap(), 2);
        assert_eq!(binding.raffle_count(Some(snapshot)).await.unwrap(), 1);
        assert!(binding.raffle_at(RaffleId(1), Some(snapshot)).await.is_err());
        assert!(binding.raffle_at(RaffleId(1), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_future_block_is_rejected() {
        let chain = SimulatedChain::new();
        let factory = chain.deploy_factory(chain.accounts()[0]);
        let binding = RaffleFactory::new(chain.clone(), factory);

        let err = binding.raffle_count(Some(chain.head() + 1)).await.unwrap_err();
        assert!(matches!(err, Error::Rpc(_)));
    }

    #[tokio::test]
    async fn test_display_name_before_deployment_fails_to_decode() {
        let chain = SimulatedChain::new();
        let owner = chain.accounts()[0];
        let before = chain.head();
        let raffle = chain.deploy_allowlister(owner, AllowlisterParams::new("late", 1, owner));

        let binding = Allowlister::new(chain.clone(), raffle);
        assert_eq!(binding.display_name(None).await.unwrap(), "late");
        assert!(binding.display_name(Some(before)).await.is_err());
    }

    #[tokio::test]
    async fn test_outage_fails_reads_and_writes() {
        let chain = SimulatedChain::new();
        let owner = chain.accounts()[0];
        let raffle = chain.deploy_allowlister(owner, AllowlisterParams::new("down", 1, owner));
        chain.set_outage(Some("connection refused"));

        let binding = Allowlister::new(chain.clone(), raffle);
        assert!(matches!(
            binding.display_name(None).await,
            Err(Error::Rpc(msg)) if msg == "connection refused"
        ));
        assert!(binding.raffle(owner).await.is_err());

        chain.set_outage(None);
        assert!(binding.display_name(None).await.is_ok());
    }

    #[tokio::test]
    async fn test_call_counts_by_selector() {
        let chain = SimulatedChain::new();
        let owner = chain.accounts()[0];
        let raffle = chain.deploy_allowlister(owner, AllowlisterParams::new("counted", 1, owner));
        let binding = Allowlister::new(chain.clone(), raffle);

        binding.display_name(None).await.unwrap();
        binding.display_name(None).await.unwrap();

        assert_eq!(chain.call_count(IAllowlister::displayNameCall::SELECTOR), 2);
        assert_eq!(chain.max_in_flight(), 1);
    }

    #[test]
    fn test_deployments_get_distinct_addresses() {
        let chain = SimulatedChain::new();
        let owner = chain.accounts()[0];
        let a = chain.deploy_allowlister(owner, AllowlisterParams::new("a", 1, owner));
        let b = chain.deploy_allowlister(owner, AllowlisterParams::new("b", 1, owner));
        assert_ne!(a, b);
        assert_eq!(chain.head(), 2);
        assert_eq!(tokio_test::block_on(chain.block_number()).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_chain_id_verification() {
        let chain = SimulatedChain::new();
        assert_eq!(chain.remote_chain_id().await.unwrap(), SIMULATED_CHAIN_ID);
        assert!(verify_chain_id(&chain, SIMULATED_CHAIN_ID).await.is_ok());

        let mainnet = SimulatedChain::new().with_chain_id(1);
        let err = verify_chain_id(&mainnet, 137).await.unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("chain 1") && msg.contains("chain 137")));
    }
}
