/// In-memory models of the factory and raffle contracts
///
/// Calls arrive ABI-encoded exactly as they would on a node and are decoded with
/// the same `sol!` bindings the SDK uses.
use alloy_primitives::{Address, Log, U256};
use alloy_sol_types::{SolCall, SolEvent, SolInterface};

use crate::error::Error;
use crate::evm::contracts::allowlister::IAllowlister::{
    self, IAllowlisterCalls, RaffleDrawn,
};
use crate::evm::contracts::factory::IAllowlisterFactory::{self, IAllowlisterFactoryCalls};
use crate::evm::types::EvmError;

/// Constructor arguments of an Allowlister deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowlisterParams {
    /// Lens Hub the raffle checks entrants against
    pub lens_hub: Address,
    pub display_name: String,
    /// Number of winners drawn
    pub winner_count: u64,
    pub owner: Address,
    /// Source allowed to deliver randomness
    pub randomness_provider: Address,
    /// Token entry fees are paid in, zero for none
    pub payment_token: Address,
}

impl AllowlisterParams {
    pub fn new(display_name: impl Into<String>, winner_count: u64, owner: Address) -> Self {
        Self {
            lens_hub: Address::ZERO,
            display_name: display_name.into(),
            winner_count,
            owner,
            randomness_provider: Address::ZERO,
            payment_token: Address::ZERO,
        }
    }

    pub fn lens_hub(mut self, lens_hub: Address) -> Self {
        self.lens_hub = lens_hub;
        self
    }

    pub fn randomness_provider(mut self, provider: Address) -> Self {
        self.randomness_provider = provider;
        self
    }

    pub fn payment_token(mut self, token: Address) -> Self {
        self.payment_token = token;
        self
    }
}

fn reverted(reason: &str) -> Error {
    EvmError::CallReverted(reason.to_string()).into()
}

fn tx_reverted(reason: &str) -> Error {
    EvmError::TransactionReverted(reason.to_string()).into()
}

fn undecodable(contract: &str, e: alloy_sol_types::Error) -> Error {
    EvmError::AbiError(format!("{} cannot decode call: {}", contract, e)).into()
}

/// Factory deployment
#[derive(Debug, Default)]
pub(crate) struct SimulatedFactory {
    /// Registered raffles with the block they were registered in
    raffles: Vec<(u64, Address)>,
}

impl SimulatedFactory {
    pub(crate) fn register(&mut self, block: u64, raffle: Address) -> u64 {
        self.raffles.push((block, raffle));
        (self.raffles.len() - 1) as u64
    }

    fn count_at(&self, block: u64) -> usize {
        self.raffles
            .iter()
            .take_while(|(registered, _)| *registered <= block)
            .count()
    }

    pub(crate) fn read(&self, data: &[u8], block: u64) -> Result<Vec<u8>, Error> {
        let call = IAllowlisterFactoryCalls::abi_decode(data, true)
            .map_err(|e| undecodable("AllowlisterFactory", e))?;

        match call {
            IAllowlisterFactoryCalls::s_raffleId(_) => {
                let count = U256::from(self.count_at(block));
                Ok(IAllowlisterFactory::s_raffleIdCall::abi_encode_returns(&(count,)))
            }
            IAllowlisterFactoryCalls::raffles(call) => {
                let index = usize::try_from(call.index)
                    .ok()
                    .filter(|index| *index < self.count_at(block))
                    .ok_or_else(|| reverted("raffle index out of range"))?;
                let address = self.raffles[index].1;
                Ok(IAllowlisterFactory::rafflesCall::abi_encode_returns(&(address,)))
            }
        }
    }
}

/// Raffle instance deployment
#[derive(Debug)]
pub(crate) struct SimulatedAllowlister {
    pub(crate) deployed_at: u64,
    params: AllowlisterParams,
    randomness: Option<U256>,
    drawn: bool,
}

impl SimulatedAllowlister {
    pub(crate) fn new(deployed_at: u64, params: AllowlisterParams) -> Self {
        Self {
            deployed_at,
            params,
            randomness: None,
            drawn: false,
        }
    }

    pub(crate) fn params(&self) -> &AllowlisterParams {
        &self.params
    }

    pub(crate) fn is_drawn(&self) -> bool {
        self.drawn
    }

    pub(crate) fn read(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        let call =
            IAllowlisterCalls::abi_decode(data, true).map_err(|e| undecodable("Allowlister", e))?;

        match call {
            IAllowlisterCalls::displayName(_) => Ok(IAllowlister::displayNameCall::abi_encode_returns(
                &(self.params.display_name.clone(),),
            )),
            // view calls of state-changing functions return nothing
            IAllowlisterCalls::receiveRandomness(_) | IAllowlisterCalls::raffle(_) => Ok(Vec::new()),
        }
    }

    /// Execute a transaction against this raffle, returning the emitted logs
    pub(crate) fn execute(&mut self, address: Address, data: &[u8]) -> Result<Vec<Log>, Error> {
        let call =
            IAllowlisterCalls::abi_decode(data, true).map_err(|e| undecodable("Allowlister", e))?;

        match call {
            IAllowlisterCalls::displayName(_) => Ok(Vec::new()),
            IAllowlisterCalls::receiveRandomness(call) => {
                if self.drawn {
                    return Err(tx_reverted("raffle already drawn"));
                }
                self.randomness = Some(call.randomness);
                Ok(Vec::new())
            }
            IAllowlisterCalls::raffle(_) => {
                if self.drawn {
                    return Err(tx_reverted("raffle already drawn"));
                }
                let randomness = self
                    .randomness
                    .ok_or_else(|| tx_reverted("randomness not received"))?;
                self.drawn = true;

                let event = RaffleDrawn {
                    randomness,
                    winnerCount: U256::from(self.params.winner_count),
                };
                Ok(vec![Log {
                    address,
                    data: event.encode_log_data(),
                }])
            }
        }
    }
}
