/// Allowlister (raffle instance) contract helpers
///
/// One deployment per allowlist raffle. Exposes its display metadata and the
/// draw operation: randomness is delivered through `receiveRandomness`, and
/// `raffle()` performs the draw and emits `RaffleDrawn`.
///
/// # Example
///
/// ```rust,no_run
/// use allowlist_raffle::evm::contracts::allowlister::IAllowlister;
/// use alloy_primitives::U256;
/// use alloy_sol_types::SolCall;
///
/// # fn example() {
/// let call = IAllowlister::receiveRandomnessCall {
///     randomness: U256::from(3),
/// };
/// let encoded = call.abi_encode();
/// # }
/// ```
use crate::error::Error;
use crate::evm::transport::{call_contract, send_contract_call, ContractReader, ContractWriter};
use crate::evm::types::TransactionOutcome;
use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IAllowlister {
        /// Human-readable raffle label
        function displayName() external view returns (string);

        /// Deliver the randomness seed used by the next draw
        function receiveRandomness(uint256 randomness) external;

        /// Draw the raffle winners
        function raffle() external;

        event RaffleDrawn(uint256 randomness, uint256 winnerCount);
    }
}

/// Binding to one raffle instance
#[derive(Clone)]
pub struct Allowlister<C> {
    client: C,
    address: Address,
}

impl<C: ContractReader> Allowlister<C> {
    /// Bind to the raffle deployed at `address`
    pub fn new(client: C, address: Address) -> Self {
        Self { client, address }
    }

    /// Get the contract address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the raffle's display name
    pub async fn display_name(&self, block: Option<u64>) -> Result<String, Error> {
        let result = call_contract(
            &self.client,
            self.address,
            IAllowlister::displayNameCall {},
            block,
        )
        .await?;
        Ok(result._0)
    }
}

impl<C: ContractWriter> Allowlister<C> {
    /// Supply the randomness seed, sent from `from`
    pub async fn receive_randomness(
        &self,
        from: Address,
        randomness: U256,
    ) -> Result<TransactionOutcome, Error> {
        let call = IAllowlister::receiveRandomnessCall { randomness };
        send_contract_call(&self.client, from, self.address, call).await
    }

    /// Trigger the draw, sent from `from`
    pub async fn raffle(&self, from: Address) -> Result<TransactionOutcome, Error> {
        send_contract_call(&self.client, from, self.address, IAllowlister::raffleCall {}).await
    }
}
