/// AllowlisterFactory contract helpers
///
/// The factory tracks every raffle instance it created. Instances are enumerated
/// by ordinal index: `s_raffleId()` is the number registered, `raffles(i)` the
/// address of the i-th.
use crate::discovery::RaffleId;
use crate::error::Error;
use crate::evm::transport::{call_contract, ContractReader};
use alloy_primitives::Address;
use alloy_sol_types::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IAllowlisterFactory {
        /// Number of raffles registered so far (also the next raffle id)
        function s_raffleId() external view returns (uint256);

        /// Address of the raffle registered under `index`
        function raffles(uint256 index) external view returns (address);
    }
}

/// Read-only binding to a factory deployment
#[derive(Clone)]
pub struct RaffleFactory<C> {
    client: C,
    address: Address,
}

impl<C: ContractReader> RaffleFactory<C> {
    /// Bind to the factory at `address`
    pub fn new(client: C, address: Address) -> Self {
        Self { client, address }
    }

    /// Get the factory contract address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the underlying chain client
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Number of raffles registered in the factory
    pub async fn raffle_count(&self, block: Option<u64>) -> Result<u64, Error> {
        let result = call_contract(
            &self.client,
            self.address,
            IAllowlisterFactory::s_raffleIdCall {},
            block,
        )
        .await?;
        u64::try_from(result._0).map_err(|_| {
            Error::Contract(format!(
                "Raffle count {} reported by factory {} does not fit in u64",
                result._0, self.address
            ))
        })
    }

    /// Address of the raffle registered under `id`
    pub async fn raffle_at(&self, id: RaffleId, block: Option<u64>) -> Result<Address, Error> {
        let call = IAllowlisterFactory::rafflesCall {
            index: id.into(),
        };
        let result = call_contract(&self.client, self.address, call, block).await?;
        Ok(result._0)
    }
}
