/// Allowlister draw tests against the simulated chain
use allowlist_raffle::evm::contracts::allowlister::IAllowlister::RaffleDrawn;
use allowlist_raffle::{Allowlister, AllowlisterParams, Error, SimulatedChain};
use alloy_primitives::{address, Address, U256};

const LENS_HUB: Address = address!("0x4BF0c7AD32Fd2d32089790a54485e23f5C7736C0");

fn deploy(chain: &SimulatedChain) -> (Address, Allowlister<SimulatedChain>) {
    let owner = chain.accounts()[0];
    let params = AllowlisterParams::new("alice", 2, owner)
        .lens_hub(LENS_HUB)
        .randomness_provider(Address::ZERO)
        .payment_token(Address::ZERO);
    let raffle = chain.deploy_allowlister(owner, params);
    (owner, Allowlister::new(chain.clone(), raffle))
}

#[tokio::test]
async fn test_raffle_emits_raffle_drawn() {
    let chain = SimulatedChain::new();
    let (owner, raffle) = deploy(&chain);

    raffle
        .receive_randomness(owner, U256::from(3))
        .await
        .unwrap();
    let outcome = raffle.raffle(owner).await.unwrap();

    assert!(outcome.emits::<RaffleDrawn>());
    let drawn = outcome.events::<RaffleDrawn>();
    assert_eq!(drawn.len(), 1);
    assert_eq!(drawn[0].randomness, U256::from(3));
    assert_eq!(drawn[0].winnerCount, U256::from(2));
    assert_eq!(outcome.logs[0].address, raffle.address());
    assert!(chain.is_drawn(raffle.address()));
}

#[tokio::test]
async fn test_deployment_keeps_constructor_arguments() {
    let chain = SimulatedChain::new();
    let (owner, raffle) = deploy(&chain);

    let params = chain.raffle_params(raffle.address()).unwrap();
    assert_eq!(params.lens_hub, LENS_HUB);
    assert_eq!(params.owner, owner);
    assert_eq!(params.winner_count, 2);
    assert_eq!(raffle.display_name(None).await.unwrap(), "alice");
}

#[tokio::test]
async fn test_receive_randomness_emits_nothing() {
    let chain = SimulatedChain::new();
    let (owner, raffle) = deploy(&chain);

    let outcome = raffle
        .receive_randomness(owner, U256::from(3))
        .await
        .unwrap();
    assert!(outcome.logs.is_empty());
    assert!(!outcome.emits::<RaffleDrawn>());
}

#[tokio::test]
async fn test_simulator_reverts_draw_without_randomness() {
    let chain = SimulatedChain::new();
    let (owner, raffle) = deploy(&chain);

    let err = raffle.raffle(owner).await.unwrap_err();
    assert!(matches!(err, Error::Evm(msg) if msg.contains("randomness not received")));
    assert!(!chain.is_drawn(raffle.address()));
}

#[tokio::test]
async fn test_simulator_reverts_second_draw() {
    let chain = SimulatedChain::new();
    let (owner, raffle) = deploy(&chain);

    raffle.receive_randomness(owner, U256::from(3)).await.unwrap();
    raffle.raffle(owner).await.unwrap();

    let head = chain.head();
    let err = raffle.raffle(owner).await.unwrap_err();
    assert!(matches!(err, Error::Evm(msg) if msg.contains("already drawn")));
    // reverted transactions are not mined
    assert_eq!(chain.head(), head);
}

#[tokio::test]
async fn test_transactions_get_distinct_hashes() {
    let chain = SimulatedChain::new();
    let (owner, raffle) = deploy(&chain);

    let first = raffle.receive_randomness(owner, U256::from(3)).await.unwrap();
    let second = raffle.raffle(owner).await.unwrap();

    assert_ne!(first.tx_hash, second.tx_hash);
    assert_eq!(second.block_number, first.block_number + 1);
}
