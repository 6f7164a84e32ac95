use tracing::{debug, info};

use super::{DiscoveryEvent, DiscoveryHandle, Generation, RaffleDiscovery, RaffleListState};
use crate::error::Error;
use crate::evm::transport::ContractReader;

/// Owns the raffle list for one view and its in-flight discovery run
///
/// Mounting (or rebinding the chain client) cancels the previous run and starts
/// over with an empty list. Without a bound client nothing runs and the list
/// stays idle.
pub struct RaffleListController<C> {
    discovery: Option<RaffleDiscovery<C>>,
    state: RaffleListState,
    run: Option<DiscoveryHandle>,
}

impl<C> RaffleListController<C>
where
    C: ContractReader + Clone + 'static,
{
    pub fn new(discovery: Option<RaffleDiscovery<C>>) -> Self {
        Self {
            discovery,
            state: RaffleListState::new(),
            run: None,
        }
    }

    /// Start a fresh discovery run, cancelling any run in flight
    ///
    /// Returns the new generation, or `None` when no chain client is bound.
    pub fn mount(&mut self) -> Option<Generation> {
        self.unmount();

        let Some(discovery) = &self.discovery else {
            debug!("No chain client bound, raffle discovery not started");
            self.state.reset_idle();
            return None;
        };

        let generation = self.state.restart();
        info!("Mounting raffle list, generation {}", generation.value());
        self.run = Some(discovery.spawn(generation));
        Some(generation)
    }

    /// Replace the chain client binding and remount
    pub fn rebind(&mut self, discovery: Option<RaffleDiscovery<C>>) -> Option<Generation> {
        self.discovery = discovery;
        self.mount()
    }

    /// Cancel the run in flight, keeping the rows gathered so far
    ///
    /// An unfinished list moves to `ListPhase::Cancelled` so it does not read as
    /// still loading.
    pub fn unmount(&mut self) {
        if let Some(run) = self.run.take() {
            debug!("Cancelling discovery generation {}", run.generation().value());
            run.cancel();
            self.state.cancel();
        }
    }

    /// Fold an event received outside `next_update` into the list
    ///
    /// Events from a superseded mount are dropped.
    pub fn apply(&mut self, event: DiscoveryEvent) -> bool {
        self.state.apply(event)
    }

    /// Wait for the next event of the current run and fold it into the list
    ///
    /// Returns `None` once the run has ended.
    pub async fn next_update(&mut self) -> Option<DiscoveryEvent> {
        let run = self.run.as_mut()?;
        match run.next_event().await {
            Some(event) => {
                self.state.apply(event.clone());
                Some(event)
            }
            None => None,
        }
    }

    /// Fold every remaining event of the current run into the list
    pub async fn pump(&mut self) -> Result<(), Error> {
        while self.next_update().await.is_some() {}

        match self.run.take() {
            Some(run) => run.join().await.map(|_| ()),
            None => Ok(()),
        }
    }

    pub fn state(&self) -> &RaffleListState {
        &self.state
    }

    pub fn is_bound(&self) -> bool {
        self.discovery.is_some()
    }
}
