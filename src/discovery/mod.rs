//! Raffle discovery
//!
//! Enumerates every raffle registered in the factory and resolves its display
//! name. Reads run concurrently up to a fixed bound; each resolved row or failure
//! is sent as a [`DiscoveryEvent`] to a single consumer, which folds it into a
//! [`RaffleListState`]. Nothing is aggregated inside the reading tasks.

mod controller;
mod state;

pub use controller::RaffleListController;
pub use state::{ListPhase, RaffleListState, RaffleRow};

use std::fmt;
use std::future::Future;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::evm::contracts::{Allowlister, RaffleFactory};
use crate::evm::transport::ContractReader;

/// Placeholder avatar shown next to every raffle
pub const DEFAULT_IMAGE_URL: &str = "https://images.unsplash.com/photo-1517841905240-472988babdf9?ixlib=rb-1.2.1&ixid=eyJhcHBfaWQiOjEyMDd9&auto=format&fit=facearea&facepad=2&w=256&h=256&q=80";

/// Default bound on concurrently outstanding reads
pub const DEFAULT_MAX_CONCURRENT_READS: usize = 8;

/// Default per-read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default upper bound on the raffle count accepted from a factory
pub const DEFAULT_MAX_RAFFLES: u64 = 10_000;

/// Ordinal index of a raffle in the factory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RaffleId(pub u64);

impl From<RaffleId> for U256 {
    fn from(id: RaffleId) -> Self {
        U256::from(id.0)
    }
}

impl fmt::Display for RaffleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of one discovery mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(u64);

impl Generation {
    /// Generation of a state that has never been mounted
    pub const INITIAL: Generation = Generation(0);

    /// The generation following this one
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }

    /// Raw counter value
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Display data for one raffle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaffleSummary {
    pub name: String,
    pub image_url: String,
    pub contract_address: Address,
}

/// Which read failed for a raffle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStage {
    /// `raffles(i)` on the factory
    Address,
    /// `displayName()` on the instance
    DisplayName,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStage::Address => write!(f, "address"),
            FetchStage::DisplayName => write!(f, "display name"),
        }
    }
}

/// A raffle that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub stage: FetchStage,
    /// Set when the address read succeeded and the instance read failed
    pub address: Option<Address>,
    pub reason: String,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} read failed: {}", self.stage, self.reason)
    }
}

/// Result of resolving one raffle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaffleOutcome {
    Loaded(RaffleSummary),
    Failed(FetchFailure),
}

/// Block every read of a run executes against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockPin {
    /// Each read sees the latest block at the time it executes
    Latest,
    /// Read the head block once and pin every read to it
    #[default]
    Snapshot,
    /// Pin every read to the given block
    At(u64),
}

/// Tuning for a discovery run
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Upper bound on raffles resolved at the same time
    pub max_concurrent_reads: usize,
    /// Limit for each individual read, `None` to wait indefinitely
    pub read_timeout: Option<Duration>,
    pub block: BlockPin,
    /// Largest raffle count a run will enumerate; a factory reporting more
    /// fails the count instead
    pub max_raffles: u64,
    /// Image attached to every summary
    pub image_url: String,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            max_concurrent_reads: DEFAULT_MAX_CONCURRENT_READS,
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            block: BlockPin::default(),
            max_raffles: DEFAULT_MAX_RAFFLES,
            image_url: DEFAULT_IMAGE_URL.to_string(),
        }
    }
}

/// Progress notification from a discovery run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// The factory reported `count` raffles
    Counted {
        generation: Generation,
        count: u64,
        block: Option<u64>,
    },
    /// The count (or the snapshot block) could not be read; the run ends
    CountFailed {
        generation: Generation,
        reason: String,
    },
    /// One raffle resolved or failed
    Resolved {
        generation: Generation,
        id: RaffleId,
        outcome: RaffleOutcome,
    },
    /// The run ended
    Finished {
        generation: Generation,
        report: DiscoveryReport,
    },
}

impl DiscoveryEvent {
    /// Generation of the run that produced this event
    pub fn generation(&self) -> Generation {
        match self {
            DiscoveryEvent::Counted { generation, .. }
            | DiscoveryEvent::CountFailed { generation, .. }
            | DiscoveryEvent::Resolved { generation, .. }
            | DiscoveryEvent::Finished { generation, .. } => *generation,
        }
    }
}

/// Totals for a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DiscoveryReport {
    pub count: u64,
    pub loaded: u64,
    pub failed: u64,
    /// Block the reads were pinned to
    pub block: Option<u64>,
    pub cancelled: bool,
}

/// Discovery over one factory
#[derive(Clone)]
pub struct RaffleDiscovery<C> {
    factory: RaffleFactory<C>,
    options: DiscoveryOptions,
}

impl<C> RaffleDiscovery<C>
where
    C: ContractReader + Clone + 'static,
{
    pub fn new(factory: RaffleFactory<C>, options: DiscoveryOptions) -> Self {
        Self { factory, options }
    }

    pub fn factory(&self) -> &RaffleFactory<C> {
        &self.factory
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Run discovery to completion on a background task
    ///
    /// Events arrive on the returned handle. Dropping the handle cancels the run.
    pub fn spawn(&self, generation: Generation) -> DiscoveryHandle {
        let (sender, events) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let discovery = self.clone();
        let token = cancel.clone();
        let task =
            tokio::spawn(async move { discovery.run(generation, &sender, &token).await });

        DiscoveryHandle {
            generation,
            events,
            cancel,
            task: Some(task),
        }
    }

    /// Run discovery once and return the folded state
    pub async fn discover_all(&self) -> Result<RaffleListState, Error> {
        let mut state = RaffleListState::new();
        let generation = state.restart();
        let (sender, mut events) = mpsc::unbounded_channel();
        let result = self
            .run(generation, &sender, &CancellationToken::new())
            .await;
        drop(sender);

        while let Some(event) = events.recv().await {
            state.apply(event);
        }
        result?;
        Ok(state)
    }

    /// Run discovery, reporting every step on `events`
    ///
    /// Returns an error only when the raffle count cannot be established.
    /// Per-raffle failures are reported as `Resolved` events with a failed outcome.
    pub async fn run(
        &self,
        generation: Generation,
        events: &mpsc::UnboundedSender<DiscoveryEvent>,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryReport, Error> {
        let (count, block) = match self.establish_count(cancel).await {
            Ok(counted) => counted,
            Err(Error::Cancelled) => {
                let report = DiscoveryReport {
                    cancelled: true,
                    ..Default::default()
                };
                let _ = events.send(DiscoveryEvent::Finished { generation, report });
                return Ok(report);
            }
            Err(e) => {
                warn!(
                    "Failed to read raffle count from factory {}: {}",
                    self.factory.address(),
                    e
                );
                let _ = events.send(DiscoveryEvent::CountFailed {
                    generation,
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        info!(
            "Factory {} reports {} raffles (block {:?})",
            self.factory.address(),
            count,
            block
        );
        let _ = events.send(DiscoveryEvent::Counted {
            generation,
            count,
            block,
        });

        let mut report = DiscoveryReport {
            count,
            block,
            ..Default::default()
        };

        let limit = self.options.max_concurrent_reads.max(1);
        let mut resolved = stream::iter((0..count).map(RaffleId))
            .map(|id| {
                let discovery = self.clone();
                let cancel = cancel.clone();
                async move {
                    let outcome = discovery.resolve(id, block, &cancel).await;
                    (id, outcome)
                }
            })
            .buffer_unordered(limit);

        while let Some((id, outcome)) = resolved.next().await {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            match &outcome {
                RaffleOutcome::Loaded(summary) => {
                    debug!("Raffle {} resolved: {}", id, summary.name);
                    report.loaded += 1;
                }
                RaffleOutcome::Failed(failure) => {
                    warn!("Raffle {} failed: {}", id, failure);
                    report.failed += 1;
                }
            }
            if events
                .send(DiscoveryEvent::Resolved {
                    generation,
                    id,
                    outcome,
                })
                .is_err()
            {
                // nobody is listening anymore
                report.cancelled = true;
                break;
            }
        }

        info!(
            "Discovery finished: {} loaded, {} failed of {}{}",
            report.loaded,
            report.failed,
            report.count,
            if report.cancelled { " (cancelled)" } else { "" }
        );
        let _ = events.send(DiscoveryEvent::Finished { generation, report });
        Ok(report)
    }

    async fn establish_count(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(u64, Option<u64>), Error> {
        let timeout = self.options.read_timeout;
        let block = match self.options.block {
            BlockPin::Latest => None,
            BlockPin::At(number) => Some(number),
            BlockPin::Snapshot => {
                Some(guarded(cancel, timeout, self.factory.client().block_number()).await?)
            }
        };
        let count = guarded(cancel, timeout, self.factory.raffle_count(block)).await?;
        if count > self.options.max_raffles {
            return Err(Error::Contract(format!(
                "Factory reports {} raffles, more than the limit of {}",
                count, self.options.max_raffles
            )));
        }
        Ok((count, block))
    }

    async fn resolve(
        &self,
        id: RaffleId,
        block: Option<u64>,
        cancel: &CancellationToken,
    ) -> RaffleOutcome {
        let timeout = self.options.read_timeout;

        let address = match guarded(cancel, timeout, self.factory.raffle_at(id, block)).await {
            Ok(address) => address,
            Err(e) => {
                return RaffleOutcome::Failed(FetchFailure {
                    stage: FetchStage::Address,
                    address: None,
                    reason: e.to_string(),
                })
            }
        };

        let raffle = Allowlister::new(self.factory.client().clone(), address);
        match guarded(cancel, timeout, raffle.display_name(block)).await {
            Ok(name) => RaffleOutcome::Loaded(RaffleSummary {
                name,
                image_url: self.options.image_url.clone(),
                contract_address: address,
            }),
            Err(e) => RaffleOutcome::Failed(FetchFailure {
                stage: FetchStage::DisplayName,
                address: Some(address),
                reason: e.to_string(),
            }),
        }
    }
}

/// Apply the run's cancellation token and the per-read timeout to one read
async fn guarded<T, F>(
    cancel: &CancellationToken,
    timeout: Option<Duration>,
    read: F,
) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    let bounded = async {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => read.await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = bounded => result,
    }
}

/// A discovery run executing on a background task
pub struct DiscoveryHandle {
    generation: Generation,
    events: mpsc::UnboundedReceiver<DiscoveryEvent>,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<DiscoveryReport, Error>>>,
}

impl DiscoveryHandle {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Next event, or `None` once the run has ended and all events were taken
    pub async fn next_event(&mut self) -> Option<DiscoveryEvent> {
        self.events.recv().await
    }

    /// Stop issuing reads; in-flight reads are abandoned
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the run to end and return its report
    pub async fn join(mut self) -> Result<DiscoveryReport, Error> {
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| Error::Other(format!("Discovery task failed: {}", e)))?,
            None => Err(Error::Other("Discovery task already joined".to_string())),
        }
    }
}

impl Drop for DiscoveryHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
