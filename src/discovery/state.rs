use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use super::{
    DiscoveryEvent, FetchFailure, Generation, RaffleId, RaffleOutcome, RaffleSummary,
};

/// Presentation state of one raffle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RaffleRow {
    Pending,
    Loaded(RaffleSummary),
    Failed(FetchFailure),
}

impl From<RaffleOutcome> for RaffleRow {
    fn from(outcome: RaffleOutcome) -> Self {
        match outcome {
            RaffleOutcome::Loaded(summary) => RaffleRow::Loaded(summary),
            RaffleOutcome::Failed(failure) => RaffleRow::Failed(failure),
        }
    }
}

/// Where the current mount stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "reason", rename_all = "snake_case")]
pub enum ListPhase {
    /// Never mounted, or no chain client bound
    Idle,
    /// Waiting for the raffle count
    Counting,
    /// Count known, rows resolving
    Resolving,
    Complete,
    CountFailed(String),
    Cancelled,
}

/// Raffle list folded from discovery events
///
/// `apply` is the only way rows change, and it only accepts events of the current
/// generation. Rows are created `Pending` when the count arrives and move to
/// `Loaded` or `Failed` at most once.
#[derive(Debug, Clone, Serialize)]
pub struct RaffleListState {
    generation: Generation,
    phase: ListPhase,
    block: Option<u64>,
    rows: BTreeMap<RaffleId, RaffleRow>,
}

impl RaffleListState {
    pub fn new() -> Self {
        Self {
            generation: Generation::INITIAL,
            phase: ListPhase::Idle,
            block: None,
            rows: BTreeMap::new(),
        }
    }

    /// Discard all rows and start a new generation
    pub fn restart(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.phase = ListPhase::Counting;
        self.block = None;
        self.rows.clear();
        self.generation
    }

    /// Discard all rows without starting a run
    pub fn reset_idle(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.phase = ListPhase::Idle;
        self.block = None;
        self.rows.clear();
        self.generation
    }

    /// Mark an unsettled run as cancelled. Rows still pending stay pending and
    /// no further events of this generation are accepted.
    pub fn cancel(&mut self) -> bool {
        match self.phase {
            ListPhase::Counting | ListPhase::Resolving => {
                self.phase = ListPhase::Cancelled;
                true
            }
            _ => false,
        }
    }

    /// Fold one event into the state. Returns whether the event changed anything.
    pub fn apply(&mut self, event: DiscoveryEvent) -> bool {
        if event.generation() != self.generation {
            debug!(
                "Dropping event from generation {} (current {})",
                event.generation().value(),
                self.generation.value()
            );
            return false;
        }
        if self.phase == ListPhase::Cancelled {
            debug!("Run was cancelled, dropping late event");
            return false;
        }

        match event {
            DiscoveryEvent::Counted { count, block, .. } => {
                if self.phase != ListPhase::Counting {
                    warn!("Ignoring repeated raffle count {}", count);
                    return false;
                }
                self.block = block;
                self.rows = (0..count).map(|i| (RaffleId(i), RaffleRow::Pending)).collect();
                self.phase = ListPhase::Resolving;
                true
            }
            DiscoveryEvent::CountFailed { reason, .. } => {
                self.phase = ListPhase::CountFailed(reason);
                true
            }
            DiscoveryEvent::Resolved { id, outcome, .. } => match self.rows.get_mut(&id) {
                Some(row) if matches!(row, RaffleRow::Pending) => {
                    *row = outcome.into();
                    true
                }
                Some(_) => {
                    warn!("Raffle {} already resolved, ignoring update", id);
                    false
                }
                None => {
                    warn!("Raffle {} is outside the counted range", id);
                    false
                }
            },
            DiscoveryEvent::Finished { report, .. } => {
                if matches!(self.phase, ListPhase::CountFailed(_)) {
                    return false;
                }
                self.phase = if report.cancelled {
                    ListPhase::Cancelled
                } else {
                    ListPhase::Complete
                };
                true
            }
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn phase(&self) -> &ListPhase {
        &self.phase
    }

    /// Block the current rows were read at, if pinned
    pub fn block(&self) -> Option<u64> {
        self.block
    }

    /// Rows in index order
    pub fn rows(&self) -> impl Iterator<Item = (RaffleId, &RaffleRow)> {
        self.rows.iter().map(|(id, row)| (*id, row))
    }

    pub fn row(&self, id: RaffleId) -> Option<&RaffleRow> {
        self.rows.get(&id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Loaded raffles in index order
    pub fn summaries(&self) -> Vec<&RaffleSummary> {
        self.rows
            .values()
            .filter_map(|row| match row {
                RaffleRow::Loaded(summary) => Some(summary),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<(RaffleId, &FetchFailure)> {
        self.rows
            .iter()
            .filter_map(|(id, row)| match row {
                RaffleRow::Failed(failure) => Some((*id, failure)),
                _ => None,
            })
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.rows
            .values()
            .filter(|row| matches!(row, RaffleRow::Pending))
            .count()
    }

    /// Whether the run has ended, successfully or not
    pub fn is_settled(&self) -> bool {
        matches!(
            self.phase,
            ListPhase::Complete | ListPhase::CountFailed(_) | ListPhase::Cancelled
        )
    }
}

impl Default for RaffleListState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{DiscoveryReport, FetchStage};
    use alloy_primitives::Address;

    fn loaded(name: &str, byte: u8) -> RaffleOutcome {
        RaffleOutcome::Loaded(RaffleSummary {
            name: name.to_string(),
            image_url: String::new(),
            contract_address: Address::repeat_byte(byte),
        })
    }

    fn counted(generation: Generation, count: u64) -> DiscoveryEvent {
        DiscoveryEvent::Counted {
            generation,
            count,
            block: Some(10),
        }
    }

    #[test]
    fn test_count_creates_pending_rows() {
        let mut state = RaffleListState::new();
        assert_eq!(state.phase(), &ListPhase::Idle);

        let generation = state.restart();
        assert!(state.apply(counted(generation, 3)));

        assert_eq!(state.len(), 3);
        assert_eq!(state.pending_count(), 3);
        assert_eq!(state.block(), Some(10));
        assert_eq!(state.phase(), &ListPhase::Resolving);
    }

    #[test]
    fn test_resolution_in_any_order() {
        let mut state = RaffleListState::new();
        let generation = state.restart();
        state.apply(counted(generation, 2));

        state.apply(DiscoveryEvent::Resolved {
            generation,
            id: RaffleId(1),
            outcome: loaded("second", 2),
        });
        state.apply(DiscoveryEvent::Resolved {
            generation,
            id: RaffleId(0),
            outcome: loaded("first", 1),
        });

        let names: Vec<_> = state.summaries().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(state.pending_count(), 0);
    }

    #[test]
    fn test_failure_only_affects_its_row() {
        let mut state = RaffleListState::new();
        let generation = state.restart();
        state.apply(counted(generation, 2));

        state.apply(DiscoveryEvent::Resolved {
            generation,
            id: RaffleId(0),
            outcome: RaffleOutcome::Failed(FetchFailure {
                stage: FetchStage::DisplayName,
                address: Some(Address::repeat_byte(1)),
                reason: "execution reverted".to_string(),
            }),
        });
        state.apply(DiscoveryEvent::Resolved {
            generation,
            id: RaffleId(1),
            outcome: loaded("ok", 2),
        });

        assert_eq!(state.failures().len(), 1);
        assert_eq!(state.failures()[0].0, RaffleId(0));
        assert_eq!(state.summaries().len(), 1);
        assert_eq!(state.summaries()[0].name, "ok");
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let mut state = RaffleListState::new();
        let old = state.restart();
        state.apply(counted(old, 1));

        let current = state.restart();
        assert!(state.is_empty());

        assert!(!state.apply(counted(old, 5)));
        assert!(!state.apply(DiscoveryEvent::Resolved {
            generation: old,
            id: RaffleId(0),
            outcome: loaded("stale", 9),
        }));
        assert!(state.is_empty());

        assert!(state.apply(counted(current, 1)));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_resolved_row_is_not_overwritten() {
        let mut state = RaffleListState::new();
        let generation = state.restart();
        state.apply(counted(generation, 1));

        assert!(state.apply(DiscoveryEvent::Resolved {
            generation,
            id: RaffleId(0),
            outcome: loaded("first", 1),
        }));
        assert!(!state.apply(DiscoveryEvent::Resolved {
            generation,
            id: RaffleId(0),
            outcome: loaded("again", 2),
        }));
        assert_eq!(state.summaries()[0].name, "first");
    }

    #[test]
    fn test_out_of_range_resolution_is_ignored() {
        let mut state = RaffleListState::new();
        let generation = state.restart();
        state.apply(counted(generation, 1));

        assert!(!state.apply(DiscoveryEvent::Resolved {
            generation,
            id: RaffleId(4),
            outcome: loaded("ghost", 4),
        }));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_count_failure_is_terminal() {
        let mut state = RaffleListState::new();
        let generation = state.restart();

        state.apply(DiscoveryEvent::CountFailed {
            generation,
            reason: "connection refused".to_string(),
        });
        state.apply(DiscoveryEvent::Finished {
            generation,
            report: DiscoveryReport::default(),
        });

        assert_eq!(
            state.phase(),
            &ListPhase::CountFailed("connection refused".to_string())
        );
        assert!(state.is_settled());
    }

    #[test]
    fn test_cancel_settles_the_list() {
        let mut state = RaffleListState::new();
        let generation = state.restart();
        state.apply(counted(generation, 2));

        assert!(state.cancel());
        assert_eq!(state.phase(), &ListPhase::Cancelled);
        assert!(state.is_settled());
        assert_eq!(state.pending_count(), 2);

        assert!(!state.apply(DiscoveryEvent::Resolved {
            generation,
            id: RaffleId(0),
            outcome: loaded("late", 1),
        }));
        assert_eq!(state.pending_count(), 2);
        assert!(!state.cancel());
    }

    #[test]
    fn test_cancel_leaves_settled_list_alone() {
        let mut state = RaffleListState::new();
        assert!(!state.cancel());
        assert_eq!(state.phase(), &ListPhase::Idle);

        let generation = state.restart();
        state.apply(counted(generation, 0));
        state.apply(DiscoveryEvent::Finished {
            generation,
            report: DiscoveryReport::default(),
        });
        assert!(!state.cancel());
        assert_eq!(state.phase(), &ListPhase::Complete);
    }
}
