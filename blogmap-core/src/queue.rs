use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{QueueEntry, Strategy};

/// The prioritized exploration queue.
///
/// Pushes always append; the configured [`Strategy`] decides which end
/// (or which random entry) a pop takes. Duplicate suppression is the
/// caller's job via `CrawlState::is_known` — the queue never scans
/// itself for membership.
pub struct DiscoveryQueue {
    entries: VecDeque<QueueEntry>,
    strategy: Strategy,
    rng: StdRng,
}

impl DiscoveryQueue {
    pub fn new(strategy: Strategy) -> Self {
        Self::with_rng(strategy, StdRng::from_entropy())
    }

    /// Seeded variant for deterministic replay in tests.
    pub fn with_seed(strategy: Strategy, seed: u64) -> Self {
        Self::with_rng(strategy, StdRng::seed_from_u64(seed))
    }

    fn with_rng(strategy: Strategy, rng: StdRng) -> Self {
        Self {
            entries: VecDeque::new(),
            strategy,
            rng,
        }
    }

    /// Rebuild a queue from checkpointed contents, preserving order.
    pub fn from_entries(strategy: Strategy, entries: Vec<QueueEntry>) -> Self {
        let mut queue = Self::new(strategy);
        queue.entries = entries.into();
        queue
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn push(&mut self, entry: QueueEntry) {
        self.entries.push_back(entry);
    }

    /// Take the next candidate per the strategy. `None` means the queue
    /// is exhausted, a normal terminal condition.
    pub fn pop(&mut self) -> Option<QueueEntry> {
        if self.entries.is_empty() {
            return None;
        }
        match self.strategy {
            Strategy::BreadthFirst => self.entries.pop_front(),
            Strategy::DepthFirst => self.entries.pop_back(),
            Strategy::Random => {
                let idx = self.rng.gen_range(0..self.entries.len());
                self.entries.remove(idx)
            }
            Strategy::Mixed => {
                if self.rng.gen_bool(0.5) {
                    self.entries.pop_front()
                } else {
                    self.entries.pop_back()
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the pending entries, in stored order, for
    /// checkpointing.
    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.entries.iter().cloned().collect()
    }
}
