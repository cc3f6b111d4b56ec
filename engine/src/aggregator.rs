use crate::api::{Batch, Grid};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Empty,
    Filling,
    Ready,
}

/// Outcome of feeding one worker result to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Result belongs to a request that has since been replaced or cleared.
    Stale,
    /// Slot already filled, or index outside the batch.
    Ignored,
    Progress(u8),
    /// The last slot was filled. Reported once per batch.
    Ready { progress: u8, batch: Arc<Batch> },
}

/// Collects grids for the current batch. Each request gets a fresh
/// generation number; results carrying any other number are dropped.
#[derive(Debug)]
pub struct BatchAggregator {
    generation: u64,
    slots: Vec<Option<Arc<Grid>>>,
    completed: usize,
    state: BatchState,
}

impl Default for BatchAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchAggregator {
    pub fn new() -> Self {
        Self { generation: 0, slots: Vec::new(), completed: 0, state: BatchState::Empty }
    }

    pub fn generation(&self) -> u64 { self.generation }
    pub fn state(&self) -> BatchState { self.state }
    pub fn len(&self) -> usize { self.slots.len() }
    pub fn is_empty(&self) -> bool { self.slots.is_empty() }
    pub fn completed(&self) -> usize { self.completed }

    pub fn progress(&self) -> u8 {
        if self.slots.is_empty() {
            return 0;
        }
        (self.completed * 100 / self.slots.len()) as u8
    }

    /// Starts a new batch of `cache_count` unset slots.
    pub fn reset(&mut self, generation: u64, cache_count: usize) {
        self.generation = generation;
        self.slots = vec![None; cache_count];
        self.completed = 0;
        self.state = if cache_count == 0 { BatchState::Empty } else { BatchState::Filling };
    }

    /// Installs an already complete batch, e.g. one served from the cache.
    pub fn adopt(&mut self, generation: u64, batch: &Batch) {
        self.generation = generation;
        self.slots = batch.grids().iter().cloned().map(Some).collect();
        self.completed = self.slots.len();
        self.state = BatchState::Ready;
    }

    pub fn clear(&mut self, generation: u64) {
        self.reset(generation, 0);
    }

    pub fn accept(&mut self, generation: u64, index: usize, grid: Arc<Grid>) -> Completion {
        if generation != self.generation {
            return Completion::Stale;
        }
        if self.state != BatchState::Filling {
            return Completion::Ignored;
        }
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_none() => *slot = Some(grid),
            _ => return Completion::Ignored,
        }
        self.completed += 1;
        let progress = self.progress();

        if self.completed < self.slots.len() {
            return Completion::Progress(progress);
        }
        let grids: Vec<Arc<Grid>> = self.slots.iter().flatten().cloned().collect();
        self.state = BatchState::Ready;
        Completion::Ready { progress, batch: Arc::new(Batch::new(grids)) }
    }
}
