use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::processing::ProcessingStrategy;
use crate::ports::ProcessingMetrics;

#[derive(Default)]
struct Counters {
    deliveries: HashMap<ProcessingStrategy, u64>,
    outcomes: HashMap<(ProcessingStrategy, &'static str), u64>,
    relayed: HashMap<String, u64>,
    relay_failures: HashMap<String, u64>,
}

/// In-memory metrics sink for tests and local runs.
#[derive(Default)]
pub struct InMemoryMetrics {
    counters: Mutex<Counters>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn deliveries(&self, strategy: ProcessingStrategy) -> u64 {
        self.counters().deliveries.get(&strategy).copied().unwrap_or(0)
    }

    pub fn outcomes(&self, strategy: ProcessingStrategy, outcome: &str) -> u64 {
        self.counters()
            .outcomes
            .iter()
            .filter(|((s, o), _)| *s == strategy && *o == outcome)
            .map(|(_, count)| *count)
            .sum()
    }

    pub fn relayed(&self, destination: &str) -> u64 {
        self.counters().relayed.get(destination).copied().unwrap_or(0)
    }

    pub fn relay_failures(&self, destination: &str) -> u64 {
        self.counters().relay_failures.get(destination).copied().unwrap_or(0)
    }

    /// Zero every counter.
    pub fn reset(&self) {
        *self.counters() = Counters::default();
    }
}

impl ProcessingMetrics for InMemoryMetrics {
    fn record_delivery(&self, strategy: ProcessingStrategy) {
        *self.counters().deliveries.entry(strategy).or_default() += 1;
    }

    fn record_outcome(&self, strategy: ProcessingStrategy, outcome: &'static str) {
        *self.counters().outcomes.entry((strategy, outcome)).or_default() += 1;
    }

    fn record_relayed(&self, destination: &str) {
        *self
            .counters()
            .relayed
            .entry(destination.to_string())
            .or_default() += 1;
    }

    fn record_relay_failure(&self, destination: &str) {
        *self
            .counters()
            .relay_failures
            .entry(destination.to_string())
            .or_default() += 1;
    }
}
