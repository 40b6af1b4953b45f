//! Per-thread ordered observation sequence

use crate::error::{MemoryError, Result};
use crate::tokens::Estimator;
use crate::types::Observation;

/// Ordered observations for one thread, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationStore {
    observations: Vec<Observation>,
}

impl ObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a persisted, already ordered list
    pub fn from_observations(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn append(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    /// Replace `[start, end)` with a single observation.
    ///
    /// All-or-nothing: on `Range` error the store is untouched.
    pub fn replace_range(
        &mut self,
        start: usize,
        end: usize,
        observation: Observation,
    ) -> Result<()> {
        let len = self.observations.len();
        if start >= end || end > len {
            return Err(MemoryError::Range { start, end, len });
        }
        self.observations
            .splice(start..end, std::iter::once(observation));
        Ok(())
    }

    pub fn all(&self) -> &[Observation] {
        &self.observations
    }

    pub fn last(&self) -> Option<&Observation> {
        self.observations.last()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn token_total(&self, estimator: &Estimator) -> usize {
        estimator.estimate_observations(&self.observations)
    }

    pub fn clear(&mut self) {
        self.observations.clear();
    }
}
