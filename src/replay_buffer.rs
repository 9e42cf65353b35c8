//! # Prioritized Experience Replay
//!
//! A bounded store of past transitions where each transition carries a
//! sampling priority. Storage is a single arena of `(transition, priority)`
//! slots written by a cursor that wraps modulo the capacity, so a transition
//! and its priority are always evicted together and eviction is strictly
//! first-in first-out.
//!
//! Sampling draws slot indices independently, with replacement, with
//! probability `p_i / Σ p`. No importance-sampling correction is applied.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, WeightedIndex};

use crate::error::{JunctionError, Result};

/// Priority given to the first transition of an empty buffer.
pub const DEFAULT_PRIORITY: f32 = 1.0;

/// Offset added to every absolute TD error so no transition reaches zero probability.
pub const DEFAULT_PRIORITY_EPSILON: f32 = 1e-5;

/// One observed `(state, action, reward, next_state, done)` step.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Array1<f32>,
    pub done: bool,
}

#[derive(Clone, Debug)]
struct Slot {
    transition: Transition,
    priority: f32,
}

/// Transitions drawn by [`PrioritizedReplayBuffer::sample`] with the slots
/// they came from. `indices[k]` is the slot of `transitions[k]`.
#[derive(Debug)]
pub struct SampledBatch<'a> {
    pub transitions: Vec<&'a Transition>,
    pub indices: Vec<usize>,
}

impl SampledBatch<'_> {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Fixed-capacity replay memory with priority-proportional sampling.
#[derive(Clone, Debug)]
pub struct PrioritizedReplayBuffer {
    slots: Vec<Slot>,
    capacity: usize,
    /// Slot written by the next `add`
    cursor: usize,
    /// Largest priority currently stored
    max_priority: f32,
    epsilon: f32,
    rng: StdRng,
}

impl PrioritizedReplayBuffer {
    /// Create a buffer whose sampling is seeded with `seed`.
    pub fn new(capacity: usize, epsilon: f32, seed: u64) -> Result<Self> {
        Self::with_rng(capacity, epsilon, StdRng::seed_from_u64(seed))
    }

    /// Create a buffer that samples with the given random source.
    pub fn with_rng(capacity: usize, epsilon: f32, rng: StdRng) -> Result<Self> {
        if capacity == 0 {
            return Err(JunctionError::invalid_parameter(
                "capacity",
                "Capacity must be greater than 0",
            ));
        }
        if !(epsilon > 0.0 && epsilon.is_finite()) {
            return Err(JunctionError::invalid_parameter(
                "priority_epsilon",
                "Epsilon must be positive and finite",
            ));
        }

        Ok(PrioritizedReplayBuffer {
            slots: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
            max_priority: DEFAULT_PRIORITY,
            epsilon,
            rng,
        })
    }

    /// Store a transition with the current maximum priority, evicting the
    /// oldest transition when the buffer is full.
    pub fn add(&mut self, transition: Transition) {
        let priority = self.max_priority();
        let slot = Slot { transition, priority };

        if self.slots.len() < self.capacity {
            self.slots.push(slot);
        } else {
            self.slots[self.cursor] = slot;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
        self.max_priority = priority;
    }

    /// Draw `batch_size` slots with replacement, proportionally to priority.
    ///
    /// Callers must make sure the buffer holds at least `batch_size`
    /// transitions; otherwise `InsufficientSamples` is returned.
    pub fn sample(&mut self, batch_size: usize) -> Result<SampledBatch<'_>> {
        if batch_size == 0 {
            return Err(JunctionError::invalid_parameter(
                "batch_size",
                "Batch size must be greater than 0",
            ));
        }
        if batch_size > self.slots.len() {
            return Err(JunctionError::InsufficientSamples {
                requested: batch_size,
                available: self.slots.len(),
            });
        }

        let distribution = WeightedIndex::new(self.slots.iter().map(|slot| slot.priority))
            .map_err(|e| JunctionError::TrainingError(format!("Invalid priority distribution: {}", e)))?;

        let indices: Vec<usize> = (0..batch_size)
            .map(|_| distribution.sample(&mut self.rng))
            .collect();
        let transitions = indices.iter().map(|&i| &self.slots[i].transition).collect();

        Ok(SampledBatch { transitions, indices })
    }

    /// Set `priority[index] = |error| + ε` for every `(index, error)` pair.
    pub fn update_priorities(&mut self, indices: &[usize], errors: &[f32]) -> Result<()> {
        if indices.len() != errors.len() {
            return Err(JunctionError::dimension_mismatch(
                format!("{} errors", indices.len()),
                format!("{}", errors.len()),
            ));
        }
        if let Some(&index) = indices.iter().find(|&&i| i >= self.slots.len()) {
            return Err(JunctionError::InvalidIndex { index, len: self.slots.len() });
        }
        if let Some(error) = errors.iter().find(|e| !e.is_finite()) {
            return Err(JunctionError::Divergence(format!("Non-finite TD error {}", error)));
        }

        for (&index, &error) in indices.iter().zip(errors) {
            self.slots[index].priority = error.abs() + self.epsilon;
        }
        self.max_priority = self
            .slots
            .iter()
            .map(|slot| slot.priority)
            .fold(f32::MIN_POSITIVE, f32::max);
        Ok(())
    }

    /// Priority assigned to the next inserted transition.
    pub fn max_priority(&self) -> f32 {
        if self.slots.is_empty() {
            DEFAULT_PRIORITY
        } else {
            self.max_priority
        }
    }

    pub fn priority(&self, index: usize) -> Option<f32> {
        self.slots.get(index).map(|slot| slot.priority)
    }

    pub fn get(&self, index: usize) -> Option<&Transition> {
        self.slots.get(index).map(|slot| &slot.transition)
    }

    /// Stored transitions from oldest to newest as `(slot, transition, priority)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Transition, f32)> {
        let start = if self.slots.len() < self.capacity { 0 } else { self.cursor };
        let len = self.slots.len();
        (0..len).map(move |offset| {
            let index = (start + offset) % len;
            let slot = &self.slots[index];
            (index, &slot.transition, slot.priority)
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Sampled transitions stacked into matrices for batched network evaluation.
#[derive(Clone, Debug)]
pub struct TransitionBatch {
    pub states: Array2<f32>,
    pub actions: Vec<usize>,
    pub rewards: Array1<f32>,
    pub next_states: Array2<f32>,
    pub dones: Vec<bool>,
}

impl TransitionBatch {
    pub fn from_transitions(transitions: &[&Transition]) -> Result<Self> {
        let first = transitions
            .first()
            .ok_or_else(|| JunctionError::invalid_parameter("transitions", "Batch must not be empty"))?;
        let batch_size = transitions.len();
        let state_size = first.state.len();

        let mut states = Array2::zeros((batch_size, state_size));
        let mut next_states = Array2::zeros((batch_size, state_size));
        let mut actions = Vec::with_capacity(batch_size);
        let mut rewards = Array1::zeros(batch_size);
        let mut dones = Vec::with_capacity(batch_size);

        for (i, transition) in transitions.iter().enumerate() {
            if transition.state.len() != state_size || transition.next_state.len() != state_size {
                return Err(JunctionError::dimension_mismatch(
                    format!("state length {}", state_size),
                    format!("{} / {}", transition.state.len(), transition.next_state.len()),
                ));
            }
            states.row_mut(i).assign(&transition.state);
            next_states.row_mut(i).assign(&transition.next_state);
            actions.push(transition.action);
            rewards[i] = transition.reward;
            dones.push(transition.done);
        }

        Ok(TransitionBatch { states, actions, rewards, next_states, dones })
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
