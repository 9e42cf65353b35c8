//! Simulator boundary.
//!
//! The learning engine never talks to a traffic simulator directly. Anything
//! that can produce a state vector, accept a signal-phase index and report a
//! reward implements [`Environment`] and is handed to the
//! [`Trainer`](crate::trainer::Trainer) at construction.

use ndarray::Array1;
use std::collections::HashMap;

use crate::error::Result;

/// Auxiliary numeric diagnostics reported alongside observations.
pub type Info = HashMap<String, f32>;

/// Result of applying one action.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub next_state: Array1<f32>,
    pub reward: f32,
    /// The episode reached a terminal state; no bootstrapping past it
    pub terminated: bool,
    /// The episode was cut short (time limit); the state is not terminal
    pub truncated: bool,
    pub info: Info,
}

impl Step {
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Episodic environment contract.
pub trait Environment {
    /// Start a new episode and return its initial state.
    fn reset(&mut self) -> Result<(Array1<f32>, Info)>;

    /// Apply `action` for one simulated step.
    fn step(&mut self, action: usize) -> Result<Step>;

    /// Release simulator resources.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
