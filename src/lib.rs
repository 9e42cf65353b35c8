//! # Junction - Traffic-Signal Reinforcement Learning Engine
//!
//! Junction trains a value-based agent that picks discrete signal phases from
//! a continuous state vector. The learning engine combines three pieces:
//!
//! - **Prioritized replay**: a bounded FIFO store of transitions sampled in
//!   proportion to their last observed TD error
//! - **Dueling network**: `Q(s, a) = V(s) + (A(s, a) − mean_a' A(s, a'))`,
//!   kept as an online and a slowly tracking target copy
//! - **Double DQN**: the online network selects the next action, the target
//!   network evaluates it
//!
//! The simulator stays outside the crate behind the [`env::Environment`]
//! trait; [`trainer::Trainer`] drives the act/step/observe loop.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use junction::agent::DuelingDqnAgent;
//! use junction::config::AgentConfig;
//! use ndarray::Array1;
//!
//! let config = AgentConfig::new(8, 4).with_seed(7);
//! let mut agent = DuelingDqnAgent::new(config).unwrap();
//!
//! let state = Array1::zeros(8);
//! let action = agent.act(state.view(), 0.1).unwrap();
//! let next_state = Array1::zeros(8);
//! if let Some(report) = agent.observe_transition(state, action, -1.0, next_state, false).unwrap() {
//!     println!("loss {}", report.loss);
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions for dense layers
//! - [`agent`] - The dueling double-DQN controller
//! - [`config`] - Agent and trainer configuration
//! - [`env`] - Environment contract consumed by the trainer
//! - [`error`] - Error types and result handling
//! - [`layers`] - Dense layers and weight initialization
//! - [`loss`] - TD regression losses
//! - [`metrics`] - Training telemetry
//! - [`network`] - Dueling action-value network
//! - [`optimizer`] - SGD and Adam
//! - [`replay_buffer`] - Prioritized experience replay
//! - [`trainer`] - Episode loop

pub mod activations;
pub mod agent;
pub mod config;
pub mod env;
pub mod error;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod replay_buffer;
pub mod trainer;

#[cfg(test)]
mod tests;
