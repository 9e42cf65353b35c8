//! # Agent Module
//!
//! The learning controller that ties the replay buffer and the dueling
//! networks together.
//!
//! ## Learning step
//!
//! Every `update_every` observed transitions, once the buffer holds a full
//! batch, the agent:
//!
//! 1. samples a priority-weighted batch together with its replay slots;
//! 2. selects `a* = argmax_a Q_online(s', a)` and evaluates it with the target
//!    network, `y = r + γ·Q_target(s', a*)·(1 − done)`;
//! 3. regresses `Q_online(s, a)` toward `y` with one optimizer step;
//! 4. writes `|y − Q_online(s, a)| + ε` back as the new priorities;
//! 5. moves the target network toward the online one, `θ' ← τ·θ + (1 − τ)·θ'`.
//!
//! A non-finite loss or parameter aborts training with
//! [`JunctionError::Divergence`](crate::error::JunctionError::Divergence).

mod dqn;

pub use dqn::{double_dqn_targets, DuelingDqnAgent, LearnReport};
