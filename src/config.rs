//! Agent and trainer configuration.
//!
//! Both structures deserialize from JSON with every omitted field taking its
//! default, and both expose `with_*` setters for building them in code.

use serde::{Serialize, Deserialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::activations::Activation;
use crate::error::{JunctionError, Result};
use crate::loss::LossFunction;
use crate::optimizer::OptimizerConfig;
use crate::replay_buffer::DEFAULT_PRIORITY_EPSILON;

/// Dimensions and hyperparameters of a dueling double-DQN agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub state_size: usize,
    pub action_size: usize,
    pub hidden_layer_sizes: Vec<usize>,
    pub batch_size: usize,
    /// γ
    pub discount_factor: f32,
    /// τ
    pub soft_update_rate: f32,
    pub learning_rate: f32,
    /// Environment steps between learning steps
    pub update_every: usize,
    pub replay_capacity: usize,
    pub priority_epsilon: f32,
    pub seed: u64,
    pub hidden_activation: Activation,
    pub optimizer: OptimizerConfig,
    pub loss: LossFunction,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            state_size: 0,
            action_size: 0,
            hidden_layer_sizes: vec![64, 64],
            batch_size: 64,
            discount_factor: 0.99,
            soft_update_rate: 1e-3,
            learning_rate: 5e-4,
            update_every: 4,
            replay_capacity: 100_000,
            priority_epsilon: DEFAULT_PRIORITY_EPSILON,
            seed: 0,
            hidden_activation: Activation::Relu,
            optimizer: OptimizerConfig::default(),
            loss: LossFunction::Mse,
        }
    }
}

impl AgentConfig {
    pub fn new(state_size: usize, action_size: usize) -> Self {
        AgentConfig {
            state_size,
            action_size,
            ..Default::default()
        }
    }

    pub fn with_hidden_layer_sizes(mut self, sizes: &[usize]) -> Self {
        self.hidden_layer_sizes = sizes.to_vec();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_discount_factor(mut self, gamma: f32) -> Self {
        self.discount_factor = gamma;
        self
    }

    pub fn with_soft_update_rate(mut self, tau: f32) -> Self {
        self.soft_update_rate = tau;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_update_every(mut self, update_every: usize) -> Self {
        self.update_every = update_every;
        self
    }

    pub fn with_replay_capacity(mut self, capacity: usize) -> Self {
        self.replay_capacity = capacity;
        self
    }

    pub fn with_priority_epsilon(mut self, epsilon: f32) -> Self {
        self.priority_epsilon = epsilon;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_hidden_activation(mut self, activation: Activation) -> Self {
        self.hidden_activation = activation;
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_loss(mut self, loss: LossFunction) -> Self {
        self.loss = loss;
        self
    }

    /// Check every field, reporting the first invalid one.
    pub fn validate(&self) -> Result<()> {
        if self.state_size == 0 {
            return Err(JunctionError::invalid_parameter("state_size", "Must be greater than 0"));
        }
        if self.action_size == 0 {
            return Err(JunctionError::invalid_parameter("action_size", "Must be greater than 0"));
        }
        if self.hidden_layer_sizes.iter().any(|&size| size == 0) {
            return Err(JunctionError::invalid_parameter(
                "hidden_layer_sizes",
                "Every hidden layer needs at least one unit",
            ));
        }
        if self.batch_size == 0 {
            return Err(JunctionError::invalid_parameter("batch_size", "Must be greater than 0"));
        }
        if self.replay_capacity < self.batch_size {
            return Err(JunctionError::invalid_parameter(
                "replay_capacity",
                "Must be at least batch_size",
            ));
        }
        if self.update_every == 0 {
            return Err(JunctionError::invalid_parameter("update_every", "Must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return Err(JunctionError::invalid_parameter("discount_factor", "Must lie in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.soft_update_rate) {
            return Err(JunctionError::invalid_parameter("soft_update_rate", "Must lie in [0, 1]"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(JunctionError::invalid_parameter("learning_rate", "Must be positive and finite"));
        }
        if !(self.priority_epsilon > 0.0 && self.priority_epsilon.is_finite()) {
            return Err(JunctionError::invalid_parameter("priority_epsilon", "Must be positive and finite"));
        }
        if let LossFunction::Huber { delta } = self.loss {
            if !(delta > 0.0) {
                return Err(JunctionError::invalid_parameter("loss.delta", "Must be positive"));
            }
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

/// Multiplicative per-episode epsilon decay, floored at `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationSchedule {
    pub start: f32,
    pub end: f32,
    pub decay: f32,
}

impl Default for ExplorationSchedule {
    fn default() -> Self {
        ExplorationSchedule {
            start: 1.0,
            end: 0.01,
            decay: 0.995,
        }
    }
}

impl ExplorationSchedule {
    /// Epsilon to use for the zero-based `episode`.
    pub fn epsilon(&self, episode: usize) -> f32 {
        let decayed = self.start * self.decay.powi(episode.min(i32::MAX as usize) as i32);
        decayed.max(self.end)
    }

    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        if !in_unit(self.start) || !in_unit(self.end) {
            return Err(JunctionError::invalid_parameter("exploration", "start and end must lie in [0, 1]"));
        }
        if self.end > self.start {
            return Err(JunctionError::invalid_parameter("exploration", "end must not exceed start"));
        }
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return Err(JunctionError::invalid_parameter("exploration.decay", "Must lie in (0, 1]"));
        }
        Ok(())
    }
}

/// Episode loop settings for [`crate::trainer::Trainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub episodes: usize,
    pub max_steps_per_episode: usize,
    pub exploration: ExplorationSchedule,
    /// Number of values each metrics history keeps
    pub metrics_history: usize,
    pub checkpoint_path: Option<PathBuf>,
    /// Save the online weights every this many episodes
    pub checkpoint_every: Option<usize>,
    /// JSON file the metrics histories are rewritten to after every episode
    pub metrics_path: Option<PathBuf>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            episodes: 500,
            max_steps_per_episode: 1000,
            exploration: ExplorationSchedule::default(),
            metrics_history: 1000,
            checkpoint_path: None,
            checkpoint_every: None,
            metrics_path: None,
        }
    }
}

impl TrainerConfig {
    pub fn with_episodes(mut self, episodes: usize) -> Self {
        self.episodes = episodes;
        self
    }

    pub fn with_max_steps_per_episode(mut self, steps: usize) -> Self {
        self.max_steps_per_episode = steps;
        self
    }

    pub fn with_exploration(mut self, exploration: ExplorationSchedule) -> Self {
        self.exploration = exploration;
        self
    }

    pub fn with_checkpoint<P: Into<PathBuf>>(mut self, path: P, every: usize) -> Self {
        self.checkpoint_path = Some(path.into());
        self.checkpoint_every = Some(every);
        self
    }

    pub fn with_metrics_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.metrics_path = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_steps_per_episode == 0 {
            return Err(JunctionError::invalid_parameter("max_steps_per_episode", "Must be greater than 0"));
        }
        if self.metrics_history == 0 {
            return Err(JunctionError::invalid_parameter("metrics_history", "Must be greater than 0"));
        }
        if self.checkpoint_every == Some(0) {
            return Err(JunctionError::invalid_parameter("checkpoint_every", "Must be greater than 0"));
        }
        if self.checkpoint_every.is_some() && self.checkpoint_path.is_none() {
            return Err(JunctionError::invalid_parameter("checkpoint_path", "Required when checkpoint_every is set"));
        }
        self.exploration.validate()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
