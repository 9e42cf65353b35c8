use log::{debug, info, trace, warn};
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

use crate::config::AgentConfig;
use crate::error::{JunctionError, Result};
use crate::loss::{Loss, LossFunction};
use crate::network::{argmax, DuelingNetwork};
use crate::optimizer::OptimizerWrapper;
use crate::replay_buffer::{PrioritizedReplayBuffer, Transition, TransitionBatch};

/// Outcome of one learning step.
#[derive(Debug, Clone)]
pub struct LearnReport {
    /// Batch loss before the gradient step
    pub loss: f32,
    /// Replay slots that were trained on
    pub indices: Vec<usize>,
    /// Double-DQN targets, one per sampled transition
    pub targets: Array1<f32>,
    /// `target − Q_online(s, a)`, written back as priorities
    pub td_errors: Array1<f32>,
}

/// Double-DQN bootstrap targets for a batch.
///
/// The online network picks `a* = argmax_a Q_online(s', a)` and the target
/// network scores it: `y = r + γ·Q_target(s', a*)`. Terminal transitions get
/// `y = r` with no bootstrap term.
pub fn double_dqn_targets(
    online: &DuelingNetwork,
    target: &DuelingNetwork,
    batch: &TransitionBatch,
    gamma: f32,
) -> Array1<f32> {
    let next_online = online.predict_batch(batch.next_states.view());
    let next_target = target.predict_batch(batch.next_states.view());

    Array1::from_shape_fn(batch.len(), |i| {
        if batch.dones[i] {
            batch.rewards[i]
        } else {
            let best_action = argmax(next_online.row(i));
            batch.rewards[i] + gamma * next_target[[i, best_action]]
        }
    })
}

/// Dueling double-DQN agent with prioritized experience replay.
///
/// The agent owns the online and target networks, the optimizer state and
/// the replay buffer. Call [`DuelingDqnAgent::act`] to pick an action and
/// [`DuelingDqnAgent::observe_transition`] with the environment's response;
/// learning happens inside `observe_transition` every `update_every` steps
/// once a full batch is stored.
///
/// # Example
///
/// ```rust
/// use junction::agent::DuelingDqnAgent;
/// use junction::config::AgentConfig;
/// use ndarray::array;
///
/// let config = AgentConfig::new(2, 3).with_batch_size(4).with_replay_capacity(100);
/// let mut agent = DuelingDqnAgent::new(config).unwrap();
///
/// let state = array![0.2, 0.8];
/// let action = agent.act(state.view(), 0.1).unwrap();
/// let report = agent
///     .observe_transition(state, action, 1.0, array![0.3, 0.7], false)
///     .unwrap();
/// assert!(report.is_none());
/// ```
pub struct DuelingDqnAgent {
    config: AgentConfig,
    online: DuelingNetwork,
    target: DuelingNetwork,
    optimizer: OptimizerWrapper,
    loss: LossFunction,
    memory: PrioritizedReplayBuffer,
    rng: StdRng,
    /// Steps since the last cadence tick, modulo `update_every`
    t_step: usize,
    learn_steps: usize,
}

impl DuelingDqnAgent {
    /// Build an agent from a validated configuration. The online and target
    /// networks start with identical parameters.
    pub fn new(config: AgentConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let online = DuelingNetwork::new(
            config.state_size,
            &config.hidden_layer_sizes,
            config.action_size,
            config.hidden_activation,
            &mut rng,
        );
        let target = online.clone();
        let optimizer = config.optimizer.build(online.layers());
        let memory = PrioritizedReplayBuffer::new(
            config.replay_capacity,
            config.priority_epsilon,
            config.seed.wrapping_add(1),
        )?;
        info!(
            "Dueling network {} -> {:?} ({}) -> {} actions, replay capacity {}",
            config.state_size,
            config.hidden_layer_sizes,
            config.hidden_activation.name(),
            config.action_size,
            config.replay_capacity
        );

        Ok(DuelingDqnAgent {
            loss: config.loss,
            config,
            online,
            target,
            optimizer,
            memory,
            rng,
            t_step: 0,
            learn_steps: 0,
        })
    }

    /// Epsilon-greedy action selection. Leaves the step counter untouched.
    pub fn act(&mut self, state: ArrayView1<f32>, eps: f32) -> Result<usize> {
        if !(0.0..=1.0).contains(&eps) {
            return Err(JunctionError::invalid_parameter(
                "eps".to_string(),
                format!("{} is outside [0, 1]", eps),
            ));
        }
        self.check_state(state, "state")?;

        if self.rng.gen::<f32>() < eps {
            Ok(self.rng.gen_range(0..self.config.action_size))
        } else {
            self.greedy_action(state)
        }
    }

    /// `argmax_a Q_online(state, a)`. Non-finite action values are a
    /// `Divergence` error.
    pub fn greedy_action(&self, state: ArrayView1<f32>) -> Result<usize> {
        self.check_state(state, "state")?;
        let q_values = self.online.predict(state);
        if q_values.iter().any(|q| !q.is_finite()) {
            return Err(JunctionError::Divergence(format!(
                "Non-finite action values {:?}",
                q_values.to_vec()
            )));
        }
        Ok(argmax(q_values.view()))
    }

    /// Online action values for `state`.
    pub fn q_values(&self, state: ArrayView1<f32>) -> Result<Array1<f32>> {
        self.check_state(state, "state")?;
        Ok(self.online.predict(state))
    }

    /// Store a transition and, on cadence ticks with a full batch available,
    /// run one learning step.
    pub fn observe_transition(
        &mut self,
        state: Array1<f32>,
        action: usize,
        reward: f32,
        next_state: Array1<f32>,
        done: bool,
    ) -> Result<Option<LearnReport>> {
        self.check_state(state.view(), "state")?;
        self.check_state(next_state.view(), "next_state")?;
        if action >= self.config.action_size {
            return Err(JunctionError::InvalidAction {
                action,
                action_size: self.config.action_size,
            });
        }
        if !reward.is_finite() {
            return Err(JunctionError::invalid_parameter(
                "reward".to_string(),
                format!("{} is not finite", reward),
            ));
        }

        self.memory.add(Transition { state, action, reward, next_state, done });

        self.t_step = (self.t_step + 1) % self.config.update_every;
        if self.t_step == 0 {
            self.learn()
        } else {
            Ok(None)
        }
    }

    /// One double-DQN learning step. Returns `None` without touching any
    /// parameters while the buffer holds fewer than `batch_size` transitions.
    pub fn learn(&mut self) -> Result<Option<LearnReport>> {
        let batch_size = self.config.batch_size;
        if self.memory.len() < batch_size {
            trace!("Skipping learning step: {} of {} transitions stored", self.memory.len(), batch_size);
            return Ok(None);
        }

        let (indices, batch) = {
            let sampled = self.memory.sample(batch_size)?;
            (sampled.indices.clone(), TransitionBatch::from_transitions(&sampled.transitions)?)
        };

        let targets = double_dqn_targets(&self.online, &self.target, &batch, self.config.discount_factor);

        let q_values = self.online.forward_batch(batch.states.view());
        let predicted = Array1::from_shape_fn(batch.len(), |i| q_values[[i, batch.actions[i]]]);
        let td_errors = &targets - &predicted;

        let loss = self.loss.compute(predicted.view(), targets.view());
        if !loss.is_finite() {
            warn!("Non-finite loss at learning step {}", self.learn_steps);
            return Err(JunctionError::Divergence(format!(
                "Loss {} at learning step {}",
                loss, self.learn_steps
            )));
        }

        // Only the taken action's value receives gradient.
        let loss_gradient = self.loss.gradient(predicted.view(), targets.view());
        let mut output_errors = Array2::zeros(q_values.dim());
        for (i, &action) in batch.actions.iter().enumerate() {
            output_errors[[i, action]] = loss_gradient[i];
        }

        let gradients = self.online.backward_batch(output_errors.view())?;
        self.online.apply_gradients(&gradients, &mut self.optimizer, self.config.learning_rate)?;
        if !self.online.is_finite() {
            warn!("Non-finite online parameters at learning step {}", self.learn_steps);
            return Err(JunctionError::Divergence(format!(
                "Online parameters became non-finite at learning step {}",
                self.learn_steps
            )));
        }

        self.memory.update_priorities(&indices, &td_errors.to_vec())?;
        self.target.soft_update_from(&self.online, self.config.soft_update_rate)?;

        self.learn_steps += 1;
        debug!(
            "Learning step {}: loss {:.6}, batch {}, max priority {:.4}",
            self.learn_steps,
            loss,
            batch_size,
            self.memory.max_priority()
        );

        Ok(Some(LearnReport { loss, indices, targets, td_errors }))
    }

    /// Interpolate the target network toward the online network with `tau`.
    pub fn soft_update(&mut self, tau: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&tau) {
            return Err(JunctionError::invalid_parameter(
                "tau".to_string(),
                format!("{} is outside [0, 1]", tau),
            ));
        }
        self.target.soft_update_from(&self.online, tau)
    }

    /// Write the online network to `path`.
    pub fn save_weights<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.online.save(path.as_ref())?;
        info!("Saved online weights to {}", path.as_ref().display());
        Ok(())
    }

    /// Replace the online network with the one stored at `path` and copy it
    /// into the target network.
    pub fn load_weights<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let network = DuelingNetwork::load(path.as_ref())?;
        if network.state_size() != self.config.state_size || network.action_size() != self.config.action_size {
            return Err(JunctionError::dimension_mismatch(
                format!("{} -> {}", self.config.state_size, self.config.action_size),
                format!("{} -> {}", network.state_size(), network.action_size()),
            ));
        }
        let same_shape = network.layer_count() == self.online.layer_count()
            && network.layers().zip(self.online.layers()).all(|(a, b)| a.weights.dim() == b.weights.dim());
        if !same_shape {
            return Err(JunctionError::dimension_mismatch(
                format!("hidden layers {:?}", self.config.hidden_layer_sizes),
                "a differently shaped network".to_string(),
            ));
        }
        if !network.is_finite() {
            return Err(JunctionError::Divergence(format!(
                "Checkpoint {} contains non-finite parameters",
                path.as_ref().display()
            )));
        }

        self.target = network.clone();
        self.online = network;
        info!("Loaded online weights from {}", path.as_ref().display());
        Ok(())
    }

    fn check_state(&self, state: ArrayView1<f32>, name: &str) -> Result<()> {
        if state.len() != self.config.state_size {
            return Err(JunctionError::dimension_mismatch(
                format!("{} of length {}", name, self.config.state_size),
                format!("{}", state.len()),
            ));
        }
        Ok(())
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn online_network(&self) -> &DuelingNetwork {
        &self.online
    }

    pub fn online_network_mut(&mut self) -> &mut DuelingNetwork {
        &mut self.online
    }

    pub fn target_network(&self) -> &DuelingNetwork {
        &self.target
    }

    pub fn memory(&self) -> &PrioritizedReplayBuffer {
        &self.memory
    }

    /// Steps since the last cadence tick.
    pub fn t_step(&self) -> usize {
        self.t_step
    }

    /// Number of completed learning steps.
    pub fn learn_steps(&self) -> usize {
        self.learn_steps
    }
}
