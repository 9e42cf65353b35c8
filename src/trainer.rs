use log::{info, warn};

use crate::agent::DuelingDqnAgent;
use crate::config::TrainerConfig;
use crate::env::Environment;
use crate::error::Result;
use crate::metrics::MetricsTracker;

/// Telemetry for one finished episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub total_reward: f32,
    pub steps: usize,
    pub epsilon: f32,
    /// Mean loss of the learning steps run during the episode
    pub mean_loss: Option<f32>,
    pub learning_steps: usize,
}

/// Synchronous episode loop around an agent and an injected environment.
///
/// Each step runs `act`, then `Environment::step`, then
/// `observe_transition`, strictly in that order. Only `terminated` is passed
/// to the agent as `done`; truncated episodes end without suppressing the
/// bootstrap term.
pub struct Trainer<E: Environment> {
    agent: DuelingDqnAgent,
    env: E,
    config: TrainerConfig,
    metrics: MetricsTracker,
    episodes_run: usize,
}

impl<E: Environment> Trainer<E> {
    pub fn new(agent: DuelingDqnAgent, env: E, config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        let metrics = MetricsTracker::new(config.metrics_history);
        Ok(Trainer {
            agent,
            env,
            config,
            metrics,
            episodes_run: 0,
        })
    }

    /// Run one episode with the scheduled epsilon.
    pub fn run_episode(&mut self) -> Result<EpisodeSummary> {
        let episode = self.episodes_run;
        let epsilon = self.config.exploration.epsilon(episode);

        let (mut state, _info) = self.env.reset()?;
        self.metrics.start_episode();
        self.metrics.record_epsilon(epsilon);

        let mut losses = Vec::new();
        let mut steps = 0;
        while steps < self.config.max_steps_per_episode {
            let action = self.agent.act(state.view(), epsilon)?;
            let step = self.env.step(action)?;
            let done = step.is_done();

            self.metrics.step(step.reward);
            steps += 1;

            if let Some(report) = self.agent.observe_transition(
                state,
                action,
                step.reward,
                step.next_state.clone(),
                step.terminated,
            )? {
                self.metrics.record_loss(report.loss);
                losses.push(report.loss);
            }

            state = step.next_state;
            if done {
                break;
            }
        }

        let total_reward = self.metrics.current_episode_reward();
        self.metrics.end_episode();
        self.episodes_run += 1;

        let mean_loss = if losses.is_empty() {
            None
        } else {
            Some(losses.iter().sum::<f32>() / losses.len() as f32)
        };

        info!(
            "Episode {}: reward {:.3}, steps {}, epsilon {:.3}, learning steps {}",
            episode,
            total_reward,
            steps,
            epsilon,
            losses.len()
        );

        self.maybe_checkpoint()?;
        if let Some(path) = &self.config.metrics_path {
            self.metrics.save(path)?;
        }

        Ok(EpisodeSummary {
            episode,
            total_reward,
            steps,
            epsilon,
            mean_loss,
            learning_steps: losses.len(),
        })
    }

    /// Run the configured number of episodes and close the environment.
    pub fn train(&mut self) -> Result<Vec<EpisodeSummary>> {
        let mut summaries = Vec::with_capacity(self.config.episodes);
        for _ in 0..self.config.episodes {
            match self.run_episode() {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    // The episode error is the one the caller needs to see.
                    if let Err(close_error) = self.env.close() {
                        warn!("Failed to close environment after error: {}", close_error);
                    }
                    return Err(e);
                }
            }
        }
        self.env.close()?;
        Ok(summaries)
    }

    fn maybe_checkpoint(&self) -> Result<()> {
        if let (Some(path), Some(every)) = (&self.config.checkpoint_path, self.config.checkpoint_every) {
            if self.episodes_run % every == 0 {
                self.agent.save_weights(path)?;
            }
        }
        Ok(())
    }

    pub fn agent(&self) -> &DuelingDqnAgent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut DuelingDqnAgent {
        &mut self.agent
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    pub fn episodes_run(&self) -> usize {
        self.episodes_run
    }

    /// Give back the agent and environment.
    pub fn into_parts(self) -> (DuelingDqnAgent, E) {
        (self.agent, self.env)
    }
}
