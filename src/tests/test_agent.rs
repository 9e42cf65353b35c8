use ndarray::{array, Array1};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activations::Activation;
use crate::agent::{double_dqn_targets, DuelingDqnAgent};
use crate::config::AgentConfig;
use crate::error::JunctionError;
use crate::network::{argmax, DuelingNetwork};
use crate::replay_buffer::{Transition, TransitionBatch};

fn small_config() -> AgentConfig {
    AgentConfig::new(2, 3)
        .with_hidden_layer_sizes(&[8])
        .with_batch_size(4)
        .with_replay_capacity(32)
        .with_update_every(2)
        .with_seed(3)
}

fn state(i: usize) -> Array1<f32> {
    array![i as f32 * 0.1, 1.0 - i as f32 * 0.1]
}

fn observe(agent: &mut DuelingDqnAgent, i: usize, done: bool) -> Option<crate::agent::LearnReport> {
    agent
        .observe_transition(state(i), i % 3, i as f32 - 2.0, state(i + 1), done)
        .unwrap()
}

#[test]
fn test_act_rejects_invalid_input() {
    let mut agent = DuelingDqnAgent::new(small_config()).unwrap();
    let s = state(0);

    assert!(matches!(agent.act(s.view(), -0.1), Err(JunctionError::InvalidParameter { .. })));
    assert!(matches!(agent.act(s.view(), 1.5), Err(JunctionError::InvalidParameter { .. })));
    assert!(agent.act(s.view(), f32::NAN).is_err());
    assert!(matches!(
        agent.act(array![1.0, 2.0, 3.0].view(), 0.0),
        Err(JunctionError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_act_with_zero_epsilon_is_greedy() {
    let mut agent = DuelingDqnAgent::new(small_config()).unwrap();
    for i in 0..10 {
        let s = state(i);
        let expected = argmax(agent.q_values(s.view()).unwrap().view());
        assert_eq!(agent.act(s.view(), 0.0).unwrap(), expected);
        assert_eq!(agent.greedy_action(s.view()).unwrap(), expected);
    }
}

#[test]
fn test_act_with_full_exploration_covers_every_action() {
    let mut agent = DuelingDqnAgent::new(small_config()).unwrap();
    let mut seen = [false; 3];
    for _ in 0..200 {
        let action = agent.act(state(0).view(), 1.0).unwrap();
        seen[action] = true;
    }
    assert!(seen.iter().all(|&s| s));
}

#[test]
fn test_act_does_not_advance_counters() {
    let mut agent = DuelingDqnAgent::new(small_config()).unwrap();
    observe(&mut agent, 0, false);
    assert_eq!(agent.t_step(), 1);

    for _ in 0..5 {
        agent.act(state(1).view(), 0.5).unwrap();
    }
    assert_eq!(agent.t_step(), 1);
    assert_eq!(agent.memory().len(), 1);
}

#[test]
fn test_same_seed_gives_same_actions() {
    let mut a = DuelingDqnAgent::new(small_config()).unwrap();
    let mut b = DuelingDqnAgent::new(small_config()).unwrap();
    for i in 0..20 {
        let s = state(i);
        assert_eq!(a.act(s.view(), 0.5).unwrap(), b.act(s.view(), 0.5).unwrap());
    }
}

#[test]
fn test_learning_follows_cadence_and_batch_gate() {
    let mut agent = DuelingDqnAgent::new(small_config()).unwrap();

    // Ticks at steps 2 and 4; only the second has a full batch.
    assert!(observe(&mut agent, 0, false).is_none());
    assert!(observe(&mut agent, 1, false).is_none());
    assert_eq!(agent.t_step(), 0);
    assert!(observe(&mut agent, 2, false).is_none());
    let report = observe(&mut agent, 3, false).expect("learning step on the fourth transition");
    assert_eq!(report.indices.len(), 4);
    assert!(report.loss.is_finite());
    assert_eq!(agent.learn_steps(), 1);

    assert!(observe(&mut agent, 4, false).is_none());
    assert!(observe(&mut agent, 5, false).is_some());
    assert_eq!(agent.learn_steps(), 2);
}

#[test]
fn test_learn_skips_without_a_full_batch() {
    let mut agent = DuelingDqnAgent::new(small_config()).unwrap();
    observe(&mut agent, 0, false);
    let before = agent.online_network().clone();

    assert!(agent.learn().unwrap().is_none());
    assert_eq!(agent.learn_steps(), 0);
    assert_eq!(agent.online_network().value_head.weights, before.value_head.weights);
}

#[test]
fn test_observe_rejects_invalid_transitions() {
    let mut agent = DuelingDqnAgent::new(small_config()).unwrap();

    assert!(matches!(
        agent.observe_transition(state(0), 3, 0.0, state(1), false),
        Err(JunctionError::InvalidAction { action: 3, action_size: 3 })
    ));
    assert!(agent.observe_transition(state(0), 0, f32::NAN, state(1), false).is_err());
    assert!(matches!(
        agent.observe_transition(state(0), 0, 0.0, array![1.0], false),
        Err(JunctionError::DimensionMismatch { .. })
    ));

    assert_eq!(agent.memory().len(), 0);
    assert_eq!(agent.t_step(), 0);
}

#[test]
fn test_identical_networks_give_vanilla_targets() {
    let agent = DuelingDqnAgent::new(small_config()).unwrap();
    let online = agent.online_network();
    let target = agent.target_network();

    let transitions: Vec<Transition> = (0..4)
        .map(|i| Transition {
            state: state(i),
            action: i % 3,
            reward: i as f32,
            next_state: state(i + 1),
            done: false,
        })
        .collect();
    let refs: Vec<&Transition> = transitions.iter().collect();
    let batch = TransitionBatch::from_transitions(&refs).unwrap();

    let targets = double_dqn_targets(online, target, &batch, 0.9);
    for (i, t) in transitions.iter().enumerate() {
        let next = target.predict(t.next_state.view());
        let vanilla = t.reward + 0.9 * next.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        assert!((targets[i] - vanilla).abs() < 1e-5);
    }
}

#[test]
fn test_online_selects_and_target_evaluates() {
    let mut rng = StdRng::seed_from_u64(21);
    let online = DuelingNetwork::new(2, &[6], 3, Activation::Relu, &mut rng);
    let target = DuelingNetwork::new(2, &[6], 3, Activation::Relu, &mut rng);

    let transition = Transition {
        state: state(1),
        action: 0,
        reward: 0.5,
        next_state: array![0.7, -0.3],
        done: false,
    };
    let batch = TransitionBatch::from_transitions(&[&transition]).unwrap();
    let targets = double_dqn_targets(&online, &target, &batch, 0.95);

    let chosen = argmax(online.predict(transition.next_state.view()).view());
    let expected = 0.5 + 0.95 * target.predict(transition.next_state.view())[chosen];
    assert!((targets[0] - expected).abs() < 1e-5);
}

#[test]
fn test_terminal_transitions_suppress_bootstrap() {
    let mut rng = StdRng::seed_from_u64(4);
    let online = DuelingNetwork::new(2, &[6], 3, Activation::Relu, &mut rng);
    let mut target = online.clone();
    for layer in target.layers_mut() {
        layer.weights.fill(1e6);
    }

    let transition = Transition {
        state: state(0),
        action: 1,
        reward: -3.25,
        next_state: array![5.0, 5.0],
        done: true,
    };
    let batch = TransitionBatch::from_transitions(&[&transition]).unwrap();
    assert_eq!(double_dqn_targets(&online, &target, &batch, 0.99)[0], -3.25);
}

#[test]
fn test_capacity_five_end_to_end() {
    let config = AgentConfig::new(2, 3)
        .with_hidden_layer_sizes(&[8])
        .with_replay_capacity(5)
        .with_batch_size(5)
        .with_discount_factor(0.9)
        .with_soft_update_rate(1e-3)
        .with_update_every(5)
        .with_seed(11);
    let mut agent = DuelingDqnAgent::new(config).unwrap();
    let initial = agent.online_network().clone();

    for i in 0..4 {
        assert!(observe(&mut agent, i, false).is_none());
    }
    let report = observe(&mut agent, 4, true).expect("learning step on the fifth transition");
    assert_eq!(agent.memory().len(), 5);

    // Targets and TD errors were computed with the pre-update networks,
    // which were still identical.
    let stored: Vec<&Transition> = agent.memory().iter().map(|(_, t, _)| t).collect();
    let all = TransitionBatch::from_transitions(&stored).unwrap();
    let expected_all = double_dqn_targets(&initial, &initial, &all, 0.9);
    assert_eq!(expected_all[4], 2.0);

    for (k, &index) in report.indices.iter().enumerate() {
        let transition = agent.memory().get(index).unwrap();
        let row = TransitionBatch::from_transitions(&[transition]).unwrap();
        let expected = double_dqn_targets(&initial, &initial, &row, 0.9)[0];
        assert!((report.targets[k] - expected).abs() < 1e-5);
        if transition.done {
            assert_eq!(report.targets[k], transition.reward);
        }

        let q = initial.predict(transition.state.view())[transition.action];
        assert!((report.td_errors[k] - (expected - q)).abs() < 1e-5);

        let priority = agent.memory().priority(index).unwrap();
        assert!((priority - (report.td_errors[k].abs() + 1e-5)).abs() < 1e-5);
    }
    assert!(agent.memory().iter().all(|(_, _, p)| p > 0.0));

    // θ_target ← τ·θ_online + (1 − τ)·θ_target with θ_target = θ_initial.
    let online = agent.online_network().value_head.weights[[0, 0]];
    let before = initial.value_head.weights[[0, 0]];
    let after = agent.target_network().value_head.weights[[0, 0]];
    assert!((after - (1e-3 * online + 0.999 * before)).abs() < 1e-6);
}

#[test]
fn test_divergence_is_reported() {
    let mut agent = DuelingDqnAgent::new(small_config()).unwrap();
    agent.online_network_mut().advantage_head.biases[0] = f32::NAN;

    for i in 0..3 {
        observe(&mut agent, i, false);
    }
    let result = agent.observe_transition(state(3), 0, 1.0, state(4), false);
    assert!(matches!(result, Err(JunctionError::Divergence(_))));
}

#[test]
fn test_greedy_action_reports_non_finite_values() {
    let mut agent = DuelingDqnAgent::new(small_config()).unwrap();
    agent.online_network_mut().value_head.biases[0] = f32::NAN;

    assert!(matches!(agent.act(state(0).view(), 0.0), Err(JunctionError::Divergence(_))));
    assert!(matches!(agent.greedy_action(state(0).view()), Err(JunctionError::Divergence(_))));
}

#[test]
fn test_soft_update_bounds_and_copy() {
    let mut agent = DuelingDqnAgent::new(small_config()).unwrap();
    assert!(agent.soft_update(1.5).is_err());

    agent.online_network_mut().value_head.weights.fill(0.25);
    agent.soft_update(1.0).unwrap();
    assert!(agent.target_network().value_head.weights.iter().all(|&w| w == 0.25));
}

#[test]
fn test_save_and_load_weights() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.bin");

    let agent = DuelingDqnAgent::new(small_config()).unwrap();
    agent.save_weights(&path).unwrap();

    let mut restored = DuelingDqnAgent::new(small_config().with_seed(99)).unwrap();
    restored.load_weights(&path).unwrap();
    let s = state(2);
    assert_eq!(agent.q_values(s.view()).unwrap(), restored.q_values(s.view()).unwrap());
    assert_eq!(
        restored.target_network().advantage_head.weights,
        restored.online_network().advantage_head.weights
    );

    let mut wider = DuelingDqnAgent::new(AgentConfig::new(4, 3).with_hidden_layer_sizes(&[8])).unwrap();
    assert!(matches!(wider.load_weights(&path), Err(JunctionError::DimensionMismatch { .. })));

    let mut deeper = DuelingDqnAgent::new(small_config().with_hidden_layer_sizes(&[8, 8])).unwrap();
    assert!(deeper.load_weights(&path).is_err());
}

#[test]
fn test_invalid_config_is_rejected() {
    assert!(DuelingDqnAgent::new(AgentConfig::new(0, 3)).is_err());
    assert!(DuelingDqnAgent::new(small_config().with_replay_capacity(2)).is_err());
}
