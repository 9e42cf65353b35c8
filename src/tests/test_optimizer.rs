use ndarray::array;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activations::Activation;
use crate::layers::{DenseLayer, WeightInit};
use crate::optimizer::{Adam, Optimizer, OptimizerConfig, OptimizerWrapper, SGD};

fn layers() -> Vec<DenseLayer> {
    let mut rng = StdRng::seed_from_u64(0);
    vec![DenseLayer::new(2, 2, Activation::Relu, WeightInit::FanInUniform, &mut rng)]
}

fn assert_close(actual: f32, expected: f32) {
    assert!((actual - expected).abs() < 1e-5, "{} != {}", actual, expected);
}

#[test]
fn test_sgd_update_weights() {
    let mut sgd = SGD::new();
    let mut weights = array![[1.0, 1.0], [1.0, 1.0]];
    let gradients = array![[0.1, 0.2], [0.3, 0.4]];

    sgd.update_weights(0, &mut weights, &gradients, 0.01);

    let expected = array![[0.999, 0.998], [0.997, 0.996]];
    for (w, e) in weights.iter().zip(expected.iter()) {
        assert_close(*w, *e);
    }
}

#[test]
fn test_sgd_update_biases() {
    let mut sgd = SGD::new();
    let mut biases = array![1.0, 1.0];
    let gradients = array![0.1, 0.2];

    sgd.update_biases(0, &mut biases, &gradients, 0.01);

    assert_close(biases[0], 0.999);
    assert_close(biases[1], 0.998);
}

#[test]
fn test_adam_new() {
    let layers = layers();
    let adam = Adam::new(&layers, 0.9, 0.999, 1e-8);

    assert_eq!(adam.beta1, 0.9);
    assert_eq!(adam.beta2, 0.999);
    assert_eq!(adam.epsilon, 1e-8);
    assert_eq!(adam.t, 1);
}

#[test]
fn test_adam_first_step_moves_by_learning_rate() {
    let layers = layers();
    let mut adam = Adam::with_defaults(&layers);

    let mut weights = array![[1.0, 1.0], [1.0, 1.0]];
    let gradients = array![[0.1, 0.2], [-0.3, 0.4]];
    adam.update_weights(0, &mut weights, &gradients, 0.01);

    // Bias-corrected moments make the first step ±lr regardless of magnitude.
    assert_close(weights[[0, 0]], 0.99);
    assert_close(weights[[0, 1]], 0.99);
    assert_close(weights[[1, 0]], 1.01);
    assert_close(weights[[1, 1]], 0.99);
}

#[test]
fn test_adam_step_advances_time() {
    let layers = layers();
    let mut adam = Adam::with_defaults(&layers);
    adam.step();
    adam.step();
    assert_eq!(adam.t, 3);
}

#[test]
fn test_adam_keeps_moments_per_layer() {
    let mut rng = StdRng::seed_from_u64(0);
    let layers = vec![
        DenseLayer::new(2, 3, Activation::Relu, WeightInit::FanInUniform, &mut rng),
        DenseLayer::new(3, 1, Activation::Linear, WeightInit::FanInUniform, &mut rng),
    ];
    let mut adam = Adam::with_defaults(&layers);

    let mut first = array![[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
    let mut second = array![[0.0], [0.0], [0.0]];
    adam.update_weights(0, &mut first, &array![[1.0, 1.0, 1.0], [1.0, 1.0, 1.0]], 0.1);
    adam.update_weights(1, &mut second, &array![[1.0], [1.0], [1.0]], 0.1);

    assert_close(first[[0, 0]], -0.1);
    assert_close(second[[2, 0]], -0.1);
}

#[test]
fn test_optimizer_config_builds_matching_wrapper() {
    let layers = layers();
    assert!(matches!(OptimizerConfig::Sgd.build(&layers), OptimizerWrapper::SGD(_)));
    match OptimizerConfig::default().build(&layers) {
        OptimizerWrapper::Adam(adam) => assert_eq!(adam.beta2, 0.999),
        other => panic!("expected Adam, got {:?}", other),
    }
}

#[test]
fn test_optimizer_config_json() {
    let config: OptimizerConfig =
        serde_json::from_str(r#"{ "kind": "adam", "beta1": 0.8, "beta2": 0.99, "epsilon": 1e-6 }"#).unwrap();
    assert_eq!(config, OptimizerConfig::Adam { beta1: 0.8, beta2: 0.99, epsilon: 1e-6 });

    let sgd: OptimizerConfig = serde_json::from_str(r#"{ "kind": "sgd" }"#).unwrap();
    assert_eq!(sgd, OptimizerConfig::Sgd);
}
