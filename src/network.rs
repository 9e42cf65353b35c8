use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};
use std::fs;
use std::path::Path;
use bincode::{serialize, deserialize};

use crate::activations::Activation;
use crate::error::{JunctionError, Result};
use crate::layers::{DenseLayer, WeightInit};
use crate::optimizer::{Optimizer, OptimizerWrapper};

/// Weight and bias gradients for one dense layer.
pub type LayerGradients = (Array2<f32>, Array1<f32>);

/// Combine the two dueling streams into action values.
///
/// `value` has shape `(batch, 1)` and `advantage` has shape `(batch, actions)`.
/// Each row becomes `V(s) + (A(s, a) − mean_a' A(s, a'))`.
pub fn combine_streams(value: ArrayView2<f32>, advantage: ArrayView2<f32>) -> Array2<f32> {
    let mean = advantage
        .mean_axis(Axis(1))
        .unwrap_or_else(|| Array1::zeros(advantage.nrows()))
        .insert_axis(Axis(1));
    &advantage - &mean + &value
}

/// Index of the largest value in `values`; ties resolve to the lowest index.
pub fn argmax(values: ArrayView1<f32>) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best_idx, best), (idx, &v)| {
            if v > best { (idx, v) } else { (best_idx, best) }
        })
        .0
}

/// Dueling action-value network.
///
/// A shared trunk of dense layers feeds two linear heads: a scalar state-value
/// head and a per-action advantage head. Their outputs are merged with
/// [`combine_streams`].
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DuelingNetwork {
    pub trunk: Vec<DenseLayer>,
    pub value_head: DenseLayer,
    pub advantage_head: DenseLayer,
}

impl DuelingNetwork {
    /// Build a network with `hidden_sizes` trunk layers using `activation`,
    /// drawing initial parameters from `rng`.
    pub fn new<R: Rng + ?Sized>(
        state_size: usize,
        hidden_sizes: &[usize],
        action_size: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let hidden_init = WeightInit::FanInUniform;
        let head_init = WeightInit::for_activation(&Activation::Linear);

        let mut trunk = Vec::with_capacity(hidden_sizes.len());
        let mut input_size = state_size;
        for &size in hidden_sizes {
            trunk.push(DenseLayer::new(input_size, size, activation, hidden_init, rng));
            input_size = size;
        }

        let value_head = DenseLayer::new(input_size, 1, Activation::Linear, head_init, rng);
        let advantage_head = DenseLayer::new(input_size, action_size, Activation::Linear, head_init, rng);

        DuelingNetwork { trunk, value_head, advantage_head }
    }

    pub fn state_size(&self) -> usize {
        self.trunk
            .first()
            .map(DenseLayer::input_size)
            .unwrap_or_else(|| self.value_head.input_size())
    }

    pub fn action_size(&self) -> usize {
        self.advantage_head.output_size()
    }

    /// All layers in parameter order: trunk, value head, advantage head.
    pub fn layers(&self) -> impl Iterator<Item = &DenseLayer> {
        self.trunk
            .iter()
            .chain(std::iter::once(&self.value_head))
            .chain(std::iter::once(&self.advantage_head))
    }

    pub fn layers_mut(&mut self) -> impl Iterator<Item = &mut DenseLayer> {
        self.trunk
            .iter_mut()
            .chain(std::iter::once(&mut self.value_head))
            .chain(std::iter::once(&mut self.advantage_head))
    }

    pub fn layer_count(&self) -> usize {
        self.trunk.len() + 2
    }

    /// Action values for a single state.
    pub fn predict(&self, state: ArrayView1<f32>) -> Array1<f32> {
        let output = self.predict_batch(state.insert_axis(Axis(0)));
        output.row(0).to_owned()
    }

    /// Action values for a batch of states, one row per state.
    /// Pure evaluation: no layer caches are touched.
    pub fn predict_batch(&self, states: ArrayView2<f32>) -> Array2<f32> {
        let mut features = states.to_owned();
        for layer in &self.trunk {
            features = layer.predict_batch(features.view());
        }
        let value = self.value_head.predict_batch(features.view());
        let advantage = self.advantage_head.predict_batch(features.view());
        combine_streams(value.view(), advantage.view())
    }

    /// Training forward pass. Caches intermediate values for `backward_batch`.
    pub fn forward_batch(&mut self, states: ArrayView2<f32>) -> Array2<f32> {
        let mut features = states.to_owned();
        for layer in &mut self.trunk {
            features = layer.forward_batch(features.view());
        }
        let value = self.value_head.forward_batch(features.view());
        let advantage = self.advantage_head.forward_batch(features.view());
        combine_streams(value.view(), advantage.view())
    }

    /// Backpropagate `dL/dQ` (shape `(batch, actions)`) through the dueling
    /// combination and every layer. Gradients are returned in `layers()` order.
    pub fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Result<Vec<LayerGradients>> {
        if output_errors.ncols() != self.action_size() {
            return Err(JunctionError::dimension_mismatch(
                format!("{} output columns", self.action_size()),
                format!("{}", output_errors.ncols()),
            ));
        }

        // Q = V + A - mean(A): every action value depends on V with weight 1,
        // and on A through the centering matrix.
        let value_error = output_errors.sum_axis(Axis(1)).insert_axis(Axis(1));
        let error_mean = output_errors
            .mean_axis(Axis(1))
            .unwrap_or_else(|| Array1::zeros(output_errors.nrows()))
            .insert_axis(Axis(1));
        let advantage_error = &output_errors - &error_mean;

        let (value_adjusted, value_wg, value_bg) = self.value_head.backward_batch(value_error.view())?;
        let (adv_adjusted, adv_wg, adv_bg) = self.advantage_head.backward_batch(advantage_error.view())?;

        let mut current_error = value_adjusted.dot(&self.value_head.weights.t())
            + adv_adjusted.dot(&self.advantage_head.weights.t());

        let mut trunk_gradients = Vec::with_capacity(self.trunk.len());
        for (i, layer) in self.trunk.iter().enumerate().rev() {
            let (adjusted_error, weight_gradients, bias_gradients) = layer.backward_batch(current_error.view())?;
            trunk_gradients.push((weight_gradients, bias_gradients));
            if i != 0 {
                current_error = adjusted_error.dot(&layer.weights.t());
            }
        }
        trunk_gradients.reverse();

        trunk_gradients.push((value_wg, value_bg));
        trunk_gradients.push((adv_wg, adv_bg));
        Ok(trunk_gradients)
    }

    /// Apply per-layer gradients with the optimizer.
    pub fn apply_gradients(
        &mut self,
        gradients: &[LayerGradients],
        optimizer: &mut OptimizerWrapper,
        learning_rate: f32,
    ) -> Result<()> {
        if gradients.len() != self.layer_count() {
            return Err(JunctionError::dimension_mismatch(
                format!("{} layer gradients", self.layer_count()),
                format!("{}", gradients.len()),
            ));
        }
        for (index, (layer, (weight_gradients, bias_gradients))) in self.layers_mut().zip(gradients).enumerate() {
            optimizer.update_weights(index, &mut layer.weights, weight_gradients, learning_rate);
            optimizer.update_biases(index, &mut layer.biases, bias_gradients, learning_rate);
        }
        optimizer.step();
        Ok(())
    }

    /// Interpolate every parameter toward `source`: `θ ← τ·θ_source + (1 − τ)·θ`.
    pub fn soft_update_from(&mut self, source: &DuelingNetwork, tau: f32) -> Result<()> {
        if self.layer_count() != source.layer_count()
            || self.layers().zip(source.layers()).any(|(a, b)| a.weights.dim() != b.weights.dim())
        {
            return Err(JunctionError::dimension_mismatch(
                "networks with identical structure",
                "differently shaped networks",
            ));
        }
        for (target, online) in self.layers_mut().zip(source.layers()) {
            target.soft_update_from(online, tau);
        }
        Ok(())
    }

    pub fn is_finite(&self) -> bool {
        self.layers().all(DenseLayer::is_finite)
    }

    /// Save the network parameters to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serialize(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Load network parameters from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let buffer = fs::read(path)?;
        let network: Self = deserialize(&buffer)?;
        Ok(network)
    }
}
