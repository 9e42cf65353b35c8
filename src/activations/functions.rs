use ndarray::{Array2, ArrayView2};
use serde::{Serialize, Deserialize};

/// Activation functions available to the dense layers of a value network.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq)]
pub enum Activation {
    #[default]
    Relu,
    Linear,
    LeakyRelu { alpha: f32 },
    Tanh,
}

impl Activation {
    /// Apply the activation function to a batch of pre-activations in-place.
    pub fn apply_batch(&self, inputs: &mut Array2<f32>) {
        match self {
            Activation::Relu => {
                inputs.mapv_inplace(|v| v.max(0.0));
            }
            Activation::Linear => {}
            Activation::LeakyRelu { alpha } => {
                let a = *alpha;
                inputs.mapv_inplace(|v| if v > 0.0 { v } else { a * v });
            }
            Activation::Tanh => {
                inputs.mapv_inplace(|v| v.tanh());
            }
        }
    }

    /// Compute the element-wise derivative for a batch of pre-activations.
    pub fn derivative_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => {
                inputs.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
            }
            Activation::Linear => {
                Array2::ones(inputs.dim())
            }
            Activation::LeakyRelu { alpha } => {
                let a = *alpha;
                inputs.mapv(|v| if v > 0.0 { 1.0 } else { a })
            }
            Activation::Tanh => {
                inputs.mapv(|v| {
                    let t = v.tanh();
                    1.0 - t * t
                })
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Activation::Relu => "ReLU",
            Activation::Linear => "Linear",
            Activation::LeakyRelu { .. } => "LeakyReLU",
            Activation::Tanh => "Tanh",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_relu_and_derivative() {
        let mut x = array![[-1.0, 0.0, 2.0]];
        let deriv = Activation::Relu.derivative_batch(x.view());
        Activation::Relu.apply_batch(&mut x);
        assert_eq!(x, array![[0.0, 0.0, 2.0]]);
        assert_eq!(deriv, array![[0.0, 0.0, 1.0]]);
    }

    #[test]
    fn test_leaky_relu_keeps_negative_slope() {
        let act = Activation::LeakyRelu { alpha: 0.1 };
        let mut x = array![[-2.0, 3.0]];
        act.apply_batch(&mut x);
        assert!((x[[0, 0]] + 0.2).abs() < 1e-6);
        assert_eq!(x[[0, 1]], 3.0);
        assert_eq!(act.name(), "LeakyReLU");
    }
}
