//! # Activation Functions Module
//!
//! Non-linearities for the dense layers of the value network.
//!
//! - **ReLU**: `max(0, x)`, the default for the shared trunk
//! - **Linear**: identity, used by the value and advantage heads
//! - **LeakyReLU**: ReLU with a small negative slope
//! - **Tanh**: hyperbolic tangent, outputs between -1 and 1

pub mod functions;

pub use functions::Activation;
