//! Activation functions.
//!
//! A neuron computes a pre-activation value `z = W x + bias` and applies an
//! activation function: `y = activation(z)`. The forward pass caches the
//! *post-activation* output `y` together with the derivative expressed in
//! terms of `y`, which is what backpropagation and the partial-derivative
//! sprawl consume.
//!
//! Both functions saturate explicitly for extreme arguments instead of
//! signaling overflow: presence/absence models occasionally push very large
//! negative sums through wide networks, and the saturated value is the
//! correct limit anyway.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Element-wise activation function.
pub enum Activation {
    /// Logistic sigmoid, the classic choice for presence/absence outputs.
    #[default]
    Sigmoid,
    Tanh,
}

impl Activation {
    #[inline]
    pub(crate) fn forward(self, x: f64) -> f64 {
        match self {
            // Saturates below -700 to avoid exp() overflow on large networks.
            Activation::Sigmoid => {
                if x < -700.0 {
                    1.0 / (1.0 + 700.0_f64.exp())
                } else {
                    1.0 / (1.0 + (-x).exp())
                }
            }
            Activation::Tanh => {
                if x > 20.0 {
                    1.0
                } else if x < -20.0 {
                    -1.0
                } else {
                    x.tanh()
                }
            }
        }
    }

    /// Derivative with respect to the pre-activation input, expressed in
    /// terms of the cached post-activation output `y`.
    #[inline]
    pub(crate) fn grad_from_output(self, y: f64) -> f64 {
        match self {
            Activation::Sigmoid => y * (1.0 - y),
            Activation::Tanh => 1.0 - y * y,
        }
    }
}
