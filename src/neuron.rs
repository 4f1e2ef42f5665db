//! Single neuron: a weight vector plus bias.
use crate::activations::Activation;
use crate::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-width of the uniform interval new weights and biases are drawn from.
pub const INIT_RANGE: f64 = 0.05;

/// A neuron owned by a layer. The activation lives on the layer and is passed
/// in when firing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neuron {
    weights: Vec<f64>,
    bias: f64,
}

impl Neuron {
    /// Create a neuron with weights and bias drawn from `U(-0.05, 0.05)`.
    pub fn new<R: Rng + ?Sized>(input_count: usize, rng: &mut R) -> Self {
        let weights = (0..input_count)
            .map(|_| rng.gen_range(-INIT_RANGE..INIT_RANGE))
            .collect();
        let bias = rng.gen_range(-INIT_RANGE..INIT_RANGE);
        Self { weights, bias }
    }

    /// Create a neuron with explicit weights and bias.
    pub fn from_parts(weights: Vec<f64>, bias: f64) -> Self {
        Self { weights, bias }
    }

    pub fn input_count(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Pre-activation value `w·x + b`.
    pub fn weighted_sum(&self, inputs: &[f64]) -> Result<f64> {
        if inputs.len() != self.weights.len() {
            return Err(Error::length("neuron fire", inputs.len(), self.weights.len()));
        }
        Ok(self
            .weights
            .iter()
            .zip(inputs)
            .map(|(&w, &x)| w * x)
            .sum::<f64>()
            + self.bias)
    }

    /// `activation(w·x + b)`.
    pub fn fire(&self, inputs: &[f64], activation: &dyn Activation) -> Result<f64> {
        self.weighted_sum(inputs).map(|z| activation.apply(z))
    }

    /// Single-input firing used by input-layer neurons.
    pub fn fire_scalar(&self, input: f64, activation: &dyn Activation) -> Result<f64> {
        if self.weights.len() != 1 {
            return Err(Error::length("neuron fire_scalar", 1, self.weights.len()));
        }
        Ok(activation.apply(self.weights[0] * input + self.bias))
    }

    /// Weight at `index`; `index == input_count()` yields the bias.
    pub fn weight(&self, index: usize) -> Result<f64> {
        match index {
            i if i < self.weights.len() => Ok(self.weights[i]),
            i if i == self.weights.len() => Ok(self.bias),
            i => Err(Error::IndexOutOfRange {
                what: "weight",
                index: i,
                len: self.weights.len() + 1,
            }),
        }
    }

    /// Add `delta[i]` to each weight and the trailing element to the bias.
    pub fn update_weights(&mut self, delta: &[f64]) -> Result<()> {
        let (bias_delta, weight_delta) = self.split_row(delta, "neuron update_weights")?;
        for (w, &d) in self.weights.iter_mut().zip(weight_delta) {
            *w += d;
        }
        self.bias += bias_delta;
        Ok(())
    }

    /// Overwrite weights and bias (trailing element) in one step.
    pub fn set_weights(&mut self, values: &[f64]) -> Result<()> {
        let (bias, weights) = self.split_row(values, "neuron set_weights")?;
        self.weights.copy_from_slice(weights);
        self.bias = bias;
        Ok(())
    }

    fn split_row<'a>(&self, row: &'a [f64], context: &'static str) -> Result<(f64, &'a [f64])> {
        match row.split_last() {
            Some((&last, rest)) if rest.len() == self.weights.len() => Ok((last, rest)),
            _ => Err(Error::length(context, row.len(), self.weights.len() + 1)),
        }
    }
}

impl fmt::Display for Neuron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Number of inputs: {}", self.weights.len())
    }
}
