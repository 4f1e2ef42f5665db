//! Input and hidden layers: ordered neurons sharing one activation function.
use crate::activations::{linear, Activation, ActivationRef};
use crate::error::{Error, Result};
use crate::neuron::Neuron;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Matrix type, one row per neuron
pub type Matrix = Vec<Vec<f64>>;

/// Position-dependent propagation rule of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Identity pass-through, one scalar per neuron.
    Input,
    /// Fully connected to the previous layer. The output layer is a hidden
    /// layer in last position.
    Hidden,
}

/// A layer of neurons. All neurons share `activation` and input width.
#[derive(Debug, Clone)]
pub struct Layer {
    kind: LayerKind,
    neurons: Vec<Neuron>,
    activation: ActivationRef,
}

impl Layer {
    /// Input layer of `input_count` neurons wired to weight 1, bias 0 under a
    /// linear activation.
    pub fn input(input_count: usize) -> Self {
        let neurons = (0..input_count)
            .map(|_| Neuron::from_parts(vec![1.0], 0.0))
            .collect();
        Self {
            kind: LayerKind::Input,
            neurons,
            activation: linear(),
        }
    }

    /// Hidden layer with randomly initialized neurons.
    pub fn hidden<R: Rng + ?Sized>(
        input_count: usize,
        neuron_count: usize,
        activation: ActivationRef,
        rng: &mut R,
    ) -> Self {
        let neurons = (0..neuron_count)
            .map(|_| Neuron::new(input_count, &mut *rng))
            .collect();
        Self {
            kind: LayerKind::Hidden,
            neurons,
            activation,
        }
    }

    /// Rebuild a layer from stored neurons, checking that their widths agree.
    pub fn from_neurons(
        kind: LayerKind,
        neurons: Vec<Neuron>,
        activation: ActivationRef,
    ) -> Result<Self> {
        let width = match neurons.first() {
            Some(n) => n.input_count(),
            None => return Err(Error::invalid("layer", "a layer needs at least one neuron")),
        };
        if let Some(n) = neurons.iter().find(|n| n.input_count() != width) {
            return Err(Error::length("layer neuron width", n.input_count(), width));
        }
        if kind == LayerKind::Input && width != 1 {
            return Err(Error::length("input neuron width", width, 1));
        }
        Ok(Self {
            kind,
            neurons,
            activation,
        })
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn activation(&self) -> &ActivationRef {
        &self.activation
    }

    pub fn neuron_count(&self) -> usize {
        self.neurons.len()
    }

    /// Width every neuron expects; 1 for input layers.
    pub fn input_count(&self) -> usize {
        self.neurons.first().map_or(0, Neuron::input_count)
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn neuron(&self, index: usize) -> Result<&Neuron> {
        self.neurons.get(index).ok_or(Error::IndexOutOfRange {
            what: "neuron",
            index,
            len: self.neurons.len(),
        })
    }

    /// Mutable access, used to hard-wire weights in tests and tools.
    pub fn neuron_mut(&mut self, index: usize) -> Result<&mut Neuron> {
        let len = self.neurons.len();
        self.neurons.get_mut(index).ok_or(Error::IndexOutOfRange {
            what: "neuron",
            index,
            len,
        })
    }

    /// Forward pass: pre-activations `z` and activations `a = act(z)`.
    pub fn forward(&self, input: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
        let z: Vec<f64> = match self.kind {
            LayerKind::Input => {
                if input.len() != self.neurons.len() {
                    return Err(Error::length("input layer", input.len(), self.neurons.len()));
                }
                self.neurons
                    .iter()
                    .zip(input)
                    .map(|(n, &x)| n.weight(0).map(|w| w * x + n.bias()))
                    .collect::<Result<_>>()?
            }
            LayerKind::Hidden => {
                if input.len() != self.input_count() {
                    return Err(Error::length("hidden layer", input.len(), self.input_count()));
                }
                self.neurons
                    .iter()
                    .map(|n| n.weighted_sum(input))
                    .collect::<Result<_>>()?
            }
        };
        let a = z.iter().map(|&v| self.activation.apply(v)).collect();
        Ok((z, a))
    }

    /// Output of every neuron for `input`.
    pub fn propagate(&self, input: &[f64]) -> Result<Vec<f64>> {
        let act = self.activation.as_ref();
        match self.kind {
            LayerKind::Input => {
                if input.len() != self.neurons.len() {
                    return Err(Error::length("input layer", input.len(), self.neurons.len()));
                }
                self.neurons
                    .iter()
                    .zip(input)
                    .map(|(n, &x)| n.fire_scalar(x, act))
                    .collect()
            }
            LayerKind::Hidden => self.neurons.iter().map(|n| n.fire(input, act)).collect(),
        }
    }

    /// Apply one delta row per neuron (weights then bias). Every row is
    /// checked before any neuron changes.
    pub fn update_layer_weights(&mut self, delta: &[Vec<f64>]) -> Result<()> {
        if delta.len() != self.neurons.len() {
            return Err(Error::length("layer weight update", delta.len(), self.neurons.len()));
        }
        let width = self.input_count() + 1;
        if let Some(row) = delta.iter().find(|row| row.len() != width) {
            return Err(Error::length("layer weight update row", row.len(), width));
        }
        for (neuron, row) in self.neurons.iter_mut().zip(delta) {
            neuron.update_weights(row)?;
        }
        Ok(())
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            LayerKind::Input => "input",
            LayerKind::Hidden => "hidden",
        };
        write!(
            f,
            "Number of neurons: {} type: {} activation: {}",
            self.neurons.len(),
            kind,
            self.activation.name()
        )
    }
}
