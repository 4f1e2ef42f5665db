//! Multilayer perceptron: topology, forward propagation and persistence.
//!
//! Training lives in [`crate::training`].
use crate::activations::{sigmoid, Activation, ActivationKind, ActivationRef};
use crate::error::{Error, Result};
use crate::layers::{Layer, LayerKind};
use crate::neuron::Neuron;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// A feed-forward network. `layers[0]` is the input layer, the last layer is
/// the output layer and everything in between is hidden.
#[derive(Debug, Clone)]
pub struct Network {
    /// Number of input features.
    input_count: usize,
    /// Number of outputs.
    output_count: usize,
    /// Activation given to layers created by [`Network::add_hidden_layer`].
    activation: ActivationRef,
    pub(crate) layers: Vec<Layer>,
    rng: StdRng,
}

impl Network {
    /// Input and output layers only, sigmoid activation.
    pub fn new(input_count: usize, output_count: usize) -> Result<Self> {
        Self::with_activation(input_count, output_count, sigmoid())
    }

    /// Input and output layers only, `activation` for the output layer and
    /// every hidden layer added later.
    pub fn with_activation(
        input_count: usize,
        output_count: usize,
        activation: ActivationRef,
    ) -> Result<Self> {
        Self::build(input_count, output_count, activation, StdRng::from_entropy())
    }

    /// Like [`Network::with_activation`] with reproducible initial weights.
    pub fn with_seed(
        input_count: usize,
        output_count: usize,
        activation: ActivationRef,
        seed: u64,
    ) -> Result<Self> {
        Self::build(input_count, output_count, activation, StdRng::seed_from_u64(seed))
    }

    fn build(
        input_count: usize,
        output_count: usize,
        activation: ActivationRef,
        mut rng: StdRng,
    ) -> Result<Self> {
        if input_count == 0 || output_count == 0 {
            return Err(Error::invalid(
                "network",
                format!("needs at least one input and one output, got {input_count}x{output_count}"),
            ));
        }
        let layers = vec![
            Layer::input(input_count),
            Layer::hidden(input_count, output_count, activation.clone(), &mut rng),
        ];
        Ok(Self {
            input_count,
            output_count,
            activation,
            layers,
            rng,
        })
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    pub fn activation(&self) -> &ActivationRef {
        &self.activation
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Result<&Layer> {
        self.layers.get(index).ok_or(Error::IndexOutOfRange {
            what: "layer",
            index,
            len: self.layers.len(),
        })
    }

    /// Mutable access to a hidden or output layer. Layer widths cannot
    /// change through it, so the topology invariants hold; only weights can
    /// be rewritten. The input layer's identity wiring is fixed.
    pub fn layer_mut(&mut self, index: usize) -> Result<&mut Layer> {
        if index == 0 {
            return Err(Error::invalid("layer_mut", "the input layer cannot be rewired"));
        }
        let len = self.layers.len();
        self.layers.get_mut(index).ok_or(Error::IndexOutOfRange {
            what: "layer",
            index,
            len,
        })
    }

    pub fn output_layer(&self) -> &Layer {
        &self.layers[self.layers.len() - 1]
    }

    /// Insert a hidden layer of `neuron_count` neurons using the network's
    /// activation. See [`Network::grow_before_output`].
    pub fn add_hidden_layer(&mut self, neuron_count: usize) -> Result<()> {
        let activation = self.activation.clone();
        self.add_hidden_layer_with(neuron_count, activation)
    }

    /// Insert a hidden layer of `neuron_count` neurons with its own activation.
    pub fn add_hidden_layer_with(
        &mut self,
        neuron_count: usize,
        activation: ActivationRef,
    ) -> Result<()> {
        if neuron_count == 0 {
            return Err(Error::invalid("add hidden layer", "neuron count must be positive"));
        }
        let width = self.layers[self.layers.len() - 2].neuron_count();
        let layer = Layer::hidden(width, neuron_count, activation, &mut self.rng);
        self.grow_before_output(layer)
    }

    /// Insert `layer` right before the output layer and rebuild the output
    /// layer so it takes `layer.neuron_count()` inputs.
    ///
    /// The output layer is recreated with fresh random weights: whatever it
    /// had learned is discarded. Fails if `layer` is not a hidden layer or its
    /// input width differs from the layer it would follow.
    pub fn grow_before_output(&mut self, layer: Layer) -> Result<()> {
        if layer.kind() != LayerKind::Hidden {
            return Err(Error::invalid("grow before output", "only hidden layers can be inserted"));
        }
        let out = self.layers.len() - 1;
        let width = self.layers[out - 1].neuron_count();
        if layer.input_count() != width {
            return Err(Error::length("grow before output", layer.input_count(), width));
        }
        let output_activation = self.layers[out].activation().clone();
        let output = Layer::hidden(
            layer.neuron_count(),
            self.output_count,
            output_activation,
            &mut self.rng,
        );
        log::debug!(
            "inserting hidden layer of {} neurons at position {out}, output layer rebuilt",
            layer.neuron_count()
        );
        self.layers.insert(out, layer);
        self.layers[out + 1] = output;
        Ok(())
    }

    /// Forward pass from input to output. The output layer's values are
    /// returned as-is, without normalization.
    pub fn classify(&self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() != self.input_count {
            return Err(Error::length("classify", input.len(), self.input_count));
        }
        let mut current = input.to_vec();
        for layer in &self.layers {
            current = layer.propagate(&current)?;
        }
        Ok(current)
    }

    /// Rows are `[inputs.., targets..]`.
    pub(crate) fn check_row(&self, row: &[f64], context: &'static str) -> Result<()> {
        let expected = self.input_count + self.output_count;
        if row.len() != expected {
            return Err(Error::length(context, row.len(), expected));
        }
        Ok(())
    }

    /// Save model to .pere (gzipped JSON).
    pub fn save_pere(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dto = NetworkDto::from_network(self);
        let json = serde_json::to_vec(&dto)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let mut enc = GzEncoder::new(file, Compression::default());
        enc.write_all(&json)?;
        enc.finish()?;
        Ok(())
    }

    /// Load model from .pere (gzipped JSON). Every topology invariant is
    /// checked again.
    pub fn load_pere(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let mut dec = GzDecoder::new(file);
        let mut buf = Vec::new();
        dec.read_to_end(&mut buf)?;
        let dto: NetworkDto = serde_json::from_slice(&buf)?;
        dto.into_network()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Network has {} layers", self.layers.len())?;
        for layer in &self.layers {
            write!(f, "\n{layer}")?;
        }
        Ok(())
    }
}

// ============ Persistence DTOs ============

#[derive(Debug, Serialize, Deserialize)]
struct LayerDto {
    kind: LayerKind,
    activation: ActivationKind,
    neurons: Vec<Neuron>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NetworkDto {
    input_count: usize,
    output_count: usize,
    activation: ActivationKind,
    layers: Vec<LayerDto>,
}

impl NetworkDto {
    fn from_network(net: &Network) -> Self {
        // JSON has no NaN or infinity
        fn sanitize(x: f64) -> f64 {
            if x.is_finite() {
                x
            } else {
                0.0
            }
        }
        let layers = net
            .layers
            .iter()
            .map(|layer| LayerDto {
                kind: layer.kind(),
                activation: layer.activation().kind(),
                neurons: layer
                    .neurons()
                    .iter()
                    .map(|n| {
                        Neuron::from_parts(
                            n.weights().iter().copied().map(sanitize).collect(),
                            sanitize(n.bias()),
                        )
                    })
                    .collect(),
            })
            .collect();
        Self {
            input_count: net.input_count,
            output_count: net.output_count,
            activation: net.activation.kind(),
            layers,
        }
    }

    fn into_network(self) -> Result<Network> {
        const CONTEXT: &str = "stored network";
        if self.layers.len() < 2 {
            return Err(Error::invalid(CONTEXT, "needs an input and an output layer"));
        }
        let mut layers: Vec<Layer> = Vec::with_capacity(self.layers.len());
        for (i, ld) in self.layers.into_iter().enumerate() {
            let expected_kind = if i == 0 { LayerKind::Input } else { LayerKind::Hidden };
            if ld.kind != expected_kind {
                return Err(Error::invalid(CONTEXT, format!("layer {i} has kind {:?}", ld.kind)));
            }
            let layer = Layer::from_neurons(ld.kind, ld.neurons, ld.activation.to_arc())?;
            if i == 0 && !is_identity_input(&layer) {
                return Err(Error::invalid(CONTEXT, "input layer must pass its values through"));
            }
            let expected_width = match layers.last() {
                Some(prev) => prev.neuron_count(),
                None => 1,
            };
            if layer.input_count() != expected_width {
                return Err(Error::length(CONTEXT, layer.input_count(), expected_width));
            }
            layers.push(layer);
        }
        if layers[0].neuron_count() != self.input_count {
            return Err(Error::length(CONTEXT, layers[0].neuron_count(), self.input_count));
        }
        let output_width = layers[layers.len() - 1].neuron_count();
        if output_width != self.output_count {
            return Err(Error::length(CONTEXT, output_width, self.output_count));
        }
        Ok(Network {
            input_count: self.input_count,
            output_count: self.output_count,
            activation: self.activation.to_arc(),
            layers,
            rng: StdRng::from_entropy(),
        })
    }
}

/// Weight 1, bias 0 and a linear activation on every input neuron.
fn is_identity_input(layer: &Layer) -> bool {
    layer.activation().kind() == ActivationKind::Linear
        && layer
            .neurons()
            .iter()
            .all(|n| n.weights() == [1.0] && n.bias() == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activations::rectifier;

    fn net(i: usize, o: usize) -> Network {
        Network::with_seed(i, o, sigmoid(), 3).unwrap()
    }

    #[test]
    fn new_network_has_input_and_output() {
        let n = net(3, 2);
        assert_eq!(n.layer_count(), 2);
        assert_eq!(n.layer(0).unwrap().kind(), LayerKind::Input);
        assert_eq!(n.layer(0).unwrap().neuron_count(), 3);
        assert_eq!(n.output_layer().neuron_count(), 2);
        assert_eq!(n.output_layer().input_count(), 3);
        assert!(n.layer(2).unwrap_err().is_index_out_of_range());
    }

    #[test]
    fn zero_sized_networks_are_rejected() {
        assert!(Network::new(0, 1).unwrap_err().is_invalid_input());
        assert!(Network::new(1, 0).unwrap_err().is_invalid_input());
    }

    #[test]
    fn fixed_weights_classify_to_sigmoid_zero() {
        let mut n = net(2, 1);
        n.layer_mut(1).unwrap().neuron_mut(0).unwrap().set_weights(&[0.5, -0.5, 0.0]).unwrap();
        assert_eq!(n.classify(&[1.0, 1.0]).unwrap(), vec![0.5]);
    }

    #[test]
    fn classify_rejects_wrong_width() {
        assert!(net(2, 1).classify(&[1.0]).unwrap_err().is_invalid_input());
    }

    #[test]
    fn add_hidden_layer_rebuilds_output() {
        let mut n = net(4, 2);
        n.add_hidden_layer(3).unwrap();
        assert_eq!(n.layer_count(), 3);
        assert_eq!(n.layer(1).unwrap().input_count(), 4);
        assert_eq!(n.output_layer().input_count(), 3);
        n.add_hidden_layer(5).unwrap();
        assert_eq!(n.layer(2).unwrap().input_count(), 3);
        assert_eq!(n.output_layer().input_count(), 5);
        assert_eq!(n.output_layer().neuron_count(), 2);
        assert!(n.add_hidden_layer(0).unwrap_err().is_invalid_input());
    }

    #[test]
    fn grow_before_output_checks_width_and_kind() {
        let mut n = net(4, 2);
        let mut rng = StdRng::seed_from_u64(1);
        let wrong = Layer::hidden(3, 6, sigmoid(), &mut rng);
        assert!(n.grow_before_output(wrong).unwrap_err().is_invalid_input());
        assert!(n.grow_before_output(Layer::input(4)).unwrap_err().is_invalid_input());
        assert_eq!(n.layer_count(), 2);

        let right = Layer::hidden(4, 6, rectifier(), &mut rng);
        n.grow_before_output(right).unwrap();
        assert_eq!(n.layer(1).unwrap().activation().name(), "Rectifier");
        assert_eq!(n.output_layer().input_count(), 6);
    }

    #[test]
    fn display_lists_layers() {
        let mut n = net(2, 1);
        n.add_hidden_layer(3).unwrap();
        let text = n.to_string();
        assert!(text.starts_with("Network has 3 layers\n"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("net.pere");
        let mut n = net(3, 2);
        n.add_hidden_layer_with(4, rectifier()).unwrap();
        n.save_pere(&path).unwrap();
        let back = Network::load_pere(&path).unwrap();
        assert_eq!(back.layer_count(), 3);
        assert_eq!(back.layer(1).unwrap().activation().kind(), ActivationKind::Rectifier);
        let x = [0.1, 0.7, -0.3];
        assert_eq!(n.classify(&x).unwrap(), back.classify(&x).unwrap());
    }

    #[test]
    fn loading_rejects_broken_topology() {
        let dto = NetworkDto {
            input_count: 2,
            output_count: 1,
            activation: ActivationKind::Sigmoid,
            layers: vec![
                LayerDto {
                    kind: LayerKind::Input,
                    activation: ActivationKind::Linear,
                    neurons: vec![Neuron::from_parts(vec![1.0], 0.0); 2],
                },
                LayerDto {
                    kind: LayerKind::Hidden,
                    activation: ActivationKind::Sigmoid,
                    neurons: vec![Neuron::from_parts(vec![1.0, 1.0, 1.0], 0.0)],
                },
            ],
        };
        assert!(dto.into_network().unwrap_err().is_invalid_input());
    }

    fn stored(input: LayerDto) -> NetworkDto {
        NetworkDto {
            input_count: 2,
            output_count: 1,
            activation: ActivationKind::Sigmoid,
            layers: vec![
                input,
                LayerDto {
                    kind: LayerKind::Hidden,
                    activation: ActivationKind::Sigmoid,
                    neurons: vec![Neuron::from_parts(vec![0.5, -0.5], 0.0)],
                },
            ],
        }
    }

    #[test]
    fn loading_rejects_rewired_input_layer() {
        let identity = || LayerDto {
            kind: LayerKind::Input,
            activation: ActivationKind::Linear,
            neurons: vec![Neuron::from_parts(vec![1.0], 0.0); 2],
        };
        assert!(stored(identity()).into_network().is_ok());

        let mut scaled = identity();
        scaled.neurons[0] = Neuron::from_parts(vec![2.0], 0.0);
        assert!(stored(scaled).into_network().unwrap_err().is_invalid_input());

        let mut shifted = identity();
        shifted.neurons[1] = Neuron::from_parts(vec![1.0], 0.5);
        assert!(stored(shifted).into_network().unwrap_err().is_invalid_input());

        let mut squashed = identity();
        squashed.activation = ActivationKind::Sigmoid;
        assert!(stored(squashed).into_network().unwrap_err().is_invalid_input());
    }

    #[test]
    fn input_layer_is_not_mutable() {
        let mut n = net(2, 1);
        assert!(n.layer_mut(0).unwrap_err().is_invalid_input());
        assert!(n.layer_mut(1).is_ok());
        assert!(n.layer_mut(2).unwrap_err().is_index_out_of_range());
    }
}
