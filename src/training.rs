//! Backpropagation training with validation-driven early stopping.
//!
//! Each epoch walks the training rows once and updates the weights right after
//! every example's backward pass. After the epoch the validation loss is
//! recomputed; training stops as soon as it fails to improve or the iteration
//! cap is reached.
use crate::activations::Activation;
use crate::config::{DerivativeMode, TrainingConfig};
use crate::error::Result;
use crate::layers::{Layer, Matrix};
use crate::loss::validation_loss;
use crate::loss_log::{BestEffort, FileLossLog, LossSink, NullLossLog};
use crate::network::Network;
use crate::utils::split_row;
use log::{debug, info, warn};

/// Why [`Network::train`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Validation loss did not decrease over the last epoch.
    NoImprovement,
    /// `max_iterations` epochs ran, each one improving the loss.
    MaxIterations,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    /// Validation loss before the first epoch.
    pub initial_loss: f64,
    /// Validation loss after each epoch, in order.
    pub epoch_losses: Vec<f64>,
    pub stop_reason: StopReason,
    /// The lowest-loss weights were put back at the end.
    pub restored_best: bool,
}

impl TrainingReport {
    /// Number of epochs run.
    pub fn iterations(&self) -> usize {
        self.epoch_losses.len()
    }

    /// Loss of the weights the network holds now.
    pub fn final_loss(&self) -> f64 {
        let last = self.epoch_losses.last().copied().unwrap_or(self.initial_loss);
        if self.restored_best {
            self.epoch_losses.iter().copied().fold(self.initial_loss, f64::min)
        } else {
            last
        }
    }
}

impl Network {
    /// Train with the default configuration and no loss trace.
    ///
    /// `training` and `validation` rows are `[inputs.., targets..]`.
    pub fn train(
        &mut self,
        training: &[Vec<f64>],
        validation: &[Vec<f64>],
        learning_rate: f64,
        max_iterations: usize,
    ) -> Result<TrainingReport> {
        let config = TrainingConfig::new(learning_rate, max_iterations);
        self.train_with_sink(training, validation, &config, &mut NullLossLog)
    }

    /// Train with `config`, writing the loss trace to `config.loss_log` when
    /// set. Failing to open the trace file is logged and otherwise ignored.
    pub fn train_with(
        &mut self,
        training: &[Vec<f64>],
        validation: &[Vec<f64>],
        config: &TrainingConfig,
    ) -> Result<TrainingReport> {
        self.check_training_input(training, validation, config)?;
        let mut file_log = match &config.loss_log {
            Some(path) => match FileLossLog::create(path) {
                Ok(log) => Some(log),
                Err(e) => {
                    warn!("cannot open loss log {}: {e}", path.display());
                    None
                }
            },
            None => None,
        };
        let mut null = NullLossLog;
        let sink: &mut dyn LossSink = match file_log.as_mut() {
            Some(log) => log,
            None => &mut null,
        };
        self.run_training(training, validation, config, sink)
    }

    /// Train with `config`, recording every validation loss in `sink`.
    /// Nothing is recorded when the input is rejected.
    pub fn train_with_sink(
        &mut self,
        training: &[Vec<f64>],
        validation: &[Vec<f64>],
        config: &TrainingConfig,
        sink: &mut dyn LossSink,
    ) -> Result<TrainingReport> {
        self.check_training_input(training, validation, config)?;
        self.run_training(training, validation, config, sink)
    }

    fn check_training_input(
        &self,
        training: &[Vec<f64>],
        validation: &[Vec<f64>],
        config: &TrainingConfig,
    ) -> Result<()> {
        config.validate()?;
        for row in training {
            self.check_row(row, "training row")?;
        }
        for row in validation {
            self.check_row(row, "validation row")?;
        }
        Ok(())
    }

    fn run_training(
        &mut self,
        training: &[Vec<f64>],
        validation: &[Vec<f64>],
        config: &TrainingConfig,
        sink: &mut dyn LossSink,
    ) -> Result<TrainingReport> {
        if validation.is_empty() {
            warn!("empty validation set, training will stop after one epoch");
        }
        let mut sink = BestEffort::new(sink);
        let initial_loss = validation_loss(self, validation)?;
        sink.record(initial_loss);
        info!(
            "training {} layers on {} rows (lr={}, max_iterations={}), initial loss {initial_loss:.6}",
            self.layer_count(),
            training.len(),
            config.learning_rate,
            config.max_iterations
        );

        let mut best: Option<(f64, Vec<Layer>)> =
            config.restore_best.then(|| (initial_loss, self.layers.clone()));
        let mut epoch_losses = Vec::new();
        let mut current = initial_loss;
        let stop_reason = loop {
            let previous = current;
            self.train_epoch(training, config.learning_rate, config.derivative)?;
            current = validation_loss(self, validation)?;
            sink.record(current);
            epoch_losses.push(current);
            debug!("epoch {}: validation loss = {current:.6}", epoch_losses.len());

            if let Some((best_loss, snapshot)) = best.as_mut() {
                if current < *best_loss {
                    *best_loss = current;
                    *snapshot = self.layers.clone();
                }
            }
            // also stops on NaN
            if !(current < previous) {
                break StopReason::NoImprovement;
            }
            if epoch_losses.len() == config.max_iterations {
                break StopReason::MaxIterations;
            }
        };
        sink.finish();

        let mut restored_best = false;
        if let Some((best_loss, snapshot)) = best {
            // a NaN loss counts as worse than any snapshot
            if !(current <= best_loss) {
                self.layers = snapshot;
                restored_best = true;
                info!("restored weights with validation loss {best_loss:.6}");
            }
        }
        info!(
            "training stopped after {} epochs ({stop_reason:?}), loss {current:.6}",
            epoch_losses.len()
        );
        Ok(TrainingReport {
            initial_loss,
            epoch_losses,
            stop_reason,
            restored_best,
        })
    }

    /// One pass over `rows`, updating after every example.
    fn train_epoch(
        &mut self,
        rows: &[Vec<f64>],
        learning_rate: f64,
        mode: DerivativeMode,
    ) -> Result<()> {
        for row in rows {
            let (input, target) = split_row(row, self.input_count());
            self.train_example(input, target, learning_rate, mode)?;
        }
        Ok(())
    }

    /// Forward pass with caches, then error terms from the output layer back
    /// to the first hidden layer.
    ///
    /// The delta rows of layer `l + 1` are applied only once layer `l` has
    /// computed its error terms from the old weights of `l + 1`. The input
    /// layer is never updated.
    fn train_example(
        &mut self,
        input: &[f64],
        target: &[f64],
        learning_rate: f64,
        mode: DerivativeMode,
    ) -> Result<()> {
        // outputs[l + 1] is the output of layers[l], outputs[0] the raw input
        let mut outputs: Vec<Vec<f64>> = Vec::with_capacity(self.layers.len() + 1);
        let mut sums: Vec<Vec<f64>> = Vec::with_capacity(self.layers.len());
        outputs.push(input.to_vec());
        for layer in &self.layers {
            let (z, a) = layer.forward(&outputs[outputs.len() - 1])?;
            sums.push(z);
            outputs.push(a);
        }

        let last = self.layers.len() - 1;
        let out_layer = &self.layers[last];
        let mut delta: Vec<f64> = outputs[last + 1]
            .iter()
            .zip(target)
            .zip(&sums[last])
            .map(|((&o, &t), &z)| (t - o) * slope(out_layer, mode, z, o))
            .collect();
        let mut pending = gradient_rows(&delta, &outputs[last], learning_rate);

        for l in (1..last).rev() {
            let layer = &self.layers[l];
            let next = &self.layers[l + 1];
            let new_delta: Vec<f64> = (0..layer.neuron_count())
                .map(|j| {
                    let downstream: f64 = next
                        .neurons()
                        .iter()
                        .zip(&delta)
                        .map(|(n, &d)| n.weights()[j] * d)
                        .sum();
                    slope(layer, mode, sums[l][j], outputs[l + 1][j]) * downstream
                })
                .collect();
            let new_rows = gradient_rows(&new_delta, &outputs[l], learning_rate);
            // layer l + 1's old weights are no longer needed
            self.layers[l + 1].update_layer_weights(&pending)?;
            pending = new_rows;
            delta = new_delta;
        }
        self.layers[1].update_layer_weights(&pending)
    }
}

/// `g'` for one neuron with pre-activation `z` and output `o`.
fn slope(layer: &Layer, mode: DerivativeMode, z: f64, o: f64) -> f64 {
    match mode {
        DerivativeMode::Activation => layer.activation().derivative(z),
        DerivativeMode::SigmoidOutput => o * (1.0 - o),
    }
}

/// One row per neuron: `δ·lr·x_j` for every input, then `δ·lr` for the bias.
fn gradient_rows(delta: &[f64], inputs: &[f64], learning_rate: f64) -> Matrix {
    delta
        .iter()
        .map(|&d| {
            let step = d * learning_rate;
            inputs
                .iter()
                .map(|&x| step * x)
                .chain(std::iter::once(step))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activations::{linear, sigmoid};
    use crate::loss_log::MemoryLossLog;

    #[test]
    fn gradient_rows_append_bias_step() {
        let rows = gradient_rows(&[2.0, -1.0], &[0.5, 1.0, 0.0], 0.5);
        assert_eq!(rows, vec![vec![0.5, 1.0, 0.0, 1.0], vec![-0.25, -0.5, -0.0, -0.5]]);
    }

    #[test]
    fn single_output_step_matches_hand_computation() {
        // 1 input, 1 linear output, w = 0.5, b = 0, example x = 2, t = 3
        let mut net = Network::with_seed(1, 1, linear(), 0).unwrap();
        net.layer_mut(1).unwrap().neuron_mut(0).unwrap().set_weights(&[0.5, 0.0]).unwrap();
        net.train_example(&[2.0], &[3.0], 0.1, DerivativeMode::Activation).unwrap();
        // o = 1, delta = (3 - 1) * 1 = 2, dw = 2 * 0.1 * 2, db = 2 * 0.1
        let n = net.layer(1).unwrap().neuron(0).unwrap();
        assert!((n.weights()[0] - 0.9).abs() < 1e-12);
        assert!((n.bias() - 0.2).abs() < 1e-12);
        // input layer untouched
        assert_eq!(net.layer(0).unwrap().neuron(0).unwrap().weights(), &[1.0]);
    }

    #[test]
    fn sigmoid_output_mode_ignores_configured_activation() {
        let mut a = Network::with_seed(1, 1, linear(), 0).unwrap();
        a.layer_mut(1).unwrap().neuron_mut(0).unwrap().set_weights(&[0.5, 0.0]).unwrap();
        let mut b = a.clone();
        a.train_example(&[2.0], &[3.0], 0.1, DerivativeMode::Activation).unwrap();
        b.train_example(&[2.0], &[3.0], 0.1, DerivativeMode::SigmoidOutput).unwrap();
        // o = 1 so the legacy slope o(1-o) is 0 and nothing moves
        assert_eq!(b.layer(1).unwrap().neuron(0).unwrap().weights(), &[0.5]);
        assert_ne!(a.layer(1).unwrap().neuron(0).unwrap().weights(), &[0.5]);
    }

    #[test]
    fn hidden_layer_uses_pre_update_downstream_weights() {
        // 1 -> 1 (linear hidden) -> 1 (linear output), hand-checked chain rule
        let mut net = Network::with_seed(1, 1, linear(), 0).unwrap();
        net.add_hidden_layer(1).unwrap();
        net.layer_mut(1).unwrap().neuron_mut(0).unwrap().set_weights(&[1.0, 0.0]).unwrap();
        net.layer_mut(2).unwrap().neuron_mut(0).unwrap().set_weights(&[2.0, 0.0]).unwrap();
        // x = 1: h = 1, o = 2, target 4 -> delta_out = 2, delta_h = 2 * 2 = 4
        net.train_example(&[1.0], &[4.0], 0.25, DerivativeMode::Activation).unwrap();
        let out = net.layer(2).unwrap().neuron(0).unwrap();
        assert!((out.weights()[0] - (2.0 + 2.0 * 0.25 * 1.0)).abs() < 1e-12);
        assert!((out.bias() - 0.5).abs() < 1e-12);
        let hidden = net.layer(1).unwrap().neuron(0).unwrap();
        assert!((hidden.weights()[0] - (1.0 + 4.0 * 0.25 * 1.0)).abs() < 1e-12);
        assert!((hidden.bias() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejected_rows_leave_weights_and_sink_untouched() {
        let mut net = Network::with_seed(2, 1, sigmoid(), 9).unwrap();
        let before = net.classify(&[0.3, 0.6]).unwrap();
        let mut sink = MemoryLossLog::default();
        let good = vec![vec![0.0, 1.0, 1.0]];
        let bad = vec![vec![0.0, 1.0, 1.0], vec![0.0, 1.0]];
        let cfg = TrainingConfig::new(0.5, 10);
        assert!(net.train_with_sink(&bad, &good, &cfg, &mut sink).unwrap_err().is_invalid_input());
        assert!(net.train_with_sink(&good, &bad, &cfg, &mut sink).unwrap_err().is_invalid_input());
        assert!(sink.values.is_empty());
        assert_eq!(net.classify(&[0.3, 0.6]).unwrap(), before);
    }

    #[test]
    fn report_final_loss_follows_restore() {
        let report = TrainingReport {
            initial_loss: 1.0,
            epoch_losses: vec![0.5, 0.25, 0.75],
            stop_reason: StopReason::NoImprovement,
            restored_best: true,
        };
        assert_eq!(report.final_loss(), 0.25);
        assert_eq!(report.iterations(), 3);
    }
}
