//! A plain multilayer perceptron trained by hand-written backpropagation.
//!
//! - Input/hidden layers of individual neurons, one activation per layer
//! - Sigmoid, linear and rectifier activations
//! - Online gradient descent with validation-loss early stopping
//! - Loss trace sinks, gzipped JSON persistence, IDX/CSV row loaders
//!
//! ```no_run
//! use backprop_mlp::Network;
//!
//! let mut net = Network::new(2, 1)?;
//! net.add_hidden_layer(3)?;
//! let rows = vec![vec![0.0, 1.0, 0.9], vec![1.0, 1.0, 0.1]];
//! let report = net.train(&rows, &rows, 0.5, 1000)?;
//! println!("{:?} after {} epochs", report.stop_reason, report.iterations());
//! # Ok::<(), backprop_mlp::Error>(())
//! ```

pub mod activations;
pub mod config;
pub mod datasets;
pub mod error;
pub mod layers;
pub mod loss;
pub mod loss_log;
pub mod metrics;
pub mod network;
pub mod neuron;
pub mod training;
pub mod utils;

pub use activations::{linear, rectifier, sigmoid, Activation, ActivationKind, ActivationRef, Linear, Rectifier, Sigmoid};
pub use config::{DerivativeMode, TrainingConfig};
pub use datasets::{load_csv_rows, load_idx_rows, IdxOptions, TargetEncoding};
pub use error::{Error, Result};
pub use layers::{Layer, LayerKind};
pub use loss::{half_squared_error, validation_loss};
pub use loss_log::{FileLossLog, LossSink, MemoryLossLog, NullLossLog};
pub use metrics::{accuracy, confusion_matrix};
pub use network::Network;
pub use neuron::Neuron;
pub use training::{StopReason, TrainingReport};
pub use utils::{model_summary, summary_table};
