// ml_examples/src/main.rs
use anyhow::Result;
use backprop_mlp::{accuracy, model_summary, summary_table, Network, TrainingConfig};
use log::info;

fn main() -> Result<()> {
    env_logger::init();

    // optional JSON training config overriding the defaults below
    let config_override = match std::env::args().nth(1) {
        Some(path) => Some(TrainingConfig::load(path)?),
        None => None,
    };

    #[cfg(feature = "shift")]
    run_shift(config_override.clone())?;

    #[cfg(feature = "mnist")]
    run_mnist(config_override)?;

    #[cfg(not(any(feature = "shift", feature = "mnist")))]
    let _ = config_override;

    Ok(())
}

#[cfg(feature = "shift")]
fn run_shift(config_override: Option<TrainingConfig>) -> Result<()> {
    use backprop_mlp::rectifier;

    println!("=== One-hot shift (8 -> 3 -> 8) ===");
    let rows: Vec<Vec<f64>> = (0..8)
        .map(|i| {
            let mut row = vec![0.0; 16];
            row[i] = 1.0;
            row[8 + (i + 1) % 8] = 1.0;
            row
        })
        .collect();
    let mut net = Network::with_activation(8, 8, rectifier())?;
    net.add_hidden_layer(3)?;
    println!("{}", model_summary(&net));

    let config = config_override
        .unwrap_or_else(|| TrainingConfig::new(0.1, 20_000).with_loss_log("error.txt"));
    let started = std::time::Instant::now();
    let report = net.train_with(&rows, &rows, &config)?;
    info!("shift training took {:?}", started.elapsed());
    println!("{}", summary_table(&report.epoch_losses, "Validation Loss"));
    println!("Stopped: {:?} after {} epochs", report.stop_reason, report.iterations());

    let out = net.classify(&rows[1][..8])?;
    let shown: Vec<String> = out.iter().map(|v| format!("{v:.3}")).collect();
    println!("classify(e1) = [{}]", shown.join(" "));
    println!("Shift Accuracy: {:.2}%", accuracy(&net, &rows)? * 100.0);
    Ok(())
}

#[cfg(feature = "mnist")]
fn run_mnist(config_override: Option<TrainingConfig>) -> Result<()> {
    use backprop_mlp::{load_idx_rows, sigmoid, IdxOptions};

    println!("\n=== MNIST subset (784 -> 30 -> 20 -> 10) ===");
    let options = |limit| IdxOptions { limit: Some(limit), ..IdxOptions::default() };
    let find = |name: &str| {
        let plain = format!("data/{name}");
        if std::path::Path::new(&plain).exists() { plain } else { format!("{plain}.gz") }
    };
    let training = load_idx_rows(
        find("train-images-idx3-ubyte"),
        find("train-labels-idx1-ubyte"),
        &options(6000),
    )?;
    let validation = load_idx_rows(
        find("t10k-images-idx3-ubyte"),
        find("t10k-labels-idx1-ubyte"),
        &options(1000),
    )?;
    info!("loaded {} training and {} validation rows", training.len(), validation.len());
    let mut net = Network::with_activation(28 * 28, 10, sigmoid())?;
    net.add_hidden_layer(30)?;
    net.add_hidden_layer(20)?;
    println!("{}", model_summary(&net));

    let config = config_override
        .unwrap_or_else(|| TrainingConfig::new(0.01, 100).with_loss_log("error.txt"));
    let report = net.train_with(&training, &validation, &config)?;
    println!("{}", summary_table(&report.epoch_losses, "Validation Loss"));
    println!("MNIST Accuracy: {:.2}%", accuracy(&net, &validation)? * 100.0);

    net.save_pere("models/mnist_model.pere")?;
    let reloaded = Network::load_pere("models/mnist_model.pere")?;
    println!("MNIST Accuracy (reloaded): {:.2}%", accuracy(&reloaded, &validation)? * 100.0);
    Ok(())
}
