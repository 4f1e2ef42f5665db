//! Small helpers for building rows and reporting training runs.
use crate::network::Network;
use rand::Rng;

/// Split a row into `(inputs, targets)`. Panics if `input_count > row.len()`.
pub fn split_row(row: &[f64], input_count: usize) -> (&[f64], &[f64]) {
    row.split_at(input_count)
}

/// Join an input vector and a target vector into one training row.
pub fn join_row(input: &[f64], target: &[f64]) -> Vec<f64> {
    input.iter().chain(target).copied().collect()
}

/// Random rows with inputs in `[-1, 1)` and targets in `[0, 1)`.
pub fn synthetic_rows<R: Rng + ?Sized>(
    rng: &mut R,
    n_samples: usize,
    input_count: usize,
    output_count: usize,
) -> Vec<Vec<f64>> {
    (0..n_samples)
        .map(|_| {
            let input: Vec<f64> = (0..input_count).map(|_| rng.gen_range(-1.0..1.0)).collect();
            let target: Vec<f64> = (0..output_count).map(|_| rng.gen_range(0.0..1.0)).collect();
            join_row(&input, &target)
        })
        .collect()
}

/// Model summary
pub fn model_summary(network: &Network) -> String {
    format!("Model Summary:\n{network}")
}

/// Simple table for a loss trace.
pub fn summary_table(values: &[f64], title: &str) -> String {
    let mut out = format!("{title} Summary Table:\n");
    out.push_str("+----------------+------------+\n");
    out.push_str("| Epoch          | Loss       |\n");
    out.push_str("+----------------+------------+\n");
    if let (Some(first), Some(last)) = (values.first(), values.last()) {
        out.push_str(&format!("| {:<14} | {:>10.6} |\n", "first", first));
        out.push_str(&format!("| {:<14} | {:>10.6} |\n", "last", last));
        let best = values.iter().copied().fold(f64::INFINITY, f64::min);
        out.push_str(&format!("| {:<14} | {:>10.6} |\n", "best", best));
    }
    out.push_str("+----------------+------------+");
    out
}
