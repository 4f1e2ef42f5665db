//! Validation loss: half sum of squared errors.
use crate::error::{Error, Result};
use crate::network::Network;
use crate::utils::split_row;

/// `Σ (t - o)² / 2` over one example.
pub fn half_squared_error(pred: &[f64], target: &[f64]) -> Result<f64> {
    if pred.len() != target.len() {
        return Err(Error::length("half squared error", pred.len(), target.len()));
    }
    Ok(pred
        .iter()
        .zip(target)
        .map(|(&p, &t)| (t - p).powi(2) / 2.0)
        .sum())
}

/// Half squared error summed over every row `[inputs.., targets..]`.
pub fn validation_loss(network: &Network, rows: &[Vec<f64>]) -> Result<f64> {
    let input_count = network.input_count();
    let mut total = 0.0;
    for row in rows {
        network.check_row(row, "validation row")?;
        let (input, target) = split_row(row, input_count);
        total += half_squared_error(&network.classify(input)?, target)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_sse_of_known_values() {
        assert_eq!(half_squared_error(&[0.5, 1.0], &[1.0, 0.0]).unwrap(), 0.125 + 0.5);
        assert_eq!(half_squared_error(&[0.3], &[0.3]).unwrap(), 0.0);
        assert!(half_squared_error(&[0.3], &[0.3, 1.0]).unwrap_err().is_invalid_input());
    }

    #[test]
    fn empty_validation_set_has_zero_loss() {
        let net = Network::with_seed(2, 1, crate::activations::sigmoid(), 1).unwrap();
        assert_eq!(validation_loss(&net, &[]).unwrap(), 0.0);
    }
}
