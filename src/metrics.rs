//! Metrics for evaluating a trained network on `[inputs.., targets..]` rows.
use crate::error::Result;
use crate::network::Network;
use crate::utils::split_row;

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold(0usize, |max_i, (i, &v)| if v > values[max_i] { i } else { max_i })
}

/// Fraction of rows whose predicted argmax equals the target argmax.
pub fn accuracy(network: &Network, rows: &[Vec<f64>]) -> Result<f64> {
    if rows.is_empty() {
        return Ok(0.0);
    }
    let mut correct = 0;
    for row in rows {
        let (pred_class, true_class) = classes(network, row)?;
        if pred_class == true_class {
            correct += 1;
        }
    }
    Ok(correct as f64 / rows.len() as f64)
}

/// `cm[true][predicted]` counts, sized by the network's output count.
pub fn confusion_matrix(network: &Network, rows: &[Vec<f64>]) -> Result<Vec<Vec<usize>>> {
    let n = network.output_count();
    let mut cm = vec![vec![0; n]; n];
    for row in rows {
        let (pred_class, true_class) = classes(network, row)?;
        cm[true_class][pred_class] += 1;
    }
    Ok(cm)
}

fn classes(network: &Network, row: &[f64]) -> Result<(usize, usize)> {
    network.check_row(row, "metrics row")?;
    let (input, target) = split_row(row, network.input_count());
    let pred = network.classify(input)?;
    Ok((argmax(&pred), argmax(target)))
}
