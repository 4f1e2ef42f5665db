//! Scalar activation functions paired with their analytic derivatives.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Trait for activation functions.
///
/// `derivative` must be the true derivative of `apply`; the trainer evaluates
/// it unchecked at each neuron's pre-activation sum.
pub trait Activation: fmt::Debug + Send + Sync {
    fn apply(&self, x: f64) -> f64;
    fn derivative(&self, x: f64) -> f64;
    fn name(&self) -> &'static str;
    fn kind(&self) -> ActivationKind;
}

/// Shared handle to an activation, as held by layers.
pub type ActivationRef = Arc<dyn Activation + Send + Sync>;

/// Sigmoid: 1 / (1 + exp(-x))
#[derive(Debug, Clone, Copy, Default)]
pub struct Sigmoid;

impl Activation for Sigmoid {
    fn apply(&self, x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }
    fn derivative(&self, x: f64) -> f64 {
        let e = (-x).exp();
        let d = e / (1.0 + e).powi(2);
        // exp(-x) overflows for very negative x; the limit is 0
        if d.is_finite() {
            d
        } else {
            0.0
        }
    }
    fn name(&self) -> &'static str {
        "Sigmoid"
    }
    fn kind(&self) -> ActivationKind {
        ActivationKind::Sigmoid
    }
}

/// Linear: identity
#[derive(Debug, Clone, Copy, Default)]
pub struct Linear;

impl Activation for Linear {
    fn apply(&self, x: f64) -> f64 {
        x
    }
    fn derivative(&self, _x: f64) -> f64 {
        1.0
    }
    fn name(&self) -> &'static str {
        "Linear"
    }
    fn kind(&self) -> ActivationKind {
        ActivationKind::Linear
    }
}

/// Rectifier (ReLU): max(0, x)
#[derive(Debug, Clone, Copy, Default)]
pub struct Rectifier;

impl Activation for Rectifier {
    fn apply(&self, x: f64) -> f64 {
        x.max(0.0)
    }
    fn derivative(&self, x: f64) -> f64 {
        (x > 0.0) as u8 as f64
    }
    fn name(&self) -> &'static str {
        "Rectifier"
    }
    fn kind(&self) -> ActivationKind {
        ActivationKind::Rectifier
    }
}

/// Serializable activation kinds for persistence and configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivationKind {
    #[default]
    Sigmoid,
    Linear,
    Rectifier,
}

impl ActivationKind {
    pub fn to_arc(self) -> ActivationRef {
        match self {
            ActivationKind::Sigmoid => Arc::new(Sigmoid),
            ActivationKind::Linear => Arc::new(Linear),
            ActivationKind::Rectifier => Arc::new(Rectifier),
        }
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_arc().name())
    }
}

/// Shorthand for `Arc::new(Sigmoid)`.
pub fn sigmoid() -> ActivationRef {
    ActivationKind::Sigmoid.to_arc()
}

/// Shorthand for `Arc::new(Linear)`.
pub fn linear() -> ActivationRef {
    ActivationKind::Linear.to_arc()
}

/// Shorthand for `Arc::new(Rectifier)`.
pub fn rectifier() -> ActivationRef {
    ActivationKind::Rectifier.to_arc()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_derivative(a: &dyn Activation, x: f64) -> f64 {
        let h = 1e-6;
        (a.apply(x + h) - a.apply(x - h)) / (2.0 * h)
    }

    #[test]
    fn sigmoid_midpoint_and_derivative() {
        assert_eq!(Sigmoid.apply(0.0), 0.5);
        assert!((Sigmoid.derivative(0.0) - 0.25).abs() < 1e-12);
        for &x in &[-4.0, -1.0, 0.3, 2.5] {
            let s = Sigmoid.apply(x);
            assert!((Sigmoid.derivative(x) - s * (1.0 - s)).abs() < 1e-12);
        }
    }

    #[test]
    fn sigmoid_derivative_saturates_to_zero() {
        assert_eq!(Sigmoid.derivative(-1000.0), 0.0);
        assert_eq!(Sigmoid.derivative(1000.0), 0.0);
    }

    #[test]
    fn derivatives_match_finite_differences() {
        for kind in [ActivationKind::Sigmoid, ActivationKind::Linear, ActivationKind::Rectifier] {
            let a = kind.to_arc();
            for &x in &[-2.0, -0.5, 0.7, 3.0] {
                let err = (a.derivative(x) - numeric_derivative(a.as_ref(), x)).abs();
                assert!(err < 1e-5, "{} at {x}: {err}", a.name());
            }
        }
    }

    #[test]
    fn rectifier_clamps_negatives() {
        assert_eq!(Rectifier.apply(-3.0), 0.0);
        assert_eq!(Rectifier.apply(2.0), 2.0);
        assert_eq!(Rectifier.derivative(0.0), 0.0);
        assert_eq!(Rectifier.derivative(0.1), 1.0);
    }

    #[test]
    fn kind_round_trips_through_arc() {
        for kind in [ActivationKind::Sigmoid, ActivationKind::Linear, ActivationKind::Rectifier] {
            assert_eq!(kind.to_arc().kind(), kind);
        }
        assert_eq!(ActivationKind::Rectifier.to_string(), "Rectifier");
    }
}
