// Tests for loading training configurations from JSON files.

use backprop_mlp::{DerivativeMode, Error, TrainingConfig};
use std::fs;
use std::path::PathBuf;

#[test]
fn load_shift_config() {
    let config = TrainingConfig::load("config/shift.json").expect("Failed to load shift config");
    assert_eq!(config.learning_rate, 0.1);
    assert_eq!(config.max_iterations, 20000);
    assert_eq!(config.derivative, DerivativeMode::Activation);
    assert!(!config.restore_best);
    assert_eq!(config.loss_log, Some(PathBuf::from("error.txt")));
}

#[test]
fn load_legacy_config() {
    let config = TrainingConfig::load("config/mnist_legacy.json").expect("Failed to load config");
    assert_eq!(config.derivative, DerivativeMode::SigmoidOutput);
    assert!(!config.restore_best);
}

#[test]
fn missing_file_is_a_resource_error() {
    let err = TrainingConfig::load("config/does_not_exist.json").unwrap_err();
    assert!(matches!(err, Error::Resource(_)));
}

#[test]
fn invalid_json_is_a_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, "{ learning_rate: }").unwrap();
    assert!(matches!(TrainingConfig::load(&path).unwrap_err(), Error::Serialization(_)));
}

#[test]
fn out_of_range_values_are_invalid_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zero.json");
    fs::write(&path, r#"{"learning_rate": 0.0, "max_iterations": 10}"#).unwrap();
    assert!(TrainingConfig::load(&path).unwrap_err().is_invalid_input());

    fs::write(&path, r#"{"learning_rate": 0.1, "max_iterations": 10, "derivative": "tanh"}"#)
        .unwrap();
    assert!(matches!(TrainingConfig::load(&path).unwrap_err(), Error::Serialization(_)));
}
