use std::{fs, path::{Path, PathBuf}};

use anyhow::{bail, Context};
use machine_learning::{arch::activations::ActFn, Method};
use serde::{Deserialize, Serialize};

/// Where the samples come from and how to read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub path: PathBuf,
    /// The token that marks a missing value.
    #[serde(default = "default_missing")]
    pub missing: String,
    #[serde(default = "default_target_cols")]
    pub target_cols: Vec<usize>,
    /// Columns at the end of every line that are not numeric data (names, labels, ...).
    #[serde(default)]
    pub ignore_trailing: usize,
}

/// A grid of networks to train and evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub data: DataConfig,
    #[serde(default = "default_n_folds")]
    pub n_folds: usize,
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    #[serde(default)]
    pub method: Method,
    pub epochs: Vec<usize>,
    pub hidden_layers: Vec<Vec<usize>>,
    pub activations: Vec<ActFn>,
    /// Where to dump the results as JSON, if anywhere.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

fn default_missing() -> String {
    "?".to_string()
}

fn default_target_cols() -> Vec<usize> {
    vec![0]
}

fn default_n_folds() -> usize {
    5
}

fn default_shuffle() -> bool {
    true
}

fn default_learning_rate() -> f32 {
    0.01
}

impl ExperimentConfig {
    /// Reads and validates a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("cannot read '{}'", path.display()))?;

        Self::from_json(&content).with_context(|| format!("invalid config '{}'", path.display()))
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// The amount of networks the grid trains.
    pub fn grid_size(&self) -> usize {
        self.epochs.len() * self.hidden_layers.len() * self.activations.len()
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.n_folds < 3 {
            bail!("n_folds must be at least 3, got {}", self.n_folds);
        }
        if !(self.learning_rate > 0.) {
            bail!("learning_rate must be positive, got {}", self.learning_rate);
        }
        if self.grid_size() == 0 {
            bail!("epochs, hidden_layers and activations must not be empty");
        }
        if self.data.target_cols.is_empty() {
            bail!("data.target_cols must not be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "data": { "path": "auto-mpg.data-original", "ignore_trailing": 1 },
        "epochs": [1000, 2000],
        "hidden_layers": [[0], [10], [100, 10]],
        "activations": ["tanh", "relu"]
    }"#;

    #[test]
    fn defaults_are_filled_in() {
        let config = ExperimentConfig::from_json(MINIMAL).unwrap();

        assert_eq!(config.n_folds, 5);
        assert!(config.shuffle);
        assert_eq!(config.seed, None);
        assert_eq!(config.learning_rate, 0.01);
        assert_eq!(config.method, Method::Adam);
        assert_eq!(config.data.missing, "?");
        assert_eq!(config.data.target_cols, vec![0]);
        assert_eq!(config.activations, vec![ActFn::tanh(), ActFn::relu()]);
        assert_eq!(config.grid_size(), 12);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let bad_act = MINIMAL.replace("\"relu\"", "\"gelu\"");
        assert!(ExperimentConfig::from_json(&bad_act).is_err());

        let bad_method = MINIMAL.replace("\"epochs\"", "\"method\": \"rmsprop\", \"epochs\"");
        assert!(ExperimentConfig::from_json(&bad_method).is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let few_folds = MINIMAL.replace("\"epochs\"", "\"n_folds\": 2, \"epochs\"");
        assert!(ExperimentConfig::from_json(&few_folds).is_err());

        let no_epochs = MINIMAL.replace("[1000, 2000]", "[]");
        assert!(ExperimentConfig::from_json(&no_epochs).is_err());
    }
}
