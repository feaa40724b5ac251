use anyhow::Context;
use log::info;
use machine_learning::{
    arch::activations::ActFn, metrics::rmse, Dataset, Method, NeuralNetwork, Partition,
};
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ExperimentConfig;

/// The errors of one trained network, in target units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub epochs: usize,
    pub hidden: Vec<usize>,
    pub learning_rate: f32,
    pub act_fn: ActFn,
    pub rmse_train: f32,
    pub rmse_validate: f32,
    pub rmse_test: f32,
}

/// One combination of the grid.
#[derive(Debug, Clone)]
struct Cell {
    epochs: usize,
    hidden: Vec<usize>,
    act_fn: ActFn,
}

/// Partitions `dataset` once and trains a fresh network for every combination of epochs,
/// hidden layers and activation function, in that nesting order.
///
/// Every cell is trained independently, in parallel. The results come back in grid order.
pub fn run_experiment(
    dataset: &Dataset,
    config: &ExperimentConfig,
) -> anyhow::Result<Vec<ExperimentResult>> {
    let seed = config.seed.unwrap_or_else(rand::random);
    info!(seed = seed, cells = config.grid_size(); "starting experiment");

    let mut rng = StdRng::seed_from_u64(seed);
    let partition = dataset
        .partition(config.n_folds, config.shuffle.then_some(&mut rng))
        .context("cannot partition the dataset")?;

    info!(
        train = partition.train.len(),
        validate = partition.validate.len(),
        test = partition.test.len();
        "partitioned dataset"
    );

    grid(config)
        .into_par_iter()
        .enumerate()
        .map(|(i, cell)| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64 + 1));
            run_cell(&partition, &cell, config.learning_rate, config.method, &mut rng)
                .with_context(|| {
                    format!(
                        "training {} epochs of {:?} with {} failed",
                        cell.epochs, cell.hidden, cell.act_fn
                    )
                })
        })
        .collect()
}

fn grid(config: &ExperimentConfig) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(config.grid_size());

    for &epochs in &config.epochs {
        for hidden in &config.hidden_layers {
            for &act_fn in &config.activations {
                cells.push(Cell {
                    epochs,
                    hidden: hidden.clone(),
                    act_fn,
                });
            }
        }
    }

    cells
}

fn run_cell(
    partition: &Partition,
    cell: &Cell,
    learning_rate: f32,
    method: Method,
    rng: &mut StdRng,
) -> machine_learning::Result<ExperimentResult> {
    let Partition {
        train,
        validate,
        test,
    } = partition;

    let mut nn = NeuralNetwork::with_rng(
        train.n_inputs(),
        &cell.hidden,
        train.n_outputs(),
        cell.act_fn,
        rng,
    )?;
    nn.train(train.x(), train.t(), cell.epochs, learning_rate, method)?;

    let error = |set: &Dataset| -> machine_learning::Result<f32> {
        let y = nn.predict(set.x())?;
        rmse(y.view(), set.t())
    };

    let result = ExperimentResult {
        epochs: cell.epochs,
        hidden: cell.hidden.clone(),
        learning_rate,
        act_fn: cell.act_fn,
        rmse_train: error(train)?,
        rmse_validate: error(validate)?,
        rmse_test: error(test)?,
    };

    info!(
        epochs = result.epochs,
        act_fn = result.act_fn.name(),
        rmse_validate = result.rmse_validate;
        "trained {nn}"
    );

    Ok(result)
}

/// The result with the lowest validation error.
pub fn best_by_validation(results: &[ExperimentResult]) -> Option<&ExperimentResult> {
    results
        .iter()
        .min_by(|a, b| a.rmse_validate.total_cmp(&b.rmse_validate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataConfig;
    use ndarray::Array2;

    fn config(seed: Option<u64>) -> ExperimentConfig {
        ExperimentConfig {
            data: DataConfig {
                path: "unused".into(),
                missing: "?".into(),
                target_cols: vec![0],
                ignore_trailing: 0,
            },
            n_folds: 4,
            shuffle: true,
            seed,
            learning_rate: 0.01,
            method: Method::Adam,
            epochs: vec![5, 10],
            hidden_layers: vec![vec![0], vec![3]],
            activations: vec![ActFn::tanh(), ActFn::relu()],
            output: None,
        }
    }

    fn dataset() -> Dataset {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| (i + 3 * j) as f32);
        let t = Array2::from_shape_fn((40, 1), |(i, _)| (i as f32 / 7.).sin());
        Dataset::new(x, t).unwrap()
    }

    #[test]
    fn results_follow_the_grid_order() {
        let results = run_experiment(&dataset(), &config(Some(3))).unwrap();

        let order: Vec<_> = results
            .iter()
            .map(|r| (r.epochs, r.hidden.clone(), r.act_fn))
            .collect();
        assert_eq!(
            order,
            vec![
                (5, vec![0], ActFn::tanh()),
                (5, vec![0], ActFn::relu()),
                (5, vec![3], ActFn::tanh()),
                (5, vec![3], ActFn::relu()),
                (10, vec![0], ActFn::tanh()),
                (10, vec![0], ActFn::relu()),
                (10, vec![3], ActFn::tanh()),
                (10, vec![3], ActFn::relu()),
            ]
        );
        assert!(results
            .iter()
            .all(|r| r.rmse_train.is_finite() && r.rmse_validate >= 0. && r.rmse_test >= 0.));
    }

    #[test]
    fn a_seed_makes_runs_reproducible() {
        let first = run_experiment(&dataset(), &config(Some(11))).unwrap();
        let second = run_experiment(&dataset(), &config(Some(11))).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn best_result_has_the_lowest_validation_error() {
        let results = run_experiment(&dataset(), &config(Some(1))).unwrap();
        let best = best_by_validation(&results).unwrap();

        assert!(results.iter().all(|r| best.rmse_validate <= r.rmse_validate));
        assert!(best_by_validation(&[]).is_none());
    }
}
