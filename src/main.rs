use std::{env, path::PathBuf};

use anyhow::Context;
use log::info;

use neural_regression::{config::ExperimentConfig, data, experiment, report};

const CONFIG_VAR: &str = "EXPERIMENT_CONFIG";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = match env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => env::var_os(CONFIG_VAR).map(PathBuf::from).with_context(|| {
            format!("usage: neural-regression <config.json> (or set {CONFIG_VAR})")
        })?,
    };

    let config = ExperimentConfig::load(&path)?;
    let dataset = data::load(&config.data)?;
    info!(
        samples = dataset.len(),
        inputs = dataset.n_inputs(),
        outputs = dataset.n_outputs();
        "loaded dataset"
    );

    let results = experiment::run_experiment(&dataset, &config)?;
    print!("{}", report::render(&results));

    if let Some(best) = experiment::best_by_validation(&results) {
        println!(
            "\nlowest validation error {:.6} (test {:.6}) with {} epochs, hidden {:?}, lr {}, {}",
            best.rmse_validate,
            best.rmse_test,
            best.epochs,
            best.hidden,
            best.learning_rate,
            best.act_fn
        );
    }

    if let Some(output) = &config.output {
        report::write_json(output, &results)?;
        info!("results written to {}", output.display());
    }

    Ok(())
}
