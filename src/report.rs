use std::{fmt::Write as _, fs, path::Path};

use anyhow::Context;

use crate::experiment::ExperimentResult;

const HEADERS: [&str; 7] = [
    "epochs",
    "hidden",
    "lr",
    "act func",
    "RMSE Train",
    "RMSE Val",
    "RMSE Test",
];

/// Renders the results as a right aligned text table, one row per result.
pub fn render(results: &[ExperimentResult]) -> String {
    let rows: Vec<[String; 7]> = results
        .iter()
        .map(|r| {
            [
                r.epochs.to_string(),
                format!("{:?}", r.hidden),
                r.learning_rate.to_string(),
                r.act_fn.to_string(),
                format!("{:.6}", r.rmse_train),
                format!("{:.6}", r.rmse_validate),
                format!("{:.6}", r.rmse_test),
            ]
        })
        .collect();

    let index_width = results.len().saturating_sub(1).to_string().len();
    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    let _ = write!(out, "{:index_width$}", "");
    for (header, w) in HEADERS.iter().zip(widths) {
        let _ = write!(out, "  {header:>w$}");
    }
    out.push('\n');

    for (i, row) in rows.iter().enumerate() {
        let _ = write!(out, "{i:<index_width$}");
        for (cell, w) in row.iter().zip(widths) {
            let _ = write!(out, "  {cell:>w$}");
        }
        out.push('\n');
    }

    out
}

/// Writes the results to `path` as a JSON array.
pub fn write_json<P: AsRef<Path>>(path: P, results: &[ExperimentResult]) -> anyhow::Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(results)?;

    fs::write(path, json).with_context(|| format!("cannot write results to '{}'", path.display()))
}
