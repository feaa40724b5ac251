use std::{fs, path::Path};

use anyhow::{bail, Context};
use log::debug;
use machine_learning::Dataset;

use crate::config::DataConfig;

/// Loads the samples described by `config`, dropping every row with a missing value.
pub fn load(config: &DataConfig) -> anyhow::Result<Dataset> {
    let content = read(&config.path)?;
    let rows = parse(&content, &config.missing, config.ignore_trailing)?;

    Dataset::from_rows(&rows, &config.target_cols, config.ignore_trailing)
        .with_context(|| format!("cannot build a dataset from '{}'", config.path.display()))
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("cannot read dataset '{}'", path.display()))
}

/// Parses whitespace delimited lines into rows of numbers.
///
/// A double quoted field counts as a single one even if it contains spaces. The last
/// `ignore_trailing` fields of every line are not parsed, they are kept as zeros so every row
/// keeps its width. Rows with a `missing` field are skipped.
pub fn parse(
    content: &str,
    missing: &str,
    ignore_trailing: usize,
) -> anyhow::Result<Vec<Vec<f32>>> {
    let mut rows = Vec::new();
    let mut dropped = 0;

    for (i, line) in content.lines().enumerate() {
        let fields = split_fields(line);
        if fields.is_empty() {
            continue;
        }

        let Some(n_data) = fields.len().checked_sub(ignore_trailing) else {
            bail!(
                "line {}: has {} fields, cannot ignore {ignore_trailing}",
                i + 1,
                fields.len()
            );
        };

        if fields[..n_data].contains(&missing) {
            dropped += 1;
            continue;
        }

        let mut row = fields[..n_data]
            .iter()
            .map(|field| {
                field
                    .parse::<f32>()
                    .with_context(|| format!("line {}: '{field}' is not a number", i + 1))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        row.resize(fields.len(), 0.);

        rows.push(row);
    }

    debug!(rows = rows.len(), dropped = dropped; "parsed dataset");
    Ok(rows)
}

fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut rest = line.trim_start();

    while !rest.is_empty() {
        let (field, tail) = match rest.strip_prefix('"') {
            Some(quoted) => match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            },
            None => {
                let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                rest.split_at(end)
            }
        };

        fields.push(field);
        rest = tail.trim_start();
    }

    fields
}
