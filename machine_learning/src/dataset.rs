use ndarray::prelude::*;
use rand::{Rng, seq::SliceRandom};

use crate::{MlErr, Result};

/// An in memory set of samples: inputs `x` and targets `t`, one sample per row.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    x: Array2<f32>,
    t: Array2<f32>,
}

/// A dataset split into training, validation and test samples.
#[derive(Clone, Debug, PartialEq)]
pub struct Partition {
    pub train: Dataset,
    pub validate: Dataset,
    pub test: Dataset,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Errors
    /// `SizeMismatch` if `x` and `t` have a different amount of rows.
    pub fn new(x: Array2<f32>, t: Array2<f32>) -> Result<Self> {
        if x.nrows() != t.nrows() {
            return Err(MlErr::size_mismatch("rows of the targets", t.nrows(), x.nrows()));
        }

        Ok(Self { x, t })
    }

    /// Builds a dataset out of parsed rows.
    ///
    /// # Arguments
    /// * `rows` - The values of every sample, all of the same width.
    /// * `target_cols` - The columns holding the targets, every other column is an input.
    /// * `ignore_trailing` - The amount of columns at the end of every row to leave out.
    pub fn from_rows(
        rows: &[Vec<f32>],
        target_cols: &[usize],
        ignore_trailing: usize,
    ) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        let used = width.checked_sub(ignore_trailing).ok_or_else(|| {
            MlErr::invalid(format!("cannot ignore {ignore_trailing} of {width} columns"))
        })?;

        if target_cols.is_empty() {
            return Err(MlErr::invalid("at least one target column is required"));
        }
        if let Some(&col) = target_cols.iter().find(|&&col| col >= used) {
            return Err(MlErr::invalid(format!(
                "target column {col} out of range, rows have {used} usable columns"
            )));
        }

        let input_cols: Vec<_> = (0..used).filter(|c| !target_cols.contains(c)).collect();
        if input_cols.is_empty() {
            return Err(MlErr::invalid("at least one input column is required"));
        }

        let mut x = Array2::zeros((rows.len(), input_cols.len()));
        let mut t = Array2::zeros((rows.len(), target_cols.len()));

        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(MlErr::size_mismatch("row width", row.len(), width));
            }

            for (j, &col) in input_cols.iter().enumerate() {
                x[[i, j]] = row[col];
            }
            for (j, &col) in target_cols.iter().enumerate() {
                t[[i, j]] = row[col];
            }
        }

        Self::new(x, t)
    }

    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    pub fn t(&self) -> ArrayView2<'_, f32> {
        self.t.view()
    }

    /// The amount of samples.
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn n_inputs(&self) -> usize {
        self.x.ncols()
    }

    pub fn n_outputs(&self) -> usize {
        self.t.ncols()
    }

    /// Splits the samples in `n_folds` contiguous folds, optionally shuffling the rows first.
    ///
    /// Every fold has `len / n_folds` samples except for the last one, which also takes the
    /// remainder. Fold 0 is used for validation, fold 1 for testing and the rest, stacked in
    /// order, for training.
    ///
    /// # Errors
    /// `InvalidArgument` if `n_folds < 3` or there are fewer samples than folds.
    pub fn partition<R: Rng + ?Sized>(
        &self,
        n_folds: usize,
        rng: Option<&mut R>,
    ) -> Result<Partition> {
        if n_folds < 3 {
            return Err(MlErr::invalid(format!(
                "partitioning needs at least 3 folds, got {n_folds}"
            )));
        }
        if self.len() < n_folds {
            return Err(MlErr::invalid(format!(
                "cannot split {} samples in {n_folds} folds",
                self.len()
            )));
        }

        let mut rows: Vec<usize> = (0..self.len()).collect();
        if let Some(rng) = rng {
            rows.shuffle(rng);
        }

        let per_fold = self.len() / n_folds;
        let (validate, rest) = rows.split_at(per_fold);
        let (test, train) = rest.split_at(per_fold);

        Ok(Partition {
            train: self.select(train),
            validate: self.select(validate),
            test: self.select(test),
        })
    }

    fn select(&self, rows: &[usize]) -> Self {
        Self {
            x: self.x.select(Axis(0), rows),
            t: self.t.select(Axis(0), rows),
        }
    }
}
