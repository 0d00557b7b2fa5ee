//! Dense matrices and vectors whose rows and columns are identified by labels.
//!
//! A [`LabelledMatrix`] is immutable once constructed: all transformations return new matrices.
//! Cells for labels which are not present read as zero.
use crate::id::{Label, normalise_label};
use anyhow::{Result, ensure};
use indexmap::IndexSet;
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;

/// Collect labels into an [`IndexSet`], checking that there are no duplicates
fn unique_labels<I>(labels: I, axis: &str) -> Result<IndexSet<Label>>
where
    I: IntoIterator<Item = Label>,
{
    let mut set = IndexSet::new();
    for label in labels {
        let label_str = label.to_string();
        ensure!(set.insert(label), "Duplicate {axis} label '{label_str}'");
    }

    Ok(set)
}

/// A vector of values, keyed by label
#[derive(Debug, Clone)]
pub struct LabelledVector {
    labels: IndexSet<Label>,
    values: DVector<f64>,
}

impl LabelledVector {
    /// Create a new [`LabelledVector`], checking labels are unique and match the values in length
    pub fn new<I>(labels: I, values: DVector<f64>) -> Result<Self>
    where
        I: IntoIterator<Item = Label>,
    {
        let labels = unique_labels(labels, "vector")?;
        ensure!(
            labels.len() == values.len(),
            "Vector has {} labels but {} values",
            labels.len(),
            values.len()
        );

        Ok(Self { labels, values })
    }

    /// Create a vector of zeros with the given labels
    pub fn zeros(labels: IndexSet<Label>) -> Self {
        let values = DVector::zeros(labels.len());
        Self { labels, values }
    }

    /// Create from labels already known to be unique and values of the same length
    pub(crate) fn from_parts(labels: IndexSet<Label>, values: DVector<f64>) -> Self {
        debug_assert_eq!(labels.len(), values.len());
        Self { labels, values }
    }

    /// The labels of the vector, in order
    pub fn labels(&self) -> &IndexSet<Label> {
        &self.labels
    }

    /// The raw values of the vector
    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    /// The number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector has no entries
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the value for a label, which is zero if the label is not present
    pub fn get(&self, label: &str) -> f64 {
        self.labels
            .get_index_of(normalise_label(label).as_str())
            .map_or(0.0, |idx| self.values[idx])
    }

    /// Iterate over pairs of label and value
    pub fn iter(&self) -> impl Iterator<Item = (&Label, f64)> {
        self.labels.iter().zip(self.values.iter().copied())
    }

    /// The sum of all entries
    pub fn sum(&self) -> f64 {
        self.values.sum()
    }
}

impl PartialEq for LabelledVector {
    fn eq(&self, other: &Self) -> bool {
        self.labels.iter().eq(other.labels.iter()) && self.values == other.values
    }
}

/// A dense matrix with labelled rows and columns
#[derive(Debug, Clone)]
pub struct LabelledMatrix {
    row_labels: IndexSet<Label>,
    col_labels: IndexSet<Label>,
    data: DMatrix<f64>,
}

impl LabelledMatrix {
    /// Create a new [`LabelledMatrix`].
    ///
    /// # Arguments
    ///
    /// * `row_labels` - Labels for the rows, which must be unique
    /// * `col_labels` - Labels for the columns, which must be unique
    /// * `data` - The values, with dimensions matching the number of labels
    pub fn new<R, C>(row_labels: R, col_labels: C, data: DMatrix<f64>) -> Result<Self>
    where
        R: IntoIterator<Item = Label>,
        C: IntoIterator<Item = Label>,
    {
        let row_labels = unique_labels(row_labels, "row")?;
        let col_labels = unique_labels(col_labels, "column")?;
        ensure!(
            data.nrows() == row_labels.len() && data.ncols() == col_labels.len(),
            "Matrix is {}x{} but has {} row labels and {} column labels",
            data.nrows(),
            data.ncols(),
            row_labels.len(),
            col_labels.len()
        );

        Ok(Self {
            row_labels,
            col_labels,
            data,
        })
    }

    /// Create a matrix of zeros with the given labels
    pub fn zeros(row_labels: IndexSet<Label>, col_labels: IndexSet<Label>) -> Self {
        let data = DMatrix::zeros(row_labels.len(), col_labels.len());
        Self {
            row_labels,
            col_labels,
            data,
        }
    }

    /// Create from labels already known to be unique and data with matching dimensions
    pub(crate) fn from_parts(
        row_labels: IndexSet<Label>,
        col_labels: IndexSet<Label>,
        data: DMatrix<f64>,
    ) -> Self {
        debug_assert_eq!(data.shape(), (row_labels.len(), col_labels.len()));
        Self {
            row_labels,
            col_labels,
            data,
        }
    }

    /// Labels of the rows, in order
    pub fn row_labels(&self) -> &IndexSet<Label> {
        &self.row_labels
    }

    /// Labels of the columns, in order
    pub fn col_labels(&self) -> &IndexSet<Label> {
        &self.col_labels
    }

    /// The raw matrix data
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Number of rows
    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    /// Whether the matrix has no cells
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the value of a cell, which is zero if either label is not present
    pub fn get(&self, row: &str, col: &str) -> f64 {
        let row = self.row_labels.get_index_of(normalise_label(row).as_str());
        let col = self.col_labels.get_index_of(normalise_label(col).as_str());
        match (row, col) {
            (Some(row), Some(col)) => self.data[(row, col)],
            _ => 0.0,
        }
    }

    /// Whether row labels and column labels are identical and in the same order
    pub fn is_square_aligned(&self) -> bool {
        self.row_labels.iter().eq(self.col_labels.iter())
    }

    /// Iterate over all cells as (row label, column label, value)
    pub fn iter(&self) -> impl Iterator<Item = (&Label, &Label, f64)> {
        self.row_labels.iter().enumerate().flat_map(move |(i, row)| {
            self.col_labels
                .iter()
                .enumerate()
                .map(move |(j, col)| (row, col, self.data[(i, j)]))
        })
    }

    /// Return a matrix with the given row and column labels.
    ///
    /// Cells whose labels are present in `self` are copied; all others are zero. Labels of `self`
    /// which are not requested are dropped.
    pub fn reindex(&self, row_labels: &IndexSet<Label>, col_labels: &IndexSet<Label>) -> Self {
        let row_map: Vec<_> = row_labels
            .iter()
            .map(|label| self.row_labels.get_index_of(label))
            .collect();
        let col_map: Vec<_> = col_labels
            .iter()
            .map(|label| self.col_labels.get_index_of(label))
            .collect();

        let data = DMatrix::from_fn(row_labels.len(), col_labels.len(), |i, j| {
            match (row_map[i], col_map[j]) {
                (Some(src_i), Some(src_j)) => self.data[(src_i, src_j)],
                _ => 0.0,
            }
        });

        Self::from_parts(row_labels.clone(), col_labels.clone(), data)
    }

    /// Swap rows and columns
    pub fn transpose(&self) -> Self {
        Self::from_parts(
            self.col_labels.clone(),
            self.row_labels.clone(),
            self.data.transpose(),
        )
    }

    /// Sum of each column, keyed by column label
    pub fn column_sums(&self) -> LabelledVector {
        let sums = self.data.row_sum().transpose();
        LabelledVector::from_parts(self.col_labels.clone(), sums)
    }

    /// Sum of each row, keyed by row label
    pub fn row_sums(&self) -> LabelledVector {
        LabelledVector::from_parts(self.row_labels.clone(), self.data.column_sum())
    }

    /// Sum of all cells
    pub fn total(&self) -> f64 {
        self.data.sum()
    }

    /// Whether every cell is finite
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|value| value.is_finite())
    }
}

impl PartialEq for LabelledMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.row_labels.iter().eq(other.row_labels.iter())
            && self.col_labels.iter().eq(other.col_labels.iter())
            && self.data == other.data
    }
}

/// Builds a [`LabelledMatrix`] by summing any number of source matrices.
///
/// The union of all row and column labels is taken; missing cells are zero and cells present in
/// more than one source are added together. Once all sources have been added, the accumulator is
/// frozen with [`MatrixAccumulator::build`].
#[derive(Debug, Default)]
pub struct MatrixAccumulator {
    row_labels: IndexSet<Label>,
    col_labels: IndexSet<Label>,
    cells: HashMap<(usize, usize), f64>,
}

impl MatrixAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing has been added yet
    pub fn is_empty(&self) -> bool {
        self.row_labels.is_empty() && self.col_labels.is_empty()
    }

    /// Merge a matrix into the accumulated data
    pub fn add(&mut self, matrix: &LabelledMatrix) {
        let row_idx: Vec<_> = matrix
            .row_labels()
            .iter()
            .map(|label| self.row_labels.insert_full(label.clone()).0)
            .collect();
        let col_idx: Vec<_> = matrix
            .col_labels()
            .iter()
            .map(|label| self.col_labels.insert_full(label.clone()).0)
            .collect();

        for (i, &row) in row_idx.iter().enumerate() {
            for (j, &col) in col_idx.iter().enumerate() {
                let value = matrix.data()[(i, j)];
                if value != 0.0 {
                    *self.cells.entry((row, col)).or_insert(0.0) += value;
                }
            }
        }
    }

    /// Freeze the accumulated data into a matrix.
    ///
    /// Row and column labels are sorted, so the result does not depend on the order in which
    /// sources were added.
    pub fn build(self) -> LabelledMatrix {
        let mut row_labels = self.row_labels.clone();
        row_labels.sort();
        let mut col_labels = self.col_labels.clone();
        col_labels.sort();

        let mut data = DMatrix::zeros(row_labels.len(), col_labels.len());
        for ((row, col), value) in self.cells {
            let i = row_labels
                .get_index_of(&self.row_labels[row])
                .expect("Row label should be present");
            let j = col_labels
                .get_index_of(&self.col_labels[col])
                .expect("Column label should be present");
            data[(i, j)] = value;
        }

        LabelledMatrix::from_parts(row_labels, col_labels, data)
    }
}
