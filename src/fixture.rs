//! Fixtures for tests

use crate::demand::Demand;
use crate::id::Label;
use crate::impact::{ImpactTable, ImpactTableBuilder};
use crate::matrix::{LabelledMatrix, LabelledVector};
use crate::satellite::{SatelliteTable, SatelliteTableBuilder};
use float_cmp::approx_eq;
use nalgebra::{DMatrix, DVector, dmatrix};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Create a [`LabelledMatrix`] from string labels, panicking on invalid input
pub fn labelled_matrix(rows: &[&str], cols: &[&str], data: DMatrix<f64>) -> LabelledMatrix {
    LabelledMatrix::new(
        rows.iter().map(|&row| Label::new(row)),
        cols.iter().map(|&col| Label::new(col)),
        data,
    )
    .unwrap()
}

/// Create a [`LabelledVector`] from string labels, panicking on invalid input
pub fn labelled_vector(labels: &[&str], values: &[f64]) -> LabelledVector {
    LabelledVector::new(
        labels.iter().map(|&label| Label::new(label)),
        DVector::from_column_slice(values),
    )
    .unwrap()
}

/// Check that two vectors have the same labels and approximately equal values
pub fn assert_vector_approx_eq(actual: &LabelledVector, expected: &LabelledVector) {
    assert!(
        actual.labels().iter().eq(expected.labels().iter()),
        "Labels differ: {:?} vs {:?}",
        actual.labels(),
        expected.labels()
    );
    for ((label, a), (_, e)) in actual.iter().zip(expected.iter()) {
        assert!(
            approx_eq!(f64, a, e, epsilon = 1e-9),
            "Value for {label} differs: {a} vs {e}"
        );
    }
}

/// Check that two matrices have the same labels and approximately equal values
pub fn assert_matrix_approx_eq(actual: &LabelledMatrix, expected: &LabelledMatrix) {
    assert!(
        actual.row_labels().iter().eq(expected.row_labels().iter())
            && actual.col_labels().iter().eq(expected.col_labels().iter()),
        "Labels differ"
    );
    for ((row, col, a), (_, _, e)) in actual.iter().zip(expected.iter()) {
        assert!(
            approx_eq!(f64, a, e, epsilon = 1e-9),
            "Value for ({row}, {col}) differs: {a} vs {e}"
        );
    }
}

/// A supply table where each of two industries produces only its own commodity
#[fixture]
pub fn supply_table() -> LabelledMatrix {
    labelled_matrix(
        &["ind1", "ind2"],
        &["ind1", "ind2"],
        dmatrix![
            100.0, 0.0;
            0.0, 50.0
        ],
    )
}

/// A use table matching [`supply_table`], with a final demand column
#[fixture]
pub fn use_table() -> LabelledMatrix {
    labelled_matrix(
        &["ind1", "ind2"],
        &["ind1", "ind2", "f01000"],
        dmatrix![
            20.0, 0.0, 80.0;
            0.0, 15.0, 35.0
        ],
    )
}

/// The direct requirements matrix for [`supply_table`] and [`use_table`]
#[fixture]
pub fn drc() -> LabelledMatrix {
    labelled_matrix(
        &["ind1", "ind2"],
        &["ind1", "ind2"],
        dmatrix![
            0.2, 0.0;
            0.0, 0.3
        ],
    )
}

/// A satellite table with two flows for the sectors of [`drc`]
#[fixture]
pub fn satellite_table() -> SatelliteTable {
    let mut builder = SatelliteTableBuilder::new();
    builder.add(&labelled_matrix(
        &["co2", "water"],
        &["ind1", "ind2"],
        dmatrix![
            2.0, 1.0;
            0.5, 4.0
        ],
    ));
    builder.build()
}

/// An impact table with characterisation factors for the flows in [`satellite_table`]
#[fixture]
pub fn impact_table() -> ImpactTable {
    let mut builder = ImpactTableBuilder::new();
    builder.add(&labelled_matrix(
        &["global warming", "water use"],
        &["co2", "water", "ch4"],
        dmatrix![
            1.0, 0.0, 25.0;
            0.0, 1.0, 0.0
        ],
    ));
    builder.build()
}

/// A demand of 100 for the first industry
#[fixture]
pub fn demand() -> Demand {
    [("ind1", 100.0)].into_iter().collect()
}
