//! The Leontief calculator, which derives total output and total environmental results from a
//! final demand.
//!
//! For a direct requirements matrix `A` and a demand `d`, the total output is `x = (I - A)^-1 d`.
//! Total flows are then `f = M x` for a satellite matrix `M` and impact scores are `h = C f` for
//! a matrix of characterisation factors `C`.
use crate::demand::Demand;
use crate::error::ModelError;
use crate::id::Label;
use crate::impact::ImpactTable;
use crate::io_model::IOModel;
use crate::matrix::{LabelledMatrix, LabelledVector};
use crate::satellite::SatelliteTable;
use anyhow::Result;
use indexmap::IndexSet;
use itertools::Itertools;
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

/// Pivots of the LU decomposition smaller than this (relative to the largest pivot) indicate that
/// (I - A) is singular
pub const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Check that `drc` is square, reordering its columns to match its rows if needed
fn square_aligned(drc: &LabelledMatrix) -> Result<LabelledMatrix> {
    if drc.is_square_aligned() {
        return Ok(drc.clone());
    }

    if drc.nrows() != drc.ncols() {
        Err(ModelError::alignment(format!(
            "coefficients matrix is not square ({} rows, {} columns)",
            drc.nrows(),
            drc.ncols()
        )))?;
    }

    let unmatched = drc
        .row_labels()
        .iter()
        .filter(|label| !drc.col_labels().contains(*label))
        .map(|label| format!("'{label}'"))
        .join(", ");
    if !unmatched.is_empty() {
        Err(ModelError::alignment(format!(
            "sectors {unmatched} are rows but not columns of the coefficients matrix"
        )))?;
    }

    Ok(drc.reindex(drc.row_labels(), drc.row_labels()))
}

/// The Leontief inverse `L = (I - A)^-1` of a direct requirements matrix.
///
/// Computing the inverse is the expensive step of a calculation, so it can be reused for any
/// number of demands.
#[derive(Debug, Clone, PartialEq)]
pub struct LeontiefInverse(LabelledMatrix);

impl LeontiefInverse {
    /// Invert `I - A` for the given direct requirements matrix.
    ///
    /// Fails if `A` is not square or if `I - A` is singular.
    pub fn new(drc: &LabelledMatrix) -> Result<Self> {
        let drc = square_aligned(drc)?;
        let n = drc.nrows();
        debug!("Calculating Leontief inverse for {n} sectors");

        let lu = (DMatrix::identity(n, n) - drc.data()).lu();
        if n > 0 {
            let pivots = lu.u().diagonal().abs();
            let largest = pivots.max();
            if largest == 0.0 || pivots.min() <= SINGULAR_TOLERANCE * largest {
                Err(ModelError::SingularMatrix { size: n })?;
            }
        }

        let inverse = lu
            .try_inverse()
            .filter(|inverse| inverse.iter().all(|value| value.is_finite()))
            .ok_or(ModelError::SingularMatrix { size: n })?;

        Ok(Self(LabelledMatrix::from_parts(
            drc.row_labels().clone(),
            drc.col_labels().clone(),
            inverse,
        )))
    }

    /// The sectors of the model, in order
    pub fn sectors(&self) -> &IndexSet<Label> {
        self.0.row_labels()
    }

    /// The total requirements matrix `L`
    pub fn matrix(&self) -> &LabelledMatrix {
        &self.0
    }

    /// Align a demand with the sectors of the model.
    ///
    /// Demand for sectors which are not part of the model is ignored.
    fn demand_vector(&self, demand: &Demand) -> DVector<f64> {
        let mut values = DVector::zeros(self.sectors().len());
        for (sector, amount) in demand.iter() {
            match self.sectors().get_index_of(sector) {
                Some(idx) => values[idx] += amount,
                None => warn!("Ignoring demand for sector '{sector}', which is not in the model"),
            }
        }

        values
    }

    /// Calculate the total output `x = L d` of every sector for the given demand
    pub fn total_output(&self, demand: &Demand) -> LabelledVector {
        let demand = self.demand_vector(demand);
        LabelledVector::from_parts(self.sectors().clone(), self.0.data() * demand)
    }
}

/// The results of a calculation for a single demand
#[derive(Debug, Clone, PartialEq)]
pub struct CalcResult {
    total_output: LabelledVector,
    flow_results: LabelledVector,
    flow_contributions: LabelledMatrix,
    impact_results: Option<LabelledVector>,
    impact_contributions: Option<LabelledMatrix>,
}

impl CalcResult {
    /// Total (direct and indirect) output of each sector
    pub fn total_output(&self) -> &LabelledVector {
        &self.total_output
    }

    /// Total amount of each flow
    pub fn flow_results(&self) -> &LabelledVector {
        &self.flow_results
    }

    /// Amount of each flow (rows) attributed to each sector (columns)
    pub fn flow_contributions(&self) -> &LabelledMatrix {
        &self.flow_contributions
    }

    /// Total score of each impact category, if characterisation factors were provided
    pub fn impact_results(&self) -> Option<&LabelledVector> {
        self.impact_results.as_ref()
    }

    /// Score of each impact category (rows) attributed to each sector (columns), if
    /// characterisation factors were provided
    pub fn impact_contributions(&self) -> Option<&LabelledMatrix> {
        self.impact_contributions.as_ref()
    }
}

/// Calculates results for demands using a fixed model.
///
/// The calculator is immutable, so it can be shared between threads to evaluate many demands
/// concurrently.
#[derive(Debug, Clone)]
pub struct Calculator {
    inverse: LeontiefInverse,
    /// Satellite matrix with columns aligned to the sectors of the model
    flows: LabelledMatrix,
    /// Characterisation factors with columns aligned to the rows of `flows`
    factors: Option<LabelledMatrix>,
}

impl Calculator {
    /// Create a calculator for a direct requirements matrix and satellite table.
    ///
    /// Sectors of the model which are not in the satellite table have no flows. Sectors of the
    /// satellite table which are not in the model are ignored.
    pub fn new(drc: &LabelledMatrix, satellite: &SatelliteTable) -> Result<Self> {
        let inverse = LeontiefInverse::new(drc)?;
        let flows = align_satellite(satellite.matrix(), inverse.sectors())?;

        Ok(Self {
            inverse,
            flows,
            factors: None,
        })
    }

    /// Include characterisation factors so that impact scores are calculated.
    ///
    /// Flows without factors do not contribute to any category.
    pub fn with_impacts(mut self, impacts: &ImpactTable) -> Self {
        let factors = impacts.matrix();
        let unused = factors
            .col_labels()
            .iter()
            .filter(|flow| !self.flows.row_labels().contains(*flow))
            .count();
        if unused > 0 {
            debug!("{unused} flows with characterisation factors are not in the satellite table");
        }

        self.factors = Some(factors.reindex(factors.row_labels(), self.flows.row_labels()));
        self
    }

    /// The Leontief inverse used by the calculator
    pub fn leontief_inverse(&self) -> &LeontiefInverse {
        &self.inverse
    }

    /// Calculate all results for the given demand
    pub fn calculate(&self, demand: &Demand) -> CalcResult {
        let total_output = self.inverse.total_output(demand);
        let flow_data = self.flows.data() * total_output.values();
        let flow_results = LabelledVector::from_parts(self.flows.row_labels().clone(), flow_data);

        let mut contributions = self.flows.data().clone();
        for (mut column, output) in contributions
            .column_iter_mut()
            .zip(total_output.values().iter())
        {
            column *= *output;
        }
        let flow_contributions = LabelledMatrix::from_parts(
            self.flows.row_labels().clone(),
            self.flows.col_labels().clone(),
            contributions,
        );

        let (impact_results, impact_contributions) = match &self.factors {
            None => (None, None),
            Some(factors) => {
                let scores = factors.data() * flow_results.values();
                let attributed = factors.data() * flow_contributions.data();
                (
                    Some(LabelledVector::from_parts(
                        factors.row_labels().clone(),
                        scores,
                    )),
                    Some(LabelledMatrix::from_parts(
                        factors.row_labels().clone(),
                        flow_contributions.col_labels().clone(),
                        attributed,
                    )),
                )
            }
        };

        CalcResult {
            total_output,
            flow_results,
            flow_contributions,
            impact_results,
            impact_contributions,
        }
    }
}

/// Align the columns of a satellite matrix with the sectors of the model
fn align_satellite(
    satellite: &LabelledMatrix,
    sectors: &IndexSet<Label>,
) -> Result<LabelledMatrix> {
    if !satellite.is_empty() {
        let unknown = satellite
            .col_labels()
            .iter()
            .filter(|sector| !sectors.contains(*sector))
            .collect_vec();
        if unknown.len() == satellite.ncols() {
            Err(ModelError::alignment(
                "satellite table has no sectors in common with the coefficients matrix",
            ))?;
        }
        for sector in unknown {
            warn!("Ignoring satellite data for sector '{sector}', which is not in the model");
        }
    }

    Ok(satellite.reindex(satellite.row_labels(), sectors))
}

/// Calculate an IO model with the given satellite table and demand
pub fn calculate(
    io_model: &IOModel,
    satellite: &SatelliteTable,
    demand: &Demand,
) -> Result<CalcResult> {
    let drc = io_model.get_dr_coefficients()?;
    let calculator = Calculator::new(&drc, satellite)?;
    Ok(calculator.calculate(demand))
}
