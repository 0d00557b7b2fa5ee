//! Final demand vectors, which drive the calculation of a model.
use crate::id::Label;
use crate::input::{input_err_msg, read_csv};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

/// A sparse vector of final demand, keyed by sector.
///
/// Sectors which are not present have zero demand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Demand(IndexMap<Label, f64>);

impl Demand {
    /// Create an empty demand
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an amount of demand for a sector, summing with any existing demand
    pub fn add(&mut self, sector: Label, amount: f64) {
        *self.0.entry(sector).or_insert(0.0) += amount;
    }

    /// The demand for a sector (zero if absent)
    pub fn get(&self, sector: &str) -> f64 {
        self.0
            .get(crate::id::normalise_label(sector).as_str())
            .copied()
            .unwrap_or(0.0)
    }

    /// Iterate over sectors and their demand
    pub fn iter(&self) -> impl Iterator<Item = (&Label, f64)> {
        self.0.iter().map(|(sector, amount)| (sector, *amount))
    }

    /// Number of sectors with an entry
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for Demand {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut demand = Demand::new();
        for (sector, amount) in iter {
            demand.add(Label::new(sector.as_ref()), amount);
        }
        demand
    }
}

/// Named demand vectors, in the order in which they were defined
pub type DemandScenarios = IndexMap<Label, Demand>;

/// Represents a row of the demand CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct DemandRow {
    scenario: Label,
    sector: Label,
    amount: f64,
}

/// Read demand scenarios from a CSV file with the columns `scenario`, `sector` and `amount`.
///
/// Entries for the same scenario and sector are summed.
pub fn read_demand_scenarios(file_path: &Path) -> Result<DemandScenarios> {
    let iter = read_csv::<DemandRow>(file_path)?;
    read_demand_scenarios_from_iter(iter).with_context(|| input_err_msg(file_path))
}

fn read_demand_scenarios_from_iter<I>(iter: I) -> Result<DemandScenarios>
where
    I: Iterator<Item = DemandRow>,
{
    let mut scenarios = DemandScenarios::new();
    for row in iter {
        ensure!(
            row.amount.is_finite(),
            "Demand for sector {} in scenario {} must be a finite number",
            row.sector,
            row.scenario
        );
        ensure!(
            !row.scenario.as_str().is_empty() && !row.sector.as_str().is_empty(),
            "Scenario and sector names cannot be empty"
        );

        scenarios
            .entry(row.scenario)
            .or_default()
            .add(row.sector, row.amount);
    }

    Ok(scenarios)
}
