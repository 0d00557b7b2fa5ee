//! Code for environmentally extended input-output models.
use crate::calc::Calculator;
use crate::demand::{DemandScenarios, read_demand_scenarios};
use crate::impact::ImpactTable;
use crate::input::read_labelled_matrix;
use crate::io_model::IOModel;
use crate::matrix::LabelledMatrix;
use crate::refmap::{CompartmentMap, LocationMap, SectorMap, UnitMap};
use crate::satellite::SatelliteTable;
use anyhow::Result;
use itertools::Itertools;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

pub mod parameters;
use parameters::{CoefficientsSource, ModelFile};

/// Maximum number of labels to include in a warning message
const MAX_LABELS_IN_WARNING: usize = 5;

/// An environmentally extended input-output model
#[derive(Debug, Clone)]
pub struct Model {
    /// Direct requirements coefficients (sector x sector)
    pub drc: LabelledMatrix,
    /// Environmental flows per unit of sector output
    pub satellite: SatelliteTable,
    /// Characterisation factors, if the model has any
    pub impacts: Option<ImpactTable>,
    /// Descriptions of the sectors
    pub sectors: SectorMap,
    /// Units of measurement
    pub units: UnitMap,
    /// Environmental compartments
    pub compartments: CompartmentMap,
    /// Geographic locations
    pub locations: LocationMap,
}

impl Model {
    /// Read a model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        let model_dir = model_dir.as_ref();
        let model_file = ModelFile::from_path(model_dir)?;
        Self::from_model_file(model_dir, &model_file)
    }

    /// Read the data files listed in a model file
    fn from_model_file(model_dir: &Path, model_file: &ModelFile) -> Result<Model> {
        let to_path = |path: &PathBuf| model_dir.join(path);

        let drc = match &model_file.coefficients {
            CoefficientsSource::Matrix { matrix } => {
                info!("Reading coefficients matrix");
                read_labelled_matrix(&to_path(matrix))?
            }
            CoefficientsSource::SupplyUse {
                supply_table,
                use_table,
                scrap_sectors,
            } => {
                info!("Calculating coefficients from supply and use tables");
                IOModel::from_csv(&to_path(supply_table), &to_path(use_table), scrap_sectors)?
                    .get_dr_coefficients()?
            }
        };

        let satellite_tables = model_file.satellite_tables.iter().map(to_path).collect_vec();
        let impact_tables = model_file.impact_tables.iter().map(to_path).collect_vec();
        let units = model_file.units.as_ref().map(to_path);
        let compartments = model_file.compartments.as_ref().map(to_path);
        let locations = model_file.locations.as_ref().map(to_path);

        assemble_model(
            drc,
            &satellite_tables,
            &to_path(&model_file.sectors),
            &impact_tables,
            units.as_deref(),
            compartments.as_deref(),
            locations.as_deref(),
        )
    }

    /// The sectors of the model, in the order of the coefficients matrix
    pub fn sector_labels(&self) -> impl Iterator<Item = &str> {
        self.drc.row_labels().iter().map(|label| label.as_str())
    }

    /// Create a calculator for the model.
    ///
    /// Impact results are only calculated if the model has characterisation factors.
    pub fn calculator(&self) -> Result<Calculator> {
        let calculator = Calculator::new(&self.drc, &self.satellite)?;
        Ok(match &self.impacts {
            Some(impacts) => calculator.with_impacts(impacts),
            None => calculator,
        })
    }
}

/// Create a model directly from data files.
///
/// Reference data files which are not given are replaced with built-in data.
///
/// # Arguments
///
/// * `drc_csv` - CSV file containing the direct requirements coefficients
/// * `sat_tables` - CSV files containing satellite tables
/// * `sector_csv` - CSV file describing the sectors
/// * `ia_tables` - CSV files containing characterisation factors
/// * `units_csv`, `compartments_csv`, `locations_csv` - Optional reference data files
pub fn make_model<P: AsRef<Path>>(
    drc_csv: &Path,
    sat_tables: &[P],
    sector_csv: &Path,
    ia_tables: &[P],
    units_csv: Option<&Path>,
    compartments_csv: Option<&Path>,
    locations_csv: Option<&Path>,
) -> Result<Model> {
    let drc = read_labelled_matrix(drc_csv)?;
    assemble_model(
        drc,
        sat_tables,
        sector_csv,
        ia_tables,
        units_csv,
        compartments_csv,
        locations_csv,
    )
}

fn assemble_model<P: AsRef<Path>>(
    drc: LabelledMatrix,
    sat_tables: &[P],
    sector_csv: &Path,
    ia_tables: &[P],
    units_csv: Option<&Path>,
    compartments_csv: Option<&Path>,
    locations_csv: Option<&Path>,
) -> Result<Model> {
    let satellite = SatelliteTable::from_files(sat_tables)?;
    let impacts = if ia_tables.is_empty() {
        debug!("No impact assessment tables given");
        None
    } else {
        Some(ImpactTable::from_files(ia_tables)?)
    };

    let sectors = SectorMap::read(sector_csv)?;
    let locations = LocationMap::read_or_default(locations_csv)?;
    check_sectors(&drc, &sectors, &locations);

    Ok(Model {
        drc,
        satellite,
        impacts,
        sectors,
        units: UnitMap::read_or_default(units_csv)?,
        compartments: CompartmentMap::read_or_default(compartments_csv)?,
        locations,
    })
}

/// Format a list of labels for a log message, truncating long lists
fn format_labels<'a, I: Iterator<Item = &'a str>>(labels: I) -> String {
    let labels = labels.collect_vec();
    let mut out = labels
        .iter()
        .take(MAX_LABELS_IN_WARNING)
        .map(|label| format!("'{label}'"))
        .join(", ");
    if labels.len() > MAX_LABELS_IN_WARNING {
        out.push_str(&format!(" and {} more", labels.len() - MAX_LABELS_IN_WARNING));
    }

    out
}

/// Warn about sectors of the coefficients matrix which have no description, and about sector
/// descriptions which refer to unknown locations
fn check_sectors(drc: &LabelledMatrix, sectors: &SectorMap, locations: &LocationMap) {
    let undescribed = drc
        .row_labels()
        .iter()
        .map(|label| label.as_str())
        .filter(|label| !sectors.contains(label))
        .collect_vec();
    if !undescribed.is_empty() {
        warn!(
            "{} sectors of the coefficients matrix are not in the sector map: {}",
            undescribed.len(),
            format_labels(undescribed.into_iter())
        );
    }

    for sector in sectors.iter() {
        if let Some(location) = &sector.location {
            if !locations.contains(location.as_str()) {
                warn!("Sector '{}' has unknown location '{location}'", sector.code);
            }
        }
    }
}

/// Load a model and its demand scenarios from the specified directory
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<(Model, DemandScenarios)> {
    let model_dir = model_dir.as_ref();
    let model_file = ModelFile::from_path(model_dir)?;
    let model = Model::from_model_file(model_dir, &model_file)?;
    let scenarios = read_demand_scenarios(&model_dir.join(&model_file.demand))?;

    for (name, demand) in &scenarios {
        let unknown = demand
            .iter()
            .map(|(sector, _)| sector.as_str())
            .filter(|sector| !model.drc.row_labels().contains(*sector))
            .collect_vec();
        if !unknown.is_empty() {
            warn!(
                "Scenario '{name}' has demand for sectors not in the model: {}",
                format_labels(unknown.into_iter())
            );
        }
    }

    Ok((model, scenarios))
}
