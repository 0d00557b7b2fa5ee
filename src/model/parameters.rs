//! Defines the `ModelFile` struct, which represents the contents of `model.toml`.
use crate::input::{input_err_msg, read_toml};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub(crate) const MODEL_FILE_NAME: &str = "model.toml";

fn default_demand() -> PathBuf {
    PathBuf::from("demand.csv")
}

/// Where the direct requirements coefficients of a model come from
#[derive(Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CoefficientsSource {
    /// A precomputed coefficients matrix
    Matrix {
        /// CSV file containing the matrix
        matrix: PathBuf,
    },
    /// Supply and use tables, from which the coefficients are calculated
    SupplyUse {
        /// CSV file containing the supply table (commodity x industry)
        supply_table: PathBuf,
        /// CSV file containing the use table (commodity x industry and final demand)
        use_table: PathBuf,
        /// Scrap sectors, whose output is reallocated to the industries generating scrap
        #[serde(default)]
        scrap_sectors: Vec<String>,
    },
}

/// Represents the contents of the entire model file.
///
/// All paths are relative to the model directory.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelFile {
    /// CSV file describing the sectors of the model
    pub sectors: PathBuf,
    /// CSV files containing satellite tables (flow x sector)
    pub satellite_tables: Vec<PathBuf>,
    /// CSV files containing characterisation factors (impact category x flow)
    #[serde(default)]
    pub impact_tables: Vec<PathBuf>,
    /// CSV file of units (built-in units are used if absent)
    pub units: Option<PathBuf>,
    /// CSV file of compartments (built-in compartments are used if absent)
    pub compartments: Option<PathBuf>,
    /// CSV file of locations (built-in locations are used if absent)
    pub locations: Option<PathBuf>,
    /// CSV file of demand scenarios
    #[serde(default = "default_demand")]
    pub demand: PathBuf,
    /// Source of the direct requirements coefficients
    pub coefficients: CoefficientsSource,
}

impl ModelFile {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelFile`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelFile> {
        let file_path = model_dir.as_ref().join(MODEL_FILE_NAME);
        let model_file: ModelFile = read_toml(&file_path)?;

        model_file
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_file)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            !self.satellite_tables.is_empty(),
            "At least one satellite table must be given"
        );

        if let CoefficientsSource::SupplyUse { scrap_sectors, .. } = &self.coefficients {
            ensure!(
                scrap_sectors.iter().all(|sector| !sector.trim().is_empty()),
                "Scrap sector names cannot be empty"
            );
        }

        Ok(())
    }
}
