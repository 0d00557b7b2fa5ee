//! The module responsible for writing output data to disk.
use crate::calc::CalcResult;
use crate::id::Label;
use crate::matrix::LabelledMatrix;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "iomb_results";

/// The output file name for the direct requirements coefficients
pub const DIRECT_REQUIREMENTS_FILE_NAME: &str = "direct_requirements.csv";

/// The output file name for total output per sector
const TOTAL_OUTPUT_FILE_NAME: &str = "total_output.csv";

/// The output file name for flow results
const FLOW_RESULTS_FILE_NAME: &str = "flow_results.csv";

/// The output file name for impact results
const IMPACT_RESULTS_FILE_NAME: &str = "impact_results.csv";

/// The output file name for flow contributions of each sector
const FLOW_CONTRIBUTIONS_FILE_NAME: &str = "debug_flow_contributions.csv";

/// The output file name for impact contributions of each sector
const IMPACT_CONTRIBUTIONS_FILE_NAME: &str = "debug_impact_contributions.csv";

/// Get the default output directory for the model specified at `model_dir`
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory, deleting the existing one if `allow_overwrite` is set.
///
/// # Returns
///
/// Whether an existing, non-empty directory was overwritten
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut entries) = fs::read_dir(output_dir) {
        if entries.next().is_none() {
            // Already exists and is empty
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please delete the folder or pass the \
            --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Write a labelled matrix to a CSV file, with row labels in the first column
pub fn write_matrix(file_path: &Path, matrix: &LabelledMatrix) -> Result<()> {
    write_matrix_to(csv::Writer::from_path(file_path)?, matrix)
}

/// Write a labelled matrix in CSV format to any writer
pub fn write_matrix_to<W: io::Write>(
    mut writer: csv::Writer<W>,
    matrix: &LabelledMatrix,
) -> Result<()> {
    writer.write_record(
        std::iter::once("sector").chain(matrix.col_labels().iter().map(Label::as_str)),
    )?;

    for (i, row_label) in matrix.row_labels().iter().enumerate() {
        let values = matrix
            .data()
            .row(i)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        writer.write_record(
            std::iter::once(row_label.as_str()).chain(values.iter().map(String::as_str)),
        )?;
    }
    writer.flush()?;

    Ok(())
}

/// Represents a row in the total output CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TotalOutputRow {
    scenario: Label,
    sector: Label,
    value: f64,
}

/// Represents a row in the flow results CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct FlowResultRow {
    scenario: Label,
    flow: Label,
    value: f64,
}

/// Represents a row in the impact results CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ImpactResultRow {
    scenario: Label,
    category: Label,
    value: f64,
}

/// Represents a row in the flow contributions CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct FlowContributionRow {
    scenario: Label,
    flow: Label,
    sector: Label,
    value: f64,
}

/// Represents a row in the impact contributions CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ImpactContributionRow {
    scenario: Label,
    category: Label,
    sector: Label,
    value: f64,
}

/// For writing extra debug information about the model
struct DebugDataWriter {
    flow_contributions_writer: csv::Writer<File>,
    impact_contributions_writer: Option<csv::Writer<File>>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `has_impacts` - Whether impact contributions will be written
    fn create(output_path: &Path, has_impacts: bool) -> Result<Self> {
        let file_path = output_path.join(FLOW_CONTRIBUTIONS_FILE_NAME);
        let impact_contributions_writer = if has_impacts {
            let file_path = output_path.join(IMPACT_CONTRIBUTIONS_FILE_NAME);
            Some(csv::Writer::from_path(file_path)?)
        } else {
            None
        };

        Ok(Self {
            flow_contributions_writer: csv::Writer::from_path(file_path)?,
            impact_contributions_writer,
        })
    }

    /// Write the contribution of each sector to each flow
    fn write_flow_contributions(
        &mut self,
        scenario: &Label,
        contributions: &LabelledMatrix,
    ) -> Result<()> {
        for (flow, sector, value) in contributions.iter() {
            let row = FlowContributionRow {
                scenario: scenario.clone(),
                flow: flow.clone(),
                sector: sector.clone(),
                value,
            };
            self.flow_contributions_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write the contribution of each sector to each impact category
    fn write_impact_contributions(
        &mut self,
        scenario: &Label,
        contributions: &LabelledMatrix,
    ) -> Result<()> {
        let Some(wtr) = &mut self.impact_contributions_writer else {
            return Ok(());
        };

        for (category, sector, value) in contributions.iter() {
            let row = ImpactContributionRow {
                scenario: scenario.clone(),
                category: category.clone(),
                sector: sector.clone(),
                value,
            };
            wtr.serialize(row)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.flow_contributions_writer.flush()?;
        if let Some(wtr) = &mut self.impact_contributions_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}

/// An object for writing calculation results to file
pub struct DataWriter {
    total_output_writer: csv::Writer<File>,
    flow_results_writer: csv::Writer<File>,
    impact_results_writer: Option<csv::Writer<File>>,
    debug_writer: Option<DebugDataWriter>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `has_impacts` - Whether impact results will be written
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, has_impacts: bool, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let impact_results_writer = if has_impacts {
            Some(new_writer(IMPACT_RESULTS_FILE_NAME)?)
        } else {
            None
        };

        let debug_writer = if save_debug_info {
            // Create debug CSV files
            Some(DebugDataWriter::create(output_path, has_impacts)?)
        } else {
            None
        };

        Ok(Self {
            total_output_writer: new_writer(TOTAL_OUTPUT_FILE_NAME)?,
            flow_results_writer: new_writer(FLOW_RESULTS_FILE_NAME)?,
            impact_results_writer,
            debug_writer,
        })
    }

    /// Write all results of a calculation for the named scenario
    pub fn write_results(&mut self, scenario: &Label, result: &CalcResult) -> Result<()> {
        for (sector, value) in result.total_output().iter() {
            let row = TotalOutputRow {
                scenario: scenario.clone(),
                sector: sector.clone(),
                value,
            };
            self.total_output_writer.serialize(row)?;
        }

        for (flow, value) in result.flow_results().iter() {
            let row = FlowResultRow {
                scenario: scenario.clone(),
                flow: flow.clone(),
                value,
            };
            self.flow_results_writer.serialize(row)?;
        }

        if let (Some(wtr), Some(impacts)) =
            (&mut self.impact_results_writer, result.impact_results())
        {
            for (category, value) in impacts.iter() {
                let row = ImpactResultRow {
                    scenario: scenario.clone(),
                    category: category.clone(),
                    value,
                };
                wtr.serialize(row)?;
            }
        }

        if let Some(wtr) = &mut self.debug_writer {
            wtr.write_flow_contributions(scenario, result.flow_contributions())?;
            if let Some(contributions) = result.impact_contributions() {
                wtr.write_impact_contributions(scenario, contributions)?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.total_output_writer.flush()?;
        self.flow_results_writer.flush()?;
        if let Some(wtr) = &mut self.impact_results_writer {
            wtr.flush()?;
        }
        if let Some(wtr) = &mut self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}
