//! Functionality for calculating every demand scenario of a model and writing the results.
use crate::demand::DemandScenarios;
use crate::model::Model;
use crate::output::{DIRECT_REQUIREMENTS_FILE_NAME, DataWriter, write_matrix};
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::Path;

/// Run a model for all of its demand scenarios.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `scenarios` - Named demand vectors
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write additional information (e.g. flow contributions) to output
///   files
pub fn run(
    model: &Model,
    scenarios: &DemandScenarios,
    output_path: &Path,
    debug_model: bool,
) -> Result<()> {
    write_matrix(&output_path.join(DIRECT_REQUIREMENTS_FILE_NAME), &model.drc)
        .context("Failed to write coefficients matrix")?;

    info!("Inverting the {0}x{0} Leontief matrix", model.drc.nrows());
    let calculator = model.calculator()?;

    let mut writer = DataWriter::create(output_path, model.impacts.is_some(), debug_model)?;
    for (name, demand) in scenarios {
        info!("Calculating scenario '{name}'");
        let result = calculator.calculate(demand);
        debug!(
            "Scenario '{name}': total output {}, total flows {}",
            result.total_output().sum(),
            result.flow_results().sum()
        );

        writer
            .write_results(name, &result)
            .with_context(|| format!("Failed to write results for scenario '{name}'"))?;
    }
    writer.flush()?;

    Ok(())
}
