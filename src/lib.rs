//! Environmentally extended input-output models.
//!
//! Builds direct requirements coefficients from supply and use tables, combines them with
//! satellite tables of environmental flows and impact assessment factors, and calculates the
//! total output, flows and impacts caused by a final demand.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod calc;
pub mod cli;
pub mod demand;
pub mod error;
pub mod id;
pub mod impact;
pub mod input;
pub mod io_model;
pub mod log;
pub mod matrix;
pub mod model;
pub mod output;
pub mod refmap;
pub mod run;
pub mod satellite;
pub mod settings;

#[cfg(test)]
mod fixture;

/// Get the directory where program configuration files are stored.
///
/// Falls back to the current directory if the platform has no config directory.
pub fn get_iomb_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        return PathBuf::from(".");
    };

    config_dir.push("iomb");
    config_dir
}
