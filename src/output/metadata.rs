//! Code for writing metadata to file
use crate::demand::DemandScenarios;
use crate::model::Model;
use anyhow::Result;
use chrono::prelude::*;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

/// Information about the program build via `built` crate
mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Get information about program version from git
fn get_git_hash() -> String {
    let Some(hash) = built_info::GIT_COMMIT_HASH_SHORT else {
        return "unknown".into();
    };

    if built_info::GIT_DIRTY == Some(true) {
        format!("{hash}-dirty")
    } else {
        hash.into()
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    model: ModelMetadata,
    program: ProgramMetadata<'a>,
    platform: PlatformMetadata,
}

/// Information about the model run
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// Path to the model which was run
    model_path: &'a Path,
    /// The date and time on which the run started
    datetime: String,
}

impl<'a> RunMetadata<'a> {
    fn new(model_path: &'a Path) -> Self {
        let dt = Local::now();
        Self {
            model_path,
            datetime: dt.to_rfc2822(),
        }
    }
}

/// Summary of the model's dimensions
#[derive(Serialize)]
struct ModelMetadata {
    sectors: usize,
    flows: usize,
    impact_categories: usize,
    scenarios: Vec<String>,
}

impl ModelMetadata {
    fn new(model: &Model, scenarios: &DemandScenarios) -> Self {
        Self {
            sectors: model.drc.nrows(),
            flows: model.satellite.flows().len(),
            impact_categories: model
                .impacts
                .as_ref()
                .map_or(0, |impacts| impacts.categories().len()),
            scenarios: scenarios.keys().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Serialize)]
struct ProgramMetadata<'a> {
    /// The program name
    name: &'a str,
    /// The program version as specified in Cargo.toml
    version: &'a str,
    /// The target architecture for the build (e.g. x86_64-unknown-linux-gnu)
    target: &'a str,
    /// Whether it is a debug build
    is_debug: bool,
    /// The version of rustc used to compile the program
    rustc_version: &'a str,
    /// When the program was built
    build_time_utc: &'a str,
    /// The git commit hash for the program version (if known)
    git_commit_hash: String,
}

impl Default for ProgramMetadata<'_> {
    fn default() -> Self {
        Self {
            name: built_info::PKG_NAME,
            version: built_info::PKG_VERSION,
            target: built_info::TARGET,
            is_debug: built_info::DEBUG,
            rustc_version: built_info::RUSTC_VERSION,
            build_time_utc: built_info::BUILT_TIME_UTC,
            git_commit_hash: get_git_hash(),
        }
    }
}

/// Information about the platform on which the program is running.
///
/// The fields correspond to different data available from the [`PlatformInfo`] struct.
#[derive(Serialize)]
struct PlatformMetadata {
    sysname: String,
    nodename: String,
    release: String,
    version: String,
    machine: String,
    osname: String,
}

impl Default for PlatformMetadata {
    fn default() -> Self {
        let Ok(info) = PlatformInfo::new() else {
            return Self::unknown();
        };
        Self {
            sysname: info.sysname().to_string_lossy().into(),
            nodename: info.nodename().to_string_lossy().into(),
            release: info.release().to_string_lossy().into(),
            version: info.version().to_string_lossy().into(),
            machine: info.machine().to_string_lossy().into(),
            osname: info.osname().to_string_lossy().into(),
        }
    }
}

impl PlatformMetadata {
    fn unknown() -> Self {
        let unknown = || "unknown".to_string();
        Self {
            sysname: unknown(),
            nodename: unknown(),
            release: unknown(),
            version: unknown(),
            machine: unknown(),
            osname: unknown(),
        }
    }
}

/// Write metadata to the specified output path in TOML format
pub fn write_metadata(
    output_path: &Path,
    model_path: &Path,
    model: &Model,
    scenarios: &DemandScenarios,
) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata::new(model_path),
        model: ModelMetadata::new(model, scenarios),
        program: ProgramMetadata::default(),
        platform: PlatformMetadata::default(),
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_git_hash_not_empty() {
        assert!(!get_git_hash().is_empty());
    }

    #[test]
    fn test_program_metadata() {
        let program = ProgramMetadata::default();
        assert_eq!(program.name, "iomb");
        assert_eq!(program.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_write_run_metadata() {
        let dir = tempdir().unwrap();
        let run = RunMetadata::new(Path::new("model"));
        let file_path = dir.path().join(METADATA_FILE_NAME);
        fs::write(&file_path, toml::to_string(&run).unwrap()).unwrap();

        let contents = fs::read_to_string(&file_path).unwrap();
        assert!(contents.contains("model_path = \"model\""));
        assert!(contents.contains("datetime"));
    }
}
