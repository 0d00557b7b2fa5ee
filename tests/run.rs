//! Integration tests for the `run` command.
use iomb::cli::{RunOpts, handle_run_command};
use iomb::settings::Settings;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

/// Get the path to the example model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/two_sector")
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("IOMB_LOG_LEVEL", "off") };

    // Save results to non-existent directory to check that directory creation works
    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("results");
    let opts = RunOpts {
        output_dir: Some(output_dir.clone()),
        overwrite: false,
        debug_model: true,
    };
    handle_run_command(&get_model_dir(), &opts, Some(Settings::default())).unwrap();

    for file_name in [
        "direct_requirements.csv",
        "total_output.csv",
        "flow_results.csv",
        "impact_results.csv",
        "debug_flow_contributions.csv",
        "debug_impact_contributions.csv",
        "metadata.toml",
        "iomb_info.log",
        "iomb_error.log",
    ] {
        assert!(
            output_dir.join(file_name).is_file(),
            "Missing output file {file_name}"
        );
    }

    let metadata = fs::read_to_string(output_dir.join("metadata.toml")).unwrap();
    assert!(metadata.contains("sectors = 2"));

    // Second time will fail because the output directory is not empty
    assert_eq!(
        handle_run_command(&get_model_dir(), &opts, Some(Settings::default()))
            .unwrap_err()
            .chain()
            .next()
            .unwrap()
            .to_string(),
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    );
}
