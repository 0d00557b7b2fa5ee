//! The command line interface for iomb.
use crate::io_model::coefficients_from_sut;
use crate::log;
use crate::model::load_model;
use crate::output::metadata::write_metadata;
use crate::output::{create_output_directory, get_output_dir, write_matrix, write_matrix_to};
use crate::settings::Settings;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for iomb.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to write the contribution of each sector to each flow
    #[arg(long)]
    pub debug_model: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Calculate all demand scenarios of a model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Manage example models.
    Example {
        /// The available subcommands for managing example models.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a model.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Calculate direct requirements coefficients from supply and use tables.
    Coefficients {
        /// CSV file containing the supply table (commodity x industry).
        supply_table: PathBuf,
        /// CSV file containing the use table (commodity x industry and final demand).
        use_table: PathBuf,
        /// A scrap sector, whose output is reallocated to the industries generating scrap (may be
        /// repeated).
        #[arg(long = "scrap")]
        scrap_sectors: Vec<String>,
        /// File to write the coefficients to (printed to the console if not given).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Manage program settings.
    Settings {
        /// The subcommands for managing settings.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
            Self::Coefficients {
                supply_table,
                use_table,
                scrap_sectors,
                output,
            } => handle_coefficients_command(
                &supply_table,
                &use_table,
                &scrap_sectors,
                output.as_deref(),
                None,
            ),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start iomb
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ iomb --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let mut settings = load_settings(settings)?;

    // These settings can be overridden by command-line arguments
    if opts.debug_model {
        settings.debug_model = true;
    }
    if opts.overwrite {
        settings.overwrite = true;
    }

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(model_path)?;
        &pathbuf
    };

    let overwrite =
        create_output_directory(output_path, settings.overwrite).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    // Initialise program logger
    log::init(Some(settings.log_level.as_str()), Some(output_path))
        .context("Failed to initialise logging.")?;

    // Load the model to run
    let (model, scenarios) = load_model(model_path).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    write_metadata(output_path, model_path, &model, &scenarios)
        .context("Failed to save metadata.")?;

    // Calculate the scenarios
    crate::run::run(&model, &scenarios, output_path, settings.debug_model)?;
    info!("Calculated {} scenarios", scenarios.len());

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(Some(settings.log_level.as_str()), None)
        .context("Failed to initialise logging.")?;

    // Load/validate the model, including checking that the Leontief matrix can be inverted
    let (model, _) = load_model(model_path).context("Failed to validate model.")?;
    model.calculator().context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}

/// Handle the `coefficients` command.
pub fn handle_coefficients_command(
    supply_table: &Path,
    use_table: &Path,
    scrap_sectors: &[String],
    output: Option<&Path>,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    log::init(Some(settings.log_level.as_str()), None)
        .context("Failed to initialise logging.")?;

    let drc = coefficients_from_sut(supply_table, use_table, scrap_sectors)
        .context("Failed to calculate coefficients.")?;

    match output {
        Some(file_path) => {
            write_matrix(file_path, &drc)?;
            info!("Coefficients written to {}", file_path.display());
        }
        None => write_matrix_to(csv::Writer::from_writer(std::io::stdout()), &drc)?,
    }

    Ok(())
}
