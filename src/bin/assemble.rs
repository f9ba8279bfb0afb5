use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nml_assembler::analysis::{AnalysisRunner, IfCurveRequest, PythonRunner};
use nml_assembler::assembly::assemble;
use nml_assembler::catalogue::{self, BUILTIN_NAMES};
use nml_assembler::classify::HL5PC_TABLES;
use nml_assembler::constants::DEFAULT_CELL;
use nml_assembler::serialize::ParameterSet;

/// Assemble NeuroML cell models from imported morphologies.
#[derive(Parser)]
#[command(name = "nml-assemble", version)]
struct Args {
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify segments and attach biophysics, writing <CELL>.cell.nml.
    Assemble {
        #[arg(default_value = DEFAULT_CELL)]
        cell: String,
        /// Built-in parameter set.
        #[arg(long, default_value = "full")]
        parameter_set: String,
        /// JSON parameter set, used instead of the built-in one.
        #[arg(long)]
        parameter_file: Option<PathBuf>,
        #[arg(long, default_value = ".")]
        input_dir: PathBuf,
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Print a built-in parameter set as JSON.
    Parameters { name: String },
    /// Run the current vs frequency analysis on an assembled cell.
    IfCurve {
        #[arg(default_value = DEFAULT_CELL)]
        cell: String,
        #[arg(long, default_value = "python3")]
        python: String,
    },
}

fn builtin(name: &str) -> Result<ParameterSet> {
    catalogue::builtin(name)
        .ok_or_else(|| anyhow!("unknown parameter set {name}, expected one of {BUILTIN_NAMES:?}"))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    match args.command {
        Commands::Assemble { cell, parameter_set, parameter_file, input_dir, output_dir } => {
            let parameters = match parameter_file {
                Some(path) => {
                    let json = fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    serde_json::from_str(&json)
                        .with_context(|| format!("parsing parameter set {}", path.display()))?
                }
                None => builtin(&parameter_set)?,
            };
            let written = assemble(&cell, &input_dir, &output_dir, &HL5PC_TABLES, &parameters)
                .with_context(|| format!("assembling {cell}"))?;
            info!("Wrote {}", written.display());
        }
        Commands::Parameters { name } => {
            println!("{}", serde_json::to_string_pretty(&builtin(&name)?)?);
        }
        Commands::IfCurve { cell, python } => {
            let mut runner = PythonRunner { interpreter: python };
            runner
                .run(&IfCurveRequest::for_cell(&cell))
                .with_context(|| format!("analysing {cell}"))?;
        }
    }
    Ok(())
}
