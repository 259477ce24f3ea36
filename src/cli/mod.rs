//! CLI command definitions and handlers

mod batch;
mod calibrate;
mod chain;
mod inspect;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{load_calibration_config, CalibrationConfig};

/// layercal - Multi-layer method calibration
#[derive(Parser, Debug)]
#[command(name = "layercal")]
#[command(
    version,
    about = "Role-driven multi-layer calibration scores for pipeline methods",
    long_about = "layercal resolves the layers a method's role requires, evaluates each \
layer from the supplied evidence, refuses incomplete calibrations, and fuses the layer \
scores with a Choquet-style aggregator into one bounded, auditable score.",
    after_help = "\
Examples:
  layercal --config ./calibration calibrate --method IndicatorScorer.score --evidence ev.json
  layercal chain --methods Loader.load,Parser.parse,Scorer.score --inputs path
  layercal layers Reporter.render
  layercal check-config --config ./calibration"
)]
pub struct Cli {
    /// Configuration directory (calibration.toml + method tables)
    #[arg(long, global = true, env = "LAYERCAL_CONFIG", default_value = ".")]
    pub config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Calibrate one method invocation
    #[command(after_help = "\
Examples:
  layercal calibrate --method Scorer.score --evidence evidence.json
  layercal calibrate --method Report.render --role REPORT --format json")]
    Calibrate {
        /// Method id, as used in the configuration tables
        #[arg(long, short = 'm')]
        method: String,

        /// Role override (INGEST_PDM, STRUCTURE, EXTRACT, SCORE_Q, AGGREGATE, REPORT, META_TOOL, TRANSFORM)
        #[arg(long)]
        role: Option<String>,

        /// Evidence JSON file (default: empty evidence)
        #[arg(long, short = 'e')]
        evidence: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Calibrate every entry of a JSON batch file in parallel
    Batch {
        /// JSON array of {"subject": {...}, "evidence": {...}}
        file: PathBuf,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Validate an ordered method sequence (weakest link)
    Chain {
        /// Methods in execution order, comma-separated
        #[arg(long, value_delimiter = ',', required = true)]
        methods: Vec<String>,

        /// Inputs available before the first method, comma-separated
        #[arg(long, value_delimiter = ',')]
        inputs: Vec<String>,

        /// JSON file mapping method id to the outputs it declares
        #[arg(long)]
        outputs: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Show the role and required layers for a method
    Layers {
        /// Method id
        method: String,

        /// Role override
        #[arg(long)]
        role: Option<String>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Validate the configuration directory and print its fingerprint
    CheckConfig,
}

/// Load and validate the configuration directory
pub(crate) fn load_config(dir: &Path) -> Result<CalibrationConfig> {
    load_calibration_config(dir)
        .with_context(|| format!("Failed to load configuration from {}", dir.display()))
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Calibrate {
            method,
            role,
            evidence,
            format,
        } => calibrate::run(&cli.config, &method, role.as_deref(), evidence.as_deref(), &format),
        Commands::Batch { file, format } => batch::run(&cli.config, &file, &format),
        Commands::Chain {
            methods,
            inputs,
            outputs,
            format,
        } => chain::run(&cli.config, &methods, &inputs, outputs.as_deref(), &format),
        Commands::Layers {
            method,
            role,
            format,
        } => inspect::layers(&cli.config, &method, role.as_deref(), &format),
        Commands::CheckConfig => inspect::check_config(&cli.config),
    }
}
