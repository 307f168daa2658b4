pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use solbill_core::config::{LoadOptions, LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

use crate::commands::{load_config, CommandResult};

#[derive(Debug, Parser)]
#[command(
    name = "solbill",
    about = "Solbill invoice pricing and anomaly CLI",
    long_about = "Price solar monitoring invoices from contract snapshots, validate tier sets, and check invoices against billing history.",
    after_help = "Examples:\n  solbill price --input contract.json\n  solbill check --input history.json\n  solbill tiers --input mw_tiers.json\n  solbill config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a solbill.toml file (must exist when given)")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Compute an invoice from an InvoiceComputationInput JSON file")]
    Price {
        #[arg(long, help = "Contract snapshot to price")]
        input: PathBuf,
    },
    #[command(about = "Run the anomaly checks against an invoice and its history")]
    Check {
        #[arg(long, help = "Invoice, prior invoices, and asset sync history")]
        input: PathBuf,
    },
    #[command(about = "Price an invoice and check it against history in one pass")]
    Evaluate {
        #[arg(long, help = "Contract snapshot plus invoice context")]
        input: PathBuf,
    },
    #[command(about = "Validate that a tier set covers [0, inf) without gaps or overlaps")]
    Tiers {
        #[arg(long, help = "Tier array, or an object with `name` and `tiers`")]
        input: PathBuf,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let result = execute(Cli::parse());

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Loads configuration once, installs logging, then runs the command.
/// A configuration failure stops every command with exit code 2.
pub fn execute(cli: Cli) -> CommandResult {
    let command_name = cli.command.name();
    let options = load_options(cli.config);

    let config = match load_config(options.clone()) {
        Ok(config) => config,
        Err(error) => return CommandResult::from_error(command_name, error),
    };
    init_logging(&config.logging);

    match cli.command {
        Command::Price { input } => commands::price::run(&input),
        Command::Check { input } => commands::check::run(&config, &input),
        Command::Evaluate { input } => commands::evaluate::run(&config, &input),
        Command::Tiers { input } => commands::tiers::run(&input),
        Command::Config => commands::config::run(&options, &config),
    }
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Price { .. } => "price",
            Self::Check { .. } => "check",
            Self::Evaluate { .. } => "evaluate",
            Self::Tiers { .. } => "tiers",
            Self::Config => "config",
        }
    }
}

fn load_options(config_path: Option<PathBuf>) -> LoadOptions {
    let require_file = config_path.is_some();
    LoadOptions { config_path, require_file, ..LoadOptions::default() }
}

/// Logs go to stderr; stdout carries only the JSON result.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.trim().to_ascii_lowercase()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when embedded in tests.
    let _ = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
