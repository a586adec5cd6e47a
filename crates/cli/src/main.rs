// vouch - match bank statement lines (RK) against payment orders (SP2D)

mod exit_codes;
mod export;
mod load;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{recon_exit_code, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "vouch")]
#[command(about = "Vouch bank statement lines (RK) against payment orders (SP2D)")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match an RK export against an SP2D register
    #[command(after_help = "\
Examples:
  vouch run --statements rk.xlsx --orders sp2d.xlsx --output hasil.xlsx
  vouch run --statements rk.csv --orders sp2d.csv --config vouch.toml --json
  vouch run --statements rk.xlsx --sheet-statements 'Maret' --orders sp2d.csv --csv-dir out/
  vouch run --statements rk.csv --orders sp2d.csv --strict")]
    Run {
        /// Bank statement file (.csv, .tsv, .txt, .xlsx, .xls, .xlsb, .ods)
        #[arg(long, short = 's')]
        statements: PathBuf,

        /// Payment order file (.csv, .tsv, .txt, .xlsx, .xls, .xlsb, .ods)
        #[arg(long, short = 'o')]
        orders: PathBuf,

        /// Matching config (TOML). Defaults apply when omitted.
        #[arg(long, short = 'c', env = "VOUCH_CONFIG")]
        config: Option<PathBuf>,

        /// Sheet to read from a statement workbook (default: first sheet)
        #[arg(long, value_name = "NAME")]
        sheet_statements: Option<String>,

        /// Sheet to read from an order workbook (default: first sheet)
        #[arg(long, value_name = "NAME")]
        sheet_orders: Option<String>,

        /// Write the result workbook (.xlsx)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the result tables as CSV files into this directory
        #[arg(long, value_name = "DIR")]
        csv_dir: Option<PathBuf>,

        /// Print the full result as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Exit 1 when any RK row stays unmatched
        #[arg(long)]
        strict: bool,
    },

    /// Validate a matching config without running
    #[command(after_help = "\
Examples:
  vouch validate vouch.toml")]
    Validate {
        /// Path to the TOML config file
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nengine:  vouch-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nengine:  vouch-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
        )
    }
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vouch=info,vouch_recon=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Run {
            statements,
            orders,
            config,
            sheet_statements,
            sheet_orders,
            output,
            csv_dir,
            json,
            strict,
        } => recon::cmd_run(recon::RunArgs {
            statements,
            orders,
            config,
            sheet_statements,
            sheet_orders,
            output,
            csv_dir,
            json,
            strict,
        }),
        Commands::Validate { config } => recon::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<vouch_recon::ReconError> for CliError {
    fn from(err: vouch_recon::ReconError) -> Self {
        let hint = match &err {
            vouch_recon::ReconError::MissingColumns { .. } => {
                Some("map other header names under [columns] in the config".to_string())
            }
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }
}
