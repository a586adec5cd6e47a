//! `vouch run` and `vouch validate`.

use std::path::{Path, PathBuf};

use vouch_recon::normalize::format_amount;
use vouch_recon::output::{statement_table, unmatched_order_table};
use vouch_recon::{ReconConfig, ReconObserver, ReconResult, Stage};

use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_OUTPUT, EXIT_UNMATCHED};
use crate::{export, load, CliError};

pub struct RunArgs {
    pub statements: PathBuf,
    pub orders: PathBuf,
    pub config: Option<PathBuf>,
    pub sheet_statements: Option<String>,
    pub sheet_orders: Option<String>,
    pub output: Option<PathBuf>,
    pub csv_dir: Option<PathBuf>,
    pub json: bool,
    pub strict: bool,
}

/// Reports stage boundaries through tracing.
struct ProgressLog;

impl ReconObserver for ProgressLog {
    fn on_stage_start(&mut self, stage: Stage, total: usize) {
        tracing::debug!("{stage}: {total} rows");
    }

    fn on_progress(&mut self, stage: Stage, done: usize, total: usize) {
        tracing::trace!("{stage}: {done}/{total}");
    }

    fn on_stage_end(&mut self, stage: Stage, matched: usize) {
        if !matches!(stage, Stage::Normalize) {
            tracing::info!("{stage}: {matched} matched");
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        return Ok(ReconConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_INVALID_CONFIG, format!("cannot read config {}: {e}", path.display()))
    })?;
    Ok(ReconConfig::from_toml(&text)?)
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;

    let statements = load::read_table(&args.statements, args.sheet_statements.as_deref())?;
    let orders = load::read_table(&args.orders, args.sheet_orders.as_deref())?;
    tracing::debug!(
        "loaded {} RK rows from {}, {} SP2D rows from {}",
        statements.len(),
        args.statements.display(),
        orders.len(),
        args.orders.display(),
    );

    let result = vouch_recon::run_with_observer(&config, &statements, &orders, &mut ProgressLog)?;

    if args.output.is_some() || args.csv_dir.is_some() {
        let result_table = statement_table(&statements, &result);
        let unused_table = unmatched_order_table(&orders, &result);

        if let Some(ref path) = args.output {
            export::write_workbook(path, &result_table, &unused_table)?;
            eprintln!("wrote {}", path.display());
        }
        if let Some(ref dir) = args.csv_dir {
            export::write_csv_dir(dir, &result_table, &unused_table)?;
            eprintln!("wrote {}", dir.display());
        }
    }

    if args.json {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::new(EXIT_OUTPUT, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    print_summary(&result);

    if args.strict && result.summary.unmatched > 0 {
        return Err(CliError::new(
            EXIT_UNMATCHED,
            format!("{} RK rows unmatched (--strict)", result.summary.unmatched),
        ));
    }
    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    eprintln!(
        "{}: {} RK rows, {} SP2D rows: {} matched, {} matched by fallback, {} unmatched",
        result.meta.config_name,
        s.statements_total,
        s.orders_total,
        s.matched_primary,
        s.matched_fallback,
        s.unmatched,
    );
    eprintln!(
        "amounts: {} matched, {} unmatched; {} SP2D not used",
        format_amount(s.matched_amount_minor),
        format_amount(s.unmatched_amount_minor),
        s.orders_unmatched,
    );
    if s.ambiguous > 0 {
        eprintln!("ambiguous: {} RK rows had more than one candidate", s.ambiguous);
    }
    if s.unparseable_amounts > 0 || s.unparseable_dates > 0 {
        eprintln!(
            "unparseable: {} amounts, {} dates",
            s.unparseable_amounts, s.unparseable_dates
        );
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&config_path))?;
    let tiers: Vec<String> = config.matching.tiers.iter().map(|t| t.to_string()).collect();
    println!(
        "ok: {} (collision {}, tiers [{}], window {} days)",
        config.name,
        config.matching.collision,
        tiers.join(", "),
        config.matching.date_window_days,
    );
    Ok(())
}
