use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::matcher::{match_fallback, match_primary, MatchState};
use crate::model::{
    ClassifiedStatement, OrderLink, PaymentOrder, ReconMeta, ReconResult, StatementRecord,
};
use crate::normalize::{
    clean_agency_name, extract_reference, normalize_text, parse_amount, parse_date,
    slice_reference,
};
use crate::observer::{NoopObserver, ReconObserver, Stage};
use crate::table::{Table, TableKind};

/// Run reconciliation on raw tables. Returns classified statements and the
/// payment orders left over.
pub fn run(config: &ReconConfig, statements: &Table, orders: &Table) -> Result<ReconResult, ReconError> {
    run_with_observer(config, statements, orders, &mut NoopObserver)
}

pub fn run_with_observer(
    config: &ReconConfig,
    statements: &Table,
    orders: &Table,
    observer: &mut dyn ReconObserver,
) -> Result<ReconResult, ReconError> {
    // Both schemas are checked before any record is built.
    let statement_cols = statement_columns(statements, config)?;
    let order_cols = order_columns(orders, config)?;

    observer.on_stage_start(Stage::Normalize, statements.len() + orders.len());
    let statement_records = build_statements(statements, statement_cols, config);
    let order_records = build_orders(orders, order_cols, config);
    observer.on_stage_end(Stage::Normalize, 0);

    Ok(reconcile(config, statement_records, order_records, observer))
}

/// Validate and normalize the bank statement table.
pub fn load_statements(table: &Table, config: &ReconConfig) -> Result<Vec<StatementRecord>, ReconError> {
    let cols = statement_columns(table, config)?;
    Ok(build_statements(table, cols, config))
}

/// Validate and normalize the payment order table.
pub fn load_orders(table: &Table, config: &ReconConfig) -> Result<Vec<PaymentOrder>, ReconError> {
    let cols = order_columns(table, config)?;
    Ok(build_orders(table, cols, config))
}

/// Match already-normalized records. Infallible; deterministic for a given
/// input order.
pub fn reconcile(
    config: &ReconConfig,
    statements: Vec<StatementRecord>,
    orders: Vec<PaymentOrder>,
    observer: &mut dyn ReconObserver,
) -> ReconResult {
    let matching = &config.matching;
    let mut state = MatchState::new(statements.len(), orders.len());

    let primary = match_primary(&statements, &orders, matching.collision, &mut state, observer);
    log::debug!("primary stage: {primary} of {} RK rows matched", statements.len());

    let descriptions: Vec<String> = if matching.tiers.iter().any(|t| t.requires_agency()) {
        statements.iter().map(|s| normalize_text(&s.description)).collect()
    } else {
        Vec::new()
    };

    for &tier in &matching.tiers {
        let n = match_fallback(
            tier,
            matching.date_window_days,
            &statements,
            &orders,
            &descriptions,
            &mut state,
            observer,
        );
        log::debug!("fallback tier {tier}: {n} RK rows matched");
    }

    let MatchState { statuses, links, used, ambiguous } = state;

    let classified: Vec<ClassifiedStatement> = statements
        .into_iter()
        .zip(statuses)
        .zip(links)
        .map(|((record, status), link)| ClassifiedStatement {
            record,
            status,
            link: link.map(|j| OrderLink::from_order(&orders[j])),
        })
        .collect();

    let orders_total = orders.len();
    let unmatched_orders: Vec<PaymentOrder> = orders
        .into_iter()
        .zip(used)
        .filter(|(_, used)| !used)
        .map(|(order, _)| order)
        .collect();

    let summary = compute_summary(&classified, orders_total, &unmatched_orders, ambiguous);
    log::info!(
        "{}: {} RK rows, {} matched ({} primary), {} unmatched; {} of {} SP2D unused",
        config.name,
        summary.statements_total,
        summary.matched_primary + summary.matched_fallback,
        summary.matched_primary,
        summary.unmatched,
        summary.orders_unmatched,
        summary.orders_total,
    );

    ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            statement_rule: config.reference.statement_rule,
            order_slice: config.reference.order_slice,
            collision: matching.collision,
            tiers: matching.tiers.clone(),
            date_window_days: matching.date_window_days,
        },
        summary,
        statements: classified,
        unmatched_orders,
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct StatementCols {
    date: usize,
    description: usize,
    amount: usize,
}

#[derive(Debug, Clone, Copy)]
struct OrderCols {
    agency: usize,
    reference: usize,
    issue_date: usize,
    amount: usize,
}

fn statement_columns(table: &Table, config: &ReconConfig) -> Result<StatementCols, ReconError> {
    let names = &config.columns.statement;
    let idx = table.require_columns(
        TableKind::Statements,
        &[names.date.as_str(), names.description.as_str(), names.amount.as_str()],
    )?;
    Ok(StatementCols { date: idx[0], description: idx[1], amount: idx[2] })
}

fn order_columns(table: &Table, config: &ReconConfig) -> Result<OrderCols, ReconError> {
    let names = &config.columns.order;
    let idx = table.require_columns(
        TableKind::Orders,
        &[
            names.agency.as_str(),
            names.reference.as_str(),
            names.issue_date.as_str(),
            names.amount.as_str(),
        ],
    )?;
    Ok(OrderCols { agency: idx[0], reference: idx[1], issue_date: idx[2], amount: idx[3] })
}

fn build_statements(table: &Table, cols: StatementCols, config: &ReconConfig) -> Vec<StatementRecord> {
    let rule = config.reference.statement_rule;
    (0..table.len())
        .map(|row| {
            let description = table.cell(row, cols.description).trim().to_string();
            let date_raw = table.cell(row, cols.date).to_string();
            let amount_raw = table.cell(row, cols.amount).to_string();
            StatementRecord {
                row_index: row,
                date: parse_date(&date_raw),
                amount_minor: parse_amount(&amount_raw),
                reference_code: extract_reference(&description, rule),
                description,
                date_raw,
                amount_raw,
            }
        })
        .collect()
}

fn build_orders(table: &Table, cols: OrderCols, config: &ReconConfig) -> Vec<PaymentOrder> {
    let slice = config.reference.order_slice;
    let prefixes = config.agency_prefixes();
    (0..table.len())
        .map(|row| {
            let agency = table.cell(row, cols.agency).trim().to_string();
            let reference_number = table.cell(row, cols.reference).trim().to_string();
            let issue_date_raw = table.cell(row, cols.issue_date).to_string();
            let amount_raw = table.cell(row, cols.amount).to_string();
            PaymentOrder {
                row_index: row,
                agency_clean: clean_agency_name(&agency, &prefixes),
                agency,
                reference_code: slice_reference(&reference_number, slice),
                reference_number,
                issue_date: parse_date(&issue_date_raw),
                amount_minor: parse_amount(&amount_raw),
                issue_date_raw,
                amount_raw,
            }
        })
        .collect()
}
