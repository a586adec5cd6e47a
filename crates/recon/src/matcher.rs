use std::collections::HashMap;

use crate::config::{CollisionPolicy, FallbackTier};
use crate::model::{MatchStatus, PaymentOrder, PrimaryKey, StatementRecord};
use crate::normalize::agency_matches;
use crate::observer::{ReconObserver, Stage};

/// Statements between two progress notifications.
const PROGRESS_STEP: usize = 500;

/// Classification state shared by every stage of one run.
///
/// `used[j]` marks order `j` as consumed; no stage may hand it out again.
#[derive(Debug, Clone)]
pub struct MatchState {
    pub statuses: Vec<MatchStatus>,
    /// Index into the orders slice for every matched statement.
    pub links: Vec<Option<usize>>,
    pub used: Vec<bool>,
    pub ambiguous: usize,
}

impl MatchState {
    pub fn new(statements: usize, orders: usize) -> Self {
        Self {
            statuses: vec![MatchStatus::Unmatched; statements],
            links: vec![None; statements],
            used: vec![false; orders],
            ambiguous: 0,
        }
    }

    fn assign(&mut self, statement: usize, order: usize, status: MatchStatus) {
        debug_assert!(!self.used[order], "order {order} consumed twice");
        self.used[order] = true;
        self.links[statement] = Some(order);
        self.statuses[statement] = status;
    }
}

/// Exact (reference code, amount) matching.
///
/// Returns the number of statements matched by this stage.
pub fn match_primary(
    statements: &[StatementRecord],
    orders: &[PaymentOrder],
    policy: CollisionPolicy,
    state: &mut MatchState,
    observer: &mut dyn ReconObserver,
) -> usize {
    let stage = Stage::Primary;
    let total = statements.len();
    observer.on_stage_start(stage, total);

    let mut index: HashMap<PrimaryKey, Vec<usize>> = HashMap::new();
    for (j, order) in orders.iter().enumerate() {
        if let Some(key) = order.primary_key() {
            index.entry(key).or_default().push(j);
        }
    }

    let mut statement_counts: HashMap<PrimaryKey, usize> = HashMap::new();
    for s in statements {
        if let Some(key) = s.primary_key() {
            *statement_counts.entry(key).or_insert(0) += 1;
        }
    }

    let mut matched = 0;
    for (i, s) in statements.iter().enumerate() {
        if i % PROGRESS_STEP == 0 {
            observer.on_progress(stage, i, total);
        }
        if state.statuses[i].is_matched() {
            continue;
        }
        let Some(key) = s.primary_key() else {
            continue;
        };
        let Some(candidates) = index.get(&key) else {
            continue;
        };

        let shared_by_statements = statement_counts.get(&key).copied().unwrap_or(0) > 1;
        let contested = candidates.len() > 1 || shared_by_statements;
        if contested {
            state.ambiguous += 1;
        }

        let pick = match policy {
            CollisionPolicy::FirstWins => candidates.iter().copied().find(|&j| !state.used[j]),
            CollisionPolicy::RejectAmbiguous if contested => None,
            CollisionPolicy::RejectAmbiguous => candidates.first().copied().filter(|&j| !state.used[j]),
        };

        if let Some(j) = pick {
            state.assign(i, j, MatchStatus::Matched);
            matched += 1;
        } else {
            log::debug!(
                "RK row {}: primary key {}/{} left unmatched ({} candidate(s))",
                s.row_index,
                key.reference_code,
                key.amount_minor,
                candidates.len()
            );
        }
    }

    observer.on_progress(stage, total, total);
    observer.on_stage_end(stage, matched);
    matched
}

/// One fallback tier over the statements still unmatched and the orders not
/// yet consumed. The first eligible order in input order wins.
///
/// `descriptions` holds each statement's normalized description and is only
/// read by tiers that compare agency names.
pub fn match_fallback(
    tier: FallbackTier,
    date_window_days: u32,
    statements: &[StatementRecord],
    orders: &[PaymentOrder],
    descriptions: &[String],
    state: &mut MatchState,
    observer: &mut dyn ReconObserver,
) -> usize {
    let stage = Stage::Fallback(tier);
    let total = statements.len();
    observer.on_stage_start(stage, total);

    let window = match tier {
        FallbackTier::AmountDateAgencyWindow => i64::from(date_window_days),
        FallbackTier::AmountDate | FallbackTier::AmountDateAgency => 0,
    };

    let mut by_amount: HashMap<i64, Vec<usize>> = HashMap::new();
    for (j, order) in orders.iter().enumerate() {
        if state.used[j] || order.issue_date.is_none() {
            continue;
        }
        if let Some(amount) = order.amount_minor {
            by_amount.entry(amount).or_default().push(j);
        }
    }

    let status = MatchStatus::for_tier(tier);
    let mut matched = 0;

    for (i, s) in statements.iter().enumerate() {
        if i % PROGRESS_STEP == 0 {
            observer.on_progress(stage, i, total);
        }
        if state.statuses[i].is_matched() {
            continue;
        }
        let (Some(amount), Some(date)) = (s.amount_minor, s.date) else {
            continue;
        };
        let Some(pool) = by_amount.get(&amount) else {
            continue;
        };

        let mut eligible = pool.iter().copied().filter(|&j| {
            if state.used[j] {
                return false;
            }
            let order = &orders[j];
            let within_window = order
                .issue_date
                .map(|d| (date - d).num_days().abs() <= window)
                .unwrap_or(false);
            if !within_window {
                return false;
            }
            !tier.requires_agency()
                || descriptions
                    .get(i)
                    .map(|desc| agency_matches(desc, &order.agency_clean))
                    .unwrap_or(false)
        });

        let Some(first) = eligible.next() else {
            continue;
        };
        if eligible.next().is_some() {
            state.ambiguous += 1;
        }

        state.assign(i, first, status);
        matched += 1;
    }

    observer.on_progress(stage, total, total);
    observer.on_stage_end(stage, matched);
    matched
}
