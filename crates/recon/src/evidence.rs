use std::collections::BTreeMap;

use crate::model::{ClassifiedStatement, MatchStatus, PaymentOrder, ReconSummary};

/// Compute summary statistics from classified statements.
///
/// Amount totals only include parseable amounts, so
/// `matched_amount_minor + unmatched_amount_minor == total_amount_minor`.
pub fn compute_summary(
    statements: &[ClassifiedStatement],
    orders_total: usize,
    unmatched_orders: &[PaymentOrder],
    ambiguous: usize,
) -> ReconSummary {
    let mut summary = ReconSummary {
        statements_total: statements.len(),
        orders_total,
        orders_unmatched: unmatched_orders.len(),
        ambiguous,
        ..Default::default()
    };
    let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();

    for s in statements {
        *status_counts.entry(s.status.label().to_string()).or_insert(0) += 1;

        match s.status {
            MatchStatus::Matched => summary.matched_primary += 1,
            MatchStatus::MatchedSecondary | MatchStatus::MatchedAgency | MatchStatus::MatchedWindow => {
                summary.matched_fallback += 1
            }
            MatchStatus::Unmatched => summary.unmatched += 1,
        }

        let record = &s.record;
        if record.date.is_none() {
            summary.unparseable_dates += 1;
        }
        if record.reference_code.is_none() {
            summary.missing_reference_codes += 1;
        }
        match record.amount_minor {
            Some(amount) => {
                summary.total_amount_minor = summary.total_amount_minor.saturating_add(amount);
                if s.status.is_matched() {
                    summary.matched_amount_minor = summary.matched_amount_minor.saturating_add(amount);
                } else {
                    summary.unmatched_amount_minor =
                        summary.unmatched_amount_minor.saturating_add(amount);
                }
            }
            None => summary.unparseable_amounts += 1,
        }
    }

    summary.status_counts = status_counts;
    summary
}
