use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::{CollisionPolicy, FallbackTier, ReferenceRule, SliceRule};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A normalized bank statement line (RK).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementRecord {
    /// Zero-based data row in the source table.
    pub row_index: usize,
    pub date: Option<NaiveDate>,
    pub description: String,
    /// Minor units. `None` when the source text could not be parsed.
    pub amount_minor: Option<i64>,
    /// Six-digit code derived from the description.
    pub reference_code: Option<String>,
    pub date_raw: String,
    pub amount_raw: String,
}

/// A normalized payment order (SP2D).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentOrder {
    pub row_index: usize,
    pub agency: String,
    /// Agency name with digits and unit prefixes removed, uppercased.
    pub agency_clean: String,
    pub reference_number: String,
    pub issue_date: Option<NaiveDate>,
    pub amount_minor: Option<i64>,
    /// Six-character code sliced from the reference number.
    pub reference_code: Option<String>,
    pub issue_date_raw: String,
    pub amount_raw: String,
}

/// Primary join key. Only exists when both parts are present, so records
/// lacking a reference code never join each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimaryKey {
    pub reference_code: String,
    pub amount_minor: i64,
}

impl PrimaryKey {
    pub fn new(reference_code: Option<&str>, amount_minor: Option<i64>) -> Option<Self> {
        Some(Self {
            reference_code: reference_code?.to_string(),
            amount_minor: amount_minor?,
        })
    }
}

impl StatementRecord {
    pub fn primary_key(&self) -> Option<PrimaryKey> {
        PrimaryKey::new(self.reference_code.as_deref(), self.amount_minor)
    }
}

impl PaymentOrder {
    pub fn primary_key(&self) -> Option<PrimaryKey> {
        PrimaryKey::new(self.reference_code.as_deref(), self.amount_minor)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    MatchedSecondary,
    MatchedAgency,
    MatchedWindow,
    Unmatched,
}

impl MatchStatus {
    pub fn for_tier(tier: FallbackTier) -> Self {
        match tier {
            FallbackTier::AmountDate => Self::MatchedSecondary,
            FallbackTier::AmountDateAgency => Self::MatchedAgency,
            FallbackTier::AmountDateAgencyWindow => Self::MatchedWindow,
        }
    }

    pub fn is_matched(&self) -> bool {
        !matches!(self, Self::Unmatched)
    }

    /// Label shown in result tables.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Matched => "Matched",
            Self::MatchedSecondary => "Matched (Secondary)",
            Self::MatchedAgency => "Matched (Agency)",
            Self::MatchedWindow => "Matched (Date Window)",
            Self::Unmatched => "Unmatched",
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Payment order fields copied onto a matched statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLink {
    pub order_row: usize,
    pub reference_number: String,
    pub issue_date: Option<NaiveDate>,
    pub agency: String,
}

impl OrderLink {
    pub fn from_order(order: &PaymentOrder) -> Self {
        Self {
            order_row: order.row_index,
            reference_number: order.reference_number.clone(),
            issue_date: order.issue_date,
            agency: order.agency.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedStatement {
    pub record: StatementRecord,
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<OrderLink>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconSummary {
    pub statements_total: usize,
    pub orders_total: usize,
    pub matched_primary: usize,
    pub matched_fallback: usize,
    pub unmatched: usize,
    pub orders_unmatched: usize,
    /// Statements that met more than one candidate, or lost a contested key.
    pub ambiguous: usize,
    pub unparseable_amounts: usize,
    pub unparseable_dates: usize,
    pub missing_reference_codes: usize,
    pub status_counts: BTreeMap<String, usize>,
    pub matched_amount_minor: i64,
    pub unmatched_amount_minor: i64,
    pub total_amount_minor: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub statement_rule: ReferenceRule,
    pub order_slice: SliceRule,
    pub collision: CollisionPolicy,
    pub tiers: Vec<FallbackTier>,
    pub date_window_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    /// Every statement, in input order.
    pub statements: Vec<ClassifiedStatement>,
    /// Orders no statement consumed, in input order.
    pub unmatched_orders: Vec<PaymentOrder>,
}

impl ReconResult {
    pub fn matched(&self) -> impl Iterator<Item = &ClassifiedStatement> {
        self.statements.iter().filter(|s| s.status.is_matched())
    }

    pub fn unmatched(&self) -> impl Iterator<Item = &ClassifiedStatement> {
        self.statements.iter().filter(|s| !s.status.is_matched())
    }
}
