use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::normalize::DEFAULT_AGENCY_PREFIXES;

/// Longest date window the window tier accepts.
pub const MAX_DATE_WINDOW_DAYS: u32 = 31;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub agency: AgencyConfig,
    #[serde(default)]
    pub columns: ColumnsConfig,
}

fn default_name() -> String {
    "RK vs SP2D".into()
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            reference: ReferenceConfig::default(),
            matching: MatchingConfig::default(),
            agency: AgencyConfig::default(),
            columns: ColumnsConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reference code derivation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceConfig {
    #[serde(default)]
    pub statement_rule: ReferenceRule,
    #[serde(default)]
    pub order_slice: SliceRule,
}

/// How the reference code is pulled out of a statement description.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceRule {
    /// Leftmost run of exactly six digits.
    #[default]
    LeftmostSix,
    /// Last run of digits, cut to its rightmost six or zero-padded to six.
    LastToken,
}

/// Which six characters of the SP2D number form its reference code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceRule {
    #[default]
    LastSix,
    FirstSix,
}

// ---------------------------------------------------------------------------
// Matching policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingConfig {
    #[serde(default)]
    pub collision: CollisionPolicy,
    #[serde(default = "default_tiers")]
    pub tiers: Vec<FallbackTier>,
    #[serde(default = "default_date_window_days")]
    pub date_window_days: u32,
}

fn default_tiers() -> Vec<FallbackTier> {
    vec![FallbackTier::AmountDate]
}

fn default_date_window_days() -> u32 {
    1
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            collision: CollisionPolicy::default(),
            tiers: default_tiers(),
            date_window_days: default_date_window_days(),
        }
    }
}

/// What the primary stage does when a (reference code, amount) key is
/// shared by several statements or several payment orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Pair statements and orders one-to-one in input order.
    #[default]
    FirstWins,
    /// Leave every statement on a shared key for the fallback tiers.
    RejectAmbiguous,
}

impl std::fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstWins => write!(f, "first_wins"),
            Self::RejectAmbiguous => write!(f, "reject_ambiguous"),
        }
    }
}

/// Fallback tiers, run in configured order after the primary stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackTier {
    /// Amount and date equal.
    AmountDate,
    /// Amount and date equal, agency name found in the description.
    AmountDateAgency,
    /// Amount equal, date within the window, agency name found in the description.
    AmountDateAgencyWindow,
}

impl FallbackTier {
    pub fn requires_agency(&self) -> bool {
        matches!(self, Self::AmountDateAgency | Self::AmountDateAgencyWindow)
    }
}

impl std::fmt::Display for FallbackTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AmountDate => write!(f, "amount_date"),
            Self::AmountDateAgency => write!(f, "amount_date_agency"),
            Self::AmountDateAgencyWindow => write!(f, "amount_date_agency_window"),
        }
    }
}

// ---------------------------------------------------------------------------
// Agency + columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgencyConfig {
    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,
}

fn default_prefixes() -> Vec<String> {
    DEFAULT_AGENCY_PREFIXES.iter().map(|p| p.to_string()).collect()
}

impl Default for AgencyConfig {
    fn default() -> Self {
        Self { prefixes: default_prefixes() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnsConfig {
    #[serde(default)]
    pub statement: StatementColumns,
    #[serde(default)]
    pub order: OrderColumns,
}

/// Header names in the bank statement (RK) table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatementColumns {
    #[serde(default = "col_tanggal")]
    pub date: String,
    #[serde(default = "col_keterangan")]
    pub description: String,
    #[serde(default = "col_jumlah")]
    pub amount: String,
}

/// Header names in the payment order (SP2D) table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderColumns {
    #[serde(default = "col_skpd")]
    pub agency: String,
    #[serde(default = "col_nosp2d")]
    pub reference: String,
    #[serde(default = "col_tglsp2d")]
    pub issue_date: String,
    #[serde(default = "col_jumlah")]
    pub amount: String,
}

fn col_tanggal() -> String {
    "tanggal".into()
}
fn col_keterangan() -> String {
    "keterangan".into()
}
fn col_jumlah() -> String {
    "jumlah".into()
}
fn col_skpd() -> String {
    "skpd".into()
}
fn col_nosp2d() -> String {
    "nosp2d".into()
}
fn col_tglsp2d() -> String {
    "tglsp2d".into()
}

impl Default for StatementColumns {
    fn default() -> Self {
        Self {
            date: col_tanggal(),
            description: col_keterangan(),
            amount: col_jumlah(),
        }
    }
}

impl Default for OrderColumns {
    fn default() -> Self {
        Self {
            agency: col_skpd(),
            reference: col_nosp2d(),
            issue_date: col_tglsp2d(),
            amount: col_jumlah(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MatchingConfig {
    /// Tiers listed after a looser tier whose matches they are a subset of,
    /// paired with that earlier tier.
    pub fn shadowed_tiers(&self) -> Vec<(FallbackTier, FallbackTier)> {
        let position = |tier: FallbackTier| self.tiers.iter().position(|t| *t == tier);
        let Some(strict) = position(FallbackTier::AmountDateAgency) else {
            return Vec::new();
        };
        [FallbackTier::AmountDate, FallbackTier::AmountDateAgencyWindow]
            .into_iter()
            .filter(|looser| position(*looser).is_some_and(|pos| pos < strict))
            .map(|looser| (FallbackTier::AmountDateAgency, looser))
            .collect()
    }
}

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let tiers = &self.matching.tiers;
        for (i, tier) in tiers.iter().enumerate() {
            if tiers[..i].contains(tier) {
                return Err(ReconError::ConfigValidation(format!(
                    "fallback tier '{tier}' listed more than once"
                )));
            }
        }

        if self.matching.date_window_days > MAX_DATE_WINDOW_DAYS {
            return Err(ReconError::ConfigValidation(format!(
                "date_window_days must be at most {MAX_DATE_WINDOW_DAYS}, got {}",
                self.matching.date_window_days
            )));
        }

        let st = &self.columns.statement;
        let od = &self.columns.order;
        let named = [
            ("columns.statement.date", &st.date),
            ("columns.statement.description", &st.description),
            ("columns.statement.amount", &st.amount),
            ("columns.order.agency", &od.agency),
            ("columns.order.reference", &od.reference),
            ("columns.order.issue_date", &od.issue_date),
            ("columns.order.amount", &od.amount),
        ];
        for (key, value) in named {
            if value.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("{key} must not be empty")));
            }
        }

        for (tier, earlier) in self.matching.shadowed_tiers() {
            log::warn!("tier {tier} runs after {earlier} and cannot match anything new");
        }

        Ok(())
    }

    /// Agency prefixes uppercased for comparison.
    pub fn agency_prefixes(&self) -> Vec<String> {
        self.agency.prefixes.iter().map(|p| p.trim().to_uppercase()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
