//! `vouch-recon`: bank statement (RK) to payment order (SP2D) vouching engine.
//!
//! Pure engine crate: receives two tables, returns classified statements and
//! the payment orders nothing consumed. No CLI or file IO dependencies.
//!
//! Stages, in order: normalization, primary matching on
//! (reference code, amount), then the configured fallback tiers on
//! amount + date (+ agency) (± window). A payment order is consumed by at
//! most one statement across all stages.

pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod observer;
pub mod output;
pub mod table;

pub use config::{CollisionPolicy, FallbackTier, ReconConfig, ReferenceRule, SliceRule};
pub use engine::{load_orders, load_statements, reconcile, run, run_with_observer};
pub use error::ReconError;
pub use model::{
    ClassifiedStatement, MatchStatus, OrderLink, PaymentOrder, ReconResult, ReconSummary,
    StatementRecord,
};
pub use observer::{NoopObserver, ReconObserver, Stage};
pub use table::{Table, TableKind};
