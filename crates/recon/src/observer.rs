//! Progress notifications.
//!
//! The engine reports stage boundaries and per-record progress to an
//! injected observer instead of printing. Every method has a no-op default.

use crate::config::FallbackTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    Primary,
    Fallback(FallbackTier),
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normalize => write!(f, "normalize"),
            Self::Primary => write!(f, "primary"),
            Self::Fallback(tier) => write!(f, "fallback:{tier}"),
        }
    }
}

pub trait ReconObserver {
    fn on_stage_start(&mut self, _stage: Stage, _total: usize) {}

    /// `done` counts statements processed so far within the stage.
    fn on_progress(&mut self, _stage: Stage, _done: usize, _total: usize) {}

    fn on_stage_end(&mut self, _stage: Stage, _matched: usize) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ReconObserver for NoopObserver {}
