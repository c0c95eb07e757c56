//! Engine counters and per-unit traces.
//!
//! [`EngineStats`] is always collected; it is a handful of integers bumped on
//! the hot path. [`UnitTrace`]s are *opt-in* (see `Linker::enable_trace`)
//! because they copy every scanned payload.

use crate::engine::classify::SkipReason;
use crate::engine::validate::Rejection;
use crate::{NodeId, Range};

// --- Counters ----------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EngineStats {
    /// Units admitted by the limit guard.
    pub units_processed: u64,
    /// Units the classifier turned away.
    pub units_skipped: u64,
    /// Units whose parent was judged hidden.
    pub units_hidden: u64,
    /// Candidate runs found by the extractor.
    pub candidates: u64,
    pub links_created: u64,
    pub rejected_short: u64,
    pub rejected_long: u64,
    pub rejected_card: u64,
    /// Rewrites dropped because the swap failed.
    pub rewrites_abandoned: u64,
    /// Debounce firings that drained at least one root.
    pub rescans: u64,
    /// Roots scanned by those firings.
    pub roots_rescanned: u64,
    /// Scheduler slices run.
    pub slices: u64,
}

impl EngineStats {
    pub(crate) fn record_rejection(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::TooShort => self.rejected_short += 1,
            Rejection::TooLong => self.rejected_long += 1,
            Rejection::ProbableCard => self.rejected_card += 1,
        }
    }

    pub fn rejected(&self) -> u64 {
        self.rejected_short + self.rejected_long + self.rejected_card
    }
}

// --- Traces ------------------------------------------------------------------

/// What happened to one text unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitVerdict {
    Skipped(SkipReason),
    Hidden,
    /// Scanned, but nothing was accepted.
    Unchanged,
    Linked { links: usize },
    Abandoned,
}

/// One candidate seen while scanning a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateTrace {
    pub raw: String,
    pub range: Range,
    /// Link target on success.
    pub outcome: Result<String, Rejection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitTrace {
    pub unit: NodeId,
    pub text: String,
    pub verdict: UnitVerdict,
    pub candidates: Vec<CandidateTrace>,
}
