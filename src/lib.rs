extern crate self as phonelink;

#[macro_use]
mod macros;
mod api;
mod dom;
mod engine;
mod tel_uri;

pub use api::{
    CandidateReport, DEFAULT_SKIP_TAGS, LinkDetails, LinkedText, LinkedTextVerbose, Options, OptionsError, Substitution,
    link_text, link_text_verbose, link_text_with,
};
pub use dom::{ComputedStyle, DomError, Document, FragmentNode, MutationRecord, NodeId, Visibility};
pub use engine::{
    CARD_MAX_DIGITS, CARD_MIN_DIGITS, CandidateTrace, Candidates, Clock, EngineStats, HiddenBy, IdleSupport, LimitGuard,
    Linker, MAX_DIGITS, MIN_DIGITS, ManualClock, Millis, Rejection, SkipReason, SystemClock, TaskHandle, UnitTrace,
    UnitVerdict, VisibilityCache, candidates, hidden_by, luhn_valid, validate,
};
pub use tel_uri::{TelUri, TelUriError};

// --- Shared types -----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    /// Start byte index (inclusive).
    pub start: usize,
    /// End byte index (exclusive).
    pub end: usize,
}

impl Range {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A phone-like run found in one text payload. Only lives for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateMatch<'t> {
    /// The matched slice, separators included.
    pub raw: &'t str,
    pub range: Range,
}

/// An accepted candidate reduced to its digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPhone {
    pub digits: String,
    /// Whether the raw match started with `+`.
    pub plus: bool,
}

impl ValidatedPhone {
    /// `+` (when present) followed by the digits.
    pub fn canonical(&self) -> String {
        if self.plus { format!("+{}", self.digits) } else { self.digits.clone() }
    }
}
