//! Candidate extraction.
//!
//! Finds phone-like runs in the payload of one text unit: an optional `+`,
//! then at least seven characters drawn from digits and the separators
//! `space ( ) . -`, ending in a digit. The run has to open with a digit or
//! `(`, so a separator sitting in front of a number ("at (415)...") stays in
//! the surrounding text.
//!
//! ```text
//! "Call (415) 555-2671 or 415.555.2671!"
//!       ^^^^^^^^^^^^^^    ^^^^^^^^^^^^
//!       5..19             23..35
//! ```
//!
//! Matches never overlap: the search resumes at the end of the previous match.
//! A fresh [`Candidates`] is created per unit, so no cursor state leaks from one
//! unit into the next.

use crate::{CandidateMatch, Range};

/// Lazy sequence of candidate matches within one text payload.
pub struct Candidates<'t> {
    text: &'t str,
    inner: regex::Matches<'static, 't>,
}

impl<'t> Candidates<'t> {
    pub fn new(text: &'t str) -> Self {
        let re = regex!(r"\+?[(0-9][0-9 ().\-]{5,}[0-9]");
        Candidates { text, inner: re.find_iter(text) }
    }

    /// Start over from the beginning of the same payload.
    pub fn restart(&mut self) {
        *self = Candidates::new(self.text);
    }
}

impl<'t> Iterator for Candidates<'t> {
    type Item = CandidateMatch<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let m = self.inner.next()?;
        Some(CandidateMatch { raw: m.as_str(), range: Range { start: m.start(), end: m.end() } })
    }
}

/// Convenience entry point for one payload.
pub fn candidates(text: &str) -> Candidates<'_> {
    Candidates::new(text)
}
