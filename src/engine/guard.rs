//! Global processing ceiling.
//!
//! Every text unit the engine looks at is counted. The unit that pushes the
//! count past the ceiling is still processed, and it also trips a one-way
//! latch: from then on every scan and rewrite is a no-op. Only
//! [`LimitGuard::reset`] clears it, and that exists for test harnesses.

#[derive(Debug, Clone)]
pub struct LimitGuard {
    ceiling: u64,
    processed: u64,
    tripped: bool,
}

impl LimitGuard {
    pub fn new(ceiling: u64) -> Self {
        LimitGuard { ceiling, processed: 0, tripped: false }
    }

    /// Account for one unit. Returns `false` when the unit must not be
    /// processed because the latch is already set.
    pub fn admit(&mut self) -> bool {
        if self.tripped {
            return false;
        }
        self.processed += 1;
        if self.processed > self.ceiling {
            self.tripped = true;
            tracing::warn!(
                processed = self.processed,
                ceiling = self.ceiling,
                "text unit ceiling exceeded; phone linking disabled for this document"
            );
        }
        true
    }

    pub fn tripped(&self) -> bool {
        self.tripped
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    /// Clear the counter and the latch.
    pub fn reset(&mut self) {
        self.processed = 0;
        self.tripped = false;
    }
}
