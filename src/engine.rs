//! Phone-number linking engine.
//!
//! This module is the *public entry point* for the engine. The work is split
//! into focused submodules under `src/engine/`; everything a host needs is
//! re-exported here (and again from the crate root).
//!
//! ## How the parts work together
//!
//! Per text unit, the engine runs a short pipeline. Units reach it from the
//! initial full-document pass or from coalesced change notifications, and are
//! processed a slice at a time:
//!
//! ```text
//! scan_document ──┐                 change feed ── Debouncer (debounce.rs)
//!                 │                                  120ms quiet window
//!                 v                                       │ drain roots
//!          BatchScheduler (scheduler.rs) ◀────────────────┘
//!            slice of ≤ batch_size units; next slice on idle / 50ms timer
//!                 │
//!                 v  per unit
//!          LimitGuard::admit           (guard.rs)      count, maybe trip latch
//!          classify_text               (classify.rs)   skip tags, editable, links
//!          VisibilityCache::is_visible (visibility.rs) attributes, style, cached
//!          candidates                  (extract.rs)    regex runs
//!          validate                    (validate.rs)   7..=15 digits, Luhn
//!          build_fragment + apply      (rewrite.rs)    one atomic swap
//! ```
//!
//! ## Responsibilities by module
//!
//! - `executor.rs`: the clock abstraction and the task queue (timers, idle
//!   requests, the no-idle fallback).
//! - `linker.rs`: [`Linker`], the engine object tying the rest together.
//! - `metrics.rs`: always-on counters and opt-in per-unit traces.
//! - the remaining files each hold one pipeline stage, as drawn above.
//!
//! ## Threading
//!
//! Everything is single-threaded. `Linker` holds its clock behind an `Rc` and
//! is deliberately `!Send`; the host drives it from its own event loop through
//! [`Linker::tick`] and [`Linker::run_idle`].
//!
//! ## Debugging
//!
//! Events are emitted through `tracing`: `trace` per unit decision, `debug`
//! per slice and rescan, `warn` when the limit trips.

#[path = "engine/classify.rs"]
mod classify;
#[path = "engine/debounce.rs"]
mod debounce;
#[path = "engine/executor.rs"]
mod executor;
#[path = "engine/extract.rs"]
mod extract;
#[path = "engine/guard.rs"]
mod guard;
#[path = "engine/linker.rs"]
mod linker;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/rewrite.rs"]
mod rewrite;
#[path = "engine/scheduler.rs"]
mod scheduler;
#[path = "engine/validate.rs"]
mod validate;
#[path = "engine/visibility.rs"]
mod visibility;

#[cfg(test)]
#[path = "engine/tests.rs"]
mod tests;

pub use classify::SkipReason;
pub use executor::{Clock, IdleSupport, ManualClock, Millis, SystemClock, TaskHandle};
pub use extract::{Candidates, candidates};
pub use guard::LimitGuard;
pub use linker::Linker;
pub use metrics::{CandidateTrace, EngineStats, UnitTrace, UnitVerdict};
pub use validate::{CARD_MAX_DIGITS, CARD_MIN_DIGITS, MAX_DIGITS, MIN_DIGITS, Rejection, luhn_valid, validate};
pub use visibility::{HiddenBy, VisibilityCache, hidden_by};
