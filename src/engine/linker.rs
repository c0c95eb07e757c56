//! The engine object.
//!
//! `Linker` owns all per-document state (limit guard, visibility cache,
//! pending units, mutation roots, task queue) and is driven by the host:
//!
//! - [`Linker::scan_document`] once, when the engine attaches;
//! - [`Linker::tick`] whenever a timer may be due (see [`Linker::next_deadline`]);
//! - [`Linker::run_idle`] whenever the host has an idle period.
//!
//! Both drive calls first pull the document's change feed, so edits made by
//! the host between calls are picked up without extra plumbing.

use crate::api::{OptionsError, millis};
use crate::engine::classify::classify_text;
use crate::engine::debounce::Debouncer;
use crate::engine::executor::{Clock, IdleSupport, Millis, SystemClock, Task, TaskQueue};
use crate::engine::extract::candidates;
use crate::engine::guard::LimitGuard;
use crate::engine::metrics::{CandidateTrace, EngineStats, UnitTrace, UnitVerdict};
use crate::engine::rewrite::{Judged, RewriteOutcome, apply_fragment, build_fragment};
use crate::engine::scheduler::BatchScheduler;
use crate::engine::validate::validate;
use crate::engine::visibility::VisibilityCache;
use crate::{Document, MutationRecord, NodeId, Options, TelUri};
use std::rc::Rc;

pub struct Linker {
    options: Options,
    clock: Rc<dyn Clock>,
    queue: TaskQueue,
    scheduler: BatchScheduler,
    debouncer: Debouncer,
    visibility: VisibilityCache,
    guard: LimitGuard,
    stats: EngineStats,
    trace: Option<Vec<UnitTrace>>,
}

impl std::fmt::Debug for Linker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linker")
            .field("clock", &"<clock>")
            .field("pending_units", &self.scheduler.len())
            .field("pending_roots", &self.debouncer.pending_roots())
            .field("guard", &self.guard)
            .field("stats", &self.stats)
            .finish()
    }
}

impl Linker {
    /// Engine on the system clock, with idle callbacks available.
    pub fn new(options: Options) -> Result<Self, OptionsError> {
        Self::with_clock(options, Rc::new(SystemClock::new()), IdleSupport::Available)
    }

    pub fn with_clock(options: Options, clock: Rc<dyn Clock>, idle: IdleSupport) -> Result<Self, OptionsError> {
        options.validate()?;
        Ok(Self::unchecked(options, clock, idle))
    }

    /// Build without validating `options`; callers must pass known-good values.
    pub(crate) fn unchecked(options: Options, clock: Rc<dyn Clock>, idle: IdleSupport) -> Self {
        Linker {
            queue: TaskQueue::new(idle, millis(options.idle_fallback_delay)),
            scheduler: BatchScheduler::new(options.batch_size),
            debouncer: Debouncer::new(millis(options.debounce_window)),
            visibility: VisibilityCache::new(),
            guard: LimitGuard::new(options.max_text_units),
            stats: EngineStats::default(),
            trace: None,
            clock,
            options,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    // --- Entry points ------------------------------------------------------

    /// Attach to `doc` and queue every text unit in it.
    ///
    /// Changes recorded before this call predate the engine and are dropped.
    /// The first slice runs before this returns.
    pub fn scan_document(&mut self, doc: &mut Document) {
        let _ = doc.take_mutations();
        let root = doc.root();
        self.scan_root(doc, root);
    }

    /// Queue the text units under `root` and start a slice if none is waiting.
    pub fn scan_root(&mut self, doc: &mut Document, root: NodeId) {
        if self.guard.tripped() {
            return;
        }
        let added = self.scheduler.enqueue(doc.text_units_under(root));
        tracing::debug!(root = ?root, added, pending = self.scheduler.len(), "units queued");
        self.pump(doc);
    }

    /// Feed change notifications into the debouncer.
    pub fn observe(&mut self, doc: &Document, records: &[MutationRecord]) {
        if self.guard.tripped() {
            return;
        }
        let now = self.clock.now();
        for record in records {
            match record {
                MutationRecord::ChildList { target, added, removed } => {
                    for &node in removed {
                        self.visibility.evict_subtree(doc, node);
                    }
                    for &node in added {
                        let root = if doc.is_element(node) { node } else { *target };
                        self.debouncer.note(root, &mut self.queue, now);
                    }
                }
                MutationRecord::CharacterData { target } => {
                    if let Some(parent) = doc.parent(*target) {
                        self.debouncer.note(parent, &mut self.queue, now);
                    }
                }
            }
        }
    }

    /// Pull `doc`'s change feed into the debouncer.
    pub fn sync(&mut self, doc: &mut Document) {
        if doc.has_pending_mutations() {
            let records = doc.take_mutations();
            self.observe(doc, &records);
        }
    }

    /// Run every task that is due. Returns how many ran.
    pub fn tick(&mut self, doc: &mut Document) -> usize {
        self.sync(doc);
        let mut ran = 0;
        while let Some(task) = self.queue.pop_due(self.clock.now()) {
            self.run_task(doc, task);
            ran += 1;
        }
        ran
    }

    /// The host is idle: run one idle task, if any.
    pub fn run_idle(&mut self, doc: &mut Document) -> bool {
        self.sync(doc);
        match self.queue.pop_idle() {
            Some(task) => {
                self.run_task(doc, task);
                true
            }
            None => false,
        }
    }

    /// Earliest time at which [`Linker::tick`] has something to do.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.queue.next_deadline()
    }

    pub fn has_idle_work(&self) -> bool {
        self.queue.has_idle_work()
    }

    pub fn has_pending_work(&self) -> bool {
        !self.queue.is_empty() || self.scheduler.has_pending() || self.debouncer.is_armed()
    }

    // --- Inspection --------------------------------------------------------

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn limit_tripped(&self) -> bool {
        self.guard.tripped()
    }

    pub fn processed_units(&self) -> u64 {
        self.guard.processed()
    }

    pub fn pending_units(&self) -> usize {
        self.scheduler.len()
    }

    pub fn visibility_cache(&self) -> &VisibilityCache {
        &self.visibility
    }

    /// Start recording a [`UnitTrace`] per processed unit.
    pub fn enable_trace(&mut self) {
        self.trace.get_or_insert_with(Vec::new);
    }

    pub fn take_trace(&mut self) -> Vec<UnitTrace> {
        self.trace.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Clear the processed counter, the limit latch, the visibility cache and
    /// the stats. Meant for test harnesses only.
    pub fn debug_reset(&mut self) {
        self.guard.reset();
        self.visibility.clear();
        self.stats = EngineStats::default();
    }

    // --- Internals ---------------------------------------------------------

    fn run_task(&mut self, doc: &mut Document, task: Task) {
        match task {
            Task::ScanSlice => {
                self.scheduler.set_armed(false);
                self.pump(doc);
            }
            Task::FlushMutations => self.flush(doc),
        }
    }

    fn flush(&mut self, doc: &mut Document) {
        let roots = self.debouncer.drain();
        if roots.is_empty() || self.guard.tripped() {
            return;
        }
        self.stats.rescans += 1;
        let mut added = 0;
        for &root in &roots {
            if !doc.is_connected(root) {
                continue;
            }
            self.stats.roots_rescanned += 1;
            added += self.scheduler.enqueue(doc.text_units_under(root));
        }
        tracing::debug!(roots = roots.len(), added, "rescanning changed roots");
        self.pump(doc);
    }

    /// Run one slice now unless one is already waiting for the host, then
    /// request the next slice if work remains.
    fn pump(&mut self, doc: &mut Document) {
        if self.scheduler.armed() || !self.scheduler.has_pending() {
            return;
        }
        self.run_slice(doc);
        if self.scheduler.has_pending() {
            let now = self.clock.now();
            self.queue.request_idle(now, millis(self.options.idle_timeout), Task::ScanSlice);
            self.scheduler.set_armed(true);
        }
    }

    fn run_slice(&mut self, doc: &mut Document) {
        if self.guard.tripped() {
            self.scheduler.abandon();
            return;
        }
        let slice = self.scheduler.next_slice();
        self.stats.slices += 1;
        let links_before = self.stats.links_created;
        for &unit in &slice {
            if !self.process_unit(doc, unit) {
                let dropped = self.scheduler.abandon();
                self.debouncer.clear(&mut self.queue);
                tracing::debug!(dropped, "limit reached; pending work abandoned");
                break;
            }
        }
        tracing::debug!(
            units = slice.len(),
            links = self.stats.links_created - links_before,
            remaining = self.scheduler.len(),
            "slice done"
        );
    }

    /// Classify, check visibility, scan and rewrite one unit. Returns `false`
    /// when the limit guard refused it.
    fn process_unit(&mut self, doc: &mut Document, unit: NodeId) -> bool {
        if !self.guard.admit() {
            return false;
        }
        self.stats.units_processed += 1;

        let parent = match classify_text(doc, unit, &self.options) {
            Ok(parent) => parent,
            Err(reason) => {
                self.stats.units_skipped += 1;
                tracing::trace!(unit = ?unit, ?reason, "unit skipped");
                self.record(doc, unit, UnitVerdict::Skipped(reason));
                return true;
            }
        };
        if !self.visibility.is_visible(doc, parent, self.options.visibility_walk_depth) {
            self.stats.units_hidden += 1;
            tracing::trace!(unit = ?unit, "unit hidden");
            self.record(doc, unit, UnitVerdict::Hidden);
            return true;
        }

        let Some(text) = doc.text(unit) else {
            return true;
        };
        let judged: Vec<Judged<'_>> =
            candidates(text).map(|matched| Judged { matched, outcome: validate(matched.raw) }).collect();

        let mut links = 0;
        for j in &judged {
            self.stats.candidates += 1;
            match &j.outcome {
                Ok(_) => links += 1,
                Err(rejection) => self.stats.record_rejection(*rejection),
            }
        }
        let fragment =
            if links > 0 { build_fragment(text, &judged, &self.options.marker_attribute) } else { Vec::new() };
        let traced = self.trace.is_some().then(|| {
            let candidates = judged
                .iter()
                .map(|j| CandidateTrace {
                    raw: j.matched.raw.to_string(),
                    range: j.matched.range,
                    outcome: j.outcome.as_ref().map(|phone| TelUri::from_phone(phone).href()).map_err(|r| *r),
                })
                .collect::<Vec<_>>();
            (text.to_string(), candidates)
        });

        let verdict = match apply_fragment(doc, unit, &fragment, links) {
            RewriteOutcome::Replaced { links } => {
                self.stats.links_created += links as u64;
                tracing::trace!(unit = ?unit, links, "unit linked");
                UnitVerdict::Linked { links }
            }
            RewriteOutcome::Unchanged => UnitVerdict::Unchanged,
            RewriteOutcome::Abandoned(_) => {
                self.stats.rewrites_abandoned += 1;
                UnitVerdict::Abandoned
            }
        };
        if let (Some(trace), Some((text, candidates))) = (self.trace.as_mut(), traced) {
            trace.push(UnitTrace { unit, text, verdict, candidates });
        }
        true
    }

    fn record(&mut self, doc: &Document, unit: NodeId, verdict: UnitVerdict) {
        if let Some(trace) = self.trace.as_mut() {
            let text = doc.text(unit).unwrap_or_default().to_string();
            trace.push(UnitTrace { unit, text, verdict, candidates: Vec::new() });
        }
    }
}
