use crate::engine::{CandidateTrace, EngineStats, IdleSupport, Linker, ManualClock, Millis, Rejection, UnitVerdict};
use crate::{Document, NodeId};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Parent tags whose text is never scanned: links themselves, form
/// controls, scripts and styles, code and preformatted blocks, embedded media
/// and other non-prose containers.
pub const DEFAULT_SKIP_TAGS: &[&str] = &[
    "a", "audio", "button", "canvas", "code", "embed", "head", "iframe", "input", "kbd", "link", "math", "meta",
    "noscript", "object", "option", "pre", "samp", "script", "select", "style", "svg", "template", "textarea", "title",
    "var", "video",
];

static DEFAULT_OPTIONS: Lazy<Options> = Lazy::new(Options::default);

/// Engine configuration. The defaults are what a browser host would use.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Lowercase tag names; text whose parent has one of these is skipped.
    pub skip_tags: HashSet<String>,
    /// Processed-unit ceiling for the limit guard.
    pub max_text_units: u64,
    /// Units per scheduler slice.
    pub batch_size: usize,
    /// Quiet window before coalesced changes are rescanned.
    pub debounce_window: Duration,
    /// Elements examined by the visibility walk, the element itself included.
    pub visibility_walk_depth: usize,
    /// Elements examined for an enclosing link, starting at the parent.
    pub link_ancestor_walk_depth: usize,
    /// Longest wait for an idle period before a slice is forced.
    pub idle_timeout: Duration,
    /// Slice delay when the host has no idle callbacks.
    pub idle_fallback_delay: Duration,
    /// Attribute set (empty) on every link the engine creates.
    pub marker_attribute: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            skip_tags: DEFAULT_SKIP_TAGS.iter().map(|t| t.to_string()).collect(),
            max_text_units: 25_000,
            batch_size: 400,
            debounce_window: Duration::from_millis(120),
            visibility_walk_depth: 10,
            link_ancestor_walk_depth: 6,
            idle_timeout: Duration::from_millis(500),
            idle_fallback_delay: Duration::from_millis(50),
            marker_attribute: "data-phonelink".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("batch_size must be at least 1")]
    ZeroBatchSize,
    #[error("max_text_units must be at least 1")]
    ZeroCeiling,
    #[error("{0} must be at least 1")]
    ZeroWalkDepth(&'static str),
    #[error("marker_attribute {0:?} is not a valid attribute name")]
    InvalidMarker(String),
}

impl Options {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.batch_size == 0 {
            return Err(OptionsError::ZeroBatchSize);
        }
        if self.max_text_units == 0 {
            return Err(OptionsError::ZeroCeiling);
        }
        if self.visibility_walk_depth == 0 {
            return Err(OptionsError::ZeroWalkDepth("visibility_walk_depth"));
        }
        if self.link_ancestor_walk_depth == 0 {
            return Err(OptionsError::ZeroWalkDepth("link_ancestor_walk_depth"));
        }
        let marker = &self.marker_attribute;
        if marker.is_empty() || marker.chars().any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '>' | '/' | '=')) {
            return Err(OptionsError::InvalidMarker(marker.clone()));
        }
        Ok(())
    }
}

pub(crate) fn millis(d: Duration) -> Millis {
    d.as_millis().try_into().unwrap_or(Millis::MAX)
}

/// One link created in a piece of text.
///
/// `start`/`end` are byte offsets into the input text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    /// The matched run, as it appears in the input.
    pub body: String,
    /// Link target, `tel:<canonical>`.
    pub href: String,
    pub start: usize,
    pub end: usize,
}

/// Result from [`link_text`] and [`link_text_with`].
#[derive(Debug, Clone)]
pub struct LinkedText {
    pub text: String,
    /// The input rendered as markup with the links in place.
    pub html: String,
    pub links: Vec<Substitution>,
    pub elapsed: Duration,
}

/// A candidate run and what the validator made of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateReport {
    pub body: String,
    pub start: usize,
    pub end: usize,
    /// Link target on success.
    pub outcome: Result<String, Rejection>,
}

/// Additional details returned by [`link_text_verbose`].
#[derive(Debug, Clone)]
pub struct LinkDetails {
    /// Every candidate run, accepted or not.
    pub candidates: Vec<CandidateReport>,
    /// What the engine did with the text.
    pub verdict: Option<UnitVerdict>,
    pub stats: EngineStats,
}

#[derive(Debug, Clone)]
pub struct LinkedTextVerbose {
    pub text: String,
    pub html: String,
    pub links: Vec<Substitution>,
    pub elapsed: Duration,
    pub details: LinkDetails,
}

/// Link the phone numbers in `text` using the default [`Options`].
///
/// # Example
/// ```
/// use phonelink::link_text;
///
/// let out = link_text("Call me at (415) 555-2671!");
/// assert_eq!(out.links.len(), 1);
/// assert_eq!(out.links[0].href, "tel:4155552671");
/// ```
pub fn link_text(text: &str) -> LinkedText {
    let linker = Linker::unchecked(DEFAULT_OPTIONS.clone(), Rc::new(ManualClock::new()), IdleSupport::Available);
    drive(text, linker).into()
}

/// Link the phone numbers in `text` using `options`.
pub fn link_text_with(text: &str, options: &Options) -> Result<LinkedText, OptionsError> {
    let linker = Linker::with_clock(options.clone(), Rc::new(ManualClock::new()), IdleSupport::Available)?;
    Ok(drive(text, linker).into())
}

/// Like [`link_text_with`], plus every candidate with its validation outcome
/// and the engine counters. The plain path does not record these.
pub fn link_text_verbose(text: &str, options: &Options) -> Result<LinkedTextVerbose, OptionsError> {
    let mut linker = Linker::with_clock(options.clone(), Rc::new(ManualClock::new()), IdleSupport::Available)?;
    linker.enable_trace();
    Ok(drive(text, linker))
}

impl From<LinkedTextVerbose> for LinkedText {
    fn from(out: LinkedTextVerbose) -> Self {
        LinkedText { text: out.text, html: out.html, links: out.links, elapsed: out.elapsed }
    }
}

/// Put `text` into `body > p`, run a full engine pass over it and read the
/// links back out of the tree.
fn drive(text: &str, mut linker: Linker) -> LinkedTextVerbose {
    let started = Instant::now();
    let mut doc = Document::new();
    let p = doc.create_element("p");
    let unit = doc.create_text(text);
    let attached = doc.append_child(doc.root(), p).and_then(|()| doc.append_child(p, unit));
    debug_assert!(attached.is_ok(), "fresh document rejected an append");

    linker.scan_document(&mut doc);
    while linker.run_idle(&mut doc) {}

    let links = collect_links(&doc, p, &linker.options().marker_attribute);
    let html = doc.inner_html(p);
    let trace = linker.take_trace();
    let details = LinkDetails {
        candidates: trace.iter().flat_map(|t| t.candidates.iter()).map(candidate_report).collect(),
        verdict: trace.into_iter().next().map(|t| t.verdict),
        stats: linker.stats().clone(),
    };

    LinkedTextVerbose { text: text.to_string(), html, links, elapsed: started.elapsed(), details }
}

/// Walk the children of `p` in order, tracking byte offsets, and report each
/// marked link.
fn collect_links(doc: &Document, p: NodeId, marker: &str) -> Vec<Substitution> {
    let mut out = Vec::new();
    let mut offset = 0;
    for &child in doc.children(p) {
        let body: String = doc.text_units_under(child).iter().filter_map(|&t| doc.text(t)).collect();
        if doc.has_attribute(child, marker) {
            out.push(Substitution {
                href: doc.attribute(child, "href").unwrap_or_default().to_string(),
                start: offset,
                end: offset + body.len(),
                body: body.clone(),
            });
        }
        offset += body.len();
    }
    out
}

fn candidate_report(trace: &CandidateTrace) -> CandidateReport {
    CandidateReport {
        body: trace.raw.clone(),
        start: trace.range.start,
        end: trace.range.end,
        outcome: trace.outcome.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SkipReason;
    use pretty_assertions::assert_eq;

    #[test]
    fn link_text_returns_substitutions() {
        let res = link_text("Call me at (415) 555-2671 or 415.555.2671!");

        assert_eq!(
            res.links,
            vec![
                Substitution { body: "(415) 555-2671".into(), href: "tel:4155552671".into(), start: 11, end: 25 },
                Substitution { body: "415.555.2671".into(), href: "tel:4155552671".into(), start: 29, end: 41 },
            ]
        );
        assert_eq!(
            res.html,
            "Call me at <a href=\"tel:4155552671\" data-phonelink>(415) 555-2671</a> or \
             <a href=\"tel:4155552671\" data-phonelink>415.555.2671</a>!"
        );
        assert!(res.elapsed >= Duration::ZERO);
    }

    #[test]
    fn text_without_numbers_is_left_alone() {
        let res = link_text("Order #12345 ships in 3 days & costs < $40");
        assert!(res.links.is_empty());
        assert_eq!(res.html, "Order #12345 ships in 3 days &amp; costs &lt; $40");
    }

    #[test]
    fn verbose_reports_rejections() {
        let res = link_text_verbose("card 4111 1111 1111 1111 or +44 20 7946 0958", &Options::default()).unwrap();

        assert_eq!(res.links.len(), 1);
        assert_eq!(res.links[0].href, "tel:+442079460958");
        assert_eq!(
            res.details.candidates.iter().map(|c| c.outcome.clone()).collect::<Vec<_>>(),
            vec![Err(Rejection::ProbableCard), Ok("tel:+442079460958".to_string())]
        );
        assert_eq!(res.details.verdict, Some(UnitVerdict::Linked { links: 1 }));
        assert_eq!(res.details.stats.rejected_card, 1);
        assert_eq!(res.details.stats.links_created, 1);
    }

    #[test]
    fn verbose_reports_blank_input() {
        let res = link_text_verbose("   ", &Options::default()).unwrap();
        assert!(res.details.candidates.is_empty());
        assert_eq!(res.details.verdict, Some(UnitVerdict::Skipped(SkipReason::Blank)));
    }

    #[test]
    fn custom_marker_attribute_is_used() {
        let opts = Options { marker_attribute: "data-tel".into(), ..Options::default() };
        let res = link_text_with("555 2671", &opts).unwrap();
        assert_eq!(res.html, "<a href=\"tel:5552671\" data-tel>555 2671</a>");
        assert_eq!(res.links.len(), 1);
    }

    #[test]
    fn invalid_options_are_rejected() {
        let cases: Vec<(Options, OptionsError)> = vec![
            (Options { batch_size: 0, ..Options::default() }, OptionsError::ZeroBatchSize),
            (Options { max_text_units: 0, ..Options::default() }, OptionsError::ZeroCeiling),
            (
                Options { visibility_walk_depth: 0, ..Options::default() },
                OptionsError::ZeroWalkDepth("visibility_walk_depth"),
            ),
            (
                Options { link_ancestor_walk_depth: 0, ..Options::default() },
                OptionsError::ZeroWalkDepth("link_ancestor_walk_depth"),
            ),
            (
                Options { marker_attribute: "data x".into(), ..Options::default() },
                OptionsError::InvalidMarker("data x".into()),
            ),
        ];

        for (opts, expected) in cases {
            assert_eq!(opts.validate(), Err(expected.clone()));
            assert_eq!(link_text_with("555 2671", &opts).unwrap_err(), expected);
        }
        assert_eq!(Options::default().validate(), Ok(()));
    }
}
