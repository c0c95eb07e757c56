//! Text unit eligibility.
//!
//! A cheap, pure filter run before any pattern matching. Checks run in a
//! fixed order and stop at the first failure:
//!
//! ```text
//! parent is an element? ── no ──▶ Detached
//! parent tag skipped?   ── yes ─▶ SkipTag
//! parent editable?      ── yes ─▶ Editable
//! parent marked?        ── yes ─▶ InsideLink
//! link within N levels? ── yes ─▶ InsideLink
//! blank payload?        ── yes ─▶ Blank
//!                                 otherwise: scan it (returns the parent)
//! ```

use crate::{Document, NodeId, Options};

/// Why a text unit was not scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// No parent element (removed, or replaced by an earlier rewrite).
    Detached,
    SkipTag,
    Editable,
    InsideLink,
    Blank,
}

/// Decide whether the text unit `id` should be scanned; on success returns
/// its parent element.
pub(crate) fn classify_text(doc: &Document, id: NodeId, options: &Options) -> Result<NodeId, SkipReason> {
    let text = doc.text(id).ok_or(SkipReason::Detached)?;
    let parent = doc.parent(id).filter(|&p| doc.is_element(p)).ok_or(SkipReason::Detached)?;

    if doc.tag(parent).is_some_and(|tag| options.skip_tags.contains(tag)) {
        return Err(SkipReason::SkipTag);
    }
    if doc.is_editable(parent) {
        return Err(SkipReason::Editable);
    }
    // Produced by an earlier pass, whatever the skip set says.
    if doc.has_attribute(parent, &options.marker_attribute)
        || has_link_ancestor(doc, parent, options.link_ancestor_walk_depth)
    {
        return Err(SkipReason::InsideLink);
    }
    if text.trim().is_empty() {
        return Err(SkipReason::Blank);
    }

    Ok(parent)
}

/// True when `start` or one of its ancestors, `depth` elements in total, is a link.
fn has_link_ancestor(doc: &Document, start: NodeId, depth: usize) -> bool {
    doc.ancestors_or_self(start).take(depth).any(|n| doc.tag(n) == Some("a"))
}
