//! Visibility evaluation with a per-element cache.
//!
//! Decides whether an element is perceivable by walking it and its ancestors,
//! `depth` elements in total. Each element is judged once and the verdict is
//! cached by [`NodeId`]; later walks reuse it and stop at the first cached
//! `false`.
//!
//! Per element, cheapest checks first:
//!
//! 1. `hidden` attribute, `aria-hidden="true"`
//! 2. effective style: `display: none`, `visibility: hidden | collapse`,
//!    `opacity: 0`
//!
//! A style query that fails counts as visible (fail-open): hiding real content
//! is worse than linking a number nobody sees.
//!
//! Known approximations:
//!
//! - Ancestors past `depth` are never looked at.
//! - Entries are not refreshed when styles change later. Only a removal
//!   notification evicts them (see [`VisibilityCache::evict_subtree`]).

use crate::{Document, NodeId};
use std::collections::HashMap;

bitflags::bitflags! {
    /// Reasons an element was judged hidden.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HiddenBy: u8 {
        const HIDDEN_ATTR  = 1 << 0;
        const ARIA_HIDDEN  = 1 << 1;
        const DISPLAY_NONE = 1 << 2;
        const VISIBILITY   = 1 << 3;
        const OPACITY      = 1 << 4;
    }
}

#[derive(Debug, Default, Clone)]
pub struct VisibilityCache {
    entries: HashMap<NodeId, bool>,
}

impl VisibilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> Option<bool> {
        self.entries.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop entries for `root` and every element below it.
    pub fn evict_subtree(&mut self, doc: &Document, root: NodeId) -> usize {
        let before = self.entries.len();
        for id in doc.descendants(root) {
            self.entries.remove(&id);
        }
        before - self.entries.len()
    }

    /// Whether `element` is visible, consulting and filling the cache.
    pub fn is_visible(&mut self, doc: &Document, element: NodeId, depth: usize) -> bool {
        for node in doc.ancestors_or_self(element).take(depth) {
            let visible = match self.entries.get(&node) {
                Some(&cached) => cached,
                None => {
                    let hidden_by = hidden_by(doc, node);
                    if !hidden_by.is_empty() {
                        tracing::trace!(node = ?node, reason = ?hidden_by, "element hidden");
                    }
                    let visible = hidden_by.is_empty();
                    self.entries.insert(node, visible);
                    visible
                }
            };
            if !visible {
                return false;
            }
        }
        true
    }
}

/// Evaluate one element without looking at its ancestors.
pub fn hidden_by(doc: &Document, element: NodeId) -> HiddenBy {
    let mut reasons = HiddenBy::empty();
    if doc.has_attribute(element, "hidden") {
        reasons |= HiddenBy::HIDDEN_ATTR;
    }
    if doc.attribute(element, "aria-hidden").is_some_and(|v| v.trim().eq_ignore_ascii_case("true")) {
        reasons |= HiddenBy::ARIA_HIDDEN;
    }
    if !reasons.is_empty() {
        return reasons;
    }

    match doc.computed_style(element) {
        Ok(style) => {
            if style.display_none() {
                reasons |= HiddenBy::DISPLAY_NONE;
            }
            if style.visibility != crate::Visibility::Visible {
                reasons |= HiddenBy::VISIBILITY;
            }
            if style.transparent() {
                reasons |= HiddenBy::OPACITY;
            }
        }
        Err(err) => {
            tracing::trace!(node = ?element, %err, "style query failed; treating as visible");
        }
    }
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `body > div > section > p`, returning (div, section, p).
    fn chain(doc: &mut Document) -> (NodeId, NodeId, NodeId) {
        let div = doc.create_element("div");
        let section = doc.create_element("section");
        let p = doc.create_element("p");
        doc.append_child(doc.root(), div).unwrap();
        doc.append_child(div, section).unwrap();
        doc.append_child(section, p).unwrap();
        (div, section, p)
    }

    #[test]
    fn reports_each_hiding_mechanism() {
        let mut doc = Document::new();
        let (div, section, p) = chain(&mut doc);
        assert_eq!(hidden_by(&doc, p), HiddenBy::empty());

        doc.set_attribute(div, "hidden", "").unwrap();
        doc.set_attribute(section, "aria-hidden", "TRUE").unwrap();
        doc.set_attribute(p, "style", "display: none; visibility: hidden; opacity: 0").unwrap();

        assert_eq!(hidden_by(&doc, div), HiddenBy::HIDDEN_ATTR);
        assert_eq!(hidden_by(&doc, section), HiddenBy::ARIA_HIDDEN);
        assert_eq!(hidden_by(&doc, p), HiddenBy::DISPLAY_NONE | HiddenBy::VISIBILITY | HiddenBy::OPACITY);
    }

    #[test]
    fn hidden_ancestor_hides_descendants() {
        let mut doc = Document::new();
        let (div, _, p) = chain(&mut doc);
        doc.set_style(div, "display", "none").unwrap();

        let mut cache = VisibilityCache::new();
        assert!(!cache.is_visible(&doc, p, 10));
        assert_eq!(cache.get(div), Some(false));
        assert_eq!(cache.get(p), Some(true));
    }

    #[test]
    fn walk_depth_bounds_the_search() {
        let mut doc = Document::new();
        let (div, _, p) = chain(&mut doc);
        doc.set_style(div, "visibility", "hidden").unwrap();

        let mut cache = VisibilityCache::new();
        assert!(cache.is_visible(&doc, p, 2));
        assert_eq!(cache.get(div), None);
        assert!(!cache.is_visible(&doc, p, 3));
    }

    #[test]
    fn cached_verdicts_survive_style_changes() {
        let mut doc = Document::new();
        let (div, _, p) = chain(&mut doc);
        doc.set_style(div, "display", "none").unwrap();

        let mut cache = VisibilityCache::new();
        assert!(!cache.is_visible(&doc, p, 10));

        doc.set_style(div, "display", "block").unwrap();
        assert!(!cache.is_visible(&doc, p, 10));

        assert_eq!(cache.evict_subtree(&doc, div), 3);
        assert!(cache.is_visible(&doc, p, 10));
    }

    #[test]
    fn failed_style_queries_fail_open() {
        let mut doc = Document::new();
        let widget = doc.create_opaque_element("x-widget");
        doc.append_child(doc.root(), widget).unwrap();

        let mut cache = VisibilityCache::new();
        assert!(cache.is_visible(&doc, widget, 10));
        assert_eq!(cache.get(widget), Some(true));
    }
}
