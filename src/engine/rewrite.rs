//! Node rewriting.
//!
//! Turns one text unit plus its judged candidates into a replacement fragment
//! and swaps it in:
//!
//! ```text
//! "Call (415) 555-2671 now"
//!   └─▶ "Call " · <a href="tel:4155552671" data-phonelink>(415) 555-2671</a> · " now"
//! ```
//!
//! Literal runs and rejected candidates are copied verbatim (adjacent ones are
//! merged into one text node). The swap is a single call into the document;
//! when it fails, typically because the host removed the unit or one of its
//! ancestors in the meantime, nothing has been changed and the rewrite is
//! dropped.

use crate::dom::{DomError, FragmentNode};
use crate::engine::validate::Rejection;
use crate::{CandidateMatch, Document, NodeId, TelUri, ValidatedPhone};

/// A candidate together with its validation outcome.
#[derive(Debug, Clone)]
pub(crate) struct Judged<'t> {
    pub matched: CandidateMatch<'t>,
    pub outcome: Result<ValidatedPhone, Rejection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RewriteOutcome {
    /// The unit was replaced; `links` link elements were created.
    Replaced { links: usize },
    /// Nothing was accepted, so the unit was left as is.
    Unchanged,
    /// The swap failed and the tree was left untouched.
    Abandoned(DomError),
}

/// Build the replacement fragment for `text`. `judged` must be ordered and
/// non-overlapping, with ranges inside `text`.
pub(crate) fn build_fragment(text: &str, judged: &[Judged<'_>], marker_attribute: &str) -> Vec<FragmentNode> {
    let mut pieces = Vec::with_capacity(judged.len() * 2 + 1);
    let mut literal = String::new();
    let mut cursor = 0;

    for j in judged {
        let range = j.matched.range;
        literal.push_str(&text[cursor..range.start]);
        match &j.outcome {
            Ok(phone) => {
                if !literal.is_empty() {
                    pieces.push(FragmentNode::Text(std::mem::take(&mut literal)));
                }
                pieces.push(FragmentNode::Element {
                    tag: "a".to_string(),
                    attributes: vec![
                        ("href".to_string(), TelUri::from_phone(phone).href()),
                        (marker_attribute.to_string(), String::new()),
                    ],
                    text: j.matched.raw.to_string(),
                });
            }
            Err(_) => literal.push_str(j.matched.raw),
        }
        cursor = range.end;
    }

    literal.push_str(&text[cursor..]);
    if !literal.is_empty() {
        pieces.push(FragmentNode::Text(literal));
    }
    pieces
}

/// Replace the unit `id` with `fragment`, which holds `links` link elements.
pub(crate) fn apply_fragment(
    doc: &mut Document,
    id: NodeId,
    fragment: &[FragmentNode],
    links: usize,
) -> RewriteOutcome {
    if links == 0 {
        return RewriteOutcome::Unchanged;
    }
    match doc.replace_with_fragment(id, fragment) {
        Ok(_) => RewriteOutcome::Replaced { links },
        Err(err) => {
            tracing::debug!(unit = ?id, %err, "rewrite abandoned");
            RewriteOutcome::Abandoned(err)
        }
    }
}
