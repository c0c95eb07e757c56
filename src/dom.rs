//! In-memory host document.
//!
//! The engine never owns the page it decorates; it only reads it and swaps
//! individual text units for small fragments. `Document` is the host side of
//! that contract: an arena of element and text nodes addressed by stable
//! [`NodeId`]s, with the queries the engine needs (navigation, attributes,
//! effective style) and a change feed of [`MutationRecord`]s.
//!
//! ```text
//! body ─┬─ p ─┬─ "Call "
//!       │     └─ a[href=tel:..] ── "555 0100"
//!       └─ div[hidden] ── "..."
//! ```
//!
//! Invariants:
//! - Node ids are never reused. A removed node keeps its id and its subtree
//!   but has no parent, so every lookup on it stays well defined.
//! - Only elements have children. Tag and attribute names are ASCII-lowercase.
//! - Tree edits (`append_child`, `insert_before`, `remove`, `set_text`) are
//!   reported on the change feed; attribute and style edits are not, and
//!   neither is [`Document::replace_with_fragment`].

#[path = "dom/markup.rs"]
mod markup;
#[path = "dom/style.rs"]
mod style;

pub use style::{ComputedStyle, Visibility};

use thiserror::Error;

/// Stable identity of a node within one [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Errors returned by tree queries and edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("node {0:?} is not an element")]
    NotElement(NodeId),
    #[error("node {0:?} is not a text node")]
    NotText(NodeId),
    #[error("node {0:?} is detached from the document")]
    Detached(NodeId),
    #[error("inserting {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
    #[error("{before:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, before: NodeId },
    #[error("effective style of {0:?} cannot be computed")]
    StyleUnavailable(NodeId),
    #[error("the document root cannot be removed")]
    RootRemoval,
}

/// One entry of the change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// Children of `target` were added and/or removed. `removed` lists the
    /// roots of the removed subtrees, which remain readable while detached.
    ChildList { target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId> },
    /// The payload of the text node `target` changed.
    CharacterData { target: NodeId },
}

/// A node to be created by [`Document::replace_with_fragment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentNode {
    Text(String),
    /// An element holding a single text child.
    Element { tag: String, attributes: Vec<(String, String)>, text: String },
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
    /// Inline declarations; `None` when the element's style cannot be queried.
    style: Option<Vec<(String, String)>>,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeSlot {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeSlot>,
    root: NodeId,
    mutations: Vec<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document whose root is an empty `body` element.
    pub fn new() -> Self {
        let mut doc = Document { nodes: Vec::new(), root: NodeId(0), mutations: Vec::new() };
        doc.root = doc.create_element("body");
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever created, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // --- Creation ----------------------------------------------------------

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            style: Some(Vec::new()),
        }))
    }

    /// Create a detached element whose effective style cannot be computed
    /// (foreign content, plugin placeholders and the like).
    pub fn create_opaque_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData { tag: tag.to_ascii_lowercase(), attributes: Vec::new(), style: None }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeSlot { parent: None, children: Vec::new(), kind });
        id
    }

    // --- Tree edits (reported on the change feed) --------------------------

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insertion(parent, child)?;
        self.detach_recorded(child);
        self.slot_mut(parent)?.children.push(child);
        self.slot_mut(child)?.parent = Some(parent);
        self.mutations.push(MutationRecord::ChildList { target: parent, added: vec![child], removed: Vec::new() });
        Ok(())
    }

    /// Insert `child` before the existing child `before` of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, before: NodeId) -> Result<(), DomError> {
        self.check_insertion(parent, child)?;
        if self.parent(before) != Some(parent) || before == child {
            return Err(DomError::NotAChild { parent, before });
        }
        self.detach_recorded(child);
        let children = &mut self.slot_mut(parent)?.children;
        let pos = children.iter().position(|&c| c == before).ok_or(DomError::NotAChild { parent, before })?;
        children.insert(pos, child);
        self.slot_mut(child)?.parent = Some(parent);
        self.mutations.push(MutationRecord::ChildList { target: parent, added: vec![child], removed: Vec::new() });
        Ok(())
    }

    /// Detach `id` (and its subtree) from its parent.
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        if id == self.root {
            return Err(DomError::RootRemoval);
        }
        let parent = self.slot(id)?.parent.ok_or(DomError::Detached(id))?;
        self.unlink(parent, id);
        self.mutations.push(MutationRecord::ChildList { target: parent, added: Vec::new(), removed: vec![id] });
        Ok(())
    }

    /// Replace the payload of a text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        match &mut self.slot_mut(id)?.kind {
            NodeKind::Text(payload) => {
                *payload = text.to_string();
            }
            NodeKind::Element(_) => return Err(DomError::NotText(id)),
        }
        self.mutations.push(MutationRecord::CharacterData { target: id });
        Ok(())
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if !self.is_element(parent) {
            return Err(if self.nodes.get(parent.0 as usize).is_some() {
                DomError::NotElement(parent)
            } else {
                DomError::UnknownNode(parent)
            });
        }
        self.slot(child)?;
        if child == self.root || self.ancestors_or_self(parent).any(|a| a == child) {
            return Err(DomError::Cycle { parent, child });
        }
        Ok(())
    }

    fn detach_recorded(&mut self, child: NodeId) {
        if let Some(old) = self.parent(child) {
            self.unlink(old, child);
            self.mutations.push(MutationRecord::ChildList { target: old, added: Vec::new(), removed: vec![child] });
        }
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        if let Some(slot) = self.nodes.get_mut(parent.0 as usize) {
            slot.children.retain(|&c| c != child);
        }
        if let Some(slot) = self.nodes.get_mut(child.0 as usize) {
            slot.parent = None;
        }
    }

    // --- Attribute and style edits (not reported) --------------------------

    /// Set an attribute. `style` is parsed into inline declarations.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let data = self.element_mut(id)?;
        if name == "style" {
            if let Some(decls) = data.style.as_mut() {
                *decls = style::parse_declarations(value);
            }
            return Ok(());
        }
        match data.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => data.attributes.push((name, value.to_string())),
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        self.element_mut(id)?.attributes.retain(|(n, _)| *n != name);
        Ok(())
    }

    /// Set one inline style declaration, replacing an earlier one.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) -> Result<(), DomError> {
        let decls = self.element_mut(id)?.style.as_mut().ok_or(DomError::StyleUnavailable(id))?;
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim().to_string();
        match decls.iter_mut().find(|(p, _)| *p == property) {
            Some((_, v)) => *v = value,
            None => decls.push((property, value)),
        }
        Ok(())
    }

    // --- Queries -----------------------------------------------------------

    pub fn contains(&self, id: NodeId) -> bool {
        (id.0 as usize) < self.nodes.len()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0 as usize).and_then(|s| s.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0 as usize).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.0 as usize), Some(NodeSlot { kind: NodeKind::Element(_), .. }))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.0 as usize), Some(NodeSlot { kind: NodeKind::Text(_), .. }))
    }

    /// Lowercase tag name of an element.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attributes.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Payload of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id.0 as usize)?.kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }

    /// True when `id` is reachable from the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(id) && self.ancestors_or_self(id).last() == Some(self.root)
    }

    /// `id` followed by its parent chain up to the topmost ancestor.
    pub fn ancestors_or_self(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |&n| self.parent(n))
    }

    /// Whether the content of element `id` is user-editable.
    ///
    /// The nearest element carrying `contenteditable` decides; an unknown
    /// value defers to the next ancestor.
    pub fn is_editable(&self, id: NodeId) -> bool {
        for node in self.ancestors_or_self(id) {
            match self.attribute(node, "contenteditable").map(|v| v.trim().to_ascii_lowercase()) {
                Some(v) if v.is_empty() || v == "true" || v == "plaintext-only" => return true,
                Some(v) if v == "false" => return false,
                _ => {}
            }
        }
        false
    }

    /// Effective style of an element, derived from its inline declarations.
    pub fn computed_style(&self, id: NodeId) -> Result<ComputedStyle, DomError> {
        let element = match &self.slot(id)?.kind {
            NodeKind::Element(data) => data,
            NodeKind::Text(_) => return Err(DomError::NotElement(id)),
        };
        let decls = element.style.as_ref().ok_or(DomError::StyleUnavailable(id))?;
        Ok(ComputedStyle::from_declarations(decls))
    }

    /// `root` and every node below it, in document order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        out
    }

    /// Text nodes at or below `root`, in document order.
    pub fn text_units_under(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root).into_iter().filter(|&id| self.is_text(id)).collect()
    }

    // --- Fragment replacement ----------------------------------------------

    /// Swap the text node `id` for the nodes described by `pieces`.
    ///
    /// The unit must still be connected to the document. All preconditions
    /// are checked before the tree is touched, so an error leaves the
    /// document exactly as it was. On success the old node is
    /// detached and the ids of the new top-level nodes are returned.
    pub fn replace_with_fragment(&mut self, id: NodeId, pieces: &[FragmentNode]) -> Result<Vec<NodeId>, DomError> {
        if !self.is_text(id) {
            return Err(if self.contains(id) { DomError::NotText(id) } else { DomError::UnknownNode(id) });
        }
        let parent = self.parent(id).ok_or(DomError::Detached(id))?;
        let pos = self.children(parent).iter().position(|&c| c == id).ok_or(DomError::Detached(id))?;
        if !self.is_connected(parent) {
            return Err(DomError::Detached(id));
        }

        let mut created = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let node = match piece {
                FragmentNode::Text(text) => self.create_text(text),
                FragmentNode::Element { tag, attributes, text } => {
                    let el = self.create_element(tag);
                    if let NodeKind::Element(data) = &mut self.nodes[el.0 as usize].kind {
                        data.attributes =
                            attributes.iter().map(|(n, v)| (n.to_ascii_lowercase(), v.clone())).collect();
                    }
                    let inner = self.create_text(text);
                    self.nodes[el.0 as usize].children.push(inner);
                    self.nodes[inner.0 as usize].parent = Some(el);
                    el
                }
            };
            self.nodes[node.0 as usize].parent = Some(parent);
            created.push(node);
        }

        let children = &mut self.nodes[parent.0 as usize].children;
        let _ = children.splice(pos..=pos, created.iter().copied());
        self.nodes[id.0 as usize].parent = None;
        Ok(created)
    }

    // --- Change feed -------------------------------------------------------

    /// Drain the change feed.
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }

    pub fn has_pending_mutations(&self) -> bool {
        !self.mutations.is_empty()
    }

    // --- Serialisation -----------------------------------------------------

    /// Markup for `id` including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        markup::write_node(self, id, &mut out);
        out
    }

    /// Markup for the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            markup::write_node(self, child, &mut out);
        }
        out
    }

    // --- Internals ---------------------------------------------------------

    fn slot(&self, id: NodeId) -> Result<&NodeSlot, DomError> {
        self.nodes.get(id.0 as usize).ok_or(DomError::UnknownNode(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut NodeSlot, DomError> {
        self.nodes.get_mut(id.0 as usize).ok_or(DomError::UnknownNode(id))
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(id.0 as usize)?.kind {
            NodeKind::Element(data) => Some(data),
            NodeKind::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match &mut self.slot_mut(id)?.kind {
            NodeKind::Element(data) => Ok(data),
            NodeKind::Text(_) => Err(DomError::NotElement(id)),
        }
    }
}
