//! Traversal: ancestors, descendants and siblings, all in document order.

use crate::document::Document;
use crate::node::NodeId;

/// Walks parent links upwards.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

/// Pre-order walk of a subtree.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(current).iter().rev().copied());
        Some(current)
    }
}

/// Follows sibling links in one direction.
pub struct Siblings<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
    forward: bool,
}

impl Iterator for Siblings<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = if self.forward {
            self.doc.next(current)
        } else {
            self.doc.previous(current)
        };
        Some(current)
    }
}

impl Document {
    /// Topmost ancestor; the node itself when it has no parent.
    pub fn root(&self, id: NodeId) -> NodeId {
        self.ancestors_and_self(id).last().unwrap_or(id)
    }

    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    pub fn ancestors_and_self(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.contains(id).then_some(id),
        }
    }

    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: self.children(id).iter().rev().copied().collect(),
        }
    }

    pub fn descendants_and_self(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: if self.contains(id) { vec![id] } else { Vec::new() },
        }
    }

    /// Siblings after `id`, nearest first.
    pub fn following_siblings(&self, id: NodeId) -> Siblings<'_> {
        Siblings {
            doc: self,
            next: self.next(id),
            forward: true,
        }
    }

    /// Siblings before `id`, nearest first.
    pub fn preceding_siblings(&self, id: NodeId) -> Siblings<'_> {
        Siblings {
            doc: self,
            next: self.previous(id),
            forward: false,
        }
    }
}
