//! The node arena.
//!
//! A [`Document`] owns every node; nodes refer to each other (parent,
//! siblings, children) through [`NodeId`] handles. A node removed from its
//! container stays alive as a detached root until [`Document::delete`]
//! frees it.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use json_joy_json_text::{
    default_settings, DocumentSettings, DuplicatePropertyHandling, KeyComparison, Primitive,
};
use tracing::trace;

use crate::annotation::Annotation;
use crate::error::{TreeError, TreeResult};
use crate::events::Listener;
use crate::node::{Node, NodeData, NodeId, NodeKind, ObjectData, Slot};

/// Arena of document nodes plus the observers registered on them.
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    settings: DocumentSettings,
    pub(crate) next_listener_id: u64,
    pub(crate) listeners: BTreeMap<u64, Listener>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.node_count())
            .field("settings", &self.settings)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything about a node except its links, as copied by clone/import.
struct Shell {
    data: NodeData,
    annotations: Vec<Annotation>,
    line_info: Option<(usize, usize)>,
    children: Vec<NodeId>,
}

impl Shell {
    fn of(node: &Node) -> Self {
        let mut data = node.data.clone();
        if let NodeData::Object(object) = &mut data {
            object.keys.clear();
        }
        Self {
            data,
            annotations: node.annotations.iter().map(|a| (**a).clone_boxed()).collect(),
            line_info: node.line_info,
            children: node.children.clone(),
        }
    }
}

impl Document {
    /// Empty document using the process-wide default settings.
    pub fn new() -> Self {
        Self::with_settings(default_settings().document)
    }

    pub fn with_settings(settings: DocumentSettings) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            settings,
            next_listener_id: 1,
            listeners: BTreeMap::new(),
        }
    }

    pub fn settings(&self) -> &DocumentSettings {
        &self.settings
    }

    /// Number of live nodes, attached or not.
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.lookup(id).is_some()
    }

    pub(crate) fn lookup(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub(crate) fn node(&self, id: NodeId) -> TreeResult<&Node> {
        self.lookup(id).ok_or(TreeError::StaleNode)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> TreeResult<&mut Node> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .ok_or(TreeError::StaleNode)?;
        if slot.generation != id.generation {
            return Err(TreeError::StaleNode);
        }
        slot.node.as_mut().ok_or(TreeError::StaleNode)
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Empty object using the document's key comparison and duplicate policy.
    pub fn new_object(&mut self) -> NodeId {
        let DocumentSettings {
            property_name_comparison,
            duplicate_property_handling,
        } = self.settings;
        self.new_object_with(property_name_comparison, duplicate_property_handling)
    }

    pub fn new_object_with(
        &mut self,
        comparison: KeyComparison,
        duplicates: DuplicatePropertyHandling,
    ) -> NodeId {
        self.alloc(Node::new(NodeData::Object(ObjectData {
            comparison,
            duplicates,
            keys: IndexMap::new(),
        })))
    }

    pub fn new_array(&mut self) -> NodeId {
        self.alloc(Node::new(NodeData::Array))
    }

    /// Empty `new Name(...)` node.
    pub fn new_constructor(&mut self, name: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeData::Constructor(name.into())))
    }

    pub fn new_value(&mut self, value: impl Into<Primitive>) -> NodeId {
        self.alloc(Node::new(NodeData::Value(value.into())))
    }

    /// Property holding `value`. A value that already has a parent is
    /// cloned first.
    pub fn new_property(&mut self, name: impl Into<String>, value: NodeId) -> TreeResult<NodeId> {
        let value_kind = self.kind(value)?;
        if value_kind == NodeKind::Property {
            return Err(TreeError::IncompatibleChild {
                container: NodeKind::Property,
                child: value_kind,
            });
        }
        let value = self.adopt(value, None)?;
        let property = self.alloc(Node::new(NodeData::Property(name.into())));
        self.push_child_raw(property, value)?;
        Ok(property)
    }

    pub fn kind(&self, id: NodeId) -> TreeResult<NodeKind> {
        Ok(self.node(id)?.data.kind())
    }

    /// Scalar of a value node.
    pub fn value(&self, id: NodeId) -> Option<&Primitive> {
        match &self.lookup(id)?.data {
            NodeData::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Name of a property or constructor node.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.lookup(id)?.data {
            NodeData::Property(name) | NodeData::Constructor(name) => Some(name),
            _ => None,
        }
    }

    /// Line and column recorded when the node was loaded from text.
    pub fn line_info(&self, id: NodeId) -> Option<(usize, usize)> {
        self.lookup(id)?.line_info
    }

    pub fn set_line_info(&mut self, id: NodeId, line_info: Option<(usize, usize)>) -> TreeResult<()> {
        self.node_mut(id)?.line_info = line_info;
        Ok(())
    }

    /// Key comparison of an object node.
    pub fn comparison(&self, id: NodeId) -> Option<KeyComparison> {
        match &self.lookup(id)?.data {
            NodeData::Object(object) => Some(object.comparison),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.lookup(id)?.parent
    }

    pub fn previous(&self, id: NodeId) -> Option<NodeId> {
        self.lookup(id)?.prev
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.lookup(id)?.next
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.lookup(id)?.children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.lookup(id)?.children.last().copied()
    }

    /// Children in order. Empty for values and unknown handles.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.lookup(id) {
            Some(node) => &node.children,
            None => &[],
        }
    }

    pub fn len(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    /// Value node of a property.
    pub fn property_value(&self, property: NodeId) -> Option<NodeId> {
        match &self.lookup(property)?.data {
            NodeData::Property(_) => self.first_child(property),
            _ => None,
        }
    }

    /// Position of `id` among its parent's children.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Independent, unparented deep copy of a subtree, annotations included.
    pub fn clone_node(&mut self, id: NodeId) -> TreeResult<NodeId> {
        let shell = Shell::of(self.node(id)?);
        self.materialize(None, shell)
    }

    /// Deep copy of a subtree owned by another document.
    pub fn import(&mut self, other: &Document, id: NodeId) -> TreeResult<NodeId> {
        let shell = Shell::of(other.node(id)?);
        self.materialize(Some(other), shell)
    }

    fn materialize(&mut self, source: Option<&Document>, shell: Shell) -> TreeResult<NodeId> {
        let mut node = Node::new(shell.data);
        node.annotations = shell.annotations;
        node.line_info = shell.line_info;
        let copy = self.alloc(node);
        for child in shell.children {
            let child_shell = match source {
                Some(doc) => Shell::of(doc.node(child)?),
                None => Shell::of(self.node(child)?),
            };
            let child_copy = self.materialize(source, child_shell)?;
            self.push_child_raw(copy, child_copy)?;
        }
        Ok(copy)
    }

    /// Free a detached subtree. Its handles become stale.
    pub fn delete(&mut self, id: NodeId) -> TreeResult<()> {
        let node = self.node(id)?;
        if node.parent.is_some() {
            return Err(TreeError::Attached(node.data.kind()));
        }
        let mut stack = vec![id];
        let mut freed = Vec::new();
        while let Some(current) = stack.pop() {
            let slot = &mut self.slots[current.index as usize];
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
                freed.push(current);
            }
        }
        self.listeners.retain(|_, l| !freed.contains(&l.node));
        trace!(root = %id, freed = freed.len(), "deleted subtree");
        Ok(())
    }

    /// `child` itself when it is free to move into `container`, otherwise a
    /// clone: nodes with a parent, and ancestors of the container, are
    /// copied.
    pub(crate) fn adopt(&mut self, child: NodeId, container: Option<NodeId>) -> TreeResult<NodeId> {
        let node = self.node(child)?;
        let in_use = node.parent.is_some()
            || container.is_some_and(|c| self.is_ancestor_or_self(child, c));
        if in_use {
            self.clone_node(child)
        } else {
            Ok(child)
        }
    }

    pub(crate) fn is_ancestor_or_self(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.parent(id) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    /// Link `child` at `index` without validation or notifications.
    pub(crate) fn link(&mut self, container: NodeId, index: usize, child: NodeId) -> TreeResult<()> {
        let key = match &self.node(container)?.data {
            NodeData::Object(object) => match &self.node(child)?.data {
                NodeData::Property(name) => Some(object.comparison.normalize(name)),
                _ => None,
            },
            _ => None,
        };
        let (prev, next) = {
            let parent = self.node_mut(container)?;
            parent.children.insert(index, child);
            if let (Some(key), NodeData::Object(object)) = (key, &mut parent.data) {
                object.keys.shift_insert(index, key, child);
            }
            let prev = index.checked_sub(1).map(|i| parent.children[i]);
            let next = parent.children.get(index + 1).copied();
            (prev, next)
        };
        {
            let node = self.node_mut(child)?;
            node.parent = Some(container);
            node.prev = prev;
            node.next = next;
        }
        if let Some(prev) = prev {
            self.node_mut(prev)?.next = Some(child);
        }
        if let Some(next) = next {
            self.node_mut(next)?.prev = Some(child);
        }
        Ok(())
    }

    pub(crate) fn push_child_raw(&mut self, container: NodeId, child: NodeId) -> TreeResult<()> {
        let len = self.len(container);
        self.link(container, len, child)
    }

    /// Unlink `child` from its parent without notifications. Returns its
    /// former position.
    pub(crate) fn unlink(&mut self, child: NodeId) -> TreeResult<usize> {
        let (parent, prev, next, key_name) = {
            let node = self.node(child)?;
            let name = match &node.data {
                NodeData::Property(name) => Some(name.clone()),
                _ => None,
            };
            let parent = node
                .parent
                .ok_or(TreeError::Detached(node.data.kind()))?;
            (parent, node.prev, node.next, name)
        };
        let index = {
            let container = self.node_mut(parent)?;
            let index = container
                .children
                .iter()
                .position(|&c| c == child)
                .ok_or(TreeError::StaleNode)?;
            container.children.remove(index);
            if let (Some(name), NodeData::Object(object)) = (key_name, &mut container.data) {
                object.keys.shift_remove(&object.comparison.normalize(&name));
            }
            index
        };
        if let Some(prev) = prev {
            self.node_mut(prev)?.next = next;
        }
        if let Some(next) = next {
            self.node_mut(next)?.prev = prev;
        }
        let node = self.node_mut(child)?;
        node.parent = None;
        node.prev = None;
        node.next = None;
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_handles_are_rejected_after_delete() {
        let mut doc = Document::new();
        let arr = doc.new_array();
        let one = doc.new_value(1i64);
        doc.add(arr, one).unwrap();
        doc.delete(arr).unwrap();
        assert!(!doc.contains(arr));
        assert!(!doc.contains(one));
        assert_eq!(doc.node_count(), 0);

        let reused = doc.new_value(2i64);
        assert!(doc.contains(reused));
        assert_ne!(reused, one);
        assert_ne!(reused, arr);
        assert!(matches!(doc.kind(one), Err(TreeError::StaleNode)));
    }

    #[test]
    fn attached_nodes_cannot_be_deleted() {
        let mut doc = Document::new();
        let arr = doc.new_array();
        let one = doc.new_value(1i64);
        let one = doc.add(arr, one).unwrap();
        assert!(matches!(doc.delete(one), Err(TreeError::Attached(NodeKind::Value))));
    }

    #[test]
    fn clone_is_deep_and_unparented() {
        let mut doc = Document::new();
        let obj = doc.new_object();
        let arr = doc.new_array();
        let one = doc.new_value(1i64);
        doc.add(arr, one).unwrap();
        let prop = doc.new_property("a", arr).unwrap();
        doc.add(obj, prop).unwrap();

        let copy = doc.clone_node(obj).unwrap();
        assert_ne!(copy, obj);
        assert_eq!(doc.parent(copy), None);
        assert!(doc.deep_equals(obj, copy));
        let copied_prop = doc.first_child(copy).unwrap();
        assert_ne!(copied_prop, prop);
        assert_eq!(doc.parent(copied_prop), Some(copy));
        let copied_arr = doc.get(copy, "a").unwrap().unwrap();
        assert_ne!(copied_arr, arr);
        assert_eq!(doc.len(copied_arr), 1);
    }

    #[test]
    fn import_copies_across_documents() {
        let mut source = Document::new();
        let root = source.parse(r#"{"a":[1,{"b":null}]}"#).unwrap();
        let mut target = Document::new();
        let copy = target.import(&source, root).unwrap();
        assert!(target.deep_equals_across(copy, &source, root));
    }
}
