//! Change notifications.
//!
//! Listeners are registered on a node and hear about mutations of that node
//! and of everything below it. Each mutation is announced twice: a
//! `*ing` event before anything changes and an `*ed` event once the tree is
//! consistent again.

use json_joy_json_text::Primitive;

use crate::document::Document;
use crate::error::TreeResult;
use crate::node::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Adding,
    Added,
    Removing,
    Removed,
    Replacing,
    Replaced,
    Clearing,
    Cleared,
    ValueChanging,
    ValueChanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Container whose children change, or the value node being assigned.
    pub node: NodeId,
    /// Position of the affected child.
    pub index: Option<usize>,
    /// Child being added or removed. For replacements, the outgoing child
    /// before and the incoming child after.
    pub child: Option<NodeId>,
    /// Scalar before and after a value assignment.
    pub before: Option<Primitive>,
    pub after: Option<Primitive>,
}

impl ChangeEvent {
    pub(crate) fn children(kind: ChangeKind, node: NodeId, index: usize, child: Option<NodeId>) -> Self {
        Self {
            kind,
            node,
            index: Some(index),
            child,
            before: None,
            after: None,
        }
    }
}

pub(crate) struct Listener {
    pub node: NodeId,
    pub callback: Box<dyn FnMut(&ChangeEvent) + Send + Sync>,
}

impl Document {
    /// Observe mutations of `node` and its descendants. Returns an id for
    /// [`off_change`](Self::off_change).
    pub fn on_change<F>(&mut self, node: NodeId, listener: F) -> TreeResult<u64>
    where
        F: FnMut(&ChangeEvent) + Send + Sync + 'static,
    {
        self.node(node)?;
        let id = self.next_listener_id;
        self.next_listener_id = self.next_listener_id.saturating_add(1);
        self.listeners.insert(
            id,
            Listener {
                node,
                callback: Box::new(listener),
            },
        );
        Ok(id)
    }

    pub fn off_change(&mut self, listener_id: u64) -> bool {
        self.listeners.remove(&listener_id).is_some()
    }

    pub(crate) fn emit(&mut self, event: ChangeEvent) {
        if self.listeners.is_empty() {
            return;
        }
        let scope: Vec<NodeId> = self.ancestors_and_self(event.node).collect();
        for listener in self.listeners.values_mut() {
            if scope.contains(&listener.node) {
                (listener.callback)(&event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recorder(doc: &mut Document, node: NodeId) -> (u64, Arc<Mutex<Vec<ChangeKind>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = doc
            .on_change(node, move |e: &ChangeEvent| sink.lock().unwrap().push(e.kind))
            .unwrap();
        (id, seen)
    }

    #[test]
    fn events_bracket_each_mutation() {
        let mut doc = Document::new();
        let arr = doc.new_array();
        let (_, seen) = recorder(&mut doc, arr);
        let one = doc.new_value(1i64);
        let one = doc.add(arr, one).unwrap();
        let two = doc.new_value(2i64);
        doc.replace(one, two).unwrap();
        doc.clear(arr).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ChangeKind::Adding,
                ChangeKind::Added,
                ChangeKind::Replacing,
                ChangeKind::Replaced,
                ChangeKind::Clearing,
                ChangeKind::Cleared,
            ]
        );
    }

    #[test]
    fn ancestors_hear_nested_changes_until_unsubscribed() {
        let mut doc = Document::new();
        let root = doc.parse(r#"{"a":[1]}"#).unwrap();
        let (id, seen) = recorder(&mut doc, root);
        let arr = doc.get(root, "a").unwrap().unwrap();
        let leaf = doc.first_child(arr).unwrap();
        doc.set_value(leaf, 5i64).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ChangeKind::ValueChanging, ChangeKind::ValueChanged]
        );
        assert!(doc.off_change(id));
        assert!(!doc.off_change(id));
        doc.set_value(leaf, 6i64).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn value_events_carry_before_and_after() {
        let mut doc = Document::new();
        let v = doc.new_value("old");
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        doc.on_change(v, move |e: &ChangeEvent| {
            sink.lock().unwrap().push((e.before.clone(), e.after.clone()))
        })
        .unwrap();
        doc.set_value(v, "new").unwrap();
        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[1].0, Some(Primitive::from("old")));
        assert_eq!(captured[1].1, Some(Primitive::from("new")));
    }
}
