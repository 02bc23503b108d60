//! Container mutations: add, insert, remove, replace, clear, keyed access.
//!
//! Insertion follows copy-on-adopt: a node that already belongs to a
//! container (or that would end up inside itself) is cloned, and the clone
//! is what gets linked. Every mutating call returns the node actually
//! linked.

use std::collections::HashSet;

use json_joy_json_text::{DuplicatePropertyHandling, Primitive};

use crate::document::Document;
use crate::error::{TreeError, TreeResult};
use crate::events::{ChangeEvent, ChangeKind};
use crate::node::{NodeData, NodeId, NodeKind};

/// Key for [`Document::get`] and [`Document::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for Key<'_> {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl<'a> From<&'a str> for Key<'a> {
    fn from(name: &'a str) -> Self {
        Key::Name(name)
    }
}

impl<'a> From<&'a String> for Key<'a> {
    fn from(name: &'a String) -> Self {
        Key::Name(name)
    }
}

impl Key<'_> {
    fn render(&self) -> String {
        match self {
            Key::Index(i) => i.to_string(),
            Key::Name(name) => format!("\"{name}\""),
        }
    }
}

impl Document {
    fn container_kind(&self, id: NodeId) -> TreeResult<NodeKind> {
        let kind = self.kind(id)?;
        if kind.is_container() {
            Ok(kind)
        } else {
            Err(TreeError::WrongKind {
                expected: "container",
                found: kind,
            })
        }
    }

    fn check_child(&self, container: NodeKind, child: NodeId) -> TreeResult<NodeKind> {
        let child_kind = self.kind(child)?;
        let ok = match container {
            NodeKind::Object => child_kind == NodeKind::Property,
            NodeKind::Array | NodeKind::Constructor | NodeKind::Property => {
                child_kind != NodeKind::Property
            }
            NodeKind::Value => false,
        };
        if ok {
            Ok(child_kind)
        } else {
            Err(TreeError::IncompatibleChild {
                container,
                child: child_kind,
            })
        }
    }

    /// Existing property of `object` whose key clashes with `property`'s,
    /// plus the object's duplicate policy.
    fn key_clash(
        &self,
        object: NodeId,
        property: NodeId,
    ) -> TreeResult<Option<(NodeId, DuplicatePropertyHandling)>> {
        let NodeData::Object(data) = &self.node(object)?.data else {
            return Ok(None);
        };
        let name = self.name(property).unwrap_or_default();
        Ok(data
            .keys
            .get(&data.comparison.normalize(name))
            .map(|&existing| (existing, data.duplicates)))
    }

    /// Property with a key equal to `name` under the object's comparison.
    pub fn property(&self, object: NodeId, name: &str) -> Option<NodeId> {
        match &self.lookup(object)?.data {
            NodeData::Object(data) => data.keys.get(&data.comparison.normalize(name)).copied(),
            _ => None,
        }
    }

    /// `(name, value)` pairs of an object, in order.
    pub fn properties(&self, object: NodeId) -> Vec<(&str, NodeId)> {
        self.children(object)
            .iter()
            .filter_map(|&p| Some((self.name(p)?, self.property_value(p)?)))
            .collect()
    }

    pub fn add(&mut self, container: NodeId, child: NodeId) -> TreeResult<NodeId> {
        let len = self.len(container);
        self.insert_with(container, len, child, None)
    }

    pub fn prepend(&mut self, container: NodeId, child: NodeId) -> TreeResult<NodeId> {
        self.insert_with(container, 0, child, None)
    }

    pub fn insert(&mut self, container: NodeId, index: usize, child: NodeId) -> TreeResult<NodeId> {
        self.insert_with(container, index, child, None)
    }

    /// Insert honouring `duplicates` instead of the object's own policy.
    /// Under [`DuplicatePropertyHandling::Ignore`] the existing property is
    /// returned and nothing changes.
    pub fn insert_with(
        &mut self,
        container: NodeId,
        index: usize,
        child: NodeId,
        duplicates: Option<DuplicatePropertyHandling>,
    ) -> TreeResult<NodeId> {
        let kind = self.container_kind(container)?;
        self.check_child(kind, child)?;
        let len = self.len(container);
        if index > len {
            return Err(TreeError::IndexOutOfRange {
                container: kind,
                index,
                len,
            });
        }
        if let Some((existing, policy)) = self.key_clash(container, child)? {
            if existing == child {
                return Ok(child);
            }
            return match duplicates.unwrap_or(policy) {
                DuplicatePropertyHandling::Ignore => Ok(existing),
                DuplicatePropertyHandling::Replace => self.replace(existing, child),
                DuplicatePropertyHandling::Error => Err(TreeError::DuplicateProperty {
                    name: self.name(child).unwrap_or_default().to_owned(),
                    path: self.compute_path(container),
                }),
            };
        }
        let child = self.adopt(child, Some(container))?;
        self.emit(ChangeEvent::children(ChangeKind::Adding, container, index, Some(child)));
        self.link(container, index, child)?;
        self.emit(ChangeEvent::children(ChangeKind::Added, container, index, Some(child)));
        Ok(child)
    }

    /// Detach `child` from its container. The node lives on as a root.
    pub fn remove(&mut self, child: NodeId) -> TreeResult<()> {
        let node = self.node(child)?;
        let kind = node.data.kind();
        let parent = node.parent.ok_or(TreeError::Detached(kind))?;
        if self.kind(parent)? == NodeKind::Property {
            return Err(TreeError::PropertyValueRemoval);
        }
        let index = self.index_of(child).ok_or(TreeError::StaleNode)?;
        self.emit(ChangeEvent::children(ChangeKind::Removing, parent, index, Some(child)));
        self.unlink(child)?;
        self.emit(ChangeEvent::children(ChangeKind::Removed, parent, index, Some(child)));
        Ok(())
    }

    pub fn remove_at(&mut self, container: NodeId, index: usize) -> TreeResult<NodeId> {
        let kind = self.container_kind(container)?;
        let len = self.len(container);
        let child = self
            .children(container)
            .get(index)
            .copied()
            .ok_or(TreeError::IndexOutOfRange {
                container: kind,
                index,
                len,
            })?;
        self.remove(child)?;
        Ok(child)
    }

    /// Remove the property named `name`; returns it when there was one.
    pub fn remove_property(&mut self, object: NodeId, name: &str) -> TreeResult<Option<NodeId>> {
        let kind = self.kind(object)?;
        if kind != NodeKind::Object {
            return Err(TreeError::InvalidKeyType {
                container: kind,
                key: format!("\"{name}\""),
                expected: "Int32 index",
            });
        }
        match self.property(object, name) {
            Some(property) => {
                self.remove(property)?;
                Ok(Some(property))
            }
            None => Ok(None),
        }
    }

    /// Put `replacement` where `existing` is. Replacing a property's value
    /// is the way to change what a property holds.
    pub fn replace(&mut self, existing: NodeId, replacement: NodeId) -> TreeResult<NodeId> {
        if existing == replacement {
            return Ok(existing);
        }
        let node = self.node(existing)?;
        let parent = node.parent.ok_or(TreeError::Detached(node.data.kind()))?;
        let parent_kind = self.kind(parent)?;
        self.check_child(parent_kind, replacement)?;
        if let Some((clash, _)) = self.key_clash(parent, replacement)? {
            if clash != existing {
                return Err(TreeError::DuplicateProperty {
                    name: self.name(replacement).unwrap_or_default().to_owned(),
                    path: self.compute_path(parent),
                });
            }
        }
        let replacement = self.adopt(replacement, Some(parent))?;
        let index = self.index_of(existing).ok_or(TreeError::StaleNode)?;
        self.emit(ChangeEvent::children(ChangeKind::Replacing, parent, index, Some(existing)));
        self.unlink(existing)?;
        self.link(parent, index, replacement)?;
        self.emit(ChangeEvent::children(ChangeKind::Replaced, parent, index, Some(replacement)));
        Ok(replacement)
    }

    /// Swap every child of `container` for `children`.
    pub fn replace_all(
        &mut self,
        container: NodeId,
        children: impl IntoIterator<Item = NodeId>,
    ) -> TreeResult<()> {
        let children: Vec<NodeId> = children.into_iter().collect();
        let kind = self.container_kind(container)?;
        for &child in &children {
            self.check_child(kind, child)?;
        }
        self.check_unique_keys(container, &children)?;
        self.clear(container)?;
        for child in children {
            self.add(container, child)?;
        }
        Ok(())
    }

    /// Fail before anything changes when `children` would clash under an
    /// object's `Error` policy.
    fn check_unique_keys(&self, object: NodeId, children: &[NodeId]) -> TreeResult<()> {
        let NodeData::Object(data) = &self.node(object)?.data else {
            return Ok(());
        };
        if data.duplicates != DuplicatePropertyHandling::Error {
            return Ok(());
        }
        let mut seen = HashSet::new();
        for &child in children {
            let name = self.name(child).unwrap_or_default();
            if !seen.insert(data.comparison.normalize(name)) {
                return Err(TreeError::DuplicateProperty {
                    name: name.to_owned(),
                    path: self.compute_path(object),
                });
            }
        }
        Ok(())
    }

    pub fn clear(&mut self, container: NodeId) -> TreeResult<()> {
        self.container_kind(container)?;
        self.emit(ChangeEvent::children(ChangeKind::Clearing, container, 0, None));
        while let Some(child) = self.last_child(container) {
            self.unlink(child)?;
        }
        self.emit(ChangeEvent::children(ChangeKind::Cleared, container, 0, None));
        Ok(())
    }

    /// Assign the scalar of a value node.
    pub fn set_value(&mut self, id: NodeId, value: impl Into<Primitive>) -> TreeResult<()> {
        let value = value.into();
        let before = match &self.node(id)?.data {
            NodeData::Value(v) => v.clone(),
            other => {
                return Err(TreeError::WrongKind {
                    expected: "value",
                    found: other.kind(),
                })
            }
        };
        self.emit(ChangeEvent {
            kind: ChangeKind::ValueChanging,
            node: id,
            index: None,
            child: None,
            before: Some(before.clone()),
            after: Some(value.clone()),
        });
        self.node_mut(id)?.data = NodeData::Value(value.clone());
        self.emit(ChangeEvent {
            kind: ChangeKind::ValueChanged,
            node: id,
            index: None,
            child: None,
            before: Some(before),
            after: Some(value),
        });
        Ok(())
    }

    fn key_error(&self, container: NodeId, key: Key<'_>) -> TreeResult<TreeError> {
        let kind = self.kind(container)?;
        let expected = match kind {
            NodeKind::Object => "Object property name",
            _ => "Int32 index",
        };
        Ok(TreeError::InvalidKeyType {
            container: kind,
            key: key.render(),
            expected,
        })
    }

    /// Child at `key`: an object's property value by name, an array's or
    /// constructor's element by position. Names on arrays and positions on
    /// objects are structural errors.
    pub fn get<'k>(&self, container: NodeId, key: impl Into<Key<'k>>) -> TreeResult<Option<NodeId>> {
        let key = key.into();
        match (self.kind(container)?, key) {
            (NodeKind::Object, Key::Name(name)) => Ok(self
                .property(container, name)
                .and_then(|p| self.property_value(p))),
            (NodeKind::Array | NodeKind::Constructor, Key::Index(i)) => {
                Ok(self.children(container).get(i).copied())
            }
            (found @ (NodeKind::Property | NodeKind::Value), _) => Err(TreeError::WrongKind {
                expected: "container",
                found,
            }),
            _ => Err(self.key_error(container, key)?),
        }
    }

    /// Store `child` at `key`. Objects get a new property or have the
    /// existing property's value replaced; arrays and constructors have
    /// the element at that position replaced.
    pub fn set<'k>(
        &mut self,
        container: NodeId,
        key: impl Into<Key<'k>>,
        child: NodeId,
    ) -> TreeResult<NodeId> {
        let key = key.into();
        match (self.kind(container)?, key) {
            (NodeKind::Object, Key::Name(name)) => match self.property(container, name) {
                Some(property) => {
                    let current = self.property_value(property).ok_or(TreeError::StaleNode)?;
                    self.replace(current, child)
                }
                None => {
                    let property = self.new_property(name, child)?;
                    self.add(container, property)?;
                    self.property_value(property).ok_or(TreeError::StaleNode)
                }
            },
            (kind @ (NodeKind::Array | NodeKind::Constructor), Key::Index(i)) => {
                let len = self.len(container);
                match self.children(container).get(i).copied() {
                    Some(current) => self.replace(current, child),
                    None => Err(TreeError::IndexOutOfRange {
                        container: kind,
                        index: i,
                        len,
                    }),
                }
            }
            (found @ (NodeKind::Property | NodeKind::Value), _) => Err(TreeError::WrongKind {
                expected: "container",
                found,
            }),
            _ => Err(self.key_error(container, key)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_links(doc: &Document, container: NodeId) {
        let children = doc.children(container);
        for (i, &child) in children.iter().enumerate() {
            assert_eq!(doc.parent(child), Some(container));
            assert_eq!(doc.previous(child), i.checked_sub(1).map(|p| children[p]));
            assert_eq!(doc.next(child), children.get(i + 1).copied());
        }
    }

    #[test]
    fn insert_and_remove_keep_sibling_links() {
        let mut doc = Document::new();
        let arr = doc.new_array();
        let ids: Vec<NodeId> = (0..4i64).map(|i| doc.new_value(i)).collect();
        for &id in &ids {
            doc.add(arr, id).unwrap();
        }
        let front = doc.new_value(-1i64);
        doc.prepend(arr, front).unwrap();
        let mid = doc.new_value(99i64);
        doc.insert(arr, 2, mid).unwrap();
        assert_links(&doc, arr);

        doc.remove(mid).unwrap();
        assert_eq!(doc.parent(mid), None);
        assert_eq!(doc.previous(mid), None);
        assert_eq!(doc.next(mid), None);
        let removed = doc.remove_at(arr, 0).unwrap();
        assert_eq!(removed, front);
        assert_links(&doc, arr);
        assert_eq!(doc.children(arr), ids.as_slice());
        assert_eq!(doc.previous(ids[0]), None);
        assert_eq!(doc.next(ids[3]), None);
    }

    #[test]
    fn adding_a_parented_node_adds_a_copy() {
        let mut doc = Document::new();
        let a = doc.new_array();
        let b = doc.new_array();
        let v = doc.new_value("x");
        let v = doc.add(a, v).unwrap();
        let copy = doc.add(b, v).unwrap();
        assert_ne!(copy, v);
        assert_eq!(doc.parent(v), Some(a));
        assert_eq!(doc.parent(copy), Some(b));
        assert!(doc.deep_equals(v, copy));
    }

    #[test]
    fn adding_a_container_to_itself_adds_a_copy() {
        let mut doc = Document::new();
        let a = doc.new_array();
        let copy = doc.add(a, a).unwrap();
        assert_ne!(copy, a);
        assert_eq!(doc.len(a), 1);
        assert_eq!(doc.len(copy), 0);
    }

    #[test]
    fn duplicate_policies() {
        let mut doc = Document::new();
        let obj = doc.new_object();
        let one = doc.new_value(1i64);
        let first = doc.new_property("a", one).unwrap();
        doc.add(obj, first).unwrap();

        let two = doc.new_value(2i64);
        let second = doc.new_property("a", two).unwrap();
        let err = doc.add(obj, second).unwrap_err();
        assert!(matches!(err, TreeError::DuplicateProperty { ref name, .. } if name == "a"));

        let kept = doc
            .insert_with(obj, 1, second, Some(DuplicatePropertyHandling::Ignore))
            .unwrap();
        assert_eq!(kept, first);
        assert_eq!(doc.get(obj, "a").unwrap().and_then(|v| doc.value(v).cloned()), Some(1i64.into()));

        doc.insert_with(obj, 1, second, Some(DuplicatePropertyHandling::Replace))
            .unwrap();
        assert_eq!(doc.len(obj), 1);
        assert_eq!(doc.get(obj, "a").unwrap().and_then(|v| doc.value(v).cloned()), Some(2i64.into()));
    }

    #[test]
    fn case_insensitive_objects_match_names_loosely() {
        let mut doc = Document::new();
        let obj = doc.new_object_with(
            json_joy_json_text::KeyComparison::IgnoreCase,
            DuplicatePropertyHandling::Error,
        );
        let v = doc.new_value(true);
        doc.set(obj, "Name", v).unwrap();
        assert!(doc.get(obj, "NAME").unwrap().is_some());
        let w = doc.new_value(false);
        let p = doc.new_property("name", w).unwrap();
        assert!(doc.add(obj, p).is_err());
    }

    #[test]
    fn wrong_key_types_are_structural_errors() {
        let mut doc = Document::new();
        let arr = doc.new_array();
        let obj = doc.new_object();
        assert!(matches!(
            doc.get(arr, "a"),
            Err(TreeError::InvalidKeyType { container: NodeKind::Array, expected: "Int32 index", .. })
        ));
        assert!(matches!(
            doc.get(obj, 0usize),
            Err(TreeError::InvalidKeyType { container: NodeKind::Object, .. })
        ));
        let ctor = doc.new_constructor("Date");
        assert!(doc.get(ctor, "x").is_err());
    }

    #[test]
    fn incompatible_children_are_rejected() {
        let mut doc = Document::new();
        let obj = doc.new_object();
        let arr = doc.new_array();
        let v = doc.new_value(1i64);
        assert!(matches!(
            doc.add(obj, v),
            Err(TreeError::IncompatibleChild { container: NodeKind::Object, child: NodeKind::Value })
        ));
        let p = doc.new_property("a", v).unwrap();
        assert!(doc.add(arr, p).is_err());
        assert!(doc.add(v, arr).is_err());
    }

    #[test]
    fn property_values_are_replaced_not_removed() {
        let mut doc = Document::new();
        let obj = doc.parse(r#"{"a":1}"#).unwrap();
        let value = doc.get(obj, "a").unwrap().unwrap();
        assert!(matches!(doc.remove(value), Err(TreeError::PropertyValueRemoval)));
        let replacement = doc.new_array();
        doc.set(obj, "a", replacement).unwrap();
        assert_eq!(doc.get(obj, "a").unwrap(), Some(replacement));
        assert_eq!(doc.parent(value), None);
        assert_eq!(doc.len(doc.property(obj, "a").unwrap()), 1);
    }

    #[test]
    fn clear_and_replace_all() {
        let mut doc = Document::new();
        let arr = doc.parse("[1,2,3]").unwrap();
        let old: Vec<NodeId> = doc.children(arr).to_vec();
        let x = doc.new_value("x");
        let y = doc.new_value("y");
        doc.replace_all(arr, [x, y]).unwrap();
        assert_eq!(doc.children(arr), &[x, y]);
        assert!(old.iter().all(|&o| doc.parent(o).is_none()));
        assert_links(&doc, arr);
        doc.clear(arr).unwrap();
        assert_eq!(doc.len(arr), 0);
    }

    #[test]
    fn failing_replace_all_leaves_the_object_alone() {
        let mut doc = Document::new();
        let obj = doc.parse(r#"{"x":0}"#).unwrap();
        let before = doc.children(obj).to_vec();
        let one = doc.new_value(1i64);
        let two = doc.new_value(2i64);
        let a1 = doc.new_property("a", one).unwrap();
        let a2 = doc.new_property("a", two).unwrap();
        let err = doc.replace_all(obj, [a1, a2]).unwrap_err();
        assert!(matches!(err, TreeError::DuplicateProperty { ref name, .. } if name == "a"));
        assert_eq!(doc.children(obj), before.as_slice());
        assert!(doc.property(obj, "x").is_some());
        assert_eq!(doc.parent(a1), None);
    }

    #[test]
    fn properties_lists_names_and_values() {
        let mut doc = Document::new();
        let obj = doc.parse(r#"{"a":1,"b":2}"#).unwrap();
        let names: Vec<&str> = doc.properties(obj).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(doc.remove_property(obj, "a").unwrap().is_some());
        assert!(doc.remove_property(obj, "a").unwrap().is_none());
        assert_eq!(doc.len(obj), 1);
    }
}
