//! Per-node side-channel metadata, keyed by type.
//!
//! Annotations are invisible to equality, hashing and emission. Cloning a
//! node deep-copies its annotations.

use std::any::Any;
use std::fmt;

use crate::document::Document;
use crate::error::TreeResult;
use crate::node::NodeId;

/// A value that can be attached to a node.
pub trait AnnotationValue: Any + fmt::Debug + Send + Sync {
    fn clone_boxed(&self) -> Box<dyn AnnotationValue>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Clone + fmt::Debug + Send + Sync> AnnotationValue for T {
    fn clone_boxed(&self) -> Box<dyn AnnotationValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Methods must be called on the boxed value (`(**a)`); a `&Box` is itself
/// `Clone` and would resolve to the blanket impl.
pub(crate) type Annotation = Box<dyn AnnotationValue>;

impl Document {
    /// Append an annotation. Several annotations of one type may coexist.
    pub fn add_annotation<T: AnnotationValue>(&mut self, id: NodeId, value: T) -> TreeResult<()> {
        self.node_mut(id)?.annotations.push(Box::new(value));
        Ok(())
    }

    /// First annotation of type `T`, in insertion order.
    pub fn annotation<T: Any>(&self, id: NodeId) -> Option<&T> {
        self.lookup(id)?
            .annotations
            .iter()
            .find_map(|a| (**a).as_any().downcast_ref::<T>())
    }

    /// Every annotation of type `T`, in insertion order.
    pub fn annotations<T: Any>(&self, id: NodeId) -> Vec<&T> {
        match self.lookup(id) {
            Some(node) => node
                .annotations
                .iter()
                .filter_map(|a| (**a).as_any().downcast_ref::<T>())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Drop every annotation of type `T`; returns how many were removed.
    pub fn remove_annotations<T: Any>(&mut self, id: NodeId) -> TreeResult<usize> {
        let node = self.node_mut(id)?;
        let before = node.annotations.len();
        node.annotations.retain(|a| !(**a).as_any().is::<T>());
        Ok(before - node.annotations.len())
    }
}
