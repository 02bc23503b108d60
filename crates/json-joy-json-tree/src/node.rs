//! Node storage: handles, kinds and per-node payloads.

use std::fmt;

use indexmap::IndexMap;
use json_joy_json_text::{DuplicatePropertyHandling, KeyComparison, Primitive};

use crate::annotation::Annotation;

/// Generational handle to a node in a [`Document`](crate::Document).
///
/// Handles stay valid until the node is deleted; a handle to a deleted node
/// never aliases a node created later in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Object,
    Array,
    Constructor,
    Property,
    Value,
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Object => "Object",
            NodeKind::Array => "Array",
            NodeKind::Constructor => "Constructor",
            NodeKind::Property => "Property",
            NodeKind::Value => "Value",
        }
    }

    /// Object, array and constructor nodes.
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Object | NodeKind::Array | NodeKind::Constructor)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key index and policies of an object node.
#[derive(Debug, Clone)]
pub(crate) struct ObjectData {
    pub comparison: KeyComparison,
    pub duplicates: DuplicatePropertyHandling,
    /// Normalised name to property node, in child order.
    pub keys: IndexMap<String, NodeId>,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Object(ObjectData),
    Array,
    Constructor(String),
    Property(String),
    Value(Primitive),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Object(_) => NodeKind::Object,
            NodeData::Array => NodeKind::Array,
            NodeData::Constructor(_) => NodeKind::Constructor,
            NodeData::Property(_) => NodeKind::Property,
            NodeData::Value(_) => NodeKind::Value,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    /// Ordered children. A property holds exactly its value.
    pub children: Vec<NodeId>,
    pub annotations: Vec<Annotation>,
    pub line_info: Option<(usize, usize)>,
}

impl Node {
    pub fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            prev: None,
            next: None,
            children: Vec::new(),
            annotations: Vec::new(),
            line_info: None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Slot {
    pub generation: u32,
    pub node: Option<Node>,
}
