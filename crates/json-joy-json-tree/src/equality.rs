//! Structural equality and a hash consistent with it.
//!
//! Objects compare as key sets regardless of order, looking keys up with
//! the left-hand object's comparison. Arrays and constructors compare
//! element-wise. Values compare with [`Primitive::value_equals`].
//! Annotations and line info are ignored.

use json_joy_json_text::hash::{
    update_num, update_str, ARRAY_CONST, CONSTRUCTOR_CONST, OBJECT_CONST, PROPERTY_CONST,
    START_STATE,
};
use json_joy_json_text::Primitive;

use crate::document::Document;
use crate::node::{NodeData, NodeId};

fn nodes_equal(left: &Document, a: NodeId, right: &Document, b: NodeId) -> bool {
    let (Some(na), Some(nb)) = (left.lookup(a), right.lookup(b)) else {
        return false;
    };
    match (&na.data, &nb.data) {
        (NodeData::Value(x), NodeData::Value(y)) => x.value_equals(y),
        (NodeData::Array, NodeData::Array) => sequences_equal(left, &na.children, right, &nb.children),
        (NodeData::Constructor(x), NodeData::Constructor(y)) => {
            x == y && sequences_equal(left, &na.children, right, &nb.children)
        }
        (NodeData::Property(x), NodeData::Property(y)) => {
            x == y && sequences_equal(left, &na.children, right, &nb.children)
        }
        (NodeData::Object(oa), NodeData::Object(ob)) => {
            if na.children.len() != nb.children.len() {
                return false;
            }
            na.children.iter().all(|&pa| {
                let Some(name) = left.name(pa) else {
                    return false;
                };
                let pb = if oa.comparison == ob.comparison {
                    ob.keys.get(&ob.comparison.normalize(name)).copied()
                } else {
                    nb.children
                        .iter()
                        .copied()
                        .find(|&p| right.name(p).is_some_and(|n| oa.comparison.eq(name, n)))
                };
                match (left.property_value(pa), pb.and_then(|p| right.property_value(p))) {
                    (Some(va), Some(vb)) => nodes_equal(left, va, right, vb),
                    _ => false,
                }
            })
        }
        _ => false,
    }
}

fn sequences_equal(left: &Document, xs: &[NodeId], right: &Document, ys: &[NodeId]) -> bool {
    xs.len() == ys.len()
        && xs
            .iter()
            .zip(ys)
            .all(|(&x, &y)| nodes_equal(left, x, right, y))
}

fn hash_node(doc: &Document, id: NodeId, state: u64) -> u64 {
    let Some(node) = doc.lookup(id) else {
        return state;
    };
    match &node.data {
        NodeData::Value(v) => v.hash_into(state),
        NodeData::Array => {
            let mut state = update_num(state, ARRAY_CONST);
            state = update_num(state, node.children.len() as u64);
            for &child in &node.children {
                state = hash_node(doc, child, state);
            }
            state
        }
        NodeData::Constructor(name) => {
            let mut state = update_str(update_num(state, CONSTRUCTOR_CONST), name);
            for &child in &node.children {
                state = hash_node(doc, child, state);
            }
            state
        }
        NodeData::Property(name) => {
            let state = update_str(update_num(state, PROPERTY_CONST), &name.to_lowercase());
            node.children
                .iter()
                .fold(state, |s, &child| hash_node(doc, child, s))
        }
        NodeData::Object(_) => {
            // Order-independent: property hashes are summed.
            let sum = node
                .children
                .iter()
                .fold(0u64, |acc, &p| acc.wrapping_add(hash_node(doc, p, START_STATE)));
            let state = update_num(state, OBJECT_CONST);
            update_num(update_num(state, node.children.len() as u64), sum)
        }
    }
}

impl Document {
    /// Structural equality of two subtrees of this document.
    pub fn deep_equals(&self, a: NodeId, b: NodeId) -> bool {
        nodes_equal(self, a, self, b)
    }

    /// Structural equality against a subtree of another document.
    pub fn deep_equals_across(&self, a: NodeId, other: &Document, b: NodeId) -> bool {
        nodes_equal(self, a, other, b)
    }

    /// Hash consistent with [`deep_equals`](Self::deep_equals): equal
    /// subtrees hash equally, whatever their property order or key case.
    pub fn deep_hash(&self, id: NodeId) -> u64 {
        hash_node(self, id, START_STATE)
    }

    /// Whether a value node holds exactly this scalar under value equality.
    pub fn value_equals(&self, id: NodeId, value: &Primitive) -> bool {
        self.value(id).is_some_and(|v| v.value_equals(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use json_joy_json_text::{DuplicatePropertyHandling, KeyComparison};
    use num_bigint::BigInt;
    use rust_decimal::Decimal;

    #[test]
    fn object_equality_ignores_order() {
        let mut doc = Document::new();
        let a = doc.parse(r#"{"x":1,"y":[true,null]}"#).unwrap();
        let b = doc.parse(r#"{"y":[true,null],"x":1}"#).unwrap();
        let c = doc.parse(r#"{"y":[null,true],"x":1}"#).unwrap();
        assert!(doc.deep_equals(a, b));
        assert_eq!(doc.deep_hash(a), doc.deep_hash(b));
        assert!(!doc.deep_equals(a, c));
    }

    #[test]
    fn numeric_families() {
        let mut doc = Document::new();
        let int = doc.new_value(Primitive::Integer(i64::MAX));
        let uint = doc.new_value(Primitive::UInteger(i64::MAX as u64));
        let big = doc.new_value(Primitive::BigInteger(BigInt::from(i64::MAX)));
        let dec = doc.new_value(Primitive::Decimal(Decimal::from(i64::MAX)));
        assert!(doc.deep_equals(int, uint));
        assert!(doc.deep_equals(uint, big));
        assert_eq!(doc.deep_hash(int), doc.deep_hash(big));
        assert!(!doc.deep_equals(int, dec));

        let f = doc.new_value(1.5f64);
        let d = doc.new_value(Decimal::new(15, 1));
        assert!(doc.deep_equals(f, d));
        assert_eq!(doc.deep_hash(f), doc.deep_hash(d));
    }

    #[test]
    fn left_object_comparison_decides_lookup() {
        let mut doc = Document::new();
        let loose = doc.new_object_with(KeyComparison::IgnoreCase, DuplicatePropertyHandling::Error);
        let strict = doc.new_object();
        let one = doc.new_value(1i64);
        doc.set(loose, "Key", one).unwrap();
        let one = doc.new_value(1i64);
        doc.set(strict, "key", one).unwrap();
        assert!(doc.deep_equals(loose, strict));
        assert!(!doc.deep_equals(strict, loose));
        assert_eq!(doc.deep_hash(loose), doc.deep_hash(strict));
    }

    #[test]
    fn kinds_must_match() {
        let mut doc = Document::new();
        let arr = doc.parse("[]").unwrap();
        let obj = doc.parse("{}").unwrap();
        let ctor = doc.parse("new Date()").unwrap();
        assert!(!doc.deep_equals(arr, obj));
        assert!(!doc.deep_equals(arr, ctor));
        let other = doc.parse("new Time()").unwrap();
        assert!(!doc.deep_equals(ctor, other));
        let list = doc.parse("[1]").unwrap();
        let first = doc.children(list)[0];
        assert!(doc.value_equals(first, &Primitive::UInteger(1)));
    }
}
