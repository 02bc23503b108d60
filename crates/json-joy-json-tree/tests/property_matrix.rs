use std::collections::HashSet;

use json_joy_json_text::{DuplicatePropertyHandling, Primitive, WriterSettings};
use json_joy_json_tree::{
    Document, MergeArrayHandling, MergeSettings, NodeId, NodeKind,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Shape {
    Leaf(Primitive),
    Array(Vec<Shape>),
    Object(Vec<(String, Shape)>),
}

fn leaf() -> impl Strategy<Value = Primitive> {
    prop_oneof![
        Just(Primitive::Null),
        any::<bool>().prop_map(Primitive::Boolean),
        any::<i64>().prop_map(Primitive::Integer),
        (-1.0e6f64..1.0e6).prop_map(Primitive::Float),
        "[a-zA-Z0-9 _\"'\\\\\n\t\u{e9}]{0,12}".prop_map(Primitive::String),
    ]
}

fn shape() -> impl Strategy<Value = Shape> {
    leaf().prop_map(Shape::Leaf).prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Shape::Array),
            prop::collection::vec(("[a-z$\"'. \\[\\]]{0,6}", inner), 0..6)
                .prop_map(Shape::Object),
        ]
    })
}

fn build(doc: &mut Document, shape: &Shape) -> NodeId {
    match shape {
        Shape::Leaf(p) => doc.new_value(p.clone()),
        Shape::Array(items) => {
            let array = doc.new_array();
            for item in items {
                let child = build(doc, item);
                doc.add(array, child).expect("add element");
            }
            array
        }
        Shape::Object(entries) => {
            let object = doc.new_object();
            for (name, item) in entries {
                let value = build(doc, item);
                let property = doc.new_property(name.as_str(), value).expect("property");
                let len = doc.len(object);
                doc.insert_with(object, len, property, Some(DuplicatePropertyHandling::Replace))
                    .expect("insert property");
            }
            object
        }
    }
}

fn assert_links(doc: &Document, container: NodeId) {
    let children = doc.children(container);
    for (i, &child) in children.iter().enumerate() {
        assert_eq!(doc.parent(child), Some(container));
        assert_eq!(doc.index_of(child), Some(i));
        assert_eq!(doc.previous(child), i.checked_sub(1).map(|p| children[p]));
        assert_eq!(doc.next(child), children.get(i + 1).copied());
    }
    assert_eq!(doc.first_child(container), children.first().copied());
    assert_eq!(doc.last_child(container), children.last().copied());
}

#[derive(Debug, Clone)]
enum Edit {
    Insert(usize, i64),
    Remove(usize),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0usize..8, any::<i64>()).prop_map(|(i, v)| Edit::Insert(i, v)),
        (0usize..8).prop_map(Edit::Remove),
    ]
}

proptest! {
    #[test]
    fn emitted_text_reparses_to_an_equal_tree(shape in shape()) {
        let mut doc = Document::new();
        let root = build(&mut doc, &shape);
        let text = doc.to_json_string(root, WriterSettings::default()).expect("emit");
        let again = doc.parse(&text).expect("reparse");
        prop_assert!(doc.deep_equals(root, again), "{text}");
        prop_assert_eq!(doc.deep_hash(root), doc.deep_hash(again));
    }

    #[test]
    fn clones_are_equal_and_share_nothing(shape in shape()) {
        let mut doc = Document::new();
        let root = build(&mut doc, &shape);
        let copy = doc.clone_node(root).expect("clone");
        prop_assert!(doc.deep_equals(root, copy));
        prop_assert_eq!(doc.parent(copy), None);
        let original: HashSet<NodeId> = doc.descendants_and_self(root).collect();
        prop_assert!(doc.descendants_and_self(copy).all(|id| !original.contains(&id)));

        let mut other = Document::new();
        let imported = other.import(&doc, root).expect("import");
        prop_assert!(doc.deep_equals_across(root, &other, imported));
    }

    #[test]
    fn computed_paths_select_the_same_node(shape in shape()) {
        let mut doc = Document::new();
        let root = build(&mut doc, &shape);
        let nodes: Vec<NodeId> = doc.descendants(root).collect();
        for id in nodes {
            if doc.kind(id).expect("kind") == NodeKind::Property {
                continue;
            }
            let path = doc.compute_path(id);
            let found = doc.select_token(root, &path, true).expect("select");
            prop_assert_eq!(found, Some(id), "path {}", path);
        }
    }

    #[test]
    fn sibling_links_follow_edits(edits in prop::collection::vec(edit(), 0..24)) {
        let mut doc = Document::new();
        let array = doc.new_array();
        let mut model: Vec<i64> = Vec::new();
        for edit in edits {
            match edit {
                Edit::Insert(i, v) => {
                    let at = i.min(model.len());
                    let node = doc.new_value(v);
                    doc.insert(array, at, node).expect("insert");
                    model.insert(at, v);
                }
                Edit::Remove(i) if i < model.len() => {
                    let removed = doc.remove_at(array, i).expect("remove");
                    prop_assert_eq!(doc.parent(removed), None);
                    doc.delete(removed).expect("delete");
                    model.remove(i);
                }
                Edit::Remove(i) => {
                    prop_assert!(doc.remove_at(array, i).is_err());
                }
            }
            assert_links(&doc, array);
        }
        let values: Vec<i64> = doc
            .children(array)
            .iter()
            .map(|&c| match doc.value(c) {
                Some(Primitive::Integer(v)) => *v,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        prop_assert_eq!(values, model);
        prop_assert_eq!(doc.node_count(), doc.len(array) + 1);
    }

    #[test]
    fn replacing_self_merge_is_identity(shape in shape()) {
        let mut doc = Document::new();
        let root = build(&mut doc, &shape);
        prop_assume!(doc.kind(root).expect("kind").is_container());
        let before = doc.clone_node(root).expect("clone");
        let settings = MergeSettings {
            array_handling: MergeArrayHandling::Replace,
            ..MergeSettings::default()
        };
        doc.merge(root, root, &settings).expect("merge");
        prop_assert!(doc.deep_equals(root, before));
    }
}
