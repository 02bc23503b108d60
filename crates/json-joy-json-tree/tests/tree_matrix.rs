use std::sync::{Arc, Mutex};

use json_joy_json_text::{
    AsyncJsonRead, AsyncJsonTextReader, CommentHandling, JsonRead, JsonTextReader,
    JsonTextWriter, JsonWrite, LoadSettings, Primitive, ReaderSettings, TokenKind,
    WriterSettings,
};
use json_joy_json_tree::{ChangeEvent, ChangeKind, Document, NodeKind, TreeError, TreeWriter};

#[derive(Debug, Clone, PartialEq)]
struct Origin {
    file: String,
}

fn compact(doc: &Document, id: json_joy_json_tree::NodeId) -> String {
    doc.to_json_string(id, WriterSettings::default())
        .expect("emit must succeed")
}

#[test]
fn comments_are_skipped_or_loaded() {
    let mut doc = Document::new();
    let ignored = doc.parse("[1,2/*c*/,3]").expect("parse");
    assert_eq!(doc.len(ignored), 3);
    assert_eq!(compact(&doc, ignored), "[1,2,3]");

    let settings = ReaderSettings {
        comment_handling: CommentHandling::Load,
        ..ReaderSettings::default()
    };
    let loaded = doc
        .parse_with("[1,2/*c*/,3]", settings, &LoadSettings::default())
        .expect("parse with comments");
    assert_eq!(doc.len(loaded), 4);
    let comment = doc.get(loaded, 2usize).expect("index").expect("present");
    assert_eq!(doc.kind(comment).expect("kind"), NodeKind::Value);
    assert_eq!(doc.value(comment), Some(&Primitive::Comment("c".to_owned())));
}

#[test]
fn cloned_annotations_are_equal_but_independent() {
    let mut doc = Document::new();
    let root = doc.parse(r#"{"a":[1]}"#).expect("parse");
    let arr = doc.get(root, "a").expect("key").expect("present");
    let origin = Origin {
        file: "input.json".to_owned(),
    };
    doc.add_annotation(arr, origin.clone()).expect("annotate");

    let copy = doc.clone_node(root).expect("clone");
    let copied_arr = doc.get(copy, "a").expect("key").expect("present");
    let original = doc.annotation::<Origin>(arr).expect("original annotation");
    let cloned = doc.annotation::<Origin>(copied_arr).expect("cloned annotation");
    assert_eq!(cloned, &origin);
    assert!(!std::ptr::eq(original, cloned));
    assert_ne!(copied_arr, arr);
    assert!(doc.deep_equals(root, copy));
}

#[test]
fn tree_readers_replay_into_text_writers() {
    let mut doc = Document::new();
    let root = doc
        .parse(r#"{'a': [1, new Date(0), {b: undefined}], c: "x"}"#)
        .expect("parse");
    let arr = doc.get(root, "a").expect("key").expect("present");
    let mut reader = doc.create_reader(root).expect("reader");
    let mut writer = JsonTextWriter::with_settings(Vec::new(), WriterSettings::default());
    // Position on the array, then replay only it.
    while reader.read().expect("read") {
        if reader.current_node() == Some(arr) {
            break;
        }
    }
    assert_eq!(reader.token_kind(), TokenKind::StartArray);
    writer.write_token(&mut reader).expect("replay");
    assert_eq!(writer.into_string(), "[1,new Date(0),{\"b\":undefined}]");
    assert_eq!(reader.token_kind(), TokenKind::EndArray);
}

#[test]
fn text_readers_replay_into_tree_writers() {
    let mut doc = Document::new();
    let list = doc.parse("[0]").expect("parse");
    let mut reader = JsonTextReader::from_text(r#"{"x":[true,{"y":null}]}"#);
    {
        let mut writer = doc.create_writer(list).expect("writer");
        writer.write_token(&mut reader).expect("replay");
        assert!(writer.is_complete());
    }
    assert_eq!(compact(&doc, list), r#"[0,{"x":[true,{"y":null}]}]"#);

    let mut empty = JsonTextReader::from_text("  ");
    let mut writer = TreeWriter::new(&mut doc);
    writer.write_token(&mut empty).expect("empty source is a no-op");
    assert_eq!(writer.root(), None);
}

#[test]
fn tree_to_tree_copy_preserves_structure() {
    let mut source = Document::new();
    let root = source
        .parse(r#"{"k":[1.5,"s",new Ctor("arg")],"e":{}}"#)
        .expect("parse");
    let mut target = Document::new();
    let copy = {
        let mut reader = source.create_reader(root).expect("reader");
        let mut writer = TreeWriter::new(&mut target);
        writer.write_token(&mut reader).expect("copy");
        writer.root().expect("root")
    };
    assert!(source.deep_equals_across(root, &target, copy));
}

#[test]
fn tree_reader_conversions_report_kind_and_path() {
    let mut doc = Document::new();
    let root = doc.parse(r#"{"n":"12","flag":true,"word":"abc"}"#).expect("parse");
    let mut reader = doc.create_reader(root).expect("reader");
    reader.read().expect("start");
    reader.read().expect("name n");
    assert_eq!(reader.read_as_i32().expect("n"), Some(12));
    reader.read().expect("name flag");
    let err = reader.read_as_i32().expect_err("bool to int");
    let conversion = err.as_conversion().expect("conversion error");
    assert_eq!(conversion.source_kind, "Boolean");
    assert_eq!(conversion.target, "i32");
    assert_eq!(conversion.path, "flag");
    assert_eq!(reader.token_kind(), TokenKind::Boolean);
    reader.read().expect("name word");
    let err = reader.read_as_i32().expect_err("word to int");
    assert_eq!(err.as_conversion().expect("conversion").value.as_deref(), Some("abc"));
}

#[test]
fn observers_see_bracketed_events_for_descendants() {
    let mut doc = Document::new();
    let root = doc.parse(r#"{"a":[1,2]}"#).expect("parse");
    let seen: Arc<Mutex<Vec<(ChangeKind, Option<usize>)>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let listener = doc
        .on_change(root, move |e: &ChangeEvent| {
            sink.lock().expect("lock").push((e.kind, e.index))
        })
        .expect("subscribe");

    let arr = doc.get(root, "a").expect("key").expect("present");
    doc.remove_at(arr, 0).expect("remove");
    let three = doc.new_value(3i64);
    doc.insert(arr, 1, three).expect("insert");
    assert_eq!(
        *seen.lock().expect("lock"),
        vec![
            (ChangeKind::Removing, Some(0)),
            (ChangeKind::Removed, Some(0)),
            (ChangeKind::Adding, Some(1)),
            (ChangeKind::Added, Some(1)),
        ]
    );
    assert!(doc.off_change(listener));
    assert_eq!(compact(&doc, root), r#"{"a":[2,3]}"#);
}

#[test]
fn structural_errors_are_immediate() {
    let mut doc = Document::new();
    let arr = doc.parse("[1]").expect("parse");
    let obj = doc.parse(r#"{"a":1}"#).expect("parse");
    assert!(matches!(
        doc.get(arr, "a"),
        Err(TreeError::InvalidKeyType { expected: "Int32 index", .. })
    ));
    assert!(matches!(
        doc.get(obj, 0usize),
        Err(TreeError::InvalidKeyType { expected: "Object property name", .. })
    ));
    let value = doc.new_value(1i64);
    assert!(matches!(
        doc.add(obj, value),
        Err(TreeError::IncompatibleChild { .. })
    ));
    let one = doc.new_value(1i64);
    let dup = doc.new_property("a", one).expect("property");
    let err = doc.add(obj, dup).expect_err("duplicate");
    assert_eq!(
        err.to_string(),
        "Can not add property a to object: property with the same name already exists. Path ''."
    );
}

#[test]
fn indented_emission_of_a_built_tree() {
    let mut doc = Document::new();
    let root = doc.new_object();
    let list = doc.new_array();
    let list = doc.set(root, "list", list).expect("set list");
    let one = doc.new_value(1i64);
    doc.add(list, one).expect("add");
    let name = doc.new_value("n");
    doc.set(root, "name", name).expect("set name");
    assert_eq!(
        doc.to_json_string(root, WriterSettings::indented()).expect("emit"),
        "{\n  \"list\": [\n    1\n  ],\n  \"name\": \"n\"\n}"
    );
}

#[tokio::test]
async fn async_load_from_a_stream() {
    let text = br#"// header
{"a": [1, 2], "b": {"c": "d"}}"#;
    let mut reader = AsyncJsonTextReader::new(&text[..]);
    let mut doc = Document::new();
    let root = doc
        .load_async(&mut reader, &LoadSettings::default())
        .await
        .expect("load");
    assert_eq!(compact(&doc, root), r#"{"a":[1,2],"b":{"c":"d"}}"#);
    assert!(!reader.read_async().await.expect("end"));
}

#[tokio::test]
async fn tree_readers_are_async_sources() {
    let mut doc = Document::new();
    let root = doc.parse("[1,[2]]").expect("parse");
    let mut reader = doc.create_reader(root).expect("reader");
    let mut kinds = Vec::new();
    while reader.read_async().await.expect("read") {
        kinds.push(reader.current_token().kind);
    }
    assert_eq!(
        kinds,
        vec![
            TokenKind::StartArray,
            TokenKind::Integer,
            TokenKind::StartArray,
            TokenKind::Integer,
            TokenKind::EndArray,
            TokenKind::EndArray,
        ]
    );
}
