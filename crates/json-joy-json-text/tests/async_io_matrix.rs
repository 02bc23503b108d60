use json_joy_json_text::{
    AsyncJsonRead, AsyncJsonTextReader, AsyncJsonTextWriter, AsyncJsonWrite, JsonError,
    Primitive, ReaderSettings, TokenKind, WriterSettings,
};
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn async_reader_matches_sync_tokens() {
    let text = r#"{"a":[1,"two",{"b":null}],"c":new D(3)}"#;
    let mut reader = AsyncJsonTextReader::with_settings(text.as_bytes(), ReaderSettings::default());
    let mut kinds = Vec::new();
    while reader.read().await.expect("tokenize") {
        kinds.push((reader.token().kind, reader.path()));
    }
    assert_eq!(kinds.first(), Some(&(TokenKind::StartObject, String::new())));
    assert!(kinds.contains(&(TokenKind::Null, "a[2].b".to_owned())));
    assert!(kinds.contains(&(TokenKind::StartConstructor, "c".to_owned())));
    assert_eq!(kinds.last(), Some(&(TokenKind::EndObject, String::new())));
}

#[tokio::test]
async fn async_reader_waits_for_split_tokens() {
    let (mut tx, rx) = tokio::io::duplex(16);
    let producer = tokio::spawn(async move {
        for part in ["[12", "34, \"ab", "c\", tr", "ue]"] {
            tx.write_all(part.as_bytes()).await.expect("send");
            tokio::task::yield_now().await;
        }
    });
    let mut reader = AsyncJsonTextReader::with_settings(rx, ReaderSettings::default());
    let mut values = Vec::new();
    while reader.read_async().await.expect("tokenize") {
        if let Some(v) = reader.current_token().value.clone() {
            values.push(v);
        }
    }
    producer.await.expect("producer");
    assert_eq!(
        values,
        vec![
            Primitive::Integer(1234),
            Primitive::String("abc".into()),
            Primitive::Boolean(true),
        ]
    );
}

#[tokio::test]
async fn dropped_read_poisons_the_reader() {
    let (_tx, rx) = tokio::io::duplex(16);
    let mut reader = AsyncJsonTextReader::with_settings(rx, ReaderSettings::default());
    tokio::select! {
        biased;
        _ = reader.read() => panic!("no input was sent"),
        _ = std::future::ready(()) => {}
    }
    let err = reader.read().await.expect_err("poisoned");
    assert!(matches!(err, JsonError::Cancelled));
}

#[tokio::test]
async fn async_read_as_converts() {
    let mut reader = AsyncJsonTextReader::with_settings(
        r#"["7", 8.0, null]"#.as_bytes(),
        ReaderSettings::default(),
    );
    assert!(reader.read_async().await.expect("start"));
    assert_eq!(reader.read_as_async::<i64>().await.expect("string"), Some(7));
    assert_eq!(reader.read_as_async::<i64>().await.expect("float"), Some(8));
    assert_eq!(reader.read_as_async::<i64>().await.expect("null"), None);
}

#[tokio::test]
async fn async_writer_buffers_until_close() {
    let mut writer = AsyncJsonTextWriter::with_settings(Vec::new(), WriterSettings::indented());
    writer.write_start_object_async().await.expect("start");
    writer.write_property_name_async("a").await.expect("name");
    writer.write_value_async(&Primitive::Integer(1)).await.expect("value");
    writer.write_property_name_async("b").await.expect("name");
    writer.write_start_array_async().await.expect("array");
    writer.write_null_async().await.expect("null");
    writer.close_async().await.expect("close");
    let out = String::from_utf8(writer.into_inner()).expect("utf8");
    assert_eq!(out, "{\n  \"a\": 1,\n  \"b\": [\n    null\n  ]\n}");
}

#[tokio::test]
async fn async_copy_between_reader_and_writer() {
    let mut reader =
        AsyncJsonTextReader::with_settings("{a:[1,2],b:'x'}".as_bytes(), ReaderSettings::default());
    let mut writer = AsyncJsonTextWriter::with_settings(Vec::new(), WriterSettings::default());
    writer.write_token_async(&mut reader).await.expect("copy");
    writer.close_async().await.expect("close");
    let out = String::from_utf8(writer.into_inner()).expect("utf8");
    assert_eq!(out, r#"{"a":[1,2],"b":"x"}"#);
}
