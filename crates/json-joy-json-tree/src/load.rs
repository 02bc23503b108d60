//! Loading trees from token sources and writing them back out.

use json_joy_json_text::{
    default_settings, AsyncJsonRead, JsonError, JsonRead, JsonTextReader, JsonTextWriter,
    JsonWrite, LoadSettings, ParseError, ReaderSettings, TokenKind, WriterSettings,
};
use tracing::debug;

use crate::document::Document;
use crate::error::{TreeError, TreeResult};
use crate::node::NodeId;
use crate::writer::TreeWriter;

fn empty_source() -> TreeError {
    TreeError::EmptySource("the source produced no tokens".to_owned())
}

impl Document {
    /// Parse text with the default reader and load settings. The text must
    /// hold exactly one value; trailing comments are allowed.
    pub fn parse(&mut self, text: &str) -> TreeResult<NodeId> {
        let settings = default_settings();
        self.parse_with(text, settings.reader, &settings.load)
    }

    pub fn parse_with(
        &mut self,
        text: &str,
        reader_settings: ReaderSettings,
        load_settings: &LoadSettings,
    ) -> TreeResult<NodeId> {
        let mut reader = JsonTextReader::from_text_with_settings(text, reader_settings);
        let root = self.load(&mut reader, load_settings)?;
        let trailing = loop {
            match reader.read() {
                Ok(true) if reader.token_kind() == TokenKind::Comment => continue,
                Ok(true) => {
                    let (line, column) = reader.line_info().unwrap_or_default();
                    break Some(JsonError::Parse(ParseError {
                        message:
                            "Additional text found in JSON string after finishing deserializing object."
                                .to_owned(),
                        line,
                        column,
                        path: reader.path(),
                    }));
                }
                Ok(false) => break None,
                Err(err) => break Some(err),
            }
        };
        match trailing {
            None => Ok(root),
            Some(err) => {
                self.delete(root)?;
                Err(err.into())
            }
        }
    }

    /// Materialise the token the reader is on (reading the first one if it
    /// has not started) together with its subtree, as a detached node.
    ///
    /// Leading comments are skipped. A reader on a property name yields a
    /// property node. The reader is left on the last token consumed.
    pub fn load<R: JsonRead + ?Sized>(
        &mut self,
        reader: &mut R,
        settings: &LoadSettings,
    ) -> TreeResult<NodeId> {
        if reader.token_kind() == TokenKind::None && !reader.read()? {
            return Err(empty_source());
        }
        skip_comments(reader)?;
        if reader.token_kind() != TokenKind::PropertyName {
            return self.load_value(reader, settings);
        }
        let name = reader.token().text().unwrap_or_default().to_owned();
        let line_info = reader.line_info().filter(|_| settings.line_info_handling);
        if !reader.read()? {
            return Err(empty_source());
        }
        skip_comments(reader)?;
        let value = self.load_value(reader, settings)?;
        let property = self.new_property(name, value)?;
        self.set_line_info(property, line_info)?;
        Ok(property)
    }

    fn load_value<R: JsonRead + ?Sized>(
        &mut self,
        reader: &mut R,
        settings: &LoadSettings,
    ) -> TreeResult<NodeId> {
        let mut writer = TreeWriter::with_settings(self, *settings);
        let written = replay(&mut writer, reader, settings.line_info_handling);
        let root = writer.root();
        self.settle(root, written)
    }

    /// Keep a fully written root, or free the partial tree left behind by a
    /// failed load.
    fn settle(&mut self, root: Option<NodeId>, written: TreeResult<()>) -> TreeResult<NodeId> {
        if let Err(err) = written {
            if let Some(partial) = root.filter(|&r| self.contains(r)) {
                self.delete(partial)?;
                debug!(root = %partial, "freed partially loaded node");
            }
            return Err(err);
        }
        let root = root.ok_or_else(empty_source)?;
        debug!(root = %root, "loaded node");
        Ok(root)
    }

    /// Asynchronous [`load`](Self::load). Line info is not recorded.
    pub async fn load_async<R: AsyncJsonRead>(
        &mut self,
        reader: &mut R,
        settings: &LoadSettings,
    ) -> TreeResult<NodeId> {
        if reader.current_token().kind == TokenKind::None && !reader.read_async().await? {
            return Err(empty_source());
        }
        while reader.current_token().kind == TokenKind::Comment {
            if !reader.read_async().await? {
                return Err(empty_source());
            }
        }
        let mut name = None;
        if reader.current_token().kind == TokenKind::PropertyName {
            name = reader.current_token().text().map(str::to_owned);
            loop {
                if !reader.read_async().await? {
                    return Err(empty_source());
                }
                if reader.current_token().kind != TokenKind::Comment {
                    break;
                }
            }
        }
        let mut writer = TreeWriter::with_settings(self, *settings);
        let written = replay_async(&mut writer, reader).await;
        let root = writer.root();
        let value = self.settle(root, written)?;
        match name {
            Some(name) => self.new_property(name, value),
            None => Ok(value),
        }
    }

    /// Replay the subtree at `id` into any token sink.
    pub fn write_to<W: JsonWrite + ?Sized>(&self, id: NodeId, writer: &mut W) -> TreeResult<()> {
        let mut reader = self.create_reader(id)?;
        while reader.read()? {
            let token = reader.token();
            match (token.kind, token.text()) {
                (TokenKind::Raw, Some(text)) => writer.write_raw_value(text)?,
                _ => writer.write_single_token(token)?,
            }
        }
        Ok(())
    }

    /// Text form of the subtree at `id`.
    pub fn to_json_string(&self, id: NodeId, settings: WriterSettings) -> TreeResult<String> {
        let mut writer = JsonTextWriter::with_settings(Vec::new(), settings);
        self.write_to(id, &mut writer)?;
        writer.flush()?;
        Ok(writer.into_string())
    }
}

fn replay<R: JsonRead + ?Sized>(
    writer: &mut TreeWriter<'_>,
    reader: &mut R,
    line_info: bool,
) -> TreeResult<()> {
    loop {
        if line_info {
            writer.set_line_info(reader.line_info());
        }
        writer.write_single_token(reader.token())?;
        if writer.is_complete() || !reader.read()? {
            break;
        }
    }
    writer.close()?;
    Ok(())
}

async fn replay_async<R: AsyncJsonRead>(
    writer: &mut TreeWriter<'_>,
    reader: &mut R,
) -> TreeResult<()> {
    loop {
        writer.write_single_token(reader.current_token())?;
        if writer.is_complete() || !reader.read_async().await? {
            break;
        }
    }
    writer.close()?;
    Ok(())
}

fn skip_comments<R: JsonRead + ?Sized>(reader: &mut R) -> TreeResult<()> {
    while reader.token_kind() == TokenKind::Comment {
        if !reader.read()? {
            return Err(empty_source());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use json_joy_json_text::{CommentHandling, DuplicatePropertyHandling, Primitive};

    #[test]
    fn parse_records_line_info() {
        let mut doc = Document::new();
        let root = doc.parse("{\n  \"a\": [1,\n    true]\n}").unwrap();
        let arr = doc.get(root, "a").unwrap().unwrap();
        assert_eq!(doc.line_info(arr), Some((2, 8)));
        assert_eq!(doc.line_info(doc.children(arr)[1]), Some((3, 8)));
        let bare = doc
            .parse_with(
                "[1]",
                ReaderSettings::default(),
                &LoadSettings {
                    line_info_handling: false,
                    ..LoadSettings::default()
                },
            )
            .unwrap();
        assert_eq!(doc.line_info(bare), None);
    }

    #[test]
    fn trailing_content_is_a_parse_error() {
        let mut doc = Document::new();
        let before = doc.node_count();
        let err = doc.parse("[1] [2]").unwrap_err();
        assert!(matches!(err, TreeError::Json(JsonError::Parse(_))));
        assert_eq!(doc.node_count(), before);
        let ok = doc.parse("[1] // done").unwrap();
        assert_eq!(doc.len(ok), 1);
    }

    #[test]
    fn failed_loads_free_everything_they_built() {
        let mut doc = Document::new();
        let strict = LoadSettings {
            duplicate_property_handling: DuplicatePropertyHandling::Error,
            ..LoadSettings::default()
        };
        let err = doc
            .parse_with(r#"{"a":1,"a":2}"#, ReaderSettings::default(), &strict)
            .unwrap_err();
        assert!(matches!(err, TreeError::DuplicateProperty { .. }));
        assert_eq!(doc.node_count(), 0);

        let err = doc
            .parse_with(r#"{"x":[1,{"a":{},"a":[]}]}"#, ReaderSettings::default(), &strict)
            .unwrap_err();
        assert!(matches!(err, TreeError::DuplicateProperty { .. }));
        assert_eq!(doc.node_count(), 0);

        assert!(doc.parse(r#"{"a":[1,2,"#).is_err());
        assert!(doc.parse(r#"[1, {"b": ]"#).is_err());
        assert_eq!(doc.node_count(), 0);
    }

    #[test]
    fn empty_sources_are_errors_for_load() {
        let mut doc = Document::new();
        assert!(matches!(doc.parse(""), Err(TreeError::EmptySource(_))));
        assert!(matches!(doc.parse("/* only */"), Err(TreeError::EmptySource(_))));
    }

    #[test]
    fn load_from_a_property_name() {
        let mut doc = Document::new();
        let mut reader = JsonTextReader::from_text(r#"{"k": {"x": 1}}"#);
        reader.read().unwrap();
        reader.read().unwrap();
        let property = doc.load(&mut reader, &LoadSettings::default()).unwrap();
        assert_eq!(doc.name(property), Some("k"));
        assert_eq!(reader.token_kind(), TokenKind::EndObject);
        let value = doc.property_value(property).unwrap();
        assert_eq!(doc.to_json_string(value, WriterSettings::default()).unwrap(), r#"{"x":1}"#);
    }

    #[test]
    fn comments_load_into_arrays() {
        let mut doc = Document::new();
        let settings = ReaderSettings {
            comment_handling: CommentHandling::Load,
            ..ReaderSettings::default()
        };
        let root = doc
            .parse_with("[1,2/*c*/,3]", settings, &LoadSettings::default())
            .unwrap();
        assert_eq!(doc.len(root), 4);
        assert_eq!(
            doc.value(doc.children(root)[2]),
            Some(&Primitive::Comment("c".to_owned()))
        );
        assert_eq!(
            doc.to_json_string(root, WriterSettings::default()).unwrap(),
            "[1,2/*c*/,3]"
        );
    }

    #[test]
    fn raw_values_are_written_verbatim() {
        let mut doc = Document::new();
        let arr = doc.new_array();
        let raw = doc.new_value(Primitive::Raw("{\"pre\":1}".to_owned()));
        doc.add(arr, raw).unwrap();
        let two = doc.new_value(2i64);
        doc.add(arr, two).unwrap();
        assert_eq!(
            doc.to_json_string(arr, WriterSettings::default()).unwrap(),
            r#"[{"pre":1},2]"#
        );
    }
}
