//! Token source over a subtree.

use async_trait::async_trait;
use json_joy_json_text::path::{FrameKind, PathState};
use json_joy_json_text::{AsyncJsonRead, JsonRead, JsonResult, Primitive, Token};
use tracing::trace;

use crate::document::Document;
use crate::error::{TreeError, TreeResult};
use crate::node::{NodeId, NodeKind};

/// Pre-order walk of a subtree producing the same tokens a text reader
/// would produce for its serialised form.
///
/// Containers yield a start token on entry and an end token on exit;
/// properties yield their name and then their value. [`current_node`]
/// is always the node the last token came from.
///
/// [`current_node`]: TreeReader::current_node
pub struct TreeReader<'a> {
    doc: &'a Document,
    root: NodeId,
    current: Option<NodeId>,
    leaving: bool,
    finished: bool,
    token: Token,
    depth: usize,
    path: PathState,
}

impl<'a> TreeReader<'a> {
    pub(crate) fn new(doc: &'a Document, root: NodeId, base: String) -> Self {
        Self {
            doc,
            root,
            current: None,
            leaving: false,
            finished: false,
            token: Token::NONE,
            depth: 0,
            path: PathState::with_base(base),
        }
    }

    /// Node behind the current token.
    pub fn current_node(&self) -> Option<NodeId> {
        self.current
    }

    fn enter(&mut self, id: NodeId) -> TreeResult<bool> {
        let kind = self.doc.kind(id)?;
        self.current = Some(id);
        self.leaving = false;
        let frames = self.path.depth();
        self.token = match kind {
            NodeKind::Object | NodeKind::Array | NodeKind::Constructor => {
                self.path.before_value();
                self.depth = frames;
                let (frame, token) = match kind {
                    NodeKind::Object => (FrameKind::Object, Token::start_object()),
                    NodeKind::Array => (FrameKind::Array, Token::start_array()),
                    _ => (
                        FrameKind::Constructor,
                        Token::start_constructor(self.doc.name(id).unwrap_or_default()),
                    ),
                };
                self.path.push(frame);
                token
            }
            NodeKind::Property => {
                let name = self.doc.name(id).unwrap_or_default();
                self.path.set_property(name);
                self.depth = frames;
                Token::property_name(name)
            }
            NodeKind::Value => {
                self.path.before_value();
                self.depth = frames;
                Token::primitive(self.doc.value(id).cloned().unwrap_or(Primitive::Null))
            }
        };
        trace!(node = %id, kind = %self.token.kind, "tree reader token");
        Ok(true)
    }

    fn leave(&mut self, id: NodeId) -> TreeResult<bool> {
        let kind = self.doc.kind(id)?;
        self.current = Some(id);
        self.leaving = true;
        self.path.pop();
        self.depth = self.path.depth();
        self.token = match kind {
            NodeKind::Object => Token::end_object(),
            NodeKind::Array => Token::end_array(),
            _ => Token::end_constructor(),
        };
        Ok(true)
    }

    fn finish(&mut self) -> TreeResult<bool> {
        self.finished = true;
        self.current = None;
        self.token = Token::NONE;
        self.depth = 0;
        Ok(false)
    }

    fn advance(&mut self) -> TreeResult<bool> {
        if self.finished {
            return Ok(false);
        }
        let Some(current) = self.current else {
            return self.enter(self.root);
        };
        if !self.leaving {
            match self.doc.kind(current)? {
                NodeKind::Object | NodeKind::Array | NodeKind::Constructor => {
                    return match self.doc.first_child(current) {
                        Some(first) => self.enter(first),
                        None => self.leave(current),
                    };
                }
                NodeKind::Property => {
                    if let Some(value) = self.doc.property_value(current) {
                        return self.enter(value);
                    }
                }
                NodeKind::Value => {}
            }
        }
        // `done` has produced all of its tokens.
        let mut done = current;
        loop {
            if done == self.root {
                return self.finish();
            }
            if let Some(next) = self.doc.next(done) {
                return self.enter(next);
            }
            let Some(parent) = self.doc.parent(done) else {
                return self.finish();
            };
            if self.doc.kind(parent)? == NodeKind::Property {
                done = parent;
                continue;
            }
            return self.leave(parent);
        }
    }
}

impl JsonRead for TreeReader<'_> {
    fn read(&mut self) -> JsonResult<bool> {
        Ok(self.advance()?)
    }

    fn token(&self) -> &Token {
        &self.token
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn path(&self) -> String {
        self.path.path()
    }

    fn line_info(&self) -> Option<(usize, usize)> {
        self.current.and_then(|id| self.doc.line_info(id))
    }
}

/// Completes immediately; the tree is already in memory.
#[async_trait]
impl AsyncJsonRead for TreeReader<'_> {
    async fn read_async(&mut self) -> JsonResult<bool> {
        self.read()
    }

    fn current_token(&self) -> &Token {
        &self.token
    }

    fn current_depth(&self) -> usize {
        self.depth
    }

    fn current_path(&self) -> String {
        self.path.path()
    }
}

impl Document {
    /// Token source over the subtree at `id`.
    pub fn create_reader(&self, id: NodeId) -> TreeResult<TreeReader<'_>> {
        self.create_reader_with_base(id, "")
    }

    /// Token source whose reported paths are prefixed by `base`.
    pub fn create_reader_with_base(
        &self,
        id: NodeId,
        base: impl Into<String>,
    ) -> TreeResult<TreeReader<'_>> {
        if !self.contains(id) {
            return Err(TreeError::StaleNode);
        }
        Ok(TreeReader::new(self, id, base.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use json_joy_json_text::{JsonTextReader, TokenKind};

    fn tokens(reader: &mut impl JsonRead) -> Vec<(TokenKind, String, usize)> {
        let mut seen = Vec::new();
        while reader.read().unwrap() {
            seen.push((reader.token_kind(), reader.path(), reader.depth()));
        }
        seen
    }

    #[test]
    fn matches_the_text_reader() {
        let text = r#"{"a":[1,{"b":true}],"c":new Ctor(1,[]),"d":{}}"#;
        let mut doc = Document::new();
        let root = doc.parse(text).unwrap();
        let from_tree = tokens(&mut doc.create_reader(root).unwrap());
        let from_text = tokens(&mut JsonTextReader::from_text(text));
        assert_eq!(from_tree, from_text);
    }

    #[test]
    fn current_node_tracks_tokens() {
        let mut doc = Document::new();
        let root = doc.parse(r#"{"a":[7]}"#).unwrap();
        let property = doc.property(root, "a").unwrap();
        let array = doc.property_value(property).unwrap();
        let seven = doc.children(array)[0];
        let mut reader = doc.create_reader(root).unwrap();
        let mut seen = Vec::new();
        while reader.read().unwrap() {
            seen.push(reader.current_node().unwrap());
        }
        assert_eq!(seen, vec![root, property, array, seven, array, root]);
        assert_eq!(reader.current_node(), None);
        assert!(!reader.read().unwrap());
    }

    #[test]
    fn subtree_readers_stop_at_the_subtree() {
        let mut doc = Document::new();
        let root = doc.parse(r#"[[1,2],3]"#).unwrap();
        let inner = doc.children(root)[0];
        let mut reader = doc.create_reader_with_base(inner, "base[0]").unwrap();
        let seen = tokens(&mut reader);
        assert_eq!(
            seen,
            vec![
                (TokenKind::StartArray, "base[0]".to_owned(), 0),
                (TokenKind::Integer, "base[0][0]".to_owned(), 1),
                (TokenKind::Integer, "base[0][1]".to_owned(), 1),
                (TokenKind::EndArray, "base[0]".to_owned(), 0),
            ]
        );
    }

    #[test]
    fn read_as_converts_values() {
        let mut doc = Document::new();
        let root = doc.parse(r#"["12", 3.0, true]"#).unwrap();
        let mut reader = doc.create_reader(root).unwrap();
        assert!(reader.read().unwrap());
        assert_eq!(reader.read_as_i32().unwrap(), Some(12));
        assert_eq!(reader.read_as_i32().unwrap(), Some(3));
        let err = reader.read_as_i32().unwrap_err();
        let conversion = err.as_conversion().unwrap();
        assert_eq!(conversion.source_kind, "Boolean");
        assert_eq!(conversion.path, "[2]");
        assert_eq!(reader.token_kind(), TokenKind::Boolean);
        assert_eq!(reader.read_as_i32().unwrap(), None);
    }

    #[test]
    fn property_roots_yield_name_then_value() {
        let mut doc = Document::new();
        let root = doc.parse(r#"{"k":[1]}"#).unwrap();
        let property = doc.property(root, "k").unwrap();
        let kinds: Vec<TokenKind> = tokens(&mut doc.create_reader(property).unwrap())
            .into_iter()
            .map(|(k, _, _)| k)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::PropertyName,
                TokenKind::StartArray,
                TokenKind::Integer,
                TokenKind::EndArray
            ]
        );
    }
}
