//! Node addresses.
//!
//! A property and its value share one address; [`Document::select_token`]
//! resolves a property step to the value.

use json_joy_json_text::{format_path, parse_path, PathPart};

use crate::document::Document;
use crate::error::{TreeError, TreeResult};
use crate::node::{NodeId, NodeKind};

impl Document {
    /// Address of `id` relative to its root, e.g. `store.books[0]['a b']`.
    pub fn compute_path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            match self.kind(parent) {
                Ok(NodeKind::Object) => {
                    if let Some(name) = self.name(current) {
                        parts.push(PathPart::Property(name.to_owned()));
                    }
                }
                Ok(NodeKind::Array | NodeKind::Constructor) => {
                    if let Some(index) = self.index_of(current) {
                        parts.push(PathPart::Index(index));
                    }
                }
                _ => {}
            }
            current = parent;
        }
        parts.reverse();
        format_path(&parts)
    }

    /// Follow `path` down from `root`.
    ///
    /// A step that does not match yields `Ok(None)`, or a
    /// [`TreeError::PathNotFound`] when `error_when_no_match` is set. A
    /// malformed path is always an error.
    pub fn select_token(
        &self,
        root: NodeId,
        path: &str,
        error_when_no_match: bool,
    ) -> TreeResult<Option<NodeId>> {
        let parts = parse_path(path)?;
        let mut current = root;
        for part in &parts {
            let kind = self.kind(current)?;
            let step = match (kind, part) {
                (NodeKind::Object, PathPart::Property(name)) => self
                    .property(current, name)
                    .and_then(|p| self.property_value(p))
                    .ok_or_else(|| format!("Property '{name}' does not exist on {kind}.")),
                (NodeKind::Array | NodeKind::Constructor, PathPart::Index(i)) => self
                    .children(current)
                    .get(*i)
                    .copied()
                    .ok_or_else(|| format!("Index {i} outside the bounds of {kind}.")),
                (_, PathPart::Property(name)) => {
                    Err(format!("Property '{name}' not valid on {kind}."))
                }
                (_, PathPart::Index(i)) => Err(format!("Index {i} not valid on {kind}.")),
            };
            match step {
                Ok(next) => current = next,
                Err(message) if error_when_no_match => {
                    return Err(TreeError::PathNotFound {
                        message,
                        path: path.to_owned(),
                    })
                }
                Err(_) => return Ok(None),
            }
        }
        Ok(Some(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_name_properties_and_positions() {
        let mut doc = Document::new();
        let root = doc
            .parse(r#"{"store":{"books":[{"title":"x"},{"odd key":[1,new Date(2, 3)]}]}}"#)
            .unwrap();
        let rendered: Vec<String> = doc
            .descendants(root)
            .filter(|&n| doc.kind(n).unwrap() != NodeKind::Property)
            .map(|n| doc.compute_path(n))
            .collect();
        assert_eq!(
            rendered,
            vec![
                "store",
                "store.books",
                "store.books[0]",
                "store.books[0].title",
                "store.books[1]",
                "store.books[1]['odd key']",
                "store.books[1]['odd key'][0]",
                "store.books[1]['odd key'][1]",
                "store.books[1]['odd key'][1][0]",
                "store.books[1]['odd key'][1][1]",
            ]
        );
        assert_eq!(doc.compute_path(root), "");
    }

    #[test]
    fn a_property_named_dollar_is_not_the_root() {
        let mut doc = Document::new();
        let root = doc.parse(r#"{"$":{"a":1}}"#).unwrap();
        let inner = doc.get(root, "$").unwrap().unwrap();
        let a = doc.get(inner, "a").unwrap().unwrap();
        assert_eq!(doc.compute_path(inner), "['$']");
        assert_eq!(doc.compute_path(a), "['$'].a");
        assert_eq!(doc.select_token(root, "['$']", true).unwrap(), Some(inner));
        assert_eq!(doc.select_token(root, "['$'].a", true).unwrap(), Some(a));
        assert_eq!(doc.select_token(root, "$", true).unwrap(), Some(root));
    }

    #[test]
    fn select_token_follows_paths() {
        let mut doc = Document::new();
        let root = doc.parse(r#"{"a":[10,{"b c":true}]}"#).unwrap();
        let hit = doc.select_token(root, "a[1]['b c']", false).unwrap().unwrap();
        assert_eq!(doc.value(hit), Some(&json_joy_json_text::Primitive::Boolean(true)));
        assert_eq!(doc.select_token(root, "$.a[0]", true).unwrap(), doc.get(doc.get(root, "a").unwrap().unwrap(), 0usize).unwrap());
        assert_eq!(doc.select_token(root, "", true).unwrap(), Some(root));
    }

    #[test]
    fn missing_steps_are_null_or_errors() {
        let mut doc = Document::new();
        let root = doc.parse(r#"{"a":[10]}"#).unwrap();
        assert_eq!(doc.select_token(root, "a[5]", false).unwrap(), None);
        assert_eq!(doc.select_token(root, "a.b", false).unwrap(), None);
        let err = doc.select_token(root, "missing", true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Property 'missing' does not exist on Object. Path 'missing'."
        );
        let err = doc.select_token(root, "a[5]", true).unwrap_err();
        assert!(matches!(err, TreeError::PathNotFound { .. }));
        assert!(matches!(
            doc.select_token(root, "a[", false),
            Err(TreeError::InvalidPath(_))
        ));
    }
}
