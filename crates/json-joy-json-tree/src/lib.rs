//! Mutable document tree for the JSON superset read and written by
//! `json-joy-json-text`.
//!
//! A [`Document`] is an arena of nodes addressed by [`NodeId`] handles.
//! Trees are built by parsing text, by writing tokens into a
//! [`TreeWriter`], or through the container API, and are read back as
//! tokens with a [`TreeReader`]. On top of that sit structural equality,
//! merge, path addressing, change listeners and typed annotations.
//!
//! # Example
//!
//! ```
//! use json_joy_json_tree::{Document, MergeSettings};
//!
//! let mut doc = Document::new();
//! let target = doc.parse(r#"{"a":1,"b":2}"#).unwrap();
//! let source = doc.parse("{b: 3, c: 4}").unwrap();
//! doc.merge(target, source, &MergeSettings::default()).unwrap();
//!
//! let c = doc.select_token(target, "c", true).unwrap().unwrap();
//! assert_eq!(doc.compute_path(c), "c");
//! assert_eq!(
//!     doc.to_json_string(target, Default::default()).unwrap(),
//!     r#"{"a":1,"b":3,"c":4}"#
//! );
//! ```

pub mod annotation;
pub mod container;
pub mod document;
pub mod equality;
pub mod error;
pub mod events;
pub mod interop;
pub mod load;
pub mod merge;
pub mod navigation;
pub mod node;
pub mod path;
pub mod reader;
pub mod writer;

pub use annotation::AnnotationValue;
pub use container::Key;
pub use document::Document;
pub use error::{TreeError, TreeResult};
pub use events::{ChangeEvent, ChangeKind};
pub use interop::primitive_from_number;
pub use merge::{MergeArrayHandling, MergeNullValueHandling, MergeSettings};
pub use navigation::{Ancestors, Descendants, Siblings};
pub use node::{NodeId, NodeKind};
pub use reader::TreeReader;
pub use writer::TreeWriter;
