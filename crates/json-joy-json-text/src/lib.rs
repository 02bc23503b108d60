//! Permissive JSON-superset tokenizer and emitter.
//!
//! Both sides speak one token vocabulary ([`Token`], [`TokenKind`]) through
//! the [`JsonRead`] and [`JsonWrite`] contracts, so a consumer written
//! against a token source or sink works unchanged over text or over any
//! other implementation of those traits.
//!
//! # Example
//!
//! ```
//! use json_joy_json_text::{JsonRead, JsonTextReader, JsonTextWriter, JsonWrite, WriterSettings};
//!
//! let mut reader = JsonTextReader::from_text("{'a': 1, /* note */ b: [true]}");
//! let mut writer = JsonTextWriter::with_settings(Vec::new(), WriterSettings::default());
//! writer.write_token(&mut reader).unwrap();
//! assert_eq!(writer.into_string(), r#"{"a":1,"b":[true]}"#);
//! ```

pub mod convert;
pub mod error;
pub mod format;
pub mod hash;
pub mod lexer;
pub mod path;
pub mod reader;
pub mod settings;
pub mod token;
pub mod value;
pub mod writer;
pub mod writer_state;

pub use convert::TryFromPrimitive;
pub use error::{ConversionError, JsonError, JsonResult, ParseError, WriterStateError};
pub use path::{format_path, parse_path, PathPart, PathSyntaxError};
pub use reader::{AsyncJsonRead, AsyncJsonTextReader, JsonRead, JsonTextReader};
pub use settings::{
    default_settings, set_default_settings, CommentHandling, DateFormatHandling,
    DateParseHandling, DocumentSettings, DuplicatePropertyHandling, FloatFormatHandling,
    FloatParseHandling, Formatting, JsonSettings, KeyComparison, LoadSettings, ReaderSettings,
    StringEscapeHandling, WriterSettings,
};
pub use token::{Token, TokenKind};
pub use value::{Primitive, ValueKind};
pub use writer::{AsyncJsonTextWriter, AsyncJsonWrite, JsonTextWriter, JsonWrite};
pub use writer_state::{WriteAction, WriterState, WriterStateMachine};
