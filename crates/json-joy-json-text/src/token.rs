//! Token vocabulary shared by the text codec and the document tree adapters.
//!
//! A [`Token`] is a [`TokenKind`] plus an optional typed payload. Property
//! names, constructor names, comments and raw fragments carry their text as
//! [`Primitive::String`]-like payloads; scalar tokens carry the value itself.

use std::fmt;

use crate::value::Primitive;

/// Lexical token kinds.
///
/// `None` is the state of a reader that has not produced a token yet (or has
/// run out of input).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenKind {
    #[default]
    None,
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    StartConstructor,
    EndConstructor,
    PropertyName,
    Comment,
    Raw,
    Integer,
    Float,
    String,
    Boolean,
    Null,
    Undefined,
    Date,
    Bytes,
}

impl TokenKind {
    pub fn is_start(self) -> bool {
        matches!(
            self,
            TokenKind::StartObject | TokenKind::StartArray | TokenKind::StartConstructor
        )
    }

    pub fn is_end(self) -> bool {
        matches!(
            self,
            TokenKind::EndObject | TokenKind::EndArray | TokenKind::EndConstructor
        )
    }

    /// Scalar value tokens (everything a value node can produce except
    /// comments and raw fragments).
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            TokenKind::Integer
                | TokenKind::Float
                | TokenKind::String
                | TokenKind::Boolean
                | TokenKind::Null
                | TokenKind::Undefined
                | TokenKind::Date
                | TokenKind::Bytes
        )
    }

    /// The end token closing a start token.
    pub fn matching_end(self) -> Option<TokenKind> {
        match self {
            TokenKind::StartObject => Some(TokenKind::EndObject),
            TokenKind::StartArray => Some(TokenKind::EndArray),
            TokenKind::StartConstructor => Some(TokenKind::EndConstructor),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenKind::None => "None",
            TokenKind::StartObject => "StartObject",
            TokenKind::EndObject => "EndObject",
            TokenKind::StartArray => "StartArray",
            TokenKind::EndArray => "EndArray",
            TokenKind::StartConstructor => "StartConstructor",
            TokenKind::EndConstructor => "EndConstructor",
            TokenKind::PropertyName => "PropertyName",
            TokenKind::Comment => "Comment",
            TokenKind::Raw => "Raw",
            TokenKind::Integer => "Integer",
            TokenKind::Float => "Float",
            TokenKind::String => "String",
            TokenKind::Boolean => "Boolean",
            TokenKind::Null => "Null",
            TokenKind::Undefined => "Undefined",
            TokenKind::Date => "Date",
            TokenKind::Bytes => "Bytes",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A token with its optional payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Token {
    pub kind: TokenKind,
    pub value: Option<Primitive>,
}

impl Token {
    pub const NONE: Token = Token {
        kind: TokenKind::None,
        value: None,
    };

    pub fn new(kind: TokenKind) -> Self {
        Self { kind, value: None }
    }

    pub fn with_value(kind: TokenKind, value: Primitive) -> Self {
        Self {
            kind,
            value: Some(value),
        }
    }

    pub fn start_object() -> Self {
        Self::new(TokenKind::StartObject)
    }

    pub fn end_object() -> Self {
        Self::new(TokenKind::EndObject)
    }

    pub fn start_array() -> Self {
        Self::new(TokenKind::StartArray)
    }

    pub fn end_array() -> Self {
        Self::new(TokenKind::EndArray)
    }

    pub fn start_constructor(name: impl Into<String>) -> Self {
        Self::with_value(TokenKind::StartConstructor, Primitive::String(name.into()))
    }

    pub fn end_constructor() -> Self {
        Self::new(TokenKind::EndConstructor)
    }

    pub fn property_name(name: impl Into<String>) -> Self {
        Self::with_value(TokenKind::PropertyName, Primitive::String(name.into()))
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self::with_value(TokenKind::Comment, Primitive::Comment(text.into()))
    }

    /// Scalar token for a primitive; the kind follows the value.
    pub fn primitive(value: Primitive) -> Self {
        Self {
            kind: value.token_kind(),
            value: Some(value),
        }
    }

    /// Text payload of name-bearing tokens (property names, constructor
    /// names, comments, raw fragments, strings).
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            Some(Primitive::String(s))
            | Some(Primitive::Comment(s))
            | Some(Primitive::Raw(s))
            | Some(Primitive::Uri(s)) => Some(s),
            _ => None,
        }
    }
}
