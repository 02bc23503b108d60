//! Error types for reading, converting and writing tokens.

use std::fmt;

use thiserror::Error;

/// Malformed or unexpected input. Fatal to the read operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    /// 1-based line of the offending character.
    pub line: usize,
    /// 1-based column of the offending character.
    pub column: usize,
    /// Logical path at the point of failure.
    pub path: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Path '{}', line {}, position {}.",
            self.message, self.path, self.line, self.column
        )
    }
}

impl std::error::Error for ParseError {}

/// A stored value could not be coerced to the requested type.
///
/// The reader stays positioned on the offending token and remains usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    /// Kind of the stored value or token.
    pub source_kind: String,
    /// Requested target type.
    pub target: &'static str,
    pub path: String,
    /// Rendering of the offending value, when there is one.
    pub value: Option<String>,
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(
                f,
                "Could not convert {} '{}' to {}. Path '{}'.",
                self.source_kind, v, self.target, self.path
            ),
            None => write!(
                f,
                "Could not convert {} to {}. Path '{}'.",
                self.source_kind, self.target, self.path
            ),
        }
    }
}

impl std::error::Error for ConversionError {}

/// A token was written in a state that does not accept it. Fatal to the
/// writer instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterStateError {
    pub message: String,
    pub path: String,
}

impl fmt::Display for WriterStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Path '{}'.", self.message, self.path)
    }
}

impl std::error::Error for WriterStateError {}

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Conversion(#[from] ConversionError),
    #[error("{0}")]
    WriterState(#[from] WriterStateError),
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("instance was cancelled mid-operation and can no longer be used")]
    Cancelled,
    /// Failure raised by a token source or sink that is not text-based.
    #[error(transparent)]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}

impl JsonError {
    pub fn as_parse(&self) -> Option<&ParseError> {
        match self {
            JsonError::Parse(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_conversion(&self) -> Option<&ConversionError> {
        match self {
            JsonError::Conversion(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_writer_state(&self) -> Option<&WriterStateError> {
        match self {
            JsonError::WriterState(e) => Some(e),
            _ => None,
        }
    }
}

pub type JsonResult<T> = Result<T, JsonError>;
