//! Token-sink state machine shared by the text writer and the tree writer.
//!
//! Every write is validated against a fixed transition table before any
//! output is produced. An invalid transition moves the machine to
//! [`WriterState::Error`], after which every further write fails.

use tracing::debug;

use crate::error::WriterStateError;
use crate::path::{FrameKind, PathState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Start,
    Property,
    ObjectStart,
    Object,
    ArrayStart,
    Array,
    ConstructorStart,
    Constructor,
    Closed,
    Error,
}

impl WriterState {
    fn name(self) -> &'static str {
        match self {
            WriterState::Start => "Start",
            WriterState::Property => "Property",
            WriterState::ObjectStart => "ObjectStart",
            WriterState::Object => "Object",
            WriterState::ArrayStart => "ArrayStart",
            WriterState::Array => "Array",
            WriterState::ConstructorStart => "ConstructorStart",
            WriterState::Constructor => "Constructor",
            WriterState::Closed => "Closed",
            WriterState::Error => "Error",
        }
    }

    /// Inside a container that already holds at least one element.
    pub fn needs_delimiter(self) -> bool {
        matches!(
            self,
            WriterState::Object | WriterState::Array | WriterState::Constructor
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    StartObject,
    StartArray,
    StartConstructor,
    PropertyName,
    Comment,
    Raw,
    Value,
}

impl WriteAction {
    fn name(self) -> &'static str {
        match self {
            WriteAction::StartObject => "StartObject",
            WriteAction::StartArray => "StartArray",
            WriteAction::StartConstructor => "StartConstructor",
            WriteAction::PropertyName => "PropertyName",
            WriteAction::Comment => "Comment",
            WriteAction::Raw => "Raw",
            WriteAction::Value => "Value",
        }
    }
}

fn transition(state: WriterState, action: WriteAction) -> Option<WriterState> {
    use WriteAction as A;
    use WriterState as S;
    match (action, state) {
        (_, S::Closed | S::Error) => None,
        (A::StartObject, S::ObjectStart | S::Object) => None,
        (A::StartObject, _) => Some(S::ObjectStart),
        (A::StartArray, S::ObjectStart | S::Object) => None,
        (A::StartArray, _) => Some(S::ArrayStart),
        (A::StartConstructor, S::ObjectStart | S::Object) => None,
        (A::StartConstructor, _) => Some(S::ConstructorStart),
        (A::PropertyName, S::ObjectStart | S::Object) => Some(S::Property),
        (A::PropertyName, _) => None,
        (A::Comment | A::Raw, s) => Some(s),
        (A::Value, S::Start) => Some(S::Start),
        (A::Value, S::Property) => Some(S::Object),
        (A::Value, S::ArrayStart | S::Array) => Some(S::Array),
        (A::Value, S::ConstructorStart | S::Constructor) => Some(S::Constructor),
        (A::Value, S::ObjectStart | S::Object) => None,
    }
}

#[derive(Debug, Clone)]
pub struct WriterStateMachine {
    state: WriterState,
    path: PathState,
}

impl Default for WriterStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl WriterStateMachine {
    pub fn new() -> Self {
        Self {
            state: WriterState::Start,
            path: PathState::new(),
        }
    }

    /// Machine whose reported paths are prefixed by `base`.
    pub fn with_base(base: impl Into<String>) -> Self {
        Self {
            state: WriterState::Start,
            path: PathState::with_base(base),
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn path(&self) -> String {
        self.path.path()
    }

    /// Number of open containers.
    pub fn depth(&self) -> usize {
        self.path.depth()
    }

    pub fn top(&self) -> Option<FrameKind> {
        self.path.current_kind()
    }

    /// Move to [`WriterState::Error`] and describe why.
    pub fn fail(&mut self, message: String) -> WriterStateError {
        self.state = WriterState::Error;
        let err = WriterStateError {
            message,
            path: self.path.path(),
        };
        debug!(path = %err.path, message = %err.message, "writer entered error state");
        err
    }

    /// Validate `action` and advance. Returns the state before the
    /// transition, which decides delimiters and line breaks.
    pub fn begin(&mut self, action: WriteAction) -> Result<WriterState, WriterStateError> {
        self.begin_inner(action, None)
    }

    pub fn begin_property(&mut self, name: &str) -> Result<WriterState, WriterStateError> {
        self.begin_inner(WriteAction::PropertyName, Some(name))
    }

    fn begin_inner(
        &mut self,
        action: WriteAction,
        name: Option<&str>,
    ) -> Result<WriterState, WriterStateError> {
        let prev = self.state;
        let Some(next) = transition(prev, action) else {
            let message = match prev {
                WriterState::Error => "The writer is in an error state.".to_owned(),
                WriterState::Closed => "The writer is closed.".to_owned(),
                _ => format!(
                    "Token {} in state {} would result in an invalid JSON object.",
                    action.name(),
                    prev.name()
                ),
            };
            return Err(self.fail(message));
        };
        match action {
            WriteAction::StartObject | WriteAction::StartArray | WriteAction::StartConstructor => {
                self.path.before_value();
                self.path.push(match action {
                    WriteAction::StartObject => FrameKind::Object,
                    WriteAction::StartArray => FrameKind::Array,
                    _ => FrameKind::Constructor,
                });
            }
            WriteAction::PropertyName => self.path.set_property(name.unwrap_or_default()),
            WriteAction::Value => self.path.before_value(),
            WriteAction::Comment | WriteAction::Raw => {}
        }
        self.state = next;
        Ok(prev)
    }

    /// Close the innermost container, which must be of `kind` (`None`
    /// closes whatever is open). Returns the state before closing.
    pub fn end(&mut self, kind: Option<FrameKind>) -> Result<WriterState, WriterStateError> {
        let prev = self.state;
        if matches!(prev, WriterState::Error | WriterState::Closed) {
            return Err(self.fail(format!("Cannot close a container in state {}.", prev.name())));
        }
        let Some(top) = self.path.current_kind() else {
            return Err(self.fail("No token to close.".to_owned()));
        };
        if prev == WriterState::Property {
            return Err(self.fail("A property name is waiting for its value.".to_owned()));
        }
        if let Some(kind) = kind {
            if kind != top {
                return Err(self.fail(format!(
                    "Cannot close {} while the innermost open container is {}.",
                    frame_name(kind),
                    frame_name(top)
                )));
            }
        }
        self.path.pop();
        self.state = match self.path.current_kind() {
            None => WriterState::Start,
            Some(FrameKind::Object) => WriterState::Object,
            Some(FrameKind::Array) => WriterState::Array,
            Some(FrameKind::Constructor) => WriterState::Constructor,
        };
        Ok(prev)
    }

    pub fn close(&mut self) {
        if self.state != WriterState::Error {
            self.state = WriterState::Closed;
        }
    }
}

fn frame_name(kind: FrameKind) -> &'static str {
    match kind {
        FrameKind::Object => "an object",
        FrameKind::Array => "an array",
        FrameKind::Constructor => "a constructor",
    }
}
