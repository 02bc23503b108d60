//! Logical path strings: `a.b[0]['odd key']`.
//!
//! Readers and writers keep a [`PathState`] to report where they are; the
//! document tree uses [`format_path`] and [`parse_path`] for node addresses.
//!
//! # Example
//!
//! ```
//! use json_joy_json_text::path::{format_path, parse_path, PathPart};
//!
//! let parts = vec![
//!     PathPart::Property("store".into()),
//!     PathPart::Index(0),
//!     PathPart::Property("a b".into()),
//! ];
//! let path = format_path(&parts);
//! assert_eq!(path, "store[0]['a b']");
//! assert_eq!(parse_path(&path).unwrap(), parts);
//! ```

use thiserror::Error;

use crate::format::escape_path_name;

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPart {
    Property(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} Path '{path}', position {position}.")]
pub struct PathSyntaxError {
    pub message: String,
    pub path: String,
    /// 0-based character offset into `path`.
    pub position: usize,
}

/// Whether `name` can be written as a bare `.name` step.
pub fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Append one step to `out`.
pub fn push_part(out: &mut String, part: &PathPart) {
    match part {
        PathPart::Index(i) => {
            out.push('[');
            out.push_str(&i.to_string());
            out.push(']');
        }
        // A leading bare `$` would read back as the root marker.
        PathPart::Property(name)
            if is_bare_identifier(name) && !(out.is_empty() && name == "$") =>
        {
            if !out.is_empty() {
                out.push('.');
            }
            out.push_str(name);
        }
        PathPart::Property(name) => {
            out.push_str("['");
            out.push_str(&escape_path_name(name));
            out.push_str("']");
        }
    }
}

pub fn format_path(parts: &[PathPart]) -> String {
    let mut out = String::new();
    for part in parts {
        push_part(&mut out, part);
    }
    out
}

/// Parse a path: optional leading `$`, a bare leading name, `.name`,
/// `['name']` or `["name"]` with backslash escapes, and `[N]`.
pub fn parse_path(path: &str) -> Result<Vec<PathPart>, PathSyntaxError> {
    PathParser {
        path,
        chars: path.chars().collect(),
        x: 0,
    }
    .parse()
}

struct PathParser<'a> {
    path: &'a str,
    chars: Vec<char>,
    x: usize,
}

impl PathParser<'_> {
    fn error(&self, message: impl Into<String>) -> PathSyntaxError {
        PathSyntaxError {
            message: message.into(),
            path: self.path.to_owned(),
            position: self.x,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.x).copied()
    }

    fn parse(mut self) -> Result<Vec<PathPart>, PathSyntaxError> {
        let mut parts = Vec::new();
        if self.peek() == Some('$') {
            self.x += 1;
            if !matches!(self.peek(), None | Some('.') | Some('[')) {
                // `$name` is a bare name, not the root marker.
                self.x = 0;
            }
        }
        let mut first = true;
        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.x += 1;
                    parts.push(PathPart::Property(self.read_name()?));
                }
                '[' => {
                    self.x += 1;
                    parts.push(self.read_bracket()?);
                }
                _ if first => parts.push(PathPart::Property(self.read_name()?)),
                c => return Err(self.error(format!("Unexpected character '{c}'."))),
            }
            first = false;
        }
        Ok(parts)
    }

    fn read_name(&mut self) -> Result<String, PathSyntaxError> {
        let start = self.x;
        while let Some(c) = self.peek() {
            if c == '.' || c == '[' || c == ']' {
                break;
            }
            self.x += 1;
        }
        if self.x == start {
            return Err(self.error("Empty property name."));
        }
        Ok(self.chars[start..self.x].iter().collect())
    }

    fn read_bracket(&mut self) -> Result<PathPart, PathSyntaxError> {
        match self.peek() {
            Some(q @ ('\'' | '"')) => {
                self.x += 1;
                let name = self.read_quoted(q)?;
                self.expect(']')?;
                Ok(PathPart::Property(name))
            }
            Some(c) if c.is_ascii_digit() => {
                let start = self.x;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.x += 1;
                }
                let digits: String = self.chars[start..self.x].iter().collect();
                let index = digits
                    .parse::<usize>()
                    .map_err(|_| self.error("Array index out of range."))?;
                self.expect(']')?;
                Ok(PathPart::Index(index))
            }
            _ => Err(self.error("Expected an index or a quoted name.")),
        }
    }

    fn expect(&mut self, c: char) -> Result<(), PathSyntaxError> {
        if self.peek() == Some(c) {
            self.x += 1;
            Ok(())
        } else {
            Err(self.error(format!("Expected '{c}'.")))
        }
    }

    fn read_quoted(&mut self, quote: char) -> Result<String, PathSyntaxError> {
        let mut out = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error("Unterminated quoted name."));
            };
            self.x += 1;
            if c == quote {
                return Ok(out);
            }
            if c != '\\' {
                out.push(c);
                continue;
            }
            let Some(esc) = self.peek() else {
                return Err(self.error("Unterminated escape sequence."));
            };
            self.x += 1;
            match esc {
                'b' => out.push('\u{0008}'),
                't' => out.push('\t'),
                'n' => out.push('\n'),
                'f' => out.push('\u{000C}'),
                'r' => out.push('\r'),
                'u' => out.push(self.read_unicode_escape()?),
                other => out.push(other),
            }
        }
    }

    fn read_hex4(&mut self) -> Result<u32, PathSyntaxError> {
        if self.x + 4 > self.chars.len() {
            return Err(self.error("Invalid unicode escape."));
        }
        let hex: String = self.chars[self.x..self.x + 4].iter().collect();
        let unit = u32::from_str_radix(&hex, 16).map_err(|_| self.error("Invalid unicode escape."))?;
        self.x += 4;
        Ok(unit)
    }

    fn read_unicode_escape(&mut self) -> Result<char, PathSyntaxError> {
        let hi = self.read_hex4()?;
        if (0xD800..0xDC00).contains(&hi)
            && self.chars.get(self.x) == Some(&'\\')
            && self.chars.get(self.x + 1) == Some(&'u')
        {
            let save = self.x;
            self.x += 2;
            let lo = self.read_hex4()?;
            if (0xDC00..0xE000).contains(&lo) {
                let code = 0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00);
                return Ok(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            self.x = save;
        }
        Ok(char::from_u32(hi).unwrap_or('\u{FFFD}'))
    }
}

/// Kind of container a [`PathState`] frame tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Object,
    Array,
    Constructor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    kind: FrameKind,
    /// Position of the current element in an array or constructor.
    index: Option<usize>,
    /// Name of the current property in an object.
    name: Option<String>,
}

/// Live path of a token cursor, with an optional synthetic prefix.
#[derive(Debug, Clone, Default)]
pub struct PathState {
    base: String,
    frames: Vec<Frame>,
}

impl PathState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor whose reported paths are prefixed by `base`.
    pub fn with_base(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            frames: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current_kind(&self) -> Option<FrameKind> {
        self.frames.last().map(|f| f.kind)
    }

    /// Advance the array/constructor position ahead of a new element.
    pub fn before_value(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            if frame.kind != FrameKind::Object {
                frame.index = Some(frame.index.map_or(0, |i| i + 1));
            }
        }
    }

    pub fn set_property(&mut self, name: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.name = Some(name.to_owned());
        }
    }

    pub fn push(&mut self, kind: FrameKind) {
        self.frames.push(Frame {
            kind,
            index: None,
            name: None,
        });
    }

    pub fn pop(&mut self) -> Option<FrameKind> {
        self.frames.pop().map(|f| f.kind)
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn parts(&self) -> Vec<PathPart> {
        self.frames
            .iter()
            .filter_map(|f| match f.kind {
                FrameKind::Object => f.name.clone().map(PathPart::Property),
                _ => f.index.map(PathPart::Index),
            })
            .collect()
    }

    pub fn path(&self) -> String {
        let mut out = String::new();
        for part in self.parts() {
            push_part(&mut out, &part);
        }
        if self.base.is_empty() {
            return out;
        }
        if out.is_empty() {
            return self.base.clone();
        }
        if out.starts_with('[') {
            format!("{}{}", self.base, out)
        } else {
            format!("{}.{}", self.base, out)
        }
    }
}
