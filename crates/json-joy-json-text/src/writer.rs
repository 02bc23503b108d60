//! Push-based token sinks: the [`JsonWrite`] / [`AsyncJsonWrite`] contracts
//! and the text writers.

use std::io::Write;

use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

use crate::error::{JsonResult, WriterStateError};
use crate::format;
use crate::path::FrameKind;
use crate::reader::{AsyncJsonRead, JsonRead};
use crate::settings::{
    default_settings, DateFormatHandling, FloatFormatHandling, Formatting, WriterSettings,
};
use crate::token::{Token, TokenKind};
use crate::value::Primitive;
use crate::writer_state::{WriteAction, WriterState, WriterStateMachine};

/// Tracks whether the subtree replay in [`JsonWrite::write_token`] is done.
#[derive(Debug, Clone, Copy)]
struct Replay {
    base: usize,
    awaiting_value: bool,
}

impl Replay {
    fn new(base: usize) -> Self {
        Self {
            base,
            awaiting_value: false,
        }
    }

    /// Whether the token just written completes the replayed subtree.
    fn finished(&mut self, kind: TokenKind, depth: usize) -> bool {
        match kind {
            TokenKind::PropertyName => {
                if depth == self.base {
                    self.awaiting_value = true;
                }
                false
            }
            TokenKind::Comment if self.awaiting_value => false,
            k if k.is_start() => false,
            _ => depth <= self.base,
        }
    }
}

/// A synchronous token sink.
pub trait JsonWrite {
    fn write_start_object(&mut self) -> JsonResult<()>;
    fn write_end_object(&mut self) -> JsonResult<()>;
    fn write_start_array(&mut self) -> JsonResult<()>;
    fn write_end_array(&mut self) -> JsonResult<()>;
    fn write_start_constructor(&mut self, name: &str) -> JsonResult<()>;
    fn write_end_constructor(&mut self) -> JsonResult<()>;
    /// Close the innermost open container, whatever its kind.
    fn write_end(&mut self) -> JsonResult<()>;
    fn write_property_name(&mut self, name: &str) -> JsonResult<()>;
    fn write_value(&mut self, value: &Primitive) -> JsonResult<()>;
    fn write_comment(&mut self, text: &str) -> JsonResult<()>;
    /// Verbatim text that does not count as a value.
    fn write_raw(&mut self, text: &str) -> JsonResult<()>;
    /// Verbatim text that counts as one value for delimiters.
    fn write_raw_value(&mut self, text: &str) -> JsonResult<()>;
    fn flush(&mut self) -> JsonResult<()>;
    fn close(&mut self) -> JsonResult<()>;
    fn path(&self) -> String;
    fn state(&self) -> WriterState;

    fn write_null(&mut self) -> JsonResult<()> {
        self.write_value(&Primitive::Null)
    }

    fn write_undefined(&mut self) -> JsonResult<()> {
        self.write_value(&Primitive::Undefined)
    }

    fn write_bool(&mut self, value: bool) -> JsonResult<()> {
        self.write_value(&Primitive::Boolean(value))
    }

    fn write_i64(&mut self, value: i64) -> JsonResult<()> {
        self.write_value(&Primitive::Integer(value))
    }

    fn write_u64(&mut self, value: u64) -> JsonResult<()> {
        self.write_value(&Primitive::UInteger(value))
    }

    fn write_f64(&mut self, value: f64) -> JsonResult<()> {
        self.write_value(&Primitive::Float(value))
    }

    fn write_decimal(&mut self, value: Decimal) -> JsonResult<()> {
        self.write_value(&Primitive::Decimal(value))
    }

    fn write_str(&mut self, value: &str) -> JsonResult<()> {
        self.write_value(&Primitive::String(value.to_owned()))
    }

    fn write_date(&mut self, value: DateTime<Utc>) -> JsonResult<()> {
        self.write_value(&Primitive::Date(value))
    }

    fn write_date_offset(&mut self, value: DateTime<FixedOffset>) -> JsonResult<()> {
        self.write_value(&Primitive::DateOffset(value))
    }

    fn write_bytes(&mut self, value: &[u8]) -> JsonResult<()> {
        self.write_value(&Primitive::Bytes(value.to_vec()))
    }

    fn write_guid(&mut self, value: Uuid) -> JsonResult<()> {
        self.write_value(&Primitive::Guid(value))
    }

    /// Write a single token as produced by a reader.
    fn write_single_token(&mut self, token: &Token) -> JsonResult<()> {
        let text = token.text().unwrap_or_default();
        match token.kind {
            TokenKind::None => Ok(()),
            TokenKind::StartObject => self.write_start_object(),
            TokenKind::EndObject => self.write_end_object(),
            TokenKind::StartArray => self.write_start_array(),
            TokenKind::EndArray => self.write_end_array(),
            TokenKind::StartConstructor => self.write_start_constructor(text),
            TokenKind::EndConstructor => self.write_end_constructor(),
            TokenKind::PropertyName => self.write_property_name(text),
            TokenKind::Comment => self.write_comment(text),
            TokenKind::Raw => self.write_raw(text),
            _ => self.write_value(token.value.as_ref().unwrap_or(&Primitive::Null)),
        }
    }

    /// Replay the reader's current token and its whole subtree. On a reader
    /// that has not started yet, replays everything it produces; an empty
    /// source writes nothing.
    fn write_token<R: JsonRead + ?Sized>(&mut self, reader: &mut R) -> JsonResult<()>
    where
        Self: Sized,
    {
        if reader.token_kind() == TokenKind::None {
            while reader.read()? {
                self.write_single_token(reader.token())?;
            }
            return Ok(());
        }
        let mut replay = Replay::new(reader.depth());
        loop {
            self.write_single_token(reader.token())?;
            if replay.finished(reader.token_kind(), reader.depth()) || !reader.read()? {
                return Ok(());
            }
        }
    }
}

/// The asynchronous token sink contract.
#[async_trait]
pub trait AsyncJsonWrite: Send {
    async fn write_start_object_async(&mut self) -> JsonResult<()>;
    async fn write_end_object_async(&mut self) -> JsonResult<()>;
    async fn write_start_array_async(&mut self) -> JsonResult<()>;
    async fn write_end_array_async(&mut self) -> JsonResult<()>;
    async fn write_start_constructor_async(&mut self, name: &str) -> JsonResult<()>;
    async fn write_end_constructor_async(&mut self) -> JsonResult<()>;
    async fn write_end_async(&mut self) -> JsonResult<()>;
    async fn write_property_name_async(&mut self, name: &str) -> JsonResult<()>;
    async fn write_value_async(&mut self, value: &Primitive) -> JsonResult<()>;
    async fn write_comment_async(&mut self, text: &str) -> JsonResult<()>;
    async fn write_raw_async(&mut self, text: &str) -> JsonResult<()>;
    async fn write_raw_value_async(&mut self, text: &str) -> JsonResult<()>;
    async fn flush_async(&mut self) -> JsonResult<()>;
    async fn close_async(&mut self) -> JsonResult<()>;

    async fn write_null_async(&mut self) -> JsonResult<()> {
        self.write_value_async(&Primitive::Null).await
    }

    async fn write_single_token_async(&mut self, token: &Token) -> JsonResult<()> {
        let text = token.text().unwrap_or_default();
        match token.kind {
            TokenKind::None => Ok(()),
            TokenKind::StartObject => self.write_start_object_async().await,
            TokenKind::EndObject => self.write_end_object_async().await,
            TokenKind::StartArray => self.write_start_array_async().await,
            TokenKind::EndArray => self.write_end_array_async().await,
            TokenKind::StartConstructor => self.write_start_constructor_async(text).await,
            TokenKind::EndConstructor => self.write_end_constructor_async().await,
            TokenKind::PropertyName => self.write_property_name_async(text).await,
            TokenKind::Comment => self.write_comment_async(text).await,
            TokenKind::Raw => self.write_raw_async(text).await,
            _ => {
                let value = token.value.clone().unwrap_or(Primitive::Null);
                self.write_value_async(&value).await
            }
        }
    }

    async fn write_token_async<R: AsyncJsonRead>(&mut self, reader: &mut R) -> JsonResult<()>
    where
        Self: Sized,
    {
        if reader.current_token().kind == TokenKind::None {
            while reader.read_async().await? {
                let token = reader.current_token().clone();
                self.write_single_token_async(&token).await?;
            }
            return Ok(());
        }
        let mut replay = Replay::new(reader.current_depth());
        loop {
            let token = reader.current_token().clone();
            self.write_single_token_async(&token).await?;
            if replay.finished(token.kind, reader.current_depth()) || !reader.read_async().await? {
                return Ok(());
            }
        }
    }
}

/// Formatting core shared by the sync and async text writers. Appends to
/// `out`; the owning writer decides when to hand it to the stream.
#[derive(Debug)]
struct Emitter {
    settings: WriterSettings,
    machine: WriterStateMachine,
    root_written: bool,
    out: String,
}

impl Emitter {
    fn new(settings: WriterSettings) -> Self {
        Self {
            settings,
            machine: WriterStateMachine::new(),
            root_written: false,
            out: String::new(),
        }
    }

    fn indented(&self) -> bool {
        self.settings.formatting == Formatting::Indented
    }

    fn newline_indent(&mut self, depth: usize) {
        self.out.push('\n');
        for _ in 0..depth * self.settings.indentation {
            self.out.push(self.settings.indent_char);
        }
    }

    fn before(&mut self, action: WriteAction, name: Option<&str>) -> JsonResult<()> {
        let depth = self.machine.depth();
        let prev = match name {
            Some(name) => self.machine.begin_property(name)?,
            None => self.machine.begin(action)?,
        };
        if action == WriteAction::Raw {
            return Ok(());
        }
        if prev == WriterState::Start && self.root_written {
            self.out.push(if self.indented() { '\n' } else { ' ' });
        }
        if prev.needs_delimiter() && action != WriteAction::Comment {
            self.out.push(',');
        }
        if self.indented() && !matches!(prev, WriterState::Start | WriterState::Property) {
            self.newline_indent(depth);
        }
        Ok(())
    }

    fn after_value(&mut self) {
        if self.machine.state() == WriterState::Start {
            self.root_written = true;
        }
    }

    fn push_quoted(&mut self, s: &str) {
        let quote = self.settings.quote_char;
        self.out.push(quote);
        format::write_escaped(&mut self.out, s, quote, self.settings.string_escape_handling);
        self.out.push(quote);
    }

    fn start(&mut self, action: WriteAction, opener: &str) -> JsonResult<()> {
        self.before(action, None)?;
        self.out.push_str(opener);
        Ok(())
    }

    fn start_constructor(&mut self, name: &str) -> JsonResult<()> {
        self.before(WriteAction::StartConstructor, None)?;
        self.out.push_str("new ");
        self.out.push_str(name);
        self.out.push('(');
        Ok(())
    }

    fn end(&mut self, kind: Option<FrameKind>) -> JsonResult<()> {
        if self.machine.state() == WriterState::Property {
            self.value(&Primitive::Null)?;
        }
        let top = self.machine.top();
        let prev = self.machine.end(kind)?;
        let closer = match top {
            Some(FrameKind::Object) => '}',
            Some(FrameKind::Array) => ']',
            _ => ')',
        };
        let empty = matches!(
            prev,
            WriterState::ObjectStart | WriterState::ArrayStart | WriterState::ConstructorStart
        );
        if self.indented() && !empty {
            self.newline_indent(self.machine.depth());
        }
        self.out.push(closer);
        self.after_value();
        Ok(())
    }

    fn property_name(&mut self, name: &str) -> JsonResult<()> {
        self.before(WriteAction::PropertyName, Some(name))?;
        if self.settings.quote_name {
            self.push_quoted(name);
        } else {
            self.out.push_str(name);
        }
        self.out.push(':');
        if self.indented() {
            self.out.push(' ');
        }
        Ok(())
    }

    fn comment(&mut self, text: &str) -> JsonResult<()> {
        self.before(WriteAction::Comment, None)?;
        self.out.push_str("/*");
        self.out.push_str(text);
        self.out.push_str("*/");
        Ok(())
    }

    fn raw(&mut self, text: &str) -> JsonResult<()> {
        self.before(WriteAction::Raw, None)?;
        self.out.push_str(text);
        Ok(())
    }

    fn raw_value(&mut self, text: &str) -> JsonResult<()> {
        self.before(WriteAction::Value, None)?;
        self.out.push_str(text);
        self.after_value();
        Ok(())
    }

    fn value(&mut self, value: &Primitive) -> JsonResult<()> {
        match value {
            Primitive::Comment(text) => return self.comment(text),
            Primitive::Raw(text) => return self.raw_value(text),
            Primitive::Float(f)
                if !f.is_finite()
                    && self.settings.float_format_handling == FloatFormatHandling::Error =>
            {
                return Err(WriterStateError {
                    message: format!("Cannot write non-finite floating point value {f}."),
                    path: self.machine.path(),
                }
                .into());
            }
            _ => {}
        }
        self.before(WriteAction::Value, None)?;
        self.render(value);
        self.after_value();
        Ok(())
    }

    fn render(&mut self, value: &Primitive) {
        match value {
            Primitive::Null => self.out.push_str("null"),
            Primitive::Undefined => self.out.push_str("undefined"),
            Primitive::Boolean(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Primitive::Integer(i) => self.out.push_str(&i.to_string()),
            Primitive::UInteger(u) => self.out.push_str(&u.to_string()),
            Primitive::BigInteger(b) => self.out.push_str(&b.to_string()),
            Primitive::Float(f) if f.is_finite() => self.out.push_str(&format::format_f64(*f)),
            Primitive::Float(f) => {
                let symbol = if f.is_nan() {
                    "NaN"
                } else if *f > 0.0 {
                    "Infinity"
                } else {
                    "-Infinity"
                };
                match self.settings.float_format_handling {
                    FloatFormatHandling::String => self.push_quoted(symbol),
                    FloatFormatHandling::DefaultValue => self.out.push_str("0.0"),
                    _ => self.out.push_str(symbol),
                }
            }
            Primitive::Decimal(d) => self.out.push_str(&format::format_decimal(d)),
            Primitive::String(s) | Primitive::Uri(s) => self.push_quoted(s),
            Primitive::Guid(g) => self.push_quoted(&g.hyphenated().to_string()),
            Primitive::TimeSpan(t) => self.push_quoted(&format::format_timespan(t)),
            Primitive::Bytes(b) => {
                self.push_quoted(&base64::engine::general_purpose::STANDARD.encode(b))
            }
            Primitive::Date(d) => match self.settings.date_format_handling {
                DateFormatHandling::IsoDateFormat => self.push_quoted(&format::format_iso_utc(d)),
                DateFormatHandling::MicrosoftDateFormat => self.push_ms_date(&format::format_ms_utc(d)),
            },
            Primitive::DateOffset(d) => match self.settings.date_format_handling {
                DateFormatHandling::IsoDateFormat => {
                    self.push_quoted(&format::format_iso_offset(d))
                }
                DateFormatHandling::MicrosoftDateFormat => {
                    self.push_ms_date(&format::format_ms_offset(d))
                }
            },
            Primitive::Comment(_) | Primitive::Raw(_) => {}
        }
    }

    /// `/Date(..)/` with its slashes escaped so readers can tell it apart
    /// from an ordinary string.
    fn push_ms_date(&mut self, text: &str) {
        let quote = self.settings.quote_char;
        self.out.push(quote);
        self.out.push_str(&text.replace('/', "\\/"));
        self.out.push(quote);
    }

    fn close(&mut self) -> JsonResult<()> {
        if matches!(self.machine.state(), WriterState::Closed | WriterState::Error) {
            self.machine.close();
            return Ok(());
        }
        if self.settings.auto_complete_on_close {
            while self.machine.depth() > 0 {
                self.end(None)?;
            }
        }
        self.machine.close();
        Ok(())
    }
}

/// Emitter writing to a [`std::io::Write`] stream.
///
/// Each token's text is written to the stream as soon as it is formatted;
/// wrap the stream in a `BufWriter` for batching.
pub struct JsonTextWriter<W> {
    inner: W,
    emitter: Emitter,
}

impl<W: Write> JsonTextWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_settings(inner, default_settings().writer)
    }

    pub fn with_settings(inner: W, settings: WriterSettings) -> Self {
        Self {
            inner,
            emitter: Emitter::new(settings),
        }
    }

    pub fn settings(&self) -> &WriterSettings {
        &self.emitter.settings
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Release the underlying stream.
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn emit(&mut self, op: impl FnOnce(&mut Emitter) -> JsonResult<()>) -> JsonResult<()> {
        let result = op(&mut self.emitter);
        if !self.emitter.out.is_empty() {
            self.inner.write_all(self.emitter.out.as_bytes())?;
            self.emitter.out.clear();
        }
        result
    }
}

impl JsonTextWriter<Vec<u8>> {
    /// Text written so far.
    pub fn into_string(self) -> String {
        match String::from_utf8(self.inner) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

impl<W: Write> JsonWrite for JsonTextWriter<W> {
    fn write_start_object(&mut self) -> JsonResult<()> {
        self.emit(|e| e.start(WriteAction::StartObject, "{"))
    }

    fn write_end_object(&mut self) -> JsonResult<()> {
        self.emit(|e| e.end(Some(FrameKind::Object)))
    }

    fn write_start_array(&mut self) -> JsonResult<()> {
        self.emit(|e| e.start(WriteAction::StartArray, "["))
    }

    fn write_end_array(&mut self) -> JsonResult<()> {
        self.emit(|e| e.end(Some(FrameKind::Array)))
    }

    fn write_start_constructor(&mut self, name: &str) -> JsonResult<()> {
        self.emit(|e| e.start_constructor(name))
    }

    fn write_end_constructor(&mut self) -> JsonResult<()> {
        self.emit(|e| e.end(Some(FrameKind::Constructor)))
    }

    fn write_end(&mut self) -> JsonResult<()> {
        self.emit(|e| e.end(None))
    }

    fn write_property_name(&mut self, name: &str) -> JsonResult<()> {
        self.emit(|e| e.property_name(name))
    }

    fn write_value(&mut self, value: &Primitive) -> JsonResult<()> {
        self.emit(|e| e.value(value))
    }

    fn write_comment(&mut self, text: &str) -> JsonResult<()> {
        self.emit(|e| e.comment(text))
    }

    fn write_raw(&mut self, text: &str) -> JsonResult<()> {
        self.emit(|e| e.raw(text))
    }

    fn write_raw_value(&mut self, text: &str) -> JsonResult<()> {
        self.emit(|e| e.raw_value(text))
    }

    fn flush(&mut self) -> JsonResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    fn close(&mut self) -> JsonResult<()> {
        self.emit(Emitter::close)?;
        self.inner.flush()?;
        debug!("text writer closed");
        Ok(())
    }

    fn path(&self) -> String {
        self.emitter.machine.path()
    }

    fn state(&self) -> WriterState {
        self.emitter.machine.state()
    }
}

const ASYNC_FLUSH_THRESHOLD: usize = 8 * 1024;

/// Emitter writing to a [`tokio::io::AsyncWrite`] stream.
///
/// Formatted text is buffered and handed to the stream on flush, on close,
/// and whenever the buffer grows past a threshold.
pub struct AsyncJsonTextWriter<W> {
    inner: W,
    emitter: Emitter,
    threshold: usize,
}

impl<W: AsyncWrite + Unpin + Send> AsyncJsonTextWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_settings(inner, default_settings().writer)
    }

    pub fn with_settings(inner: W, settings: WriterSettings) -> Self {
        Self {
            inner,
            emitter: Emitter::new(settings),
            threshold: ASYNC_FLUSH_THRESHOLD,
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn path(&self) -> String {
        self.emitter.machine.path()
    }

    pub fn state(&self) -> WriterState {
        self.emitter.machine.state()
    }

    async fn drain(&mut self) -> JsonResult<()> {
        if !self.emitter.out.is_empty() {
            self.inner.write_all(self.emitter.out.as_bytes()).await?;
            self.emitter.out.clear();
        }
        Ok(())
    }

    async fn emit(&mut self, result: JsonResult<()>) -> JsonResult<()> {
        result?;
        if self.emitter.out.len() >= self.threshold {
            self.drain().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> AsyncJsonWrite for AsyncJsonTextWriter<W> {
    async fn write_start_object_async(&mut self) -> JsonResult<()> {
        let r = self.emitter.start(WriteAction::StartObject, "{");
        self.emit(r).await
    }

    async fn write_end_object_async(&mut self) -> JsonResult<()> {
        let r = self.emitter.end(Some(FrameKind::Object));
        self.emit(r).await
    }

    async fn write_start_array_async(&mut self) -> JsonResult<()> {
        let r = self.emitter.start(WriteAction::StartArray, "[");
        self.emit(r).await
    }

    async fn write_end_array_async(&mut self) -> JsonResult<()> {
        let r = self.emitter.end(Some(FrameKind::Array));
        self.emit(r).await
    }

    async fn write_start_constructor_async(&mut self, name: &str) -> JsonResult<()> {
        let r = self.emitter.start_constructor(name);
        self.emit(r).await
    }

    async fn write_end_constructor_async(&mut self) -> JsonResult<()> {
        let r = self.emitter.end(Some(FrameKind::Constructor));
        self.emit(r).await
    }

    async fn write_end_async(&mut self) -> JsonResult<()> {
        let r = self.emitter.end(None);
        self.emit(r).await
    }

    async fn write_property_name_async(&mut self, name: &str) -> JsonResult<()> {
        let r = self.emitter.property_name(name);
        self.emit(r).await
    }

    async fn write_value_async(&mut self, value: &Primitive) -> JsonResult<()> {
        let r = self.emitter.value(value);
        self.emit(r).await
    }

    async fn write_comment_async(&mut self, text: &str) -> JsonResult<()> {
        let r = self.emitter.comment(text);
        self.emit(r).await
    }

    async fn write_raw_async(&mut self, text: &str) -> JsonResult<()> {
        let r = self.emitter.raw(text);
        self.emit(r).await
    }

    async fn write_raw_value_async(&mut self, text: &str) -> JsonResult<()> {
        let r = self.emitter.raw_value(text);
        self.emit(r).await
    }

    async fn flush_async(&mut self) -> JsonResult<()> {
        self.drain().await?;
        self.inner.flush().await?;
        Ok(())
    }

    async fn close_async(&mut self) -> JsonResult<()> {
        self.emitter.close()?;
        self.flush_async().await?;
        debug!("async text writer closed");
        Ok(())
    }
}
