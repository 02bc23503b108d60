//! Pull-based token sources: the [`JsonRead`] / [`AsyncJsonRead`] contracts
//! and the text readers built on the [`Lexer`].

use std::io::{ErrorKind, Read};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

use crate::convert::{self, TryFromPrimitive};
use crate::error::{ConversionError, JsonError, JsonResult};
use crate::lexer::{Lexer, Step};
use crate::settings::{default_settings, ReaderSettings};
use crate::token::{Token, TokenKind};
use crate::value::Primitive;

const CHUNK_SIZE: usize = 8 * 1024;

/// Coerce the current token after a `read_as*` call.
fn convert_current<T: TryFromPrimitive>(token: &Token, path: &str) -> JsonResult<Option<T>> {
    match token.kind {
        TokenKind::None | TokenKind::Null | TokenKind::Undefined | TokenKind::EndArray => Ok(None),
        kind if kind.is_primitive() => convert::convert(token.value.as_ref(), path),
        kind => Err(ConversionError {
            source_kind: kind.name().to_owned(),
            target: T::TARGET,
            path: path.to_owned(),
            value: None,
        }
        .into()),
    }
}

/// A synchronous token source.
pub trait JsonRead {
    /// Advance to the next token. `Ok(false)` at the end of content.
    fn read(&mut self) -> JsonResult<bool>;

    fn token(&self) -> &Token;

    fn token_kind(&self) -> TokenKind {
        self.token().kind
    }

    fn value(&self) -> Option<&Primitive> {
        self.token().value.as_ref()
    }

    /// Nesting depth of the current token. A start token and its end token
    /// share a depth; their children sit one level deeper.
    fn depth(&self) -> usize;

    fn path(&self) -> String;

    /// Line and column after the current token, when the source has them.
    fn line_info(&self) -> Option<(usize, usize)> {
        None
    }

    /// Read the next non-comment token and coerce it.
    ///
    /// Null, undefined, an array end and the end of content read as `None`.
    /// A failed conversion leaves the reader on the offending token.
    fn read_as<T: TryFromPrimitive>(&mut self) -> JsonResult<Option<T>>
    where
        Self: Sized,
    {
        loop {
            if !self.read()? {
                return Ok(None);
            }
            if self.token_kind() != TokenKind::Comment {
                break;
            }
        }
        convert_current(self.token(), &self.path())
    }

    fn read_as_i32(&mut self) -> JsonResult<Option<i32>>
    where
        Self: Sized,
    {
        self.read_as()
    }

    fn read_as_string(&mut self) -> JsonResult<Option<String>>
    where
        Self: Sized,
    {
        self.read_as()
    }

    fn read_as_bool(&mut self) -> JsonResult<Option<bool>>
    where
        Self: Sized,
    {
        self.read_as()
    }

    fn read_as_f64(&mut self) -> JsonResult<Option<f64>>
    where
        Self: Sized,
    {
        self.read_as()
    }

    fn read_as_decimal(&mut self) -> JsonResult<Option<Decimal>>
    where
        Self: Sized,
    {
        self.read_as()
    }

    fn read_as_date(&mut self) -> JsonResult<Option<DateTime<Utc>>>
    where
        Self: Sized,
    {
        self.read_as()
    }

    fn read_as_date_offset(&mut self) -> JsonResult<Option<DateTime<FixedOffset>>>
    where
        Self: Sized,
    {
        self.read_as()
    }

    fn read_as_bytes(&mut self) -> JsonResult<Option<Vec<u8>>>
    where
        Self: Sized,
    {
        self.read_as()
    }

    /// Skip the children of the current container. On a property name, the
    /// property's value is skipped. Other tokens are left as they are.
    fn skip(&mut self) -> JsonResult<()> {
        if self.token_kind() == TokenKind::PropertyName {
            self.read()?;
        }
        if self.token_kind().is_start() {
            let depth = self.depth();
            while self.read()? && self.depth() > depth {}
        }
        Ok(())
    }
}

/// The asynchronous token source contract.
#[async_trait]
pub trait AsyncJsonRead: Send {
    async fn read_async(&mut self) -> JsonResult<bool>;

    fn current_token(&self) -> &Token;

    fn current_depth(&self) -> usize;

    fn current_path(&self) -> String;

    async fn read_as_async<T: TryFromPrimitive + Send>(&mut self) -> JsonResult<Option<T>>
    where
        Self: Sized,
    {
        loop {
            if !self.read_async().await? {
                return Ok(None);
            }
            if self.current_token().kind != TokenKind::Comment {
                break;
            }
        }
        convert_current(self.current_token(), &self.current_path())
    }

    async fn skip_async(&mut self) -> JsonResult<()> {
        if self.current_token().kind == TokenKind::PropertyName {
            self.read_async().await?;
        }
        if self.current_token().kind.is_start() {
            let depth = self.current_depth();
            while self.read_async().await? && self.current_depth() > depth {}
        }
        Ok(())
    }
}

/// Tokenizer over a [`std::io::Read`] stream.
pub struct JsonTextReader<R> {
    inner: R,
    lexer: Lexer,
    chunk: Vec<u8>,
}

impl<'a> JsonTextReader<&'a [u8]> {
    pub fn from_text(text: &'a str) -> Self {
        Self::new(text.as_bytes())
    }

    pub fn from_text_with_settings(text: &'a str, settings: ReaderSettings) -> Self {
        Self::with_settings(text.as_bytes(), settings)
    }
}

impl<R: Read> JsonTextReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_settings(inner, default_settings().reader)
    }

    pub fn with_settings(inner: R, settings: ReaderSettings) -> Self {
        Self {
            inner,
            lexer: Lexer::new(settings),
            chunk: vec![0; CHUNK_SIZE],
        }
    }

    pub fn settings(&self) -> &ReaderSettings {
        self.lexer.settings()
    }

    /// Release the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) -> JsonResult<()> {
        loop {
            match self.inner.read(&mut self.chunk) {
                Ok(0) => {
                    self.lexer.finish_input();
                    return Ok(());
                }
                Ok(n) => {
                    self.lexer.feed(&self.chunk[..n]);
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl<R: Read> JsonRead for JsonTextReader<R> {
    fn read(&mut self) -> JsonResult<bool> {
        loop {
            match self.lexer.advance()? {
                Step::Token => {
                    trace!(kind = %self.lexer.token().kind, path = %self.lexer.path(), "token");
                    return Ok(true);
                }
                Step::End => {
                    debug!("text reader reached end of content");
                    return Ok(false);
                }
                Step::NeedInput => self.fill()?,
            }
        }
    }

    fn token(&self) -> &Token {
        self.lexer.token()
    }

    fn depth(&self) -> usize {
        self.lexer.depth()
    }

    fn path(&self) -> String {
        self.lexer.path()
    }

    fn line_info(&self) -> Option<(usize, usize)> {
        Some(self.lexer.line_info())
    }
}

/// Tokenizer over a [`tokio::io::AsyncRead`] stream.
///
/// Suspends only while refilling its buffer. Dropping a pending read
/// poisons the reader: later reads fail with [`JsonError::Cancelled`].
pub struct AsyncJsonTextReader<R> {
    inner: R,
    lexer: Lexer,
    chunk: Vec<u8>,
    in_flight: bool,
}

impl<R: AsyncRead + Unpin + Send> AsyncJsonTextReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_settings(inner, default_settings().reader)
    }

    pub fn with_settings(inner: R, settings: ReaderSettings) -> Self {
        Self {
            inner,
            lexer: Lexer::new(settings),
            chunk: vec![0; CHUNK_SIZE],
            in_flight: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn token(&self) -> &Token {
        self.lexer.token()
    }

    pub fn depth(&self) -> usize {
        self.lexer.depth()
    }

    pub fn path(&self) -> String {
        self.lexer.path()
    }

    pub fn line_info(&self) -> (usize, usize) {
        self.lexer.line_info()
    }

    pub async fn read(&mut self) -> JsonResult<bool> {
        if self.in_flight {
            return Err(JsonError::Cancelled);
        }
        loop {
            match self.lexer.advance()? {
                Step::Token => return Ok(true),
                Step::End => {
                    debug!("async text reader reached end of content");
                    return Ok(false);
                }
                Step::NeedInput => {
                    self.in_flight = true;
                    let result = self.inner.read(&mut self.chunk).await;
                    self.in_flight = false;
                    match result {
                        Ok(0) => self.lexer.finish_input(),
                        Ok(n) => self.lexer.feed(&self.chunk[..n]),
                        Err(e) if e.kind() == ErrorKind::Interrupted => {}
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> AsyncJsonRead for AsyncJsonTextReader<R> {
    async fn read_async(&mut self) -> JsonResult<bool> {
        self.read().await
    }

    fn current_token(&self) -> &Token {
        self.lexer.token()
    }

    fn current_depth(&self) -> usize {
        self.lexer.depth()
    }

    fn current_path(&self) -> String {
        self.lexer.path()
    }
}
