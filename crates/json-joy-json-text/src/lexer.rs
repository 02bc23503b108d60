//! Sans-IO tokenizer for the JSON superset.
//!
//! The lexer owns a byte buffer that callers [`feed`](Lexer::feed). Each
//! [`advance`](Lexer::advance) either produces one token, reports that more
//! input is needed, or reports the end of content. A token is scanned from a
//! scratch cursor and only committed once complete, so running out of input
//! never leaves the lexer mid-token: the caller refills and retries.
//!
//! Accepted on top of strict JSON: single-quoted strings, unquoted keys,
//! `//` and `/* */` comments, `undefined`, `NaN`, `Infinity`, `-Infinity`,
//! hexadecimal integers, trailing commas and `new Name(args)` constructors.

use std::str::FromStr;

use chrono::Utc;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::ParseError;
use crate::format::parse_date;
use crate::path::{FrameKind, PathState};
use crate::settings::{CommentHandling, DateParseHandling, FloatParseHandling, ReaderSettings};
use crate::token::{Token, TokenKind};
use crate::value::Primitive;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Result of one [`Lexer::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A token is available through [`Lexer::token`].
    Token,
    /// The buffered input ends inside a token; feed more and retry.
    NeedInput,
    /// No more content.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    RootValue,
    AfterRoot,
    ObjectFirstKey,
    ObjectKey,
    PropertyValue,
    AfterObjectValue,
    ArrayFirst,
    ArrayValue,
    AfterArrayValue,
    ConstructorFirst,
    ConstructorValue,
    AfterConstructorValue,
}

#[derive(Debug, Clone, Copy)]
struct Cur {
    x: usize,
    line: usize,
    column: usize,
    after_cr: bool,
}

enum Halt {
    Incomplete,
    Error(ParseError),
}

impl From<ParseError> for Halt {
    fn from(e: ParseError) -> Self {
        Halt::Error(e)
    }
}

type Scan<T> = Result<T, Halt>;

fn bump(c: &mut Cur, b: u8) {
    c.x += 1;
    match b {
        b'\r' => {
            c.line += 1;
            c.column = 0;
            c.after_cr = true;
        }
        b'\n' => {
            if !c.after_cr {
                c.line += 1;
                c.column = 0;
            }
            c.after_cr = false;
        }
        _ => {
            c.after_cr = false;
            // Count characters, not UTF-8 continuation bytes.
            if b & 0xC0 != 0x80 {
                c.column += 1;
            }
        }
    }
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C)
}

fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn is_number_delimiter(b: u8) -> bool {
    is_whitespace(b) || matches!(b, b',' | b']' | b'}' | b')' | b'/')
}

pub struct Lexer {
    settings: ReaderSettings,
    buf: Vec<u8>,
    eof: bool,
    cur: Cur,
    expect: Expect,
    path: PathState,
    token: Token,
    depth: usize,
    bom_checked: bool,
    failed: Option<ParseError>,
}

impl Lexer {
    pub fn new(settings: ReaderSettings) -> Self {
        Self {
            settings,
            buf: Vec::new(),
            eof: false,
            cur: Cur {
                x: 0,
                line: 1,
                column: 0,
                after_cr: false,
            },
            expect: Expect::RootValue,
            path: PathState::new(),
            token: Token::NONE,
            depth: 0,
            bom_checked: false,
            failed: None,
        }
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    /// Append input bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.cur.x > 0 && self.cur.x * 2 >= self.buf.len() {
            self.buf.drain(..self.cur.x);
            self.cur.x = 0;
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Declare that no more input will be fed.
    pub fn finish_input(&mut self) {
        self.eof = true;
    }

    pub fn is_input_finished(&self) -> bool {
        self.eof
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn path(&self) -> String {
        self.path.path()
    }

    /// 1-based line and the number of characters consumed on it.
    pub fn line_info(&self) -> (usize, usize) {
        (self.cur.line, self.cur.column)
    }

    pub fn advance(&mut self) -> Result<Step, ParseError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        match self.step() {
            Ok(Step::End) => {
                self.token = Token::NONE;
                self.depth = 0;
                Ok(Step::End)
            }
            Ok(step) => Ok(step),
            Err(Halt::Incomplete) => Ok(Step::NeedInput),
            Err(Halt::Error(e)) => {
                self.failed = Some(e.clone());
                Err(e)
            }
        }
    }

    fn error_at(&self, c: &Cur, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            line: c.line,
            column: c.column + 1,
            path: self.path.path(),
        }
    }

    fn unexpected_end(&self, c: &Cur) -> Halt {
        Halt::Error(self.error_at(c, "Unexpected end when reading JSON."))
    }

    fn peek_at(&self, c: &Cur, offset: usize) -> Scan<Option<u8>> {
        match self.buf.get(c.x + offset) {
            Some(&b) => Ok(Some(b)),
            None if self.eof => Ok(None),
            None => Err(Halt::Incomplete),
        }
    }

    fn peek(&self, c: &Cur) -> Scan<Option<u8>> {
        self.peek_at(c, 0)
    }

    /// The (possibly multi-byte) character at `c`, for messages.
    fn char_at(&self, c: &Cur) -> char {
        let end = (c.x + 4).min(self.buf.len());
        String::from_utf8_lossy(&self.buf[c.x..end])
            .chars()
            .next()
            .unwrap_or('\u{FFFD}')
    }

    fn step(&mut self) -> Scan<Step> {
        if !self.bom_checked {
            self.skip_bom()?;
        }
        loop {
            if self.skip_trivia()? {
                return Ok(Step::Token);
            }
            let c = self.cur;
            let b = self.peek(&c)?;
            match self.expect {
                Expect::RootValue => match b {
                    None => return Ok(Step::End),
                    Some(_) => return self.scan_value(),
                },
                Expect::AfterRoot => match b {
                    None => return Ok(Step::End),
                    Some(_) if self.settings.support_multiple_content => {
                        self.expect = Expect::RootValue;
                    }
                    Some(_) => {
                        let ch = self.char_at(&c);
                        return Err(self
                            .error_at(
                                &c,
                                format!(
                                    "Additional text encountered after finished reading JSON content: {ch}."
                                ),
                            )
                            .into());
                    }
                },
                Expect::ArrayFirst | Expect::ArrayValue => match b {
                    None => return Err(self.unexpected_end(&c)),
                    Some(b']') => return Ok(self.end_container(TokenKind::EndArray)),
                    Some(b',') => return Err(self.unexpected_char(&c, "parsing value")),
                    Some(_) => return self.scan_value(),
                },
                Expect::AfterArrayValue => match b {
                    None => return Err(self.unexpected_end(&c)),
                    Some(b',') => self.consume_delimiter(Expect::ArrayValue),
                    Some(b']') => return Ok(self.end_container(TokenKind::EndArray)),
                    Some(_) => return Err(self.after_value_error(&c)),
                },
                Expect::ConstructorFirst | Expect::ConstructorValue => match b {
                    None => return Err(self.unexpected_end(&c)),
                    Some(b')') => return Ok(self.end_container(TokenKind::EndConstructor)),
                    Some(b',') => return Err(self.unexpected_char(&c, "parsing value")),
                    Some(_) => return self.scan_value(),
                },
                Expect::AfterConstructorValue => match b {
                    None => return Err(self.unexpected_end(&c)),
                    Some(b',') => self.consume_delimiter(Expect::ConstructorValue),
                    Some(b')') => return Ok(self.end_container(TokenKind::EndConstructor)),
                    Some(_) => return Err(self.after_value_error(&c)),
                },
                Expect::ObjectFirstKey | Expect::ObjectKey => match b {
                    None => return Err(self.unexpected_end(&c)),
                    Some(b'}') => return Ok(self.end_container(TokenKind::EndObject)),
                    Some(_) => return self.scan_property_name(),
                },
                Expect::PropertyValue => match b {
                    None => return Err(self.unexpected_end(&c)),
                    Some(_) => return self.scan_value(),
                },
                Expect::AfterObjectValue => match b {
                    None => return Err(self.unexpected_end(&c)),
                    Some(b',') => self.consume_delimiter(Expect::ObjectKey),
                    Some(b'}') => return Ok(self.end_container(TokenKind::EndObject)),
                    Some(_) => return Err(self.after_value_error(&c)),
                },
            }
        }
    }

    fn unexpected_char(&self, c: &Cur, context: &str) -> Halt {
        let ch = self.char_at(c);
        Halt::Error(self.error_at(
            c,
            format!("Unexpected character encountered while {context}: {ch}."),
        ))
    }

    fn after_value_error(&self, c: &Cur) -> Halt {
        let ch = self.char_at(c);
        Halt::Error(self.error_at(
            c,
            format!("After parsing a value an unexpected character was encountered: {ch}."),
        ))
    }

    fn consume_delimiter(&mut self, next: Expect) {
        let mut c = self.cur;
        bump(&mut c, b',');
        self.cur = c;
        self.expect = next;
    }

    fn skip_bom(&mut self) -> Scan<()> {
        let available = self.buf.len() - self.cur.x;
        let n = available.min(BOM.len());
        if self.buf[self.cur.x..self.cur.x + n] == BOM[..n] {
            if n < BOM.len() {
                if !self.eof {
                    return Err(Halt::Incomplete);
                }
            } else {
                self.cur.x += BOM.len();
            }
        }
        self.bom_checked = true;
        Ok(())
    }

    /// Skip whitespace and comments, committing as it goes. Returns `true`
    /// when a comment token was produced.
    fn skip_trivia(&mut self) -> Scan<bool> {
        loop {
            let mut c = self.cur;
            match self.peek(&c)? {
                Some(b) if is_whitespace(b) => {
                    bump(&mut c, b);
                    self.cur = c;
                }
                Some(b'/') => {
                    let text = self.scan_comment(&mut c)?;
                    self.cur = c;
                    if self.settings.comment_handling == CommentHandling::Load {
                        self.token = Token::comment(text);
                        self.depth = self.path.depth();
                        return Ok(true);
                    }
                }
                _ => return Ok(false),
            }
        }
    }

    fn scan_comment(&self, c: &mut Cur) -> Scan<String> {
        let start = *c;
        bump(c, b'/');
        let mut text = Vec::new();
        match self.peek(c)? {
            Some(b'/') => {
                bump(c, b'/');
                while let Some(b) = self.peek(c)? {
                    if b == b'\n' || b == b'\r' {
                        break;
                    }
                    bump(c, b);
                    text.push(b);
                }
            }
            Some(b'*') => {
                bump(c, b'*');
                loop {
                    match self.peek(c)? {
                        None => {
                            return Err(self
                                .error_at(c, "Unexpected end while parsing comment.")
                                .into())
                        }
                        Some(b'*') if self.peek_at(c, 1)? == Some(b'/') => {
                            bump(c, b'*');
                            bump(c, b'/');
                            break;
                        }
                        Some(b) => {
                            bump(c, b);
                            text.push(b);
                        }
                    }
                }
            }
            Some(_) => {
                let ch = self.char_at(c);
                return Err(self
                    .error_at(c, format!("Error parsing comment. Expected: *, got {ch}."))
                    .into());
            }
            None => {
                return Err(self
                    .error_at(&start, "Unexpected end while parsing comment.")
                    .into())
            }
        }
        String::from_utf8(text)
            .map_err(|_| Halt::Error(self.error_at(&start, "Invalid UTF-8 sequence in comment.")))
    }

    fn after_value(&mut self) {
        self.expect = match self.path.current_kind() {
            None => Expect::AfterRoot,
            Some(FrameKind::Object) => Expect::AfterObjectValue,
            Some(FrameKind::Array) => Expect::AfterArrayValue,
            Some(FrameKind::Constructor) => Expect::AfterConstructorValue,
        };
    }

    fn end_container(&mut self, kind: TokenKind) -> Step {
        let mut c = self.cur;
        let b = match kind {
            TokenKind::EndObject => b'}',
            TokenKind::EndArray => b']',
            _ => b')',
        };
        bump(&mut c, b);
        self.cur = c;
        self.path.pop();
        self.depth = self.path.depth();
        self.token = Token::new(kind);
        self.after_value();
        Step::Token
    }

    fn start_container(&mut self, c: Cur, start: &Cur, kind: FrameKind, token: Token) -> Scan<Step> {
        self.path.before_value();
        if let Some(max) = self.settings.max_depth {
            if self.path.depth() + 1 > max {
                return Err(self
                    .error_at(start, format!("The reader's MaxDepth of {max} has been exceeded."))
                    .into());
            }
        }
        self.depth = self.path.depth();
        self.path.push(kind);
        self.token = token;
        self.cur = c;
        self.expect = match kind {
            FrameKind::Object => Expect::ObjectFirstKey,
            FrameKind::Array => Expect::ArrayFirst,
            FrameKind::Constructor => Expect::ConstructorFirst,
        };
        Ok(Step::Token)
    }

    fn emit_value(&mut self, c: Cur, value: Primitive) -> Scan<Step> {
        self.path.before_value();
        self.depth = self.path.depth();
        self.token = Token::primitive(value);
        self.cur = c;
        self.after_value();
        Ok(Step::Token)
    }

    fn scan_value(&mut self) -> Scan<Step> {
        let start = self.cur;
        let mut c = start;
        let Some(b) = self.peek(&c)? else {
            return Err(self.unexpected_end(&c));
        };
        match b {
            b'{' => {
                bump(&mut c, b);
                self.start_container(c, &start, FrameKind::Object, Token::start_object())
            }
            b'[' => {
                bump(&mut c, b);
                self.start_container(c, &start, FrameKind::Array, Token::start_array())
            }
            b'"' | b'\'' => {
                bump(&mut c, b);
                let s = self.scan_string(&mut c, b)?;
                let value = self.string_value(s);
                self.emit_value(c, value)
            }
            b'-' | b'0'..=b'9' => {
                let lit = self.scan_number_literal(&mut c)?;
                let value = self.number_value(&lit, &start)?;
                self.emit_value(c, value)
            }
            b if b.is_ascii_alphabetic() => {
                let word = self.scan_ident(&mut c)?;
                let value = match word.as_str() {
                    "true" => Primitive::Boolean(true),
                    "false" => Primitive::Boolean(false),
                    "null" => Primitive::Null,
                    "undefined" => Primitive::Undefined,
                    "NaN" => Primitive::Float(f64::NAN),
                    "Infinity" => Primitive::Float(f64::INFINITY),
                    "new" => return self.scan_constructor(c, &start),
                    _ => return Err(self.unexpected_char(&start, "parsing value")),
                };
                self.emit_value(c, value)
            }
            _ => Err(self.unexpected_char(&start, "parsing value")),
        }
    }

    fn scan_ident(&self, c: &mut Cur) -> Scan<String> {
        let mut word = String::new();
        while let Some(b) = self.peek(c)? {
            if !is_ident(b) {
                break;
            }
            bump(c, b);
            word.push(char::from(b));
        }
        Ok(word)
    }

    fn scan_constructor(&mut self, mut c: Cur, start: &Cur) -> Scan<Step> {
        let mut saw_space = false;
        while let Some(b) = self.peek(&c)? {
            if !is_whitespace(b) {
                break;
            }
            bump(&mut c, b);
            saw_space = true;
        }
        let name = self.scan_ident(&mut c)?;
        if !saw_space || name.is_empty() {
            return match self.peek(&c)? {
                None => Err(self.unexpected_end(&c)),
                Some(_) => Err(self.unexpected_char(&c, "parsing constructor")),
            };
        }
        while let Some(b) = self.peek(&c)? {
            if !is_whitespace(b) {
                break;
            }
            bump(&mut c, b);
        }
        match self.peek(&c)? {
            Some(b'(') => bump(&mut c, b'('),
            None => return Err(self.unexpected_end(&c)),
            Some(_) => return Err(self.unexpected_char(&c, "parsing constructor")),
        }
        self.start_container(c, start, FrameKind::Constructor, Token::start_constructor(name))
    }

    fn scan_property_name(&mut self) -> Scan<Step> {
        let start = self.cur;
        let mut c = start;
        let name = match self.peek(&c)? {
            Some(q @ (b'"' | b'\'')) => {
                bump(&mut c, q);
                self.scan_string(&mut c, q)?
            }
            Some(b) if is_ident(b) => self.scan_ident(&mut c)?,
            Some(_) => {
                let ch = self.char_at(&c);
                return Err(self
                    .error_at(&c, format!("Invalid property identifier character: {ch}."))
                    .into());
            }
            None => return Err(self.unexpected_end(&c)),
        };
        while let Some(b) = self.peek(&c)? {
            if !is_whitespace(b) {
                break;
            }
            bump(&mut c, b);
        }
        match self.peek(&c)? {
            Some(b':') => bump(&mut c, b':'),
            None => return Err(self.unexpected_end(&c)),
            Some(_) => {
                let ch = self.char_at(&c);
                return Err(self
                    .error_at(
                        &c,
                        format!(
                            "Invalid character after parsing property name. Expected ':' but got: {ch}."
                        ),
                    )
                    .into());
            }
        }
        self.path.set_property(&name);
        self.depth = self.path.depth();
        self.token = Token::property_name(name);
        self.cur = c;
        self.expect = Expect::PropertyValue;
        Ok(Step::Token)
    }

    fn scan_string(&self, c: &mut Cur, quote: u8) -> Scan<String> {
        let start = *c;
        let mut out: Vec<u8> = Vec::new();
        loop {
            let Some(b) = self.peek(c)? else {
                return Err(self
                    .error_at(
                        c,
                        format!(
                            "Unterminated string. Expected delimiter: {}.",
                            char::from(quote)
                        ),
                    )
                    .into());
            };
            bump(c, b);
            if b == quote {
                break;
            }
            if b != b'\\' {
                out.push(b);
                continue;
            }
            let Some(e) = self.peek(c)? else {
                return Err(self
                    .error_at(c, "Unterminated string. Expected escape sequence.")
                    .into());
            };
            bump(c, e);
            match e {
                b'"' | b'\'' | b'\\' | b'/' => out.push(e),
                b'b' => out.push(0x08),
                b'f' => out.push(0x0C),
                b'n' => out.push(b'\n'),
                b'r' => out.push(b'\r'),
                b't' => out.push(b'\t'),
                b'u' => {
                    let ch = self.scan_unicode_escape(c)?;
                    let mut tmp = [0u8; 4];
                    out.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
                }
                _ => {
                    return Err(self
                        .error_at(c, format!("Bad JSON escape sequence: \\{}.", char::from(e)))
                        .into())
                }
            }
        }
        String::from_utf8(out)
            .map_err(|_| Halt::Error(self.error_at(&start, "Invalid UTF-8 sequence in string.")))
    }

    fn scan_hex4(&self, c: &mut Cur) -> Scan<u32> {
        let mut value = 0u32;
        for _ in 0..4 {
            let Some(b) = self.peek(c)? else {
                return Err(self
                    .error_at(c, "Unexpected end while parsing Unicode escape sequence.")
                    .into());
            };
            let digit = char::from(b).to_digit(16).ok_or_else(|| {
                Halt::Error(self.error_at(c, "Invalid Unicode escape sequence."))
            })?;
            bump(c, b);
            value = value * 16 + digit;
        }
        Ok(value)
    }

    fn scan_unicode_escape(&self, c: &mut Cur) -> Scan<char> {
        let hi = self.scan_hex4(c)?;
        if (0xD800..0xDC00).contains(&hi)
            && self.peek(c)? == Some(b'\\')
            && self.peek_at(c, 1)? == Some(b'u')
        {
            let save = *c;
            bump(c, b'\\');
            bump(c, b'u');
            let lo = self.scan_hex4(c)?;
            if (0xDC00..0xE000).contains(&lo) {
                let code = 0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00);
                return Ok(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            *c = save;
        }
        Ok(char::from_u32(hi).unwrap_or('\u{FFFD}'))
    }

    fn string_value(&self, s: String) -> Primitive {
        let handling = self.settings.date_parse_handling;
        if handling != DateParseHandling::None && (s.len() >= 16 || s.starts_with("/Date(")) {
            if let Some(d) = parse_date(&s) {
                return match handling {
                    DateParseHandling::DateTimeOffset => Primitive::DateOffset(d),
                    _ => Primitive::Date(d.with_timezone(&Utc)),
                };
            }
        }
        Primitive::String(s)
    }

    fn scan_number_literal(&self, c: &mut Cur) -> Scan<String> {
        let mut lit = String::new();
        while let Some(b) = self.peek(c)? {
            if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'+' | b'-') {
                bump(c, b);
                lit.push(char::from(b));
            } else if is_number_delimiter(b) {
                break;
            } else {
                return Err(self.unexpected_char(c, "parsing number"));
            }
        }
        Ok(lit)
    }

    fn number_value(&self, lit: &str, start: &Cur) -> Scan<Primitive> {
        let invalid =
            || Halt::Error(self.error_at(start, format!("Input string '{lit}' is not a valid number.")));
        if lit == "-Infinity" {
            return Ok(Primitive::Float(f64::NEG_INFINITY));
        }
        let (negative, body) = match lit.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, lit),
        };
        let is_float = !body.starts_with("0x")
            && !body.starts_with("0X")
            && body.contains(['.', 'e', 'E']);
        if !is_float && body.len() > self.settings.max_number_length {
            return Err(self
                .error_at(start, format!("JSON integer {lit} is too large to parse."))
                .into());
        }
        if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
            let mut big = BigInt::parse_bytes(hex.as_bytes(), 16).ok_or_else(invalid)?;
            if negative {
                big = -big;
            }
            return Ok(match big.to_i64() {
                Some(i) => Primitive::Integer(i),
                None => Primitive::BigInteger(big),
            });
        }
        if !is_valid_decimal_literal(body) {
            return Err(invalid());
        }
        if !is_float {
            return Ok(match lit.parse::<i64>() {
                Ok(i) => Primitive::Integer(i),
                Err(_) => Primitive::BigInteger(BigInt::from_str(lit).map_err(|_| invalid())?),
            });
        }
        match self.settings.float_parse_handling {
            FloatParseHandling::Double => lit
                .parse::<f64>()
                .map(Primitive::Float)
                .map_err(|_| invalid()),
            FloatParseHandling::Decimal => {
                let parsed = if lit.contains(['e', 'E']) {
                    Decimal::from_scientific(lit)
                } else {
                    Decimal::from_str(lit)
                };
                parsed.map(Primitive::Decimal).map_err(|_| {
                    Halt::Error(
                        self.error_at(start, format!("Input string '{lit}' is not a valid decimal.")),
                    )
                })
            }
        }
    }
}

/// `(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?`
fn is_valid_decimal_literal(body: &str) -> bool {
    let b = body.as_bytes();
    let digits = |mut i: usize| {
        let from = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        (i, i > from)
    };
    let mut i = match b.first() {
        Some(b'0') => {
            if b.get(1).is_some_and(u8::is_ascii_digit) {
                return false;
            }
            1
        }
        Some(d) if d.is_ascii_digit() => digits(0).0,
        _ => return false,
    };
    if b.get(i) == Some(&b'.') {
        let (next, any) = digits(i + 1);
        if !any {
            return false;
        }
        i = next;
    }
    if matches!(b.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(b.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let (next, any) = digits(i);
        if !any {
            return false;
        }
        i = next;
    }
    i == b.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(input: &str, settings: ReaderSettings) -> Result<Vec<Token>, ParseError> {
        let mut lexer = Lexer::new(settings);
        lexer.feed(input.as_bytes());
        lexer.finish_input();
        let mut out = Vec::new();
        loop {
            match lexer.advance()? {
                Step::Token => out.push(lexer.token().clone()),
                Step::End => return Ok(out),
                Step::NeedInput => unreachable!("input is finished"),
            }
        }
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex_all(input, ReaderSettings::default())
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn strict_json() {
        use TokenKind::*;
        assert_eq!(
            kinds(r#"{"a":[1,2.5,"x",true,null]}"#),
            vec![StartObject, PropertyName, StartArray, Integer, Float, String, Boolean, Null, EndArray, EndObject]
        );
    }

    #[test]
    fn superset_literals() {
        let tokens = lex_all(
            "{a:'b', c:undefined, d:NaN, e:-Infinity, f:0x1F, g:new Date(1,2),}",
            ReaderSettings::default(),
        )
        .unwrap();
        let values: Vec<_> = tokens.iter().filter_map(|t| t.value.clone()).collect();
        assert_eq!(values[1], Primitive::String("b".into()));
        assert_eq!(values[3], Primitive::Undefined);
        assert!(matches!(values[5], Primitive::Float(f) if f.is_nan()));
        assert_eq!(values[7], Primitive::Float(f64::NEG_INFINITY));
        assert_eq!(values[9], Primitive::Integer(31));
        assert_eq!(tokens[12].kind, TokenKind::StartConstructor);
        assert_eq!(tokens[12].text(), Some("Date"));
    }

    #[test]
    fn feeding_byte_by_byte_matches_whole_input() {
        let input = "{\"name\": \"h\u{e9}llo\\u0021\", 'n': [12345, -0.5e3], /*c*/ \"t\": true}";
        let whole = lex_all(input, ReaderSettings::default()).unwrap();
        let mut lexer = Lexer::new(ReaderSettings::default());
        let mut pieces = Vec::new();
        let bytes = input.as_bytes();
        let mut fed = 0;
        loop {
            match lexer.advance().unwrap() {
                Step::Token => pieces.push(lexer.token().clone()),
                Step::End => break,
                Step::NeedInput => {
                    if fed < bytes.len() {
                        lexer.feed(&bytes[fed..fed + 1]);
                        fed += 1;
                    } else {
                        lexer.finish_input();
                    }
                }
            }
        }
        assert_eq!(pieces, whole);
    }

    #[test]
    fn surrogate_pairs_combine() {
        let tokens = lex_all(r#"["😀", "\ud800x"]"#, ReaderSettings::default()).unwrap();
        assert_eq!(tokens[1].text(), Some("\u{1F600}"));
        assert_eq!(tokens[2].text(), Some("\u{FFFD}x"));
    }

    #[test]
    fn big_integers_promote() {
        let tokens = lex_all("[9223372036854775808]", ReaderSettings::default()).unwrap();
        assert!(matches!(tokens[1].value, Some(Primitive::BigInteger(_))));
    }

    #[test]
    fn number_grammar_errors() {
        for bad in ["[01]", "[1.]", "[1e]", "[-]", "[1.2.3]", "[0x]"] {
            assert!(lex_all(bad, ReaderSettings::default()).is_err(), "{bad}");
        }
    }

    #[test]
    fn decimal_float_handling() {
        let settings = ReaderSettings {
            float_parse_handling: FloatParseHandling::Decimal,
            ..ReaderSettings::default()
        };
        let tokens = lex_all("[1.10, 2e2]", settings).unwrap();
        assert_eq!(tokens[1].value, Some(Primitive::Decimal(Decimal::from_str("1.10").unwrap())));
        assert_eq!(tokens[2].value, Some(Primitive::Decimal(Decimal::from(200))));
    }

    #[test]
    fn dates_are_detected() {
        let tokens = lex_all(r#"["2000-01-01T00:00:00Z", "\/Date(0)\/"]"#, ReaderSettings::default())
            .unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Date);
        assert_eq!(tokens[2].kind, TokenKind::Date);
        let settings = ReaderSettings {
            date_parse_handling: DateParseHandling::None,
            ..ReaderSettings::default()
        };
        let tokens = lex_all(r#"["2000-01-01T00:00:00Z"]"#, settings).unwrap();
        assert_eq!(tokens[1].kind, TokenKind::String);
    }

    #[test]
    fn max_depth_is_enforced() {
        let settings = ReaderSettings {
            max_depth: Some(2),
            ..ReaderSettings::default()
        };
        assert!(lex_all("[[1]]", settings.clone()).is_ok());
        let err = lex_all("[[[1]]]", settings).unwrap_err();
        assert!(err.message.contains("MaxDepth of 2"));
        assert_eq!(err.column, 3);
    }

    #[test]
    fn additional_content_is_an_error() {
        let err = lex_all("{} {}", ReaderSettings::default()).unwrap_err();
        assert!(err.message.starts_with("Additional text"));
        let settings = ReaderSettings {
            support_multiple_content: true,
            ..ReaderSettings::default()
        };
        assert_eq!(lex_all("{} [] 1", settings).unwrap().len(), 5);
    }

    #[test]
    fn bom_is_skipped() {
        let mut lexer = Lexer::new(ReaderSettings::default());
        lexer.feed(b"\xEF\xBB\xBF[1]");
        lexer.finish_input();
        assert_eq!(lexer.advance().unwrap(), Step::Token);
        assert_eq!(lexer.token().kind, TokenKind::StartArray);
    }

    #[test]
    fn error_positions_are_one_based() {
        let err = lex_all("{\n  \"a\": x\n}", ReaderSettings::default()).unwrap_err();
        assert_eq!((err.line, err.column), (2, 8));
        assert_eq!(err.path, "a");
    }

    #[test]
    fn trailing_commas_but_no_holes() {
        assert!(lex_all("[1,2,]", ReaderSettings::default()).is_ok());
        assert!(lex_all("{\"a\":1,}", ReaderSettings::default()).is_ok());
        assert!(lex_all("[1,,2]", ReaderSettings::default()).is_err());
    }

    #[test]
    fn literal_grammar() {
        assert!(is_valid_decimal_literal("0"));
        assert!(is_valid_decimal_literal("10.25e-3"));
        assert!(!is_valid_decimal_literal("00"));
        assert!(!is_valid_decimal_literal(".5"));
    }
}
