//! Reader, writer and document configuration, plus the process-wide default
//! slot.
//!
//! The default slot is read by every `new()` constructor; every constructor
//! also has a `with_settings` form that takes an explicit override. Set the
//! default once at startup:
//!
//! ```
//! use json_joy_json_text::settings::{self, Formatting, JsonSettings};
//!
//! let mut s = JsonSettings::default();
//! s.writer.formatting = Formatting::Indented;
//! settings::set_default_settings(s);
//! assert_eq!(settings::default_settings().writer.formatting, Formatting::Indented);
//! # settings::set_default_settings(JsonSettings::default());
//! ```

use std::sync::{OnceLock, RwLock};

/// How comments in the input are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentHandling {
    /// Skip comments silently.
    #[default]
    Ignore,
    /// Surface comments as `Comment` tokens.
    Load,
}

/// Whether date-like strings become `Date` tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateParseHandling {
    /// Keep them as strings.
    None,
    /// Parse into a UTC timestamp.
    #[default]
    DateTime,
    /// Parse into a timestamp that keeps its offset.
    DateTimeOffset,
}

/// Representation of floating literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatParseHandling {
    #[default]
    Double,
    Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderSettings {
    pub comment_handling: CommentHandling,
    pub date_parse_handling: DateParseHandling,
    pub float_parse_handling: FloatParseHandling,
    /// Maximum container nesting; `None` disables the check.
    pub max_depth: Option<usize>,
    /// Read consecutive top-level values from one stream.
    pub support_multiple_content: bool,
    /// Maximum length of an integer literal, sign excluded. Floating
    /// literals are not limited.
    pub max_number_length: usize,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            comment_handling: CommentHandling::default(),
            date_parse_handling: DateParseHandling::default(),
            float_parse_handling: FloatParseHandling::default(),
            max_depth: Some(64),
            support_multiple_content: false,
            max_number_length: 380,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Formatting {
    #[default]
    None,
    Indented,
}

/// Rendering of non-finite floating values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatFormatHandling {
    /// `NaN`, `Infinity`, `-Infinity`.
    #[default]
    Symbol,
    /// A numeric placeholder, `0.0`.
    DefaultValue,
    /// Quoted strings, `"NaN"`.
    String,
    /// Fail the write.
    Error,
}

/// Which characters are escaped in strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringEscapeHandling {
    /// Only the quote character and backslash.
    None,
    /// Control characters, the quote character and backslash.
    #[default]
    Default,
    /// Default plus `<`, `>`, `&`, `'` and `"`.
    EscapeHtml,
    /// Default plus every non-ASCII character.
    EscapeNonAscii,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFormatHandling {
    /// `"2000-01-01T00:00:00Z"`.
    #[default]
    IsoDateFormat,
    /// `"\/Date(946684800000)\/"`.
    MicrosoftDateFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterSettings {
    pub formatting: Formatting,
    pub indent_char: char,
    pub indentation: usize,
    /// `"` or `'`.
    pub quote_char: char,
    pub quote_name: bool,
    pub float_format_handling: FloatFormatHandling,
    pub string_escape_handling: StringEscapeHandling,
    pub date_format_handling: DateFormatHandling,
    /// Close open containers when the writer is closed.
    pub auto_complete_on_close: bool,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            formatting: Formatting::None,
            indent_char: ' ',
            indentation: 2,
            quote_char: '"',
            quote_name: true,
            float_format_handling: FloatFormatHandling::default(),
            string_escape_handling: StringEscapeHandling::default(),
            date_format_handling: DateFormatHandling::default(),
            auto_complete_on_close: true,
        }
    }
}

impl WriterSettings {
    /// Strict, indented, double-quoted canonical form.
    pub fn indented() -> Self {
        Self {
            formatting: Formatting::Indented,
            ..Self::default()
        }
    }
}

/// Object key comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyComparison {
    #[default]
    Ordinal,
    IgnoreCase,
}

impl KeyComparison {
    /// Normalised form of a key under this comparison.
    pub fn normalize(self, key: &str) -> String {
        match self {
            KeyComparison::Ordinal => key.to_owned(),
            KeyComparison::IgnoreCase => key.to_lowercase(),
        }
    }

    pub fn eq(self, a: &str, b: &str) -> bool {
        match self {
            KeyComparison::Ordinal => a == b,
            KeyComparison::IgnoreCase => a == b || a.to_lowercase() == b.to_lowercase(),
        }
    }
}

/// What an object does when a property with an existing key is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePropertyHandling {
    /// The new property takes the existing one's place.
    Replace,
    /// The new property is discarded.
    Ignore,
    /// Fail with a structural error.
    #[default]
    Error,
}

/// Defaults for objects created through the document API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentSettings {
    pub property_name_comparison: KeyComparison,
    pub duplicate_property_handling: DuplicatePropertyHandling,
}

/// Settings applied while materialising a tree from a token source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSettings {
    pub duplicate_property_handling: DuplicatePropertyHandling,
    pub property_name_comparison: KeyComparison,
    /// Record line/column on nodes loaded from a source with line info.
    pub line_info_handling: bool,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            duplicate_property_handling: DuplicatePropertyHandling::Replace,
            property_name_comparison: KeyComparison::Ordinal,
            line_info_handling: true,
        }
    }
}

/// Everything configurable, as held by the default slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JsonSettings {
    pub reader: ReaderSettings,
    pub writer: WriterSettings,
    pub document: DocumentSettings,
    pub load: LoadSettings,
}

static DEFAULT_SETTINGS: OnceLock<RwLock<JsonSettings>> = OnceLock::new();

fn slot() -> &'static RwLock<JsonSettings> {
    DEFAULT_SETTINGS.get_or_init(|| RwLock::new(JsonSettings::default()))
}

/// Replace the process-wide defaults.
pub fn set_default_settings(settings: JsonSettings) {
    let mut guard = match slot().write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = settings;
}

/// Snapshot of the process-wide defaults.
pub fn default_settings() -> JsonSettings {
    match slot().read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_comparison_normalizes() {
        assert_eq!(KeyComparison::Ordinal.normalize("Ab"), "Ab");
        assert_eq!(KeyComparison::IgnoreCase.normalize("Ab"), "ab");
        assert!(KeyComparison::IgnoreCase.eq("ABC", "abc"));
        assert!(!KeyComparison::Ordinal.eq("ABC", "abc"));
    }

    #[test]
    fn reader_defaults() {
        let s = ReaderSettings::default();
        assert_eq!(s.max_number_length, 380);
        assert_eq!(s.max_depth, Some(64));
        assert!(!s.support_multiple_content);
    }
}
