//! [`Primitive`]: the closed scalar union carried by value tokens and value
//! nodes.
//!
//! Equality between primitives ([`Primitive::value_equals`]) works within a
//! numeric *family*:
//!
//! | Family  | Members                                   | Comparison                       |
//! |---------|-------------------------------------------|----------------------------------|
//! | integer | `Integer`, `UInteger`, `BigInteger`       | mathematical value               |
//! | float   | `Float`, `Decimal`                        | decimal equality if either side is a decimal, else `f64` (NaN equals NaN) |
//! | date    | `Date`, `DateOffset`                      | same instant                     |
//!
//! Values from different families are never equal, so `Decimal(1)` is not
//! equal to `Integer(1)`.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use num_bigint::BigInt;
use num_traits::FromPrimitive as _;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::hash;
use crate::token::TokenKind;

/// Scalar value stored in value tokens and value nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Null,
    Undefined,
    Boolean(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// Unsigned 64-bit integer.
    UInteger(u64),
    /// Arbitrary-precision integer.
    BigInteger(BigInt),
    Float(f64),
    /// High-precision decimal.
    Decimal(Decimal),
    String(String),
    /// Timestamp normalised to UTC.
    Date(DateTime<Utc>),
    /// Timestamp keeping its UTC offset.
    DateOffset(DateTime<FixedOffset>),
    Bytes(Vec<u8>),
    Guid(Uuid),
    /// URI reference, absolute or relative.
    Uri(String),
    /// Duration interval.
    TimeSpan(chrono::Duration),
    Comment(String),
    /// Pre-formatted text written verbatim.
    Raw(String),
}

/// Discriminant of a [`Primitive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Undefined,
    Boolean,
    Integer,
    UInteger,
    BigInteger,
    Float,
    Decimal,
    String,
    Date,
    DateOffset,
    Bytes,
    Guid,
    Uri,
    TimeSpan,
    Comment,
    Raw,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "Null",
            ValueKind::Undefined => "Undefined",
            ValueKind::Boolean => "Boolean",
            ValueKind::Integer => "Integer",
            ValueKind::UInteger => "UInteger",
            ValueKind::BigInteger => "BigInteger",
            ValueKind::Float => "Float",
            ValueKind::Decimal => "Decimal",
            ValueKind::String => "String",
            ValueKind::Date => "Date",
            ValueKind::DateOffset => "DateOffset",
            ValueKind::Bytes => "Bytes",
            ValueKind::Guid => "Guid",
            ValueKind::Uri => "Uri",
            ValueKind::TimeSpan => "TimeSpan",
            ValueKind::Comment => "Comment",
            ValueKind::Raw => "Raw",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Primitive {
    pub fn kind(&self) -> ValueKind {
        match self {
            Primitive::Null => ValueKind::Null,
            Primitive::Undefined => ValueKind::Undefined,
            Primitive::Boolean(_) => ValueKind::Boolean,
            Primitive::Integer(_) => ValueKind::Integer,
            Primitive::UInteger(_) => ValueKind::UInteger,
            Primitive::BigInteger(_) => ValueKind::BigInteger,
            Primitive::Float(_) => ValueKind::Float,
            Primitive::Decimal(_) => ValueKind::Decimal,
            Primitive::String(_) => ValueKind::String,
            Primitive::Date(_) => ValueKind::Date,
            Primitive::DateOffset(_) => ValueKind::DateOffset,
            Primitive::Bytes(_) => ValueKind::Bytes,
            Primitive::Guid(_) => ValueKind::Guid,
            Primitive::Uri(_) => ValueKind::Uri,
            Primitive::TimeSpan(_) => ValueKind::TimeSpan,
            Primitive::Comment(_) => ValueKind::Comment,
            Primitive::Raw(_) => ValueKind::Raw,
        }
    }

    /// The token kind a reader reports for this value.
    pub fn token_kind(&self) -> TokenKind {
        match self {
            Primitive::Null => TokenKind::Null,
            Primitive::Undefined => TokenKind::Undefined,
            Primitive::Boolean(_) => TokenKind::Boolean,
            Primitive::Integer(_) | Primitive::UInteger(_) | Primitive::BigInteger(_) => {
                TokenKind::Integer
            }
            Primitive::Float(_) | Primitive::Decimal(_) => TokenKind::Float,
            Primitive::String(_)
            | Primitive::Guid(_)
            | Primitive::Uri(_)
            | Primitive::TimeSpan(_) => TokenKind::String,
            Primitive::Date(_) | Primitive::DateOffset(_) => TokenKind::Date,
            Primitive::Bytes(_) => TokenKind::Bytes,
            Primitive::Comment(_) => TokenKind::Comment,
            Primitive::Raw(_) => TokenKind::Raw,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Primitive::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Primitive::String(s) | Primitive::Uri(s) | Primitive::Comment(s) | Primitive::Raw(s) => {
                Some(s)
            }
            _ => None,
        }
    }

    /// Integer-family value as a big integer.
    pub fn as_big_integer(&self) -> Option<BigInt> {
        match self {
            Primitive::Integer(i) => Some(BigInt::from(*i)),
            Primitive::UInteger(u) => Some(BigInt::from(*u)),
            Primitive::BigInteger(b) => Some(b.clone()),
            _ => None,
        }
    }

    fn family(&self) -> Family {
        match self {
            Primitive::Null => Family::Null,
            Primitive::Undefined => Family::Undefined,
            Primitive::Boolean(_) => Family::Boolean,
            Primitive::Integer(_) | Primitive::UInteger(_) | Primitive::BigInteger(_) => {
                Family::Integer
            }
            Primitive::Float(_) | Primitive::Decimal(_) => Family::Float,
            Primitive::String(_) => Family::String,
            Primitive::Date(_) | Primitive::DateOffset(_) => Family::Date,
            Primitive::Bytes(_) => Family::Bytes,
            Primitive::Guid(_) => Family::Guid,
            Primitive::Uri(_) => Family::Uri,
            Primitive::TimeSpan(_) => Family::TimeSpan,
            Primitive::Comment(_) => Family::Comment,
            Primitive::Raw(_) => Family::Raw,
        }
    }

    /// Structural value equality.
    pub fn value_equals(&self, other: &Primitive) -> bool {
        if self.family() != other.family() {
            return false;
        }
        match (self, other) {
            (Primitive::Null, Primitive::Null) | (Primitive::Undefined, Primitive::Undefined) => {
                true
            }
            (Primitive::Boolean(a), Primitive::Boolean(b)) => a == b,
            (Primitive::Integer(a), Primitive::Integer(b)) => a == b,
            (Primitive::UInteger(a), Primitive::UInteger(b)) => a == b,
            (Primitive::Integer(a), Primitive::UInteger(b))
            | (Primitive::UInteger(b), Primitive::Integer(a)) => i128::from(*a) == i128::from(*b),
            (a, b) if a.family() == Family::Integer => a.as_big_integer() == b.as_big_integer(),
            (Primitive::Float(a), Primitive::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Primitive::Decimal(a), Primitive::Decimal(b)) => a == b,
            (Primitive::Float(f), Primitive::Decimal(d))
            | (Primitive::Decimal(d), Primitive::Float(f)) => {
                Decimal::from_f64(*f).is_some_and(|x| x == *d)
            }
            (Primitive::String(a), Primitive::String(b))
            | (Primitive::Uri(a), Primitive::Uri(b))
            | (Primitive::Comment(a), Primitive::Comment(b))
            | (Primitive::Raw(a), Primitive::Raw(b)) => a == b,
            (Primitive::Date(a), Primitive::Date(b)) => a == b,
            (Primitive::DateOffset(a), Primitive::DateOffset(b)) => a == b,
            (Primitive::Date(a), Primitive::DateOffset(b))
            | (Primitive::DateOffset(b), Primitive::Date(a)) => *a == b.with_timezone(&Utc),
            (Primitive::Bytes(a), Primitive::Bytes(b)) => a == b,
            (Primitive::Guid(a), Primitive::Guid(b)) => a == b,
            (Primitive::TimeSpan(a), Primitive::TimeSpan(b)) => a == b,
            _ => false,
        }
    }

    /// Mix this value into a hash state, consistent with [`value_equals`](Self::value_equals).
    pub fn hash_into(&self, state: u64) -> u64 {
        match self {
            Primitive::Null => hash::update_num(state, hash::NULL_CONST),
            Primitive::Undefined => hash::update_num(state, hash::UNDEFINED_CONST),
            Primitive::Boolean(b) => hash::update_num(
                state,
                if *b {
                    hash::TRUE_CONST
                } else {
                    hash::FALSE_CONST
                },
            ),
            Primitive::Integer(_) | Primitive::UInteger(_) | Primitive::BigInteger(_) => {
                let big = self.as_big_integer().unwrap_or_default();
                let state = hash::update_num(state, hash::INTEGER_CONST);
                hash::update_bytes(state, &big.to_signed_bytes_le())
            }
            Primitive::Float(f) => {
                let state = hash::update_num(state, hash::FLOAT_CONST);
                match Decimal::from_f64(*f) {
                    Some(d) => hash::update_bytes(state, &d.normalize().serialize()),
                    None if f.is_nan() => hash::update_num(state, f64::NAN.to_bits()),
                    None => hash::update_num(state, f.to_bits()),
                }
            }
            Primitive::Decimal(d) => {
                let state = hash::update_num(state, hash::FLOAT_CONST);
                hash::update_bytes(state, &d.normalize().serialize())
            }
            Primitive::String(s) => hash::update_str(state, s),
            Primitive::Uri(s) => hash::update_str(hash::update_num(state, hash::URI_CONST), s),
            Primitive::Comment(s) => {
                hash::update_str(hash::update_num(state, hash::COMMENT_CONST), s)
            }
            Primitive::Raw(s) => hash::update_str(hash::update_num(state, hash::RAW_CONST), s),
            Primitive::Date(d) => hash::update_num(
                hash::update_num(state, hash::DATE_CONST),
                d.timestamp_nanos_opt().unwrap_or(d.timestamp()) as u64,
            ),
            Primitive::DateOffset(d) => hash::update_num(
                hash::update_num(state, hash::DATE_CONST),
                d.timestamp_nanos_opt().unwrap_or(d.timestamp()) as u64,
            ),
            Primitive::Bytes(b) => hash::update_bytes(state, b),
            Primitive::Guid(g) => {
                hash::update_bytes(hash::update_num(state, hash::GUID_CONST), g.as_bytes())
            }
            Primitive::TimeSpan(t) => hash::update_num(
                hash::update_num(state, hash::TIMESPAN_CONST),
                t.num_nanoseconds().unwrap_or(t.num_seconds()) as u64,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Null,
    Undefined,
    Boolean,
    Integer,
    Float,
    String,
    Date,
    Bytes,
    Guid,
    Uri,
    TimeSpan,
    Comment,
    Raw,
}

impl From<bool> for Primitive {
    fn from(v: bool) -> Self {
        Primitive::Boolean(v)
    }
}

impl From<i32> for Primitive {
    fn from(v: i32) -> Self {
        Primitive::Integer(i64::from(v))
    }
}

impl From<i64> for Primitive {
    fn from(v: i64) -> Self {
        Primitive::Integer(v)
    }
}

impl From<u32> for Primitive {
    fn from(v: u32) -> Self {
        Primitive::Integer(i64::from(v))
    }
}

impl From<u64> for Primitive {
    fn from(v: u64) -> Self {
        Primitive::UInteger(v)
    }
}

impl From<BigInt> for Primitive {
    fn from(v: BigInt) -> Self {
        Primitive::BigInteger(v)
    }
}

impl From<f64> for Primitive {
    fn from(v: f64) -> Self {
        Primitive::Float(v)
    }
}

impl From<Decimal> for Primitive {
    fn from(v: Decimal) -> Self {
        Primitive::Decimal(v)
    }
}

impl From<&str> for Primitive {
    fn from(v: &str) -> Self {
        Primitive::String(v.to_owned())
    }
}

impl From<String> for Primitive {
    fn from(v: String) -> Self {
        Primitive::String(v)
    }
}

impl From<DateTime<Utc>> for Primitive {
    fn from(v: DateTime<Utc>) -> Self {
        Primitive::Date(v)
    }
}

impl From<DateTime<FixedOffset>> for Primitive {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Primitive::DateOffset(v)
    }
}

impl From<Vec<u8>> for Primitive {
    fn from(v: Vec<u8>) -> Self {
        Primitive::Bytes(v)
    }
}

impl From<&[u8]> for Primitive {
    fn from(v: &[u8]) -> Self {
        Primitive::Bytes(v.to_vec())
    }
}

impl From<Uuid> for Primitive {
    fn from(v: Uuid) -> Self {
        Primitive::Guid(v)
    }
}

impl From<chrono::Duration> for Primitive {
    fn from(v: chrono::Duration) -> Self {
        Primitive::TimeSpan(v)
    }
}

impl<T: Into<Primitive>> From<Option<T>> for Primitive {
    fn from(v: Option<T>) -> Self {
        v.map_or(Primitive::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn integer_family_compares_by_value() {
        let big = BigInt::from_str("9223372036854775807").unwrap();
        assert!(Primitive::Integer(i64::MAX).value_equals(&Primitive::UInteger(i64::MAX as u64)));
        assert!(Primitive::UInteger(i64::MAX as u64).value_equals(&Primitive::BigInteger(big)));
        assert!(Primitive::Integer(-1).value_equals(&Primitive::BigInteger(BigInt::from(-1))));
        assert!(!Primitive::Integer(-1).value_equals(&Primitive::UInteger(u64::MAX)));
    }

    #[test]
    fn decimal_is_not_an_integer() {
        assert!(!Primitive::Decimal(Decimal::from(1)).value_equals(&Primitive::Integer(1)));
        assert!(!Primitive::Float(1.0).value_equals(&Primitive::Integer(1)));
    }

    #[test]
    fn float_decimal_use_decimal_equality() {
        let d = Decimal::from_str("1.5").unwrap();
        assert!(Primitive::Float(1.5).value_equals(&Primitive::Decimal(d)));
        assert!(Primitive::Decimal(Decimal::from_str("1.50").unwrap())
            .value_equals(&Primitive::Decimal(d)));
        assert!(Primitive::Float(f64::NAN).value_equals(&Primitive::Float(f64::NAN)));
        assert!(!Primitive::Float(f64::NAN).value_equals(&Primitive::Decimal(d)));
    }

    #[test]
    fn dates_compare_instants() {
        let utc = DateTime::parse_from_rfc3339("2000-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let off = DateTime::parse_from_rfc3339("2000-01-01T01:00:00+01:00").unwrap();
        assert!(Primitive::Date(utc).value_equals(&Primitive::DateOffset(off)));
    }

    #[test]
    fn hash_is_consistent_with_equality() {
        let pairs = [
            (Primitive::Integer(7), Primitive::UInteger(7)),
            (Primitive::Integer(7), Primitive::BigInteger(BigInt::from(7))),
            (
                Primitive::Decimal(Decimal::from_str("2.50").unwrap()),
                Primitive::Decimal(Decimal::from_str("2.5").unwrap()),
            ),
            (Primitive::Float(0.0), Primitive::Float(-0.0)),
        ];
        for (a, b) in pairs {
            assert!(a.value_equals(&b), "{a:?} vs {b:?}");
            assert_eq!(a.hash_into(hash::START_STATE), b.hash_into(hash::START_STATE));
        }
    }

    #[test]
    fn strings_and_uris_are_distinct() {
        let s = Primitive::String("http://a".into());
        let u = Primitive::Uri("http://a".into());
        assert!(!s.value_equals(&u));
        assert_eq!(s.token_kind(), u.token_kind());
    }
}
