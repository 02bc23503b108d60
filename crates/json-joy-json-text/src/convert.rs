//! Conversions from a stored [`Primitive`] to a requested host type.
//!
//! One impl of [`TryFromPrimitive`] per target type; each lists the stored
//! kinds it accepts and returns `None` for everything else. Null and
//! undefined never reach an impl: [`convert`] maps them to `Ok(None)`.

use std::str::FromStr;

use base64::Engine as _;
use chrono::{DateTime, FixedOffset, Utc};
use num_bigint::BigInt;
use num_traits::{FromPrimitive as _, ToPrimitive, Zero};
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::error::{ConversionError, JsonResult};
use crate::format;
use crate::value::Primitive;

/// A host type a stored primitive can be coerced into.
pub trait TryFromPrimitive: Sized {
    /// Name used in conversion errors.
    const TARGET: &'static str;

    fn try_from_primitive(value: &Primitive) -> Option<Self>;

    /// Stored values read as "no value" for this target.
    fn is_null_like(value: &Primitive) -> bool {
        matches!(value, Primitive::Null | Primitive::Undefined)
    }
}

/// Coerce an optional stored value, reporting failures against `path`.
pub fn convert<T: TryFromPrimitive>(value: Option<&Primitive>, path: &str) -> JsonResult<Option<T>> {
    let Some(value) = value else {
        return Ok(None);
    };
    if T::is_null_like(value) {
        return Ok(None);
    }
    match T::try_from_primitive(value) {
        Some(v) => Ok(Some(v)),
        None => Err(conversion_error(value, T::TARGET, path).into()),
    }
}

pub fn conversion_error(value: &Primitive, target: &'static str, path: &str) -> ConversionError {
    ConversionError {
        source_kind: value.kind().name().to_owned(),
        target,
        path: path.to_owned(),
        value: render(value),
    }
}

/// Invariant text form of a scalar, as used for string conversion.
pub fn render(value: &Primitive) -> Option<String> {
    Some(match value {
        Primitive::Null | Primitive::Undefined => return None,
        Primitive::Boolean(b) => b.to_string(),
        Primitive::Integer(i) => i.to_string(),
        Primitive::UInteger(u) => u.to_string(),
        Primitive::BigInteger(b) => b.to_string(),
        Primitive::Float(f) if f.is_nan() => "NaN".to_owned(),
        Primitive::Float(f) if f.is_infinite() => {
            let symbol = if *f > 0.0 { "Infinity" } else { "-Infinity" };
            symbol.to_owned()
        }
        Primitive::Float(f) => format::format_f64(*f),
        Primitive::Decimal(d) => d.to_string(),
        Primitive::String(s)
        | Primitive::Uri(s)
        | Primitive::Comment(s)
        | Primitive::Raw(s) => s.clone(),
        Primitive::Date(d) => format::format_iso_utc(d),
        Primitive::DateOffset(d) => format::format_iso_offset(d),
        Primitive::Bytes(b) => base64::engine::general_purpose::STANDARD.encode(b),
        Primitive::Guid(g) => g.hyphenated().to_string(),
        Primitive::TimeSpan(t) => format::format_timespan(t),
    })
}

fn is_numeric_null(value: &Primitive) -> bool {
    match value {
        Primitive::Null | Primitive::Undefined => true,
        Primitive::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Integer-valued view of a numeric or numeric-string primitive. Floats and
/// decimals round half to even and must be finite.
fn integral(value: &Primitive) -> Option<BigInt> {
    match value {
        Primitive::Integer(_) | Primitive::UInteger(_) | Primitive::BigInteger(_) => {
            value.as_big_integer()
        }
        Primitive::Float(f) if f.is_finite() => BigInt::from_f64(f.round_ties_even()),
        Primitive::Decimal(d) => {
            let rounded = d.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
            rounded.to_i128().map(BigInt::from)
        }
        Primitive::String(s) => {
            let s = s.trim();
            if let Ok(big) = BigInt::from_str(s) {
                return Some(big);
            }
            let d = Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()?;
            integral(&Primitive::Decimal(d))
        }
        _ => None,
    }
}

macro_rules! integer_target {
    ($ty:ty, $name:literal, $to:ident) => {
        impl TryFromPrimitive for $ty {
            const TARGET: &'static str = $name;

            fn try_from_primitive(value: &Primitive) -> Option<Self> {
                integral(value)?.$to()
            }

            fn is_null_like(value: &Primitive) -> bool {
                is_numeric_null(value)
            }
        }
    };
}

integer_target!(i32, "i32", to_i32);
integer_target!(i64, "i64", to_i64);
integer_target!(u32, "u32", to_u32);
integer_target!(u64, "u64", to_u64);

impl TryFromPrimitive for BigInt {
    const TARGET: &'static str = "BigInt";

    fn try_from_primitive(value: &Primitive) -> Option<Self> {
        integral(value)
    }

    fn is_null_like(value: &Primitive) -> bool {
        is_numeric_null(value)
    }
}

impl TryFromPrimitive for f64 {
    const TARGET: &'static str = "f64";

    fn try_from_primitive(value: &Primitive) -> Option<Self> {
        match value {
            Primitive::Float(f) => Some(*f),
            Primitive::Decimal(d) => d.to_f64(),
            Primitive::Integer(_) | Primitive::UInteger(_) | Primitive::BigInteger(_) => {
                value.as_big_integer()?.to_f64()
            }
            Primitive::String(s) => match s.trim() {
                "Infinity" => Some(f64::INFINITY),
                "-Infinity" => Some(f64::NEG_INFINITY),
                s => s.parse().ok(),
            },
            _ => None,
        }
    }

    fn is_null_like(value: &Primitive) -> bool {
        is_numeric_null(value)
    }
}

impl TryFromPrimitive for Decimal {
    const TARGET: &'static str = "Decimal";

    fn try_from_primitive(value: &Primitive) -> Option<Self> {
        match value {
            Primitive::Decimal(d) => Some(*d),
            Primitive::Float(f) => Decimal::from_f64(*f),
            Primitive::Integer(_) | Primitive::UInteger(_) | Primitive::BigInteger(_) => {
                Decimal::from_i128(value.as_big_integer()?.to_i128()?)
            }
            Primitive::String(s) => {
                let s = s.trim();
                Decimal::from_str(s)
                    .or_else(|_| Decimal::from_scientific(s))
                    .ok()
            }
            _ => None,
        }
    }

    fn is_null_like(value: &Primitive) -> bool {
        is_numeric_null(value)
    }
}

impl TryFromPrimitive for bool {
    const TARGET: &'static str = "bool";

    fn try_from_primitive(value: &Primitive) -> Option<Self> {
        match value {
            Primitive::Boolean(b) => Some(*b),
            Primitive::Integer(i) => Some(*i != 0),
            Primitive::UInteger(u) => Some(*u != 0),
            Primitive::BigInteger(b) => Some(!b.is_zero()),
            Primitive::Float(f) => Some(*f != 0.0),
            Primitive::Decimal(d) => Some(!d.is_zero()),
            Primitive::String(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn is_null_like(value: &Primitive) -> bool {
        is_numeric_null(value)
    }
}

impl TryFromPrimitive for String {
    const TARGET: &'static str = "String";

    fn try_from_primitive(value: &Primitive) -> Option<Self> {
        render(value)
    }
}

impl TryFromPrimitive for DateTime<Utc> {
    const TARGET: &'static str = "DateTime";

    fn try_from_primitive(value: &Primitive) -> Option<Self> {
        match value {
            Primitive::Date(d) => Some(*d),
            Primitive::DateOffset(d) => Some(d.with_timezone(&Utc)),
            Primitive::String(s) => format::parse_date(s).map(|d| d.with_timezone(&Utc)),
            _ => None,
        }
    }

    fn is_null_like(value: &Primitive) -> bool {
        is_numeric_null(value)
    }
}

impl TryFromPrimitive for DateTime<FixedOffset> {
    const TARGET: &'static str = "DateTimeOffset";

    fn try_from_primitive(value: &Primitive) -> Option<Self> {
        match value {
            Primitive::DateOffset(d) => Some(*d),
            Primitive::Date(d) => Some(d.fixed_offset()),
            Primitive::String(s) => format::parse_date(s),
            _ => None,
        }
    }

    fn is_null_like(value: &Primitive) -> bool {
        is_numeric_null(value)
    }
}

impl TryFromPrimitive for Vec<u8> {
    const TARGET: &'static str = "Bytes";

    fn try_from_primitive(value: &Primitive) -> Option<Self> {
        match value {
            Primitive::Bytes(b) => Some(b.clone()),
            Primitive::Guid(g) => Some(g.as_bytes().to_vec()),
            Primitive::String(s) => base64::engine::general_purpose::STANDARD.decode(s).ok(),
            _ => None,
        }
    }
}

impl TryFromPrimitive for Uuid {
    const TARGET: &'static str = "Guid";

    fn try_from_primitive(value: &Primitive) -> Option<Self> {
        match value {
            Primitive::Guid(g) => Some(*g),
            Primitive::String(s) => Uuid::parse_str(s.trim()).ok(),
            Primitive::Bytes(b) => Uuid::from_slice(b).ok(),
            _ => None,
        }
    }

    fn is_null_like(value: &Primitive) -> bool {
        is_numeric_null(value)
    }
}

impl TryFromPrimitive for chrono::Duration {
    const TARGET: &'static str = "TimeSpan";

    fn try_from_primitive(value: &Primitive) -> Option<Self> {
        match value {
            Primitive::TimeSpan(t) => Some(*t),
            Primitive::String(s) => format::parse_timespan(s.trim()),
            _ => None,
        }
    }

    fn is_null_like(value: &Primitive) -> bool {
        is_numeric_null(value)
    }
}

impl TryFromPrimitive for Primitive {
    const TARGET: &'static str = "Primitive";

    fn try_from_primitive(value: &Primitive) -> Option<Self> {
        Some(value.clone())
    }

    fn is_null_like(_: &Primitive) -> bool {
        false
    }
}
