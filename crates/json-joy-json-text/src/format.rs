//! Text renderings shared by the emitter, the lexer and the conversions:
//! numbers, dates, durations and escaped strings.

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::settings::StringEscapeHandling;

/// Shortest round-trip rendering of a finite `f64`, always with a fractional
/// part or exponent (`1.0`, not `1`).
pub fn format_f64(f: f64) -> String {
    let mut s = format!("{f:?}");
    if !s.contains(['.', 'e', 'E']) {
        s.push_str(".0");
    }
    s
}

/// Decimal rendering keeping its scale; whole values get a trailing `.0`.
pub fn format_decimal(d: &Decimal) -> String {
    let mut s = d.to_string();
    if !s.contains('.') {
        s.push_str(".0");
    }
    s
}

pub fn format_iso_utc(d: &DateTime<Utc>) -> String {
    d.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn format_iso_offset(d: &DateTime<FixedOffset>) -> String {
    d.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// `/Date(ms)/`.
pub fn format_ms_utc(d: &DateTime<Utc>) -> String {
    format!("/Date({})/", d.timestamp_millis())
}

/// `/Date(ms+hhmm)/`.
pub fn format_ms_offset(d: &DateTime<FixedOffset>) -> String {
    let secs = d.offset().local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.abs();
    format!(
        "/Date({}{}{:02}{:02})/",
        d.timestamp_millis(),
        sign,
        secs / 3600,
        (secs / 60) % 60
    )
}

/// Parse a date string: ISO-8601 (with or without offset; zone-less means
/// UTC) or the legacy `/Date(ms[+-hhmm])/` form.
pub fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Some(inner) = s.strip_prefix("/Date(").and_then(|r| r.strip_suffix(")/")) {
        return parse_ms_date(inner);
    }
    if !looks_like_iso_date(s) {
        return None;
    }
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    None
}

fn looks_like_iso_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 16
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
        && (b[10] == b'T' || b[10] == b't')
}

fn parse_ms_date(inner: &str) -> Option<DateTime<FixedOffset>> {
    // The sign of the millisecond count is part of the number; an offset
    // sign can only appear after at least one digit.
    let offset_at = inner
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map(|(i, _)| i);
    let (ms, offset) = match offset_at {
        Some(i) => (&inner[..i], Some(&inner[i..])),
        None => (inner, None),
    };
    let ms: i64 = ms.parse().ok()?;
    let utc = Utc.timestamp_millis_opt(ms).single()?;
    let offset = match offset {
        None => FixedOffset::east_opt(0)?,
        Some(o) => {
            let sign = if o.starts_with('-') { -1 } else { 1 };
            let digits = &o[1..];
            if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let hours: i32 = digits[..2].parse().ok()?;
            let minutes: i32 = digits[2..].parse().ok()?;
            FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?
        }
    };
    Some(utc.with_timezone(&offset))
}

const NANOS_PER_TICK: i64 = 100;

/// `[-][d.]hh:mm:ss[.fffffff]`.
pub fn format_timespan(d: &chrono::Duration) -> String {
    let negative = *d < chrono::Duration::zero();
    let abs = if negative { -*d } else { *d };
    let secs = abs.num_seconds();
    let nanos = (abs - chrono::Duration::seconds(secs))
        .num_nanoseconds()
        .unwrap_or(0);
    let ticks = nanos / NANOS_PER_TICK;
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    let days = secs / 86_400;
    if days > 0 {
        out.push_str(&format!("{days}."));
    }
    out.push_str(&format!(
        "{:02}:{:02}:{:02}",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60
    ));
    if ticks > 0 {
        out.push_str(&format!(".{ticks:07}"));
    }
    out
}

pub fn parse_timespan(s: &str) -> Option<chrono::Duration> {
    let (negative, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s),
    };
    let mut parts = rest.split(':');
    let head = parts.next()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let sec_part = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let (days, hours) = match head.split_once('.') {
        Some((d, h)) => (d.parse::<i64>().ok()?, h.parse::<i64>().ok()?),
        None => (0, head.parse::<i64>().ok()?),
    };
    let (seconds, ticks) = match sec_part.split_once('.') {
        Some((s, f)) => {
            if f.is_empty() || f.len() > 7 || !f.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let scale = 10_i64.pow(7 - f.len() as u32);
            (s.parse::<i64>().ok()?, f.parse::<i64>().ok()? * scale)
        }
        None => (sec_part.parse::<i64>().ok()?, 0),
    };
    if hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }
    let total = chrono::Duration::days(days)
        + chrono::Duration::hours(hours)
        + chrono::Duration::minutes(minutes)
        + chrono::Duration::seconds(seconds)
        + chrono::Duration::nanoseconds(ticks * NANOS_PER_TICK);
    Some(if negative { -total } else { total })
}

/// Write `s` with escapes appropriate for `handling`, without surrounding
/// quotes. `quote` is the active quote character.
pub fn write_escaped(out: &mut String, s: &str, quote: char, handling: StringEscapeHandling) {
    for ch in s.chars() {
        let simple = match ch {
            '\\' => Some("\\\\"),
            '"' if quote == '"' => Some("\\\""),
            '\'' if quote == '\'' => Some("\\'"),
            _ => None,
        };
        if let Some(esc) = simple {
            out.push_str(esc);
            continue;
        }
        if handling == StringEscapeHandling::None {
            out.push(ch);
            continue;
        }
        match ch {
            '\u{0008}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{000C}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 || c == '\u{0085}' || c == '\u{2028}' || c == '\u{2029}' => {
                push_unicode_escape(out, c)
            }
            '<' | '>' | '&' | '\'' | '"' if handling == StringEscapeHandling::EscapeHtml => {
                push_unicode_escape(out, ch)
            }
            c if !c.is_ascii() && handling == StringEscapeHandling::EscapeNonAscii => {
                push_unicode_escape(out, c)
            }
            c => out.push(c),
        }
    }
}

fn push_unicode_escape(out: &mut String, c: char) {
    let mut units = [0u16; 2];
    for unit in c.encode_utf16(&mut units) {
        out.push_str(&format!("\\u{unit:04x}"));
    }
}

/// Escape a name for use inside a single-quoted path step.
pub fn escape_path_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    write_escaped(&mut out, name, '\'', StringEscapeHandling::Default);
    out
}
