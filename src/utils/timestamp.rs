//! Timestamp parsing and formatting.
//!
//! Detection products and recording names encode time in many textual forms.
//! [`parse`] tries an ordered list of small parsers and keeps the first
//! success; the order matters on ambiguous input (a 12-digit string is epoch
//! milliseconds here, never a compact date), so each parser is exposed and
//! tested on its own through [`PARSERS`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, Timelike, Utc};

use crate::error::{Error, Result};

/// A UTC instant with millisecond precision.
pub type TimeInstant = DateTime<Utc>;

/// A single-format parser. Input is already trimmed.
pub type TimestampParser = fn(&str) -> Option<TimeInstant>;

/// Parsers in priority order.
pub const PARSERS: &[(&str, TimestampParser)] = &[
    ("compact", parse_compact),
    ("iso8601", parse_iso),
    ("space-separated", parse_space_separated),
    ("slash-separated", parse_slash_separated),
    ("epoch", parse_epoch),
];

/// Digits that must open the text for an epoch-zero result to be believed.
const EPOCH_DIGITS: &str = "19700101";

/// Parse `text` into a UTC instant.
pub fn parse(text: &str) -> Result<TimeInstant> {
    try_parse(text).ok_or_else(|| Error::NotATimestamp {
        text: text.to_string(),
    })
}

/// Parse `text`, returning `None` when no parser accepts it.
pub fn try_parse(text: &str) -> Option<TimeInstant> {
    let trimmed = text.trim();
    if !trimmed.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    let instant = PARSERS.iter().find_map(|(_, parser)| parser(trimmed))?;
    let instant = truncate_millis(instant);

    if instant == DateTime::UNIX_EPOCH && !digits_of(trimmed).starts_with(EPOCH_DIGITS) {
        return None;
    }
    Some(instant)
}

/// Filename-safe stamp, `yyyyMMddTHHmmss`.
pub fn format_stamp(instant: &TimeInstant) -> String {
    instant.format("%Y%m%dT%H%M%S").to_string()
}

/// ISO-8601 with a trailing `Z`; milliseconds only when non-zero.
pub fn format_iso(instant: &TimeInstant) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Start of the hour containing `instant`.
pub fn truncate_to_hour(instant: &TimeInstant) -> TimeInstant {
    instant
        .with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_minute(0))
        .unwrap_or(*instant)
}

/// Start of the UTC day containing `instant`.
pub fn truncate_to_day(instant: &TimeInstant) -> TimeInstant {
    instant
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(*instant, |t| t.and_utc())
}

/// Decode a recording's start from its filename suffix.
///
/// Accepts `..._YYYYMMDDTHHMMSSZ.flac` and `..._YYMMDDhhmmss.wav`; two-digit
/// years up to 69 are 20xx, the rest 19xx.
pub fn parse_filename_start(name: &str) -> Option<TimeInstant> {
    let (stem, ext) = name.rsplit_once('.')?;
    if !ext.eq_ignore_ascii_case("flac") && !ext.eq_ignore_ascii_case("wav") {
        return None;
    }
    let (_, token) = stem.rsplit_once('_')?;
    let bytes = token.as_bytes();

    match bytes.len() {
        16 if bytes[8].eq_ignore_ascii_case(&b'T') && bytes[15].eq_ignore_ascii_case(&b'Z') => {
            let date = &token[..8];
            let time = &token[9..15];
            if !all_digits(date) || !all_digits(time) {
                return None;
            }
            build(date, time, 0)
        }
        12 if all_digits(token) => {
            let yy: i32 = token[..2].parse().ok()?;
            let year = if yy <= 69 { 2000 + yy } else { 1900 + yy };
            let date = NaiveDate::from_ymd_opt(year, num(&token[2..4])?, num(&token[4..6])?)?;
            date.and_hms_opt(num(&token[6..8])?, num(&token[8..10])?, num(&token[10..12])?)
                .map(|t| t.and_utc())
        }
        _ => None,
    }
}

/// Compact digit forms: `yyyyMMdd`, `yyyyMMddHHmmss[fff..]`,
/// `yyyyMMddHHmmss.fff`, `yyyyMMddTHHmmss[.fff][Z]`.
pub fn parse_compact(text: &str) -> Option<TimeInstant> {
    let text = text
        .strip_suffix('Z')
        .or_else(|| text.strip_suffix('z'))
        .unwrap_or(text);
    let (head, frac) = match text.split_once('.') {
        Some((head, frac)) => (head, Some(frac)),
        None => (text, None),
    };

    let head: String = if head.len() > 8 && head.as_bytes()[8].eq_ignore_ascii_case(&b'T') {
        format!("{}{}", &head[..8], &head[9..])
    } else {
        head.to_string()
    };
    if !all_digits(&head) {
        return None;
    }

    match (head.len(), frac) {
        (8, None) => build(&head, "000000", 0),
        (14, None) => build(&head[..8], &head[8..14], 0),
        (14, Some(frac)) if all_digits(frac) && !frac.is_empty() => {
            build(&head[..8], &head[8..14], fraction_nanos(frac))
        }
        (n, None) if n > 14 => build(&head[..8], &head[8..14], fraction_nanos(&head[14..])),
        _ => None,
    }
}

/// ISO-8601 date-times with `T`, optional fraction, optional `Z` or offset,
/// plus bare dates. Naive values are taken as UTC.
pub fn parse_iso(text: &str) -> Option<TimeInstant> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = text
        .strip_suffix('Z')
        .or_else(|| text.strip_suffix('z'))
        .unwrap_or(text);
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// `yyyy-MM-dd HH:mm:ss[.fff]` and friends.
pub fn parse_space_separated(text: &str) -> Option<TimeInstant> {
    let (date, time) = text.split_once(' ')?;
    parse_iso(&format!("{date}T{}", time.trim_start()))
}

/// Slash-separated dates: `yyyy/MM/dd[ HH:mm:ss]`, then US-style
/// `MM/dd/yyyy[ HH:mm[:ss]]`.
pub fn parse_slash_separated(text: &str) -> Option<TimeInstant> {
    if !text.contains('/') {
        return None;
    }
    let dashed = text.replace('/', "-");
    if let Some(instant) = parse_iso(&dashed).or_else(|| parse_space_separated(&dashed)) {
        return Some(instant);
    }

    for format in ["%m/%d/%Y %H:%M:%S%.f", "%m/%d/%Y %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%m/%d/%Y")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Raw epoch values: 9-11 integer digits are seconds (a fraction is allowed),
/// 12-13 digits are milliseconds. Shorter numbers are never timestamps.
pub fn parse_epoch(text: &str) -> Option<TimeInstant> {
    let (int, frac) = match text.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (text, None),
    };
    if !all_digits(int) {
        return None;
    }
    if let Some(frac) = frac
        && !all_digits(frac)
    {
        return None;
    }

    let value: i64 = int.parse().ok()?;
    match (int.len(), frac) {
        (9..=11, frac) => DateTime::from_timestamp(value, frac.map_or(0, fraction_nanos)),
        (12..=13, None) => DateTime::from_timestamp_millis(value),
        _ => None,
    }
}

fn build(date: &str, time: &str, nanos: u32) -> Option<TimeInstant> {
    let year: i32 = date[..4].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, num(&date[4..6])?, num(&date[6..8])?)?;
    date.and_hms_nano_opt(num(&time[..2])?, num(&time[2..4])?, num(&time[4..6])?, nanos)
        .map(|t| t.and_utc())
}

/// Fraction digits to nanoseconds, ignoring anything past nine digits.
fn fraction_nanos(frac: &str) -> u32 {
    let mut digits: String = frac.chars().take(9).collect();
    while digits.len() < 9 {
        digits.push('0');
    }
    digits.parse().unwrap_or(0)
}

fn truncate_millis(instant: TimeInstant) -> TimeInstant {
    let millis = instant.timestamp_subsec_millis();
    instant
        .with_nanosecond(0)
        .map_or(instant, |t| t + TimeDelta::milliseconds(i64::from(millis)))
}

fn num(s: &str) -> Option<u32> {
    s.parse().ok()
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn digits_of(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}
