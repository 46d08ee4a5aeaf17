// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Durations and dates: parsing from text, and human friendly rendering.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeDelta, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

#[cfg(test)]
#[path = "./date_test.rs"]
mod date_test;

pub const SECONDS_IN_ONE_MINUTE: u64 = 60;
pub const SECONDS_IN_ONE_HOUR: u64 = 60 * SECONDS_IN_ONE_MINUTE;
pub const SECONDS_IN_ONE_DAY: u64 = 24 * SECONDS_IN_ONE_HOUR;

/// Average gregorian year, used when parsing durations like `1y`.
pub const SECONDS_IN_ONE_YEAR: u64 = 31_556_952;

/// Epochs above this value are considered to be in milliseconds.
pub const EPOCH_MS_BREAK: f64 = 900_000_000_000.0;

/// Number of parts shown by default by [`represented_duration`].
pub const DEFAULT_DURATION_SPAN: i32 = 2;

static RX_DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+[ywdhms]\s*)+$").expect("valid regex"));

static RX_DURATION_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)([ywdhms])").expect("valid regex"));

static RX_TIMEZONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(Z|UTC|([+-]?)(\d\d):?(\d\d))\s*$").expect("valid regex"));

static RX_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?:(?P<y1>\d{4})[-/](?P<m1>\d\d?)[-/](?P<d1>\d\d?)",
        r"|(?P<m2>\d\d?)/(?P<d2>\d\d?)/(?P<y2>\d{4}))",
        r"(?:[T ]+(?P<hh>\d\d?):(?P<mm>\d\d)(?::(?P<ss>\d\d)(?:\.(?P<frac>\d+))?)?)?",
        r"\s*(?P<tz>.*)$",
    ))
    .expect("valid regex")
});

/// The UTC offset.
pub fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero offset is valid")
}

fn duration_part(count: u64, name: &str, short_form: bool, immutable: bool) -> String {
    if short_form {
        if immutable {
            return format!("{count}{name}");
        }
        return format!("{count}{}", &name[..1]);
    }
    let plural = if immutable || count == 1 { "" } else { "s" };
    format!("{count} {name}{plural}")
}

/// Human friendly representation of a duration in `seconds`.
///
/// `span` states how many parts to show:
/// - `Some(n > 0)`: `n` most significant parts, like `1 hour 5 seconds`
/// - `None`: all parts, like `1 hour 2 minutes 5 seconds 20 ms`
/// - `Some(0)`: all parts in short form, like `1h 2m 5s 20ms`
/// - `Some(n < 0)`: `|n|` most significant parts in short form, like `1h 2m`
///
/// Sub-second parts are dropped for durations above 10 seconds when the
/// span is bounded.
pub fn represented_duration(seconds: f64, span: Option<i32>, separator: &str) -> String {
    let short_form = span.is_some_and(|s| s <= 0);
    let span = span.map(i32::unsigned_abs).filter(|s| *s > 0);
    let seconds = seconds.abs();
    let mut microseconds = if span.is_some() && seconds > 10.0 {
        0
    } else {
        ((seconds - seconds.trunc()) * 1_000_000.0).round() as u64
    };
    let mut seconds = seconds.trunc() as u64;

    let mut days = seconds / SECONDS_IN_ONE_DAY;
    seconds -= days * SECONDS_IN_ONE_DAY;
    let years = days / 365;
    days -= years * 365;
    let weeks = days / 7;
    days -= weeks * 7;

    let hours = seconds / SECONDS_IN_ONE_HOUR;
    seconds -= hours * SECONDS_IN_ONE_HOUR;
    let minutes = seconds / SECONDS_IN_ONE_MINUTE;
    seconds -= minutes * SECONDS_IN_ONE_MINUTE;

    let mut result = Vec::new();
    for (count, name) in [
        (years, "year"),
        (weeks, "week"),
        (days, "day"),
        (hours, "hour"),
        (minutes, "minute"),
        (seconds, "second"),
    ] {
        if count > 0 {
            result.push(duration_part(count, name, short_form, false));
        }
    }

    if microseconds > 0 {
        let milliseconds = microseconds / 1000;
        microseconds %= 1000;
        if milliseconds > 0 {
            result.push(duration_part(milliseconds, "ms", short_form, true));
        }
        if microseconds > 0 {
            result.push(duration_part(microseconds, "μs", short_form, true));
        }
    }

    if result.is_empty() {
        result.push(duration_part(0, "second", short_form, false));
    }
    if let Some(span) = span {
        result.truncate(span as usize);
    }
    result.join(separator)
}

/// Number of seconds represented by `text`.
///
/// Accepts plain numbers, durations like `1d1h5s` (units `y w d h m s`),
/// or a date, in which case the number of seconds elapsed since that date
/// is returned. Empty text is 0 seconds.
pub fn to_seconds(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0.0);
    }
    if let Ok(value) = text.parse::<f64>() {
        return Some(value).filter(|v| v.is_finite());
    }
    if let Some(seconds) = duration_seconds(text) {
        return Some(seconds as f64);
    }
    to_datetime(text, None).map(|dt| elapsed(&dt, None))
}

fn duration_seconds(text: &str) -> Option<u64> {
    if !RX_DURATION.is_match(text) {
        return None;
    }
    let mut total: u64 = 0;
    for captures in RX_DURATION_PART.captures_iter(text) {
        let count: u64 = captures[1].parse().ok()?;
        let unit = match &captures[2] {
            "y" => SECONDS_IN_ONE_YEAR,
            "w" => 7 * SECONDS_IN_ONE_DAY,
            "d" => SECONDS_IN_ONE_DAY,
            "h" => SECONDS_IN_ONE_HOUR,
            "m" => SECONDS_IN_ONE_MINUTE,
            _ => 1,
        };
        total = count.checked_mul(unit).and_then(|v| v.checked_add(total))?;
    }
    Some(total)
}

/// Timezone from text like `Z`, `UTC`, `+01:00` or `-0500`.
pub fn timezone_from_text(text: &str) -> Option<FixedOffset> {
    let captures = RX_TIMEZONE.captures(text)?;
    if captures.get(3).is_none() {
        return Some(utc());
    }
    let hours: i32 = captures[3].parse().ok()?;
    let minutes: i32 = captures[4].parse().ok()?;
    let mut offset = hours * 3600 + minutes * 60;
    if &captures[2] == "-" {
        offset = -offset;
    }
    FixedOffset::east_opt(offset)
}

/// Datetime from a unix epoch, milliseconds are auto-detected.
///
/// Defaults to UTC when no `tz` is given.
pub fn datetime_from_epoch(epoch: f64, tz: Option<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    let seconds = if epoch > EPOCH_MS_BREAK {
        epoch / 1000.0
    } else {
        epoch
    };
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1_000_000_000.0).round() as u32;
    let dt = DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))?;
    Some(dt.with_timezone(&tz.unwrap_or_else(utc)))
}

/// Date from `text`, see [`to_datetime`].
pub fn to_date(text: &str) -> Option<NaiveDate> {
    to_datetime(text, None).map(|dt| dt.date_naive())
}

/// Datetime from `text`.
///
/// Accepted forms: `YYYY-MM-DD`, `YYYY/MM/DD` or `MM/DD/YYYY`, optionally
/// followed by a `[T ]HH:MM[:SS[.frac]]` time and a timezone; epoch numbers;
/// or durations like `1w`, meaning one week ago. Times without an explicit
/// timezone are in `tz`, UTC when not given.
pub fn to_datetime(text: &str, tz: Option<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let tz = tz.unwrap_or_else(utc);
    if let Ok(epoch) = text.parse::<f64>() {
        if !epoch.is_finite() {
            return None;
        }
        return datetime_from_epoch(epoch, Some(tz));
    }
    if let Some(seconds) = duration_seconds(text) {
        let delta = TimeDelta::try_seconds(i64::try_from(seconds).ok()?)?;
        let ago = Utc::now().checked_sub_signed(delta)?;
        return Some(ago.with_timezone(&tz));
    }

    let captures = RX_DATE.captures(text)?;
    let number = |name: &str| -> Option<u32> { captures.name(name)?.as_str().parse().ok() };
    let (year, month, day) = match number("y1") {
        Some(year) => (year, number("m1")?, number("d1")?),
        None => (number("y2")?, number("m2")?, number("d2")?),
    };
    let date = NaiveDate::from_ymd_opt(year as i32, month, day)?;
    let nanos = match captures.name("frac") {
        Some(frac) => {
            let digits: String = frac.as_str().chars().take(9).collect();
            format!("{digits:0<9}").parse().ok()?
        }
        None => 0,
    };
    let naive = date.and_hms_nano_opt(
        number("hh").unwrap_or(0),
        number("mm").unwrap_or(0),
        number("ss").unwrap_or(0),
        nanos,
    )?;

    let tz_text = captures.name("tz").map_or("", |m| m.as_str()).trim();
    let offset = if tz_text.is_empty() {
        tz
    } else {
        timezone_from_text(tz_text)?
    };
    offset.from_local_datetime(&naive).single()
}

/// Seconds elapsed between `started` and `ended` (now when `None`).
pub fn elapsed<Tz: TimeZone>(started: &DateTime<Tz>, ended: Option<&DateTime<Tz>>) -> f64 {
    let started = started.with_timezone(&Utc);
    let ended = ended.map_or_else(Utc::now, |e| e.with_timezone(&Utc));
    let delta = ended - started;
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => delta.num_seconds() as f64,
    }
}

/// Unix epoch in seconds.
pub fn to_epoch<Tz: TimeZone>(dt: &DateTime<Tz>) -> i64 {
    dt.timestamp()
}

/// Unix epoch in milliseconds.
pub fn to_epoch_ms<Tz: TimeZone>(dt: &DateTime<Tz>) -> i64 {
    dt.timestamp_millis()
}

/// Offset of the local timezone, like `+02:00`.
pub fn local_timezone() -> String {
    Local::now().offset().to_string()
}
