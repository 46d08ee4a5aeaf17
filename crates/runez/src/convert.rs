// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Lenient conversions from text, and human friendly representations of sizes.

use once_cell::sync::Lazy;
use regex::Regex;

#[cfg(test)]
#[path = "./convert_test.rs"]
mod convert_test;

/// Lowercase tokens considered to mean `true`.
pub const TRUE_TOKENS: &[&str] = &["on", "true", "y", "yes"];

/// Prefixes used for powers of 1000 (or 1024).
pub const DEFAULT_PREFIXES: &str = "KMGTP";

static RX_BYTESIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+\.?\d*|\.\d+)\s*([A-Za-z]?)\s*$").expect("valid regex"));

/// `text` interpreted as a boolean.
///
/// True tokens (`yes`, `on`...) and non-zero numbers are `true`, anything
/// else is `false`.
pub fn to_boolean(text: &str) -> bool {
    let text = text.trim().to_lowercase();
    if TRUE_TOKENS.contains(&text.as_str()) {
        return true;
    }
    to_float(&text).is_some_and(|v| v != 0.0)
}

/// `text` as an integer, accepting `0x`, `0o` and `0b` prefixes and
/// underscores between digits.
pub fn to_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let lowered = digits.to_ascii_lowercase();
    let (radix, digits) = if let Some(rest) = lowered.strip_prefix("0x") {
        (16, rest.strip_prefix('_').unwrap_or(rest))
    } else if let Some(rest) = lowered.strip_prefix("0o") {
        (8, rest.strip_prefix('_').unwrap_or(rest))
    } else if let Some(rest) = lowered.strip_prefix("0b") {
        (2, rest.strip_prefix('_').unwrap_or(rest))
    } else {
        (10, lowered.as_str())
    };
    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return None;
    }
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    if !cleaned.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let value = i64::from_str_radix(&cleaned, radix).ok()?;
    Some(if negative { -value } else { value })
}

/// `text` as a float, also accepting yaml-style `.inf`.
pub fn to_float(text: &str) -> Option<f64> {
    let text = text.trim();
    let text = text
        .replace("+.inf", "inf")
        .replace("-.inf", "-inf")
        .replace(".inf", "inf");
    text.parse::<f64>().ok()
}

/// Byte size from `text` like `10`, `1.5k`, `20m`, using base 1024.
pub fn to_bytesize(text: &str) -> Option<u64> {
    to_bytesize_in(text, None, 1024)
}

/// Byte size from `text`, with `default_unit` applying to unit-less values.
///
/// Returns `None` when the text or the unit is not recognized.
pub fn to_bytesize_in(text: &str, default_unit: Option<&str>, base: u64) -> Option<u64> {
    let captures = RX_BYTESIZE.captures(text)?;
    let value: f64 = captures[1].parse().ok()?;
    let unit = match &captures[2] {
        "" => default_unit.unwrap_or(""),
        unit => unit,
    };
    UnitRepresentation::new(base, DEFAULT_PREFIXES).unitized(value, unit)
}

/// Human friendly byte size, like `8.8 KB`.
pub fn represented_bytesize(size: f64, unit: &str) -> String {
    UnitRepresentation::new(1024, DEFAULT_PREFIXES).represented(size, " ", unit)
}

/// Human friendly count, like `1.1K`.
pub fn represented_with_units(size: f64) -> String {
    UnitRepresentation::new(1000, DEFAULT_PREFIXES).represented(size, "", "")
}

/// "`count` `singular`(s)", with large counts shown with units (`20K chairs`).
pub fn plural(count: usize, singular: &str) -> String {
    plural_in_base(count, singular, 1000)
}

/// Same as [`plural`], `base` 0 shows large counts in full.
pub fn plural_in_base(count: usize, singular: &str, base: u64) -> String {
    if count == 1 {
        return format!("1 {singular}");
    }
    let represented = if base == 0 {
        count.to_string()
    } else {
        UnitRepresentation::new(base, DEFAULT_PREFIXES).represented(count as f64, "", "")
    };
    format!("{represented} {}", pluralized(singular))
}

/// Best-effort english plural of `singular`.
pub fn pluralized(singular: &str) -> String {
    match singular {
        "person" => return "people".to_string(),
        "" => return String::new(),
        _ => {}
    }
    for (suffix, replacement) in [("man", "men"), ("ch", "ches"), ("sh", "shes")] {
        if let Some(stem) = singular.strip_suffix(suffix) {
            return format!("{stem}{replacement}");
        }
    }
    if let Some(stem) = singular.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{stem}ies");
        }
    }
    if singular.ends_with(['s', 'x', 'z']) {
        return format!("{singular}es");
    }
    format!("{singular}s")
}

/// Represent values in a given base, with unit prefixes per power.
#[derive(Debug, Clone)]
pub struct UnitRepresentation {
    pub base: u64,
    pub prefixes: String,
}

impl UnitRepresentation {
    pub fn new(base: u64, prefixes: &str) -> Self {
        Self {
            base,
            prefixes: prefixes.to_string(),
        }
    }

    /// Power corresponding to `unit` prefix (0 for no unit).
    pub fn unit_exponent(&self, unit: &str) -> Option<u32> {
        if unit.is_empty() {
            return Some(0);
        }
        let upper = unit.to_uppercase();
        let mut chars = upper.chars();
        let first = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        self.prefixes
            .chars()
            .position(|p| p == first)
            .map(|i| i as u32 + 1)
    }

    /// `value` expanded per `unit`, example: 1k is 1000 in base 1000.
    pub fn unitized(&self, value: f64, unit: &str) -> Option<u64> {
        let exponent = self.unit_exponent(unit)?;
        Some((value * (self.base as f64).powi(exponent as i32)).round() as u64)
    }

    /// Human friendly representation of `size`.
    pub fn represented(&self, size: f64, delimiter: &str, unit: &str) -> String {
        if self.base == 0 {
            return format_g(size);
        }
        let base = self.base as f64;
        let mut size = size;
        let mut exponent = 0;
        while size >= base && exponent < self.prefixes.chars().count() {
            size /= base;
            exponent += 1;
        }

        if exponent == 0 {
            if unit.is_empty() {
                return format_g(size);
            }
            return format!("{}{delimiter}{unit}", format_g(size));
        }

        let precision = if size > 9.0 { 0 } else { 1 };
        let mut represented = format!("{size:.precision$}");
        if represented.contains('.') {
            represented = represented
                .trim_matches('0')
                .trim_matches('.')
                .to_string();
        }
        let prefix = self.prefixes.chars().nth(exponent - 1).unwrap_or('?');
        format!("{represented}{delimiter}{prefix}{unit}")
    }
}

/// Shortest form of `value` with up to 6 significant digits, like printf's `%g`.
fn format_g(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let magnitude = if value == 0.0 {
        0
    } else {
        value.abs().log10().floor() as i32
    };
    let decimals = (5 - magnitude).max(0) as usize;
    let text = format!("{value:.decimals$}");
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}
