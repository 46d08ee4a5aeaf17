// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Json helpers producing clean, stable output.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;

use crate::{Error, Outcome, Policy, Result, abort, hdry, hlog, resolved_path, short};

#[cfg(test)]
#[path = "./serialize_test.rs"]
mod serialize_test;

/// Default indentation of [`represented_json`] and [`save_json`].
pub const DEFAULT_INDENT: usize = 2;

/// Deserialize json `text`.
///
/// Only objects, lists and strings are accepted, so that a stray word or
/// number isn't mistaken for a json document.
pub fn from_json(text: &str) -> Result<Value> {
    let text = text.trim();
    let delimiters = match (text.chars().next(), text.chars().last()) {
        (Some(first), Some(last)) if text.len() > 1 => format!("{first}{last}"),
        _ => String::new(),
    };
    if !matches!(delimiters.as_str(), "{}" | "[]" | "\"\"") {
        return Err(Error::InvalidJson {
            message: format!("'{}' does not contain json", short(text)),
            error: None,
        });
    }
    serde_json::from_str(text).map_err(|error| Error::InvalidJson {
        message: format!("can't deserialize '{}'", short(text)),
        error: Some(error),
    })
}

/// Json contents of file `path`, `None` when it can't be read or parsed
/// under a non-fatal `policy`.
pub fn read_json<P: AsRef<Path>>(path: P, policy: &Policy) -> Result<Option<Value>> {
    let path = resolved_path(path, None);
    let result = std::fs::read_to_string(&path)
        .map_err(Error::from)
        .and_then(|content| serde_json::from_str(&content).map_err(Error::from));
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) => abort(
            format!("Can't read {}: {err}", short(path.display())),
            policy,
            None,
        ),
    }
}

/// `value` with null object keys removed, recursively.
pub fn json_sanitized(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, json_sanitized(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(json_sanitized).collect()),
        other => other,
    }
}

/// Sanitized json representation of `value`, with sorted keys.
///
/// Indented output ends with a newline, `None` gives a compact one-liner.
pub fn represented_json<T: Serialize + ?Sized>(value: &T, indent: Option<usize>) -> Result<String> {
    let value = json_sanitized(serde_json::to_value(value)?);
    let Some(indent) = indent.filter(|i| *i > 0) else {
        return Ok(serde_json::to_string(&value)?);
    };
    let indentation = " ".repeat(indent);
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(indentation.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    let mut text = String::from_utf8_lossy(&buffer).into_owned();
    text.push('\n');
    Ok(text)
}

/// Save `value` as indented json in file `path`.
pub fn save_json<T: Serialize + ?Sized, P: AsRef<Path>>(
    value: &T,
    path: P,
    policy: &Policy,
) -> Result<Outcome> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Ok(Outcome::NoOp);
    }
    let path = resolved_path(path, None);
    if hdry(policy, format!("save {}", short(path.display()))) {
        return Ok(Outcome::Done);
    }

    let result = represented_json(value, Some(DEFAULT_INDENT)).and_then(|text| {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, text).map_err(|error| Error::WriteFailed {
            path: path.clone(),
            error,
        })
    });
    match result {
        Ok(()) => {
            hlog(policy.logger, format!("Saved {}", short(path.display())));
            Ok(Outcome::Done)
        }
        Err(err) => abort(
            format!("Can't save {}: {err}", short(path.display())),
            policy,
            Outcome::Failed,
        ),
    }
}
