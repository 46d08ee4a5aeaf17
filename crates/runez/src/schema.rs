// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! One-level-at-a-time schemas, validating and coercing json values.
//!
//! A [`StructSchema`] describes the attributes of an object, each with a
//! [`Schema`] type and an optional default. Types implementing
//! [`Serializable`] get validated (de)serialization from json for free:
//!
//! ```
//! use runez::schema::{Schema, Serializable, StructSchema};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Settings {
//!     name: String,
//!     retries: i64,
//! }
//!
//! impl Serializable for Settings {
//!     fn schema() -> StructSchema {
//!         StructSchema::new("Settings")
//!             .with_default("name", Schema::String, json!("joe"))
//!             .with_default("retries", Schema::Integer, json!(3))
//!     }
//! }
//!
//! let settings = Settings::from_dict(&json!({"retries": "5"}), None).unwrap();
//! assert_eq!((settings.name.as_str(), settings.retries), ("joe", 5));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::path::Path;

use chrono::FixedOffset;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
    Error, Fatal, Outcome, Policy, Result, read_json, save_json, to_boolean, to_date,
    to_datetime, to_float, to_int,
};

#[cfg(test)]
#[path = "./schema_test.rs"]
mod schema_test;

/// Type constraint of a json value.
///
/// `null` always complies, and converts to `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// Any value is accepted
    Any,
    Boolean,
    /// Anything [`to_date`] understands, converted to `YYYY-MM-DD`
    Date,
    /// Anything [`to_datetime`] understands, converted to rfc3339.
    /// Values without an explicit timezone are in `tz` (UTC when `None`)
    Datetime { tz: Option<FixedOffset> },
    Dict { key: Box<Schema>, value: Box<Schema> },
    /// One of the given text values
    Enum(BTreeSet<String>),
    Float,
    Integer,
    List(Box<Schema>),
    String,
    Struct(Box<StructSchema>),
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Schema {
    /// Dict with keys and values constrained by `key` and `value`.
    pub fn dict(key: Schema, value: Schema) -> Self {
        Schema::Dict {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn list(subtype: Schema) -> Self {
        Schema::List(Box::new(subtype))
    }

    /// Enum of whitespace separated `values`.
    pub fn enumeration(values: &str) -> Self {
        Schema::Enum(values.split_whitespace().map(String::from).collect())
    }

    /// Schema type implied by a sample `value`, typically a default.
    pub fn inferred(value: &Value) -> Self {
        match value {
            Value::Null => Schema::Any,
            Value::Bool(_) => Schema::Boolean,
            Value::Number(n) if n.is_f64() => Schema::Float,
            Value::Number(_) => Schema::Integer,
            Value::String(_) => Schema::String,
            Value::Array(_) => Schema::list(Schema::Any),
            Value::Object(_) => Schema::dict(Schema::Any, Schema::Any),
        }
    }

    /// Explanation of why `value` doesn't comply, if it doesn't.
    pub fn problem(&self, value: &Value) -> Option<String> {
        if value.is_null() {
            return None;
        }
        match self {
            Schema::Any | Schema::Boolean => None,
            Schema::Date => to_date(&text(value))
                .is_none()
                .then(|| format!("expecting date, got '{}'", text(value))),
            Schema::Datetime { tz } => to_datetime(&text(value), *tz)
                .is_none()
                .then(|| format!("expecting datetime, got '{}'", text(value))),
            Schema::Dict { key, value: subtype } => {
                let Value::Object(map) = value else {
                    return Some(format!("expecting dict, got '{}'", text(value)));
                };
                map.iter().find_map(|(k, v)| {
                    key.problem(&Value::String(k.clone()))
                        .map(|p| format!("key: {p}"))
                        .or_else(|| subtype.problem(v).map(|p| format!("value: {p}")))
                })
            }
            Schema::Enum(values) => (!values.contains(&text(value)))
                .then(|| format!("'{}' is not one of {self}", text(value))),
            Schema::Float => to_float(&text(value))
                .is_none()
                .then(|| format!("expecting float, got '{}'", text(value))),
            Schema::Integer => to_int(&text(value))
                .is_none()
                .then(|| format!("expecting int, got '{}'", text(value))),
            Schema::List(subtype) => match value {
                Value::Array(items) => items.iter().find_map(|v| subtype.problem(v)),
                _ => Some(format!("expecting list, got '{}'", text(value))),
            },
            Schema::String => (!value.is_string())
                .then(|| format!("expecting string, got '{}'", text(value))),
            Schema::Struct(schema) => match value {
                Value::Object(map) => schema.problem(map),
                _ => Some(format!(
                    "expecting structure {}, got '{}'",
                    schema.name,
                    text(value)
                )),
            },
        }
    }

    /// `value` converted to comply with this type.
    ///
    /// Values that can't be converted are returned as-is, see [`Schema::problem`].
    pub fn converted(&self, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        let converted = match self {
            Schema::Any | Schema::Enum(_) => None,
            Schema::Boolean => match value {
                Value::Bool(_) => None,
                other => Some(Value::Bool(to_boolean(&text(other)))),
            },
            Schema::Date => to_date(&text(value)).map(|d| Value::String(d.to_string())),
            Schema::Datetime { tz } => {
                to_datetime(&text(value), *tz).map(|dt| Value::String(dt.to_rfc3339()))
            }
            Schema::Dict { key, value: subtype } => match value {
                Value::Object(map) => Some(Value::Object(
                    map.iter()
                        .map(|(k, v)| {
                            let k = text(&key.converted(&Value::String(k.clone())));
                            (k, subtype.converted(v))
                        })
                        .collect(),
                )),
                _ => None,
            },
            Schema::Float => to_float(&text(value)).map(Value::from),
            Schema::Integer => to_int(&text(value)).map(Value::from),
            Schema::List(subtype) => match value {
                Value::Array(items) => Some(items.iter().map(|v| subtype.converted(v)).collect()),
                _ => None,
            },
            Schema::String => Some(Value::String(text(value))),
            Schema::Struct(schema) => match value {
                Value::Object(map) => Some(Value::Object(schema.converted(map))),
                _ => None,
            },
        };
        converted.unwrap_or_else(|| value.clone())
    }

    /// Error describing why `value` doesn't comply, if it doesn't.
    pub fn validate(&self, value: &Value) -> Result<()> {
        match self.problem(value) {
            Some(problem) => Err(Error::ValidationFailed(problem)),
            None => Ok(()),
        }
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Schema::Any => write!(f, "Any"),
            Schema::Boolean => write!(f, "Boolean"),
            Schema::Date => write!(f, "Date"),
            Schema::Datetime { .. } => write!(f, "Datetime"),
            Schema::Dict { key, value } => write!(f, "Dict[{key}, {value}]"),
            Schema::Enum(values) => write!(f, "Enum[{}]", crate::joined(values, ", ")),
            Schema::Float => write!(f, "Float"),
            Schema::Integer => write!(f, "Integer"),
            Schema::List(subtype) => write!(f, "List[{subtype}]"),
            Schema::String => write!(f, "String"),
            Schema::Struct(schema) => write!(f, "{}", schema.name),
        }
    }
}

/// An attribute of a [`StructSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub schema: Schema,
    /// Used when no value is provided, `null` for no default
    pub default: Value,
}

impl Field {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            default: Value::Null,
        }
    }

    /// Field typed after its `default`.
    pub fn inferred(default: Value) -> Self {
        Self {
            schema: Schema::inferred(&default),
            default,
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.default {
            Value::Null => write!(f, "{}", self.schema),
            default => write!(f, "{} (default: {})", self.schema, text(default)),
        }
    }
}

/// Attributes of an object, with their types.
///
/// Mismatching values are reported per `strict`: an error with
/// [`Fatal::Abort`], a warning with [`Fatal::Log`], or ignored with
/// [`Fatal::Quiet`] (the default). Keys not described by the schema are
/// reported the same way per `extras`, except those in `ignored_extras`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructSchema {
    pub name: String,
    pub fields: BTreeMap<String, Field>,
    /// Attribute identifying objects, at most one
    pub unique_identifier: Option<String>,
    pub strict: Fatal,
    pub extras: Fatal,
    pub ignored_extras: Vec<String>,
}

impl StructSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
            unique_identifier: None,
            strict: Fatal::Quiet,
            extras: Fatal::Quiet,
            ignored_extras: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.fields.insert(name.into(), Field::new(schema));
        self
    }

    pub fn with_default(
        mut self,
        name: impl Into<String>,
        schema: Schema,
        default: Value,
    ) -> Self {
        self.fields.insert(name.into(), Field { schema, default });
        self
    }

    /// Add attribute `name`, identifying objects.
    pub fn with_identifier(mut self, name: impl Into<String>, schema: Schema) -> Result<Self> {
        let name = name.into();
        if let Some(existing) = &self.unique_identifier {
            return Err(Error::ValidationFailed(format!(
                "Multiple unique ids specified for {}: {existing} and {name}",
                self.name
            )));
        }
        self.unique_identifier = Some(name.clone());
        Ok(self.with_field(name, schema))
    }

    pub fn with_strict(mut self, strict: Fatal) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_extras<I, S>(mut self, extras: Fatal, ignored: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extras = extras;
        self.ignored_extras = ignored.into_iter().map(Into::into).collect();
        self
    }

    /// Names of attributes with type `schema`, sorted.
    pub fn attributes_by_type(&self, schema: &Schema) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, field)| &field.schema == schema)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Explanation of why `value` doesn't comply, if it doesn't.
    ///
    /// Undescribed keys are a problem only when `extras` is [`Fatal::Abort`].
    pub fn problem(&self, value: &Map<String, Value>) -> Option<String> {
        let problem = self.fields.iter().find_map(|(name, field)| {
            field
                .schema
                .problem(value.get(name).unwrap_or(&Value::Null))
        });
        if problem.is_some() || self.extras != Fatal::Abort {
            return problem;
        }
        self.extra_keys(value)
            .first()
            .map(|key| format!("'{key}' is not an attribute of {}", self.name))
    }

    /// `value` with defaults filled in and compliant values converted.
    pub fn converted(&self, value: &Map<String, Value>) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(name, field)| {
                let given = value.get(name).unwrap_or(&field.default);
                let converted = match field.schema.problem(given) {
                    None => field.schema.converted(given),
                    Some(_) => given.clone(),
                };
                (name.clone(), converted)
            })
            .collect()
    }

    /// Attribute values deserialized from `data`, `source` describes where
    /// `data` came from.
    pub fn deserialized(&self, data: &Value, source: Option<&str>) -> Result<Map<String, Value>> {
        let empty = Map::new();
        let given = match data {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => {
                return Err(Error::ValidationFailed(format!(
                    "Can't deserialize {}: expecting dict, got '{}'",
                    self.name,
                    text(other)
                )));
            }
        };
        let mut result = Map::new();
        for (name, field) in &self.fields {
            let value = given.get(name).unwrap_or(&field.default);
            let value = match field.schema.problem(value) {
                None => field.schema.converted(value),
                Some(problem) => {
                    let origin = source.map(|s| format!(" from {s}")).unwrap_or_default();
                    let message =
                        format!("Can't deserialize {}.{name}{origin}: {problem}", self.name);
                    notify(self.strict, message)?;
                    value.clone()
                }
            };
            result.insert(name.clone(), value);
        }

        let extras = self.extra_keys(given);
        if !extras.is_empty() {
            let message = format!(
                "Extra content given for {}: {}",
                self.name,
                crate::joined(&extras, ", ")
            );
            notify(self.extras, message)?;
        }
        Ok(result)
    }

    /// Attributes whose values differ between `first` and `second`, with both values.
    pub fn changed_attributes(
        &self,
        first: &Map<String, Value>,
        second: &Map<String, Value>,
    ) -> Vec<(String, Value, Value)> {
        self.fields
            .keys()
            .filter_map(|name| {
                let a = first.get(name).cloned().unwrap_or_default();
                let b = second.get(name).cloned().unwrap_or_default();
                (a != b).then(|| (name.clone(), a, b))
            })
            .collect()
    }

    fn extra_keys<'a>(&self, value: &'a Map<String, Value>) -> Vec<&'a str> {
        value
            .keys()
            .filter(|k| !self.fields.contains_key(*k) && !self.ignored_extras.contains(*k))
            .map(String::as_str)
            .collect()
    }
}

fn notify(fatal: Fatal, message: String) -> Result<()> {
    match fatal {
        Fatal::Abort => Err(Error::ValidationFailed(message)),
        Fatal::Log => {
            tracing::warn!("{message}");
            Ok(())
        }
        Fatal::Quiet => Ok(()),
    }
}

/// Objects (de)serialized via serde, with values validated and coerced per [`Serializable::schema`].
pub trait Serializable: Serialize + DeserializeOwned {
    fn schema() -> StructSchema;

    /// Object from raw `data`, coming for example from a json file.
    fn from_dict(data: &Value, source: Option<&str>) -> Result<Self> {
        let values = Self::schema().deserialized(data, source)?;
        Ok(serde_json::from_value(Value::Object(values))?)
    }

    fn to_dict(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Object deserialized from json file `path`, `None` when it can't be
    /// read under a non-fatal `policy`.
    fn from_json<P: AsRef<Path>>(path: P, policy: &Policy) -> Result<Option<Self>> {
        let path = path.as_ref();
        match read_json(path, policy)? {
            Some(data) => {
                let source = path.display().to_string();
                Self::from_dict(&data, Some(&source)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn save_json<P: AsRef<Path>>(&self, path: P, policy: &Policy) -> Result<Outcome> {
        save_json(&self.to_dict()?, path, policy)
    }
}
