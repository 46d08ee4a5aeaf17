// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Configuration lookup from a chain of providers.
//!
//! The first provider holding a value for a key wins, so providers are
//! added from most to least specific:
//!
//! ```
//! use runez::config::{Configuration, DictProvider, EnvProvider};
//!
//! let mut config = Configuration::default();
//! config.add(EnvProvider::new("MY_PROGRAM"), false);
//! config.add(DictProvider::from_pairs("defaults", [("retries", "3")]), false);
//! assert_eq!(config.get_int("retries", None, None, None), Some(3));
//! ```

use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::{Policy, Result, capped, to_boolean, to_bytesize_in, to_float, to_int};

#[cfg(test)]
#[path = "./config_test.rs"]
mod config_test;

/// Process-wide configuration, empty until providers are added.
pub static CONFIG: Lazy<RwLock<Configuration>> = Lazy::new(|| RwLock::new(Configuration::default()));

/// Source of configured values.
pub trait ConfigProvider: Debug + Send + Sync {
    /// Identifies this provider, only one provider per id is kept.
    fn provider_id(&self) -> String;

    /// Value configured for `key`, if any.
    fn get(&self, key: &str) -> Option<Value>;

    /// All values from this provider.
    fn values(&self) -> Map<String, Value>;

    fn len(&self) -> usize {
        self.values().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short overview of this provider.
    fn overview(&self) -> String {
        format!("{}: {} values", self.provider_id(), self.len())
    }
}

/// Key/value pairs held in memory.
#[derive(Debug, Clone, Default)]
pub struct DictProvider {
    name: String,
    values: Map<String, Value>,
}

impl DictProvider {
    pub fn new(name: impl Into<String>, values: Map<String, Value>) -> Self {
        let name = name.into();
        Self {
            name: if name.is_empty() { "dict".to_string() } else { name },
            values,
        }
    }

    pub fn from_pairs<I, K, V>(name: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        Self::new(name, values)
    }
}

impl ConfigProvider for DictProvider {
    fn provider_id(&self) -> String {
        self.name.clone()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn values(&self) -> Map<String, Value> {
        self.values.clone()
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}

/// Values from environment variables named `<PREFIX>_<KEY>`.
///
/// Keys are uppercased, with `-` and `.` turned into `_`.
#[derive(Debug, Clone)]
pub struct EnvProvider {
    prefix: String,
}

impl EnvProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().to_uppercase(),
        }
    }

    fn env_var_name(&self, key: &str) -> String {
        let key = key.to_uppercase().replace(['-', '.'], "_");
        if self.prefix.is_empty() {
            key
        } else {
            format!("{}_{key}", self.prefix)
        }
    }
}

impl ConfigProvider for EnvProvider {
    fn provider_id(&self) -> String {
        "env".to_string()
    }

    fn get(&self, key: &str) -> Option<Value> {
        std::env::var(self.env_var_name(key)).ok().map(Value::String)
    }

    fn values(&self) -> Map<String, Value> {
        let marker = format!("{}_", self.prefix);
        std::env::vars()
            .filter_map(|(name, value)| {
                let key = name.strip_prefix(&marker)?;
                Some((key.to_lowercase(), Value::String(value)))
            })
            .collect()
    }

    fn overview(&self) -> String {
        format!("env: {} values ({}_*)", self.len(), self.prefix)
    }
}

/// Values from a folder holding one file per key, like a mounted props filesystem.
#[derive(Debug, Clone)]
pub struct PropsfsProvider {
    folder: PathBuf,
}

impl PropsfsProvider {
    pub fn new(folder: Option<PathBuf>) -> Self {
        let folder = folder.unwrap_or_else(|| {
            if cfg!(target_os = "macos") {
                PathBuf::from("/Volumes/props")
            } else {
                PathBuf::from("/mnt/props")
            }
        });
        Self { folder }
    }
}

impl ConfigProvider for PropsfsProvider {
    fn provider_id(&self) -> String {
        "propsfs".to_string()
    }

    fn get(&self, key: &str) -> Option<Value> {
        let content = std::fs::read(self.folder.join(key)).ok()?;
        Some(Value::String(crate::decode(&content, true)))
    }

    fn values(&self) -> Map<String, Value> {
        crate::ls_dir(&self.folder)
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_string_lossy().into_owned();
                let lines = crate::readlines(&path, None, &Policy::quiet()).ok()?;
                Some((name, Value::String(lines.join("\n"))))
            })
            .collect()
    }

    fn len(&self) -> usize {
        crate::ls_dir(&self.folder).len()
    }

    fn overview(&self) -> String {
        format!("propsfs: {}", self.folder.display())
    }
}

/// Configuration from a chain of providers.
#[derive(Debug, Default)]
pub struct Configuration {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl Configuration {
    pub fn new<I>(providers: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn ConfigProvider>>,
    {
        let mut config = Self::default();
        for provider in providers {
            config.add_boxed(provider, false);
        }
        config
    }

    pub fn providers(&self) -> &[Box<dyn ConfigProvider>] {
        &self.providers
    }

    /// Total number of values across all providers.
    pub fn len(&self) -> usize {
        self.providers.iter().map(|p| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Effective values, as seen through the provider chain.
    pub fn values(&self) -> Map<String, Value> {
        let mut result = Map::new();
        for provider in self.providers.iter().rev() {
            result.extend(provider.values());
        }
        result
    }

    /// Overview of current providers, joined with `delimiter`.
    pub fn overview(&self, delimiter: &str) -> String {
        self.providers
            .iter()
            .map(|p| p.overview())
            .collect::<Vec<_>>()
            .join(delimiter)
    }

    pub fn clear(&mut self) {
        self.providers.clear();
    }

    pub fn provider_by_id(&self, id: &str) -> Option<&dyn ConfigProvider> {
        self.providers
            .iter()
            .find(|p| p.provider_id() == id)
            .map(|p| p.as_ref())
    }

    /// Add `provider`, replacing any existing one with the same id.
    ///
    /// New providers go last (lowest precedence) unless `front` is set.
    pub fn add<P: ConfigProvider + 'static>(&mut self, provider: P, front: bool) {
        self.add_boxed(Box::new(provider), front);
    }

    pub fn add_boxed(&mut self, provider: Box<dyn ConfigProvider>, front: bool) {
        let id = provider.provider_id();
        if let Some(i) = self.providers.iter().position(|p| p.provider_id() == id) {
            crate::logsetup::trace(format!("Replacing config provider {id} at index {i}"));
            self.providers[i] = provider;
        } else if front {
            crate::logsetup::trace(format!("Adding config provider {id} to front"));
            self.providers.insert(0, provider);
        } else {
            crate::logsetup::trace(format!("Adding config provider {id}"));
            self.providers.push(provider);
        }
    }

    /// Add existing json files from `paths` as providers named after them.
    pub fn use_json<I, P>(&mut self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        for path in paths {
            let path = path.as_ref();
            if path.is_empty() {
                continue;
            }
            let full_path = crate::to_path(path);
            if !full_path.exists() {
                continue;
            }
            if let Some(Value::Object(values)) = crate::read_json(&full_path, &Policy::fatal())? {
                self.add(DictProvider::new(path, values), false);
            }
        }
        Ok(())
    }

    /// Value of `key` from the first provider that has one.
    pub fn get(&self, key: &str) -> Option<Value> {
        if key.is_empty() {
            return None;
        }
        for provider in &self.providers {
            if let Some(value) = provider.get(key) {
                crate::logsetup::trace(format!(
                    "Using {key}='{value}' from {}",
                    provider.provider_id()
                ));
                return Some(value);
            }
        }
        None
    }

    /// Value of `key` as text.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).map(stringified)
    }

    pub fn get_int(
        &self,
        key: &str,
        default: Option<i64>,
        minimum: Option<i64>,
        maximum: Option<i64>,
    ) -> Option<i64> {
        let value = self.get_str(key).and_then(|v| to_int(&v)).or(default)?;
        Some(capped(value, minimum, maximum))
    }

    pub fn get_float(
        &self,
        key: &str,
        default: Option<f64>,
        minimum: Option<f64>,
        maximum: Option<f64>,
    ) -> Option<f64> {
        let value = self.get_str(key).and_then(|v| to_float(&v)).or(default)?;
        Some(capped(value, minimum, maximum))
    }

    pub fn get_bool(&self, key: &str, default: Option<bool>) -> Option<bool> {
        self.get_str(key).map(|v| to_boolean(&v)).or(default)
    }

    /// Size in bytes configured under `key`, like `10k` (base 1024).
    ///
    /// `default`, `minimum` and `maximum` are expressed the same way.
    pub fn get_bytesize(
        &self,
        key: &str,
        default: Option<&str>,
        minimum: Option<&str>,
        maximum: Option<&str>,
    ) -> Option<u64> {
        self.get_bytesize_in(key, default, minimum, maximum, None, 1024)
    }

    /// Same as [`Configuration::get_bytesize`], with an explicit `default_unit` and `base`.
    pub fn get_bytesize_in(
        &self,
        key: &str,
        default: Option<&str>,
        minimum: Option<&str>,
        maximum: Option<&str>,
        default_unit: Option<&str>,
        base: u64,
    ) -> Option<u64> {
        let parse = |text: Option<&str>| text.and_then(|t| to_bytesize_in(t, default_unit, base));
        match self.get_str(key).as_deref().and_then(|v| parse(Some(v))) {
            Some(value) => Some(capped(value, parse(minimum), parse(maximum))),
            None => parse(default),
        }
    }

    /// Deserialized json configured under `key`.
    pub fn get_json(&self, key: &str, default: Option<Value>) -> Option<Value> {
        match self.get(key) {
            Some(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
            Some(Value::String(text)) => crate::from_json(&text).ok().or(default),
            _ => default,
        }
    }
}

impl std::fmt::Display for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.providers.is_empty() {
            return f.write_str("empty");
        }
        let ids: Vec<String> = self.providers.iter().map(|p| p.provider_id()).collect();
        f.write_str(&ids.join(", "))
    }
}

fn stringified(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Read access to the process-wide configuration.
pub fn global() -> RwLockReadGuard<'static, Configuration> {
    CONFIG.read().unwrap()
}

/// Write access to the process-wide configuration.
pub fn global_mut() -> RwLockWriteGuard<'static, Configuration> {
    CONFIG.write().unwrap()
}

/// Value of `key` in the process-wide configuration.
pub fn get(key: &str) -> Option<Value> {
    global().get(key)
}

pub fn get_str(key: &str) -> Option<String> {
    global().get_str(key)
}

pub fn get_int(key: &str, default: Option<i64>) -> Option<i64> {
    global().get_int(key, default, None, None)
}

pub fn get_float(key: &str, default: Option<f64>) -> Option<f64> {
    global().get_float(key, default, None, None)
}

pub fn get_bool(key: &str, default: Option<bool>) -> Option<bool> {
    global().get_bool(key, default)
}

pub fn get_bytesize(key: &str, default: Option<&str>) -> Option<u64> {
    global().get_bytesize(key, default, None, None)
}

pub fn get_json(key: &str, default: Option<Value>) -> Option<Value> {
    global().get_json(key, default)
}
