// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Flags shared by command line tools, to be flattened into a clap parser.
//!
//! ```no_run
//! use clap::Parser;
//!
//! #[derive(Parser)]
//! struct Opt {
//!     #[clap(flatten)]
//!     common: runez::cli::CommonFlags,
//! }
//!
//! fn main() -> runez::Result<()> {
//!     let opt = Opt::parse();
//!     opt.common.apply("my-program")
//! }
//! ```

use std::path::PathBuf;

use clap::Args;
use serde_json::{Map, Value};

use crate::config::{Configuration, DictProvider, EnvProvider, PropsfsProvider};
use crate::logsetup::{LogManager, LogSpec};
use crate::{Flatten, Result, Split, activate_colors, flattened};

#[cfg(test)]
#[path = "./cli_test.rs"]
mod cli_test;

/// `--debug`, `--dryrun`, `--log`, `--color/--no-color` and `--config`.
#[derive(Args, Clone, Debug, Default)]
pub struct CommonFlags {
    /// Show debugging information
    #[clap(long, global = true)]
    pub debug: bool,

    /// Perform a dryrun
    #[clap(short = 'n', long, global = true)]
    pub dryrun: bool,

    /// Override log file location
    #[clap(long, value_name = "PATH", global = true)]
    pub log: Option<String>,

    /// Use colors (on by default on ttys)
    #[clap(long, overrides_with = "no_color", global = true)]
    pub color: bool,

    /// Do not use colors (even if on tty)
    #[clap(long, overrides_with = "color", global = true)]
    pub no_color: bool,

    /// Override configuration
    #[clap(long, value_name = "KEY=VALUE", global = true)]
    pub config: Vec<String>,
}

impl CommonFlags {
    /// Explicit coloring choice, `None` when neither `--color` nor `--no-color` was given.
    pub fn color_choice(&self) -> Option<bool> {
        match (self.color, self.no_color) {
            (_, true) => Some(false),
            (true, false) => Some(true),
            _ => None,
        }
    }

    /// Logging settings reflecting these flags.
    pub fn log_spec(&self, appname: &str) -> LogSpec {
        LogSpec {
            appname: Some(appname.to_string()).filter(|a| !a.is_empty()),
            file_location: self.log.clone(),
            debug: self.debug,
            dryrun: self.dryrun.then_some(true),
            ..Default::default()
        }
    }

    /// Apply these flags: coloring, global configuration and logging.
    ///
    /// Configuration comes from `--config` values, then `<APPNAME>_*` env vars.
    pub fn apply(&self, appname: &str) -> Result<()> {
        self.apply_with(appname, self.log_spec(appname))
    }

    /// Same as [`CommonFlags::apply`], with logging set up from `spec`.
    pub fn apply_with(&self, appname: &str, spec: LogSpec) -> Result<()> {
        activate_colors(self.color_choice());
        ConfigOption::new()
            .with_env(Some(appname))
            .install(&self.config);
        LogManager::setup(spec)
    }
}

/// Builds a [`Configuration`] from `KEY=VALUE` command line values,
/// optionally followed by env vars, a props folder and defaults.
#[derive(Debug, Clone)]
pub struct ConfigOption {
    /// Name of the option, used to name the providers
    pub name: String,
    /// Env var prefix, `Some("")` uses the program name
    pub env: Option<String>,
    /// Prefix added to keys given on the command line
    pub prefix: Option<String>,
    /// Split command line values on this character
    pub split: Option<char>,
    /// Props folder to use, `Some(None)` for the default location
    pub propsfs: Option<Option<PathBuf>>,
    /// Values used when not configured otherwise
    pub defaults: Vec<String>,
}

impl Default for ConfigOption {
    fn default() -> Self {
        Self {
            name: "--config".to_string(),
            env: None,
            prefix: None,
            split: None,
            propsfs: None,
            defaults: Vec::new(),
        }
    }
}

impl ConfigOption {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, prefix: Option<&str>) -> Self {
        self.env = prefix.map(str::to_string);
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    pub fn with_split(mut self, split: char) -> Self {
        self.split = Some(split);
        self
    }

    pub fn with_propsfs(mut self, folder: Option<PathBuf>) -> Self {
        self.propsfs = Some(folder);
        self
    }

    pub fn with_defaults<I, S>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defaults = defaults.into_iter().map(Into::into).collect();
        self
    }

    /// Key/values from `KEY=VALUE` texts, with [`ConfigOption::prefix`] applied.
    pub fn values<S: AsRef<str>>(&self, given: &[S]) -> Map<String, Value> {
        let options = Flatten {
            split: self.split.map(Split::On),
            ..Default::default()
        };
        flattened(given.iter().map(|g| Some(g.as_ref())), &options)
            .into_iter()
            .map(|item| {
                let (key, value) = item.split_once('=').unwrap_or((item.as_str(), ""));
                let key = match &self.prefix {
                    Some(prefix) if !key.starts_with(prefix.as_str()) => format!("{prefix}{key}"),
                    _ => key.to_string(),
                };
                (key, Value::String(value.to_string()))
            })
            .collect()
    }

    /// Configuration from `given` command line values, then env vars,
    /// props folder and defaults, in that order of precedence.
    pub fn configuration<S: AsRef<str>>(&self, given: &[S]) -> Configuration {
        let mut config = Configuration::default();
        config.add(DictProvider::new(self.name.clone(), self.values(given)), false);
        if let Some(env) = &self.env {
            let prefix = if env.is_empty() {
                crate::SYS_INFO.program_name.to_uppercase().replace('-', "_")
            } else {
                env.to_uppercase().replace('-', "_")
            };
            config.add(EnvProvider::new(prefix.trim_end_matches('_')), false);
        }
        if let Some(folder) = &self.propsfs {
            config.add(PropsfsProvider::new(folder.clone()), false);
        }
        if !self.defaults.is_empty() {
            let name = format!("{} default", self.name);
            config.add(DictProvider::new(name, self.values(&self.defaults)), false);
        }
        config
    }

    /// Make the configuration from `given` values the process-wide one.
    pub fn install<S: AsRef<str>>(&self, given: &[S]) {
        *crate::config::global_mut() = self.configuration(given);
    }
}
