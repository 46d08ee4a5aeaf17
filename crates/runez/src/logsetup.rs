// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Logging setup with sensible defaults.
//!
//! [`LogManager::setup`] installs a `tracing` subscriber with a console layer
//! (stderr, warnings and above by default) and an optional file layer
//! writing to the first usable location among [`LogSpec::locations`].
//! Independently of the subscriber, a lightweight trace channel can be
//! enabled via an environment variable to show what helpers do, see [`trace`].

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use std::time::Instant;

use nix::unistd::AccessFlags;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

use crate::{Chatter, Error, Result, SYS_INFO};

#[cfg(test)]
#[path = "./logsetup_test.rs"]
mod logsetup_test;

/// Environment variable enabling the trace channel, unless overridden.
pub const DEFAULT_TRACE_ENV_VAR: &str = "TRACE_DEBUG";

/// Prefix shown in front of traced messages.
pub const DEFAULT_TRACE_PREFIX: &str = ":: ";

static RX_FORMAT_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z]\w*)\}").expect("valid regex"));

static STATE: Lazy<Mutex<LogState>> = Lazy::new(|| Mutex::new(LogState::default()));

/// Prefix of the trace channel, when enabled.
static TRACER: Lazy<RwLock<Option<String>>> = Lazy::new(|| RwLock::new(None));

#[derive(Debug, Default)]
struct LogState {
    spec: LogSpec,
    installed: bool,
    file_location: Option<PathBuf>,
}

/// What to do when the program is ran as root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootPolicy {
    Allow,
    Warn,
    Refuse,
}

/// Settings for [`LogManager::setup`].
#[derive(Debug, Clone)]
pub struct LogSpec {
    /// Program's base name, used to fill in `{appname}` (default: current program)
    pub appname: Option<String>,

    /// Base name of the log file, used when a location points to a folder
    pub basename: String,

    /// Level for console logging, `None` disables console logging
    pub console_level: Option<Level>,

    /// Level for file logging, `None` disables file logging
    pub file_level: Option<Level>,

    /// Custom file location, overrides `locations` (an empty string disables file logging)
    pub file_location: Option<String>,

    /// Candidate file locations, first usable one wins
    pub locations: Vec<String>,

    /// Folder of a development checkout we're running from, if any (`{dev}`)
    pub dev: Option<String>,

    /// Enable debug level on all outputs
    pub debug: bool,

    /// Set both console and file level at once
    pub level: Option<Level>,

    /// Set the global dry-run flag
    pub dryrun: Option<bool>,

    /// Messages logged right after setup, supporting `{argv}`, `{pid}`...
    pub greetings: Vec<String>,

    /// Env var enabling the trace channel, an optional prefix can follow a `+`,
    /// as in `MY_DEBUG+| `
    pub trace: Option<String>,

    /// What to do when ran as root (default: allowed in docker, warn otherwise)
    pub root: Option<RootPolicy>,
}

impl Default for LogSpec {
    fn default() -> Self {
        Self {
            appname: None,
            basename: "{appname}.log".to_string(),
            console_level: Some(Level::WARN),
            file_level: Some(Level::DEBUG),
            file_location: None,
            locations: default_log_locations(),
            dev: None,
            debug: false,
            level: None,
            dryrun: None,
            greetings: Vec::new(),
            trace: None,
            root: None,
        }
    }
}

impl LogSpec {
    /// Values available to `{marker}` placeholders.
    pub fn props(&self) -> HashMap<String, String> {
        let mut props = HashMap::new();
        let args: Vec<String> = std::env::args().collect();
        props.insert("argv".to_string(), crate::quoted(&args));
        props.insert("pid".to_string(), std::process::id().to_string());
        props.insert("basename".to_string(), self.basename.clone());
        if let Some(appname) = &self.appname {
            props.insert("appname".to_string(), appname.clone());
        }
        if let Some(dev) = &self.dev {
            props.insert("dev".to_string(), dev.clone());
        }
        props
    }

    /// True when settings call for logging to a file.
    pub fn should_log_to_file(&self) -> bool {
        if self.file_level.is_none() {
            return false;
        }
        match &self.file_location {
            Some(location) => !location.is_empty(),
            None => !self.locations.is_empty(),
        }
    }

    /// First usable file location, if any.
    pub fn usable_location(&self) -> Option<PathBuf> {
        if !self.should_log_to_file() {
            return None;
        }
        if let Some(location) = &self.file_location {
            return self.auto_complete_filename(location);
        }
        self.locations
            .iter()
            .find_map(|location| self.auto_complete_filename(location))
    }

    /// `location`, with `{basename}` appended when it points to a folder.
    fn auto_complete_filename(&self, location: &str) -> Option<PathBuf> {
        let props = self.props();
        let path = PathBuf::from(formatted_text(location, &props, true)?);
        if path.is_dir() {
            let filename = formatted_text(&self.basename, &props, true)?;
            if !is_writable_folder(&path) {
                return None;
            }
            return Some(path.join(filename));
        }

        let parent = path.parent()?;
        if !is_writable_folder(parent) {
            // Only one level is created, the grandparent must exist
            std::fs::create_dir(parent).ok()?;
        }
        is_writable_folder(parent).then_some(path)
    }
}

fn is_writable_folder(path: &Path) -> bool {
    path.is_dir() && nix::unistd::access(path, AccessFlags::W_OK).is_ok()
}

/// Default candidate locations for the log file.
pub fn default_log_locations() -> Vec<String> {
    vec![
        "{dev}/log/{basename}".to_string(),
        "/logs/{appname}/{basename}".to_string(),
        "/var/log/{basename}".to_string(),
    ]
}

/// `text` with `{marker}` placeholders replaced from `props`.
///
/// Values may themselves contain placeholders, resolved up to 3 levels deep.
/// Markers with no value are left as-is, unless `strict` is set in which
/// case `None` is returned.
pub fn formatted_text(text: &str, props: &HashMap<String, String>, strict: bool) -> Option<String> {
    let mut text = text.to_string();
    if text.starts_with('~') {
        text = shellexpand::tilde(&text).into_owned();
    }

    for _ in 0..3 {
        if !text.contains('{') {
            break;
        }
        let mut missing = false;
        let replaced = RX_FORMAT_MARKERS.replace_all(&text, |caps: &regex::Captures| {
            match props.get(&caps[1]) {
                Some(value) => value.clone(),
                None => {
                    missing = true;
                    caps[0].to_string()
                }
            }
        });
        if missing && strict {
            return None;
        }
        if replaced == text {
            break;
        }
        text = replaced.into_owned();
    }
    Some(text)
}

/// Global logging context, there is only one per process.
pub struct LogManager;

impl LogManager {
    /// Set up logging as per `spec`.
    ///
    /// The `tracing` subscriber can only be installed once per process,
    /// later calls refresh dry-run, trace and greetings but keep the outputs
    /// that were set up first.
    pub fn setup(mut spec: LogSpec) -> Result<()> {
        let mut state = STATE.lock().unwrap();
        if let Some(dryrun) = spec.dryrun {
            crate::set_dryrun(dryrun);
        }
        if spec.appname.is_none() {
            spec.appname = Some(SYS_INFO.program_name.clone());
        }
        if spec.debug {
            spec.console_level = spec.console_level.map(|_| Level::DEBUG);
            spec.file_level = spec.file_level.map(|_| Level::DEBUG);
        } else if let Some(level) = spec.level {
            spec.console_level = spec.console_level.map(|_| level);
            spec.file_level = spec.file_level.map(|_| level);
        }

        // A trace channel enabled programmatically survives unless explicitly configured
        match spec.trace.as_deref() {
            Some(trace) => {
                let (env_var, prefix) = trace
                    .split_once('+')
                    .unwrap_or((trace, DEFAULT_TRACE_PREFIX));
                enable_trace_from_env(env_var, prefix);
            }
            None if std::env::var(DEFAULT_TRACE_ENV_VAR).is_ok_and(|v| !v.is_empty()) => {
                enable_trace(Some(DEFAULT_TRACE_PREFIX));
            }
            None => {}
        }

        if !state.installed {
            let location = spec.usable_location();
            install_subscriber(&spec, location.as_deref())?;
            state.installed = true;
            state.file_location = location;
        }

        let props = spec.props();
        for greeting in &spec.greetings {
            if let Some(message) = formatted_text(greeting, &props, false) {
                tracing::debug!("{message}");
            }
        }

        check_root(&spec)?;
        state.spec = spec;
        Ok(())
    }

    /// Spec used by the last [`LogManager::setup`] call.
    pub fn spec() -> LogSpec {
        STATE.lock().unwrap().spec.clone()
    }

    /// File currently logged to, if any.
    pub fn file_location() -> Option<PathBuf> {
        STATE.lock().unwrap().file_location.clone()
    }

    /// True once a subscriber was installed by [`LogManager::setup`].
    pub fn is_setup() -> bool {
        STATE.lock().unwrap().installed
    }
}

fn install_subscriber(spec: &LogSpec, location: Option<&Path>) -> Result<()> {
    let console = spec.console_level.map(|level| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .with_filter(LevelFilter::from_level(level))
    });

    let file = match (location, spec.file_level) {
        (Some(path), Some(level)) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|error| Error::WriteFailed {
                    path: path.to_path_buf(),
                    error,
                })?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::from_level(level)),
            )
        }
        _ => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|err| Error::Logging(err.to_string()))
}

fn check_root(spec: &LogSpec) -> Result<()> {
    if !nix::unistd::geteuid().is_root() {
        return Ok(());
    }
    let policy = spec.root.unwrap_or(if SYS_INFO.is_running_in_docker {
        RootPolicy::Allow
    } else {
        RootPolicy::Warn
    });
    let appname = spec.appname.as_deref().unwrap_or("program");
    let message = format!("{appname} should not be ran as root!");
    match policy {
        RootPolicy::Allow => Ok(()),
        RootPolicy::Warn => {
            tracing::warn!("{message}");
            Ok(())
        }
        RootPolicy::Refuse => crate::abort(message, &crate::Policy::fatal(), ()),
    }
}

/// Enable the trace channel with `prefix`, returning the prior prefix.
pub fn enable_trace(prefix: Option<&str>) -> Option<String> {
    let mut tracer = TRACER.write().unwrap();
    std::mem::replace(&mut *tracer, prefix.map(str::to_string))
}

/// Enable the trace channel when `env_var` is set to a non-empty value,
/// disable it otherwise.
pub fn enable_trace_from_env(env_var: &str, prefix: &str) -> bool {
    let enabled = std::env::var(env_var).is_ok_and(|v| !v.is_empty());
    enable_trace(enabled.then_some(prefix));
    enabled
}

/// True when the trace channel is enabled.
pub fn is_tracing() -> bool {
    TRACER.read().unwrap().is_some()
}

/// Show `message` on stderr, if the trace channel is enabled.
pub fn trace(message: impl AsRef<str>) {
    if let Some(prefix) = TRACER.read().unwrap().as_deref() {
        let message = message.as_ref();
        eprintln!("{prefix}{}", message.strip_suffix('\n').unwrap_or(message));
    }
}

/// Logs how long a section of code took to run, when dropped.
///
/// ```
/// {
///     let _timer = runez::Timeit::new("crunching numbers");
///     // ...
/// } // logs "crunching numbers took ..."
/// ```
#[derive(Debug)]
pub struct Timeit {
    name: String,
    logger: Chatter,
    started: Instant,
}

impl Timeit {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_logger(name, Chatter::Debug)
    }

    pub fn with_logger(name: impl Into<String>, logger: Chatter) -> Self {
        Self {
            name: name.into(),
            logger,
            started: Instant::now(),
        }
    }

    /// Run `f`, logging how long it took.
    pub fn run<T>(name: impl Into<String>, f: impl FnOnce() -> T) -> T {
        let _timer = Self::new(name);
        f()
    }

    pub fn message(&self) -> String {
        let elapsed = self.started.elapsed().as_secs_f64();
        format!(
            "{} took {}",
            self.name,
            crate::represented_duration(elapsed, Some(2), " ")
        )
    }
}

impl Drop for Timeit {
    fn drop(&mut self) {
        crate::hlog(self.logger, self.message());
    }
}
