// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Process-wide switches (dry-run, anchors) and text helpers.
//!
//! Everything that ends up in a log message goes through [`short`] or
//! [`quoted`], which replace anchored folders and the home folder so that
//! paths read relative to what the user is working on.

use std::fmt::Display;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

#[cfg(test)]
#[path = "./base_test.rs"]
mod base_test;

/// Symbolic name shown in place of a temporary folder while in dry-run mode.
pub const SYMBOLIC_TMP: &str = "<tmp>";

static DRYRUN: AtomicBool = AtomicBool::new(false);

/// Anchored folders, kept sorted in reverse order so that longer paths are
/// replaced before their parents.
static ANCHORS: Lazy<RwLock<Vec<String>>> = Lazy::new(|| RwLock::new(Vec::new()));

/// Home folder to show as `~`, not used when running as root.
static HOME: Lazy<Option<String>> = Lazy::new(|| {
    if nix::unistd::geteuid().is_root() {
        return None;
    }
    dirs::home_dir().map(|p| p.display().to_string())
});

static RX_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\n]+").expect("valid regex"));

static RX_ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b(\[[;\d]*[A-Za-z]?)?").expect("valid regex"));

/// True when file and process operations should only be simulated.
pub fn is_dryrun() -> bool {
    DRYRUN.load(Ordering::SeqCst)
}

/// Set the global dry-run flag, returning its previous value.
pub fn set_dryrun(dryrun: bool) -> bool {
    DRYRUN.swap(dryrun, Ordering::SeqCst)
}

/// Dry-run setting to use, given an optional per-call override.
pub fn resolved_dryrun(dryrun: Option<bool>) -> bool {
    dryrun.unwrap_or_else(is_dryrun)
}

/// Known folders that are not shown in full when printing or logging.
///
/// The associated functions manipulate the process-wide anchor list, an
/// instance keeps its folders anchored until it is dropped:
///
/// ```
/// let _anchor = runez::Anchored::scoped(["/tmp/project"]);
/// assert_eq!(runez::Anchored::short("/tmp/project/src/lib.rs"), "src/lib.rs");
/// ```
#[derive(Debug)]
pub struct Anchored {
    folders: Vec<String>,
}

impl Anchored {
    /// Anchor the given folders until the returned guard is dropped.
    pub fn scoped<I, P>(folders: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let folders: Vec<String> = folders.into_iter().map(anchor_text).collect();
        Self::add(&folders);
        Self { folders }
    }

    /// Replace all current anchors.
    pub fn set<I, P>(anchors: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut paths: Vec<String> = anchors.into_iter().map(anchor_text).unique().collect();
        paths.sort_by(|a, b| b.cmp(a));
        *ANCHORS.write().unwrap() = paths;
    }

    /// Add folders to the current anchors.
    pub fn add<I, P>(anchors: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut paths = ANCHORS.write().unwrap();
        for anchor in anchors.into_iter().map(anchor_text) {
            if !paths.contains(&anchor) {
                paths.push(anchor);
            }
        }
        paths.sort_by(|a, b| b.cmp(a));
    }

    /// Remove folders from the current anchors.
    pub fn pop<I, P>(anchors: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut paths = ANCHORS.write().unwrap();
        for anchor in anchors.into_iter().map(anchor_text) {
            paths.retain(|p| *p != anchor);
        }
    }

    /// Currently anchored folders.
    pub fn paths() -> Vec<String> {
        ANCHORS.read().unwrap().clone()
    }

    /// `text` with anchored folders removed and the home folder shown as `~`.
    pub fn short(text: impl Display) -> String {
        let mut text = text.to_string();
        for anchor in ANCHORS.read().unwrap().iter() {
            if !anchor.is_empty() {
                text = text.replace(&format!("{anchor}{}", std::path::MAIN_SEPARATOR), "");
            }
        }
        if let Some(home) = HOME.as_deref() {
            if home.len() > 1 {
                text = text.replace(home, "~");
            }
        }
        text
    }
}

impl Drop for Anchored {
    fn drop(&mut self) {
        Self::pop(&self.folders);
    }
}

fn anchor_text<P: AsRef<Path>>(path: P) -> String {
    resolved_path(path, None).display().to_string()
}

/// Absolute form of `path`, with `~` expanded.
///
/// Relative paths are resolved against `base` when given, or the current
/// working folder otherwise. The symbolic dry-run temp folder is returned as-is.
pub fn resolved_path<P: AsRef<Path>>(path: P, base: Option<&Path>) -> PathBuf {
    let path = path.as_ref();
    let text = path.to_string_lossy();
    if text.is_empty() || text.starts_with(SYMBOLIC_TMP) {
        return path.to_path_buf();
    }

    let expanded = PathBuf::from(shellexpand::tilde(&text).as_ref());
    if expanded.is_absolute() {
        return normalized(&expanded);
    }

    let base = match base {
        Some(base) => resolved_path(base, None),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")),
    };
    normalized(&base.join(expanded))
}

/// Lexically remove `.` and `..` components, without touching the filesystem.
fn normalized(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Short textual form of `value`, fitting in the terminal width.
pub fn short(value: impl Display) -> String {
    short_to(value, None)
}

/// Short textual form of `value`: whitespace runs collapsed to one space,
/// anchors applied, and cut to `size` chars (terminal width when `None`,
/// no limit when `Some(0)`).
pub fn short_to(value: impl Display, size: Option<usize>) -> String {
    let text = value.to_string();
    let text = RX_SPACES.replace_all(text.trim(), " ");
    let text = Anchored::short(text);
    let size = size.unwrap_or_else(crate::system::terminal_columns);
    shortened(&text, size)
}

/// `text` cut to at most `size` chars, ending with `...` when it was cut.
pub fn shortened(text: &str, size: usize) -> String {
    let count = text.chars().count();
    if size == 0 || count <= size {
        return text.to_string();
    }
    let keep = size.saturating_sub(3);
    format!("{}...", text.chars().take(keep).collect::<String>())
}

/// `text` without ANSI color codes.
pub fn uncolored(text: &str) -> String {
    RX_ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Space-separated `items`, quoting those that contain a space.
///
/// Items are shown in their anchored short form, double quotes are used
/// unless the item itself contains a double quote.
pub fn quoted<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    items
        .into_iter()
        .map(|item| {
            let text = Anchored::short(item);
            if text.contains(' ') {
                let sep = if text.contains('"') { '\'' } else { '"' };
                format!("{sep}{text}{sep}")
            } else {
                text
            }
        })
        .join(" ")
}

/// Textual form of `items`, joined with `delimiter`.
pub fn joined<I>(items: I, delimiter: &str) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    items.into_iter().join(delimiter)
}

/// How strings are split when flattening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Whitespace,
    On(char),
}

/// Options for [`flattened`].
#[derive(Debug, Clone, Default)]
pub struct Flatten {
    /// Keep empty strings.
    pub keep_empty: bool,

    /// Text to use in place of missing values (missing values are dropped otherwise).
    pub none: Option<String>,

    /// Split each value, implies `strip`.
    pub split: Option<Split>,

    /// Trim whitespace around each value.
    pub strip: bool,

    /// Drop `--flag` when it is immediately followed by a missing value.
    pub shellify: bool,

    /// Keep only the first occurrence of each value.
    pub unique: bool,
}

/// Flat list of strings from `values`, filtered per `options`.
pub fn flattened<I, S>(values: I, options: &Flatten) -> Vec<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut result = Vec::new();
    for value in values {
        match value {
            Some(value) => flatten_text(&mut result, value.as_ref(), options.split, options),
            None => {
                if let Some(none) = &options.none {
                    push_value(&mut result, none.clone(), options);
                } else if options.shellify
                    && result.last().is_some_and(|last: &String| last.starts_with('-'))
                {
                    result.pop();
                }
            }
        }
    }
    result
}

fn flatten_text(result: &mut Vec<String>, value: &str, split: Option<Split>, options: &Flatten) {
    match split {
        Some(split) if value.contains('\n') => {
            for line in value.lines().map(str::trim).filter(|l| !l.is_empty()) {
                flatten_text(result, line, Some(split), options);
            }
        }
        Some(Split::Whitespace) => {
            for piece in value.split_whitespace() {
                push_value(result, piece.to_string(), options);
            }
        }
        Some(Split::On(sep)) => {
            for piece in value.split(sep) {
                push_value(result, piece.trim().to_string(), options);
            }
        }
        None if options.strip => push_value(result, value.trim().to_string(), options),
        None => push_value(result, value.to_string(), options),
    }
}

fn push_value(result: &mut Vec<String>, value: String, options: &Flatten) {
    if value.is_empty() && !options.keep_empty {
        return;
    }
    if !options.unique || !result.contains(&value) {
        result.push(value);
    }
}

/// Command line arguments from `args`, dropping `["--flag", None]` pairs.
///
/// ```
/// let args = runez::shellified([Some("ls"), Some("-l"), Some("--color"), None]);
/// assert_eq!(args, vec!["ls", "-l"]);
/// ```
pub fn shellified<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let options = Flatten {
        keep_empty: true,
        shellify: true,
        ..Default::default()
    };
    flattened(args, &options)
}

/// First line of `text`.
///
/// Empty lines are skipped and the result trimmed, unless `keep_empty` is set.
pub fn first_line(text: &str, keep_empty: bool) -> Option<&str> {
    let mut lines = text.lines();
    if keep_empty {
        return lines.next();
    }
    lines.map(str::trim).find(|line| !line.is_empty())
}

/// `value` brought within the optional `minimum` and `maximum` bounds.
pub fn capped<T: PartialOrd>(value: T, minimum: Option<T>, maximum: Option<T>) -> T {
    if let Some(minimum) = minimum {
        if value < minimum {
            return minimum;
        }
    }
    if let Some(maximum) = maximum {
        if value > maximum {
            return maximum;
        }
    }
    value
}

/// Process output as text.
pub fn decode(value: &[u8], strip: bool) -> String {
    let text = String::from_utf8_lossy(value);
    if strip {
        text.trim().to_string()
    } else {
        text.into_owned()
    }
}
