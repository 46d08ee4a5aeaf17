// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Information about the current run: platform, user, host and terminal.

use std::path::Path;

use console::Term;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

#[cfg(test)]
#[path = "./system_test.rs"]
mod system_test;

const DEFAULT_COLUMNS: usize = 160;
const DEFAULT_LINES: usize = 25;

/// Cached info about the current process.
pub static SYS_INFO: Lazy<SystemInfo> = Lazy::new(SystemInfo::current);

/// Info about the current run, determined once.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    /// Simplified platform identifier, like `linux-x86_64` or `macos-aarch64`
    pub platform_id: String,
    pub hostname: String,
    pub userid: String,
    pub program_name: String,
    pub pid: u32,
    pub is_running_in_docker: bool,
}

impl SystemInfo {
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "macos",
            other => other,
        };
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_string());
        let userid = std::env::var("USER")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| whoami::username());
        Self {
            platform_id: format!("{os}-{}", std::env::consts::ARCH),
            hostname,
            userid,
            program_name: program_name(),
            pid: std::process::id(),
            is_running_in_docker: is_running_in_docker(),
        }
    }

    /// Key/value pairs describing this run, suitable for a two-column table.
    pub fn diagnostics(&self) -> Vec<(String, String)> {
        let (columns, lines) = terminal_size();
        let mut result = vec![
            ("platform".to_string(), self.platform_id.clone()),
            ("hostname".to_string(), self.hostname.clone()),
            ("userid".to_string(), self.userid.clone()),
            ("program".to_string(), self.program_name.clone()),
            ("pid".to_string(), self.pid.to_string()),
            ("terminal".to_string(), format!("{columns}x{lines}")),
        ];
        if self.is_running_in_docker {
            result.push(("docker".to_string(), "yes".to_string()));
        }
        result
    }
}

/// Best effort name of the running program.
fn program_name() -> String {
    std::env::args()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "?".to_string())
}

/// True when running inside a docker (or similar) container.
pub fn is_running_in_docker() -> bool {
    if Path::new("/.dockerenv").exists() || std::env::var_os("container").is_some() {
        return true;
    }
    static RX_CONTAINER: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)docker|lxc|kubepod").expect("valid regex"));
    std::fs::read_to_string("/proc/1/cgroup")
        .map(|content| content.lines().any(|line| RX_CONTAINER.is_match(line)))
        .unwrap_or(false)
}

/// Columns and lines of the current terminal.
///
/// `COLUMNS` and `LINES` take precedence, then the size of the terminal
/// attached to stdout, with a fallback of 160x25.
pub fn terminal_size() -> (usize, usize) {
    let from_env = |name: &str| {
        std::env::var(name)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|v| *v > 0)
    };
    let (mut columns, mut lines) = (from_env("COLUMNS"), from_env("LINES"));
    if columns.is_none() || lines.is_none() {
        if let Some((rows, cols)) = Term::stdout().size_checked() {
            columns = columns.or(Some(cols as usize));
            lines = lines.or(Some(rows as usize));
        }
    }
    (
        columns.filter(|c| *c > 0).unwrap_or(DEFAULT_COLUMNS),
        lines.filter(|l| *l > 0).unwrap_or(DEFAULT_LINES),
    )
}

/// Width of the current terminal.
pub fn terminal_columns() -> usize {
    terminal_size().0
}

/// True when stdout is attached to an interactive terminal.
pub fn is_stdout_tty() -> bool {
    Term::stdout().is_term()
}
