// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Running external programs, and finding them on `PATH`.

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use nix::sys::signal::kill;
use nix::unistd::{AccessFlags, Pid, access};

use crate::{
    Chatter, Error, Fatal, Outcome, Policy, Result, SYS_INFO, abort, abort_with_code, decode,
    hdry, hlog, quoted, short,
};

#[cfg(test)]
#[path = "./program_test.rs"]
mod program_test;

/// Options for [`run`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub policy: Policy,
    /// Show stdout/stderr of the program as it runs, in addition to capturing it.
    pub passthrough: bool,
    /// Trim leading/trailing line endings from captured output.
    pub strip: bool,
    /// PATH-like env vars to extend, see [`added_env_paths`].
    pub path_env: BTreeMap<String, String>,
    /// Extra env vars for the program.
    pub env: BTreeMap<String, String>,
    pub current_dir: Option<PathBuf>,
    /// Name to show in logs instead of the full path of the program.
    pub short_exe: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            passthrough: false,
            strip: true,
            path_env: BTreeMap::new(),
            env: BTreeMap::new(),
            current_dir: None,
            short_exe: None,
        }
    }
}

impl RunOptions {
    pub fn with_policy(policy: Policy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }
}

/// What was run, for reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunAudit {
    /// Program as given, or its full path when found.
    pub program: String,
    pub args: Vec<String>,
    pub dryrun: bool,
}

impl RunAudit {
    /// Short description of the run, like `ls -l "some folder"`.
    pub fn run_description(&self, short_exe: Option<&str>) -> String {
        let program = match short_exe {
            Some(name) => name.to_string(),
            None => short(&self.program),
        };
        if self.args.is_empty() || program.is_empty() {
            return program;
        }
        format!("{program} {}", quoted(&self.args))
    }
}

impl std::fmt::Display for RunAudit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.run_description(None))
    }
}

/// Outcome of [`run`].
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Captured stdout.
    pub output: String,
    /// Captured stderr, or a description of why the program could not run.
    pub error: String,
    pub exit_code: i32,
    /// Pid of the spawned process, if any.
    pub pid: Option<u32>,
    pub audit: RunAudit,
}

impl RunResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    pub fn failed(&self) -> bool {
        self.exit_code != 0
    }

    /// stderr followed by stdout.
    pub fn full_output(&self) -> String {
        format!("{}\n{}", self.error, self.output).trim().to_string()
    }
}

impl PartialEq for RunResult {
    fn eq(&self, other: &Self) -> bool {
        self.output == other.output
            && self.error == other.error
            && self.exit_code == other.exit_code
    }
}

/// Run `program` with `args`, capturing its output.
///
/// In dry-run mode, the program is not run and a successful result with
/// output `[dryrun] <description>` is returned. A program exiting with a
/// non-zero code is an error only under a [`Fatal::Abort`] policy.
pub fn run<P, I, S>(program: P, args: I, options: &RunOptions) -> Result<RunResult>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let program = program.as_ref();
    let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
    let full_path = which(program);
    let mut result = RunResult {
        output: String::new(),
        error: String::new(),
        exit_code: 1,
        pid: None,
        audit: RunAudit {
            program: full_path
                .as_deref()
                .unwrap_or(program)
                .to_string_lossy()
                .into_owned(),
            args: args.clone(),
            dryrun: false,
        },
    };
    let description = result.audit.run_description(options.short_exe.as_deref());
    let policy = &options.policy;

    if hdry(policy, format!("run: {description}")) {
        result.audit.dryrun = true;
        result.exit_code = 0;
        result.output = format!("[dryrun] {description}");
        return Ok(result);
    }

    let Some(full_path) = full_path else {
        let name = program.to_string_lossy();
        result.error = if program.file_name().is_some_and(|n| n == program.as_os_str()) {
            let path = std::env::var("PATH").unwrap_or_default();
            format!("{} is not installed (PATH={})", short(&name), short(path))
        } else {
            format!("{} is not an executable", short(&name))
        };
        let message = result.error.clone();
        return abort(message, policy, result);
    };

    hlog(policy.logger, format!("Running: {description}"));
    let mut command = Command::new(&full_path);
    command
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if !options.path_env.is_empty() {
        let current: HashMap<String, String> = std::env::vars().collect();
        command.envs(added_env_paths(&options.path_env, &current));
    }
    command.envs(&options.env);
    if let Some(dir) = &options.current_dir {
        command.current_dir(dir);
    }

    match spawn_and_capture(command, options.passthrough) {
        Ok((pid, exit_code, out, err)) => {
            result.pid = Some(pid);
            result.exit_code = exit_code;
            result.output = captured(&out, options.strip);
            result.error = captured(&err, options.strip);
        }
        Err(err) => {
            if policy.fatal == Fatal::Abort {
                return Err(err);
            }
            result.error = format!("{} failed: {err}", short(program.display()));
            return Ok(result);
        }
    }

    if policy.fatal == Fatal::Abort && result.exit_code != 0 {
        let program_name = short(program.display());
        let base_message = format!("{program_name} exited with code {}", result.exit_code);
        let mut message = Vec::new();
        if policy.logger != Chatter::Silent && !options.passthrough {
            message.push(format!("Run failed: {description}"));
            if !result.error.is_empty() {
                message.push(format!("\nstderr:\n{}", result.error));
            }
            if !result.output.is_empty() {
                message.push(format!("\nstdout:\n{}", result.output));
            }
        }
        message.push(base_message);
        return abort_with_code(message.join("\n"), result.exit_code, policy, result);
    }

    Ok(result)
}

/// Spawn `command`, returning its pid, exit code and captured stdout/stderr.
/// Captured output, with leading/trailing line endings removed when `strip` is set.
fn captured(value: &[u8], strip: bool) -> String {
    let text = decode(value, false);
    if strip {
        text.trim_matches(['\r', '\n']).to_string()
    } else {
        text
    }
}

fn spawn_and_capture(mut command: Command, passthrough: bool) -> Result<(u32, i32, Vec<u8>, Vec<u8>)> {
    let mut child = command.spawn()?;
    let pid = child.id();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_reader = std::thread::spawn(move || tee(stdout, passthrough.then(std::io::stdout)));
    let err_reader = std::thread::spawn(move || tee(stderr, passthrough.then(std::io::stderr)));
    let status = child.wait()?;
    let out = out_reader.join().unwrap_or_default();
    let err = err_reader.join().unwrap_or_default();
    // Killed by a signal: conventional shell exit code
    let exit_code = status.code().unwrap_or_else(|| {
        use std::os::unix::process::ExitStatusExt;
        128 + status.signal().unwrap_or(0)
    });
    Ok((pid, exit_code, out, err))
}

fn tee<R: Read, W: Write>(source: Option<R>, mut target: Option<W>) -> Vec<u8> {
    let mut captured = Vec::new();
    let Some(mut source) = source else {
        return captured;
    };
    let mut buffer = [0u8; 1024];
    loop {
        match source.read(&mut buffer) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if let Some(target) = target.as_mut() {
                    let _ = target.write_all(&buffer[..n]);
                    let _ = target.flush();
                }
                captured.extend_from_slice(&buffer[..n]);
            }
        }
    }
    captured
}

/// Output of a quick command, given as one string split on whitespace or as
/// separate args. Nothing is logged, and `None` is returned on failure.
pub fn shell<I, S>(args: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
    if args.len() == 1 {
        args = args[0].split_whitespace().map(str::to_string).collect();
    }
    if args.is_empty() {
        return None;
    }
    let program = args.remove(0);
    let options = RunOptions::with_policy(Policy::quiet().with_dryrun(false));
    run(program, args, &options)
        .ok()
        .filter(RunResult::succeeded)
        .map(|r| r.output)
}

/// Full path to `program`, if it can be found on `PATH` and is executable.
///
/// A `program` with a folder part is only checked for executability.
pub fn which<P: AsRef<Path>>(program: P) -> Option<PathBuf> {
    let program = program.as_ref();
    if program.as_os_str().is_empty() {
        return None;
    }
    if program.file_name().is_none_or(|name| name != program.as_os_str()) {
        let path = crate::resolved_path(program, None);
        return is_executable(&path).then_some(path);
    }
    let paths = std::env::var_os("PATH").unwrap_or_default();
    for folder in std::env::split_paths(&paths) {
        let candidate = folder.join(program);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    let candidate = std::env::current_dir().ok()?.join(program);
    is_executable(&candidate).then_some(candidate)
}

/// True if `path` is an executable file.
pub fn is_executable<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}

/// Make file `path` executable (mode 0o755).
pub fn make_executable<P: AsRef<Path>>(path: P, policy: &Policy) -> Result<Outcome> {
    let path = path.as_ref();
    if is_executable(path) {
        return Ok(Outcome::NoOp);
    }
    if hdry(policy, format!("make {} executable", short(path.display()))) {
        return Ok(Outcome::Done);
    }
    if !path.exists() {
        let message = format!("{} does not exist, can't make it executable", short(path.display()));
        return abort(message, policy, Outcome::Failed);
    }
    match std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)) {
        Ok(()) => {
            hlog(policy.logger, format!("Made '{}' executable", short(path.display())));
            Ok(Outcome::Done)
        }
        Err(err) => abort(
            format!("Can't chmod {}: {err}", short(path.display())),
            policy,
            Outcome::Failed,
        ),
    }
}

/// True if a process with `pid` exists.
pub fn check_pid(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    kill(Pid::from_raw(pid), None).is_ok()
}

/// Fail with install instructions when `program` is not on `PATH`.
///
/// `instructions` maps a platform (`linux`, `macos`) to how to install the
/// program on it, `{program}` is replaced with the program name. Defaults
/// to `brew install` on macos and `apt install` on linux.
pub fn require_installed(program: &str, instructions: Option<&BTreeMap<String, String>>) -> Result<()> {
    require_installed_on(program, instructions, None)
}

/// Same as [`require_installed`], with the platform overridden.
pub fn require_installed_on(
    program: &str,
    instructions: Option<&BTreeMap<String, String>>,
    platform: Option<&str>,
) -> Result<()> {
    if which(program).is_some() {
        return Ok(());
    }
    let defaults: BTreeMap<String, String> = [
        ("macos", "run: `brew install {program}`"),
        ("linux", "run: `apt install {program}`"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let instructions = instructions.filter(|i| !i.is_empty()).unwrap_or(&defaults);
    let platform = platform.map(str::to_string).unwrap_or_else(|| {
        SYS_INFO
            .platform_id
            .split('-')
            .next()
            .unwrap_or_default()
            .to_string()
    });
    let text = match instructions.get(&platform).filter(|t| !t.is_empty()) {
        Some(text) => text.clone(),
        None => instructions
            .iter()
            .map(|(k, v)| format!("on {k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n- "),
    };
    let instructions = text.replace("{program}", program);
    tracing::error!("{program} is not installed, {instructions}");
    Err(Error::NotInstalled {
        program: program.to_string(),
        instructions,
    })
}

/// `env` with PATH-like variables extended.
///
/// Each value in `env_vars` starts with its separator, followed by the
/// paths to append, like `":/usr/local/bin:/opt/bin"`. Paths already
/// present are not added again. Only modified variables are returned.
pub fn added_env_paths(
    env_vars: &BTreeMap<String, String>,
    env: &HashMap<String, String>,
) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();
    for (name, paths) in env_vars {
        let mut chars = paths.chars();
        let Some(separator) = chars.next() else {
            continue;
        };
        let paths = chars.as_str();
        let mut current: Vec<&str> = env
            .get(name)
            .map(|v| v.split(separator).filter(|x| !x.is_empty()).collect())
            .unwrap_or_default();
        let mut added = 0;
        for path in paths.split(separator) {
            if !current.contains(&path) {
                current.push(path);
                added += 1;
            }
        }
        if added > 0 {
            result.insert(name.clone(), current.join(&separator.to_string()));
        }
    }
    result
}
