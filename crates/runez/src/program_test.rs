// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

fn options(policy: Policy) -> RunOptions {
    RunOptions::with_policy(policy.with_dryrun(false))
}

#[rstest]
fn test_which() {
    let sh = which("sh").unwrap();
    assert!(sh.is_absolute());
    assert!(is_executable(&sh));
    assert_eq!(which(&sh), Some(sh.clone()));
    assert_eq!(which(""), None);
    assert_eq!(which("no-such-program-runez"), None);
    assert_eq!(which("./no/such/program"), None);
}

#[rstest]
fn test_run() {
    let result = run("echo", ["hello", "world"], &options(Policy::fatal())).unwrap();
    assert!(result.succeeded());
    assert_eq!(result.output, "hello world");
    assert_eq!(result.error, "");
    assert!(result.pid.is_some());
    assert!(result.audit.program.ends_with("echo"));
    assert!(!result.audit.dryrun);
    assert_eq!(result.full_output(), "hello world");

    let opts = RunOptions {
        strip: false,
        ..options(Policy::fatal())
    };
    let result = run("echo", ["hello"], &opts).unwrap();
    assert_eq!(result.output, "hello\n");
}

#[rstest]
fn test_run_keeps_indentation() {
    let script = ["-c", "printf '  indented\\n\\tline \\r\\n'"];
    let result = run("sh", script, &options(Policy::fatal())).unwrap();
    assert_eq!(result.output, "  indented\n\tline ");
}

#[rstest]
fn test_run_env() {
    let mut opts = options(Policy::fatal());
    opts.env.insert("RUNEZ_SAMPLE".to_string(), "foo".to_string());
    let result = run("sh", ["-c", "echo $RUNEZ_SAMPLE"], &opts).unwrap();
    assert_eq!(result.output, "foo");

    let tmp = TempDir::new().unwrap();
    let folder = dunce::canonicalize(tmp.path()).unwrap();
    let opts = RunOptions {
        current_dir: Some(folder.clone()),
        ..options(Policy::fatal())
    };
    let result = run("sh", ["-c", "pwd -P"], &opts).unwrap();
    assert_eq!(result.output, folder.display().to_string());
}

#[rstest]
fn test_run_passthrough() {
    let opts = RunOptions {
        passthrough: true,
        ..options(Policy::fatal())
    };
    let result = run("echo", ["shown and captured"], &opts).unwrap();
    assert_eq!(result.output, "shown and captured");
}

#[rstest]
fn test_run_dryrun() {
    let opts = RunOptions {
        short_exe: Some("echo".to_string()),
        ..RunOptions::with_policy(Policy::default().with_dryrun(true))
    };
    let result = run("echo", ["a b"], &opts).unwrap();
    assert!(result.audit.dryrun);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.output, "[dryrun] echo \"a b\"");
    assert_eq!(result.pid, None);
}

#[rstest]
fn test_run_missing_program() {
    let opts = options(Policy::lenient().with_logger(Chatter::Silent));
    let result = run("no-such-program-runez", ["--version"], &opts).unwrap();
    assert!(result.failed());
    assert!(result.error.starts_with("no-such-program-runez is not installed (PATH="));

    let result = run("./no/such/program", Vec::<String>::new(), &opts).unwrap();
    assert_eq!(result.error, "./no/such/program is not an executable");

    let err = run("no-such-program-runez", ["--version"], &options(Policy::fatal())).unwrap_err();
    assert!(err.to_string().contains("is not installed"), "{err}");
}

#[rstest]
fn test_run_failure() {
    let script = ["-c", "echo some output; echo oops >&2; exit 3"];
    let opts = options(Policy::lenient().with_logger(Chatter::Silent));
    let result = run("sh", script, &opts).unwrap();
    assert_eq!(result.exit_code, 3);
    assert_eq!(result.error, "oops");
    assert_eq!(result.output, "some output");
    assert_eq!(result.full_output(), "oops\nsome output");

    let err = run("sh", script, &options(Policy::fatal())).unwrap_err();
    assert_eq!(err.exit_code(), 3);
    let message = err.to_string();
    assert!(message.starts_with("Run failed: "), "{message}");
    assert!(message.contains("\nstderr:\noops"), "{message}");
    assert!(message.contains("\nstdout:\nsome output"), "{message}");
    assert!(message.ends_with("sh exited with code 3"), "{message}");

    let opts = options(Policy::fatal().with_logger(Chatter::Silent));
    let err = run("sh", script, &opts).unwrap_err();
    assert_eq!(err.to_string(), "sh exited with code 3");
}

#[rstest]
fn test_run_results_compare() {
    let opts = options(Policy::fatal());
    let first = run("echo", ["same"], &opts).unwrap();
    let second = run("echo", ["same"], &opts).unwrap();
    assert_eq!(first, second);
}

#[rstest]
fn test_run_description() {
    let audit = RunAudit {
        program: "/usr/bin/ls".to_string(),
        args: vec!["-l".to_string(), "some folder".to_string()],
        dryrun: false,
    };
    assert_eq!(audit.run_description(Some("ls")), "ls -l \"some folder\"");
    assert_eq!(audit.to_string(), "/usr/bin/ls -l \"some folder\"");
}

#[rstest]
fn test_shell() {
    assert_eq!(shell(["echo hello"]).as_deref(), Some("hello"));
    assert_eq!(shell(["echo", "a  b"]).as_deref(), Some("a  b"));
    assert_eq!(shell(["sh", "-c", "exit 1"]), None);
    assert_eq!(shell(["no-such-program-runez"]), None);
    assert_eq!(shell(Vec::<String>::new()), None);
}

#[rstest]
fn test_added_env_paths() {
    let env: HashMap<String, String> = [("PATH".to_string(), "/usr/bin:/bin".to_string())]
        .into_iter()
        .collect();
    let vars: BTreeMap<String, String> = [
        ("PATH", ":/opt/bin:/bin"),
        ("OTHER", ":/x"),
        ("EMPTY", ""),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let result = added_env_paths(&vars, &env);
    assert_eq!(result.len(), 2);
    assert_eq!(result["PATH"], "/usr/bin:/bin:/opt/bin");
    assert_eq!(result["OTHER"], "/x");

    let vars: BTreeMap<String, String> = [("PATH".to_string(), ":/bin".to_string())]
        .into_iter()
        .collect();
    assert!(added_env_paths(&vars, &env).is_empty());
}

#[rstest]
fn test_check_pid() {
    assert!(check_pid(std::process::id()));
    assert!(!check_pid(0));
    assert!(!check_pid(u32::MAX));
}

#[rstest]
fn test_make_executable() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("script.sh");
    std::fs::write(&path, "#!/bin/sh\necho hi\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
    let policy = Policy::fatal().with_dryrun(false);
    assert!(!is_executable(&path));
    assert_eq!(make_executable(&path, &policy).unwrap(), Outcome::Done);
    assert!(is_executable(&path));
    assert_eq!(make_executable(&path, &policy).unwrap(), Outcome::NoOp);

    let missing = tmp.path().join("missing");
    let lenient = Policy::lenient().with_logger(Chatter::Silent).with_dryrun(false);
    assert_eq!(make_executable(&missing, &lenient).unwrap(), Outcome::Failed);
    let err = make_executable(&missing, &policy).unwrap_err();
    assert!(err.to_string().ends_with("does not exist, can't make it executable"));
}

#[rstest]
fn test_require_installed() {
    assert!(require_installed("sh", None).is_ok());

    let err = require_installed_on("no-such-program-runez", None, Some("linux")).unwrap_err();
    match err {
        Error::NotInstalled {
            program,
            instructions,
        } => {
            assert_eq!(program, "no-such-program-runez");
            assert_eq!(instructions, "run: `apt install no-such-program-runez`");
        }
        other => panic!("unexpected error: {other}"),
    }

    let custom: BTreeMap<String, String> = [("macos".to_string(), "get {program}".to_string())]
        .into_iter()
        .collect();
    let err = require_installed_on("no-such-program-runez", Some(&custom), Some("linux")).unwrap_err();
    assert!(matches!(
        err,
        Error::NotInstalled { instructions, .. } if instructions == "on macos: get no-such-program-runez"
    ));
}
