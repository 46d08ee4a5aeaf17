// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use rstest::rstest;
use serial_test::serial;
use tempfile::TempDir;

use super::*;

fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[rstest]
fn test_formatted_text() {
    let props = props(&[("appname", "foo"), ("basename", "{appname}.log"), ("loop", "{loop}")]);
    assert_eq!(formatted_text("{appname}", &props, false).unwrap(), "foo");
    assert_eq!(formatted_text("/logs/{basename}", &props, false).unwrap(), "/logs/foo.log");
    assert_eq!(formatted_text("{missing}/{appname}", &props, false).unwrap(), "{missing}/foo");
    assert_eq!(formatted_text("{missing}/{appname}", &props, true), None);
    assert_eq!(formatted_text("no markers", &props, true).unwrap(), "no markers");
    // Self-referencing markers stop after a few passes
    assert_eq!(formatted_text("{loop}", &props, false).unwrap(), "{loop}");
}

#[rstest]
fn test_default_spec() {
    let spec = LogSpec::default();
    assert_eq!(spec.basename, "{appname}.log");
    assert_eq!(spec.console_level, Some(Level::WARN));
    assert_eq!(spec.file_level, Some(Level::DEBUG));
    assert_eq!(spec.locations, default_log_locations());
    assert!(spec.should_log_to_file());

    let props = spec.props();
    assert_eq!(props["pid"], std::process::id().to_string());
    assert!(!props.contains_key("dev"));
}

#[rstest]
fn test_should_log_to_file() {
    let spec = LogSpec {
        file_level: None,
        ..Default::default()
    };
    assert!(!spec.should_log_to_file());

    let spec = LogSpec {
        file_location: Some(String::new()),
        ..Default::default()
    };
    assert!(!spec.should_log_to_file());
    assert_eq!(spec.usable_location(), None);

    let spec = LogSpec {
        locations: Vec::new(),
        ..Default::default()
    };
    assert!(!spec.should_log_to_file());
}

#[rstest]
fn test_usable_location() {
    let tmp = TempDir::new().unwrap();
    let dev = tmp.path().display().to_string();
    let spec = LogSpec {
        appname: Some("my-app".to_string()),
        dev: Some(dev.clone()),
        locations: vec!["{unknown}/foo.log".to_string(), "{dev}/log/{basename}".to_string()],
        ..Default::default()
    };
    // Missing `log/` folder gets created
    let expected = tmp.path().join("log").join("my-app.log");
    assert_eq!(spec.usable_location(), Some(expected));
    assert!(tmp.path().join("log").is_dir());

    // A folder gets the basename appended
    let spec = LogSpec {
        appname: Some("my-app".to_string()),
        file_location: Some(dev),
        ..Default::default()
    };
    assert_eq!(spec.usable_location(), Some(tmp.path().join("my-app.log")));

    // Only one level of folders is created
    let spec = LogSpec {
        file_location: Some(tmp.path().join("a/b/c.log").display().to_string()),
        ..Default::default()
    };
    assert_eq!(spec.usable_location(), None);
}

#[rstest]
#[serial]
fn test_setup() {
    let tmp = TempDir::new().unwrap();
    let location = tmp.path().join("test.log");
    let spec = LogSpec {
        appname: Some("runez-test".to_string()),
        console_level: None,
        file_location: Some(location.display().to_string()),
        greetings: vec!["Hello {appname}".to_string()],
        root: Some(RootPolicy::Allow),
        ..Default::default()
    };
    LogManager::setup(spec).unwrap();
    assert!(LogManager::is_setup());
    assert_eq!(LogManager::spec().appname.as_deref(), Some("runez-test"));
    assert_eq!(LogManager::file_location(), Some(location.clone()));

    let content = std::fs::read_to_string(&location).unwrap();
    assert!(content.contains("Hello runez-test"));

    // A trace channel enabled beforehand stays on, unless a trace env var is configured
    // SAFETY: tests touching env vars are serialized
    unsafe {
        std::env::remove_var(DEFAULT_TRACE_ENV_VAR);
        std::env::remove_var("RUNEZ_TEST_TRACE");
    }
    let prior = enable_trace(Some(">> "));
    let spec = LogManager::spec();
    LogManager::setup(spec.clone()).unwrap();
    assert!(is_tracing());

    let configured = LogSpec {
        trace: Some("RUNEZ_TEST_TRACE+>> ".to_string()),
        ..spec
    };
    LogManager::setup(configured).unwrap();
    assert!(!is_tracing());
    enable_trace(prior.as_deref());
}

#[rstest]
#[serial]
fn test_trace() {
    let prior = enable_trace(Some(":: "));
    assert!(is_tracing());
    trace("visible on stderr");

    assert_eq!(enable_trace(None).as_deref(), Some(":: "));
    assert!(!is_tracing());

    // SAFETY: tests touching env vars are serialized
    unsafe { std::env::set_var("RUNEZ_TEST_TRACE", "1") };
    assert!(enable_trace_from_env("RUNEZ_TEST_TRACE", "> "));
    assert!(is_tracing());
    unsafe { std::env::remove_var("RUNEZ_TEST_TRACE") };
    assert!(!enable_trace_from_env("RUNEZ_TEST_TRACE", "> "));
    assert!(!is_tracing());

    enable_trace(prior.as_deref());
}

#[rstest]
fn test_timeit() {
    let timer = Timeit::with_logger("crunching", Chatter::Silent);
    let message = timer.message();
    assert!(message.starts_with("crunching took "), "{message}");

    let value = Timeit::run("adding", || 1 + 2);
    assert_eq!(value, 3);
}
