// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::{fixture, rstest};
use serde_json::json;
use serial_test::serial;
use tempfile::TempDir;

use super::*;

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[fixture]
fn sample() -> Configuration {
    let mut config = Configuration::default();
    config.add(
        DictProvider::from_pairs(
            "overrides",
            [("name", "first"), ("flag", "yes"), ("size", "10k")],
        ),
        false,
    );
    config.add(
        DictProvider::new(
            "defaults",
            object(json!({
                "name": "second",
                "count": "10",
                "bogus": "abc",
                "ratio": 0.5,
                "structured": {"a": 1},
                "embedded": "[1, 2]",
                "nothing": null,
            })),
        ),
        false,
    );
    config
}

#[rstest]
fn test_chain(sample: Configuration) {
    assert_eq!(sample.to_string(), "overrides, defaults");
    assert_eq!(sample.providers().len(), 2);
    assert_eq!(sample.len(), 10);
    assert_eq!(sample.get_str("name").as_deref(), Some("first"));
    assert_eq!(sample.get("missing"), None);
    assert_eq!(sample.get(""), None);

    let values = sample.values();
    assert_eq!(values["name"], json!("first"));
    assert_eq!(values["count"], json!("10"));
    assert_eq!(
        sample.overview(", "),
        "overrides: 3 values, defaults: 7 values"
    );
    assert!(sample.provider_by_id("defaults").is_some());
    assert!(sample.provider_by_id("env").is_none());
}

#[rstest]
fn test_add_provider(mut sample: Configuration) {
    sample.add(DictProvider::from_pairs("cli", [("name", "cli")]), true);
    assert_eq!(sample.to_string(), "cli, overrides, defaults");
    assert_eq!(sample.get_str("name").as_deref(), Some("cli"));

    // Same id replaces in place
    sample.add(DictProvider::from_pairs("overrides", [("other", "x")]), false);
    assert_eq!(sample.to_string(), "cli, overrides, defaults");
    assert_eq!(sample.get_str("flag"), None);

    sample.clear();
    assert_eq!(sample.to_string(), "empty");
    assert!(sample.is_empty());

    let config = Configuration::new([
        Box::new(DictProvider::from_pairs("", [("a", "b")])) as Box<dyn ConfigProvider>
    ]);
    assert_eq!(config.to_string(), "dict");
}

#[rstest]
fn test_typed_getters(sample: Configuration) {
    assert_eq!(sample.get_int("count", None, None, None), Some(10));
    assert_eq!(sample.get_int("count", None, None, Some(5)), Some(5));
    assert_eq!(sample.get_int("count", None, Some(20), None), Some(20));
    assert_eq!(sample.get_int("bogus", Some(7), None, None), Some(7));
    assert_eq!(sample.get_int("missing", None, None, None), None);

    assert_eq!(sample.get_float("ratio", None, None, None), Some(0.5));
    assert_eq!(sample.get_float("missing", Some(1.5), None, None), Some(1.5));
    assert_eq!(sample.get_str("ratio").as_deref(), Some("0.5"));

    assert_eq!(sample.get_bool("flag", None), Some(true));
    assert_eq!(sample.get_bool("name", None), Some(false));
    assert_eq!(sample.get_bool("missing", Some(true)), Some(true));

    assert_eq!(sample.get_bytesize("size", None, None, None), Some(10240));
    assert_eq!(sample.get_bytesize("size", None, None, Some("5k")), Some(5120));
    assert_eq!(sample.get_bytesize("missing", Some("1m"), None, None), Some(1024 * 1024));
    assert_eq!(
        sample.get_bytesize_in("count", None, None, None, Some("k"), 1000),
        Some(10_000)
    );
}

#[rstest]
fn test_get_json(sample: Configuration) {
    assert_eq!(sample.get_json("structured", None), Some(json!({"a": 1})));
    assert_eq!(sample.get_json("embedded", None), Some(json!([1, 2])));
    assert_eq!(sample.get_json("name", Some(json!({}))), Some(json!({})));
    assert_eq!(sample.get_json("missing", None), None);
}

#[rstest]
#[serial]
fn test_env_provider() {
    // SAFETY: tests touching env vars are serialized
    unsafe { std::env::set_var("RUNEZ_TEST_SOME_KEY", "5") };
    let provider = EnvProvider::new("runez_test");
    assert_eq!(provider.provider_id(), "env");
    assert_eq!(provider.get("some-key"), Some(json!("5")));
    assert_eq!(provider.get("some.key"), Some(json!("5")));
    assert_eq!(provider.values()["some_key"], json!("5"));
    assert_eq!(provider.get("missing"), None);
    unsafe { std::env::remove_var("RUNEZ_TEST_SOME_KEY") };
    assert_eq!(provider.get("some-key"), None);
}

#[rstest]
fn test_propsfs_provider() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("greeting"), "hello\n").unwrap();
    let provider = PropsfsProvider::new(Some(tmp.path().to_path_buf()));
    assert_eq!(provider.provider_id(), "propsfs");
    assert_eq!(provider.get("greeting"), Some(json!("hello")));
    assert_eq!(provider.get("missing"), None);
    assert_eq!(provider.len(), 1);
    assert_eq!(provider.values()["greeting"], json!("hello"));

    let provider = PropsfsProvider::new(Some(tmp.path().join("missing")));
    assert!(provider.is_empty());
}

#[rstest]
fn test_use_json() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("settings.json");
    std::fs::write(&path, r#"{"retries": 4, "name": "from-json"}"#).unwrap();
    let path = path.display().to_string();

    let mut config = Configuration::default();
    config.use_json([path.as_str(), "", "/no/such/file.json"]).unwrap();
    assert_eq!(config.to_string(), path);
    assert_eq!(config.get_int("retries", None, None, None), Some(4));

    let bogus = tmp.path().join("bogus.json");
    std::fs::write(&bogus, "not json").unwrap();
    assert!(config.use_json([bogus.display().to_string()]).is_err());
}

#[rstest]
#[serial]
fn test_global() {
    global_mut().clear();
    assert_eq!(get("retries"), None);
    global_mut().add(
        DictProvider::from_pairs(
            "test",
            [
                ("retries", "3"),
                ("ratio", "0.25"),
                ("verbose", "on"),
                ("size", "2k"),
                ("list", "[1]"),
            ],
        ),
        false,
    );
    assert_eq!(get_str("retries").as_deref(), Some("3"));
    assert_eq!(get_int("retries", None), Some(3));
    assert_eq!(get_int("missing", Some(1)), Some(1));
    assert_eq!(get_float("ratio", None), Some(0.25));
    assert_eq!(get_bool("verbose", None), Some(true));
    assert_eq!(get_bytesize("size", None), Some(2048));
    assert_eq!(get_json("list", None), Some(json!([1])));
    global_mut().clear();
}
