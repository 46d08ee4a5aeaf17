// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::{fixture, rstest};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::Chatter;

#[fixture]
fn person() -> StructSchema {
    StructSchema::new("Person")
        .with_default("name", Schema::String, json!("joe"))
        .with_field("age", Schema::Integer)
        .with_field("tags", Schema::list(Schema::String))
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Person {
    name: String,
    age: Option<i64>,
}

impl Serializable for Person {
    fn schema() -> StructSchema {
        StructSchema::new("Person")
            .with_default("name", Schema::String, json!("joe"))
            .with_field("age", Schema::Integer)
            .with_strict(Fatal::Abort)
    }
}

#[rstest]
#[case(Schema::Any, json!({"a": 1}), None)]
#[case(Schema::Integer, json!(null), None)]
#[case(Schema::Integer, json!("12"), None)]
#[case(Schema::Integer, json!("x"), Some("expecting int, got 'x'"))]
#[case(Schema::Integer, json!(1.5), Some("expecting int, got '1.5'"))]
#[case(Schema::Float, json!("1.5"), None)]
#[case(Schema::Float, json!("abc"), Some("expecting float, got 'abc'"))]
#[case(Schema::String, json!(5), Some("expecting string, got '5'"))]
#[case(Schema::Date, json!("2019-01-02"), None)]
#[case(Schema::Date, json!("foo"), Some("expecting date, got 'foo'"))]
#[case(Schema::Datetime { tz: None }, json!("bar"), Some("expecting datetime, got 'bar'"))]
#[case(Schema::list(Schema::Integer), json!([1, "x"]), Some("expecting int, got 'x'"))]
#[case(Schema::list(Schema::Any), json!(5), Some("expecting list, got '5'"))]
#[case(
    Schema::dict(Schema::String, Schema::Integer),
    json!({"a": "b"}),
    Some("value: expecting int, got 'b'")
)]
#[case(
    Schema::dict(Schema::Integer, Schema::Any),
    json!({"a": 1}),
    Some("key: expecting int, got 'a'")
)]
#[case(Schema::dict(Schema::Any, Schema::Any), json!([]), Some("expecting dict, got '[]'"))]
#[case(Schema::enumeration("foo bar"), json!("foo"), None)]
#[case(
    Schema::enumeration("foo bar"),
    json!("baz"),
    Some("'baz' is not one of Enum[bar, foo]")
)]
fn test_problem(#[case] schema: Schema, #[case] value: Value, #[case] expected: Option<&str>) {
    assert_eq!(schema.problem(&value).as_deref(), expected);
    assert_eq!(schema.validate(&value).is_ok(), expected.is_none());
}

#[rstest]
#[case(Schema::Integer, json!("0x10"), json!(16))]
#[case(Schema::Integer, json!("x"), json!("x"))]
#[case(Schema::Float, json!("1.5"), json!(1.5))]
#[case(Schema::Boolean, json!("yes"), json!(true))]
#[case(Schema::Boolean, json!(0), json!(false))]
#[case(Schema::String, json!(5), json!("5"))]
#[case(Schema::Date, json!("2019/01/02"), json!("2019-01-02"))]
#[case(
    Schema::Datetime { tz: None },
    json!("2019-01-02 03:04:05"),
    json!("2019-01-02T03:04:05+00:00")
)]
#[case(Schema::list(Schema::Integer), json!(["1", 2]), json!([1, 2]))]
#[case(Schema::dict(Schema::String, Schema::Integer), json!({"a": "1"}), json!({"a": 1}))]
#[case(Schema::Any, json!(null), json!(null))]
fn test_converted(#[case] schema: Schema, #[case] value: Value, #[case] expected: Value) {
    assert_eq!(schema.converted(&value), expected);
}

#[rstest]
fn test_representation(person: StructSchema) {
    let schema = Schema::dict(Schema::String, Schema::list(Schema::Integer));
    assert_eq!(schema.to_string(), "Dict[String, List[Integer]]");
    assert_eq!(Schema::Struct(Box::new(person)).to_string(), "Person");

    assert_eq!(Field::inferred(json!("joe")).to_string(), "String (default: joe)");
    assert_eq!(Field::new(Schema::Date).to_string(), "Date");
    assert_eq!(Field::inferred(json!(1.5)).schema, Schema::Float);
    assert_eq!(Field::inferred(json!(3)).schema, Schema::Integer);
    assert_eq!(Field::inferred(json!([])).schema.to_string(), "List[Any]");
    assert_eq!(Field::inferred(json!(null)).schema, Schema::Any);
}

#[rstest]
fn test_deserialized(person: StructSchema) {
    let values = person.deserialized(&json!({"age": "5"}), None).unwrap();
    assert_eq!(Value::Object(values), json!({"age": 5, "name": "joe", "tags": null}));

    let values = person.deserialized(&Value::Null, None).unwrap();
    assert_eq!(values["name"], json!("joe"));

    // Mismatches are kept as-is when not strict
    let values = person.deserialized(&json!({"age": "old", "other": 1}), None).unwrap();
    assert_eq!(values["age"], json!("old"));
    assert!(!values.contains_key("other"));

    let err = person.deserialized(&json!(5), None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Validation failed: Can't deserialize Person: expecting dict, got '5'"
    );
}

#[rstest]
fn test_deserialized_strict(person: StructSchema) {
    let logged = person.clone().with_strict(Fatal::Log);
    assert!(logged.deserialized(&json!({"age": "old"}), None).is_ok());

    let strict = person.with_strict(Fatal::Abort);
    let err = strict
        .deserialized(&json!({"age": "old"}), Some("test.json"))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Validation failed: Can't deserialize Person.age from test.json: expecting int, got 'old'"
    );
    assert!(strict.deserialized(&json!({"tags": ["a"]}), None).is_ok());
}

#[rstest]
fn test_extras(person: StructSchema) {
    let schema = person.with_extras(Fatal::Abort, ["comment"]);
    assert!(schema.deserialized(&json!({"comment": "hi"}), None).is_ok());
    let err = schema
        .deserialized(&json!({"comment": "hi", "x": 1, "y": 2}), None)
        .unwrap_err();
    assert!(err.to_string().ends_with("Extra content given for Person: x, y"), "{err}");

    let value = json!({"x": 1});
    let Value::Object(map) = &value else {
        unreachable!()
    };
    assert_eq!(
        schema.problem(map).as_deref(),
        Some("'x' is not an attribute of Person")
    );
}

#[rstest]
fn test_struct_helpers(person: StructSchema) {
    assert_eq!(person.attributes_by_type(&Schema::Integer), vec!["age"]);
    assert!(person.attributes_by_type(&Schema::Float).is_empty());

    let nested = Schema::Struct(Box::new(person.clone()));
    assert_eq!(nested.problem(&json!({"age": "x"})).as_deref(), Some("expecting int, got 'x'"));
    assert_eq!(
        nested.problem(&json!(1)).as_deref(),
        Some("expecting structure Person, got '1'")
    );
    assert_eq!(
        nested.converted(&json!({"age": "2"})),
        json!({"age": 2, "name": "joe", "tags": null})
    );

    let first = person.converted(&Map::new());
    let mut second = first.clone();
    second.insert("age".to_string(), json!(3));
    assert_eq!(
        person.changed_attributes(&first, &second),
        vec![("age".to_string(), Value::Null, json!(3))]
    );

    let schema = StructSchema::new("Item")
        .with_identifier("id", Schema::Integer)
        .unwrap();
    assert_eq!(schema.unique_identifier.as_deref(), Some("id"));
    let err = schema.with_identifier("other", Schema::String).unwrap_err();
    assert!(err.to_string().ends_with("Multiple unique ids specified for Item: id and other"));
}

#[rstest]
fn test_serializable() {
    let person = Person::from_dict(&json!({"age": "42"}), None).unwrap();
    assert_eq!(
        person,
        Person {
            name: "joe".to_string(),
            age: Some(42)
        }
    );
    assert_eq!(person.to_dict().unwrap(), json!({"name": "joe", "age": 42}));

    let err = Person::from_dict(&json!({"name": 5}), None).unwrap_err();
    assert!(err.to_string().contains("Person.name: expecting string, got '5'"), "{err}");
}

#[rstest]
fn test_serializable_json_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("person.json");
    let policy = Policy::fatal().with_dryrun(false);
    let person = Person {
        name: "ann".to_string(),
        age: None,
    };
    assert_eq!(person.save_json(&path, &policy).unwrap(), Outcome::Done);
    assert_eq!(Person::from_json(&path, &policy).unwrap(), Some(person));

    let lenient = Policy::lenient().with_logger(Chatter::Silent);
    let missing = tmp.path().join("missing.json");
    assert_eq!(Person::from_json(&missing, &lenient).unwrap(), None);

    std::fs::write(&path, r#"{"age": "unknown"}"#).unwrap();
    let err = Person::from_json(&path, &policy).unwrap_err();
    assert!(err.to_string().contains(" from "), "{err}");
}
