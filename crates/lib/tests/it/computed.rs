use std::{cell::Cell, rc::Rc};

use objext::{Objext, Template, Value};
use serde_json::json;

use crate::helpers::{recorder, some};

fn with_sex() -> Objext {
    let template = Template::try_from(json!({ "name": "tomy", "age": 18 }))
        .unwrap()
        .with_computed("sex", |scope| {
            let adult = scope.get_as::<i64>("age").is_some_and(|age| age > 20);
            Value::from(if adult { "female" } else { "male" })
        });
    Objext::from_template(template).unwrap()
}

#[test]
fn test_computed_value_is_stored() {
    let objx = with_sex();
    assert_eq!(objx.get("sex").unwrap(), "male");
    assert_eq!(
        objx.to_json_string(),
        r#"{"name":"tomy","age":18,"sex":"male"}"#
    );
}

#[test]
fn test_recompute_on_dependency_change() {
    let mut objx = with_sex();
    let (log, listener) = recorder();
    objx.watch("sex", listener, false);

    objx.set("age", 32).unwrap();
    assert_eq!(objx.get("sex").unwrap(), "female");
    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].new, some(json!("female")));
    assert_eq!(log[0].old, some(json!("male")));
}

#[test]
fn test_unrelated_write_does_not_recompute() {
    let runs = Rc::new(Cell::new(0));
    let counter = Rc::clone(&runs);
    let mut objx = Objext::from_json(json!({ "a": 1, "b": 2 })).unwrap();
    objx.describe("twice", move |scope| {
        counter.set(counter.get() + 1);
        Value::Int(scope.get_as::<i64>("a").unwrap_or_default() * 2)
    })
    .unwrap();
    assert_eq!(runs.get(), 1);

    objx.set("b", 3).unwrap();
    assert_eq!(runs.get(), 1);
    objx.set("a", 5).unwrap();
    assert_eq!(runs.get(), 2);
    assert_eq!(objx.get("twice").unwrap(), &10);
}

#[test]
fn test_computed_chain() {
    let template = Template::try_from(json!({ "age": 10 }))
        .unwrap()
        .with_computed("double", |scope| {
            Value::Int(scope.get_as::<i64>("age").unwrap_or_default() * 2)
        })
        .with_computed("label", |scope| {
            Value::from(format!("{} points", scope.get_as::<i64>("double").unwrap_or_default()))
        });
    let mut objx = Objext::from_template(template).unwrap();
    assert_eq!(objx.get("label").unwrap(), "20 points");

    objx.set("age", 21).unwrap();
    assert_eq!(objx.get("double").unwrap(), &42);
    assert_eq!(objx.get("label").unwrap(), "42 points");
}

#[test]
fn test_getter_sees_siblings_listed_after_it() {
    let template = Template::new()
        .with_computed("greeting", |scope| {
            Value::from(format!("hi {}", scope.get("name").map(Value::as_text_or_empty).unwrap_or_default()))
        })
        .with("name", "tomy");
    let objx = Objext::from_template(template).unwrap();
    assert_eq!(objx.get("greeting").unwrap(), "hi tomy");
}

#[test]
fn test_nested_template_computed() {
    let mut objx = Objext::new();
    objx.set_template(
        "profile",
        Template::new()
            .with("first", "tomy")
            .with("last", "lee")
            .with_computed("full", |scope| {
                let first = scope.get("first").map(Value::as_text_or_empty).unwrap_or_default();
                let last = scope.get("last").map(Value::as_text_or_empty).unwrap_or_default();
                Value::from(format!("{first} {last}"))
            }),
    )
    .unwrap();
    assert_eq!(objx.get("profile.full").unwrap(), "tomy lee");

    objx.set("profile.first", "ann").unwrap();
    assert_eq!(objx.get("profile.full").unwrap(), "ann lee");
}

#[test]
fn test_plain_write_detaches_computed() {
    let mut objx = with_sex();
    objx.set("sex", "unknown").unwrap();
    objx.set("age", 40).unwrap();
    assert_eq!(objx.get("sex").unwrap(), "unknown");
}

#[test]
fn test_removed_computed_stays_removed() {
    let mut objx = with_sex();
    assert_eq!(objx.remove("sex"), Some(Value::from("male")));
    objx.set("age", 40).unwrap();
    assert!(!objx.has("sex"));
}

#[test]
fn test_replacing_parent_drops_nested_computed() {
    let mut objx = Objext::new();
    objx.set_template(
        "stats",
        Template::new()
            .with("hits", 1)
            .with_computed("double", |scope| {
                Value::Int(scope.get_as::<i64>("hits").unwrap_or_default() * 2)
            }),
    )
    .unwrap();
    objx.set("stats", json!({ "hits": 5 })).unwrap();
    assert!(!objx.has("stats.double"));
    objx.set("stats.hits", 6).unwrap();
    assert!(!objx.has("stats.double"));
}

#[test]
fn test_cross_node_reads() {
    let mut objx = Objext::from_json(json!({
        "settings": { "unit": "kg" },
        "parcel": { "weight": 3 },
    }))
    .unwrap();
    let settings = objx.at("settings").unwrap().id();
    objx.at("parcel")
        .unwrap()
        .describe("label", move |scope| {
            let unit = scope.get_from(settings, "unit").map(Value::as_text_or_empty).unwrap_or_default();
            let weight = scope.get_as::<i64>("weight").unwrap_or_default();
            Value::from(format!("{weight} {unit}"))
        })
        .unwrap();
    assert_eq!(objx.get("parcel.label").unwrap(), "3 kg");

    objx.set("settings.unit", "lb").unwrap();
    assert_eq!(objx.get("parcel.label").unwrap(), "3 lb");
}

#[test]
fn test_cross_node_reads_follow_replaced_source() {
    let mut objx = Objext::from_json(json!({
        "name": "tomy",
        "hobbits": { "swimming": true },
    }))
    .unwrap();
    let hobbits = objx.at("hobbits").unwrap().id();
    objx.describe("healthy", move |scope| {
        scope.get_from(hobbits, "swimming").cloned().unwrap_or(Value::Bool(false))
    })
    .unwrap();
    assert_eq!(objx.get("healthy").unwrap(), &true);

    objx.set("hobbits", json!({ "swimming": false })).unwrap();
    assert_eq!(objx.get("healthy").unwrap(), &false);

    objx.set("hobbits.swimming", true).unwrap();
    assert_eq!(objx.get("healthy").unwrap(), &true);

    objx.remove("hobbits");
    assert_eq!(objx.get("healthy").unwrap(), &false);
}

#[test]
fn test_explicit_dependency_survives_replaced_source() {
    let mut objx = Objext::from_json(json!({ "config": { "level": 1 } })).unwrap();
    objx.describe("summary", |scope| {
        let level = scope.peek("config.level").and_then(Value::as_int).unwrap_or_default();
        Value::from(format!("level {level}"))
    })
    .unwrap();
    let config = objx.at("config").unwrap().id();
    objx.depend(config, "level", "summary");

    objx.set("config", json!({ "level": 5 })).unwrap();
    assert_eq!(objx.get("summary").unwrap(), "level 5");

    objx.set("config.level", 6).unwrap();
    assert_eq!(objx.get("summary").unwrap(), "level 6");
}

#[test]
fn test_explicit_dependency() {
    let mut objx = Objext::from_json(json!({ "config": { "level": 1 } })).unwrap();
    objx.describe("summary", |scope| {
        let level = scope.peek("config.level").and_then(Value::as_int).unwrap_or_default();
        Value::from(format!("level {level}"))
    })
    .unwrap();

    // Untracked reads do not trigger recomputation.
    objx.set("config.level", 2).unwrap();
    assert_eq!(objx.get("summary").unwrap(), "level 1");

    let config = objx.at("config").unwrap().id();
    objx.depend(config, "level", "summary");
    objx.set("config.level", 3).unwrap();
    assert_eq!(objx.get("summary").unwrap(), "level 3");
}
