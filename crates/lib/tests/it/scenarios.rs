use std::{cell::RefCell, rc::Rc};

use objext::{Config, Objext, Rule, Template, Value};
use serde_json::json;

use crate::helpers::{Seen, person, recorder, some};

#[test]
fn test_healthy_follows_swimming() {
    let mut objx = person();
    assert_eq!(objx.get("healthy"), Some(&Value::Bool(true)));

    let (healthy, on_healthy) = recorder();
    let (swimming, on_swimming) = recorder();
    objx.watch("healthy", on_healthy, false);
    objx.watch("hobbits.swimming", on_swimming, false);

    objx.set("hobbits.swimming", false).unwrap();

    assert_eq!(
        *healthy.borrow(),
        vec![Seen {
            key: "healthy".to_string(),
            path: "healthy".to_string(),
            new: some(json!(false)),
            old: some(json!(true)),
        }]
    );
    assert_eq!(
        *swimming.borrow(),
        vec![Seen {
            key: "hobbits.swimming".to_string(),
            path: "hobbits.swimming".to_string(),
            new: some(json!(false)),
            old: some(json!(true)),
        }]
    );
}

#[test]
fn test_replacing_dependency_container_recomputes() {
    let mut objx = person();
    objx.set("hobbits", json!({ "swimming": false })).unwrap();
    assert_eq!(objx.get("healthy"), Some(&Value::Bool(false)));

    objx.remove("hobbits");
    assert_eq!(objx.get("healthy"), Some(&Value::Bool(false)));

    objx.set("hobbits.swimming", true).unwrap();
    assert_eq!(objx.get("healthy"), Some(&Value::Bool(true)));
}

#[test]
fn test_form_editing_session() {
    let template = Template::try_from(json!({
        "user": { "first": "tomy", "last": "lee", "age": 32 },
        "tags": [],
    }))
    .unwrap();
    let mut objx = Objext::from_template_with_config(template, Config::default().strict(true)).unwrap();
    objx.at("user").unwrap().formulate([Rule::new("age", "age out of range", |value| {
        value.and_then(Value::as_int).is_some_and(|age| (0..150).contains(&age))
    })]);
    objx.at("user")
        .unwrap()
        .describe("display", |scope| {
            let first = scope.get("first").map(Value::as_text_or_empty).unwrap_or_default();
            let last = scope.get("last").map(Value::as_text_or_empty).unwrap_or_default();
            Value::from(format!("{last}, {first}"))
        })
        .unwrap();

    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&changes);
    objx.watch(
        "*",
        move |event| sink.borrow_mut().push(event.path.to_string()),
        false,
    );

    objx.commit("clean");
    objx.batch_start();
    objx.set("user.first", "ann").unwrap();
    objx.set("user.age", 200).unwrap_err();
    objx.list("tags").unwrap().push("new");
    objx.batch_end();

    assert_eq!(objx.get("user.display").unwrap(), "lee, ann");
    assert_eq!(objx.get("user.age").unwrap(), &32);
    // The recomputed display name reaches the root before the write that
    // caused it, so it is buffered first.
    assert_eq!(
        *changes.borrow(),
        vec!["user.display".to_string(), "user.first".to_string(), "tags".to_string()]
    );

    objx.reset(Some("clean")).unwrap();
    assert_eq!(objx.get("user.display").unwrap(), "lee, tomy");
    assert_eq!(objx.get("tags").unwrap().as_list().map(<[Value]>::len), Some(0));
}
