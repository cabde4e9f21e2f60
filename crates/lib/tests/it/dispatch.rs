use std::{cell::RefCell, rc::Rc};

use objext::{ChangeEvent, Objext, Value};
use serde_json::json;

use crate::helpers::{Seen, labeled, person, recorder, some};

fn hobbit() -> Objext {
    Objext::from_json(json!({
        "name": "tomy",
        "age": 32,
        "hobbits": { "swimming": true },
    }))
    .unwrap()
}

#[test]
fn test_exact_listener_sees_old_and_new() {
    let mut objx = hobbit();
    let (log, listener) = recorder();
    objx.watch("age", listener, false);

    objx.set("age", 33).unwrap();
    objx.set("name", "piggy").unwrap();

    assert_eq!(
        *log.borrow(),
        vec![Seen {
            key: "age".to_string(),
            path: "age".to_string(),
            new: some(json!(33)),
            old: some(json!(32)),
        }]
    );
}

#[test]
fn test_listener_on_added_key_sees_no_old_value() {
    let mut objx = hobbit();
    let (log, listener) = recorder();
    objx.watch("city", listener, false);

    objx.set("city", "paris").unwrap();
    let log = log.borrow();
    assert_eq!(log[0].new, some(json!("paris")));
    assert_eq!(log[0].old, None);
}

#[test]
fn test_deep_listener_matches_whole_segments() {
    let mut objx = hobbit();
    let (prefix, prefix_listener) = recorder();
    let (deep, deep_listener) = recorder();
    let (shallow, shallow_listener) = recorder();
    objx.watch("hob", prefix_listener, true);
    objx.watch("hobbits", deep_listener, true);
    objx.watch("hobbits", shallow_listener, false);

    objx.set("hobbits.swimming", false).unwrap();

    assert!(prefix.borrow().is_empty());
    assert!(shallow.borrow().is_empty());
    assert_eq!(
        *deep.borrow(),
        vec![Seen {
            key: "hobbits".to_string(),
            path: "hobbits.swimming".to_string(),
            new: some(json!({ "swimming": false })),
            old: some(json!({ "swimming": true })),
        }]
    );
}

#[test]
fn test_replacing_container_fires_exact_listener() {
    let mut objx = hobbit();
    let (log, listener) = recorder();
    objx.watch("hobbits", listener, false);

    objx.set("hobbits", json!({ "reading": true })).unwrap();
    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].new, some(json!({ "reading": true })));
    assert_eq!(log[0].old, some(json!({ "swimming": true })));
}

#[test]
fn test_wildcards_fire_after_specific_listeners() {
    let mut objx = hobbit();
    let order = Rc::new(RefCell::new(Vec::new()));
    objx.watch("*", labeled(&order, "wildcard"), false);
    objx.watch("age", labeled(&order, "exact"), false);
    objx.watch("", labeled(&order, "everything"), true);

    objx.set("age", 40).unwrap();
    assert_eq!(*order.borrow(), vec!["exact", "everything", "wildcard"]);
}

#[test]
fn test_wildcard_sees_whole_node_data() {
    let mut objx = hobbit();
    let (log, listener) = recorder();
    objx.at("hobbits").unwrap().watch("*", listener, false);

    objx.set("hobbits.reading", true).unwrap();
    objx.set("age", 1).unwrap();

    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].path, "reading");
    assert_eq!(log[0].new, some(json!({ "swimming": true, "reading": true })));
    assert_eq!(log[0].old, some(json!({ "swimming": true })));
}

#[test]
fn test_changes_bubble_to_ancestors() {
    let mut objx = hobbit();
    let order = Rc::new(RefCell::new(Vec::new()));
    objx.at("hobbits").unwrap().watch("swimming", labeled(&order, "child"), false);
    objx.watch("hobbits.swimming", labeled(&order, "root"), false);

    objx.set("hobbits.swimming", false).unwrap();
    assert_eq!(*order.borrow(), vec!["child", "root"]);

    // Writing through the child handle reaches the root too.
    objx.at("hobbits").unwrap().set("swimming", true).unwrap();
    assert_eq!(order.borrow().len(), 4);
}

#[test]
fn test_stop_propagation_keeps_change_local() {
    let mut objx = hobbit();
    let order = Rc::new(RefCell::new(Vec::new()));
    let local = Rc::clone(&order);
    objx.at("hobbits").unwrap().watch(
        "swimming",
        move |event: &ChangeEvent| {
            local.borrow_mut().push("first");
            event.stop_propagation();
        },
        false,
    );
    objx.at("hobbits").unwrap().watch("swimming", labeled(&order, "second"), false);
    objx.watch("hobbits.swimming", labeled(&order, "root"), false);

    objx.set("hobbits.swimming", false).unwrap();
    assert_eq!(*order.borrow(), vec!["first", "second"]);
}

#[test]
fn test_stop_immediate_propagation_skips_siblings_only() {
    let mut objx = hobbit();
    let order = Rc::new(RefCell::new(Vec::new()));
    let local = Rc::clone(&order);
    objx.at("hobbits").unwrap().watch(
        "swimming",
        move |event: &ChangeEvent| {
            local.borrow_mut().push("first");
            event.stop_immediate_propagation();
        },
        false,
    );
    objx.at("hobbits").unwrap().watch("swimming", labeled(&order, "second"), false);
    objx.watch("hobbits.swimming", labeled(&order, "root"), false);

    objx.set("hobbits.swimming", false).unwrap();
    assert_eq!(*order.borrow(), vec!["first", "root"]);
}

#[test]
fn test_unwatch_removes_listener() {
    let mut objx = hobbit();
    let (log, listener) = recorder();
    let callback = objx.watch("age", listener, false);

    objx.set("age", 1).unwrap();
    objx.unwatch("age", &callback);
    objx.set("age", 2).unwrap();
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_remove_dispatches_none() {
    let mut objx = hobbit();
    let (log, listener) = recorder();
    objx.watch("name", listener, false);

    objx.remove("name");
    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].new, None);
    assert_eq!(log[0].old, some(json!("tomy")));
}

#[test]
fn test_batch_collapses_changes() {
    let mut objx = hobbit();
    let (log, listener) = recorder();
    objx.watch("age", listener, false);
    let order = Rc::new(RefCell::new(Vec::new()));
    objx.watch("", labeled(&order, "any"), true);

    objx.batch_start();
    objx.set("age", 33).unwrap();
    objx.set("name", "piggy").unwrap();
    objx.set("age", 34).unwrap();
    assert!(log.borrow().is_empty());
    assert_eq!(objx.get("age").unwrap(), &34);

    objx.batch_end();
    assert_eq!(
        *log.borrow(),
        vec![Seen {
            key: "age".to_string(),
            path: "age".to_string(),
            new: some(json!(34)),
            old: some(json!(32)),
        }]
    );
    // One dispatch per distinct path.
    assert_eq!(order.borrow().len(), 2);
}

#[test]
fn test_batch_keeps_computed_values_current() {
    let mut objx = person();
    let (log, listener) = recorder();
    objx.watch("healthy", listener, false);

    objx.batch_start();
    objx.set("hobbits.swimming", false).unwrap();
    assert_eq!(objx.get("healthy").unwrap(), &false);
    assert!(log.borrow().is_empty());

    objx.set("hobbits.swimming", true).unwrap();
    objx.set("hobbits.swimming", false).unwrap();
    objx.batch_end();
    assert_eq!(
        *log.borrow(),
        vec![Seen {
            key: "healthy".to_string(),
            path: "healthy".to_string(),
            new: some(json!(false)),
            old: some(json!(true)),
        }]
    );
}

#[test]
fn test_batching_child_still_recomputes_ancestors() {
    let mut objx = person();
    let (swimming, on_swimming) = recorder();
    objx.watch("hobbits.swimming", on_swimming, false);

    objx.at("hobbits").unwrap().batch_start();
    objx.set("hobbits.swimming", false).unwrap();
    assert_eq!(objx.get("healthy").unwrap(), &false);
    assert!(swimming.borrow().is_empty());

    objx.at("hobbits").unwrap().batch_end();
    assert_eq!(swimming.borrow().len(), 1);
    assert_eq!(objx.get("healthy").unwrap(), &false);
}

#[test]
fn test_silent_node_skips_callbacks() {
    let mut objx = hobbit();
    let (log, listener) = recorder();
    objx.watch("age", listener, false);

    objx.silent(true);
    assert!(objx.is_silent());
    objx.set("age", 50).unwrap();
    assert!(log.borrow().is_empty());

    objx.silent(false);
    objx.set("age", 51).unwrap();
    assert_eq!(log.borrow().len(), 1);
    assert_eq!(log.borrow()[0].old, some(json!(50)));
}

#[test]
fn test_silent_ancestor_mutes_descendants() {
    let mut objx = hobbit();
    let (log, listener) = recorder();
    objx.at("hobbits").unwrap().watch("swimming", listener, false);

    objx.silent(true);
    objx.set("hobbits.swimming", false).unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn test_silent_still_recomputes() {
    let mut objx = person();
    let (log, listener) = recorder();
    objx.watch("healthy", listener, false);

    objx.silent(true);
    objx.set("hobbits.swimming", false).unwrap();
    assert_eq!(objx.get("healthy"), Some(&Value::Bool(false)));
    assert!(log.borrow().is_empty());
}
