use objext::{Config, Objext, Template, Value};
use serde_json::json;

use crate::helpers::{recorder, some};

fn family() -> Objext {
    Objext::from_json(json!({
        "name": "tomy",
        "age": 32,
        "hobbits": { "swimming": true, "reading": false },
        "children": [{ "name": "ann", "age": 3 }, { "name": "bob", "age": 5 }],
    }))
    .unwrap()
}

#[test]
fn test_get_nested_paths() {
    let objx = family();
    assert_eq!(objx.get("name").unwrap(), "tomy");
    assert_eq!(objx.get("hobbits.swimming"), Some(&Value::Bool(true)));
    assert_eq!(objx.get("children[1].age").unwrap(), &5);
    assert_eq!(objx.get("children.1.age").unwrap(), &5);
    assert_eq!(objx.get_as::<String>("children[0].name").as_deref(), Some("ann"));
    assert_eq!(objx.get("").unwrap(), objx.value());
    assert!(objx.get("children[7].name").is_none());
    assert!(!objx.has("hobbits.cooking"));
}

#[test]
fn test_set_creates_intermediates() {
    let mut objx = Objext::new();
    objx.set("a.b[0].c", 5).unwrap();
    objx.set("a.b[1]", 6).unwrap();

    assert_eq!(
        serde_json::Value::from(objx.to_value()),
        json!({ "a": { "b": [{ "c": 5 }, 6] } })
    );
    assert!(objx.at("a.b").is_some());
    assert!(objx.at("a.b[0]").is_some());
    assert!(objx.at("a.b[1]").is_none());
}

#[test]
fn test_set_empty_path_rejected() {
    let mut objx = family();
    assert!(objx.set("", 1).unwrap_err().is_path_error());
}

#[test]
fn test_set_key_into_sequence_rejected() {
    let mut objx = family();
    let err = objx.set("children.first", "x").unwrap_err();
    assert!(err.is_path_error());
    assert_eq!(objx.get("children").unwrap().as_list().unwrap().len(), 2);
}

#[test]
fn test_set_past_the_end_rejected() {
    let mut objx = family();
    assert!(objx.set("children[3]", json!({ "name": "cid" })).unwrap_err().is_path_error());
    assert!(objx.set("children[18446744073709551615]", 1).unwrap_err().is_path_error());
    assert!(objx.set("children[18446744073709551615].name", "x").unwrap_err().is_path_error());

    objx.set("children[2]", json!({ "name": "cid" })).unwrap();
    assert_eq!(objx.get("children[2].name").unwrap(), "cid");
    assert!(objx.at("children[2]").is_some());
}

#[test]
fn test_remove_returns_old_value() {
    let mut objx = family();
    let (log, listener) = recorder();
    objx.watch("hobbits", listener, true);

    assert_eq!(objx.remove("hobbits.reading"), Some(Value::Bool(false)));
    assert!(!objx.has("hobbits.reading"));
    assert_eq!(objx.remove("hobbits.reading"), None);

    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].new, some(json!({ "swimming": true })));
    assert_eq!(log[0].old, some(json!({ "swimming": true, "reading": false })));
}

#[test]
fn test_put_replaces_all_keys() {
    let mut objx = family();
    let (log, listener) = recorder();
    objx.watch("age", listener, false);

    objx.put(Template::try_from(json!({ "name": "piggy", "hobbits": {} })).unwrap())
        .unwrap();

    assert_eq!(
        serde_json::Value::from(objx.to_value()),
        json!({ "name": "piggy", "hobbits": {} })
    );
    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].new, None);
    assert_eq!(log[0].old, some(json!(32)));
}

#[test]
fn test_update_merges() {
    let mut objx = family();
    objx.update(Template::try_from(json!({ "age": 33, "city": "paris" })).unwrap())
        .unwrap();

    assert_eq!(objx.get("age").unwrap(), &33);
    assert_eq!(objx.get("city").unwrap(), "paris");
    assert_eq!(objx.get("name").unwrap(), "tomy");
    assert!(objx.at("children[1]").is_some());
}

#[test]
fn test_node_handles_use_relative_paths() {
    let mut objx = family();
    {
        let mut child = objx.at("children[1]").unwrap();
        assert_eq!(child.path().to_string(), "children[1]");
        assert_eq!(child.get("name").unwrap(), "bob");
        child.set("age", 6).unwrap();
    }
    assert_eq!(objx.get("children[1].age").unwrap(), &6);

    let id = objx.at("hobbits").unwrap().id();
    assert_eq!(objx.node_path(id).unwrap().to_string(), "hobbits");
    objx.node(id).unwrap().set("cooking", true).unwrap();
    assert_eq!(objx.get("hobbits.cooking"), Some(&Value::Bool(true)));
}

#[test]
fn test_scalars_have_no_node() {
    let mut objx = family();
    assert!(objx.at("name").is_none());
    assert!(objx.at("missing").is_none());
}

#[test]
fn test_graft_keeps_listeners() {
    let mut pet = Objext::from_json(json!({ "name": "rex", "tags": ["dog"] })).unwrap();
    let (log, listener) = recorder();
    pet.watch("name", listener, false);

    let mut objx = family();
    objx.graft("pet", pet).unwrap();
    assert_eq!(objx.get("pet.tags[0]").unwrap(), "dog");

    objx.set("pet.name", "max").unwrap();
    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].new, some(json!("max")));
    assert_eq!(log[0].old, some(json!("rex")));
}

#[test]
fn test_json_rendering_keeps_insertion_order() {
    let mut objx = Objext::new();
    objx.set("zeta", 1).unwrap();
    objx.set("alpha", json!([true, null, 1.5])).unwrap();
    assert_eq!(objx.to_json_string(), r#"{"zeta":1,"alpha":[true,null,1.5]}"#);
    assert_eq!(objx.to_string(), objx.to_json_string());
}

#[test]
fn test_hash_ignores_key_order() {
    let a = Objext::from_json(json!({ "x": 1, "y": { "z": [1, 2] } })).unwrap();
    let b = Objext::from_json(json!({ "y": { "z": [1, 2] }, "x": 1 })).unwrap();
    let c = Objext::from_json(json!({ "y": { "z": [2, 1] }, "x": 1 })).unwrap();

    assert_eq!(a.hash(), b.hash());
    assert_eq!(a.hash().len(), 64);
    assert!(a.same_content(&b));
    assert!(!a.same_content(&c));
}

#[test]
fn test_fork_is_independent() {
    let mut objx = family();
    let mut copy = objx.fork().unwrap();
    copy.set("name", "clone").unwrap();
    objx.set("age", 40).unwrap();

    assert_eq!(objx.get("name").unwrap(), "tomy");
    assert_eq!(copy.get("age").unwrap(), &32);
    assert!(copy.at("children[0]").is_some());
}

#[test]
fn test_config_is_kept() {
    let objx = Objext::with_config(Config::default().strict(true));
    assert!(objx.config().strict);
    assert!(objx.value().as_map().unwrap().is_empty());
}
