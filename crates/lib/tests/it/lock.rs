use objext::{Objext, Template, Value};
use serde_json::json;

use crate::helpers::recorder;

fn sample() -> Objext {
    Objext::from_json(json!({
        "name": "tomy",
        "hobbits": { "swimming": true },
        "children": [{ "name": "ann", "toys": ["ball"] }],
    }))
    .unwrap()
}

#[test]
fn test_locked_root_ignores_every_write() {
    let mut objx = sample();
    let before = objx.to_value();
    let (log, listener) = recorder();
    objx.watch("", listener, true);

    objx.lock();
    assert!(objx.is_locked());
    objx.set("name", "piggy").unwrap();
    objx.set("hobbits.swimming", false).unwrap();
    objx.set("children[0].name", "bob").unwrap();
    assert_eq!(objx.remove("name"), None);
    objx.put(Template::new()).unwrap();
    objx.update(Template::new().with("age", 3)).unwrap();
    objx.list("children[0].toys").unwrap().push("car");
    objx.describe("extra", |_| Value::from(1)).unwrap();

    assert_eq!(objx.to_value(), before);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_lock_is_inherited_by_descendants() {
    let mut objx = sample();
    objx.lock();
    assert!(objx.at("children[0]").unwrap().is_locked());
    objx.at("children[0]").unwrap().set("name", "bob").unwrap();
    assert_eq!(objx.get("children[0].name").unwrap(), "ann");
}

#[test]
fn test_unlock_restores_writes() {
    let mut objx = sample();
    objx.lock();
    objx.set("name", "piggy").unwrap();
    objx.unlock();
    objx.set("name", "piggy").unwrap();
    assert_eq!(objx.get("name").unwrap(), "piggy");
}

#[test]
fn test_locked_child_leaves_siblings_writable() {
    let mut objx = sample();
    objx.at("hobbits").unwrap().lock();

    objx.set("hobbits.swimming", false).unwrap();
    objx.set("name", "piggy").unwrap();
    objx.set("children[0].toys[1]", "car").unwrap();

    assert_eq!(objx.get("hobbits.swimming").unwrap(), &true);
    assert_eq!(objx.get("name").unwrap(), "piggy");
    assert_eq!(objx.get("children[0].toys[1]").unwrap(), "car");
    assert!(!objx.is_locked());
}

#[test]
fn test_locked_node_keeps_its_computed_value() {
    let mut objx = sample();
    let root = objx.root();
    objx.at("hobbits")
        .unwrap()
        .describe("owner", move |scope| scope.get_from(root, "name").cloned().unwrap_or_default())
        .unwrap();
    assert_eq!(objx.get("hobbits.owner").unwrap(), "tomy");

    objx.at("hobbits").unwrap().lock();
    objx.set("name", "piggy").unwrap();
    assert_eq!(objx.get("hobbits.owner").unwrap(), "tomy");

    objx.at("hobbits").unwrap().unlock();
    objx.set("name", "bob").unwrap();
    assert_eq!(objx.get("hobbits.owner").unwrap(), "bob");
}
