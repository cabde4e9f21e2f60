use std::{cell::RefCell, rc::Rc};

use objext::{ChangeEvent, Objext, Template, Value};
use serde_json::json;

/// What a listener saw, reduced to comparable parts.
#[derive(Debug, Clone, PartialEq)]
pub struct Seen {
    pub key: String,
    pub path: String,
    pub new: Option<Value>,
    pub old: Option<Value>,
}

pub type Log = Rc<RefCell<Vec<Seen>>>;

/// Creates a shared log and a listener that appends every event to it.
pub fn recorder() -> (Log, impl Fn(&ChangeEvent) + 'static) {
    let log: Log = Rc::default();
    let sink = Rc::clone(&log);
    let listener = move |event: &ChangeEvent| {
        sink.borrow_mut().push(Seen {
            key: event.key.to_string(),
            path: event.path.to_string(),
            new: event.new_value.clone(),
            old: event.old_value.clone(),
        });
    };
    (log, listener)
}

/// Creates a listener that appends `label` to a shared order log.
pub fn labeled(order: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> impl Fn(&ChangeEvent) + 'static {
    let order = Rc::clone(order);
    move |_: &ChangeEvent| order.borrow_mut().push(label)
}

pub fn some(value: serde_json::Value) -> Option<Value> {
    Some(Value::from(value))
}

/// The person used throughout the tests, with a `healthy` computed property
/// mirroring `hobbits.swimming`.
pub fn person() -> Objext {
    let template = Template::try_from(json!({
        "name": "tomy",
        "age": 32,
        "hobbits": { "swimming": true },
    }))
    .unwrap()
    .with_computed("healthy", |scope| {
        scope
            .get("hobbits.swimming")
            .cloned()
            .unwrap_or(Value::Bool(false))
    });
    Objext::from_template(template).unwrap()
}
