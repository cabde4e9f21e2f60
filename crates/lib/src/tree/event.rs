//! Change events delivered to listeners.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::NodeId;
use crate::data::{PathBuf, Value};

/// A listener callback.
///
/// Callbacks are compared by identity: `unwatch` removes the listeners that
/// were registered with a clone of the same `Callback`.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&ChangeEvent)>);

impl Callback {
    pub fn new(callback: impl Fn(&ChangeEvent) + 'static) -> Self {
        Self(Rc::new(callback))
    }

    pub(crate) fn call(&self, event: &ChangeEvent) {
        (self.0)(event)
    }

    pub fn same(&self, other: &Callback) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

/// How a listener matched the changed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenKind {
    /// The listener path equals the changed path.
    Exact,
    /// A deep listener whose path is a strict prefix of the changed path.
    Deep,
    /// A `*` listener.
    Wildcard,
}

/// Per-event cancellation flags, shared by all listeners of one dispatch.
#[derive(Debug, Default)]
pub(crate) struct EventControl {
    propagation: Cell<bool>,
    immediate: Cell<bool>,
}

impl EventControl {
    pub(crate) fn propagation_stopped(&self) -> bool {
        self.propagation.get()
    }

    pub(crate) fn immediate_stopped(&self) -> bool {
        self.immediate.get()
    }
}

/// A change as seen by one listener.
///
/// `new_value` and `old_value` are the values at the listener's own path
/// (the whole node data for wildcard listeners), not at the changed path.
/// `None` means nothing was stored there.
#[derive(Debug)]
pub struct ChangeEvent {
    /// The path the listener was registered with.
    pub key: PathBuf,
    pub kind: ListenKind,
    /// The changed path, relative to `node`.
    pub path: PathBuf,
    /// The node the listener is registered on.
    pub node: NodeId,
    pub new_value: Option<Value>,
    pub old_value: Option<Value>,
    pub(crate) control: Rc<EventControl>,
}

impl ChangeEvent {
    /// Stops the change from bubbling to ancestor nodes.
    pub fn stop_propagation(&self) {
        self.control.propagation.set(true);
    }

    /// Skips the remaining listeners on this node. Bubbling is unaffected.
    pub fn stop_immediate_propagation(&self) {
        self.control.immediate.set(true);
    }

    pub fn is_deep(&self) -> bool {
        self.kind == ListenKind::Deep
    }
}
