//! Listener registration, dispatch and batching.
//!
//! A dispatch carries the changed path (relative to the node) and the value
//! that was stored there before the change. New values are always read from
//! live storage; old values at other paths are rebuilt by substituting the
//! old value back into a copy of the current data.

use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::arena::{BufferedChange, Handler, Listener};
use super::event::{Callback, ChangeEvent, EventControl, ListenKind};
use super::{NodeId, Objext};
use crate::data::{PathBuf, Value};

/// Which handlers a dispatch may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reach {
    /// User callbacks and computed property recomputation.
    Full,
    /// Only computed property recomputation. Used for silent nodes and once
    /// a listener stopped propagation.
    DependenciesOnly,
    /// Only user callbacks. Used when a batch is flushed, since recomputation
    /// already ran when the buffered writes happened.
    CallbacksOnly,
}

impl Reach {
    fn recomputes(self) -> bool {
        self != Reach::CallbacksOnly
    }

    fn calls_back(self) -> bool {
        self != Reach::DependenciesOnly
    }

    /// The same reach with user callbacks removed, if anything is left.
    fn without_callbacks(self) -> Option<Reach> {
        match self {
            Reach::Full | Reach::DependenciesOnly => Some(Reach::DependenciesOnly),
            Reach::CallbacksOnly => None,
        }
    }
}

impl Objext {
    pub(crate) fn watch_in(&mut self, node: NodeId, path: PathBuf, callback: Callback, deep: bool) {
        if let Some(state) = self.nodes.get_mut(&node) {
            state.listeners.push(Listener {
                path,
                deep,
                handler: Handler::Callback(callback),
            });
        }
    }

    /// Removes every listener registered at `path` with `callback`.
    pub(crate) fn unwatch_in(&mut self, node: NodeId, path: &PathBuf, callback: &Callback) {
        if let Some(state) = self.nodes.get_mut(&node) {
            state.listeners.retain(|listener| {
                listener.path != *path
                    || !matches!(&listener.handler, Handler::Callback(cb) if cb.same(callback))
            });
        }
    }

    /// Notifies the listeners of `node` about a change at `path` and bubbles
    /// the change to the parent.
    ///
    /// A batching node still recomputes its dependents immediately and lets
    /// the change reach the computed properties of its ancestors; only the
    /// user callbacks are buffered.
    pub(crate) fn dispatch(&mut self, node: NodeId, path: PathBuf, old: Option<Value>, reach: Reach) {
        let Some(state) = self.nodes.get(&node) else {
            return;
        };
        if !state.initialized || self.is_locked_node(node) {
            return;
        }
        let parent = state.parent.zip(state.key.clone());
        let batching = state.batching;

        let reach = if self.is_silent_node(node) {
            reach.without_callbacks()
        } else {
            Some(reach)
        };
        let Some(reach) = reach else {
            return;
        };

        if batching {
            if reach.recomputes() {
                for (listener, _) in self.select_listeners(node, &path) {
                    if let Handler::Recompute { node: owner, key } = listener.handler {
                        self.recompute(owner, &key);
                    }
                }
            }
            if reach.calls_back() {
                if let Some(state) = self.nodes.get_mut(&node) {
                    state.batch_buffer.push(BufferedChange {
                        path: path.clone(),
                        old: old.clone(),
                    });
                }
            }
            if let (true, Some((parent, key))) = (reach.recomputes(), parent) {
                let parent_path = PathBuf::from(key).join(&path);
                self.dispatch(parent, parent_path, old, Reach::DependenciesOnly);
            }
            return;
        }

        let selected = self.select_listeners(node, &path);
        trace!(node = %node, path = %path, listeners = selected.len(), "dispatch");

        let control = Rc::new(EventControl::default());
        for (listener, kind) in selected {
            match listener.handler {
                Handler::Recompute { node: owner, key } => {
                    if reach.recomputes() {
                        self.recompute(owner, &key);
                    }
                }
                Handler::Callback(callback) => {
                    if !reach.calls_back() || control.immediate_stopped() {
                        continue;
                    }
                    let event = self.event_for(node, listener.path, kind, &path, &old, &control);
                    callback.call(&event);
                }
            }
        }

        if let Some((parent, key)) = parent {
            let reach = if control.propagation_stopped() {
                reach.without_callbacks()
            } else {
                Some(reach)
            };
            if let Some(reach) = reach {
                let parent_path = PathBuf::from(key).join(&path);
                self.dispatch(parent, parent_path, old, reach);
            }
        }
    }

    /// Listeners of `node` matching `path`: path-specific ones in
    /// registration order, then wildcards.
    fn select_listeners(&self, node: NodeId, path: &PathBuf) -> Vec<(Listener, ListenKind)> {
        let Some(state) = self.nodes.get(&node) else {
            return Vec::new();
        };
        let mut specific = Vec::new();
        let mut wildcards = Vec::new();
        for listener in &state.listeners {
            match listener.handler {
                Handler::Recompute { .. } => {
                    if listener.path.overlaps(path) {
                        specific.push((listener.clone(), ListenKind::Deep));
                    }
                }
                Handler::Callback(_) => {
                    if listener.path.is_wildcard() {
                        wildcards.push((listener.clone(), ListenKind::Wildcard));
                    } else if listener.path == *path {
                        specific.push((listener.clone(), ListenKind::Exact));
                    } else if listener.deep && path.is_descendant_of(&listener.path) {
                        specific.push((listener.clone(), ListenKind::Deep));
                    }
                }
            }
        }
        specific.extend(wildcards);
        specific
    }

    fn event_for(
        &self,
        node: NodeId,
        key: PathBuf,
        kind: ListenKind,
        path: &PathBuf,
        old: &Option<Value>,
        control: &Rc<EventControl>,
    ) -> ChangeEvent {
        let data = self.node_value(node);
        let (new_value, old_value) = match kind {
            ListenKind::Wildcard => (data.cloned(), rebuild_old(data, path, old)),
            ListenKind::Exact | ListenKind::Deep => {
                let current = data.and_then(|value| value.get_path(&key));
                let below = path.strip_prefix(&key).unwrap_or_default();
                (current.cloned(), rebuild_old(current, &below, old))
            }
        };
        ChangeEvent {
            key,
            kind,
            path: path.clone(),
            node,
            new_value,
            old_value,
            control: Rc::clone(control),
        }
    }

    pub(crate) fn batch_start_in(&mut self, node: NodeId) {
        if let Some(state) = self.nodes.get_mut(&node) {
            state.batching = true;
        }
    }

    /// Stops batching and runs the user callbacks for every buffered path
    /// once, with the first old value seen for it.
    pub(crate) fn batch_end_in(&mut self, node: NodeId) {
        let Some(state) = self.nodes.get_mut(&node) else {
            return;
        };
        state.batching = false;
        let buffer = std::mem::take(&mut state.batch_buffer);

        let mut collapsed: IndexMap<PathBuf, Option<Value>> = IndexMap::new();
        for change in buffer {
            collapsed.entry(change.path).or_insert(change.old);
        }
        debug!(node = %node, changes = collapsed.len(), "batch end");
        for (path, old) in collapsed {
            self.dispatch(node, path, old, Reach::CallbacksOnly);
        }
    }
}

/// Reconstructs the value at some location before a change at `below` (a
/// path relative to that location), given the current value there and the
/// old value at `below`.
fn rebuild_old(current: Option<&Value>, below: &PathBuf, old: &Option<Value>) -> Option<Value> {
    if below.is_empty() {
        return old.clone();
    }
    let mut base = current?.clone();
    match old {
        Some(value) => {
            base.assign(below, value.clone()).ok()?;
        }
        None => {
            base.remove_path(below);
        }
    }
    Some(base)
}
