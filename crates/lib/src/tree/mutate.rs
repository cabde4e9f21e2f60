//! Writes: set, remove, put, update and graft.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use super::arena::{Handler, Listener};
use super::dispatch::Reach;
use super::{NodeId, Objext};
use crate::Result;
use crate::data::{DataError, Field, PathBuf, Segment, Template, Value};

/// What a `set` writes.
pub(crate) enum Payload {
    Plain(Value),
    Template(Template),
    /// A whole objext moved into place.
    Node(Box<Objext>),
}

/// Path of a single template key. Keys are never split on `.`.
pub(crate) fn key_path(key: &str) -> PathBuf {
    PathBuf::from(Segment::from(key))
}

impl Objext {
    /// Writes `payload` at `path` relative to `node`.
    ///
    /// The write is routed to the deepest node that already exists along the
    /// path, checked against the rules of that node and its ancestors, stored,
    /// mounted and finally dispatched from that node.
    pub(crate) fn set_in(&mut self, node: NodeId, path: PathBuf, payload: Payload) -> Result<()> {
        if path.is_empty() {
            return Err(DataError::InvalidPath {
                path: String::new(),
                reason: "cannot set the empty path".to_string(),
            }
            .into());
        }
        let (target, rest) = self.descend(node, &path);
        if self.is_locked_node(target) {
            trace!(path = %path, "set ignored, node is locked");
            return Ok(());
        }

        let (candidate, template, graft) = match payload {
            Payload::Plain(value) => (value, None, None),
            Payload::Template(template) => (template.to_value(), Some(template), None),
            Payload::Node(mut other) => (std::mem::take(&mut other.data), None, Some(other)),
        };

        let verdict = self.check_write(target, &rest, &candidate);
        let mut unhandled = None;
        if let Some(error) = verdict.failure {
            if self.config.strict {
                debug!(path = %path, handled = verdict.handled, "set aborted by validation");
                return if verdict.handled {
                    Ok(())
                } else {
                    Err(error.into())
                };
            }
            if !verdict.handled {
                warn!(path = %path, message = %error.message, "set proceeds despite failed validation");
                unhandled = Some(error);
            }
        }

        let Some(head) = rest.first().cloned() else {
            return Ok(());
        };
        self.detach_computed(target, &rest);
        let old = self.store(target, &rest, candidate)?;
        if let Some(child) = self.child_node(target, &head) {
            self.free_subtree(child);
        }
        self.mount(target, head);

        if let Some(at) = self.resolve_node(target, &rest) {
            if let Some(template) = template {
                self.install_computed(at, template)?;
            }
            if let Some(other) = graft {
                self.adopt(at, *other);
            }
        }

        debug!(path = %path, "set");
        self.dispatch(target, rest, old, Reach::Full);
        match unhandled {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }

    /// Binds the computed fields of a template (nested templates first) onto
    /// the nodes mounted from its plain projection.
    fn install_computed(&mut self, node: NodeId, template: Template) -> Result<()> {
        let mut computed = Vec::new();
        for (key, field) in template {
            match field {
                Field::Nested(nested) => {
                    if let Some(child) = self.child_node(node, &Segment::from(key.as_str())) {
                        self.install_computed(child, nested)?;
                    }
                }
                Field::Computed(getter) => computed.push((key, getter)),
                Field::Value(_) => {}
            }
        }
        for (key, getter) in computed {
            self.describe_in(node, key_path(&key), getter)?;
        }
        Ok(())
    }

    /// Removes `path` relative to `node`. Returns the removed value.
    pub(crate) fn remove_in(&mut self, node: NodeId, path: &PathBuf) -> Option<Value> {
        if path.is_empty() {
            return None;
        }
        let (target, rest) = self.descend(node, path);
        if self.is_locked_node(target) {
            trace!(path = %path, "remove ignored, node is locked");
            return None;
        }
        self.read(target, &rest)?;

        let container_path = rest.parent().unwrap_or_default();
        let container = self.resolve_node(target, &container_path);
        // Removing a sequence element shifts the following elements down.
        let kept = match (self.read(target, &container_path), container, rest.last()) {
            (Some(Value::List(items)), Some(container), Some(Segment::Index(removed))) => {
                let removed = *removed;
                Some((
                    container,
                    (0..items.len())
                        .filter(|index| *index != removed)
                        .map(|index| self.child_node(container, &Segment::Index(index)))
                        .collect::<Vec<_>>(),
                ))
            }
            _ => None,
        };

        self.detach_computed(target, &rest);
        if let Some(child) = self.resolve_node(target, &rest) {
            self.free_subtree(child);
        }
        let old = self.unstore(target, &rest);
        if let Some((container, kept)) = kept {
            self.rehome(container, kept);
        }

        debug!(path = %path, "remove");
        self.dispatch(target, rest, old.clone(), Reach::Full);
        old
    }

    /// Full replace: keys of `node` absent from `template` are removed, then
    /// the template is applied with [`Objext::update_in`].
    pub(crate) fn put_in(&mut self, node: NodeId, template: Template) -> Result<()> {
        if self.is_locked_node(node) {
            trace!(node = %node, "put ignored, node is locked");
            return Ok(());
        }
        let stale: Vec<String> = match self.node_value(node) {
            Some(Value::Map(map)) => {
                let incoming: HashSet<&str> = template.fields().map(|(key, _)| key).collect();
                map.keys()
                    .filter(|key| !incoming.contains(key.as_str()))
                    .cloned()
                    .collect()
            }
            Some(other) => {
                return Err(DataError::NotAMapping {
                    actual: other.type_name().to_string(),
                }
                .into());
            }
            None => Vec::new(),
        };

        debug!(node = %node, removed = stale.len(), "put");
        self.detach_computed(node, &PathBuf::new());
        for key in stale {
            self.remove_in(node, &key_path(&key));
        }
        self.update_in(node, template)
    }

    /// Incremental merge. Plain and nested fields are set in order, computed
    /// fields are bound afterwards so their getters can read the siblings.
    ///
    /// Every field is attempted; the first error is returned.
    pub(crate) fn update_in(&mut self, node: NodeId, template: Template) -> Result<()> {
        if self.is_locked_node(node) {
            trace!(node = %node, "update ignored, node is locked");
            return Ok(());
        }
        let mut first_error = None;
        let mut computed = Vec::new();
        for (key, field) in template {
            let payload = match field {
                Field::Value(value) => Payload::Plain(value),
                Field::Nested(nested) => Payload::Template(nested),
                Field::Computed(getter) => {
                    computed.push((key, getter));
                    continue;
                }
            };
            if let Err(err) = self.set_in(node, key_path(&key), payload) {
                first_error.get_or_insert(err);
            }
        }
        for (key, getter) in computed {
            if let Err(err) = self.describe_in(node, key_path(&key), getter) {
                first_error.get_or_insert(err);
            }
        }
        if let Some(state) = self.nodes.get_mut(&node) {
            state.initialized = true;
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Moves the per-node state of `other` onto the nodes mounted at `at`
    /// from its data. Listeners, rules, computed bindings, dependencies,
    /// snapshots and flags are kept; node ids are remapped.
    fn adopt(&mut self, at: NodeId, other: Objext) {
        let mapping: HashMap<NodeId, NodeId> = other
            .nodes
            .keys()
            .filter_map(|id| {
                let relative = other.abs_path(*id);
                self.resolve_node(at, &relative).map(|local| (*id, local))
            })
            .collect();

        for (id, state) in other.nodes {
            let Some(local) = mapping.get(&id).copied() else {
                continue;
            };
            let listeners: Vec<Listener> = state
                .listeners
                .into_iter()
                .filter_map(|mut listener| {
                    if let Handler::Recompute { node, .. } = &mut listener.handler {
                        *node = *mapping.get(node)?;
                    }
                    Some(listener)
                })
                .collect();
            let dependencies = state
                .dependencies
                .into_iter()
                .filter_map(|mut dependency| {
                    dependency.source = *mapping.get(&dependency.source)?;
                    Some(dependency)
                });

            if let Some(target) = self.nodes.get_mut(&local) {
                target.listeners.extend(listeners);
                target.rules.extend(state.rules);
                target.computed.extend(state.computed);
                target.dependencies.extend(dependencies);
                target.snapshots.extend(state.snapshots);
                target.locked |= state.locked;
                target.silent |= state.silent;
            }
        }
        self.pending.extend(other.pending);
        debug!(node = %at, nodes = mapping.len(), "graft");
    }
}
