//! Computed properties and dependency tracking.
//!
//! A computed property is a getter bound to a key of a node. While the getter
//! runs it reads through a [`Scope`]; each read is recorded as a dependency
//! edge and wired as a hidden deep watch on the node that was read. When a
//! change overlaps a dependency path the property is recomputed and its own
//! key is dispatched, so dependents of dependents update transitively before
//! the triggering write returns.
//!
//! Dependency graphs must be acyclic: a cycle recomputes without end.

use std::cell::RefCell;

use tracing::{debug, trace, warn};

use super::arena::{Dependency, Handler, Listener};
use super::dispatch::Reach;
use super::{NodeId, Objext};
use crate::Result;
use crate::data::{Getter, PathBuf, Value};

/// Read access handed to computed getters.
///
/// Paths are relative to the node the property is defined on, unless read
/// with [`Scope::get_from`].
pub struct Scope<'a> {
    objext: &'a Objext,
    node: NodeId,
    reads: RefCell<Vec<(NodeId, PathBuf)>>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(objext: &'a Objext, node: NodeId) -> Self {
        Self {
            objext,
            node,
            reads: RefCell::new(Vec::new()),
        }
    }

    /// The node the computed property is defined on.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Reads a path and records it as a dependency.
    pub fn get(&self, path: impl Into<PathBuf>) -> Option<&'a Value> {
        self.get_from(self.node, path)
    }

    /// Typed variant of [`Scope::get`].
    pub fn get_as<T>(&self, path: impl Into<PathBuf>) -> Option<T>
    where
        T: TryFrom<&'a Value>,
    {
        self.get(path).and_then(|value| T::try_from(value).ok())
    }

    /// Reads a path relative to another node and records it as a dependency.
    pub fn get_from(&self, node: NodeId, path: impl Into<PathBuf>) -> Option<&'a Value> {
        let (node, path) = self.objext.locate(node, &path.into())?;
        let value = self.objext.read(node, &path);
        let mut reads = self.reads.borrow_mut();
        if !reads.iter().any(|(n, p)| *n == node && *p == path) {
            reads.push((node, path));
        }
        value
    }

    /// Reads a path without recording a dependency.
    pub fn peek(&self, path: impl Into<PathBuf>) -> Option<&'a Value> {
        self.objext.read(self.node, &path.into())
    }

    fn into_reads(self) -> Vec<(NodeId, PathBuf)> {
        self.reads.into_inner()
    }
}

impl Objext {
    /// Binds a computed property at `key` and evaluates it once.
    pub(crate) fn describe_in(&mut self, node: NodeId, key: PathBuf, getter: Getter) -> Result<()> {
        if !self.nodes.contains_key(&node) {
            return Ok(());
        }
        if self.is_locked_node(node) {
            trace!(node = %node, key = %key, "describe ignored, node is locked");
            return Ok(());
        }
        self.detach_computed(node, &key);
        if let Some(state) = self.nodes.get_mut(&node) {
            state.computed.insert(key.clone(), getter.clone());
        }
        debug!(node = %node, key = %key, "describe");
        self.compute(node, &key, &getter)
    }

    /// Runs a getter, records its dependency edges and stores the result.
    fn compute(&mut self, node: NodeId, key: &PathBuf, getter: &Getter) -> Result<()> {
        let (value, reads) = {
            let scope = Scope::new(self, node);
            let value = getter.call(&scope);
            (value, scope.into_reads())
        };
        for (source, path) in reads {
            if source == node && path == *key {
                continue;
            }
            self.add_dependency(node, key.clone(), source, path);
        }
        if let Some(child) = self.resolve_node(node, key) {
            self.free_subtree(child);
        }
        self.store(node, key, value)?;
        Ok(())
    }

    /// Re-runs the computed property `key` of `node` and dispatches it.
    pub(crate) fn recompute(&mut self, node: NodeId, key: &PathBuf) {
        let Some(state) = self.nodes.get(&node) else {
            return;
        };
        if !state.initialized || self.is_locked_node(node) {
            return;
        }
        let Some(getter) = state.computed.get(key).cloned() else {
            return;
        };
        let old = self.read(node, key).cloned();
        trace!(node = %node, key = %key, "recompute");
        if let Err(err) = self.compute(node, key, &getter) {
            warn!(node = %node, key = %key, error = %err, "recompute failed");
            return;
        }
        self.dispatch(node, key.clone(), old, Reach::Full);
    }

    /// Makes the computed property `key` of `owner` depend on `path` of
    /// `source`.
    pub(crate) fn depend_in(&mut self, owner: NodeId, source: NodeId, path: PathBuf, key: PathBuf) {
        let Some((source, path)) = self.locate(source, &path) else {
            return;
        };
        self.add_dependency(owner, key, source, path);
    }

    pub(crate) fn add_dependency(&mut self, owner: NodeId, key: PathBuf, source: NodeId, path: PathBuf) {
        let dependency = Dependency { key, path, source };
        let Some(state) = self.nodes.get_mut(&owner) else {
            return;
        };
        if state.dependencies.contains(&dependency) {
            return;
        }
        state.dependencies.push(dependency.clone());
        if let Some(source) = self.nodes.get_mut(&dependency.source) {
            source.listeners.push(Listener {
                path: dependency.path,
                deep: true,
                handler: Handler::Recompute {
                    node: owner,
                    key: dependency.key,
                },
            });
        }
    }

    /// Drops the computed bindings of `node` at or below `path`, together
    /// with their dependency edges and hidden watches.
    pub(crate) fn detach_computed(&mut self, node: NodeId, path: &PathBuf) {
        let Some(state) = self.nodes.get_mut(&node) else {
            return;
        };
        state.computed.retain(|key, _| !key.starts_with(path));
        let (detached, kept): (Vec<Dependency>, Vec<Dependency>) = std::mem::take(&mut state.dependencies)
            .into_iter()
            .partition(|dependency| dependency.key.starts_with(path));
        state.dependencies = kept;

        for dependency in detached {
            if let Some(source) = self.nodes.get_mut(&dependency.source) {
                source.listeners.retain(|listener| {
                    listener.path != dependency.path
                        || !matches!(
                            &listener.handler,
                            Handler::Recompute { node: owner, key }
                                if *owner == node && *key == dependency.key
                        )
                });
            }
        }
    }

    /// Every computed binding in the subtree of `node`, as
    /// (node path relative to `node`, key, getter).
    pub(crate) fn collect_bindings(&self, node: NodeId) -> Vec<(PathBuf, PathBuf, Getter)> {
        let base = self.abs_path(node);
        let mut bindings = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(state) = self.nodes.get(&id) else {
                continue;
            };
            let relative = self.abs_path(id).strip_prefix(&base).unwrap_or_default();
            for (key, getter) in &state.computed {
                bindings.push((relative.clone(), key.clone(), getter.clone()));
            }
            stack.extend(state.children.values().rev().copied());
        }
        bindings
    }
}
