//! Node arena.
//!
//! Nodes never own data. Every node's storage is the slice of the one
//! canonical root value found at the node's absolute path, so a child always
//! reads and writes through its parent's copy. Nodes refer to each other by
//! [`NodeId`]; ids are never reused.

use std::collections::HashMap;

use tracing::trace;

use indexmap::IndexMap;

use super::event::Callback;
use super::validate::Rule;
use super::{NodeId, Objext};
use crate::Result;
use crate::data::{Getter, PathBuf, Segment, Value};

/// A registered listener.
#[derive(Debug, Clone)]
pub(crate) struct Listener {
    pub(crate) path: PathBuf,
    pub(crate) deep: bool,
    pub(crate) handler: Handler,
}

#[derive(Debug, Clone)]
pub(crate) enum Handler {
    Callback(Callback),
    /// Hidden watch that re-runs the computed property `key` of `node`.
    Recompute { node: NodeId, key: PathBuf },
}

/// Edge from a computed property to a path it read.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Dependency {
    pub(crate) key: PathBuf,
    pub(crate) path: PathBuf,
    pub(crate) source: NodeId,
}

#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub(crate) tag: String,
    pub(crate) data: Value,
}

/// A change held back while batching.
#[derive(Debug, Clone)]
pub(crate) struct BufferedChange {
    pub(crate) path: PathBuf,
    pub(crate) old: Option<Value>,
}

#[derive(Debug, Default)]
pub(crate) struct NodeState {
    /// Position in the parent. `None` at the root.
    pub(crate) key: Option<Segment>,
    pub(crate) parent: Option<NodeId>,
    /// Child nodes for the mapping/sequence entries that are containers.
    pub(crate) children: IndexMap<Segment, NodeId>,
    pub(crate) listeners: Vec<Listener>,
    pub(crate) rules: Vec<Rule>,
    /// Computed property getters, keyed by path relative to this node.
    pub(crate) computed: IndexMap<PathBuf, Getter>,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) snapshots: Vec<Snapshot>,
    pub(crate) locked: bool,
    pub(crate) silent: bool,
    pub(crate) batching: bool,
    pub(crate) batch_buffer: Vec<BufferedChange>,
    pub(crate) initialized: bool,
}

impl Objext {
    pub(crate) fn alloc(&mut self, state: NodeState) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, state);
        id
    }

    /// Absolute path of a node from the root.
    pub(crate) fn abs_path(&self, node: NodeId) -> PathBuf {
        let mut segments: Vec<Segment> = self
            .lineage(node)
            .filter_map(|id| self.nodes.get(&id).and_then(|state| state.key.clone()))
            .collect();
        segments.reverse();
        PathBuf::from(segments)
    }

    /// The node itself followed by its ancestors, root last.
    pub(crate) fn lineage(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(
            self.nodes.contains_key(&node).then_some(node),
            move |id| self.nodes.get(id).and_then(|state| state.parent),
        )
    }

    /// The canonical storage of a node.
    pub(crate) fn node_value(&self, node: NodeId) -> Option<&Value> {
        if !self.nodes.contains_key(&node) {
            return None;
        }
        self.data.get_path(&self.abs_path(node))
    }

    /// Reads `path` relative to a node, without dependency tracking.
    pub(crate) fn read(&self, node: NodeId, path: &PathBuf) -> Option<&Value> {
        self.node_value(node)?.get_path(path)
    }

    pub(crate) fn is_locked_node(&self, node: NodeId) -> bool {
        self.lineage(node)
            .any(|id| self.nodes.get(&id).is_some_and(|state| state.locked))
    }

    pub(crate) fn is_silent_node(&self, node: NodeId) -> bool {
        self.lineage(node)
            .any(|id| self.nodes.get(&id).is_some_and(|state| state.silent))
    }

    pub(crate) fn child_node(&self, node: NodeId, segment: &Segment) -> Option<NodeId> {
        self.nodes.get(&node)?.children.get(segment).copied()
    }

    /// Follows `path` through mounted child nodes.
    pub(crate) fn resolve_node(&self, node: NodeId, path: &PathBuf) -> Option<NodeId> {
        path.segments()
            .iter()
            .try_fold(node, |current, segment| self.child_node(current, segment))
    }

    /// Walks all but the last segment of `path` through existing child nodes.
    ///
    /// Returns the deepest node reached and the remaining path relative to it.
    pub(crate) fn descend(&self, node: NodeId, path: &PathBuf) -> (NodeId, PathBuf) {
        let segments = path.segments();
        let mut current = node;
        let mut consumed = 0;
        for segment in &segments[..segments.len().saturating_sub(1)] {
            match self.child_node(current, segment) {
                Some(child) => {
                    current = child;
                    consumed += 1;
                }
                None => break,
            }
        }
        (current, PathBuf::from(segments[consumed..].to_vec()))
    }

    /// Creates nodes for the container stored at `segment` under `parent`,
    /// recursively. Returns `None` if a scalar (or nothing) is stored there.
    pub(crate) fn mount(&mut self, parent: NodeId, segment: Segment) -> Option<NodeId> {
        let value = self.read(parent, &PathBuf::from(segment.clone()))?;
        let nested: Vec<Segment> = match value {
            Value::Map(map) => map
                .iter()
                .filter(|(_, item)| item.is_container())
                .map(|(key, _)| Segment::from(key.as_str()))
                .collect(),
            Value::List(list) => list
                .iter()
                .enumerate()
                .filter(|(_, item)| item.is_container())
                .map(|(index, _)| Segment::Index(index))
                .collect(),
            _ => return None,
        };

        let id = self.alloc(NodeState {
            key: Some(segment.clone()),
            parent: Some(parent),
            initialized: true,
            ..Default::default()
        });
        if let Some(state) = self.nodes.get_mut(&parent) {
            state.children.insert(segment, id);
        }
        for child in nested {
            self.mount(id, child);
        }
        Some(id)
    }

    /// Resolves `path` relative to `node` to a live node and a path below it.
    ///
    /// A freed node that a computed property still refers to resolves through
    /// its last absolute path from the root.
    pub(crate) fn locate(&self, node: NodeId, path: &PathBuf) -> Option<(NodeId, PathBuf)> {
        if self.nodes.contains_key(&node) {
            return Some((node, path.clone()));
        }
        let absolute = self.retired.get(&node)?;
        Some((self.root(), absolute.join(path)))
    }

    /// Destroys a node and everything below it.
    ///
    /// Computed bindings owned by the removed nodes are detached. Dependencies
    /// that surviving nodes recorded against a removed node move to the root,
    /// at the removed node's absolute path, so they keep firing for whatever
    /// is mounted there next.
    pub(crate) fn free_subtree(&mut self, node: NodeId) {
        if node == self.root() {
            return;
        }
        let mut removed: HashMap<NodeId, PathBuf> = HashMap::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(state) = self.nodes.get(&id) {
                stack.extend(state.children.values().copied());
                removed.insert(id, self.abs_path(id));
            }
        }
        if removed.is_empty() {
            return;
        }
        let parent = self.nodes.get(&node).and_then(|state| state.parent);
        for id in removed.keys() {
            self.nodes.remove(id);
        }
        if let Some(parent) = parent.and_then(|parent| self.nodes.get_mut(&parent)) {
            parent.children.retain(|_, child| *child != node);
        }

        let mut orphaned = Vec::new();
        for (&owner, state) in self.nodes.iter_mut() {
            state.listeners.retain(|listener| match &listener.handler {
                Handler::Recompute { node, .. } => !removed.contains_key(node),
                Handler::Callback(_) => true,
            });
            state.dependencies.retain(|dependency| {
                if removed.contains_key(&dependency.source) {
                    orphaned.push((owner, dependency.clone()));
                    false
                } else {
                    true
                }
            });
        }

        let root = self.root();
        for (owner, dependency) in orphaned {
            let Some(absolute) = removed.get(&dependency.source) else {
                continue;
            };
            trace!(owner = %owner, key = %dependency.key, "re-anchor dependency");
            self.retired.insert(dependency.source, absolute.clone());
            self.add_dependency(owner, dependency.key, root, absolute.join(&dependency.path));
        }
    }

    /// Writes `value` at `path` relative to a node. Storage only: no nodes
    /// are mounted and nothing is dispatched.
    pub(crate) fn store(
        &mut self,
        node: NodeId,
        path: &PathBuf,
        value: Value,
    ) -> Result<Option<Value>> {
        let target = self.abs_path(node).join(path);
        let old = self.data.assign(&target, value)?;
        self.invalidate_hash();
        Ok(old)
    }

    /// Removes `path` relative to a node from storage only.
    pub(crate) fn unstore(&mut self, node: NodeId, path: &PathBuf) -> Option<Value> {
        let target = self.abs_path(node).join(path);
        let old = self.data.remove_path(&target);
        if old.is_some() {
            self.invalidate_hash();
        }
        old
    }

    /// Rebuilds the child index of a sequence node after its storage was
    /// reordered. `kept` holds the surviving child node for every element.
    pub(crate) fn rehome(&mut self, node: NodeId, kept: Vec<Option<NodeId>>) {
        if let Some(state) = self.nodes.get_mut(&node) {
            state.children.clear();
        }
        for (index, child) in kept.into_iter().enumerate() {
            let segment = Segment::Index(index);
            match child {
                Some(child) => {
                    if let Some(state) = self.nodes.get_mut(&child) {
                        state.key = Some(segment.clone());
                    }
                    if let Some(state) = self.nodes.get_mut(&node) {
                        state.children.insert(segment, child);
                    }
                }
                None => {
                    self.mount(node, segment);
                }
            }
        }
    }
}
