//! Tagged snapshots of a node's data.

use tracing::{debug, trace};

use super::arena::Snapshot;
use super::mutate::Payload;
use super::{NodeId, Objext, TreeError};
use crate::config::RevertPolicy;
use crate::data::{PathBuf, Template, Value};
use crate::Result;

impl Objext {
    /// Stores a copy of the node's data under `tag`. An existing snapshot
    /// with the same tag is overwritten in place.
    pub(crate) fn commit_in(&mut self, node: NodeId, tag: &str) {
        if tag.is_empty() || self.is_locked_node(node) {
            trace!(node = %node, "commit ignored");
            return;
        }
        let Some(data) = self.node_value(node).cloned() else {
            return;
        };
        let Some(state) = self.nodes.get_mut(&node) else {
            return;
        };
        match state.snapshots.iter_mut().find(|snapshot| snapshot.tag == tag) {
            Some(snapshot) => snapshot.data = data,
            None => state.snapshots.push(Snapshot {
                tag: tag.to_string(),
                data,
            }),
        }
        debug!(node = %node, tag, "commit");
    }

    /// Restores the most recent snapshot matching `tag` (the most recent
    /// snapshot when `tag` is `None`) through `put`, then rebinds the
    /// computed properties that existed in the subtree.
    pub(crate) fn reset_in(&mut self, node: NodeId, tag: Option<&str>) -> Result<()> {
        if self.is_locked_node(node) {
            trace!(node = %node, "reset ignored, node is locked");
            return Ok(());
        }
        let Some(data) = self.find_snapshot(node, tag).map(|snapshot| snapshot.data.clone()) else {
            trace!(node = %node, tag, "reset ignored, no snapshot");
            return Ok(());
        };
        debug!(node = %node, tag, "reset");

        let bindings = self.collect_bindings(node);
        match data {
            Value::Map(map) => self.put_in(node, Template::from(map))?,
            other => {
                let Some((parent, key)) = self
                    .nodes
                    .get(&node)
                    .and_then(|state| state.parent.zip(state.key.clone()))
                else {
                    return Ok(());
                };
                self.set_in(parent, PathBuf::from(key), Payload::Plain(other))?;
            }
        }
        for (relative, key, getter) in bindings {
            if let Some(at) = self.resolve_node(node, &relative) {
                self.describe_in(at, key, getter)?;
            }
        }
        Ok(())
    }

    /// Drops the most recent snapshot matching `tag`. Without a tag the
    /// configured [`RevertPolicy`] decides what is dropped.
    pub(crate) fn revert_in(&mut self, node: NodeId, tag: Option<&str>) {
        if self.is_locked_node(node) {
            trace!(node = %node, "revert ignored, node is locked");
            return;
        }
        let policy = self.config.revert;
        let Some(state) = self.nodes.get_mut(&node) else {
            return;
        };
        match (tag, policy) {
            (Some(tag), _) => {
                if let Some(position) = state.snapshots.iter().rposition(|s| s.tag == tag) {
                    state.snapshots.remove(position);
                }
            }
            (None, RevertPolicy::Latest) => {
                state.snapshots.pop();
            }
            (None, RevertPolicy::All) => state.snapshots.clear(),
        }
        debug!(node = %node, tag, remaining = state.snapshots.len(), "revert");
    }

    pub(crate) fn snapshot_tags_in(&self, node: NodeId) -> Vec<String> {
        self.nodes
            .get(&node)
            .map(|state| state.snapshots.iter().map(|s| s.tag.clone()).collect())
            .unwrap_or_default()
    }

    /// The data captured under `tag`.
    pub(crate) fn snapshot_in(&self, node: NodeId, tag: &str) -> Result<&Value> {
        self.find_snapshot(node, Some(tag))
            .map(|snapshot| &snapshot.data)
            .ok_or_else(|| {
                TreeError::UnknownSnapshot {
                    tag: tag.to_string(),
                }
                .into()
            })
    }

    fn find_snapshot(&self, node: NodeId, tag: Option<&str>) -> Option<&Snapshot> {
        let snapshots = &self.nodes.get(&node)?.snapshots;
        match tag {
            Some(tag) => snapshots.iter().rev().find(|snapshot| snapshot.tag == tag),
            None => snapshots.last(),
        }
    }
}
