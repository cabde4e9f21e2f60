//! Mutable handle to a sequence node.
//!
//! Every operation applies to canonical storage, re-keys the element nodes
//! that survive it (mounting nodes for new container elements) and then
//! dispatches a single change for the whole sequence from its parent.

use std::cmp::Ordering;

use tracing::{debug, trace};

use super::dispatch::Reach;
use super::{NodeId, Objext};
use crate::data::{PathBuf, Segment, Value};

type Entry = (Value, Option<NodeId>);

/// A sequence inside an [`Objext`], obtained with `list(path)`.
#[derive(Debug)]
pub struct ListMut<'a> {
    pub(crate) objext: &'a mut Objext,
    pub(crate) node: NodeId,
}

impl ListMut<'_> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    fn items(&self) -> &[Value] {
        self.objext
            .node_value(self.node)
            .and_then(Value::as_list)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items().get(index)
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.items().to_vec()
    }

    /// Appends an element. Returns the new length.
    pub fn push(&mut self, value: impl Into<Value>) -> usize {
        let value = value.into();
        self.apply("push", |entries| {
            entries.push((value, None));
            entries.len()
        })
        .unwrap_or_else(|| self.len())
    }

    /// Removes the last element.
    pub fn pop(&mut self) -> Option<Value> {
        self.apply("pop", |entries| entries.pop().map(|(value, _)| value))
            .flatten()
    }

    /// Removes the first element.
    pub fn shift(&mut self) -> Option<Value> {
        self.apply("shift", |entries| {
            (!entries.is_empty()).then(|| entries.remove(0).0)
        })
        .flatten()
    }

    /// Inserts an element at the front. Returns the new length.
    pub fn unshift(&mut self, value: impl Into<Value>) -> usize {
        let value = value.into();
        self.apply("unshift", |entries| {
            entries.insert(0, (value, None));
            entries.len()
        })
        .unwrap_or_else(|| self.len())
    }

    /// Removes `delete_count` elements starting at `start` and inserts
    /// `items` in their place. Out of range bounds are clamped. Returns the
    /// removed elements.
    pub fn splice(
        &mut self,
        start: usize,
        delete_count: usize,
        items: impl IntoIterator<Item = Value>,
    ) -> Vec<Value> {
        let inserted: Vec<Entry> = items.into_iter().map(|value| (value, None)).collect();
        self.apply("splice", |entries| {
            let start = start.min(entries.len());
            let end = start.saturating_add(delete_count).min(entries.len());
            entries
                .splice(start..end, inserted)
                .map(|(value, _)| value)
                .collect()
        })
        .unwrap_or_default()
    }

    /// Sorts the elements: null, booleans, numbers, text, lists, maps, each
    /// group in natural order.
    pub fn sort(&mut self) {
        self.sort_by(natural_order);
    }

    pub fn sort_by(&mut self, mut compare: impl FnMut(&Value, &Value) -> Ordering) {
        self.apply("sort", |entries| entries.sort_by(|a, b| compare(&a.0, &b.0)));
    }

    pub fn reverse(&mut self) {
        self.apply("reverse", |entries| entries.reverse());
    }

    /// Runs `op` over (element, element node) pairs and writes the result
    /// back. Returns `None` without doing anything if the list is locked.
    fn apply<R>(&mut self, name: &str, op: impl FnOnce(&mut Vec<Entry>) -> R) -> Option<R> {
        let objx = &mut *self.objext;
        let node = self.node;
        if objx.is_locked_node(node) {
            trace!(node = %node, op = name, "list operation ignored, node is locked");
            return None;
        }
        let path = objx.abs_path(node);
        let Some(Value::List(items)) = objx.data.get_path_mut(&path) else {
            return None;
        };
        let items = std::mem::take(items);
        let old = Value::List(items.clone());

        let mut entries: Vec<Entry> = items
            .into_iter()
            .enumerate()
            .map(|(index, value)| (value, objx.child_node(node, &Segment::Index(index))))
            .collect();
        let before: Vec<NodeId> = entries.iter().filter_map(|(_, id)| *id).collect();
        let result = op(&mut entries);
        let (values, kept): (Vec<Value>, Vec<Option<NodeId>>) = entries.into_iter().unzip();

        if let Some(Value::List(slot)) = objx.data.get_path_mut(&path) {
            *slot = values;
        }
        objx.invalidate_hash();
        for id in before {
            if !kept.contains(&Some(id)) {
                objx.free_subtree(id);
            }
        }
        objx.rehome(node, kept);

        debug!(path = %path, op = name, "list");
        let parent = objx
            .nodes
            .get(&node)
            .and_then(|state| state.parent.zip(state.key.clone()));
        if let Some((parent, key)) = parent {
            objx.dispatch(parent, PathBuf::from(key), Some(old), Reach::Full);
        }
        Some(result)
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Float(_) => 2,
        Value::Text(_) => 3,
        Value::List(_) => 4,
        Value::Map(_) => 5,
    }
}

fn natural_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        _ if rank(a) != rank(b) => rank(a).cmp(&rank(b)),
        _ => match (a.as_float(), b.as_float()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => a.to_canonical_json().cmp(&b.to_canonical_json()),
        },
    }
}
