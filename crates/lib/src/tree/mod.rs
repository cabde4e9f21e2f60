//! The reactive node tree.
//!
//! An [`Objext`] owns one canonical root [`Value`] and an arena of nodes, one
//! per mapping or sequence reachable from the root. Each node carries its own
//! listeners, validation rules, computed properties and snapshots, and reads
//! and writes the slice of the root value at its path.
//!
//! The root node is driven through the methods on [`Objext`] itself; any
//! other node through a [`NodeMut`] obtained with [`Objext::at`] or
//! [`Objext::node`]. Paths passed to a node are relative to it.
//!
//! # Usage
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use objext::{Objext, Template, Value};
//! use serde_json::json;
//!
//! let template = Template::try_from(json!({
//!     "name": "tomy",
//!     "hobbits": { "swimming": true },
//! }))
//! .unwrap()
//! .with_computed("healthy", |scope| scope.get("hobbits.swimming").cloned().unwrap_or_default());
//! let mut objx = Objext::from_template(template).unwrap();
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let record = Rc::clone(&seen);
//! objx.watch("healthy", move |event| {
//!     record.borrow_mut().push(event.new_value.clone());
//! }, false);
//!
//! objx.set("hobbits.swimming", false).unwrap();
//! assert_eq!(*seen.borrow(), vec![Some(Value::Bool(false))]);
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::Result;
use crate::config::Config;
use crate::data::{PathBuf, Template, Value};

mod arena;
mod computed;
mod dispatch;
pub mod errors;
pub mod event;
mod list;
mod mutate;
mod snapshot;
pub mod validate;

pub use computed::Scope;
pub use errors::TreeError;
pub use event::{Callback, ChangeEvent, ListenKind};
pub use list::ListMut;
pub use validate::{PendingChecks, PendingValidation, Rule, ValidationError};

use arena::NodeState;
use mutate::Payload;

/// Identifier of a node in an [`Objext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A reactive data container.
///
/// See the [module documentation](self) for an overview.
pub struct Objext {
    pub(crate) data: Value,
    pub(crate) nodes: HashMap<NodeId, NodeState>,
    /// Last absolute path of freed nodes that computed properties depended on.
    pub(crate) retired: HashMap<NodeId, PathBuf>,
    next_id: u64,
    root: NodeId,
    pub(crate) config: Config,
    hash_cache: RefCell<Option<String>>,
    /// Deferred checks started by writes.
    pub(crate) pending: Vec<PendingValidation>,
}

impl Objext {
    /// Creates an empty objext.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let mut objx = Self {
            data: Value::map(),
            nodes: HashMap::new(),
            retired: HashMap::new(),
            next_id: 0,
            root: NodeId(0),
            config,
            hash_cache: RefCell::new(None),
            pending: Vec::new(),
        };
        objx.root = objx.alloc(NodeState {
            initialized: true,
            ..Default::default()
        });
        objx
    }

    /// Creates an objext populated from a template.
    ///
    /// Nothing is dispatched while the initial data is installed.
    pub fn from_template(template: Template) -> Result<Self> {
        Self::from_template_with_config(template, Config::default())
    }

    pub fn from_template_with_config(template: Template, config: Config) -> Result<Self> {
        let mut objx = Self::with_config(config);
        if let Some(root) = objx.nodes.get_mut(&objx.root) {
            root.initialized = false;
        }
        objx.update_in(objx.root, template)?;
        Ok(objx)
    }

    /// Creates an objext from a JSON object.
    pub fn from_json(data: serde_json::Value) -> Result<Self> {
        Self::from_template(Template::try_from(data)?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Handle to the root node.
    pub fn root_mut(&mut self) -> NodeMut<'_> {
        let id = self.root;
        NodeMut { objext: self, id }
    }

    /// Handle to the node mounted at `path`, if the value there is a mapping
    /// or a sequence.
    pub fn at(&mut self, path: impl Into<PathBuf>) -> Option<NodeMut<'_>> {
        let id = self.resolve_node(self.root, &path.into())?;
        Some(NodeMut { objext: self, id })
    }

    /// Handle to a node by id. Ids of removed nodes resolve to `None`.
    pub fn node(&mut self, id: NodeId) -> Option<NodeMut<'_>> {
        if !self.nodes.contains_key(&id) {
            return None;
        }
        Some(NodeMut { objext: self, id })
    }

    /// Absolute path of a node.
    pub fn node_path(&self, id: NodeId) -> Option<PathBuf> {
        self.nodes.contains_key(&id).then(|| self.abs_path(id))
    }

    /// Reads the value at `path`. The empty path reads the whole data.
    pub fn get(&self, path: impl Into<PathBuf>) -> Option<&Value> {
        self.data.get_path(&path.into())
    }

    /// Typed read.
    pub fn get_as<'a, T>(&'a self, path: impl Into<PathBuf>) -> Option<T>
    where
        T: TryFrom<&'a Value>,
    {
        self.get(path).and_then(|value| T::try_from(value).ok())
    }

    /// Returns true if something is stored at `path`.
    pub fn has(&self, path: impl Into<PathBuf>) -> bool {
        self.data.contains_path(&path.into())
    }

    /// The whole canonical data.
    pub fn value(&self) -> &Value {
        &self.data
    }

    /// Structural copy of the data.
    pub fn to_value(&self) -> Value {
        self.data.clone()
    }

    /// Compact JSON rendering of the data.
    pub fn to_json_string(&self) -> String {
        self.data.to_json_string()
    }

    /// SHA-256 (hex) of the key-sorted JSON rendering of the data.
    ///
    /// Cached between writes unless hashing is disabled in the [`Config`].
    pub fn hash(&self) -> String {
        if !self.config.hash {
            return content_hash(&self.data);
        }
        let cached = self.hash_cache.borrow().clone();
        if let Some(hash) = cached {
            return hash;
        }
        let hash = content_hash(&self.data);
        *self.hash_cache.borrow_mut() = Some(hash.clone());
        hash
    }

    /// Returns true if both objexts hold the same data.
    pub fn same_content(&self, other: &Objext) -> bool {
        self.hash() == other.hash()
    }

    /// A new, independent objext holding a copy of the data.
    ///
    /// Listeners, rules, computed bindings and snapshots are not carried over;
    /// computed values are copied as plain values.
    pub fn fork(&self) -> Result<Objext> {
        Objext::from_template_with_config(Template::try_from(self.data.clone())?, self.config.clone())
    }

    pub(crate) fn invalidate_hash(&self) {
        self.hash_cache.borrow_mut().take();
    }

    /// Deferred checks started by writes since the last call.
    pub fn take_pending(&mut self) -> PendingChecks {
        self.take_pending_checks()
    }

    // Root node operations. See the equally named methods on `NodeMut`.

    pub fn set(&mut self, path: impl Into<PathBuf>, value: impl Into<Value>) -> Result<()> {
        self.root_mut().set(path, value)
    }

    pub fn set_template(&mut self, path: impl Into<PathBuf>, template: Template) -> Result<()> {
        self.root_mut().set_template(path, template)
    }

    pub fn graft(&mut self, path: impl Into<PathBuf>, other: Objext) -> Result<()> {
        self.root_mut().graft(path, other)
    }

    pub fn remove(&mut self, path: impl Into<PathBuf>) -> Option<Value> {
        self.root_mut().remove(path)
    }

    pub fn put(&mut self, template: Template) -> Result<()> {
        self.root_mut().put(template)
    }

    pub fn update(&mut self, template: Template) -> Result<()> {
        self.root_mut().update(template)
    }

    pub fn list(&mut self, path: impl Into<PathBuf>) -> Result<ListMut<'_>> {
        let id = self.root;
        self.list_in(id, path.into())
    }

    pub fn watch(
        &mut self,
        path: impl Into<PathBuf>,
        callback: impl Fn(&ChangeEvent) + 'static,
        deep: bool,
    ) -> Callback {
        self.root_mut().watch(path, callback, deep)
    }

    pub fn watch_with(&mut self, path: impl Into<PathBuf>, callback: Callback, deep: bool) {
        self.root_mut().watch_with(path, callback, deep)
    }

    pub fn unwatch(&mut self, path: impl Into<PathBuf>, callback: &Callback) {
        self.root_mut().unwatch(path, callback)
    }

    pub fn describe(
        &mut self,
        key: impl Into<PathBuf>,
        getter: impl Fn(&Scope<'_>) -> Value + 'static,
    ) -> Result<()> {
        self.root_mut().describe(key, getter)
    }

    pub fn depend(&mut self, source: NodeId, path: impl Into<PathBuf>, key: impl Into<PathBuf>) {
        self.root_mut().depend(source, path, key)
    }

    pub fn lock(&mut self) {
        self.root_mut().lock()
    }

    pub fn unlock(&mut self) {
        self.root_mut().unlock()
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked_node(self.root)
    }

    pub fn silent(&mut self, silent: bool) {
        self.root_mut().silent(silent)
    }

    pub fn is_silent(&self) -> bool {
        self.is_silent_node(self.root)
    }

    pub fn batch_start(&mut self) {
        self.root_mut().batch_start()
    }

    pub fn batch_end(&mut self) {
        self.root_mut().batch_end()
    }

    pub fn commit(&mut self, tag: &str) {
        self.root_mut().commit(tag)
    }

    pub fn reset(&mut self, tag: Option<&str>) -> Result<()> {
        self.root_mut().reset(tag)
    }

    pub fn revert(&mut self, tag: Option<&str>) {
        self.root_mut().revert(tag)
    }

    pub fn snapshot_tags(&self) -> Vec<String> {
        self.snapshot_tags_in(self.root)
    }

    pub fn snapshot(&self, tag: &str) -> Result<&Value> {
        self.snapshot_in(self.root, tag)
    }

    pub fn formulate(&mut self, rules: impl IntoIterator<Item = Rule>) {
        self.root_mut().formulate(rules)
    }

    pub fn validate(&mut self, path: Option<&str>, value: Option<Value>) -> Result<PendingChecks> {
        self.root_mut().validate(path, value)
    }

    fn list_in(&mut self, node: NodeId, path: PathBuf) -> Result<ListMut<'_>> {
        let Some(id) = self.resolve_node(node, &path) else {
            return Err(TreeError::NodeNotFound {
                path: path.to_string(),
            }
            .into());
        };
        if !matches!(self.node_value(id), Some(Value::List(_))) {
            return Err(TreeError::NotASequence {
                path: path.to_string(),
            }
            .into());
        }
        Ok(ListMut {
            objext: self,
            node: id,
        })
    }
}

impl Default for Objext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Objext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data.to_json_string())
    }
}

impl fmt::Debug for Objext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Objext")
            .field("data", &self.data)
            .field("nodes", &self.nodes.len())
            .field("config", &self.config)
            .finish()
    }
}

fn content_hash(data: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.to_canonical_json().as_bytes());
    let hash = hasher.finalize();
    format!("{hash:x}")
}

/// Mutable handle to one node of an [`Objext`].
///
/// Paths are relative to the node.
pub struct NodeMut<'a> {
    objext: &'a mut Objext,
    id: NodeId,
}

impl NodeMut<'_> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Absolute path of this node.
    pub fn path(&self) -> PathBuf {
        self.objext.abs_path(self.id)
    }

    /// This node's data.
    pub fn value(&self) -> Option<&Value> {
        self.objext.node_value(self.id)
    }

    pub fn get(&self, path: impl Into<PathBuf>) -> Option<&Value> {
        self.objext.read(self.id, &path.into())
    }

    pub fn get_as<'b, T>(&'b self, path: impl Into<PathBuf>) -> Option<T>
    where
        T: TryFrom<&'b Value>,
    {
        self.get(path).and_then(|value| T::try_from(value).ok())
    }

    /// Existence check on canonical storage. Never tracked as a dependency.
    pub fn has(&self, path: impl Into<PathBuf>) -> bool {
        self.get(path).is_some()
    }

    /// Writes `value` at `path`, creating intermediate containers.
    ///
    /// A no-op on locked nodes. The write is validated first: in strict mode
    /// a failed rule aborts it; otherwise it proceeds and the failure is
    /// returned afterwards unless the rule routed it to a warn handler.
    pub fn set(&mut self, path: impl Into<PathBuf>, value: impl Into<Value>) -> Result<()> {
        self.objext
            .set_in(self.id, path.into(), Payload::Plain(value.into()))
    }

    /// Like [`NodeMut::set`], binding the template's computed fields.
    pub fn set_template(&mut self, path: impl Into<PathBuf>, template: Template) -> Result<()> {
        self.objext
            .set_in(self.id, path.into(), Payload::Template(template))
    }

    /// Moves a whole objext to `path`. Its listeners, rules, computed
    /// properties and snapshots move along with its data.
    pub fn graft(&mut self, path: impl Into<PathBuf>, other: Objext) -> Result<()> {
        self.objext
            .set_in(self.id, path.into(), Payload::Node(Box::new(other)))
    }

    /// Removes `path` and returns the removed value. A no-op (returning
    /// `None`) on locked nodes and unresolvable paths.
    pub fn remove(&mut self, path: impl Into<PathBuf>) -> Option<Value> {
        self.objext.remove_in(self.id, &path.into())
    }

    /// Replaces this node's data with the template.
    pub fn put(&mut self, template: Template) -> Result<()> {
        self.objext.put_in(self.id, template)
    }

    /// Merges the template into this node's data.
    pub fn update(&mut self, template: Template) -> Result<()> {
        self.objext.update_in(self.id, template)
    }

    pub fn list(&mut self, path: impl Into<PathBuf>) -> Result<ListMut<'_>> {
        self.objext.list_in(self.id, path.into())
    }

    /// Handle to a child node.
    pub fn at(&mut self, path: impl Into<PathBuf>) -> Option<NodeMut<'_>> {
        let id = self.objext.resolve_node(self.id, &path.into())?;
        Some(NodeMut {
            objext: &mut *self.objext,
            id,
        })
    }

    /// Registers a listener and returns its callback handle for
    /// [`NodeMut::unwatch`]. `*` listens to every change on this node.
    pub fn watch(
        &mut self,
        path: impl Into<PathBuf>,
        callback: impl Fn(&ChangeEvent) + 'static,
        deep: bool,
    ) -> Callback {
        let callback = Callback::new(callback);
        self.watch_with(path, callback.clone(), deep);
        callback
    }

    pub fn watch_with(&mut self, path: impl Into<PathBuf>, callback: Callback, deep: bool) {
        self.objext.watch_in(self.id, path.into(), callback, deep)
    }

    pub fn unwatch(&mut self, path: impl Into<PathBuf>, callback: &Callback) {
        self.objext.unwatch_in(self.id, &path.into(), callback)
    }

    /// Binds a computed property at `key` and evaluates it.
    pub fn describe(
        &mut self,
        key: impl Into<PathBuf>,
        getter: impl Fn(&Scope<'_>) -> Value + 'static,
    ) -> Result<()> {
        self.objext
            .describe_in(self.id, key.into(), crate::data::Getter::new(getter))
    }

    /// Recomputes the computed property `key` whenever `path` of the node
    /// `source` changes.
    pub fn depend(&mut self, source: NodeId, path: impl Into<PathBuf>, key: impl Into<PathBuf>) {
        self.objext
            .depend_in(self.id, source, path.into(), key.into())
    }

    /// Makes this node and its descendants read-only.
    pub fn lock(&mut self) {
        self.set_flag("lock", |state| state.locked = true)
    }

    pub fn unlock(&mut self) {
        self.set_flag("unlock", |state| state.locked = false)
    }

    pub fn is_locked(&self) -> bool {
        self.objext.is_locked_node(self.id)
    }

    /// Suppresses listener callbacks for changes on this node and its
    /// descendants. Computed properties keep updating.
    pub fn silent(&mut self, silent: bool) {
        self.set_flag("silent", |state| state.silent = silent)
    }

    pub fn is_silent(&self) -> bool {
        self.objext.is_silent_node(self.id)
    }

    /// Buffers dispatches reaching this node until [`NodeMut::batch_end`].
    pub fn batch_start(&mut self) {
        self.objext.batch_start_in(self.id)
    }

    pub fn batch_end(&mut self) {
        self.objext.batch_end_in(self.id)
    }

    pub fn commit(&mut self, tag: &str) {
        self.objext.commit_in(self.id, tag)
    }

    pub fn reset(&mut self, tag: Option<&str>) -> Result<()> {
        self.objext.reset_in(self.id, tag)
    }

    pub fn revert(&mut self, tag: Option<&str>) {
        self.objext.revert_in(self.id, tag)
    }

    pub fn snapshot_tags(&self) -> Vec<String> {
        self.objext.snapshot_tags_in(self.id)
    }

    pub fn snapshot(&self, tag: &str) -> Result<&Value> {
        self.objext.snapshot_in(self.id, tag)
    }

    pub fn formulate(&mut self, rules: impl IntoIterator<Item = Rule>) {
        self.objext.formulate_in(self.id, rules)
    }

    /// Runs the rules for `path` (all rules when `None`) against `value` or
    /// the current data, then cascades into child nodes when no value was
    /// given.
    pub fn validate(&mut self, path: Option<&str>, value: Option<Value>) -> Result<PendingChecks> {
        let path = path.map(PathBuf::from);
        self.objext
            .validate_in(self.id, path.as_ref(), value.as_ref())
    }

    fn set_flag(&mut self, name: &str, apply: impl FnOnce(&mut NodeState)) {
        if let Some(state) = self.objext.nodes.get_mut(&self.id) {
            apply(state);
            debug!(node = %self.id, flag = name, "node flag");
        }
    }
}
