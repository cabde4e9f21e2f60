//! Validation rules.
//!
//! Rules are registered per node with `formulate` and addressed by a path
//! relative to that node. They run in two situations:
//!
//! - before every write, against the candidate value. A write below a node
//!   is also checked against the rules of every ancestor, with the path
//!   re-based onto the ancestor;
//! - on demand through `validate`, which also cascades into child nodes.
//!
//! A synchronous rule that fails produces a [`ValidationError`] and stops
//! further evaluation. If the rule has a `warn` handler the error is handed to
//! it and counts as handled; otherwise it is returned to the caller. Deferred
//! rules never block: they produce [`PendingValidation`]s that the caller
//! awaits separately.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, warn};

use super::{NodeId, Objext};
use crate::Result;
use crate::data::{PathBuf, Value};

type SyncCheck = Rc<dyn Fn(Option<&Value>) -> bool>;
type DeferredCheck = Rc<dyn Fn(Option<Value>) -> Pin<Box<dyn Future<Output = bool>>>>;
type WarnHandler = Rc<dyn Fn(&ValidationError)>;
type Predicate = Rc<dyn Fn(Option<&Value>) -> bool>;

/// A failed validation rule.
#[derive(Debug, Clone, Error)]
#[error("Validation failed at '{path}': {message}")]
pub struct ValidationError {
    /// Rule path, relative to `node`.
    pub path: PathBuf,
    /// The value that was checked.
    pub value: Option<Value>,
    pub message: String,
    /// The node the rule is registered on.
    pub node: NodeId,
}

// Conversion from ValidationError to the main Error type
impl From<ValidationError> for crate::Error {
    fn from(err: ValidationError) -> Self {
        crate::Error::Validation(err)
    }
}

#[derive(Clone)]
enum Check {
    Sync(SyncCheck),
    Deferred(DeferredCheck),
}

/// A path-scoped validation rule.
///
/// ```
/// # use objext::{Objext, Rule};
/// let mut objx = Objext::new();
/// objx.formulate([Rule::new("age", "age must be positive", |value| {
///     value.and_then(|v| v.as_int()).is_some_and(|age| age > 0)
/// })]);
/// assert!(objx.set("age", -1).unwrap_err().is_validation_error());
/// ```
#[derive(Clone)]
pub struct Rule {
    path: PathBuf,
    message: String,
    check: Check,
    warn: Option<WarnHandler>,
    determine: Option<Predicate>,
}

impl Rule {
    /// Creates a synchronous rule. `check` returns false on failure.
    pub fn new(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        check: impl Fn(Option<&Value>) -> bool + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            check: Check::Sync(Rc::new(check)),
            warn: None,
            determine: None,
        }
    }

    /// Creates a deferred rule whose outcome resolves asynchronously.
    pub fn deferred<F, Fut>(path: impl Into<PathBuf>, message: impl Into<String>, check: F) -> Self
    where
        F: Fn(Option<Value>) -> Fut + 'static,
        Fut: Future<Output = bool> + 'static,
    {
        let check: DeferredCheck = Rc::new(move |value| Box::pin(check(value)));
        Self {
            path: path.into(),
            message: message.into(),
            check: Check::Deferred(check),
            warn: None,
            determine: None,
        }
    }

    /// Routes failures of this rule to `handler` instead of the caller.
    pub fn warn(mut self, handler: impl Fn(&ValidationError) + 'static) -> Self {
        self.warn = Some(Rc::new(handler));
        self
    }

    /// Only applies the rule when `predicate` holds for the checked value.
    pub fn determine(mut self, predicate: impl Fn(Option<&Value>) -> bool + 'static) -> Self {
        self.determine = Some(Rc::new(predicate));
        self
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.check, Check::Deferred(_))
    }

    fn applies(&self, value: Option<&Value>) -> bool {
        self.determine
            .as_ref()
            .is_none_or(|predicate| predicate(value))
    }

    fn error(&self, node: NodeId, path: &PathBuf, value: Option<Value>) -> ValidationError {
        ValidationError {
            path: path.clone(),
            value,
            message: self.message.clone(),
            node,
        }
    }

    /// Hands a failure to the warn handler. Returns true if one was set.
    fn report(&self, error: &ValidationError) -> bool {
        match &self.warn {
            Some(handler) => {
                warn!(path = %error.path, message = %error.message, "validation failed");
                handler(error);
                true
            }
            None => false,
        }
    }

    /// Runs the rule against `value`.
    fn run(&self, node: NodeId, path: &PathBuf, value: Option<Value>) -> Outcome {
        if !self.applies(value.as_ref()) {
            return Outcome::Passed;
        }
        match &self.check {
            Check::Sync(check) => {
                if check(value.as_ref()) {
                    Outcome::Passed
                } else {
                    let error = self.error(node, path, value);
                    let handled = self.report(&error);
                    Outcome::Failed { error, handled }
                }
            }
            Check::Deferred(check) => Outcome::Pending(PendingValidation {
                future: check(value.clone()),
                error: self.error(node, path, value),
                warn: self.warn.clone(),
            }),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("path", &self.path)
            .field("message", &self.message)
            .field("deferred", &self.is_deferred())
            .field("warn", &self.warn.is_some())
            .field("determine", &self.determine.is_some())
            .finish()
    }
}

enum Outcome {
    Passed,
    Failed {
        error: ValidationError,
        handled: bool,
    },
    Pending(PendingValidation),
}

/// The result of a deferred rule, resolved by awaiting it.
pub struct PendingValidation {
    future: Pin<Box<dyn Future<Output = bool>>>,
    error: ValidationError,
    warn: Option<WarnHandler>,
}

impl PendingValidation {
    /// Path of the rule, relative to the node it is registered on.
    pub fn path(&self) -> &PathBuf {
        &self.error.path
    }

    /// Waits for the rule. A failure is routed to the rule's warn handler
    /// when it has one, and returned otherwise.
    pub async fn resolve(self) -> std::result::Result<(), ValidationError> {
        let PendingValidation {
            future,
            error,
            warn,
        } = self;
        if future.await {
            return Ok(());
        }
        match warn {
            Some(handler) => {
                warn!(path = %error.path, message = %error.message, "deferred validation failed");
                handler(&error);
                Ok(())
            }
            None => Err(error),
        }
    }
}

impl fmt::Debug for PendingValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingValidation")
            .field("path", &self.error.path)
            .field("node", &self.error.node)
            .finish()
    }
}

/// Deferred checks produced by one or more validations.
#[derive(Debug, Default)]
pub struct PendingChecks(Vec<PendingValidation>);

impl PendingChecks {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<PendingValidation> {
        self.0
    }

    /// Awaits every check and returns the first unhandled failure.
    pub async fn settle(self) -> std::result::Result<(), ValidationError> {
        let mut first = None;
        for pending in self.0 {
            if let Err(error) = pending.resolve().await {
                first.get_or_insert(error);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

impl Extend<PendingValidation> for PendingChecks {
    fn extend<T: IntoIterator<Item = PendingValidation>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl IntoIterator for PendingChecks {
    type Item = PendingValidation;
    type IntoIter = std::vec::IntoIter<PendingValidation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Outcome of the checks that guard a write.
#[derive(Debug, Default)]
pub(crate) struct Verdict {
    pub(crate) failure: Option<ValidationError>,
    /// The failure was routed to a warn handler.
    pub(crate) handled: bool,
}

impl Objext {
    pub(crate) fn formulate_in(&mut self, node: NodeId, rules: impl IntoIterator<Item = Rule>) {
        if let Some(state) = self.nodes.get_mut(&node) {
            state.rules.extend(rules);
        }
    }

    /// Checks a candidate written at `path` below `node` against the rules of
    /// the node and all of its ancestors.
    pub(crate) fn check_write(&mut self, node: NodeId, path: &PathBuf, candidate: &Value) -> Verdict {
        let mut verdict = Verdict::default();
        let mut deferred = Vec::new();
        let mut current = Some(node);
        let mut relative = path.clone();

        'nodes: while let Some(id) = current {
            let Some(state) = self.nodes.get(&id) else {
                break;
            };
            for rule in state.rules.iter().filter(|rule| rule.path == relative) {
                match rule.run(id, &relative, Some(candidate.clone())) {
                    Outcome::Passed => {}
                    Outcome::Pending(pending) => deferred.push(pending),
                    Outcome::Failed { error, handled } => {
                        verdict.failure = Some(error);
                        verdict.handled = handled;
                        break 'nodes;
                    }
                }
            }
            let Some(key) = &state.key else {
                break;
            };
            relative = PathBuf::from(key.clone()).join(&relative);
            current = state.parent;
        }

        self.pending.extend(deferred);
        verdict
    }

    /// On-demand validation of a node.
    ///
    /// Without a path every rule runs against its own current value. With a
    /// path only the rules registered for it run, against `candidate` or the
    /// current value. Unless a candidate was supplied, validation then
    /// cascades into the child node at `path` (all children when no path was
    /// given).
    pub(crate) fn validate_in(
        &self,
        node: NodeId,
        path: Option<&PathBuf>,
        candidate: Option<&Value>,
    ) -> Result<PendingChecks> {
        let Some(state) = self.nodes.get(&node) else {
            return Ok(PendingChecks::default());
        };
        let mut pending = PendingChecks::default();

        for rule in &state.rules {
            if path.is_some_and(|path| rule.path != *path) {
                continue;
            }
            let value = match candidate {
                Some(value) => Some(value.clone()),
                None => self.read(node, &rule.path).cloned(),
            };
            match rule.run(node, &rule.path, value) {
                Outcome::Passed => {}
                Outcome::Pending(check) => pending.0.push(check),
                Outcome::Failed { error, handled } => {
                    debug!(path = %error.path, handled, "validation halted");
                    return if handled { Ok(pending) } else { Err(error.into()) };
                }
            }
        }

        if candidate.is_none() {
            let children: Vec<NodeId> = match path {
                Some(path) => self.resolve_node(node, path).into_iter().collect(),
                None => state.children.values().copied().collect(),
            };
            for child in children {
                pending.extend(self.validate_in(child, None, None)?);
            }
        }
        Ok(pending)
    }

    /// Removes the deferred checks queued by writes.
    pub(crate) fn take_pending_checks(&mut self) -> PendingChecks {
        PendingChecks(std::mem::take(&mut self.pending))
    }
}
