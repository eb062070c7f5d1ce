//! Lifecycle events attached to a query descriptor.
//!
//! Every [`Query`] owns an [`EventBus`]. The executor dispatches `pre_*`
//! events before compiling and `post_*` events after the statement ran.
//! Listeners are plain closures returning a [`HookOutcome`]:
//!
//! - [`HookOutcome::Continue`] lets the next listener run.
//! - [`HookOutcome::Cancel`] stops dispatch and tells the executor to skip
//!   the default statement. Only `pre_create`, `pre_update` and
//!   `pre_delete` may cancel; anything else is a [`QueryError::NotCancelable`].
//! - `Err(HookError)` is recorded in the [`Dispatch`] report. Under the
//!   default [`ErrorPolicy::Isolate`] the remaining listeners still run,
//!   under [`ErrorPolicy::ShortCircuit`] they are skipped. Either way the
//!   operation itself proceeds.
//!
//! A canceling listener may hand the executor [`Substitute`] statements to
//! run in place of the default one.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{trace, warn};

use crate::binding::StatementKind;
use crate::error::{QueryError, Result};
use crate::query::Query;

/// Lifecycle event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PreCreate,
    PostCreate,
    PreUpdate,
    PostUpdate,
    PreDelete,
    PostDelete,
    PreSelect,
    PostSelect,
}

impl EventKind {
    /// Returns `true` for the kinds a listener may cancel.
    #[must_use]
    pub const fn is_cancelable(self) -> bool {
        matches!(self, Self::PreCreate | Self::PreUpdate | Self::PreDelete)
    }

    /// Snake-case event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreCreate => "pre_create",
            Self::PostCreate => "post_create",
            Self::PreUpdate => "pre_update",
            Self::PostUpdate => "post_update",
            Self::PreDelete => "pre_delete",
            Self::PostDelete => "post_delete",
            Self::PreSelect => "pre_select",
            Self::PostSelect => "post_select",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a listener wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    Continue,
    Cancel,
}

/// A listener failure. Recorded, never propagated to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Return type of every listener.
pub type HookResult = std::result::Result<HookOutcome, HookError>;

/// Shared listener closure.
pub type Listener = Arc<dyn Fn(&mut LifecycleEvent<'_>) -> HookResult + Send + Sync>;

/// Handle returned by [`EventBus::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// How listener errors affect the rest of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Keep running later listeners.
    #[default]
    Isolate,
    /// Stop at the first failing listener.
    ShortCircuit,
}

/// A statement to run instead of the canceled default one.
#[derive(Debug, Clone)]
pub struct Substitute {
    kind: StatementKind,
    query: Query,
}

impl Substitute {
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        self.kind
    }

    #[must_use]
    pub const fn query(&self) -> &Query {
        &self.query
    }
}

/// View of an in-flight dispatch handed to each listener.
pub struct LifecycleEvent<'a> {
    kind: EventKind,
    query: &'a mut Query,
    substitutes: Vec<Substitute>,
}

impl LifecycleEvent<'_> {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    #[must_use]
    pub const fn is_cancelable(&self) -> bool {
        self.kind.is_cancelable()
    }

    /// The descriptor being executed.
    #[must_use]
    pub fn query(&self) -> &Query {
        &*self.query
    }

    /// Mutable descriptor access, for pre-compile changes.
    pub fn query_mut(&mut self) -> &mut Query {
        &mut *self.query
    }

    /// Queues a statement to run if this dispatch ends canceled.
    ///
    /// Substitutes run without further lifecycle events; their own event
    /// bus is cleared.
    pub fn substitute(&mut self, kind: StatementKind, mut query: Query) {
        query.events_mut().clear();
        self.substitutes.push(Substitute { kind, query });
    }
}

impl fmt::Debug for LifecycleEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleEvent")
            .field("kind", &self.kind)
            .field("table", &self.query.table_name())
            .field("substitutes", &self.substitutes.len())
            .finish()
    }
}

/// A recorded listener error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    pub listener: ListenerId,
    pub error: HookError,
}

/// Outcome of one dispatch.
///
/// `is_canceled() == true` means the default statement must not run.
#[derive(Debug, Default)]
pub struct Dispatch {
    canceled: bool,
    substitutes: Vec<Substitute>,
    failures: Vec<HookFailure>,
}

impl Dispatch {
    /// `true` when a listener canceled the default statement.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        self.canceled
    }

    #[must_use]
    pub fn substitutes(&self) -> &[Substitute] {
        &self.substitutes
    }

    #[must_use]
    pub fn into_substitutes(self) -> Vec<Substitute> {
        self.substitutes
    }

    #[must_use]
    pub fn failures(&self) -> &[HookFailure] {
        &self.failures
    }
}

/// Ordered listener registry.
#[derive(Clone, Default)]
pub struct EventBus {
    next_id: u64,
    listeners: Vec<(EventKind, ListenerId, Listener)>,
    policy: ErrorPolicy,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener for `kind`. Listeners run in registration order.
    pub fn register<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&mut LifecycleEvent<'_>) -> HookResult + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        let listener: Listener = Arc::new(listener);
        self.listeners.push((kind, id, listener));
        id
    }

    /// Removes one listener. Returns `false` if it was not registered for `kind`.
    pub fn unregister(&mut self, kind: EventKind, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners
            .retain(|(k, listener_id, _)| !(*k == kind && *listener_id == id));
        self.listeners.len() != before
    }

    /// Drops every listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn set_error_policy(&mut self, policy: ErrorPolicy) {
        self.policy = policy;
    }

    #[must_use]
    pub const fn error_policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Number of listeners registered for `kind`.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.listeners.iter().filter(|(k, _, _)| *k == kind).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn snapshot(&self, kind: EventKind) -> Vec<(ListenerId, Listener)> {
        self.listeners
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, id, listener)| (*id, Arc::clone(listener)))
            .collect()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Dispatches `kind` to the listeners registered on `query`.
///
/// Listeners registered during a dispatch only see later dispatches.
///
/// # Errors
///
/// Returns [`QueryError::NotCancelable`] when a listener cancels a kind
/// that cannot be canceled.
pub fn dispatch(kind: EventKind, query: &mut Query) -> Result<Dispatch> {
    let listeners = query.events().snapshot(kind);
    let policy = query.events().error_policy();
    if listeners.is_empty() {
        return Ok(Dispatch::default());
    }
    trace!(event = %kind, listeners = listeners.len(), "dispatching lifecycle event");

    let mut event = LifecycleEvent {
        kind,
        query,
        substitutes: Vec::new(),
    };
    let mut failures = Vec::new();

    for (id, listener) in listeners {
        match listener(&mut event) {
            Ok(HookOutcome::Continue) => {}
            Ok(HookOutcome::Cancel) => {
                if !kind.is_cancelable() {
                    return Err(QueryError::NotCancelable(kind));
                }
                trace!(event = %kind, substitutes = event.substitutes.len(), "event canceled");
                return Ok(Dispatch {
                    canceled: true,
                    substitutes: event.substitutes,
                    failures,
                });
            }
            Err(error) => {
                warn!(event = %kind, listener = ?id, error = %error, "listener failed");
                failures.push(HookFailure {
                    listener: id,
                    error,
                });
                if policy == ErrorPolicy::ShortCircuit {
                    break;
                }
            }
        }
    }

    if !event.substitutes.is_empty() {
        warn!(
            event = %kind,
            substitutes = event.substitutes.len(),
            "discarding substitutes of a dispatch that was not canceled"
        );
    }
    Ok(Dispatch {
        canceled: false,
        substitutes: Vec::new(),
        failures,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    fn recorder(
        log: &Arc<Mutex<Vec<&'static str>>>,
        tag: &'static str,
    ) -> impl Fn(&mut LifecycleEvent<'_>) -> HookResult + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |_| {
            log.lock().unwrap().push(tag);
            Ok(HookOutcome::Continue)
        }
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut query = Query::table("t")
            .on(EventKind::PreSelect, recorder(&log, "first"))
            .on(EventKind::PreSelect, recorder(&log, "second"))
            .on(EventKind::PostSelect, recorder(&log, "post"));

        let report = dispatch(EventKind::PreSelect, &mut query).unwrap();
        assert!(!report.is_canceled());
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_cancel_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut query = Query::table("t")
            .on(EventKind::PreDelete, |_| Ok(HookOutcome::Cancel))
            .on(EventKind::PreDelete, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(HookOutcome::Continue)
            });

        let report = dispatch(EventKind::PreDelete, &mut query).unwrap();
        assert!(report.is_canceled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_non_cancelable_is_fatal() {
        let mut query = Query::table("t").on(EventKind::PostDelete, |_| Ok(HookOutcome::Cancel));
        assert_eq!(
            dispatch(EventKind::PostDelete, &mut query).unwrap_err(),
            QueryError::NotCancelable(EventKind::PostDelete)
        );

        let mut query = Query::table("t").on(EventKind::PreSelect, |_| Ok(HookOutcome::Cancel));
        assert!(dispatch(EventKind::PreSelect, &mut query).is_err());
    }

    #[test]
    fn test_error_does_not_block_later_listeners() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut query = Query::table("t")
            .on(EventKind::PreUpdate, |_| Err(HookError::new("boom")))
            .on(EventKind::PreUpdate, recorder(&log, "after"));
        assert_eq!(query.events().error_policy(), ErrorPolicy::Isolate);

        let report = dispatch(EventKind::PreUpdate, &mut query).unwrap();
        assert!(!report.is_canceled());
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].error.message(), "boom");
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[test]
    fn test_short_circuit_policy_stops_at_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut query = Query::table("t")
            .on(EventKind::PreUpdate, |_| Err(HookError::new("boom")))
            .on(EventKind::PreUpdate, recorder(&log, "after"));
        query.events_mut().set_error_policy(ErrorPolicy::ShortCircuit);

        let report = dispatch(EventKind::PreUpdate, &mut query).unwrap();
        assert_eq!(report.failures().len(), 1);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unregister_removes_only_that_listener() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut query = Query::table("t");
        let first = query.listen(EventKind::PreCreate, recorder(&log, "first"));
        query.listen(EventKind::PreCreate, recorder(&log, "second"));

        assert!(!query.events_mut().unregister(EventKind::PreDelete, first));
        assert!(query.events_mut().unregister(EventKind::PreCreate, first));
        assert_eq!(query.events().count(EventKind::PreCreate), 1);

        dispatch(EventKind::PreCreate, &mut query).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["second"]);
    }

    #[test]
    fn test_listener_mutates_descriptor() {
        let mut query = Query::table("posts").on(EventKind::PreSelect, |event| {
            event.query_mut().apply(|q| q.where_null("deleted_at"));
            Ok(HookOutcome::Continue)
        });
        dispatch(EventKind::PreSelect, &mut query).unwrap();
        assert_eq!(query.wheres().len(), 1);
    }

    #[test]
    fn test_substitutes_travel_with_cancel() {
        let mut query = Query::table("posts").on(EventKind::PreDelete, |event| {
            let update = event.query().clone();
            event.substitute(StatementKind::Update, update);
            Ok(HookOutcome::Cancel)
        });
        let report = dispatch(EventKind::PreDelete, &mut query).unwrap();
        assert!(report.is_canceled());
        let subs = report.into_substitutes();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].kind(), StatementKind::Update);
        assert!(subs[0].query().events().is_empty());
    }
}
