//! Event hub - fans local listeners out over shared remote subscriptions.
//!
//! Many front-end components listen for the same server-side event types.
//! Subscribing each of them remotely would flood the transport; subscribing
//! none would starve them. The hub keeps one registration table per event
//! type and holds the remote side to the minimal subscription that still
//! satisfies every local listener: the union of their scopes, or all scopes
//! once any listener declines to narrow.
//!
//! # Reconciliation
//!
//! Every local mutation recomputes the requirement for the touched event
//! types and issues at most one transport command per type - a recomputed
//! requirement identical to the last issued one is not re-sent. Batched
//! `subscribe` calls reconcile once per distinct type after the whole batch.
//!
//! # Reconnection
//!
//! Transport commands are fire-and-forget and never retried individually.
//! After a reconnect the server has no subscription state left, so the
//! application calls [`EventHub::reconcile_all`] - which re-issues every
//! requirement unconditionally - before resuming event delivery.

// Rust guideline compliant 2026-03

pub mod registration;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::transport::messages::EventEnvelope;
use crate::transport::EventTransport;
use registration::{EventHandler, Registration, ScopeRequirement};

/// One entry in a batched [`EventHub::subscribe`] call.
///
/// `handler` is optional because entries arrive from front-end glue that may
/// hand over an empty slot; such entries are rejected locally and never
/// reach the transport.
#[derive(Clone)]
pub struct SubscribeEntry {
    /// Event type to register for.
    pub event_type: String,
    /// Optional scope filter; blank or absent means all scopes.
    pub scope: Option<String>,
    /// Callback invoked with each matching event's payload.
    pub handler: Option<EventHandler>,
}

impl SubscribeEntry {
    /// Build a well-formed entry.
    #[must_use]
    pub fn new(event_type: impl Into<String>, scope: Option<&str>, handler: EventHandler) -> Self {
        Self {
            event_type: event_type.into(),
            scope: scope.map(String::from),
            handler: Some(handler),
        }
    }
}

impl fmt::Debug for SubscribeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribeEntry")
            .field("event_type", &self.event_type)
            .field("scope", &self.scope)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

/// Composite token returned by [`EventHub::subscribe`].
///
/// Hand it back to [`EventHub::unsubscribe`] to remove every registration
/// the call created. Unsubscribing a token twice is a silent no-op.
#[derive(Debug, Clone, Default)]
#[must_use = "unsubscribing requires this token; dropping it leaves the registrations active"]
pub struct SubscriptionToken {
    entries: Vec<(String, Uuid)>,
}

impl SubscriptionToken {
    /// Number of registrations the token covers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the token covers no registrations (every entry was rejected).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hub-internal tables, behind the shared lock.
struct HubInner {
    /// Active registrations per event type, in insertion order.
    ///
    /// A type with no registrations must not appear here; absence is what
    /// drives the remote unsubscribe.
    registrations: HashMap<String, Vec<Registration>>,
    /// Requirement last issued to the transport, per event type.
    issued: HashMap<String, ScopeRequirement>,
}

/// Reference-counted fan-out of local event interest over one remote
/// subscription per event type.
///
/// The hub is a cheap cloneable handle; clones share the same tables.
/// Callers construct one per transport connection and pass it around
/// instead of reaching for a process-wide singleton.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<RwLock<HubInner>>,
    transport: Arc<dyn EventTransport>,
}

impl EventHub {
    /// Create a hub issuing commands through `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn EventTransport>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HubInner {
                registrations: HashMap::new(),
                issued: HashMap::new(),
            })),
            transport,
        }
    }

    /// Register a batch of local listeners.
    ///
    /// Entries without a handler are skipped with a warning. Each accepted
    /// entry gets a fresh identifier recorded in the returned token; the
    /// remote requirement is reconciled once per distinct affected event
    /// type after the whole batch.
    pub fn subscribe(&self, entries: Vec<SubscribeEntry>) -> SubscriptionToken {
        let mut token = SubscriptionToken::default();

        let Ok(mut inner) = self.inner.write() else {
            log::error!("hub lock poisoned, subscribe dropped");
            return token;
        };

        let mut touched = BTreeSet::new();
        for entry in entries {
            let Some(handler) = entry.handler else {
                log::warn!(
                    "subscribe: entry for {} has no handler, skipping",
                    entry.event_type
                );
                continue;
            };

            let registration = Registration::new(entry.scope, handler);
            token
                .entries
                .push((entry.event_type.clone(), registration.id()));
            touched.insert(entry.event_type.clone());
            inner
                .registrations
                .entry(entry.event_type)
                .or_default()
                .push(registration);
        }

        for event_type in &touched {
            Self::reconcile_type(&mut inner, self.transport.as_ref(), event_type);
        }

        token
    }

    /// Register a single listener. Convenience wrapper over [`Self::subscribe`].
    pub fn subscribe_one(
        &self,
        event_type: impl Into<String>,
        scope: Option<&str>,
        handler: EventHandler,
    ) -> SubscriptionToken {
        self.subscribe(vec![SubscribeEntry::new(event_type, scope, handler)])
    }

    /// Remove every registration a token covers.
    ///
    /// Unknown (event type, identifier) pairs are silent no-ops. A type
    /// whose registration list becomes empty is removed from the table
    /// entirely, which drives the remote unsubscribe on reconcile.
    pub fn unsubscribe(&self, token: SubscriptionToken) {
        let Ok(mut inner) = self.inner.write() else {
            log::error!("hub lock poisoned, unsubscribe dropped");
            return;
        };

        let mut touched = BTreeSet::new();
        for (event_type, id) in token.entries {
            let Some(registrations) = inner.registrations.get_mut(&event_type) else {
                continue;
            };

            let before = registrations.len();
            registrations.retain(|r| r.id() != id);
            if registrations.len() == before {
                // Already removed earlier; idempotent
                continue;
            }

            if registrations.is_empty() {
                inner.registrations.remove(&event_type);
            }
            touched.insert(event_type);
        }

        for event_type in &touched {
            Self::reconcile_type(&mut inner, self.transport.as_ref(), event_type);
        }
    }

    /// Deliver an inbound envelope to matching local listeners.
    ///
    /// No registrations for the type is a benign no-op: events may arrive
    /// after local interest is torn down. Handlers run in registration
    /// insertion order. The handler list is snapshotted before the lock is
    /// released, so a handler may subscribe or unsubscribe from inside its
    /// own invocation; dispatch for the current event may still reach a
    /// registration removed during this same pass, but no later event will.
    pub fn dispatch(&self, envelope: &EventEnvelope) {
        let handlers: Vec<EventHandler> = {
            let Ok(inner) = self.inner.read() else {
                log::error!("hub lock poisoned, event dropped");
                return;
            };
            let Some(registrations) = inner.registrations.get(&envelope.event_type) else {
                log::trace!("no listeners for {}, dropping event", envelope.event_type);
                return;
            };
            registrations
                .iter()
                .filter(|r| r.matches(envelope))
                .map(Registration::handler)
                .collect()
        };

        for handler in handlers {
            handler(&envelope.payload);
        }
    }

    /// Re-issue the remote requirement for every registered event type.
    ///
    /// Run after a transport reconnect, before event delivery resumes: the
    /// server lost all subscription state, so previously issued requirements
    /// are forgotten first and everything is sent again unconditionally.
    pub fn reconcile_all(&self) {
        let Ok(mut inner) = self.inner.write() else {
            log::error!("hub lock poisoned, reconcile_all dropped");
            return;
        };

        inner.issued.clear();
        let event_types: Vec<String> = inner.registrations.keys().cloned().collect();
        for event_type in &event_types {
            Self::reconcile_type(&mut inner, self.transport.as_ref(), event_type);
        }

        log::info!(
            "re-issued remote subscriptions for {} event types",
            event_types.len()
        );
    }

    /// Recompute the requirement for one event type and issue at most one
    /// transport command if it differs from the last issued value.
    fn reconcile_type(inner: &mut HubInner, transport: &dyn EventTransport, event_type: &str) {
        let required = inner
            .registrations
            .get(event_type)
            .and_then(|regs| ScopeRequirement::for_registrations(regs));

        match required {
            None => {
                // Table entry gone; one remote unsubscribe, once
                if inner.issued.remove(event_type).is_some() {
                    log::debug!("reconcile {event_type}: unsubscribing remote");
                    transport.event_unsubscribe(event_type);
                }
            }
            Some(requirement) => {
                if inner.issued.get(event_type) == Some(&requirement) {
                    return;
                }
                log::debug!(
                    "reconcile {event_type}: all_scopes={} scopes={:?}",
                    requirement.is_all_scopes(),
                    requirement.scope_list()
                );
                transport.event_subscribe(
                    event_type,
                    requirement.scope_list(),
                    requirement.is_all_scopes(),
                );
                inner.issued.insert(event_type.to_string(), requirement);
            }
        }
    }

    // === Introspection ===

    /// Total number of active registrations across all event types.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.inner
            .read()
            .map(|inner| inner.registrations.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Event types with at least one active registration, sorted.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.inner
            .read()
            .map(|inner| {
                let mut types: Vec<String> = inner.registrations.keys().cloned().collect();
                types.sort();
                types
            })
            .unwrap_or_default()
    }

    /// Whether any listener is registered for `event_type`.
    #[must_use]
    pub fn has_registrations(&self, event_type: &str) -> bool {
        self.inner
            .read()
            .map(|inner| inner.registrations.contains_key(event_type))
            .unwrap_or(false)
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("event_types", &self.event_types())
            .field("registration_count", &self.registration_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::messages::OutboundCommand;
    use std::sync::Mutex;

    /// Records every command the hub issues, for assertions.
    #[derive(Debug, Default)]
    struct RecordingTransport {
        commands: Mutex<Vec<OutboundCommand>>,
    }

    impl RecordingTransport {
        fn commands(&self) -> Vec<OutboundCommand> {
            self.commands.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    impl EventTransport for RecordingTransport {
        fn event_subscribe(&self, event_type: &str, scopes: Vec<String>, all_scopes: bool) {
            if let Ok(mut commands) = self.commands.lock() {
                commands.push(
                    OutboundCommand::EventSubscribe {
                        event_type: event_type.to_string(),
                        scopes,
                        all_scopes,
                    },
                );
            }
        }

        fn event_unsubscribe(&self, event_type: &str) {
            if let Ok(mut commands) = self.commands.lock() {
                commands.push(
                    OutboundCommand::EventUnsubscribe {
                        event_type: event_type.to_string(),
                    },
                );
            }
        }
    }

    fn hub_with_recorder() -> (EventHub, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let hub = EventHub::new(Arc::clone(&transport) as Arc<dyn EventTransport>);
        (hub, transport)
    }

    fn noop() -> EventHandler {
        Arc::new(|_payload| {})
    }

    #[test]
    fn test_empty_type_never_left_in_table() {
        let (hub, _transport) = hub_with_recorder();

        let token = hub.subscribe_one("file", Some("zoneA"), noop());
        assert!(hub.has_registrations("file"));

        hub.unsubscribe(token);
        assert!(!hub.has_registrations("file"));
        assert!(hub.event_types().is_empty());
    }

    #[test]
    fn test_missing_handler_rejected_locally() {
        let (hub, transport) = hub_with_recorder();

        let token = hub.subscribe(vec![SubscribeEntry {
            event_type: "file".to_string(),
            scope: None,
            handler: None,
        }]);

        assert!(token.is_empty());
        assert_eq!(hub.registration_count(), 0);
        assert!(transport.commands().is_empty());
    }

    #[test]
    fn test_batch_reconciles_once_per_type() {
        let (hub, transport) = hub_with_recorder();

        let _token = hub.subscribe(vec![
            SubscribeEntry::new("file", Some("zoneA"), noop()),
            SubscribeEntry::new("file", Some("zoneB"), noop()),
            SubscribeEntry::new("status", None, noop()),
        ]);

        let commands = transport.commands();
        assert_eq!(commands.len(), 2);
        assert!(commands.iter().any(|c| {
            matches!(c, OutboundCommand::EventSubscribe {
                event_type, scopes, all_scopes: false
            } if event_type == "file" && *scopes == vec!["zoneA".to_string(), "zoneB".to_string()])
        }));
        assert!(commands.iter().any(|c| {
            matches!(c, OutboundCommand::EventSubscribe {
                event_type, scopes, all_scopes: true
            } if event_type == "status" && scopes.is_empty())
        }));
    }

    #[test]
    fn test_identical_requirement_not_resent() {
        let (hub, transport) = hub_with_recorder();

        let _a = hub.subscribe_one("file", Some("zoneA"), noop());
        let _b = hub.subscribe_one("file", Some("zoneA"), noop());

        // Second registration leaves the requirement at {zoneA}
        assert_eq!(transport.commands().len(), 1);
        assert_eq!(hub.registration_count(), 2);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let (hub, transport) = hub_with_recorder();

        let token = hub.subscribe_one("file", Some("zoneA"), noop());
        hub.unsubscribe(token.clone());
        let after_first = transport.commands().len();

        hub.unsubscribe(token);
        assert_eq!(transport.commands().len(), after_first);
        assert_eq!(hub.registration_count(), 0);
    }
}
