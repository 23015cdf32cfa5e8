//! Local registration bookkeeping for the event hub.
//!
//! A [`Registration`] is one consumer's interest in one event type,
//! optionally narrowed to a single scope. The hub keeps them in per-type
//! insertion order; this module owns the scope normalization, the match
//! predicate, and the derivation of the remote [`ScopeRequirement`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::transport::messages::EventEnvelope;

/// Callback invoked with a matching event's payload.
pub type EventHandler = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

/// One local consumer's interest in one event type.
///
/// Identifiers are unique within an event type; (event type, identifier) is
/// the key `unsubscribe` removes by.
#[derive(Clone)]
pub struct Registration {
    id: Uuid,
    /// Normalized scope filter; `None` matches every scope.
    scope: Option<String>,
    handler: EventHandler,
}

impl Registration {
    /// Create a registration with a fresh identifier.
    ///
    /// Blank and whitespace-only scopes normalize to `None` here, so the
    /// requirement computation never sees empty scope members.
    pub(crate) fn new(scope: Option<String>, handler: EventHandler) -> Self {
        Self {
            id: Uuid::new_v4(),
            scope: normalize_scope(scope),
            handler,
        }
    }

    /// Unique identifier within this registration's event type.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Normalized scope filter, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Shared handle to the handler, for snapshotting before dispatch.
    pub(crate) fn handler(&self) -> EventHandler {
        Arc::clone(&self.handler)
    }

    /// Whether this registration wants the given envelope.
    ///
    /// A blank-scope registration matches unconditionally; a scoped one
    /// matches only when the envelope's scope list contains its scope.
    #[must_use]
    pub fn matches(&self, envelope: &EventEnvelope) -> bool {
        match &self.scope {
            None => true,
            Some(scope) => envelope.has_scope(scope),
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Blank and whitespace-only scopes mean "all scopes".
pub(crate) fn normalize_scope(scope: Option<String>) -> Option<String> {
    scope.filter(|s| !s.trim().is_empty())
}

/// Remote subscription requirement derived for one event type.
///
/// Derived, never stored as source of truth: the hub recomputes it from the
/// registration table and compares against the last issued value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeRequirement {
    /// At least one registration has a blank scope.
    AllScopes,
    /// Distinct non-blank scopes across all registrations, sorted.
    Scopes(BTreeSet<String>),
}

impl ScopeRequirement {
    /// Compute the requirement for one event type's registrations.
    ///
    /// Returns `None` for an empty slice: an event type with no
    /// registrations needs no remote subscription at all.
    #[must_use]
    pub fn for_registrations(registrations: &[Registration]) -> Option<Self> {
        if registrations.is_empty() {
            return None;
        }

        let mut scopes = BTreeSet::new();
        for registration in registrations {
            match registration.scope() {
                // One blank scope makes the whole type all-scopes
                None => return Some(Self::AllScopes),
                Some(scope) => {
                    scopes.insert(scope.to_string());
                }
            }
        }
        Some(Self::Scopes(scopes))
    }

    /// Explicit scope list for the wire; empty for [`Self::AllScopes`].
    #[must_use]
    pub fn scope_list(&self) -> Vec<String> {
        match self {
            Self::AllScopes => Vec::new(),
            Self::Scopes(scopes) => scopes.iter().cloned().collect(),
        }
    }

    /// Whether the requirement covers every scope.
    #[must_use]
    pub fn is_all_scopes(&self) -> bool {
        matches!(self, Self::AllScopes)
    }
}
