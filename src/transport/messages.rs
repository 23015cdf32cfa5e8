//! Wire types shared with the RPC transport.
//!
//! The hub speaks exactly two outbound commands and receives one inbound
//! envelope shape. Everything else on the wire belongs to the RPC client.
//!
//! # Message Flow
//!
//! ```text
//! EventHub ──► OutboundCommand ──► socket task ──► server
//! server ──► raw JSON ──► EventEnvelope::from_value ──► EventHub::dispatch
//! ```
//!
//! Inbound parsing is lenient: payloads come from transport glue and may
//! omit optional fields or carry extra ones.

// Rust guideline compliant 2026-03

use serde::{Deserialize, Serialize};

/// Outbound fire-and-forget command issued during reconciliation.
///
/// No response is expected or awaited for either variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum OutboundCommand {
    /// Replace the remote subscription for one event type.
    EventSubscribe {
        /// Event type the subscription covers.
        event_type: String,
        /// Explicit scope set; empty when `all_scopes` is set.
        scopes: Vec<String>,
        /// Subscribe to every scope for this event type.
        all_scopes: bool,
    },
    /// Drop the remote subscription for one event type.
    EventUnsubscribe {
        /// Event type to drop.
        event_type: String,
    },
}

impl OutboundCommand {
    /// Event type this command targets.
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::EventSubscribe { event_type, .. } | Self::EventUnsubscribe { event_type } => {
                event_type
            }
        }
    }
}

/// Inbound event envelope pushed up by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Event type this envelope carries.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Scopes the event applies to. Absent means the event is unscoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    /// Opaque payload handed to matching handlers.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Build an envelope for local delivery (tests, loopback events).
    #[must_use]
    pub fn new(
        event_type: impl Into<String>,
        scopes: Option<Vec<String>>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            scopes,
            payload,
        }
    }

    /// Extract an envelope from a raw transport message.
    ///
    /// Returns `None` when the message has no usable `type` field. A missing
    /// `scopes` array and a missing `payload` both degrade to their defaults
    /// rather than failing the whole message.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let event_type = value.get("type").and_then(|t| t.as_str())?;
        if event_type.is_empty() {
            return None;
        }

        let scopes = value.get("scopes").and_then(|s| s.as_array()).map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(String::from)
                .collect()
        });

        let payload = value
            .get("payload")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        Some(Self {
            event_type: event_type.to_string(),
            scopes,
            payload,
        })
    }

    /// Whether the envelope carries the given scope.
    ///
    /// An envelope with no scope list carries no scope at all; scoped
    /// registrations will not match it.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes
            .as_ref()
            .is_some_and(|scopes| scopes.iter().any(|s| s == scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_value_full_envelope() {
        let raw = serde_json::json!({
            "type": "file",
            "scopes": ["zoneA", "zoneB"],
            "payload": { "path": "/tmp/x" }
        });

        let envelope = EventEnvelope::from_value(&raw).expect("envelope");

        assert_eq!(envelope.event_type, "file");
        assert_eq!(
            envelope.scopes,
            Some(vec!["zoneA".to_string(), "zoneB".to_string()])
        );
        assert_eq!(envelope.payload["path"], "/tmp/x");
    }

    #[test]
    fn test_from_value_missing_optional_fields() {
        let raw = serde_json::json!({ "type": "status" });

        let envelope = EventEnvelope::from_value(&raw).expect("envelope");

        assert_eq!(envelope.event_type, "status");
        assert!(envelope.scopes.is_none());
        assert!(envelope.payload.is_null());
    }

    #[test]
    fn test_from_value_rejects_missing_type() {
        let raw = serde_json::json!({ "scopes": ["a"] });
        assert!(EventEnvelope::from_value(&raw).is_none());

        let raw = serde_json::json!({ "type": "" });
        assert!(EventEnvelope::from_value(&raw).is_none());

        let raw = serde_json::json!({ "type": 42 });
        assert!(EventEnvelope::from_value(&raw).is_none());
    }

    #[test]
    fn test_from_value_skips_non_string_scopes() {
        let raw = serde_json::json!({
            "type": "file",
            "scopes": ["zoneA", 7, null, "zoneB"]
        });

        let envelope = EventEnvelope::from_value(&raw).expect("envelope");

        assert_eq!(
            envelope.scopes,
            Some(vec!["zoneA".to_string(), "zoneB".to_string()])
        );
    }

    #[test]
    fn test_has_scope() {
        let scoped = EventEnvelope::new(
            "file",
            Some(vec!["zoneA".to_string()]),
            serde_json::Value::Null,
        );
        assert!(scoped.has_scope("zoneA"));
        assert!(!scoped.has_scope("zoneB"));

        let unscoped = EventEnvelope::new("file", None, serde_json::Value::Null);
        assert!(!unscoped.has_scope("zoneA"));
    }

    #[test]
    fn test_outbound_command_serialization() {
        let subscribe = OutboundCommand::EventSubscribe {
            event_type: "file".to_string(),
            scopes: vec!["zoneA".to_string()],
            all_scopes: false,
        };
        let json = serde_json::to_value(&subscribe).expect("serialize");

        assert_eq!(json["command"], "event_subscribe");
        assert_eq!(json["event_type"], "file");
        assert_eq!(json["scopes"][0], "zoneA");
        assert_eq!(json["all_scopes"], false);

        let unsubscribe = OutboundCommand::EventUnsubscribe {
            event_type: "file".to_string(),
        };
        let json = serde_json::to_value(&unsubscribe).expect("serialize");

        assert_eq!(json["command"], "event_unsubscribe");
        assert_eq!(unsubscribe.event_type(), "file");
    }
}
