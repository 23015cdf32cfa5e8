//! Transport seam between the hub and the application's RPC client.
//!
//! The hub issues exactly two commands, both fire-and-forget: no response is
//! awaited and no retry is attempted. A command lost to a dying connection
//! is healed by the next [`reconcile_all`](crate::EventHub::reconcile_all)
//! after reconnect, not by this layer.
//!
//! # Architecture
//!
//! ```text
//! EventTransport (trait)
//!     │
//!     └── ChannelTransport
//!         └── unbounded sender drained by the RPC socket task
//! ```
//!
//! Implementations must never block: the hub calls the trait from the
//! application's runtime loop while holding its own state.

pub mod messages;

use tokio::sync::mpsc;

use messages::OutboundCommand;

/// Fire-and-forget command sink used by the hub during reconciliation.
pub trait EventTransport: Send + Sync {
    /// Replace the remote subscription for `event_type`.
    ///
    /// `scopes` carries the explicit scope set; `all_scopes` overrides it
    /// when any local listener wants every scope for the type.
    fn event_subscribe(&self, event_type: &str, scopes: Vec<String>, all_scopes: bool);

    /// Drop the remote subscription for `event_type`.
    fn event_unsubscribe(&self, event_type: &str);
}

/// Transport backed by an unbounded command channel.
///
/// The RPC socket task owns the receiving end and forwards each command to
/// the server. Sending never blocks. When the receiver is gone (connection
/// task exited), commands are logged and dropped - the reconnect path
/// rebuilds the remote state wholesale, so nothing is queued for later.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    commands: mpsc::UnboundedSender<OutboundCommand>,
}

impl ChannelTransport {
    /// Create a transport plus the receiver the socket task drains.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundCommand>) {
        let (commands, rx) = mpsc::unbounded_channel();
        (Self { commands }, rx)
    }

    fn push(&self, command: OutboundCommand) {
        if let Err(err) = self.commands.send(command) {
            log::warn!("transport channel closed, dropping command: {:?}", err.0);
        }
    }
}

impl EventTransport for ChannelTransport {
    fn event_subscribe(&self, event_type: &str, scopes: Vec<String>, all_scopes: bool) {
        log::debug!("event_subscribe {event_type} scopes={scopes:?} all_scopes={all_scopes}");
        self.push(OutboundCommand::EventSubscribe {
            event_type: event_type.to_string(),
            scopes,
            all_scopes,
        });
    }

    fn event_unsubscribe(&self, event_type: &str) {
        log::debug!("event_unsubscribe {event_type}");
        self.push(OutboundCommand::EventUnsubscribe {
            event_type: event_type.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_arrive_in_order() {
        let (transport, mut rx) = ChannelTransport::new();

        transport.event_subscribe("file", vec!["zoneA".to_string()], false);
        transport.event_subscribe("status", Vec::new(), true);
        transport.event_unsubscribe("file");

        assert_eq!(
            rx.try_recv().expect("first command"),
            OutboundCommand::EventSubscribe {
                event_type: "file".to_string(),
                scopes: vec!["zoneA".to_string()],
                all_scopes: false,
            }
        );
        assert_eq!(
            rx.try_recv().expect("second command"),
            OutboundCommand::EventSubscribe {
                event_type: "status".to_string(),
                scopes: Vec::new(),
                all_scopes: true,
            }
        );
        assert_eq!(
            rx.try_recv().expect("third command"),
            OutboundCommand::EventUnsubscribe {
                event_type: "file".to_string(),
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_receiver_is_tolerated() {
        let (transport, rx) = ChannelTransport::new();
        drop(rx);

        // Fire-and-forget: no panic, no error surfaced
        transport.event_subscribe("file", Vec::new(), true);
        transport.event_unsubscribe("file");
    }
}
