//! Termhub - runtime core for a desktop terminal application.
//!
//! The front end is a tree of panes, tabs, and settings views; this crate is
//! the layer underneath that keeps two scarce resources honest:
//!
//! - **Remote event subscriptions** - many components listen for the same
//!   server-side event types. [`EventHub`] reference-counts the local
//!   listeners and holds the remote side to one scope-minimal subscription
//!   per event type.
//! - **Live view surfaces** - terminal views are expensive and stateful, so
//!   they are reused rather than rebuilt. [`ViewCache`] bounds how many stay
//!   alive, never evicting one that is pinned to a visible pane.
//!
//! # Architecture
//!
//! The crate sits between the component tree and the RPC client:
//!
//! ```text
//! components ──► EventHub ──► EventTransport ──► RPC socket task
//!                   ▲                                  │
//!                   └────────── dispatch ◄─────────────┘
//! ```
//!
//! Both components run on the application's single runtime loop. Remote
//! calls are fire-and-forget; the only recovery path after a transport drop
//! is [`EventHub::reconcile_all`], run on reconnect before event delivery
//! resumes.
//!
//! # Modules
//!
//! - [`hub`] - local registrations, scope reconciliation, event dispatch
//! - [`transport`] - wire types and the command channel to the RPC client
//! - [`view_cache`] - bounded, pin-aware cache of view surfaces
//! - [`config`] - configuration loading/saving

// Library modules
pub mod config;
pub mod hub;
pub mod transport;
pub mod view_cache;

// Re-export commonly used types
pub use config::Config;
pub use hub::registration::{EventHandler, ScopeRequirement};
pub use hub::{EventHub, SubscribeEntry, SubscriptionToken};
pub use transport::messages::{EventEnvelope, OutboundCommand};
pub use transport::{ChannelTransport, EventTransport};
pub use view_cache::{ViewCache, DEFAULT_VIEW_CACHE_CAPACITY};
