//! Itemcast Hub
//!
//! In-memory fan-out of state-change events to WebSocket subscribers.
//! Slow or dead subscribers are dropped; publishers never block.

pub mod config;
pub mod error;
pub mod event;
pub mod hub;
pub mod pump;

pub use config::{HubConfig, PumpConfig};
pub use error::PumpError;
pub use event::{Event, EventKind, Frame};
pub use hub::{Hub, SubscriberId, Subscription};
pub use pump::{serve_connection, Inbound, Outbound};
