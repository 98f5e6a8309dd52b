//! # Hub - single owner of the live subscriber set.
//!
//! Every mutation (register, unregister, broadcast) is a [`Command`] sent
//! over one unbounded FIFO channel to a single coordination task. The task
//! is the only code that touches the membership map, so no lock guards it.
//!
//! ```text
//! Publisher ──► Hub::broadcast ──► encode once ──► Command::Broadcast ─┐
//! Pump      ──► Hub::register / Hub::unregister ──────────────────────┤
//!                                                                      ▼
//!                                                            Coordinator::run
//!                                                                      │ try_send
//!                                                  ┌───────────────────┼──────────────┐
//!                                                  ▼                   ▼              ▼
//!                                              queue(sub-1)       queue(sub-2)   queue(sub-N)
//! ```
//!
//! ## Rules
//! - The hub holds the only sending end of each outbound queue; removing a
//!   member drops it, which is the close signal for that member's writer.
//! - A full queue means the subscriber is not keeping up: it is removed
//!   inline, during the broadcast, and never blocks the publisher.
//! - The member count is published on a `watch` channel after each change
//!   and is only eventually consistent with in-flight commands.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::config::HubConfig;
use crate::event::{Event, EventKind, Frame};

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-local subscriber identity. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Requests processed by the coordination task, in arrival order.
#[derive(Debug)]
pub(crate) enum Command {
    Register {
        id: SubscriberId,
        queue: mpsc::Sender<Frame>,
    },
    Unregister(SubscriberId),
    Broadcast(Frame),
    Close,
}

/// Receiving side of a registered subscriber's outbound queue.
///
/// Dropping it unregisters the subscriber.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    queue: mpsc::Receiver<Frame>,
    commands: mpsc::UnboundedSender<Command>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next queued frame, or `None` once the hub has closed the queue
    /// and every queued frame was taken.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.queue.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Frame, TryRecvError> {
        self.queue.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Unknown ids and a stopped hub are both ignored.
        let _ = self.commands.send(Command::Unregister(self.id));
    }
}

/// Handle to the broadcast hub. Cheap to clone.
#[derive(Clone)]
pub struct Hub {
    commands: mpsc::UnboundedSender<Command>,
    count: watch::Receiver<usize>,
    config: HubConfig,
}

impl Hub {
    /// Start the coordination task on the current tokio runtime.
    ///
    /// The task stops after [`Hub::close`] or once every handle and
    /// subscription is dropped.
    pub fn spawn(config: HubConfig) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (count_tx, count) = watch::channel(0);

        let coordinator = Coordinator {
            commands: rx,
            members: HashMap::new(),
            count: count_tx,
        };
        tokio::spawn(coordinator.run());

        Self {
            commands,
            count,
            config,
        }
    }

    /// Register a new subscriber with the configured queue capacity.
    pub fn register(&self) -> Subscription {
        self.register_with_capacity(self.config.queue_capacity)
    }

    /// Register a new subscriber with an explicit queue capacity (at least 1).
    pub fn register_with_capacity(&self, capacity: usize) -> Subscription {
        let (id, queue) = self.attach(capacity);
        Subscription {
            id,
            queue,
            commands: self.commands.clone(),
        }
    }

    /// Register a subscriber whose owner unregisters it explicitly.
    pub(crate) fn register_queue(&self) -> (SubscriberId, mpsc::Receiver<Frame>) {
        self.attach(self.config.queue_capacity)
    }

    fn attach(&self, capacity: usize) -> (SubscriberId, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = SubscriberId::next();
        self.send(Command::Register { id, queue: tx });
        (id, rx)
    }

    /// Remove a subscriber and close its queue. Unknown ids are ignored.
    pub fn unregister(&self, id: SubscriberId) {
        self.send(Command::Unregister(id));
    }

    /// Encode `payload` as an event of `kind` and fan it out.
    ///
    /// Best effort: an unencodable payload is logged and dropped, and
    /// per-subscriber delivery is never reported back.
    pub fn broadcast<P: Serialize>(&self, kind: EventKind, payload: P) {
        match Event::new(kind, payload) {
            Ok(event) => self.broadcast_event(&event),
            Err(e) => error!(kind = %kind, error = %e, "Failed to encode event payload, broadcast abandoned"),
        }
    }

    /// Fan out an already built event.
    pub fn broadcast_event(&self, event: &Event) {
        match event.encode() {
            Ok(frame) => self.send(Command::Broadcast(frame)),
            Err(e) => error!(kind = %event.kind(), error = %e, "Failed to encode event, broadcast abandoned"),
        }
    }

    /// Number of registered subscribers, as last published by the hub.
    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    /// Watch the subscriber count.
    pub fn count_watch(&self) -> watch::Receiver<usize> {
        self.count.clone()
    }

    /// Close every subscriber queue and stop the coordination task.
    pub fn close(&self) {
        self.send(Command::Close);
    }

    fn send(&self, command: Command) {
        if let Err(e) = self.commands.send(command) {
            debug!(command = ?e.0, "Hub is not running, request dropped");
        }
    }

    /// A hub without a coordination task; commands land in the returned receiver.
    #[cfg(test)]
    pub(crate) fn detached(config: HubConfig) -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (commands, rx) = mpsc::unbounded_channel();
        let (_count_tx, count) = watch::channel(0);
        (
            Self {
                commands,
                count,
                config,
            },
            rx,
        )
    }
}

/// The single consumer of hub commands.
struct Coordinator {
    commands: mpsc::UnboundedReceiver<Command>,
    members: HashMap<SubscriberId, mpsc::Sender<Frame>>,
    count: watch::Sender<usize>,
}

impl Coordinator {
    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Register { id, queue } => {
                    self.members.insert(id, queue);
                    info!(subscriber = %id, count = self.members.len(), "Subscriber registered");
                }
                Command::Unregister(id) => {
                    if self.members.remove(&id).is_some() {
                        info!(subscriber = %id, count = self.members.len(), "Subscriber unregistered");
                    }
                }
                Command::Broadcast(frame) => self.fan_out(&frame),
                Command::Close => {
                    info!(count = self.members.len(), "Hub closing, disconnecting all subscribers");
                    self.members.clear();
                    self.publish_count();
                    break;
                }
            }
            self.publish_count();
        }
        debug!("Hub coordination loop stopped");
    }

    fn fan_out(&mut self, frame: &Frame) {
        let before = self.members.len();

        self.members.retain(|id, queue| match queue.try_send(Arc::clone(frame)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(subscriber = %id, "Outbound queue full, dropping slow subscriber");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber = %id, "Outbound queue already closed, removing subscriber");
                false
            }
        });

        debug!(
            recipients = self.members.len(),
            dropped = before - self.members.len(),
            "Event broadcast"
        );
    }

    fn publish_count(&self) {
        let len = self.members.len();
        self.count.send_if_modified(|current| {
            if *current == len {
                return false;
            }
            *current = len;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let a = SubscriberId::next();
        let b = SubscriberId::next();
        assert!(b > a);
        assert_eq!(a.to_string(), format!("sub-{}", a.as_u64()));
    }

    #[tokio::test]
    async fn test_unencodable_payload_reaches_nobody() {
        let (hub, mut commands) = Hub::detached(HubConfig::default());
        let mut payload = HashMap::new();
        payload.insert((0u8, 0u8), 1);

        hub.broadcast(EventKind::Created, payload);
        hub.broadcast(EventKind::Deleted, serde_json::json!({ "id": "7" }));

        match commands.recv().await {
            Some(Command::Broadcast(frame)) => assert!(frame.contains("ITEM_DELETED")),
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_register_after_close_yields_closed_queue() {
        let hub = Hub::spawn(HubConfig::default());
        hub.close();

        let mut closed = hub.count_watch();
        // The sender is dropped when the coordination task exits.
        while closed.changed().await.is_ok() {}

        let mut late = hub.register();
        assert!(late.recv().await.is_none());
        assert_eq!(hub.count(), 0);
    }

    #[tokio::test]
    async fn test_capacity_is_at_least_one() {
        let hub = Hub::spawn(HubConfig { queue_capacity: 0 });
        let mut sub = hub.register();

        hub.broadcast(EventKind::Created, "first");
        let frame = sub.recv().await.unwrap();
        assert!(frame.contains("first"));
    }
}
