//! Connection pumps: the bridge between one subscriber's outbound queue and
//! its transport.
//!
//! Each connection runs exactly two tasks:
//! - **writer**: drains the queue in FIFO order, sends keepalive pings, and
//!   owns the closing of the transport.
//! - **reader**: discards inbound data, tracks the read deadline, and is the
//!   one that asks the hub to unregister the subscriber.
//!
//! The pumps are transport agnostic. Any `Sink<Outbound>` / `Stream` of
//! `Result<Inbound, E>` pair works; the web layer adapts an axum WebSocket.

use std::fmt::Display;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::config::PumpConfig;
use crate::error::PumpError;
use crate::event::Frame;
use crate::hub::{Hub, SubscriberId};

/// Frame written to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// An encoded event.
    Text(Frame),
    /// Keepalive probe.
    Ping,
    /// Close handshake.
    Close,
}

/// Frame read from the transport, reduced to what the pumps act on.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Application data of the given size. Never interpreted.
    Data(usize),
    Ping,
    /// Keepalive acknowledgement.
    Pong,
    /// Peer started the close handshake.
    Close,
}

/// Register a subscriber and pump its connection until both directions stop.
pub async fn serve_connection<S, R, E>(hub: Hub, sink: S, stream: R, config: PumpConfig)
where
    S: Sink<Outbound> + Unpin + Send + 'static,
    S::Error: Display,
    R: Stream<Item = Result<Inbound, E>> + Unpin + Send + 'static,
    E: Display + 'static,
{
    let (id, queue) = hub.register_queue();
    info!(subscriber = %id, "WebSocket client connected");

    let (closed_tx, closed_rx) = oneshot::channel();
    let writer = tokio::spawn(write_pump(
        id,
        queue,
        sink,
        config.clone(),
        closed_tx,
    ));
    let reader = tokio::spawn(read_pump(hub, id, stream, config, closed_rx));

    let (written, read) = tokio::join!(writer, reader);
    match written {
        Ok(Ok(())) => debug!(subscriber = %id, "Writer finished"),
        Ok(Err(e)) => debug!(subscriber = %id, error = %e, "Writer stopped"),
        Err(e) => warn!(subscriber = %id, error = %e, "Writer task failed"),
    }
    match read {
        Ok(Ok(())) => debug!(subscriber = %id, "Reader finished"),
        Ok(Err(e)) => debug!(subscriber = %id, error = %e, "Reader stopped"),
        Err(e) => warn!(subscriber = %id, error = %e, "Reader task failed"),
    }

    info!(subscriber = %id, "WebSocket client disconnected");
}

/// Drain `queue` into `sink` until the queue closes or a write fails.
///
/// The sink is closed exactly once before returning. Dropping `closed`
/// tells the reader the transport is gone.
pub(crate) async fn write_pump<S>(
    id: SubscriberId,
    mut queue: mpsc::Receiver<Frame>,
    mut sink: S,
    config: PumpConfig,
    closed: oneshot::Sender<()>,
) -> Result<(), PumpError>
where
    S: Sink<Outbound> + Unpin,
    S::Error: Display,
{
    let write_timeout = config.write_timeout();
    let mut ticker = time::interval_at(Instant::now() + config.ping_interval(), config.ping_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let result = loop {
        tokio::select! {
            frame = queue.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = send_within(&mut sink, Outbound::Text(frame), write_timeout).await {
                        break Err(e);
                    }
                }
                None => {
                    debug!(subscriber = %id, "Outbound queue closed, sending close frame");
                    // The peer may already be gone; the close is best effort.
                    let _ = send_within(&mut sink, Outbound::Close, write_timeout).await;
                    break Ok(());
                }
            },
            _ = ticker.tick() => {
                trace!(subscriber = %id, "Sending keepalive ping");
                if let Err(e) = send_within(&mut sink, Outbound::Ping, write_timeout).await {
                    break Err(e);
                }
            }
        }
    };

    match time::timeout(write_timeout, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => trace!(subscriber = %id, error = %e, "Transport close reported an error"),
        Err(_) => trace!(subscriber = %id, "Transport close timed out"),
    }
    drop(closed);

    result
}

async fn send_within<S>(sink: &mut S, frame: Outbound, limit: std::time::Duration) -> Result<(), PumpError>
where
    S: Sink<Outbound> + Unpin,
    S::Error: Display,
{
    match time::timeout(limit, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(PumpError::transport(e)),
        Err(_) => Err(PumpError::WriteTimeout),
    }
}

/// Read and discard inbound frames until the connection ends, then ask the
/// hub to unregister `id`. Exactly one unregister request is sent.
pub(crate) async fn read_pump<R, E>(
    hub: Hub,
    id: SubscriberId,
    mut stream: R,
    config: PumpConfig,
    mut closed: oneshot::Receiver<()>,
) -> Result<(), PumpError>
where
    R: Stream<Item = Result<Inbound, E>> + Unpin,
    E: Display,
{
    let read_timeout = config.read_timeout();
    let mut deadline = Instant::now() + read_timeout;

    let result = loop {
        tokio::select! {
            _ = &mut closed => {
                debug!(subscriber = %id, "Transport closed by writer");
                break Ok(());
            }
            next = time::timeout_at(deadline, stream.next()) => match next {
                Err(_) => break Err(PumpError::ReadTimeout),
                Ok(None) | Ok(Some(Ok(Inbound::Close))) => {
                    debug!(subscriber = %id, "Peer closed the connection");
                    break Ok(());
                }
                Ok(Some(Err(e))) => break Err(PumpError::transport(e)),
                Ok(Some(Ok(Inbound::Pong))) => {
                    deadline = Instant::now() + read_timeout;
                }
                Ok(Some(Ok(Inbound::Ping))) => {}
                Ok(Some(Ok(Inbound::Data(size)))) => {
                    if size > config.max_message_size {
                        break Err(PumpError::MessageTooLarge {
                            size,
                            limit: config.max_message_size,
                        });
                    }
                    trace!(subscriber = %id, size, "Discarding inbound message");
                }
            }
        }
    };

    hub.unregister(id);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use crate::hub::Command;
    use futures::channel::mpsc as fmpsc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_reader_unregisters_once_on_repeated_errors() {
        let (hub, mut commands) = Hub::detached(HubConfig::default());
        let id = SubscriberId::next();

        let (inbound_tx, inbound_rx) = fmpsc::unbounded::<Result<Inbound, String>>();
        inbound_tx.unbounded_send(Err("connection reset".into())).unwrap();
        inbound_tx.unbounded_send(Err("connection reset".into())).unwrap();
        let (_closed_tx, closed_rx) = oneshot::channel();

        let result = read_pump(hub.clone(), id, inbound_rx, PumpConfig::default(), closed_rx).await;
        assert!(matches!(result, Err(PumpError::Transport(_))));

        match commands.recv().await {
            Some(Command::Unregister(got)) => assert_eq!(got, id),
            other => panic!("unexpected command: {:?}", other),
        }
        drop(hub);
        assert!(commands.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_reader_rejects_oversized_data() {
        let (hub, mut commands) = Hub::detached(HubConfig::default());
        let id = SubscriberId::next();

        let (inbound_tx, inbound_rx) = fmpsc::unbounded::<Result<Inbound, String>>();
        inbound_tx.unbounded_send(Ok(Inbound::Data(10))).unwrap();
        inbound_tx.unbounded_send(Ok(Inbound::Data(4096))).unwrap();
        let (_closed_tx, closed_rx) = oneshot::channel();

        let result = read_pump(hub, id, inbound_rx, PumpConfig::default(), closed_rx).await;
        assert!(matches!(
            result,
            Err(PumpError::MessageTooLarge { size: 4096, limit: 512 })
        ));
        assert!(matches!(commands.recv().await, Some(Command::Unregister(got)) if got == id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pong_extends_read_deadline() {
        let (hub, mut commands) = Hub::detached(HubConfig::default());
        let id = SubscriberId::next();

        let (inbound_tx, inbound_rx) = fmpsc::unbounded::<Result<Inbound, String>>();
        let (_closed_tx, closed_rx) = oneshot::channel();
        let started = Instant::now();
        let reader = tokio::spawn(read_pump(hub, id, inbound_rx, PumpConfig::default(), closed_rx));

        time::sleep(Duration::from_secs(50)).await;
        inbound_tx.unbounded_send(Ok(Inbound::Pong)).unwrap();
        // Data does not count as a keepalive acknowledgement.
        time::sleep(Duration::from_secs(50)).await;
        inbound_tx.unbounded_send(Ok(Inbound::Data(3))).unwrap();

        let result = reader.await.unwrap();
        assert!(matches!(result, Err(PumpError::ReadTimeout)));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(110) && elapsed < Duration::from_secs(111));
        assert!(matches!(commands.recv().await, Some(Command::Unregister(got)) if got == id));
    }

    #[tokio::test]
    async fn test_reader_stops_when_writer_closes_transport() {
        let (hub, mut commands) = Hub::detached(HubConfig::default());
        let id = SubscriberId::next();

        let (_inbound_tx, inbound_rx) = fmpsc::unbounded::<Result<Inbound, String>>();
        let (closed_tx, closed_rx) = oneshot::channel();
        drop(closed_tx);

        let result = read_pump(hub, id, inbound_rx, PumpConfig::default(), closed_rx).await;
        assert!(result.is_ok());
        assert!(matches!(commands.recv().await, Some(Command::Unregister(got)) if got == id));
    }

    #[tokio::test]
    async fn test_writer_drains_in_order_then_closes() {
        let (queue_tx, queue_rx) = mpsc::channel(8);
        let (sink, mut written) = fmpsc::unbounded::<Outbound>();
        let (closed_tx, mut closed_rx) = oneshot::channel();
        let id = SubscriberId::next();

        queue_tx.send(Frame::from("one")).await.unwrap();
        queue_tx.send(Frame::from("two")).await.unwrap();
        drop(queue_tx);

        let result = write_pump(id, queue_rx, sink, PumpConfig::default(), closed_tx).await;
        assert!(result.is_ok());

        assert_eq!(written.next().await, Some(Outbound::Text(Frame::from("one"))));
        assert_eq!(written.next().await, Some(Outbound::Text(Frame::from("two"))));
        assert_eq!(written.next().await, Some(Outbound::Close));
        // Sink closed: nothing is written after the close frame.
        assert_eq!(written.next().await, None);
        assert!(closed_rx.try_recv().is_err());
    }
}
