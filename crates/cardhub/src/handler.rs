//! Per-connection pump: one read loop and one write loop per connection.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!   1. Create the connection's outbox and spawn the write loop
//!   2. Read frames until the peer leaves, goes quiet, or the writer stops
//!   3. Dispatch every decoded envelope to the hub under its lock
//!   4. On exit: stop the writer, close the connection, unbind from the hub
//!
//! ```text
//!            ┌──────────── read loop (this task) ─────────────┐
//! peer ──→ recv() ──→ decode ──→ hub.lock().dispatch(&outbox, env)
//!                                         │
//!                                         ▼ Outbox::deliver (any session)
//! peer ←── send() ←── encode_lines ←── OutboxReceiver
//!            └──────────── write loop (spawned) ──────────────┘
//! ```

use std::sync::Arc;

use cardhub_protocol::{Codec, Envelope, encode_lines};
use cardhub_room::GameEngine;
use cardhub_session::{OutboxReceiver, outbox};
use cardhub_transport::{Connection, ConnectionId, Frame, TransportError};
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};

use crate::{CardhubError, Hub, PumpConfig};

/// The hub as shared between pumps, the reaper and the server.
pub type SharedHub<E> = Arc<Mutex<Hub<E>>>;

/// Drop guard that unbinds the connection from the hub when the pump exits.
///
/// This ensures cleanup happens even if the pump panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async lock.
struct BindingGuard<E: GameEngine> {
    conn_id: ConnectionId,
    hub: SharedHub<E>,
}

impl<E: GameEngine> Drop for BindingGuard<E> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let hub = Arc::clone(&self.hub);
        tokio::spawn(async move {
            hub.lock().await.disconnect(conn_id);
        });
    }
}

/// Runs a connection from accept to close.
///
/// Returns the transport error that ended the connection, if any. Peer
/// close, liveness timeout and takeover all count as a clean exit.
pub async fn handle_connection<T, E, C>(
    conn: T,
    hub: SharedHub<E>,
    codec: C,
    config: PumpConfig,
) -> Result<(), CardhubError>
where
    T: Connection<Error = TransportError>,
    E: GameEngine,
    C: Codec + Clone,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (outbox, receiver) = outbox(conn_id, config.outbound_capacity);
    let _guard = BindingGuard {
        conn_id,
        hub: Arc::clone(&hub),
    };

    let mut writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        receiver,
        codec.clone(),
        config.clone(),
    ));
    let mut writer_finished = false;

    let result = loop {
        tokio::select! {
            _ = &mut writer, if !writer_finished => {
                writer_finished = true;
                tracing::debug!(%conn_id, "writer stopped, ending read loop");
                break Ok(());
            }
            frame = timeout(config.liveness_timeout, conn.recv()) => match frame {
                Ok(Ok(Some(Frame::Data(data)))) => {
                    let envelope: Envelope = match codec.decode(&data) {
                        Ok(envelope) => envelope,
                        Err(e) => {
                            tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                            continue;
                        }
                    };
                    hub.lock().await.dispatch(&outbox, envelope);
                }
                Ok(Ok(Some(Frame::Heartbeat))) => {}
                Ok(Ok(None)) => {
                    tracing::info!(%conn_id, "connection closed by peer");
                    break Ok(());
                }
                Ok(Err(e)) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    break Err(CardhubError::Transport(e));
                }
                Err(_) => {
                    tracing::info!(%conn_id, "connection timed out");
                    break Ok(());
                }
            },
        }
    };

    outbox.close();
    if !writer_finished {
        let _ = writer.await;
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }

    // _guard drops here → hub disconnect fires.
    result
}

/// Drains the outbox onto the wire until told to stop or a write fails.
async fn write_loop<T, C>(
    conn: Arc<T>,
    mut receiver: OutboxReceiver,
    codec: C,
    config: PumpConfig,
) where
    T: Connection<Error = TransportError>,
    C: Codec,
{
    let conn_id = conn.id();
    let max_batch = config.max_batch.max(1);
    let mut batch = Vec::with_capacity(max_batch);

    // Fixed schedule, traffic or not: outbound data draws no pong, so it
    // cannot stand in for a ping.
    let mut keepalive = interval_at(
        Instant::now() + config.keepalive_interval,
        config.keepalive_interval,
    );
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = receiver.closed() => {
                tracing::debug!(%conn_id, "close requested");
                break;
            }
            next = receiver.recv() => {
                let Some(first) = next else { break };
                batch.push(first);
                while batch.len() < max_batch {
                    match receiver.try_recv() {
                        Some(envelope) => batch.push(envelope),
                        None => break,
                    }
                }

                let text = encode_lines(&codec, &batch);
                batch.clear();
                let text = match text {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(%conn_id, error = %e, "failed to encode batch");
                        continue;
                    }
                };

                match timeout(config.write_deadline, conn.send(&text)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::debug!(%conn_id, error = %e, "send failed");
                        break;
                    }
                    Err(_) => {
                        tracing::warn!(%conn_id, "write deadline exceeded");
                        break;
                    }
                }
            }
            _ = keepalive.tick() => {
                match timeout(config.write_deadline, conn.ping()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::debug!(%conn_id, error = %e, "ping failed");
                        break;
                    }
                    Err(_) => {
                        tracing::warn!(%conn_id, "write deadline exceeded on ping");
                        break;
                    }
                }
            }
        }
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
}
