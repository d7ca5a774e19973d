//! The outbound side of a connection, as seen by everyone except its pump.
//!
//! Each connection pump owns an [`OutboxReceiver`]. Sessions (and through
//! them the registry) hold the matching [`Outbox`]: a cheap, cloneable
//! handle that can enqueue envelopes or ask the pump to close.

use std::sync::Arc;

use cardhub_protocol::Envelope;
use cardhub_transport::ConnectionId;
use tokio::sync::{Notify, mpsc};

/// Creates a bounded outbound queue for connection `id`.
pub fn outbox(id: ConnectionId, capacity: usize) -> (Outbox, OutboxReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let close = Arc::new(Notify::new());
    (
        Outbox {
            id,
            tx,
            close: Arc::clone(&close),
        },
        OutboxReceiver { rx, close },
    )
}

/// Result of handing an envelope to an [`Outbox`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The envelope is queued for the writer.
    Queued,
    /// The queue was full and the envelope was dropped.
    Dropped,
    /// The writer is gone.
    Closed,
}

/// Sending half of a connection's outbound queue.
///
/// Overflow policy: [`deliver`](Self::deliver) never waits. When the queue
/// is full the envelope is dropped and a warning is logged. Producers call
/// this while holding the registry lock, so one slow client must not stall
/// every other connection.
#[derive(Debug, Clone)]
pub struct Outbox {
    id: ConnectionId,
    tx: mpsc::Sender<Envelope>,
    close: Arc<Notify>,
}

impl Outbox {
    /// The connection this outbox feeds.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues an envelope for the connection's writer.
    pub fn deliver(&self, envelope: Envelope) -> Delivery {
        match self.tx.try_send(envelope) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(envelope)) => {
                tracing::warn!(
                    conn_id = %self.id,
                    action = %envelope.action,
                    "outbound queue full, dropping envelope"
                );
                Delivery::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(conn_id = %self.id, "outbound queue closed");
                Delivery::Closed
            }
        }
    }

    /// Asks the writer to send a close frame and stop.
    ///
    /// Works even when the queue is full; the signal is kept until the
    /// writer next looks for it.
    pub fn close(&self) {
        self.close.notify_one();
    }

    /// Returns `true` once the writer has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of a connection's outbound queue, owned by the writer.
#[derive(Debug)]
pub struct OutboxReceiver {
    rx: mpsc::Receiver<Envelope>,
    close: Arc<Notify>,
}

impl OutboxReceiver {
    /// Waits for the next envelope. `None` once every [`Outbox`] is gone.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Takes an already-queued envelope without waiting.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }

    /// Completes when [`Outbox::close`] has been called.
    ///
    /// The returned future does not borrow the receiver, so it can be
    /// raced against [`recv`](Self::recv).
    pub fn closed(&self) -> impl Future<Output = ()> + Send + use<> {
        let close = Arc::clone(&self.close);
        async move { close.notified().await }
    }
}
