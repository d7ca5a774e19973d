//! `CardhubServer` builder and server loop.
//!
//! This is the entry point for running a Cardhub broker. It ties together
//! all the layers: transport → protocol → session → room.

use std::sync::Arc;
use std::time::Duration;

use cardhub_protocol::{Codec, JsonCodec};
use cardhub_room::{GameEngine, RoomConfig};
use cardhub_session::SessionConfig;
use cardhub_transport::{Incoming, Transport, WebSocketTransport};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::handler::{SharedHub, handle_connection};
use crate::{CardhubError, Hub, PumpConfig};

/// Builder for configuring and starting a Cardhub server.
///
/// # Example
///
/// ```rust,ignore
/// use cardhub::prelude::*;
///
/// let server = CardhubServer::<MyGame>::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct CardhubServerBuilder<E: GameEngine> {
    bind_addr: String,
    session_config: SessionConfig,
    room_config: RoomConfig,
    pump_config: PumpConfig,
    engine_config: E::Config,
}

impl<E: GameEngine> CardhubServerBuilder<E> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session_config: SessionConfig::default(),
            room_config: RoomConfig::default(),
            pump_config: PumpConfig::default(),
            engine_config: E::Config::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session retention and reaping configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the room configuration.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets the connection pump configuration.
    pub fn pump_config(mut self, config: PumpConfig) -> Self {
        self.pump_config = config;
        self
    }

    /// Sets the configuration every room's engine is created with.
    pub fn engine_config(mut self, config: E::Config) -> Self {
        self.engine_config = config;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<CardhubServer<E>, CardhubError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        tracing::info!(addr = %self.bind_addr, "listener bound");

        let reap_interval = self.session_config.reap_interval;
        let hub = Hub::new(self.session_config, self.room_config, self.engine_config);

        Ok(CardhubServer {
            transport,
            hub: Arc::new(Mutex::new(hub)),
            codec: JsonCodec,
            pump_config: self.pump_config,
            reap_interval,
        })
    }
}

impl<E: GameEngine> Default for CardhubServerBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Cardhub server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CardhubServer<E: GameEngine, C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    hub: SharedHub<E>,
    codec: C,
    pump_config: PumpConfig,
    reap_interval: Duration,
}

impl<E: GameEngine> CardhubServer<E> {
    /// Creates a new builder.
    pub fn builder() -> CardhubServerBuilder<E> {
        CardhubServerBuilder::new()
    }
}

impl<E, C> CardhubServer<E, C>
where
    E: GameEngine,
    C: Codec + Clone,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle to the hub, for inspection.
    pub fn hub(&self) -> SharedHub<E> {
        Arc::clone(&self.hub)
    }

    /// Runs the reaper and the accept loop.
    ///
    /// Every accepted connection gets its own task, which runs the
    /// WebSocket handshake and then the pump, so a peer that never
    /// finishes its upgrade holds up nobody else. Runs until the process
    /// is terminated.
    pub async fn run(mut self) -> Result<(), CardhubError> {
        tracing::info!("Cardhub server running");

        tokio::spawn(reap_loop(Arc::clone(&self.hub), self.reap_interval));

        loop {
            match self.transport.accept().await {
                Ok(incoming) => {
                    let hub = Arc::clone(&self.hub);
                    let codec = self.codec.clone();
                    let config = self.pump_config.clone();
                    tokio::spawn(async move {
                        let conn = match incoming.establish().await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::debug!(error = %e, "handshake failed");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, hub, codec, config).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Periodically removes abandoned rooms and sessions.
async fn reap_loop<E: GameEngine>(hub: SharedHub<E>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; there is nothing to reap yet.
    interval.tick().await;

    loop {
        interval.tick().await;
        let report = hub.lock().await.reap(std::time::Instant::now());
        tracing::debug!(
            rooms = report.rooms.len(),
            sessions = report.sessions.len(),
            "reaper pass done"
        );
    }
}
