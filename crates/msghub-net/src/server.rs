//! The gateway's TCP server.
//!
//! Session establishment: the first frame on a new connection is a handshake
//! whose text part is `{"id": ..., "sub_id": ...}`. After that, every frame
//! is handed to the message callback. Sending to the empty session key
//! fans out to every live connection.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use msghub_core::error::AppError;
use msghub_core::result::AppResult;
use msghub_core::types::SessionKey;
use msghub_protocol::Frame;

use crate::codec;
use crate::handle::ConnectionHandle;
use crate::pool::ConnectionPool;

/// Invoked when a session connects (`true`) or disconnects (`false`).
pub type ConnectionCallback = Arc<dyn Fn(SessionKey, bool) -> AppResult<()> + Send + Sync>;

/// Invoked for every frame received after the handshake.
pub type MessageCallback = Arc<dyn Fn(SessionKey, Frame) -> AppResult<()> + Send + Sync>;

const SEND_QUEUE_DEPTH: usize = 64;

struct GatewayShared {
    pool: ConnectionPool,
    buffer_size: usize,
    connection_callback: RwLock<Option<ConnectionCallback>>,
    message_callback: RwLock<Option<MessageCallback>>,
}

/// TCP server holding persistent client sessions.
pub struct TcpGateway {
    shared: Arc<GatewayShared>,
    shutdown_tx: watch::Sender<bool>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for TcpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpGateway")
            .field("connections", &self.shared.pool.len())
            .finish()
    }
}

impl TcpGateway {
    /// Create a gateway with the given per-part frame size limit.
    pub fn new(buffer_size: usize) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(GatewayShared {
                pool: ConnectionPool::new(),
                buffer_size,
                connection_callback: RwLock::new(None),
                message_callback: RwLock::new(None),
            }),
            shutdown_tx,
            accept_task: Mutex::new(None),
        }
    }

    /// Register the connection lifecycle callback. Must be set before `start`.
    pub fn on_connection<F>(&self, callback: F)
    where
        F: Fn(SessionKey, bool) -> AppResult<()> + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.shared.connection_callback.write() {
            *slot = Some(Arc::new(callback));
        }
    }

    /// Register the inbound message callback. Must be set before `start`.
    pub fn on_message<F>(&self, callback: F)
    where
        F: Fn(SessionKey, Frame) -> AppResult<()> + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.shared.message_callback.write() {
            *slot = Some(Arc::new(callback));
        }
    }

    /// Bind and start accepting connections. Returns the bound address.
    pub async fn start(&self, port: u16) -> AppResult<SocketAddr> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|e| AppError::network(format!("Failed to bind port {port}: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| AppError::network(format!("Failed to read local address: {e}")))?;

        info!(%addr, "Gateway listening");

        let shared = Arc::clone(&self.shared);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "Accepted connection");
                            let shared = Arc::clone(&shared);
                            let shutdown_rx = shutdown_rx.clone();
                            tokio::spawn(async move {
                                if let Err(e) =
                                    run_connection(shared, stream, shutdown_rx).await
                                {
                                    debug!(error = %e, "Connection ended with error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Accept failed");
                            break;
                        }
                    },
                }
            }
        });

        if let Ok(mut slot) = self.accept_task.lock() {
            *slot = Some(task);
        }

        Ok(addr)
    }

    /// Send a frame to one session, or to all sessions when the key is the
    /// empty broadcast key.
    pub async fn send(&self, target: &SessionKey, frame: Frame) -> AppResult<()> {
        if target.is_broadcast() {
            for handle in self.shared.pool.all() {
                if let Err(e) = handle.send(frame.clone()).await {
                    warn!(session = %handle.key, error = %e, "Fan-out send failed");
                }
            }
            return Ok(());
        }

        let handle = self
            .shared
            .pool
            .get(target)
            .ok_or_else(|| AppError::session("Client not exist"))?;
        handle.send(frame).await
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.shared.pool.len()
    }

    /// Stop accepting and tear down all connections.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);

        let task = match self.accept_task.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(task) = task {
            let _ = task.await;
        }

        for handle in self.shared.pool.all() {
            handle.mark_closed();
            self.shared.pool.remove(&handle.key);
        }

        info!("Gateway stopped");
    }
}

async fn run_connection(
    shared: Arc<GatewayShared>,
    stream: TcpStream,
    mut shutdown_rx: watch::Receiver<bool>,
) -> AppResult<()> {
    let (mut read_half, mut write_half) = stream.into_split();

    let key = read_handshake(&mut read_half, shared.buffer_size).await?;

    let (tx, mut rx) = mpsc::channel::<Frame>(SEND_QUEUE_DEPTH);
    let handle = Arc::new(ConnectionHandle::new(key.clone(), tx));
    shared.pool.add(Arc::clone(&handle));

    notify_connection(&shared, &key, true);
    info!(session = %key, "Received connection: connected");

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = codec::write_frame(&mut write_half, &frame).await {
                debug!(error = %e, "Writer ended");
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            frame = codec::read_frame(&mut read_half, shared.buffer_size) => {
                match frame {
                    Ok(frame) => {
                        let callback = shared
                            .message_callback
                            .read()
                            .ok()
                            .and_then(|slot| slot.clone());
                        match callback {
                            Some(callback) => {
                                if let Err(e) = (*callback)(key.clone(), frame) {
                                    warn!(session = %key, error = %e, "Message callback failed");
                                }
                            }
                            None => warn!(session = %key, "No message callback registered"),
                        }
                    }
                    Err(e) => {
                        debug!(session = %key, error = %e, "Read loop ended");
                        break;
                    }
                }
            }
        }
    }

    handle.mark_closed();
    shared.pool.remove(&key);
    writer.abort();

    notify_connection(&shared, &key, false);
    info!(session = %key, "Received connection: disconnected");

    Ok(())
}

async fn read_handshake(
    read_half: &mut OwnedReadHalf,
    buffer_size: usize,
) -> AppResult<SessionKey> {
    let frame = codec::read_frame(read_half, buffer_size).await?;

    let value: Value = serde_json::from_str(&frame.text)
        .map_err(|_| AppError::validation("Failed to parse handshake"))?;

    let id = value
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::validation("Handshake does not contain id string"))?;

    let sub_id = value
        .get("sub_id")
        .and_then(Value::as_str)
        .filter(|sub_id| !sub_id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Ok(SessionKey::new(id, sub_id))
}

fn notify_connection(shared: &GatewayShared, key: &SessionKey, connected: bool) {
    let callback = shared
        .connection_callback
        .read()
        .ok()
        .and_then(|slot| slot.clone());

    if let Some(callback) = callback {
        if let Err(e) = (*callback)(key.clone(), connected) {
            warn!(session = %key, error = %e, "Connection callback failed");
        }
    }
}
