//! Reconnecting TCP client.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use msghub_core::error::AppError;
use msghub_core::result::AppResult;
use msghub_protocol::Frame;

use crate::codec;

/// Invoked when the session connects (`true`) or drops (`false`).
pub type ClientConnectionCallback = Arc<dyn Fn(bool) -> AppResult<()> + Send + Sync>;

/// Invoked for every server-originated frame.
pub type ClientMessageCallback = Arc<dyn Fn(Frame) -> AppResult<()> + Send + Sync>;

const SEND_QUEUE_DEPTH: usize = 64;

struct ClientShared {
    id: String,
    buffer_size: usize,
    sub_id: RwLock<String>,
    sender: tokio::sync::RwLock<Option<mpsc::Sender<Frame>>>,
    connection_callback: RwLock<Option<ClientConnectionCallback>>,
    message_callback: RwLock<Option<ClientMessageCallback>>,
}

/// TCP client that keeps one session to the gateway alive, reconnecting
/// with a fixed delay whenever the connection drops. Each attempt opens a
/// fresh `(id, sub_id)` session: the id is the client title, the sub_id a
/// new UUID sent in the handshake frame.
pub struct TcpClient {
    shared: Arc<ClientShared>,
    reconnect_interval: Duration,
    shutdown_tx: watch::Sender<bool>,
    run_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for TcpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpClient")
            .field("id", &self.shared.id)
            .finish()
    }
}

impl TcpClient {
    /// Create a client identified by `id`.
    pub fn new(id: impl Into<String>, buffer_size: usize, reconnect_interval_ms: u64) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(ClientShared {
                id: id.into(),
                buffer_size,
                sub_id: RwLock::new(String::new()),
                sender: tokio::sync::RwLock::new(None),
                connection_callback: RwLock::new(None),
                message_callback: RwLock::new(None),
            }),
            reconnect_interval: Duration::from_millis(reconnect_interval_ms),
            shutdown_tx,
            run_task: Mutex::new(None),
        }
    }

    /// The client id.
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// The sub id of the current session (empty when disconnected).
    pub fn sub_id(&self) -> String {
        self.shared
            .sub_id
            .read()
            .map(|sub_id| sub_id.clone())
            .unwrap_or_default()
    }

    /// Register the connection lifecycle callback. Must be set before `start`.
    pub fn on_connection<F>(&self, callback: F)
    where
        F: Fn(bool) -> AppResult<()> + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.shared.connection_callback.write() {
            *slot = Some(Arc::new(callback));
        }
    }

    /// Register the inbound message callback. Must be set before `start`.
    pub fn on_message<F>(&self, callback: F)
    where
        F: Fn(Frame) -> AppResult<()> + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.shared.message_callback.write() {
            *slot = Some(Arc::new(callback));
        }
    }

    /// Start the connect/reconnect loop against `addr` (`host:port`).
    pub fn start(&self, addr: impl Into<String>) {
        let addr = addr.into();
        let shared = Arc::clone(&self.shared);
        let reconnect = self.reconnect_interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let task = tokio::spawn(async move {
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }

                match TcpStream::connect(&addr).await {
                    Ok(stream) => {
                        if let Err(e) =
                            run_session(&shared, stream, &mut shutdown_rx).await
                        {
                            debug!(error = %e, "Session ended");
                        }
                    }
                    Err(e) => {
                        warn!(%addr, error = %e, "Connect failed");
                    }
                }

                if *shutdown_rx.borrow() {
                    break;
                }

                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = tokio::time::sleep(reconnect) => {}
                }
            }
        });

        if let Ok(mut slot) = self.run_task.lock() {
            *slot = Some(task);
        }
    }

    /// Send a frame over the current session.
    pub async fn send(&self, frame: Frame) -> AppResult<()> {
        let sender = self.shared.sender.read().await.clone();
        match sender {
            Some(sender) => sender
                .send(frame)
                .await
                .map_err(|e| AppError::network(format!("Send failed: {e}"))),
            None => Err(AppError::network("Client is not connected")),
        }
    }

    /// Stop the client and wait for the run loop to end.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);

        let task = match self.run_task.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(task) = task {
            let _ = task.await;
        }

        *self.shared.sender.write().await = None;
        info!("Client stopped");
    }
}

async fn run_session(
    shared: &Arc<ClientShared>,
    stream: TcpStream,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> AppResult<()> {
    let (mut read_half, mut write_half) = stream.into_split();

    let sub_id = Uuid::new_v4().to_string();
    if let Ok(mut slot) = shared.sub_id.write() {
        *slot = sub_id.clone();
    }

    let handshake = Frame::text(json!({ "id": shared.id, "sub_id": sub_id }).to_string());
    codec::write_frame(&mut write_half, &handshake).await?;

    let (tx, mut rx) = mpsc::channel::<Frame>(SEND_QUEUE_DEPTH);
    *shared.sender.write().await = Some(tx);

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if codec::write_frame(&mut write_half, &frame).await.is_err() {
                break;
            }
        }
    });

    info!(id = %shared.id, %sub_id, "Connected to server");
    notify_connection(shared, true);

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
                        if let Some(callback) = callback {
                            if let Err(e) = (*callback)(frame) {
                                warn!(error = %e, "Message callback failed");
                            }
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "Server connection lost");
                        break;
                    }
                }
            }
        }
    }

    *shared.sender.write().await = None;
    if let Ok(mut slot) = shared.sub_id.write() {
        slot.clear();
    }
    writer.abort();
    notify_connection(shared, false);

    Ok(())
}

fn notify_connection(shared: &ClientShared, connected: bool) {
    let callback = shared
        .connection_callback
        .read()
        .ok()
        .and_then(|slot| slot.clone());

    if let Some(callback) = callback {
        if let Err(e) = (*callback)(connected) {
            warn!(error = %e, "Connection callback failed");
        }
    }
}
