//! Per-connection send handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use msghub_core::error::AppError;
use msghub_core::result::AppResult;
use msghub_core::types::SessionKey;
use msghub_protocol::Frame;

/// Handle for sending frames to a single connected session.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// The session this connection belongs to.
    pub key: SessionKey,
    /// Channel feeding the connection's writer task.
    tx: mpsc::Sender<Frame>,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Whether the connection is still alive.
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a handle for a freshly established connection.
    pub fn new(key: SessionKey, tx: mpsc::Sender<Frame>) -> Self {
        Self {
            key,
            tx,
            connected_at: Utc::now(),
            alive: AtomicBool::new(true),
        }
    }

    /// Queue a frame for this connection.
    pub async fn send(&self, frame: Frame) -> AppResult<()> {
        if !self.is_alive() {
            return Err(AppError::network("Connection is closed"));
        }

        self.tx
            .send(frame)
            .await
            .map_err(|e| AppError::network(format!("Send failed: {e}")))
    }

    /// Whether the connection is still alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// Mark the connection as closed.
    pub fn mark_closed(&self) {
        self.alive.store(false, Ordering::Relaxed);
    }
}
