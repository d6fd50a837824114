//! Insert-only store for persisted messages.

use sqlx::PgPool;
use tracing::debug;

use msghub_core::error::{AppError, ErrorKind};
use msghub_core::result::AppResult;

/// One row of the `messages` table, ready for insertion.
///
/// `content` is plaintext or base64 ciphertext depending on `is_encrypted`;
/// `created_at` is assigned by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// Publishing client id.
    pub id: String,
    /// Publishing client sub id.
    pub sub_id: String,
    /// Serialized publisher information JSON.
    pub publisher_info: String,
    /// Name of the server that handled the message.
    pub server_name: String,
    /// Message content, plaintext or base64 ciphertext.
    pub content: String,
    /// Whether `content` is encrypted.
    pub is_encrypted: bool,
}

/// Repository for the `messages` table.
#[derive(Debug, Clone)]
pub struct MessageStore {
    pool: PgPool,
}

impl MessageStore {
    /// Create a store over an established pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert one message row. Parameters are bound, never interpolated.
    pub async fn insert(&self, message: &StoredMessage) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO messages \
             (id, sub_id, publisher_info, server_name, message_content, is_encrypted) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&message.id)
        .bind(&message.sub_id)
        .bind(&message.publisher_info)
        .bind(&message.server_name)
        .bind(&message.content)
        .bind(message.is_encrypted)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to insert message", e)
        })?;

        debug!(
            id = %message.id,
            sub_id = %message.sub_id,
            encrypted = message.is_encrypted,
            "Message stored"
        );
        Ok(())
    }
}
