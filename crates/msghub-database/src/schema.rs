//! Schema setup for the messages table.

use sqlx::PgPool;
use tracing::info;

use msghub_core::error::{AppError, ErrorKind};
use msghub_core::result::AppResult;

const CREATE_MESSAGES_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS messages (
    id              text NOT NULL,
    sub_id          text NOT NULL,
    publisher_info  text NOT NULL DEFAULT '{}',
    server_name     text NOT NULL,
    message_content text NOT NULL,
    is_encrypted    boolean NOT NULL DEFAULT FALSE,
    created_at      timestamptz NOT NULL DEFAULT NOW()
)";

/// Create the messages table when it does not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> AppResult<()> {
    sqlx::query(CREATE_MESSAGES_TABLE)
        .execute(pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to create messages table", e)
        })?;

    info!("Database schema ready");
    Ok(())
}
