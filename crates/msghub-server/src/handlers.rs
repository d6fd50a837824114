//! Gateway command handlers.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use msghub_cache::SessionStatusStore;
use msghub_core::error::AppError;
use msghub_core::result::AppResult;
use msghub_core::types::SessionKey;
use msghub_net::{SessionRegistry, TcpGateway};
use msghub_protocol::{CommandMessage, CommandRegistry, Frame};
use msghub_queue::QueueEmitter;

/// Everything the gateway handlers need, shared behind one `Arc`.
pub struct HandlerDeps {
    /// Transport for replies and fan-out.
    pub gateway: Arc<TcpGateway>,
    /// Connected-session registry.
    pub registry: Arc<SessionRegistry>,
    /// Status store; absent when the key/value store is disabled.
    pub status: Option<SessionStatusStore>,
    /// Work-queue producer.
    pub emitter: Arc<dyn QueueEmitter>,
    /// Queue fed by `request_publish_message_queue`.
    pub queue_name: String,
}

/// Build the gateway's command registry.
pub fn build_registry(deps: Arc<HandlerDeps>) -> CommandRegistry<SessionKey> {
    let mut commands = CommandRegistry::new();

    let status_deps = Arc::clone(&deps);
    commands.register("request_client_status_update", move |key, message| {
        let deps = Arc::clone(&status_deps);
        async move { handle_status_update(&deps, key, message).await }
    });

    let publish_deps = Arc::clone(&deps);
    commands.register("request_publish_message_queue", move |key, message| {
        let deps = Arc::clone(&publish_deps);
        async move { handle_publish_message_queue(&deps, key, message).await }
    });

    commands
}

/// `request_client_status_update`: record the session's status payload under
/// `<id>::<sub_id>` with the configured TTL, then acknowledge.
async fn handle_status_update(
    deps: &HandlerDeps,
    key: SessionKey,
    message: CommandMessage,
) -> AppResult<()> {
    let payload = message.raw_text();
    info!(session = %key, "Received status update");

    if let Some(status) = &deps.status {
        status.set_status(&key, &payload).await?;
    }
    deps.registry.set_status(&key, "online", &payload);

    let reply = json!({
        "message": "received connection from Server",
        "command": "update_user_clinet_status",
    });
    deps.gateway.send(&key, Frame::text(reply.to_string())).await
}

/// `request_publish_message_queue`: validate the nested contents, enrich
/// with the session key and a millisecond timestamp, publish, acknowledge.
async fn handle_publish_message_queue(
    deps: &HandlerDeps,
    key: SessionKey,
    message: CommandMessage,
) -> AppResult<()> {
    let user_message = extract_publish_text(&message.raw)?;

    info!(session = %key, message = %user_message, "Publishing message to queue");

    let queue_message = build_queue_message(&key, &user_message, chrono::Utc::now().timestamp_millis());
    deps.emitter
        .publish(&deps.queue_name, &queue_message.to_string())
        .await?;

    let response = json!({
        "command": "response_publish_message_queue",
        "result": "success",
        "message": "Message published to queue successfully",
    });
    deps.gateway
        .send(&key, Frame::text(response.to_string()))
        .await
}

/// Validate `{contents: {message: str}}` and extract the message text.
pub fn extract_publish_text(raw: &Value) -> AppResult<String> {
    let contents = raw
        .get("contents")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            AppError::validation("Message does not contain valid 'contents' field")
        })?;

    let message = contents
        .get("message")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            AppError::validation("Contents does not contain valid 'message' field")
        })?;

    Ok(message.to_string())
}

/// The enriched message published to the work queue.
pub fn build_queue_message(key: &SessionKey, user_message: &str, timestamp_ms: i64) -> Value {
    json!({
        "client_id": key.id,
        "client_sub_id": key.sub_id,
        "message": user_message,
        "timestamp": timestamp_ms,
    })
}
