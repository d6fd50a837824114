//! Client-side command handlers.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{info, warn};

use msghub_core::error::AppError;
use msghub_core::result::AppResult;
use msghub_dispatch::{Job, JobPool, JobPriority};
use msghub_net::TcpClient;
use msghub_protocol::{CommandRegistry, Frame};

/// Build the client's command registry.
pub fn build_registry(
    client: Arc<TcpClient>,
    pool: Arc<JobPool>,
    heartbeat_interval: Duration,
) -> CommandRegistry<()> {
    let mut commands = CommandRegistry::new();

    let heartbeat_client = Arc::clone(&client);
    let heartbeat_pool = Arc::clone(&pool);
    commands.register("update_user_clinet_status", move |_ctx, message| {
        let client = Arc::clone(&heartbeat_client);
        let pool = Arc::clone(&heartbeat_pool);
        async move {
            info!(raw = %message.raw_text(), "Status acknowledged by server");
            schedule_heartbeat(&pool, client, heartbeat_interval)
        }
    });

    commands.register("send_broadcast_message", |_ctx, message| async move {
        present_broadcast(&message.raw)
    });

    commands.register("response_publish_message_queue", |_ctx, message| async move {
        let result = message
            .raw
            .get("result")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(result, "Publish acknowledged by server");
        Ok(())
    });

    commands
}

/// The status-update request sent on connect and as the heartbeat.
pub fn build_status_request(id: &str, sub_id: &str) -> Frame {
    Frame::text(
        json!({
            "id": id,
            "sub_id": sub_id,
            "message": "received connection from Server",
            "command": "request_client_status_update",
        })
        .to_string(),
    )
}

/// Send the status-update request over the current session.
pub async fn send_status_request(client: &TcpClient) -> AppResult<()> {
    let frame = build_status_request(client.id(), &client.sub_id());
    client.send(frame).await
}

/// Schedule the next heartbeat after `delay`.
///
/// The waiting job runs at LongTerm priority so the delay never occupies a
/// Normal worker. A dropped connection just ends the chain; the next connect
/// restarts it.
pub fn schedule_heartbeat(
    pool: &Arc<JobPool>,
    client: Arc<TcpClient>,
    delay: Duration,
) -> AppResult<()> {
    pool.push(Job::new(
        JobPriority::LongTerm,
        "status_heartbeat",
        move || async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = send_status_request(&client).await {
                warn!(error = %e, "Heartbeat skipped");
            }
            Ok(())
        },
    ))
}

/// Display a received broadcast.
pub fn present_broadcast(raw: &Value) -> AppResult<()> {
    let message = raw
        .get("message")
        .and_then(Value::as_object)
        .ok_or_else(|| AppError::validation("Broadcast does not contain message object"))?;

    let field = |name: &str| message.get(name).and_then(Value::as_str).unwrap_or("");

    info!(
        from_id = field("id"),
        from_sub_id = field("sub_id"),
        data = field("data"),
        "Broadcast received"
    );
    Ok(())
}
