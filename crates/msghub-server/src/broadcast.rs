//! Broadcast fan-out: the gateway half of the broadcast loop.
//!
//! A High-priority job polls the broadcast slot every 100 ms. A non-empty
//! slot is repackaged as a `send_broadcast_message` command, fanned out to
//! every connected session, and the slot is reset to the empty string.
//! Messages the consumer wrote between two polls are overwritten and lost;
//! live broadcast, not durable delivery.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use msghub_cache::BroadcastSlot;
use msghub_core::error::AppError;
use msghub_core::result::AppResult;
use msghub_core::types::SessionKey;
use msghub_dispatch::{JobDispatcher, JobPriority};
use msghub_net::TcpGateway;
use msghub_protocol::Frame;

/// Cadence of the `check_global_message` job.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Repackage a slot payload `{id, sub_id, message}` as the broadcast
/// command sent to clients.
pub fn build_broadcast_frame(slot_json: &str) -> AppResult<String> {
    let value: Value = serde_json::from_str(slot_json)
        .map_err(|_| AppError::validation("Failed to parse message"))?;

    let object = value
        .as_object()
        .ok_or_else(|| AppError::validation("Failed to parse message"))?;

    let field = |name: &str| -> AppResult<&str> {
        object
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::validation("Failed to parse message"))
    };

    let broadcast = json!({
        "command": "send_broadcast_message",
        "message": {
            "id": field("id")?,
            "sub_id": field("sub_id")?,
            "data": field("message")?,
        },
    });

    Ok(broadcast.to_string())
}

/// One poll of the broadcast slot. Returns whether a message was fanned out.
///
/// An unparsable slot payload is cleared as well, so a bad write cannot wedge
/// the loop.
pub async fn poll_once<F, Fut>(slot: &BroadcastSlot, send: F) -> AppResult<bool>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = AppResult<()>>,
{
    let raw = match slot.read().await? {
        Some(raw) => raw,
        None => return Ok(false),
    };

    let payload = match build_broadcast_frame(&raw) {
        Ok(payload) => payload,
        Err(e) => {
            slot.clear().await?;
            return Err(e);
        }
    };

    send(payload).await?;
    slot.clear().await?;
    Ok(true)
}

/// Start the self-rescheduling `check_global_message` job.
pub fn spawn_poller(
    dispatcher: &JobDispatcher,
    slot: BroadcastSlot,
    gateway: Arc<TcpGateway>,
) -> AppResult<()> {
    dispatcher.spawn_ticker(
        JobPriority::High,
        POLL_INTERVAL,
        "check_global_message",
        move || {
            let slot = slot.clone();
            let gateway = Arc::clone(&gateway);
            async move {
                poll_once(&slot, |payload| {
                    let gateway = Arc::clone(&gateway);
                    async move {
                        gateway
                            .send(&SessionKey::broadcast(), Frame::text(payload))
                            .await
                    }
                })
                .await
                .map(|_| ())
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use msghub_cache::MemoryKvStore;

    use super::*;

    fn test_slot() -> BroadcastSlot {
        BroadcastSlot::new(Arc::new(MemoryKvStore::new()), "global_message")
    }

    #[test]
    fn test_build_broadcast_frame() {
        let payload =
            build_broadcast_frame(r#"{"id":"A","sub_id":"a1","message":"hi"}"#).unwrap();
        let value: Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(value["command"], "send_broadcast_message");
        assert_eq!(value["message"]["id"], "A");
        assert_eq!(value["message"]["sub_id"], "a1");
        assert_eq!(value["message"]["data"], "hi");
    }

    #[test]
    fn test_build_broadcast_frame_requires_string_fields() {
        for bad in [
            "not json",
            r#"["id"]"#,
            r#"{"sub_id":"a1","message":"hi"}"#,
            r#"{"id":"A","message":"hi"}"#,
            r#"{"id":"A","sub_id":"a1"}"#,
            r#"{"id":1,"sub_id":"a1","message":"hi"}"#,
        ] {
            let err = build_broadcast_frame(bad).unwrap_err();
            assert_eq!(err.message, "Failed to parse message", "input: {bad}");
        }
    }

    #[tokio::test]
    async fn test_poll_once_on_empty_slot_does_nothing() {
        let slot = test_slot();
        let sent = poll_once(&slot, |_payload| async { Ok(()) }).await.unwrap();
        assert!(!sent);
    }

    #[tokio::test]
    async fn test_poll_once_fans_out_and_clears() {
        let slot = test_slot();
        slot.seed(r#"{"id":"A","sub_id":"a1","message":"hi"}"#)
            .await
            .unwrap();

        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        let sent = poll_once(&slot, move |payload| async move {
            sink.lock().unwrap().push(payload);
            Ok(())
        })
        .await
        .unwrap();

        assert!(sent);
        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert!(captured[0].contains("send_broadcast_message"));

        // The slot holds the empty string before the next poll.
        assert_eq!(slot.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwritten_message_is_dropped() {
        let slot = test_slot();
        slot.seed(r#"{"id":"A","sub_id":"a1","message":"m1"}"#)
            .await
            .unwrap();
        slot.seed(r#"{"id":"A","sub_id":"a1","message":"m2"}"#)
            .await
            .unwrap();

        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        poll_once(&slot, move |payload| async move {
            sink.lock().unwrap().push(payload);
            Ok(())
        })
        .await
        .unwrap();

        // Exactly one fan-out, carrying the later write.
        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert!(captured[0].contains("m2"));
        assert!(!captured[0].contains("m1"));

        // Nothing left for the next poll.
        let again = poll_once(&slot, |_payload| async { Ok(()) }).await.unwrap();
        assert!(!again);
    }

    #[tokio::test]
    async fn test_bad_slot_payload_is_cleared() {
        let slot = test_slot();
        slot.seed("garbage").await.unwrap();

        let result = poll_once(&slot, |_payload| async { Ok(()) }).await;
        assert!(result.is_err());
        assert_eq!(slot.read().await.unwrap(), None);
    }
}
