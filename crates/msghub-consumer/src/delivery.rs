//! Validation and normalization of consumed queue messages.

use serde_json::{json, Value};

use msghub_core::error::AppError;
use msghub_core::result::AppResult;

/// Validate a delivery and produce the JSON written into the broadcast slot.
///
/// A delivery already shaped as `{id, sub_id, message}` is forwarded whole.
/// The gateway publishes enriched messages as `{client_id, client_sub_id,
/// message, timestamp}`; those are normalized down to the slot shape.
/// Everything else is rejected.
pub fn normalize_delivery(raw: &str) -> AppResult<String> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|_| AppError::validation("Failed to parse message"))?;

    let object = value
        .as_object()
        .ok_or_else(|| AppError::validation("Failed to parse message"))?;

    let string_field = |name: &str| -> Option<&str> { object.get(name).and_then(Value::as_str) };

    let message = string_field("message")
        .ok_or_else(|| AppError::validation("Failed to parse message"))?;

    if let (Some(_), Some(_)) = (string_field("id"), string_field("sub_id")) {
        return Ok(raw.to_string());
    }

    if let (Some(id), Some(sub_id)) = (string_field("client_id"), string_field("client_sub_id")) {
        return Ok(json!({ "id": id, "sub_id": sub_id, "message": message }).to_string());
    }

    Err(AppError::validation("Failed to parse message"))
}

/// Build the persistence-worker input for a normalized slot message.
pub fn build_persist_input(slot_json: &str) -> AppResult<String> {
    let value: Value = serde_json::from_str(slot_json)
        .map_err(|_| AppError::validation("Failed to parse message"))?;

    Ok(json!({
        "id": value["id"],
        "sub_id": value["sub_id"],
        "publisher_information": {},
        "message": { "content": value["message"] },
    })
    .to_string())
}
