//! The persistence worker: validate, optionally encrypt, store.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};

use msghub_core::crypto::ContentCipher;
use msghub_core::error::AppError;
use msghub_core::result::AppResult;
use msghub_dispatch::{Job, JobPriority};

use crate::message_store::{MessageStore, StoredMessage};

/// Default server name when the message omits one.
const DEFAULT_SERVER_NAME: &str = "MainServer";

/// Validated persistence input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistInput {
    /// Publishing client id.
    pub id: String,
    /// Publishing client sub id.
    pub sub_id: String,
    /// Serialized publisher information JSON (`{}` when absent).
    pub publisher_info: String,
    /// Server name (`"MainServer"` when absent).
    pub server_name: String,
    /// Plaintext message content.
    pub content: String,
}

impl PersistInput {
    /// Parse and validate the persistence input contract:
    ///
    /// ```json
    /// { "id": str, "sub_id": str,
    ///   "publisher_information": object (optional),
    ///   "message": { "server_name": str (optional), "content": str } }
    /// ```
    pub fn parse(message_json: &str) -> AppResult<Self> {
        let value: Value = serde_json::from_str(message_json)
            .map_err(|e| AppError::validation(format!("JSON parsing error: {e}")))?;

        let object = value
            .as_object()
            .ok_or_else(|| AppError::validation("Message is not a valid JSON object"))?;

        let id = object
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::validation("Missing 'id' field"))?
            .to_string();

        let sub_id = object
            .get("sub_id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::validation("Missing 'sub_id' field"))?
            .to_string();

        let publisher_info = object
            .get("publisher_information")
            .map(Value::to_string)
            .unwrap_or_else(|| "{}".to_string());

        let message = object
            .get("message")
            .ok_or_else(|| AppError::validation("Missing 'message' field"))?;
        let message = message
            .as_object()
            .ok_or_else(|| AppError::validation("'message' field is not an object"))?;

        let server_name = message
            .get("server_name")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SERVER_NAME)
            .to_string();

        let content = message
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::validation("Missing 'content' field in message"))?
            .to_string();

        Ok(Self {
            id,
            sub_id,
            publisher_info,
            server_name,
            content,
        })
    }
}

/// Encrypt content when a cipher is configured.
///
/// Returns the stored content and the encrypted flag. Cipher failure falls
/// back to plaintext storage; losing confidentiality is preferred over
/// losing the message.
pub fn prepare_content(cipher: Option<&ContentCipher>, plaintext: &str) -> (String, bool) {
    match cipher {
        Some(cipher) => match cipher.encrypt(plaintext) {
            Ok(ciphertext) => (ciphertext, true),
            Err(e) => {
                error!(error = %e, "Encryption failed, storing plain text");
                (plaintext.to_string(), false)
            }
        },
        None => (plaintext.to_string(), false),
    }
}

/// Validates and stores consumed broadcast messages.
#[derive(Debug)]
pub struct PersistWorker {
    store: MessageStore,
    cipher: Option<ContentCipher>,
}

impl PersistWorker {
    /// Create a worker. `cipher` enables encryption of stored content.
    pub fn new(store: MessageStore, cipher: Option<ContentCipher>) -> Self {
        Self { store, cipher }
    }

    /// Validate, encrypt, and insert one consumed message.
    pub async fn persist(&self, message_json: &str) -> AppResult<()> {
        let input = PersistInput::parse(message_json)?;

        let (content, is_encrypted) = prepare_content(self.cipher.as_ref(), &input.content);

        self.store
            .insert(&StoredMessage {
                id: input.id.clone(),
                sub_id: input.sub_id.clone(),
                publisher_info: input.publisher_info,
                server_name: input.server_name,
                content,
                is_encrypted,
            })
            .await?;

        info!(
            id = %input.id,
            sub_id = %input.sub_id,
            encrypted = is_encrypted,
            "Message persisted"
        );
        Ok(())
    }

    /// Build a Low-priority job persisting `message_json`.
    pub fn job(worker: Arc<Self>, message_json: String) -> Job {
        Job::with_payload(
            JobPriority::Low,
            "persist_message",
            message_json.clone().into_bytes(),
            move || async move { worker.persist(&message_json).await },
        )
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    use msghub_core::crypto::{KEY_SIZE, NONCE_SIZE};

    use super::*;

    fn valid_input() -> &'static str {
        r#"{
            "id": "A", "sub_id": "a1",
            "publisher_information": {"ip": "10.0.0.1"},
            "message": {"server_name": "EdgeServer", "content": "hello"}
        }"#
    }

    #[test]
    fn test_parse_full_input() {
        let input = PersistInput::parse(valid_input()).unwrap();
        assert_eq!(input.id, "A");
        assert_eq!(input.sub_id, "a1");
        assert_eq!(input.server_name, "EdgeServer");
        assert_eq!(input.content, "hello");
        assert!(input.publisher_info.contains("10.0.0.1"));
    }

    #[test]
    fn test_parse_applies_defaults() {
        let input =
            PersistInput::parse(r#"{"id":"A","sub_id":"a1","message":{"content":"hi"}}"#).unwrap();
        assert_eq!(input.publisher_info, "{}");
        assert_eq!(input.server_name, "MainServer");
    }

    #[test]
    fn test_parse_missing_fields() {
        let cases = [
            (r#"{"sub_id":"a1","message":{"content":"x"}}"#, "Missing 'id' field"),
            (r#"{"id":"A","message":{"content":"x"}}"#, "Missing 'sub_id' field"),
            (r#"{"id":"A","sub_id":"a1"}"#, "Missing 'message' field"),
            (
                r#"{"id":"A","sub_id":"a1","message":"flat"}"#,
                "'message' field is not an object",
            ),
            (
                r#"{"id":"A","sub_id":"a1","message":{}}"#,
                "Missing 'content' field in message",
            ),
        ];

        for (json, expected) in cases {
            let err = PersistInput::parse(json).unwrap_err();
            assert_eq!(err.message, expected, "input: {json}");
        }
    }

    #[test]
    fn test_parse_non_object() {
        let err = PersistInput::parse("[1,2]").unwrap_err();
        assert_eq!(err.message, "Message is not a valid JSON object");
    }

    fn test_cipher() -> ContentCipher {
        ContentCipher::new(
            &BASE64.encode([0x42u8; KEY_SIZE]),
            &BASE64.encode([0x24u8; NONCE_SIZE]),
        )
        .unwrap()
    }

    #[test]
    fn test_prepare_content_encrypts_and_roundtrips() {
        let cipher = test_cipher();
        let (content, is_encrypted) = prepare_content(Some(&cipher), "hello");

        assert!(is_encrypted);
        // Encrypted content must decode as valid base64 and decrypt back.
        assert!(BASE64.decode(&content).is_ok());
        assert_eq!(cipher.decrypt(&content).unwrap(), "hello");
    }

    #[test]
    fn test_prepare_content_without_cipher_is_plaintext() {
        let (content, is_encrypted) = prepare_content(None, "hello");
        assert!(!is_encrypted);
        assert_eq!(content, "hello");
    }
}
