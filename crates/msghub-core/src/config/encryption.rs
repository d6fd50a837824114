//! Stored-content encryption configuration.

use serde::{Deserialize, Serialize};

/// Settings for the content cipher used by the persistence path.
///
/// Key and IV are base64-encoded (32 and 12 bytes respectively). When
/// `encrypt_mode` is enabled but the material is unusable, content falls back
/// to plaintext storage with `is_encrypted = false`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Whether stored message content is encrypted.
    #[serde(default)]
    pub encrypt_mode: bool,
    /// Base64-encoded symmetric key.
    #[serde(default)]
    pub encryption_key: String,
    /// Base64-encoded nonce.
    #[serde(default)]
    pub encryption_iv: String,
}
