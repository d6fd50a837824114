//! Core building blocks shared by every msghub process.
//!
//! This crate carries the unified error type, the configuration schemas for
//! the three deployable binaries, the key/value store boundary, the content
//! cipher used by the persistence path, and logging initialization.

pub mod config;
pub mod crypto;
pub mod error;
pub mod kv;
pub mod logging;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
pub use types::SessionKey;
