//! Durable storage for consumed broadcast messages.
//!
//! The [`PersistWorker`] validates a consumed message, optionally encrypts
//! its content, and inserts one row into the `messages` table. It runs at
//! Low priority so persistence never pre-empts broadcast fan-out.

pub mod connection;
pub mod message_store;
pub mod persist;
pub mod schema;

pub use connection::DatabasePool;
pub use message_store::{MessageStore, StoredMessage};
pub use persist::PersistWorker;
