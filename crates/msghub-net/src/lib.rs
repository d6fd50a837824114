//! TCP transport for msghub.
//!
//! [`TcpGateway`] accepts persistent client sessions and surfaces connection
//! and message callbacks; [`TcpClient`] maintains one session with automatic
//! reconnect. Both speak the length-prefixed frame codec directly on the
//! stream. The [`SessionRegistry`] tracks the connected `(id, sub_id)` pairs
//! for the gateway role.

pub mod client;
pub mod codec;
pub mod handle;
pub mod pool;
pub mod registry;
pub mod server;

pub use client::TcpClient;
pub use handle::ConnectionHandle;
pub use pool::ConnectionPool;
pub use registry::{SessionRecord, SessionRegistry};
pub use server::TcpGateway;
