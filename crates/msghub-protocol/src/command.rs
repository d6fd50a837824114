//! Command registry: name → handler dispatch.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use msghub_core::error::AppError;
use msghub_core::result::AppResult;

/// A parsed command handed to a handler.
#[derive(Debug, Clone)]
pub struct CommandMessage {
    /// The top-level `"command"` value.
    pub command: String,
    /// The full parsed JSON object.
    pub raw: Value,
    /// The frame's binary part, when present.
    pub binary: Option<Bytes>,
}

impl CommandMessage {
    /// The raw JSON re-serialized, for handlers that forward it verbatim.
    pub fn raw_text(&self) -> String {
        self.raw.to_string()
    }
}

/// Boxed future returned by a command handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = AppResult<()>> + Send>>;

/// A registered command handler. `C` is the direction context: the session
/// key on the server side, unit on the client side.
pub type CommandHandler<C> = Arc<dyn Fn(C, CommandMessage) -> HandlerFuture + Send + Sync>;

/// Mapping from command name to handler.
///
/// Built at startup and read-only thereafter; processes share it behind an
/// `Arc` for the process lifetime.
pub struct CommandRegistry<C> {
    handlers: HashMap<String, CommandHandler<C>>,
}

impl<C> CommandRegistry<C> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a command name.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(C, CommandMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        self.handlers.insert(
            name.into(),
            Arc::new(move |ctx, message| -> HandlerFuture { Box::pin(handler(ctx, message)) }),
        );
    }

    /// Look up a handler by command name.
    pub fn get(&self, command: &str) -> AppResult<CommandHandler<C>> {
        self.handlers
            .get(command)
            .cloned()
            .ok_or_else(|| AppError::validation("command is not found"))
    }

    /// Whether a command is registered.
    pub fn contains(&self, command: &str) -> bool {
        self.handlers.contains_key(command)
    }

    /// Registered command names.
    pub fn names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}

impl<C> Default for CommandRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for CommandRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.handlers.len())
            .finish()
    }
}
