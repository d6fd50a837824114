//! Wire frame codec and the command dispatch pipeline.
//!
//! Inbound bytes become handler invocations in four stages: framing (the
//! length-prefixed text ‖ binary codec), parsing (JSON object with a
//! top-level `"command"` string), dispatch (command registry lookup), and
//! execution (the matched handler wrapped in a Normal-priority job).

pub mod command;
pub mod frame;
pub mod parse;

pub use command::{CommandHandler, CommandMessage, CommandRegistry};
pub use frame::Frame;
pub use parse::{parse_command_text, push_parse_job};
