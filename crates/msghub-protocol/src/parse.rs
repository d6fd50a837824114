//! Parse stage of the command pipeline.
//!
//! A parse job deserializes a frame's text part, validates the `"command"`
//! field, looks the command up in the registry, and pushes the matched
//! handler as a Normal-priority execute job. Parsing and execution are
//! separate jobs so a slow handler never blocks parsing.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use msghub_core::error::AppError;
use msghub_core::result::AppResult;
use msghub_dispatch::{Job, JobJournal, JobPool, JobPriority};

use crate::command::{CommandMessage, CommandRegistry};
use crate::frame::Frame;

/// Validate a frame text part and extract its command name.
pub fn parse_command_text(text: &str) -> AppResult<(String, Value)> {
    let value: Value = serde_json::from_str(text)
        .map_err(|_| AppError::validation("Failed to parse message"))?;

    if !value.is_object() {
        return Err(AppError::validation("Parsed message is not an object"));
    }

    let command = value
        .get("command")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            AppError::validation("Parsed message does not contain command string")
        })?
        .to_string();

    Ok((command, value))
}

/// Enqueue a parse job for an inbound frame.
///
/// The payload is journaled under `journal_id` before execution when a
/// journal is configured. On parse or dispatch failure the flow ends with
/// the job's error result; no handler runs.
pub fn push_parse_job<C>(
    pool: &Arc<JobPool>,
    registry: Arc<CommandRegistry<C>>,
    ctx: C,
    frame: Frame,
    journal: Option<Arc<JobJournal>>,
    journal_id: &str,
) -> AppResult<()>
where
    C: Send + Sync + 'static,
{
    if let Some(journal) = &journal {
        if let Err(e) = journal.save(journal_id, "message_parsing", &frame.encode()) {
            warn!(error = %e, "Failed to journal inbound frame");
        }
    }

    let execute_pool = Arc::clone(pool);
    let payload = frame.text.clone().into_bytes();

    let job = Job::with_payload(
        JobPriority::Normal,
        "message_parsing",
        payload,
        move || async move {
            let (command, raw) = parse_command_text(&frame.text)?;
            let handler = registry.get(&command)?;

            let binary = frame.has_binary().then(|| frame.binary.clone());
            let message = CommandMessage {
                command: command.clone(),
                raw,
                binary,
            };

            execute_pool.push(Job::new(
                JobPriority::Normal,
                format!("execute_{command}"),
                move || (*handler)(ctx, message),
            ))?;

            Ok(())
        },
    );

    pool.push(job)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use msghub_core::config::DispatchConfig;
    use msghub_dispatch::JobDispatcher;

    use super::*;

    #[test]
    fn test_parse_valid_command() {
        let (command, raw) =
            parse_command_text(r#"{"command":"request_client_status_update","x":1}"#).unwrap();
        assert_eq!(command, "request_client_status_update");
        assert_eq!(raw["x"], 1);
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_command_text("not json").unwrap_err();
        assert_eq!(err.message, "Failed to parse message");
    }

    #[test]
    fn test_parse_non_object() {
        let err = parse_command_text(r#"["command"]"#).unwrap_err();
        assert_eq!(err.message, "Parsed message is not an object");
    }

    #[test]
    fn test_parse_missing_command() {
        let err = parse_command_text(r#"{"foo":"bar"}"#).unwrap_err();
        assert_eq!(err.message, "Parsed message does not contain command string");
    }

    #[test]
    fn test_parse_non_string_command() {
        let err = parse_command_text(r#"{"command":42}"#).unwrap_err();
        assert_eq!(err.message, "Parsed message does not contain command string");
    }

    async fn settle(dispatcher: &JobDispatcher) {
        for _ in 0..100 {
            if dispatcher.job_pool().pending() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        // One extra turn for in-flight execute jobs.
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_pipeline_invokes_matched_handler() {
        let dispatcher = JobDispatcher::with_taxonomy(&DispatchConfig::default()).unwrap();
        dispatcher.start().unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry: CommandRegistry<()> = CommandRegistry::new();
        let seen = Arc::clone(&hits);
        registry.register("ping", move |_ctx, message| {
            let seen = Arc::clone(&seen);
            async move {
                assert_eq!(message.raw["value"], "x");
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        push_parse_job(
            &dispatcher.job_pool(),
            Arc::new(registry),
            (),
            Frame::text(r#"{"command":"ping","value":"x"}"#),
            None,
            "test",
        )
        .unwrap();

        settle(&dispatcher).await;
        dispatcher.stop(true).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_message_without_command_never_reaches_handler() {
        let dispatcher = JobDispatcher::with_taxonomy(&DispatchConfig::default()).unwrap();
        dispatcher.start().unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry: CommandRegistry<()> = CommandRegistry::new();
        let seen = Arc::clone(&hits);
        registry.register("ping", move |_ctx, _message| {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        push_parse_job(
            &dispatcher.job_pool(),
            Arc::new(registry),
            (),
            Frame::text(r#"{"foo":"bar"}"#),
            None,
            "test",
        )
        .unwrap();

        settle(&dispatcher).await;
        dispatcher.stop(true).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_binary_part_is_forwarded() {
        let dispatcher = JobDispatcher::with_taxonomy(&DispatchConfig::default()).unwrap();
        dispatcher.start().unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry: CommandRegistry<()> = CommandRegistry::new();
        let seen = Arc::clone(&hits);
        registry.register("upload", move |_ctx, message| {
            let seen = Arc::clone(&seen);
            async move {
                assert_eq!(message.binary.as_deref(), Some(&[1u8, 2, 3][..]));
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        push_parse_job(
            &dispatcher.job_pool(),
            Arc::new(registry),
            (),
            Frame::with_binary(r#"{"command":"upload"}"#, vec![1u8, 2, 3]),
            None,
            "test",
        )
        .unwrap();

        settle(&dispatcher).await;
        dispatcher.stop(true).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
