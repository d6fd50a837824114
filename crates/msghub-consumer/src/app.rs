//! Consumer role wiring and lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use msghub_cache::{BroadcastSlot, RedisClient, RedisKvStore};
use msghub_core::config::ConsumerConfig;
use msghub_core::crypto::ContentCipher;
use msghub_core::error::AppError;
use msghub_core::kv::KvStore;
use msghub_core::result::AppResult;
use msghub_database::{schema, DatabasePool, MessageStore, PersistWorker};
use msghub_dispatch::{Job, JobDispatcher, JobPool, JobPriority};
use msghub_queue::{QueueConsumer, RedisWorkQueue};

use crate::delivery::{build_persist_input, normalize_delivery};

/// Run the consumer until a shutdown signal arrives.
pub async fn run(config: ConsumerConfig) -> AppResult<()> {
    info!(title = %config.client_title, "Starting queue consumer");

    let dispatcher = Arc::new(JobDispatcher::with_taxonomy(&config.dispatch)?);
    dispatcher.start()?;

    if !config.cache.use_redis {
        return Err(AppError::configuration("Redis is not used"));
    }

    let client = RedisClient::connect(&config.cache).await?;
    let store: Arc<dyn KvStore> = Arc::new(RedisKvStore::new(client));
    let slot = BroadcastSlot::new(store, &config.cache.global_message_key);

    let consumer: Arc<dyn QueueConsumer> = Arc::new(RedisWorkQueue::connect(&config.queue).await?);

    let persist = if config.database.use_database {
        let pool = DatabasePool::connect(&config.database).await?;
        schema::ensure_schema(pool.pool()).await?;

        let cipher = if config.encryption.encrypt_mode {
            match ContentCipher::new(
                &config.encryption.encryption_key,
                &config.encryption.encryption_iv,
            ) {
                Ok(cipher) => Some(cipher),
                Err(e) => {
                    error!(error = %e, "Unusable encryption material; storing plain text");
                    None
                }
            }
        } else {
            None
        };

        Some(Arc::new(PersistWorker::new(
            MessageStore::new(pool.pool().clone()),
            cipher,
        )))
    } else {
        None
    };

    spawn_consume_loop(
        &dispatcher,
        consumer,
        config.queue.consume_queue_name.clone(),
        slot,
        persist,
    )?;

    wait_for_shutdown().await;

    info!("Shutting down queue consumer");
    dispatcher.stop(false).await;
    Ok(())
}

/// Handle one delivery: validate, seed the broadcast slot, and enqueue the
/// persistence job when a database is configured.
pub async fn process_delivery(
    slot: &BroadcastSlot,
    pool: &Arc<JobPool>,
    persist: Option<&Arc<PersistWorker>>,
    raw: &str,
) -> AppResult<()> {
    let normalized = normalize_delivery(raw)?;

    slot.seed(&normalized).await?;
    debug!(slot = %slot.key(), "Broadcast slot seeded");

    if let Some(worker) = persist {
        let input = build_persist_input(&normalized)?;
        pool.push(PersistWorker::job(Arc::clone(worker), input))?;
    }

    Ok(())
}

/// Start the LongTerm job draining the queue until the dispatcher stops.
fn spawn_consume_loop(
    dispatcher: &JobDispatcher,
    consumer: Arc<dyn QueueConsumer>,
    queue_name: String,
    slot: BroadcastSlot,
    persist: Option<Arc<PersistWorker>>,
) -> AppResult<()> {
    let pool = dispatcher.job_pool();

    dispatcher.push(Job::new(
        JobPriority::LongTerm,
        "consume_queue",
        move || async move {
            info!(queue = %queue_name, "Consume loop started");

            loop {
                if pool.lock() {
                    break;
                }

                match consumer.next(&queue_name).await {
                    Ok(Some(raw)) => {
                        debug!(queue = %queue_name, message = %raw, "Consumed message");
                        if let Err(e) =
                            process_delivery(&slot, &pool, persist.as_ref(), &raw).await
                        {
                            warn!(error = %e, message = %raw, "Delivery rejected");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!(error = %e, "Queue receive failed");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }

            info!("Consume loop ended");
            Ok(())
        },
    ))
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("SIGINT received"),
        _ = sigterm.recv() => info!("SIGTERM received"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use msghub_cache::MemoryKvStore;
    use msghub_queue::{MemoryWorkQueue, QueueConsumer as _, QueueEmitter};

    use super::*;

    fn test_slot() -> BroadcastSlot {
        BroadcastSlot::new(Arc::new(MemoryKvStore::new()), "global_message")
    }

    #[tokio::test]
    async fn test_valid_delivery_seeds_slot() {
        let slot = test_slot();
        let pool = Arc::new(JobPool::new());

        process_delivery(&slot, &pool, None, r#"{"id":"A","sub_id":"a1","message":"hi"}"#)
            .await
            .unwrap();

        assert_eq!(
            slot.read().await.unwrap().as_deref(),
            Some(r#"{"id":"A","sub_id":"a1","message":"hi"}"#)
        );
    }

    #[tokio::test]
    async fn test_invalid_delivery_leaves_slot_untouched() {
        let slot = test_slot();
        let pool = Arc::new(JobPool::new());

        let result = process_delivery(&slot, &pool, None, r#"{"nope":true}"#).await;
        assert!(result.is_err());
        assert_eq!(slot.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_enriched_queue_message_reaches_slot_normalized() {
        // The gateway publishes the enriched shape; the slot receives the
        // normalized one.
        let queue = MemoryWorkQueue::new();
        queue
            .publish(
                "main_server_queue",
                r#"{"client_id":"A","client_sub_id":"a1","message":"hi","timestamp":5}"#,
            )
            .await
            .unwrap();

        let raw = queue.next("main_server_queue").await.unwrap().unwrap();

        let slot = test_slot();
        let pool = Arc::new(JobPool::new());
        process_delivery(&slot, &pool, None, &raw).await.unwrap();

        let seeded = slot.read().await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&seeded).unwrap();
        assert_eq!(value["id"], "A");
        assert_eq!(value["sub_id"], "a1");
        assert_eq!(value["message"], "hi");
    }

    #[tokio::test]
    async fn test_consumer_overwrite_keeps_latest() {
        let slot = test_slot();
        let pool = Arc::new(JobPool::new());

        process_delivery(&slot, &pool, None, r#"{"id":"A","sub_id":"a1","message":"m1"}"#)
            .await
            .unwrap();
        process_delivery(&slot, &pool, None, r#"{"id":"A","sub_id":"a1","message":"m2"}"#)
            .await
            .unwrap();

        let seeded = slot.read().await.unwrap().unwrap();
        assert!(seeded.contains("m2"));
        assert!(!seeded.contains("m1"));
    }
}
