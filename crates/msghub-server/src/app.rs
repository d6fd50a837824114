//! Gateway role wiring and lifecycle.

use std::sync::Arc;

use tracing::info;

use msghub_cache::{BroadcastSlot, RedisClient, RedisKvStore, SessionStatusStore};
use msghub_core::config::GatewayConfig;
use msghub_core::kv::KvStore;
use msghub_core::result::AppResult;
use msghub_dispatch::{JobDispatcher, JobJournal};
use msghub_net::{SessionRegistry, TcpGateway};
use msghub_protocol::parse::push_parse_job;
use msghub_queue::{QueueEmitter, RedisWorkQueue};

use crate::broadcast;
use crate::handlers::{self, HandlerDeps};
use crate::snapshot;

/// Run the gateway until a shutdown signal arrives.
///
/// Startup order: dispatcher → key/value store (pre-clearing the broadcast
/// slot) → queue emitter → transport → periodic jobs. Any failure here is
/// fatal and surfaces as a non-zero exit.
pub async fn run(config: GatewayConfig) -> AppResult<()> {
    info!(title = %config.client_title, "Starting gateway server");

    let dispatcher = Arc::new(JobDispatcher::with_taxonomy(&config.dispatch)?);
    dispatcher.start()?;

    let registry = Arc::new(SessionRegistry::new());
    let gateway = Arc::new(TcpGateway::new(config.buffer_size));

    let mut slot = None;
    let mut status = None;
    if config.cache.use_redis {
        let client = RedisClient::connect(&config.cache).await?;
        let store: Arc<dyn KvStore> = Arc::new(RedisKvStore::new(client));

        let broadcast_slot = BroadcastSlot::new(Arc::clone(&store), &config.cache.global_message_key);
        broadcast_slot.clear().await?;
        slot = Some(broadcast_slot);

        status = Some(SessionStatusStore::new(store, config.cache.redis_ttl_sec));
    }

    let emitter: Arc<dyn QueueEmitter> = Arc::new(RedisWorkQueue::connect(&config.queue).await?);

    let commands = Arc::new(handlers::build_registry(Arc::new(HandlerDeps {
        gateway: Arc::clone(&gateway),
        registry: Arc::clone(&registry),
        status: status.clone(),
        emitter,
        queue_name: config.queue.consume_queue_name.clone(),
    })));

    let journal = (!config.dispatch.journal_root.is_empty())
        .then(|| Arc::new(JobJournal::new(&config.dispatch.journal_root)));

    let connection_registry = Arc::clone(&registry);
    gateway.on_connection(move |key, connected| {
        if connected {
            connection_registry.add(key)
        } else {
            connection_registry.remove(&key)
        }
    });

    let pool = dispatcher.job_pool();
    let message_commands = Arc::clone(&commands);
    let message_journal = journal.clone();
    gateway.on_message(move |key, frame| {
        if frame.text.is_empty() {
            return Err(msghub_core::AppError::validation("message is empty"));
        }
        let journal_id = key.id.clone();
        push_parse_job(
            &pool,
            Arc::clone(&message_commands),
            key,
            frame,
            message_journal.clone(),
            &journal_id,
        )
    });

    let addr = gateway.start(config.main_server_port).await?;
    info!(%addr, "Gateway server started");

    if let Some(slot) = slot {
        broadcast::spawn_poller(&dispatcher, slot, Arc::clone(&gateway))?;
    }
    if let Some(status) = status {
        snapshot::spawn_snapshot_job(&dispatcher, Arc::clone(&registry), status)?;
    }

    wait_for_shutdown().await;

    info!("Shutting down gateway server");
    gateway.stop().await;
    dispatcher.stop(false).await;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
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
