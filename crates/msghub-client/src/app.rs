//! Client role wiring and lifecycle.

use std::sync::Arc;

use tracing::info;

use msghub_core::config::ClientConfig;
use msghub_core::result::AppResult;
use msghub_dispatch::{Job, JobDispatcher, JobJournal, JobPriority};
use msghub_net::TcpClient;
use msghub_protocol::parse::push_parse_job;

use crate::handlers;

/// Run the client until a shutdown signal arrives.
pub async fn run(config: ClientConfig) -> AppResult<()> {
    info!(title = %config.client_title, "Starting user client");

    let dispatcher = Arc::new(JobDispatcher::with_taxonomy(&config.dispatch)?);
    dispatcher.start()?;

    let client = Arc::new(TcpClient::new(
        config.client_title.clone(),
        config.buffer_size,
        config.reconnect_interval_ms,
    ));

    let commands = Arc::new(handlers::build_registry(
        Arc::clone(&client),
        dispatcher.job_pool(),
        std::time::Duration::from_millis(config.heartbeat_interval_ms),
    ));

    let journal = (!config.dispatch.journal_root.is_empty())
        .then(|| Arc::new(JobJournal::new(&config.dispatch.journal_root)));

    // On connect, announce ourselves with the status-update request.
    let announce_pool = dispatcher.job_pool();
    let announce_client = Arc::clone(&client);
    client.on_connection(move |connected| {
        info!(connected, "Connection state changed");
        if !connected {
            return Ok(());
        }
        let client = Arc::clone(&announce_client);
        announce_pool.push(Job::new(
            JobPriority::Normal,
            "announce_status",
            move || async move { handlers::send_status_request(&client).await },
        ))
    });

    // Server-originated frames go through the shared parse pipeline.
    let message_pool = dispatcher.job_pool();
    let message_commands = Arc::clone(&commands);
    let journal_id = config.client_title.clone();
    client.on_message(move |frame| {
        push_parse_job(
            &message_pool,
            Arc::clone(&message_commands),
            (),
            frame,
            journal.clone(),
            &journal_id,
        )
    });

    client.start(format!(
        "{}:{}",
        config.main_server_ip, config.main_server_port
    ));

    wait_for_shutdown().await;

    info!("Shutting down user client");
    client.stop().await;
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
