//! Periodic session-registry snapshot persistence.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use msghub_cache::SessionStatusStore;
use msghub_core::result::AppResult;
use msghub_dispatch::{JobDispatcher, JobPriority};
use msghub_net::SessionRegistry;

/// Cadence of the snapshot job.
pub const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(1);

/// Serialize the registry snapshot as `[{id, sub_id, status}]`, ordered for
/// stable output.
pub fn serialize_snapshot(registry: &SessionRegistry) -> String {
    let mut sessions: Vec<_> = registry.snapshot().into_iter().collect();
    sessions.sort_by(|(a, _), (b, _)| (&a.id, &a.sub_id).cmp(&(&b.id, &b.sub_id)));

    let entries: Vec<Value> = sessions
        .into_iter()
        .map(|(key, record)| {
            json!({
                "id": key.id,
                "sub_id": key.sub_id,
                "status": record.status,
            })
        })
        .collect();

    Value::Array(entries).to_string()
}

/// Start the Low-priority job feeding the snapshot to the status store.
pub fn spawn_snapshot_job(
    dispatcher: &JobDispatcher,
    registry: Arc<SessionRegistry>,
    status: SessionStatusStore,
) -> AppResult<()> {
    dispatcher.spawn_ticker(
        JobPriority::Low,
        SNAPSHOT_INTERVAL,
        "session_snapshot",
        move || {
            let registry = Arc::clone(&registry);
            let status = status.clone();
            async move {
                let snapshot = serialize_snapshot(&registry);
                status.store_snapshot(&snapshot).await
            }
        },
    )
}
