//! Single-shot lifetime expiry tasks for registered nodes.

use crate::registry::Registry;
use std::sync::Weak;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

const EXPIRY_TAG: &str = "Expiry:";

/// Arms one expiry deadline for a node.
///
/// The deadline is an absolute instant fixed by the caller at arm time, so a
/// late first poll of the task cannot push enforcement out. On fire the task
/// removes the node through the registry's expiry path, taking the registry
/// lock like any other caller; there is no liveness probe before enforcement.
/// Renewal aborts the task and arms a fresh one.
pub(crate) fn spawn_expiry_task(
    registry: Weak<Registry>,
    node_id: String,
    deadline: Instant,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep_until(deadline).await;
        let Some(registry) = registry.upgrade() else {
            return;
        };
        debug!("{EXPIRY_TAG} lifetime expired for node {node_id}, removing");
        registry.expire(&node_id).await;
    })
}
