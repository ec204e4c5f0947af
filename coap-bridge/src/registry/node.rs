//! Table entries owned by the registry.

use std::collections::HashSet;
use tokio::task::JoinHandle;

/// One registered endpoint and its renewable lifetime state.
pub(crate) struct NodeEntry {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) domain: String,
    pub(crate) endpoint_type: Option<String>,
    pub(crate) context: String,
    pub(crate) lifetime: u64,
    pub(crate) location: String,
    /// Full registry paths of the resources this node currently offers.
    pub(crate) resources: HashSet<String>,
    pub(crate) expiry: Option<JoinHandle<()>>,
}

/// One addressable resource, back-referencing its owning node.
pub(crate) struct ResourceEntry {
    pub(crate) node_id: String,
    pub(crate) relative_path: String,
    pub(crate) resource_type: Option<String>,
    pub(crate) interface: Option<String>,
}
