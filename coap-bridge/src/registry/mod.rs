/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Node/resource registry and lifetime bookkeeping.
//!
//! The registry owns the (name, domain) -> node table and the full-path ->
//! resource table. A registration payload is authoritative for the node's
//! current resource set; re-registration diffs against the previous set and
//! emits one event per added or removed resource. Each node carries one
//! single-shot expiry task re-armed on every registration or update.

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use async_trait::async_trait;
use bridge_message::ResourceLink;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

mod expiry;
mod node;

use expiry::spawn_expiry_task;
use node::{NodeEntry, ResourceEntry};

const REGISTRY_TAG: &str = "Registry:";
const REGISTRY_FN_REGISTER_TAG: &str = "register():";
const REGISTRY_FN_UPDATE_TAG: &str = "update():";
const REGISTRY_FN_REMOVE_TAG: &str = "remove():";

/// Inputs of a registration call from the constrained network.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Declared endpoint name; required.
    pub endpoint: String,
    /// Defaults to `"local"`.
    pub domain: Option<String>,
    pub endpoint_type: Option<String>,
    /// Seconds; defaults to the configured default lifetime, clamped to the
    /// configured floor.
    pub lifetime: Option<u64>,
    /// Network context used to reach the node; defaults to the caller origin.
    pub context: Option<String>,
    /// The node's current resource set; authoritative on every registration.
    pub links: Vec<ResourceLink>,
}

/// Result of a registration call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub node_id: String,
    /// Registry-assigned location for subsequent update/delete calls.
    pub location: String,
    /// `true` when the (name, domain) pair was new.
    pub created: bool,
}

/// Resource lifecycle events emitted by the registry as its table changes.
#[async_trait]
pub trait ResourceEvents: Send + Sync {
    async fn resource_added(
        &self,
        path: &str,
        resource_type: Option<&str>,
        interface: Option<&str>,
    );

    async fn resource_removed(&self, path: &str);
}

struct RegistryTable {
    nodes: HashMap<String, NodeEntry>,
    by_name: HashMap<(String, String), String>,
    resources: HashMap<String, ResourceEntry>,
}

/// The node/resource directory of the bridge.
pub struct Registry {
    default_lifetime: u64,
    minimum_lifetime: u64,
    expiry_grace: Duration,
    handle: Weak<Registry>,
    events: Arc<dyn ResourceEvents>,
    table: Mutex<RegistryTable>,
}

impl Registry {
    pub fn new(config: &BridgeConfig, events: Arc<dyn ResourceEvents>) -> Arc<Self> {
        Arc::new_cyclic(|handle| Self {
            default_lifetime: config.default_lifetime,
            minimum_lifetime: config.minimum_lifetime,
            expiry_grace: config.expiry_grace,
            handle: handle.clone(),
            events,
            table: Mutex::new(RegistryTable {
                nodes: HashMap::new(),
                by_name: HashMap::new(),
                resources: HashMap::new(),
            }),
        })
    }

    /// Registers or refreshes an endpoint and replaces its resource set.
    ///
    /// The diff against the previous set is emitted as one event per added or
    /// removed resource, after the table lock is released. The expiry deadline
    /// is re-armed to `lifetime + grace`.
    pub async fn register(
        &self,
        request: RegistrationRequest,
        origin: &str,
    ) -> Result<RegistrationOutcome, BridgeError> {
        if request.endpoint.trim().is_empty() {
            warn!("{REGISTRY_TAG}:{REGISTRY_FN_REGISTER_TAG} missing endpoint name, origin: {origin}");
            return Err(BridgeError::BadRequest(
                "missing endpoint name (?ep)".to_string(),
            ));
        }
        let domain = request.domain.clone().unwrap_or_else(|| "local".to_string());
        let mut lifetime = request.lifetime.unwrap_or(self.default_lifetime);
        if lifetime < self.minimum_lifetime {
            info!(
                "{REGISTRY_TAG}:{REGISTRY_FN_REGISTER_TAG} enforcing minimal lifetime of {}s (was {lifetime}s)",
                self.minimum_lifetime
            );
            lifetime = self.minimum_lifetime;
        }
        let context = request
            .context
            .clone()
            .filter(|context| !context.is_empty())
            .unwrap_or_else(|| origin.to_string());
        if context.is_empty() {
            return Err(BridgeError::BadRequest(
                "no context supplied and no caller origin".to_string(),
            ));
        }

        let mut added: Vec<(String, Option<String>, Option<String>)> = Vec::new();
        let mut removed: Vec<String> = Vec::new();

        let outcome = {
            let mut table = self.table.lock().await;

            let key = (request.endpoint.clone(), domain.clone());
            let (node_id, created) = match table.by_name.get(&key) {
                Some(node_id) => (node_id.clone(), false),
                None => {
                    let node_id = Uuid::new_v4().simple().to_string();
                    let location = format!("/rd/{node_id}");
                    table.nodes.insert(
                        node_id.clone(),
                        NodeEntry {
                            id: node_id.clone(),
                            name: request.endpoint.clone(),
                            domain: domain.clone(),
                            endpoint_type: None,
                            context: String::new(),
                            lifetime: 0,
                            location,
                            resources: HashSet::new(),
                            expiry: None,
                        },
                    );
                    table.by_name.insert(key, node_id.clone());
                    (node_id, true)
                }
            };

            let Some(node) = table.nodes.get_mut(&node_id) else {
                return Err(BridgeError::NotFound(format!("no node {node_id}")));
            };
            node.endpoint_type = request.endpoint_type.clone();
            node.context = context.clone();
            node.lifetime = lifetime;
            let location = node.location.clone();

            let mut desired: HashMap<String, ResourceEntry> = HashMap::new();
            for link in &request.links {
                let relative = normalize_path(&link.path);
                let full = format!("{location}{relative}");
                desired.insert(
                    full,
                    ResourceEntry {
                        node_id: node_id.clone(),
                        relative_path: relative,
                        resource_type: link.resource_type.clone(),
                        interface: link.interface.clone(),
                    },
                );
            }

            let previous = std::mem::take(&mut node.resources);
            node.resources = desired.keys().cloned().collect();
            self.arm_expiry(node);

            for path in &previous {
                if !desired.contains_key(path) {
                    table.resources.remove(path);
                    removed.push(path.clone());
                }
            }
            for (path, entry) in desired {
                if !previous.contains(&path) {
                    added.push((
                        path.clone(),
                        entry.resource_type.clone(),
                        entry.interface.clone(),
                    ));
                }
                table.resources.insert(path, entry);
            }
            removed.sort();
            added.sort_by(|a, b| a.0.cmp(&b.0));

            info!(
                "{REGISTRY_TAG}:{REGISTRY_FN_REGISTER_TAG} {} endpoint {} ({context})",
                if created { "adding" } else { "updating" },
                request.endpoint
            );

            RegistrationOutcome {
                node_id,
                location,
                created,
            }
        };

        for path in &removed {
            self.events.resource_removed(path).await;
        }
        for (path, resource_type, interface) in &added {
            self.events
                .resource_added(path, resource_type.as_deref(), interface.as_deref())
                .await;
        }

        Ok(outcome)
    }

    /// Refreshes only lifetime and/or context and resets the expiry deadline.
    ///
    /// Returns `false` when the node does not exist.
    pub async fn update(
        &self,
        node_id: &str,
        lifetime: Option<u64>,
        context: Option<String>,
    ) -> bool {
        let mut table = self.table.lock().await;
        let Some(node) = table.nodes.get_mut(node_id) else {
            warn!("{REGISTRY_TAG}:{REGISTRY_FN_UPDATE_TAG} no node {node_id}");
            return false;
        };

        if let Some(requested) = lifetime {
            if requested < self.minimum_lifetime {
                info!(
                    "{REGISTRY_TAG}:{REGISTRY_FN_UPDATE_TAG} enforcing minimal lifetime of {}s (was {requested}s)",
                    self.minimum_lifetime
                );
                node.lifetime = self.minimum_lifetime;
            } else {
                node.lifetime = requested;
            }
        }
        if let Some(context) = context.filter(|context| !context.is_empty()) {
            node.context = context;
        }

        debug!(
            "{REGISTRY_TAG}:{REGISTRY_FN_UPDATE_TAG} updating endpoint {} ({})",
            node.name, node.context
        );
        self.arm_expiry(node);
        true
    }

    /// Removes a node, cancelling its timer and cascading to its resources.
    pub async fn remove(&self, node_id: &str) -> Result<(), BridgeError> {
        self.remove_with(node_id, true).await
    }

    /// Removal path taken by a fired expiry task.
    ///
    /// Must not abort the timer handle: the caller is that very task, and
    /// aborting it would cancel the removal cascade at its next await point.
    pub(crate) async fn expire(&self, node_id: &str) {
        let _ = self.remove_with(node_id, false).await;
    }

    async fn remove_with(&self, node_id: &str, abort_timer: bool) -> Result<(), BridgeError> {
        let removed_paths = {
            let mut table = self.table.lock().await;
            let Some(mut node) = table.nodes.remove(node_id) else {
                return Err(BridgeError::NotFound(format!("no node {node_id}")));
            };
            let timer = node.expiry.take();
            if abort_timer {
                if let Some(handle) = timer {
                    handle.abort();
                }
            }
            table.by_name.remove(&(node.name.clone(), node.domain.clone()));

            let mut paths: Vec<String> = node.resources.iter().cloned().collect();
            paths.sort();
            for path in &paths {
                table.resources.remove(path);
            }

            info!(
                "{REGISTRY_TAG}:{REGISTRY_FN_REMOVE_TAG} removing endpoint {} ({})",
                node.name, node.context
            );
            paths
        };

        for path in &removed_paths {
            self.events.resource_removed(path).await;
        }
        Ok(())
    }

    /// Resolves a registry path to the owning node's context and the
    /// resource's path within that node.
    pub async fn resolve(&self, path: &str) -> Result<(String, String), BridgeError> {
        let table = self.table.lock().await;
        let Some(resource) = table.resources.get(path) else {
            return Err(BridgeError::NotFound(format!("unknown resource {path}")));
        };
        let Some(node) = table.nodes.get(&resource.node_id) else {
            return Err(BridgeError::NotFound(format!(
                "resource {path} has no owning node"
            )));
        };
        Ok((node.context.clone(), resource.relative_path.clone()))
    }

    fn arm_expiry(&self, node: &mut NodeEntry) {
        if let Some(handle) = node.expiry.take() {
            handle.abort();
        }
        // Fix the absolute deadline here so it is anchored at arm time, not
        // at the spawned task's first poll.
        let deadline = Instant::now() + Duration::from_secs(node.lifetime) + self.expiry_grace;
        node.expiry = Some(spawn_expiry_task(
            self.handle.clone(),
            node.id.clone(),
            deadline,
        ));
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
