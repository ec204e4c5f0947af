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

//! The assembled mediation core.

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::exposure::ExposureSink;
use crate::proxy::{Dispatcher, ObservationMultiplexer};
use crate::registry::{RegistrationOutcome, RegistrationRequest, Registry, ResourceEvents};
use crate::transport::UpstreamTransport;
use async_trait::async_trait;
use bridge_message::{RequestMessage, ResponseMessage};
use response_cache::{CacheStats, ResponseCache};
use std::sync::{Arc, OnceLock};
use tracing::warn;

const BRIDGE_TAG: &str = "CoapBridge:";

/// Fans registry lifecycle events out to the exposure sink and, for removals,
/// to the observation multiplexer first so a vanished resource's observation
/// is torn down before the bus side learns the resource is gone.
///
/// The multiplexer slot is filled once during assembly; the registry never
/// emits before `CoapBridge::new` returns, so an empty slot only means the
/// cascade is still being wired.
struct ExposureEvents {
    exposure: Arc<dyn ExposureSink>,
    observations: OnceLock<Arc<ObservationMultiplexer>>,
}

#[async_trait]
impl ResourceEvents for ExposureEvents {
    async fn resource_added(
        &self,
        path: &str,
        resource_type: Option<&str>,
        interface: Option<&str>,
    ) {
        self.exposure
            .on_resource_added(path, resource_type, interface)
            .await;
    }

    async fn resource_removed(&self, path: &str) {
        if let Some(observations) = self.observations.get() {
            observations.drop_resource(path).await;
        }
        self.exposure.on_resource_removed(path).await;
    }
}

/// Entry point tying registry, dispatcher, cache and observation multiplexer
/// together behind the two pluggable boundaries: the upstream transport toward
/// constrained-network nodes and the exposure sink toward the bus side.
pub struct CoapBridge {
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    observations: Arc<ObservationMultiplexer>,
    cache: Arc<ResponseCache>,
}

impl CoapBridge {
    pub fn new(
        config: BridgeConfig,
        transport: Arc<dyn UpstreamTransport>,
        exposure: Arc<dyn ExposureSink>,
    ) -> Self {
        let events = Arc::new(ExposureEvents {
            exposure: exposure.clone(),
            observations: OnceLock::new(),
        });
        let registry = Registry::new(&config, events.clone());
        let cache = Arc::new(ResponseCache::new(config.cache.clone()));
        let observations = ObservationMultiplexer::new(
            transport.clone(),
            registry.clone(),
            cache.clone(),
            exposure,
            config.call_timeout,
        );
        if events.observations.set(observations.clone()).is_err() {
            warn!("{BRIDGE_TAG} removal cascade already wired");
        }
        let dispatcher = Dispatcher::new(transport, registry.clone(), cache.clone(), config.call_timeout);

        Self {
            registry,
            dispatcher,
            observations,
            cache,
        }
    }

    /// Registers or refreshes a constrained-network endpoint.
    pub async fn register_endpoint(
        &self,
        request: RegistrationRequest,
        origin: &str,
    ) -> Result<RegistrationOutcome, BridgeError> {
        self.registry.register(request, origin).await
    }

    /// Refreshes an endpoint's lifetime and/or context by node id.
    pub async fn update_endpoint(
        &self,
        node_id: &str,
        lifetime: Option<u64>,
        context: Option<String>,
    ) -> Result<(), BridgeError> {
        if self.registry.update(node_id, lifetime, context).await {
            Ok(())
        } else {
            Err(BridgeError::NotFound(format!("no node {node_id}")))
        }
    }

    /// Removes an endpoint and everything that hangs off it.
    pub async fn remove_endpoint(&self, node_id: &str) -> Result<(), BridgeError> {
        self.registry.remove(node_id).await
    }

    /// Performs one request/response exchange with the resource at `path`.
    pub async fn call(
        &self,
        path: &str,
        request: RequestMessage,
    ) -> Result<ResponseMessage, BridgeError> {
        self.dispatcher.call(path, request).await
    }

    /// Subscribes a bus-side party to change notifications for `path`.
    pub async fn subscribe(
        &self,
        subscriber: &str,
        path: &str,
    ) -> Result<ResponseMessage, BridgeError> {
        self.observations.subscribe(subscriber, path).await
    }

    /// Withdraws a bus-side party's subscription to `path`.
    pub async fn unsubscribe(&self, subscriber: &str, path: &str) -> Result<(), BridgeError> {
        self.observations.unsubscribe(subscriber, path).await
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn cache_enabled(&self) -> bool {
        self.cache.is_enabled().await
    }

    pub async fn set_cache_enabled(&self, enabled: bool) {
        self.cache.set_enabled(enabled).await;
    }

    pub async fn flush_cache(&self) {
        self.cache.flush().await;
    }
}
