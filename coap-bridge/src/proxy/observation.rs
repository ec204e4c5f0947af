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

//! Observation multiplexing: one upstream observation per resource, fanned
//! out to any number of bus-side subscribers.

use crate::error::BridgeError;
use crate::exposure::ExposureSink;
use crate::proxy::notify_loop::spawn_notification_loop;
use crate::registry::Registry;
use crate::transport::UpstreamTransport;
use bridge_message::{Method, RequestMessage, ResponseMessage};
use futures::future::join_all;
use response_cache::ResponseCache;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const MULTIPLEXER_TAG: &str = "ObservationMultiplexer:";
const MULTIPLEXER_FN_SUBSCRIBE_TAG: &str = "subscribe():";
const MULTIPLEXER_FN_UNSUBSCRIBE_TAG: &str = "unsubscribe():";
const MULTIPLEXER_FN_NOTIFY_TAG: &str = "on_notification():";

struct ObservedResource {
    context: String,
    /// The upstream observe request, reused as the cache identity for
    /// incoming notifications and as the base of the deregister request.
    request: RequestMessage,
    subscribers: HashSet<String>,
    /// Last representation seen, served to subscribers joining an
    /// already-established observation.
    last: ResponseMessage,
    run: Arc<AtomicBool>,
}

/// Reference-counted observation table.
///
/// The first subscriber for a resource establishes the single upstream
/// observation; later subscribers share it. The last departure deregisters
/// upstream. The table lock is held across both upstream exchanges — the
/// observe on establishment and the cancel on teardown — so establishment and
/// teardown serialize and the node cannot see a stale cancel after a fresh
/// observe. Both exchanges are bounded by the call timeout to keep the lock
/// hold time finite even against an unresponsive node.
pub struct ObservationMultiplexer {
    transport: Arc<dyn UpstreamTransport>,
    registry: Arc<Registry>,
    cache: Arc<ResponseCache>,
    exposure: Arc<dyn ExposureSink>,
    call_timeout: Duration,
    handle: Weak<ObservationMultiplexer>,
    observed: Mutex<HashMap<String, ObservedResource>>,
}

impl ObservationMultiplexer {
    pub fn new(
        transport: Arc<dyn UpstreamTransport>,
        registry: Arc<Registry>,
        cache: Arc<ResponseCache>,
        exposure: Arc<dyn ExposureSink>,
        call_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|handle| Self {
            transport,
            registry,
            cache,
            exposure,
            call_timeout,
            handle: handle.clone(),
            observed: Mutex::new(HashMap::new()),
        })
    }

    /// Adds a subscriber to the resource at `path`, establishing the upstream
    /// observation if it is the first one.
    ///
    /// Returns the current representation: the node's initial response for a
    /// fresh observation, the last notification otherwise. Re-subscribing an
    /// already-subscribed party is a no-op apart from the returned state.
    pub async fn subscribe(
        &self,
        subscriber: &str,
        path: &str,
    ) -> Result<ResponseMessage, BridgeError> {
        let mut observed = self.observed.lock().await;

        if let Some(observation) = observed.get_mut(path) {
            observation.subscribers.insert(subscriber.to_string());
            debug!(
                "{MULTIPLEXER_TAG}:{MULTIPLEXER_FN_SUBSCRIBE_TAG} {subscriber} joins existing observation of {path} ({} subscribers)",
                observation.subscribers.len()
            );
            return Ok(observation.last.clone());
        }

        let (context, relative) = self.registry.resolve(path).await?;
        let mut request = RequestMessage::new(Method::Get, &relative);
        request.authority = context.clone();
        request.observe = Some(0);

        let handle = match tokio::time::timeout(
            self.call_timeout,
            self.transport.observe(&context, request.clone()),
        )
        .await
        {
            Ok(Ok(handle)) => handle,
            Ok(Err(error)) => return Err(BridgeError::UpstreamError(error.to_string())),
            Err(_) => {
                warn!(
                    "{MULTIPLEXER_TAG}:{MULTIPLEXER_FN_SUBSCRIBE_TAG} no observe response for {path} within {:?}",
                    self.call_timeout
                );
                return Err(BridgeError::UpstreamTimeout);
            }
        };

        let mut initial = handle.initial;
        if !initial.is_success() || initial.observe.is_none() {
            warn!(
                "{MULTIPLEXER_TAG}:{MULTIPLEXER_FN_SUBSCRIBE_TAG} node declined observation of {path} ({})",
                initial.code
            );
            return Err(BridgeError::NotObservable(path.to_string()));
        }
        initial.arrived_at = Some(Instant::now());
        self.cache.store(&request, &initial).await;

        let run = Arc::new(AtomicBool::new(true));
        spawn_notification_loop(
            self.handle.clone(),
            path.to_string(),
            run.clone(),
            handle.notifications,
        );

        let mut subscribers = HashSet::new();
        subscribers.insert(subscriber.to_string());
        observed.insert(
            path.to_string(),
            ObservedResource {
                context,
                request,
                subscribers,
                last: initial.clone(),
                run,
            },
        );
        info!("{MULTIPLEXER_TAG}:{MULTIPLEXER_FN_SUBSCRIBE_TAG} observation of {path} established for {subscriber}");

        Ok(initial)
    }

    /// Drops a subscriber; the last departure deregisters upstream.
    ///
    /// The table lock stays held across the deregistration so a concurrent
    /// first subscriber cannot establish a fresh observation that the node
    /// then sees cancelled by the stale deregister.
    pub async fn unsubscribe(&self, subscriber: &str, path: &str) -> Result<(), BridgeError> {
        let mut observed = self.observed.lock().await;
        let Some(observation) = observed.get_mut(path) else {
            return Err(BridgeError::NotFound(format!("no observation of {path}")));
        };
        observation.subscribers.remove(subscriber);
        if !observation.subscribers.is_empty() {
            debug!(
                "{MULTIPLEXER_TAG}:{MULTIPLEXER_FN_UNSUBSCRIBE_TAG} {subscriber} leaves {path} ({} subscribers remain)",
                observation.subscribers.len()
            );
            return Ok(());
        }
        let Some(observation) = observed.remove(path) else {
            return Ok(());
        };
        observation.run.store(false, Ordering::SeqCst);

        info!(
            "{MULTIPLEXER_TAG}:{MULTIPLEXER_FN_UNSUBSCRIBE_TAG} last subscriber left {path}, deregistering upstream"
        );
        if let Err(error) = self.deregister_upstream(&observation).await {
            warn!(
                "{MULTIPLEXER_TAG}:{MULTIPLEXER_FN_UNSUBSCRIBE_TAG} deregistration for {path} failed: {error}"
            );
        }
        Ok(())
    }

    /// Tears down the observation of a resource that left the registry.
    ///
    /// Called from the registry's removal cascade; a deregistration attempt is
    /// still made since the node may only have dropped the resource. As in
    /// [`ObservationMultiplexer::unsubscribe`], the lock covers the exchange.
    pub async fn drop_resource(&self, path: &str) {
        let mut observed = self.observed.lock().await;
        let Some(observation) = observed.remove(path) else {
            return;
        };
        observation.run.store(false, Ordering::SeqCst);
        info!("{MULTIPLEXER_TAG} resource {path} left the registry, dropping its observation");

        if let Err(error) = self.deregister_upstream(&observation).await {
            debug!("{MULTIPLEXER_TAG} deregistration for {path} failed: {error}");
        }
    }

    /// One bounded observe-deregister exchange for a torn-down observation.
    async fn deregister_upstream(&self, observation: &ObservedResource) -> Result<(), BridgeError> {
        let mut deregister = observation.request.clone();
        deregister.observe = Some(1);
        match tokio::time::timeout(
            self.call_timeout,
            self.transport.cancel_observe(&observation.context, deregister),
        )
        .await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(error)) => Err(BridgeError::UpstreamError(error.to_string())),
            Err(_) => Err(BridgeError::UpstreamTimeout),
        }
    }

    /// Feeds one upstream notification into the cache and fans it out.
    ///
    /// Each subscriber is delivered to independently; a failure is logged and
    /// does not affect the others or the subscription itself.
    pub(crate) async fn on_notification(&self, path: &str, mut response: ResponseMessage) {
        response.arrived_at = Some(Instant::now());

        let (request, subscribers) = {
            let mut observed = self.observed.lock().await;
            let Some(observation) = observed.get_mut(path) else {
                debug!(
                    "{MULTIPLEXER_TAG}:{MULTIPLEXER_FN_NOTIFY_TAG} notification for dropped observation of {path}"
                );
                return;
            };
            observation.last = response.clone();
            let subscribers: Vec<String> = observation.subscribers.iter().cloned().collect();
            (observation.request.clone(), subscribers)
        };

        self.cache.store(&request, &response).await;

        let deliveries = subscribers.iter().map(|subscriber| {
            let response = &response;
            async move {
                (
                    subscriber.clone(),
                    self.exposure.notify(subscriber, path, response).await,
                )
            }
        });
        for (subscriber, outcome) in join_all(deliveries).await {
            if let Err(error) = outcome {
                warn!(
                    "{MULTIPLEXER_TAG}:{MULTIPLEXER_FN_NOTIFY_TAG} delivery to {subscriber} for {path} failed: {error}"
                );
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn subscriber_count(&self, path: &str) -> usize {
        self.observed
            .lock()
            .await
            .get(path)
            .map(|observation| observation.subscribers.len())
            .unwrap_or(0)
    }
}
