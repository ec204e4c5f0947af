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

//! End-to-end flow over the assembled bridge with mock boundaries.

use async_trait::async_trait;
use bridge_message::{
    MediaType, Method, RequestMessage, ResourceLink, ResponseCode, ResponseMessage,
};
use coap_bridge::{
    BridgeConfig, CoapBridge, DeliveryError, ExposureSink, ObserveHandle, RegistrationRequest,
    TransportError, UpstreamTransport,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::mpsc::{channel, Sender};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Constrained-network side: serves a mutable value and supports observation.
struct SensorNode {
    value: StdMutex<Vec<u8>>,
    request_count: StdMutex<u32>,
    cancel_count: StdMutex<u32>,
    senders: StdMutex<HashMap<String, Sender<ResponseMessage>>>,
}

impl SensorNode {
    fn new(value: &str) -> Self {
        Self {
            value: StdMutex::new(value.as_bytes().to_vec()),
            request_count: StdMutex::new(0),
            cancel_count: StdMutex::new(0),
            senders: StdMutex::new(HashMap::new()),
        }
    }

    fn request_count(&self) -> u32 {
        *self.request_count.lock().expect("lock request count")
    }

    fn cancel_count(&self) -> u32 {
        *self.cancel_count.lock().expect("lock cancel count")
    }

    fn current(&self) -> ResponseMessage {
        ResponseMessage::new(ResponseCode::Content)
            .with_payload(
                MediaType::TextPlain,
                self.value.lock().expect("lock value").clone(),
            )
            .with_max_age(30)
    }

    async fn publish(&self, value: &str) {
        *self.value.lock().expect("lock value") = value.as_bytes().to_vec();
        let senders: Vec<Sender<ResponseMessage>> = self
            .senders
            .lock()
            .expect("lock senders")
            .values()
            .cloned()
            .collect();
        for sender in senders {
            let mut notification = self.current();
            notification.observe = Some(1);
            sender.send(notification).await.expect("push notification");
        }
    }
}

#[async_trait]
impl UpstreamTransport for SensorNode {
    async fn send_request(
        &self,
        _context: &str,
        request: RequestMessage,
    ) -> Result<ResponseMessage, TransportError> {
        *self.request_count.lock().expect("lock request count") += 1;
        match request.method {
            Method::Get => Ok(self.current()),
            Method::Put | Method::Post => {
                *self.value.lock().expect("lock value") = request.payload;
                Ok(ResponseMessage::new(ResponseCode::Changed))
            }
            Method::Delete => Ok(ResponseMessage::new(ResponseCode::Deleted)),
        }
    }

    async fn observe(
        &self,
        _context: &str,
        request: RequestMessage,
    ) -> Result<ObserveHandle, TransportError> {
        let (sender, notifications) = channel(8);
        self.senders
            .lock()
            .expect("lock senders")
            .insert(request.path.clone(), sender);

        let mut initial = self.current();
        initial.observe = Some(0);
        Ok(ObserveHandle {
            initial,
            notifications,
        })
    }

    async fn cancel_observe(
        &self,
        _context: &str,
        request: RequestMessage,
    ) -> Result<ResponseMessage, TransportError> {
        *self.cancel_count.lock().expect("lock cancel count") += 1;
        self.senders
            .lock()
            .expect("lock senders")
            .remove(&request.path);
        Ok(self.current())
    }
}

/// Bus side: records exposure changes and delivered notifications.
#[derive(Default)]
struct BusSide {
    exposed: StdMutex<Vec<String>>,
    removed: StdMutex<Vec<String>>,
    notified: StdMutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl ExposureSink for BusSide {
    async fn on_resource_added(
        &self,
        path: &str,
        _resource_type: Option<&str>,
        _interface: Option<&str>,
    ) {
        self.exposed.lock().expect("lock exposed").push(path.to_string());
    }

    async fn on_resource_removed(&self, path: &str) {
        self.removed.lock().expect("lock removed").push(path.to_string());
    }

    async fn notify(
        &self,
        subscriber: &str,
        _path: &str,
        response: &ResponseMessage,
    ) -> Result<(), DeliveryError> {
        self.notified
            .lock()
            .expect("lock notified")
            .push((subscriber.to_string(), response.payload.clone()));
        Ok(())
    }
}

fn registration(endpoint: &str, paths: &[&str]) -> RegistrationRequest {
    RegistrationRequest {
        endpoint: endpoint.to_string(),
        lifetime: Some(3600),
        links: paths
            .iter()
            .map(|path| {
                let mut link = ResourceLink::new(path);
                link.resource_type = Some("sensor".to_string());
                link
            })
            .collect(),
        ..RegistrationRequest::default()
    }
}

async fn settle() {
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
}

#[tokio::test]
async fn registered_resources_are_called_through_the_cache() {
    init_tracing();
    let node = Arc::new(SensorNode::new("21.5"));
    let bus = Arc::new(BusSide::default());
    let bridge = CoapBridge::new(BridgeConfig::default(), node.clone(), bus.clone());

    let outcome = bridge
        .register_endpoint(registration("sensor1", &["/temp", "/hum"]), "node-a:5683")
        .await
        .expect("registration");
    assert!(outcome.created);
    assert_eq!(bus.exposed.lock().expect("lock exposed").len(), 2);

    let path = format!("{}/temp", outcome.location);

    // Second read is served from the cache.
    let first = bridge
        .call(&path, RequestMessage::new(Method::Get, ""))
        .await
        .expect("first read");
    assert_eq!(first.payload, b"21.5");
    bridge
        .call(&path, RequestMessage::new(Method::Get, ""))
        .await
        .expect("cached read");
    assert_eq!(node.request_count(), 1);

    // A write invalidates; the next read goes upstream again.
    let mut write = RequestMessage::new(Method::Put, "");
    write.content_format = Some(MediaType::TextPlain);
    write.payload = b"25.0".to_vec();
    let written = bridge.call(&path, write).await.expect("write");
    assert_eq!(written.code, ResponseCode::Changed);

    let reread = bridge
        .call(&path, RequestMessage::new(Method::Get, ""))
        .await
        .expect("reread");
    assert_eq!(reread.payload, b"25.0");
    assert_eq!(node.request_count(), 3);

    let stats = bridge.cache_stats().await;
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn shared_observation_fans_out_and_is_torn_down_with_the_node() {
    init_tracing();
    let node = Arc::new(SensorNode::new("21.5"));
    let bus = Arc::new(BusSide::default());
    let bridge = CoapBridge::new(BridgeConfig::default(), node.clone(), bus.clone());

    let outcome = bridge
        .register_endpoint(registration("sensor1", &["/temp"]), "node-a:5683")
        .await
        .expect("registration");
    let path = format!("{}/temp", outcome.location);

    let initial = bridge
        .subscribe(":1.101", &path)
        .await
        .expect("first subscriber");
    assert_eq!(initial.payload, b"21.5");
    bridge
        .subscribe(":1.102", &path)
        .await
        .expect("second subscriber");

    node.publish("22.0").await;
    settle().await;

    let mut notified = bus.notified.lock().expect("lock notified").clone();
    notified.sort();
    assert_eq!(
        notified,
        vec![
            (":1.101".to_string(), b"22.0".to_vec()),
            (":1.102".to_string(), b"22.0".to_vec()),
        ]
    );

    // The notification refreshed the cache: a read needs no upstream call.
    bridge
        .call(&path, RequestMessage::new(Method::Get, ""))
        .await
        .expect("cached read");
    assert_eq!(node.request_count(), 0);

    bridge
        .unsubscribe(":1.101", &path)
        .await
        .expect("first departure");
    assert_eq!(node.cancel_count(), 0);

    // Removing the endpoint tears the remaining observation down.
    bridge.remove_endpoint(&outcome.node_id).await.expect("removal");
    assert_eq!(node.cancel_count(), 1);
    assert_eq!(
        *bus.removed.lock().expect("lock removed"),
        vec![path.clone()]
    );

    assert!(bridge
        .call(&path, RequestMessage::new(Method::Get, ""))
        .await
        .is_err());
}

#[tokio::test(start_paused = true)]
async fn lapsed_lifetime_withdraws_the_exposure() {
    init_tracing();
    let node = Arc::new(SensorNode::new("21.5"));
    let bus = Arc::new(BusSide::default());
    let bridge = CoapBridge::new(BridgeConfig::default(), node.clone(), bus.clone());

    let outcome = bridge
        .register_endpoint(
            RegistrationRequest {
                lifetime: Some(60),
                ..registration("sensor1", &["/temp"])
            },
            "node-a:5683",
        )
        .await
        .expect("registration");
    let path = format!("{}/temp", outcome.location);

    tokio::time::advance(Duration::from_secs(50)).await;
    bridge
        .update_endpoint(&outcome.node_id, Some(60), None)
        .await
        .expect("renewal");

    // The renewal pushed the deadline past the original 62s.
    tokio::time::advance(Duration::from_secs(30)).await;
    settle().await;
    assert!(bus.removed.lock().expect("lock removed").is_empty());

    tokio::time::advance(Duration::from_secs(33)).await;
    settle().await;
    assert_eq!(*bus.removed.lock().expect("lock removed"), vec![path]);
    assert!(bridge
        .update_endpoint(&outcome.node_id, Some(60), None)
        .await
        .is_err());
}

#[tokio::test]
async fn disabling_the_cache_forces_upstream_reads() {
    init_tracing();
    let node = Arc::new(SensorNode::new("21.5"));
    let bridge = CoapBridge::new(
        BridgeConfig::default(),
        node.clone(),
        Arc::new(BusSide::default()),
    );

    let outcome = bridge
        .register_endpoint(registration("sensor1", &["/temp"]), "node-a:5683")
        .await
        .expect("registration");
    let path = format!("{}/temp", outcome.location);

    assert!(bridge.cache_enabled().await);
    bridge.set_cache_enabled(false).await;

    bridge
        .call(&path, RequestMessage::new(Method::Get, ""))
        .await
        .expect("first read");
    bridge
        .call(&path, RequestMessage::new(Method::Get, ""))
        .await
        .expect("second read");
    assert_eq!(node.request_count(), 2);

    bridge.set_cache_enabled(true).await;
    bridge
        .call(&path, RequestMessage::new(Method::Get, ""))
        .await
        .expect("read that fills the cache");
    bridge
        .call(&path, RequestMessage::new(Method::Get, ""))
        .await
        .expect("cached read");
    assert_eq!(node.request_count(), 3);

    bridge.flush_cache().await;
    bridge
        .call(&path, RequestMessage::new(Method::Get, ""))
        .await
        .expect("read after flush");
    assert_eq!(node.request_count(), 4);
}
