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

//! # coap-bridge
//!
//! `coap-bridge` is the mediation core between a constrained resource network
//! and a peer service bus. Constrained nodes register themselves and their
//! resources with a lifetime; the bridge exposes those resources to bus-side
//! consumers, forwards their calls upstream through a freshness-aware response
//! cache, and multiplexes resource observations so any number of bus-side
//! subscribers share a single upstream observation.
//!
//! The two sides plug in behind traits: [`UpstreamTransport`] carries the
//! constrained-network protocol, [`ExposureSink`] is the bus-side exposure
//! surface. [`CoapBridge`] assembles registry, dispatcher, cache and
//! observation multiplexer behind those boundaries.
//!
//! ```
//! use async_trait::async_trait;
//! use bridge_message::{
//!     MediaType, Method, RequestMessage, ResourceLink, ResponseCode, ResponseMessage,
//! };
//! use coap_bridge::{
//!     BridgeConfig, CoapBridge, DeliveryError, ExposureSink, ObserveHandle,
//!     RegistrationRequest, TransportError, UpstreamTransport,
//! };
//! use std::sync::Arc;
//!
//! struct EchoTransport;
//!
//! #[async_trait]
//! impl UpstreamTransport for EchoTransport {
//!     async fn send_request(
//!         &self,
//!         _context: &str,
//!         _request: RequestMessage,
//!     ) -> Result<ResponseMessage, TransportError> {
//!         Ok(ResponseMessage::new(ResponseCode::Content)
//!             .with_payload(MediaType::TextPlain, b"21.5".to_vec())
//!             .with_max_age(30))
//!     }
//!
//!     async fn observe(
//!         &self,
//!         _context: &str,
//!         _request: RequestMessage,
//!     ) -> Result<ObserveHandle, TransportError> {
//!         Err(TransportError::Unreachable("observe not wired".to_string()))
//!     }
//!
//!     async fn cancel_observe(
//!         &self,
//!         _context: &str,
//!         _request: RequestMessage,
//!     ) -> Result<ResponseMessage, TransportError> {
//!         Err(TransportError::Unreachable("observe not wired".to_string()))
//!     }
//! }
//!
//! struct NoopSink;
//!
//! #[async_trait]
//! impl ExposureSink for NoopSink {
//!     async fn on_resource_added(
//!         &self,
//!         _path: &str,
//!         _resource_type: Option<&str>,
//!         _interface: Option<&str>,
//!     ) {
//!     }
//!
//!     async fn on_resource_removed(&self, _path: &str) {}
//!
//!     async fn notify(
//!         &self,
//!         _subscriber: &str,
//!         _path: &str,
//!         _response: &ResponseMessage,
//!     ) -> Result<(), DeliveryError> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bridge = CoapBridge::new(
//!     BridgeConfig::default(),
//!     Arc::new(EchoTransport),
//!     Arc::new(NoopSink),
//! );
//!
//! let outcome = bridge
//!     .register_endpoint(
//!         RegistrationRequest {
//!             endpoint: "sensor1".to_string(),
//!             links: vec![ResourceLink::new("/temp")],
//!             ..RegistrationRequest::default()
//!         },
//!         "node-a:5683",
//!     )
//!     .await
//!     .unwrap();
//!
//! let response = bridge
//!     .call(
//!         &format!("{}/temp", outcome.location),
//!         RequestMessage::new(Method::Get, ""),
//!     )
//!     .await
//!     .unwrap();
//! assert_eq!(response.payload, b"21.5");
//! # }
//! ```

mod bridge;
pub use bridge::CoapBridge;

mod config;
pub use config::BridgeConfig;

mod error;
pub use error::BridgeError;

mod exposure;
pub use exposure::{DeliveryError, ExposureSink};

mod registry;
pub use registry::{RegistrationOutcome, RegistrationRequest, Registry, ResourceEvents};

mod proxy;
pub use proxy::{Dispatcher, ObservationMultiplexer};

mod transport;
pub use transport::{ObserveHandle, TransportError, UpstreamTransport};
