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

//! One-shot request forwarding with cache consultation.

use crate::error::BridgeError;
use crate::registry::Registry;
use crate::transport::UpstreamTransport;
use bridge_message::{RequestMessage, ResponseCode, ResponseMessage};
use response_cache::ResponseCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

const DISPATCHER_TAG: &str = "Dispatcher:";
const DISPATCHER_FN_CALL_TAG: &str = "call():";

/// Forwards bus-side calls to constrained-network nodes.
///
/// Safe (read-only) calls consult the cache before going upstream; every
/// upstream outcome is handed to the cache afterwards, which classifies it
/// itself (content responses are stored, mutation outcomes invalidate).
/// Timeouts and transport failures are converted into protocol error
/// responses rather than surfaced as typed errors, so callers always get a
/// response for a resolvable resource.
pub struct Dispatcher {
    transport: Arc<dyn UpstreamTransport>,
    registry: Arc<Registry>,
    cache: Arc<ResponseCache>,
    call_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn UpstreamTransport>,
        registry: Arc<Registry>,
        cache: Arc<ResponseCache>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            registry,
            cache,
            call_timeout,
        }
    }

    /// Performs one exchange with the node owning `path`.
    ///
    /// The request's addressing fields are rewritten from the registry
    /// resolution; only an unknown `path` produces an error.
    pub async fn call(
        &self,
        path: &str,
        mut request: RequestMessage,
    ) -> Result<ResponseMessage, BridgeError> {
        let (context, relative) = self.registry.resolve(path).await?;
        request.authority = context.clone();
        request.path = relative;

        if request.method.is_safe() {
            if let Some(hit) = self.cache.lookup(&request).await {
                debug!(
                    "{DISPATCHER_TAG}:{DISPATCHER_FN_CALL_TAG} serving {path} from cache ({}s left)",
                    hit.max_age.unwrap_or(0)
                );
                return Ok(hit);
            }
        }

        let outcome = tokio::time::timeout(
            self.call_timeout,
            self.transport.send_request(&context, request.clone()),
        )
        .await;

        let mut response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                warn!(
                    "{DISPATCHER_TAG}:{DISPATCHER_FN_CALL_TAG} exchange with {context} failed: {error}"
                );
                ResponseMessage::new(ResponseCode::InternalServerError)
            }
            Err(_) => {
                warn!(
                    "{DISPATCHER_TAG}:{DISPATCHER_FN_CALL_TAG} no response from {context} within {:?}",
                    self.call_timeout
                );
                ResponseMessage::new(ResponseCode::GatewayTimeout)
            }
        };
        response.arrived_at = Some(Instant::now());

        self.cache.store(&request, &response).await;
        Ok(response)
    }
}
