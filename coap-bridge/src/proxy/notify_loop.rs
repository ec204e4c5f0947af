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

//! Per-observation notification pump.

use crate::proxy::ObservationMultiplexer;
use bridge_message::ResponseMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;
use tracing::debug;

const NOTIFY_LOOP_TAG: &str = "NotifyLoop:";

/// Drains one upstream notification stream into the multiplexer.
///
/// Cancellation is cooperative: the run flag is consulted only after a wait
/// completes, so a stop request takes effect on the next notification (or when
/// the stream closes), never mid-delivery.
pub(crate) fn spawn_notification_loop(
    multiplexer: Weak<ObservationMultiplexer>,
    path: String,
    run: Arc<AtomicBool>,
    mut notifications: Receiver<ResponseMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(response) = notifications.recv().await {
            if !run.load(Ordering::SeqCst) {
                break;
            }
            let Some(multiplexer) = multiplexer.upgrade() else {
                break;
            };
            multiplexer.on_notification(&path, response).await;
        }
        debug!("{NOTIFY_LOOP_TAG} notification stream ended for {path}");
    })
}
