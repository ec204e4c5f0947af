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

//! # bridge-message
//!
//! `bridge-message` carries the CoAP-side message model shared by the bridge
//! crates: methods, response codes, media types, request/response messages and
//! the CoRE link-format registration payload parser.
//!
//! The crate is deliberately transport-agnostic. Wire-level framing belongs to
//! the protocol stacks behind the [`coap-bridge`] boundary traits; only the
//! fields the mediation core reasons about (target identity, freshness,
//! observe state) are modeled here.
//!
//! [`coap-bridge`]: https://github.com/eclipse/coap-bus-bridge

mod code;
pub use code::{Method, ResponseCode};

mod media;
pub use media::MediaType;

mod message;
pub use message::{RequestMessage, ResponseMessage};

mod link_format;
pub use link_format::{parse_links, LinkFormatError, ResourceLink};
