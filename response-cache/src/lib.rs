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

//! # response-cache
//!
//! `response-cache` stores responses from constrained-network nodes and serves
//! them back while they are still fresh, reducing redundant upstream traffic.
//!
//! Entries are keyed by normalized request identity (target + concrete
//! representation type) and aged by the response's declared max-age. The LRU
//! bound caps entry count; the real lifetime of each entry is enforced
//! explicitly against its remaining freshness on every lookup.
//!
//! Classification on store follows the protocol's own semantics: mutation
//! outcomes (2.01/2.02/2.04) invalidate, validation outcomes (2.03) extend
//! freshness in place, content outcomes (2.05) insert or replace.

use bridge_message::{MediaType, Method, RequestMessage, ResponseCode, ResponseMessage};
use lru::LruCache;
use std::num::NonZeroUsize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

const RESPONSE_CACHE_TAG: &str = "ResponseCache:";
const RESPONSE_CACHE_FN_STORE_TAG: &str = "store():";
const RESPONSE_CACHE_FN_LOOKUP_TAG: &str = "lookup():";

/// Tuning knobs for the response cache.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Maximum number of cached entries before LRU eviction.
    pub max_entries: usize,
    /// Upper bound in seconds on any entry's freshness, regardless of what
    /// the response declares.
    pub max_entry_age: u64,
    /// Freshness in seconds applied to content responses that declare none.
    pub default_max_age: u64,
    /// Disabled means pure pass-through: no storage, every lookup misses.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            max_entry_age: 86400,
            default_max_age: 60,
            enabled: true,
        }
    }
}

/// Read-only counters for the introspection surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    target: String,
    media_type: MediaType,
}

struct CacheEntry {
    response: ResponseMessage,
    max_age: u64,
    stored_at: Instant,
}

impl CacheEntry {
    /// Remaining freshness in seconds; zero means logically absent.
    fn remaining_freshness(&self, now: Instant) -> u64 {
        self.max_age
            .saturating_sub(now.duration_since(self.stored_at).as_secs())
    }
}

struct CacheState {
    entries: LruCache<CacheKey, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
    enabled: bool,
}

/// Freshness-aware cache of (request identity -> response) entries.
pub struct ResponseCache {
    max_entry_age: u64,
    default_max_age: u64,
    state: Mutex<CacheState>,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity =
            NonZeroUsize::new(config.max_entries.max(1)).expect("nonzero cache capacity");
        Self {
            max_entry_age: config.max_entry_age,
            default_max_age: config.default_max_age,
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
                evictions: 0,
                enabled: config.enabled,
            }),
        }
    }

    /// Stores, refreshes or invalidates according to the response class.
    ///
    /// Only success-class responses are considered. Mutation outcomes remove
    /// every representation variant for the identity; 2.03 Valid extends an
    /// existing entry's freshness from the new timestamp without replacing the
    /// body; 2.05 Content inserts with the declared freshness (clamped to the
    /// configured ceiling), invalidating instead when freshness is declared 0.
    pub async fn store(&self, request: &RequestMessage, response: &ResponseMessage) {
        let mut state = self.state.lock().await;
        if !state.enabled {
            return;
        }

        if !response.code.is_success() {
            return;
        }

        let key = store_key(request, response);

        match response.code {
            ResponseCode::Created | ResponseCode::Deleted | ResponseCode::Changed => {
                let removed = invalidate_target(&mut state, &key.target);
                debug!(
                    "{RESPONSE_CACHE_TAG}:{RESPONSE_CACHE_FN_STORE_TAG} mutation response {} invalidated {removed} entries for {}",
                    response.code, key.target
                );
            }
            ResponseCode::Valid => {
                let Some(max_age) = response.max_age else {
                    warn!(
                        "{RESPONSE_CACHE_TAG}:{RESPONSE_CACHE_FN_STORE_TAG} no max-age on 2.03 response for {}",
                        key.target
                    );
                    return;
                };
                let now = response.arrived_at.unwrap_or_else(Instant::now);
                if let Some(entry) = state.entries.get_mut(&key) {
                    entry.max_age = max_age.min(self.max_entry_age);
                    entry.stored_at = now;
                    debug!(
                        "{RESPONSE_CACHE_TAG}:{RESPONSE_CACHE_FN_STORE_TAG} refreshed entry for {}",
                        key.target
                    );
                }
            }
            ResponseCode::Content => {
                let max_age = response.max_age.unwrap_or(self.default_max_age);
                if max_age == 0 {
                    invalidate_target(&mut state, &key.target);
                    return;
                }
                let entry = CacheEntry {
                    response: response.clone(),
                    max_age: max_age.min(self.max_entry_age),
                    stored_at: response.arrived_at.unwrap_or_else(Instant::now),
                };
                if let Some((evicted_key, _)) = state.entries.push(key.clone(), entry) {
                    if evicted_key != key {
                        state.evictions += 1;
                    }
                }
                debug!(
                    "{RESPONSE_CACHE_TAG}:{RESPONSE_CACHE_FN_STORE_TAG} cached response for {} ({})",
                    key.target, key.media_type
                );
            }
            _ => {}
        }
    }

    /// Returns a still-fresh response for the request, if one is cached.
    ///
    /// A concrete accept criterion yields a single key; absent accept probes
    /// every known representation in a fixed order, first hit wins. Hits come
    /// back with max-age rewritten to the remaining freshness and the entry's
    /// timestamp advanced, so repeated reads do not double-discount elapsed
    /// time. Expired entries are evicted and reported as misses.
    pub async fn lookup(&self, request: &RequestMessage) -> Option<ResponseMessage> {
        let mut state = self.state.lock().await;
        if !state.enabled {
            return None;
        }

        let now = Instant::now();
        let hit_key = lookup_keys(request)
            .into_iter()
            .find(|key| state.entries.contains(key));

        let Some(key) = hit_key else {
            state.misses += 1;
            return None;
        };

        let entry = state.entries.get_mut(&key).expect("probed key present");
        let remaining = entry.remaining_freshness(now);
        if remaining == 0 {
            debug!(
                "{RESPONSE_CACHE_TAG}:{RESPONSE_CACHE_FN_LOOKUP_TAG} expired entry for {}",
                key.target
            );
            state.entries.pop(&key);
            state.evictions += 1;
            state.misses += 1;
            return None;
        }

        entry.max_age = remaining;
        entry.stored_at = now;

        let mut response = entry.response.clone();
        response.max_age = Some(remaining);
        response.arrived_at = Some(now);
        state.hits += 1;
        debug!(
            "{RESPONSE_CACHE_TAG}:{RESPONSE_CACHE_FN_LOOKUP_TAG} hit for {} ({remaining}s left)",
            key.target
        );
        Some(response)
    }

    /// Removes every representation variant derived from the request.
    pub async fn invalidate(&self, request: &RequestMessage) {
        let mut state = self.state.lock().await;
        invalidate_target(&mut state, &request.target_identity());
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            size: state.entries.len(),
        }
    }

    pub async fn is_enabled(&self) -> bool {
        self.state.lock().await.enabled
    }

    pub async fn set_enabled(&self, enabled: bool) {
        self.state.lock().await.enabled = enabled;
    }

    /// Drops every entry; counters are kept.
    pub async fn flush(&self) {
        self.state.lock().await.entries.clear();
    }
}

/// Key for storing a response: one entry per concrete representation.
///
/// POST outcomes are keyed by the request's content-format; everything else
/// by the response's, falling back to text/plain when neither declares one.
fn store_key(request: &RequestMessage, response: &ResponseMessage) -> CacheKey {
    let media_type = if request.method == Method::Post {
        request.content_format
    } else {
        response.content_format
    };
    CacheKey {
        target: request.target_identity(),
        media_type: media_type.unwrap_or(MediaType::TextPlain),
    }
}

fn lookup_keys(request: &RequestMessage) -> Vec<CacheKey> {
    let target = request.target_identity();
    match request.accept {
        Some(media_type) => vec![CacheKey { target, media_type }],
        None => MediaType::ALL
            .into_iter()
            .map(|media_type| CacheKey {
                target: target.clone(),
                media_type,
            })
            .collect(),
    }
}

fn invalidate_target(state: &mut CacheState, target: &str) -> usize {
    let stale: Vec<CacheKey> = state
        .entries
        .iter()
        .filter(|(key, _)| key.target == target)
        .map(|(key, _)| key.clone())
        .collect();
    for key in &stale {
        state.entries.pop(key);
    }
    stale.len()
}
