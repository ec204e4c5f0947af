//! Bridge-wide configuration.

use response_cache::CacheConfig;
use std::time::Duration;

/// Tunables for the mediation core.
///
/// The lifetime floor and expiry grace are configuration rather than
/// hard-coded invariants; the defaults match the registration protocol's
/// conventional values.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Lifetime in seconds applied when a registration declares none.
    pub default_lifetime: u64,
    /// Floor in seconds that registration lifetimes are clamped to.
    pub minimum_lifetime: u64,
    /// Buffer added to a node's lifetime before expiry enforcement, to
    /// tolerate network jitter around renewal.
    pub expiry_grace: Duration,
    /// Deadline for one upstream request/response exchange.
    pub call_timeout: Duration,
    pub cache: CacheConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_lifetime: 86400,
            minimum_lifetime: 60,
            expiry_grace: Duration::from_secs(2),
            call_timeout: Duration::from_secs(2),
            cache: CacheConfig::default(),
        }
    }
}
