//! Proxy and pool configuration
//!
//! Plain serde values; hosts deserialize them from whatever format they use.

use serde::{Deserialize, Serialize};

/// How a proxy treats its advisor list and chains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Freeze the advisor list when the first chain is built
    ///
    /// When false, advisors may change at any time and every change drops
    /// the cached chains.
    pub freeze_on_first_use: bool,
    /// Cache chains per (target type, method)
    pub cache_chains: bool,
    /// Start frozen
    pub frozen: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            freeze_on_first_use: true,
            cache_chains: true,
            frozen: false,
        }
    }
}

/// Limits for [`PoolingTargetSource`](crate::target::PoolingTargetSource)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Most targets alive at once
    pub max_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig { max_size: 8 }
    }
}
