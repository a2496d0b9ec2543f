//! Bounded pool of targets built on demand

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::config::PoolConfig;
use crate::error::Throwable;
use crate::types::TypeRef;

use super::{TargetHandle, TargetSource};

type Factory = Box<dyn Fn() -> Result<TargetHandle, Throwable> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
#[error("pool exhausted: all {max_size} targets of '{target_type}' are in use")]
struct PoolExhausted {
    target_type: String,
    max_size: usize,
}

struct PoolState {
    idle: Vec<TargetHandle>,
    /// Addresses of targets currently lent out
    lent: FxHashSet<usize>,
    /// Targets created and not yet discarded (idle + lent + in construction)
    created: usize,
}

fn address(target: &TargetHandle) -> usize {
    Arc::as_ptr(target) as *const () as usize
}

/// Lends targets from a pool of at most `max_size` instances
///
/// Targets are created lazily by the factory and returned to the pool on
/// release. Acquiring while every target is lent out fails; the pool never
/// blocks.
pub struct PoolingTargetSource {
    target_type: TypeRef,
    factory: Factory,
    config: PoolConfig,
    state: Mutex<PoolState>,
}

impl PoolingTargetSource {
    /// Create an empty pool
    pub fn new<F>(target_type: TypeRef, config: PoolConfig, factory: F) -> Self
    where
        F: Fn() -> Result<TargetHandle, Throwable> + Send + Sync + 'static,
    {
        PoolingTargetSource {
            target_type,
            factory: Box::new(factory),
            config,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                lent: FxHashSet::default(),
                created: 0,
            }),
        }
    }

    /// Pool limits
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Targets currently lent out
    pub fn active_count(&self) -> usize {
        self.state.lock().lent.len()
    }

    /// Targets waiting in the pool
    pub fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }
}

impl TargetSource for PoolingTargetSource {
    fn target_type(&self) -> &TypeRef {
        &self.target_type
    }

    fn is_static(&self) -> bool {
        false
    }

    fn get_target(&self) -> Result<TargetHandle, Throwable> {
        let mut state = self.state.lock();
        if let Some(target) = state.idle.pop() {
            state.lent.insert(address(&target));
            return Ok(target);
        }
        if state.created >= self.config.max_size {
            return Err(Box::new(PoolExhausted {
                target_type: self.target_type.name().to_string(),
                max_size: self.config.max_size,
            }));
        }

        // Reserve the slot before building so a failing factory can give it back
        state.created += 1;
        drop(state);
        match (self.factory)() {
            Ok(target) => {
                trace!(target_type = %self.target_type, "pooled target created");
                self.state.lock().lent.insert(address(&target));
                Ok(target)
            }
            Err(err) => {
                self.state.lock().created -= 1;
                Err(err)
            }
        }
    }

    fn release_target(&self, target: TargetHandle) {
        let mut state = self.state.lock();
        if !state.lent.remove(&address(&target)) {
            debug!(target_type = %self.target_type, "ignoring release of a target this pool did not lend");
            return;
        }
        state.idle.push(target);
    }
}
