//! Target source whose target can be replaced while proxies are live

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::Throwable;
use crate::types::TypeRef;

use super::{TargetHandle, TargetSource};

/// Hands out the current target; [`swap`](Self::swap) replaces it
///
/// Calls already running keep the target they acquired.
pub struct HotSwappableTargetSource {
    target_type: TypeRef,
    current: RwLock<TargetHandle>,
}

impl HotSwappableTargetSource {
    /// Create a source starting at `initial`
    pub fn new(target_type: TypeRef, initial: TargetHandle) -> Self {
        HotSwappableTargetSource {
            target_type,
            current: RwLock::new(initial),
        }
    }

    /// Replace the target, returning the previous one
    pub fn swap(&self, target: TargetHandle) -> TargetHandle {
        let old = std::mem::replace(&mut *self.current.write(), target);
        debug!(target_type = %self.target_type, "target swapped");
        old
    }

    /// The target new calls will reach
    pub fn current(&self) -> TargetHandle {
        Arc::clone(&self.current.read())
    }
}

impl TargetSource for HotSwappableTargetSource {
    fn target_type(&self) -> &TypeRef {
        &self.target_type
    }

    fn is_static(&self) -> bool {
        false
    }

    fn get_target(&self) -> Result<TargetHandle, Throwable> {
        Ok(self.current())
    }
}
