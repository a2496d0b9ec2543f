//! Singleton, prototype and empty target sources

use std::fmt;
use std::sync::Arc;

use crate::error::Throwable;
use crate::types::TypeRef;

use super::{TargetHandle, TargetSource};

/// Always hands out the same target
pub struct SingletonTargetSource {
    target_type: TypeRef,
    target: TargetHandle,
}

impl SingletonTargetSource {
    /// Wrap a single target
    pub fn new(target_type: TypeRef, target: TargetHandle) -> Self {
        SingletonTargetSource {
            target_type,
            target,
        }
    }

    /// The wrapped target
    pub fn target(&self) -> &TargetHandle {
        &self.target
    }
}

impl TargetSource for SingletonTargetSource {
    fn target_type(&self) -> &TypeRef {
        &self.target_type
    }

    fn is_static(&self) -> bool {
        true
    }

    fn get_target(&self) -> Result<TargetHandle, Throwable> {
        Ok(Arc::clone(&self.target))
    }
}

impl fmt::Debug for SingletonTargetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonTargetSource")
            .field("target_type", &self.target_type.name())
            .finish()
    }
}

type Factory = Box<dyn Fn() -> Result<TargetHandle, Throwable> + Send + Sync>;

/// Creates a fresh target for every call
pub struct PrototypeTargetSource {
    target_type: TypeRef,
    factory: Factory,
}

impl PrototypeTargetSource {
    /// Create a source from a factory
    pub fn new<F>(target_type: TypeRef, factory: F) -> Self
    where
        F: Fn() -> Result<TargetHandle, Throwable> + Send + Sync + 'static,
    {
        PrototypeTargetSource {
            target_type,
            factory: Box::new(factory),
        }
    }
}

impl TargetSource for PrototypeTargetSource {
    fn target_type(&self) -> &TypeRef {
        &self.target_type
    }

    fn is_static(&self) -> bool {
        false
    }

    fn get_target(&self) -> Result<TargetHandle, Throwable> {
        (self.factory)()
    }
}

/// Source with no target
///
/// Used for proxies whose every method is served by introductions; a call
/// that reaches the end of the chain fails with a target acquisition error.
#[derive(Debug)]
pub struct EmptyTargetSource {
    target_type: TypeRef,
}

#[derive(Debug, thiserror::Error)]
#[error("no target behind proxy for '{0}'")]
struct NoTarget(String);

impl EmptyTargetSource {
    /// Create an empty source declaring `target_type`
    pub fn new(target_type: TypeRef) -> Self {
        EmptyTargetSource { target_type }
    }
}

impl TargetSource for EmptyTargetSource {
    fn target_type(&self) -> &TypeRef {
        &self.target_type
    }

    fn is_static(&self) -> bool {
        true
    }

    fn get_target(&self) -> Result<TargetHandle, Throwable> {
        Err(Box::new(NoTarget(self.target_type.name().to_string())))
    }
}
