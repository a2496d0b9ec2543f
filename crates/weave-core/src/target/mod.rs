//! Targets and target sources
//!
//! A [`Target`] is the object a call reaches once every interceptor has
//! proceeded. A [`TargetSource`] hands targets out and takes them back; the
//! engine pairs each successful `get_target` with exactly one
//! `release_target`, on every exit path.

mod hot_swap;
mod pool;
mod sources;

pub use hot_swap::HotSwappableTargetSource;
pub use pool::PoolingTargetSource;
pub use sources::{EmptyTargetSource, PrototypeTargetSource, SingletonTargetSource};

use std::sync::Arc;

use crate::error::{AopError, AopResult, Throwable};
use crate::types::{Method, TypeRef};
use crate::value::Value;

/// Object that ultimately serves intercepted calls
pub trait Target: Send + Sync {
    /// Dispatch `method` with `args`
    fn invoke(&self, method: &Method, args: &[Value]) -> Result<Value, Throwable>;
}

/// Shared handle to a target
pub type TargetHandle = Arc<dyn Target>;

/// Target backed by a closure
pub struct FnTarget<F> {
    dispatch: F,
}

impl<F> FnTarget<F>
where
    F: Fn(&Method, &[Value]) -> Result<Value, Throwable> + Send + Sync,
{
    /// Create a target from a dispatch closure
    pub fn new(dispatch: F) -> Self {
        FnTarget { dispatch }
    }
}

impl<F> Target for FnTarget<F>
where
    F: Fn(&Method, &[Value]) -> Result<Value, Throwable> + Send + Sync,
{
    fn invoke(&self, method: &Method, args: &[Value]) -> Result<Value, Throwable> {
        (self.dispatch)(method, args)
    }
}

/// Supplier of targets
pub trait TargetSource: Send + Sync {
    /// Declared type of the targets this source hands out
    fn target_type(&self) -> &TypeRef;

    /// Whether every `get_target` returns the same instance
    fn is_static(&self) -> bool;

    /// Acquire a target for one call
    fn get_target(&self) -> Result<TargetHandle, Throwable>;

    /// Give back a target obtained from `get_target`
    fn release_target(&self, target: TargetHandle) {
        let _ = target;
    }
}

/// A target acquired for one call, released on drop
pub(crate) struct TargetLease<'a> {
    source: &'a dyn TargetSource,
    target: Option<TargetHandle>,
}

impl<'a> TargetLease<'a> {
    pub(crate) fn acquire(source: &'a dyn TargetSource) -> AopResult<Self> {
        let target = source
            .get_target()
            .map_err(|err| AopError::TargetAcquisition {
                target_type: source.target_type().to_string(),
                source: err,
            })?;
        Ok(TargetLease {
            source,
            target: Some(target),
        })
    }

    pub(crate) fn handle(&self) -> Option<&TargetHandle> {
        self.target.as_ref()
    }
}

impl Drop for TargetLease<'_> {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            self.source.release_target(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeDescriptor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        ty: TypeRef,
        acquired: AtomicUsize,
        released: AtomicUsize,
        fail: bool,
    }

    impl TargetSource for CountingSource {
        fn target_type(&self) -> &TypeRef {
            &self.ty
        }

        fn is_static(&self) -> bool {
            false
        }

        fn get_target(&self) -> Result<TargetHandle, Throwable> {
            if self.fail {
                return Err("unavailable".into());
            }
            self.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(FnTarget::new(|_, _| Ok(Value::Null))))
        }

        fn release_target(&self, _target: TargetHandle) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn source(fail: bool) -> CountingSource {
        CountingSource {
            ty: TypeDescriptor::new("Store").into_ref(),
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            fail,
        }
    }

    #[test]
    fn test_lease_releases_on_drop() {
        let src = source(false);
        {
            let lease = TargetLease::acquire(&src).unwrap();
            assert!(lease.handle().is_some());
            assert_eq!(src.released.load(Ordering::SeqCst), 0);
        }
        assert_eq!(src.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(src.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_acquisition_owes_no_release() {
        let src = source(true);
        let err = TargetLease::acquire(&src).err().unwrap();
        assert!(matches!(err, AopError::TargetAcquisition { ref target_type, .. } if target_type == "Store"));
        assert_eq!(src.released.load(Ordering::SeqCst), 0);
    }
}
