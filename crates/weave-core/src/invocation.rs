//! One intercepted call and its `proceed()` protocol
//!
//! An [`Invocation`] walks a cursor over the chain. Each `proceed()` runs the
//! link at the cursor with the invocation itself as the continuation; once
//! the cursor passes the last link the target is acquired, called, and
//! released when the invocation is dropped.
//!
//! Every chain position can be entered once. An interceptor that calls
//! `proceed()` a second time gets [`AopError::ProceedReentry`].

use std::sync::Arc;

use tracing::trace;

use crate::chain::InterceptorChain;
use crate::error::{AopError, AopResult};
use crate::target::{TargetHandle, TargetLease, TargetSource};
use crate::types::{MethodRef, TypeRef};
use crate::value::Value;

/// A single intercepted method call
///
/// Created per call and discarded when the call returns.
pub struct Invocation<'a> {
    method: MethodRef,
    arguments: Vec<Value>,
    target_type: TypeRef,
    target_source: &'a dyn TargetSource,
    lease: Option<TargetLease<'a>>,
    chain: Arc<InterceptorChain>,
    cursor: usize,
    /// One flag per link plus one for the target
    entered: Vec<bool>,
}

impl<'a> Invocation<'a> {
    /// Prepare a call of `method` through `chain`
    pub fn new(
        method: MethodRef,
        arguments: Vec<Value>,
        target_type: TypeRef,
        target_source: &'a dyn TargetSource,
        chain: Arc<InterceptorChain>,
    ) -> Self {
        let entered = vec![false; chain.len() + 1];
        Invocation {
            method,
            arguments,
            target_type,
            target_source,
            lease: None,
            chain,
            cursor: 0,
            entered,
        }
    }

    /// Method being called
    pub fn method(&self) -> &MethodRef {
        &self.method
    }

    /// Current arguments, including changes made by earlier interceptors
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Arguments for in-place rewriting
    ///
    /// Later interceptors, dynamic matchers and the target see the change.
    pub fn arguments_mut(&mut self) -> &mut [Value] {
        &mut self.arguments
    }

    /// Type the call was made against
    pub fn target_type(&self) -> &TypeRef {
        &self.target_type
    }

    /// Target serving the call, once the chain has reached it
    pub fn target(&self) -> Option<&TargetHandle> {
        self.lease.as_ref().and_then(TargetLease::handle)
    }

    /// The chain being walked
    pub fn chain(&self) -> &InterceptorChain {
        &self.chain
    }

    /// Position of the next `proceed()` (chain length means the target)
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Continue with the next interceptor, or the target after the last one
    pub fn proceed(&mut self) -> AopResult<Value> {
        let position = self.cursor;
        if self.entered[position] {
            return Err(AopError::ProceedReentry {
                method: self.method.to_string(),
                position,
            });
        }
        self.entered[position] = true;
        self.cursor = position + 1;

        let result = if position == self.chain.len() {
            self.invoke_target()
        } else {
            self.invoke_link(position)
        };

        self.cursor = position;
        result
    }

    /// Run a link; a failed dynamic match skips straight to the next one
    fn invoke_link(&mut self, position: usize) -> AopResult<Value> {
        let chain = Arc::clone(&self.chain);
        let link = &chain.links()[position];

        if let Some(matcher) = link.runtime_matcher() {
            if !matcher.matches_dynamic(&self.method, Some(self.target_type.as_ref()), &self.arguments)? {
                trace!(method = %self.method, position, "dynamic match failed, skipping");
                return self.proceed();
            }
        }

        trace!(
            method = %self.method,
            position,
            interceptor = %link.interceptor().describe(),
            "entering interceptor"
        );
        link.interceptor().invoke(self)
    }

    fn invoke_target(&mut self) -> AopResult<Value> {
        let lease = TargetLease::acquire(self.target_source)?;
        let target = match lease.handle() {
            Some(target) => Arc::clone(target),
            None => return Err(AopError::raise("target lease is empty")),
        };
        self.lease = Some(lease);

        trace!(method = %self.method, "dispatching to target");
        target
            .invoke(&self.method, &self.arguments)
            .map_err(AopError::Raised)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::{FnInterceptor, MethodInterceptor};
    use crate::advisor::AdvisorId;
    use crate::chain::ChainLink;
    use crate::pointcut::{MethodMatcher, MethodMatchers};
    use crate::target::{FnTarget, SingletonTargetSource};
    use crate::types::{Method, TypeDescriptor};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        source: SingletonTargetSource,
        calls: Arc<AtomicUsize>,
    }

    fn fixture() -> Fixture {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let target = FnTarget::new(move |_, args| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(args.first().cloned().unwrap_or_default())
        });
        Fixture {
            source: SingletonTargetSource::new(TypeDescriptor::new("Store").into_ref(), Arc::new(target)),
            calls,
        }
    }

    fn link(id: u64, interceptor: impl MethodInterceptor + 'static) -> ChainLink {
        ChainLink::new(AdvisorId::new(id), Arc::new(interceptor), None)
    }

    fn guarded(id: u64, interceptor: impl MethodInterceptor + 'static, matcher: Arc<dyn MethodMatcher>) -> ChainLink {
        ChainLink::new(AdvisorId::new(id), Arc::new(interceptor), Some(matcher))
    }

    fn invocation<'a>(fx: &'a Fixture, links: Vec<ChainLink>, args: Vec<Value>) -> Invocation<'a> {
        Invocation::new(
            Method::new("IStore", "Load").into_ref(),
            args,
            Arc::clone(fx.source.target_type()),
            &fx.source,
            Arc::new(InterceptorChain::new(links)),
        )
    }

    #[test]
    fn test_empty_chain_calls_target() {
        let fx = fixture();
        let mut inv = invocation(&fx, Vec::new(), vec![Value::from(5)]);
        assert_eq!(inv.proceed().unwrap(), Value::from(5));
        assert_eq!(fx.calls.load(Ordering::SeqCst), 1);
        assert!(inv.target().is_some());
    }

    #[test]
    fn test_second_proceed_is_rejected() {
        let fx = fixture();
        let twice = FnInterceptor::new(|inv| {
            inv.proceed()?;
            inv.proceed()
        });
        let mut inv = invocation(&fx, vec![link(1, twice)], Vec::new());
        let err = inv.proceed().unwrap_err();
        assert!(matches!(err, AopError::ProceedReentry { position: 1, .. }));
        assert_eq!(fx.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_short_circuit_never_acquires_target() {
        let fx = fixture();
        let cached = FnInterceptor::new(|_| Ok(Value::from("cached")));
        let mut inv = invocation(&fx, vec![link(1, cached)], Vec::new());
        assert_eq!(inv.proceed().unwrap(), Value::from("cached"));
        assert_eq!(fx.calls.load(Ordering::SeqCst), 0);
        assert!(inv.target().is_none());
    }

    #[test]
    fn test_stack_order() {
        let fx = fixture();
        let log = Arc::new(Mutex::new(Vec::new()));
        let tracer = |name: &'static str| {
            let log = Arc::clone(&log);
            FnInterceptor::new(move |inv| {
                log.lock().push(format!("enter {}", name));
                let result = inv.proceed();
                log.lock().push(format!("exit {}", name));
                result
            })
        };
        let mut inv = invocation(&fx, vec![link(1, tracer("a")), link(2, tracer("b"))], Vec::new());
        inv.proceed().unwrap();
        assert_eq!(*log.lock(), vec!["enter a", "enter b", "exit b", "exit a"]);
    }

    #[test]
    fn test_dynamic_guard_skips_transparently() {
        let fx = fixture();
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        let advice = FnInterceptor::new(move |inv| {
            counter.fetch_add(1, Ordering::SeqCst);
            inv.proceed()
        });
        let above_ten = MethodMatchers::dynamic(
            |_, _| true,
            |_, _, args| args.first().and_then(Value::as_int).is_some_and(|v| v > 10),
        );
        let links = vec![guarded(1, advice, above_ten)];

        let mut low = invocation(&fx, links.clone(), vec![Value::from(5)]);
        assert_eq!(low.proceed().unwrap(), Value::from(5));
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        let mut high = invocation(&fx, links, vec![Value::from(20)]);
        assert_eq!(high.proceed().unwrap(), Value::from(20));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(fx.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dynamic_guard_sees_rewritten_arguments() {
        let fx = fixture();
        let bump = FnInterceptor::new(|inv| {
            inv.arguments_mut()[0] = Value::from(50);
            inv.proceed()
        });
        let marker = FnInterceptor::new(|_| Ok(Value::from("advised")));
        let above_ten = MethodMatchers::dynamic(
            |_, _| true,
            |_, _, args| args.first().and_then(Value::as_int).is_some_and(|v| v > 10),
        );
        let mut inv = invocation(&fx, vec![link(1, bump), guarded(2, marker, above_ten)], vec![Value::from(1)]);
        assert_eq!(inv.proceed().unwrap(), Value::from("advised"));
    }
}
