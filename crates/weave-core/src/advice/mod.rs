//! Advice SPI
//!
//! Five shapes of advice can be attached to a call:
//!
//! - [`MethodInterceptor`] - around advice; receives the [`Invocation`] and
//!   decides whether (and when) to call `proceed()`
//! - [`BeforeAdvice`] - runs before the call; returning an error aborts it
//! - [`AfterReturningAdvice`] - observes a normal return
//! - [`ThrowsAdvice`] - handles errors by type through a [`ThrowsHandlers`] table
//! - [`IntroductionInterceptor`] - around advice that also makes the proxy
//!   implement extra interfaces
//!
//! Everything except around advice is adapted into a [`MethodInterceptor`]
//! when its advisor is registered, so chains are homogeneous.

mod adapter;
mod introduction;
mod throws;

pub use adapter::{
    AfterReturningAdviceInterceptor, BeforeAdviceInterceptor, ThrowsAdviceInterceptor,
};
pub use introduction::DelegatingIntroductionInterceptor;
pub use throws::{ThrowsContext, ThrowsHandlers, ThrowsOutcome};

pub(crate) use adapter::adapt;

use std::fmt;
use std::sync::Arc;

use crate::error::AopResult;
use crate::invocation::Invocation;
use crate::target::TargetHandle;
use crate::types::{InterfaceId, Method, TypeDescriptor};
use crate::value::Value;

/// Around advice
///
/// An interceptor calls `invocation.proceed()` at most once. Not calling it
/// short-circuits the rest of the chain and the target; a second call fails
/// with [`AopError::ProceedReentry`](crate::AopError::ProceedReentry).
pub trait MethodInterceptor: Send + Sync {
    /// Run the advice around the rest of the chain
    fn invoke(&self, invocation: &mut Invocation<'_>) -> AopResult<Value>;

    /// Human-readable description (used in logs and errors)
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// Advice run before the call
///
/// Returning an error is the only way before-advice can stop the call: the
/// error propagates and nothing further down the chain runs. Arguments may be
/// rewritten in place; later interceptors and dynamic matchers see the change.
pub trait BeforeAdvice: Send + Sync {
    /// Run before the call proceeds
    fn before(
        &self,
        method: &Method,
        args: &mut [Value],
        target_type: &TypeDescriptor,
    ) -> AopResult<()>;
}

/// Advice run after a normal return
///
/// The return value is passed by reference and the advice returns nothing,
/// so it can inspect (or mutate the shared contents of) the result but never
/// replace it.
pub trait AfterReturningAdvice: Send + Sync {
    /// Observe the return value
    fn after_returning(
        &self,
        return_value: &Value,
        method: &Method,
        args: &[Value],
        target: Option<&TargetHandle>,
    ) -> AopResult<()>;
}

/// Advice run when the call fails
pub trait ThrowsAdvice: Send + Sync {
    /// Handlers keyed by error type
    fn handlers(&self) -> &ThrowsHandlers;
}

impl ThrowsAdvice for ThrowsHandlers {
    fn handlers(&self) -> &ThrowsHandlers {
        self
    }
}

/// Around advice that also implements introduced interfaces
pub trait IntroductionInterceptor: MethodInterceptor {
    /// Check if the advice can serve calls on `interface`
    fn implements_interface(&self, interface: &InterfaceId) -> bool;
}

/// Kind of an [`Advice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdviceKind {
    /// [`BeforeAdvice`]
    Before,
    /// [`AfterReturningAdvice`]
    AfterReturning,
    /// [`ThrowsAdvice`]
    Throws,
    /// [`MethodInterceptor`]
    Around,
    /// [`IntroductionInterceptor`]
    Introduction,
}

/// Behavior bound to a pointcut or introduction
#[derive(Clone)]
pub enum Advice {
    /// Before advice
    Before(Arc<dyn BeforeAdvice>),
    /// After-returning advice
    AfterReturning(Arc<dyn AfterReturningAdvice>),
    /// Throws advice
    Throws(Arc<dyn ThrowsAdvice>),
    /// Around advice
    Around(Arc<dyn MethodInterceptor>),
    /// Introduction interceptor
    Introduction(Arc<dyn IntroductionInterceptor>),
}

impl Advice {
    /// Wrap before advice
    pub fn before(advice: impl BeforeAdvice + 'static) -> Self {
        Advice::Before(Arc::new(advice))
    }

    /// Wrap after-returning advice
    pub fn after_returning(advice: impl AfterReturningAdvice + 'static) -> Self {
        Advice::AfterReturning(Arc::new(advice))
    }

    /// Wrap throws advice
    pub fn throws(advice: impl ThrowsAdvice + 'static) -> Self {
        Advice::Throws(Arc::new(advice))
    }

    /// Wrap around advice
    pub fn around(interceptor: impl MethodInterceptor + 'static) -> Self {
        Advice::Around(Arc::new(interceptor))
    }

    /// Wrap an introduction interceptor
    pub fn introduction(interceptor: impl IntroductionInterceptor + 'static) -> Self {
        Advice::Introduction(Arc::new(interceptor))
    }

    /// Before advice from a closure
    pub fn before_fn<F>(f: F) -> Self
    where
        F: Fn(&Method, &mut [Value], &TypeDescriptor) -> AopResult<()> + Send + Sync + 'static,
    {
        Advice::Before(Arc::new(FnBeforeAdvice(f)))
    }

    /// After-returning advice from a closure
    pub fn after_returning_fn<F>(f: F) -> Self
    where
        F: Fn(&Value, &Method, &[Value], Option<&TargetHandle>) -> AopResult<()>
            + Send
            + Sync
            + 'static,
    {
        Advice::AfterReturning(Arc::new(FnAfterReturningAdvice(f)))
    }

    /// Around advice from a closure
    pub fn around_fn<F>(f: F) -> Self
    where
        F: Fn(&mut Invocation<'_>) -> AopResult<Value> + Send + Sync + 'static,
    {
        Advice::Around(Arc::new(FnInterceptor(f)))
    }

    /// Which shape this advice has
    pub fn kind(&self) -> AdviceKind {
        match self {
            Advice::Before(_) => AdviceKind::Before,
            Advice::AfterReturning(_) => AdviceKind::AfterReturning,
            Advice::Throws(_) => AdviceKind::Throws,
            Advice::Around(_) => AdviceKind::Around,
            Advice::Introduction(_) => AdviceKind::Introduction,
        }
    }
}

impl fmt::Debug for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advice::Around(i) => write!(f, "Advice::Around({})", i.describe()),
            Advice::Introduction(i) => write!(f, "Advice::Introduction({})", i.describe()),
            other => write!(f, "Advice::{:?}", other.kind()),
        }
    }
}

// ============================================================================
// Closure adapters
// ============================================================================

/// Before advice backed by a closure
pub struct FnBeforeAdvice<F>(pub F);

impl<F> BeforeAdvice for FnBeforeAdvice<F>
where
    F: Fn(&Method, &mut [Value], &TypeDescriptor) -> AopResult<()> + Send + Sync,
{
    fn before(
        &self,
        method: &Method,
        args: &mut [Value],
        target_type: &TypeDescriptor,
    ) -> AopResult<()> {
        (self.0)(method, args, target_type)
    }
}

/// After-returning advice backed by a closure
pub struct FnAfterReturningAdvice<F>(pub F);

impl<F> AfterReturningAdvice for FnAfterReturningAdvice<F>
where
    F: Fn(&Value, &Method, &[Value], Option<&TargetHandle>) -> AopResult<()> + Send + Sync,
{
    fn after_returning(
        &self,
        return_value: &Value,
        method: &Method,
        args: &[Value],
        target: Option<&TargetHandle>,
    ) -> AopResult<()> {
        (self.0)(return_value, method, args, target)
    }
}

/// Around advice backed by a closure
pub struct FnInterceptor<F>(pub F);

impl<F> FnInterceptor<F>
where
    F: Fn(&mut Invocation<'_>) -> AopResult<Value> + Send + Sync,
{
    /// Wrap a closure
    pub fn new(f: F) -> Self {
        FnInterceptor(f)
    }
}

impl<F> MethodInterceptor for FnInterceptor<F>
where
    F: Fn(&mut Invocation<'_>) -> AopResult<Value> + Send + Sync,
{
    fn invoke(&self, invocation: &mut Invocation<'_>) -> AopResult<Value> {
        (self.0)(invocation)
    }

    fn describe(&self) -> String {
        "FnInterceptor".to_string()
    }
}
