//! Weave - Interception engine
//!
//! Attaches advice to method calls through declarative pointcuts without
//! touching the target's code. Calls made through an [`AopProxy`] walk an
//! ordered interceptor chain built from the proxy's advisors; the target runs
//! once every interceptor has proceeded.
//!
//! # Example
//!
//! ```ignore
//! use weave_core::{Advice, Method, Pointcut, PointcutAdvisor, ProxyFactory, TypeDescriptor};
//!
//! let mut factory = ProxyFactory::for_target(store_type, store);
//! factory.add_advice(Advice::before_fn(|method, _, _| {
//!     tracing::info!(%method, "calling");
//!     Ok(())
//! }))?;
//! factory.add_advisor(PointcutAdvisor::new(Pointcut::name_match(["Load"]), cache_advice))?;
//!
//! let proxy = factory.get_proxy()?;
//! let value = proxy.invoke(&load, vec!["X".into()])?;
//! ```

#![warn(missing_docs)]

pub mod advice;
pub mod advisor;
pub mod chain;
pub mod config;
pub mod error;
pub mod invocation;
pub mod pointcut;
pub mod proxy;
pub mod target;
pub mod types;
pub mod value;

pub use advice::{
    Advice, AdviceKind, AfterReturningAdvice, BeforeAdvice, DelegatingIntroductionInterceptor,
    FnInterceptor, IntroductionInterceptor, MethodInterceptor, ThrowsAdvice, ThrowsContext,
    ThrowsHandlers, ThrowsOutcome,
};
pub use advisor::{Advisor, AdvisorId, IntroductionAdvisor, PointcutAdvisor, RegisteredAdvisor};
pub use chain::{ChainCache, ChainLink, InterceptorChain, InterceptorChainBuilder};
pub use config::{PoolConfig, ProxyConfig};
pub use error::{AopError, AopResult, Throwable};
pub use invocation::Invocation;
pub use pointcut::{MethodMatcher, MethodMatchers, Pointcut, TypeFilter, TypeFilters};
pub use proxy::{AopProxy, MethodCall, ProxyFactory};
pub use target::{
    EmptyTargetSource, FnTarget, HotSwappableTargetSource, PoolingTargetSource,
    PrototypeTargetSource, SingletonTargetSource, Target, TargetHandle, TargetSource,
};
pub use types::{Attribute, InterfaceId, Method, MethodRef, TypeDescriptor, TypeRef};
pub use value::Value;
