//! Proxies: the invocation entry point
//!
//! An [`AopProxy`] owns a target source and an ordered advisor list. Every
//! call looks up (or builds) the chain for its target type and method, then
//! walks it through a fresh [`Invocation`].
//!
//! With the default [`ProxyConfig`] the advisor list freezes when the first
//! chain is built; later `add_advisor`/`remove_advisor` calls fail with
//! [`AopError::ConfigurationFrozen`] instead of leaving stale chains behind.

mod factory;

pub use factory::ProxyFactory;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::advisor::{Advisor, AdvisorId, RegisteredAdvisor};
use crate::chain::{ChainCache, InterceptorChain, InterceptorChainBuilder};
use crate::config::ProxyConfig;
use crate::error::{AopError, AopResult};
use crate::invocation::Invocation;
use crate::target::TargetSource;
use crate::types::{InterfaceId, MethodRef, TypeRef};
use crate::value::Value;

/// Description of one call made through a proxy
#[derive(Debug, Clone)]
pub struct MethodCall {
    /// Method being called
    pub method: MethodRef,
    /// Arguments in declaration order
    pub arguments: Vec<Value>,
    /// Type to match against; the target source's type when `None`
    pub target_type: Option<TypeRef>,
}

impl MethodCall {
    /// Call `method` with `arguments`
    pub fn new(method: MethodRef, arguments: Vec<Value>) -> Self {
        MethodCall {
            method,
            arguments,
            target_type: None,
        }
    }

    /// Match against `target_type` instead of the target source's type
    pub fn with_target_type(mut self, target_type: TypeRef) -> Self {
        self.target_type = Some(target_type);
        self
    }
}

/// Advisor list and the chains built from it
///
/// Never mutated once published; registration changes publish a new one.
struct AdvisorGeneration {
    advisors: Vec<RegisteredAdvisor>,
    chains: ChainCache,
}

impl AdvisorGeneration {
    fn new(advisors: Vec<RegisteredAdvisor>) -> Arc<Self> {
        Arc::new(AdvisorGeneration {
            advisors,
            chains: ChainCache::new(),
        })
    }
}

struct ProxyState {
    config: ProxyConfig,
    target_source: Arc<dyn TargetSource>,
    /// Interfaces declared on the factory, beyond the target type's own
    declared_interfaces: Vec<InterfaceId>,
    generation: RwLock<Arc<AdvisorGeneration>>,
    next_id: AtomicU64,
    frozen: AtomicBool,
    builds: AtomicUsize,
}

/// Proxy dispatching calls through interceptor chains
///
/// Cloning is cheap; clones share advisors and cached chains.
#[derive(Clone)]
pub struct AopProxy {
    state: Arc<ProxyState>,
}

impl AopProxy {
    /// Create a proxy with no advisors
    pub fn new(target_source: Arc<dyn TargetSource>, config: ProxyConfig) -> Self {
        let frozen = config.frozen;
        Self::with_interfaces(target_source, config, Vec::new(), frozen)
    }

    pub(crate) fn with_interfaces(
        target_source: Arc<dyn TargetSource>,
        config: ProxyConfig,
        declared_interfaces: Vec<InterfaceId>,
        frozen: bool,
    ) -> Self {
        AopProxy {
            state: Arc::new(ProxyState {
                config,
                target_source,
                declared_interfaces,
                generation: RwLock::new(AdvisorGeneration::new(Vec::new())),
                next_id: AtomicU64::new(1),
                frozen: AtomicBool::new(frozen),
                builds: AtomicUsize::new(0),
            }),
        }
    }

    /// Proxy configuration
    pub fn config(&self) -> &ProxyConfig {
        &self.state.config
    }

    /// Source of the targets behind this proxy
    pub fn target_source(&self) -> &Arc<dyn TargetSource> {
        &self.state.target_source
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Append an advisor to the end of the list
    ///
    /// Introductions are validated here, so an advisor that cannot implement
    /// its interfaces is rejected before any call is made.
    pub fn add_advisor(&self, advisor: impl Into<Advisor>) -> AopResult<AdvisorId> {
        let id = AdvisorId::new(self.state.next_id.fetch_add(1, Ordering::Relaxed));
        let registered = RegisteredAdvisor::new(id, advisor.into())?;

        let mut generation = self.state.generation.write();
        self.ensure_mutable("add advisor")?;
        let mut advisors = generation.advisors.clone();
        advisors.push(registered);
        *generation = AdvisorGeneration::new(advisors);
        drop(generation);

        debug!(advisor = %id, "advisor added");
        Ok(id)
    }

    /// Remove a previously added advisor
    pub fn remove_advisor(&self, id: AdvisorId) -> AopResult<Advisor> {
        let mut generation = self.state.generation.write();
        self.ensure_mutable("remove advisor")?;
        let index = generation
            .advisors
            .iter()
            .position(|a| a.id() == id)
            .ok_or(AopError::AdvisorNotFound(id))?;
        let mut advisors = generation.advisors.clone();
        let removed = advisors.remove(index);
        *generation = AdvisorGeneration::new(advisors);
        drop(generation);

        debug!(advisor = %id, "advisor removed");
        Ok(removed.advisor().clone())
    }

    /// Registered advisors in order
    pub fn advisors(&self) -> Vec<RegisteredAdvisor> {
        self.generation().advisors.clone()
    }

    /// Current advisor generation; the lock is released on return
    fn generation(&self) -> Arc<AdvisorGeneration> {
        Arc::clone(&*self.state.generation.read())
    }

    /// Stop accepting advisor changes
    pub fn freeze(&self) {
        if !self.state.frozen.swap(true, Ordering::AcqRel) {
            debug!("advisor configuration frozen");
        }
    }

    /// Whether advisor changes are rejected
    pub fn is_frozen(&self) -> bool {
        self.state.frozen.load(Ordering::Acquire)
    }

    fn ensure_mutable(&self, operation: &'static str) -> AopResult<()> {
        if self.is_frozen() {
            return Err(AopError::ConfigurationFrozen { operation });
        }
        Ok(())
    }

    // ========================================================================
    // Interfaces
    // ========================================================================

    /// Interfaces the proxy implements
    ///
    /// The target type's own, then those declared on the factory, then those
    /// added by introductions, without duplicates.
    pub fn interfaces(&self) -> Vec<InterfaceId> {
        let target_type = self.state.target_source.target_type();
        let generation = self.generation();
        let introduced = generation
            .advisors
            .iter()
            .flat_map(|a| a.advisor().introduced_interfaces().iter());

        let mut seen = FxHashSet::default();
        target_type
            .interfaces()
            .iter()
            .chain(self.state.declared_interfaces.iter())
            .chain(introduced)
            .filter(|iface| seen.insert((*iface).clone()))
            .cloned()
            .collect()
    }

    /// Check if the proxy implements `interface`
    pub fn implements_interface(&self, interface: &InterfaceId) -> bool {
        let target_type = self.state.target_source.target_type();
        target_type.is_assignable_to(interface)
            || self.state.declared_interfaces.contains(interface)
            || self
                .generation()
                .advisors
                .iter()
                .any(|a| a.advisor().introduced_interfaces().contains(interface))
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Call `method` on the target's type
    pub fn invoke(&self, method: &MethodRef, arguments: Vec<Value>) -> AopResult<Value> {
        self.call(MethodCall::new(Arc::clone(method), arguments))
    }

    /// Run one call through its chain
    pub fn call(&self, call: MethodCall) -> AopResult<Value> {
        let target_type = call
            .target_type
            .unwrap_or_else(|| Arc::clone(self.state.target_source.target_type()));
        let chain = self.chain(&target_type, &call.method);
        trace!(method = %call.method, links = chain.len(), "invoking through proxy");

        let mut invocation = Invocation::new(
            call.method,
            call.arguments,
            target_type,
            self.state.target_source.as_ref(),
            chain,
        );
        invocation.proceed()
    }

    /// Chain serving `method` on the target's type
    pub fn chain_for(&self, method: &MethodRef) -> Arc<InterceptorChain> {
        let target_type = Arc::clone(self.state.target_source.target_type());
        self.chain(&target_type, method)
    }

    /// Number of chains built so far
    pub fn chains_built(&self) -> usize {
        self.state.builds.load(Ordering::Relaxed)
    }

    fn chain(&self, target_type: &TypeRef, method: &MethodRef) -> Arc<InterceptorChain> {
        if self.state.config.freeze_on_first_use {
            self.freeze();
        }

        // Matchers run without the lock; a concurrent change publishes a new
        // generation and leaves this one intact
        let generation = self.generation();
        if !self.state.config.cache_chains {
            return Arc::new(InterceptorChainBuilder::build(
                &generation.advisors,
                target_type,
                method,
            ));
        }
        generation.chains.get_or_build(
            (Arc::clone(target_type), Arc::clone(method)),
            || {
                self.state.builds.fetch_add(1, Ordering::Relaxed);
                InterceptorChainBuilder::build(&generation.advisors, target_type, method)
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::Advice;
    use crate::advisor::PointcutAdvisor;
    use crate::pointcut::{MethodMatchers, Pointcut};
    use once_cell::sync::OnceCell;
    use crate::target::{FnTarget, SingletonTargetSource};
    use crate::types::{Method, TypeDescriptor};

    fn proxy(config: ProxyConfig) -> AopProxy {
        let ty = TypeDescriptor::new("Store").with_interface("IStore").into_ref();
        let target = Arc::new(FnTarget::new(|m, _| Ok(Value::from(m.name()))));
        AopProxy::new(Arc::new(SingletonTargetSource::new(ty, target)), config)
    }

    fn noop() -> PointcutAdvisor {
        PointcutAdvisor::always(Advice::around_fn(|inv| inv.proceed()))
    }

    #[test]
    fn test_first_use_freezes() {
        let p = proxy(ProxyConfig::default());
        p.add_advisor(noop()).unwrap();
        assert!(!p.is_frozen());

        let load = Method::new("IStore", "Load").into_ref();
        assert_eq!(p.invoke(&load, Vec::new()).unwrap(), Value::from("Load"));
        assert!(p.is_frozen());

        let err = p.add_advisor(noop()).unwrap_err();
        assert!(matches!(err, AopError::ConfigurationFrozen { operation: "add advisor" }));
    }

    #[test]
    fn test_mutable_config_rebuilds_chains() {
        let p = proxy(ProxyConfig {
            freeze_on_first_use: false,
            ..ProxyConfig::default()
        });
        let load = Method::new("IStore", "Load").into_ref();
        assert!(p.chain_for(&load).is_empty());

        let id = p.add_advisor(noop()).unwrap();
        assert_eq!(p.chain_for(&load).advisor_ids(), vec![id]);

        p.remove_advisor(id).unwrap();
        assert!(p.chain_for(&load).is_empty());
        assert_eq!(p.chains_built(), 3);
    }

    #[test]
    fn test_remove_unknown_advisor() {
        let p = proxy(ProxyConfig::default());
        let err = p.remove_advisor(AdvisorId::new(42)).unwrap_err();
        assert!(matches!(err, AopError::AdvisorNotFound(id) if id == AdvisorId::new(42)));
    }

    #[test]
    fn test_start_frozen() {
        let p = proxy(ProxyConfig {
            frozen: true,
            ..ProxyConfig::default()
        });
        assert!(p.add_advisor(noop()).is_err());
    }

    #[test]
    fn test_chain_cache_reused() {
        let p = proxy(ProxyConfig::default());
        p.add_advisor(PointcutAdvisor::new(
            Pointcut::name_match(["Load"]),
            Advice::around_fn(|inv| inv.proceed()),
        ))
        .unwrap();
        let load = Method::new("IStore", "Load").into_ref();
        for _ in 0..3 {
            p.invoke(&load, Vec::new()).unwrap();
        }
        assert_eq!(p.chains_built(), 1);
        assert!(Arc::ptr_eq(&p.chain_for(&load), &p.chain_for(&load)));
    }

    #[test]
    fn test_uncached_chains_rebuild_per_call() {
        let p = proxy(ProxyConfig {
            cache_chains: false,
            ..ProxyConfig::default()
        });
        let load = Method::new("IStore", "Load").into_ref();
        p.invoke(&load, Vec::new()).unwrap();
        p.invoke(&load, Vec::new()).unwrap();
        assert_eq!(p.chains_built(), 0);
    }

    #[test]
    fn test_matchers_may_call_back_into_the_proxy() {
        let p = proxy(ProxyConfig {
            freeze_on_first_use: false,
            ..ProxyConfig::default()
        });
        let handle: Arc<OnceCell<AopProxy>> = Arc::new(OnceCell::new());
        let inner = Arc::clone(&handle);
        let registered = Arc::new(AtomicBool::new(false));
        p.add_advisor(PointcutAdvisor::new(
            Pointcut::for_methods(MethodMatchers::from_fn(move |_, _| {
                if let Some(p) = inner.get() {
                    assert!(p.implements_interface(&InterfaceId::from("IStore")));
                    if !registered.swap(true, Ordering::SeqCst) {
                        p.add_advisor(noop()).unwrap();
                    }
                }
                true
            })),
            Advice::around_fn(|inv| inv.proceed()),
        ))
        .unwrap();
        assert!(handle.set(p.clone()).is_ok());

        let load = Method::new("IStore", "Load").into_ref();
        assert_eq!(p.invoke(&load, Vec::new()).unwrap(), Value::from("Load"));
        assert_eq!(p.advisors().len(), 2);
        assert_eq!(p.chain_for(&load).len(), 2);
    }

    #[test]
    fn test_target_type_override() {
        let p = proxy(ProxyConfig::default());
        p.add_advisor(PointcutAdvisor::new(
            Pointcut::for_types(crate::pointcut::TypeFilters::root("ICache")),
            Advice::around_fn(|_| Ok(Value::from("cache"))),
        ))
        .unwrap();
        let get = Method::new("IStore", "Get").into_ref();

        assert_eq!(p.invoke(&get, Vec::new()).unwrap(), Value::from("Get"));
        let call = MethodCall::new(Arc::clone(&get), Vec::new())
            .with_target_type(TypeDescriptor::new("Cache").with_interface("ICache").into_ref());
        assert_eq!(p.call(call).unwrap(), Value::from("cache"));
    }
}
