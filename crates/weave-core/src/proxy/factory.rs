//! Proxy construction

use std::sync::Arc;

use tracing::debug;

use crate::advice::Advice;
use crate::advisor::{Advisor, PointcutAdvisor};
use crate::config::ProxyConfig;
use crate::error::{AopError, AopResult};
use crate::target::{SingletonTargetSource, TargetHandle, TargetSource};
use crate::types::{InterfaceId, TypeRef};

use super::AopProxy;

/// Collects a target source, advisors and interfaces, then builds proxies
///
/// ```ignore
/// let mut factory = ProxyFactory::for_target(store_type, store);
/// factory.add_advice(Advice::before_fn(log_call))?;
/// factory.add_advisor(PointcutAdvisor::new(Pointcut::name_match(["Load"]), cache))?;
/// let proxy = factory.get_proxy()?;
/// ```
pub struct ProxyFactory {
    target_source: Arc<dyn TargetSource>,
    config: ProxyConfig,
    advisors: Vec<Advisor>,
    interfaces: Vec<InterfaceId>,
}

impl ProxyFactory {
    /// Start from a target source
    pub fn new(target_source: Arc<dyn TargetSource>) -> Self {
        ProxyFactory {
            target_source,
            config: ProxyConfig::default(),
            advisors: Vec::new(),
            interfaces: Vec::new(),
        }
    }

    /// Start from a single target
    pub fn for_target(target_type: TypeRef, target: TargetHandle) -> Self {
        Self::new(Arc::new(SingletonTargetSource::new(target_type, target)))
    }

    /// Use `config` for proxies built from now on
    pub fn with_config(mut self, config: ProxyConfig) -> Self {
        self.config = config;
        self
    }

    /// Add advice that applies to every method
    ///
    /// Introductions need to name their interfaces and are rejected here; use
    /// [`add_advisor`](Self::add_advisor) with an
    /// [`IntroductionAdvisor`](crate::advisor::IntroductionAdvisor).
    pub fn add_advice(&mut self, advice: Advice) -> AopResult<()> {
        if let Advice::Introduction(interceptor) = &advice {
            return Err(AopError::InvalidIntroduction {
                interface: "<unspecified>".to_string(),
                advice: interceptor.describe(),
            });
        }
        self.advisors.push(PointcutAdvisor::always(advice).into());
        Ok(())
    }

    /// Add an advisor after the ones already added
    ///
    /// Introductions are validated immediately.
    pub fn add_advisor(&mut self, advisor: impl Into<Advisor>) -> AopResult<()> {
        let advisor = advisor.into();
        if let Advisor::Introduction(introduction) = &advisor {
            introduction.validate_interfaces()?;
        }
        self.advisors.push(advisor);
        Ok(())
    }

    /// Declare an extra interface the proxy implements
    pub fn add_interface(&mut self, interface: impl Into<InterfaceId>) {
        let interface = interface.into();
        if !self.interfaces.contains(&interface) {
            self.interfaces.push(interface);
        }
    }

    /// Advisors added so far
    pub fn advisors(&self) -> &[Advisor] {
        &self.advisors
    }

    /// Build a proxy
    ///
    /// Proxies built from the same factory share advice instances but have
    /// independent advisor lists and chain caches.
    pub fn get_proxy(&self) -> AopResult<AopProxy> {
        // Registration must happen before the configured freeze applies
        let proxy = AopProxy::with_interfaces(
            Arc::clone(&self.target_source),
            self.config.clone(),
            self.interfaces.clone(),
            false,
        );
        for advisor in &self.advisors {
            proxy.add_advisor(advisor.clone())?;
        }
        if self.config.frozen {
            proxy.freeze();
        }

        debug!(
            target_type = %self.target_source.target_type(),
            advisors = self.advisors.len(),
            "proxy created"
        );
        Ok(proxy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::DelegatingIntroductionInterceptor;
    use crate::advisor::IntroductionAdvisor;
    use crate::target::FnTarget;
    use crate::types::{Method, TypeDescriptor};
    use crate::value::Value;

    fn factory() -> ProxyFactory {
        let ty = TypeDescriptor::new("Store").with_interface("IStore").into_ref();
        ProxyFactory::for_target(ty, Arc::new(FnTarget::new(|_, _| Ok(Value::from(1)))))
    }

    #[test]
    fn test_factory_builds_proxy_with_advisors() {
        let mut f = factory();
        f.add_advice(Advice::around_fn(|inv| {
            let v = inv.proceed()?;
            Ok(Value::from(v.as_int().unwrap_or(0) + 1))
        }))
        .unwrap();
        f.add_interface("IDisposable");

        let proxy = f.get_proxy().unwrap();
        assert_eq!(proxy.advisors().len(), 1);
        assert!(proxy.implements_interface(&"IDisposable".into()));
        let load = Method::new("IStore", "Load").into_ref();
        assert_eq!(proxy.invoke(&load, Vec::new()).unwrap(), Value::from(2));
    }

    #[test]
    fn test_factory_rejects_bad_introduction_eagerly() {
        let mut f = factory();
        let delegate: TargetHandle = Arc::new(FnTarget::new(|_, _| Ok(Value::Null)));
        let mixin = Arc::new(DelegatingIntroductionInterceptor::new(delegate, ["ILockable"]));
        let err = f
            .add_advisor(IntroductionAdvisor::new(mixin, ["IAudited"]))
            .unwrap_err();
        assert!(matches!(err, AopError::InvalidIntroduction { .. }));
        assert!(f.advisors().is_empty());
    }

    #[test]
    fn test_bare_introduction_advice_is_rejected() {
        let mut f = factory();
        let delegate: TargetHandle = Arc::new(FnTarget::new(|_, _| Ok(Value::Null)));
        let err = f
            .add_advice(Advice::introduction(DelegatingIntroductionInterceptor::new(
                delegate,
                ["ILockable"],
            )))
            .unwrap_err();
        assert!(matches!(err, AopError::InvalidIntroduction { .. }));
    }

    #[test]
    fn test_frozen_config_applies_after_registration() {
        let mut f = factory().with_config(ProxyConfig {
            frozen: true,
            ..ProxyConfig::default()
        });
        f.add_advice(Advice::around_fn(|inv| inv.proceed())).unwrap();
        let proxy = f.get_proxy().unwrap();
        assert_eq!(proxy.advisors().len(), 1);
        assert!(proxy.is_frozen());
        assert!(proxy.config().frozen);
    }
}
