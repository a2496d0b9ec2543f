//! Advisors: advice bound to where it applies

use std::fmt;
use std::sync::Arc;

use crate::advice::{adapt, Advice, IntroductionInterceptor, MethodInterceptor};
use crate::error::{AopError, AopResult};
use crate::pointcut::{MethodMatcher, Pointcut, TypeFilter, TypeFilters};
use crate::types::InterfaceId;

/// Handle to a registered advisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdvisorId(u64);

impl AdvisorId {
    /// Create an id from its raw value
    pub const fn new(raw: u64) -> Self {
        AdvisorId(raw)
    }

    /// Raw value
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AdvisorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "advisor#{}", self.0)
    }
}

// ============================================================================
// Pointcut advisor
// ============================================================================

/// Advice applied wherever a pointcut matches
#[derive(Clone)]
pub struct PointcutAdvisor {
    pointcut: Pointcut,
    advice: Advice,
    per_instance: bool,
}

impl PointcutAdvisor {
    /// Bind `advice` to `pointcut`
    pub fn new(pointcut: Pointcut, advice: Advice) -> Self {
        PointcutAdvisor {
            pointcut,
            advice,
            per_instance: false,
        }
    }

    /// Bind `advice` to every method of every type
    pub fn always(advice: Advice) -> Self {
        Self::new(Pointcut::always(), advice)
    }

    /// Mark the advice as holding per-instance state
    pub fn per_instance(mut self, per_instance: bool) -> Self {
        self.per_instance = per_instance;
        self
    }

    /// Where the advice applies
    pub fn pointcut(&self) -> &Pointcut {
        &self.pointcut
    }

    /// The bound advice
    pub fn advice(&self) -> &Advice {
        &self.advice
    }

    /// Whether the advice holds per-instance state
    pub fn is_per_instance(&self) -> bool {
        self.per_instance
    }
}

impl fmt::Debug for PointcutAdvisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointcutAdvisor")
            .field("pointcut", &self.pointcut)
            .field("advice", &self.advice)
            .field("per_instance", &self.per_instance)
            .finish()
    }
}

// ============================================================================
// Introduction advisor
// ============================================================================

/// Makes proxies of matching types implement extra interfaces
///
/// Only the type filter decides applicability; every method declared by one
/// of the introduced interfaces is routed through the interceptor.
#[derive(Clone)]
pub struct IntroductionAdvisor {
    interceptor: Arc<dyn IntroductionInterceptor>,
    type_filter: Arc<dyn TypeFilter>,
    interfaces: Vec<InterfaceId>,
    per_instance: bool,
}

impl IntroductionAdvisor {
    /// Introduce `interfaces` on every type
    pub fn new<I, S>(interceptor: Arc<dyn IntroductionInterceptor>, interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<InterfaceId>,
    {
        let mut ids: Vec<InterfaceId> = Vec::new();
        for iface in interfaces {
            let iface = iface.into();
            if !ids.contains(&iface) {
                ids.push(iface);
            }
        }
        IntroductionAdvisor {
            interceptor,
            type_filter: TypeFilters::always(),
            interfaces: ids,
            per_instance: true,
        }
    }

    /// Only introduce on types `filter` accepts
    pub fn with_type_filter(mut self, filter: Arc<dyn TypeFilter>) -> Self {
        self.type_filter = filter;
        self
    }

    /// Mark whether the mixin holds per-instance state
    pub fn per_instance(mut self, per_instance: bool) -> Self {
        self.per_instance = per_instance;
        self
    }

    /// Introduction interceptor
    pub fn interceptor(&self) -> &Arc<dyn IntroductionInterceptor> {
        &self.interceptor
    }

    /// Types the introduction applies to
    pub fn type_filter(&self) -> &Arc<dyn TypeFilter> {
        &self.type_filter
    }

    /// Introduced interfaces
    pub fn interfaces(&self) -> &[InterfaceId] {
        &self.interfaces
    }

    /// Whether the mixin holds per-instance state
    pub fn is_per_instance(&self) -> bool {
        self.per_instance
    }

    /// Check that the interceptor implements every declared interface
    pub fn validate_interfaces(&self) -> AopResult<()> {
        if self.interfaces.is_empty() {
            return Err(AopError::InvalidIntroduction {
                interface: "<none>".to_string(),
                advice: self.interceptor.describe(),
            });
        }
        for iface in &self.interfaces {
            if !self.interceptor.implements_interface(iface) {
                return Err(AopError::InvalidIntroduction {
                    interface: iface.to_string(),
                    advice: self.interceptor.describe(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for IntroductionAdvisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntroductionAdvisor")
            .field("interceptor", &self.interceptor.describe())
            .field("type_filter", &self.type_filter.describe())
            .field("interfaces", &self.interfaces)
            .field("per_instance", &self.per_instance)
            .finish()
    }
}

// ============================================================================
// Advisor
// ============================================================================

/// Any advisor the engine accepts
#[derive(Debug, Clone)]
pub enum Advisor {
    /// Method-level advice
    Pointcut(PointcutAdvisor),
    /// Interface introduction
    Introduction(IntroductionAdvisor),
}

impl Advisor {
    /// The advice carried by the advisor
    pub fn advice(&self) -> Advice {
        match self {
            Advisor::Pointcut(a) => a.advice().clone(),
            Advisor::Introduction(a) => Advice::Introduction(Arc::clone(a.interceptor())),
        }
    }

    /// Informational per-instance flag; the engine never branches on it
    pub fn is_per_instance(&self) -> bool {
        match self {
            Advisor::Pointcut(a) => a.is_per_instance(),
            Advisor::Introduction(a) => a.is_per_instance(),
        }
    }

    /// Interfaces an introduction adds; empty for pointcut advisors
    pub fn introduced_interfaces(&self) -> &[InterfaceId] {
        match self {
            Advisor::Pointcut(_) => &[],
            Advisor::Introduction(a) => a.interfaces(),
        }
    }
}

impl From<PointcutAdvisor> for Advisor {
    fn from(advisor: PointcutAdvisor) -> Self {
        Advisor::Pointcut(advisor)
    }
}

impl From<IntroductionAdvisor> for Advisor {
    fn from(advisor: IntroductionAdvisor) -> Self {
        Advisor::Introduction(advisor)
    }
}

/// An advisor accepted by a proxy
///
/// Registration validates introductions and adapts the advice once, so
/// chain building only copies handles.
#[derive(Clone)]
pub struct RegisteredAdvisor {
    id: AdvisorId,
    advisor: Advisor,
    interceptor: Arc<dyn MethodInterceptor>,
    runtime_matcher: Option<Arc<dyn MethodMatcher>>,
}

impl RegisteredAdvisor {
    /// Validate and adapt an advisor
    pub fn new(id: AdvisorId, advisor: Advisor) -> AopResult<Self> {
        if let Advisor::Introduction(introduction) = &advisor {
            introduction.validate_interfaces()?;
        }
        let interceptor = adapt(&advisor.advice());
        let runtime_matcher = match &advisor {
            Advisor::Pointcut(a) if a.pointcut().method_matcher().is_runtime() => {
                Some(Arc::clone(a.pointcut().method_matcher()))
            }
            _ => None,
        };
        Ok(RegisteredAdvisor {
            id,
            advisor,
            interceptor,
            runtime_matcher,
        })
    }

    /// Registration handle
    pub fn id(&self) -> AdvisorId {
        self.id
    }

    /// The advisor as registered
    pub fn advisor(&self) -> &Advisor {
        &self.advisor
    }

    /// Advice adapted to an interceptor
    pub fn interceptor(&self) -> &Arc<dyn MethodInterceptor> {
        &self.interceptor
    }

    pub(crate) fn runtime_matcher(&self) -> Option<&Arc<dyn MethodMatcher>> {
        self.runtime_matcher.as_ref()
    }
}

impl fmt::Debug for RegisteredAdvisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredAdvisor")
            .field("id", &self.id)
            .field("advisor", &self.advisor)
            .finish()
    }
}
