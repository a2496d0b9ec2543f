//! Interceptor chains
//!
//! A chain is the ordered list of interceptors that apply to one
//! (target type, method) pair. Chains are built once from the registered
//! advisors, in registration order, and are immutable afterwards.

mod builder;
mod cache;

pub use builder::InterceptorChainBuilder;
pub use cache::{ChainCache, ChainKey};

use std::fmt;
use std::sync::Arc;

use crate::advice::MethodInterceptor;
use crate::advisor::AdvisorId;
use crate::pointcut::MethodMatcher;

/// One interceptor in a chain
#[derive(Clone)]
pub struct ChainLink {
    advisor: AdvisorId,
    interceptor: Arc<dyn MethodInterceptor>,
    runtime_matcher: Option<Arc<dyn MethodMatcher>>,
}

impl ChainLink {
    /// Create a link
    ///
    /// With a `runtime_matcher`, the interceptor only runs for calls whose
    /// current arguments pass the matcher's dynamic phase; other calls skip
    /// straight to the next link.
    pub fn new(
        advisor: AdvisorId,
        interceptor: Arc<dyn MethodInterceptor>,
        runtime_matcher: Option<Arc<dyn MethodMatcher>>,
    ) -> Self {
        ChainLink {
            advisor,
            interceptor,
            runtime_matcher,
        }
    }

    /// Advisor this link came from
    pub fn advisor(&self) -> AdvisorId {
        self.advisor
    }

    /// The adapted interceptor
    pub fn interceptor(&self) -> &Arc<dyn MethodInterceptor> {
        &self.interceptor
    }

    /// Dynamic guard, if the advisor's matcher is a runtime matcher
    pub fn runtime_matcher(&self) -> Option<&Arc<dyn MethodMatcher>> {
        self.runtime_matcher.as_ref()
    }

    /// Whether the link is guarded by a dynamic match
    pub fn is_dynamic(&self) -> bool {
        self.runtime_matcher.is_some()
    }
}

impl PartialEq for ChainLink {
    fn eq(&self, other: &Self) -> bool {
        self.advisor == other.advisor && Arc::ptr_eq(&self.interceptor, &other.interceptor)
    }
}

impl fmt::Debug for ChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainLink")
            .field("advisor", &self.advisor)
            .field("interceptor", &self.interceptor.describe())
            .field("dynamic", &self.is_dynamic())
            .finish()
    }
}

/// Ordered interceptors for one (target type, method) pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterceptorChain {
    links: Vec<ChainLink>,
}

impl InterceptorChain {
    /// Create a chain from links in call order
    pub fn new(links: Vec<ChainLink>) -> Self {
        InterceptorChain { links }
    }

    /// Chain with no interceptors; calls go straight to the target
    pub fn empty() -> Self {
        Self::default()
    }

    /// Links in call order
    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    /// Number of interceptors
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Check if no interceptor applies
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Advisor ids in call order
    pub fn advisor_ids(&self) -> Vec<AdvisorId> {
        self.links.iter().map(ChainLink::advisor).collect()
    }
}
