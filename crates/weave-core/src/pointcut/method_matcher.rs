//! Method matchers
//!
//! A method matcher has a static phase, decided once per (type, method), and
//! an optional dynamic phase evaluated before every guarded call with the
//! arguments as they stand at that point in the chain.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::{AopError, AopResult};
use crate::types::{Method, TypeDescriptor};
use crate::value::Value;

/// Predicate over methods, optionally refined per call
pub trait MethodMatcher: Send + Sync {
    /// Whether the matcher has a dynamic phase
    ///
    /// Must not change over the matcher's lifetime; the engine reads it once
    /// at registration.
    fn is_runtime(&self) -> bool {
        false
    }

    /// Static match
    ///
    /// `target_type` may be `None`; implementations that need a type then use
    /// the method's declaring type.
    fn matches_static(&self, method: &Method, target_type: Option<&TypeDescriptor>) -> bool;

    /// Dynamic match against the current arguments
    ///
    /// Only called when `is_runtime()` is true and the static phase matched.
    /// The default rejects the call as a contract violation.
    fn matches_dynamic(
        &self,
        method: &Method,
        target_type: Option<&TypeDescriptor>,
        args: &[Value],
    ) -> AopResult<bool> {
        let _ = (target_type, args);
        Err(AopError::MatcherContractViolation {
            matcher: self.describe(),
            method: method.to_string(),
        })
    }

    /// Human-readable description (used in logs and errors)
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// Matcher that accepts every method and is never dynamic
#[derive(Debug, Clone, Copy, Default)]
pub struct TrueMethodMatcher;

impl MethodMatcher for TrueMethodMatcher {
    fn matches_static(&self, _method: &Method, _target_type: Option<&TypeDescriptor>) -> bool {
        true
    }

    fn describe(&self) -> String {
        "MethodMatcher::True".to_string()
    }
}

static TRUE_METHOD_MATCHER: Lazy<Arc<dyn MethodMatcher>> =
    Lazy::new(|| Arc::new(TrueMethodMatcher));

/// Evaluate one side of a composite at call time
///
/// Static-only sides are never asked for a dynamic match.
fn full_match(
    matcher: &dyn MethodMatcher,
    method: &Method,
    target_type: Option<&TypeDescriptor>,
    args: &[Value],
) -> AopResult<bool> {
    if !matcher.matches_static(method, target_type) {
        return Ok(false);
    }
    if matcher.is_runtime() {
        matcher.matches_dynamic(method, target_type, args)
    } else {
        Ok(true)
    }
}

struct UnionMethodMatcher {
    a: Arc<dyn MethodMatcher>,
    b: Arc<dyn MethodMatcher>,
    runtime: bool,
}

impl MethodMatcher for UnionMethodMatcher {
    fn is_runtime(&self) -> bool {
        self.runtime
    }

    fn matches_static(&self, method: &Method, target_type: Option<&TypeDescriptor>) -> bool {
        self.a.matches_static(method, target_type) || self.b.matches_static(method, target_type)
    }

    fn matches_dynamic(
        &self,
        method: &Method,
        target_type: Option<&TypeDescriptor>,
        args: &[Value],
    ) -> AopResult<bool> {
        Ok(full_match(self.a.as_ref(), method, target_type, args)?
            || full_match(self.b.as_ref(), method, target_type, args)?)
    }

    fn describe(&self) -> String {
        format!("({} | {})", self.a.describe(), self.b.describe())
    }
}

struct IntersectionMethodMatcher {
    a: Arc<dyn MethodMatcher>,
    b: Arc<dyn MethodMatcher>,
    runtime: bool,
}

impl MethodMatcher for IntersectionMethodMatcher {
    fn is_runtime(&self) -> bool {
        self.runtime
    }

    fn matches_static(&self, method: &Method, target_type: Option<&TypeDescriptor>) -> bool {
        self.a.matches_static(method, target_type) && self.b.matches_static(method, target_type)
    }

    fn matches_dynamic(
        &self,
        method: &Method,
        target_type: Option<&TypeDescriptor>,
        args: &[Value],
    ) -> AopResult<bool> {
        Ok(full_match(self.a.as_ref(), method, target_type, args)?
            && full_match(self.b.as_ref(), method, target_type, args)?)
    }

    fn describe(&self) -> String {
        format!("({} & {})", self.a.describe(), self.b.describe())
    }
}

struct StaticFnMatcher<S> {
    static_match: S,
}

impl<S> MethodMatcher for StaticFnMatcher<S>
where
    S: Fn(&Method, Option<&TypeDescriptor>) -> bool + Send + Sync,
{
    fn matches_static(&self, method: &Method, target_type: Option<&TypeDescriptor>) -> bool {
        (self.static_match)(method, target_type)
    }

    fn describe(&self) -> String {
        "MethodMatcher::Fn".to_string()
    }
}

struct DynamicFnMatcher<S, D> {
    static_match: S,
    dynamic_match: D,
}

impl<S, D> MethodMatcher for DynamicFnMatcher<S, D>
where
    S: Fn(&Method, Option<&TypeDescriptor>) -> bool + Send + Sync,
    D: Fn(&Method, Option<&TypeDescriptor>, &[Value]) -> bool + Send + Sync,
{
    fn is_runtime(&self) -> bool {
        true
    }

    fn matches_static(&self, method: &Method, target_type: Option<&TypeDescriptor>) -> bool {
        (self.static_match)(method, target_type)
    }

    fn matches_dynamic(
        &self,
        method: &Method,
        target_type: Option<&TypeDescriptor>,
        args: &[Value],
    ) -> AopResult<bool> {
        Ok((self.dynamic_match)(method, target_type, args))
    }

    fn describe(&self) -> String {
        "MethodMatcher::DynamicFn".to_string()
    }
}

/// Constructors and combinators for method matchers
pub struct MethodMatchers;

impl MethodMatchers {
    /// The canonical match-all, never-dynamic matcher
    pub fn always() -> Arc<dyn MethodMatcher> {
        Arc::clone(&TRUE_METHOD_MATCHER)
    }

    /// Check if `matcher` is the canonical match-all matcher
    pub fn is_always(matcher: &Arc<dyn MethodMatcher>) -> bool {
        Arc::ptr_eq(matcher, &TRUE_METHOD_MATCHER)
    }

    /// Static matcher backed by a closure
    pub fn from_fn<S>(static_match: S) -> Arc<dyn MethodMatcher>
    where
        S: Fn(&Method, Option<&TypeDescriptor>) -> bool + Send + Sync + 'static,
    {
        Arc::new(StaticFnMatcher { static_match })
    }

    /// Runtime matcher backed by a static and a dynamic closure
    pub fn dynamic<S, D>(static_match: S, dynamic_match: D) -> Arc<dyn MethodMatcher>
    where
        S: Fn(&Method, Option<&TypeDescriptor>) -> bool + Send + Sync + 'static,
        D: Fn(&Method, Option<&TypeDescriptor>, &[Value]) -> bool + Send + Sync + 'static,
    {
        Arc::new(DynamicFnMatcher {
            static_match,
            dynamic_match,
        })
    }

    /// Match if either matcher does
    pub fn union(a: Arc<dyn MethodMatcher>, b: Arc<dyn MethodMatcher>) -> Arc<dyn MethodMatcher> {
        let runtime = a.is_runtime() || b.is_runtime();
        Arc::new(UnionMethodMatcher { a, b, runtime })
    }

    /// Match only if both matchers do
    pub fn intersection(
        a: Arc<dyn MethodMatcher>,
        b: Arc<dyn MethodMatcher>,
    ) -> Arc<dyn MethodMatcher> {
        if Self::is_always(&a) {
            return b;
        }
        if Self::is_always(&b) {
            return a;
        }
        let runtime = a.is_runtime() || b.is_runtime();
        Arc::new(IntersectionMethodMatcher { a, b, runtime })
    }
}
