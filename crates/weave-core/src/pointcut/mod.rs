//! Pointcuts: where advice applies
//!
//! A [`Pointcut`] pairs a [`TypeFilter`] with a [`MethodMatcher`]. Both halves
//! are fixed at construction. An advisor applies to a (type, method) pair when
//! the filter accepts the type and the matcher's static phase accepts the method.

mod method_matcher;
mod patterns;
mod type_filter;

pub use method_matcher::{MethodMatcher, MethodMatchers, TrueMethodMatcher};
pub use patterns::{
    simple_match, AttributeMethodMatcher, NameMatchMethodMatcher, RegexMethodMatcher,
};
pub use type_filter::{
    AttributeTypeFilter, RootTypeFilter, TrueTypeFilter, TypeFilter, TypeFilters,
};

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::AopResult;
use crate::types::{Attribute, Method, TypeDescriptor};
use crate::value::Value;

static TRUE_POINTCUT: Lazy<Pointcut> = Lazy::new(|| Pointcut {
    type_filter: TypeFilters::always(),
    method_matcher: MethodMatchers::always(),
});

/// Immutable (type filter, method matcher) pair
#[derive(Clone)]
pub struct Pointcut {
    type_filter: Arc<dyn TypeFilter>,
    method_matcher: Arc<dyn MethodMatcher>,
}

impl Pointcut {
    /// Create a pointcut
    pub fn new(type_filter: Arc<dyn TypeFilter>, method_matcher: Arc<dyn MethodMatcher>) -> Self {
        Pointcut {
            type_filter,
            method_matcher,
        }
    }

    /// The canonical pointcut: every type, every method, never dynamic
    pub fn always() -> Self {
        TRUE_POINTCUT.clone()
    }

    /// Pointcut over all types restricted by a method matcher
    pub fn for_methods(method_matcher: Arc<dyn MethodMatcher>) -> Self {
        Pointcut::new(TypeFilters::always(), method_matcher)
    }

    /// Pointcut over every method of the types a filter accepts
    pub fn for_types(type_filter: Arc<dyn TypeFilter>) -> Self {
        Pointcut::new(type_filter, MethodMatchers::always())
    }

    /// Methods whose names fit one of the wildcard patterns
    pub fn name_match<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Pointcut::for_methods(Arc::new(NameMatchMethodMatcher::new(patterns)))
    }

    /// Methods whose `Type.Method` name matches one of the regexes
    pub fn regex<I, S>(patterns: I) -> AopResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Pointcut::for_methods(Arc::new(RegexMethodMatcher::new(
            patterns,
        )?)))
    }

    /// Methods carrying an attribute
    pub fn attribute(attribute: impl Into<Attribute>) -> Self {
        Pointcut::for_methods(Arc::new(AttributeMethodMatcher::new(attribute)))
    }

    /// Type filter half
    pub fn type_filter(&self) -> &Arc<dyn TypeFilter> {
        &self.type_filter
    }

    /// Method matcher half
    pub fn method_matcher(&self) -> &Arc<dyn MethodMatcher> {
        &self.method_matcher
    }

    /// Check if this is the canonical match-everything pointcut
    pub fn is_always(&self) -> bool {
        TypeFilters::is_always(&self.type_filter) && MethodMatchers::is_always(&self.method_matcher)
    }

    /// Static applicability to a (type, method) pair
    pub fn matches(&self, target_type: &TypeDescriptor, method: &Method) -> bool {
        (TypeFilters::is_always(&self.type_filter) || self.type_filter.matches(target_type))
            && self.method_matcher.matches_static(method, Some(target_type))
    }

    /// Pointcut matching wherever either pointcut matches
    ///
    /// Each side's method matcher stays paired with its own type filter, so a
    /// method matched by `self` on a type only `other` accepts does not match.
    pub fn union(&self, other: &Pointcut) -> Pointcut {
        if self.is_always() || other.is_always() {
            return Pointcut::always();
        }
        let runtime = self.method_matcher.is_runtime() || other.method_matcher.is_runtime();
        Pointcut {
            type_filter: TypeFilters::union(self.type_filter.clone(), other.type_filter.clone()),
            method_matcher: Arc::new(PairedUnionMatcher {
                a: self.clone(),
                b: other.clone(),
                runtime,
            }),
        }
    }

    /// Pointcut matching only where both pointcuts match
    pub fn intersection(&self, other: &Pointcut) -> Pointcut {
        Pointcut {
            type_filter: TypeFilters::intersection(
                self.type_filter.clone(),
                other.type_filter.clone(),
            ),
            method_matcher: MethodMatchers::intersection(
                self.method_matcher.clone(),
                other.method_matcher.clone(),
            ),
        }
    }
}

impl fmt::Debug for Pointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pointcut")
            .field("type_filter", &self.type_filter.describe())
            .field("method_matcher", &self.method_matcher.describe())
            .finish()
    }
}

/// Union of two pointcuts that keeps each matcher behind its own type filter
struct PairedUnionMatcher {
    a: Pointcut,
    b: Pointcut,
    runtime: bool,
}

impl PairedUnionMatcher {
    fn side_static(pc: &Pointcut, method: &Method, target_type: Option<&TypeDescriptor>) -> bool {
        let type_ok = match target_type {
            Some(ty) => pc.type_filter.matches(ty),
            None => pc
                .type_filter
                .matches(&TypeDescriptor::new(method.declaring_type().clone())),
        };
        type_ok && pc.method_matcher.matches_static(method, target_type)
    }

    fn side_dynamic(
        pc: &Pointcut,
        method: &Method,
        target_type: Option<&TypeDescriptor>,
        args: &[Value],
    ) -> AopResult<bool> {
        if !Self::side_static(pc, method, target_type) {
            return Ok(false);
        }
        if pc.method_matcher.is_runtime() {
            pc.method_matcher.matches_dynamic(method, target_type, args)
        } else {
            Ok(true)
        }
    }
}

impl MethodMatcher for PairedUnionMatcher {
    fn is_runtime(&self) -> bool {
        self.runtime
    }

    fn matches_static(&self, method: &Method, target_type: Option<&TypeDescriptor>) -> bool {
        Self::side_static(&self.a, method, target_type)
            || Self::side_static(&self.b, method, target_type)
    }

    fn matches_dynamic(
        &self,
        method: &Method,
        target_type: Option<&TypeDescriptor>,
        args: &[Value],
    ) -> AopResult<bool> {
        Ok(Self::side_dynamic(&self.a, method, target_type, args)?
            || Self::side_dynamic(&self.b, method, target_type, args)?)
    }

    fn describe(&self) -> String {
        format!("({:?} | {:?})", self.a, self.b)
    }
}
