//! Type filters
//!
//! A type filter decides whether a pointcut applies to instances of a type
//! at all, before any method is considered.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::types::{Attribute, InterfaceId, TypeDescriptor};

/// Predicate over target types
///
/// Implementations must be pure: the chain builder may call `matches` any
/// number of times, from any thread.
pub trait TypeFilter: Send + Sync {
    /// Check if the filter accepts `target_type`
    fn matches(&self, target_type: &TypeDescriptor) -> bool;

    /// Human-readable description (used in logs and errors)
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// Filter that accepts every type
#[derive(Debug, Clone, Copy, Default)]
pub struct TrueTypeFilter;

impl TypeFilter for TrueTypeFilter {
    fn matches(&self, _target_type: &TypeDescriptor) -> bool {
        true
    }

    fn describe(&self) -> String {
        "TypeFilter::True".to_string()
    }
}

static TRUE_TYPE_FILTER: Lazy<Arc<dyn TypeFilter>> = Lazy::new(|| Arc::new(TrueTypeFilter));

/// Accepts a root type and every type assignable to it
#[derive(Debug, Clone)]
pub struct RootTypeFilter {
    root: InterfaceId,
}

impl RootTypeFilter {
    /// Create a filter rooted at `root`
    pub fn new(root: impl Into<InterfaceId>) -> Self {
        RootTypeFilter { root: root.into() }
    }
}

impl TypeFilter for RootTypeFilter {
    fn matches(&self, target_type: &TypeDescriptor) -> bool {
        target_type.is_assignable_to(&self.root)
    }

    fn describe(&self) -> String {
        format!("TypeFilter::Root({})", self.root)
    }
}

/// Accepts types carrying an attribute
#[derive(Debug, Clone)]
pub struct AttributeTypeFilter {
    attribute: Attribute,
}

impl AttributeTypeFilter {
    /// Create a filter for `attribute`
    pub fn new(attribute: impl Into<Attribute>) -> Self {
        AttributeTypeFilter {
            attribute: attribute.into(),
        }
    }
}

impl TypeFilter for AttributeTypeFilter {
    fn matches(&self, target_type: &TypeDescriptor) -> bool {
        target_type.has_attribute(&self.attribute)
    }

    fn describe(&self) -> String {
        format!("TypeFilter::Attribute({})", self.attribute)
    }
}

struct UnionTypeFilter {
    filters: Vec<Arc<dyn TypeFilter>>,
}

impl TypeFilter for UnionTypeFilter {
    fn matches(&self, target_type: &TypeDescriptor) -> bool {
        self.filters.iter().any(|f| f.matches(target_type))
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.filters.iter().map(|f| f.describe()).collect();
        format!("({})", parts.join(" | "))
    }
}

struct IntersectionTypeFilter {
    filters: Vec<Arc<dyn TypeFilter>>,
}

impl TypeFilter for IntersectionTypeFilter {
    fn matches(&self, target_type: &TypeDescriptor) -> bool {
        self.filters.iter().all(|f| f.matches(target_type))
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.filters.iter().map(|f| f.describe()).collect();
        format!("({})", parts.join(" & "))
    }
}

struct FnTypeFilter<F> {
    predicate: F,
}

impl<F> TypeFilter for FnTypeFilter<F>
where
    F: Fn(&TypeDescriptor) -> bool + Send + Sync,
{
    fn matches(&self, target_type: &TypeDescriptor) -> bool {
        (self.predicate)(target_type)
    }

    fn describe(&self) -> String {
        "TypeFilter::Fn".to_string()
    }
}

/// Constructors and combinators for type filters
pub struct TypeFilters;

impl TypeFilters {
    /// The canonical match-all filter
    ///
    /// Every call returns a handle to the same shared instance.
    pub fn always() -> Arc<dyn TypeFilter> {
        Arc::clone(&TRUE_TYPE_FILTER)
    }

    /// Check if `filter` is the canonical match-all filter
    pub fn is_always(filter: &Arc<dyn TypeFilter>) -> bool {
        Arc::ptr_eq(filter, &TRUE_TYPE_FILTER)
    }

    /// Filter accepting `root` and its subtypes
    pub fn root(root: impl Into<InterfaceId>) -> Arc<dyn TypeFilter> {
        Arc::new(RootTypeFilter::new(root))
    }

    /// Filter accepting types that carry `attribute`
    pub fn attribute(attribute: impl Into<Attribute>) -> Arc<dyn TypeFilter> {
        Arc::new(AttributeTypeFilter::new(attribute))
    }

    /// Filter backed by a closure
    pub fn from_fn<F>(predicate: F) -> Arc<dyn TypeFilter>
    where
        F: Fn(&TypeDescriptor) -> bool + Send + Sync + 'static,
    {
        Arc::new(FnTypeFilter { predicate })
    }

    /// Accept a type if either filter does
    pub fn union(a: Arc<dyn TypeFilter>, b: Arc<dyn TypeFilter>) -> Arc<dyn TypeFilter> {
        if Self::is_always(&a) || Self::is_always(&b) {
            return Self::always();
        }
        Arc::new(UnionTypeFilter {
            filters: vec![a, b],
        })
    }

    /// Accept a type only if both filters do
    pub fn intersection(a: Arc<dyn TypeFilter>, b: Arc<dyn TypeFilter>) -> Arc<dyn TypeFilter> {
        if Self::is_always(&a) {
            return b;
        }
        if Self::is_always(&b) {
            return a;
        }
        Arc::new(IntersectionTypeFilter {
            filters: vec![a, b],
        })
    }
}
