//! Chain construction from registered advisors

use std::sync::Arc;

use tracing::debug;

use crate::advisor::{Advisor, RegisteredAdvisor};
use crate::pointcut::TypeFilters;
use crate::types::{Method, TypeDescriptor};

use super::{ChainLink, InterceptorChain};

/// Builds the chain for a (target type, method) pair
///
/// Building is deterministic: the same advisors and method always produce
/// the same links in the same order.
pub struct InterceptorChainBuilder;

impl InterceptorChainBuilder {
    /// Collect the interceptors of every advisor that applies, in registration order
    ///
    /// - A pointcut advisor applies when its type filter accepts `target_type`
    ///   and its matcher statically accepts `method`. Runtime matchers are
    ///   attached to the link and re-checked on every call.
    /// - An introduction advisor applies when its type filter accepts
    ///   `target_type` and `method` is declared by one of its interfaces.
    pub fn build(
        advisors: &[RegisteredAdvisor],
        target_type: &TypeDescriptor,
        method: &Method,
    ) -> InterceptorChain {
        let mut links = Vec::new();

        for registered in advisors {
            let applies = match registered.advisor() {
                Advisor::Pointcut(advisor) => {
                    let pointcut = advisor.pointcut();
                    let type_ok = TypeFilters::is_always(pointcut.type_filter())
                        || pointcut.type_filter().matches(target_type);
                    type_ok
                        && pointcut
                            .method_matcher()
                            .matches_static(method, Some(target_type))
                }
                Advisor::Introduction(advisor) => {
                    let type_ok = TypeFilters::is_always(advisor.type_filter())
                        || advisor.type_filter().matches(target_type);
                    type_ok && advisor.interfaces().contains(method.declaring_type())
                }
            };
            if !applies {
                continue;
            }

            links.push(ChainLink::new(
                registered.id(),
                Arc::clone(registered.interceptor()),
                registered.runtime_matcher().cloned(),
            ));
        }

        debug!(
            target_type = %target_type,
            method = %method,
            links = links.len(),
            "interceptor chain built"
        );
        InterceptorChain::new(links)
    }
}
