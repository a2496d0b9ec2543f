//! Mixin introductions backed by a delegate target

use tracing::trace;

use crate::error::{AopError, AopResult};
use crate::invocation::Invocation;
use crate::target::TargetHandle;
use crate::types::InterfaceId;
use crate::value::Value;

use super::{IntroductionInterceptor, MethodInterceptor};

/// Serves calls on introduced interfaces from a delegate object
///
/// Calls declared by any other interface proceed down the chain unchanged.
pub struct DelegatingIntroductionInterceptor {
    delegate: TargetHandle,
    interfaces: Vec<InterfaceId>,
}

impl DelegatingIntroductionInterceptor {
    /// Create an interceptor that implements `interfaces` through `delegate`
    pub fn new<I, S>(delegate: TargetHandle, interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<InterfaceId>,
    {
        DelegatingIntroductionInterceptor {
            delegate,
            interfaces: interfaces.into_iter().map(Into::into).collect(),
        }
    }

    /// Interfaces the delegate implements
    pub fn interfaces(&self) -> &[InterfaceId] {
        &self.interfaces
    }
}

impl MethodInterceptor for DelegatingIntroductionInterceptor {
    fn invoke(&self, invocation: &mut Invocation<'_>) -> AopResult<Value> {
        let method = invocation.method();
        if !self.interfaces.contains(method.declaring_type()) {
            return invocation.proceed();
        }
        trace!(method = %method, "delegating introduced method");
        self.delegate
            .invoke(method, invocation.arguments())
            .map_err(AopError::Raised)
    }

    fn describe(&self) -> String {
        let names: Vec<&str> = self.interfaces.iter().map(InterfaceId::as_str).collect();
        format!("DelegatingIntroduction({})", names.join(", "))
    }
}

impl IntroductionInterceptor for DelegatingIntroductionInterceptor {
    fn implements_interface(&self, interface: &InterfaceId) -> bool {
        self.interfaces.contains(interface)
    }
}
