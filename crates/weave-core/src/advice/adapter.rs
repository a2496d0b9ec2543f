//! Adapters from before/after/throws advice to the around shape

use std::sync::Arc;

use tracing::trace;

use crate::error::{AopError, AopResult};
use crate::invocation::Invocation;
use crate::value::Value;

use super::throws::{ThrowsContext, ThrowsOutcome};
use super::{Advice, AfterReturningAdvice, BeforeAdvice, MethodInterceptor, ThrowsAdvice};

/// Runs before advice, then proceeds
pub struct BeforeAdviceInterceptor {
    advice: Arc<dyn BeforeAdvice>,
}

impl BeforeAdviceInterceptor {
    /// Wrap before advice
    pub fn new(advice: Arc<dyn BeforeAdvice>) -> Self {
        BeforeAdviceInterceptor { advice }
    }
}

impl MethodInterceptor for BeforeAdviceInterceptor {
    fn invoke(&self, invocation: &mut Invocation<'_>) -> AopResult<Value> {
        let method = Arc::clone(invocation.method());
        let target_type = Arc::clone(invocation.target_type());
        self.advice
            .before(&method, invocation.arguments_mut(), &target_type)?;
        invocation.proceed()
    }

    fn describe(&self) -> String {
        "BeforeAdviceInterceptor".to_string()
    }
}

/// Proceeds, then lets after-returning advice observe a normal result
pub struct AfterReturningAdviceInterceptor {
    advice: Arc<dyn AfterReturningAdvice>,
}

impl AfterReturningAdviceInterceptor {
    /// Wrap after-returning advice
    pub fn new(advice: Arc<dyn AfterReturningAdvice>) -> Self {
        AfterReturningAdviceInterceptor { advice }
    }
}

impl MethodInterceptor for AfterReturningAdviceInterceptor {
    fn invoke(&self, invocation: &mut Invocation<'_>) -> AopResult<Value> {
        let value = invocation.proceed()?;
        self.advice.after_returning(
            &value,
            invocation.method(),
            invocation.arguments(),
            invocation.target(),
        )?;
        Ok(value)
    }

    fn describe(&self) -> String {
        "AfterReturningAdviceInterceptor".to_string()
    }
}

/// Proceeds and routes failures through a throws handler table
pub struct ThrowsAdviceInterceptor {
    advice: Arc<dyn ThrowsAdvice>,
}

impl ThrowsAdviceInterceptor {
    /// Wrap throws advice
    pub fn new(advice: Arc<dyn ThrowsAdvice>) -> Self {
        ThrowsAdviceInterceptor { advice }
    }
}

impl MethodInterceptor for ThrowsAdviceInterceptor {
    fn invoke(&self, invocation: &mut Invocation<'_>) -> AopResult<Value> {
        let err = match invocation.proceed() {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let ctx = ThrowsContext {
            method: invocation.method(),
            arguments: invocation.arguments(),
            target: invocation.target(),
        };
        match self.advice.handlers().dispatch(&err, &ctx) {
            Some(ThrowsOutcome::Swallow(value)) => {
                trace!(method = %ctx.method, error = %err, "throws advice swallowed error");
                Ok(value)
            }
            Some(ThrowsOutcome::Raise(replacement)) => Err(AopError::Raised(replacement)),
            Some(ThrowsOutcome::Rethrow) | None => Err(err),
        }
    }

    fn describe(&self) -> String {
        format!("ThrowsAdviceInterceptor{:?}", self.advice.handlers().handled_types())
    }
}

/// Adapt any advice to the uniform interceptor shape
///
/// Around advice and introductions are used as they are.
pub(crate) fn adapt(advice: &Advice) -> Arc<dyn MethodInterceptor> {
    match advice {
        Advice::Before(a) => Arc::new(BeforeAdviceInterceptor::new(Arc::clone(a))),
        Advice::AfterReturning(a) => Arc::new(AfterReturningAdviceInterceptor::new(Arc::clone(a))),
        Advice::Throws(a) => Arc::new(ThrowsAdviceInterceptor::new(Arc::clone(a))),
        Advice::Around(i) => Arc::clone(i),
        Advice::Introduction(i) => {
            let interceptor: Arc<dyn MethodInterceptor> = i.clone();
            interceptor
        }
    }
}
