//! Typed dispatch for throws advice
//!
//! Handlers are registered per error type and probed in registration order;
//! the first one whose type matches the thrown error decides the outcome.

use std::error::Error;
use std::fmt;

use crate::error::{AopError, Throwable};
use crate::target::TargetHandle;
use crate::types::Method;
use crate::value::Value;

/// What a throws handler wants done with the error
#[derive(Debug)]
pub enum ThrowsOutcome {
    /// Let the original error continue up the chain
    Rethrow,
    /// Swallow the error and return this value instead
    Swallow(Value),
    /// Replace the error with another one
    Raise(Throwable),
}

/// The failed call, as seen by a throws handler
#[derive(Clone, Copy)]
pub struct ThrowsContext<'a> {
    /// Method that failed
    pub method: &'a Method,
    /// Arguments as they stood when the call failed
    pub arguments: &'a [Value],
    /// Target the call reached, if it got that far
    pub target: Option<&'a TargetHandle>,
}

type Probe =
    Box<dyn Fn(&(dyn Error + 'static), &ThrowsContext<'_>) -> Option<ThrowsOutcome> + Send + Sync>;

struct HandlerEntry {
    handles: &'static str,
    probe: Probe,
}

/// Error type -> handler table
///
/// ```ignore
/// let handlers = ThrowsHandlers::new()
///     .on::<io::Error, _>(|_, _| ThrowsOutcome::Swallow(Value::Null))
///     .on_any(|_, _| ThrowsOutcome::Rethrow);
/// ```
#[derive(Default)]
pub struct ThrowsHandlers {
    entries: Vec<HandlerEntry>,
}

impl ThrowsHandlers {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle errors of type `E`
    ///
    /// Errors raised by targets and advice are matched by their own type;
    /// engine failures (target acquisition, proceed reentry) match `AopError`.
    pub fn on<E, F>(mut self, handler: F) -> Self
    where
        E: Error + 'static,
        F: Fn(&E, &ThrowsContext<'_>) -> ThrowsOutcome + Send + Sync + 'static,
    {
        self.entries.push(HandlerEntry {
            handles: std::any::type_name::<E>(),
            probe: Box::new(move |error: &(dyn Error + 'static), ctx: &ThrowsContext<'_>| {
                error.downcast_ref::<E>().map(|e| handler(e, ctx))
            }),
        });
        self
    }

    /// Handle any error not claimed by an earlier entry
    pub fn on_any<F>(mut self, handler: F) -> Self
    where
        F: Fn(&(dyn Error + 'static), &ThrowsContext<'_>) -> ThrowsOutcome + Send + Sync + 'static,
    {
        self.entries.push(HandlerEntry {
            handles: "*",
            probe: Box::new(move |error: &(dyn Error + 'static), ctx: &ThrowsContext<'_>| {
                Some(handler(error, ctx))
            }),
        });
        self
    }

    /// Run the first handler matching `error`
    ///
    /// Returns `None` when no entry claims the error.
    pub fn dispatch(&self, error: &AopError, ctx: &ThrowsContext<'_>) -> Option<ThrowsOutcome> {
        let thrown = error.thrown();
        self.entries.iter().find_map(|entry| (entry.probe)(thrown, ctx))
    }

    /// Type names of the registered entries, in dispatch order
    pub fn handled_types(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.handles).collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no handler is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ThrowsHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrowsHandlers")
            .field("handles", &self.handled_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("not found: {0}")]
    struct NotFound(String);

    #[derive(Debug, thiserror::Error)]
    #[error("timed out")]
    struct TimedOut;

    fn ctx(method: &Method) -> ThrowsContext<'_> {
        ThrowsContext {
            method,
            arguments: &[],
            target: None,
        }
    }

    #[test]
    fn test_dispatch_by_type() {
        let handlers = ThrowsHandlers::new()
            .on::<NotFound, _>(|e, _| ThrowsOutcome::Swallow(Value::from(e.0.as_str())))
            .on::<TimedOut, _>(|_, _| ThrowsOutcome::Rethrow);
        let method = Method::new("IStore", "Load");

        let outcome = handlers
            .dispatch(&AopError::raise(NotFound("x".into())), &ctx(&method))
            .unwrap();
        assert!(matches!(outcome, ThrowsOutcome::Swallow(v) if v == Value::from("x")));

        let outcome = handlers
            .dispatch(&AopError::raise(TimedOut), &ctx(&method))
            .unwrap();
        assert!(matches!(outcome, ThrowsOutcome::Rethrow));
    }

    #[test]
    fn test_unhandled_type_is_none() {
        let handlers = ThrowsHandlers::new().on::<NotFound, _>(|_, _| ThrowsOutcome::Rethrow);
        let method = Method::new("IStore", "Load");
        assert!(handlers
            .dispatch(&AopError::raise(TimedOut), &ctx(&method))
            .is_none());
    }

    #[test]
    fn test_first_registered_match_wins() {
        let handlers = ThrowsHandlers::new()
            .on_any(|_, _| ThrowsOutcome::Swallow(Value::from(1)))
            .on::<TimedOut, _>(|_, _| ThrowsOutcome::Swallow(Value::from(2)));
        let method = Method::new("IStore", "Load");

        let outcome = handlers
            .dispatch(&AopError::raise(TimedOut), &ctx(&method))
            .unwrap();
        assert!(matches!(outcome, ThrowsOutcome::Swallow(v) if v == Value::from(1)));
        assert_eq!(handlers.handled_types()[0], "*");
    }

    #[test]
    fn test_engine_errors_match_aop_error() {
        let handlers = ThrowsHandlers::new().on::<AopError, _>(|_, _| ThrowsOutcome::Rethrow);
        let method = Method::new("IStore", "Load");
        let err = AopError::TargetAcquisition {
            target_type: "Store".into(),
            source: "pool exhausted".into(),
        };
        assert!(handlers.dispatch(&err, &ctx(&method)).is_some());
        // raised errors do not look like engine errors
        assert!(handlers
            .dispatch(&AopError::raise(TimedOut), &ctx(&method))
            .is_none());
    }
}
