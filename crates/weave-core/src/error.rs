//! Error types for the interception engine
//!
//! Engine failures (bad registrations, contract violations, target acquisition)
//! get their own variants. Anything thrown by a target or by advice travels
//! through the chain inside [`AopError::Raised`] untouched.

use crate::advisor::AdvisorId;

/// Error thrown by a target or by advice code
pub type Throwable = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type used throughout the engine
pub type AopResult<T> = Result<T, AopError>;

/// Errors surfaced by the interception engine
#[derive(Debug, thiserror::Error)]
pub enum AopError {
    /// An introduction advisor declares an interface its advice cannot implement
    #[error("Invalid introduction: advice '{advice}' does not implement interface '{interface}'")]
    InvalidIntroduction {
        /// Interface the advisor claimed to introduce
        interface: String,
        /// Description of the offending advice
        advice: String,
    },

    /// A dynamic match was requested from a matcher that is not runtime
    #[error("Matcher contract violation: '{matcher}' has no dynamic phase (method {method})")]
    MatcherContractViolation {
        /// Description of the matcher
        matcher: String,
        /// Method being matched
        method: String,
    },

    /// An interceptor called `proceed()` more than once
    #[error("proceed() called more than once for {method} at chain position {position}")]
    ProceedReentry {
        /// Method being invoked
        method: String,
        /// Chain position that was entered twice
        position: usize,
    },

    /// The target source could not supply a target
    #[error("Failed to acquire target of type '{target_type}': {source}")]
    TargetAcquisition {
        /// Declared type of the target source
        target_type: String,
        /// Underlying failure
        #[source]
        source: Throwable,
    },

    /// The advisor list may no longer change
    #[error("Advisor configuration is frozen: cannot {operation}")]
    ConfigurationFrozen {
        /// Operation that was rejected
        operation: &'static str,
    },

    /// No advisor is registered under this id
    #[error("Advisor not found: {0}")]
    AdvisorNotFound(AdvisorId),

    /// A pointcut pattern failed to compile
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern as written
        pattern: String,
        /// Regex compiler error
        #[source]
        source: regex::Error,
    },

    /// Error thrown by a target or by advice, propagated verbatim
    #[error(transparent)]
    Raised(Throwable),
}

impl AopError {
    /// Wrap an error thrown by a target or advice
    pub fn raise(error: impl Into<Throwable>) -> Self {
        AopError::Raised(error.into())
    }

    /// Whether this error was thrown by a target or advice
    pub fn is_raised(&self) -> bool {
        matches!(self, AopError::Raised(_))
    }

    /// The error as thrown: the inner error for `Raised`, the engine error otherwise
    pub fn thrown(&self) -> &(dyn std::error::Error + 'static) {
        match self {
            AopError::Raised(inner) => inner.as_ref() as &(dyn std::error::Error + 'static),
            other => other as &(dyn std::error::Error + 'static),
        }
    }

    /// Downcast the thrown error to a concrete type
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.thrown().downcast_ref::<E>()
    }

    /// Check whether the thrown error is of type `E`
    pub fn is<E: std::error::Error + 'static>(&self) -> bool {
        self.thrown().is::<E>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn test_raised_is_transparent() {
        let err = AopError::raise(DiskFull);
        assert_eq!(err.to_string(), "disk full");
        assert!(err.is_raised());
        assert!(err.is::<DiskFull>());
        assert!(err.downcast_ref::<DiskFull>().is_some());
    }

    #[test]
    fn test_engine_errors_downcast_to_themselves() {
        let err = AopError::ConfigurationFrozen {
            operation: "add advisor",
        };
        assert!(!err.is_raised());
        assert!(err.is::<AopError>());
        assert!(err.downcast_ref::<DiskFull>().is_none());
    }

    #[test]
    fn test_raise_from_string() {
        let err = AopError::raise("boom");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_target_acquisition_message() {
        let err = AopError::TargetAcquisition {
            target_type: "Store".to_string(),
            source: "pool exhausted".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to acquire target of type 'Store': pool exhausted"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
