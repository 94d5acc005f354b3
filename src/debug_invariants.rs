//! Invariant checking for layouts and discretized domains.
//!
//! The checks are cheap enough for tests but walk every vnode or cell, so
//! the macro only runs them in debug builds or with `strict-invariants` /
//! `check-invariants` enabled.

use crate::domain_error::DomainError;

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Assert invariants in debug builds or when invariant checking is enabled.
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "debug_assert_invariants");
    }
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), DomainError>;
}

/// Return `InvariantViolation` with a lazily built message unless `cond` holds.
#[inline]
pub(crate) fn ensure(cond: bool, msg: impl FnOnce() -> String) -> Result<(), DomainError> {
    if cond {
        Ok(())
    } else {
        Err(DomainError::InvariantViolation(msg()))
    }
}

/// Run a fallible check and panic on error when invariant checking is enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
