//! Result extension trait for best-effort operations.
//!
//! Cleanup and rollback steps must not abort the caller; `warn_on_err`
//! logs the failure with its call site and hands back an `Option`.

use std::fmt::Display;
use tracing::warn;

/// Extension trait for logging errors with context.
pub trait ResultExt<T, E> {
    /// Log the error (if any) with context and source location.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use nhncloud_core::result_ext::ResultExt;
    ///
    /// std::fs::remove_file(&path).warn_on_err("removing orphaned certificate");
    /// ```
    fn warn_on_err<S: ToString>(self, context: S) -> Option<T>;
}

impl<T, E: Display> ResultExt<T, E> for Result<T, E> {
    #[track_caller]
    fn warn_on_err<S: ToString>(self, context: S) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                let caller_location = std::panic::Location::caller();
                warn!(
                    target: "nhncloud_core",
                    error = %e,
                    file = %format!("{}:{}", caller_location.file(), caller_location.line()),
                    context = %context.to_string(),
                    "Best-effort operation failed"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_on_err_ok() {
        let result: Result<i32, &str> = Ok(42);
        assert_eq!(result.warn_on_err("test context"), Some(42));
    }

    #[test]
    fn test_warn_on_err_err() {
        let result: Result<i32, &str> = Err("error");
        assert_eq!(result.warn_on_err("test context"), None);
    }
}
