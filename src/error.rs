//! Error types for courier.
//!
//! This module provides strongly-typed errors with stable codes. Only
//! recoverable conditions are surfaced as values: a full shared buffer, a
//! malformed enqueue argument, a rejected configuration. Caller contract
//! violations (re-entering `flush`, disabling accumulation without a matching
//! enable) are not errors — they halt in debug builds and are loudly logged
//! in release builds.

use thiserror::Error;

/// The main error type for queue operations.
#[derive(Error, Debug)]
pub enum CourierError {
    /// The shared buffer cannot fit the requested record.
    ///
    /// The enqueue did not happen and the queue is still fully usable;
    /// callers should treat this as a dropped message, not a retry loop.
    #[error(
        "E001: message queue out of memory: requested {requested} bytes with {available} available; increase the queue capacity"
    )]
    OutOfMemory {
        /// Number of bytes the record needed.
        requested: usize,
        /// Number of bytes left before the capacity bound.
        available: usize,
    },

    /// A notification code outside the accepted range was supplied.
    #[error("E002: invalid notification code {code}: codes must be non-negative")]
    InvalidNotificationCode {
        /// The rejected code.
        code: i64,
    },

    /// Invalid configuration value.
    #[error("E003: invalid configuration '{field}': {cause}")]
    ConfigValue {
        /// The configuration field with the invalid value.
        field: &'static str,
        /// Description of why the value is invalid.
        cause: String,
    },
}

impl CourierError {
    /// Get the error code (e.g., "E001").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::OutOfMemory { .. } => "E001",
            Self::InvalidNotificationCode { .. } => "E002",
            Self::ConfigValue { .. } => "E003",
        }
    }

    /// Check if the queue remains usable after this error.
    ///
    /// Out-of-memory and rejected-argument failures leave the queue state
    /// untouched; a configuration error means no queue was built at all.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::OutOfMemory { .. } | Self::InvalidNotificationCode { .. }
        )
    }
}

/// Result type alias using `CourierError`.
pub type Result<T> = std::result::Result<T, CourierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_correct() {
        let err = CourierError::OutOfMemory {
            requested: 64,
            available: 16,
        };
        assert_eq!(err.code(), "E001");

        let err = CourierError::InvalidNotificationCode { code: -3 };
        assert_eq!(err.code(), "E002");
    }

    #[test]
    fn error_display() {
        let err = CourierError::OutOfMemory {
            requested: 128,
            available: 32,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("E001"));
        assert!(msg.contains("128"));
        assert!(msg.contains("32"));
    }

    #[test]
    fn recoverable_errors() {
        assert!(
            CourierError::InvalidNotificationCode { code: -1 }.is_recoverable()
        );

        assert!(
            !CourierError::ConfigValue {
                field: "capacity",
                cause: "must be non-zero".to_string()
            }
            .is_recoverable()
        );
    }
}
