//! Core dispatch traits and error types.

use crate::types::TargetId;
use crate::value::Value;
use std::sync::Arc;
use thiserror::Error;

/// Errors a receiver can report from a dynamic method invocation.
///
/// These are reported, not propagated: the queue logs them (when the record
/// was enqueued with error surfacing enabled) and carries on with the next
/// record. Deferred calls have no return value, so there is nowhere for a
/// result to go.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The receiver has no method with the given name.
    #[error("no method named '{0}'")]
    MethodNotFound(String),

    /// The arguments did not match what the method expects.
    #[error("invalid arguments for '{method}': {cause}")]
    InvalidArguments {
        /// The method that rejected its arguments.
        method: String,
        /// Description of the mismatch.
        cause: String,
    },

    /// The method ran and failed.
    #[error("method '{method}' failed: {cause}")]
    Failed {
        /// The method that failed.
        method: String,
        /// Description of the failure.
        cause: String,
    },
}

/// The capability surface a deferred message is executed against.
///
/// # Implementation Notes
///
/// - Every method is called from the queue's flushing thread with **no
///   queue lock held**; an implementation may freely enqueue further
///   messages (they are delivered later in the same flush pass).
/// - Implementations must not assume exclusivity over the queue: producers
///   on other threads keep appending while a receiver runs.
/// - None of the methods return a value to the producer. `invoke` may
///   report an [`InvokeError`]; `assign` and `notify` are expected to
///   tolerate unknown names and codes in whatever way fits the host.
pub trait Receiver: Send + Sync {
    /// Invoke a named method with the decoded arguments.
    ///
    /// # Errors
    ///
    /// Returns an [`InvokeError`] describing why the call could not run;
    /// the queue logs it if the record asked for error surfacing.
    fn invoke(&self, method: &str, args: &[Value]) -> Result<(), InvokeError>;

    /// Assign a named property.
    fn assign(&self, property: &str, value: &Value);

    /// Deliver a notification code.
    fn notify(&self, code: i64);

    /// Short type name used in diagnostics (e.g. the out-of-memory report).
    fn type_name(&self) -> &str {
        "object"
    }
}

/// Resolves target identifiers to live objects.
///
/// Returning `None` is a normal outcome — the target was deleted between
/// enqueue and flush — and makes the queue skip (and tally) the record.
/// `resolve` is called with the queue lock held on diagnostic paths, so it
/// must not call back into the queue.
pub trait ObjectRegistry: Send + Sync {
    /// Look up a live object by id.
    fn resolve(&self, id: TargetId) -> Option<Arc<dyn Receiver>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn error_is_send_sync() {
        _assert_send_sync::<InvokeError>();
    }

    #[test]
    fn invoke_error_display() {
        let err = InvokeError::MethodNotFound("reload".to_string());
        assert!(format!("{}", err).contains("reload"));

        let err = InvokeError::InvalidArguments {
            method: "resize".to_string(),
            cause: "expected 2 arguments, got 0".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("resize"));
        assert!(msg.contains("expected 2"));
    }
}
