//! Test doubles for queue consumers.
//!
//! [`RecordingReceiver`] stands in for a live object and records every
//! dispatch it sees; [`DropProbe`] issues values whose destruction can be
//! counted, for asserting that queued arguments are dropped exactly once.
//! Both are ordinary types — they are also useful to hosts writing their own
//! integration tests against a queue.

use crate::dispatch::{InvokeError, Receiver};
use crate::value::Value;
use parking_lot::Mutex;
use std::sync::Arc;

/// One dispatched operation, as observed by a [`RecordingReceiver`].
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    /// A method invocation.
    Invoke {
        /// The invoked method name.
        method: String,
        /// The decoded arguments.
        args: Vec<Value>,
    },
    /// A property assignment.
    Assign {
        /// The assigned property name.
        property: String,
        /// The assigned value.
        value: Value,
    },
    /// A notification delivery.
    Notify {
        /// The delivered code.
        code: i64,
    },
}

/// A [`Receiver`] that records every dispatch in order.
pub struct RecordingReceiver {
    type_name: String,
    reject_invokes: bool,
    events: Mutex<Vec<DispatchEvent>>,
}

impl RecordingReceiver {
    /// A receiver that accepts every operation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            type_name: "recording".to_string(),
            reject_invokes: false,
            events: Mutex::new(Vec::new()),
        }
    }

    /// A receiver that records invocations but reports every one as an
    /// unknown method, for exercising error surfacing.
    #[must_use]
    pub fn rejecting() -> Self {
        Self {
            reject_invokes: true,
            ..Self::new()
        }
    }

    /// Override the name reported by [`Receiver::type_name`].
    #[must_use]
    pub fn named(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::new()
        }
    }

    /// Everything dispatched so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().clone()
    }

    /// Number of dispatches observed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check whether nothing has been dispatched yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Forget everything observed so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for RecordingReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Receiver for RecordingReceiver {
    fn invoke(&self, method: &str, args: &[Value]) -> Result<(), InvokeError> {
        self.events.lock().push(DispatchEvent::Invoke {
            method: method.to_string(),
            args: args.to_vec(),
        });
        if self.reject_invokes {
            return Err(InvokeError::MethodNotFound(method.to_string()));
        }
        Ok(())
    }

    fn assign(&self, property: &str, value: &Value) {
        self.events.lock().push(DispatchEvent::Assign {
            property: property.to_string(),
            value: value.clone(),
        });
    }

    fn notify(&self, code: i64) {
        self.events.lock().push(DispatchEvent::Notify { code });
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// Destruction counter for queued argument values.
///
/// Each [`value`](Self::value) call mints an opaque `Value` sharing the
/// probe's token; [`outstanding`](Self::outstanding) counts how many of them
/// are still alive. After a flush (or a queue drop) has destroyed every
/// record holding a probe value, the count is back to zero.
pub struct DropProbe {
    token: Arc<()>,
}

impl DropProbe {
    /// Create a probe with no outstanding values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: Arc::new(()),
        }
    }

    /// Mint a value that keeps the probe's token alive until destroyed.
    #[must_use]
    pub fn value(&self) -> Value {
        Value::opaque(self.token.clone())
    }

    /// Number of minted values not yet destroyed.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        Arc::strong_count(&self.token) - 1
    }
}

impl Default for DropProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_receiver_keeps_order() {
        let receiver = RecordingReceiver::new();
        receiver.notify(1);
        receiver.assign("alpha", &Value::int(2));
        receiver.invoke("beta", &[Value::bool(true)]).unwrap();

        assert_eq!(receiver.len(), 3);
        assert_eq!(
            receiver.events()[0],
            DispatchEvent::Notify { code: 1 }
        );

        receiver.clear();
        assert!(receiver.is_empty());
    }

    #[test]
    fn rejecting_receiver_still_records() {
        let receiver = RecordingReceiver::rejecting();
        let err = receiver.invoke("nope", &[]).unwrap_err();
        assert!(matches!(err, InvokeError::MethodNotFound(_)));
        assert_eq!(receiver.len(), 1);
    }

    #[test]
    fn drop_probe_counts_values() {
        let probe = DropProbe::new();
        assert_eq!(probe.outstanding(), 0);

        let a = probe.value();
        let b = probe.value();
        assert_eq!(probe.outstanding(), 2);

        drop(a);
        assert_eq!(probe.outstanding(), 1);
        drop(b);
        assert_eq!(probe.outstanding(), 0);
    }
}
