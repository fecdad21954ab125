//! Identifier for deferred-message targets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for the object a deferred message applies to.
///
/// The queue never interprets the value; it is minted by whatever registry
/// the host injects, and is looked up again at flush time. Holding an id
/// does not keep the object alive — a target may be gone by the time its
/// message is dispatched, which is a normal occurrence, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(u64);

impl TargetId {
    /// Create a target ID from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target_{}", self.0)
    }
}

impl From<u64> for TargetId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_id_creation() {
        let id = TargetId::new(42);
        assert_eq!(id.as_u64(), 42);
        assert_eq!(id, TargetId::from(42));
    }

    #[test]
    fn target_id_display() {
        assert_eq!(format!("{}", TargetId::new(7)), "target_7");
    }
}
