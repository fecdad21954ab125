//! Queue configuration.

use crate::error::{CourierError, Result};
use serde::{Deserialize, Serialize};

/// Default shared buffer capacity: 4 MB.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4 * 1024 * 1024;

/// Smallest accepted shared buffer capacity.
///
/// Anything below this cannot hold even a handful of records and is almost
/// certainly a unit mix-up (kilobytes passed as bytes).
pub const MIN_QUEUE_CAPACITY: usize = 256;

/// Configuration for a [`MessageQueue`](crate::queue::MessageQueue).
///
/// The capacity is fixed for the lifetime of the queue: the shared buffer is
/// allocated once and never resized, which is what keeps records addressable
/// while the flush loop dispatches without the lock held.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Shared buffer capacity in bytes.
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl QueueConfig {
    /// Create config with a custom capacity in bytes.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::ConfigValue`] if the capacity is below
    /// [`MIN_QUEUE_CAPACITY`].
    pub fn validate(&self) -> Result<()> {
        if self.capacity < MIN_QUEUE_CAPACITY {
            return Err(CourierError::ConfigValue {
                field: "capacity",
                cause: format!(
                    "{} bytes is below the minimum of {} bytes",
                    self.capacity, MIN_QUEUE_CAPACITY
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = QueueConfig::default();
        assert_eq!(config.capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_overrides_capacity() {
        let config = QueueConfig::default().with_capacity(1024);
        assert_eq!(config.capacity, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn undersized_capacity_is_rejected() {
        let config = QueueConfig::default().with_capacity(64);
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "E003");
    }
}
