//! Prelude for convenient imports.
//!
//! # Example
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

// Core types
pub use crate::types::TargetId;

// Error handling
pub use crate::error::{CourierError, Result};

// Queue
pub use crate::config::{DEFAULT_QUEUE_CAPACITY, MIN_QUEUE_CAPACITY, QueueConfig};
pub use crate::queue::{MessageQueue, QueueStatistics};

// Dispatch collaborators
pub use crate::dispatch::{InvokeError, MemoryRegistry, ObjectRegistry, Receiver};

// Values
pub use crate::value::Value;
