//! Courier — deferred-call message queue.
//!
//! Courier lets any thread record an operation against a live object — a
//! method call, a property assignment, or a notification — to be executed
//! later on a designated thread. Records are serialized into a
//! fixed-capacity shared buffer with no per-record heap allocation;
//! [`MessageQueue::flush`] drains the batch in FIFO order, dispatching each
//! record through an injected [`Receiver`] capability.
//!
//! # Key Components
//!
//! - **[`MessageQueue`]**: the shared buffer, per-thread accumulation
//!   scopes, and the flush loop
//! - **[`Value`]**: dynamic argument values moved into records at enqueue
//!   time and destroyed exactly once
//! - **[`ObjectRegistry`] / [`Receiver`]**: the injected collaborators that
//!   resolve a [`TargetId`] and execute operations against it
//! - **[`QueueStatistics`]**: capacity-tuning diagnostics, dumped
//!   automatically when the queue runs out of space
//!
//! # Example
//!
//! ```ignore
//! use courier::prelude::*;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(MemoryRegistry::new());
//! let queue = MessageQueue::new(registry.clone(), QueueConfig::default())?;
//!
//! // Any thread: record operations against a target.
//! let id = registry.register(my_object);
//! queue.push_call(id, "reload", vec![Value::int(2)], false)?;
//! queue.push_set(id, "visible", Value::bool(true))?;
//! queue.push_notification(id, 13)?;
//!
//! // Owning thread, once per frame or loop turn: execute the batch.
//! queue.flush();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod prelude;
pub mod queue;
pub mod testing;
pub mod types;
pub mod value;

// Re-export key types at crate root for convenience
pub use config::{DEFAULT_QUEUE_CAPACITY, QueueConfig};
pub use dispatch::{InvokeError, MemoryRegistry, ObjectRegistry, Receiver};
pub use error::{CourierError, Result};
pub use queue::{MessageQueue, QueueStatistics};
pub use types::TargetId;
pub use value::Value;
