//! Dispatch collaborators: how the queue reaches live objects.
//!
//! The queue itself never performs reflection. It only needs two injected
//! capabilities: a way to turn a [`TargetId`](crate::types::TargetId) into a
//! live object ([`ObjectRegistry`]), and a three-operation surface on that
//! object ([`Receiver`]). A host engine implements both against its own
//! object model; [`MemoryRegistry`] is the in-process implementation used by
//! standalone hosts and tests.

mod registry;
mod traits;

pub use registry::MemoryRegistry;
pub use traits::{InvokeError, ObjectRegistry, Receiver};
