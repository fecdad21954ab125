//! In-process object registry.
//!
//! [`MemoryRegistry`] is the default [`ObjectRegistry`] implementation for
//! hosts that do not bring their own object model. Objects are stored as
//! `Arc<dyn Receiver>`; removing one while a message for it is still queued
//! is fine — the queue tallies the dead target and moves on.

use super::traits::{ObjectRegistry, Receiver};
use crate::types::TargetId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory object registry with atomic id allocation.
pub struct MemoryRegistry {
    objects: RwLock<HashMap<TargetId, Arc<dyn Receiver>>>,
    next_id: AtomicU64,
}

impl MemoryRegistry {
    /// Create an empty registry. Allocated ids start at 1; 0 is never minted.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register an object under a freshly allocated id.
    pub fn register(&self, object: Arc<dyn Receiver>) -> TargetId {
        let id = TargetId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.objects.write().insert(id, object);
        id
    }

    /// Register an object under a caller-chosen id, replacing any previous
    /// occupant.
    pub fn insert(&self, id: TargetId, object: Arc<dyn Receiver>) {
        self.objects.write().insert(id, object);
    }

    /// Remove an object, returning it if it was present.
    ///
    /// Messages already queued for `id` are delivered nowhere: the flush
    /// loop finds no target and skips them.
    pub fn remove(&self, id: TargetId) -> Option<Arc<dyn Receiver>> {
        self.objects.write().remove(&id)
    }

    /// Check whether an id currently resolves.
    #[must_use]
    pub fn contains(&self, id: TargetId) -> bool {
        self.objects.read().contains_key(&id)
    }

    /// Number of registered objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry for MemoryRegistry {
    fn resolve(&self, id: TargetId) -> Option<Arc<dyn Receiver>> {
        self.objects.read().get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::InvokeError;
    use crate::value::Value;

    struct Inert;

    impl Receiver for Inert {
        fn invoke(&self, _method: &str, _args: &[Value]) -> Result<(), InvokeError> {
            Ok(())
        }

        fn assign(&self, _property: &str, _value: &Value) {}

        fn notify(&self, _code: i64) {}
    }

    #[test]
    fn register_resolve_remove() {
        let registry = MemoryRegistry::new();
        let id = registry.register(Arc::new(Inert));

        assert!(registry.contains(id));
        assert!(registry.resolve(id).is_some());
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(id).is_some());
        assert!(registry.resolve(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn allocated_ids_are_distinct() {
        let registry = MemoryRegistry::new();
        let a = registry.register(Arc::new(Inert));
        let b = registry.register(Arc::new(Inert));
        assert_ne!(a, b);
    }

    #[test]
    fn unknown_id_does_not_resolve() {
        let registry = MemoryRegistry::new();
        assert!(registry.resolve(TargetId::new(999)).is_none());
    }
}
