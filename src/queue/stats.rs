//! Capacity-tuning diagnostics.

use serde::Serialize;
use std::collections::BTreeMap;

/// Snapshot of what is sitting in the queue, grouped for capacity tuning.
///
/// Produced by [`MessageQueue::statistics`](super::MessageQueue::statistics)
/// and dumped through the log on every out-of-memory failure, so a full
/// queue always leaves behind a breakdown of what filled it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStatistics {
    /// Bytes currently occupied in the shared buffer.
    pub bytes_in_use: usize,
    /// Immutable shared buffer capacity in bytes.
    pub capacity: usize,
    /// Highest occupancy ever observed, retained across flush resets.
    pub max_usage: usize,
    /// Number of records awaiting dispatch.
    pub message_count: usize,
    /// Queued records whose target no longer resolves.
    pub pending_dead_targets: usize,
    /// Cumulative count of targets found gone at dispatch time.
    pub flushed_dead_targets: u64,
    /// Pending call counts, grouped by method name.
    pub calls: BTreeMap<String, usize>,
    /// Pending property-set counts, grouped by property name.
    pub sets: BTreeMap<String, usize>,
    /// Pending notification counts, grouped by code.
    pub notifications: BTreeMap<i64, usize>,
}

impl QueueStatistics {
    /// Emit the snapshot through the log, one line per group.
    pub fn log(&self) {
        tracing::warn!(
            bytes_in_use = self.bytes_in_use,
            capacity = self.capacity,
            max_usage = self.max_usage,
            messages = self.message_count,
            "message queue usage"
        );
        if self.pending_dead_targets > 0 || self.flushed_dead_targets > 0 {
            tracing::warn!(
                pending = self.pending_dead_targets,
                flushed = self.flushed_dead_targets,
                "targets deleted while awaiting a deferred message"
            );
        }
        for (method, count) in &self.calls {
            tracing::warn!(method = %method, count, "pending call");
        }
        for (property, count) in &self.sets {
            tracing::warn!(property = %property, count, "pending set");
        }
        for (code, count) in &self.notifications {
            tracing::warn!(code, count, "pending notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_is_empty() {
        let stats = QueueStatistics::default();
        assert_eq!(stats.message_count, 0);
        assert!(stats.calls.is_empty());
        assert!(stats.sets.is_empty());
        assert!(stats.notifications.is_empty());
    }

    #[test]
    fn snapshot_serializes() {
        let mut stats = QueueStatistics {
            bytes_in_use: 120,
            capacity: 1024,
            ..Default::default()
        };
        stats.notifications.insert(7, 3);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["bytes_in_use"], 120);
        assert_eq!(json["notifications"]["7"], 3);
    }
}
