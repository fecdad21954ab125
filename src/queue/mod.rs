//! The deferred-call message queue.
//!
//! A [`MessageQueue`] lets any thread record a method call, a property
//! assignment or a notification against a target object; the recorded batch
//! is executed later, in FIFO order, when the owning thread calls
//! [`flush`](MessageQueue::flush).
//!
//! # Architecture
//!
//! ```text
//! producer ──► encode record ──► shared buffer ─┐
//! producer ──► thread-local buffer ──(merge)────┤──► flush ──► dispatch
//!                                               │             destroy
//!                                               └──────◄───── reset
//! ```
//!
//! - Records are serialized directly into a fixed-capacity byte arena; an
//!   enqueue that does not fit fails fast with
//!   [`OutOfMemory`](crate::error::CourierError::OutOfMemory) after logging
//!   a capacity-tuning report. Nothing blocks waiting for space.
//! - A thread can open an accumulation scope
//!   ([`set_thread_accumulation_enabled`](MessageQueue::set_thread_accumulation_enabled))
//!   to batch its records in a private growable buffer and splice them into
//!   the shared buffer in one operation when the scope closes.
//! - One mutex guards all queue state. `flush` uses reverse locking: the
//!   lock is held only while stepping the read cursor over a header and is
//!   released around every dispatch, so dispatched code may re-enter the
//!   queue freely. Records enqueued during a flush are delivered later in
//!   the same pass.

mod arena;
mod message;
mod stats;

pub use stats::QueueStatistics;

use crate::config::QueueConfig;
use crate::dispatch::ObjectRegistry;
use crate::error::{CourierError, Result};
use crate::types::TargetId;
use crate::value::Value;
use arena::Arena;
use message::{MessageHeader, MessageKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// One thread's private staging buffer plus its open-scope count.
struct ThreadBuffer {
    data: Arena,
    /// Open accumulation scopes; the buffer exists only while this is > 0.
    users: u32,
}

impl ThreadBuffer {
    fn new() -> Self {
        Self {
            data: Arena::growable(),
            users: 0,
        }
    }
}

/// Everything the queue mutex guards.
struct QueueState {
    buffer: Arena,
    thread_buffers: HashMap<ThreadId, ThreadBuffer>,
    flushing: bool,
    /// Flush progress; records below it have been destroyed. Zero when no
    /// flush is in progress.
    read_pos: usize,
    /// Highest buffer occupancy ever observed.
    max_usage: usize,
    /// Cumulative count of targets found gone at dispatch time.
    flushed_dead_targets: u64,
}

/// Deferred-call message queue.
///
/// Producers on any thread enqueue with [`push_call`](Self::push_call),
/// [`push_set`](Self::push_set) and
/// [`push_notification`](Self::push_notification); the thread that built the
/// queue drains it with [`flush`](Self::flush). The queue owns every queued
/// record: argument values are moved in at enqueue time and dropped exactly
/// once, either when their record is dispatched or when the queue itself is
/// dropped with undelivered residue.
pub struct MessageQueue {
    state: Mutex<QueueState>,
    registry: Arc<dyn ObjectRegistry>,
    /// The designated flushing thread. Its writes always go straight to the
    /// shared buffer; accumulation scopes are a no-op for it.
    owner: ThreadId,
    capacity: usize,
}

impl MessageQueue {
    /// Create a queue owned by the calling thread.
    ///
    /// The shared buffer is allocated once at `config.capacity` bytes and
    /// never resized.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::ConfigValue`] if the configuration is
    /// rejected by [`QueueConfig::validate`].
    pub fn new(registry: Arc<dyn ObjectRegistry>, config: QueueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(QueueState {
                buffer: Arena::fixed(config.capacity),
                thread_buffers: HashMap::new(),
                flushing: false,
                read_pos: 0,
                max_usage: 0,
                flushed_dead_targets: 0,
            }),
            registry,
            owner: thread::current().id(),
            capacity: config.capacity,
        })
    }

    /// Queue a method call against `target`.
    ///
    /// A nonexistent target is legal; the record is skipped (and tallied) at
    /// flush time. With `show_error` set, a failing invocation is reported
    /// through the log when the record is dispatched.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::OutOfMemory`] when the shared buffer cannot
    /// fit the record; nothing was written and the caller should treat the
    /// call as dropped.
    pub fn push_call(
        &self,
        target: TargetId,
        method: impl Into<Arc<str>>,
        args: Vec<Value>,
        show_error: bool,
    ) -> Result<()> {
        debug_assert!(args.len() <= u32::MAX as usize);
        let header = MessageHeader::call(target, method.into(), args.len() as u32, show_error);
        self.push_record(header, args)
    }

    /// Queue a property assignment against `target`.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::OutOfMemory`] when the shared buffer cannot
    /// fit the record.
    pub fn push_set(
        &self,
        target: TargetId,
        property: impl Into<Arc<str>>,
        value: Value,
    ) -> Result<()> {
        self.push_record(MessageHeader::set(target, property.into()), vec![value])
    }

    /// Queue a notification code for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::InvalidNotificationCode`] for negative codes
    /// (rejected before any space is reserved) and
    /// [`CourierError::OutOfMemory`] when the shared buffer is full.
    pub fn push_notification(&self, target: TargetId, code: i64) -> Result<()> {
        if code < 0 {
            return Err(CourierError::InvalidNotificationCode { code });
        }
        self.push_record(MessageHeader::notification(target, code), Vec::new())
    }

    /// Open or close an accumulation scope for the calling thread.
    ///
    /// Scopes are reference-counted and may nest; while at least one is
    /// open, the thread's records go to a private growable buffer instead of
    /// contending on the shared buffer. Closing the last scope splices the
    /// batch verbatim onto the shared buffer — record boundaries preserved,
    /// in original order — and removes the thread's entry.
    ///
    /// No-op on the owner thread, which always writes through.
    ///
    /// # Panics
    ///
    /// Panics if the batch does not fit the shared buffer: the records were
    /// accepted long ago and no caller can meaningfully react, so this is
    /// treated as a process-level sizing error. Closing a scope that was
    /// never opened halts in debug builds and is logged in release builds.
    pub fn set_thread_accumulation_enabled(&self, enabled: bool) {
        let caller = thread::current().id();
        if caller == self.owner {
            return;
        }

        let mut state = self.state.lock();
        if enabled {
            state
                .thread_buffers
                .entry(caller)
                .or_insert_with(ThreadBuffer::new)
                .users += 1;
            return;
        }

        debug_assert!(
            state.thread_buffers.contains_key(&caller),
            "thread accumulation disabled without a matching enable"
        );
        let Some(thread_buffer) = state.thread_buffers.get_mut(&caller) else {
            tracing::error!(
                thread = ?caller,
                "thread accumulation disabled without a matching enable"
            );
            return;
        };
        thread_buffer.users -= 1;
        if thread_buffer.users == 0 {
            if let Some(thread_buffer) = state.thread_buffers.remove(&caller) {
                self.merge_thread_buffer(&mut state, thread_buffer.data);
            }
        }
    }

    /// Dispatch every queued record in FIFO order, then reset the buffer.
    ///
    /// Must be driven from one place at a time — typically the owner
    /// thread's main loop. Dispatched code may enqueue further records; they
    /// are appended past the read cursor and delivered before this call
    /// returns. A callback that unconditionally re-enqueues itself can
    /// therefore keep `flush` from terminating; bounding that is the
    /// caller's responsibility.
    ///
    /// Re-entering `flush` while one is in progress is a contract violation:
    /// it halts in debug builds and is logged and ignored in release builds.
    pub fn flush(&self) {
        let mut state = self.state.lock();
        debug_assert!(!state.flushing, "MessageQueue::flush is not reentrant");
        if state.flushing {
            tracing::error!("flush re-entered; dropping the nested call");
            return;
        }
        state.flushing = true;

        loop {
            if state.read_pos >= state.buffer.end() {
                break;
            }
            let header = state.buffer.ptr_at(state.read_pos).cast::<MessageHeader>();
            // Advance before dispatching: records pushed by the dispatched
            // code land past the cursor and are visited later in this pass.
            // SAFETY: read_pos is a record boundary below the cursor.
            state.read_pos += unsafe { (*header).total_size() };
            drop(state);

            let target_gone = self.dispatch(header);
            // SAFETY: the record is fully dispatched; argument borrows ended
            // with `dispatch`, and only this loop destroys records.
            unsafe { message::destroy_record(header) };

            state = self.state.lock();
            if target_gone {
                state.flushed_dead_targets += 1;
            }
        }

        state.buffer.reset();
        state.read_pos = 0;
        state.flushing = false;
    }

    /// Check whether a flush is currently in progress.
    #[must_use]
    pub fn is_flushing(&self) -> bool {
        self.state.lock().flushing
    }

    /// Highest shared-buffer occupancy ever observed, in bytes.
    ///
    /// Retained across flush resets; intended for capacity tuning.
    #[must_use]
    pub fn max_buffer_usage(&self) -> usize {
        self.state.lock().max_usage
    }

    /// The immutable shared-buffer capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot the queue's contents for diagnostics.
    ///
    /// Safe to call at any time, including while a flush is mid-dispatch:
    /// the walk starts past anything the flush has already destroyed.
    #[must_use]
    pub fn statistics(&self) -> QueueStatistics {
        let state = self.state.lock();
        self.statistics_locked(&state)
    }

    /// Reserve room and encode one record, honoring the calling thread's
    /// accumulation scope.
    fn push_record(&self, header: MessageHeader, args: Vec<Value>) -> Result<()> {
        let room = message::record_size(args.len());
        let caller = thread::current().id();
        let mut state = self.state.lock();

        if let Some(thread_buffer) = state.thread_buffers.get_mut(&caller) {
            let offset = thread_buffer.data.reserve_grow(room);
            // SAFETY: fresh reservation of exactly `room` aligned bytes.
            unsafe { message::write_record(thread_buffer.data.ptr_at(offset), header, args) };
            return Ok(());
        }

        match state.buffer.try_reserve(room) {
            Some(offset) => {
                if state.buffer.end() > state.max_usage {
                    state.max_usage = state.buffer.end();
                }
                // SAFETY: fresh reservation of exactly `room` aligned bytes.
                unsafe { message::write_record(state.buffer.ptr_at(offset), header, args) };
                Ok(())
            }
            None => Err(self.out_of_memory(&state, room, &header)),
        }
    }

    /// Log the failed record and the capacity report, then build the error.
    fn out_of_memory(
        &self,
        state: &QueueState,
        requested: usize,
        header: &MessageHeader,
    ) -> CourierError {
        let resolved = self.registry.resolve(header.target());
        let target_type = resolved.as_ref().map_or("<gone>", |object| object.type_name());
        match header.kind() {
            MessageKind::Call => tracing::error!(
                target_id = %header.target(),
                target_type,
                method = %header.name(),
                "deferred call dropped: message queue out of memory"
            ),
            MessageKind::Set => tracing::error!(
                target_id = %header.target(),
                target_type,
                property = %header.name(),
                "deferred set dropped: message queue out of memory"
            ),
            MessageKind::Notification => tracing::error!(
                target_id = %header.target(),
                target_type,
                code = header.code(),
                "deferred notification dropped: message queue out of memory"
            ),
        }
        self.statistics_locked(state).log();

        CourierError::OutOfMemory {
            requested,
            available: state.buffer.capacity().saturating_sub(state.buffer.end()),
        }
    }

    /// Splice a closed scope's batch onto the shared buffer.
    fn merge_thread_buffer(&self, state: &mut QueueState, batch: Arena) {
        let batch_len = batch.end();
        if batch_len == 0 {
            return;
        }
        let Some(offset) = state.buffer.try_reserve(batch_len) else {
            self.statistics_locked(state).log();
            tracing::error!(
                batch_bytes = batch_len,
                "cannot merge thread-local batch: message queue out of memory"
            );
            panic!(
                "message queue out of memory while merging a thread-local batch; \
                 increase the queue capacity"
            );
        };
        // Verbatim byte splice: record boundaries are preserved and
        // ownership of the encoded values moves with the bytes. `batch`
        // frees only its storage when dropped.
        // SAFETY: distinct allocations; the reservation covers exactly
        // `batch_len` bytes.
        unsafe {
            std::ptr::copy_nonoverlapping(batch.ptr_at(0), state.buffer.ptr_at(offset), batch_len);
        }
        if state.buffer.end() > state.max_usage {
            state.max_usage = state.buffer.end();
        }
    }

    /// Execute one record against its target. Runs with no lock held; the
    /// receiver may re-enter the queue. Returns true when the target is
    /// gone.
    fn dispatch(&self, header: *mut MessageHeader) -> bool {
        // SAFETY: the flush loop keeps this record alive until after
        // dispatch returns.
        let header = unsafe { &*header };
        let Some(object) = self.registry.resolve(header.target()) else {
            tracing::debug!(
                target_id = %header.target(),
                "target deleted while awaiting a deferred message"
            );
            return true;
        };

        // SAFETY: the record outlives this call; the borrow ends with it.
        let args = unsafe { message::record_args(header) };
        match header.kind() {
            MessageKind::Call => {
                let method = header.name();
                if let Err(error) = object.invoke(method, args) {
                    if header.show_error() {
                        tracing::error!(
                            target_id = %header.target(),
                            target_type = %object.type_name(),
                            method = %method,
                            error = %error,
                            "error calling deferred method"
                        );
                    }
                }
            }
            MessageKind::Set => {
                if let Some(value) = args.first() {
                    object.assign(header.name(), value);
                }
            }
            MessageKind::Notification => object.notify(header.code()),
        }
        false
    }

    fn statistics_locked(&self, state: &QueueState) -> QueueStatistics {
        let mut stats = QueueStatistics {
            bytes_in_use: state.buffer.end(),
            capacity: state.buffer.capacity(),
            max_usage: state.max_usage,
            flushed_dead_targets: state.flushed_dead_targets,
            ..QueueStatistics::default()
        };

        // Start past anything an in-progress flush has already destroyed.
        let mut read_pos = state.read_pos;
        while read_pos < state.buffer.end() {
            // SAFETY: read_pos is a record boundary within the live run, and
            // the lock is held, so no record can be destroyed under us.
            let header = unsafe { &*state.buffer.ptr_at(read_pos).cast::<MessageHeader>() };
            read_pos += header.total_size();
            stats.message_count += 1;

            if self.registry.resolve(header.target()).is_none() {
                stats.pending_dead_targets += 1;
                continue;
            }
            match header.kind() {
                MessageKind::Call => {
                    *stats.calls.entry(header.name().to_string()).or_insert(0) += 1;
                }
                MessageKind::Set => {
                    *stats.sets.entry(header.name().to_string()).or_insert(0) += 1;
                }
                MessageKind::Notification => {
                    *stats.notifications.entry(header.code()).or_insert(0) += 1;
                }
            }
        }
        stats
    }
}

impl Drop for MessageQueue {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        // Undelivered residue still owns its argument values; destroy it.
        // SAFETY: exclusive access, and everything from read_pos to the
        // cursor is a run of live records.
        unsafe { message::drain_records(&mut state.buffer, state.read_pos) };
        state.read_pos = 0;
        for (_, thread_buffer) in state.thread_buffers.drain() {
            let mut data = thread_buffer.data;
            // SAFETY: scopes die with the queue; the batch is a live run.
            unsafe { message::drain_records(&mut data, 0) };
        }
    }
}
