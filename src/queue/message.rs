//! In-buffer record encoding.
//!
//! A record is a fixed [`MessageHeader`] followed back-to-back by its
//! argument [`Value`] slots:
//!
//! ```text
//! ┌────────────────┬─────────┬─────────┬────
//! │ MessageHeader  │ Value 0 │ Value 1 │ …      Call: arg_count slots
//! ├────────────────┼─────────┼─────────┴────
//! │ MessageHeader  │ Value   │                 Set: exactly one slot
//! ├────────────────┼─────────┴
//! │ MessageHeader  │                           Notification: header only
//! └────────────────┴
//! ```
//!
//! Records are constructed directly at the buffer's write cursor with
//! `ptr::write` — no per-record heap allocation — and torn down in place
//! with `drop_in_place` once dispatched: argument slots first, then the
//! header. Every helper here is a thin wrapper around that contract.

use super::arena::{ARENA_ALIGN, Arena};
use crate::types::TargetId;
use crate::value::Value;
use std::sync::Arc;

/// Bit in [`MessageHeader::flags`] marking a call that wants invoke errors
/// surfaced through the log.
const FLAG_SHOW_ERROR: u8 = 1 << 7;
const KIND_MASK: u8 = FLAG_SHOW_ERROR - 1;

const KIND_CALL: u8 = 0;
const KIND_SET: u8 = 1;
const KIND_NOTIFICATION: u8 = 2;

pub(crate) const HEADER_SIZE: usize = size_of::<MessageHeader>();
pub(crate) const VALUE_SLOT_SIZE: usize = size_of::<Value>();

// Records are laid out back to back, so both sizes must keep every
// following header and value slot aligned.
const _: () = {
    assert!(align_of::<MessageHeader>() <= ARENA_ALIGN);
    assert!(align_of::<Value>() <= ARENA_ALIGN);
    assert!(HEADER_SIZE % ARENA_ALIGN == 0);
    assert!(VALUE_SLOT_SIZE % ARENA_ALIGN == 0);
};

/// What a record does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageKind {
    Call,
    Set,
    Notification,
}

/// Fixed-size prefix of every record.
pub(crate) struct MessageHeader {
    /// Kind tag in the low bits, [`FLAG_SHOW_ERROR`] in the top bit.
    flags: u8,
    arg_count: u32,
    target: TargetId,
    /// Method or property name; `None` for notifications.
    name: Option<Arc<str>>,
    /// Notification code; zero for calls and sets.
    code: i64,
}

impl MessageHeader {
    pub(crate) fn call(
        target: TargetId,
        method: Arc<str>,
        arg_count: u32,
        show_error: bool,
    ) -> Self {
        let mut flags = KIND_CALL;
        if show_error {
            flags |= FLAG_SHOW_ERROR;
        }
        Self {
            flags,
            arg_count,
            target,
            name: Some(method),
            code: 0,
        }
    }

    pub(crate) fn set(target: TargetId, property: Arc<str>) -> Self {
        Self {
            flags: KIND_SET,
            arg_count: 1,
            target,
            name: Some(property),
            code: 0,
        }
    }

    pub(crate) fn notification(target: TargetId, code: i64) -> Self {
        Self {
            flags: KIND_NOTIFICATION,
            arg_count: 0,
            target,
            name: None,
            code,
        }
    }

    pub(crate) fn kind(&self) -> MessageKind {
        match self.flags & KIND_MASK {
            KIND_CALL => MessageKind::Call,
            KIND_SET => MessageKind::Set,
            _ => MessageKind::Notification,
        }
    }

    pub(crate) fn show_error(&self) -> bool {
        self.flags & FLAG_SHOW_ERROR != 0
    }

    pub(crate) fn arg_count(&self) -> usize {
        match self.kind() {
            MessageKind::Notification => 0,
            _ => self.arg_count as usize,
        }
    }

    pub(crate) fn target(&self) -> TargetId {
        self.target
    }

    pub(crate) fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub(crate) fn code(&self) -> i64 {
        self.code
    }

    /// Total encoded size of the record this header starts.
    pub(crate) fn total_size(&self) -> usize {
        record_size(self.arg_count())
    }
}

/// Bytes needed for a record with `arg_count` argument slots.
pub(crate) fn record_size(arg_count: usize) -> usize {
    HEADER_SIZE + arg_count * VALUE_SLOT_SIZE
}

/// Construct a record in place at `dst`, consuming the argument values.
///
/// # Safety
///
/// `dst` must be [`ARENA_ALIGN`]-aligned and point at a reservation of at
/// least `record_size(args.len())` bytes that nothing else references.
/// `header.arg_count()` must equal `args.len()`.
pub(crate) unsafe fn write_record(dst: *mut u8, header: MessageHeader, args: Vec<Value>) {
    debug_assert_eq!(header.arg_count(), args.len());
    let header_ptr = dst.cast::<MessageHeader>();
    // SAFETY: caller guarantees alignment and room for the full record.
    unsafe {
        header_ptr.write(header);
        let mut slot = header_ptr.add(1).cast::<Value>();
        for value in args {
            slot.write(value);
            slot = slot.add(1);
        }
    }
}

/// Borrow the argument slots of a live record.
///
/// # Safety
///
/// `header` must point at a record previously produced by [`write_record`]
/// that has not been destroyed, and the record must stay alive and
/// untouched for the returned lifetime.
pub(crate) unsafe fn record_args<'a>(header: *const MessageHeader) -> &'a [Value] {
    // SAFETY: the slots sit immediately after the header by construction.
    unsafe {
        let arg_count = (*header).arg_count();
        std::slice::from_raw_parts(header.add(1).cast::<Value>(), arg_count)
    }
}

/// Destroy a record in place: argument slots first, then the header.
///
/// # Safety
///
/// `header` must point at a live record produced by [`write_record`], and
/// no reference into the record may outlive this call.
pub(crate) unsafe fn destroy_record(header: *mut MessageHeader) {
    // SAFETY: layout per write_record; each slot and the header are dropped
    // exactly once.
    unsafe {
        let arg_count = (*header).arg_count();
        let mut slot = header.add(1).cast::<Value>();
        for _ in 0..arg_count {
            std::ptr::drop_in_place(slot);
            slot = slot.add(1);
        }
        std::ptr::drop_in_place(header);
    }
}

/// Destroy every record in `arena` from `from` to the cursor, then rewind.
///
/// Used when tearing the queue down with undelivered residue; `from` is the
/// first offset that still holds a live record.
///
/// # Safety
///
/// `[from, arena.end())` must be a run of live, contiguous records and no
/// reference into the arena may outlive this call.
pub(crate) unsafe fn drain_records(arena: &mut Arena, from: usize) {
    let mut read_pos = from;
    while read_pos < arena.end() {
        let header = arena.ptr_at(read_pos).cast::<MessageHeader>();
        // SAFETY: read_pos is a record boundary within the live run.
        unsafe {
            read_pos += (*header).total_size();
            destroy_record(header);
        }
    }
    arena.reset();
}
