//! Sweep phase - reclaim unmarked objects, clear mark bits on survivors.

use super::header::GcHeader;
use super::pool::PoolSet;
use crate::logging::trace;
use core::ptr::NonNull;

/// Outcome of one sweep pass.
pub(crate) struct SweepResult {
    pub freed_objects: usize,
    pub freed_bytes: usize,
}

/// Walk the live-list starting at `*live_list_head`, freeing every unmarked
/// object and clearing the mark bit on every survivor. `*live_list_head` is
/// updated to point at the new (possibly shorter) list head.
///
/// # Safety
/// Every node reachable from `*live_list_head` must be a valid, currently
/// live `GcHeader` produced by the owning [`super::GcHeap`].
pub(crate) unsafe fn sweep(live_list_head: &mut *mut GcHeader, pools: &mut PoolSet) -> SweepResult {
    let mut freed_objects = 0;
    let mut freed_bytes = 0;

    let mut prev: *mut GcHeader = core::ptr::null_mut();
    let mut current = *live_list_head;

    while !current.is_null() {
        let header = &*current;
        let next = header.next.get();

        if header.mark.get() {
            header.mark.set(false);
            prev = current;
        } else {
            if prev.is_null() {
                *live_list_head = next;
            } else {
                (*prev).next.set(next);
            }

            let total_size = GcHeader::total_size() + header.payload_len();
            freed_bytes += total_size;
            freed_objects += 1;
            trace!(address = ?current, bytes = total_size, "gc_sweep reclaim");

            let pool_class = if header.pool_class.get() == super::header::GENERAL_HEAP {
                None
            } else {
                Some(header.pool_class.get() as u8)
            };
            if let Some(ptr) = NonNull::new(current as *mut u8) {
                pools.free(ptr, total_size, pool_class);
            }
        }

        current = next;
    }

    SweepResult { freed_objects, freed_bytes }
}
