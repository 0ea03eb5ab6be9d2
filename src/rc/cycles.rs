//! Tri-color cycle collector for the candidate buffer (§4.3).
//!
//! Runs in four passes over the candidate buffer and the global object
//! registry: reset, count internal references, mark externally-reachable,
//! then scan and collect whatever is still white.

use super::object::{Color, RcObject, LIVE_MAGIC};
use crate::logging::{debug, trace};
use crate::registry::TypeRegistry;
use core::mem::align_of;

/// Validate a raw field value as a genuine, currently-live RC object
/// pointer: non-null, aligned, sentinel match, and registry membership
/// (§4.3, "Pointer validation"). This is the only place a traversed field
/// value is trusted to be an `RcObject*`.
pub(crate) unsafe fn validate_pointer(
    ptr: *mut u8,
    registry_head: *mut RcObject,
) -> Option<*mut RcObject> {
    if ptr.is_null() {
        return None;
    }
    if (ptr as usize) % align_of::<RcObject>() != 0 {
        return None;
    }

    let candidate = ptr as *mut RcObject;
    if (*candidate).magic.get() != LIVE_MAGIC {
        return None;
    }

    let mut current = registry_head;
    while !current.is_null() {
        if current == candidate {
            return Some(candidate);
        }
        current = (*current).registry_next.get();
    }
    None
}

fn reset(buffer_head: *mut RcObject) {
    let mut current = buffer_head;
    while !current.is_null() {
        let object = unsafe { &*current };
        object.internal_refs.set(0);
        object.color.set(Color::White);
        object.scanned.set(false);
        current = object.buffer_next.get();
    }
}

fn count_internal_references(buffer_head: *mut RcObject, registry_head: *mut RcObject, registry: &TypeRegistry) {
    let mut current = buffer_head;
    while !current.is_null() {
        let object = unsafe { &*current };
        if let Some(type_id) = object.type_id.get() {
            if registry.has_pointers(type_id) {
                let mut visitor = |_base: *mut u8, ptr: *mut u8| unsafe {
                    if let Some(target) = validate_pointer(ptr, registry_head) {
                        if target != current {
                            (*target).internal_refs.set((*target).internal_refs.get() + 1);
                        }
                    }
                };
                unsafe { registry.traverse(type_id, object.payload.as_ptr(), &mut visitor) };
            }
        }
        current = object.buffer_next.get();
    }
}

fn mark_black(object_ptr: *mut RcObject, registry_head: *mut RcObject, registry: &TypeRegistry) {
    let object = unsafe { &*object_ptr };
    if object.color.get() != Color::White {
        return;
    }
    object.color.set(Color::Gray);

    if let Some(type_id) = object.type_id.get() {
        if registry.has_pointers(type_id) {
            let mut visitor = |_base: *mut u8, ptr: *mut u8| unsafe {
                if let Some(target) = validate_pointer(ptr, registry_head) {
                    if target != object_ptr {
                        mark_black(target, registry_head, registry);
                    }
                }
            };
            unsafe { registry.traverse(type_id, object.payload.as_ptr(), &mut visitor) };
        }
    }

    object.color.set(Color::Black);
}

fn mark_externally_reachable(buffer_head: *mut RcObject, registry_head: *mut RcObject, registry: &TypeRegistry) {
    let mut current = buffer_head;
    while !current.is_null() {
        let object = unsafe { &*current };
        let external = object.strong.get().saturating_sub(object.internal_refs.get());
        if external > 0 {
            mark_black(current, registry_head, registry);
        }
        current = object.buffer_next.get();
    }
}

/// Result of scanning the buffer: the freed object pointers (so the caller
/// can run destructors and deallocate) and the surviving buffer head.
pub(crate) struct ScanResult {
    pub(crate) freed: Vec<*mut RcObject>,
    pub(crate) surviving_head: *mut RcObject,
}

fn scan_and_collect(buffer_head: *mut RcObject) -> ScanResult {
    let mut freed = Vec::new();
    let mut surviving_head: *mut RcObject = core::ptr::null_mut();
    let mut surviving_tail: *mut RcObject = core::ptr::null_mut();

    let mut current = buffer_head;
    while !current.is_null() {
        let object = unsafe { &*current };
        let next = object.buffer_next.get();

        if object.color.get() == Color::White && object.strong.get() > 0 {
            object.in_buffer.set(false);
            object.buffer_next.set(core::ptr::null_mut());
            freed.push(current);
        } else {
            object.buffer_next.set(core::ptr::null_mut());
            if surviving_head.is_null() {
                surviving_head = current;
            } else {
                unsafe { (*surviving_tail).buffer_next.set(current) };
            }
            surviving_tail = current;
        }

        current = next;
    }

    ScanResult { freed, surviving_head }
}

/// Run one full cycle-collection pass. Returns the objects found
/// unreachable-by-cycle (white with `strong_count > 0`); the caller is
/// responsible for destroying and deallocating them and for unlinking them
/// from the global object registry, since only it holds that list's head.
pub(crate) fn run(
    buffer_head: *mut RcObject,
    registry_head: *mut RcObject,
    registry: &TypeRegistry,
) -> ScanResult {
    if buffer_head.is_null() {
        trace!("collect_cycles: empty candidate buffer");
        return ScanResult { freed: Vec::new(), surviving_head: core::ptr::null_mut() };
    }

    reset(buffer_head);
    count_internal_references(buffer_head, registry_head, registry);
    mark_externally_reachable(buffer_head, registry_head, registry);
    let result = scan_and_collect(buffer_head);

    debug!(freed = result.freed.len(), "collect_cycles complete");
    result
}
