//! Mark phase - recursive reachability marking from the root set.

use super::header::GcHeader;
use super::roots::RootSet;
use crate::logging::trace;
use crate::registry::TypeRegistry;

/// Mark every object reachable from `roots`. Returns the number of objects
/// newly marked (the "pointers traversed" statistic approximates this by
/// counting pointer fields visited, tracked by the caller).
pub(crate) fn mark_all(roots: &RootSet, registry: &TypeRegistry) -> usize {
    let mut marked = 0;
    for root in roots.iter() {
        mark_object(root, registry, &mut marked);
    }
    marked
}

/// Mark one object and, if it carries a type descriptor with pointer
/// fields, recurse into every outgoing reference. Recursion depth equals
/// the longest pointer chain (§4.2: "the design assumes bounded depth for
/// the target workloads").
fn mark_object(payload: *mut u8, registry: &TypeRegistry, marked: &mut usize) {
    if payload.is_null() {
        return;
    }

    let header = unsafe { &*GcHeader::from_payload(payload) };
    if header.mark.get() {
        return;
    }
    header.mark.set(true);
    *marked += 1;
    trace!(address = ?payload, "gc_mark object");

    if let Some(type_id) = header.type_id() {
        if registry.has_pointers(type_id) {
            let mut visitor = |_object_base: *mut u8, ptr: *mut u8| {
                mark_object(ptr, registry, marked);
            };
            unsafe { registry.traverse(type_id, payload, &mut visitor) };
        }
    }
}
