//! Object header prefixed before every GC-owned payload.
//!
//! Kept deliberately small (16 bytes) so it fits inside the smallest pool
//! size classes the spec names. Because `8`-byte classes can't hold a
//! 16-byte header at all, that class is effectively unreachable once any
//! typed payload is stored — see `gc::pool` for the allocator's class
//! selection rule, which simply never picks a class smaller than the
//! header.

use crate::registry::TypeId;
use core::cell::Cell;

/// Prefix of every GC-owned allocation. `next` links it into the heap's
/// live-list; `mark` is valid only during a collection and is zero
/// immediately before and after every completed cycle (§3 invariant).
#[repr(C, align(8))]
pub struct GcHeader {
    pub(crate) next: Cell<*mut GcHeader>,
    type_id: Cell<i16>,
    pub(crate) pool_class: Cell<i8>,
    pub(crate) mark: Cell<bool>,
    payload_len: Cell<u32>,
}

const NO_TYPE: i16 = -1;
pub(crate) const GENERAL_HEAP: i8 = -1;

impl GcHeader {
    pub(crate) fn new(payload_len: usize, type_id: Option<TypeId>, pool_class: Option<u8>) -> Self {
        debug_assert!(type_id.map_or(true, |t| t.index() <= i16::MAX as usize));
        Self {
            next: Cell::new(core::ptr::null_mut()),
            type_id: Cell::new(type_id.map(|t| t.index() as i16).unwrap_or(NO_TYPE)),
            pool_class: Cell::new(pool_class.map(|c| c as i8).unwrap_or(GENERAL_HEAP)),
            mark: Cell::new(false),
            payload_len: Cell::new(payload_len as u32),
        }
    }

    /// Header immediately preceding an object's payload pointer.
    ///
    /// # Safety
    /// `payload` must be the pointer returned for a live GC allocation.
    #[inline]
    pub(crate) unsafe fn from_payload(payload: *mut u8) -> *mut GcHeader {
        (payload as *mut u8).sub(core::mem::size_of::<GcHeader>()) as *mut GcHeader
    }

    #[inline]
    pub(crate) fn payload(header: *mut GcHeader) -> *mut u8 {
        unsafe { (header as *mut u8).add(core::mem::size_of::<GcHeader>()) }
    }

    pub(crate) fn type_id(&self) -> Option<TypeId> {
        let raw = self.type_id.get();
        if raw == NO_TYPE {
            None
        } else {
            Some(TypeId::from_index(raw as usize))
        }
    }

    pub(crate) fn payload_len(&self) -> usize {
        self.payload_len.get() as usize
    }

    pub(crate) fn set_payload_len(&self, len: usize) {
        self.payload_len.set(len as u32);
    }

    pub(crate) fn total_size() -> usize {
        core::mem::size_of::<GcHeader>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_fits_in_sixteen_bytes() {
        assert!(core::mem::size_of::<GcHeader>() <= 16);
    }

    #[test]
    fn untyped_header_reports_no_type() {
        let header = GcHeader::new(32, None, None);
        assert!(header.type_id().is_none());
        assert_eq!(header.payload_len(), 32);
    }
}
