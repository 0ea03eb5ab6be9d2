//! Weak reference handle: a non-owning pointer plus the bookkeeping that
//! lets `lock` reject a handle whose target has already been destroyed.
//!
//! The object record is deliberately kept alive (not deallocated) while any
//! weak handle might still observe it — see `RcHeap::release` — so reading
//! the sentinel here never touches freed memory.

use super::object::RcObject;
use core::cell::Cell;
use core::ptr::NonNull;

/// Non-owning handle to an RC object. Never keeps the object alive.
pub struct Weak {
    pub(crate) target: Cell<*mut RcObject>,
}

impl Weak {
    pub(crate) fn new(target: *mut RcObject) -> Self {
        Self { target: Cell::new(target) }
    }

    /// Returns the object handle if the target is still live. Does not
    /// retain — callers that want a persistent strong reference must call
    /// `retain` themselves.
    pub fn lock(&self) -> Option<NonNull<u8>> {
        let ptr = self.target.get();
        if ptr.is_null() {
            return None;
        }
        let object = unsafe { &*ptr };
        if !object.is_live() || object.strong.get() == 0 {
            self.target.set(core::ptr::null_mut());
            return None;
        }
        NonNull::new(ptr as *mut u8)
    }
}
