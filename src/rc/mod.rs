//! Reference-counting heap: deterministic destruction plus a tri-color
//! cycle collector for groups of objects that only keep each other alive.
//!
//! Independent of [`crate::gc`] — a separate object list, a separate
//! allocator, no shared lifetime with GC-owned objects (Design Notes,
//! "Cyclic graphs").

mod cycles;
mod object;
mod weak;

#[cfg(test)]
mod proptests;

pub use weak::Weak;

use crate::logging::trace;
use crate::registry::{Destructor, TypeId, TypeRegistry};
use core::ptr::NonNull;
use object::RcObject;
use std::alloc::{alloc, dealloc, Layout};

/// Tunables for the RC subsystem (SPEC_FULL.md §D).
#[derive(Debug, Clone, Copy)]
pub struct RcConfig {
    /// Whether newly-multi-referenced objects enter the candidate buffer.
    pub cycle_detection_enabled: bool,
}

impl Default for RcConfig {
    fn default() -> Self {
        Self { cycle_detection_enabled: true }
    }
}

/// Point-in-time snapshot of the RC heap (§4.3, "Statistics").
#[derive(Debug, Clone, Copy)]
pub struct RcStats {
    pub total_objects: usize,
    pub total_strong_refs: usize,
    pub cycle_buffer_size: usize,
    pub cycles_detected: usize,
    pub cycles_collected: usize,
    pub buffer_objects_with_pointers: usize,
}

pub struct RcHeap {
    registry_head: *mut RcObject,
    buffer_head: *mut RcObject,
    cycle_detection_enabled: bool,
    live_objects: usize,
    strong_refs_total: usize,
    cycles_detected: usize,
    cycles_collected: usize,
    collections_run: usize,
}

impl RcHeap {
    pub fn new() -> Self {
        Self::with_config(RcConfig::default())
    }

    pub fn with_config(config: RcConfig) -> Self {
        Self {
            registry_head: core::ptr::null_mut(),
            buffer_head: core::ptr::null_mut(),
            cycle_detection_enabled: config.cycle_detection_enabled,
            live_objects: 0,
            strong_refs_total: 0,
            cycles_detected: 0,
            cycles_collected: 0,
            collections_run: 0,
        }
    }

    /// Allocate an untyped, owned payload of `size` bytes. Returns `None`
    /// on out-of-memory or a zero-sized request.
    pub fn new_object(&mut self, size: usize) -> Option<NonNull<u8>> {
        self.allocate(size, None, None)
    }

    /// Allocate an owned payload with an explicit per-instance destructor,
    /// independent of the type registry.
    pub fn new_with_destructor(&mut self, size: usize, destructor: Destructor) -> Option<NonNull<u8>> {
        self.allocate(size, None, Some(destructor))
    }

    /// Allocate an owned payload sized and destructed per `type_id`'s
    /// registered descriptor.
    pub fn new_typed(&mut self, registry: &TypeRegistry, type_id: TypeId) -> Option<NonNull<u8>> {
        let descriptor = registry.get(type_id);
        self.allocate(descriptor.size, Some(type_id), descriptor.destructor)
    }

    fn allocate(
        &mut self,
        size: usize,
        type_id: Option<TypeId>,
        destructor: Option<Destructor>,
    ) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }
        let layout = Layout::from_size_align(size, 8).ok()?;
        let raw = unsafe { alloc(layout) };
        let payload = NonNull::new(raw)?;
        let object = Box::new(RcObject::new(payload, size, true, type_id, destructor));
        Some(self.link(object))
    }

    /// Wrap a caller-owned buffer in an RC record without copying it. The
    /// buffer is never deallocated by this heap; only the destructor (if
    /// any) is invoked on release.
    pub fn wrap_borrowed(
        &mut self,
        payload: NonNull<u8>,
        payload_size: usize,
        type_id: Option<TypeId>,
        destructor: Option<Destructor>,
    ) -> NonNull<u8> {
        let object = Box::new(RcObject::new(payload, payload_size, false, type_id, destructor));
        self.link(object)
    }

    fn link(&mut self, object: Box<RcObject>) -> NonNull<u8> {
        let ptr = Box::into_raw(object);
        unsafe { (*ptr).registry_next.set(self.registry_head) };
        self.registry_head = ptr;
        self.live_objects += 1;
        self.strong_refs_total += 1;
        trace!(address = ?ptr, "rc_new object");
        NonNull::new(ptr as *mut u8).expect("Box::into_raw is never null")
    }

    /// Increment the strong count. If cycle detection is on and the count
    /// just became ≥ 2, the object enters the candidate buffer.
    ///
    /// # Safety
    /// `obj` must be a live handle returned by this heap.
    pub unsafe fn retain(&mut self, obj: *mut u8) {
        let ptr = obj as *mut RcObject;
        let object = &*ptr;
        object.strong.set(object.strong.get() + 1);
        self.strong_refs_total += 1;

        if self.cycle_detection_enabled && object.strong.get() >= 2 && !object.in_buffer.get() {
            self.enqueue_candidate(ptr);
        }
    }

    fn enqueue_candidate(&mut self, ptr: *mut RcObject) {
        unsafe {
            (*ptr).in_buffer.set(true);
            (*ptr).buffer_next.set(self.buffer_head);
        }
        self.buffer_head = ptr;
    }

    /// Force `obj` into the candidate buffer regardless of its strong
    /// count, per the explicit entry point in §6.
    ///
    /// # Safety
    /// `obj` must be a live handle returned by this heap.
    pub unsafe fn mark_for_cycle_detection(&mut self, obj: *mut u8) {
        let ptr = obj as *mut RcObject;
        if !(*ptr).in_buffer.get() {
            self.enqueue_candidate(ptr);
        }
    }

    /// Decrement the strong count; destroys the object immediately if it
    /// reaches zero.
    ///
    /// # Safety
    /// `obj` must be a live handle returned by this heap, not already
    /// released to zero.
    pub unsafe fn release(&mut self, obj: *mut u8) {
        let ptr = obj as *mut RcObject;
        let object = &*ptr;
        debug_assert!(object.strong.get() > 0, "release of an already-dead object");
        let remaining = object.strong.get() - 1;
        object.strong.set(remaining);
        self.strong_refs_total = self.strong_refs_total.saturating_sub(1);

        if remaining == 0 {
            self.destroy(ptr);
        }
    }

    /// Current strong count.
    ///
    /// # Safety
    /// `obj` must be a live handle returned by this heap.
    pub unsafe fn get_count(&self, obj: *mut u8) -> usize {
        (*(obj as *const RcObject)).strong.get()
    }

    /// Destroy the payload and unlink the object record. The record
    /// itself stays allocated until the weak count also reaches zero, so
    /// that a live `Weak::lock` never reads freed memory (§3, "note on
    /// destruction interaction").
    unsafe fn destroy(&mut self, ptr: *mut RcObject) {
        let object = &*ptr;
        if object.in_buffer.get() {
            self.unlink_from_buffer(ptr);
        }

        if let Some(destructor) = object.destructor {
            destructor(object.payload.as_ptr());
        }
        if object.payload_owned {
            let layout = Layout::from_size_align(object.payload_size.max(1), 8).unwrap();
            dealloc(object.payload.as_ptr(), layout);
        }
        object.mark_dead();
        trace!(address = ?ptr, "rc_release destroy");

        self.unlink_from_registry(ptr);
        self.live_objects -= 1;

        if object.weak.get() == 0 {
            drop(Box::from_raw(ptr));
        }
    }

    fn unlink_from_buffer(&mut self, target: *mut RcObject) {
        let mut prev: *mut RcObject = core::ptr::null_mut();
        let mut current = self.buffer_head;
        while !current.is_null() {
            let next = unsafe { (*current).buffer_next.get() };
            if current == target {
                if prev.is_null() {
                    self.buffer_head = next;
                } else {
                    unsafe { (*prev).buffer_next.set(next) };
                }
                unsafe {
                    (*current).in_buffer.set(false);
                    (*current).buffer_next.set(core::ptr::null_mut());
                }
                return;
            }
            prev = current;
            current = next;
        }
    }

    fn unlink_from_registry(&mut self, target: *mut RcObject) {
        let mut prev: *mut RcObject = core::ptr::null_mut();
        let mut current = self.registry_head;
        while !current.is_null() {
            let next = unsafe { (*current).registry_next.get() };
            if current == target {
                if prev.is_null() {
                    self.registry_head = next;
                } else {
                    unsafe { (*prev).registry_next.set(next) };
                }
                return;
            }
            prev = current;
            current = next;
        }
    }

    /// Create a non-owning handle to `obj`, incrementing its weak count.
    ///
    /// # Safety
    /// `obj` must be a live handle returned by this heap.
    pub unsafe fn weak_new(&mut self, obj: *mut u8) -> Weak {
        let ptr = obj as *mut RcObject;
        (*ptr).weak.set((*ptr).weak.get() + 1);
        Weak::new(ptr)
    }

    /// Release a weak handle. If its target was already destroyed and this
    /// was the last outstanding weak reference, the object record is
    /// finally deallocated here.
    pub fn weak_release(&mut self, weak: &Weak) {
        let ptr = weak.target.get();
        if ptr.is_null() {
            return;
        }
        let object = unsafe { &*ptr };
        let remaining = object.weak.get().saturating_sub(1);
        object.weak.set(remaining);

        if remaining == 0 && !object.is_live() {
            unsafe { drop(Box::from_raw(ptr)) };
        }
    }

    pub fn weak_lock(&self, weak: &Weak) -> Option<NonNull<u8>> {
        weak.lock()
    }

    pub fn set_cycle_detection(&mut self, enabled: bool) {
        self.cycle_detection_enabled = enabled;
    }

    /// Validate that `ptr` is a live RC object known to this heap's global
    /// registry (§4.3). Rejects pointers into GC-owned memory even when
    /// the bytes there happen to match the sentinel by chance, because
    /// the registry scan will not find them.
    pub fn is_valid_object(&self, ptr: *mut u8) -> bool {
        unsafe { cycles::validate_pointer(ptr, self.registry_head).is_some() }
    }

    /// Run one cycle-collection pass. Returns 0 immediately if cycle
    /// detection is disabled or the candidate buffer is empty.
    pub fn collect_cycles(&mut self, registry: &TypeRegistry) -> usize {
        if !self.cycle_detection_enabled {
            return 0;
        }

        let result = cycles::run(self.buffer_head, self.registry_head, registry);
        self.buffer_head = result.surviving_head;
        self.collections_run += 1;

        let freed_count = result.freed.len();
        if freed_count > 0 {
            self.cycles_detected += freed_count;
            self.cycles_collected += freed_count;
        }

        for ptr in result.freed {
            let object = unsafe { &*ptr };
            self.strong_refs_total = self.strong_refs_total.saturating_sub(object.strong.get());

            if let Some(destructor) = object.destructor {
                unsafe { destructor(object.payload.as_ptr()) };
            }
            if object.payload_owned {
                let layout = Layout::from_size_align(object.payload_size.max(1), 8).unwrap();
                unsafe { dealloc(object.payload.as_ptr(), layout) };
            }
            object.mark_dead();
            self.unlink_from_registry(ptr);
            self.live_objects -= 1;

            if object.weak.get() == 0 {
                unsafe { drop(Box::from_raw(ptr)) };
            }
        }

        freed_count
    }

    pub fn get_stats(&self, registry: &TypeRegistry) -> RcStats {
        let mut cycle_buffer_size = 0;
        let mut buffer_objects_with_pointers = 0;
        let mut current = self.buffer_head;
        while !current.is_null() {
            cycle_buffer_size += 1;
            let object = unsafe { &*current };
            if let Some(type_id) = object.type_id.get() {
                if registry.has_pointers(type_id) {
                    buffer_objects_with_pointers += 1;
                }
            }
            current = object.buffer_next.get();
        }

        RcStats {
            total_objects: self.live_objects,
            total_strong_refs: self.strong_refs_total,
            cycle_buffer_size,
            cycles_detected: self.cycles_detected,
            cycles_collected: self.cycles_collected,
            buffer_objects_with_pointers,
        }
    }

    /// Tear down every remaining live object unconditionally, ignoring
    /// weak counts. Called by `Drop`.
    pub fn shutdown(&mut self) {
        let mut current = self.registry_head;
        while !current.is_null() {
            let object = unsafe { &*current };
            let next = object.registry_next.get();
            if let Some(destructor) = object.destructor {
                unsafe { destructor(object.payload.as_ptr()) };
            }
            if object.payload_owned {
                let layout = Layout::from_size_align(object.payload_size.max(1), 8).unwrap();
                unsafe { dealloc(object.payload.as_ptr(), layout) };
            }
            unsafe { drop(Box::from_raw(current)) };
            current = next;
        }
        self.registry_head = core::ptr::null_mut();
        self.buffer_head = core::ptr::null_mut();
        self.live_objects = 0;
        self.strong_refs_total = 0;
    }
}

impl Default for RcHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RcHeap {
    fn drop(&mut self) {
        self.shutdown();
    }
}
