//! Tracing garbage collector: size-segregated pools, a root set, and a
//! mark-sweep collector triggered by an allocation-byte threshold.
//!
//! `GcHeap` owns everything a collection needs and takes the active
//! [`TypeRegistry`] as an explicit parameter on every call that must trace
//! live objects, rather than reaching for a global (Design Notes, "Global
//! state").

mod header;
mod mark;
mod pool;
mod roots;
mod sweep;

#[cfg(test)]
mod proptests;

use crate::logging::{debug, trace};
use crate::registry::{TypeId, TypeRegistry};
use core::ptr::NonNull;
use header::GcHeader;
use pool::PoolSet;
use roots::RootSet;

/// Tunable thresholds for the tracing collector (SPEC_FULL.md §D).
#[derive(Debug, Clone, Copy)]
pub struct GcConfig {
    /// Collection never lowers the threshold below this many live bytes.
    pub min_threshold: usize,
    /// Next threshold is `max(min_threshold, bytes_allocated * growth_factor)`.
    pub growth_factor: f64,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self { min_threshold: 1 << 20, growth_factor: 2.0 }
    }
}

/// Point-in-time snapshot of heap occupancy.
#[derive(Debug, Clone, Copy)]
pub struct GcStats {
    pub live_objects: usize,
    pub bytes_allocated: usize,
    pub next_threshold: usize,
    pub collections_run: usize,
    pub pointers_traversable: usize,
    /// Bytes currently in use within each size class, indexed the same as
    /// [`pool::SIZE_CLASSES`].
    pub per_class_bytes: [usize; pool::SIZE_CLASSES.len()],
    /// Bytes currently allocated outside any size class.
    pub general_heap_bytes: usize,
}

pub struct GcHeap {
    pools: PoolSet,
    roots: RootSet,
    live_list: *mut GcHeader,
    enabled: bool,
    bytes_allocated: usize,
    live_objects: usize,
    threshold: usize,
    collections_run: usize,
    config: GcConfig,
}

impl GcHeap {
    pub fn new() -> Self {
        Self::with_config(GcConfig::default())
    }

    pub fn with_config(config: GcConfig) -> Self {
        Self {
            pools: PoolSet::new(),
            roots: RootSet::new(),
            live_list: core::ptr::null_mut(),
            enabled: true,
            bytes_allocated: 0,
            live_objects: 0,
            threshold: config.min_threshold,
            collections_run: 0,
            config,
        }
    }

    /// Allocate `size` untyped, uninitialized bytes. Returns `None` on
    /// out-of-memory or when `size` is zero (§8 boundary behavior).
    pub fn allocate(&mut self, registry: &TypeRegistry, size: usize) -> Option<NonNull<u8>> {
        self.raw_allocate(registry, size, None)
    }

    /// Like [`Self::allocate`] but the payload is zero-filled.
    pub fn allocate_zeroed(&mut self, registry: &TypeRegistry, size: usize) -> Option<NonNull<u8>> {
        let ptr = self.raw_allocate(registry, size, None)?;
        unsafe { ptr.as_ptr().write_bytes(0, size) };
        Some(ptr)
    }

    /// Allocate an object of the size registered for `type_id`, tagging the
    /// header so the tracer knows how to traverse it.
    pub fn allocate_typed(&mut self, registry: &TypeRegistry, type_id: TypeId) -> Option<NonNull<u8>> {
        let size = registry.get(type_id).size;
        self.raw_allocate(registry, size, Some(type_id))
    }

    fn raw_allocate(
        &mut self,
        registry: &TypeRegistry,
        payload_size: usize,
        type_id: Option<TypeId>,
    ) -> Option<NonNull<u8>> {
        if payload_size == 0 {
            return None;
        }

        self.maybe_collect(registry);

        let total_size = GcHeader::total_size() + payload_size;
        let (slot, pool_class) = self.pools.allocate(total_size)?;
        let header_ptr = slot.as_ptr() as *mut GcHeader;
        unsafe {
            header_ptr.write(GcHeader::new(payload_size, type_id, pool_class));
            (*header_ptr).next.set(self.live_list);
        }
        self.live_list = header_ptr;
        self.live_objects += 1;
        self.bytes_allocated += total_size;

        let payload = GcHeader::payload(header_ptr);
        trace!(address = ?payload, bytes = total_size, "gc_alloc object");
        NonNull::new(payload)
    }

    /// Grow or shrink a previously allocated payload: a fresh block is
    /// taken, the smaller of the two sizes is copied, and the old block is
    /// freed. `new_size == 0` behaves as [`Self::free`].
    ///
    /// # Safety
    /// `ptr` must be a payload pointer this heap returned and not yet freed.
    pub unsafe fn reallocate(
        &mut self,
        registry: &TypeRegistry,
        ptr: *mut u8,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        if ptr.is_null() {
            return self.raw_allocate(registry, new_size, None);
        }
        if new_size == 0 {
            self.free(ptr);
            return None;
        }

        let old_header = &*GcHeader::from_payload(ptr);
        let old_len = old_header.payload_len();
        let type_id = old_header.type_id();

        let new_ptr = self.raw_allocate(registry, new_size, type_id)?;
        let copy_len = old_len.min(new_size);
        core::ptr::copy_nonoverlapping(ptr, new_ptr.as_ptr(), copy_len);
        self.free(ptr);
        Some(new_ptr)
    }

    /// Free a single object immediately, outside the tracing cycle. A null
    /// pointer is a no-op.
    ///
    /// # Safety
    /// `ptr` must be a live payload pointer previously returned by this heap
    /// and not already freed.
    pub unsafe fn free(&mut self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }

        let target = GcHeader::from_payload(ptr);
        let mut prev: *mut GcHeader = core::ptr::null_mut();
        let mut current = self.live_list;
        while !current.is_null() {
            let next = (*current).next.get();
            if current == target {
                if prev.is_null() {
                    self.live_list = next;
                } else {
                    (*prev).next.set(next);
                }
                let header = &*current;
                let total_size = GcHeader::total_size() + header.payload_len();
                let pool_class = if header.pool_class.get() == header::GENERAL_HEAP {
                    None
                } else {
                    Some(header.pool_class.get() as u8)
                };
                if let Some(slot) = NonNull::new(current as *mut u8) {
                    self.pools.free(slot, total_size, pool_class);
                }
                self.live_objects -= 1;
                self.bytes_allocated -= total_size;
                return;
            }
            prev = current;
            current = next;
        }
    }

    pub fn add_root(&mut self, ptr: *mut u8) {
        self.roots.add(ptr);
    }

    pub fn remove_root(&mut self, ptr: *mut u8) {
        self.roots.remove(ptr);
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    fn maybe_collect(&mut self, registry: &TypeRegistry) {
        if self.enabled && self.bytes_allocated >= self.threshold {
            self.collect(registry);
        }
    }

    /// Run one mark-sweep cycle if the collector is enabled; otherwise a
    /// no-op.
    pub fn collect(&mut self, registry: &TypeRegistry) {
        if !self.enabled {
            return;
        }
        self.run_cycle(registry);
    }

    /// Run one mark-sweep cycle unconditionally, temporarily enabling the
    /// collector if it was disabled and restoring the prior state after.
    pub fn force_collect(&mut self, registry: &TypeRegistry) {
        let was_enabled = self.enabled;
        self.enabled = true;
        self.run_cycle(registry);
        self.enabled = was_enabled;
    }

    fn run_cycle(&mut self, registry: &TypeRegistry) {
        mark::mark_all(&self.roots, registry);
        let result = unsafe { sweep::sweep(&mut self.live_list, &mut self.pools) };
        self.live_objects -= result.freed_objects;
        self.bytes_allocated -= result.freed_bytes;
        self.collections_run += 1;
        self.threshold = ((self.bytes_allocated as f64) * self.config.growth_factor) as usize;
        self.threshold = self.threshold.max(self.config.min_threshold);
        debug!(
            freed_objects = result.freed_objects,
            freed_bytes = result.freed_bytes,
            next_threshold = self.threshold,
            "gc_collect complete"
        );
    }

    pub fn stats(&self, registry: &TypeRegistry) -> GcStats {
        let mut pointers_traversable = 0;
        let mut current = self.live_list;
        while !current.is_null() {
            let header = unsafe { &*current };
            if let Some(type_id) = header.type_id() {
                pointers_traversable += registry.count_pointers(type_id);
            }
            current = header.next.get();
        }

        let mut per_class_bytes = [0usize; pool::SIZE_CLASSES.len()];
        for (class, bytes) in per_class_bytes.iter_mut().enumerate() {
            *bytes = self.pools.class_bytes(class as u8);
        }

        GcStats {
            live_objects: self.live_objects,
            bytes_allocated: self.bytes_allocated,
            next_threshold: self.threshold,
            collections_run: self.collections_run,
            pointers_traversable,
            per_class_bytes,
            general_heap_bytes: self.pools.general_heap_bytes,
        }
    }

    /// Free every remaining live object without tracing. Called by `Drop`;
    /// exposed directly so callers can reclaim memory deterministically
    /// before the heap itself goes out of scope.
    pub fn shutdown(&mut self) {
        let mut current = self.live_list;
        while !current.is_null() {
            let header = unsafe { &*current };
            let next = header.next.get();
            let total_size = GcHeader::total_size() + header.payload_len();
            let pool_class = if header.pool_class.get() == header::GENERAL_HEAP {
                None
            } else {
                Some(header.pool_class.get() as u8)
            };
            if let Some(slot) = NonNull::new(current as *mut u8) {
                unsafe { self.pools.free(slot, total_size, pool_class) };
            }
            current = next;
        }
        self.live_list = core::ptr::null_mut();
        self.live_objects = 0;
        self.bytes_allocated = 0;
        self.roots.clear();
    }
}

impl Default for GcHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GcHeap {
    fn drop(&mut self) {
        self.shutdown();
    }
}
