//! Size-segregated allocation pools.
//!
//! Pools are a set of free-lists indexed by size class, each layered over
//! bump-allocated arena blocks (Design Notes, "Size-class pools"). Pool
//! blocks are never moved or returned to the OS until the heap is dropped;
//! freed slots are pushed onto their class's intrusive free-list, which
//! reuses the first word of the freed slot to store the next-free pointer.

use std::alloc::{alloc, dealloc, Layout};
use core::ptr::NonNull;

/// Size classes in bytes, header included. `8` is listed for fidelity to
/// the spec but is unreachable in practice: a [`super::header::GcHeader`]
/// alone is 16 bytes, so no allocation ever fits the 8-byte class.
pub const SIZE_CLASSES: [usize; 6] = [8, 16, 32, 64, 128, 256];

/// Bytes per arena block backing one size class.
pub const BLOCK_SIZE: usize = 4096;

/// Pick the smallest size class whose slot fits `total_size` (header +
/// payload), or `None` if it belongs on the general heap.
pub fn class_for_size(total_size: usize) -> Option<u8> {
    SIZE_CLASSES
        .iter()
        .position(|&class| class >= total_size)
        .map(|i| i as u8)
}

struct Block {
    data: NonNull<u8>,
    layout: Layout,
    used: usize,
}

impl Block {
    fn new(size: usize) -> Option<Self> {
        let layout = Layout::from_size_align(size, 8).ok()?;
        let data = NonNull::new(unsafe { alloc(layout) })?;
        Some(Self { data, layout, used: 0 })
    }

    fn remaining(&self) -> usize {
        self.layout.size() - self.used
    }

    /// Bump-allocate one slot of `class_size` bytes from this block.
    fn bump(&mut self, class_size: usize) -> Option<NonNull<u8>> {
        if self.remaining() < class_size {
            return None;
        }
        let ptr = unsafe { self.data.as_ptr().add(self.used) };
        self.used += class_size;
        NonNull::new(ptr)
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        unsafe { dealloc(self.data.as_ptr(), self.layout) };
    }
}

/// One size class: its blocks (never compacted) and its free-list of
/// previously-swept slots.
pub(crate) struct SizeClassPool {
    class_size: usize,
    blocks: Vec<Block>,
    free_list: *mut u8,
    pub(crate) bytes_used: usize,
}

impl SizeClassPool {
    fn new(class_size: usize) -> Self {
        Self { class_size, blocks: Vec::new(), free_list: core::ptr::null_mut(), bytes_used: 0 }
    }

    /// Pop from the free-list first; otherwise bump within the current
    /// block; otherwise grow a fresh block.
    fn allocate(&mut self) -> Option<NonNull<u8>> {
        if !self.free_list.is_null() {
            let slot = self.free_list;
            self.free_list = unsafe { *(slot as *mut *mut u8) };
            self.bytes_used += self.class_size;
            return NonNull::new(slot);
        }

        if let Some(block) = self.blocks.last_mut() {
            if let Some(ptr) = block.bump(self.class_size) {
                self.bytes_used += self.class_size;
                return Some(ptr);
            }
        }

        let block_capacity = BLOCK_SIZE.max(self.class_size);
        let mut block = Block::new(block_capacity)?;
        let ptr = block.bump(self.class_size)?;
        self.blocks.push(block);
        self.bytes_used += self.class_size;
        Some(ptr)
    }

    /// Push a slot back onto this class's free-list; the slot's first word
    /// is overwritten with the previous free-list head.
    ///
    /// # Safety
    /// `slot` must currently be a live allocation from this pool.
    unsafe fn free(&mut self, slot: NonNull<u8>) {
        *(slot.as_ptr() as *mut *mut u8) = self.free_list;
        self.free_list = slot.as_ptr();
        self.bytes_used = self.bytes_used.saturating_sub(self.class_size);
    }
}

/// The full set of size-class pools plus the general-heap fallback.
pub(crate) struct PoolSet {
    classes: [SizeClassPool; SIZE_CLASSES.len()],
    pub(crate) general_heap_bytes: usize,
}

impl PoolSet {
    pub fn new() -> Self {
        Self {
            classes: SIZE_CLASSES.map(SizeClassPool::new),
            general_heap_bytes: 0,
        }
    }

    /// Allocate `total_size` bytes, choosing a pooled class or the general
    /// heap per the class-selection rule.
    pub fn allocate(&mut self, total_size: usize) -> Option<(NonNull<u8>, Option<u8>)> {
        match class_for_size(total_size) {
            Some(class) => {
                let ptr = self.classes[class as usize].allocate()?;
                Some((ptr, Some(class)))
            }
            None => {
                let layout = Layout::from_size_align(total_size.max(1), 8).ok()?;
                let raw = unsafe { alloc(layout) };
                let ptr = NonNull::new(raw)?;
                self.general_heap_bytes += total_size;
                Some((ptr, None))
            }
        }
    }

    /// Return a slot to its pool's free-list, or deallocate it if it came
    /// from the general heap.
    ///
    /// # Safety
    /// `ptr`/`total_size`/`pool_class` must describe a live allocation this
    /// `PoolSet` produced.
    pub unsafe fn free(&mut self, ptr: NonNull<u8>, total_size: usize, pool_class: Option<u8>) {
        match pool_class {
            Some(class) => self.classes[class as usize].free(ptr),
            None => {
                let layout = Layout::from_size_align(total_size.max(1), 8).unwrap();
                dealloc(ptr.as_ptr(), layout);
                self.general_heap_bytes = self.general_heap_bytes.saturating_sub(total_size);
            }
        }
    }

    pub fn class_bytes(&self, class: u8) -> usize {
        self.classes[class as usize].bytes_used
    }
}
