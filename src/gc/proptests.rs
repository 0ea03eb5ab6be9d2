//! Property-based tests for the quantified invariants of `spec.md` §8 that
//! hold over arbitrary allocation sequences, not just hand-picked scenarios.

use super::*;
use crate::registry::TypeRegistry;
use quickcheck::quickcheck;

fn clamp(raw: u8) -> usize {
    (raw as usize % 250) + 1
}

quickcheck! {
    /// "sum of live-object payload sizes <= bytes_allocated <= sum of
    /// (payload + header + pool-slack)" for all GC allocation sequences.
    fn bytes_allocated_brackets_requested_payload(sizes: Vec<u8>) -> bool {
        let registry = TypeRegistry::new();
        let mut heap = GcHeap::new();
        heap.disable();

        let mut requested = 0usize;
        let mut pointers = Vec::new();
        for raw in sizes {
            let size = clamp(raw);
            if let Some(ptr) = heap.allocate(&registry, size) {
                requested += size;
                pointers.push(ptr);
            }
        }

        let bytes_allocated = heap.stats(&registry).bytes_allocated;
        let upper_bound = requested + pointers.len() * (header::GcHeader::total_size() + 256);
        let holds = requested <= bytes_allocated && bytes_allocated <= upper_bound;

        for ptr in pointers {
            unsafe { heap.free(ptr.as_ptr()) };
        }
        holds
    }

    /// Freeing every allocated object returns the heap to empty, for any
    /// allocation sequence.
    fn freeing_every_object_empties_the_heap(sizes: Vec<u8>) -> bool {
        let registry = TypeRegistry::new();
        let mut heap = GcHeap::new();
        heap.disable();

        let pointers: Vec<_> = sizes
            .into_iter()
            .filter_map(|raw| heap.allocate(&registry, clamp(raw)))
            .collect();
        for ptr in &pointers {
            unsafe { heap.free(ptr.as_ptr()) };
        }

        let stats = heap.stats(&registry);
        stats.live_objects == 0 && stats.bytes_allocated == 0
    }

    /// `add_root(r); remove_root(r)` restores the root set to its prior
    /// contents (duplicate semantics: removing one of two copies leaves one).
    fn root_add_then_remove_restores_prior_contents(tags: Vec<u8>) -> bool {
        let ptrs: Vec<*mut u8> = tags.iter().map(|&t| (t as usize + 1) as *mut u8).collect();

        let mut roots = roots::RootSet::new();
        for &p in &ptrs {
            roots.add(p);
        }
        let before: Vec<_> = roots.iter().collect();

        let probe = (tags.first().copied().unwrap_or(0) as usize + 1) as *mut u8;
        roots.add(probe);
        roots.remove(probe);

        let after: Vec<_> = roots.iter().collect();
        before == after
    }

    /// An object reachable from a registered root survives any number of
    /// collections; removing the root and collecting again frees it.
    fn rooted_object_survives_repeated_collection(collections: u8) -> bool {
        let mut registry = TypeRegistry::new();
        let leaf = registry.register(crate::registry::TypeDescriptor::new("Leaf", 8));
        let mut heap = GcHeap::new();
        let obj = heap.allocate_typed(&registry, leaf).unwrap();
        heap.add_root(obj.as_ptr());

        for _ in 0..(collections % 5) {
            heap.force_collect(&registry);
        }
        let survived = heap.stats(&registry).live_objects == 1;

        heap.remove_root(obj.as_ptr());
        heap.force_collect(&registry);
        let collected = heap.stats(&registry).live_objects == 0;

        survived && collected
    }
}
