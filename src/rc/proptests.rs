//! Property-based tests for the quantified invariants of `spec.md` §8 that
//! hold over arbitrary retain/release sequences, not just hand-picked
//! scenarios.

use super::*;
use quickcheck::quickcheck;

quickcheck! {
    /// `retain(o); release(o)` is a no-op in observable state, for any
    /// number of balanced retain/release pairs.
    fn retain_release_round_trip_preserves_count(extra_retains: u8) -> bool {
        let mut heap = RcHeap::new();
        let obj = heap.new_object(8).unwrap();
        let before = unsafe { heap.get_count(obj.as_ptr()) };

        let k = (extra_retains % 8) as usize;
        unsafe {
            for _ in 0..k {
                heap.retain(obj.as_ptr());
            }
            for _ in 0..k {
                heap.release(obj.as_ptr());
            }
        }

        let after = unsafe { heap.get_count(obj.as_ptr()) };
        let holds = before == after;
        unsafe { heap.release(obj.as_ptr()) };
        holds
    }

    /// "total of all strong counts equals the number of retain calls minus
    /// the number of release calls on live objects" for any set of objects
    /// each retained a random number of extra times beyond their initial
    /// allocation.
    fn strong_total_tracks_retains_minus_releases(retain_counts: Vec<u8>) -> bool {
        let mut heap = RcHeap::new();
        let mut objects = Vec::new();
        let mut expected_total = 0usize;

        for raw in retain_counts {
            let retains = (raw % 6) as usize;
            let obj = heap.new_object(8).unwrap();
            unsafe {
                for _ in 0..retains {
                    heap.retain(obj.as_ptr());
                }
            }
            expected_total += 1 + retains;
            objects.push(obj);
        }

        let actual_total: usize =
            objects.iter().map(|o| unsafe { heap.get_count(o.as_ptr()) }).sum();
        let holds = actual_total == expected_total;

        for obj in objects {
            let count = unsafe { heap.get_count(obj.as_ptr()) };
            for _ in 0..count {
                unsafe { heap.release(obj.as_ptr()) };
            }
        }
        holds
    }

    /// "For all RC objects O, after destruction: is_valid_object(O) returns
    /// false" — holds regardless of what the object's payload size was.
    fn destroyed_object_is_never_valid_again(payload_size: u8) -> bool {
        let mut heap = RcHeap::new();
        let size = (payload_size as usize % 64) + 1;
        let obj = heap.new_object(size).unwrap();

        unsafe { heap.release(obj.as_ptr()) };
        !heap.is_valid_object(obj.as_ptr())
    }
}
