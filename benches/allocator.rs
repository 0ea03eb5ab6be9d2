use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rubolt_memory::{GcHeap, TypeRegistry};

fn bench_pooled_allocation(c: &mut Criterion) {
    let registry = TypeRegistry::new();
    c.bench_function("alloc_free_24bytes_pooled", |b| {
        let mut heap = GcHeap::new();
        heap.disable();
        b.iter(|| {
            let ptr = heap.allocate(&registry, black_box(24)).unwrap();
            unsafe { heap.free(ptr.as_ptr()) };
        });
    });
}

fn bench_general_heap_allocation(c: &mut Criterion) {
    let registry = TypeRegistry::new();
    c.bench_function("alloc_free_4096bytes_general", |b| {
        let mut heap = GcHeap::new();
        heap.disable();
        b.iter(|| {
            let ptr = heap.allocate(&registry, black_box(4096)).unwrap();
            unsafe { heap.free(ptr.as_ptr()) };
        });
    });
}

criterion_group!(benches, bench_pooled_allocation, bench_general_heap_allocation);
criterion_main!(benches);
