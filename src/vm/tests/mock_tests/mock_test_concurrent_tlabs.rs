use super::mock_test_prelude::*;
use crate::util::test_util::panic_after;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const OBJECTS_PER_THREAD: usize = 1000;

/// Allocate on a fresh mutator and return every cell with its size. Checks that each cell that
/// fit in the current TLAB was carved from its cursor.
fn allocate_many(heap: &'static crate::Heap<MockVM>, id: usize) -> Vec<(usize, usize)> {
    let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
    let mut mutator = bind(heap, id);
    let mut cells = Vec::with_capacity(OBJECTS_PER_THREAD);
    for _ in 0..OBJECTS_PER_THREAD {
        let payload = rng.random_range(0..=512usize);
        let size = object_size(0, payload);
        let before = mutator.tlab_range();
        let object = alloc_object(&mut mutator, 0, payload).unwrap();
        let cell = object.to_raw_address();
        if let Some((cursor, limit)) = before {
            if cursor + size <= limit {
                assert_eq!(cell, cursor);
            }
        }
        cells.push((cell.as_usize(), size));
    }
    unbind(mutator);
    cells
}

#[test]
pub fn threads_never_share_cells() {
    with_mockvm(|| {
        let heap = heap_for_test(
            "max_heap_size=33554432 initial_heap_size=33554432 use_tlab=true tlab_size=65536",
        );

        let mut cells = panic_after(60_000, move || {
            let handles: Vec<_> = (1..=2)
                .map(|id| std::thread::spawn(move || allocate_many(heap, id)))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });
        assert_eq!(memory_manager::collection_count(heap), 0);
        assert_eq!(cells.len(), 2 * OBJECTS_PER_THREAD);

        let to_space = heap.plan.tospace();
        cells.sort_unstable();
        for pair in cells.windows(2) {
            let (start, size) = pair[0];
            assert!(start + size <= pair[1].0, "cells overlap: {:?}", pair);
        }
        for (start, size) in cells {
            let start = unsafe { Address::from_usize(start) };
            assert!(to_space.contains(start));
            assert!(start + size <= to_space.mark());
        }
    })
}
