use super::mock_test_prelude::*;
use crate::plan::semispace::growth::GrowState;

const GROWABLE_HEAP: &str =
    "max_heap_size=4194304 initial_heap_size=2097152 use_tlab=false grow_policy=Double";

#[test]
pub fn heap_doubles_for_a_large_request() {
    with_mockvm(|| {
        let heap = heap_for_test(GROWABLE_HEAP);
        let mut mutator = bind(heap, 1);
        let tls = mutator.mutator_tls;
        assert_eq!(heap.plan.tospace().size(), BYTES_IN_MBYTE);

        let small = alloc_object(&mut mutator, 0, 64).unwrap();
        unsafe { payload_byte(small, 0).store::<usize>(7) };
        let root = Root::new(RootKind::Stack(tls), Some(small));

        let large = alloc_object(&mut mutator, 0, 3 * BYTES_IN_MBYTE / 2).unwrap();
        // One collection that did not free enough, then one to grow.
        assert_eq!(memory_manager::collection_count(heap), 2);
        assert_eq!(heap.plan.tospace().size(), 2 * BYTES_IN_MBYTE);
        assert_eq!(heap.plan.fromspace().size(), 2 * BYTES_IN_MBYTE);
        assert_eq!(memory_manager::total_bytes(heap), 4 * BYTES_IN_MBYTE);
        assert!(heap.plan.with_growth(|state| *state == GrowState::Committed));
        assert!(memory_manager::is_in_heap(heap, large.to_raw_address()));
        assert_eq!(unsafe { payload_byte(root.object(), 0).load::<usize>() }, 7);
        // The old spaces went back: 1 MiB each.
        assert_eq!(
            read_mockvm(|mock| mock.bytes_deallocated),
            2 * BYTES_IN_MBYTE
        );

        // The spaces are at their maximum now.
        assert!(!memory_manager::collect_garbage(
            heap,
            tls,
            3 * BYTES_IN_MBYTE
        ));
        assert_eq!(heap.plan.tospace().size(), 2 * BYTES_IN_MBYTE);

        unbind(mutator);
    })
}

#[test]
pub fn failed_growth_changes_nothing() {
    with_mockvm(|| {
        let heap = heap_for_test(GROWABLE_HEAP);
        let mutator = bind(heap, 1);
        let tls = mutator.mutator_tls;
        let from_space = heap.plan.fromspace().start();

        // The first region can be obtained, the second cannot.
        write_mockvm(|mock| mock.region_budget = Some(1));
        assert!(!memory_manager::collect_garbage(
            heap,
            tls,
            3 * BYTES_IN_MBYTE / 2
        ));

        assert_eq!(memory_manager::collection_count(heap), 1);
        assert_eq!(heap.plan.tospace().size(), BYTES_IN_MBYTE);
        assert_eq!(heap.plan.fromspace().size(), BYTES_IN_MBYTE);
        // The collection swapped the spaces, and nothing else moved.
        assert_eq!(heap.plan.tospace().start(), from_space);
        assert!(heap.plan.with_growth(|state| *state == GrowState::Idle));
        // Only the region obtained for the attempt was given back.
        assert_eq!(
            read_mockvm(|mock| mock.bytes_deallocated),
            2 * BYTES_IN_MBYTE
        );

        unbind(mutator);
    })
}

#[test]
pub fn linear_growth_adds_the_initial_size() {
    with_mockvm(|| {
        let heap = heap_for_test(
            "max_heap_size=8388608 initial_heap_size=2097152 use_tlab=false grow_policy=Linear",
        );
        let mutator = bind(heap, 1);
        let tls = mutator.mutator_tls;

        assert!(memory_manager::collect_garbage(
            heap,
            tls,
            3 * BYTES_IN_MBYTE / 2
        ));
        assert_eq!(heap.plan.tospace().size(), 2 * BYTES_IN_MBYTE);
        assert!(memory_manager::collect_garbage(
            heap,
            tls,
            5 * BYTES_IN_MBYTE / 2
        ));
        assert_eq!(heap.plan.tospace().size(), 3 * BYTES_IN_MBYTE);
        assert_eq!(heap.plan.fromspace().size(), 3 * BYTES_IN_MBYTE);

        unbind(mutator);
    })
}

#[test]
pub fn increase_memory_grows_to_the_requested_total() {
    with_mockvm(|| {
        let heap = heap_for_test(GROWABLE_HEAP);
        let mutator = bind(heap, 1);
        let tls = mutator.mutator_tls;

        // Already this large.
        assert!(!memory_manager::increase_memory(heap, tls, BYTES_IN_MBYTE));
        assert_eq!(memory_manager::collection_count(heap), 0);

        assert!(memory_manager::increase_memory(heap, tls, 3 * BYTES_IN_MBYTE));
        assert_eq!(memory_manager::collection_count(heap), 1);
        assert_eq!(memory_manager::total_bytes(heap), 3 * BYTES_IN_MBYTE);

        // Clamped to the maximum heap size.
        assert!(memory_manager::increase_memory(heap, tls, 8 * BYTES_IN_MBYTE));
        assert_eq!(memory_manager::total_bytes(heap), 4 * BYTES_IN_MBYTE);
        assert!(!memory_manager::increase_memory(heap, tls, 16 * BYTES_IN_MBYTE));
        assert_eq!(memory_manager::collection_count(heap), 2);

        unbind(mutator);
    })
}
