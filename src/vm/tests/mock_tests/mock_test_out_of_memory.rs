use super::mock_test_prelude::*;

const LIVE_PAYLOAD: usize = 480 * BYTES_IN_KBYTE;
const SPACE: usize = 512 * BYTES_IN_KBYTE;
const ZONE: usize = 6144;

#[test]
pub fn exhausted_heap_lends_out_the_safety_zone() {
    with_mockvm(|| {
        let heap = heap_for_test(SMALL_HEAP);
        let mut mutator = bind(heap, 1);
        let tls = mutator.mutator_tls;

        let live = alloc_object(&mut mutator, 0, LIVE_PAYLOAD).unwrap();
        unsafe { payload_byte(live, LIVE_PAYLOAD - 8).store::<usize>(0x5a5a) };
        let root = Root::new(RootKind::Stack(tls), Some(live));
        let free = SPACE - ZONE - object_size(0, LIVE_PAYLOAD);
        assert_eq!(memory_manager::free_bytes(heap), free);

        assert_eq!(
            alloc_object(&mut mutator, 0, 64 * BYTES_IN_KBYTE),
            Err(AllocationError::HeapOutOfMemory)
        );
        assert_eq!(memory_manager::collection_count(heap), 1);
        assert!(heap.plan.safety_zone.is_in_zone());
        assert_eq!(heap.plan.top(), heap.plan.tospace().end());
        assert_eq!(memory_manager::free_bytes(heap), free + ZONE);
        assert_eq!(
            read_mockvm(|mock| mock.out_of_memory.clone()),
            vec![AllocationError::HeapOutOfMemory]
        );

        // The binding can now allocate its error object, and nothing live was lost.
        assert!(alloc_object(&mut mutator, 2, 64).is_ok());
        assert_eq!(
            unsafe { payload_byte(root.object(), LIVE_PAYLOAD - 8).load::<usize>() },
            0x5a5a
        );

        unbind(mutator);
    })
}

#[test]
pub fn running_out_again_is_fatal() {
    with_mockvm(|| {
        let heap = heap_for_test(SMALL_HEAP);
        let mut mutator = bind(heap, 1);
        let tls = mutator.mutator_tls;

        let live = alloc_object(&mut mutator, 0, LIVE_PAYLOAD).unwrap();
        let _root = Root::new(RootKind::Stack(tls), Some(live));
        assert!(alloc_object(&mut mutator, 0, 64 * BYTES_IN_KBYTE).is_err());

        let message = catch_fatal(|| {
            let _ = alloc_object(&mut mutator, 0, 64 * BYTES_IN_KBYTE);
        });
        assert!(message
            .unwrap()
            .contains("Out of memory again after throwing OutOfMemoryError"));
        // Reported once only.
        assert_eq!(read_mockvm(|mock| mock.out_of_memory.len()), 1);
    })
}

#[test]
pub fn safety_zone_is_restored_once_memory_is_free() {
    with_mockvm(|| {
        let heap = heap_for_test(SMALL_HEAP);
        let mut mutator = bind(heap, 1);
        let tls = mutator.mutator_tls;

        // Fills to-space up to the safety zone.
        let live = alloc_object(&mut mutator, 0, SPACE - ZONE - BYTES_IN_WORD).unwrap();
        let root = Root::new(RootKind::Stack(tls), Some(live));
        assert_eq!(memory_manager::free_bytes(heap), 0);
        assert!(alloc_object(&mut mutator, 0, 0).is_err());
        assert!(heap.plan.safety_zone.is_in_zone());

        // No more than the zone itself is free, so it cannot be taken back.
        assert!(memory_manager::collect_garbage(heap, tls, 0));
        assert!(heap.plan.safety_zone.is_in_zone());

        root.set(None);
        assert!(memory_manager::collect_garbage(heap, tls, 0));
        assert!(!heap.plan.safety_zone.is_in_zone());
        assert_eq!(memory_manager::free_bytes(heap), SPACE - ZONE);

        // A later exhaustion is an ordinary out-of-memory again.
        let big = alloc_object(&mut mutator, 0, LIVE_PAYLOAD).unwrap();
        root.set(Some(big));
        assert!(alloc_object(&mut mutator, 0, 64 * BYTES_IN_KBYTE).is_err());
        assert_eq!(read_mockvm(|mock| mock.out_of_memory.len()), 2);

        unbind(mutator);
    })
}
