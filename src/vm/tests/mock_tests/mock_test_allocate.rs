use super::mock_test_prelude::*;

#[test]
pub fn cells_are_word_rounded_and_contiguous() {
    with_mockvm(|| {
        let heap = heap_for_test(SMALL_HEAP);
        let mut mutator = bind(heap, 1);

        let a = memory_manager::alloc(&mut mutator, 13).unwrap();
        let b = memory_manager::alloc(&mut mutator, 1).unwrap();
        let c = memory_manager::alloc(&mut mutator, 0).unwrap();
        assert_eq!(a, heap.plan.tospace().start());
        assert_eq!(b, a + 2 * BYTES_IN_WORD);
        assert_eq!(c, b + BYTES_IN_WORD);
        assert_eq!(memory_manager::used_bytes(heap), 4 * BYTES_IN_WORD);

        unbind(mutator);
    })
}

fn assert_zeroed(object: ObjectReference) {
    assert_eq!(get_field(object, 0), None);
    assert_eq!(get_field(object, 1), None);
    for offset in (0..64).step_by(BYTES_IN_WORD) {
        assert_eq!(unsafe { payload_byte(object, offset).load::<usize>() }, 0);
    }
}

#[test]
pub fn cells_are_zeroed_in_a_zapped_space() {
    with_mockvm(|| {
        let heap = heap_for_test(&format!("{} zap_from_space=true", SMALL_HEAP));
        let mut mutator = bind(heap, 1);

        // To-space is zapped at startup.
        let object = alloc_object(&mut mutator, 2, 64).unwrap();
        assert_zeroed(object);

        // After two collections to-space is the space zapped at the end of the first.
        assert!(memory_manager::collect_garbage(heap, mutator.mutator_tls, 0));
        assert!(memory_manager::collect_garbage(heap, mutator.mutator_tls, 0));
        let object = alloc_object(&mut mutator, 2, 64).unwrap();
        assert_zeroed(object);

        unbind(mutator);
    })
}

#[test]
pub fn small_objects_come_from_the_tlab() {
    with_mockvm(|| {
        let heap = heap_for_test(
            "max_heap_size=1048576 initial_heap_size=1048576 use_tlab=true tlab_size=4096",
        );
        let mut mutator = bind(heap, 1);
        assert_eq!(mutator.tlab_range(), None);

        let first = memory_manager::alloc(&mut mutator, 64).unwrap();
        assert_eq!(mutator.tlab_range(), Some((first + 64usize, first + 4096usize)));
        assert_eq!(memory_manager::used_bytes(heap), 4096);

        let second = memory_manager::alloc(&mut mutator, 64).unwrap();
        assert_eq!(second, first + 64usize);
        assert_eq!(memory_manager::used_bytes(heap), 4096);

        // Large objects bypass the TLAB.
        let large = memory_manager::alloc(&mut mutator, 4096).unwrap();
        assert_eq!(large, first + 4096usize);
        assert_eq!(memory_manager::used_bytes(heap), 8192);
        assert_eq!(mutator.tlab_range(), Some((first + 128usize, first + 4096usize)));

        unbind(mutator);
    })
}

#[test]
pub fn safety_zone_covers_a_tlab() {
    with_mockvm(|| {
        let heap = heap_for_test(
            "max_heap_size=1048576 initial_heap_size=1048576 use_tlab=true tlab_size=16384 safety_zone_size=6144",
        );
        assert_eq!(heap.plan.safety_zone.size(), 16384);
        assert_eq!(memory_manager::free_bytes(heap), 512 * BYTES_IN_KBYTE - 16384);
    })
}

#[test]
pub fn array_and_hybrid_sizes() {
    with_mockvm(|| {
        let heap = heap_for_test(SMALL_HEAP);
        let mut mutator = bind(heap, 1);

        let array = memory_manager::alloc_array(&mut mutator, 10, 4).unwrap();
        let hybrid = memory_manager::alloc_hybrid(&mut mutator, 24, 3, 2).unwrap();
        let after = memory_manager::alloc_object(&mut mutator, 8).unwrap();
        assert_eq!(
            hybrid.to_raw_address() - array.to_raw_address(),
            crate::util::conversions::cell_size(2 * BYTES_IN_WORD + 40)
        );
        assert_eq!(
            after.to_raw_address() - hybrid.to_raw_address(),
            crate::util::conversions::cell_size(30)
        );

        unbind(mutator);
    })
}

#[test]
pub fn impossible_requests_fail() {
    with_mockvm(|| {
        let heap = heap_for_test(SMALL_HEAP);
        let mut mutator = bind(heap, 1);

        assert_eq!(
            memory_manager::alloc(&mut mutator, usize::MAX),
            Err(AllocationError::HeapOutOfMemory)
        );
        assert_eq!(
            read_mockvm(|mock| mock.out_of_memory.clone()),
            vec![AllocationError::HeapOutOfMemory]
        );
        assert!(heap.plan.safety_zone.is_in_zone());

        unbind(mutator);
    })
}

#[test]
pub fn oversized_requests_bypass_a_live_tlab() {
    with_mockvm(|| {
        let heap = heap_for_test(
            "max_heap_size=1048576 initial_heap_size=1048576 use_tlab=true tlab_size=8192 grow_policy=None",
        );
        let mut mutator = bind(heap, 1);

        alloc_object(&mut mutator, 0, 16).unwrap();
        assert!(mutator.tlab_range().is_some());

        assert_eq!(
            memory_manager::alloc_array(&mut mutator, usize::MAX, 8),
            Err(AllocationError::HeapOutOfMemory)
        );
        assert_eq!(
            read_mockvm(|mock| mock.out_of_memory.clone()),
            vec![AllocationError::HeapOutOfMemory]
        );
        assert!(heap.plan.safety_zone.is_in_zone());
        // The failed request collected, which dropped the TLAB.
        assert_eq!(mutator.tlab_range(), None);
        assert_eq!(memory_manager::collection_count(heap), 1);

        unbind(mutator);
    })
}

#[test]
pub fn allocation_while_disabled_is_fatal() {
    with_mockvm(|| {
        let heap = heap_for_test(SMALL_HEAP);
        let mut mutator = bind(heap, 1);

        memory_manager::disable_allocation(&mut mutator);
        memory_manager::disable_allocation(&mut mutator);
        memory_manager::enable_allocation(&mut mutator);
        let message = catch_fatal(|| {
            let _ = memory_manager::alloc(&mut mutator, 8);
        });
        assert!(message.unwrap().contains("while allocation is disabled"));

        memory_manager::enable_allocation(&mut mutator);
        assert!(memory_manager::alloc(&mut mutator, 8).is_ok());

        unbind(mutator);
    })
}

#[test]
pub fn clone_copies_fields_and_payload() {
    with_mockvm(|| {
        let heap = heap_for_test(SMALL_HEAP);
        let mut mutator = bind(heap, 1);
        let tls = mutator.mutator_tls;

        let target = alloc_object(&mut mutator, 0, 0).unwrap();
        let original = alloc_object(&mut mutator, 1, 16).unwrap();
        set_field(original, 0, Some(target));
        unsafe { payload_byte(original, 0).store::<u64>(0x0123_4567_89ab_cdef) };
        let root = Root::new(RootKind::Stack(tls), Some(original));

        let copy = memory_manager::clone_object(&mut mutator, root.slot())
            .unwrap()
            .unwrap();
        assert_ne!(copy, root.object());
        assert_eq!(get_field(copy, 0), Some(target));
        assert_eq!(
            unsafe { payload_byte(copy, 0).load::<u64>() },
            0x0123_4567_89ab_cdef
        );

        let empty = Root::new(RootKind::Stack(tls), None);
        assert_eq!(
            memory_manager::clone_object(&mut mutator, empty.slot()).unwrap(),
            None
        );

        unbind(mutator);
    })
}

#[test]
pub fn objects_cannot_be_pinned() {
    with_mockvm(|| {
        let heap = heap_for_test(SMALL_HEAP);
        let mut mutator = bind(heap, 1);

        let object = alloc_object(&mut mutator, 0, 0).unwrap();
        assert!(!memory_manager::pin_object(object));
        assert!(!memory_manager::is_pinned(object));
        assert!(!memory_manager::unpin_object(object));
        assert!(memory_manager::is_in_heap(heap, object.to_raw_address()));
        let local = 0usize;
        assert!(!memory_manager::is_in_heap(heap, Address::from_ref(&local)));

        unbind(mutator);
    })
}
