use super::mock_test_prelude::*;

#[test]
pub fn collection_frees_garbage_and_keeps_live_data() {
    with_mockvm(|| {
        let heap = heap_for_test(SMALL_HEAP);
        let mut mutator = bind(heap, 1);
        let tls = mutator.mutator_tls;

        let live = alloc_object(&mut mutator, 0, BYTES_IN_KBYTE).unwrap();
        unsafe { payload_byte(live, 100).store::<u8>(42) };
        let root = Root::new(RootKind::Stack(tls), Some(live));

        alloc_object(&mut mutator, 0, 400 * BYTES_IN_KBYTE).unwrap();
        assert_eq!(memory_manager::collection_count(heap), 0);

        // Does not fit next to the 400 KiB object.
        let young = alloc_object(&mut mutator, 0, 200 * BYTES_IN_KBYTE).unwrap();
        assert_eq!(memory_manager::collection_count(heap), 1);

        let used = object_size(0, BYTES_IN_KBYTE) + object_size(0, 200 * BYTES_IN_KBYTE);
        assert_eq!(memory_manager::used_bytes(heap), used);
        assert_eq!(
            memory_manager::free_bytes(heap),
            512 * BYTES_IN_KBYTE - 6144 - used
        );

        let moved = root.object();
        assert_ne!(moved, live);
        assert!(memory_manager::is_in_heap(heap, moved.to_raw_address()));
        assert_eq!(unsafe { payload_byte(moved, 100).load::<u8>() }, 42);
        assert_eq!(
            young.to_raw_address(),
            moved.to_raw_address() + object_size(0, BYTES_IN_KBYTE)
        );

        unbind(mutator);
    })
}

#[test]
pub fn user_collection_swaps_spaces() {
    with_mockvm(|| {
        let heap = heap_for_test(SMALL_HEAP);
        let mutator = bind(heap, 1);

        let to_space = heap.plan.tospace().start();
        let from_space = heap.plan.fromspace().start();
        assert!(memory_manager::collect_garbage(heap, mutator.mutator_tls, 0));
        assert_eq!(heap.plan.tospace().start(), from_space);
        assert_eq!(heap.plan.fromspace().start(), to_space);
        assert_eq!(heap.plan.tospace().mark(), from_space);
        assert_eq!(memory_manager::collection_count(heap), 1);
        assert_eq!(read_mockvm(|mock| (mock.stops, mock.resumes)), (1, 1));
        assert!(heap.gc_timings_summary().starts_with("1 cycles, clear="));

        // Enough free space: no collection.
        assert!(memory_manager::collect_garbage(heap, mutator.mutator_tls, 1024));
        assert_eq!(memory_manager::collection_count(heap), 1);

        unbind(mutator);
    })
}

#[test]
pub fn shared_objects_and_cycles_are_copied_once() {
    with_mockvm(|| {
        let heap = heap_for_test(SMALL_HEAP);
        let mut mutator = bind(heap, 1);
        let tls = mutator.mutator_tls;

        // a -> [b, c], c -> [b], b -> [a]
        let a = alloc_object(&mut mutator, 2, 0).unwrap();
        let root = Root::new(RootKind::Stack(tls), Some(a));
        let b = alloc_object(&mut mutator, 1, 8).unwrap();
        let c = alloc_object(&mut mutator, 1, 16).unwrap();
        set_field(a, 0, Some(b));
        set_field(a, 1, Some(c));
        set_field(c, 0, Some(b));
        set_field(b, 0, Some(a));
        for _ in 0..10 {
            alloc_object(&mut mutator, 1, 32).unwrap();
        }

        assert!(memory_manager::collect_garbage(heap, tls, 0));

        let a = root.object();
        let b = get_field(a, 0).unwrap();
        let c = get_field(a, 1).unwrap();
        assert_eq!(get_field(c, 0), Some(b));
        assert_eq!(get_field(b, 0), Some(a));
        assert_eq!(
            memory_manager::used_bytes(heap),
            object_size(2, 0) + object_size(1, 8) + object_size(1, 16)
        );
        let to_space = heap.plan.tospace();
        for object in [a, b, c] {
            assert!(to_space.contains(object.to_raw_address()));
            assert!(object.to_raw_address() < to_space.mark());
        }

        unbind(mutator);
    })
}

#[test]
pub fn every_root_kind_is_updated() {
    with_mockvm(|| {
        let heap = heap_for_test(SMALL_HEAP);
        let mut mutator = bind(heap, 1);
        let tls = mutator.mutator_tls;

        let mut roots = vec![];
        for (i, kind) in [
            RootKind::Stack(tls),
            RootKind::Vm,
            RootKind::BootHeap,
            RootKind::Code,
        ]
        .into_iter()
        .enumerate()
        {
            let object = alloc_object(&mut mutator, 0, 8).unwrap();
            unsafe { payload_byte(object, 0).store::<usize>(i + 1) };
            roots.push((Root::new(kind, Some(object)), object));
        }
        // Roots outside the heap are left alone.
        let outside = unsafe { ObjectReference::from_raw_address_unchecked(Address::from_usize(0x1000)) };
        let foreign = Root::new(RootKind::Vm, Some(outside));
        let null = Root::new(RootKind::Code, None);

        assert!(memory_manager::collect_garbage(heap, tls, 0));

        let to_space = heap.plan.tospace();
        for (i, (root, old)) in roots.iter().enumerate() {
            let object = root.object();
            assert_ne!(object, *old);
            assert!(to_space.contains(object.to_raw_address()));
            assert_eq!(unsafe { payload_byte(object, 0).load::<usize>() }, i + 1);
        }
        assert_eq!(foreign.get(), Some(outside));
        assert_eq!(null.get(), None);
        assert_eq!(memory_manager::used_bytes(heap), 4 * object_size(0, 8));

        unbind(mutator);
    })
}

#[test]
pub fn tlabs_are_reset_by_a_collection() {
    with_mockvm(|| {
        let heap = heap_for_test(
            "max_heap_size=1048576 initial_heap_size=1048576 use_tlab=true tlab_size=4096",
        );
        let mut mutator = bind(heap, 1);
        let other = bind(heap, 2);

        memory_manager::alloc(&mut mutator, 64).unwrap();
        assert!(mutator.tlab_range().is_some());
        assert!(memory_manager::collect_garbage(heap, other.mutator_tls, 0));
        assert_eq!(mutator.tlab_range(), None);
        assert_eq!(memory_manager::used_bytes(heap), 0);

        unbind(other);
        unbind(mutator);
    })
}

#[test]
pub fn collect_before_every_allocation() {
    with_mockvm(|| {
        let heap = heap_for_test(&format!("{} gc_before_allocation=true", SMALL_HEAP));
        let mut mutator = bind(heap, 1);
        let root = Root::new(RootKind::Stack(mutator.mutator_tls), None);

        for i in 0..3 {
            let object = alloc_object(&mut mutator, 1, 0).unwrap();
            set_field(object, 0, root.get());
            root.set(Some(object));
            assert_eq!(memory_manager::collection_count(heap), i + 1);
        }
        assert_eq!(memory_manager::used_bytes(heap), 3 * object_size(1, 0));

        unbind(mutator);
    })
}

#[test]
pub fn collection_requires_initialization() {
    with_mockvm(|| {
        let builder = crate::HeapBuilder::new_no_env_vars();
        let heap = Box::leak(memory_manager::ssgc_init::<MockVM>(&builder));
        let message = catch_fatal(|| {
            memory_manager::collect_garbage(heap, mutator_thread(1), 0);
        });
        assert!(message.unwrap().contains("collection is not initialized"));
    })
}

#[test]
pub fn dangling_root_fails_verification() {
    with_mockvm(|| {
        let heap = heap_for_test(&format!("{} verify_references=true", SMALL_HEAP));
        let mutator = bind(heap, 1);

        // Points into the vacant from-space.
        let stale = unsafe {
            ObjectReference::from_raw_address_unchecked(heap.plan.fromspace().start())
        };
        let _root = Root::new(RootKind::Vm, Some(stale));
        let message = catch_fatal(|| {
            memory_manager::collect_garbage(heap, mutator.mutator_tls, 0);
        });
        assert!(message.is_some());
    })
}

#[test]
pub fn mark_only_moves_forward_between_collections() {
    with_mockvm(|| {
        let heap = heap_for_test(
            "max_heap_size=1048576 initial_heap_size=1048576 use_tlab=true tlab_size=4096 grow_policy=None",
        );
        let mut mutator = bind(heap, 1);
        let tls = mutator.mutator_tls;

        let mut epoch = memory_manager::collection_count(heap);
        let mut start = heap.plan.tospace().start();
        let mut mark = heap.plan.tospace().mark();
        assert_eq!(mark, start);

        for i in 0..1800 {
            let forced = i % 97 == 96;
            match i % 3 {
                // Mostly the fast path, with a TLAB refill now and then.
                0 => {
                    alloc_object(&mut mutator, 0, 16).unwrap();
                }
                // At least a TLAB: always the slow path.
                1 => {
                    memory_manager::alloc(&mut mutator, 5000).unwrap();
                }
                // Usually enough room already, so nothing happens.
                _ => {
                    let requested = if forced { 0 } else { 1024 };
                    assert!(memory_manager::collect_garbage(heap, tls, requested));
                }
            }

            let new_epoch = memory_manager::collection_count(heap);
            let new_start = heap.plan.tospace().start();
            let new_mark = heap.plan.tospace().mark();
            assert!(new_mark >= new_start);
            if new_epoch == epoch {
                assert_eq!(new_start, start);
                assert!(new_mark >= mark, "mark went back from {} to {}", mark, new_mark);
            } else {
                assert_eq!(new_epoch, epoch + 1);
                assert_ne!(new_start, start);
                if i % 3 == 2 {
                    // Nothing is live and nothing was allocated after the swap.
                    assert_eq!(new_mark, new_start);
                }
            }
            epoch = new_epoch;
            start = new_start;
            mark = new_mark;
        }
        assert!(memory_manager::collection_count(heap) >= 6);

        unbind(mutator);
    })
}

#[test]
pub fn waiting_mutators_are_reported_blocked() {
    with_mockvm(|| {
        let heap = heap_for_test(&format!(
            "{} initial_heap_size=524288 grow_policy=Double",
            SMALL_HEAP
        ));
        let mut first = bind(heap, 1);
        let second = bind(heap, 2);

        assert!(memory_manager::collect_garbage(heap, first.mutator_tls, 0));
        assert_eq!(
            read_mockvm(|mock| mock.blocked_at_stop.clone()),
            vec![vec![first.mutator_tls]]
        );

        // An allocation that does not fit collects on behalf of its mutator.
        alloc_object(&mut first, 0, 200 * BYTES_IN_KBYTE).unwrap();
        alloc_object(&mut first, 0, 100 * BYTES_IN_KBYTE).unwrap();
        assert_eq!(memory_manager::collection_count(heap), 2);

        // Growing and shrinking each collect once, for the mutator that asked.
        assert!(memory_manager::increase_memory(
            heap,
            second.mutator_tls,
            BYTES_IN_MBYTE
        ));
        assert!(memory_manager::decrease_memory(
            heap,
            second.mutator_tls,
            512 * BYTES_IN_KBYTE
        ));
        assert_eq!(
            read_mockvm(|mock| mock.blocked_at_stop.clone()),
            vec![
                vec![first.mutator_tls],
                vec![first.mutator_tls],
                vec![second.mutator_tls],
                vec![second.mutator_tls],
            ]
        );
        assert!(read_mockvm(|mock| mock.blocked.is_empty()));

        unbind(first);
        unbind(second);
    })
}
