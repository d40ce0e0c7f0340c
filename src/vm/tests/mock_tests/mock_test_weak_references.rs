use super::mock_test_prelude::*;

#[test]
pub fn dead_referents_are_cleared_and_enqueued() {
    with_mockvm(|| {
        let heap = heap_for_test(SMALL_HEAP);
        let mut mutator = bind(heap, 1);
        let tls = mutator.mutator_tls;

        let strong = Root::new(
            RootKind::Stack(tls),
            Some(alloc_object(&mut mutator, 0, 32).unwrap()),
        );
        let kept = Root::new(
            RootKind::Stack(tls),
            Some(alloc_weak_reference(&mut mutator, &strong).unwrap()),
        );

        let doomed = Root::new(
            RootKind::Stack(tls),
            Some(alloc_object(&mut mutator, 0, 32).unwrap()),
        );
        let cleared = Root::new(
            RootKind::Stack(tls),
            Some(alloc_weak_reference(&mut mutator, &doomed).unwrap()),
        );
        drop(doomed);

        assert!(memory_manager::collect_garbage(heap, tls, 0));

        assert_eq!(get_field(kept.object(), 0), strong.get());
        assert_eq!(get_field(cleared.object(), 0), None);
        assert_eq!(
            read_mockvm(|mock| mock.enqueued.clone()),
            vec![cleared.object()]
        );
        // The dead referent was not copied.
        assert_eq!(
            memory_manager::used_bytes(heap),
            object_size(0, 32) + 2 * object_size(1, 0)
        );

        unbind(mutator);
    })
}

#[test]
pub fn weak_reference_alone_does_not_keep_an_object_alive() {
    with_mockvm(|| {
        let heap = heap_for_test(SMALL_HEAP);
        let mut mutator = bind(heap, 1);
        let tls = mutator.mutator_tls;

        let target = Root::new(
            RootKind::Vm,
            Some(alloc_object(&mut mutator, 0, 0).unwrap()),
        );
        let weak = Root::new(
            RootKind::Vm,
            Some(alloc_weak_reference(&mut mutator, &target).unwrap()),
        );

        // Strongly reachable for the first collection, only weakly for the second.
        assert!(memory_manager::collect_garbage(heap, tls, 0));
        assert_eq!(get_field(weak.object(), 0), target.get());
        target.set(None);
        assert!(memory_manager::collect_garbage(heap, tls, 0));
        assert_eq!(get_field(weak.object(), 0), None);
        assert_eq!(read_mockvm(|mock| mock.enqueued.len()), 1);

        unbind(mutator);
    })
}
