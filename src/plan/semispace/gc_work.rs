use super::global::SemiSpace;
use crate::util::constants::ZAP_PATTERN;
use crate::util::conversions;
use crate::util::memory;
use crate::util::object_forwarding;
use crate::util::opaque_pointer::VMCollectorThread;
use crate::util::reference_processor::ReferenceProcessor;
use crate::util::sanity::verifier::ReferenceVerifier;
use crate::util::statistics::Phase;
use crate::util::{Address, ObjectReference};
use crate::vm::slot::Slot;
use crate::vm::*;

use probe::probe;
use std::sync::atomic::Ordering;
use std::time::Instant;

impl<VM: VMBinding> SemiSpace<VM> {
    /// One stop-the-world collection. Runs on the collector thread with every mutator stopped.
    pub(crate) fn collect(&self, tls: VMCollectorThread) {
        let options = self.options.clone();
        let epoch = self.state.epoch();
        let cycle_start = Instant::now();
        probe!(ssgc, gc_start, epoch);
        if options.trace_gc {
            info!(
                "Collection {} start: {} used, {} free",
                epoch,
                conversions::bytes_to_formatted_string(self.used_bytes()),
                conversions::bytes_to_formatted_string(self.free_bytes())
            );
        }

        self.stats.with_timer(|timer| {
            timer.begin_cycle();

            timer.time(Phase::Clear, || {
                for mutator in VM::VMActivePlan::mutators() {
                    mutator.reset_tlab();
                }
                if options.verify_references {
                    ReferenceVerifier::new(self, tls).verify_roots("before collection");
                }
                self.swap_spaces();
            });
            self.trace_phase("swapped spaces");

            let mut evacuator = Evacuator::new(self, tls);
            timer.time(Phase::RootScan, || {
                for mutator in VM::VMActivePlan::mutators() {
                    VM::VMScanning::scan_roots_in_mutator_thread(tls, mutator, &mut evacuator);
                }
                VM::VMScanning::scan_vm_specific_roots(tls, &mut evacuator);
            });
            self.trace_phase("scanned roots");

            timer.time(Phase::BootHeapScan, || {
                VM::VMScanning::scan_boot_heap(tls, &mut evacuator);
            });
            self.trace_phase("scanned boot heap");

            timer.time(Phase::CodeScan, || {
                VM::VMScanning::scan_code(tls, &mut evacuator);
            });
            self.trace_phase("scanned code");

            timer.time(Phase::Copy, || evacuator.scan_to_space());
            self.trace_phase("copied live objects");

            timer.time(Phase::WeakRefs, || evacuator.process_references());
            self.trace_phase("processed references");

            if options.verify_references {
                let verifier = ReferenceVerifier::new(self, tls);
                verifier.verify_roots("after collection");
                verifier.verify_to_space();
            }
            if options.zap_from_space {
                let from_space = self.fromspace();
                memory::set_pattern(from_space.start(), ZAP_PATTERN, from_space.size());
            }

            timer.record(Phase::Total, cycle_start.elapsed());
            timer.end_cycle();
            if options.trace_gc_time {
                info!("Collection {} timings: {}", epoch, timer.last_cycle_summary());
            }
        });

        self.state.bump_epoch();
        self.stats.gc_finished();
        probe!(ssgc, gc_end, epoch, self.used_bytes());
        if options.trace_gc {
            info!(
                "Collection {} end: {} live, {} free",
                epoch,
                conversions::bytes_to_formatted_string(self.used_bytes()),
                conversions::bytes_to_formatted_string(self.free_bytes())
            );
        }
    }

    /// The vacant from-space becomes to-space. Its mark goes back to its start.
    fn swap_spaces(&self) {
        let hi = !self.hi.load(Ordering::SeqCst);
        self.hi.store(hi, Ordering::SeqCst);
        self.tospace().reset_mark();
    }

    fn trace_phase(&self, what: &str) {
        if self.options.trace_gc_phases {
            debug!("{}: {}", what, self.tospace());
        }
    }
}

/// Copies objects out of from-space. Every slot it visits that refers to from-space is
/// rewritten to the copy, which is made on the first visit and looked up through the forwarding
/// pointer afterwards.
///
/// Copied objects are scanned in allocation order by [`Evacuator::scan_to_space`], so the copy
/// needs no recursion and no work list beyond to-space itself.
pub struct Evacuator<'a, VM: VMBinding> {
    plan: &'a SemiSpace<VM>,
    tls: VMCollectorThread,
    references: ReferenceProcessor,
}

impl<'a, VM: VMBinding> Evacuator<'a, VM> {
    pub fn new(plan: &'a SemiSpace<VM>, tls: VMCollectorThread) -> Self {
        Evacuator {
            plan,
            tls,
            references: ReferenceProcessor::new(),
        }
    }

    /// Return the to-space address of `object`, copying it if this is its first visit. Objects
    /// outside from-space are returned unchanged.
    pub fn relocate(&mut self, object: ObjectReference) -> ObjectReference {
        if !self.plan.fromspace().contains_object::<VM>(object) {
            return object;
        }
        if let Some(new_object) = object_forwarding::read_forwarding_pointer::<VM>(object) {
            return new_object;
        }

        let size = conversions::cell_size(VM::VMObjectModel::get_current_size(object));
        let cell = self.gc_allocate(size);
        unsafe {
            std::ptr::copy_nonoverlapping(
                object.to_object_start::<VM>().to_ptr::<u8>(),
                cell.to_mut_ptr::<u8>(),
                size,
            );
        }
        let new_object = ObjectReference::from_object_start::<VM>(cell);
        object_forwarding::write_forwarding_pointer::<VM>(object, new_object);
        trace!("Copied {} -> {} ({} bytes)", object, new_object, size);
        new_object
    }

    /// Bump-allocate a cell for a copy. Only the collector allocates during a collection, so
    /// the mark is advanced without synchronization.
    fn gc_allocate(&self, size: usize) -> Address {
        let to_space = self.plan.tospace();
        let cell = to_space.mark();
        let end = cell + size;
        if end > self.plan.top() {
            crate::util::fatal::fatal_error::<VM>(&format!(
                "GC allocation overflow: {} bytes at {} in {}",
                size, cell, to_space
            ));
        }
        to_space.set_mark(end);
        cell
    }

    /// Scan copied objects from the start of to-space until the scan catches up with the mark.
    /// Scanning may copy more objects, which moves the mark further.
    pub fn scan_to_space(&mut self) {
        let to_space = self.plan.tospace();
        let mut cursor = to_space.start();
        while cursor < to_space.mark() {
            let object = ObjectReference::from_object_start::<VM>(cursor);
            let size = conversions::cell_size(VM::VMObjectModel::get_current_size(object));
            if VM::VMReferenceGlue::is_reference(object) {
                self.references.discover(object);
            }
            VM::VMScanning::scan_object(self.tls, object, self);
            cursor += size;
        }
        debug_assert_eq!(cursor, to_space.mark());
    }

    /// Update or clear the referents of the reference objects found during the scan.
    pub fn process_references(&mut self) {
        let plan = self.plan;
        self.references
            .process::<VM>(self.tls, |referent| {
                if !plan.fromspace().contains_object::<VM>(referent) {
                    Some(referent)
                } else {
                    object_forwarding::read_forwarding_pointer::<VM>(referent)
                }
            });
    }
}

impl<'a, VM: VMBinding> SlotVisitor<VM::VMSlot> for Evacuator<'a, VM> {
    fn visit_slot(&mut self, slot: VM::VMSlot) {
        if let Some(object) = slot.load() {
            let new_object = self.relocate(object);
            if new_object != object {
                slot.store(new_object);
            }
        }
    }
}
