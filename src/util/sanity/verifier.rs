use crate::plan::semispace::SemiSpace;
use crate::util::conversions;
use crate::util::opaque_pointer::VMCollectorThread;
use crate::util::ObjectReference;
use crate::vm::slot::Slot;
use crate::vm::*;

/// Checks that every reference the collector can see points to a valid object: outside the heap,
/// or into to-space below the allocation mark. Any other reference is fatal.
pub struct ReferenceVerifier<'a, VM: VMBinding> {
    plan: &'a SemiSpace<VM>,
    tls: VMCollectorThread,
}

impl<'a, VM: VMBinding> ReferenceVerifier<'a, VM> {
    pub fn new(plan: &'a SemiSpace<VM>, tls: VMCollectorThread) -> Self {
        ReferenceVerifier { plan, tls }
    }

    fn check_slot(&self, slot: VM::VMSlot, context: &str) {
        let Some(object) = slot.load() else {
            return;
        };
        let addr = object.to_object_start::<VM>();
        let to_space = self.plan.tospace();
        let from_space = self.plan.fromspace();
        let valid = if to_space.contains(addr) {
            addr < to_space.mark()
        } else {
            !from_space.contains(addr)
        };
        if !valid {
            crate::util::fatal::fatal_error::<VM>(&format!(
                "Invalid reference {} in slot {:?} ({}): to-space {}, from-space {}",
                object,
                slot.address(),
                context,
                to_space,
                from_space
            ));
        }
    }

    /// Check every root slot.
    pub fn verify_roots(&self, when: &str) {
        let mut visitor = |slot: VM::VMSlot| self.check_slot(slot, when);
        for mutator in VM::VMActivePlan::mutators() {
            VM::VMScanning::scan_roots_in_mutator_thread(self.tls, mutator, &mut visitor);
        }
        VM::VMScanning::scan_vm_specific_roots(self.tls, &mut visitor);
        VM::VMScanning::scan_boot_heap(self.tls, &mut visitor);
        VM::VMScanning::scan_code(self.tls, &mut visitor);
    }

    /// Walk to-space object by object and check every field.
    pub fn verify_to_space(&self) {
        let to_space = self.plan.tospace();
        let mark = to_space.mark();
        let mut cursor = to_space.start();
        while cursor < mark {
            let object = ObjectReference::from_object_start::<VM>(cursor);
            let size = conversions::cell_size(VM::VMObjectModel::get_current_size(object));
            if cursor + size > mark {
                VM::VMObjectModel::dump_object(object);
                crate::util::fatal::fatal_error::<VM>(&format!(
                    "Object {} of {} bytes extends past the mark {}",
                    object, size, mark
                ));
            }
            let mut visitor = |slot: VM::VMSlot| self.check_slot(slot, "to-space field");
            VM::VMScanning::scan_object(self.tls, object, &mut visitor);
            cursor += size;
        }
    }
}
