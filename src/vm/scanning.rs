use crate::plan::Mutator;
use crate::util::opaque_pointer::VMCollectorThread;
use crate::util::ObjectReference;
use crate::vm::slot::Slot;
use crate::vm::VMBinding;

/// Callback trait of scanning functions that report slots.
pub trait SlotVisitor<SL: Slot> {
    /// Call this function for each slot.
    fn visit_slot(&mut self, slot: SL);
}

/// This lets us use closures as SlotVisitor.
impl<SL: Slot, F: FnMut(SL)> SlotVisitor<SL> for F {
    fn visit_slot(&mut self, slot: SL) {
        self(slot)
    }
}

/// Root and object enumeration. Every function is called on the collector thread with all
/// mutators stopped. The collector may rewrite each reported slot.
pub trait Scanning<VM: VMBinding> {
    /// Report every reference slot of `object`. If the type descriptor is itself an object in
    /// the moving heap, its slot is reported first.
    fn scan_object<SV: SlotVisitor<VM::VMSlot>>(
        tls: VMCollectorThread,
        object: ObjectReference,
        slot_visitor: &mut SV,
    );

    /// Report the roots held by one mutator thread: stack slots and saved registers.
    fn scan_roots_in_mutator_thread<SV: SlotVisitor<VM::VMSlot>>(
        tls: VMCollectorThread,
        mutator: &mut Mutator<VM>,
        slot_visitor: &mut SV,
    );

    /// Report roots not held by any thread, such as the boot heap root set or globals.
    fn scan_vm_specific_roots<SV: SlotVisitor<VM::VMSlot>>(
        tls: VMCollectorThread,
        slot_visitor: &mut SV,
    );

    /// Report every slot of the non-moving boot heap that may point into the heap.
    fn scan_boot_heap<SV: SlotVisitor<VM::VMSlot>>(_tls: VMCollectorThread, _slot_visitor: &mut SV) {}

    /// Report every reference literal embedded in compiled code.
    fn scan_code<SV: SlotVisitor<VM::VMSlot>>(_tls: VMCollectorThread, _slot_visitor: &mut SV) {}
}
