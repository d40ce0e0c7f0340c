//! The binding interface. A runtime implements [`VMBinding`] and the traits it names so that the
//! collector can find roots, walk objects, park threads and obtain memory.

mod active_plan;
mod collection;
mod memory;
mod object_model;
mod reference_glue;
mod scanning;
pub mod slot;

pub use self::active_plan::ActivePlan;
pub use self::collection::Collection;
pub use self::memory::{DefaultVirtualMemory, VirtualMemory};
pub use self::object_model::ObjectModel;
pub use self::reference_glue::ReferenceGlue;
pub use self::scanning::{Scanning, SlotVisitor};


/// The `VMBinding` trait associates each collaborator trait with the binding's implementation.
pub trait VMBinding
where
    Self: Sized + 'static + Send + Sync + Default,
{
    type VMObjectModel: ObjectModel<Self>;
    type VMScanning: Scanning<Self>;
    type VMCollection: Collection<Self>;
    type VMActivePlan: ActivePlan<Self>;
    type VMReferenceGlue: ReferenceGlue<Self>;
    type VMMemory: VirtualMemory;

    /// The type of reference slots in this binding.
    type VMSlot: slot::Slot;
}
