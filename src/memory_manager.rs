//! Runtime-to-collector interface: safe Rust APIs.
//!
//! A binding builds a heap with [`ssgc_init`], keeps it in a static, starts the collector thread
//! with [`initialize_collection`] once its thread system is ready, and then binds one
//! [`Mutator`] per thread. Allocation goes through the mutator; heap-wide requests go through
//! the heap.
//!
//! Functions that may collect take the calling thread as a [`VMMutatorThread`]. Any
//! [`ObjectReference`] the caller holds across such a call must be reachable through a slot the
//! binding reports as a root, and must be re-read from that slot afterwards.

use crate::heap::{Heap, HeapBuilder};
use crate::plan::Mutator;
use crate::scheduler::GCController;
use crate::util::alloc::AllocationError;
use crate::util::opaque_pointer::*;
use crate::util::{Address, ObjectReference};
use crate::vm::slot::Slot;
use crate::vm::{Collection, ObjectModel, VMBinding};

use std::sync::atomic::Ordering;

/// Initialize a heap. This reserves both spaces at their initial size, which is fatal if the
/// memory is not available.
///
/// This also attempts to initialize a logger. A binding that wants its own logger should
/// install it before calling this function.
///
/// The returned heap must outlive every mutator and the collector thread. Most bindings leak
/// it with `Box::leak` or keep it in a lazily initialized static.
pub fn ssgc_init<VM: VMBinding>(builder: &HeapBuilder) -> Box<Heap<VM>> {
    match crate::util::logger::try_init() {
        Ok(_) => debug!("ssgc initialized the logger."),
        Err(_) => debug!(
            "ssgc failed to initialize the logger. Possibly a logger has been initialized by user."
        ),
    }
    if builder.options.initial_heap_size > builder.options.max_heap_size {
        warn!(
            "Initial heap size {} exceeds the maximum heap size {}, using the maximum",
            builder.options.initial_heap_size, builder.options.max_heap_size
        );
    }
    let heap = builder.build::<VM>();
    info!(
        "Initialized ssgc with {:?} growth, {} TLABs",
        heap.plan.grow_policy(),
        if heap.options.use_tlab { "with" } else { "without" }
    );
    Box::new(heap)
}

/// Start the collector thread. Collections cannot happen before this call; requesting one
/// panics.
///
/// Arguments:
/// * `heap`: A reference to the heap.
/// * `tls`: The thread that wants to enable the collection. This value will be passed back to
///   the binding in [`Collection::spawn_gc_thread`].
pub fn initialize_collection<VM: VMBinding>(heap: &'static Heap<VM>, tls: VMThread) {
    assert!(
        !heap.state.is_initialized(),
        "Collection has been initialized (was initialize_collection() already called before?)"
    );
    let receiver = heap.gc_requester.connect();
    VM::VMCollection::spawn_gc_thread(tls, GCController::new(heap, receiver));
    heap.state.initialized.store(true, Ordering::SeqCst);
}

/// Create the allocation context for a thread. The binding should keep the returned mutator
/// where the thread can reach it cheaply, and report it through
/// [`crate::vm::ActivePlan::mutators`].
pub fn bind_mutator<VM: VMBinding>(
    heap: &'static Heap<VM>,
    tls: VMMutatorThread,
) -> Box<Mutator<VM>> {
    debug!("Binding mutator {:?}", tls);
    Box::new(Mutator::new(tls, &heap.plan))
}

/// Reclaim a mutator that is no longer needed. The rest of its TLAB stays allocated until the
/// next collection.
pub fn destroy_mutator<VM: VMBinding>(mutator: Box<Mutator<VM>>) {
    debug!("Destroying mutator {:?}", mutator.mutator_tls);
    drop(mutator);
}

/// Allocate a zeroed cell of at least `size` bytes. The size is rounded up to whole words.
///
/// On failure the binding has already been told through [`Collection::out_of_memory`], and the
/// safety zone has been lent out so the binding can allocate its error object.
#[inline(always)]
pub fn alloc<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    size: usize,
) -> Result<Address, AllocationError> {
    mutator.alloc(size)
}

/// Allocate a tuple (fixed-size object) of `size` bytes.
pub fn alloc_object<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    size: usize,
) -> Result<ObjectReference, AllocationError> {
    let cell = mutator.alloc(size)?;
    Ok(VM::VMObjectModel::address_to_ref(cell))
}

/// Allocate an array of `length` elements of `element_size` bytes after the array header.
/// Sizes that overflow the address space fail like any other request the heap cannot meet.
pub fn alloc_array<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    length: usize,
    element_size: usize,
) -> Result<ObjectReference, AllocationError> {
    let size = length
        .saturating_mul(element_size)
        .saturating_add(VM::VMObjectModel::ARRAY_HEADER_BYTES);
    let cell = mutator.alloc(size)?;
    Ok(VM::VMObjectModel::address_to_ref(cell))
}

/// Allocate a hybrid: a tuple of `tuple_size` bytes followed by an array part of `length`
/// elements of `element_size` bytes.
pub fn alloc_hybrid<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    tuple_size: usize,
    length: usize,
    element_size: usize,
) -> Result<ObjectReference, AllocationError> {
    let size = length
        .saturating_mul(element_size)
        .saturating_add(tuple_size);
    let cell = mutator.alloc(size)?;
    Ok(VM::VMObjectModel::address_to_ref(cell))
}

/// Allocate a byte copy of the object held in `source`. The allocation may collect, so the
/// source is read from the slot afterwards; `source` must therefore be a root.
///
/// Returns `Ok(None)` if the slot is null.
pub fn clone_object<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    source: VM::VMSlot,
) -> Result<Option<ObjectReference>, AllocationError> {
    let Some(object) = source.load() else {
        return Ok(None);
    };
    let size = VM::VMObjectModel::get_current_size(object);
    let cell = mutator.alloc(size)?;
    let Some(object) = source.load() else {
        return Ok(None);
    };
    debug_assert_eq!(VM::VMObjectModel::get_current_size(object), size);
    unsafe {
        std::ptr::copy_nonoverlapping(
            VM::VMObjectModel::ref_to_object_start(object).to_ptr::<u8>(),
            cell.to_mut_ptr::<u8>(),
            size,
        );
    }
    Ok(Some(VM::VMObjectModel::address_to_ref(cell)))
}

/// Make at least `requested` bytes available, collecting and growing the heap if necessary.
/// `requested == 0` always collects. Returns false if the heap cannot satisfy the request.
///
/// Arguments:
/// * `heap`: A reference to the heap.
/// * `tls`: The thread that requests the collection.
/// * `requested`: The number of bytes the caller is about to allocate.
pub fn collect_garbage<VM: VMBinding>(
    heap: &Heap<VM>,
    tls: VMMutatorThread,
    requested: usize,
) -> bool {
    heap.plan.collect_garbage(tls, requested)
}

/// Bytes that can be allocated before the next collection.
pub fn free_bytes<VM: VMBinding>(heap: &Heap<VM>) -> usize {
    heap.plan.free_bytes()
}

/// Bytes allocated in to-space since the last collection, including the survivors of it.
pub fn used_bytes<VM: VMBinding>(heap: &Heap<VM>) -> usize {
    heap.plan.used_bytes()
}

/// Bytes reserved by both spaces together.
pub fn total_bytes<VM: VMBinding>(heap: &Heap<VM>) -> usize {
    heap.plan.total_bytes()
}

/// Is the address inside to-space? Between collections every object lives there.
pub fn is_in_heap<VM: VMBinding>(heap: &Heap<VM>, addr: Address) -> bool {
    heap.plan.is_in_heap(addr)
}

/// Grow the heap so that it totals at least `amount` bytes. This costs one collection.
/// Returns false if the heap is already that large or cannot grow.
pub fn increase_memory<VM: VMBinding>(
    heap: &Heap<VM>,
    tls: VMMutatorThread,
    amount: usize,
) -> bool {
    heap.plan.increase_memory(tls, amount)
}

/// Collect, then give `amount` bytes of the heap back to the operating system. Returns false
/// if that much was not free after the collection.
pub fn decrease_memory<VM: VMBinding>(
    heap: &Heap<VM>,
    tls: VMMutatorThread,
    amount: usize,
) -> bool {
    heap.plan.decrease_memory(tls, amount)
}

/// Objects always move, so pinning is not supported. Returns false.
pub fn pin_object(_object: ObjectReference) -> bool {
    false
}

/// Objects always move, so pinning is not supported. Returns false.
pub fn unpin_object(_object: ObjectReference) -> bool {
    false
}

pub fn is_pinned(_object: ObjectReference) -> bool {
    false
}

/// Forbid allocation by this mutator until the matching [`enable_allocation`]. Calls nest.
/// Allocating in between is fatal.
pub fn disable_allocation<VM: VMBinding>(mutator: &mut Mutator<VM>) {
    mutator.disable_allocation()
}

pub fn enable_allocation<VM: VMBinding>(mutator: &mut Mutator<VM>) {
    mutator.enable_allocation()
}

/// The number of collections completed so far.
pub fn collection_count<VM: VMBinding>(heap: &Heap<VM>) -> usize {
    heap.state.epoch()
}

/// The total time spent collecting, in milliseconds.
pub fn gc_time_millis<VM: VMBinding>(heap: &Heap<VM>) -> u64 {
    heap.stats.accumulated_gc_time().as_millis() as u64
}

/// Milliseconds since the last collection finished, or since the heap was created.
pub fn millis_since_last_gc<VM: VMBinding>(heap: &Heap<VM>) -> u64 {
    heap.stats.time_since_last_gc().as_millis() as u64
}
