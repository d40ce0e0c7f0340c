//! A binding for tests.
//!
//! Objects have a one-word header followed by their reference fields and then raw payload.
//! The header encodes the object size in words, the number of reference fields and whether the
//! object is a weak reference, whose first field is then its referent:
//!
//! ```text
//! | size in words (bits 16..) | reference fields (bits 8..16) | 0..0 | weak (bit 1) | 0 |
//! ```
//!
//! Roots and mutators are kept in global registries that tests fill in. The region allocator
//! can be told to fail, and every call the collector makes to report out-of-memory or to
//! enqueue cleared references is recorded. `fatal_error` panics with the message.

use crate::heap::{Heap, HeapBuilder};
use crate::memory_manager;
use crate::plan::Mutator;
use crate::util::alloc::AllocationError;
use crate::util::constants::BYTES_IN_WORD;
use crate::util::conversions;
use crate::util::opaque_pointer::*;
use crate::util::{Address, ObjectReference};
use crate::vm::slot::{SimpleSlot, Slot};
use crate::vm::*;

use atomic::Atomic;
use lazy_static::lazy_static;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::{Mutex, MutexGuard};

const SIZE_SHIFT: usize = 16;
const REFS_SHIFT: usize = 8;
const REFS_MASK: usize = 0xff;
const WEAK_BIT: usize = 1 << 1;

/// Where a root lives. Stack roots belong to one mutator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Stack(VMMutatorThread),
    Vm,
    BootHeap,
    Code,
}

/// Everything the mock binding knows about the running test.
#[derive(Default)]
pub struct MockState {
    /// Addresses of the bound mutators.
    mutators: Vec<usize>,
    /// Addresses of the registered root words.
    roots: Vec<(RootKind, usize)>,
    /// How many more regions may be allocated. `None` means no limit.
    pub region_budget: Option<usize>,
    pub regions_allocated: usize,
    pub bytes_deallocated: usize,
    pub out_of_memory: Vec<AllocationError>,
    pub enqueued: Vec<ObjectReference>,
    pub stops: usize,
    pub resumes: usize,
    /// Mutators currently blocked inside the heap.
    pub blocked: Vec<VMMutatorThread>,
    /// The blocked mutators seen by each `stop_all_mutators`.
    pub blocked_at_stop: Vec<Vec<VMMutatorThread>>,
}

lazy_static! {
    static ref MOCK_VM_INSTANCE: Mutex<MockState> = Mutex::new(MockState::default());
}

fn lock_mockvm() -> MutexGuard<'static, MockState> {
    // A failing test may poison the lock. Later tests reset the state anyway.
    MOCK_VM_INSTANCE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn read_mockvm<F, R>(func: F) -> R
where
    F: FnOnce(&MockState) -> R,
{
    func(&lock_mockvm())
}

pub fn write_mockvm<F, R>(func: F) -> R
where
    F: FnOnce(&mut MockState) -> R,
{
    func(&mut lock_mockvm())
}

/// Run a test against a fresh mock binding. Tests run one at a time, and the registries are
/// cleared whether or not the test panics.
pub fn with_mockvm<T>(test: T)
where
    T: FnOnce(),
{
    super::serial_test(|| {
        write_mockvm(|mock| *mock = MockState::default());
        super::with_cleanup(AssertUnwindSafe(test), || {
            write_mockvm(|mock| *mock = MockState::default())
        });
    })
}

/// Build a heap from `name=value` options, leak it and start its collector thread.
pub fn heap_for_test(options: &str) -> &'static Heap<MockVM> {
    let mut builder = HeapBuilder::new_no_env_vars();
    assert!(
        builder.set_options_bulk_by_str(options),
        "bad test options {:?}",
        options
    );
    let heap: &'static Heap<MockVM> = Box::leak(memory_manager::ssgc_init(&builder));
    memory_manager::initialize_collection(heap, VMThread::UNINITIALIZED);
    heap
}

/// A distinct mutator thread handle for each `id`.
pub fn mutator_thread(id: usize) -> VMMutatorThread {
    VMMutatorThread(VMThread(OpaquePointer::from_address(unsafe {
        Address::from_usize(id * BYTES_IN_WORD)
    })))
}

/// Bind a mutator and register it, so that collections reset its TLAB and scan its stack roots.
pub fn bind(heap: &'static Heap<MockVM>, id: usize) -> Box<Mutator<MockVM>> {
    let mut mutator = memory_manager::bind_mutator(heap, mutator_thread(id));
    let addr = &mut *mutator as *mut Mutator<MockVM> as usize;
    write_mockvm(|mock| mock.mutators.push(addr));
    mutator
}

pub fn unbind(mutator: Box<Mutator<MockVM>>) {
    let addr = &*mutator as *const Mutator<MockVM> as usize;
    write_mockvm(|mock| mock.mutators.retain(|m| *m != addr));
    memory_manager::destroy_mutator(mutator);
}

/// A registered root. Dropping it unregisters it.
pub struct Root {
    word: Box<Atomic<Address>>,
}

impl Root {
    pub fn new(kind: RootKind, object: Option<ObjectReference>) -> Root {
        let root = Root {
            word: Box::new(Atomic::new(Address::ZERO)),
        };
        root.set(object);
        let addr = root.slot().as_address().as_usize();
        write_mockvm(|mock| mock.roots.push((kind, addr)));
        root
    }

    pub fn slot(&self) -> SimpleSlot {
        SimpleSlot::from_address(Address::from_ref(&*self.word))
    }

    pub fn get(&self) -> Option<ObjectReference> {
        self.slot().load()
    }

    /// The object the root refers to. Panics if the root is null.
    pub fn object(&self) -> ObjectReference {
        self.get().expect("root is null")
    }

    pub fn set(&self, object: Option<ObjectReference>) {
        match object {
            Some(object) => self.slot().store(object),
            None => self.word.store(Address::ZERO, Ordering::Relaxed),
        }
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        let addr = self.slot().as_address().as_usize();
        write_mockvm(|mock| mock.roots.retain(|(_, r)| *r != addr));
    }
}

fn roots_of(pred: impl Fn(&RootKind) -> bool) -> Vec<SimpleSlot> {
    read_mockvm(|mock| {
        mock.roots
            .iter()
            .filter(|(kind, _)| pred(kind))
            .map(|(_, addr)| SimpleSlot::from_address(unsafe { Address::from_usize(*addr) }))
            .collect()
    })
}

fn header(object: ObjectReference) -> usize {
    unsafe { object.to_raw_address().load::<usize>() }
}

/// The cell size of an object with `num_refs` reference fields and `payload` further bytes.
pub fn object_size(num_refs: usize, payload: usize) -> usize {
    conversions::cell_size((1 + num_refs) * BYTES_IN_WORD + payload)
}

/// Write the header of a freshly allocated cell.
pub fn init_object(cell: Address, num_refs: usize, payload: usize, weak: bool) -> ObjectReference {
    assert!(num_refs <= REFS_MASK);
    let words = object_size(num_refs, payload) / BYTES_IN_WORD;
    let mut word = (words << SIZE_SHIFT) | (num_refs << REFS_SHIFT);
    if weak {
        word |= WEAK_BIT;
    }
    unsafe { cell.store::<usize>(word) };
    ObjectReference::from_object_start::<MockVM>(cell)
}

/// Allocate an object with `num_refs` null reference fields and `payload` zero bytes.
pub fn alloc_object(
    mutator: &mut Mutator<MockVM>,
    num_refs: usize,
    payload: usize,
) -> Result<ObjectReference, AllocationError> {
    let cell = memory_manager::alloc(mutator, object_size(num_refs, payload))?;
    Ok(init_object(cell, num_refs, payload, false))
}

/// Allocate a weak reference to `referent`. The referent is passed through a root, since the
/// allocation may collect.
pub fn alloc_weak_reference(
    mutator: &mut Mutator<MockVM>,
    referent: &Root,
) -> Result<ObjectReference, AllocationError> {
    let cell = memory_manager::alloc(mutator, object_size(1, 0))?;
    let reference = init_object(cell, 1, 0, true);
    set_field(reference, 0, referent.get());
    Ok(reference)
}

pub fn num_refs(object: ObjectReference) -> usize {
    (header(object) >> REFS_SHIFT) & REFS_MASK
}

pub fn field(object: ObjectReference, index: usize) -> SimpleSlot {
    assert!(index < num_refs(object));
    SimpleSlot::from_address(object.to_raw_address() + (1 + index) * BYTES_IN_WORD)
}

pub fn get_field(object: ObjectReference, index: usize) -> Option<ObjectReference> {
    field(object, index).load()
}

pub fn set_field(object: ObjectReference, index: usize, value: Option<ObjectReference>) {
    let slot = field(object, index);
    match value {
        Some(value) => slot.store(value),
        None => unsafe { slot.as_address().store(Address::ZERO) },
    }
}

/// A payload byte, counted from the end of the reference fields.
pub fn payload_byte(object: ObjectReference, offset: usize) -> Address {
    object.to_raw_address() + (1 + num_refs(object)) * BYTES_IN_WORD + offset
}

#[derive(Default)]
pub struct MockVM {}

impl VMBinding for MockVM {
    type VMObjectModel = MockVM;
    type VMScanning = MockVM;
    type VMCollection = MockVM;
    type VMActivePlan = MockVM;
    type VMReferenceGlue = MockVM;
    type VMMemory = MockVM;
    type VMSlot = SimpleSlot;
}

impl ObjectModel<MockVM> for MockVM {
    fn get_current_size(object: ObjectReference) -> usize {
        (header(object) >> SIZE_SHIFT) * BYTES_IN_WORD
    }

    fn dump_object(object: ObjectReference) {
        error!(
            "{}: header {:#x}, {} bytes, {} references",
            object,
            header(object),
            Self::get_current_size(object),
            num_refs(object)
        );
    }
}

impl Scanning<MockVM> for MockVM {
    fn scan_object<SV: SlotVisitor<SimpleSlot>>(
        _tls: VMCollectorThread,
        object: ObjectReference,
        slot_visitor: &mut SV,
    ) {
        let first = if MockVM::is_reference(object) { 1 } else { 0 };
        for i in first..num_refs(object) {
            slot_visitor.visit_slot(field(object, i));
        }
    }

    fn scan_roots_in_mutator_thread<SV: SlotVisitor<SimpleSlot>>(
        _tls: VMCollectorThread,
        mutator: &mut Mutator<MockVM>,
        slot_visitor: &mut SV,
    ) {
        let tls = mutator.mutator_tls;
        for slot in roots_of(|kind| *kind == RootKind::Stack(tls)) {
            slot_visitor.visit_slot(slot);
        }
    }

    fn scan_vm_specific_roots<SV: SlotVisitor<SimpleSlot>>(
        _tls: VMCollectorThread,
        slot_visitor: &mut SV,
    ) {
        for slot in roots_of(|kind| *kind == RootKind::Vm) {
            slot_visitor.visit_slot(slot);
        }
    }

    fn scan_boot_heap<SV: SlotVisitor<SimpleSlot>>(
        _tls: VMCollectorThread,
        slot_visitor: &mut SV,
    ) {
        for slot in roots_of(|kind| *kind == RootKind::BootHeap) {
            slot_visitor.visit_slot(slot);
        }
    }

    fn scan_code<SV: SlotVisitor<SimpleSlot>>(_tls: VMCollectorThread, slot_visitor: &mut SV) {
        for slot in roots_of(|kind| *kind == RootKind::Code) {
            slot_visitor.visit_slot(slot);
        }
    }
}

impl Collection<MockVM> for MockVM {
    fn stop_all_mutators(_tls: VMCollectorThread) {
        write_mockvm(|mock| {
            mock.stops += 1;
            let blocked = mock.blocked.clone();
            mock.blocked_at_stop.push(blocked);
        });
    }

    fn resume_mutators(_tls: VMCollectorThread) {
        write_mockvm(|mock| mock.resumes += 1);
    }

    fn block_for_gc(tls: VMMutatorThread) {
        write_mockvm(|mock| {
            assert!(!mock.blocked.contains(&tls), "{:?} blocked twice", tls);
            mock.blocked.push(tls);
        });
    }

    fn unblock_after_gc(tls: VMMutatorThread) {
        write_mockvm(|mock| mock.blocked.retain(|t| *t != tls));
    }

    fn out_of_memory(_tls: VMThread, err_kind: AllocationError) {
        write_mockvm(|mock| mock.out_of_memory.push(err_kind));
    }

    fn fatal_error(message: &str) -> ! {
        panic!("{}", message)
    }
}

impl ActivePlan<MockVM> for MockVM {
    fn is_mutator(tls: VMThread) -> bool {
        read_mockvm(|mock| {
            mock.mutators.iter().any(|m| {
                let mutator = unsafe { &*(*m as *const Mutator<MockVM>) };
                mutator.mutator_tls.0 == tls
            })
        })
    }

    fn mutators<'a>() -> Box<dyn Iterator<Item = &'a mut Mutator<MockVM>> + 'a> {
        let mutators = read_mockvm(|mock| mock.mutators.clone());
        Box::new(
            mutators
                .into_iter()
                .map(|m| unsafe { &mut *(m as *mut Mutator<MockVM>) }),
        )
    }

    fn number_of_mutators() -> usize {
        read_mockvm(|mock| mock.mutators.len())
    }
}

impl ReferenceGlue<MockVM> for MockVM {
    fn is_reference(object: ObjectReference) -> bool {
        header(object) & WEAK_BIT != 0
    }

    fn get_referent(reference: ObjectReference) -> Option<ObjectReference> {
        get_field(reference, 0)
    }

    fn set_referent(reference: ObjectReference, referent: ObjectReference) {
        set_field(reference, 0, Some(referent))
    }

    fn clear_referent(reference: ObjectReference) {
        set_field(reference, 0, None)
    }

    fn enqueue_references(references: &[ObjectReference], _tls: VMCollectorThread) {
        write_mockvm(|mock| mock.enqueued.extend_from_slice(references));
    }
}

impl VirtualMemory for MockVM {
    fn allocate(size: usize) -> Option<Address> {
        let allowed = write_mockvm(|mock| match mock.region_budget {
            Some(0) => false,
            Some(ref mut n) => {
                *n -= 1;
                true
            }
            None => true,
        });
        if !allowed {
            return None;
        }
        let start = crate::util::memory::mmap_anywhere(size).ok()?;
        write_mockvm(|mock| mock.regions_allocated += 1);
        Some(start)
    }

    fn deallocate(start: Address, size: usize) {
        write_mockvm(|mock| mock.bytes_deallocated += size);
        let _ = crate::util::memory::munmap(start, size);
    }
}

/// Run `f` and return the message it panicked with.
pub fn catch_fatal<F: FnOnce()>(f: F) -> Option<String> {
    let res = panic::catch_unwind(AssertUnwindSafe(f));
    res.err().map(|e| {
        e.downcast_ref::<String>()
            .cloned()
            .or_else(|| e.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_default()
    })
}
