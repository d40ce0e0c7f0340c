use super::growth::{GrowPolicy, GrowState, GrowthManager};
use super::safety_zone::SafetyZone;
use crate::global_state::GlobalState;
use crate::policy::space::{MemorySpace, Region};
use crate::scheduler::{CollectorRequest, GCRequester};
use crate::util::alloc::{AllocationError, Tlab};
use crate::util::constants::ZAP_PATTERN;
use crate::util::conversions;
use crate::util::memory;
use crate::util::opaque_pointer::*;
use crate::util::options::Options;
use crate::util::statistics::Stats;
use crate::util::Address;
use crate::vm::{Collection, VMBinding};

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// The semi-space heap: two equally sized spaces, one of which (to-space) holds every live
/// object between collections while the other (from-space) is vacant.
///
/// Mutators allocate from to-space by advancing its mark with a compare-and-swap. Collection,
/// growth and shrinking are serialized by the heap lock, which guards the [`GrowthManager`].
pub struct SemiSpace<VM: VMBinding> {
    /// Selects to-space: `copyspace1` if set, `copyspace0` otherwise.
    pub hi: AtomicBool,
    pub copyspace0: MemorySpace,
    pub copyspace1: MemorySpace,
    pub safety_zone: SafetyZone,
    growth: Mutex<GrowthManager>,
    grow_policy: GrowPolicy,
    pub(crate) options: Arc<Options>,
    pub(crate) state: Arc<GlobalState>,
    pub(crate) stats: Arc<Stats>,
    pub(crate) gc_requester: Arc<GCRequester<VM>>,
    phantom: PhantomData<VM>,
}

impl<VM: VMBinding> SemiSpace<VM> {
    /// Create the heap and reserve both spaces at their initial size. Failing to reserve them
    /// is fatal.
    pub fn new(
        options: Arc<Options>,
        state: Arc<GlobalState>,
        stats: Arc<Stats>,
        gc_requester: Arc<GCRequester<VM>>,
    ) -> Self {
        let initial = options.initial_space_size();
        let res = SemiSpace {
            hi: AtomicBool::new(false),
            copyspace0: MemorySpace::new("copyspace0"),
            copyspace1: MemorySpace::new("copyspace1"),
            safety_zone: SafetyZone::new(options.effective_safety_zone_size()),
            growth: Mutex::new(GrowthManager::new(options.max_space_size())),
            grow_policy: GrowPolicy::from_selector(options.grow_policy, initial),
            options,
            state,
            stats,
            gc_requester,
            phantom: PhantomData,
        };

        for space in [&res.copyspace0, &res.copyspace1] {
            match Region::allocate::<VM>(initial) {
                Some(region) => space.adopt(region),
                None => {
                    VM::VMCollection::out_of_memory(
                        VMThread::UNINITIALIZED,
                        AllocationError::MmapOutOfMemory,
                    );
                    crate::util::fatal::fatal_error::<VM>(&format!(
                        "Unable to reserve {} for {}",
                        conversions::bytes_to_formatted_string(initial),
                        space.name()
                    ));
                }
            }
        }
        if res.options.zap_from_space {
            let to_space = res.tospace();
            memory::set_pattern(to_space.start(), ZAP_PATTERN, to_space.size());
        }
        info!(
            "Heap initialized: {} and {}, safety zone {}",
            res.tospace(),
            res.fromspace(),
            conversions::bytes_to_formatted_string(res.safety_zone.size())
        );
        res
    }

    pub fn tospace(&self) -> &MemorySpace {
        if self.hi.load(Ordering::SeqCst) {
            &self.copyspace1
        } else {
            &self.copyspace0
        }
    }

    pub fn fromspace(&self) -> &MemorySpace {
        if self.hi.load(Ordering::SeqCst) {
            &self.copyspace0
        } else {
            &self.copyspace1
        }
    }

    /// The allocation limit in to-space.
    pub fn top(&self) -> Address {
        let to_space = self.tospace();
        self.safety_zone.top(to_space.start(), to_space.end())
    }

    /// Bytes that can still be allocated before a collection is needed.
    pub fn free_bytes(&self) -> usize {
        self.top().saturating_extent(self.tospace().mark())
    }

    /// Bytes allocated in to-space, including abandoned TLAB remainders.
    pub fn used_bytes(&self) -> usize {
        self.tospace().used()
    }

    /// Bytes reserved by both spaces.
    pub fn total_bytes(&self) -> usize {
        self.copyspace0.size() + self.copyspace1.size()
    }

    /// Is the address inside to-space?
    pub fn is_in_heap(&self, addr: Address) -> bool {
        self.tospace().contains(addr)
    }

    pub fn grow_policy(&self) -> GrowPolicy {
        self.grow_policy
    }

    /// Run `f` on the growth state machine while holding the heap lock.
    pub fn with_growth<R>(&self, f: impl FnOnce(&GrowState) -> R) -> R {
        let growth = self.lock_heap();
        f(growth.state())
    }

    fn lock_heap(&self) -> MutexGuard<'_, GrowthManager> {
        self.growth.lock().unwrap()
    }

    /// Run `f` under the heap lock on behalf of a mutator. The mutator is reported to the
    /// binding as blocked while it waits for the lock and for any collection `f` requests.
    fn with_heap_lock<R>(
        &self,
        tls: VMMutatorThread,
        f: impl FnOnce(&mut GrowthManager) -> R,
    ) -> R {
        let _blocked = BlockedForGC::<VM>::new(tls);
        let mut growth = self.lock_heap();
        f(&mut *growth)
    }

    /// Allocation after the mutator's TLAB could not satisfy `size` bytes. Small requests get a
    /// fresh TLAB and are carved from its start. Large requests, and every request when TLABs
    /// are disabled, are served directly from to-space.
    pub fn alloc_slow(
        &self,
        tls: VMMutatorThread,
        tlab: &mut Tlab,
        size: usize,
    ) -> Result<Address, AllocationError> {
        let tlab_size = self.options.tlab_size;
        if self.options.use_tlab && size < tlab_size {
            let chunk = self.retry_allocate(tls, tlab_size)?;
            tlab.rebind(chunk + size, chunk + tlab_size);
            if self.options.trace_allocation {
                trace!(
                    "{:?}: allocated TLAB [{}, {})",
                    tls,
                    chunk,
                    chunk + tlab_size
                );
            }
            Ok(chunk)
        } else {
            self.retry_allocate(tls, size)
        }
    }

    /// Allocate `size` zeroed bytes from to-space, collecting and growing the heap as needed.
    ///
    /// The mark is advanced with a compare-and-swap so concurrent callers always receive
    /// disjoint cells. If the heap cannot satisfy the request the safety zone is lent out, the
    /// binding is told through [`Collection::out_of_memory`] and `HeapOutOfMemory` is returned.
    pub fn retry_allocate(
        &self,
        tls: VMMutatorThread,
        size: usize,
    ) -> Result<Address, AllocationError> {
        if self.options.gc_before_allocation {
            self.collect_garbage(tls, 0);
        }
        loop {
            let to_space = self.tospace();
            let old_mark = to_space.mark();
            let fits = old_mark
                .as_usize()
                .checked_add(size)
                .is_some_and(|end| end <= self.top().as_usize());
            if !fits {
                if !self.collect_garbage(tls, size) {
                    VM::VMCollection::out_of_memory(tls.0, AllocationError::HeapOutOfMemory);
                    return Err(AllocationError::HeapOutOfMemory);
                }
                continue;
            }
            let end = old_mark + size;
            if to_space.compare_exchange_mark(old_mark, end).is_ok() {
                memory::zero(old_mark, size);
                if self.options.trace_allocation {
                    trace!("{:?}: allocated [{}, {})", tls, old_mark, end);
                }
                return Ok(old_mark);
            }
        }
    }

    /// Make at least `requested` bytes available, collecting and then growing the heap.
    /// `requested == 0` always collects.
    ///
    /// Returns false if the request cannot be met even at the maximum heap size. The safety zone
    /// is then lent out so the caller can raise an out-of-memory error; if it was already lent
    /// out, the heap is exhausted beyond recovery and the process is terminated.
    pub fn collect_garbage(&self, tls: VMMutatorThread, requested: usize) -> bool {
        self.with_heap_lock(tls, |growth| {
            if requested == 0 || self.free_bytes() < requested {
                self.execute_gc();
            }
            if self.free_bytes() >= requested {
                let to_space = self.tospace();
                if self.safety_zone.try_retract(to_space.mark(), to_space.end()) {
                    info!("Safety zone restored: {}", to_space);
                }
                return true;
            }
            let policy = self.grow_policy;
            while self.grow(growth, &policy) {
                if self.free_bytes() >= requested {
                    return true;
                }
            }
            if !self.safety_zone.enter() {
                crate::util::fatal::fatal_error::<VM>(
                    "Out of memory again after throwing OutOfMemoryError",
                );
            }
            warn!(
                "Out of memory: {} bytes requested, {} free; safety zone of {} lent out",
                requested,
                self.free_bytes(),
                self.safety_zone.size()
            );
            false
        })
    }

    /// Grow both spaces by one step of `policy`. Costs one collection.
    fn grow(&self, growth: &mut GrowthManager, policy: &GrowPolicy) -> bool {
        if !growth.prepare::<VM>(policy, self.fromspace()) {
            return false;
        }
        self.execute_gc();
        growth.commit::<VM>(self.fromspace());
        true
    }

    /// Grow both spaces so that the heap totals at least `amount` bytes. Returns false if the
    /// heap is already that large or cannot grow.
    pub fn increase_memory(&self, tls: VMMutatorThread, amount: usize) -> bool {
        self.with_heap_lock(tls, |growth| {
            let target = conversions::page_align_up(amount / 2);
            let current = self.fromspace().size();
            if target > current {
                self.grow(growth, &GrowPolicy::Linear(target - current))
            } else {
                false
            }
        })
    }

    /// Collect, then give back `amount` bytes of the heap, half from the tail of each space.
    /// Returns false if there was not enough free space after the collection.
    pub fn decrease_memory(&self, tls: VMMutatorThread, amount: usize) -> bool {
        self.with_heap_lock(tls, |_| {
            let per_space = conversions::page_align_up(amount / 2);
            self.gc_requester.request(CollectorRequest::Shrink(per_space))
        })
    }

    /// Run one collection on the collector thread and wait for it.
    fn execute_gc(&self) {
        self.gc_requester.request(CollectorRequest::Collect);
    }

    /// Called on the collector thread, with mutators stopped, right after a collection.
    pub(crate) fn shrink_after_collection(&self, bytes: usize) -> bool {
        let to_space = self.tospace();
        if bytes >= to_space.size() || self.free_bytes() < bytes {
            info!(
                "Cannot shrink spaces by {}: {} free",
                conversions::bytes_to_formatted_string(bytes),
                conversions::bytes_to_formatted_string(self.free_bytes())
            );
            return false;
        }
        if bytes > 0 {
            self.fromspace().shrink_tail::<VM>(bytes);
            to_space.shrink_tail::<VM>(bytes);
        }
        info!("Shrunk spaces: {} and {}", self.tospace(), self.fromspace());
        true
    }
}

/// Reports a mutator as blocked for the lifetime of the value.
struct BlockedForGC<VM: VMBinding> {
    tls: VMMutatorThread,
    phantom: PhantomData<VM>,
}

impl<VM: VMBinding> BlockedForGC<VM> {
    fn new(tls: VMMutatorThread) -> Self {
        VM::VMCollection::block_for_gc(tls);
        BlockedForGC {
            tls,
            phantom: PhantomData,
        }
    }
}

impl<VM: VMBinding> Drop for BlockedForGC<VM> {
    fn drop(&mut self) {
        VM::VMCollection::unblock_after_gc(self.tls);
    }
}
