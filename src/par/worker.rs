//! Worker pool for the threaded sort.
//!
//! One global work queue of [`Chunk`]s feeds `num_threads` workers. A worker
//! holding a chunk larger than its share recruits the idle pool: it slices
//! the chunk into portions, enqueues all but the first as slave chunks
//! tagged with its own index, partitions the first portion itself, waits for
//! the slave results and stitches them into one global split point. The
//! right half is put back on the queue and the left half continues in the
//! same worker, which keeps queue churn down.
//!
//! Two condvar scopes: the global one guards the queue and the count of
//! sleeping workers (termination is detected when every worker sleeps on an
//! empty queue, and the last one wakes a single peer so the shutdown
//! propagates), and a per-master one guards that master's slave results.
//!
//! The data buffer itself is shared without locking. Correctness relies on
//! all in-flight chunks covering disjoint sub-ranges, which holds by
//! construction: slave portions are adjacent non-overlapping slices, and
//! after stitching the two halves are disjoint.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::slice;
use std::sync::{Condvar, Mutex};

use crate::par::regions::{stitch_regions, Region};
use crate::par::QueueMode;
use crate::radix::key::{Keyed, RadixKey};
use crate::radix::sorter::{partition_dir, radix_sort_range, recursion_dir, BitPartitioner};
use crate::{range_len, SortIndex};

/// One unit of work: a sub-range, the bit to partition on, the partition
/// direction, and the master linkage when this is a slave portion.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Chunk {
    pub left: SortIndex,
    pub right: SortIndex,
    pub bit_no: i32,
    pub up: bool,
    /// Index of the worker waiting for this portion's result, if any.
    pub master_idx: Option<usize>,
    pub slave_idx: usize,
}

/// Raw view of the caller's buffer, shared across the pool.
struct SharedData<E> {
    ptr: *mut E,
    len: usize,
}

// The pool hands out disjoint sub-ranges only; see the module docs.
unsafe impl<E: Send> Send for SharedData<E> {}
unsafe impl<E: Send> Sync for SharedData<E> {}

struct QueueState {
    chunks: VecDeque<Chunk>,
    /// Workers currently asleep on the queue condvar.
    waiting: usize,
    max_queue_len: usize,
}

#[derive(Default)]
struct MasterSlot {
    results: Vec<Region>,
    ready: usize,
}

/// Per-worker counters, merged into [`crate::ThreadStats`] after the run.
#[derive(Clone, Copy, Default)]
pub(crate) struct LocalStats {
    pub elements: SortIndex,
    pub chunks: SortIndex,
}

pub(crate) struct ThreadSorter<'d, K, E, P, const UP: bool> {
    num_threads: usize,
    queue_mode: QueueMode,
    use_slaves: bool,
    /// Chunks at or below this size are handled by one worker alone.
    chunk_thresh: SortIndex,
    /// Chunks at or below this size do not recruit slaves.
    chunk_slave_thresh: SortIndex,
    bit_hi: i32,
    bit_lo: i32,
    cmp_thresh: SortIndex,

    data: SharedData<E>,
    queue: Mutex<QueueState>,
    queue_cond: Condvar,
    masters: Vec<(Mutex<MasterSlot>, Condvar)>,

    _marker: PhantomData<(&'d mut [E], fn() -> (K, P))>,
}

impl<'d, K, E, P, const UP: bool> ThreadSorter<'d, K, E, P, UP>
where
    K: RadixKey,
    E: Keyed<K>,
    P: BitPartitioner<E>,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        num_threads: usize,
        queue_mode: QueueMode,
        use_slaves: bool,
        slave_fac: f64,
        d: &'d mut [E],
        bit_hi: i32,
        bit_lo: i32,
        cmp_thresh: SortIndex,
        total: SortIndex,
    ) -> Self {
        // Clamped so that inputs smaller than the pool do not produce
        // zero-sized portions.
        let chunk_thresh = (total / num_threads as SortIndex).max(1);
        let chunk_slave_thresh = (slave_fac * chunk_thresh as f64) as SortIndex;
        let mut masters = Vec::with_capacity(num_threads);
        masters.resize_with(num_threads, || {
            (Mutex::new(MasterSlot::default()), Condvar::new())
        });
        Self {
            num_threads,
            queue_mode,
            use_slaves,
            chunk_thresh,
            chunk_slave_thresh,
            bit_hi,
            bit_lo,
            cmp_thresh,
            data: SharedData {
                ptr: d.as_mut_ptr(),
                len: d.len(),
            },
            queue: Mutex::new(QueueState {
                chunks: VecDeque::new(),
                waiting: 0,
                max_queue_len: 0,
            }),
            queue_cond: Condvar::new(),
            masters,
            _marker: PhantomData,
        }
    }

    /// Exclusive view of `[left, right]`.
    ///
    /// # Safety
    ///
    /// The caller must be the only holder of this sub-range: either it was
    /// popped from the queue, or it is a half produced by this worker's own
    /// partition that has not been enqueued.
    #[allow(clippy::mut_from_ref)]
    unsafe fn chunk_slice(&self, left: SortIndex, right: SortIndex) -> &mut [E] {
        debug_assert!(0 <= left && left <= right + 1 && right < self.data.len as SortIndex);
        slice::from_raw_parts_mut(
            self.data.ptr.offset(left as isize),
            range_len(left, right) as usize,
        )
    }

    // --- queue ---

    fn pop(&self, q: &mut QueueState) -> Chunk {
        match self.queue_mode {
            QueueMode::Fifo => q.chunks.pop_front().unwrap(),
            QueueMode::Lifo => q.chunks.pop_back().unwrap(),
        }
    }

    fn add_chunk(&self, chunk: Chunk) {
        let mut q = self.queue.lock().unwrap();
        q.chunks.push_back(chunk);
        q.max_queue_len = q.max_queue_len.max(q.chunks.len());
        self.queue_cond.notify_one();
    }

    /// Seed the queue before any worker runs; no notification needed.
    pub fn add_first_chunk(&self, left: SortIndex, right: SortIndex) {
        let mut q = self.queue.lock().unwrap();
        q.chunks.push_back(Chunk {
            left,
            right,
            bit_no: self.bit_hi,
            up: UP,
            master_idx: None,
            slave_idx: 0,
        });
        q.waiting = 0;
        q.max_queue_len = q.max_queue_len.max(q.chunks.len());
    }

    pub fn max_queue_len(&self) -> usize {
        self.queue.lock().unwrap().max_queue_len
    }

    /// Block until work arrives; `None` means the pool is done.
    fn next_chunk(&self) -> Option<Chunk> {
        let mut q = self.queue.lock().unwrap();
        loop {
            if !q.chunks.is_empty() {
                return Some(self.pop(&mut q));
            }
            q.waiting += 1;
            // Queue empty and everyone asleep: the sort is finished. Wake
            // one peer; it will reach this same branch and pass it on.
            if q.waiting >= self.num_threads {
                self.queue_cond.notify_one();
                return None;
            }
            q = self.queue_cond.wait(q).unwrap();
            q.waiting -= 1;
        }
    }

    // --- master/slave handshake ---

    fn prepare_slave_results(&self, master_idx: usize, portions: usize) {
        let (lock, _) = &self.masters[master_idx];
        let mut slot = lock.lock().unwrap();
        slot.ready = 0;
        slot.results.clear();
        slot.results.resize(portions, Region::default());
    }

    fn store_slave_result(&self, master_idx: usize, slave_idx: usize, region: Region) {
        let (lock, cond) = &self.masters[master_idx];
        let mut slot = lock.lock().unwrap();
        slot.ready += 1;
        slot.results[slave_idx] = region;
        cond.notify_one();
    }

    fn wait_for_slave_results(&self, master_idx: usize, portions: usize) -> Vec<Region> {
        let (lock, cond) = &self.masters[master_idx];
        let mut slot = lock.lock().unwrap();
        while slot.ready < portions {
            slot = cond.wait(slot).unwrap();
        }
        slot.results.clone()
    }

    // --- bit sorting and recursion with runtime direction ---

    /// Partition `[left, right]` at `bit_no`; returns the split and the
    /// directions for the two halves. The top bit applies the key policy,
    /// all lower bits keep the chunk's direction.
    fn sort_bits(
        &self,
        left: SortIndex,
        right: SortIndex,
        bit_no: i32,
        up: bool,
    ) -> (SortIndex, bool, bool) {
        let d = unsafe { self.chunk_slice(left, right) };
        let last = range_len(left, right) - 1;
        if bit_no == self.bit_hi {
            let dirs = K::directions(up);
            let split = partition_dir::<E, P>(d, bit_no as u32, 0, last, dirs.high);
            (split + left, dirs.left, dirs.right)
        } else {
            let split = partition_dir::<E, P>(d, bit_no as u32, 0, last, up);
            (split + left, up, up)
        }
    }

    /// Hand `[left, right]` to the sequential driver.
    fn recursion(&self, left: SortIndex, right: SortIndex, bit_no: i32, up: bool) {
        let d = unsafe { self.chunk_slice(left, right) };
        let last = range_len(left, right) - 1;
        if bit_no == self.bit_hi {
            if up {
                radix_sort_range::<K, E, P, true>(d, bit_no, self.bit_lo, 0, last, self.cmp_thresh);
            } else {
                radix_sort_range::<K, E, P, false>(d, bit_no, self.bit_lo, 0, last, self.cmp_thresh);
            }
        } else {
            recursion_dir::<K, E, P, UP>(d, bit_no, self.bit_lo, 0, last, self.cmp_thresh, up);
        }
    }

    // --- worker loop ---

    pub fn worker(&self, thread_idx: usize, stats: &mut LocalStats) {
        crate::scope!("radix_worker");
        while let Some(chunk) = self.next_chunk() {
            stats.chunks += 1;
            let Chunk {
                mut left,
                mut right,
                mut bit_no,
                mut up,
                master_idx,
                slave_idx,
            } = chunk;

            if let Some(master_idx) = master_idx {
                // Slave: partition one bit level and report back. Slave
                // portions are always large, the comparison cutover cannot
                // apply here.
                stats.elements += range_len(left, right);
                let (split, _, _) = self.sort_bits(left, right, bit_no, up);
                self.store_slave_result(master_idx, slave_idx, Region::new(left, split, right));
                continue;
            }

            loop {
                let elems = range_len(left, right);
                if elems <= self.chunk_thresh {
                    // Small enough to finish alone, bits and all.
                    stats.elements += elems;
                    self.recursion(left, right, bit_no, up);
                    break;
                }

                let portions = (elems / self.chunk_thresh + 1) as usize;
                let recruit = self.use_slaves
                    && elems > self.chunk_slave_thresh
                    && elems >= portions as SortIndex;

                let (overall_split, up_left, up_right) = if recruit {
                    // Equal portions; the first one absorbs the remainder
                    // and is processed by this worker itself as slave 0.
                    self.prepare_slave_results(thread_idx, portions);
                    let portion_size = elems / portions as SortIndex;
                    let first_portion = elems - (portions as SortIndex - 1) * portion_size;
                    let my_right = left + first_portion - 1;
                    let mut slave_left = left + first_portion;
                    for slave_idx in 1..portions {
                        self.add_chunk(Chunk {
                            left: slave_left,
                            right: slave_left + portion_size - 1,
                            bit_no,
                            up,
                            master_idx: Some(thread_idx),
                            slave_idx,
                        });
                        slave_left += portion_size;
                    }
                    stats.elements += first_portion;
                    let (my_split, up_left, up_right) = self.sort_bits(left, my_right, bit_no, up);
                    self.store_slave_result(thread_idx, 0, Region::new(left, my_split, my_right));
                    let regions = self.wait_for_slave_results(thread_idx, portions);
                    let split = unsafe { stitch_regions(self.data.ptr, &regions) };
                    (split, up_left, up_right)
                } else {
                    stats.elements += elems;
                    self.sort_bits(left, right, bit_no, up)
                };

                bit_no -= 1;
                if bit_no < self.bit_lo {
                    break;
                }
                // Right half goes back on the queue, left half continues
                // here.
                self.add_chunk(Chunk {
                    left: overall_split,
                    right,
                    bit_no,
                    up: up_right,
                    master_idx: None,
                    slave_idx: 0,
                });
                right = overall_split - 1;
                up = up_left;
            }
        }
    }
}
