//! Threaded front end: configuration, statistics and the entry points that
//! run the bit-level sort on a worker pool.

use std::str::FromStr;
use std::sync::OnceLock;
use std::thread;

pub(crate) mod regions;
pub(crate) mod worker;

use crate::radix::key::{Keyed, RadixKey};
#[cfg(all(
    target_arch = "x86_64",
    target_feature = "avx512f",
    target_feature = "avx512bw",
    target_feature = "avx512dq"
))]
use crate::radix::simd::SimdLanes;
#[cfg(all(
    target_arch = "x86_64",
    target_feature = "avx512f",
    target_feature = "avx512bw",
    target_feature = "avx512dq"
))]
use crate::radix::sorter::SimdPartitioner;
use crate::radix::sorter::{BitPartitioner, ScalarPartitioner};
use crate::{range_len, SortIndex};
use self::worker::{LocalStats, ThreadSorter};

static AVAILABLE_PARALLELISM: OnceLock<usize> = OnceLock::new();

#[inline]
pub fn cached_available_parallelism() -> usize {
    *AVAILABLE_PARALLELISM.get_or_init(|| {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

/// Pop order of the global work queue.
#[derive(PartialEq, Eq, Default, Clone, Copy, Debug)]
pub enum QueueMode {
    #[default]
    Fifo,
    Lifo,
}

impl FromStr for QueueMode {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fifo" => Ok(Self::Fifo),
            "lifo" => Ok(Self::Lifo),
            _ => Err(format!(
                "Unknown queue mode: '{s}', valid modes: 'fifo', 'lifo'"
            )),
        }
    }
}

/// Configuration of the worker pool.
#[derive(Clone, Debug)]
pub struct ThreadConfig {
    /// Pool size; must be at least 1.
    pub num_threads: usize,
    pub queue_mode: QueueMode,
    /// Allow workers to recruit the idle pool for oversized chunks.
    pub use_slaves: bool,
    /// Chunks above `slave_fac * (total / num_threads)` elements recruit
    /// slaves. Values well below 1.0 can turn every idle worker into a
    /// master with nobody left to serve as a slave, stalling the sort;
    /// keep this at 1.0 or above.
    pub slave_fac: f64,
}

impl ThreadConfig {
    pub fn new(num_threads: usize) -> Self {
        Self {
            num_threads,
            queue_mode: QueueMode::Fifo,
            use_slaves: true,
            slave_fac: 1.0,
        }
    }
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self::new(cached_available_parallelism())
    }
}

/// Counters collected by one threaded sort run.
#[derive(Clone, Debug, Default)]
pub struct ThreadStats {
    /// Elements partitioned per worker, summed over all bit levels.
    pub elements: Vec<SortIndex>,
    /// Chunks processed per worker.
    pub chunks: Vec<SortIndex>,
    /// High-water mark of the work queue.
    pub max_queue_len: usize,
}

impl ThreadStats {
    pub fn new(num_threads: usize) -> Self {
        Self {
            elements: vec![0; num_threads],
            chunks: vec![0; num_threads],
            max_queue_len: 0,
        }
    }

    pub fn zero(&mut self) {
        self.elements.fill(0);
        self.chunks.fill(0);
        self.max_queue_len = 0;
    }
}

fn run_threaded<K, E, P, const UP: bool>(
    config: &ThreadConfig,
    stats: Option<&mut ThreadStats>,
    d: &mut [E],
    left: SortIndex,
    right: SortIndex,
    cmp_thresh: SortIndex,
) where
    K: RadixKey,
    E: Keyed<K>,
    P: BitPartitioner<E>,
{
    if config.num_threads < 1 {
        panic!("num_threads ({}) < 1", config.num_threads);
    }

    let total = range_len(left, right);
    let sorter = ThreadSorter::<K, E, P, UP>::new(
        config.num_threads,
        config.queue_mode,
        config.use_slaves,
        config.slave_fac,
        d,
        K::MSB as i32,
        0,
        cmp_thresh,
        total,
    );

    let mut locals = vec![LocalStats::default(); config.num_threads];

    // The first chunk goes in before the pool starts, otherwise the workers
    // would see an empty queue and terminate immediately.
    sorter.add_first_chunk(left, right);

    thread::scope(|s| {
        let sorter = &sorter;
        for (thread_idx, local) in locals.iter_mut().enumerate() {
            s.spawn(move || sorter.worker(thread_idx, local));
        }
    });

    if let Some(stats) = stats {
        stats.elements.resize(config.num_threads, 0);
        stats.chunks.resize(config.num_threads, 0);
        stats.zero();
        for (i, local) in locals.iter().enumerate() {
            stats.elements[i] = local.elements;
            stats.chunks[i] = local.chunks;
        }
        stats.max_queue_len = sorter.max_queue_len();
    }
}

/// Threaded sort of `d[left..=right]` with the scalar bit partitioner.
///
/// Same key/element/direction parameters as
/// [`crate::sort_sequential`]. `stats`, when given, receives the per-worker
/// counters of this run. Panics if `config.num_threads` is 0.
pub fn sort_sequential_threaded<K, E, const UP: bool>(
    config: &ThreadConfig,
    stats: Option<&mut ThreadStats>,
    d: &mut [E],
    left: SortIndex,
    right: SortIndex,
    cmp_thresh: SortIndex,
) where
    K: RadixKey,
    E: Keyed<K>,
{
    crate::scope!("sort_sequential_threaded");
    run_threaded::<K, E, ScalarPartitioner, UP>(config, stats, d, left, right, cmp_thresh);
}

/// Threaded sort of `d[left..=right]` with the AVX-512 bit partitioner.
///
/// Only available when the target enables the required AVX-512 features.
#[cfg(all(
    target_arch = "x86_64",
    target_feature = "avx512f",
    target_feature = "avx512bw",
    target_feature = "avx512dq"
))]
pub fn sort_simd_threaded<K, E, const UP: bool>(
    config: &ThreadConfig,
    stats: Option<&mut ThreadStats>,
    d: &mut [E],
    left: SortIndex,
    right: SortIndex,
    cmp_thresh: SortIndex,
) where
    K: RadixKey,
    E: Keyed<K> + SimdLanes,
{
    crate::scope!("sort_simd_threaded");
    run_threaded::<K, E, SimdPartitioner, UP>(config, stats, d, left, right, cmp_thresh);
}
