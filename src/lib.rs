//! In-place MSB-first binary radix sort over fixed-width keys.
//!
//! The sort walks the key bits from the most significant to the least
//! significant one, partitioning the range at each bit and recursing into the
//! two halves, with an insertion-sort cutover for small ranges. Elements are
//! unsigned machine words (`u8` through `u128`) whose low bytes hold the key;
//! any remaining high bytes are an opaque payload that travels with the key
//! but is never inspected. Signed integers and IEEE-754 floats are handled by
//! a per-key-type direction policy, so one ascending/descending API covers
//! all key categories.
//!
//! Three backends share the same recursion:
//!
//!  * [`sort_sequential`]: scalar two-pointer bit partitioner.
//!  * `sort_simd`: AVX-512 compress-store partitioner; only compiled when
//!    the target enables `avx512f`, `avx512bw` and `avx512dq`
//!    (plus `avx512vbmi2` for 1- and 2-byte elements).
//!  * [`sort_sequential_threaded`] / `sort_simd_threaded`: a worker pool
//!    that splits large partitions across threads and stitches the per-thread
//!    partition points back together.
//!
//! ```
//! use bitradix::sort_sequential;
//!
//! let mut data: Vec<u32> = vec![170, 45, 75, 90, 2, 802, 24, 66];
//! let last = data.len() as i64 - 1;
//! // Key type u32, element type u32 (no payload), ascending.
//! sort_sequential::<u32, u32, true>(&mut data, 0, last, 4);
//! assert_eq!(data, vec![2, 24, 45, 66, 75, 90, 170, 802]);
//! ```
//!
//! Sorting is not stable: equal keys with different payloads may be reordered
//! between runs, in particular by the threaded backends.

use std::time::Instant;

pub mod par;
pub mod radix;

pub use par::sort_sequential_threaded;
#[cfg(all(
    target_arch = "x86_64",
    target_feature = "avx512f",
    target_feature = "avx512bw",
    target_feature = "avx512dq"
))]
pub use par::sort_simd_threaded;
pub use par::{QueueMode, ThreadConfig, ThreadStats};
pub use radix::key::{Directions, ElementBits, Keyed, RadixKey};
pub use radix::sorter::sort_sequential;
#[cfg(all(
    target_arch = "x86_64",
    target_feature = "avx512f",
    target_feature = "avx512bw",
    target_feature = "avx512dq"
))]
pub use radix::sorter::sort_simd;

/// Signed index into the sort buffer.
///
/// Indices are signed so that the right cursor of a partition can step below
/// the left border without wrapping.
pub type SortIndex = i64;

/// Number of elements in the inclusive range `[left, right]`.
#[inline(always)]
pub(crate) fn range_len(left: SortIndex, right: SortIndex) -> SortIndex {
    right + 1 - left
}

pub struct Timer {
    start: Instant,
    label: String,
}

impl Timer {
    pub fn new(label: &str) -> Self {
        Self {
            start: Instant::now(),
            label: label.to_string(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        println!("{:>12} {}", format!("{:.2?}", elapsed), self.label)
    }
}

/// Add profile scope. Nesting the macro allows us to make the profiling crate optional.
/// Use profile feature to enable profiling.
#[doc(hidden)]
#[macro_export]
macro_rules! scope {
    [$label:expr] => {
        #[cfg(feature = "profile")]
        profiling::scope!($label);
    };
}

/// Add profile scope and timer.
/// Use scope_print feature to print times to console.
/// Use profile feature to enable profiling.
#[doc(hidden)]
#[macro_export]
macro_rules! scope_print {
    [$label:expr] => {
        #[cfg(feature = "profile")]
        profiling::scope!($label);
        #[cfg(feature = "scope_print")]
        let _t = $crate::Timer::new($label);
    };
}
