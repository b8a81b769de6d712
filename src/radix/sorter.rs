//! Recursion driver: MSB→LSB descent over the key bits.
//!
//! Each level partitions the range at the current bit and recurses into the
//! two halves; ranges at or below the comparison cutover go to the insertion
//! sort instead. The top (sign) bit and the two halves below it use the
//! directions from the key policy, every deeper level partitions in the
//! plain requested direction. The partitioner is a type parameter so the
//! scalar and vectorized kernels share one driver.

use crate::radix::insertion::insertion_sort;
use crate::radix::key::{ElementBits, Keyed, RadixKey};
use crate::radix::scalar::partition_bit;
#[cfg(all(
    target_arch = "x86_64",
    target_feature = "avx512f",
    target_feature = "avx512bw",
    target_feature = "avx512dq"
))]
use crate::radix::simd::{partition_bit_simd, SimdLanes};
use crate::SortIndex;

/// Bit-level partition kernel plugged into the recursion driver.
pub(crate) trait BitPartitioner<E: ElementBits> {
    fn partition<const UP: bool>(
        d: &mut [E],
        bit_no: u32,
        left: SortIndex,
        right: SortIndex,
    ) -> SortIndex;
}

pub(crate) struct ScalarPartitioner;

impl<E: ElementBits> BitPartitioner<E> for ScalarPartitioner {
    #[inline]
    fn partition<const UP: bool>(
        d: &mut [E],
        bit_no: u32,
        left: SortIndex,
        right: SortIndex,
    ) -> SortIndex {
        partition_bit::<E, UP>(d, bit_no, left, right)
    }
}

#[cfg(all(
    target_arch = "x86_64",
    target_feature = "avx512f",
    target_feature = "avx512bw",
    target_feature = "avx512dq"
))]
pub(crate) struct SimdPartitioner;

#[cfg(all(
    target_arch = "x86_64",
    target_feature = "avx512f",
    target_feature = "avx512bw",
    target_feature = "avx512dq"
))]
impl<E: SimdLanes> BitPartitioner<E> for SimdPartitioner {
    #[inline]
    fn partition<const UP: bool>(
        d: &mut [E],
        bit_no: u32,
        left: SortIndex,
        right: SortIndex,
    ) -> SortIndex {
        partition_bit_simd::<E, UP>(d, bit_no, left, right)
    }
}

/// Partition with a runtime direction.
#[inline]
pub(crate) fn partition_dir<E, P>(
    d: &mut [E],
    bit_no: u32,
    left: SortIndex,
    right: SortIndex,
    up: bool,
) -> SortIndex
where
    E: ElementBits,
    P: BitPartitioner<E>,
{
    if up {
        P::partition::<true>(d, bit_no, left, right)
    } else {
        P::partition::<false>(d, bit_no, left, right)
    }
}

/// Descend from `bit_no` down to `bit_lo`.
///
/// `UP_RADIX` is the partition direction for every remaining bit of this
/// subtree; `UP_CMP` is the caller's overall direction, which the comparison
/// fallback always uses (its key ranks already encode the per-half
/// direction flips).
pub(crate) fn radix_recursion<K, E, P, const UP_RADIX: bool, const UP_CMP: bool>(
    d: &mut [E],
    bit_no: i32,
    bit_lo: i32,
    left: SortIndex,
    right: SortIndex,
    cmp_thresh: SortIndex,
) where
    K: RadixKey,
    E: Keyed<K>,
    P: BitPartitioner<E>,
{
    if right - left <= cmp_thresh {
        insertion_sort::<K, E, UP_CMP>(d, left, right);
        return;
    }
    let split = P::partition::<UP_RADIX>(d, bit_no as u32, left, right);
    let bit_no = bit_no - 1;
    if bit_no >= bit_lo {
        radix_recursion::<K, E, P, UP_RADIX, UP_CMP>(d, bit_no, bit_lo, left, split - 1, cmp_thresh);
        radix_recursion::<K, E, P, UP_RADIX, UP_CMP>(d, bit_no, bit_lo, split, right, cmp_thresh);
    }
}

/// [`radix_recursion`] with a runtime partition direction.
#[inline]
pub(crate) fn recursion_dir<K, E, P, const UP_CMP: bool>(
    d: &mut [E],
    bit_no: i32,
    bit_lo: i32,
    left: SortIndex,
    right: SortIndex,
    cmp_thresh: SortIndex,
    up: bool,
) where
    K: RadixKey,
    E: Keyed<K>,
    P: BitPartitioner<E>,
{
    if up {
        radix_recursion::<K, E, P, true, UP_CMP>(d, bit_no, bit_lo, left, right, cmp_thresh)
    } else {
        radix_recursion::<K, E, P, false, UP_CMP>(d, bit_no, bit_lo, left, right, cmp_thresh)
    }
}

/// Head of the descent: applies the key policy's directions at the top bit,
/// then recurses into the two halves with their per-half directions.
pub(crate) fn radix_sort_range<K, E, P, const UP: bool>(
    d: &mut [E],
    bit_hi: i32,
    bit_lo: i32,
    left: SortIndex,
    right: SortIndex,
    cmp_thresh: SortIndex,
) where
    K: RadixKey,
    E: Keyed<K>,
    P: BitPartitioner<E>,
{
    if right - left <= cmp_thresh {
        insertion_sort::<K, E, UP>(d, left, right);
        return;
    }
    let dirs = K::directions(UP);
    let split = partition_dir::<E, P>(d, bit_hi as u32, left, right, dirs.high);
    let bit_no = bit_hi - 1;
    if bit_no >= bit_lo {
        recursion_dir::<K, E, P, UP>(d, bit_no, bit_lo, left, split - 1, cmp_thresh, dirs.left);
        recursion_dir::<K, E, P, UP>(d, bit_no, bit_lo, split, right, cmp_thresh, dirs.right);
    }
}

/// Sort `d[left..=right]` with the scalar bit partitioner.
///
/// `K` is the key type, `E` the element word carrying it, `UP` the
/// direction (`true` = ascending). Ranges of `cmp_thresh + 1` elements or
/// fewer are insertion sorted. Requires `0 <= left <= right + 1 <= d.len()`.
pub fn sort_sequential<K, E, const UP: bool>(
    d: &mut [E],
    left: SortIndex,
    right: SortIndex,
    cmp_thresh: SortIndex,
) where
    K: RadixKey,
    E: Keyed<K>,
{
    crate::scope!("sort_sequential");
    radix_sort_range::<K, E, ScalarPartitioner, UP>(d, K::MSB as i32, 0, left, right, cmp_thresh);
}

/// Sort `d[left..=right]` with the AVX-512 bit partitioner.
///
/// Same contract as [`sort_sequential`]. Only available when the target
/// enables the required AVX-512 features.
#[cfg(all(
    target_arch = "x86_64",
    target_feature = "avx512f",
    target_feature = "avx512bw",
    target_feature = "avx512dq"
))]
pub fn sort_simd<K, E, const UP: bool>(
    d: &mut [E],
    left: SortIndex,
    right: SortIndex,
    cmp_thresh: SortIndex,
) where
    K: RadixKey,
    E: Keyed<K> + SimdLanes,
{
    crate::scope!("sort_simd");
    radix_sort_range::<K, E, SimdPartitioner, UP>(d, K::MSB as i32, 0, left, right, cmp_thresh);
}
