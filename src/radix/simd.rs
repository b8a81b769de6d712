//! AVX-512 bit partitioner based on masked compress stores.
//!
//! The partitioner walks the largest lane-aligned middle of the range with
//! 512-bit vectors, reading each element once and writing it once. A single
//! scratch vector holds the one block that has been read but not yet stored;
//! every loop step tests one vector against the bit mask, compresses the
//! clear lanes to the left write cursor and the set lanes to the right write
//! cursor, and reloads exactly one side into the scratch register. The
//! residual tail (up to one vector's worth of elements that never formed a
//! full block) is finished by the scalar partitioner with a right limit.
//!
//! Only compiled when the target enables `avx512f`, `avx512bw` and
//! `avx512dq`; 1- and 2-byte lanes additionally need the `avx512vbmi2`
//! compress instructions. 128-bit elements are emulated on 64-bit lanes: the
//! test mask is spread to lane pairs (`k | k << 1`) and its population count
//! halved.

use std::arch::x86_64::*;

use crate::radix::key::ElementBits;
use crate::radix::scalar::partition_bit_right_limited;
use crate::{range_len, SortIndex};

/// Per-width table of the vector operations the partitioner needs.
///
/// `Mask` is the lane mask produced by testing a vector against the bit
/// mask; one mask bit per lane, except for the emulated 128-bit case where a
/// lane owns two adjacent bits.
pub trait SimdLanes: ElementBits {
    type Mask: Copy;

    /// Lanes per 512-bit vector, `64 / size_of::<Self>()`.
    const LANES: SortIndex;

    unsafe fn splat(value: Self) -> __m512i;
    unsafe fn load(p: *const Self) -> __m512i;
    /// Lane mask of the lanes whose bits under `mask` are not all zero.
    unsafe fn test_bits(v: __m512i, mask: __m512i) -> Self::Mask;
    fn mask_not(m: Self::Mask) -> Self::Mask;
    /// Number of selected lanes.
    fn mask_popcnt(m: Self::Mask) -> SortIndex;
    /// Write the selected lanes of `v` contiguously to `p`.
    unsafe fn compress_store(p: *mut Self, m: Self::Mask, v: __m512i);
}

impl SimdLanes for u64 {
    type Mask = __mmask8;
    const LANES: SortIndex = 8;

    #[inline(always)]
    unsafe fn splat(value: Self) -> __m512i {
        _mm512_set1_epi64(value as i64)
    }

    #[inline(always)]
    unsafe fn load(p: *const Self) -> __m512i {
        _mm512_loadu_si512(p as *const _)
    }

    #[inline(always)]
    unsafe fn test_bits(v: __m512i, mask: __m512i) -> Self::Mask {
        _mm512_test_epi64_mask(v, mask)
    }

    #[inline(always)]
    fn mask_not(m: Self::Mask) -> Self::Mask {
        !m
    }

    #[inline(always)]
    fn mask_popcnt(m: Self::Mask) -> SortIndex {
        m.count_ones() as SortIndex
    }

    #[inline(always)]
    unsafe fn compress_store(p: *mut Self, m: Self::Mask, v: __m512i) {
        _mm512_mask_compressstoreu_epi64(p as *mut _, m, v)
    }
}

impl SimdLanes for u32 {
    type Mask = __mmask16;
    const LANES: SortIndex = 16;

    #[inline(always)]
    unsafe fn splat(value: Self) -> __m512i {
        _mm512_set1_epi32(value as i32)
    }

    #[inline(always)]
    unsafe fn load(p: *const Self) -> __m512i {
        _mm512_loadu_si512(p as *const _)
    }

    #[inline(always)]
    unsafe fn test_bits(v: __m512i, mask: __m512i) -> Self::Mask {
        _mm512_test_epi32_mask(v, mask)
    }

    #[inline(always)]
    fn mask_not(m: Self::Mask) -> Self::Mask {
        !m
    }

    #[inline(always)]
    fn mask_popcnt(m: Self::Mask) -> SortIndex {
        m.count_ones() as SortIndex
    }

    #[inline(always)]
    unsafe fn compress_store(p: *mut Self, m: Self::Mask, v: __m512i) {
        _mm512_mask_compressstoreu_epi32(p as *mut _, m, v)
    }
}

#[cfg(target_feature = "avx512vbmi2")]
impl SimdLanes for u16 {
    type Mask = __mmask32;
    const LANES: SortIndex = 32;

    #[inline(always)]
    unsafe fn splat(value: Self) -> __m512i {
        _mm512_set1_epi16(value as i16)
    }

    #[inline(always)]
    unsafe fn load(p: *const Self) -> __m512i {
        _mm512_loadu_si512(p as *const _)
    }

    #[inline(always)]
    unsafe fn test_bits(v: __m512i, mask: __m512i) -> Self::Mask {
        _mm512_test_epi16_mask(v, mask)
    }

    #[inline(always)]
    fn mask_not(m: Self::Mask) -> Self::Mask {
        !m
    }

    #[inline(always)]
    fn mask_popcnt(m: Self::Mask) -> SortIndex {
        m.count_ones() as SortIndex
    }

    #[inline(always)]
    unsafe fn compress_store(p: *mut Self, m: Self::Mask, v: __m512i) {
        _mm512_mask_compressstoreu_epi16(p as *mut _, m, v)
    }
}

#[cfg(target_feature = "avx512vbmi2")]
impl SimdLanes for u8 {
    type Mask = __mmask64;
    const LANES: SortIndex = 64;

    #[inline(always)]
    unsafe fn splat(value: Self) -> __m512i {
        _mm512_set1_epi8(value as i8)
    }

    #[inline(always)]
    unsafe fn load(p: *const Self) -> __m512i {
        _mm512_loadu_si512(p as *const _)
    }

    #[inline(always)]
    unsafe fn test_bits(v: __m512i, mask: __m512i) -> Self::Mask {
        _mm512_test_epi8_mask(v, mask)
    }

    #[inline(always)]
    fn mask_not(m: Self::Mask) -> Self::Mask {
        !m
    }

    #[inline(always)]
    fn mask_popcnt(m: Self::Mask) -> SortIndex {
        m.count_ones() as SortIndex
    }

    #[inline(always)]
    unsafe fn compress_store(p: *mut Self, m: Self::Mask, v: __m512i) {
        _mm512_mask_compressstoreu_epi8(p as *mut _, m, v)
    }
}

/// Emulated 128-bit lanes: key in the low 64-bit half, payload in the high
/// half, four elements per vector.
impl SimdLanes for u128 {
    type Mask = __mmask8;
    const LANES: SortIndex = 4;

    #[inline(always)]
    unsafe fn splat(value: Self) -> __m512i {
        // Interleave the two halves so each 128-bit lane reads [low, high].
        _mm512_unpacklo_epi64(
            _mm512_set1_epi64(value as u64 as i64),
            _mm512_set1_epi64((value >> 64) as u64 as i64),
        )
    }

    #[inline(always)]
    unsafe fn load(p: *const Self) -> __m512i {
        _mm512_loadu_si512(p as *const _)
    }

    #[inline(always)]
    unsafe fn test_bits(v: __m512i, mask: __m512i) -> Self::Mask {
        // The 64-bit test also covers the payload halves, but the mask
        // vector is zero there, so only key halves can set bits. Spread each
        // key bit onto its payload neighbor so compress moves lane pairs.
        let k = _mm512_test_epi64_mask(v, mask);
        k | (k << 1)
    }

    #[inline(always)]
    fn mask_not(m: Self::Mask) -> Self::Mask {
        // Pairs stay paired under complement.
        !m
    }

    #[inline(always)]
    fn mask_popcnt(m: Self::Mask) -> SortIndex {
        (m.count_ones() >> 1) as SortIndex
    }

    #[inline(always)]
    unsafe fn compress_store(p: *mut Self, m: Self::Mask, v: __m512i) {
        _mm512_mask_compressstoreu_epi64(p as *mut _, m, v)
    }
}

/// Index just past the last whole lane block of `[left, right]`.
#[inline(always)]
fn after_last_block<E: SimdLanes>(left: SortIndex, right: SortIndex) -> SortIndex {
    left + (range_len(left, right) & !(E::LANES - 1))
}

/// Test one vector against the bit mask and assign lane masks and counts to
/// the two sides: index 0 is the left side, index 1 the right side. Under
/// `UP = true` the clear lanes go left; under `UP = false` the set lanes do.
#[inline(always)]
unsafe fn test_and_count<E: SimdLanes, const UP: bool>(
    mask_vec: __m512i,
    v: __m512i,
) -> ([E::Mask; 2], [SortIndex; 2]) {
    let up = UP as usize;
    let set = E::test_bits(v, mask_vec);
    let clear = E::mask_not(set);

    let mut sides = [clear; 2];
    sides[up] = set;
    let mut counts = [0; 2];
    counts[up] = E::mask_popcnt(set);
    counts[1 - up] = E::LANES - counts[up];
    (sides, counts)
}

/// Partition `d[left..=right]` on key bit `bit_no` with 512-bit vectors.
///
/// Same contract as the scalar [`crate::radix::scalar::partition_bit`]. The
/// cursor discipline: `read[0]` is the next unread block on the left,
/// `read[1]` one past the next unread block on the right, `write[0]` the
/// next free slot on the left, `write[1]` one past the last slot written on
/// the right. One vector is always "in hand", so after storing both sides
/// exactly one side has room for a reload; when both would have room, the
/// right side reload is forced to keep the invariant.
pub(crate) fn partition_bit_simd<E, const UP: bool>(
    d: &mut [E],
    bit_no: u32,
    left: SortIndex,
    right: SortIndex,
) -> SortIndex
where
    E: SimdLanes,
{
    debug_assert!(0 <= left && left <= right + 1 && right < d.len() as SortIndex);

    let lanes = E::LANES;
    let base = d.as_mut_ptr();

    let mut read = [left, after_last_block::<E>(left, right)];
    let mut write = [left, read[1]];
    // Start of the residual tail that never forms a whole block.
    let pos_seq = read[1];

    unsafe {
        let mask_vec = E::splat(E::bit(bit_no));
        let mut store = _mm512_setzero_si512();

        // At least one whole block? Preload it from the right so the loop
        // always has a free vector's worth of space.
        if read[0] < read[1] {
            store = E::load(base.offset((read[1] - lanes) as isize));
        }
        // Adjusted even when nothing was loaded, so the no-block case takes
        // the same exit path as the others.
        read[1] -= lanes;

        while read[0] < read[1] {
            let current = store;
            let (sides, counts) = test_and_count::<E, UP>(mask_vec, current);

            // Exactly one side must be reloaded before its store; if both
            // have room, load the right side.
            let load_right = (write[1] - counts[1]) < read[1];

            if !load_right {
                store = E::load(base.offset(read[0] as isize));
                read[0] += lanes;
            }
            E::compress_store(base.offset(write[0] as isize), sides[0], current);
            write[0] += counts[0];

            if load_right {
                read[1] -= lanes;
                store = E::load(base.offset(read[1] as isize));
            }
            write[1] -= counts[1];
            E::compress_store(base.offset(write[1] as isize), sides[1], current);
        }

        // One unprocessed vector left in hand: store both sides, no reload.
        // The write cursors meet exactly.
        if read[0] == read[1] {
            let (sides, counts) = test_and_count::<E, UP>(mask_vec, store);
            E::compress_store(base.offset(write[0] as isize), sides[0], store);
            write[0] += counts[0];
            write[1] -= counts[1];
            E::compress_store(base.offset(write[1] as isize), sides[1], store);
        }
    }

    // The stored left part ends at write[0]; everything from there up to
    // pos_seq is stored right-side data, and [pos_seq, right] is the raw
    // tail. The limited scalar sweep merges the two.
    partition_bit_right_limited::<E, UP>(d, bit_no, write[0], pos_seq, right)
}
