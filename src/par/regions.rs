//! Region stitching for parallel bit-level partitions.
//!
//! When one bit-level partition is split across workers, each worker returns
//! a [`Region`]: its sub-range plus the split point it produced. The regions
//! cover the master's range contiguously, each with a 0-side prefix and a
//! 1-side suffix, but 0- and 1-runs still alternate across region borders.
//! The stitcher swaps misplaced runs until a single global split point
//! remains, without ever moving an element that is already on its side.

use std::collections::VecDeque;
use std::ptr;

use crate::SortIndex;

/// Result of one worker's partition: `[left, right]` with split point
/// `split` (elements of the left side occupy `[left, split - 1]`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Region {
    pub left: SortIndex,
    pub split: SortIndex,
    pub right: SortIndex,
}

impl Region {
    pub fn new(left: SortIndex, split: SortIndex, right: SortIndex) -> Self {
        Self { left, split, right }
    }
}

/// A run of elements inside a region that all belong to one side of the
/// global partition: 0 = left side, 1 = right side.
#[derive(Clone, Copy, Debug)]
struct Block {
    left: SortIndex,
    size: SortIndex,
    side: u8,
}

/// Swap the non-overlapping ranges `[left1, left1 + size)` and
/// `[left2, left2 + size)`.
///
/// # Safety
///
/// Both ranges must be in bounds of the buffer behind `d`, disjoint, and
/// exclusively owned by the caller.
unsafe fn swap_ranges<E>(d: *mut E, left1: SortIndex, left2: SortIndex, size: SortIndex) {
    ptr::swap_nonoverlapping(
        d.offset(left1 as isize),
        d.offset(left2 as isize),
        size as usize,
    );
}

/// Merge adjacent, individually partitioned regions into one partition and
/// return the global split point.
///
/// Scans blocks from both ends of the deque: from the front, 0-side blocks
/// are already in place and only advance the split point; from the back,
/// 1-side blocks are already in place. A 1-side block found from the front
/// and a 0-side block found from the back overlap-swap, and the larger
/// block's residue re-enters the deque on its own end, so the deque stays
/// ordered by starting index. Finding only a back block is impossible: if
/// every remaining block were 0-side the front scan would have consumed
/// them all.
///
/// # Safety
///
/// `d` must point at the buffer the regions index into, the regions must be
/// adjacent and in bounds, and the caller must own `[regions.first().left,
/// regions.last().right]` exclusively.
pub(crate) unsafe fn stitch_regions<E>(d: *mut E, regions: &[Region]) -> SortIndex {
    crate::scope!("stitch_regions");
    let mut overall_split = 0;

    // A region becomes at most two blocks; empty sides are not queued.
    let mut blocks: VecDeque<Block> = VecDeque::with_capacity(regions.len() * 2);
    for r in regions {
        let l_size = r.split - r.left;
        if l_size > 0 {
            blocks.push_back(Block {
                left: r.left,
                size: l_size,
                side: 0,
            });
        }
        let r_size = r.right + 1 - r.split;
        if r_size > 0 {
            blocks.push_back(Block {
                left: r.split,
                size: r_size,
                side: 1,
            });
        }
    }

    while !blocks.is_empty() {
        // From the left, find a block that belongs to the right side.
        // Blocks already on the correct side advance the split past them.
        let mut l_blk = None;
        while let Some(blk) = blocks.pop_front() {
            if blk.side == 1 {
                l_blk = Some(blk);
                break;
            }
            overall_split = blk.left + blk.size;
        }

        // From the right, find a block that belongs to the left side.
        let mut r_blk = None;
        while let Some(blk) = blocks.pop_back() {
            if blk.side == 0 {
                r_blk = Some(blk);
                break;
            }
        }

        match (l_blk, r_blk) {
            (Some(l), Some(r)) => {
                let overlap = l.size.min(r.size);
                let rest = l.size.max(r.size) - overlap;
                overall_split = l.left + overlap;
                if l.size < r.size {
                    // Swap against the tail of the larger right block; its
                    // head stays where it is and re-enters as a 0-side rest.
                    swap_ranges(d, l.left, r.left + rest, overlap);
                    blocks.push_back(Block {
                        left: r.left,
                        size: rest,
                        side: 0,
                    });
                } else if l.size > r.size {
                    swap_ranges(d, l.left, r.left, overlap);
                    blocks.push_front(Block {
                        left: l.left + overlap,
                        size: rest,
                        side: 1,
                    });
                } else {
                    swap_ranges(d, l.left, r.left, overlap);
                }
            }
            (Some(l), None) => {
                // Everything after this block was already on the right side.
                overall_split = l.left;
            }
            (None, Some(_)) => unreachable!("right-side scan found a block the left scan missed"),
            (None, None) => {}
        }
    }

    overall_split
}
