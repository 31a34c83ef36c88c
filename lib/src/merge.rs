// Copyright 2024 The Jujutsu Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Folding the hunks of one buffer pair into the block list.

use crate::block::BlockId;
use crate::block::BlockList;
use crate::block::BufferSlots;
use crate::block::DiffBlock;
use crate::hunk::Hunk;

/// Sets the range of slot `idx_new` in block `id` assuming its text equals
/// that of `idx_orig` there. The offset between the two buffers is taken
/// from the end of the previous block.
fn copy_entry(
    list: &mut BlockList,
    prev: Option<BlockId>,
    id: BlockId,
    idx_orig: usize,
    idx_new: usize,
) {
    let off = prev.map_or(0, |prev| {
        let prev = list.get(prev);
        prev.end(idx_orig) - prev.end(idx_new)
    });
    let block = list.get_mut(id);
    block.lnum[idx_new] = block.lnum[idx_orig] - off;
    block.count[idx_new] = block.count[idx_orig];
}

/// Merges the hunks between slots `idx_orig` and `idx_new` into `list`.
///
/// The list already describes the differences between `idx_orig` and every
/// active slot before `idx_new`. The hunks must be sorted and must not
/// overlap. Where a hunk overlaps existing blocks, those blocks are joined
/// and widened to cover the hunk. Blocks no hunk touches get the range of
/// `idx_new` derived from `idx_orig`, since the two are equal there.
pub fn fold_hunks(
    list: &mut BlockList,
    slots: &BufferSlots,
    idx_orig: usize,
    idx_new: usize,
    hunks: &[Hunk],
) {
    // Slots already merged into the list, which are widened along with the
    // original.
    let merged: Vec<usize> = (idx_orig..idx_new)
        .filter(|&i| slots.get(i).is_some())
        .collect();
    let mut prev: Option<BlockId> = None;
    let mut cur = list.first();
    // Whether the range of `idx_new` in `cur` is still unset.
    let mut notset = true;

    for hunk in hunks {
        while let Some(id) = cur {
            if hunk.orig_start <= list.get(id).end(idx_orig) {
                break;
            }
            if notset {
                copy_entry(list, prev, id, idx_orig, idx_new);
            }
            prev = Some(id);
            cur = list.next(id);
            notset = true;
        }

        match cur {
            Some(dp) if hunk.orig_end() >= list.get(dp).lnum[idx_orig] => {
                let mut dpl = dp;
                while let Some(next) = list.next(dpl) {
                    if hunk.orig_end() < list.get(next).lnum[idx_orig] {
                        break;
                    }
                    dpl = next;
                }

                let block = list.get_mut(dp);
                let off = block.lnum[idx_orig] - hunk.orig_start;
                if off > 0 {
                    // The hunk starts before the block. Move the start back.
                    for &i in &merged {
                        block.lnum[i] -= off;
                        block.count[i] += off;
                    }
                    block.lnum[idx_new] = hunk.new_start;
                    block.count[idx_new] = hunk.new_count;
                } else if notset {
                    block.lnum[idx_new] = hunk.new_start + off;
                    block.count[idx_new] = hunk.new_count - off;
                } else {
                    // Another hunk in the same block. The first one widened
                    // the block to its end assuming equal sizes, so account
                    // for the size change of this hunk.
                    let orig_size_in_block = hunk
                        .orig_count
                        .min(block.end(idx_orig) - hunk.orig_start);
                    block.count[idx_new] += hunk.new_count - orig_size_in_block;
                    let overhang = hunk.new_end() - block.end(idx_new);
                    if overhang > 0 {
                        block.count[idx_new] += overhang;
                    }
                }

                // Extend to the end of the last block or the hunk, whichever
                // ends last.
                let mut off = hunk.orig_end() - list.get(dpl).end(idx_orig);
                if off < 0 {
                    if notset || dp != dpl {
                        list.get_mut(dp).count[idx_new] += -off;
                    }
                    off = 0;
                }
                let last = *list.get(dpl);
                let block = list.get_mut(dp);
                for &i in &merged {
                    block.count[i] = last.end(i) - block.lnum[i] + off;
                }

                if dp != dpl {
                    let stop = list.next(dpl);
                    while list.next(dp) != stop {
                        list.remove_after(Some(dp));
                    }
                }
            }
            _ => {
                let mut block = DiffBlock::default();
                block.lnum[idx_orig] = hunk.orig_start;
                block.count[idx_orig] = hunk.orig_count;
                block.lnum[idx_new] = hunk.new_start;
                block.count[idx_new] = hunk.new_count;
                // Slots between are equal to the original here, or there
                // would be a block already.
                let off_of = |i: usize| {
                    prev.map_or(0, |prev| {
                        let prev = list.get(prev);
                        prev.end(idx_orig) - prev.end(i)
                    })
                };
                for &i in merged.iter().filter(|&&i| i != idx_orig) {
                    block.lnum[i] = block.lnum[idx_orig] - off_of(i);
                    block.count[i] = block.count[idx_orig];
                }
                cur = Some(list.insert_after(prev, block));
            }
        }
        notset = false;
    }

    while let Some(id) = cur {
        if notset {
            copy_entry(list, prev, id, idx_orig, idx_new);
        }
        prev = Some(id);
        cur = list.next(id);
        notset = true;
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools as _;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::store::BufferId;
    use crate::LineNr;

    fn slots(count: usize) -> BufferSlots {
        let mut slots = BufferSlots::default();
        for i in 0..count {
            slots.set(i, Some(BufferId(i as u32)));
        }
        slots
    }

    /// Blocks as `(lnum, count)` per slot.
    fn ranges(list: &BlockList, width: usize) -> Vec<Vec<(LineNr, LineNr)>> {
        list.iter()
            .map(|block| (0..width).map(|i| (block.lnum[i], block.count[i])).collect())
            .collect_vec()
    }

    fn list_of(blocks: &[&[(LineNr, LineNr)]]) -> BlockList {
        let mut list = BlockList::new();
        let mut prev = None;
        for ranges in blocks {
            let mut block = DiffBlock::default();
            for (i, &(lnum, count)) in ranges.iter().enumerate() {
                block.lnum[i] = lnum;
                block.count[i] = count;
            }
            prev = Some(list.insert_after(prev, block));
        }
        list
    }

    #[test]
    fn test_first_pair_builds_list() {
        let mut list = BlockList::new();
        fold_hunks(
            &mut list,
            &slots(2),
            0,
            1,
            &[Hunk::new(2, 1, 2, 1), Hunk::new(5, 0, 5, 2)],
        );
        assert_eq!(
            ranges(&list, 2),
            vec![vec![(2, 1), (2, 1)], vec![(5, 0), (5, 2)]]
        );
    }

    #[test]
    fn test_untouched_blocks_are_translated() {
        let mut list = list_of(&[&[(2, 1), (2, 3)], &[(8, 1), (10, 1)]]);
        fold_hunks(&mut list, &slots(3), 0, 2, &[Hunk::new(5, 1, 5, 1)]);
        assert_eq!(
            ranges(&list, 3),
            vec![
                vec![(2, 1), (2, 3), (2, 1)],
                vec![(5, 1), (7, 1), (5, 1)],
                vec![(8, 1), (10, 1), (8, 1)],
            ]
        );
    }

    #[test]
    fn test_hunk_inside_block() {
        let mut list = list_of(&[&[(2, 2), (2, 1)]]);
        fold_hunks(&mut list, &slots(3), 0, 2, &[Hunk::new(3, 1, 3, 3)]);
        assert_eq!(ranges(&list, 3), vec![vec![(2, 2), (2, 1), (2, 4)]]);
    }

    #[test]
    fn test_hunk_starts_before_block() {
        let mut list = list_of(&[&[(3, 1), (3, 1)]]);
        fold_hunks(&mut list, &slots(3), 0, 2, &[Hunk::new(2, 2, 2, 2)]);
        assert_eq!(ranges(&list, 3), vec![vec![(2, 2), (2, 2), (2, 2)]]);
    }

    #[test]
    fn test_two_hunks_in_one_block() {
        let mut list = list_of(&[&[(2, 3), (2, 3)]]);
        fold_hunks(
            &mut list,
            &slots(3),
            0,
            2,
            &[Hunk::new(2, 1, 2, 2), Hunk::new(4, 1, 5, 1)],
        );
        assert_eq!(ranges(&list, 3), vec![vec![(2, 3), (2, 3), (2, 4)]]);
    }

    #[test]
    fn test_hunk_joins_blocks() {
        let mut list = list_of(&[&[(2, 1), (2, 1)], &[(5, 1), (5, 1)], &[(9, 1), (9, 1)]]);
        fold_hunks(&mut list, &slots(3), 0, 2, &[Hunk::new(2, 4, 2, 4)]);
        assert_eq!(
            ranges(&list, 3),
            vec![vec![(2, 4), (2, 4), (2, 4)], vec![(9, 1), (9, 1), (9, 1)]]
        );
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_inactive_slot_is_skipped() {
        let mut slots = slots(3);
        slots.set(1, None);
        let mut list = BlockList::new();
        fold_hunks(&mut list, &slots, 0, 2, &[Hunk::new(1, 1, 1, 2)]);
        let blocks = list.iter().collect_vec();
        assert_eq!(blocks.len(), 1);
        let block = blocks[0];
        assert_eq!((block.lnum[2], block.count[2]), (1, 2));
        assert_eq!(block.count[1], 0);
    }
}
