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

//! The ordered list of diff blocks and the buffer slots they refer to.
#![allow(missing_docs)]

use slab::Slab;

use crate::store::{BufferId, LineStore};
use crate::LineNr;

/// Maximum number of buffers taking part in one diff.
pub const MAX_BUFS: usize = 4;

/// A region where the buffers differ.
///
/// For each active slot `i`, the region covers lines
/// `lnum[i]..lnum[i] + count[i]` of that buffer. A zero count means the
/// buffer has nothing there, and `lnum[i]` is then the line after the
/// position where the other buffers' lines would go. Entries of inactive
/// slots are meaningless.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DiffBlock {
    pub lnum: [LineNr; MAX_BUFS],
    pub count: [LineNr; MAX_BUFS],
    /// Set when the block was split off by line matching.
    pub is_linematched: bool,
}

impl DiffBlock {
    /// First line past the block in slot `idx`.
    pub fn end(&self, idx: usize) -> LineNr {
        self.lnum[idx] + self.count[idx]
    }

    /// Returns true if `lnum` is inside the block in slot `idx`, counting an
    /// empty block as containing the line it precedes.
    pub fn covers(&self, idx: usize, lnum: LineNr) -> bool {
        self.lnum[idx] <= lnum && lnum <= self.end(idx)
    }

    /// Returns false if the block reaches past the end of a buffer.
    ///
    /// Blocks can be off while edits are being applied and the list hasn't
    /// been recomputed yet. Code reading lines through a block must check
    /// this first.
    pub fn is_sane(&self, slots: &BufferSlots, store: &dyn LineStore) -> bool {
        slots
            .active()
            .all(|(idx, buf)| self.end(idx) - 1 <= store.line_count(buf))
    }
}

/// Stable handle of a block in a [`BlockList`].
///
/// Stays valid until the block is removed.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BlockId(usize);

#[derive(Clone, Debug)]
struct Node {
    block: DiffBlock,
    next: Option<BlockId>,
}

/// Blocks sorted by line number, in every active slot at once.
///
/// Stored as a singly linked list so blocks can be split, merged and removed
/// while a cursor to a neighbor is held.
#[derive(Clone, Debug, Default)]
pub struct BlockList {
    nodes: Slab<Node>,
    head: Option<BlockId>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first(&self) -> Option<BlockId> {
        self.head
    }

    pub fn next(&self, id: BlockId) -> Option<BlockId> {
        self.nodes[id.0].next
    }

    /// Returns the block following `prev`, or the first block if `prev` is
    /// `None`.
    pub fn after(&self, prev: Option<BlockId>) -> Option<BlockId> {
        match prev {
            Some(prev) => self.next(prev),
            None => self.head,
        }
    }

    pub fn get(&self, id: BlockId) -> &DiffBlock {
        &self.nodes[id.0].block
    }

    pub fn get_mut(&mut self, id: BlockId) -> &mut DiffBlock {
        &mut self.nodes[id.0].block
    }

    /// Returns the block if it hasn't been removed.
    pub fn try_get(&self, id: BlockId) -> Option<&DiffBlock> {
        self.nodes.get(id.0).map(|node| &node.block)
    }

    /// Links `block` after `prev`, or at the front if `prev` is `None`.
    pub fn insert_after(&mut self, prev: Option<BlockId>, block: DiffBlock) -> BlockId {
        let next = self.after(prev);
        let id = BlockId(self.nodes.insert(Node { block, next }));
        match prev {
            Some(prev) => self.nodes[prev.0].next = Some(id),
            None => self.head = Some(id),
        }
        id
    }

    /// Unlinks the block following `prev` (the first block if `prev` is
    /// `None`) and returns it.
    pub fn remove_after(&mut self, prev: Option<BlockId>) -> Option<DiffBlock> {
        let id = self.after(prev)?;
        let node = self.nodes.remove(id.0);
        match prev {
            Some(prev) => self.nodes[prev.0].next = node.next,
            None => self.head = node.next,
        }
        Some(node.block)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Iterates over the block handles in order.
    pub fn ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        std::iter::successors(self.head, |&id| self.next(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiffBlock> + '_ {
        self.ids().map(|id| self.get(id))
    }

    /// Returns the last block for which `pred` holds, assuming it holds for a
    /// prefix of the list.
    pub fn last_where(&self, mut pred: impl FnMut(&DiffBlock) -> bool) -> Option<BlockId> {
        self.ids().take_while(|&id| pred(self.get(id))).last()
    }

    /// Checks [`DiffBlock::is_sane()`] for every block.
    pub fn is_sane(&self, slots: &BufferSlots, store: &dyn LineStore) -> bool {
        self.iter().all(|block| block.is_sane(slots, store))
    }
}

/// The buffers taking part in a diff, by slot.
///
/// Slot numbers index the `lnum` and `count` arrays of the blocks. The first
/// active slot is the reference every other buffer is compared against.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BufferSlots([Option<BufferId>; MAX_BUFS]);

impl BufferSlots {
    pub fn get(&self, idx: usize) -> Option<BufferId> {
        self.0[idx]
    }

    pub fn set(&mut self, idx: usize, buf: Option<BufferId>) {
        self.0[idx] = buf;
    }

    pub fn slot_of(&self, buf: BufferId) -> Option<usize> {
        self.0.iter().position(|&slot| slot == Some(buf))
    }

    pub fn free_slot(&self) -> Option<usize> {
        self.0.iter().position(Option::is_none)
    }

    /// Slots holding a buffer, with the buffer, in slot order.
    pub fn active(&self) -> impl Iterator<Item = (usize, BufferId)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.map(|buf| (idx, buf)))
    }

    pub fn active_count(&self) -> usize {
        self.0.iter().flatten().count()
    }

    /// The reference slot.
    pub fn first(&self) -> Option<usize> {
        self.active().map(|(idx, _)| idx).next()
    }

    /// Active slots other than `idx`.
    pub fn others(&self, idx: usize) -> impl Iterator<Item = (usize, BufferId)> + '_ {
        self.active().filter(move |&(other, _)| other != idx)
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools as _;

    use super::*;

    fn block(lnum: LineNr, count: LineNr) -> DiffBlock {
        DiffBlock {
            lnum: [lnum; MAX_BUFS],
            count: [count; MAX_BUFS],
            is_linematched: false,
        }
    }

    fn starts(list: &BlockList) -> Vec<LineNr> {
        list.iter().map(|block| block.lnum[0]).collect_vec()
    }

    #[test]
    fn test_insert_and_remove() {
        let mut list = BlockList::new();
        assert!(list.is_empty());
        let b5 = list.insert_after(None, block(5, 1));
        let b1 = list.insert_after(None, block(1, 1));
        let b9 = list.insert_after(Some(b5), block(9, 2));
        list.insert_after(Some(b1), block(3, 0));
        assert_eq!(starts(&list), vec![1, 3, 5, 9]);
        assert_eq!(list.len(), 4);

        assert_eq!(list.remove_after(Some(b1)), Some(block(3, 0)));
        assert_eq!(starts(&list), vec![1, 5, 9]);
        assert_eq!(list.remove_after(None), Some(block(1, 1)));
        assert_eq!(starts(&list), vec![5, 9]);
        assert_eq!(list.try_get(b1), None);
        assert_eq!(list.try_get(b9), Some(&block(9, 2)));
        assert_eq!(list.remove_after(Some(b9)), None);

        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.first(), None);
    }

    #[test]
    fn test_last_where() {
        let mut list = BlockList::new();
        let a = list.insert_after(None, block(2, 1));
        let b = list.insert_after(Some(a), block(6, 1));
        list.insert_after(Some(b), block(10, 1));
        assert_eq!(list.last_where(|block| block.lnum[0] <= 1), None);
        assert_eq!(list.last_where(|block| block.lnum[0] <= 7), Some(b));
    }

    #[test]
    fn test_block_end_and_covers() {
        let empty = block(4, 0);
        assert_eq!(empty.end(1), 4);
        assert!(empty.covers(1, 4));
        assert!(!empty.covers(1, 3));
        let two = block(4, 2);
        assert!(two.covers(0, 6));
        assert!(!two.covers(0, 7));
    }

    #[test]
    fn test_slots() {
        let mut slots = BufferSlots::default();
        assert_eq!(slots.first(), None);
        slots.set(1, Some(BufferId(7)));
        slots.set(3, Some(BufferId(2)));
        assert_eq!(slots.first(), Some(1));
        assert_eq!(slots.free_slot(), Some(0));
        assert_eq!(slots.slot_of(BufferId(2)), Some(3));
        assert_eq!(slots.slot_of(BufferId(5)), None);
        assert_eq!(slots.active_count(), 2);
        assert_eq!(slots.others(1).collect_vec(), vec![(3, BufferId(2))]);
    }
}
