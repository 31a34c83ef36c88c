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

//! Keeping the blocks in place while a buffer is edited.
//!
//! Recomputing the diff after every keystroke is too slow for an external
//! diff program, so edits move, grow and shrink the blocks they touch
//! instead. The result is close to what a recompute would give, and the next
//! recompute fixes what isn't.

use crate::block::BlockId;
use crate::block::BlockList;
use crate::block::BufferSlots;
use crate::block::DiffBlock;
use crate::compare::lines_equal;
use crate::compare::CompareFlags;
use crate::store::LineStore;
use crate::LineNr;

/// Line number meaning "up to the end of the buffer".
pub const MAXLNUM: LineNr = LineNr::MAX;

/// An edit as reported by the buffer: lines `line1..=line2` moved by
/// `amount`, and the lines below `line2` by `amount_after`.
///
/// `line2 == MAXLNUM` means lines were inserted before `line1`. Otherwise
/// lines `line1..=line2` were deleted (`amount_after < 0`) or lines were
/// inserted below them (`amount_after > 0`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LineAdjustment {
    /// First line of the edit.
    pub line1: LineNr,
    /// Last line of the edit, `MAXLNUM` for an insertion.
    pub line2: LineNr,
    /// Amount the lines of the range moved, `MAXLNUM` if they were deleted.
    pub amount: LineNr,
    /// Amount the lines below the range moved.
    pub amount_after: LineNr,
}

impl LineAdjustment {
    /// `count` lines were inserted below line `after`.
    pub fn inserted(after: LineNr, count: LineNr) -> Self {
        LineAdjustment {
            line1: after + 1,
            line2: MAXLNUM,
            amount: count,
            amount_after: 0,
        }
    }

    /// `count` lines starting at `first` were deleted.
    pub fn deleted(first: LineNr, count: LineNr) -> Self {
        LineAdjustment {
            line1: first,
            line2: first + count - 1,
            amount: MAXLNUM,
            amount_after: -count,
        }
    }

    /// Number of lines inserted and deleted.
    fn line_delta(&self) -> (LineNr, LineNr) {
        if self.line2 == MAXLNUM {
            (self.amount, 0)
        } else if self.amount_after > 0 {
            (self.amount_after, 0)
        } else {
            (0, -self.amount_after)
        }
    }
}

/// What the adjustment reads to compare lines.
#[derive(Clone, Copy)]
pub struct AdjustContext<'a> {
    /// Buffers taking part in the diff.
    pub slots: &'a BufferSlots,
    /// Text of the buffers, after the edit.
    pub store: &'a dyn LineStore,
    /// How lines are compared when shrinking blocks.
    pub flags: CompareFlags,
    /// No blocks are created while lines are copied between buffers.
    pub busy: bool,
}

/// Updates the blocks for an edit in slot `idx`.
///
/// An edit between blocks creates a new block holding the inserted lines,
/// with the lines the other buffers have there taken as deleted. An edit
/// touching a block changes its size in `idx` and in the other slots, and
/// blocks which then touch are merged unless line matching split them.
pub fn mark_adjust(
    list: &mut BlockList,
    ctx: &AdjustContext,
    idx: usize,
    adjustment: LineAdjustment,
) {
    let LineAdjustment {
        line1,
        line2,
        amount_after,
        ..
    } = adjustment;
    let (inserted, mut deleted) = adjustment.line_delta();
    let slots = ctx.slots;

    let mut prev: Option<BlockId> = None;
    let mut cur = list.first();
    // First line of what remains to be deleted.
    let mut lnum_deleted = line1;
    loop {
        let before_cur = cur.map_or(true, |id| {
            let block = list.get(id);
            block.lnum[idx] - 1 > line2 || (line2 == MAXLNUM && block.lnum[idx] > line1)
        });
        let after_prev = prev.map_or(true, |id| list.get(id).end(idx) < line1);
        if before_cur && after_prev && !ctx.busy {
            let mut block = DiffBlock::default();
            block.lnum[idx] = line1;
            block.count[idx] = inserted;
            for (i, _) in slots.others(idx) {
                block.lnum[i] = match prev {
                    Some(prev) => {
                        let prev = list.get(prev);
                        line1 + prev.end(i) - prev.end(idx)
                    }
                    None => line1,
                };
                block.count[i] = deleted;
            }
            prev = Some(list.insert_after(prev, block));
        }

        let Some(dp) = cur else {
            break;
        };
        let next_lnum = list.next(dp).map(|next| list.get(next).lnum[idx]);
        let block = list.get_mut(dp);
        let last = block.end(idx) - 1;

        // Blocks above the edit are left alone.
        if last >= line1 - 1 {
            let touches = LineNr::from(deleted + inserted != 0);
            if block.lnum[idx] - touches > line2 {
                // Below the edit.
                if amount_after == 0 {
                    break;
                }
                block.lnum[idx] += amount_after;
            } else {
                let mut shrink = false;
                if deleted > 0 {
                    let (off, n);
                    if block.lnum[idx] >= line1 {
                        off = block.lnum[idx] - lnum_deleted;
                        if last <= line2 {
                            // All lines of the block deleted.
                            match next_lnum {
                                Some(next) if next - 1 <= line2 => {
                                    // The deletion continues into the next
                                    // block, handle the lines up to it.
                                    let upto_next = next - lnum_deleted;
                                    deleted -= upto_next;
                                    n = upto_next - block.count[idx];
                                    lnum_deleted = next;
                                }
                                _ => n = deleted - block.count[idx],
                            }
                            block.count[idx] = 0;
                        } else {
                            // Lines deleted at or just before the top.
                            n = off;
                            block.count[idx] -= line2 - block.lnum[idx] + 1;
                            shrink = true;
                        }
                        block.lnum[idx] = line1;
                    } else {
                        off = 0;
                        if last < line2 {
                            // Lines deleted at the end.
                            block.count[idx] -= last - lnum_deleted + 1;
                            match next_lnum {
                                Some(next) if next - 1 <= line2 => {
                                    n = next - 1 - last;
                                    deleted -= next - lnum_deleted;
                                    lnum_deleted = next;
                                }
                                _ => n = line2 - last,
                            }
                            shrink = true;
                        } else {
                            // Lines deleted inside.
                            n = 0;
                            block.count[idx] -= deleted;
                        }
                    }
                    for (i, _) in slots.others(idx) {
                        block.lnum[i] -= off;
                        block.count[i] += n;
                    }
                } else if block.lnum[idx] <= line1 {
                    // Lines inserted inside.
                    block.count[idx] += inserted;
                    shrink = true;
                } else {
                    block.lnum[idx] += inserted;
                }

                if shrink {
                    shrink_unchanged(block, ctx);
                }
            }
        }

        match prev {
            Some(p) if touches_prev(list, p, dp, idx) => {
                let absorbed = *list.get(dp);
                let prev_block = list.get_mut(p);
                for (i, _) in slots.active() {
                    prev_block.count[i] += absorbed.count[i];
                }
                list.remove_after(Some(p));
                cur = list.next(p);
            }
            _ => {
                prev = Some(dp);
                cur = list.next(dp);
            }
        }
    }

    remove_empty_blocks(list, slots);
}

fn touches_prev(list: &BlockList, prev: BlockId, cur: BlockId, idx: usize) -> bool {
    let prev = list.get(prev);
    let cur = list.get(cur);
    !prev.is_linematched && !cur.is_linematched && prev.end(idx) == cur.lnum[idx]
}

/// Removes blocks with no lines in any buffer.
pub fn remove_empty_blocks(list: &mut BlockList, slots: &BufferSlots) {
    let mut prev = None;
    let mut cur = list.first();
    while let Some(id) = cur {
        let block = list.get(id);
        if slots.active().all(|(i, _)| block.count[i] == 0) {
            list.remove_after(prev);
            cur = list.after(prev);
        } else {
            prev = Some(id);
            cur = list.next(id);
        }
    }
}

/// Peels lines off the top and the bottom of the block while they are equal
/// in all buffers. May leave a block without lines.
pub fn shrink_unchanged(block: &mut DiffBlock, ctx: &AdjustContext) {
    let slots = ctx.slots;
    let Some((i_org, buf_org)) = slots.active().next() else {
        return;
    };
    if !block.is_sane(slots, ctx.store) {
        return;
    }
    for from_bottom in [false, true] {
        while block.count[i_org] > 0 {
            let offset = |i: usize| if from_bottom { block.count[i] - 1 } else { 0 };
            let Some(line_org) = ctx.store.line(buf_org, block.lnum[i_org] + offset(i_org)) else {
                break;
            };
            let all_equal = slots.others(i_org).all(|(i, buf)| {
                let off = offset(i);
                off >= 0
                    && off < block.count[i]
                    && ctx
                        .store
                        .line(buf, block.lnum[i] + off)
                        .is_some_and(|line| lines_equal(ctx.flags, line_org, line))
            });
            if !all_equal {
                break;
            }
            for (i, _) in slots.active() {
                if !from_bottom {
                    block.lnum[i] += 1;
                }
                block.count[i] -= 1;
            }
        }
    }
}
