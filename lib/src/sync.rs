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

//! Read-only queries mapping lines and views between the buffers of a
//! session: filler lines, scroll binding, jumps and intra-line changes.
//!
//! The queries trust the current blocks. Callers refresh an invalid session
//! first.

#![allow(missing_docs)]

use crate::block::BlockId;
use crate::block::DiffBlock;
use crate::compare::is_white;
use crate::compare::lines_equal;
use crate::linematch::linematch_block;
use crate::linematch::should_linematch;
use crate::session::DiffSession;
use crate::store::BufferId;
use crate::store::LineStore;
use crate::LineNr;

/// How a line is rendered.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LineStatus {
    /// Outside any block, or equal in every buffer.
    Unchanged,
    /// Differs from the line in another buffer.
    Changed,
    /// Missing in some other buffer.
    Added,
}

/// Result of [`DiffSession::check()`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FillerInfo {
    /// Number of filler rows to show above the line.
    pub filler: LineNr,
    pub status: LineStatus,
}

impl FillerInfo {
    pub(crate) const NONE: FillerInfo = FillerInfo {
        filler: 0,
        status: LineStatus::Unchanged,
    };
}

/// The top of a view: its first line, the filler rows shown above it, and
/// whether the view is scrolled past the end of the buffer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ViewTop {
    pub topline: LineNr,
    pub topfill: LineNr,
    pub botfill: bool,
}

/// The changed part of a line, from [`DiffSession::find_change()`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LineChange {
    /// No other buffer has a line to compare with.
    pub added: bool,
    /// Byte offset of the first differing byte.
    pub start: Option<usize>,
    /// Byte offset of the last differing byte. Before `start` when text was
    /// only inserted in the other line.
    pub end: Option<usize>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Direction {
    Forward,
    Backward,
}

impl DiffSession {
    /// The first block ending at or after `lnum` in slot `idx`.
    fn block_at(&self, idx: usize, lnum: LineNr) -> Option<BlockId> {
        self.blocks
            .ids()
            .find(|&id| lnum <= self.blocks.get(id).end(idx))
    }

    fn max_count(&self, block: &DiffBlock) -> LineNr {
        self.slots
            .active()
            .map(|(i, _)| block.count[i])
            .fold(0, LineNr::max)
    }

    /// Returns true if the lines of slots `idx1` and `idx2` in the block are
    /// equal.
    pub(crate) fn equal_entry(
        &self,
        store: &dyn LineStore,
        block: &DiffBlock,
        idx1: usize,
        idx2: usize,
    ) -> bool {
        if block.count[idx1] != block.count[idx2] || !block.is_sane(&self.slots, store) {
            return false;
        }
        let (Some(buf1), Some(buf2)) = (self.slots.get(idx1), self.slots.get(idx2)) else {
            return false;
        };
        let flags = self.options.compare_flags();
        (0..block.count[idx1]).all(|i| {
            lines_equal(
                flags,
                store.line(buf1, block.lnum[idx1] + i).unwrap_or_default(),
                store.line(buf2, block.lnum[idx2] + i).unwrap_or_default(),
            )
        })
    }

    /// Returns how line `lnum` of `buf` is shown, for a line in view.
    ///
    /// A block the line belongs to is line-matched first if it qualifies.
    pub fn check(&mut self, store: &dyn LineStore, buf: BufferId, lnum: LineNr) -> FillerInfo {
        if let Some(idx) = self.slots.slot_of(buf) {
            if let Some(id) = self.block_at(idx, lnum) {
                let block = self.blocks.get(id);
                if block.lnum[idx] <= lnum
                    && should_linematch(block, &self.slots, self.options.linematch)
                {
                    let iwhite = self.options.iwhite || self.options.iwhiteall;
                    linematch_block(&mut self.blocks, id, &self.slots, store, iwhite);
                }
            }
        }
        self.check_offscreen(store, buf, lnum)
    }

    /// Like [`DiffSession::check()`], but never changes the blocks. Used for
    /// lines out of view, e.g. to count filler rows above the view.
    pub fn check_offscreen(&self, store: &dyn LineStore, buf: BufferId, lnum: LineNr) -> FillerInfo {
        let Some(idx) = self.slots.slot_of(buf) else {
            return FillerInfo::NONE;
        };
        if lnum < 1 || lnum > store.line_count(buf) + 1 {
            return FillerInfo::NONE;
        }
        let Some(mut id) = self.block_at(idx, lnum) else {
            return FillerInfo::NONE;
        };
        if lnum < self.blocks.get(id).lnum[idx] {
            return FillerInfo::NONE;
        }
        let mut filler = 0;
        loop {
            let block = self.blocks.get(id);
            if lnum < block.end(idx) {
                return FillerInfo {
                    filler,
                    status: self.line_status(store, block, idx),
                };
            }
            // The line is just below the block. Line matching may have put
            // more blocks empty in `idx` at the same place.
            if self.options.filler {
                filler += self.max_count(block) - block.count[idx];
            }
            match self.blocks.next(id) {
                Some(next) if self.blocks.get(next).lnum[idx] == lnum => id = next,
                _ => break,
            }
        }
        FillerInfo {
            filler,
            status: LineStatus::Unchanged,
        }
    }

    fn line_status(&self, store: &dyn LineStore, block: &DiffBlock, idx: usize) -> LineStatus {
        let mut zero = false;
        let mut compare = false;
        for (i, _) in self.slots.others(idx) {
            if block.count[i] == 0 {
                zero = true;
            } else if block.count[i] != block.count[idx] {
                return LineStatus::Changed;
            } else {
                compare = true;
            }
        }
        if compare {
            let differs = self
                .slots
                .others(idx)
                .filter(|&(i, _)| block.count[i] != 0)
                .any(|(i, _)| !self.equal_entry(store, block, idx, i));
            if differs {
                return LineStatus::Changed;
            }
        }
        // Without a buffer missing the lines, an edit made them equal again
        // and the block just wasn't removed yet.
        if zero {
            LineStatus::Added
        } else {
            LineStatus::Unchanged
        }
    }

    /// Number of filler rows above line `lnum` of `buf`.
    pub fn fill_count(&self, store: &dyn LineStore, buf: BufferId, lnum: LineNr) -> LineNr {
        if !self.options.filler {
            return 0;
        }
        self.check_offscreen(store, buf, lnum).filler
    }

    /// Computes the top of a view on `to_buf` showing the same diffed lines
    /// as the view `from` on `from_buf`.
    pub fn topline_for(
        &self,
        store: &dyn LineStore,
        from_buf: BufferId,
        from: ViewTop,
        to_buf: BufferId,
    ) -> Option<ViewTop> {
        let from_idx = self.slots.slot_of(from_buf)?;
        let to_idx = self.slots.slot_of(to_buf)?;
        let lnum = from.topline;
        let mut top = ViewTop::default();
        match self.block_at(from_idx, lnum) {
            None => {
                // Past the last block, count from the end.
                top.topline = store.line_count(to_buf) - (store.line_count(from_buf) - lnum);
            }
            Some(id) => {
                let block = self.blocks.get(id);
                top.topline = lnum + (block.lnum[to_idx] - block.lnum[from_idx]);
                if lnum >= block.lnum[from_idx] {
                    let max_count = self.max_count(block);
                    let from_count = block.count[from_idx];
                    let to_count = block.count[to_idx];
                    if to_count == from_count {
                        top.topfill = from.topfill;
                    } else if to_count > from_count {
                        if lnum == block.end(from_idx) {
                            // `from` shows only filler rows of the block.
                            if max_count - from.topfill >= to_count {
                                top.topline = block.end(to_idx);
                                top.topfill = from.topfill;
                            } else {
                                top.topline = block.lnum[to_idx] + max_count - from.topfill;
                            }
                        }
                    } else if top.topline >= block.end(to_idx) {
                        top.topline = block.end(to_idx);
                        if self.options.filler {
                            top.topfill = if lnum == block.end(from_idx) {
                                from.topfill
                            } else {
                                block.lnum[from_idx] + max_count - lnum
                            };
                        }
                    }
                }
            }
        }

        let line_count = store.line_count(to_buf);
        if top.topline > line_count {
            top.topline = line_count;
            top.botfill = true;
        }
        if top.topline < 1 {
            top.topline = 1;
            top.topfill = 0;
        }
        Some(top)
    }

    /// Returns the line of `to_buf` closest to line `lnum` of `from_buf`.
    ///
    /// If `lnum` is just below lines only `to_buf` has and `to_cursor` is
    /// inside them, the cursor stays where it is.
    pub fn corresponding_line(
        &self,
        store: &dyn LineStore,
        from_buf: BufferId,
        lnum: LineNr,
        to_buf: BufferId,
        to_cursor: Option<LineNr>,
    ) -> LineNr {
        let line = self.corresponding_line_unclamped(from_buf, lnum, to_buf, to_cursor);
        line.min(store.line_count(to_buf))
    }

    fn corresponding_line_unclamped(
        &self,
        from_buf: BufferId,
        lnum: LineNr,
        to_buf: BufferId,
        to_cursor: Option<LineNr>,
    ) -> LineNr {
        let (Some(idx1), Some(idx2)) = (self.slots.slot_of(from_buf), self.slots.slot_of(to_buf))
        else {
            return lnum;
        };
        let mut baseline = 0;
        for block in self.blocks.iter() {
            if block.lnum[idx1] > lnum {
                return lnum - baseline;
            }
            if block.end(idx1) > lnum {
                let offset = (lnum - block.lnum[idx1]).min(block.count[idx2]);
                return block.lnum[idx2] + offset;
            }
            if block.lnum[idx1] == lnum && block.count[idx1] == 0 {
                if let Some(cursor) = to_cursor {
                    if block.lnum[idx2] <= cursor && cursor < block.end(idx2) {
                        return cursor;
                    }
                }
            }
            baseline = block.end(idx1) - block.end(idx2);
        }
        lnum - baseline
    }

    /// Translates line `lnum` of `from_buf` to `to_buf`, staying inside the
    /// block the line is in.
    pub fn lnum_in(
        &self,
        store: &dyn LineStore,
        from_buf: BufferId,
        lnum: LineNr,
        to_buf: BufferId,
    ) -> Option<LineNr> {
        let idx = self.slots.slot_of(from_buf)?;
        let i = self.slots.slot_of(to_buf)?;
        let Some(id) = self.block_at(idx, lnum) else {
            return Some(store.line_count(to_buf) - (store.line_count(from_buf) - lnum));
        };
        let block = self.blocks.get(id);
        let n = lnum + (block.lnum[i] - block.lnum[idx]);
        Some(n.min(block.end(i)))
    }

    /// Returns true if line `lnum` of `buf` is more than `context` lines
    /// away from every block, so it can be folded.
    pub fn in_fold(&self, buf: BufferId, lnum: LineNr) -> bool {
        let Some(idx) = self.slots.slot_of(buf) else {
            return false;
        };
        if self.slots.others(idx).next().is_none() {
            return false;
        }
        let context = LineNr::try_from(self.options.context).unwrap_or(LineNr::MAX / 2);
        for block in self.blocks.iter() {
            if block.lnum[idx] - context > lnum {
                break;
            }
            if block.end(idx) + context > lnum {
                return false;
            }
        }
        true
    }

    /// Finds the part of line `lnum` of `buf` that differs from the lines
    /// at the same offset in the block in the other buffers.
    ///
    /// Returns `None` if the line isn't in a block or the block is stale.
    pub fn find_change(
        &self,
        store: &dyn LineStore,
        buf: BufferId,
        lnum: LineNr,
    ) -> Option<LineChange> {
        let idx = self.slots.slot_of(buf)?;
        let block = self.blocks.get(self.block_at(idx, lnum)?);
        if lnum < block.lnum[idx] || !block.is_sane(&self.slots, store) {
            return None;
        }
        let line_org = store.line(buf, lnum)?;
        let org = line_org.as_bytes();
        let off = lnum - block.lnum[idx];
        let iwhite = self.options.iwhite;
        let iwhite_all = self.options.iwhiteall;
        let skip_white = |a: u8, b: u8| {
            let (a, b) = (is_white(char::from(a)), is_white(char::from(b)));
            (iwhite && a && b) || (iwhite_all && (a || b))
        };

        let mut added = true;
        let mut start = usize::MAX;
        let mut end: isize = -1;
        for (i, other) in self.slots.others(idx) {
            // Filler rows have nothing to compare with.
            if off >= block.count[i] {
                continue;
            }
            added = false;
            let line_new = store.line(other, block.lnum[i] + off).unwrap_or_default();
            let new = line_new.as_bytes();

            let mut si_org = 0;
            let mut si_new = 0;
            while si_org < org.len() {
                let (a, b) = (byte_at(org, si_org), byte_at(new, si_new));
                if skip_white(a, b) {
                    si_org = skip_blanks(org, si_org);
                    si_new = skip_blanks(new, si_new);
                } else {
                    if a != b {
                        break;
                    }
                    si_org += 1;
                    si_new += 1;
                }
            }
            while !line_org.is_char_boundary(si_org) {
                si_org -= 1;
            }
            while !line_new.is_char_boundary(si_new) {
                si_new -= 1;
            }
            start = start.min(si_org);

            if si_org < org.len() || si_new < new.len() {
                let start = start as isize;
                let si_new = si_new as isize;
                let mut ei_org = org.len() as isize;
                let mut ei_new = new.len() as isize;
                while ei_org >= start && ei_new >= si_new && ei_org >= 0 && ei_new >= 0 {
                    let (a, b) = (byte_at_signed(org, ei_org), byte_at_signed(new, ei_new));
                    if skip_white(a, b) {
                        while ei_org >= start && is_white(char::from(byte_at_signed(org, ei_org))) {
                            ei_org -= 1;
                        }
                        while ei_new >= si_new && is_white(char::from(byte_at_signed(new, ei_new))) {
                            ei_new -= 1;
                        }
                    } else {
                        if a != b {
                            break;
                        }
                        ei_org -= 1;
                        ei_new -= 1;
                    }
                }
                end = end.max(ei_org);
            }
        }
        Some(LineChange {
            added,
            start: (start != usize::MAX).then_some(start),
            end: usize::try_from(end).ok(),
        })
    }

    /// Returns the start of the `count`-th block below line `cursor` of
    /// `buf`, or `None` if there is no block to move to.
    pub fn next_change(
        &self,
        store: &dyn LineStore,
        buf: BufferId,
        cursor: LineNr,
        count: usize,
    ) -> Option<LineNr> {
        self.move_to(store, buf, cursor, Direction::Forward, count)
    }

    /// Returns the start of the `count`-th block above line `cursor` of
    /// `buf`.
    pub fn prev_change(
        &self,
        store: &dyn LineStore,
        buf: BufferId,
        cursor: LineNr,
        count: usize,
    ) -> Option<LineNr> {
        self.move_to(store, buf, cursor, Direction::Backward, count)
    }

    fn move_to(
        &self,
        store: &dyn LineStore,
        buf: BufferId,
        cursor: LineNr,
        direction: Direction,
        count: usize,
    ) -> Option<LineNr> {
        let idx = self.slots.slot_of(buf)?;
        let first = self.blocks.first()?;
        let mut lnum = cursor;
        for _ in 0..count {
            if direction == Direction::Backward && lnum <= self.blocks.get(first).lnum[idx] {
                break;
            }
            let target = self.blocks.ids().find(|&id| match direction {
                Direction::Forward => lnum < self.blocks.get(id).lnum[idx],
                Direction::Backward => self
                    .blocks
                    .next(id)
                    .map_or(true, |next| lnum <= self.blocks.get(next).lnum[idx]),
            });
            if let Some(id) = target {
                lnum = self.blocks.get(id).lnum[idx];
            }
        }
        lnum = lnum.min(store.line_count(buf));
        (lnum != cursor).then_some(lnum)
    }
}

/// Returns the byte at `index`, or NUL past the end.
fn byte_at(bytes: &[u8], index: usize) -> u8 {
    bytes.get(index).copied().unwrap_or(0)
}

fn byte_at_signed(bytes: &[u8], index: isize) -> u8 {
    usize::try_from(index).map_or(0, |index| byte_at(bytes, index))
}

fn skip_blanks(bytes: &[u8], mut index: usize) -> usize {
    while index < bytes.len() && is_white(char::from(bytes[index])) {
        index += 1;
    }
    index
}
