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

//! Copying changes between buffers, as done by `:diffget` and `:diffput`.

use crate::adjust::LineAdjustment;
use crate::adjust::MAXLNUM;
use crate::block::BlockId;
use crate::host::DiffEvent;
use crate::host::DiffHost;
use crate::host::DiffRequests;
use crate::session::DiffSession;
use crate::session::SessionError;
use crate::store::BufferId;
use crate::store::LineStore;
use crate::sync::FillerInfo;
use crate::LineNr;

/// Direction of a copy, seen from the current buffer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Transfer {
    /// Copy from the other buffer into the current one.
    Get,
    /// Copy from the current buffer into the other one.
    Put,
}

/// Lines of the current buffer whose changes are copied.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LineRange {
    /// No range was given. The blocks touching the cursor line or the line
    /// above it are copied whole.
    Cursor(LineNr),
    /// Lines `first..=last`. Only the lines of a block inside the range are
    /// copied.
    Lines(LineNr, LineNr),
}

#[derive(Clone, Copy, Debug)]
struct CopyPlan {
    idx_cur: usize,
    idx_from: usize,
    idx_to: usize,
    from_buf: BufferId,
    to_buf: BufferId,
    line1: LineNr,
    line2: LineNr,
    explicit: bool,
}

impl DiffSession {
    /// Copies the changes at `range` from `other` into `cur`. Without
    /// `other`, the only other buffer of the diff is used.
    ///
    /// Returns the number of blocks copied.
    pub fn diff_get(
        &mut self,
        store: &mut dyn LineStore,
        host: &mut dyn DiffHost,
        cur: BufferId,
        other: Option<BufferId>,
        range: LineRange,
    ) -> Result<usize, SessionError> {
        self.get_put(store, host, Transfer::Get, cur, other, range)
    }

    /// Copies the changes at `range` from `cur` into `other`. Without
    /// `other`, the only other modifiable buffer of the diff is used.
    pub fn diff_put(
        &mut self,
        store: &mut dyn LineStore,
        host: &mut dyn DiffHost,
        cur: BufferId,
        other: Option<BufferId>,
        range: LineRange,
    ) -> Result<usize, SessionError> {
        self.get_put(store, host, Transfer::Put, cur, other, range)
    }

    /// Copies changes in either direction. `diff_get()` and `diff_put()`
    /// are shorthands for this.
    pub fn get_put(
        &mut self,
        store: &mut dyn LineStore,
        host: &mut dyn DiffHost,
        transfer: Transfer,
        cur: BufferId,
        other: Option<BufferId>,
        range: LineRange,
    ) -> Result<usize, SessionError> {
        let idx_cur = self.slots.slot_of(cur).ok_or(SessionError::NotInDiffMode)?;
        let Some((idx_other, other)) = self.select_other(&*store, transfer, idx_cur, other)? else {
            // Copying a buffer onto itself.
            return Ok(0);
        };
        let (idx_from, from_buf, idx_to, to_buf) = match transfer {
            Transfer::Get => (idx_other, other, idx_cur, cur),
            Transfer::Put => (idx_cur, cur, idx_other, other),
        };
        if !store.is_modifiable(to_buf) {
            return Err(SessionError::TargetNotModifiable);
        }
        self.refresh(&*store, host)?;

        let (line1, line2) = self.transfer_range(&*store, transfer, cur, range);
        let plan = CopyPlan {
            idx_cur,
            idx_from,
            idx_to,
            from_buf,
            to_buf,
            line1,
            line2,
            explicit: matches!(range, LineRange::Lines(..)),
        };
        tracing::debug!(?transfer, ?from_buf, ?to_buf, line1, line2, "copying changes");
        self.busy = true;
        let result = self.copy_blocks(store, host, &plan);
        self.busy = false;
        let copied = result?;

        self.needs_scrollbind = true;
        self.redraw(host, false);
        if std::mem::take(&mut self.pending_recompute) {
            tracing::debug!("running recompute requested while copying");
            self.recompute(&*store, host)?;
        } else {
            let mut requests = DiffRequests::default();
            host.fire_event(DiffEvent::Updated, &mut requests);
            if requests.recompute_requested() {
                self.invalid = true;
            }
        }
        Ok(copied)
    }

    /// Finds the slot to copy from or to. Returns `None` if `other` is the
    /// current buffer.
    fn select_other(
        &self,
        store: &dyn LineStore,
        transfer: Transfer,
        idx_cur: usize,
        other: Option<BufferId>,
    ) -> Result<Option<(usize, BufferId)>, SessionError> {
        if let Some(buf) = other {
            if self.slots.get(idx_cur) == Some(buf) {
                return Ok(None);
            }
            let idx = self
                .slots
                .slot_of(buf)
                .ok_or(SessionError::BufferNotInDiff(buf))?;
            return Ok(Some((idx, buf)));
        }

        let usable = |buf: BufferId| transfer == Transfer::Get || store.is_modifiable(buf);
        let mut candidates = self.slots.others(idx_cur);
        let mut found_not_modifiable = false;
        let found = loop {
            match candidates.next() {
                Some((idx, buf)) if usable(buf) => break (idx, buf),
                Some(_) => found_not_modifiable = true,
                None if found_not_modifiable => return Err(SessionError::TargetNotModifiable),
                None => return Err(SessionError::NoOtherBuffer),
            }
        };
        if candidates.any(|(_, buf)| usable(buf)) {
            return Err(SessionError::AmbiguousTarget);
        }
        Ok(Some(found))
    }

    /// Turns a range into the `line1..=line2` of blocks to copy.
    fn transfer_range(
        &self,
        store: &dyn LineStore,
        transfer: Transfer,
        cur: BufferId,
        range: LineRange,
    ) -> (LineNr, LineNr) {
        let lnum = match range {
            LineRange::Lines(first, last) => return (first, last),
            LineRange::Cursor(lnum) => lnum,
        };
        let plain = |lnum| self.check_offscreen(store, cur, lnum) == FillerInfo::NONE;
        // On the last line, a get may also take the deletion below it if
        // there is no change above.
        if transfer == Transfer::Get
            && lnum == store.line_count(cur)
            && plain(lnum)
            && (lnum == 1 || plain(lnum - 1))
        {
            (lnum, lnum + 1)
        } else if lnum > 0 {
            (lnum - 1, lnum)
        } else {
            (lnum, lnum)
        }
    }

    fn copy_blocks(
        &mut self,
        store: &mut dyn LineStore,
        host: &mut dyn DiffHost,
        plan: &CopyPlan,
    ) -> Result<usize, SessionError> {
        let CopyPlan {
            idx_cur,
            idx_from,
            idx_to,
            from_buf,
            to_buf,
            line1,
            line2,
            explicit,
        } = *plan;
        // Lines added to the current buffer so far, which moved the blocks
        // below.
        let mut off: LineNr = 0;
        let mut copied = 0;
        let mut prev: Option<BlockId> = None;
        let mut cur = self.blocks.first();
        while let Some(id) = cur {
            let block = *self.blocks.get(id);
            if block.lnum[idx_cur] > line2 + off {
                break;
            }
            if block.end(idx_cur) <= line1 + off {
                prev = Some(id);
                cur = self.blocks.next(id);
                continue;
            }
            if !block.is_sane(&self.slots, &*store) {
                tracing::warn!(?block, "skipping stale block");
                prev = Some(id);
                cur = self.blocks.next(id);
                continue;
            }

            let mut lnum = block.lnum[idx_to];
            let mut count = block.count[idx_to];
            store.save_for_undo(to_buf, lnum - 1, lnum + count)?;
            let mut start_skip = 0;
            let mut end_skip = 0;
            if explicit {
                start_skip = line1 + off - block.lnum[idx_cur];
                if start_skip > 0 {
                    if start_skip > count {
                        lnum += count;
                        count = 0;
                    } else {
                        count -= start_skip;
                        lnum += start_skip;
                    }
                } else {
                    start_skip = 0;
                }
                end_skip = block.end(idx_cur) - 1 - (line2 + off);
                if end_skip > 0 {
                    if idx_cur == idx_from {
                        count = count.min(block.count[idx_cur] - start_skip - end_skip);
                    } else {
                        count -= end_skip;
                        end_skip = (block.count[idx_from] - start_skip - count).max(0);
                    }
                } else {
                    end_skip = 0;
                }
            }

            let mut buf_empty = store.is_empty(to_buf);
            let mut added: LineNr = 0;
            for _ in 0..count {
                buf_empty = store.line_count(to_buf) == 1;
                store.delete_line(to_buf, lnum)?;
                added -= 1;
            }
            for i in 0..block.count[idx_from] - start_skip - end_skip {
                let nr = block.lnum[idx_from] + start_skip + i;
                let Some(text) = store.line(from_buf, nr).map(ToOwned::to_owned) else {
                    break;
                };
                store.insert_line_after(to_buf, lnum + i - 1, &text)?;
                added += 1;
                if buf_empty && store.line_count(to_buf) == 2 {
                    // The placeholder line of the empty buffer.
                    buf_empty = false;
                    store.delete_line(to_buf, 2)?;
                }
            }
            let new_count = block.count[idx_to] + added;
            self.blocks.get_mut(id).count[idx_to] = new_count;

            let mut freed = None;
            if start_skip == 0 && end_skip == 0 {
                let block = *self.blocks.get(id);
                let equal = self
                    .slots
                    .active()
                    .filter(|&(i, _)| i != idx_from && i != idx_to)
                    .all(|(i, _)| self.equal_entry(&*store, &block, idx_from, i));
                if equal {
                    freed = self.blocks.remove_after(prev);
                }
            }

            if added != 0 {
                let adjustment = LineAdjustment {
                    line1: lnum,
                    line2: lnum + count - 1,
                    amount: MAXLNUM,
                    amount_after: added,
                };
                self.adjust_slot(&*store, idx_to, adjustment);
                host.marks_adjusted(to_buf, lnum, lnum + count - 1, added);
            }

            if let Some(freed) = freed {
                for (i, buf) in self.slots.active() {
                    if i != idx_to {
                        host.fold_update(buf, freed.lnum[i], freed.end(i));
                    }
                }
                cur = self.blocks.after(prev);
            } else if self.blocks.try_get(id).is_some() {
                // The adjustment counted the copied lines as an edit.
                self.blocks.get_mut(id).count[idx_to] = new_count;
                prev = Some(id);
                cur = self.blocks.next(id);
            } else {
                tracing::warn!(?block, "block was merged away while copying");
                cur = self.blocks.after(prev);
            }
            if idx_cur == idx_to {
                off += added;
            }
            copied += 1;

            let mut requests = DiffRequests::default();
            host.fire_event(DiffEvent::LinesChanged { buf: to_buf }, &mut requests);
            if requests.recompute_requested() {
                // Only recorded while busy.
                self.recompute(&*store, host)?;
            }
        }
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::host::NoopHost;
    use crate::options::DiffOptions;
    use crate::store::MemoryStore;

    fn diffed(store: &MemoryStore, bufs: &[BufferId]) -> DiffSession {
        let mut session = DiffSession::new(DiffOptions::default());
        for &buf in bufs {
            session.add_buffer(buf, &mut NoopHost).unwrap();
        }
        session.recompute(store, &mut NoopHost).unwrap();
        session
    }

    fn ranges(session: &DiffSession) -> Vec<Vec<(LineNr, LineNr)>> {
        session
            .blocks()
            .iter()
            .map(|block| {
                session
                    .slots()
                    .active()
                    .map(|(i, _)| (block.lnum[i], block.count[i]))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_get_after_insert_above() {
        let mut store = MemoryStore::new();
        let a = store.add_buffer("a", ["a", "b", "c"]);
        let b = store.add_buffer("b", ["a", "x", "c"]);
        let mut session = diffed(&store, &[a, b]);
        assert_eq!(ranges(&session), vec![vec![(2, 1), (2, 1)]]);

        store.insert_line_after(a, 0, "").unwrap();
        session.lines_inserted(&store, &mut NoopHost, a, 0, 1);
        assert_eq!(ranges(&session), vec![vec![(1, 1), (1, 0)], vec![(3, 1), (2, 1)]]);

        let copied = session
            .diff_get(&mut store, &mut NoopHost, a, None, LineRange::Cursor(3))
            .unwrap();
        assert_eq!(copied, 1);
        assert_eq!(store.lines(a), ["", "a", "x", "c"]);
        assert_eq!(ranges(&session), vec![vec![(1, 1), (1, 0)]]);
        assert_eq!(session.corresponding_line(&store, a, 3, b, None), 2);
    }

    #[test]
    fn test_put() {
        let mut store = MemoryStore::new();
        let a = store.add_buffer("a", ["a", "b", "c"]);
        let b = store.add_buffer("b", ["a", "x", "c"]);
        let mut session = diffed(&store, &[a, b]);
        session
            .diff_put(&mut store, &mut NoopHost, a, None, LineRange::Cursor(2))
            .unwrap();
        assert_eq!(store.lines(b), ["a", "b", "c"]);
        assert!(session.blocks().is_empty());
    }

    #[test]
    fn test_get_partial_range() {
        let mut store = MemoryStore::new();
        let a = store.add_buffer("a", ["a", "b", "c", "d"]);
        let b = store.add_buffer("b", ["a", "x", "y", "d"]);
        let mut session = diffed(&store, &[a, b]);
        assert_eq!(ranges(&session), vec![vec![(2, 2), (2, 2)]]);
        session
            .diff_get(&mut store, &mut NoopHost, a, Some(b), LineRange::Lines(3, 3))
            .unwrap();
        assert_eq!(store.lines(a), ["a", "b", "y", "d"]);
        assert_eq!(ranges(&session), vec![vec![(2, 2), (2, 2)]]);
    }

    #[test]
    fn test_get_removes_block_equal_in_third_buffer() {
        let mut store = MemoryStore::new();
        let a = store.add_buffer("a", ["a", "b"]);
        let b = store.add_buffer("b", ["a", "x"]);
        let c = store.add_buffer("c", ["a", "x"]);
        let mut session = diffed(&store, &[a, b, c]);
        assert_matches!(
            session.diff_get(&mut store, &mut NoopHost, a, None, LineRange::Cursor(2)),
            Err(SessionError::AmbiguousTarget)
        );
        assert_eq!(store.lines(a), ["a", "b"]);
        session
            .diff_get(&mut store, &mut NoopHost, a, Some(b), LineRange::Cursor(2))
            .unwrap();
        assert_eq!(store.lines(a), ["a", "x"]);
        assert!(session.blocks().is_empty());
    }

    #[test]
    fn test_get_keeps_block_differing_in_third_buffer() {
        let mut store = MemoryStore::new();
        let a = store.add_buffer("a", ["a", "b"]);
        let b = store.add_buffer("b", ["a", "x"]);
        let c = store.add_buffer("c", ["a", "y"]);
        let mut session = diffed(&store, &[a, b, c]);
        session
            .diff_get(&mut store, &mut NoopHost, a, Some(b), LineRange::Cursor(2))
            .unwrap();
        assert_eq!(store.lines(a), ["a", "x"]);
        assert_eq!(ranges(&session), vec![vec![(2, 1), (2, 1), (2, 1)]]);
    }

    #[test]
    fn test_get_into_empty_buffer() {
        let mut store = MemoryStore::new();
        let a = store.add_buffer("a", Vec::<String>::new());
        let b = store.add_buffer("b", ["x", "y"]);
        let mut session = diffed(&store, &[a, b]);
        assert_eq!(ranges(&session), vec![vec![(1, 0), (1, 2)]]);
        session
            .diff_get(&mut store, &mut NoopHost, a, None, LineRange::Cursor(1))
            .unwrap();
        assert_eq!(store.lines(a), ["x", "y"]);
        assert!(!store.is_empty(a));
        assert!(session.blocks().is_empty());
    }

    #[test]
    fn test_get_deletes_all_lines() {
        let mut store = MemoryStore::new();
        let a = store.add_buffer("a", ["x"]);
        let b = store.add_buffer("b", Vec::<String>::new());
        let mut session = diffed(&store, &[a, b]);
        session
            .diff_get(&mut store, &mut NoopHost, a, None, LineRange::Cursor(1))
            .unwrap();
        assert!(store.is_empty(a));
        assert!(session.blocks().is_empty());
    }

    #[test]
    fn test_get_shifts_later_blocks() {
        let mut store = MemoryStore::new();
        let a = store.add_buffer("a", ["a", "b", "c", "d", "e"]);
        let b = store.add_buffer("b", ["a", "x", "y", "c", "d", "z"]);
        let mut session = diffed(&store, &[a, b]);
        assert_eq!(
            ranges(&session),
            vec![vec![(2, 1), (2, 2)], vec![(5, 1), (6, 1)]]
        );
        session
            .diff_get(&mut store, &mut NoopHost, a, None, LineRange::Cursor(2))
            .unwrap();
        assert_eq!(store.lines(a), ["a", "x", "y", "c", "d", "e"]);
        assert_eq!(ranges(&session), vec![vec![(6, 1), (6, 1)]]);
    }

    #[test]
    fn test_preconditions() {
        let mut store = MemoryStore::new();
        let a = store.add_buffer("a", ["a"]);
        let b = store.add_buffer("b", ["b"]);
        let outside = store.add_buffer("outside", ["c"]);
        let mut session = diffed(&store, &[a]);
        assert_matches!(
            session.diff_get(&mut store, &mut NoopHost, a, None, LineRange::Cursor(1)),
            Err(SessionError::NoOtherBuffer)
        );
        assert_matches!(
            session.diff_get(&mut store, &mut NoopHost, outside, None, LineRange::Cursor(1)),
            Err(SessionError::NotInDiffMode)
        );
        assert_matches!(
            session.diff_get(&mut store, &mut NoopHost, a, Some(outside), LineRange::Cursor(1)),
            Err(SessionError::BufferNotInDiff(buf)) if buf == outside
        );
        assert_matches!(
            session.diff_get(&mut store, &mut NoopHost, a, Some(a), LineRange::Cursor(1)),
            Ok(0)
        );

        session.add_buffer(b, &mut NoopHost).unwrap();
        store.set_modifiable(b, false);
        assert_matches!(
            session.diff_put(&mut store, &mut NoopHost, a, None, LineRange::Cursor(1)),
            Err(SessionError::TargetNotModifiable)
        );
        assert_matches!(
            session.diff_get(&mut store, &mut NoopHost, b, None, LineRange::Cursor(1)),
            Err(SessionError::TargetNotModifiable)
        );
        assert_eq!(store.lines(b), ["b"]);
    }

    #[derive(Default)]
    struct RequestingHost {
        events: Vec<DiffEvent>,
    }

    impl DiffHost for RequestingHost {
        fn fire_event(&mut self, event: DiffEvent, requests: &mut DiffRequests) {
            self.events.push(event);
            if matches!(event, DiffEvent::LinesChanged { .. }) {
                requests.request_recompute();
            }
        }
    }

    #[test]
    fn test_recompute_requested_while_copying_is_deferred() {
        let mut store = MemoryStore::new();
        let a = store.add_buffer("a", ["a", "b", "c", "d"]);
        let b = store.add_buffer("b", ["a", "x", "c", "y"]);
        let mut session = diffed(&store, &[a, b]);
        let mut host = RequestingHost::default();
        session
            .diff_get(&mut store, &mut host, a, None, LineRange::Lines(1, 4))
            .unwrap();
        assert_eq!(store.lines(a), ["a", "x", "c", "y"]);
        assert_eq!(
            host.events,
            vec![
                DiffEvent::LinesChanged { buf: a },
                DiffEvent::LinesChanged { buf: a },
                DiffEvent::Updated,
            ]
        );
        assert!(!session.pending_recompute);
        assert!(session.blocks().is_empty());
    }
}
