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

//! Aligning similar lines within a block.
//!
//! A block replacing three lines by one doesn't say which of the three the
//! remaining line is closest to. Line matching finds the alignment of the
//! lines of all buffers that maximizes the number of matching characters on
//! aligned lines, and splits the block into sub-blocks accordingly.
//!
//! The alignment is a shortest path search through a tensor with one
//! dimension per buffer, each of size "lines in the block + 1". A step
//! along a subset of the dimensions puts the next lines of those buffers on
//! one row. The cost grows with the product of the block sizes, which is why
//! only blocks below a configured size are matched.

use smallvec::SmallVec;

use crate::block::BlockId;
use crate::block::BlockList;
use crate::block::BufferSlots;
use crate::block::DiffBlock;
use crate::block::MAX_BUFS;
use crate::store::LineStore;
use crate::LineNr;

/// Bit `k` is set if the `k`th buffer has a line on the row.
pub type Decision = u8;

/// Lines longer than this are compared by their prefix.
const MATCH_CHAR_MAX_LEN: usize = 800;

/// Length of the longest common subsequence of bytes.
fn matching_chars(s1: &[u8], s2: &[u8]) -> i64 {
    let s1 = &s1[..s1.len().min(MATCH_CHAR_MAX_LEN - 1)];
    let s2 = &s2[..s2.len().min(MATCH_CHAR_MAX_LEN - 1)];
    let mut prev = vec![0; s2.len() + 1];
    let mut cur = vec![0; s2.len() + 1];
    for &c1 in s1 {
        for (j, &c2) in s2.iter().enumerate() {
            cur[j + 1] = if c1 == c2 {
                prev[j] + 1
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[s2.len()]
}

fn matching_chars_iwhite(s1: &[u8], s2: &[u8]) -> i64 {
    let strip = |s: &[u8]| -> Vec<u8> {
        s.iter()
            .copied()
            .filter(|&c| c != b' ' && c != b'\t')
            .collect()
    };
    matching_chars(&strip(s1), &strip(s2))
}

/// Scores putting `lines` on one row. A match of three or more lines is
/// scaled to weigh the same as a match of two.
fn count_n_matched_chars(lines: &[&str], iwhite: bool) -> i64 {
    let mut matched_chars = 0;
    let mut matched = 0;
    for (i, s1) in lines.iter().enumerate() {
        for s2 in &lines[i + 1..] {
            matched += 1;
            matched_chars += if iwhite {
                matching_chars_iwhite(s1.as_bytes(), s2.as_bytes())
            } else {
                matching_chars(s1.as_bytes(), s2.as_bytes())
            };
        }
    }
    if matched >= 2 {
        matched_chars * 2 / matched
    } else {
        matched_chars
    }
}

#[derive(Clone, Debug, Default)]
struct Node {
    score: i64,
    /// Best steps into this node, as the decision and the node it comes
    /// from. Steps with equal scores are all kept.
    steps: SmallVec<[(Decision, usize); 4]>,
}

/// Finds the best alignment of the lines of up to [`MAX_BUFS`] buffers.
///
/// Returns one decision per output row. Among alignments with the best
/// score, the one switching between different decisions least often is
/// picked, which gives the fewest sub-blocks. More than [`MAX_BUFS`] buffers
/// give no decisions.
pub fn linematch(blocks: &[Vec<&str>], iwhite: bool) -> Vec<Decision> {
    let n = blocks.len();
    if n > MAX_BUFS {
        return vec![];
    }
    let dims: Vec<usize> = blocks.iter().map(|lines| lines.len() + 1).collect();
    let mut strides = vec![1; n];
    for k in (0..n.saturating_sub(1)).rev() {
        strides[k] = strides[k + 1] * dims[k + 1];
    }
    let size: usize = dims.iter().product();

    // Every predecessor of a node has a smaller index, so one pass in index
    // order sees them first.
    let mut nodes = vec![Node::default(); size];
    let mut iters = vec![0; n];
    let mut row: Vec<&str> = Vec::with_capacity(n);
    for idx in 0..size {
        for k in 0..n {
            iters[k] = idx / strides[k] % dims[k];
        }
        let paths: SmallVec<[usize; MAX_BUFS]> = (0..n).filter(|&k| iters[k] > 0).collect();
        nodes[idx].score = -1;
        // Larger subsets first, so that ties favor rows with more lines.
        for mask in (1..1usize << paths.len()).rev() {
            let mut choice: Decision = 0;
            let mut from = idx;
            row.clear();
            for (j, &k) in paths.iter().enumerate() {
                if mask & (1 << (paths.len() - 1 - j)) != 0 {
                    choice |= 1 << k;
                    from -= strides[k];
                    row.push(blocks[k][iters[k] - 1]);
                }
            }
            let score = nodes[from].score + count_n_matched_chars(&row, iwhite);
            let node = &mut nodes[idx];
            if score > node.score {
                node.score = score;
                node.steps.clear();
                node.steps.push((choice, from));
            } else if score == node.score {
                node.steps.push((choice, from));
            }
        }
    }

    // turns[idx][last] is the least number of decision changes on the way
    // from the origin to `idx` when the step after `idx` is `last`.
    const DECISIONS: usize = 1 << MAX_BUFS;
    let mut turns = vec![[0u32; DECISIONS]; size];
    for idx in 0..size {
        if nodes[idx].steps.is_empty() {
            continue;
        }
        for last in 0..DECISIONS {
            turns[idx][last] = nodes[idx]
                .steps
                .iter()
                .map(|&(choice, from)| step_turns(&turns, choice, from, last))
                .min()
                .unwrap_or(0);
        }
    }

    let mut decisions = vec![];
    let mut idx = size - 1;
    let mut last = 0;
    while !nodes[idx].steps.is_empty() {
        // The first of the best steps, like min_by_key() doesn't give.
        let mut best = nodes[idx].steps[0];
        let mut best_turns = step_turns(&turns, best.0, best.1, last);
        for &(choice, from) in &nodes[idx].steps[1..] {
            let t = step_turns(&turns, choice, from, last);
            if t < best_turns {
                best = (choice, from);
                best_turns = t;
            }
        }
        decisions.push(best.0);
        last = usize::from(best.0);
        idx = best.1;
    }
    decisions.reverse();
    decisions
}

fn step_turns(turns: &[[u32; 1 << MAX_BUFS]], choice: Decision, from: usize, last: usize) -> u32 {
    turns[from][usize::from(choice)] + u32::from(usize::from(choice) != last)
}

/// Returns true if the block is small enough to be matched.
pub fn should_linematch(block: &DiffBlock, slots: &BufferSlots, ceiling: Option<usize>) -> bool {
    let Some(ceiling) = ceiling else {
        return false;
    };
    if block.is_linematched {
        return false;
    }
    let mut total: LineNr = 0;
    for (i, _) in slots.active() {
        if block.count[i] < 0 {
            return false;
        }
        total += block.count[i];
    }
    usize::try_from(total).is_ok_and(|total| total <= ceiling)
}

/// Splits block `id` into sub-blocks with lines aligned by [`linematch()`].
///
/// The first sub-block reuses `id`. Does nothing if the block reaches past
/// the end of a buffer.
pub fn linematch_block(
    list: &mut BlockList,
    id: BlockId,
    slots: &BufferSlots,
    store: &dyn LineStore,
    iwhite: bool,
) {
    let block = *list.get(id);
    if !block.is_sane(slots, store) {
        tracing::warn!(?block, "not matching lines of stale block");
        return;
    }
    let lines: Vec<Vec<&str>> = slots
        .active()
        .map(|(i, buf)| {
            (block.lnum[i]..block.end(i))
                .map(|lnum| store.line(buf, lnum).unwrap_or_default())
                .collect()
        })
        .collect();
    let decisions = linematch(&lines, iwhite);
    apply_decisions(list, id, slots, &decisions);
}

fn apply_decisions(list: &mut BlockList, id: BlockId, slots: &BufferSlots, decisions: &[Decision]) {
    let active: SmallVec<[usize; MAX_BUFS]> = slots.active().map(|(i, _)| i).collect();
    let first = list.get_mut(id);
    let mut line_numbers = first.lnum;
    for &i in &active {
        first.count[i] = 0;
    }
    first.is_linematched = true;

    let mut cur = id;
    for (n, &decision) in decisions.iter().enumerate() {
        if n > 0 && decisions[n - 1] != decision {
            let mut sub = DiffBlock {
                is_linematched: true,
                ..DiffBlock::default()
            };
            for &i in &active {
                sub.lnum[i] = line_numbers[i];
            }
            cur = list.insert_after(Some(cur), sub);
        }
        let block = list.get_mut(cur);
        for (j, &i) in active.iter().enumerate() {
            if decision & (1 << j) != 0 {
                block.count[i] += 1;
                line_numbers[i] += 1;
            }
        }
    }
}
