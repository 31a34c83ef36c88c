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

#![allow(missing_docs)]

use std::borrow::Cow;
use std::cmp::max;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use serde::Deserialize;

use crate::compare::{is_blank, line_key, CompareFlags};
use crate::hunk::Hunk;
use crate::LineNr;

/// Core algorithm of the internal line diff.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum DiffAlgorithm {
    #[default]
    Myers,
    /// Myers without cost heuristics. The search below never cuts corners,
    /// so this produces the same result as `Myers`.
    Minimal,
    Patience,
    Histogram,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LineDiffOptions {
    pub algorithm: DiffAlgorithm,
    pub compare: CompareFlags,
    pub indent_heuristic: bool,
    pub ignore_blank_lines: bool,
}

/// Lines of both sides replaced by numbers identifying their comparison keys.
struct DiffInput {
    left: Vec<u32>,
    right: Vec<u32>,
}

impl DiffInput {
    fn new<'a>(flags: CompareFlags, left: &[&'a str], right: &[&'a str]) -> Self {
        let mut ids: HashMap<Cow<'a, str>, u32> = HashMap::new();
        let mut intern = |lines: &[&'a str]| -> Vec<u32> {
            lines
                .iter()
                .map(|&line| {
                    let next_id = ids.len() as u32;
                    *ids.entry(line_key(flags, line)).or_insert(next_id)
                })
                .collect()
        };
        let left = intern(left);
        let right = intern(right);
        DiffInput { left, right }
    }

    /// Shrinks the ranges by their common prefix and suffix.
    fn trim_common(
        &self,
        mut left: Range<usize>,
        mut right: Range<usize>,
    ) -> (Range<usize>, Range<usize>) {
        while !left.is_empty()
            && !right.is_empty()
            && self.left[left.start] == self.right[right.start]
        {
            left.start += 1;
            right.start += 1;
        }
        while !left.is_empty()
            && !right.is_empty()
            && self.left[left.end - 1] == self.right[right.end - 1]
        {
            left.end -= 1;
            right.end -= 1;
        }
        (left, right)
    }
}

/// Per-line "changed" marks of both sides.
struct Changes {
    left: Vec<bool>,
    right: Vec<bool>,
}

impl Changes {
    fn mark(&mut self, left: Range<usize>, right: Range<usize>) {
        self.left[left].fill(true);
        self.right[right].fill(true);
    }
}

/// Computes the hunks turning `left` into `right`.
pub fn diff_lines(left: &[&str], right: &[&str], options: &LineDiffOptions) -> Vec<Hunk> {
    let input = DiffInput::new(options.compare, left, right);
    let mut changes = Changes {
        left: vec![false; left.len()],
        right: vec![false; right.len()],
    };
    let whole_left = 0..left.len();
    let whole_right = 0..right.len();
    match options.algorithm {
        DiffAlgorithm::Myers | DiffAlgorithm::Minimal => {
            myers(&input, whole_left, whole_right, &mut changes);
        }
        DiffAlgorithm::Patience => patience(&input, whole_left, whole_right, &mut changes),
        DiffAlgorithm::Histogram => histogram(&input, whole_left, whole_right, &mut changes),
    }
    compact_changes(
        &input.left,
        left,
        &mut changes.left,
        &changes.right,
        options.indent_heuristic,
    );
    compact_changes(
        &input.right,
        right,
        &mut changes.right,
        &changes.left,
        options.indent_heuristic,
    );
    let mut hunks = collect_hunks(&changes);
    if options.ignore_blank_lines {
        hunks.retain(|hunk| !is_blank_hunk(left, right, hunk));
    }
    hunks
}

fn is_blank_hunk(left: &[&str], right: &[&str], hunk: &Hunk) -> bool {
    let range = |start: LineNr, count: LineNr| (start - 1) as usize..(start - 1 + count) as usize;
    left[range(hunk.orig_start, hunk.orig_count)]
        .iter()
        .chain(&right[range(hunk.new_start, hunk.new_count)])
        .all(|line| is_blank(line))
}

fn collect_hunks(changes: &Changes) -> Vec<Hunk> {
    let (left_len, right_len) = (changes.left.len(), changes.right.len());
    let mut hunks = vec![];
    let (mut i, mut j) = (0, 0);
    while i < left_len || j < right_len {
        let left_changed = i < left_len && changes.left[i];
        let right_changed = j < right_len && changes.right[j];
        if !left_changed && !right_changed {
            i += 1;
            j += 1;
            continue;
        }
        let (start_i, start_j) = (i, j);
        while i < left_len && changes.left[i] {
            i += 1;
        }
        while j < right_len && changes.right[j] {
            j += 1;
        }
        hunks.push(Hunk::new(
            start_i as LineNr + 1,
            (i - start_i) as LineNr,
            start_j as LineNr + 1,
            (j - start_j) as LineNr,
        ));
    }
    hunks
}

fn myers(input: &DiffInput, left: Range<usize>, right: Range<usize>, changes: &mut Changes) {
    let (left, right) = input.trim_common(left, right);
    if left.is_empty() || right.is_empty() {
        changes.mark(left, right);
        return;
    }
    match bisect(&input.left[left.clone()], &input.right[right.clone()]) {
        Some((x, y)) if (x, y) != (0, 0) && (x, y) != (left.len(), right.len()) => {
            myers(
                input,
                left.start..left.start + x,
                right.start..right.start + y,
                changes,
            );
            myers(
                input,
                left.start + x..left.end,
                right.start + y..right.end,
                changes,
            );
        }
        _ => changes.mark(left, right),
    }
}

/// Finds the middle snake of the shortest edit script between `a` and `b` by
/// searching from both ends at once. Returns the point to split the problem
/// at.
fn bisect(a: &[u32], b: &[u32]) -> Option<(usize, usize)> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max_d = (n + m + 1) / 2 + 1;
    let offset = max_d;
    let len = 2 * max_d as usize;
    let mut forward = vec![-1_isize; len];
    let mut backward = vec![-1_isize; len];
    forward[offset as usize + 1] = 0;
    backward[offset as usize + 1] = 0;
    let delta = n - m;
    // If the total number of lines is odd, the front path collides with the
    // reverse path.
    let front = delta % 2 != 0;
    let (mut k1_start, mut k1_end, mut k2_start, mut k2_end) = (0, 0, 0, 0);
    for d in 0..max_d {
        let mut k1 = -d + k1_start;
        while k1 <= d - k1_end {
            let k1_offset = (offset + k1) as usize;
            let mut x1 = if k1 == -d || (k1 != d && forward[k1_offset - 1] < forward[k1_offset + 1])
            {
                forward[k1_offset + 1]
            } else {
                forward[k1_offset - 1] + 1
            };
            let mut y1 = x1 - k1;
            while x1 < n && y1 < m && a[x1 as usize] == b[y1 as usize] {
                x1 += 1;
                y1 += 1;
            }
            forward[k1_offset] = x1;
            if x1 > n {
                k1_end += 2;
            } else if y1 > m {
                k1_start += 2;
            } else if front {
                let k2_offset = offset + delta - k1;
                if (0..len as isize).contains(&k2_offset) && backward[k2_offset as usize] != -1 {
                    let x2 = n - backward[k2_offset as usize];
                    if x1 >= x2 {
                        return Some((x1 as usize, y1 as usize));
                    }
                }
            }
            k1 += 2;
        }

        let mut k2 = -d + k2_start;
        while k2 <= d - k2_end {
            let k2_offset = (offset + k2) as usize;
            let mut x2 =
                if k2 == -d || (k2 != d && backward[k2_offset - 1] < backward[k2_offset + 1]) {
                    backward[k2_offset + 1]
                } else {
                    backward[k2_offset - 1] + 1
                };
            let mut y2 = x2 - k2;
            while x2 < n && y2 < m && a[(n - x2 - 1) as usize] == b[(m - y2 - 1) as usize] {
                x2 += 1;
                y2 += 1;
            }
            backward[k2_offset] = x2;
            if x2 > n {
                k2_end += 2;
            } else if y2 > m {
                k2_start += 2;
            } else if !front {
                let k1_offset = offset + delta - k2;
                if (0..len as isize).contains(&k1_offset) && forward[k1_offset as usize] != -1 {
                    let x1 = forward[k1_offset as usize];
                    let y1 = offset + x1 - k1_offset;
                    if x1 >= n - x2 {
                        return Some((x1 as usize, y1 as usize));
                    }
                }
            }
            k2 += 2;
        }
    }
    None
}

/// Finds the LCS given a array where the value of `input[i]` indicates that
/// the position of element `i` in the right array is at position `input[i]` in
/// the left array.
///
/// For example (some have multiple valid outputs):
///
/// [0,1,2] => [(0,0),(1,1),(2,2)]
/// [2,1,0] => [(0,2)]
/// [0,1,4,2,3,5,6] => [(0,0),(1,1),(2,3),(3,4),(5,5),(6,6)]
/// [0,1,4,3,2,5,6] => [(0,0),(1,1),(4,2),(5,5),(6,6)]
fn find_lcs(input: &[usize]) -> Vec<(usize, usize)> {
    if input.is_empty() {
        return vec![];
    }

    let mut chain = vec![(0, 0, 0); input.len()];
    let mut global_longest = 0;
    let mut global_longest_right_pos = 0;
    for (right_pos, &left_pos) in input.iter().enumerate() {
        let mut longest_from_here = 1;
        let mut previous_right_pos = usize::MAX;
        for i in (0..right_pos).rev() {
            let (previous_len, previous_left_pos, _) = chain[i];
            if previous_left_pos < left_pos {
                let len = previous_len + 1;
                if len > longest_from_here {
                    longest_from_here = len;
                    previous_right_pos = i;
                    if len > global_longest {
                        global_longest = len;
                        global_longest_right_pos = right_pos;
                        // If this is the longest chain globally so far, we cannot find a
                        // longer one by using a previous value, so break early.
                        break;
                    }
                }
            }
        }
        chain[right_pos] = (longest_from_here, left_pos, previous_right_pos);
    }

    let mut result = vec![];
    let mut right_pos = global_longest_right_pos;
    loop {
        let (_, left_pos, previous_right_pos) = chain[right_pos];
        result.push((left_pos, right_pos));
        if previous_right_pos == usize::MAX {
            break;
        }
        right_pos = previous_right_pos;
    }
    result.reverse();

    result
}

/// Anchors on lines occurring exactly once on each side and recurses into the
/// gaps between them. Falls back to Myers where there are no such lines.
fn patience(input: &DiffInput, left: Range<usize>, right: Range<usize>, changes: &mut Changes) {
    let (left, right) = input.trim_common(left, right);
    if left.is_empty() || right.is_empty() {
        changes.mark(left, right);
        return;
    }

    // line -> (count in left, count in right, last position in left)
    let mut occurrences: HashMap<u32, (usize, usize, usize)> = HashMap::new();
    for i in left.clone() {
        let entry = occurrences.entry(input.left[i]).or_default();
        entry.0 += 1;
        entry.2 = i;
    }
    for j in right.clone() {
        if let Some(entry) = occurrences.get_mut(&input.right[j]) {
            entry.1 += 1;
        }
    }
    let mut left_positions = vec![];
    let mut right_positions = vec![];
    for j in right.clone() {
        if let Some(&(1, 1, i)) = occurrences.get(&input.right[j]) {
            left_positions.push(i);
            right_positions.push(j);
        }
    }
    if left_positions.is_empty() {
        myers(input, left, right, changes);
        return;
    }

    let mut previous_left = left.start;
    let mut previous_right = right.start;
    for (left_pos, right_index) in find_lcs(&left_positions) {
        let right_pos = right_positions[right_index];
        patience(input, previous_left..left_pos, previous_right..right_pos, changes);
        previous_left = left_pos + 1;
        previous_right = right_pos + 1;
    }
    patience(input, previous_left..left.end, previous_right..right.end, changes);
}

struct Histogram {
    line_to_positions: HashMap<u32, Vec<usize>>,
    count_to_lines: BTreeMap<usize, Vec<u32>>,
}

impl Histogram {
    fn calculate(lines: &[u32], range: Range<usize>, max_occurrences: usize) -> Self {
        let mut line_to_positions: HashMap<u32, Vec<usize>> = HashMap::new();
        for i in range {
            let positions = line_to_positions.entry(lines[i]).or_default();
            // Allow one more than max_occurrences, so we can later skip those with more
            // than max_occurrences
            if positions.len() <= max_occurrences {
                positions.push(i);
            }
        }
        let mut count_to_lines: BTreeMap<usize, Vec<u32>> = BTreeMap::new();
        for (line, positions) in &line_to_positions {
            count_to_lines.entry(positions.len()).or_default().push(*line);
        }
        Histogram {
            line_to_positions,
            count_to_lines,
        }
    }
}

/// Anchors on the least frequent lines the two sides share, then recurses
/// into the gaps between the anchors.
fn histogram(input: &DiffInput, left: Range<usize>, right: Range<usize>, changes: &mut Changes) {
    let (left, right) = input.trim_common(left, right);
    if left.is_empty() || right.is_empty() {
        changes.mark(left, right);
        return;
    }

    let max_occurrences = 100;
    let mut left_histogram = Histogram::calculate(&input.left, left.clone(), max_occurrences);
    if left_histogram
        .count_to_lines
        .keys()
        .next()
        .is_some_and(|&count| count > max_occurrences)
    {
        // Every line is too common to serve as an anchor.
        myers(input, left, right, changes);
        return;
    }
    let right_histogram = Histogram::calculate(&input.right, right.clone(), max_occurrences);
    let mut uncommon_shared_lines = vec![];
    while uncommon_shared_lines.is_empty() {
        let Some(entry) = left_histogram.count_to_lines.first_entry() else {
            break;
        };
        uncommon_shared_lines.extend(
            entry
                .remove()
                .into_iter()
                .filter(|line| right_histogram.line_to_positions.contains_key(line)),
        );
    }
    if uncommon_shared_lines.is_empty() {
        changes.mark(left, right);
        return;
    }

    // Number the shared occurrences of each line, and look for the longest
    // sequence of them appearing in the same order on both sides.
    let mut left_positions = vec![];
    let mut right_positions = vec![];
    for line in uncommon_shared_lines {
        let left_occurrences = &left_histogram.line_to_positions[&line];
        let right_occurrences = &right_histogram.line_to_positions[&line];
        let shared_count = left_occurrences.len().min(right_occurrences.len());
        for occurrence in 0..shared_count {
            left_positions.push((left_occurrences[occurrence], line, occurrence));
            right_positions.push((right_occurrences[occurrence], line, occurrence));
        }
    }
    left_positions.sort_unstable();
    right_positions.sort_unstable();
    let left_position_map: HashMap<(u32, usize), usize> = left_positions
        .iter()
        .enumerate()
        .map(|(i, &(_pos, line, occurrence))| ((line, occurrence), i))
        .collect();
    let left_index_by_right_index: Vec<usize> = right_positions
        .iter()
        .map(|&(_pos, line, occurrence)| left_position_map[&(line, occurrence)])
        .collect();

    let mut previous_left = left.start;
    let mut previous_right = right.start;
    for (left_index, right_index) in find_lcs(&left_index_by_right_index) {
        let left_pos = left_positions[left_index].0;
        let right_pos = right_positions[right_index].0;
        histogram(input, previous_left..left_pos, previous_right..right_pos, changes);
        previous_left = left_pos + 1;
        previous_right = right_pos + 1;
    }
    histogram(input, previous_left..left.end, previous_right..right.end, changes);
}

/// A run of changed lines, possibly empty, delimited by unchanged lines.
#[derive(Clone, Copy, Debug)]
struct Group {
    start: usize,
    end: usize,
}

impl Group {
    fn first(changed: &[bool]) -> Self {
        let mut group = Group { start: 0, end: 0 };
        group.extend_end(changed);
        group
    }

    fn extend_end(&mut self, changed: &[bool]) {
        while self.end < changed.len() && changed[self.end] {
            self.end += 1;
        }
    }

    fn extend_start(&mut self, changed: &[bool]) {
        while self.start > 0 && changed[self.start - 1] {
            self.start -= 1;
        }
    }

    fn next(&mut self, changed: &[bool]) -> bool {
        if self.end == changed.len() {
            return false;
        }
        self.start = self.end + 1;
        self.end = self.start;
        self.extend_end(changed);
        true
    }

    fn previous(&mut self, changed: &[bool]) -> bool {
        if self.start == 0 {
            return false;
        }
        self.end = self.start - 1;
        self.start = self.end;
        self.extend_start(changed);
        true
    }

    /// Moves the group down by one line if the line after it equals its first
    /// line, merging with the group below if they touch.
    fn slide_down(&mut self, lines: &[u32], changed: &mut [bool]) -> bool {
        if self.end < changed.len() && lines[self.start] == lines[self.end] {
            changed[self.start] = false;
            changed[self.end] = true;
            self.start += 1;
            self.end += 1;
            self.extend_end(changed);
            true
        } else {
            false
        }
    }

    fn slide_up(&mut self, lines: &[u32], changed: &mut [bool]) -> bool {
        if self.start > 0 && lines[self.start - 1] == lines[self.end - 1] {
            self.start -= 1;
            self.end -= 1;
            changed[self.start] = true;
            changed[self.end] = false;
            self.extend_start(changed);
            true
        } else {
            false
        }
    }
}

/// Slides groups of changed lines to line up with changes on the other side
/// where possible, and otherwise to the lowest position or, with the indent
/// heuristic, to the position that reads best.
fn compact_changes(
    lines: &[u32],
    text: &[&str],
    changed: &mut [bool],
    other_changed: &[bool],
    indent_heuristic: bool,
) {
    let mut group = Group::first(changed);
    let mut other = Group::first(other_changed);
    loop {
        if group.end != group.start {
            // Sliding may merge adjacent groups, so repeat until the size is
            // stable.
            let (group_size, earliest_end, matches_other) = loop {
                let group_size = group.end - group.start;
                let mut matches_other = false;
                while group.slide_up(lines, changed) {
                    other.previous(other_changed);
                }
                let earliest_end = group.end;
                if other.end > other.start {
                    matches_other = true;
                }
                while group.slide_down(lines, changed) {
                    other.next(other_changed);
                    if other.end > other.start {
                        matches_other = true;
                    }
                }
                if group_size == group.end - group.start {
                    break (group_size, earliest_end, matches_other);
                }
            };

            if group.end == earliest_end {
                // Nowhere to slide.
            } else if matches_other {
                while other.end == other.start {
                    group.slide_up(lines, changed);
                    other.previous(other_changed);
                }
            } else if indent_heuristic {
                let best_end = best_split_end(text, group.end, group_size, earliest_end);
                while group.end > best_end {
                    group.slide_up(lines, changed);
                    other.previous(other_changed);
                }
            }
        }
        if !group.next(changed) {
            break;
        }
        other.next(other_changed);
    }
}

const MAX_INDENT: i32 = 200;
const MAX_BLANKS: i32 = 20;
const INDENT_HEURISTIC_MAX_SLIDING: usize = 100;

const START_OF_FILE_PENALTY: i32 = 1;
const END_OF_FILE_PENALTY: i32 = 21;
const TOTAL_BLANK_WEIGHT: i32 = -30;
const POST_BLANK_WEIGHT: i32 = 6;
const RELATIVE_INDENT_PENALTY: i32 = -4;
const RELATIVE_INDENT_WITH_BLANK_PENALTY: i32 = 10;
const RELATIVE_OUTDENT_PENALTY: i32 = 24;
const RELATIVE_OUTDENT_WITH_BLANK_PENALTY: i32 = 17;
const RELATIVE_DEDENT_PENALTY: i32 = 23;
const RELATIVE_DEDENT_WITH_BLANK_PENALTY: i32 = 17;
const INDENT_WEIGHT: i32 = 60;

/// Indentation with tabs expanded to multiples of 8, or `None` for a blank
/// line.
fn indent_of(line: &str) -> Option<i32> {
    let mut indent = 0;
    for c in line.chars() {
        match c {
            ' ' => indent += 1,
            '\t' => indent += 8 - indent % 8,
            c if c.is_ascii_whitespace() => {}
            _ => return Some(indent),
        }
        if indent >= MAX_INDENT {
            return Some(MAX_INDENT);
        }
    }
    None
}

#[derive(Debug)]
struct SplitMeasurement {
    end_of_file: bool,
    indent: Option<i32>,
    pre_blank: i32,
    pre_indent: Option<i32>,
    post_blank: i32,
    post_indent: Option<i32>,
}

impl SplitMeasurement {
    /// Measures a split of `text` right above line `split`.
    fn measure(text: &[&str], split: usize) -> Self {
        let (end_of_file, indent) = match text.get(split) {
            Some(line) => (false, indent_of(line)),
            None => (true, None),
        };

        let mut pre_blank = 0;
        let mut pre_indent = None;
        for line in text[..split.min(text.len())].iter().rev() {
            pre_indent = indent_of(line);
            if pre_indent.is_some() {
                break;
            }
            pre_blank += 1;
            if pre_blank == MAX_BLANKS {
                pre_indent = Some(0);
                break;
            }
        }

        let mut post_blank = 0;
        let mut post_indent = None;
        for line in text.iter().skip(split + 1) {
            post_indent = indent_of(line);
            if post_indent.is_some() {
                break;
            }
            post_blank += 1;
            if post_blank == MAX_BLANKS {
                post_indent = Some(0);
                break;
            }
        }

        SplitMeasurement {
            end_of_file,
            indent,
            pre_blank,
            pre_indent,
            post_blank,
            post_indent,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct SplitScore {
    effective_indent: i32,
    penalty: i32,
}

impl SplitScore {
    fn add(&mut self, m: &SplitMeasurement) {
        if m.pre_indent.is_none() && m.pre_blank == 0 {
            self.penalty += START_OF_FILE_PENALTY;
        }
        if m.end_of_file {
            self.penalty += END_OF_FILE_PENALTY;
        }

        let post_blank = if m.indent.is_none() {
            1 + m.post_blank
        } else {
            0
        };
        let total_blank = m.pre_blank + post_blank;
        self.penalty += TOTAL_BLANK_WEIGHT * total_blank;
        self.penalty += POST_BLANK_WEIGHT * post_blank;

        let indent = m.indent.or(m.post_indent);
        let any_blanks = total_blank != 0;
        self.effective_indent += indent.unwrap_or(-1);
        let (Some(indent), Some(pre_indent)) = (indent, m.pre_indent) else {
            return;
        };
        if indent > pre_indent {
            self.penalty += if any_blanks {
                RELATIVE_INDENT_WITH_BLANK_PENALTY
            } else {
                RELATIVE_INDENT_PENALTY
            };
        } else if indent < pre_indent {
            let outdent = m.post_indent.is_some_and(|post_indent| post_indent > indent);
            self.penalty += match (outdent, any_blanks) {
                (true, true) => RELATIVE_OUTDENT_WITH_BLANK_PENALTY,
                (true, false) => RELATIVE_OUTDENT_PENALTY,
                (false, true) => RELATIVE_DEDENT_WITH_BLANK_PENALTY,
                (false, false) => RELATIVE_DEDENT_PENALTY,
            };
        }
    }

    /// Negative if `self` is the better split.
    fn compare(&self, other: &SplitScore) -> i32 {
        let cmp_indents = (self.effective_indent > other.effective_indent) as i32
            - (self.effective_indent < other.effective_indent) as i32;
        INDENT_WEIGHT * cmp_indents + (self.penalty - other.penalty)
    }
}

/// Picks where a group of `group_size` lines ending at `end` should end, among
/// the positions it can slide up to.
fn best_split_end(text: &[&str], end: usize, group_size: usize, earliest_end: usize) -> usize {
    let lowest_shift = max(
        earliest_end,
        max(
            end.saturating_sub(group_size + 1),
            end.saturating_sub(INDENT_HEURISTIC_MAX_SLIDING),
        ),
    );
    let mut best: Option<(usize, SplitScore)> = None;
    for shift in lowest_shift..=end {
        let mut score = SplitScore::default();
        score.add(&SplitMeasurement::measure(text, shift));
        score.add(&SplitMeasurement::measure(text, shift - group_size));
        if best
            .as_ref()
            .map_or(true, |(_, best_score)| score.compare(best_score) <= 0)
        {
            best = Some((shift, score));
        }
    }
    best.map_or(end, |(shift, _)| shift)
}
