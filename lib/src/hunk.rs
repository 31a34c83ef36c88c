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

//! Hunks and the parser for the output of external diff programs.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::LineNr;

/// One change reported by a diff backend.
///
/// An empty range (`count == 0`) starts at the line *after* the position the
/// other side's lines are inserted at, so `orig_start + orig_count` is always
/// the first line past the range.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Hunk {
    /// First line of the range in the original buffer.
    pub orig_start: LineNr,
    /// Number of lines of the original buffer.
    pub orig_count: LineNr,
    /// First line of the range in the new buffer.
    pub new_start: LineNr,
    /// Number of lines of the new buffer.
    pub new_count: LineNr,
}

impl Hunk {
    /// Creates a hunk from both ranges.
    pub fn new(
        orig_start: LineNr,
        orig_count: LineNr,
        new_start: LineNr,
        new_count: LineNr,
    ) -> Self {
        Hunk {
            orig_start,
            orig_count,
            new_start,
            new_count,
        }
    }

    /// First line past the original range.
    pub fn orig_end(&self) -> LineNr {
        self.orig_start + self.orig_count
    }

    /// First line past the new range.
    pub fn new_end(&self) -> LineNr {
        self.new_start + self.new_count
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum DiffStyle {
    Ed,
    Unified,
}

static ED_HUNK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(?:,(\d*))?([acd])(\d*)(?:,(\d*))?").unwrap());
static UNIFIED_HUNK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@@ -(\d*)(?:,(\d*))? \+(\d*)(?:,(\d*))?").unwrap());

/// Parses the output of a diff program.
///
/// Both the "ed" style of a plain `diff` and the unified style of `diff -u`
/// are accepted. The style is pinned down by the first line that looks like
/// either. Lines that don't parse as a hunk header are skipped, which also
/// skips banners and the context lines of unified output.
pub fn parse_diff_output(output: &str) -> Vec<Hunk> {
    let lines: Vec<&str> = output.lines().collect();
    let mut style = None;
    let mut hunks = vec![];
    for (i, line) in lines.iter().enumerate() {
        let current = match style {
            Some(style) => style,
            None => match detect_style(&lines[i..]) {
                Some(detected) => {
                    tracing::trace!(?detected, "detected diff output style");
                    style = Some(detected);
                    detected
                }
                None => continue,
            },
        };
        let hunk = match current {
            DiffStyle::Ed => parse_ed_hunk(line),
            DiffStyle::Unified => parse_unified_hunk(line),
        };
        if let Some(hunk) = hunk {
            hunks.push(hunk);
        }
    }
    hunks
}

fn detect_style(lines: &[&str]) -> Option<DiffStyle> {
    let first = lines.first()?;
    if first.starts_with(|c: char| c.is_ascii_digit()) {
        Some(DiffStyle::Ed)
    } else if first.starts_with("@@ ") {
        Some(DiffStyle::Unified)
    } else if first.starts_with("--- ")
        && lines.get(1).is_some_and(|line| line.starts_with("+++ "))
        && lines.get(2).is_some_and(|line| line.starts_with("@@ "))
    {
        Some(DiffStyle::Unified)
    } else {
        None
    }
}

/// Parses a number, treating a missing one as zero.
fn number(captures: &Captures, index: usize) -> Option<Option<LineNr>> {
    match captures.get(index) {
        None => Some(None),
        Some(m) if m.as_str().is_empty() => Some(Some(0)),
        Some(m) => m.as_str().parse().ok().map(Some),
    }
}

/// Parses one of:
/// - change: `{first}[,{last}]c{first}[,{last}]`
/// - append: `{first}a{first}[,{last}]`
/// - delete: `{first}[,{last}]d{first}`
fn parse_ed_hunk(line: &str) -> Option<Hunk> {
    let captures = ED_HUNK_REGEX.captures(line)?;
    let f1 = number(&captures, 1)??;
    let l1 = number(&captures, 2)?.unwrap_or(f1);
    let kind = &captures[3];
    let f2 = number(&captures, 4)??;
    let l2 = number(&captures, 5)?.unwrap_or(f2);
    if l1 < f1 || l2 < f2 {
        return None;
    }
    let (orig_start, orig_count) = if kind == "a" {
        (f1 + 1, 0)
    } else {
        (f1, l1 - f1 + 1)
    };
    let (new_start, new_count) = if kind == "d" {
        (f2 + 1, 0)
    } else {
        (f2, l2 - f2 + 1)
    };
    Some(Hunk::new(orig_start, orig_count, new_start, new_count))
}

/// Parses `@@ -{oldline}[,{oldcount}] +{newline}[,{newcount}] @@`.
fn parse_unified_hunk(line: &str) -> Option<Hunk> {
    let captures = UNIFIED_HUNK_REGEX.captures(line)?;
    let mut old_line = number(&captures, 1)??;
    let old_count = number(&captures, 2)?.unwrap_or(1);
    let mut new_line = number(&captures, 3)??;
    let new_count = number(&captures, 4)?.unwrap_or(1);
    if old_count == 0 {
        old_line += 1;
    }
    if new_count == 0 {
        new_line += 1;
    }
    if new_line == 0 {
        new_line = 1;
    }
    Some(Hunk::new(old_line, old_count, new_line, new_count))
}
