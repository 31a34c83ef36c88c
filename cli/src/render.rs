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

//! Plain-text rendering of the aligned view.
//!
//! Every buffer gets a column. A row holds one line, or a filler row where a
//! buffer lacks the lines another buffer has, so that the same row shows
//! corresponding lines in every column.

use itertools::Itertools as _;
use tabdiff_lib::session::DiffSession;
use tabdiff_lib::store::BufferId;
use tabdiff_lib::store::LineStore;
use tabdiff_lib::store::MemoryStore;
use tabdiff_lib::sync::LineStatus;
use tabdiff_lib::LineNr;

use crate::text_util::expand_tabs;
use crate::text_util::fit_to_width;

const SEPARATOR: &str = " | ";

#[derive(Clone, Copy, Debug)]
pub struct ViewOptions {
    /// Width of a rendered row, separators included.
    pub width: usize,
    /// Collapse runs of unchanged lines away from any change.
    pub fold: bool,
}

#[derive(Clone, Copy, Debug)]
enum Cell<'a> {
    Line {
        lnum: LineNr,
        text: &'a str,
        status: LineStatus,
    },
    Filler,
}

fn marker(status: LineStatus) -> char {
    match status {
        LineStatus::Unchanged => ' ',
        LineStatus::Changed => '!',
        LineStatus::Added => '+',
    }
}

fn push_filler(cells: &mut Vec<Cell<'_>>, count: LineNr) {
    for _ in 0..count {
        cells.push(Cell::Filler);
    }
}

fn column_cells<'a>(
    session: &mut DiffSession,
    store: &'a dyn LineStore,
    buf: BufferId,
) -> Vec<Cell<'a>> {
    let mut cells = vec![];
    if store.is_empty(buf) {
        push_filler(&mut cells, session.check(store, buf, 1).filler);
        return cells;
    }
    let line_count = store.line_count(buf);
    for lnum in 1..=line_count {
        let info = session.check(store, buf, lnum);
        push_filler(&mut cells, info.filler);
        cells.push(Cell::Line {
            lnum,
            text: store.line(buf, lnum).unwrap_or_default(),
            status: info.status,
        });
    }
    // Lines the other buffers have past the end of this one.
    let trailing = session.check_offscreen(store, buf, line_count + 1);
    push_filler(&mut cells, trailing.filler);
    cells
}

fn format_cell(cell: Option<&Cell<'_>>, col_width: usize) -> String {
    match cell {
        Some(Cell::Line { text, status, .. }) => {
            let text = expand_tabs(text);
            format!(
                "{}{}",
                marker(*status),
                fit_to_width(&text, col_width.saturating_sub(1))
            )
        }
        Some(Cell::Filler) => "-".repeat(col_width),
        None => " ".repeat(col_width),
    }
}

/// Renders the buffers of the diff side by side, in the order of `bufs`.
///
/// A line is prefixed with `!` if it's changed, `+` if other buffers lack it,
/// and a space otherwise. Filler rows are drawn with `-`.
pub fn render_view(
    session: &mut DiffSession,
    store: &dyn LineStore,
    bufs: &[BufferId],
    options: &ViewOptions,
) -> Vec<String> {
    if bufs.is_empty() {
        return vec![];
    }
    let col_width = (options
        .width
        .saturating_sub(SEPARATOR.len() * (bufs.len() - 1))
        / bufs.len())
    .max(2);
    let columns = bufs
        .iter()
        .map(|&buf| column_cells(session, store, buf))
        .collect_vec();
    let row_count = columns.iter().map(Vec::len).max().unwrap_or(0);
    let foldable = |row: usize| {
        options.fold
            && columns.iter().zip(bufs).all(|(cells, &buf)| match cells.get(row) {
                Some(Cell::Line { lnum, .. }) => session.in_fold(buf, *lnum),
                _ => false,
            })
    };

    let mut rows = vec![];
    let mut row = 0;
    while row < row_count {
        if foldable(row) {
            let start = row;
            while row < row_count && foldable(row) {
                row += 1;
            }
            rows.push(format!("+-- {} lines folded", row - start));
            continue;
        }
        let line = columns
            .iter()
            .map(|cells| format_cell(cells.get(row), col_width))
            .join(SEPARATOR);
        rows.push(line.trim_end().to_owned());
        row += 1;
    }
    rows
}

/// Lists the blocks, one per line, as `name:lnum,count` for each buffer.
pub fn format_blocks(session: &DiffSession, store: &MemoryStore) -> Vec<String> {
    let slots = session.slots();
    session
        .blocks()
        .iter()
        .map(|block| {
            slots
                .active()
                .map(|(idx, buf)| {
                    let name = store.name(buf).unwrap_or_default();
                    format!("{name}:{},{}", block.lnum[idx], block.count[idx])
                })
                .join("  ")
        })
        .collect()
}
