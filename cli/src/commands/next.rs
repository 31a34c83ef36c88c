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

use std::io::Write as _;
use std::path::PathBuf;

use tabdiff_lib::store::LineStore as _;
use tabdiff_lib::LineNr;
use tracing::instrument;

use crate::cli_util::CommandHelper;
use crate::command_error::user_error;
use crate::command_error::CommandError;
use crate::ui::Ui;

/// Print the line where the next change starts
///
/// Searches below `--line` of the chosen file, or above it with `--prev`.
/// Without `--line`, the search starts before the first line, or after the
/// last one with `--prev`.
#[derive(clap::Args, Clone, Debug)]
pub(crate) struct NextArgs {
    /// Files to compare
    #[arg(required = true, num_args = 2..=4, value_hint = clap::ValueHint::FilePath)]
    paths: Vec<PathBuf>,
    /// The file to search, by name or position (default: the first file)
    #[arg(long, value_name = "FILE")]
    buffer: Option<String>,
    /// Line to start searching from
    #[arg(long, value_name = "LINE")]
    line: Option<LineNr>,
    /// How many changes to move over
    #[arg(long, default_value_t = 1)]
    count: usize,
    /// Search backward for the previous change
    #[arg(long)]
    prev: bool,
}

#[instrument(skip_all)]
pub(crate) fn cmd_next(
    ui: &mut Ui,
    command: &CommandHelper,
    args: &NextArgs,
) -> Result<(), CommandError> {
    let diff = command.load_diff(&args.paths)?;
    let buf = match &args.buffer {
        Some(name) => diff.resolve_buffer(name)?,
        None => diff.bufs[0],
    };
    let found = if args.prev {
        let cursor = args
            .line
            .unwrap_or_else(|| diff.store.line_count(buf) + 1);
        diff.session.prev_change(&diff.store, buf, cursor, args.count)
    } else {
        let cursor = args.line.unwrap_or(0);
        diff.session.next_change(&diff.store, buf, cursor, args.count)
    };
    let lnum = found.ok_or_else(|| user_error("No more changes"))?;
    writeln!(ui.stdout(), "{lnum}")?;
    Ok(())
}
