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

use tracing::instrument;

use crate::cli_util::CommandHelper;
use crate::command_error::CommandError;
use crate::ui::Ui;

/// Show the files side by side
///
/// Lines that differ are marked with `!`, and lines the other files lack
/// with `+`. Rows of `-` stand in for lines only other files have, so each
/// row shows corresponding lines.
#[derive(clap::Args, Clone, Debug)]
pub(crate) struct ShowArgs {
    /// Files to compare
    #[arg(required = true, num_args = 2..=4, value_hint = clap::ValueHint::FilePath)]
    paths: Vec<PathBuf>,
    /// Fold unchanged lines further than `diff.context` lines from a change
    #[arg(long)]
    fold: bool,
}

#[instrument(skip_all)]
pub(crate) fn cmd_show(
    ui: &mut Ui,
    command: &CommandHelper,
    args: &ShowArgs,
) -> Result<(), CommandError> {
    let mut diff = command.load_diff(&args.paths)?;
    let rows = diff.render(ui, args.fold);
    let mut stdout = ui.stdout();
    for row in rows {
        writeln!(stdout, "{row}")?;
    }
    Ok(())
}
