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
use crate::render::format_blocks;
use crate::ui::Ui;

/// List the changed blocks
///
/// Each line shows one block as `FILE:LINE,COUNT` for every file. A count of
/// zero means the file lacks the lines, which would go above `LINE`.
#[derive(clap::Args, Clone, Debug)]
pub(crate) struct BlocksArgs {
    /// Files to compare
    #[arg(required = true, num_args = 2..=4, value_hint = clap::ValueHint::FilePath)]
    paths: Vec<PathBuf>,
}

#[instrument(skip_all)]
pub(crate) fn cmd_blocks(
    ui: &mut Ui,
    command: &CommandHelper,
    args: &BlocksArgs,
) -> Result<(), CommandError> {
    let mut diff = command.load_diff(&args.paths)?;
    if command.diff_options().linematch.is_some() {
        diff.session.apply_linematch(&diff.store);
    }
    let lines = format_blocks(&diff.session, &diff.store);
    if lines.is_empty() {
        writeln!(ui.status(), "No differences")?;
        return Ok(());
    }
    let mut stdout = ui.stdout();
    for line in lines {
        writeln!(stdout, "{line}")?;
    }
    Ok(())
}
