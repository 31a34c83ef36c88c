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

use tabdiff_lib::patch::patched_buffer_name;
use tracing::instrument;

use crate::cli_util::CommandHelper;
use crate::command_error::CommandError;
use crate::ui::Ui;

/// Apply a patch to a file and show the result next to it
///
/// The patch is applied by the program configured in `diff.patch`. The file
/// itself is left unchanged.
#[derive(clap::Args, Clone, Debug)]
pub(crate) struct PatchArgs {
    /// File to patch
    #[arg(value_hint = clap::ValueHint::FilePath)]
    file: PathBuf,
    /// Patch to apply
    #[arg(value_hint = clap::ValueHint::FilePath)]
    patch_file: PathBuf,
    /// Fold unchanged lines further than `diff.context` lines from a change
    #[arg(long)]
    fold: bool,
}

#[instrument(skip_all)]
pub(crate) fn cmd_patch(
    ui: &mut Ui,
    command: &CommandHelper,
    args: &PatchArgs,
) -> Result<(), CommandError> {
    let mut diff = command.load_diff(std::slice::from_ref(&args.file))?;
    let buf = diff.bufs[0];
    let lines = diff
        .session
        .patcher()
        .apply(&diff.store, buf, &args.patch_file)?;
    let name = patched_buffer_name(diff.name(buf));
    let patched = diff.store.add_buffer(&name, lines);
    diff.add_buffer(patched)?;
    diff.refresh()?;

    let rows = diff.render(ui, args.fold);
    let mut stdout = ui.stdout();
    for row in rows {
        writeln!(stdout, "{row}")?;
    }
    Ok(())
}
