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

use tabdiff_lib::getput::Transfer;
use tracing::instrument;

use super::get::run_transfer;
use super::get::TransferArgs;
use crate::cli_util::CommandHelper;
use crate::command_error::CommandError;
use crate::ui::Ui;

/// Copy changes from the current file into another one
///
/// Prints the changed file afterwards. Without `--buffer`, the only other
/// file that isn't read-only is changed.
#[derive(clap::Args, Clone, Debug)]
pub(crate) struct PutArgs {
    #[command(flatten)]
    transfer: TransferArgs,
}

#[instrument(skip_all)]
pub(crate) fn cmd_put(
    ui: &mut Ui,
    command: &CommandHelper,
    args: &PutArgs,
) -> Result<(), CommandError> {
    run_transfer(ui, command, &args.transfer, Transfer::Put)
}
