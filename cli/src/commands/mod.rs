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

mod blocks;
mod get;
mod next;
mod patch;
mod put;
mod show;

use clap::ArgMatches;
use clap::CommandFactory as _;
use clap::FromArgMatches as _;
use clap::Subcommand as _;
use tracing::instrument;

use crate::cli_util::Args;
use crate::cli_util::CommandHelper;
use crate::command_error::CommandError;
use crate::ui::Ui;

#[derive(clap::Subcommand, Clone, Debug)]
enum Commands {
    Blocks(blocks::BlocksArgs),
    Get(get::GetArgs),
    Next(next::NextArgs),
    Patch(patch::PatchArgs),
    Put(put::PutArgs),
    Show(show::ShowArgs),
}

pub fn default_app() -> clap::Command {
    Commands::augment_subcommands(Args::command())
        .subcommand_required(true)
        .arg_required_else_help(true)
}

#[instrument(skip_all)]
pub fn run_command(
    ui: &mut Ui,
    command_helper: &CommandHelper,
    matches: &ArgMatches,
) -> Result<(), CommandError> {
    let subcommand = Commands::from_arg_matches(matches)?;
    match &subcommand {
        Commands::Blocks(args) => blocks::cmd_blocks(ui, command_helper, args),
        Commands::Get(args) => get::cmd_get(ui, command_helper, args),
        Commands::Next(args) => next::cmd_next(ui, command_helper, args),
        Commands::Patch(args) => patch::cmd_patch(ui, command_helper, args),
        Commands::Put(args) => put::cmd_put(ui, command_helper, args),
        Commands::Show(args) => show::cmd_show(ui, command_helper, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_definition() {
        default_app().debug_assert();
    }
}
