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

use tabdiff_lib::getput::LineRange;
use tabdiff_lib::getput::Transfer;
use tabdiff_lib::LineNr;
use tracing::instrument;

use crate::cli_util::CommandHelper;
use crate::command_error::CommandError;
use crate::ui::Ui;

/// Copy changes from another file into the current one
///
/// Prints the current file afterwards.
#[derive(clap::Args, Clone, Debug)]
pub(crate) struct GetArgs {
    #[command(flatten)]
    transfer: TransferArgs,
}

/// Arguments shared by `get` and `put`.
#[derive(clap::Args, Clone, Debug)]
pub(crate) struct TransferArgs {
    /// Files to compare
    #[arg(required = true, num_args = 2..=4, value_hint = clap::ValueHint::FilePath)]
    paths: Vec<PathBuf>,
    /// The current file, by name or position (default: the first file)
    #[arg(long, value_name = "FILE")]
    current: Option<String>,
    /// The other file, by name or position
    ///
    /// May be omitted if there is only one other file that can be used.
    #[arg(long, value_name = "FILE")]
    buffer: Option<String>,
    /// Copy the change at this line of the current file, or just above it
    #[arg(long, value_name = "LINE", default_value_t = 1)]
    line: LineNr,
    /// Copy only the changed lines within FIRST,LAST of the current file
    #[arg(long, value_name = "FIRST,LAST", value_parser = parse_line_range, conflicts_with = "line")]
    range: Option<LineRange>,
    /// Write the changed file back to disk
    #[arg(long)]
    write: bool,
}

fn parse_line_range(s: &str) -> Result<LineRange, String> {
    let (first, last) = s
        .split_once(',')
        .ok_or_else(|| format!("expected FIRST,LAST, got {s:?}"))?;
    let parse = |n: &str| {
        n.trim()
            .parse::<LineNr>()
            .map_err(|err| format!("invalid line number {n:?}: {err}"))
    };
    let (first, last) = (parse(first)?, parse(last)?);
    if first < 1 || last < first {
        return Err(format!("invalid range {first},{last}"));
    }
    Ok(LineRange::Lines(first, last))
}

#[instrument(skip_all)]
pub(crate) fn cmd_get(
    ui: &mut Ui,
    command: &CommandHelper,
    args: &GetArgs,
) -> Result<(), CommandError> {
    run_transfer(ui, command, &args.transfer, Transfer::Get)
}

pub(crate) fn run_transfer(
    ui: &mut Ui,
    command: &CommandHelper,
    args: &TransferArgs,
    transfer: Transfer,
) -> Result<(), CommandError> {
    let mut diff = command.load_diff(&args.paths)?;
    let cur = match &args.current {
        Some(name) => diff.resolve_buffer(name)?,
        None => diff.bufs[0],
    };
    let other = args
        .buffer
        .as_deref()
        .map(|name| diff.resolve_buffer(name))
        .transpose()?;
    let range = args.range.unwrap_or(LineRange::Cursor(args.line));
    let copied = diff.session.get_put(
        &mut diff.store,
        &mut diff.host,
        transfer,
        cur,
        other,
        range,
    )?;
    match copied {
        0 => writeln!(ui.status(), "Nothing changed")?,
        1 => writeln!(ui.status(), "Copied 1 change")?,
        n => writeln!(ui.status(), "Copied {n} changes")?,
    }

    let target = match transfer {
        Transfer::Get => Some(cur),
        Transfer::Put => diff.host.changed_buffers().first().copied().or(other),
    };
    let Some(target) = target else {
        return Ok(());
    };
    {
        let mut stdout = ui.stdout();
        for line in diff.store.lines(target) {
            writeln!(stdout, "{line}")?;
        }
    }
    if args.write && diff.host.changed_buffers().contains(&target) {
        diff.write_back(target)?;
        writeln!(ui.status(), "Wrote {}", diff.name(target))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_parse_line_range() {
        assert_eq!(parse_line_range("2,4"), Ok(LineRange::Lines(2, 4)));
        assert_eq!(parse_line_range(" 3 , 3"), Ok(LineRange::Lines(3, 3)));
        assert_matches!(parse_line_range("3"), Err(_));
        assert_matches!(parse_line_range("4,2"), Err(_));
        assert_matches!(parse_line_range("0,2"), Err(_));
        assert_matches!(parse_line_range("a,b"), Err(_));
    }
}
