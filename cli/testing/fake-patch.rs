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

use std::fs;
use std::io::Read as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

/// A fake patch program, useful for testing
///
/// Reads the patch from stdin. Every `OLD => NEW` line of it replaces lines
/// equal to `OLD` with `NEW`. Other lines of the patch are ignored.
#[derive(Parser, Debug)]
struct Args {
    /// File to write the patched text to
    output: PathBuf,
    /// File to patch
    original: PathBuf,
    /// Exit with non-successful status without writing anything
    #[arg(long)]
    fail: bool,
}

fn main() -> ExitCode {
    let args: Args = Args::parse();
    if args.fail {
        return ExitCode::from(1);
    }
    let mut patch = String::new();
    std::io::stdin().read_to_string(&mut patch).unwrap();
    let replacements: Vec<(&str, &str)> = patch
        .lines()
        .filter_map(|line| line.split_once(" => "))
        .collect();
    let original = fs::read_to_string(&args.original).unwrap();
    let mut patched = String::new();
    for line in original.lines() {
        let line = replacements
            .iter()
            .find(|(old, _)| *old == line)
            .map_or(line, |&(_, new)| new);
        patched.push_str(line);
        patched.push('\n');
    }
    fs::write(&args.output, patched).unwrap();
    ExitCode::SUCCESS
}
