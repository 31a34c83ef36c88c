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
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

/// A fake diff program, useful for testing
///
/// Compares the files line by line, without looking for moved lines. Lines
/// past the end of the shorter file are reported as appended or deleted.
/// Prints the differences in the "ed" style of `diff`. Of the flags a real
/// `diff` takes, only `-i` has an effect.
#[derive(Parser, Debug)]
#[allow(dead_code)]
struct Args {
    #[arg(short = 'a')]
    text: bool,
    #[arg(short = 'b')]
    ignore_space_change: bool,
    #[arg(short = 'w')]
    ignore_all_space: bool,
    #[arg(short = 'Z')]
    ignore_trailing_space: bool,
    #[arg(short = 'B')]
    ignore_blank_lines: bool,
    /// Compare lines ignoring case
    #[arg(short = 'i')]
    ignore_case: bool,
    orig: PathBuf,
    new: PathBuf,
}

fn main() -> ExitCode {
    let args: Args = Args::parse();
    let orig = fs::read_to_string(&args.orig).unwrap();
    let new = fs::read_to_string(&args.new).unwrap();
    let orig: Vec<&str> = orig.lines().collect();
    let new: Vec<&str> = new.lines().collect();
    let equal = |a: &str, b: &str| {
        if args.ignore_case {
            a.to_lowercase() == b.to_lowercase()
        } else {
            a == b
        }
    };

    let mut differs = false;
    for (i, (a, b)) in orig.iter().zip(&new).enumerate() {
        if !equal(a, b) {
            println!("{n}c{n}\n< {a}\n---\n> {b}", n = i + 1);
            differs = true;
        }
    }
    if orig.len() < new.len() {
        println!("{}a{},{}", orig.len(), orig.len() + 1, new.len());
        differs = true;
    } else if orig.len() > new.len() {
        println!("{},{}d{}", new.len() + 1, orig.len(), new.len());
        differs = true;
    }
    if differs {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
