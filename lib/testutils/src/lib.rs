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
use std::io;
use std::path::Path;
use std::sync::Mutex;

use itertools::Itertools as _;
use tabdiff_lib::backend::FilterCommand;
use tabdiff_lib::backend::FilterRunner;
use tabdiff_lib::compare::CompareFlags;
use tabdiff_lib::diff::diff_lines;
use tabdiff_lib::diff::LineDiffOptions;
use tabdiff_lib::host::DiffEvent;
use tabdiff_lib::host::DiffHost;
use tabdiff_lib::host::DiffRequests;
use tabdiff_lib::hunk::Hunk;
use tabdiff_lib::options::DiffOptions;
use tabdiff_lib::session::DiffSession;
use tabdiff_lib::store::BufferId;
use tabdiff_lib::store::MemoryStore;
use tabdiff_lib::LineNr;
use tempfile::TempDir;

pub fn new_temp_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("tabdiff-test-")
        .tempdir()
        .unwrap()
}

pub fn diff_options() -> DiffOptions {
    let config = config::Config::builder()
        .add_source(config::File::from_str(
            r#"
                diff.internal = true
                diff.filler = true
            "#,
            config::FileFormat::Toml,
        ))
        .build()
        .unwrap();
    DiffOptions::from_config(&config).unwrap()
}

/// A store with one buffer per text, and a session diffing all of them.
pub struct TestDiff {
    pub store: MemoryStore,
    pub session: DiffSession,
    pub bufs: Vec<BufferId>,
}

impl TestDiff {
    pub fn new(texts: &[&[&str]]) -> Self {
        Self::with_options(diff_options(), texts)
    }

    pub fn with_options(options: DiffOptions, texts: &[&[&str]]) -> Self {
        let mut store = MemoryStore::new();
        let bufs = texts
            .iter()
            .enumerate()
            .map(|(i, lines)| store.add_buffer(&format!("buf{i}"), lines.iter().copied()))
            .collect_vec();
        let mut session = DiffSession::new(options);
        for &buf in &bufs {
            session.add_buffer(buf, &mut RecordingHost::default()).unwrap();
        }
        session
            .recompute(&store, &mut RecordingHost::default())
            .unwrap();
        TestDiff {
            store,
            session,
            bufs,
        }
    }

    /// Recomputes if an edit asked for it.
    pub fn refresh(&mut self) {
        self.session
            .refresh(&self.store, &mut RecordingHost::default())
            .unwrap();
    }

    /// `(lnum, count)` of every block, in slot order.
    pub fn ranges(&self) -> Vec<Vec<(LineNr, LineNr)>> {
        block_ranges(&self.session)
    }

    /// One line per block listing `name:lnum,count` of every buffer.
    pub fn format_blocks(&self) -> String {
        let slots = self.session.slots();
        self.session
            .blocks()
            .iter()
            .map(|block| {
                let ranges = slots
                    .active()
                    .map(|(idx, buf)| {
                        let name = self.store.name(buf).unwrap_or_default();
                        format!("{name}:{},{}", block.lnum[idx], block.count[idx])
                    })
                    .join("  ");
                format!("{ranges}\n")
            })
            .collect()
    }

    pub fn lines(&self, index: usize) -> Vec<&str> {
        self.store
            .lines(self.bufs[index])
            .iter()
            .map(String::as_str)
            .collect()
    }
}

pub fn block_ranges(session: &DiffSession) -> Vec<Vec<(LineNr, LineNr)>> {
    session
        .blocks()
        .iter()
        .map(|block| {
            session
                .slots()
                .active()
                .map(|(idx, _)| (block.lnum[idx], block.count[idx]))
                .collect()
        })
        .collect()
}

/// A host recording everything the engine tells it.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub events: Vec<DiffEvent>,
    pub folds: Vec<(BufferId, LineNr, LineNr)>,
    pub marks: Vec<(BufferId, LineNr, LineNr, LineNr)>,
    pub redraws: usize,
    /// Request a recompute from every `LinesChanged` handler.
    pub recompute_on_lines_changed: bool,
    pub interrupt: bool,
}

impl DiffHost for RecordingHost {
    fn fold_update(&mut self, buf: BufferId, first: LineNr, last: LineNr) {
        self.folds.push((buf, first, last));
    }

    fn request_redraw(&mut self) {
        self.redraws += 1;
    }

    fn fire_event(&mut self, event: DiffEvent, requests: &mut DiffRequests) {
        self.events.push(event);
        if self.recompute_on_lines_changed && matches!(event, DiffEvent::LinesChanged { .. }) {
            requests.request_recompute();
        }
    }

    fn marks_adjusted(&mut self, buf: BufferId, first: LineNr, last: LineNr, amount_after: LineNr) {
        self.marks.push((buf, first, last, amount_after));
    }

    fn interrupted(&self) -> bool {
        self.interrupt
    }
}

/// Stands in for the `diff` program. Compares the last two arguments with the
/// internal algorithm and writes "ed" style output.
#[derive(Debug, Default)]
pub struct FakeDiffRunner {
    pub commands: Mutex<Vec<FilterCommand>>,
    /// Fail like a `diff` that doesn't know `-a`.
    pub rejects_text_flag: bool,
}

impl FakeDiffRunner {
    pub fn commands(&self) -> Vec<FilterCommand> {
        self.commands.lock().unwrap().clone()
    }
}

impl FilterRunner for FakeDiffRunner {
    fn run_filter(&self, command: &FilterCommand) -> io::Result<Option<i32>> {
        self.commands.lock().unwrap().push(command.clone());
        let stdout = command.stdout.as_ref().unwrap();
        if self.rejects_text_flag && command.args.iter().any(|arg| arg == "-a") {
            fs::write(stdout, "")?;
            return Ok(Some(2));
        }
        let [.., orig, new] = command.args.as_slice() else {
            return Ok(Some(2));
        };
        let has_flag = |flag: &str| command.args.iter().any(|arg| arg == flag);
        let options = LineDiffOptions {
            compare: CompareFlags {
                icase: has_flag("-i"),
                iwhite: has_flag("-b"),
                iwhite_all: has_flag("-w"),
                iwhite_eol: has_flag("-Z"),
            },
            ignore_blank_lines: has_flag("-B"),
            ..LineDiffOptions::default()
        };
        let orig = fs::read_to_string(orig)?;
        let new = fs::read_to_string(new)?;
        let orig = orig.lines().collect_vec();
        let new = new.lines().collect_vec();
        let hunks = diff_lines(&orig, &new, &options);
        fs::write(stdout, format_ed_output(&hunks, &orig, &new))?;
        Ok(Some(if hunks.is_empty() { 0 } else { 1 }))
    }
}

/// Formats hunks the way a plain `diff` prints them.
pub fn format_ed_output(hunks: &[Hunk], orig: &[&str], new: &[&str]) -> String {
    fn range(start: LineNr, count: LineNr) -> String {
        if count == 1 {
            start.to_string()
        } else {
            format!("{start},{}", start + count - 1)
        }
    }
    fn slice<'a>(lines: &[&'a str], start: LineNr, count: LineNr) -> Vec<&'a str> {
        let start = usize::try_from(start - 1).unwrap();
        let count = usize::try_from(count).unwrap();
        lines[start..start + count].to_vec()
    }
    let mut output = String::new();
    for hunk in hunks {
        let header = if hunk.orig_count == 0 {
            format!(
                "{}a{}",
                hunk.orig_start - 1,
                range(hunk.new_start, hunk.new_count)
            )
        } else if hunk.new_count == 0 {
            format!(
                "{}d{}",
                range(hunk.orig_start, hunk.orig_count),
                hunk.new_start - 1
            )
        } else {
            format!(
                "{}c{}",
                range(hunk.orig_start, hunk.orig_count),
                range(hunk.new_start, hunk.new_count)
            )
        };
        output.push_str(&header);
        output.push('\n');
        let removed = slice(orig, hunk.orig_start, hunk.orig_count);
        let added = slice(new, hunk.new_start, hunk.new_count);
        for line in &removed {
            output.push_str(&format!("< {line}\n"));
        }
        if !removed.is_empty() && !added.is_empty() {
            output.push_str("---\n");
        }
        for line in &added {
            output.push_str(&format!("> {line}\n"));
        }
    }
    output
}

pub fn assert_no_forgotten_test_files(test_dir: &Path) {
    let runner_path = test_dir.join("runner.rs");
    let runner = fs::read_to_string(&runner_path).unwrap();
    let entries = fs::read_dir(test_dir).unwrap();
    for entry in entries {
        let path = entry.unwrap().path();
        if let Some(ext) = path.extension() {
            let name = path.file_stem().unwrap();
            if ext == "rs" && name != "runner" {
                let search = format!("mod {};", name.to_str().unwrap());
                assert!(
                    runner.contains(&search),
                    "missing `{search}` declaration in {}",
                    runner_path.display()
                );
            }
        }
    }
}
