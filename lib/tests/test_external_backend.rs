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

use std::path::Path;
use std::sync::Arc;

use assert_matches::assert_matches;
use tabdiff_lib::backend::BackendError;
use tabdiff_lib::backend::DiffExpr;
use tabdiff_lib::options::DiffOptions;
use tabdiff_lib::session::DiffSession;
use tabdiff_lib::session::SessionError;
use tabdiff_lib::store::BufferId;
use tabdiff_lib::store::MemoryStore;
use testutils::block_ranges;
use testutils::diff_options;
use testutils::format_ed_output;
use testutils::FakeDiffRunner;
use testutils::RecordingHost;
use testutils::TestDiff;

fn external_session(
    options: DiffOptions,
    texts: &[&[&str]],
) -> (MemoryStore, DiffSession, Arc<FakeDiffRunner>) {
    let mut store = MemoryStore::new();
    let runner = Arc::new(FakeDiffRunner::default());
    let mut session = DiffSession::new(DiffOptions {
        internal: false,
        ..options
    });
    session.set_filter_runner(runner.clone());
    for (i, lines) in texts.iter().enumerate() {
        let buf = store.add_buffer(&format!("buf{i}"), lines.iter().copied());
        session.add_buffer(buf, &mut RecordingHost::default()).unwrap();
    }
    (store, session, runner)
}

#[test]
fn test_same_blocks_as_internal() {
    let texts: &[&[&str]] = &[
        &["a", "b", "c", "d", "e"],
        &["a", "x", "c", "e", "f"],
        &["", "a", "b", "c", "d", "e"],
    ];
    let (store, mut session, runner) = external_session(diff_options(), texts);
    session
        .recompute(&store, &mut RecordingHost::default())
        .unwrap();
    assert_eq!(block_ranges(&session), TestDiff::new(texts).ranges());
    assert!(!runner.commands().is_empty());
}

#[test]
fn test_white_space_flag() {
    let options = DiffOptions {
        iwhite: true,
        ..diff_options()
    };
    let (store, mut session, runner) =
        external_session(options, &[&["a  b", "c"], &["a b", "d"]]);
    session
        .recompute(&store, &mut RecordingHost::default())
        .unwrap();
    assert_eq!(block_ranges(&session), vec![vec![(2, 1), (2, 1)]]);
    let commands = runner.commands();
    let last = commands.last().unwrap();
    assert_eq!(last.program, "diff");
    assert!(last.args.iter().any(|arg| arg == "-b"));
    assert_eq!(last.stdin, None);
}

#[test]
fn test_interrupted() {
    let (store, mut session, _runner) = external_session(diff_options(), &[&["a"], &["b"]]);
    let mut host = RecordingHost {
        interrupt: true,
        ..RecordingHost::default()
    };
    assert_matches!(
        session.recompute(&store, &mut host),
        Err(SessionError::Backend(BackendError::Interrupted))
    );
    assert!(session.blocks().is_empty());
    assert!(session.is_invalid());
    assert!(host.events.is_empty());

    // The next refresh tries again.
    session
        .refresh(&store, &mut RecordingHost::default())
        .unwrap();
    assert_eq!(block_ranges(&session), vec![vec![(1, 1), (1, 1)]]);
    assert!(!session.is_invalid());
}

#[derive(Debug)]
struct UnifiedExpr;

impl DiffExpr for UnifiedExpr {
    fn diff_files(
        &self,
        _orig: &Path,
        _new: &Path,
        output: &Path,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Claims line 1 changed, whatever the input.
        std::fs::write(output, "--- a\n+++ b\n@@ -1 +1 @@\n-x\n+y\n")?;
        Ok(())
    }
}

#[test]
fn test_diff_expr_replaces_program() {
    let (store, mut session, runner) =
        external_session(diff_options(), &[&["a", "b"], &["a", "c"]]);
    session.set_diff_expr(Some(Arc::new(UnifiedExpr)));
    session
        .refresh(&store, &mut RecordingHost::default())
        .unwrap();
    assert_eq!(block_ranges(&session), vec![vec![(1, 1), (1, 1)]]);
    assert!(runner.commands().is_empty());
}

#[test]
fn test_format_ed_output() {
    let hunks = tabdiff_lib::diff::diff_lines(
        &["a", "b", "c"],
        &["a", "c", "d"],
        &DiffOptions::default().line_diff_options(),
    );
    let output = format_ed_output(&hunks, &["a", "b", "c"], &["a", "c", "d"]);
    assert_eq!(output, "2d1\n< b\n3a3\n> d\n");
    assert_eq!(tabdiff_lib::hunk::parse_diff_output(&output), hunks);
}

#[test]
fn test_buffer_not_in_session_is_ignored() {
    let (store, mut session, _runner) = external_session(diff_options(), &[&["a"], &["a"]]);
    session
        .recompute(&store, &mut RecordingHost::default())
        .unwrap();
    assert!(!session.contains(BufferId(99)));
    assert!(session.blocks().is_empty());
}
