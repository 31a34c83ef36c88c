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

use tabdiff_lib::adjust::LineAdjustment;
use tabdiff_lib::store::LineStore as _;
use testutils::RecordingHost;
use testutils::TestDiff;

/// Checks that the adjusted blocks are the ones a recompute finds.
fn assert_adjusted_like_recompute(test: &mut TestDiff, expected: Vec<Vec<(i64, i64)>>) {
    assert_eq!(test.ranges(), expected, "adjusted blocks");
    assert!(test.session.needs_update());
    test.refresh();
    assert_eq!(test.ranges(), expected, "recomputed blocks");
}

#[test]
fn test_insert_line_without_blocks() {
    let mut test = TestDiff::new(&[&["a", "b", "c"], &["a", "b", "c"]]);
    let a = test.bufs[0];
    test.store.insert_line_after(a, 1, "new").unwrap();
    test.session
        .lines_inserted(&test.store, &mut RecordingHost::default(), a, 1, 1);
    assert_adjusted_like_recompute(&mut test, vec![vec![(2, 1), (2, 0)]]);
}

#[test]
fn test_delete_line_without_blocks() {
    let mut test = TestDiff::new(&[&["a", "b", "c", "d"], &["a", "b", "c", "d"]]);
    let b = test.bufs[1];
    test.store.delete_line(b, 3).unwrap();
    test.session
        .lines_deleted(&test.store, &mut RecordingHost::default(), b, 3, 1);
    assert_adjusted_like_recompute(&mut test, vec![vec![(3, 1), (3, 0)]]);
}

#[test]
fn test_insert_above_block_moves_it() {
    let mut test = TestDiff::new(&[&["a", "b", "c"], &["a", "x", "c"]]);
    let a = test.bufs[0];
    test.store.insert_line_after(a, 0, "").unwrap();
    test.session
        .lines_inserted(&test.store, &mut RecordingHost::default(), a, 0, 1);
    assert_adjusted_like_recompute(
        &mut test,
        vec![vec![(1, 1), (1, 0)], vec![(3, 1), (2, 1)]],
    );
}

#[test]
fn test_insert_below_blocks_keeps_them() {
    let mut test = TestDiff::new(&[&["a", "b", "c"], &["a", "x", "c"]]);
    let b = test.bufs[1];
    test.store.insert_line_after(b, 3, "d").unwrap();
    test.session.mark_adjust(
        &test.store,
        &mut RecordingHost::default(),
        b,
        LineAdjustment::inserted(3, 1),
    );
    assert_adjusted_like_recompute(
        &mut test,
        vec![vec![(2, 1), (2, 1)], vec![(4, 0), (4, 1)]],
    );
}

#[test]
fn test_edit_redraws_and_unfolds() {
    let mut test = TestDiff::new(&[&["a", "b"], &["a", "b"]]);
    let a = test.bufs[0];
    let mut host = RecordingHost::default();
    test.store.insert_line_after(a, 2, "c").unwrap();
    test.session.lines_inserted(&test.store, &mut host, a, 2, 1);
    assert!(host.redraws > 0);
    assert!(host.folds.iter().any(|&(buf, _, _)| buf == a));
    assert!(test.session.take_scrollbind_request());
}
