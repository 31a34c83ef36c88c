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

use tabdiff_lib::linematch::linematch;
use tabdiff_lib::options::DiffOptions;
use tabdiff_lib::sync::LineStatus;
use testutils::diff_options;
use testutils::TestDiff;

fn with_linematch(ceiling: usize, texts: &[&[&str]]) -> TestDiff {
    let options = DiffOptions {
        linematch: Some(ceiling),
        ..diff_options()
    };
    TestDiff::with_options(options, texts)
}

#[test]
fn test_similar_lines_are_aligned() {
    let mut test = with_linematch(
        10,
        &[&["same", "abc", "x", "y", "end"], &["same", "abd", "end"]],
    );
    assert_eq!(test.ranges(), vec![vec![(2, 3), (2, 1)]]);
    test.session.apply_linematch(&test.store);
    assert_eq!(
        test.ranges(),
        vec![vec![(2, 1), (2, 1)], vec![(3, 2), (3, 0)]]
    );
    assert!(test.session.blocks().iter().all(|block| block.is_linematched));
    insta::assert_snapshot!(test.format_blocks(), @r###"
    buf0:2,1  buf1:2,1
    buf0:3,2  buf1:3,0
    "###);

    let b = test.bufs[1];
    let info = test.session.check(&test.store, b, 3);
    assert_eq!(info.filler, 2);
    assert_eq!(info.status, LineStatus::Unchanged);
    // Matching again changes nothing.
    test.session.apply_linematch(&test.store);
    assert_eq!(test.session.blocks().len(), 2);
}

#[test]
fn test_block_above_ceiling_is_kept() {
    let mut test = with_linematch(
        3,
        &[&["same", "abc", "x", "y", "end"], &["same", "abd", "end"]],
    );
    test.session.apply_linematch(&test.store);
    assert_eq!(test.ranges(), vec![vec![(2, 3), (2, 1)]]);
}

#[test]
fn test_check_matches_visible_block() {
    let mut test = with_linematch(10, &[&["abc", "x"], &["y", "abd"]]);
    let a = test.bufs[0];
    assert_eq!(test.ranges(), vec![vec![(1, 2), (1, 2)]]);
    test.session.check(&test.store, a, 1);
    insta::assert_snapshot!(test.format_blocks(), @r###"
    buf0:1,0  buf1:1,1
    buf0:1,1  buf1:2,1
    buf0:2,1  buf1:3,0
    "###);
}

#[test]
fn test_decisions() {
    let blocks = vec![vec!["abc", "x", "y"], vec!["abd"]];
    assert_eq!(linematch(&blocks, false), vec![0b11, 0b01, 0b01]);
    let blocks = vec![vec!["a b", "c"], vec!["ab"]];
    assert_eq!(linematch(&blocks, true), vec![0b11, 0b01]);
}
