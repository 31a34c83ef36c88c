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

use crate::common::TestEnvironment;

#[test]
fn test_blocks() {
    let test_env = TestEnvironment::default();
    test_env.write_file("a.txt", "a\nb\nc\nd\n");
    test_env.write_file("b.txt", "a\nx\nc\n");
    let stdout = test_env.tabdiff_cmd_success(&["blocks", "a.txt", "b.txt"]);
    insta::assert_snapshot!(stdout, @r###"
    a.txt:2,1  b.txt:2,1
    a.txt:4,1  b.txt:4,0
    "###);
}

#[test]
fn test_blocks_no_differences() {
    let test_env = TestEnvironment::default();
    test_env.write_file("a.txt", "a\nb\n");
    test_env.write_file("b.txt", "a\nb\n");
    let (stdout, stderr) = test_env.tabdiff_cmd_ok(&["blocks", "a.txt", "b.txt"]);
    assert_eq!(stdout, "");
    insta::assert_snapshot!(stderr, @r###"
    No differences
    "###);

    let (stdout, stderr) = test_env.tabdiff_cmd_ok(&["blocks", "--quiet", "a.txt", "b.txt"]);
    assert_eq!(stdout, "");
    assert_eq!(stderr, "");
}

#[test]
fn test_blocks_linematch() {
    let test_env = TestEnvironment::default();
    test_env.write_file("a.txt", "same\nabc\nx\ny\nend\n");
    test_env.write_file("b.txt", "same\nabd\nend\n");
    let stdout = test_env.tabdiff_cmd_success(&["blocks", "a.txt", "b.txt"]);
    insta::assert_snapshot!(stdout, @r###"
    a.txt:2,3  b.txt:2,1
    "###);

    let stdout = test_env.tabdiff_cmd_success(&["blocks", "--linematch=10", "a.txt", "b.txt"]);
    insta::assert_snapshot!(stdout, @r###"
    a.txt:2,1  b.txt:2,1
    a.txt:3,2  b.txt:3,0
    "###);
}

#[test]
fn test_blocks_ignore_blank_lines() {
    let test_env = TestEnvironment::default();
    test_env.write_file("a.txt", "a\n\nb\n");
    test_env.write_file("b.txt", "a\nb\n");
    let stdout = test_env.tabdiff_cmd_success(&["blocks", "a.txt", "b.txt"]);
    insta::assert_snapshot!(stdout, @r###"
    a.txt:2,1  b.txt:2,0
    "###);

    let (stdout, stderr) = test_env.tabdiff_cmd_ok(&["blocks", "-B", "a.txt", "b.txt"]);
    assert_eq!(stdout, "");
    assert_eq!(stderr, "No differences\n");
}

#[test]
fn test_blocks_ignore_white_space() {
    let test_env = TestEnvironment::default();
    test_env.write_file("a.txt", "a  b\nc \n");
    test_env.write_file("b.txt", "a b\nc\n");
    let stdout = test_env.tabdiff_cmd_success(&["blocks", "a.txt", "b.txt"]);
    insta::assert_snapshot!(stdout, @r###"
    a.txt:1,2  b.txt:1,2
    "###);

    let (stdout, _) = test_env.tabdiff_cmd_ok(&["blocks", "-b", "a.txt", "b.txt"]);
    assert_eq!(stdout, "");
    let (stdout, _) = test_env.tabdiff_cmd_ok(&["blocks", "-Z", "a.txt", "b.txt"]);
    assert_eq!(stdout, "a.txt:1,1  b.txt:1,1\n");
}

#[test]
fn test_blocks_three_files() {
    let test_env = TestEnvironment::default();
    test_env.write_file("a.txt", "a\nb\nc\n");
    test_env.write_file("b.txt", "a\nx\nc\n");
    test_env.write_file("c.txt", "a\nb\nc\n");
    let stdout = test_env.tabdiff_cmd_success(&["blocks", "a.txt", "b.txt", "c.txt"]);
    insta::assert_snapshot!(stdout, @r###"
    a.txt:2,1  b.txt:2,1  c.txt:2,1
    "###);
}
