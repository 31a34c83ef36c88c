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

use test_case::test_case;

use crate::common::TestEnvironment;

fn set_up(test_env: &TestEnvironment) {
    test_env.write_file("a.txt", "1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n");
    test_env.write_file("b.txt", "1\n2\nx\n4\n5\n6\ny\n8\n9\n10\n");
}

#[test_case(&[], "3"; "first change")]
#[test_case(&["--line", "3"], "7"; "from a change")]
#[test_case(&["--line", "5"], "7"; "between changes")]
#[test_case(&["--count", "2"], "7"; "with count")]
#[test_case(&["--prev"], "7"; "previous from the end")]
#[test_case(&["--prev", "--line", "7"], "3"; "previous from a change")]
fn test_next(args: &[&str], expected: &str) {
    let test_env = TestEnvironment::default();
    set_up(&test_env);
    let mut all_args = vec!["next", "a.txt", "b.txt"];
    all_args.extend_from_slice(args);
    let stdout = test_env.tabdiff_cmd_success(&all_args);
    assert_eq!(stdout, format!("{expected}\n"));
}

#[test]
fn test_next_past_last_change() {
    let test_env = TestEnvironment::default();
    set_up(&test_env);
    let stderr = test_env.tabdiff_cmd_failure(&["next", "a.txt", "b.txt", "--line", "7"]);
    insta::assert_snapshot!(stderr, @r###"
    Error: No more changes
    "###);
}

#[test]
fn test_prev_before_first_change() {
    let test_env = TestEnvironment::default();
    set_up(&test_env);
    let stderr =
        test_env.tabdiff_cmd_failure(&["next", "--prev", "a.txt", "b.txt", "--line", "3"]);
    insta::assert_snapshot!(stderr, @r###"
    Error: No more changes
    "###);
}

#[test]
fn test_next_in_other_buffer() {
    let test_env = TestEnvironment::default();
    test_env.write_file("a.txt", "1\n2\n3\n");
    test_env.write_file("b.txt", "0\n1\n2\nx\n");
    let stdout = test_env.tabdiff_cmd_success(&["next", "a.txt", "b.txt", "--buffer", "b.txt"]);
    assert_eq!(stdout, "1\n");
    let stdout = test_env.tabdiff_cmd_success(&[
        "next", "a.txt", "b.txt", "--buffer", "2", "--line", "1",
    ]);
    assert_eq!(stdout, "4\n");
}
