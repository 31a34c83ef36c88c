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

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use regex::Captures;
use regex::Regex;
use tempfile::TempDir;

pub struct TestEnvironment {
    _temp_dir: TempDir,
    env_root: PathBuf,
    home_dir: PathBuf,
    config_path: PathBuf,
    config: RefCell<String>,
    env_vars: HashMap<String, String>,
}

impl Default for TestEnvironment {
    fn default() -> Self {
        let tmp_dir = testutils::new_temp_dir();
        let env_root = tmp_dir.path().canonicalize().unwrap();
        let home_dir = env_root.join("home");
        std::fs::create_dir(&home_dir).unwrap();
        let config_path = env_root.join("config.toml");
        let env = TestEnvironment {
            _temp_dir: tmp_dir,
            env_root,
            home_dir,
            config_path,
            config: RefCell::new(String::new()),
            env_vars: HashMap::new(),
        };
        // Rows of the side-by-side view don't depend on the terminal.
        env.add_config("ui.width = 23\n");
        env
    }
}

impl TestEnvironment {
    pub fn tabdiff_cmd(&self, args: &[&str]) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("tabdiff").unwrap();
        cmd.current_dir(&self.env_root);
        cmd.args(args);
        cmd.env_clear();
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd.env("RUST_BACKTRACE", "1");
        cmd.env("HOME", self.home_dir.to_str().unwrap());
        cmd.env("TABDIFF_CONFIG", self.config_path.to_str().unwrap());
        if cfg!(windows) {
            // Temp files for the external programs go to `TEMP`.
            if let Ok(tmp_var) = std::env::var("TEMP") {
                cmd.env("TEMP", tmp_var);
            }
        }
        cmd
    }

    fn get_ok(&self, mut cmd: assert_cmd::Command) -> (String, String) {
        let assert = cmd.assert().success();
        let stdout = self.normalize_output(&get_stdout_string(&assert));
        let stderr = self.normalize_output(&get_stderr_string(&assert));
        (stdout, stderr)
    }

    /// Run a `tabdiff` command, check that it was successful, and return its
    /// `(stdout, stderr)`.
    pub fn tabdiff_cmd_ok(&self, args: &[&str]) -> (String, String) {
        self.get_ok(self.tabdiff_cmd(args))
    }

    /// Run a `tabdiff` command, check that it was successful without printing
    /// to stderr, and return its stdout
    #[track_caller]
    pub fn tabdiff_cmd_success(&self, args: &[&str]) -> String {
        let assert = self.tabdiff_cmd(args).assert().success().stderr("");
        self.normalize_output(&get_stdout_string(&assert))
    }

    /// Run a `tabdiff` command, check that it failed with code 1, and return
    /// its stderr
    #[must_use]
    pub fn tabdiff_cmd_failure(&self, args: &[&str]) -> String {
        let assert = self.tabdiff_cmd(args).assert().code(1).stdout("");
        self.normalize_output(&get_stderr_string(&assert))
    }

    /// Run a `tabdiff` command and check that it failed with code 2 (for
    /// invalid usage)
    #[must_use]
    pub fn tabdiff_cmd_cli_error(&self, args: &[&str]) -> String {
        let assert = self.tabdiff_cmd(args).assert().code(2).stdout("");
        self.normalize_output(&get_stderr_string(&assert))
    }

    pub fn env_root(&self) -> &Path {
        &self.env_root
    }

    /// Writes a file to compare, relative to the directory the commands run
    /// in.
    pub fn write_file(&self, name: &str, content: &str) {
        std::fs::write(self.env_root.join(name), content).unwrap();
    }

    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.env_root.join(name)).unwrap()
    }

    /// Appends to the user config. Tables must not be repeated.
    pub fn add_config(&self, content: &str) {
        let mut config = self.config.borrow_mut();
        config.push_str(content);
        if !config.ends_with('\n') {
            config.push('\n');
        }
        std::fs::write(&self.config_path, config.as_bytes()).unwrap();
    }

    pub fn add_env_var(&mut self, key: &str, val: &str) {
        self.env_vars.insert(key.to_string(), val.to_string());
    }

    /// Configures `fake-diff` as the external diff program.
    pub fn set_up_fake_diff(&self) {
        let escaped_path = escaped_fake_bin_path("fake-diff");
        self.add_config(&format!(
            r###"
            [diff.external]
            program = "{escaped_path}"
            "###
        ));
    }

    /// Configures `fake-patch` as the patch program.
    pub fn set_up_fake_patch(&self) {
        let escaped_path = escaped_fake_bin_path("fake-patch");
        self.add_config(&format!(
            r###"
            [diff.patch]
            program = "{escaped_path}"
            patch-args = ["$output", "$original"]
            "###
        ));
    }

    pub fn normalize_output(&self, text: &str) -> String {
        let text = text.replace("tabdiff.exe", "tabdiff");
        let regex = Regex::new(&format!(
            r"{}(\S+)",
            regex::escape(&self.env_root.display().to_string())
        ))
        .unwrap();
        regex
            .replace_all(&text, |caps: &Captures| {
                format!("$TEST_ENV{}", caps[1].replace('\\', "/"))
            })
            .to_string()
    }
}

#[track_caller]
pub fn get_stdout_string(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

#[track_caller]
pub fn get_stderr_string(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8(assert.get_output().stderr.clone()).unwrap()
}

fn escaped_fake_bin_path(name: &str) -> String {
    let path = assert_cmd::cargo::cargo_bin(name);
    assert!(path.is_file());
    // Simplified TOML escaping, hoping that there are no '"' or control characters
    // in it
    path.to_str().unwrap().replace('\\', r"\\")
}

/// Returns the first line of `s`.
///
/// Use this to drop platform-specific causes of an error for example.
pub fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or_default()
}
