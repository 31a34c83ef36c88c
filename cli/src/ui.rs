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

use std::io;
use std::io::Stderr;
use std::io::StderrLock;
use std::io::Stdout;
use std::io::StdoutLock;
use std::io::Write;

use crate::command_error::config_error_with_message;
use crate::command_error::CommandError;

const DEFAULT_WIDTH: usize = 80;

pub struct Ui {
    quiet: bool,
    width: usize,
    stdout: Stdout,
    stderr: Stderr,
}

fn be_quiet(config: &config::Config) -> bool {
    config.get_bool("ui.quiet").unwrap_or_default()
}

fn width_setting(config: &config::Config) -> Result<usize, CommandError> {
    match config.get::<usize>("ui.width") {
        Ok(width) => Ok(width),
        Err(config::ConfigError::NotFound(_)) => Ok(DEFAULT_WIDTH),
        Err(err) => Err(config_error_with_message("Invalid `ui.width`", err)),
    }
}

impl Ui {
    /// Creates a UI with default settings, used until the config is loaded.
    pub fn null() -> Ui {
        Ui {
            quiet: false,
            width: DEFAULT_WIDTH,
            stdout: io::stdout(),
            stderr: io::stderr(),
        }
    }

    pub fn with_config(config: &config::Config) -> Result<Ui, CommandError> {
        Ok(Ui {
            quiet: be_quiet(config),
            width: width_setting(config)?,
            ..Ui::null()
        })
    }

    pub fn reset(&mut self, config: &config::Config) -> Result<(), CommandError> {
        self.quiet = be_quiet(config);
        self.width = width_setting(config)?;
        Ok(())
    }

    /// Locked stdout stream.
    pub fn stdout(&self) -> StdoutLock<'static> {
        self.stdout.lock()
    }

    /// Locked stderr stream.
    pub fn stderr(&self) -> StderrLock<'static> {
        self.stderr.lock()
    }

    /// Writer for messages about what a command did. Discards them if the
    /// user asked for quiet.
    pub fn status(&self) -> Box<dyn Write + '_> {
        if self.quiet {
            Box::new(io::sink())
        } else {
            Box::new(self.stderr())
        }
    }

    pub fn warning(&self, message: &str) -> io::Result<()> {
        writeln!(self.stderr(), "Warning: {message}")
    }

    /// Total width available for rendering buffers side by side.
    pub fn term_width(&self) -> usize {
        self.width
    }
}
