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

//! Backends computing the hunks between two buffers.
//!
//! The internal backend runs [`diff_lines()`] on the buffer text. The external
//! backend writes both buffers to temporary files, runs a `diff` program (or
//! a registered [`DiffExpr`]) on them and parses its output.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Captures;
use regex::Regex;
use tempfile::TempDir;
use thiserror::Error;

use crate::compare::CompareFlags;
use crate::diff::diff_lines;
use crate::diff::LineDiffOptions;
use crate::host::DiffHost;
use crate::hunk::parse_diff_output;
use crate::hunk::Hunk;
use crate::options::DiffOptions;
use crate::options::ExternalDiffTool;
use crate::store::buffer_lines;
use crate::store::BufferId;
use crate::store::LineStore;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Cannot create diffs, `{program}` doesn't work")]
    Unavailable { program: String },
    #[error("Cannot read or write temp files")]
    Io(#[source] io::Error),
    #[error("Failed to run `{program}`")]
    Run {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Diff expression failed")]
    Expr(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Interrupted")]
    Interrupted,
}

/// A user supplied replacement for the external diff program.
pub trait DiffExpr: fmt::Debug + Send + Sync {
    /// Writes the differences between the files `orig` and `new` to `output`,
    /// in a format [`parse_diff_output()`] understands.
    fn diff_files(
        &self,
        orig: &Path,
        new: &Path,
        output: &Path,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A command to run with its standard streams redirected to files.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FilterCommand {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<PathBuf>,
    pub stdout: Option<PathBuf>,
    /// Working directory, the current one if unset.
    pub cwd: Option<PathBuf>,
}

/// Runs filter commands, blocking until they finish.
pub trait FilterRunner: fmt::Debug + Send + Sync {
    /// Returns the exit code, `None` if the command was killed by a signal.
    fn run_filter(&self, command: &FilterCommand) -> io::Result<Option<i32>>;
}

/// Runs filter commands as child processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessRunner;

impl FilterRunner for ProcessRunner {
    fn run_filter(&self, command: &FilterCommand) -> io::Result<Option<i32>> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .env_remove("DIFF_OPTIONS")
            .stderr(Stdio::null());
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }
        match &command.stdin {
            Some(path) => cmd.stdin(File::open(path)?),
            None => cmd.stdin(Stdio::null()),
        };
        match &command.stdout {
            Some(path) => cmd.stdout(File::create(path)?),
            None => cmd.stdout(Stdio::null()),
        };
        tracing::info!(?cmd, "running filter command");
        let status = cmd.status()?;
        Ok(status.code())
    }
}

static VARIABLE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([a-z0-9_]+)\b").unwrap());

/// Replaces `$name` in the arguments by the value of the variable. Unknown
/// variables are left alone.
pub(crate) fn interpolate_variables(
    args: &[String],
    variables: &HashMap<&str, String>,
) -> Vec<String> {
    args.iter()
        .map(|arg| {
            VARIABLE_REGEX
                .replace_all(arg, |caps: &Captures| match variables.get(&caps[1]) {
                    Some(value) => value.clone(),
                    None => caps[0].to_owned(),
                })
                .into_owned()
        })
        .collect()
}

const PROBE_UNKNOWN: u8 = 0;
const PROBE_WORKS: u8 = 1;
const PROBE_FAILS: u8 = 2;

/// Remembers whether the diff program accepts `-a`.
#[derive(Debug)]
pub struct TextFlagProbe(AtomicU8);

impl TextFlagProbe {
    pub const fn new() -> Self {
        TextFlagProbe(AtomicU8::new(PROBE_UNKNOWN))
    }

    /// `None` until probed.
    pub fn accepts_text_flag(&self) -> Option<bool> {
        match self.0.load(Ordering::Relaxed) {
            PROBE_WORKS => Some(true),
            PROBE_FAILS => Some(false),
            _ => None,
        }
    }

    fn set(&self, value: Option<bool>) {
        let state = match value {
            None => PROBE_UNKNOWN,
            Some(true) => PROBE_WORKS,
            Some(false) => PROBE_FAILS,
        };
        self.0.store(state, Ordering::Relaxed);
    }
}

impl Default for TextFlagProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared by all sessions of the process.
pub static TEXT_FLAG_PROBE: TextFlagProbe = TextFlagProbe::new();

/// Runs an external diff program or expression.
#[derive(Clone, Debug)]
pub struct ExternalBackend {
    tool: ExternalDiffTool,
    flags: CompareFlags,
    ignore_blank_lines: bool,
    expr: Option<Arc<dyn DiffExpr>>,
    runner: Arc<dyn FilterRunner>,
    probe: &'static TextFlagProbe,
}

impl ExternalBackend {
    pub fn new(
        options: &DiffOptions,
        expr: Option<Arc<dyn DiffExpr>>,
        runner: Arc<dyn FilterRunner>,
    ) -> Self {
        ExternalBackend {
            tool: options.external.clone(),
            flags: options.compare_flags(),
            ignore_blank_lines: options.iblank,
            expr,
            runner,
            probe: &TEXT_FLAG_PROBE,
        }
    }

    /// Uses `probe` instead of the process-wide cache.
    pub fn with_probe(mut self, probe: &'static TextFlagProbe) -> Self {
        self.probe = probe;
        self
    }

    fn command(&self, text_flag: bool, orig: &Path, new: &Path, output: &Path) -> FilterCommand {
        let mut args = vec![];
        let mut flag = |enabled: bool, name: &str| {
            if enabled {
                args.push(name.to_owned());
            }
        };
        flag(text_flag, "-a");
        flag(self.flags.iwhite, "-b");
        flag(self.flags.iwhite_all, "-w");
        flag(self.flags.iwhite_eol, "-Z");
        flag(self.ignore_blank_lines, "-B");
        flag(self.flags.icase, "-i");
        let variables = HashMap::from([
            ("orig", orig.display().to_string()),
            ("new", new.display().to_string()),
        ]);
        args.extend(interpolate_variables(&self.tool.diff_args, &variables));
        FilterCommand {
            program: self.tool.program.clone(),
            args,
            stdin: None,
            stdout: Some(output.to_owned()),
            cwd: None,
        }
    }

    /// Writes the diff of `orig` and `new` to `output`.
    fn diff_file(&self, orig: &Path, new: &Path, output: &Path) -> Result<(), BackendError> {
        if let Some(expr) = &self.expr {
            return expr.diff_files(orig, new, output).map_err(BackendError::Expr);
        }
        let text_flag = self.probe.accepts_text_flag().unwrap_or(true);
        let command = self.command(text_flag, orig, new, output);
        let code = self
            .runner
            .run_filter(&command)
            .map_err(|source| BackendError::Run {
                program: command.program.clone(),
                source,
            })?;
        // diff exits with 1 when the files differ, so the code tells nothing.
        tracing::debug!(?code, "diff program finished");
        Ok(())
    }

    /// Checks that the program produces a diff we can parse. The first check
    /// passes `-a`, and if that fails, another check runs without it.
    fn probe(&self, files: &TempFiles) -> Result<(), BackendError> {
        let result = self.probe_inner(files);
        if !matches!(result, Ok(true)) {
            self.probe.set(None);
        }
        match result {
            Ok(true) => Ok(()),
            Ok(false) => Err(BackendError::Unavailable {
                program: self.tool.program.clone(),
            }),
            Err(err) => Err(err),
        }
    }

    fn probe_inner(&self, files: &TempFiles) -> Result<bool, BackendError> {
        loop {
            fs::write(&files.orig, "line1\n").map_err(BackendError::Io)?;
            fs::write(&files.new, "line2\n").map_err(BackendError::Io)?;
            let ok = match self.diff_file(&files.orig, &files.new, &files.output) {
                Ok(()) => output_looks_valid(&files.output),
                Err(BackendError::Run { program, source }) => {
                    tracing::debug!(%program, %source, "diff program failed to run");
                    false
                }
                Err(err) => return Err(err),
            };
            if self.expr.is_some() || self.probe.accepts_text_flag().is_some() {
                return Ok(ok);
            }
            tracing::debug!(ok, "probed diff program with -a");
            self.probe.set(Some(ok));
            if ok {
                return Ok(true);
            }
        }
    }
}

fn output_looks_valid(path: &Path) -> bool {
    let Ok(output) = fs::read(path) else {
        return false;
    };
    String::from_utf8_lossy(&output)
        .lines()
        .any(|line| line.starts_with("1c1") || line.starts_with("@@ -1 +1 @@"))
}

/// How the hunks between two buffers are computed.
#[derive(Clone, Debug)]
pub enum DiffBackend {
    Internal(LineDiffOptions),
    External(ExternalBackend),
}

impl DiffBackend {
    pub fn from_options(
        options: &DiffOptions,
        expr: Option<Arc<dyn DiffExpr>>,
        runner: Arc<dyn FilterRunner>,
    ) -> Self {
        if options.internal && expr.is_none() {
            DiffBackend::Internal(options.line_diff_options())
        } else {
            DiffBackend::External(ExternalBackend::new(options, expr, runner))
        }
    }

    /// Prepares a run comparing one buffer against others. For an external
    /// program, this checks that the program works.
    pub fn start(&self) -> Result<DiffIo<'_>, BackendError> {
        let state = match self {
            DiffBackend::Internal(options) => DiffIoState::Internal(options),
            DiffBackend::External(external) => {
                let files = TempFiles::new()?;
                if external.expr.is_some() || external.probe.accepts_text_flag().is_none() {
                    external.probe(&files)?;
                }
                DiffIoState::External {
                    external,
                    files,
                    orig_written: None,
                }
            }
        };
        Ok(DiffIo { state })
    }
}

#[derive(Debug)]
struct TempFiles {
    // Removed with its contents on drop.
    _dir: TempDir,
    orig: PathBuf,
    new: PathBuf,
    output: PathBuf,
}

impl TempFiles {
    fn new() -> Result<Self, BackendError> {
        let dir = tempfile::Builder::new()
            .prefix("tabdiff-")
            .tempdir()
            .map_err(BackendError::Io)?;
        Ok(TempFiles {
            orig: dir.path().join("orig"),
            new: dir.path().join("new"),
            output: dir.path().join("diff"),
            _dir: dir,
        })
    }
}

fn write_buffer(store: &dyn LineStore, buf: BufferId, path: &Path) -> Result<(), BackendError> {
    let mut file = io::BufWriter::new(File::create(path).map_err(BackendError::Io)?);
    store
        .write_range(buf, 1, store.line_count(buf), &mut file)
        .and_then(|()| io::Write::flush(&mut file))
        .map_err(BackendError::Io)
}

#[derive(Debug)]
enum DiffIoState<'a> {
    Internal(&'a LineDiffOptions),
    External {
        external: &'a ExternalBackend,
        files: TempFiles,
        orig_written: Option<BufferId>,
    },
}

/// State of one recompute pass.
#[derive(Debug)]
pub struct DiffIo<'a> {
    state: DiffIoState<'a>,
}

impl DiffIo<'_> {
    /// Computes the hunks turning buffer `orig` into buffer `new`.
    pub fn diff(
        &mut self,
        store: &dyn LineStore,
        orig: BufferId,
        new: BufferId,
        host: &dyn DiffHost,
    ) -> Result<Vec<Hunk>, BackendError> {
        let hunks = match &mut self.state {
            DiffIoState::Internal(options) => {
                let left = buffer_lines(store, orig);
                let right = buffer_lines(store, new);
                diff_lines(&left, &right, *options)
            }
            DiffIoState::External {
                external,
                files,
                orig_written,
            } => {
                if *orig_written != Some(orig) {
                    write_buffer(store, orig, &files.orig)?;
                    *orig_written = Some(orig);
                }
                write_buffer(store, new, &files.new)?;
                // A stale output must not be mistaken for this run's.
                match fs::remove_file(&files.output) {
                    Err(err) if err.kind() != io::ErrorKind::NotFound => {
                        return Err(BackendError::Io(err));
                    }
                    _ => {}
                }
                external.diff_file(&files.orig, &files.new, &files.output)?;
                if host.interrupted() {
                    return Err(BackendError::Interrupted);
                }
                match fs::read(&files.output) {
                    Ok(output) => parse_diff_output(&String::from_utf8_lossy(&output)),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {
                        tracing::debug!("diff produced no output file");
                        vec![]
                    }
                    Err(err) => return Err(BackendError::Io(err)),
                }
            }
        };
        tracing::debug!(?orig, ?new, hunks = hunks.len(), "computed hunks");
        Ok(hunks)
    }
}
