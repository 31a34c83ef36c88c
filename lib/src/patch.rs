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

//! Applying a patch file to a buffer, to diff the buffer against the result.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::fs::File;
use std::io;
use std::io::BufWriter;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use thiserror::Error;

use crate::backend::interpolate_variables;
use crate::backend::FilterCommand;
use crate::backend::FilterRunner;
use crate::options::ExternalPatchTool;
use crate::session::DiffSession;
use crate::store::BufferId;
use crate::store::LineStore;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("Cannot read or write temp files")]
    Io(#[from] io::Error),
    #[error("Failed to run `{program}`")]
    CommandFailed {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Patch expression failed")]
    Expr(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Cannot read patch output")]
    NoOutput,
}

/// A user supplied replacement for the external patch program.
pub trait PatchExpr: fmt::Debug + Send + Sync {
    /// Applies the patch file `patch` to `original`, writing the result to
    /// `output`.
    fn patch_file(
        &self,
        original: &Path,
        patch: &Path,
        output: &Path,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Applies patch files to buffers with an external program.
#[derive(Clone, Debug)]
pub struct Patcher {
    tool: ExternalPatchTool,
    expr: Option<Arc<dyn PatchExpr>>,
    runner: Arc<dyn FilterRunner>,
}

impl Patcher {
    pub fn new(tool: ExternalPatchTool, runner: Arc<dyn FilterRunner>) -> Self {
        Patcher {
            tool,
            expr: None,
            runner,
        }
    }

    pub fn with_expr(mut self, expr: Arc<dyn PatchExpr>) -> Self {
        self.expr = Some(expr);
        self
    }

    /// Returns the lines of `buf` with `patch_file` applied.
    ///
    /// The patch program runs in a scratch directory, so a patch naming other
    /// files can't touch the working tree.
    pub fn apply(
        &self,
        store: &dyn LineStore,
        buf: BufferId,
        patch_file: &Path,
    ) -> Result<Vec<String>, PatchError> {
        let patch_file = if patch_file.is_absolute() {
            patch_file.to_owned()
        } else {
            std::env::current_dir()?.join(patch_file)
        };
        let dir = TempDir::with_prefix("tabdiff-patch-")?;
        let original = dir.path().join("original");
        let output = dir.path().join("patched");
        {
            let mut file = BufWriter::new(File::create(&original)?);
            store.write_range(buf, 1, store.line_count(buf), &mut file)?;
            file.flush()?;
        }

        if let Some(expr) = &self.expr {
            expr.patch_file(&original, &patch_file, &output)
                .map_err(PatchError::Expr)?;
        } else {
            self.run_tool(dir.path(), &original, &patch_file, &output)?;
        }

        for ext in ["orig", "rej"] {
            let byproduct = add_extension(&output, ext);
            if let Err(err) = fs::remove_file(&byproduct) {
                if err.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(?byproduct, ?err, "failed to remove patch byproduct");
                }
            }
        }

        let text = match fs::read(&output) {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => return Err(PatchError::NoOutput),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(PatchError::NoOutput);
            }
            Err(err) => return Err(err.into()),
        };
        Ok(String::from_utf8_lossy(&text)
            .lines()
            .map(ToOwned::to_owned)
            .collect())
    }

    fn run_tool(
        &self,
        cwd: &Path,
        original: &Path,
        patch_file: &Path,
        output: &Path,
    ) -> Result<(), PatchError> {
        let variables = HashMap::from([
            ("output", output.display().to_string()),
            ("original", original.display().to_string()),
        ]);
        let command = FilterCommand {
            program: self.tool.program.clone(),
            args: interpolate_variables(&self.tool.patch_args, &variables),
            stdin: Some(patch_file.to_owned()),
            stdout: None,
            cwd: Some(cwd.to_owned()),
        };
        let failed = |source| PatchError::CommandFailed {
            program: self.tool.program.clone(),
            source,
        };
        match self.runner.run_filter(&command) {
            Ok(Some(0)) => {}
            // Some hunks may have applied. The output decides.
            Ok(Some(code)) => tracing::warn!(code, "patch program reported failure"),
            Ok(None) => return Err(failed(io::Error::other("killed by a signal"))),
            Err(err) => return Err(failed(err)),
        }
        Ok(())
    }
}

fn add_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Name for the buffer showing the patched text of a buffer named `name`.
pub fn patched_buffer_name(name: &str) -> String {
    if name.is_empty() {
        "patched".to_owned()
    } else {
        format!("{name}.new")
    }
}

impl DiffSession {
    /// Returns a patcher using the configured patch program.
    pub fn patcher(&self) -> Patcher {
        Patcher::new(self.options().patch.clone(), self.runner().clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;

    use super::*;
    use crate::store::MemoryStore;

    /// Appends the first line of the patch file to the original.
    #[derive(Debug, Default)]
    struct AppendingRunner {
        commands: Mutex<Vec<FilterCommand>>,
        leave_byproducts: bool,
    }

    impl FilterRunner for AppendingRunner {
        fn run_filter(&self, command: &FilterCommand) -> io::Result<Option<i32>> {
            self.commands.lock().unwrap().push(command.clone());
            let output = Path::new(&command.args[1]);
            let original = fs::read_to_string(&command.args[2])?;
            let patch = fs::read_to_string(command.stdin.as_ref().unwrap())?;
            let added = patch.lines().next().unwrap_or_default();
            fs::write(output, format!("{original}{added}\n"))?;
            if self.leave_byproducts {
                fs::write(add_extension(output, "orig"), "")?;
                fs::write(add_extension(output, "rej"), "")?;
            }
            Ok(Some(0))
        }
    }

    fn write_patch(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("fix.patch");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_apply() {
        let dir = TempDir::new().unwrap();
        let patch = write_patch(&dir, "three\n");
        let mut store = MemoryStore::new();
        let buf = store.add_buffer("file.txt", ["one", "two"]);
        let runner = Arc::new(AppendingRunner {
            leave_byproducts: true,
            ..Default::default()
        });
        let patcher = Patcher::new(ExternalPatchTool::default(), runner.clone());
        let lines = patcher.apply(&store, buf, &patch).unwrap();
        assert_eq!(lines, ["one", "two", "three"]);

        let commands = runner.commands.lock().unwrap();
        assert_eq!(commands.len(), 1);
        let command = &commands[0];
        assert_eq!(command.program, "patch");
        assert_eq!(command.args[0], "-o");
        assert_eq!(command.stdin.as_deref(), Some(patch.as_path()));
        let cwd = command.cwd.as_ref().unwrap();
        assert!(Path::new(&command.args[1]).starts_with(cwd));
        // The scratch directory is gone with its byproducts.
        assert!(!cwd.exists());
    }

    #[test]
    fn test_apply_without_output() {
        #[derive(Debug)]
        struct SilentRunner;
        impl FilterRunner for SilentRunner {
            fn run_filter(&self, _command: &FilterCommand) -> io::Result<Option<i32>> {
                Ok(Some(2))
            }
        }
        let dir = TempDir::new().unwrap();
        let patch = write_patch(&dir, "");
        let mut store = MemoryStore::new();
        let buf = store.add_buffer("file.txt", ["one"]);
        let patcher = Patcher::new(ExternalPatchTool::default(), Arc::new(SilentRunner));
        assert_matches!(patcher.apply(&store, buf, &patch), Err(PatchError::NoOutput));
    }

    #[test]
    fn test_apply_missing_program() {
        #[derive(Debug)]
        struct MissingProgram;
        impl FilterRunner for MissingProgram {
            fn run_filter(&self, _command: &FilterCommand) -> io::Result<Option<i32>> {
                Err(io::Error::from(io::ErrorKind::NotFound))
            }
        }
        let dir = TempDir::new().unwrap();
        let patch = write_patch(&dir, "");
        let mut store = MemoryStore::new();
        let buf = store.add_buffer("file.txt", ["one"]);
        let patcher = Patcher::new(ExternalPatchTool::default(), Arc::new(MissingProgram));
        assert_matches!(
            patcher.apply(&store, buf, &patch),
            Err(PatchError::CommandFailed { program, .. }) if program == "patch"
        );
    }

    #[test]
    fn test_patch_expr() {
        #[derive(Debug)]
        struct UppercaseExpr;
        impl PatchExpr for UppercaseExpr {
            fn patch_file(
                &self,
                original: &Path,
                _patch: &Path,
                output: &Path,
            ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
                let text = fs::read_to_string(original)?;
                fs::write(output, text.to_uppercase())?;
                Ok(())
            }
        }
        let dir = TempDir::new().unwrap();
        let patch = write_patch(&dir, "");
        let mut store = MemoryStore::new();
        let buf = store.add_buffer("file.txt", ["one", "two"]);
        let patcher = Patcher::new(ExternalPatchTool::default(), Arc::new(AppendingRunner::default()))
            .with_expr(Arc::new(UppercaseExpr));
        assert_eq!(patcher.apply(&store, buf, &patch).unwrap(), ["ONE", "TWO"]);
    }

    #[test]
    fn test_patched_buffer_name() {
        assert_eq!(patched_buffer_name("file.txt"), "file.txt.new");
        assert_eq!(patched_buffer_name(""), "patched");
    }
}
