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

//! Options selecting the diff backend, algorithm and presentation.
#![allow(missing_docs)]

use crate::compare::CompareFlags;
use crate::diff::{DiffAlgorithm, LineDiffOptions};

/// Preferred split direction when a window is split for diffing.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitLayout {
    Horizontal,
    Vertical,
}

/// External diff program loaded from the settings.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExternalDiffTool {
    /// Program to execute.
    pub program: String,
    /// Arguments following the flags derived from the options. `$orig` and
    /// `$new` are replaced with the paths of the files to compare.
    pub diff_args: Vec<String>,
}

impl Default for ExternalDiffTool {
    fn default() -> Self {
        ExternalDiffTool {
            program: "diff".to_owned(),
            diff_args: ["$orig", "$new"].map(ToOwned::to_owned).to_vec(),
        }
    }
}

/// External patch program loaded from the settings.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExternalPatchTool {
    pub program: String,
    /// `$output` and `$original` are replaced with the path to write the
    /// patched text to and the path of the text to patch. The patch itself is
    /// fed on stdin.
    pub patch_args: Vec<String>,
}

impl Default for ExternalPatchTool {
    fn default() -> Self {
        ExternalPatchTool {
            program: "patch".to_owned(),
            patch_args: ["-o", "$output", "$original"]
                .map(ToOwned::to_owned)
                .to_vec(),
        }
    }
}

/// The parsed diff option set.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DiffOptions {
    /// Show filler lines to keep the text of the buffers aligned.
    pub filler: bool,
    /// Number of unchanged lines kept visible around a change when folding.
    pub context: usize,
    pub icase: bool,
    pub iwhite: bool,
    pub iwhiteall: bool,
    pub iwhiteeol: bool,
    /// Ignore changes consisting of blank lines only.
    pub iblank: bool,
    pub algorithm: DiffAlgorithm,
    pub indent_heuristic: bool,
    /// Use the internal diff rather than the external program.
    pub internal: bool,
    /// Align lines within a change when all buffers together have at most
    /// this many lines in it.
    pub linematch: Option<usize>,
    pub foldcolumn: usize,
    pub layout: Option<SplitLayout>,
    pub external: ExternalDiffTool,
    pub patch: ExternalPatchTool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        DiffOptions {
            filler: true,
            context: 6,
            icase: false,
            iwhite: false,
            iwhiteall: false,
            iwhiteeol: false,
            iblank: false,
            algorithm: DiffAlgorithm::default(),
            indent_heuristic: false,
            internal: true,
            linematch: None,
            foldcolumn: 2,
            layout: None,
            external: ExternalDiffTool::default(),
            patch: ExternalPatchTool::default(),
        }
    }
}

impl DiffOptions {
    /// Reads the `[diff]` table, keeping defaults for anything not set.
    pub fn from_config(config: &config::Config) -> Result<Self, config::ConfigError> {
        match config.get::<DiffOptions>("diff") {
            Ok(options) => Ok(options),
            Err(config::ConfigError::NotFound(_)) => Ok(DiffOptions::default()),
            Err(err) => Err(err),
        }
    }

    pub fn compare_flags(&self) -> CompareFlags {
        CompareFlags {
            icase: self.icase,
            iwhite: self.iwhite,
            iwhite_all: self.iwhiteall,
            iwhite_eol: self.iwhiteeol,
        }
    }

    pub fn line_diff_options(&self) -> LineDiffOptions {
        LineDiffOptions {
            algorithm: self.algorithm,
            compare: self.compare_flags(),
            indent_heuristic: self.indent_heuristic,
            ignore_blank_lines: self.iblank,
        }
    }

    /// Returns true if switching from `self` to `other` can change the
    /// computed blocks.
    pub fn affects_blocks(&self, other: &DiffOptions) -> bool {
        self.compare_flags() != other.compare_flags()
            || self.iblank != other.iblank
            || self.algorithm != other.algorithm
            || self.indent_heuristic != other.indent_heuristic
            || self.internal != other.internal
            || self.linematch != other.linematch
            || (!self.internal && self.external != other.external)
    }
}
