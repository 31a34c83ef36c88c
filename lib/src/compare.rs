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

//! Line comparison honoring the case and whitespace flags.
//!
//! Two lines compare equal exactly when their keys returned by [`line_key()`]
//! are equal, so the internal diff can hash keys while the incremental
//! engines compare lines pairwise and both agree.

use std::borrow::Cow;

/// Flags affecting whether two lines are considered equal.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CompareFlags {
    /// Ignore case.
    pub icase: bool,
    /// Ignore changes in the amount of white space.
    pub iwhite: bool,
    /// Ignore all white space.
    pub iwhite_all: bool,
    /// Ignore white space at the end of the line.
    pub iwhite_eol: bool,
}

impl CompareFlags {
    /// Returns true if lines are compared byte for byte.
    pub fn is_exact(&self) -> bool {
        !(self.icase || self.iwhite || self.iwhite_all || self.iwhite_eol)
    }

    /// Returns true if any white space flag is set.
    pub fn ignores_white(&self) -> bool {
        self.iwhite || self.iwhite_all || self.iwhite_eol
    }
}

/// Space or tab. Other white space characters are significant.
pub fn is_white(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Returns true if the line consists of white space only.
pub fn is_blank(line: &str) -> bool {
    line.bytes()
        .all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c))
}

/// Returns the normalized form of `line` used for equality.
pub fn line_key(flags: CompareFlags, line: &str) -> Cow<'_, str> {
    if flags.is_exact() {
        return Cow::Borrowed(line);
    }
    let mut key = if flags.iwhite_all {
        Cow::Owned(line.chars().filter(|&c| !is_white(c)).collect())
    } else if flags.iwhite {
        Cow::Owned(squeeze_white(line))
    } else if flags.iwhite_eol {
        Cow::Borrowed(line.trim_end_matches(is_white))
    } else {
        Cow::Borrowed(line)
    };
    if flags.icase {
        key = Cow::Owned(key.to_lowercase());
    }
    key
}

/// Collapses white space runs into a single space and drops trailing white
/// space.
fn squeeze_white(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut pending_white = false;
    for c in line.chars() {
        if is_white(c) {
            pending_white = true;
        } else {
            if pending_white {
                out.push(' ');
                pending_white = false;
            }
            out.push(c);
        }
    }
    out
}

/// Compares two lines under `flags`.
pub fn lines_equal(flags: CompareFlags, a: &str, b: &str) -> bool {
    if flags.is_exact() {
        a == b
    } else {
        line_key(flags, a) == line_key(flags, b)
    }
}
