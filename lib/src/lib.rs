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

//! Diff engine for comparing two to four buffers side by side.
//!
//! A [`session::DiffSession`] tracks which buffers take part in a diff and the
//! list of [`block::DiffBlock`]s describing where they differ. The list is
//! computed by a line diff between the first buffer and each of the others,
//! kept approximately correct while the buffers are edited, and recomputed
//! lazily when it has been invalidated.

#![warn(missing_docs)]
#![deny(unused_must_use)]
#![forbid(unsafe_code)]

pub mod adjust;
pub mod backend;
pub mod block;
pub mod compare;
pub mod diff;
pub mod getput;
pub mod host;
pub mod hunk;
pub mod linematch;
pub mod merge;
pub mod options;
pub mod patch;
pub mod session;
pub mod store;
pub mod sync;

/// A 1-based line number, or a line count.
///
/// Signed so that offsets and the line before the first one (`0`) need no
/// special casing.
pub type LineNr = i64;
