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

//! Callbacks into the editor hosting a diff session.

use crate::store::BufferId;
use crate::LineNr;

/// Notification sent to the host after the blocks changed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DiffEvent {
    /// The block list was recomputed.
    Updated,
    /// A diffget or diffput changed lines of the buffer.
    LinesChanged {
        /// The modified buffer.
        buf: BufferId,
    },
}

/// Requests a host may make from an event handler.
///
/// Event handlers run while an operation may still be in progress, so the
/// requests are recorded and served once it's safe.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DiffRequests {
    recompute: bool,
}

impl DiffRequests {
    /// Asks for the blocks to be recomputed from scratch.
    pub fn request_recompute(&mut self) {
        self.recompute = true;
    }

    /// Returns true if a recompute was requested.
    pub fn recompute_requested(&self) -> bool {
        self.recompute
    }
}

/// The editor side of a diff session.
///
/// All methods have no-op defaults.
pub trait DiffHost {
    /// Lines `first..=last` of `buf` may have to be folded or unfolded.
    fn fold_update(&mut self, _buf: BufferId, _first: LineNr, _last: LineNr) {}

    /// Windows showing the diff must be redrawn. May be called repeatedly
    /// before the redraw happens.
    fn request_redraw(&mut self) {}

    /// Runs the handlers of `event`. Handlers ask for a recompute through
    /// `requests`.
    fn fire_event(&mut self, _event: DiffEvent, _requests: &mut DiffRequests) {}

    /// Lines `first..=last` of `buf` were replaced, and the lines below them
    /// moved by `amount_after`.
    fn marks_adjusted(
        &mut self,
        _buf: BufferId,
        _first: LineNr,
        _last: LineNr,
        _amount_after: LineNr,
    ) {
    }

    /// Returns true if the user asked to abort a long running operation.
    fn interrupted(&self) -> bool {
        false
    }
}

/// A host that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHost;

impl DiffHost for NoopHost {}
