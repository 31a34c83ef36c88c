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

//! Diff sessions: the buffers compared in one tab and the blocks describing
//! their differences.

#![allow(missing_docs)]

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use crate::adjust;
use crate::adjust::AdjustContext;
use crate::adjust::LineAdjustment;
use crate::backend::BackendError;
use crate::backend::DiffBackend;
use crate::backend::DiffExpr;
use crate::backend::FilterRunner;
use crate::backend::ProcessRunner;
use crate::block::BlockList;
use crate::block::BufferSlots;
use crate::host::DiffEvent;
use crate::host::DiffHost;
use crate::host::DiffRequests;
use crate::linematch;
use crate::merge::fold_hunks;
use crate::options::DiffOptions;
use crate::store::BufferId;
use crate::store::LineStore;
use crate::store::StoreError;
use crate::LineNr;

/// Error from an operation on a [`DiffSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot diff more than {max} buffers", max = crate::block::MAX_BUFS)]
    TooManyBuffers,
    #[error("Current buffer is not in diff mode")]
    NotInDiffMode,
    #[error("No other buffer in diff mode")]
    NoOtherBuffer,
    #[error("No other buffer in diff mode is modifiable")]
    TargetNotModifiable,
    #[error("More than two buffers in diff mode, don't know which one to use")]
    AmbiguousTarget,
    #[error("Buffer {0:?} is not in diff mode")]
    BufferNotInDiff(BufferId),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The buffers diffed in one tab.
///
/// The session only refers to buffers by id. Lines are read from and written
/// to a [`LineStore`] passed to each operation, and the editor is notified
/// through a [`DiffHost`].
#[derive(Debug)]
pub struct DiffSession {
    pub(crate) slots: BufferSlots,
    pub(crate) blocks: BlockList,
    pub(crate) options: DiffOptions,
    /// The blocks must be recomputed before they can be used.
    pub(crate) invalid: bool,
    /// An edit was made that the blocks and folds should be refreshed for
    /// before the next redraw.
    pub(crate) needs_update: bool,
    /// Filler lines may have changed, so scroll-bound views must be synced.
    pub(crate) needs_scrollbind: bool,
    /// Lines are being copied between buffers.
    pub(crate) busy: bool,
    /// A recompute was requested while busy.
    pub(crate) pending_recompute: bool,
    diff_expr: Option<Arc<dyn DiffExpr>>,
    runner: Arc<dyn FilterRunner>,
}

impl DiffSession {
    pub fn new(options: DiffOptions) -> Self {
        DiffSession {
            slots: BufferSlots::default(),
            blocks: BlockList::new(),
            options,
            invalid: false,
            needs_update: false,
            needs_scrollbind: false,
            busy: false,
            pending_recompute: false,
            diff_expr: None,
            runner: Arc::new(ProcessRunner),
        }
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    pub fn slots(&self) -> &BufferSlots {
        &self.slots
    }

    pub fn blocks(&self) -> &BlockList {
        &self.blocks
    }

    /// Gives tests direct access to the blocks.
    #[cfg(feature = "testing")]
    pub fn blocks_mut(&mut self) -> &mut BlockList {
        &mut self.blocks
    }

    pub fn contains(&self, buf: BufferId) -> bool {
        self.slots.slot_of(buf).is_some()
    }

    /// Returns true if no buffer takes part in the diff.
    pub fn is_unused(&self) -> bool {
        self.slots.active_count() == 0
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Returns true if an edit asked for the blocks to be recomputed before
    /// the next redraw.
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Returns true, once, if scroll-bound views should be synced again.
    pub fn take_scrollbind_request(&mut self) -> bool {
        std::mem::take(&mut self.needs_scrollbind)
    }

    /// Adds `buf` to the diff. Returns its slot.
    pub fn add_buffer(
        &mut self,
        buf: BufferId,
        host: &mut dyn DiffHost,
    ) -> Result<usize, SessionError> {
        if let Some(idx) = self.slots.slot_of(buf) {
            return Ok(idx);
        }
        let idx = self
            .slots
            .free_slot()
            .ok_or(SessionError::TooManyBuffers)?;
        tracing::debug!(?buf, idx, "adding buffer to diff");
        self.slots.set(idx, Some(buf));
        self.invalid = true;
        host.request_redraw();
        Ok(idx)
    }

    /// Takes `buf` out of the diff. Returns false if it wasn't in it.
    ///
    /// When the last buffer leaves, the blocks are freed and the flags reset.
    pub fn remove_buffer(&mut self, buf: BufferId, host: &mut dyn DiffHost) -> bool {
        let Some(idx) = self.slots.slot_of(buf) else {
            return false;
        };
        tracing::debug!(?buf, idx, "removing buffer from diff");
        self.slots.set(idx, None);
        if self.is_unused() {
            self.blocks.clear();
            self.invalid = false;
            self.needs_update = false;
            self.needs_scrollbind = false;
            self.pending_recompute = false;
        } else {
            self.invalid = true;
        }
        host.request_redraw();
        true
    }

    /// Marks the blocks as outdated, e.g. after `buf` was changed on disk.
    pub fn invalidate(&mut self, buf: BufferId, host: &mut dyn DiffHost) {
        if self.contains(buf) {
            self.invalid = true;
            host.request_redraw();
        }
    }

    /// Replaces the options. The blocks are invalidated if they depend on a
    /// changed option.
    pub fn set_options(&mut self, options: DiffOptions, host: &mut dyn DiffHost) {
        if self.options.affects_blocks(&options) {
            tracing::debug!("diff options changed, invalidating blocks");
            self.invalid = true;
        }
        self.options = options;
        self.needs_scrollbind = true;
        self.redraw(host, true);
    }

    /// Uses `expr` instead of the external diff program.
    pub fn set_diff_expr(&mut self, expr: Option<Arc<dyn DiffExpr>>) {
        self.diff_expr = expr;
        self.invalid = true;
    }

    /// Runs external programs through `runner`.
    pub fn set_filter_runner(&mut self, runner: Arc<dyn FilterRunner>) {
        self.runner = runner;
    }

    pub(crate) fn runner(&self) -> &Arc<dyn FilterRunner> {
        &self.runner
    }

    /// Recomputes the blocks if they are invalid or an edit asked for it.
    pub fn refresh(
        &mut self,
        store: &dyn LineStore,
        host: &mut dyn DiffHost,
    ) -> Result<(), SessionError> {
        if self.invalid || self.needs_update {
            self.needs_update = false;
            self.recompute(store, host)?;
        }
        Ok(())
    }

    /// Recomputes the blocks from the buffer text.
    ///
    /// The first active slot is diffed against every other one. If the
    /// backend fails, the session is left without blocks. If it was
    /// interrupted, the session also stays invalid so the next refresh
    /// tries again.
    #[instrument(skip_all)]
    pub fn recompute(
        &mut self,
        store: &dyn LineStore,
        host: &mut dyn DiffHost,
    ) -> Result<(), SessionError> {
        if self.busy {
            tracing::debug!("deferring recompute while copying lines");
            self.pending_recompute = true;
            return Ok(());
        }
        self.blocks.clear();
        self.invalid = false;
        let Some((idx_orig, orig)) = self.slots.active().next() else {
            return Ok(());
        };
        if self.slots.others(idx_orig).next().is_none() {
            return Ok(());
        }

        match self.compute_blocks(store, host, idx_orig, orig) {
            Ok(blocks) => self.blocks = blocks,
            Err(BackendError::Interrupted) => {
                tracing::info!("diff interrupted");
                self.invalid = true;
                return Err(BackendError::Interrupted.into());
            }
            Err(err) => {
                tracing::warn!(%err, "cannot create diffs");
                self.redraw(host, true);
                return Err(err.into());
            }
        }
        tracing::debug!(blocks = self.blocks.len(), "recomputed diff blocks");
        self.redraw(host, true);

        let mut requests = DiffRequests::default();
        host.fire_event(DiffEvent::Updated, &mut requests);
        if requests.recompute_requested() {
            // Served by the next refresh so that handlers can't loop.
            self.invalid = true;
        }
        Ok(())
    }

    fn compute_blocks(
        &self,
        store: &dyn LineStore,
        host: &dyn DiffHost,
        idx_orig: usize,
        orig: BufferId,
    ) -> Result<BlockList, BackendError> {
        let backend =
            DiffBackend::from_options(&self.options, self.diff_expr.clone(), self.runner.clone());
        let mut io = backend.start()?;
        let mut blocks = BlockList::new();
        for (idx_new, new) in self.slots.others(idx_orig) {
            let hunks = io.diff(store, orig, new, host)?;
            fold_hunks(&mut blocks, &self.slots, idx_orig, idx_new, &hunks);
        }
        Ok(blocks)
    }

    /// Reloads the buffers from disk if `force` is set, then recomputes the
    /// blocks.
    pub fn update(
        &mut self,
        store: &mut dyn LineStore,
        host: &mut dyn DiffHost,
        force: bool,
    ) -> Result<(), SessionError> {
        if force {
            for (_, buf) in self.slots.active() {
                if store.reload(buf)? {
                    tracing::debug!(?buf, "reloaded buffer");
                }
            }
        }
        self.recompute(store, host)
    }

    /// Updates the blocks for an edit of `buf` which was already applied to
    /// the store.
    pub fn mark_adjust(
        &mut self,
        store: &dyn LineStore,
        host: &mut dyn DiffHost,
        buf: BufferId,
        adjustment: LineAdjustment,
    ) {
        let Some(idx) = self.slots.slot_of(buf) else {
            return;
        };
        self.adjust_slot(store, idx, adjustment);
        if self.options.internal {
            self.needs_update = true;
        }
        self.needs_scrollbind = true;
        self.redraw(host, true);
    }

    /// `count` lines were inserted below line `after` of `buf`.
    pub fn lines_inserted(
        &mut self,
        store: &dyn LineStore,
        host: &mut dyn DiffHost,
        buf: BufferId,
        after: LineNr,
        count: LineNr,
    ) {
        self.mark_adjust(store, host, buf, LineAdjustment::inserted(after, count));
    }

    /// `count` lines of `buf` starting at `first` were deleted.
    pub fn lines_deleted(
        &mut self,
        store: &dyn LineStore,
        host: &mut dyn DiffHost,
        buf: BufferId,
        first: LineNr,
        count: LineNr,
    ) {
        self.mark_adjust(store, host, buf, LineAdjustment::deleted(first, count));
    }

    pub(crate) fn adjust_slot(
        &mut self,
        store: &dyn LineStore,
        idx: usize,
        adjustment: LineAdjustment,
    ) {
        let ctx = AdjustContext {
            slots: &self.slots,
            store,
            flags: self.options.compare_flags(),
            busy: self.busy,
        };
        adjust::mark_adjust(&mut self.blocks, &ctx, idx, adjustment);
    }

    /// Splits every block small enough into line-matched sub-blocks.
    pub fn apply_linematch(&mut self, store: &dyn LineStore) {
        let ceiling = self.options.linematch;
        let iwhite = self.options.iwhite || self.options.iwhiteall;
        let mut cur = self.blocks.first();
        while let Some(id) = cur {
            // Sub-blocks are linked after `id`, and are already matched.
            let next = self.blocks.next(id);
            if linematch::should_linematch(self.blocks.get(id), &self.slots, ceiling) {
                linematch::linematch_block(&mut self.blocks, id, &self.slots, store, iwhite);
            }
            cur = next;
        }
    }

    pub(crate) fn redraw(&self, host: &mut dyn DiffHost, fold: bool) {
        host.request_redraw();
        if fold {
            for (_, buf) in self.slots.active() {
                host.fold_update(buf, 1, adjust::MAXLNUM);
            }
        }
    }
}

/// The diff sessions of all tabs.
#[derive(Debug, Default)]
pub struct SessionSet {
    sessions: Vec<DiffSession>,
}

impl SessionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session and returns its index.
    pub fn push(&mut self, session: DiffSession) -> usize {
        self.sessions.push(session);
        self.sessions.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&DiffSession> {
        self.sessions.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut DiffSession> {
        self.sessions.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiffSession> {
        self.sessions.iter()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Returns true if any session diffs `buf`.
    pub fn in_diff_mode(&self, buf: BufferId) -> bool {
        self.sessions.iter().any(|session| session.contains(buf))
    }

    /// Takes `buf` out of every session, e.g. when it is unloaded.
    pub fn remove_buffer(&mut self, buf: BufferId, host: &mut dyn DiffHost) {
        for session in &mut self.sessions {
            session.remove_buffer(buf, host);
        }
    }

    pub fn invalidate(&mut self, buf: BufferId, host: &mut dyn DiffHost) {
        for session in &mut self.sessions {
            session.invalidate(buf, host);
        }
    }

    /// Passes an edit of `buf` to every session diffing it.
    pub fn mark_adjust(
        &mut self,
        store: &dyn LineStore,
        host: &mut dyn DiffHost,
        buf: BufferId,
        adjustment: LineAdjustment,
    ) {
        for session in &mut self.sessions {
            session.mark_adjust(store, host, buf, adjustment);
        }
    }

    /// Changes the options of every session.
    pub fn set_options(&mut self, options: &DiffOptions, host: &mut dyn DiffHost) {
        for session in &mut self.sessions {
            session.set_options(options.clone(), host);
        }
    }
}
