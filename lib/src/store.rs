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

//! Access to the text of the buffers being compared.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

use crate::LineNr;

/// Identifies a buffer in a [`LineStore`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BufferId(pub u32);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Buffer {0:?} doesn't exist")]
    UnknownBuffer(BufferId),
    #[error("Buffer {0:?} is not modifiable")]
    NotModifiable(BufferId),
    #[error("Line {lnum} is out of range in buffer {buf:?}")]
    LineOutOfRange { buf: BufferId, lnum: LineNr },
    #[error("Failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
}

/// Line-oriented storage of buffer text.
///
/// A buffer always has at least one line. A buffer without any text has a
/// single empty placeholder line and reports [`LineStore::is_empty()`]. Once
/// a line is inserted into such a buffer, the placeholder becomes an ordinary
/// line and must be deleted by the caller if unwanted.
pub trait LineStore {
    fn line_count(&self, buf: BufferId) -> LineNr;

    /// Returns line `lnum` (1-based) without its line terminator.
    fn line(&self, buf: BufferId, lnum: LineNr) -> Option<&str>;

    /// Returns true if the buffer holds no text, only the placeholder line.
    fn is_empty(&self, buf: BufferId) -> bool;

    fn is_modifiable(&self, buf: BufferId) -> bool;

    /// Records lines `top + 1..bot` so the following edit can be undone.
    fn save_for_undo(
        &mut self,
        _buf: BufferId,
        _top: LineNr,
        _bot: LineNr,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    fn replace_line(&mut self, buf: BufferId, lnum: LineNr, text: &str) -> Result<(), StoreError>;

    /// Inserts a line below `lnum`. `lnum == 0` inserts above the first line.
    fn insert_line_after(
        &mut self,
        buf: BufferId,
        lnum: LineNr,
        text: &str,
    ) -> Result<(), StoreError>;

    fn delete_line(&mut self, buf: BufferId, lnum: LineNr) -> Result<(), StoreError>;

    /// Re-reads the buffer from its backing file. Returns false if the buffer
    /// has no backing file.
    fn reload(&mut self, _buf: BufferId) -> Result<bool, StoreError> {
        Ok(false)
    }

    /// Writes lines `first..=last` with a `\n` after each line. An empty
    /// buffer writes nothing.
    fn write_range(
        &self,
        buf: BufferId,
        first: LineNr,
        last: LineNr,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        if self.is_empty(buf) {
            return Ok(());
        }
        for lnum in first..=last.min(self.line_count(buf)) {
            let line = self.line(buf, lnum).unwrap_or_default();
            out.write_all(line.as_bytes())?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }
}

/// Returns the text lines of a buffer, nothing for an empty buffer.
pub fn buffer_lines(store: &dyn LineStore, buf: BufferId) -> Vec<&str> {
    if store.is_empty(buf) {
        return vec![];
    }
    (1..=store.line_count(buf))
        .map(|lnum| store.line(buf, lnum).unwrap_or_default())
        .collect()
}

#[derive(Clone, Debug)]
struct MemoryBuffer {
    name: String,
    path: Option<PathBuf>,
    lines: Vec<String>,
    empty: bool,
    modifiable: bool,
}

impl MemoryBuffer {
    fn set_text(&mut self, mut lines: Vec<String>) {
        self.empty = lines.is_empty();
        if lines.is_empty() {
            lines.push(String::new());
        }
        self.lines = lines;
    }
}

/// A [`LineStore`] keeping every buffer in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    buffers: BTreeMap<BufferId, MemoryBuffer>,
    next_id: u32,
}

fn split_text(text: &str) -> Vec<String> {
    text.lines().map(ToOwned::to_owned).collect()
}

fn read_lines(path: &Path) -> Result<Vec<String>, StoreError> {
    let text = fs::read(path).map_err(|err| StoreError::Io {
        path: path.to_owned(),
        err,
    })?;
    Ok(split_text(&String::from_utf8_lossy(&text)))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_buffer<S: Into<String>>(
        &mut self,
        name: &str,
        lines: impl IntoIterator<Item = S>,
    ) -> BufferId {
        let id = BufferId(self.next_id);
        self.next_id += 1;
        let mut buffer = MemoryBuffer {
            name: name.to_owned(),
            path: None,
            lines: vec![],
            empty: true,
            modifiable: true,
        };
        buffer.set_text(lines.into_iter().map(Into::into).collect());
        self.buffers.insert(id, buffer);
        id
    }

    /// Adds a buffer with the contents of a file, which can be re-read later.
    pub fn load_file(&mut self, path: &Path) -> Result<BufferId, StoreError> {
        let lines = read_lines(path)?;
        let id = self.add_buffer(&path.display().to_string(), lines);
        if let Some(buffer) = self.buffers.get_mut(&id) {
            buffer.path = Some(path.to_owned());
        }
        Ok(id)
    }

    pub fn remove_buffer(&mut self, buf: BufferId) {
        self.buffers.remove(&buf);
    }

    pub fn set_modifiable(&mut self, buf: BufferId, modifiable: bool) {
        if let Some(buffer) = self.buffers.get_mut(&buf) {
            buffer.modifiable = modifiable;
        }
    }

    pub fn name(&self, buf: BufferId) -> Option<&str> {
        self.buffers.get(&buf).map(|buffer| buffer.name.as_str())
    }

    /// The text lines of the buffer, nothing if it's empty.
    pub fn lines(&self, buf: BufferId) -> &[String] {
        match self.buffers.get(&buf) {
            Some(buffer) if !buffer.empty => &buffer.lines,
            _ => &[],
        }
    }

    pub fn buffer_ids(&self) -> impl Iterator<Item = BufferId> + '_ {
        self.buffers.keys().copied()
    }

    fn buffer(&self, buf: BufferId) -> Result<&MemoryBuffer, StoreError> {
        self.buffers.get(&buf).ok_or(StoreError::UnknownBuffer(buf))
    }

    fn buffer_mut(&mut self, buf: BufferId) -> Result<&mut MemoryBuffer, StoreError> {
        let buffer = self
            .buffers
            .get_mut(&buf)
            .ok_or(StoreError::UnknownBuffer(buf))?;
        if !buffer.modifiable {
            return Err(StoreError::NotModifiable(buf));
        }
        Ok(buffer)
    }
}

/// Converts a 1-based line number to an index, checking `1..=limit`.
fn line_index(buf: BufferId, lnum: LineNr, limit: usize) -> Result<usize, StoreError> {
    usize::try_from(lnum)
        .ok()
        .filter(|&n| (1..=limit).contains(&n))
        .map(|n| n - 1)
        .ok_or(StoreError::LineOutOfRange { buf, lnum })
}

impl LineStore for MemoryStore {
    fn line_count(&self, buf: BufferId) -> LineNr {
        self.buffer(buf)
            .map_or(0, |buffer| buffer.lines.len() as LineNr)
    }

    fn line(&self, buf: BufferId, lnum: LineNr) -> Option<&str> {
        let buffer = self.buffer(buf).ok()?;
        let index = line_index(buf, lnum, buffer.lines.len()).ok()?;
        Some(&buffer.lines[index])
    }

    fn is_empty(&self, buf: BufferId) -> bool {
        self.buffer(buf).map_or(true, |buffer| buffer.empty)
    }

    fn is_modifiable(&self, buf: BufferId) -> bool {
        self.buffer(buf).is_ok_and(|buffer| buffer.modifiable)
    }

    fn replace_line(&mut self, buf: BufferId, lnum: LineNr, text: &str) -> Result<(), StoreError> {
        let buffer = self.buffer_mut(buf)?;
        let index = line_index(buf, lnum, buffer.lines.len())?;
        buffer.lines[index] = text.to_owned();
        buffer.empty = false;
        Ok(())
    }

    fn insert_line_after(
        &mut self,
        buf: BufferId,
        lnum: LineNr,
        text: &str,
    ) -> Result<(), StoreError> {
        let buffer = self.buffer_mut(buf)?;
        // Position 0 is valid here, hence the limit of len + 1.
        let index = line_index(buf, lnum + 1, buffer.lines.len() + 1)?;
        buffer.lines.insert(index, text.to_owned());
        buffer.empty = false;
        Ok(())
    }

    fn delete_line(&mut self, buf: BufferId, lnum: LineNr) -> Result<(), StoreError> {
        let buffer = self.buffer_mut(buf)?;
        let index = line_index(buf, lnum, buffer.lines.len())?;
        if buffer.lines.len() == 1 {
            buffer.set_text(vec![]);
        } else {
            buffer.lines.remove(index);
        }
        Ok(())
    }

    fn reload(&mut self, buf: BufferId) -> Result<bool, StoreError> {
        let Some(path) = self.buffer(buf)?.path.clone() else {
            return Ok(false);
        };
        let lines = read_lines(&path)?;
        let buffer = self
            .buffers
            .get_mut(&buf)
            .ok_or(StoreError::UnknownBuffer(buf))?;
        buffer.set_text(lines);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_empty_buffer_has_placeholder_line() {
        let mut store = MemoryStore::new();
        let buf = store.add_buffer("empty", Vec::<String>::new());
        assert_eq!(store.line_count(buf), 1);
        assert_eq!(store.line(buf, 1), Some(""));
        assert!(store.is_empty(buf));
        assert!(buffer_lines(&store, buf).is_empty());

        store.insert_line_after(buf, 0, "first").unwrap();
        assert!(!store.is_empty(buf));
        assert_eq!(store.lines(buf), ["first", ""]);
    }

    #[test]
    fn test_delete_last_line_leaves_placeholder() {
        let mut store = MemoryStore::new();
        let buf = store.add_buffer("one", ["only"]);
        assert!(!store.is_empty(buf));
        store.delete_line(buf, 1).unwrap();
        assert_eq!(store.line_count(buf), 1);
        assert!(store.is_empty(buf));
    }

    #[test]
    fn test_edits() {
        let mut store = MemoryStore::new();
        let buf = store.add_buffer("abc", ["a", "b", "c"]);
        store.replace_line(buf, 2, "x").unwrap();
        store.insert_line_after(buf, 3, "d").unwrap();
        store.delete_line(buf, 1).unwrap();
        assert_eq!(store.lines(buf), ["x", "c", "d"]);
        assert_matches!(
            store.delete_line(buf, 4),
            Err(StoreError::LineOutOfRange { lnum: 4, .. })
        );
        assert_matches!(
            store.insert_line_after(buf, -1, "z"),
            Err(StoreError::LineOutOfRange { .. })
        );
        assert_eq!(store.line(buf, 0), None);
    }

    #[test]
    fn test_not_modifiable() {
        let mut store = MemoryStore::new();
        let buf = store.add_buffer("ro", ["a"]);
        store.set_modifiable(buf, false);
        assert!(!store.is_modifiable(buf));
        assert_matches!(
            store.replace_line(buf, 1, "b"),
            Err(StoreError::NotModifiable(_))
        );
        assert_eq!(store.lines(buf), ["a"]);
    }

    #[test]
    fn test_write_range() {
        let mut store = MemoryStore::new();
        let buf = store.add_buffer("abc", ["a", "b", "c"]);
        let mut out = vec![];
        store.write_range(buf, 2, 10, &mut out).unwrap();
        assert_eq!(out, b"b\nc\n");

        let empty = store.add_buffer("empty", Vec::<String>::new());
        let mut out = vec![];
        store.write_range(empty, 1, 1, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_load_and_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("file.txt");
        fs::write(&path, "one\r\ntwo\n").unwrap();
        let mut store = MemoryStore::new();
        let buf = store.load_file(&path).unwrap();
        assert_eq!(store.lines(buf), ["one", "two"]);

        fs::write(&path, "").unwrap();
        assert!(store.reload(buf).unwrap());
        assert!(store.is_empty(buf));

        let scratch = store.add_buffer("scratch", ["x"]);
        assert!(!store.reload(scratch).unwrap());
    }
}
