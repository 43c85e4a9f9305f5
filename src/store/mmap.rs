// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A store writing through a memory-mapped window.
//!
//! The log file is mapped one window at a time. The file is grown to cover the whole window
//! when it is mapped, so its physical size runs ahead of the bytes actually written. The
//! number of unwritten bytes at the end of the current window is persisted in an 8-byte
//! big-endian offset record next to the log file (`<log>.offset`), itself memory-mapped and
//! updated after every append. When the store is reopened, possibly after a crash, the next
//! window starts at `file size - remaining`.

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;

use memmap2::MmapMut;
use memmap2::MmapOptions;

use crate::Error;
use crate::store::Store;
use crate::store::StoreFactory;

const DEFAULT_WINDOW_SIZE: usize = 128 * 1024;
const OFFSET_RECORD_LEN: usize = 8;
const OFFSET_SUFFIX: &str = "offset";

/// A store appending into a memory-mapped window, tolerant of crashes between writes.
#[derive(Debug)]
pub struct MmapStore {
    path: PathBuf,
    offset_path: PathBuf,
    window_size: usize,
    log: Option<Window>,
    offset: Option<OffsetRecord>,
}

impl MmapStore {
    /// Creates a store for `path` with a 128 KiB window. Nothing is opened until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let offset_path = offset_path_of(&path);
        Self {
            path,
            offset_path,
            window_size: DEFAULT_WINDOW_SIZE,
            log: None,
            offset: None,
        }
    }

    /// Set the size of the mapped window. A single larger append maps a window of its own size.
    pub fn window_size(mut self, n: NonZeroUsize) -> Self {
        self.window_size = n.get();
        self
    }

    /// The path of the offset record kept next to the log file.
    pub fn offset_path(&self) -> &Path {
        &self.offset_path
    }

    fn offset_record(&mut self) -> Result<&mut OffsetRecord, Error> {
        let record = match self.offset.take() {
            Some(record) => record,
            None => OffsetRecord::open(&self.offset_path)?,
        };
        Ok(self.offset.insert(record))
    }

    fn window(&mut self, append_len: usize) -> Result<&mut Window, Error> {
        let window_size = self.window_size.max(append_len);

        let (file, remaining) = match self.log.take() {
            Some(window) if window.remaining() >= append_len => {
                return Ok(self.log.insert(window));
            }
            Some(window) => {
                let remaining = window.remaining() as i64;
                (window.into_file(), remaining)
            }
            None => {
                let file = open_log(&self.path)?;
                let remaining = self.offset_record()?.load();
                (file, remaining)
            }
        };

        let window = Window::map(file, remaining, window_size)
            .map_err(|err| Error::io("failed to map log file", err).with_path(&self.path))?;
        self.offset_record()?.save(window.remaining());
        Ok(self.log.insert(window))
    }
}

impl Store for MmapStore {
    fn append(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let window = self.window(bytes.len())?;
        window.put(bytes);
        let remaining = window.remaining();
        self.offset_record()?.save(remaining);
        Ok(())
    }

    fn size(&mut self) -> Result<u64, Error> {
        Ok(self.window(0)?.written())
    }

    fn close(&mut self) -> Result<(), Error> {
        let mut result = Ok(());

        if let Some(window) = self.log.take() {
            if let Err(err) = window.map.flush() {
                result = Err(Error::io("failed to flush log mapping", err).with_path(&self.path));
            }
        }
        if let Some(record) = self.offset.take() {
            if let Err(err) = record.map.flush() {
                let err = Error::io("failed to flush offset record", err).with_path(&self.offset_path);
                result = result.and(Err(err));
            }
        }

        result
    }

    fn companion_paths(&self) -> Vec<PathBuf> {
        vec![self.offset_path.clone()]
    }
}

/// Creates an [`MmapStore`] per log file.
#[derive(Debug, Clone, Copy)]
pub struct MmapStoreFactory {
    window_size: NonZeroUsize,
}

impl Default for MmapStoreFactory {
    fn default() -> Self {
        Self {
            window_size: NonZeroUsize::new(DEFAULT_WINDOW_SIZE).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl MmapStoreFactory {
    /// Set the window size of the created stores.
    pub fn window_size(mut self, n: NonZeroUsize) -> Self {
        self.window_size = n;
        self
    }
}

impl StoreFactory for MmapStoreFactory {
    fn create(&self, path: &Path) -> Box<dyn Store> {
        Box::new(MmapStore::new(path).window_size(self.window_size))
    }
}

fn offset_path_of(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(OFFSET_SUFFIX);
    path.with_file_name(name)
}

fn open_rw(path: &Path) -> Result<File, Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| Error::io("failed to create log directory", err).with_path(parent))?;
    }

    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|err| Error::io("failed to open file", err).with_path(path))
}

fn open_log(path: &Path) -> Result<File, Error> {
    open_rw(path)
}

#[derive(Debug)]
struct Window {
    file: File,
    map: MmapMut,
    // file offset where the mapping starts
    position: u64,
    // bytes written into the mapping
    cursor: usize,
}

impl Window {
    fn map(file: File, remaining: i64, window_size: usize) -> std::io::Result<Window> {
        let file_size = file.metadata()?.len();

        // a stale or corrupted record must never move the write position past the end of the
        // file, nor before its start
        let remaining = match u64::try_from(remaining) {
            Ok(remaining) if remaining <= file_size => remaining,
            _ => 0,
        };
        let position = file_size - remaining;

        let end = position + window_size as u64;
        if file_size < end {
            file.set_len(end)?;
        }

        // SAFETY: the file is only ever written through this mapping while the store is open;
        // sharing the files with another process is not supported.
        let map = unsafe {
            MmapOptions::new()
                .offset(position)
                .len(window_size)
                .map_mut(&file)?
        };

        Ok(Window {
            file,
            map,
            position,
            cursor: 0,
        })
    }

    fn remaining(&self) -> usize {
        self.map.len() - self.cursor
    }

    fn written(&self) -> u64 {
        self.position + self.cursor as u64
    }

    fn put(&mut self, bytes: &[u8]) {
        let end = self.cursor + bytes.len();
        self.map[self.cursor..end].copy_from_slice(bytes);
        self.cursor = end;
    }

    fn into_file(self) -> File {
        self.file
    }
}

#[derive(Debug)]
struct OffsetRecord {
    _file: File,
    map: MmapMut,
}

impl OffsetRecord {
    fn open(path: &Path) -> Result<OffsetRecord, Error> {
        let file = open_rw(path)?;
        let map = (|| {
            if file.metadata()?.len() < OFFSET_RECORD_LEN as u64 {
                file.set_len(OFFSET_RECORD_LEN as u64)?;
            }
            // SAFETY: see `Window::map`.
            unsafe { MmapOptions::new().len(OFFSET_RECORD_LEN).map_mut(&file) }
        })()
        .map_err(|err| Error::io("failed to map offset record", err).with_path(path))?;

        Ok(OffsetRecord { _file: file, map })
    }

    fn load(&self) -> i64 {
        let mut buf = [0u8; OFFSET_RECORD_LEN];
        buf.copy_from_slice(&self.map[..OFFSET_RECORD_LEN]);
        i64::from_be_bytes(buf)
    }

    fn save(&mut self, remaining: usize) {
        let remaining = i64::try_from(remaining).unwrap_or(i64::MAX);
        self.map[..OFFSET_RECORD_LEN].copy_from_slice(&remaining.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn content(path: &Path) -> Vec<u8> {
        let mut bytes = fs::read(path).unwrap();
        while bytes.last() == Some(&0) {
            bytes.pop();
        }
        bytes
    }

    fn window(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_append_and_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("20240810").join("20240810.log");
        let mut store = MmapStore::new(&path);

        assert_eq!(store.size().unwrap(), 0);
        store.append(b"hello\n").unwrap();
        store.append(b"world\n").unwrap();
        assert_eq!(store.size().unwrap(), 12);
        store.close().unwrap();

        assert_eq!(content(&path), b"hello\nworld\n");
        assert!(store.offset_path().exists());
        assert_eq!(
            fs::metadata(&path).unwrap().len(),
            DEFAULT_WINDOW_SIZE as u64
        );
    }

    #[test]
    fn test_remaps_when_window_is_full() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("20240810.log");
        let mut store = MmapStore::new(&path).window_size(window(16));

        let mut expected = vec![];
        for i in 0..20 {
            let line = format!("line {i:02}\n");
            store.append(line.as_bytes()).unwrap();
            expected.extend_from_slice(line.as_bytes());
            assert_eq!(store.size().unwrap(), expected.len() as u64);
        }

        // a single record larger than the window
        let big = vec![b'x'; 100];
        store.append(&big).unwrap();
        expected.extend_from_slice(&big);
        store.close().unwrap();

        assert_eq!(content(&path), expected);
    }

    #[test]
    fn test_reopen_continues_after_written_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("20240810.log");

        let mut store = MmapStore::new(&path).window_size(window(64));
        store.append(b"before\n").unwrap();
        // dropped without close, as in a crash
        drop(store);

        let mut store = MmapStore::new(&path).window_size(window(64));
        assert_eq!(store.size().unwrap(), 7);
        store.append(b"after\n").unwrap();
        store.close().unwrap();

        assert_eq!(content(&path), b"before\nafter\n");
    }

    #[test]
    fn test_corrupted_offset_never_exceeds_file_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("20240810.log");
        fs::write(&path, b"durable\n").unwrap();

        let store = MmapStore::new(&path);
        fs::write(store.offset_path(), i64::MAX.to_be_bytes()).unwrap();
        let mut store = store;
        assert_eq!(store.size().unwrap(), 8);
        store.append(b"next\n").unwrap();
        store.close().unwrap();
        assert_eq!(content(&path), b"durable\nnext\n");

        let store = MmapStore::new(&path);
        fs::write(store.offset_path(), (-5i64).to_be_bytes()).unwrap();
        let mut store = store;
        let size = store.size().unwrap();
        assert!(size <= fs::metadata(&path).unwrap().len());
        store.close().unwrap();
        assert!(content(&path).starts_with(b"durable\nnext\n"));
    }

    #[test]
    fn test_reopens_after_file_removed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("20240810").join("20240810.log");
        let mut store = MmapStore::new(&path);

        store.append(b"one\n").unwrap();
        store.close().unwrap();
        fs::remove_dir_all(temp_dir.path().join("20240810")).unwrap();

        store.append(b"two\n").unwrap();
        assert_eq!(store.size().unwrap(), 4);
        store.close().unwrap();
        assert_eq!(content(&path), b"two\n");
    }
}
