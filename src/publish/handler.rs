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

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use crate::Error;
use crate::Layout;
use crate::Trap;
use crate::date::DateKey;
use crate::record::LogRecord;
use crate::store::SafeStore;
use crate::store::Store;

const ROTATED_SUFFIX: &str = "1";

/// The sibling a log file is renamed to when it grows past the daily limit.
pub(crate) fn rotated_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(ROTATED_SUFFIX);
    path.with_file_name(name)
}

/// The open log file of one day.
#[derive(Debug)]
pub(crate) struct DateFileHandler {
    date: DateKey,
    path: PathBuf,
    store: SafeStore,
}

impl DateFileHandler {
    pub(crate) fn new(date: DateKey, path: PathBuf, store: SafeStore) -> Self {
        Self { date, path, store }
    }

    pub(crate) fn date(&self) -> DateKey {
        self.date
    }

    /// Format and append `record`, then rotate the file once it holds half of `max_bytes`.
    ///
    /// `max_bytes == 0` disables rotation. The check runs after the append, so a day may end up
    /// with somewhat more than `max_bytes` across the file and its rotated sibling.
    pub(crate) fn publish(
        &mut self,
        record: &LogRecord,
        layout: &mut dyn Layout,
        max_bytes: u64,
        trap: &dyn Trap,
    ) -> Result<(), Error> {
        let bytes = layout.format(record)?;
        self.store.append(&bytes)?;

        if max_bytes > 0 && self.store.size()? >= max_bytes / 2 {
            self.rotate(layout, trap);
        }
        Ok(())
    }

    fn rotate(&mut self, layout: &mut dyn Layout, trap: &dyn Trap) {
        self.close(layout);

        // overwrites the previous sibling, if any
        let rotated = rotated_path(&self.path);
        if let Err(err) = fs::rename(&self.path, &rotated) {
            let err = Error::io("failed to rotate log file", err)
                .with_path(&self.path)
                .with_context("to", rotated.display());
            trap.trap(&err);
        }

        // they describe the file that just moved away; the next one starts from scratch
        for path in self.store.companion_paths() {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    let err = Error::io("failed to remove rotated companion file", err).with_path(&path);
                    trap.trap(&err);
                }
            }
        }
    }

    /// Drop the store if the file was removed behind our back, so the next write recreates it.
    pub(crate) fn on_idle(&mut self, layout: &mut dyn Layout) {
        if !self.path.is_file() {
            self.close(layout);
        }
    }

    pub(crate) fn close(&mut self, layout: &mut dyn Layout) {
        self.store.close().ok();
        layout.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use tempfile::TempDir;

    use super::*;
    use crate::layout::CustomLayout;
    use crate::store::FileStore;
    use crate::store::testing::CollectingTrap;

    fn handler(dir: &TempDir, trap: CollectingTrap) -> DateFileHandler {
        let date = DateKey::from_ymd(2024, 8, 10).unwrap();
        let path = dir.path().join("20240810").join("20240810.log");
        let store = SafeStore::new(Box::new(FileStore::new(&path)), Arc::new(trap));
        DateFileHandler::new(date, path, store)
    }

    fn message_layout() -> CustomLayout {
        CustomLayout::new(|record| Ok(format!("{}\n", record.message()).into_bytes()))
    }

    fn record(message: &str) -> LogRecord {
        LogRecord::builder().origin("test").message(message).build()
    }

    #[test]
    fn test_rotates_at_half_the_limit() {
        let dir = TempDir::new().unwrap();
        let trap = CollectingTrap::default();
        let mut handler = handler(&dir, trap.clone());
        let mut layout = message_layout();
        let path = dir.path().join("20240810").join("20240810.log");

        // 4 bytes per record, rotation at 10 bytes
        for message in ["one", "two", "thr"] {
            handler
                .publish(&record(message), &mut layout, 20, &trap)
                .unwrap();
        }
        assert_eq!(fs::read_to_string(rotated_path(&path)).unwrap(), "one\ntwo\nthr\n");
        assert!(!path.exists());

        handler
            .publish(&record("fou"), &mut layout, 20, &trap)
            .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "fou\n");
        assert!(trap.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_zero_limit_never_rotates() {
        let dir = TempDir::new().unwrap();
        let trap = CollectingTrap::default();
        let mut handler = handler(&dir, trap.clone());
        let mut layout = message_layout();

        for _ in 0..100 {
            handler
                .publish(&record("0123456789"), &mut layout, 0, &trap)
                .unwrap();
        }
        let path = dir.path().join("20240810").join("20240810.log");
        assert_eq!(fs::metadata(&path).unwrap().len(), 1100);
        assert!(!rotated_path(&path).exists());
    }

    #[test]
    fn test_every_close_resets_layout() {
        let dir = TempDir::new().unwrap();
        let trap = CollectingTrap::default();
        let mut handler = handler(&dir, trap.clone());

        let resets = Arc::new(AtomicUsize::new(0));
        let counter = resets.clone();
        let mut layout = message_layout().on_reset(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        handler
            .publish(&record("hello"), &mut layout, 0, &trap)
            .unwrap();
        handler.close(&mut layout);
        assert_eq!(resets.load(Ordering::SeqCst), 1);

        // 12 bytes with the reopened file, past half of 12
        handler
            .publish(&record("hello"), &mut layout, 12, &trap)
            .unwrap();
        assert_eq!(resets.load(Ordering::SeqCst), 2);

        handler
            .publish(&record("hi"), &mut layout, 0, &trap)
            .unwrap();
        fs::remove_dir_all(dir.path().join("20240810")).unwrap();
        handler.on_idle(&mut layout);
        assert_eq!(resets.load(Ordering::SeqCst), 3);

        // the file is back, nothing to release
        handler
            .publish(&record("hi"), &mut layout, 0, &trap)
            .unwrap();
        handler.on_idle(&mut layout);
        assert_eq!(resets.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_idle_check_recreates_deleted_file() {
        let dir = TempDir::new().unwrap();
        let trap = CollectingTrap::default();
        let mut handler = handler(&dir, trap.clone());
        let mut layout = message_layout();

        handler
            .publish(&record("before"), &mut layout, 0, &trap)
            .unwrap();
        fs::remove_dir_all(dir.path().join("20240810")).unwrap();
        handler.on_idle(&mut layout);

        handler
            .publish(&record("after"), &mut layout, 0, &trap)
            .unwrap();
        let path = dir.path().join("20240810").join("20240810.log");
        assert_eq!(fs::read_to_string(path).unwrap(), "after\n");
    }

    #[cfg(feature = "store-mmap")]
    #[test]
    fn test_rotation_drops_offset_record() {
        use crate::store::MmapStore;

        let dir = TempDir::new().unwrap();
        let trap = CollectingTrap::default();
        let date = DateKey::from_ymd(2024, 8, 10).unwrap();
        let path = dir.path().join("20240810").join("20240810.log");
        let store = SafeStore::new(Box::new(MmapStore::new(&path)), Arc::new(trap.clone()));
        let offset_path = store.companion_paths().remove(0);
        let mut handler = DateFileHandler::new(date, path.clone(), store);
        let mut layout = message_layout();

        handler
            .publish(&record("small"), &mut layout, 0, &trap)
            .unwrap();
        assert!(offset_path.is_file());

        handler
            .publish(&record("0123456789"), &mut layout, 20, &trap)
            .unwrap();
        assert!(rotated_path(&path).is_file());
        assert!(!path.exists());
        assert!(!offset_path.exists());

        handler
            .publish(&record("fresh"), &mut layout, 0, &trap)
            .unwrap();
        handler.close(&mut layout);
        let content = fs::read(&path).unwrap();
        assert!(content.starts_with(b"fresh\n"));
        assert!(content[6..].iter().all(|b| *b == 0));
        assert!(trap.0.lock().unwrap().is_empty());
    }
}
