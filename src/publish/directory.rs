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
use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::DefaultTrap;
use crate::Error;
use crate::ErrorKind;
use crate::Layout;
use crate::Trap;
use crate::date;
use crate::date::DateKey;
use crate::layout::TextLayout;
use crate::publish::handler::DateFileHandler;
use crate::publish::handler::rotated_path;
use crate::record::LogRecord;
use crate::store::FileStoreFactory;
use crate::store::SafeStore;
use crate::store::StoreFactory;

/// Writes records into per-day files under one root directory.
///
/// Files are laid out as `<root>/<YYYYMMDD>/<YYYYMMDD>.<ext>`. At most one file is open at a
/// time; a record for another day closes it and opens that day's file.
///
/// A publisher is not synchronized. It is meant to be driven from a single dispatch lane.
#[derive(Debug)]
pub struct DirectoryPublisher {
    directory: PathBuf,
    extension: String,
    max_bytes_per_day: u64,
    layout: Box<dyn Layout>,
    store_factory: Factory,
    handler: Option<DateFileHandler>,
    trap: Arc<dyn Trap>,
}

struct Factory(Box<dyn StoreFactory>);

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StoreFactory { ... }")
    }
}

impl DirectoryPublisher {
    /// Creates a publisher writing under `directory` with [`TextLayout`] and plain file stores.
    ///
    /// Nothing is created on disk until the first record is published.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            extension: "log".to_string(),
            max_bytes_per_day: 0,
            layout: Box::new(TextLayout::default()),
            store_factory: Factory(Box::new(FileStoreFactory::default())),
            handler: None,
            trap: Arc::new(DefaultTrap::default()),
        }
    }

    /// Set the layout records are formatted with.
    pub fn layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Set the factory creating the store of each day's file.
    pub fn store_factory(self, factory: impl StoreFactory) -> Self {
        self.boxed_store_factory(Box::new(factory))
    }

    pub(crate) fn boxed_store_factory(mut self, factory: Box<dyn StoreFactory>) -> Self {
        self.store_factory = Factory(factory);
        self
    }

    /// Set the extension of log files. Default to `log`.
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Set the trap receiving errors that cannot be returned.
    pub fn trap(self, trap: impl Trap) -> Self {
        self.shared_trap(Arc::new(trap))
    }

    pub(crate) fn shared_trap(mut self, trap: Arc<dyn Trap>) -> Self {
        self.trap = trap;
        self
    }

    /// The root directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The rotation limit in bytes, `0` when unlimited.
    pub fn max_bytes_per_day(&self) -> u64 {
        self.max_bytes_per_day
    }

    /// Set the rotation limit. A day's file is rotated once it holds half of `max_bytes`;
    /// `0` disables rotation.
    pub fn set_max_bytes_per_day(&mut self, max_bytes: u64) {
        self.max_bytes_per_day = max_bytes;
    }

    /// The path of the canonical log file for `date`.
    pub fn log_path(&self, date: &DateKey) -> PathBuf {
        self.directory
            .join(date.to_string())
            .join(format!("{date}.{}", self.extension))
    }

    /// Append `record` to the file of the day it was captured on.
    pub fn publish(&mut self, record: &LogRecord) -> Result<(), Error> {
        let date = DateKey::from_timestamp_millis(record.timestamp_millis())?;

        if self.handler.as_ref().is_some_and(|h| h.date() != date) {
            self.close_handler();
        }

        let handler = match self.handler.take() {
            Some(handler) => handler,
            None => {
                let path = self.log_path(&date);
                let store = self.store_factory.0.create(&path);
                let store = SafeStore::new(store, self.trap.clone());
                DateFileHandler::new(date, path, store)
            }
        };
        let handler = self.handler.insert(handler);

        handler.publish(
            record,
            self.layout.as_mut(),
            self.max_bytes_per_day,
            &*self.trap,
        )
    }

    /// Check whether the open file still exists, releasing it if not.
    pub fn on_idle(&mut self) -> Result<(), Error> {
        if let Some(handler) = self.handler.as_mut() {
            handler.on_idle(self.layout.as_mut());
        }
        Ok(())
    }

    /// Close the open file, if any. The next record reopens it.
    pub fn close(&mut self) -> Result<(), Error> {
        self.close_handler();
        Ok(())
    }

    fn close_handler(&mut self) {
        if let Some(mut handler) = self.handler.take() {
            handler.close(self.layout.as_mut());
        }
    }

    /// The existing log files of one day: the canonical file first, then its rotated sibling.
    ///
    /// Returns nothing for an invalid date.
    pub fn files_for_date(&self, year: i32, month: i32, day: i32) -> Vec<PathBuf> {
        let Ok(date) = DateKey::from_ymd(year, month, day) else {
            return vec![];
        };

        let path = self.log_path(&date);
        let rotated = rotated_path(&path);
        [path, rotated]
            .into_iter()
            .filter(|path| path.is_file())
            .collect()
    }

    /// Delete the day directories, and other day-named entries such as exported archives, that
    /// fall outside the last `save_days` days ending with `today`.
    ///
    /// `save_days <= 0` deletes the whole root directory. Entries whose names are not dates are
    /// kept.
    pub fn delete_older_than(&mut self, save_days: i32, today: &DateKey) -> Result<(), Error> {
        self.close_handler();

        if save_days <= 0 {
            return match fs::remove_dir_all(&self.directory) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(Error::io("failed to delete log directory", err)
                    .with_path(&self.directory)),
            };
        }

        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(
                    Error::io("failed to list log directory", err).with_path(&self.directory)
                );
            }
        };

        let today = today.to_string();
        let mut result = Ok(());
        for entry in entries {
            let entry = entry
                .map_err(|err| Error::io("failed to list log directory", err).with_path(&self.directory))?;
            let name = entry.file_name();
            let Some(days) = name.to_str().and_then(|name| date::diff_days(&today, name)) else {
                continue;
            };
            if days <= save_days - 1 {
                continue;
            }

            let path = entry.path();
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(err) = removed {
                // keep going and report the first failure
                let err = Error::io("failed to delete expired log", err).with_path(&path);
                result = result.and(Err(err));
            }
        }
        result
    }

    /// Pack every file of `date` into `<root>/<date>.zip`.
    ///
    /// Returns the archive path, or `None` if the day has no files.
    pub fn zip_date(&mut self, date: &DateKey) -> Result<Option<PathBuf>, Error> {
        self.close_handler();

        let source = self.directory.join(date.to_string());
        let mut files = vec![];
        collect_files(&source, &mut files)?;
        if files.is_empty() {
            return Ok(None);
        }
        files.sort();

        let target = self.directory.join(format!("{date}.zip"));
        if let Err(err) = write_zip(&source, &files, &target) {
            let _ = fs::remove_file(&target);
            return Err(err.with_path(&target));
        }
        Ok(Some(target))
    }
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), Error> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(Error::io("failed to list log directory", err).with_path(dir)),
    };

    for entry in entries {
        let path = entry
            .map_err(|err| Error::io("failed to list log directory", err).with_path(dir))?
            .path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

fn write_zip(source: &Path, files: &[PathBuf], target: &Path) -> Result<(), Error> {
    let zip_error = |err: zip::result::ZipError| {
        Error::new(ErrorKind::Io, "failed to write zip archive").with_source(err)
    };

    let archive = File::create(target).map_err(|err| Error::io("failed to create zip archive", err))?;
    let mut writer = ZipWriter::new(archive);

    for file in files {
        let name = file
            .strip_prefix(source)
            .unwrap_or(file)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file(name, options).map_err(zip_error)?;

        let mut input = File::open(file)
            .map_err(|err| Error::io("failed to read log file", err).with_path(file))?;
        io::copy(&mut input, &mut writer)
            .map_err(|err| Error::io("failed to write zip archive", err).with_path(file))?;
    }

    writer.finish().map_err(zip_error)?;
    Ok(())
}
