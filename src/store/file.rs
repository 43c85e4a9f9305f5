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
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::Error;
use crate::store::Store;
use crate::store::StoreFactory;

/// A store appending through a buffered writer, flushed after every record.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    output: Option<CountingWriter>,
}

#[derive(Debug)]
struct CountingWriter {
    writer: BufWriter<File>,
    written: u64,
}

impl FileStore {
    /// Creates a store for `path`. Nothing is opened until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            output: None,
        }
    }

    /// The path of the file this store writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn output(&mut self) -> Result<&mut CountingWriter, Error> {
        let output = match self.output.take() {
            Some(output) => output,
            None => open_output(&self.path)?,
        };
        Ok(self.output.insert(output))
    }
}

fn open_output(path: &Path) -> Result<CountingWriter, Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| Error::io("failed to create log directory", err).with_path(parent))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| Error::io("failed to open log file", err).with_path(path))?;
    let written = file
        .metadata()
        .map_err(|err| Error::io("failed to stat log file", err).with_path(path))?
        .len();

    Ok(CountingWriter {
        writer: BufWriter::new(file),
        written,
    })
}

impl Store for FileStore {
    fn append(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let path = self.path.clone();
        let output = self.output()?;
        output
            .writer
            .write_all(bytes)
            .and_then(|()| output.writer.flush())
            .map_err(|err| Error::io("failed to append log", err).with_path(&path))?;
        output.written += bytes.len() as u64;
        Ok(())
    }

    fn size(&mut self) -> Result<u64, Error> {
        Ok(self.output()?.written)
    }

    fn close(&mut self) -> Result<(), Error> {
        match self.output.take() {
            None => Ok(()),
            Some(mut output) => output
                .writer
                .flush()
                .map_err(|err| Error::io("failed to flush log file", err).with_path(&self.path)),
        }
    }
}

/// Creates a [`FileStore`] per log file. This is the default factory.
#[derive(Debug, Default, Clone, Copy)]
#[non_exhaustive]
pub struct FileStoreFactory {}

impl StoreFactory for FileStoreFactory {
    fn create(&self, path: &Path) -> Box<dyn Store> {
        Box::new(FileStore::new(path))
    }
}
