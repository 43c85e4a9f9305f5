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

//! Stores persist the byte stream of one log file.

use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use crate::Error;
use crate::Trap;

mod file;
#[cfg(feature = "store-mmap")]
mod mmap;

pub use self::file::FileStore;
pub use self::file::FileStoreFactory;
#[cfg(feature = "store-mmap")]
pub use self::mmap::MmapStore;
#[cfg(feature = "store-mmap")]
pub use self::mmap::MmapStoreFactory;

/// A store appends bytes to one physical file.
///
/// Stores open lazily: `append` and `size` open (and if needed create) the file on first use,
/// and again after `close`.
pub trait Store: fmt::Debug + Send + 'static {
    /// Append `bytes` to the end of the file.
    fn append(&mut self, bytes: &[u8]) -> Result<(), Error>;

    /// The number of bytes written to the file so far, including what it held when opened.
    fn size(&mut self) -> Result<u64, Error>;

    /// Release the file. A later `append` reopens it.
    fn close(&mut self) -> Result<(), Error>;

    /// Files kept next to the log file that only describe it, such as a persisted write offset.
    ///
    /// They are removed when the log file is rotated away.
    fn companion_paths(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

impl<T: Store> From<T> for Box<dyn Store> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// Creates the [`Store`] for a log file path.
///
/// Implemented for closures:
///
/// ```
/// use std::path::Path;
///
/// use daylog::store::FileStore;
/// use daylog::store::Store;
/// use daylog::store::StoreFactory;
///
/// fn check(_: impl StoreFactory) {}
///
/// check(|path: &Path| -> Box<dyn Store> { Box::new(FileStore::new(path)) });
/// ```
pub trait StoreFactory: Send + Sync + 'static {
    /// Create a store writing to `path`.
    fn create(&self, path: &Path) -> Box<dyn Store>;
}

impl<F> StoreFactory for F
where
    F: Fn(&Path) -> Box<dyn Store> + Send + Sync + 'static,
{
    fn create(&self, path: &Path) -> Box<dyn Store> {
        self(path)
    }
}

/// A store wrapper that never lets a broken store be reused.
///
/// Any error from `append` or `size` closes the wrapped store before the error is returned, so
/// the next call starts over from a freshly opened file. `close` never fails: its errors are sent
/// to the trap.
#[derive(Debug)]
pub struct SafeStore {
    inner: Box<dyn Store>,
    trap: Arc<dyn Trap>,
}

impl SafeStore {
    /// Wrap `inner`, reporting swallowed errors to `trap`.
    pub fn new(inner: Box<dyn Store>, trap: Arc<dyn Trap>) -> Self {
        Self { inner, trap }
    }

    fn close_after(&mut self, err: Error) -> Error {
        self.close_quietly();
        err
    }

    fn close_quietly(&mut self) {
        if let Err(err) = self.inner.close() {
            let err = Error::new(err.kind(), "failed to close store").with_source(err);
            self.trap.trap(&err);
        }
    }
}

impl Store for SafeStore {
    fn append(&mut self, bytes: &[u8]) -> Result<(), Error> {
        match self.inner.append(bytes) {
            Ok(()) => Ok(()),
            Err(err) => Err(self.close_after(err)),
        }
    }

    fn size(&mut self) -> Result<u64, Error> {
        match self.inner.size() {
            Ok(size) => Ok(size),
            Err(err) => Err(self.close_after(err)),
        }
    }

    fn close(&mut self) -> Result<(), Error> {
        self.close_quietly();
        Ok(())
    }

    fn companion_paths(&self) -> Vec<PathBuf> {
        self.inner.companion_paths()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::CollectingTrap;
    use super::testing::ScriptedStore;
    use super::*;

    #[test]
    fn test_failed_append_closes_store() {
        let inner = ScriptedStore::default();
        inner.0.lock().unwrap().fail_appends = 1;
        let trap = CollectingTrap::default();
        let mut store = SafeStore::new(Box::new(inner.clone()), Arc::new(trap.clone()));

        assert!(store.append(b"first\n").is_err());
        assert_eq!(inner.0.lock().unwrap().closes, 1);

        store.append(b"second\n").unwrap();
        assert_eq!(inner.0.lock().unwrap().appended, b"second\n");
        assert_eq!(store.size().unwrap(), 7);
        assert!(trap.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_close_never_fails() {
        let inner = ScriptedStore::default();
        inner.0.lock().unwrap().fail_close = true;
        let trap = CollectingTrap::default();
        let mut store = SafeStore::new(Box::new(inner.clone()), Arc::new(trap.clone()));

        store.close().unwrap();
        let trapped = trap.0.lock().unwrap();
        assert_eq!(trapped.len(), 1);
        assert!(trapped[0].contains("failed to close store"));
        assert!(trapped[0].contains("close failed"));
    }
}
