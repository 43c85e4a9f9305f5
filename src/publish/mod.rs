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

//! Publishing records into the log directory.

use std::sync::Arc;

use crate::Error;
use crate::Trap;
use crate::record::LogRecord;

mod directory;
mod handler;

pub use self::directory::DirectoryPublisher;

/// A publisher wrapper whose lifecycle calls never fail.
///
/// Errors from `publish`, `on_idle` and `close` are sent to the trap. Directory operations are
/// reached through [`SafePublisher::get_mut`] and still return their errors.
#[derive(Debug)]
pub struct SafePublisher {
    inner: DirectoryPublisher,
    trap: Arc<dyn Trap>,
}

impl SafePublisher {
    /// Wrap `inner`, reporting its errors to `trap`.
    pub fn new(inner: DirectoryPublisher, trap: Arc<dyn Trap>) -> Self {
        Self { inner, trap }
    }

    /// The wrapped publisher.
    pub fn get_ref(&self) -> &DirectoryPublisher {
        &self.inner
    }

    /// The wrapped publisher, for directory operations.
    pub fn get_mut(&mut self) -> &mut DirectoryPublisher {
        &mut self.inner
    }

    /// Publish `record`, trapping any error.
    pub fn publish(&mut self, record: &LogRecord) {
        if let Err(err) = self.inner.publish(record) {
            self.report("failed to publish record", err);
        }
    }

    /// Run the idle check, trapping any error.
    pub fn on_idle(&mut self) {
        if let Err(err) = self.inner.on_idle() {
            self.report("failed to check log file", err);
        }
    }

    /// Close the open file, trapping any error.
    pub fn close(&mut self) {
        if let Err(err) = self.inner.close() {
            self.report("failed to close publisher", err);
        }
    }

    fn report(&self, message: &'static str, err: Error) {
        let err = Error::new(err.kind(), message).with_source(err);
        self.trap.trap(&err);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::ErrorKind;
    use crate::layout::CustomLayout;
    use crate::store::testing::CollectingTrap;

    #[test]
    fn test_publish_errors_are_trapped() {
        let dir = TempDir::new().unwrap();
        let trap = CollectingTrap::default();
        let inner = DirectoryPublisher::new(dir.path())
            .layout(CustomLayout::new(|_| {
                Err(Error::new(ErrorKind::Format, "cannot format"))
            }))
            .trap(trap.clone());
        let mut publisher = SafePublisher::new(inner, Arc::new(trap.clone()));

        let record = LogRecord::builder().origin("test").message("hi").build();
        publisher.publish(&record);
        publisher.on_idle();
        publisher.close();

        let trapped = trap.0.lock().unwrap();
        assert_eq!(trapped.len(), 1);
        assert!(trapped[0].starts_with("failed to publish record (Format)"));
        assert!(trapped[0].contains("cannot format"));
    }

    #[test]
    fn test_publish_recovers_after_failure() {
        let dir = TempDir::new().unwrap();
        let trap = CollectingTrap::default();
        // a regular file where the day directory should go
        let blocked = dir.path().join("root");
        fs::write(&blocked, b"").unwrap();

        let inner = DirectoryPublisher::new(&blocked).trap(trap.clone());
        let mut publisher = SafePublisher::new(inner, Arc::new(trap.clone()));
        let record = LogRecord::builder().origin("test").message("hi").build();

        publisher.publish(&record);
        assert_eq!(trap.0.lock().unwrap().len(), 1);

        fs::remove_file(&blocked).unwrap();
        publisher.publish(&record);
        assert_eq!(trap.0.lock().unwrap().len(), 1);
        assert!(blocked.is_dir());
    }
}
