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

use std::path::Path;
use std::path::PathBuf;

use crate::Error;
use crate::date::DateKey;
use crate::publish::DirectoryPublisher;

/// Access to the log directory while no log file is open.
///
/// Handed out by [`Logger::log_directory`](crate::Logger::log_directory) and only valid for the
/// duration of that call. No record is written while the scope is alive.
#[derive(Debug)]
pub struct DirectoryScope<'a> {
    publisher: &'a mut DirectoryPublisher,
}

impl<'a> DirectoryScope<'a> {
    pub(crate) fn new(publisher: &'a mut DirectoryPublisher) -> Self {
        Self { publisher }
    }

    /// The root log directory.
    pub fn directory(&self) -> &Path {
        self.publisher.directory()
    }

    /// The existing files of one day, see [`DirectoryPublisher::files_for_date`].
    pub fn files_for_date(&self, year: i32, month: i32, day: i32) -> Vec<PathBuf> {
        self.publisher.files_for_date(year, month, day)
    }

    /// Pack the files of `date` into `<root>/<date>.zip`, see [`DirectoryPublisher::zip_date`].
    pub fn zip_date(&mut self, date: &DateKey) -> Result<Option<PathBuf>, Error> {
        self.publisher.zip_date(date)
    }

    /// Keep the last `save_days` days up to today, see [`DirectoryPublisher::delete_older_than`].
    pub fn delete_older_than(&mut self, save_days: i32) -> Result<(), Error> {
        self.publisher
            .delete_older_than(save_days, &DateKey::today())
    }
}
