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

//! Layouts for formatting log records into bytes.

use std::fmt;

use crate::Error;
use crate::record::LogRecord;

mod custom;
mod text;

pub use self::custom::CustomLayout;
pub use self::text::TextLayout;

/// A layout turns a [`LogRecord`] into the bytes written to the log file.
///
/// Layouts only ever run on the dispatch lane, one record at a time, so they may keep state
/// across calls. Such state must be dropped in [`reset`](Layout::reset): it is called whenever
/// the file being written is closed, and the next file must not assume continuity with the
/// previous one.
pub trait Layout: fmt::Debug + Send + 'static {
    /// Formats a log record, including any trailing line terminator.
    fn format(&mut self, record: &LogRecord) -> Result<Vec<u8>, Error>;

    /// Forget any cross-record state.
    ///
    /// Default to a no-op.
    fn reset(&mut self) {}
}

impl<T: Layout> From<T> for Box<dyn Layout> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}
