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

//! Log records and levels.

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use jiff::Timestamp;

use crate::Error;
use crate::ErrorKind;

/// The severity of a log record.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Level {
    /// The most detailed messages.
    Verbose,
    /// Debugging messages.
    Debug,
    /// Informational messages.
    Info,
    /// Hazardous situations.
    Warning,
    /// Very serious errors.
    Error,
}

impl Level {
    /// The full name of this level.
    pub fn name(&self) -> &'static str {
        match self {
            Level::Verbose => "VERBOSE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }

    /// The one-letter abbreviation used in text output.
    pub fn letter(&self) -> &'static str {
        match self {
            Level::Verbose => "V",
            Level::Debug => "D",
            Level::Info => "I",
            Level::Warning => "W",
            Level::Error => "E",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for level in [
            Level::Verbose,
            Level::Debug,
            Level::Info,
            Level::Warning,
            Level::Error,
        ] {
            if s.eq_ignore_ascii_case(level.name()) || s.eq_ignore_ascii_case(level.letter()) {
                return Ok(level);
            }
        }
        Err(Error::new(ErrorKind::Unexpected, "malformed level").with_context("input", s))
    }
}

/// The minimal level a record must have to be written.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum LevelFilter {
    /// Every record passes.
    All,
    /// Records at [`Level::Verbose`] or more severe.
    Verbose,
    /// Records at [`Level::Debug`] or more severe.
    Debug,
    /// Records at [`Level::Info`] or more severe.
    #[default]
    Info,
    /// Records at [`Level::Warning`] or more severe.
    Warning,
    /// Records at [`Level::Error`].
    Error,
    /// No record passes.
    Off,
}

impl LevelFilter {
    /// Whether a record at `level` passes this filter.
    pub fn allows(&self, level: Level) -> bool {
        match self {
            LevelFilter::All => true,
            LevelFilter::Off => false,
            LevelFilter::Verbose => level >= Level::Verbose,
            LevelFilter::Debug => level >= Level::Debug,
            LevelFilter::Info => level >= Level::Info,
            LevelFilter::Warning => level >= Level::Warning,
            LevelFilter::Error => level >= Level::Error,
        }
    }
}

impl From<Level> for LevelFilter {
    fn from(level: Level) -> Self {
        match level {
            Level::Verbose => LevelFilter::Verbose,
            Level::Debug => LevelFilter::Debug,
            Level::Info => LevelFilter::Info,
            Level::Warning => LevelFilter::Warning,
            Level::Error => LevelFilter::Error,
        }
    }
}

/// A single log record, immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    origin: String,
    tag: String,
    level: Level,
    message: String,
    timestamp_millis: i64,
    is_primary_thread: bool,
    thread_id: u64,
    mode: Option<String>,
}

impl LogRecord {
    /// Returns a new builder, stamped with the current time and thread.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// The stable identifier of the component that emitted this record.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The tag printed in the output.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The severity of this record.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The message body.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Wall-clock capture time in milliseconds since the Unix epoch.
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    /// Whether the record was emitted on the process main thread.
    pub fn is_primary_thread(&self) -> bool {
        self.is_primary_thread
    }

    /// The id of the emitting thread, see [`current_thread_id`].
    pub fn thread_id(&self) -> u64 {
        self.thread_id
    }

    /// The optional mode label attached by the caller.
    pub fn mode(&self) -> Option<&str> {
        self.mode.as_deref()
    }
}

/// Builder for [`LogRecord`].
#[derive(Debug)]
pub struct RecordBuilder {
    record: LogRecord,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        RecordBuilder {
            record: LogRecord {
                origin: String::new(),
                tag: String::new(),
                level: Level::Info,
                message: String::new(),
                timestamp_millis: Timestamp::now().as_millisecond(),
                is_primary_thread: is_primary_thread(),
                thread_id: current_thread_id(),
                mode: None,
            },
        }
    }
}

impl RecordBuilder {
    /// Set [`origin`](LogRecord::origin). The tag defaults to the origin unless set.
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.record.origin = origin.into();
        self
    }

    /// Set [`tag`](LogRecord::tag).
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.record.tag = tag.into();
        self
    }

    /// Set [`level`](LogRecord::level).
    pub fn level(mut self, level: Level) -> Self {
        self.record.level = level;
        self
    }

    /// Set [`message`](LogRecord::message).
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.record.message = message.into();
        self
    }

    /// Set [`timestamp_millis`](LogRecord::timestamp_millis).
    pub fn timestamp_millis(mut self, millis: i64) -> Self {
        self.record.timestamp_millis = millis;
        self
    }

    /// Set [`is_primary_thread`](LogRecord::is_primary_thread).
    pub fn primary_thread(mut self, primary: bool) -> Self {
        self.record.is_primary_thread = primary;
        self
    }

    /// Set [`thread_id`](LogRecord::thread_id).
    pub fn thread_id(mut self, id: u64) -> Self {
        self.record.thread_id = id;
        self
    }

    /// Set [`mode`](LogRecord::mode).
    pub fn mode(mut self, mode: Option<String>) -> Self {
        self.record.mode = mode;
        self
    }

    /// Build the record.
    pub fn build(self) -> LogRecord {
        let mut record = self.record;
        if record.tag.is_empty() {
            record.tag = record.origin.clone();
        }
        record
    }
}

/// Whether the current thread is the process main thread.
pub fn is_primary_thread() -> bool {
    std::thread::current().name() == Some("main")
}

/// A small process-unique number for the current thread, assigned on first use.
///
/// [`std::thread::ThreadId`] has no stable numeric form; this one is stable for the lifetime of
/// the thread and is what the text layout prints.
pub fn current_thread_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);

    thread_local! {
        static THREAD_ID: Cell<u64> = const { Cell::new(0) };
    }

    THREAD_ID.with(|id| {
        if id.get() == 0 {
            id.set(NEXT_ID.fetch_add(1, Ordering::Relaxed));
        }
        id.get()
    })
}
