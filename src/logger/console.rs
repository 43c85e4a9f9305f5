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

//! Console echo, written to standard error if possible.

use std::io;
use std::io::Write;

use crate::record::Level;
use crate::record::LogRecord;

const DEBUG_TAG: &str = "DebugLogger";

pub(crate) fn echo(record: &LogRecord) {
    write_line(record.level(), record.tag(), record.message());
}

pub(crate) fn debug(message: &str) {
    write_line(Level::Debug, DEBUG_TAG, message);
}

fn write_line(level: Level, tag: &str, message: &str) {
    let line = format_line(level, tag, message);
    let _ = io::stderr().lock().write_all(line.as_bytes());
}

fn format_line(level: Level, tag: &str, message: &str) -> String {
    format!("{}/{tag}: {message}\n", level.letter())
}
