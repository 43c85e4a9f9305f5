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

use std::fmt::Write;

use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::Error;
use crate::ErrorKind;
use crate::Layout;
use crate::record::Level;
use crate::record::LogRecord;

/// A layout that formats a record as one line of text.
///
/// Output format:
///
/// ```text
/// 18:18:18.888[network] connected
/// 18:18:18.889[network,W,3] retrying
/// ```
///
/// The time of day comes first, then the tag. The level letter is only printed for levels other
/// than [`Level::Info`], and the thread id only for records not emitted on the main thread.
#[derive(Debug, Clone, Default)]
pub struct TextLayout {
    tz: Option<TimeZone>,
}

impl TextLayout {
    /// Use the given time zone instead of the system one.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }
}

impl Layout for TextLayout {
    fn format(&mut self, record: &LogRecord) -> Result<Vec<u8>, Error> {
        let timestamp = Timestamp::from_millisecond(record.timestamp_millis()).map_err(|err| {
            Error::new(ErrorKind::Format, "timestamp out of range")
                .with_context("millis", record.timestamp_millis())
                .with_source(err)
        })?;
        let tz = self.tz.clone().unwrap_or_else(TimeZone::system);
        let time = timestamp.to_zoned(tz);

        let mut text = String::with_capacity(record.message().len() + 32);
        // SAFETY: write to a string always succeeds
        write!(
            &mut text,
            "{:02}:{:02}:{:02}.{:03}[{}",
            time.hour(),
            time.minute(),
            time.second(),
            time.millisecond(),
            record.tag()
        )
        .unwrap();

        if record.level() != Level::Info {
            text.push(',');
            text.push_str(record.level().letter());
        }
        if !record.is_primary_thread() {
            write!(&mut text, ",{}", record.thread_id()).unwrap();
        }

        text.push_str("] ");
        text.push_str(record.message());
        text.push('\n');
        Ok(text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    fn millis(hour: i8, minute: i8, second: i8, milli: i32) -> i64 {
        date(2023, 11, 25)
            .at(hour, minute, second, milli * 1_000_000)
            .to_zoned(TimeZone::UTC)
            .unwrap()
            .timestamp()
            .as_millisecond()
    }

    fn format(record: &LogRecord) -> String {
        let mut layout = TextLayout::default().timezone(TimeZone::UTC);
        String::from_utf8(layout.format(record).unwrap()).unwrap()
    }

    #[test]
    fn test_info_on_main_thread() {
        let record = LogRecord::builder()
            .origin("network")
            .message("connected")
            .timestamp_millis(millis(18, 18, 18, 888))
            .primary_thread(true)
            .build();
        insta::assert_snapshot!(format(&record).trim_end(), @"18:18:18.888[network] connected");
    }

    #[test]
    fn test_warning_off_main_thread() {
        let record = LogRecord::builder()
            .origin("network")
            .tag("net")
            .level(Level::Warning)
            .message("retrying")
            .timestamp_millis(millis(7, 5, 3, 9))
            .primary_thread(false)
            .thread_id(3)
            .build();
        insta::assert_snapshot!(format(&record).trim_end(), @"07:05:03.009[net,W,3] retrying");
    }

    #[test]
    fn test_line_terminated() {
        let record = LogRecord::builder()
            .origin("a")
            .message("b")
            .primary_thread(true)
            .build();
        assert!(format(&record).ends_with("] b\n"));
    }
}
