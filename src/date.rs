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

//! Day buckets for log files.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use jiff::Zoned;
use jiff::civil::Date;
use jiff::tz::TimeZone;

use crate::Error;
use crate::ErrorKind;

/// A calendar day in the local time zone, rendered as `YYYYMMDD`.
///
/// Ordering follows the calendar, which is also the lexicographic order of the rendered keys.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DateKey {
    date: Date,
}

impl DateKey {
    /// The day `millis` (since the Unix epoch) falls on in the local time zone.
    pub fn from_timestamp_millis(millis: i64) -> Result<DateKey, Error> {
        let timestamp = Timestamp::from_millisecond(millis).map_err(|err| {
            Error::new(ErrorKind::Unexpected, "timestamp out of range")
                .with_context("millis", millis)
                .with_source(err)
        })?;
        let zoned = timestamp.to_zoned(TimeZone::system());
        Ok(DateKey { date: zoned.date() })
    }

    /// The day given by an explicit year, month (1-12) and day of month.
    pub fn from_ymd(year: i32, month: i32, day: i32) -> Result<DateKey, Error> {
        let invalid = || {
            Error::new(ErrorKind::Unexpected, "invalid date")
                .with_context("year", year)
                .with_context("month", month)
                .with_context("day", day)
        };

        let year = i16::try_from(year).map_err(|_| invalid())?;
        let month = i8::try_from(month).map_err(|_| invalid())?;
        let day = i8::try_from(day).map_err(|_| invalid())?;
        let date = Date::new(year, month, day).map_err(|err| invalid().with_source(err))?;
        Ok(DateKey { date })
    }

    /// Today in the local time zone.
    pub fn today() -> DateKey {
        DateKey {
            date: Zoned::now().date(),
        }
    }

    /// Parse the date part of a file or directory name: the eight digits before the first `.`.
    ///
    /// Returns `None` for anything else, such as a process directory or a foreign file.
    pub fn from_filename(name: &str) -> Option<DateKey> {
        let stem = name.split('.').next()?;
        if stem.len() != 8 || !stem.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let year = stem[0..4].parse::<i16>().ok()?;
        let month = stem[4..6].parse::<i8>().ok()?;
        let day = stem[6..8].parse::<i8>().ok()?;
        let date = Date::new(year, month, day).ok()?;
        Some(DateKey { date })
    }

    /// The key `days` calendar days away from this one.
    pub fn add_days(&self, days: i32) -> Result<DateKey, Error> {
        let date = self
            .date
            .checked_add(jiff::Span::new().days(days))
            .map_err(|err| {
                Error::new(ErrorKind::Unexpected, "date out of range")
                    .with_context("date", self)
                    .with_context("days", days)
                    .with_source(err)
            })?;
        Ok(DateKey { date })
    }

    /// The calendar date of this key.
    pub fn civil(&self) -> Date {
        self.date
    }

    /// The number of calendar days from `other` to `self`, positive when `self` is later.
    pub fn days_since(&self, other: &DateKey) -> Option<i32> {
        self.date
            .since(other.date)
            .ok()
            .map(|span| span.get_days())
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}{:02}{:02}",
            self.date.year(),
            self.date.month(),
            self.date.day()
        )
    }
}

impl fmt::Debug for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DateKey({self})")
    }
}

impl FromStr for DateKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateKey::from_filename(s)
            .filter(|_| !s.contains('.'))
            .ok_or_else(|| Error::new(ErrorKind::Unexpected, "malformed date key").with_context("input", s))
    }
}

/// Days between two date-named entries, `a - b`.
///
/// Both names are cut at their first `.` before parsing, so `20240810.zip` and `20240810` name
/// the same day. Returns `None` if either does not name a day; callers deciding whether to
/// delete something must keep it in that case.
pub fn diff_days(a: &str, b: &str) -> Option<i32> {
    let a = DateKey::from_filename(a)?;
    let b = DateKey::from_filename(b)?;
    a.days_since(&b)
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn test_render_and_parse() {
        let key = DateKey::from_ymd(2023, 11, 5).unwrap();
        assert_eq!(key.to_string(), "20231105");
        assert_eq!("20231105".parse::<DateKey>().unwrap(), key);
        assert_eq!(DateKey::from_filename("20231105.log.1"), Some(key));

        assert!("2023115".parse::<DateKey>().is_err());
        assert!("20231105.log".parse::<DateKey>().is_err());
        assert!(DateKey::from_ymd(2023, 2, 30).is_err());
        assert_eq!(DateKey::from_filename("my-process"), None);
        assert_eq!(DateKey::from_filename("20231340"), None);
    }

    #[test]
    fn test_from_timestamp_uses_local_day() {
        let zoned = date(2024, 8, 10)
            .at(23, 59, 59, 0)
            .to_zoned(TimeZone::system())
            .unwrap();
        let millis = zoned.timestamp().as_millisecond();
        assert_eq!(
            DateKey::from_timestamp_millis(millis).unwrap().to_string(),
            "20240810"
        );
        assert_eq!(
            DateKey::from_timestamp_millis(millis + 2_000)
                .unwrap()
                .to_string(),
            "20240811"
        );
    }

    #[test]
    fn test_ordering_follows_calendar() {
        let a = DateKey::from_ymd(2023, 12, 31).unwrap();
        let b = DateKey::from_ymd(2024, 1, 1).unwrap();
        assert!(a < b);
        assert!(a.to_string() < b.to_string());
    }

    #[test]
    fn test_diff_days() {
        assert_eq!(diff_days("20231125", "20231125"), Some(0));
        assert_eq!(diff_days("20231130", "20231125"), Some(5));
        assert_eq!(diff_days("20231125", "20231130"), Some(-5));
        assert_eq!(diff_days("20231201", "20231130.zip"), Some(1));
        assert_eq!(diff_days("20240301", "20240228"), Some(2));
        assert_eq!(diff_days("20231125", "process"), None);
        assert_eq!(diff_days("garbage", "20231125"), None);
    }

    #[test]
    fn test_add_days() {
        let key = DateKey::from_ymd(2024, 3, 1).unwrap();
        assert_eq!(key.add_days(-1).unwrap().to_string(), "20240229");
        assert_eq!(key.add_days(-1).unwrap().days_since(&key), Some(-1));
    }
}
