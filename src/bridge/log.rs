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

use crate::Logger;
use crate::record::Level;

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warning,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Verbose,
        }
    }
}

/// Records of the `log` crate are written with their target as the origin.
impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        Logger::is_loggable(self, metadata.target(), metadata.level().into())
    }

    fn log(&self, record: &log::Record) {
        let level = record.level().into();
        if !Logger::is_loggable(self, record.target(), level) {
            return;
        }

        match record.args().as_str() {
            Some(message) => Logger::log(self, record.target(), level, message),
            None => Logger::log(self, record.target(), level, &record.args().to_string()),
        }
    }

    fn flush(&self) {
        // nothing to report to; a closed lane has nothing left to flush
        let _ = Logger::flush(self);
    }
}

/// Install `logger` as the global logger of the `log` crate.
///
/// The logger lives for the rest of the process; the returned reference can still be used to
/// configure or [`close`](Logger::close) it. Records still queued when the process exits are lost
/// unless [`log::logger().flush()`](log::Log::flush) or [`Logger::close`] is called first.
///
/// This function will set the global maximum log level to `Trace`. To override this, call
/// [`log::set_max_level`] after this function.
///
/// # Errors
///
/// Return an error if the log crate global logger has already been set.
///
/// # Examples
///
/// ```
/// # let dir = tempfile::tempdir().unwrap();
/// let logger = daylog::Logger::builder(dir.path()).build().unwrap();
/// if daylog::bridge::try_setup_log_crate(logger).is_ok() {
///     log::info!("hello from the log crate");
///     log::logger().flush();
/// }
/// ```
pub fn try_setup_log_crate(logger: Logger) -> Result<&'static Logger, log::SetLoggerError> {
    let logger: &'static Logger = Box::leak(Box::new(logger));
    log::set_logger(logger)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(logger)
}

/// Install `logger` as the global logger of the `log` crate.
///
/// See [`try_setup_log_crate`].
///
/// # Panics
///
/// Panic if the log crate global logger has already been set.
pub fn setup_log_crate(logger: Logger) -> &'static Logger {
    try_setup_log_crate(logger).expect(
        "daylog::bridge::setup_log_crate must be called before the log crate global logger initialized",
    )
}
