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
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use arc_swap::ArcSwap;

use crate::Error;
use crate::ErrorKind;
use crate::Trap;
use crate::dispatch::Dispatcher;
use crate::dispatch::IdleDispatcher;
use crate::logger::DirectoryScope;
use crate::logger::LoggerBuilder;
use crate::logger::OriginConfig;
use crate::logger::config::State;
use crate::logger::console;
use crate::publish::SafePublisher;
use crate::record::Level;
use crate::record::LevelFilter;
use crate::record::LogRecord;

/// A logger writing records into per-day files under one directory.
///
/// Log calls filter and build the record on the calling thread, then hand it to the dispatch
/// lane, which owns the files. A log call never blocks on I/O (with the default dispatcher) and
/// never fails; write errors go to the trap.
///
/// Dropping the logger closes it.
///
/// # Examples
///
/// ```
/// use daylog::Level;
/// use daylog::LevelFilter;
/// use daylog::Logger;
///
/// let dir = tempfile::tempdir().unwrap();
/// let logger = Logger::builder(dir.path())
///     .level(LevelFilter::Debug)
///     .build()
///     .unwrap();
///
/// logger.info("network", "connected");
/// logger.log("network", Level::Debug, "handshake done");
/// logger.flush().unwrap();
/// ```
#[derive(Debug)]
pub struct Logger {
    shared: Arc<Shared>,
    dispatcher: IdleDispatcher,
}

#[derive(Debug)]
struct Shared {
    directory: PathBuf,
    state: ArcSwap<State>,
    // serializes read-modify-write of `state`; readers never take it
    update: Mutex<()>,
    publisher: Mutex<SafePublisher>,
    trap: Arc<dyn Trap>,
}

impl Shared {
    // only the dispatch lane locks the publisher
    fn publisher(&self) -> MutexGuard<'_, SafePublisher> {
        self.publisher.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn on_idle(&self) {
        let level = self.state.load().level;
        let mut publisher = self.publisher();
        if level == LevelFilter::Off {
            publisher.close();
        } else {
            publisher.on_idle();
        }
    }
}

impl Logger {
    /// Create a [`LoggerBuilder`] writing under `directory`.
    pub fn builder(directory: impl Into<PathBuf>) -> LoggerBuilder {
        LoggerBuilder::new(directory)
    }

    pub(super) fn new(
        publisher: SafePublisher,
        dispatcher: Box<dyn Dispatcher>,
        state: State,
        trap: Arc<dyn Trap>,
    ) -> Self {
        let shared = Arc::new(Shared {
            directory: publisher.get_ref().directory().to_path_buf(),
            state: ArcSwap::from_pointee(state),
            update: Mutex::new(()),
            publisher: Mutex::new(publisher),
            trap: trap.clone(),
        });

        let idle = shared.clone();
        let dispatcher = IdleDispatcher::new(dispatcher, move || idle.on_idle(), trap);

        Self { shared, dispatcher }
    }

    fn update(&self, f: impl FnOnce(&mut State)) {
        let _guard = self.shared.update.lock().unwrap_or_else(|e| e.into_inner());
        let mut state = State::clone(&self.shared.state.load());
        f(&mut state);
        self.shared.state.store(Arc::new(state));
    }

    fn update_open(&self, f: impl FnOnce(&mut State)) {
        self.update(|state| {
            if state.open {
                f(state);
            }
        });
    }

    fn submit(&self, task: impl FnOnce(&Shared) + Send + 'static) -> Result<(), Error> {
        let shared = self.shared.clone();
        self.dispatcher.dispatch(Box::new(move || task(&shared)))
    }

    /// Run `task` on the lane and wait for its result.
    fn round_trip<T: Send + 'static>(
        &self,
        task: impl FnOnce(&Shared) -> T + Send + 'static,
    ) -> Result<T, Error> {
        let (sender, receiver) = oneshot::channel();
        self.submit(move |shared| {
            let _ = sender.send(task(shared));
        })?;
        receiver
            .recv()
            .map_err(|err| Error::new(ErrorKind::Panicked, "task did not complete").with_source(err))
    }

    /// The root log directory, including the process directory if one was configured.
    pub fn directory(&self) -> &Path {
        &self.shared.directory
    }

    /// Whether the logger has not been closed.
    pub fn is_open(&self) -> bool {
        self.shared.state.load().open
    }

    /// Whether a record of `origin` at `level` would be written.
    pub fn is_loggable(&self, origin: &str, level: Level) -> bool {
        self.shared.state.load().is_loggable(origin, level)
    }

    /// Log `message` for `origin` at `level`. Empty messages are dropped.
    pub fn log(&self, origin: &str, level: Level, message: &str) {
        self.log_record(origin, level, message, None);
    }

    /// Log `message` with a `mode` label the layout may print.
    pub fn log_with_mode(&self, origin: &str, level: Level, message: &str, mode: &str) {
        self.log_record(origin, level, message, Some(mode));
    }

    fn log_record(&self, origin: &str, level: Level, message: &str, mode: Option<&str>) {
        let state = self.shared.state.load();
        if message.is_empty() || !state.is_loggable(origin, level) {
            return;
        }

        let record = LogRecord::builder()
            .origin(origin)
            .tag(state.tag_of(origin))
            .level(level)
            .message(message)
            .mode(mode.map(str::to_owned))
            .build();

        if state.console {
            console::echo(&record);
        }

        if let Err(err) = self.submit(move |shared| shared.publisher().publish(&record)) {
            let err = Error::new(err.kind(), "failed to dispatch record").with_source(err);
            self.shared.trap.trap(&err);
        }
    }

    /// Log at [`Level::Verbose`].
    pub fn verbose(&self, origin: &str, message: &str) {
        self.log(origin, Level::Verbose, message);
    }

    /// Log at [`Level::Debug`].
    pub fn debug(&self, origin: &str, message: &str) {
        self.log(origin, Level::Debug, message);
    }

    /// Log at [`Level::Info`].
    pub fn info(&self, origin: &str, message: &str) {
        self.log(origin, Level::Info, message);
    }

    /// Log at [`Level::Warning`].
    pub fn warning(&self, origin: &str, message: &str) {
        self.log(origin, Level::Warning, message);
    }

    /// Log at [`Level::Error`].
    pub fn error(&self, origin: &str, message: &str) {
        self.log(origin, Level::Error, message);
    }

    /// Print `message` to the console only, if debug records are enabled. Never written to files,
    /// and not affected by [`set_console`](Logger::set_console).
    pub fn console_debug(&self, message: &str) {
        let state = self.shared.state.load();
        if !message.is_empty() && state.open && state.level.allows(Level::Debug) {
            console::debug(message);
        }
    }

    /// Set the level filter of origins without an override.
    ///
    /// [`LevelFilter::Off`] also releases the open file, as no record reaches the lane anymore.
    pub fn set_level(&self, level: LevelFilter) {
        self.update_open(|state| state.level = level);
        if level != LevelFilter::Off || !self.is_open() {
            return;
        }

        if let Err(err) = self.submit(|shared| shared.publisher().close()) {
            let err = Error::new(err.kind(), "failed to close publisher").with_source(err);
            self.shared.trap.trap(&err);
        }
    }

    /// The level filter of origins without an override.
    pub fn level(&self) -> LevelFilter {
        self.shared.state.load().level
    }

    /// Echo written records to the console as well.
    pub fn set_console(&self, enable: bool) {
        self.update_open(|state| state.console = enable);
    }

    /// Change the overrides of `origin`. A config left empty is removed.
    ///
    /// # Examples
    ///
    /// ```
    /// # use daylog::LevelFilter;
    /// # let dir = tempfile::tempdir().unwrap();
    /// # let logger = daylog::Logger::builder(dir.path()).build().unwrap();
    /// logger.config_origin("network", |config| {
    ///     config.set_level(Some(LevelFilter::Verbose));
    ///     config.set_tag(Some("net".to_string()));
    /// });
    /// ```
    pub fn config_origin(&self, origin: &str, f: impl FnOnce(&mut OriginConfig)) {
        self.update_open(|state| state.config_origin(origin, f));
    }

    /// The overrides of `origin`, if any.
    pub fn origin_config(&self, origin: &str) -> Option<OriginConfig> {
        self.shared.state.load().origins.get(origin).cloned()
    }

    /// Limit the size of a day's logs. `<= 0` removes the limit.
    ///
    /// A day's file is moved aside to `<file>.1` once it holds half of the limit, replacing the
    /// previous one, so a day keeps at most about `megabytes` of logs.
    pub fn set_max_mb_per_day(&self, megabytes: i64) {
        if !self.is_open() {
            return;
        }

        let max_bytes = u64::try_from(megabytes)
            .unwrap_or(0)
            .saturating_mul(1024 * 1024);
        if let Err(err) = self.submit(move |shared| {
            shared.publisher().get_mut().set_max_bytes_per_day(max_bytes);
        }) {
            self.shared.trap.trap(&err);
        }
    }

    /// Delete logs older than the last `save_days` days, today included. `<= 0` deletes all
    /// logs.
    ///
    /// Blocks until the lane has run it. Must not be called from a task running on the lane.
    pub fn delete_log(&self, save_days: i32) -> Result<(), Error> {
        self.log_directory(move |scope| scope.delete_older_than(save_days))?
    }

    /// Run `f` with access to the log directory, after the open log file has been closed.
    ///
    /// `f` runs on the dispatch lane, so no record is written while it runs. Blocks until it
    /// returns. Must not be called from a task running on the lane.
    ///
    /// # Errors
    ///
    /// Returns an error if the logger is closed, or if `f` panics.
    ///
    /// # Examples
    ///
    /// ```
    /// # use daylog::date::DateKey;
    /// # let dir = tempfile::tempdir().unwrap();
    /// # let logger = daylog::Logger::builder(dir.path()).build().unwrap();
    /// logger.info("app", "started");
    /// let archive = logger
    ///     .log_directory(|scope| scope.zip_date(&DateKey::today()))
    ///     .unwrap()
    ///     .unwrap();
    /// assert!(archive.is_some());
    /// ```
    pub fn log_directory<T: Send + 'static>(
        &self,
        f: impl FnOnce(&mut DirectoryScope<'_>) -> T + Send + 'static,
    ) -> Result<T, Error> {
        if !self.is_open() {
            return Err(Error::closed());
        }

        self.round_trip(move |shared| {
            let mut publisher = shared.publisher();
            publisher.close();
            f(&mut DirectoryScope::new(publisher.get_mut()))
        })
    }

    /// Wait until every record logged so far has been handed to the store.
    ///
    /// Must not be called from a task running on the lane.
    pub fn flush(&self) -> Result<(), Error> {
        self.round_trip(|_| ())
    }

    /// Close the logger and release the log file. Later log calls are ignored.
    ///
    /// Calling it again does nothing.
    pub fn close(&self) {
        let mut was_open = false;
        self.update(|state| {
            was_open = state.open;
            *state = State::default();
            state.level = LevelFilter::Off;
        });
        if !was_open {
            return;
        }

        if let Err(err) = self.submit(|shared| shared.publisher().close()) {
            let err = Error::new(err.kind(), "failed to close publisher").with_source(err);
            self.shared.trap.trap(&err);
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use tempfile::TempDir;

    use super::*;
    use crate::date::DateKey;
    use crate::dispatch::InlineDispatcher;
    use crate::layout::CustomLayout;
    use crate::store::testing::CollectingTrap;

    fn logger(dir: &TempDir) -> (Logger, CollectingTrap) {
        let trap = CollectingTrap::default();
        let logger = Logger::builder(dir.path())
            .layout(CustomLayout::new(|record| {
                Ok(format!("{}|{}|{}\n", record.tag(), record.level(), record.message()).into_bytes())
            }))
            .dispatcher(InlineDispatcher::default())
            .trap(trap.clone())
            .build()
            .unwrap();
        (logger, trap)
    }

    fn today_log(logger: &Logger) -> String {
        let today = DateKey::today();
        let path = logger
            .directory()
            .join(today.to_string())
            .join(format!("{today}.log"));
        fs::read_to_string(path).unwrap_or_default()
    }

    #[test]
    fn test_filters_by_level_and_origin() {
        let dir = TempDir::new().unwrap();
        let (logger, trap) = logger(&dir);

        logger.debug("net", "hidden");
        logger.info("net", "shown");
        logger.info("net", "");
        logger.config_origin("net", |c| {
            c.set_level(Some(LevelFilter::Verbose));
            c.set_tag(Some("network".to_string()));
        });
        logger.verbose("net", "verbose now");
        logger.verbose("disk", "still hidden");

        assert_eq!(
            today_log(&logger),
            "net|INFO|shown\nnetwork|VERBOSE|verbose now\n"
        );
        assert!(trap.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (logger, _) = logger(&dir);

        logger.error("app", "before");
        logger.close();
        logger.close();
        assert!(!logger.is_open());
        assert_eq!(logger.level(), LevelFilter::Off);

        logger.error("app", "after");
        logger.set_level(LevelFilter::All);
        assert_eq!(logger.level(), LevelFilter::Off);
        assert_eq!(today_log(&logger), "app|ERROR|before\n");

        let err = logger.log_directory(|_| ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Closed);
        assert_eq!(logger.delete_log(0).unwrap_err().kind(), ErrorKind::Closed);
    }

    #[test]
    fn test_log_directory_closes_file_first() {
        let dir = TempDir::new().unwrap();
        let (logger, _) = logger(&dir);

        logger.info("app", "one");
        let files = logger
            .log_directory(|scope| {
                let today = DateKey::today().civil();
                scope.files_for_date(
                    i32::from(today.year()),
                    i32::from(today.month()),
                    i32::from(today.day()),
                )
            })
            .unwrap();
        assert_eq!(files.len(), 1);

        fs::remove_file(&files[0]).unwrap();
        logger.info("app", "two");
        assert_eq!(today_log(&logger), "app|INFO|two\n");
    }

    #[test]
    fn test_panicking_scope_is_an_error() {
        let dir = TempDir::new().unwrap();
        let (logger, trap) = logger(&dir);

        let err = logger
            .log_directory(|_| -> u8 { panic!("scope failed") })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Panicked);
        assert_eq!(trap.0.lock().unwrap().len(), 1);

        logger.info("app", "still logging");
        assert_eq!(today_log(&logger), "app|INFO|still logging\n");
    }

    #[test]
    fn test_level_off_releases_file() {
        let dir = TempDir::new().unwrap();
        let trap = CollectingTrap::default();
        let resets = Arc::new(AtomicUsize::new(0));
        let counter = resets.clone();
        let logger = Logger::builder(dir.path())
            .layout(
                CustomLayout::new(|record| Ok(format!("{}\n", record.message()).into_bytes()))
                    .on_reset(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }),
            )
            .dispatcher(InlineDispatcher::default())
            .trap(trap.clone())
            .build()
            .unwrap();

        logger.info("app", "one");
        assert_eq!(resets.load(Ordering::SeqCst), 0);

        logger.set_level(LevelFilter::Off);
        assert_eq!(resets.load(Ordering::SeqCst), 1);
        logger.info("app", "hidden");

        // the file was let go, so removing it loses nothing the logger still holds
        let today = DateKey::today();
        fs::remove_dir_all(dir.path().join(today.to_string())).unwrap();
        logger.set_level(LevelFilter::Info);
        logger.info("app", "two");
        assert_eq!(today_log(&logger), "two\n");
        assert!(trap.0.lock().unwrap().is_empty());
    }
}
