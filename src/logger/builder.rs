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

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::DefaultTrap;
use crate::Error;
use crate::ErrorKind;
use crate::Layout;
use crate::Logger;
use crate::Trap;
use crate::dispatch::Dispatcher;
use crate::dispatch::ThreadDispatcher;
use crate::layout::TextLayout;
use crate::logger::OriginConfig;
use crate::logger::config::State;
use crate::publish::DirectoryPublisher;
use crate::publish::SafePublisher;
use crate::record::LevelFilter;
use crate::store::FileStoreFactory;
use crate::store::StoreFactory;

const DEFAULT_MAX_MB_PER_DAY: i64 = 100;

/// A builder to configure and create a [`Logger`].
///
/// # Examples
///
/// ```
/// use daylog::LevelFilter;
/// use daylog::Logger;
/// use daylog::layout::TextLayout;
///
/// let dir = tempfile::tempdir().unwrap();
/// let logger = Logger::builder(dir.path())
///     .process_name("worker")
///     .level(LevelFilter::Verbose)
///     .max_mb_per_day(10)
///     .layout(TextLayout::default())
///     .build()
///     .unwrap();
/// assert_eq!(logger.directory(), dir.path().join("worker"));
/// ```
#[must_use = "call `build` to construct the logger"]
pub struct LoggerBuilder {
    directory: PathBuf,
    process_name: Option<String>,
    extension: String,
    level: LevelFilter,
    max_mb_per_day: i64,
    console: bool,
    origins: HashMap<String, OriginConfig>,
    layout: Box<dyn Layout>,
    store_factory: Box<dyn StoreFactory>,
    dispatcher: Option<Box<dyn Dispatcher>>,
    trap: Arc<dyn Trap>,
}

impl std::fmt::Debug for LoggerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerBuilder")
            .field("directory", &self.directory)
            .field("process_name", &self.process_name)
            .field("extension", &self.extension)
            .field("level", &self.level)
            .field("max_mb_per_day", &self.max_mb_per_day)
            .field("console", &self.console)
            .field("origins", &self.origins)
            .field("layout", &self.layout)
            .field("dispatcher", &self.dispatcher)
            .field("trap", &self.trap)
            .finish_non_exhaustive()
    }
}

impl LoggerBuilder {
    /// Create a builder writing under `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            process_name: None,
            extension: "log".to_string(),
            level: LevelFilter::default(),
            max_mb_per_day: DEFAULT_MAX_MB_PER_DAY,
            console: false,
            origins: HashMap::new(),
            layout: Box::new(TextLayout::default()),
            store_factory: Box::new(FileStoreFactory::default()),
            dispatcher: None,
            trap: Arc::new(DefaultTrap::default()),
        }
    }

    /// Nest the log files in a subdirectory named after the process.
    ///
    /// Use it when several processes share one root directory. A blank name is ignored.
    pub fn process_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.process_name = (!name.trim().is_empty()).then_some(name);
        self
    }

    /// Set the extension of log files. Default to `log`.
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Set the initial level filter. Default to [`LevelFilter::Info`].
    pub fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Set the daily size limit in megabytes. Default to 100; `<= 0` means unlimited.
    pub fn max_mb_per_day(mut self, megabytes: i64) -> Self {
        self.max_mb_per_day = megabytes;
        self
    }

    /// Echo records to the console as well. Default to `false`.
    pub fn console(mut self, enable: bool) -> Self {
        self.console = enable;
        self
    }

    /// Set the initial overrides of `origin`.
    pub fn origin(mut self, origin: impl Into<String>, config: OriginConfig) -> Self {
        let origin = origin.into();
        if config.is_empty() {
            self.origins.remove(&origin);
        } else {
            self.origins.insert(origin, config);
        }
        self
    }

    /// Set the layout. Default to [`TextLayout`].
    pub fn layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Set the store factory. Default to [`FileStoreFactory`].
    ///
    /// # Examples
    ///
    /// ```
    /// # let dir = tempfile::tempdir().unwrap();
    /// use daylog::store::MmapStoreFactory;
    ///
    /// let logger = daylog::Logger::builder(dir.path())
    ///     .store_factory(MmapStoreFactory::default())
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn store_factory(mut self, factory: impl StoreFactory) -> Self {
        self.store_factory = Box::new(factory);
        self
    }

    /// Set the dispatcher. Default to a [`ThreadDispatcher`] named `daylog` reporting to the trap.
    pub fn dispatcher(mut self, dispatcher: impl Into<Box<dyn Dispatcher>>) -> Self {
        self.dispatcher = Some(dispatcher.into());
        self
    }

    /// Set the trap. Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Trap) -> Self {
        self.trap = Arc::new(trap);
        self
    }

    /// Build the [`Logger`].
    ///
    /// # Errors
    ///
    /// Return an error if the directory is empty, or if the extension is empty or contains a path
    /// separator.
    pub fn build(self) -> Result<Logger, Error> {
        let Self {
            directory,
            process_name,
            extension,
            level,
            max_mb_per_day,
            console,
            origins,
            layout,
            store_factory,
            dispatcher,
            trap,
        } = self;

        if directory.as_os_str().is_empty() {
            return Err(Error::new(ErrorKind::Unexpected, "log directory must not be empty"));
        }
        if extension.is_empty() || extension.contains(['/', '\\', '.']) {
            return Err(Error::new(ErrorKind::Unexpected, "invalid log file extension")
                .with_context("extension", extension));
        }

        let directory = match process_name {
            Some(name) => directory.join(name),
            None => directory,
        };

        let mut publisher = DirectoryPublisher::new(directory)
            .extension(extension)
            .layout(layout)
            .boxed_store_factory(store_factory)
            .shared_trap(trap.clone());
        let max_bytes = u64::try_from(max_mb_per_day)
            .unwrap_or(0)
            .saturating_mul(1024 * 1024);
        publisher.set_max_bytes_per_day(max_bytes);
        let publisher = SafePublisher::new(publisher, trap.clone());

        let dispatcher = match dispatcher {
            Some(dispatcher) => dispatcher,
            None => Box::new(ThreadDispatcher::with_shared_trap("daylog", trap.clone())),
        };

        let state = State {
            open: true,
            level,
            console,
            origins,
        };
        Ok(Logger::new(publisher, dispatcher, state, trap))
    }
}
