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

//! Daylog is an embeddable logging facility that writes records into one file per day.
//!
//! # Overview
//!
//! A [`Logger`] filters records by level and origin, then hands them to a single dispatch lane
//! that owns the log directory. Files are laid out as `<root>/<YYYYMMDD>/<YYYYMMDD>.log`. When a
//! day's file reaches half of the daily size limit it is moved aside to `<YYYYMMDD>.log.1`.
//! Old days can be deleted with [`Logger::delete_log`], and a day can be exported as a zip
//! archive through [`Logger::log_directory`].
//!
//! # Examples
//!
//! ```
//! use daylog::Level;
//! use daylog::LevelFilter;
//! use daylog::Logger;
//! use daylog::OriginConfig;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let logger = Logger::builder(dir.path())
//!     .level(LevelFilter::Info)
//!     .max_mb_per_day(50)
//!     .origin("network", OriginConfig::default().with_level(LevelFilter::Debug))
//!     .build()
//!     .unwrap();
//!
//! logger.info("app", "started");
//! logger.debug("network", "socket opened");
//! logger.log("app", Level::Warning, "low disk space");
//!
//! // keep the last 7 days, today included
//! logger.delete_log(7).unwrap();
//! logger.close();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

#[cfg(feature = "bridge-log")]
pub mod bridge;
pub mod date;
pub mod dispatch;
pub mod layout;
pub mod publish;
pub mod record;
pub mod store;
pub mod trap;

pub use self::layout::Layout;
pub use self::record::Level;
pub use self::record::LevelFilter;
pub use self::record::LogRecord;
pub use self::trap::DefaultTrap;
pub use self::trap::Trap;

mod error;
pub use self::error::Error;
pub use self::error::ErrorKind;

mod logger;
pub use self::logger::*;
