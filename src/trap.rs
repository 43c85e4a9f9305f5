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

//! Traps for failures that must not interrupt logging.
//!
//! Closing a store, renaming a rotated file, or a failed write inside the dispatch lane have
//! nobody to return an error to. They are handed to a [`Trap`] instead.

use std::fmt;
use std::io;
use std::io::Write;

use crate::Error;

/// A trap that receives errors which are swallowed after being reported.
pub trait Trap: fmt::Debug + Send + Sync + 'static {
    /// Report an error.
    fn trap(&self, err: &Error);
}

/// A default trap that sends errors to standard error if possible.
///
/// If standard error is not available, it does nothing.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct DefaultTrap {}

impl Trap for DefaultTrap {
    fn trap(&self, err: &Error) {
        let _ = writeln!(io::stderr(), "daylog: {err}");
    }
}

/// A trap that discards every error.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct NoopTrap {}

impl Trap for NoopTrap {
    fn trap(&self, _: &Error) {}
}
