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

use std::fmt;

use crate::Error;
use crate::Layout;
use crate::record::LogRecord;

type FormatFunction = dyn FnMut(&LogRecord) -> Result<Vec<u8>, Error> + Send + 'static;

type ResetFunction = dyn FnMut() + Send + 'static;

/// A layout built from closures.
///
/// # Examples
///
/// ```
/// use daylog::layout::CustomLayout;
///
/// let layout = CustomLayout::new(|record| {
///     Ok(format!("{} {}\n", record.tag(), record.message()).into_bytes())
/// });
/// ```
pub struct CustomLayout {
    format: Box<FormatFunction>,
    reset: Option<Box<ResetFunction>>,
}

impl fmt::Debug for CustomLayout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CustomLayout {{ ... }}")
    }
}

impl CustomLayout {
    /// Creates a layout that formats records with `format`.
    pub fn new(
        format: impl FnMut(&LogRecord) -> Result<Vec<u8>, Error> + Send + 'static,
    ) -> Self {
        CustomLayout {
            format: Box::new(format),
            reset: None,
        }
    }

    /// Run `reset` whenever the file being written is closed.
    pub fn on_reset(mut self, reset: impl FnMut() + Send + 'static) -> Self {
        self.reset = Some(Box::new(reset));
        self
    }
}

impl Layout for CustomLayout {
    fn format(&mut self, record: &LogRecord) -> Result<Vec<u8>, Error> {
        (self.format)(record)
    }

    fn reset(&mut self) {
        if let Some(reset) = self.reset.as_mut() {
            reset();
        }
    }
}
