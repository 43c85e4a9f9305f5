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

use crate::record::Level;
use crate::record::LevelFilter;

/// Overrides for the records of one origin.
///
/// # Examples
///
/// ```
/// use daylog::LevelFilter;
/// use daylog::OriginConfig;
///
/// let config = OriginConfig::default()
///     .with_level(LevelFilter::Debug)
///     .with_tag("net");
/// assert_eq!(config.tag(), Some("net"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OriginConfig {
    level: Option<LevelFilter>,
    tag: Option<String>,
}

impl OriginConfig {
    /// The level filter replacing the logger's for this origin.
    pub fn level(&self) -> Option<LevelFilter> {
        self.level
    }

    /// The tag printed instead of the origin id.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Set or clear the level override.
    pub fn set_level(&mut self, level: Option<LevelFilter>) {
        self.level = level;
    }

    /// Set or clear the tag override.
    pub fn set_tag(&mut self, tag: Option<String>) {
        self.tag = tag;
    }

    /// Set the level override.
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = Some(level);
        self
    }

    /// Set the tag override.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Whether neither override is set.
    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.tag.is_none()
    }
}

/// The live settings of a logger, replaced as a whole on every change.
#[derive(Clone, Debug, Default)]
pub(crate) struct State {
    pub(crate) open: bool,
    pub(crate) level: LevelFilter,
    pub(crate) console: bool,
    pub(crate) origins: HashMap<String, OriginConfig>,
}

impl State {
    pub(crate) fn is_loggable(&self, origin: &str, level: Level) -> bool {
        if !self.open {
            return false;
        }

        self.origins
            .get(origin)
            .and_then(OriginConfig::level)
            .unwrap_or(self.level)
            .allows(level)
    }

    pub(crate) fn tag_of<'a>(&'a self, origin: &'a str) -> &'a str {
        self.origins
            .get(origin)
            .and_then(OriginConfig::tag)
            .filter(|tag| !tag.is_empty())
            .unwrap_or(origin)
    }

    pub(crate) fn config_origin(&mut self, origin: &str, f: impl FnOnce(&mut OriginConfig)) {
        let config = self.origins.entry(origin.to_string()).or_default();
        f(config);
        if config.is_empty() {
            self.origins.remove(origin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_state(level: LevelFilter) -> State {
        State {
            open: true,
            level,
            ..State::default()
        }
    }

    #[test]
    fn test_origin_level_overrides_global() {
        let mut state = open_state(LevelFilter::Warning);
        assert!(!state.is_loggable("net", Level::Info));

        state.config_origin("net", |c| c.set_level(Some(LevelFilter::Verbose)));
        assert!(state.is_loggable("net", Level::Verbose));
        assert!(!state.is_loggable("disk", Level::Info));

        state.set_closed();
        assert!(!state.is_loggable("net", Level::Error));
    }

    #[test]
    fn test_tag_falls_back_to_origin() {
        let mut state = open_state(LevelFilter::Info);
        assert_eq!(state.tag_of("net"), "net");

        state.config_origin("net", |c| c.set_tag(Some(String::new())));
        assert_eq!(state.tag_of("net"), "net");

        state.config_origin("net", |c| c.set_tag(Some("network".to_string())));
        assert_eq!(state.tag_of("net"), "network");
    }

    #[test]
    fn test_empty_config_is_removed() {
        let mut state = open_state(LevelFilter::Info);
        state.config_origin("net", |c| c.set_level(Some(LevelFilter::Debug)));
        assert_eq!(state.origins.len(), 1);

        state.config_origin("net", |c| c.set_level(None));
        assert!(state.origins.is_empty());
    }

    impl State {
        fn set_closed(&mut self) {
            self.open = false;
        }
    }
}
