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

use std::fs;

use daylog::LevelFilter;
use daylog::Logger;
use daylog::OriginConfig;
use daylog::date::DateKey;
use daylog::dispatch::InlineDispatcher;
use daylog::layout::CustomLayout;
use tempfile::TempDir;

// The global logger can only be installed once per process, so everything runs in one test.
#[test]
fn test_log_crate_records_are_written() {
    let temp_dir = TempDir::new().expect("failed to create a temporary directory");
    let logger = Logger::builder(temp_dir.path())
        .dispatcher(InlineDispatcher::default())
        .level(LevelFilter::Info)
        .origin("net", OriginConfig::default().with_level(LevelFilter::Verbose))
        .layout(CustomLayout::new(|record| {
            Ok(format!("{}|{}|{}\n", record.tag(), record.level(), record.message()).into_bytes())
        }))
        .build()
        .unwrap();
    let logger = daylog::bridge::setup_log_crate(logger);
    assert!(daylog::bridge::try_setup_log_crate(
        Logger::builder(temp_dir.path()).build().unwrap()
    )
    .is_err());

    log::info!(target: "app", "plain");
    log::debug!(target: "app", "filtered");
    log::trace!(target: "net", "packet {}", 42);
    log::warn!(target: "app", "disk at {}%", 91);
    log::logger().flush();

    let today = DateKey::today();
    let path = temp_dir
        .path()
        .join(today.to_string())
        .join(format!("{today}.log"));
    insta::assert_snapshot!(fs::read_to_string(&path).unwrap().trim_end(), @r"
    app|INFO|plain
    net|VERBOSE|packet 42
    app|WARNING|disk at 91%
    ");

    logger.close();
    log::error!(target: "app", "after close");
    assert!(!fs::read_to_string(&path).unwrap().contains("after close"));
}
