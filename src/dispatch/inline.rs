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

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use crate::Error;
use crate::dispatch::Dispatcher;
use crate::dispatch::Task;

/// A dispatcher that runs tasks on the submitting thread.
///
/// The first thread to submit into an empty lane drains it: tasks submitted meanwhile, from other
/// threads or from inside a running task, are queued and run by that thread before it returns.
/// Writes happen synchronously when there is no contention, which suits tests and tools that
/// exit right after logging.
#[derive(Default)]
pub struct InlineDispatcher {
    lane: Mutex<Lane>,
}

#[derive(Default)]
struct Lane {
    queue: VecDeque<Task>,
    draining: bool,
}

impl fmt::Debug for InlineDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lane = self.lane.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("InlineDispatcher")
            .field("queued", &lane.queue.len())
            .field("draining", &lane.draining)
            .finish()
    }
}

impl InlineDispatcher {
    fn next(&self) -> Option<Task> {
        let mut lane = self.lane.lock().unwrap_or_else(|e| e.into_inner());
        let task = lane.queue.pop_front();
        if task.is_none() {
            lane.draining = false;
        }
        task
    }
}

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, task: Task) -> Result<(), Error> {
        {
            let mut lane = self.lane.lock().unwrap_or_else(|e| e.into_inner());
            lane.queue.push_back(task);
            if lane.draining {
                return Ok(());
            }
            lane.draining = true;
        }

        let _unwinding = Unwinding(self);
        while let Some(task) = self.next() {
            task();
        }
        Ok(())
    }
}

/// Hands the lane over when a task unwinds through the draining thread.
struct Unwinding<'a>(&'a InlineDispatcher);

impl Drop for Unwinding<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut lane = self.0.lane.lock().unwrap_or_else(|e| e.into_inner());
            lane.draining = false;
        }
    }
}
