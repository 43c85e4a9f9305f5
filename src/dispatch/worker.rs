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

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;

use crate::DefaultTrap;
use crate::Error;
use crate::ErrorKind;
use crate::Trap;
use crate::dispatch::Dispatcher;
use crate::dispatch::Task;
use crate::dispatch::run_caught;

/// A dispatcher running tasks on one dedicated background thread.
///
/// Dropping it disconnects the queue, lets the thread finish every task already queued, and
/// joins it.
#[derive(Debug)]
pub struct ThreadDispatcher {
    state: Option<State>,
}

#[derive(Debug)]
struct State {
    sender: Sender<Task>,
    handle: JoinHandle<()>,
}

impl Default for ThreadDispatcher {
    fn default() -> Self {
        ThreadDispatcher::new("daylog")
    }
}

impl ThreadDispatcher {
    /// Spawn the lane thread, named `thread_name`. Panicking tasks are reported to [`DefaultTrap`].
    pub fn new(thread_name: impl Into<String>) -> Self {
        Self::with_shared_trap(thread_name, Arc::new(DefaultTrap::default()))
    }

    /// Spawn the lane thread, named `thread_name`, reporting panicking tasks to `trap`.
    pub fn with_trap(thread_name: impl Into<String>, trap: impl Trap) -> Self {
        Self::with_shared_trap(thread_name, Arc::new(trap))
    }

    pub(crate) fn with_shared_trap(thread_name: impl Into<String>, trap: Arc<dyn Trap>) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();

        let handle = std::thread::Builder::new()
            .name(thread_name.into())
            .spawn(move || run(receiver, trap))
            .expect("failed to spawn dispatcher thread");

        ThreadDispatcher {
            state: Some(State { sender, handle }),
        }
    }
}

fn run(receiver: Receiver<Task>, trap: Arc<dyn Trap>) {
    while let Ok(task) = receiver.recv() {
        // the lane outlives a panicking task
        run_caught(task, &*trap);
    }
}

impl Dispatcher for ThreadDispatcher {
    fn dispatch(&self, task: Task) -> Result<(), Error> {
        let Some(state) = self.state.as_ref() else {
            return Err(Error::new(ErrorKind::Closed, "dispatcher thread is gone"));
        };

        state
            .sender
            .send(task)
            .map_err(|_| Error::new(ErrorKind::Closed, "failed to send task to dispatcher thread"))
    }
}

impl Drop for ThreadDispatcher {
    fn drop(&mut self) {
        let Some(State { sender, handle }) = self.state.take() else {
            return;
        };

        // drop our sender, the thread breaks the loop after draining the queue
        drop(sender);

        if handle.thread().id() != std::thread::current().id() {
            let _ = handle.join();
        }
    }
}
