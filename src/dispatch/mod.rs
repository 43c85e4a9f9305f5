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

//! Dispatchers run submitted tasks one at a time, in submission order.
//!
//! Every write to the log directory happens on the lane of a single dispatcher, so nothing that
//! touches the files needs a lock of its own.

use std::any::Any;
use std::fmt;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crate::Error;
use crate::ErrorKind;
use crate::Trap;

mod inline;
mod worker;

pub use self::inline::InlineDispatcher;
pub use self::worker::ThreadDispatcher;

/// A unit of work submitted to a [`Dispatcher`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A serialized execution lane.
///
/// Tasks submitted from any thread run in submission order, never two at once. A task may submit
/// further tasks; they run after everything already queued.
pub trait Dispatcher: fmt::Debug + Send + Sync + 'static {
    /// Queue `task` on the lane.
    ///
    /// Fails only when the lane can no longer run tasks.
    fn dispatch(&self, task: Task) -> Result<(), Error>;
}

impl<T: Dispatcher> From<T> for Box<dyn Dispatcher> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

type IdleCallback = dyn Fn() + Send + Sync + 'static;

/// A dispatcher that notices when its lane runs out of work.
///
/// Counts the tasks submitted but not yet finished. When the last outstanding task finishes, the
/// idle callback runs on the lane. A panicking task is caught and reported to the trap; it still
/// counts as finished and the lane keeps running.
pub struct IdleDispatcher {
    inner: Box<dyn Dispatcher>,
    pending: Arc<AtomicUsize>,
    on_idle: Arc<IdleCallback>,
    trap: Arc<dyn Trap>,
}

impl fmt::Debug for IdleDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdleDispatcher")
            .field("inner", &self.inner)
            .field("pending", &self.pending.load(Ordering::Relaxed))
            .field("trap", &self.trap)
            .finish_non_exhaustive()
    }
}

impl IdleDispatcher {
    /// Wrap `inner`, calling `on_idle` whenever its lane drains.
    pub fn new(
        inner: impl Into<Box<dyn Dispatcher>>,
        on_idle: impl Fn() + Send + Sync + 'static,
        trap: Arc<dyn Trap>,
    ) -> Self {
        Self {
            inner: inner.into(),
            pending: Arc::new(AtomicUsize::new(0)),
            on_idle: Arc::new(on_idle),
            trap,
        }
    }

    /// The number of submitted tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

impl Dispatcher for IdleDispatcher {
    fn dispatch(&self, task: Task) -> Result<(), Error> {
        self.pending.fetch_add(1, Ordering::AcqRel);

        let pending = self.pending.clone();
        let on_idle = self.on_idle.clone();
        let trap = self.trap.clone();
        let task: Task = Box::new(move || {
            run_caught(task, &*trap);

            let previous = pending.fetch_sub(1, Ordering::AcqRel);
            assert!(previous > 0, "dispatched task finished more than once");
            if previous == 1 {
                run_caught(Box::new(move || on_idle()), &*trap);
            }
        });

        self.inner.dispatch(task).inspect_err(|_| {
            self.pending.fetch_sub(1, Ordering::AcqRel);
        })
    }
}

pub(crate) fn run_caught(task: Task, trap: &dyn Trap) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        let err = Error::new(ErrorKind::Panicked, "dispatched task panicked")
            .with_context("panic", panic_message(&*payload));
        trap.trap(&err);
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "Box<dyn Any>"
    }
}
