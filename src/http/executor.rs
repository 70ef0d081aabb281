//! Task scheduling for asynchronous requests.
//!
//! An [`Executor`] decides where a submitted unit of work runs. The default
//! [`InlineExecutor`] runs it on the submitting thread before returning;
//! [`ThreadExecutor`] hands it to a dedicated worker thread.

use core::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle, ThreadId};

/// A unit of work submitted to an [`Executor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs submitted tasks.
pub trait Executor: Send + Sync + fmt::Debug {
    fn execute(&self, task: Task);
}

/// Runs every task immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, task: Task) {
        task();
    }
}

/// Runs tasks one at a time on a single named worker thread.
///
/// Dropping the executor stops accepting work, lets the worker drain what is
/// already queued, then joins it.
pub struct ThreadExecutor {
    sender: Option<Sender<Task>>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
}

impl ThreadExecutor {
    pub fn new() -> io::Result<Self> {
        Self::named("jsonstep-async")
    }

    pub fn named(name: &str) -> io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Task>();

        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(task) = receiver.recv() {
                    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                        log::warn!("Task panicked on async worker");
                    }
                }
                log::trace!("Async worker exiting");
            })?;

        Ok(Self {
            sender: Some(sender),
            worker_id: worker.thread().id(),
            worker: Some(worker),
        })
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, task: Task) {
        let Some(sender) = self.sender.as_ref() else {
            return task();
        };
        if let Err(mpsc::SendError(task)) = sender.send(task) {
            log::error!("Async worker is gone, running task inline");
            task();
        }
    }
}

impl fmt::Debug for ThreadExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadExecutor")
            .field("worker", &self.worker_id)
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl Drop for ThreadExecutor {
    fn drop(&mut self) {
        self.sender.take();
        let Some(worker) = self.worker.take() else {
            return;
        };
        // The last reference may be released by a task running on the worker.
        if thread::current().id() == self.worker_id {
            return;
        }
        if worker.join().is_err() {
            log::warn!("Async worker terminated abnormally");
        }
    }
}
