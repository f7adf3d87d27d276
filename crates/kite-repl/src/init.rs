//! Building something expensive on a background thread.
//!
//! The worker publishes its result under a mutex and notifies a condition
//! variable; [`BackgroundInit::wait`] sleeps on that variable until the
//! result is there and hands it to the calling thread, failure included.

use crate::error::{ReplError, ReplResult};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use tracing::{debug, info};

#[derive(Debug)]
enum Slot<T, E> {
    Running,
    Finished(Result<T, E>),
    Panicked(String),
    Taken,
}

#[derive(Debug)]
struct Shared<T, E> {
    slot: Mutex<Slot<T, E>>,
    ready: Condvar,
}

#[derive(Debug)]
pub struct BackgroundInit<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> BackgroundInit<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Run `task` on a new thread named `name`.
    pub fn spawn<F>(name: &str, task: F) -> ReplResult<Self>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::Running),
            ready: Condvar::new(),
        });
        let worker = Arc::clone(&shared);
        let thread_name = name.to_string();
        thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                debug!(thread = %thread_name, "initialization started");
                let outcome = match panic::catch_unwind(AssertUnwindSafe(task)) {
                    Ok(result) => Slot::Finished(result),
                    Err(payload) => Slot::Panicked(panic_message(payload.as_ref())),
                };
                let mut slot = worker.slot.lock().unwrap_or_else(PoisonError::into_inner);
                *slot = outcome;
                worker.ready.notify_all();
                info!(thread = %thread_name, "initialization finished");
            })
            .map_err(ReplError::Spawn)?;
        Ok(BackgroundInit { shared })
    }

    /// A handle whose result is already known.
    pub fn ready(result: Result<T, E>) -> Self {
        BackgroundInit {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::Finished(result)),
                ready: Condvar::new(),
            }),
        }
    }

    /// Whether the task has finished, without blocking.
    pub fn is_finished(&self) -> bool {
        let slot = self.shared.slot.lock().unwrap_or_else(PoisonError::into_inner);
        !matches!(*slot, Slot::Running)
    }

    /// Block until the task finishes and take its result.
    ///
    /// Returns `None` once the result has been taken.
    pub fn wait(&self) -> Option<ReplResult<Result<T, E>>> {
        let mut slot = self.shared.slot.lock().unwrap_or_else(PoisonError::into_inner);
        while matches!(*slot, Slot::Running) {
            slot = self.shared.ready.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Finished(result) => Some(Ok(result)),
            Slot::Panicked(message) => Some(Err(ReplError::InitPanicked(message))),
            Slot::Taken | Slot::Running => None,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "../tests/init_tests.rs"]
mod init_tests;
