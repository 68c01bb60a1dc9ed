//! Scheduling on the ambient tokio runtime.
//!
//! The crate owns no threads. Work that must not run on the caller's stack
//! (hub dispatch, throttle timers, async transforms) is handed to the tokio
//! runtime the caller is running on, captured through [`Scheduler::current`].

use std::{future::Future, time::Duration};

use tokio::{runtime::Handle, task::JoinHandle};

use crate::error::RxError;

/// Handle to the runtime work is scheduled on.
#[derive(Clone, Debug)]
pub struct Scheduler {
  handle: Handle,
}

impl Scheduler {
  /// The runtime of the calling context.
  pub fn current() -> Result<Self, RxError> {
    Handle::try_current()
      .map(|handle| Scheduler { handle })
      .map_err(|_| RxError::NoRuntime)
  }

  pub fn from_handle(handle: Handle) -> Self { Scheduler { handle } }

  /// Run `task`, optionally after `delay`.
  pub fn schedule<F>(&self, task: F, delay: Option<Duration>) -> TaskHandle
  where
    F: Future<Output = ()> + Send + 'static,
  {
    let join = match delay {
      Some(delay) => self.handle.spawn(async move {
        tokio::time::sleep(delay).await;
        task.await
      }),
      None => self.handle.spawn(task),
    };
    TaskHandle(join)
  }

  /// Spawn `future` and hand back its join handle.
  pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
  where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
  {
    self.handle.spawn(future)
  }
}

/// A scheduled task; unsubscribing aborts it if it has not finished yet.
#[derive(Debug)]
pub struct TaskHandle(JoinHandle<()>);

impl TaskHandle {
  pub fn unsubscribe(&self) { self.0.abort() }

  pub fn is_finished(&self) -> bool { self.0.is_finished() }
}
