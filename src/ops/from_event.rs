//! Adapters that turn external notification sources into observables.
//!
//! - [`from_handler`]: a callback registry described by an explicit
//!   add/remove pair.
//! - [`from_broadcast`]: a tokio broadcast channel.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use super::impl_operator;
use crate::{
  error::RxError,
  observable::Observable,
  observer::{ArcObserver, Observer},
  scheduler::Scheduler,
  subject::Subject,
  subscription::Subscription,
  token::Token,
};

/// Callback handed to an external source by [`from_handler`].
pub type Handler<T> = Arc<dyn Fn(T) + Send + Sync>;

// ============================================================================
// from_handler
// ============================================================================

/// Adapt a callback-based source.
///
/// Each subscription calls `add` with a fresh [`Handler`] that forwards into
/// the observer; `add` returns whatever key the source needs to forget the
/// handler again, and unsubscribing passes that key to `remove`.
///
/// ```rust
/// use std::sync::{Arc, Mutex};
///
/// use rxhub::prelude::*;
///
/// let listeners: Arc<Mutex<Vec<(usize, Handler<i32>)>>> = Arc::default();
/// let c_listeners = listeners.clone();
/// let r_listeners = listeners.clone();
/// let clicks = from_handler(
///   move |h: Handler<i32>| {
///     let mut l = c_listeners.lock().unwrap();
///     let key = l.len();
///     l.push((key, h));
///     key
///   },
///   move |key: usize| r_listeners.lock().unwrap().retain(|(k, _)| *k != key),
/// );
///
/// let sub = clicks.subscribe_fn(|v| assert_eq!(v, 1));
/// for (_, h) in listeners.lock().unwrap().iter() {
///   h(1);
/// }
/// sub.unsubscribe();
/// assert!(listeners.lock().unwrap().is_empty());
/// ```
pub fn from_handler<T, K, Add, Remove>(add: Add, remove: Remove) -> FromHandler<Add, Remove>
where
  Add: Fn(Handler<T>) -> K + Send + Sync + 'static,
  Remove: Fn(K) + Send + Sync + 'static,
  K: Send + 'static,
{
  FromHandler { add, remove: Arc::new(remove) }
}

pub struct FromHandler<Add, Remove> {
  add: Add,
  remove: Arc<Remove>,
}

impl<T, K, Add, Remove> Observable<T> for FromHandler<Add, Remove>
where
  T: 'static,
  Add: Fn(Handler<T>) -> K + Send + Sync + 'static,
  Remove: Fn(K) + Send + Sync + 'static,
  K: Send + 'static,
{
  fn subscribe(&self, observer: ArcObserver<T>) -> Subscription {
    let key = (self.add)(Arc::new(move |value| observer.on_next(value)));
    let remove = self.remove.clone();
    Subscription::new(move || remove(key))
  }
}

// ============================================================================
// from_broadcast
// ============================================================================

/// Hot observable fed by a tokio broadcast receiver.
///
/// A forwarding task runs on the ambient runtime until the channel closes
/// (which completes the observable) or the adapter is disposed. Lagged
/// receives are logged and skipped.
pub fn from_broadcast<T>(receiver: broadcast::Receiver<T>) -> Result<FromBroadcast<T>, RxError>
where
  T: Clone + Send + Sync + 'static,
{
  let scheduler = Scheduler::current()?;
  let subject = Subject::new();
  let token = Token::new();

  let downstream = subject.clone();
  let task = scheduler.spawn(forward(receiver, downstream));
  token.register(move || task.abort());
  Ok(FromBroadcast { subject, token })
}

async fn forward<T: Clone>(mut receiver: broadcast::Receiver<T>, downstream: Subject<T>) {
  loop {
    match receiver.recv().await {
      Ok(value) => downstream.on_next(value),
      Err(RecvError::Lagged(skipped)) => warn!(skipped, "broadcast adapter lagged"),
      Err(RecvError::Closed) => {
        downstream.on_completed();
        return;
      }
    }
  }
}

pub struct FromBroadcast<T> {
  subject: Subject<T>,
  token: Token,
}

impl_operator!(FromBroadcast<T> => T);
