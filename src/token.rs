//! Cancellation token
//!
//! A [`Token`] scopes the lifetime of registrations: hub subscriptions and
//! interceptors, operator upstream subscriptions, plain [`Subscription`]s.
//! Cancelling the token runs every registered teardown exactly once.
//!
//! [`Subscription`]: crate::subscription::Subscription

use std::{
  fmt::{Debug, Formatter},
  pin::pin,
  sync::Arc,
};

use parking_lot::Mutex;
use smallvec::SmallVec;
use tokio::sync::Notify;

type Teardown = Box<dyn FnOnce() + Send>;

/// Cancellation handle shared by cloning.
///
/// [`Token::never`] returns a token that can never be cancelled; registering
/// on it is a no-op and its teardowns are dropped unrun. `Token::default()`
/// is the same as [`Token::new`].
#[derive(Clone)]
pub struct Token(Option<Arc<TokenInner>>);

#[derive(Default)]
struct TokenInner {
  state: Mutex<Inner>,
  notify: Notify,
}

#[derive(Default)]
struct Inner {
  cancelled: bool,
  teardown: SmallVec<[Teardown; 1]>,
}

impl Token {
  pub fn new() -> Self { Token(Some(Arc::default())) }

  /// The distinguished token that never cancels.
  pub fn never() -> Self { Token(None) }

  pub fn is_never(&self) -> bool { self.0.is_none() }

  pub fn is_cancelled(&self) -> bool {
    self
      .0
      .as_ref()
      .is_some_and(|inner| inner.state.lock().cancelled)
  }

  /// Register a teardown. Runs immediately when the token is already
  /// cancelled.
  pub fn register(&self, action: impl FnOnce() + Send + 'static) {
    let Some(inner) = &self.0 else { return };
    let mut state = inner.state.lock();
    if state.cancelled {
      drop(state);
      action();
    } else {
      state.teardown.push(Box::new(action));
    }
  }

  /// Cancel the token and run all teardowns. Idempotent.
  pub fn cancel(&self) {
    let Some(inner) = &self.0 else { return };
    let teardown = {
      let mut state = inner.state.lock();
      if state.cancelled {
        return;
      }
      state.cancelled = true;
      std::mem::take(&mut state.teardown)
    };
    for action in teardown {
      action();
    }
    inner.notify.notify_waiters();
  }

  /// A token cancelled together with `self`, but cancellable on its own too.
  pub fn child(&self) -> Token {
    let child = Token::new();
    let weak = child.0.as_ref().map(Arc::downgrade);
    self.register(move || {
      if let Some(inner) = weak.and_then(|w| w.upgrade()) {
        Token(Some(inner)).cancel();
      }
    });
    child
  }

  /// Resolves once the token is cancelled. Never resolves for
  /// [`Token::never`].
  pub async fn cancelled(&self) {
    let Some(inner) = &self.0 else {
      return futures::future::pending().await;
    };
    let mut notified = pin!(inner.notify.notified());
    notified.as_mut().enable();
    if inner.state.lock().cancelled {
      return;
    }
    notified.await;
  }

  pub(crate) fn teardown_size(&self) -> usize {
    self
      .0
      .as_ref()
      .map_or(0, |inner| inner.state.lock().teardown.len())
  }
}

impl Default for Token {
  fn default() -> Self { Token::new() }
}

impl Debug for Token {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Token")
      .field("never", &self.is_never())
      .field("cancelled", &self.is_cancelled())
      .field("teardown_count", &self.teardown_size())
      .finish()
  }
}
