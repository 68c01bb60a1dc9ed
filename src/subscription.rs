use std::{
  fmt::{Debug, Formatter},
  sync::Arc,
};

use parking_lot::Mutex;

use crate::token::Token;

type Teardown = Box<dyn FnOnce() + Send>;

/// Subscription returned from `Observable::subscribe` to allow unsubscribing.
///
/// Clones share the same state: whichever clone unsubscribes first runs the
/// teardown, the rest are no-ops.
#[derive(Clone)]
pub struct Subscription(Arc<Mutex<Inner>>);

struct Inner {
  closed: bool,
  teardown: Option<Teardown>,
}

impl Subscription {
  pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
    Subscription(Arc::new(Mutex::new(Inner { closed: false, teardown: Some(Box::new(teardown)) })))
  }

  /// A subscription that is already closed and does nothing.
  pub fn inert() -> Self {
    Subscription(Arc::new(Mutex::new(Inner { closed: true, teardown: None })))
  }

  /// This allows deregistering a stream before it has finished receiving all
  /// events (i.e. before `on_completed` is called).
  pub fn unsubscribe(&self) {
    let teardown = {
      let mut inner = self.0.lock();
      inner.closed = true;
      inner.teardown.take()
    };
    if let Some(teardown) = teardown {
      teardown();
    }
  }

  pub fn is_closed(&self) -> bool { self.0.lock().closed }

  /// Unsubscribe when `token` is cancelled.
  pub fn tie_to(self, token: &Token) -> Self {
    let sub = self.clone();
    token.register(move || sub.unsubscribe());
    self
  }

  /// Activates "RAII" behavior for this subscription. That means
  /// `unsubscribe()` will be called automatically as soon as the returned
  /// value goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately, which is probably not what you
  /// want!
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard { SubscriptionGuard(self) }
}

impl Debug for Subscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("is_closed", &self.is_closed())
      .finish()
  }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard(Subscription);

impl SubscriptionGuard {
  pub fn new(subscription: Subscription) -> Self { SubscriptionGuard(subscription) }
}

impl Drop for SubscriptionGuard {
  #[inline]
  fn drop(&mut self) { self.0.unsubscribe() }
}
