use std::{
  future::Future,
  pin::Pin,
  task::{Context, Poll},
};

use futures::{
  channel::oneshot::{self, Receiver, Sender},
  FutureExt,
};
use pin_project_lite::pin_project;
use tracing::warn;

use crate::{outcome::Outcome, scheduler::Scheduler};

pin_project! {
  /// Handle to an in-flight publish.
  ///
  /// Awaiting it yields the combined [`Outcome`] of the interception chain:
  /// `Success` once every matching subscriber was attempted, `Fail` or
  /// `Exception` when an interceptor stopped the publish, `Cancelled` when
  /// the hub was disposed or the dispatch task was dropped. Subscriber
  /// failures never show up here; they are published as
  /// [`DeliveryFailed`](super::DeliveryFailed).
  ///
  /// Dispatch does not depend on the handle: dropping it leaves the publish
  /// running.
  #[must_use = "drop the delivery explicitly to fire and forget"]
  pub struct Delivery {
    #[pin]
    rx: Receiver<Outcome>,
  }
}

/// Completes a [`Delivery`].
pub(crate) struct Resolver(Sender<Outcome>);

impl Resolver {
  pub fn resolve(self, outcome: Outcome) {
    // the publisher may have dropped its handle
    let _ = self.0.send(outcome);
  }
}

impl Delivery {
  pub(crate) fn channel() -> (Delivery, Resolver) {
    let (tx, rx) = oneshot::channel();
    (Delivery { rx }, Resolver(tx))
  }

  /// A delivery that is already complete.
  pub(crate) fn resolved(outcome: Outcome) -> Delivery {
    let (delivery, resolver) = Delivery::channel();
    resolver.resolve(outcome);
    delivery
  }

  /// Run `callback` with the outcome once the publish completes.
  ///
  /// Runs inline when the outcome is already known, otherwise on the
  /// ambient runtime.
  pub fn on_complete<F>(mut self, callback: F)
  where
    F: FnOnce(Outcome) + Send + 'static,
  {
    if let Some(outcome) = (&mut self).now_or_never() {
      callback(outcome);
      return;
    }
    match Scheduler::current() {
      Ok(scheduler) => {
        scheduler.spawn(async move { callback(self.await) });
      }
      Err(err) => {
        warn!("completion callback registered outside a runtime");
        callback(Outcome::Exception(err.into()));
      }
    }
  }
}

impl Future for Delivery {
  type Output = Outcome;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Outcome> {
    self
      .project()
      .rx
      .poll(cx)
      .map(|res| res.unwrap_or(Outcome::Cancelled))
  }
}
