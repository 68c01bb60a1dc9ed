//! Observable trait
//!
//! An [`Observable`] is anything that accepts observers. Subjects, behavior
//! subjects, every operator in [`ops`](crate::ops) and the event adapters
//! implement it, so operators compose through
//! [`ObservableExt`](crate::ops::ObservableExt).

use std::sync::Arc;

use crate::{
  error::Fault,
  observer::{ArcObserver, FnObserver, ObserverFns},
  subscription::Subscription,
};

/// A producer exposing a subscribe operation.
pub trait Observable<T>: Send + Sync {
  /// Register `observer` and return the handle that removes it again.
  fn subscribe(&self, observer: ArcObserver<T>) -> Subscription;

  /// Subscribe with a closure that only handles values.
  fn subscribe_fn<F>(&self, next: F) -> Subscription
  where
    Self: Sized,
    T: 'static,
    F: Fn(T) + Send + Sync + 'static,
  {
    self.subscribe(Arc::new(FnObserver::new(next)))
  }

  /// Subscribe with one closure per notification kind.
  fn subscribe_all<N, E, C>(&self, next: N, error: E, complete: C) -> Subscription
  where
    Self: Sized,
    T: 'static,
    N: Fn(T) + Send + Sync + 'static,
    E: Fn(Fault) + Send + Sync + 'static,
    C: Fn() + Send + Sync + 'static,
  {
    self.subscribe(Arc::new(ObserverFns::new(next, error, complete)))
  }
}

impl<T, O> Observable<T> for Arc<O>
where
  O: Observable<T> + ?Sized,
{
  #[inline]
  fn subscribe(&self, observer: ArcObserver<T>) -> Subscription { (**self).subscribe(observer) }
}

/// Type-erased observable.
pub type BoxedObservable<T> = Box<dyn Observable<T>>;

impl<T> Observable<T> for Box<dyn Observable<T>> {
  #[inline]
  fn subscribe(&self, observer: ArcObserver<T>) -> Subscription { (**self).subscribe(observer) }
}
