use std::sync::Arc;

use super::impl_operator;
use crate::{
  error::Fault,
  observable::Observable,
  observer::Observer,
  subject::Subject,
  token::Token,
};

/// Emit only those items from an Observable that pass a predicate test.
///
/// Values are re-emitted synchronously, inside the source's dispatch.
pub struct Filter<T> {
  subject: Subject<T>,
  token: Token,
}

impl<T> Filter<T>
where
  T: Clone + Send + Sync + 'static,
{
  pub fn new<S, P>(source: &S, predicate: P) -> Self
  where
    S: Observable<T> + ?Sized,
    P: Fn(&T) -> bool + Send + Sync + 'static,
  {
    let subject = Subject::new();
    let token = Token::new();
    source
      .subscribe(Arc::new(FilterObserver { downstream: subject.clone(), predicate }))
      .tie_to(&token);
    Filter { subject, token }
  }
}

impl_operator!(Filter<T> => T);

struct FilterObserver<T, P> {
  downstream: Subject<T>,
  predicate: P,
}

impl<T, P> Observer<T> for FilterObserver<T, P>
where
  T: Clone,
  P: Fn(&T) -> bool + Send + Sync,
{
  fn on_next(&self, value: T) {
    if (self.predicate)(&value) {
      self.downstream.on_next(value);
    }
  }

  fn on_error(&self, err: Fault) { self.downstream.on_error(err) }

  fn on_completed(&self) { self.downstream.on_completed() }
}

#[cfg(test)]
mod tests {
  use parking_lot::Mutex;

  use crate::prelude::*;

  #[test]
  fn emits_only_matching_values() {
    let source = Subject::<i32>::new();
    let evens = source.filter(|v| v % 2 == 0);
    let results = std::sync::Arc::new(Mutex::new(vec![]));
    let c_results = results.clone();
    evens.subscribe_fn(move |v| c_results.lock().push(v));

    for i in 0..10 {
      source.on_next(i);
    }
    assert_eq!(*results.lock(), vec![0, 2, 4, 6, 8]);
  }

  #[test]
  fn forwards_completion() {
    let source = Subject::<i32>::new();
    let filtered = source.filter(|_| false);
    let done = std::sync::Arc::new(Mutex::new(false));
    let c_done = done.clone();
    filtered.subscribe_all(|_| {}, |_| {}, move || *c_done.lock() = true);

    source.on_completed();
    assert!(*done.lock());
  }

  #[test]
  fn dispose_detaches_from_source() {
    let source = Subject::<i32>::new();
    let filtered = source.filter(|_| true);
    assert_eq!(source.observer_count(), 1);

    filtered.subscribe_fn(|_| {});
    assert_eq!(filtered.to_string(), "Filter(observers: 1)");

    filtered.dispose();
    assert!(filtered.is_disposed());
    assert_eq!(source.observer_count(), 0);
    assert_eq!(filtered.observer_count(), 0);
  }
}
