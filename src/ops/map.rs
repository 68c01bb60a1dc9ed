use std::{marker::PhantomData, sync::Arc};

use super::impl_operator;
use crate::{
  error::Fault,
  observable::Observable,
  observer::Observer,
  subject::Subject,
  token::Token,
};

/// Creates a new stream which calls a closure on each element and uses its
/// return as the value.
pub struct Map<U> {
  subject: Subject<U>,
  token: Token,
}

impl<U> Map<U>
where
  U: Clone + Send + Sync + 'static,
{
  pub fn new<T, S, F>(source: &S, f: F) -> Self
  where
    T: 'static,
    S: Observable<T> + ?Sized,
    F: Fn(T) -> U + Send + Sync + 'static,
  {
    let subject = Subject::new();
    let token = Token::new();
    source
      .subscribe(Arc::new(MapObserver { downstream: subject.clone(), f, _item: PhantomData }))
      .tie_to(&token);
    Map { subject, token }
  }
}

impl_operator!(Map<U> => U);

struct MapObserver<T, U, F> {
  downstream: Subject<U>,
  f: F,
  _item: PhantomData<fn(T)>,
}

impl<T, U, F> Observer<T> for MapObserver<T, U, F>
where
  U: Clone,
  F: Fn(T) -> U + Send + Sync,
{
  #[inline]
  fn on_next(&self, value: T) { self.downstream.on_next((self.f)(value)) }

  fn on_error(&self, err: Fault) { self.downstream.on_error(err) }

  fn on_completed(&self) { self.downstream.on_completed() }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[test]
  fn primitive_type() {
    let source = Subject::<i32>::new();
    let results = Arc::new(Mutex::new(vec![]));
    let c_results = results.clone();
    source
      .map(|v| format!("#{v}"))
      .subscribe_fn(move |v| c_results.lock().push(v));

    source.on_next(1);
    source.on_next(2);
    assert_eq!(*results.lock(), vec!["#1".to_string(), "#2".to_string()]);
  }

  #[test]
  fn chained_with_filter_keeps_order() {
    let source = Subject::<i32>::new();
    let results = Arc::new(Mutex::new(vec![]));
    let c_results = results.clone();
    let mapped = source.map(|v| v * 10).filter(|&v| v > 50);
    mapped.subscribe_fn(move |v| c_results.lock().push(v));

    for v in [3, 6, 10] {
      source.on_next(v);
    }
    source.on_completed();
    assert_eq!(*results.lock(), vec![60, 100]);
  }

  #[test]
  fn forwards_errors() {
    let source = Subject::<i32>::new();
    let errors = Arc::new(Mutex::new(vec![]));
    let c_errors = errors.clone();
    source
      .map(|v| v + 1)
      .subscribe_all(|_| {}, move |e| c_errors.lock().push(e.to_string()), || {});

    source.on_error(Fault::msg("upstream"));
    assert_eq!(*errors.lock(), vec!["upstream".to_string()]);
  }
}
