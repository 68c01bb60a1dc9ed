use std::{marker::PhantomData, sync::Arc};

use super::impl_operator;
use crate::{
  backing_field::{BackingField, Comparer},
  error::Fault,
  observable::Observable,
  observer::Observer,
  subject::Subject,
  token::Token,
};

/// Only emit a value when its key differs from the key of the last emitted
/// value.
///
/// The last key lives in a [`BackingField`], so the comparison follows the
/// same rules as any other field update.
pub struct Distinct<T> {
  subject: Subject<T>,
  token: Token,
}

impl<T> Distinct<T>
where
  T: Clone + Send + Sync + 'static,
{
  pub fn new<S, K, F>(source: &S, key: F, comparer: Comparer<K>) -> Self
  where
    S: Observable<T> + ?Sized,
    K: Clone + Send + Sync + 'static,
    F: Fn(&T) -> K + Send + Sync + 'static,
  {
    let subject = Subject::new();
    let token = Token::new();
    let observer = DistinctObserver {
      downstream: subject.clone(),
      key,
      last: BackingField::with_comparer(comparer),
      _item: PhantomData,
    };
    source.subscribe(Arc::new(observer)).tie_to(&token);
    Distinct { subject, token }
  }
}

impl_operator!(Distinct<T> => T);

struct DistinctObserver<T, K, F> {
  downstream: Subject<T>,
  key: F,
  last: BackingField<K>,
  _item: PhantomData<fn(T)>,
}

impl<T, K, F> Observer<T> for DistinctObserver<T, K, F>
where
  T: Clone,
  K: Clone + Send + Sync + 'static,
  F: Fn(&T) -> K + Send + Sync,
{
  fn on_next(&self, value: T) {
    if self.last.update_value((self.key)(&value)) {
      self.downstream.on_next(value);
    }
  }

  fn on_error(&self, err: Fault) { self.downstream.on_error(err) }

  fn on_completed(&self) { self.downstream.on_completed() }
}
