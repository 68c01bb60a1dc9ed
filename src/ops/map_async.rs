use std::{future::Future, marker::PhantomData, sync::Arc};

use super::impl_operator;
use crate::{
  error::{Fault, RxError},
  observable::Observable,
  observer::Observer,
  scheduler::Scheduler,
  subject::Subject,
  token::Token,
};

/// Async counterpart of [`Map`](super::Map).
///
/// Each source value starts its own transform on the ambient runtime.
/// Results are emitted as they complete, so they may overtake each other; a
/// failed transform is forwarded as an error, which terminates the operator.
pub struct MapAsync<U> {
  subject: Subject<U>,
  token: Token,
}

impl<U> MapAsync<U>
where
  U: Clone + Send + Sync + 'static,
{
  /// Fails with [`RxError::NoRuntime`] outside a tokio runtime.
  pub fn new<T, S, F, Fut>(source: &S, f: F) -> Result<Self, RxError>
  where
    T: 'static,
    S: Observable<T> + ?Sized,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<U, Fault>> + Send + 'static,
  {
    let scheduler = Scheduler::current()?;
    let subject = Subject::new();
    let token = Token::new();
    let observer = MapAsyncObserver {
      downstream: subject.clone(),
      f,
      scheduler,
      token: token.clone(),
      _item: PhantomData,
    };
    source.subscribe(Arc::new(observer)).tie_to(&token);
    Ok(MapAsync { subject, token })
  }
}

impl_operator!(MapAsync<U> => U);

struct MapAsyncObserver<T, U, F> {
  downstream: Subject<U>,
  f: F,
  scheduler: Scheduler,
  token: Token,
  _item: PhantomData<fn(T)>,
}

impl<T, U, F, Fut> Observer<T> for MapAsyncObserver<T, U, F>
where
  U: Clone + Send + Sync + 'static,
  F: Fn(T) -> Fut + Send + Sync,
  Fut: Future<Output = Result<U, Fault>> + Send + 'static,
{
  fn on_next(&self, value: T) {
    let transform = (self.f)(value);
    let downstream = self.downstream.clone();
    let token = self.token.clone();
    self.scheduler.schedule(
      async move {
        let result = transform.await;
        if token.is_cancelled() {
          return;
        }
        match result {
          Ok(value) => downstream.on_next(value),
          Err(err) => downstream.on_error(err),
        }
      },
      None,
    );
  }

  fn on_error(&self, err: Fault) { self.downstream.on_error(err) }

  fn on_completed(&self) { self.downstream.on_completed() }
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, time::Duration};

  use parking_lot::Mutex;

  use super::*;
  use crate::prelude::*;

  #[tokio::test(start_paused = true)]
  async fn results_arrive_in_completion_order() {
    let source = Subject::<u64>::new();
    let mapped = source
      .map_async(|delay| async move {
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok::<_, Fault>(delay * 2)
      })
      .unwrap();
    let results = Arc::new(Mutex::new(vec![]));
    let c_results = results.clone();
    mapped.subscribe_fn(move |v| c_results.lock().push(v));

    source.on_next(30);
    source.on_next(10);
    source.on_next(20);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*results.lock(), vec![20, 40, 60]);
  }

  #[tokio::test]
  async fn failed_transform_becomes_error() {
    let source = Subject::<i32>::new();
    let mapped = source
      .map_async(|v| async move {
        if v < 0 {
          Err(Fault::msg("negative"))
        } else {
          Ok(v)
        }
      })
      .unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel();
    let tx = Mutex::new(Some(tx));
    mapped.subscribe_all(
      |_| {},
      move |e| {
        if let Some(tx) = tx.lock().take() {
          let _ = tx.send(e.to_string());
        }
      },
      || {},
    );

    source.on_next(-1);
    assert_eq!(rx.await.unwrap(), "negative");
    assert_eq!(mapped.observer_count(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn disposed_operator_drops_late_results() {
    let source = Subject::<i32>::new();
    let mapped = source
      .map_async(|v| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok::<_, Fault>(v)
      })
      .unwrap();
    let results = Arc::new(Mutex::new(vec![]));
    let c_results = results.clone();
    mapped.subscribe_fn(move |v| c_results.lock().push(v));

    source.on_next(1);
    mapped.dispose();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(results.lock().is_empty());
  }
}
