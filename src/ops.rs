//! Stream operators.
//!
//! Every operator here is a hot node: it subscribes to its source when it is
//! built, under a private [`Token`](crate::token::Token), and republishes
//! through its own [`Subject`](crate::subject::Subject). Disposing the
//! operator cancels the token, which detaches it from the source.
//!
//! Operators chain through [`ObservableExt`]:
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use rxhub::prelude::*;
//!
//! let source = Subject::<i32>::new();
//! let result = Arc::new(Mutex::new(vec![]));
//! let c_result = result.clone();
//!
//! source
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 10)
//!   .subscribe_fn(move |v| c_result.lock().unwrap().push(v));
//!
//! for i in 0..5 {
//!   source.on_next(i);
//! }
//! assert_eq!(*result.lock().unwrap(), vec![0, 20, 40]);
//! ```

use std::{future::Future, time::Duration};

use crate::{
  backing_field::Comparer,
  error::{Fault, RxError},
  observable::Observable,
};

pub mod distinct;
pub mod filter;
pub mod from_event;
pub mod map;
pub mod map_async;
pub mod throttle;

pub use distinct::Distinct;
pub use filter::Filter;
pub use from_event::{from_broadcast, from_handler, FromBroadcast, FromHandler, Handler};
pub use map::Map;
pub use map_async::MapAsync;
pub use throttle::Throttle;

/// Implements the surface shared by every operator: `Observable` through the
/// operator's subject, `Display` with the observer count, and disposal.
///
/// The operator struct needs a `subject: Subject<Out>` and a `token: Token`
/// field.
macro_rules! impl_operator {
  ($name:ident<$($g:ident),+> => $out:ty) => {
    impl<$($g),+> $name<$($g),+> {
      /// Detach from the source and drop every downstream observer.
      pub fn dispose(&self) {
        self.token.cancel();
        self.subject.dispose();
      }

      pub fn is_disposed(&self) -> bool { self.token.is_cancelled() }

      pub fn observer_count(&self) -> usize { self.subject.observer_count() }
    }

    impl<$($g),+> $crate::observable::Observable<$out> for $name<$($g),+>
    where
      $out: 'static,
    {
      #[inline]
      fn subscribe(
        &self, observer: $crate::observer::ArcObserver<$out>,
      ) -> $crate::subscription::Subscription {
        self.subject.subscribe(observer)
      }
    }

    impl<$($g),+> std::fmt::Display for $name<$($g),+> {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(observers: {})", stringify!($name), self.observer_count())
      }
    }

    impl<$($g),+> Clone for $name<$($g),+> {
      fn clone(&self) -> Self { Self { subject: self.subject.clone(), token: self.token.clone() } }
    }
  };
}
pub(crate) use impl_operator;

/// Operator constructors for every [`Observable`].
pub trait ObservableExt<T>: Observable<T> + Sized
where
  T: Clone + Send + Sync + 'static,
{
  /// Emit only those values that pass `predicate`.
  fn filter<P>(&self, predicate: P) -> Filter<T>
  where
    P: Fn(&T) -> bool + Send + Sync + 'static,
  {
    Filter::new(self, predicate)
  }

  /// Emit `f(value)` for every value.
  fn map<U, F>(&self, f: F) -> Map<U>
  where
    U: Clone + Send + Sync + 'static,
    F: Fn(T) -> U + Send + Sync + 'static,
  {
    Map::new(self, f)
  }

  /// Run `f` for every value on the ambient runtime and emit each result as
  /// it completes; a failed transform is forwarded as an error.
  fn map_async<U, F, Fut>(&self, f: F) -> Result<MapAsync<U>, RxError>
  where
    U: Clone + Send + Sync + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<U, Fault>> + Send + 'static,
  {
    MapAsync::new(self, f)
  }

  /// Suppress values equal to the previous one.
  fn distinct(&self) -> Distinct<T>
  where
    T: PartialEq,
  {
    Distinct::new(self, T::clone, Comparer::structural())
  }

  /// Suppress values whose key equals the key of the previous value.
  fn distinct_by<K, F>(&self, key: F, comparer: Comparer<K>) -> Distinct<T>
  where
    K: Clone + Send + Sync + 'static,
    F: Fn(&T) -> K + Send + Sync + 'static,
  {
    Distinct::new(self, key, comparer)
  }

  /// Emit the latest value once no new value arrived for `duration`.
  fn throttle(&self, duration: Duration) -> Result<Throttle<T>, RxError> {
    Throttle::new(self, duration)
  }
}

impl<T, O> ObservableExt<T> for O
where
  T: Clone + Send + Sync + 'static,
  O: Observable<T>,
{
}
