use std::{
  fmt::{Display, Formatter},
  sync::Arc,
};

use parking_lot::Mutex;

use super::{subject_core::dispatch_next, Subject};
use crate::{
  error::Fault,
  observable::Observable,
  observer::{ArcObserver, Observer},
  subscription::Subscription,
};

/// A [`Subject`] that remembers the latest value.
///
/// Every `on_next` overwrites the cached value before it is multicast. A new
/// subscriber receives the cached value right after it is registered, when
/// there is one.
///
/// Storing a value and taking the set of observers it goes to happen under
/// the cache lock, and so do registering a subscriber and reading the value
/// to replay. A subscriber racing an `on_next` therefore gets that value
/// exactly once, either replayed or dispatched. The lock is never held while
/// observers run.
pub struct BehaviorSubject<T> {
  subject: Subject<T>,
  value: Arc<Mutex<Option<T>>>,
}

impl<T> BehaviorSubject<T> {
  /// A behavior subject without a value; subscribers get nothing replayed
  /// until the first `on_next`.
  pub fn new() -> Self { Self { subject: Subject::new(), value: Arc::new(Mutex::new(None)) } }

  pub fn with_value(value: T) -> Self {
    Self { subject: Subject::new(), value: Arc::new(Mutex::new(Some(value))) }
  }

  /// Drop the cached value and every observer.
  pub fn dispose(&self) {
    self.value.lock().take();
    self.subject.dispose();
  }

  pub fn observer_count(&self) -> usize { self.subject.observer_count() }

  pub fn is_terminated(&self) -> bool { self.subject.is_terminated() }
}

impl<T: Clone> BehaviorSubject<T> {
  /// The latest value; rethrows the fault if the subject errored.
  pub fn value(&self) -> Result<Option<T>, Fault> {
    if let Some(fault) = self.subject.fault() {
      return Err(fault);
    }
    Ok(self.value.lock().clone())
  }

  /// The latest value, or `None` when there is none or the subject is
  /// disposed.
  pub fn try_get_value(&self) -> Option<T> {
    if self.subject.is_disposed() {
      return None;
    }
    self.value.lock().clone()
  }
}

impl<T> Clone for BehaviorSubject<T> {
  fn clone(&self) -> Self { Self { subject: self.subject.clone(), value: self.value.clone() } }
}

impl<T> Default for BehaviorSubject<T> {
  fn default() -> Self { Self::new() }
}

impl<T> Display for BehaviorSubject<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "BehaviorSubject(observers: {})", self.observer_count())
  }
}

impl<T: Clone + Send> Observer<T> for BehaviorSubject<T> {
  fn on_next(&self, value: T) {
    let targets = {
      let mut cached = self.value.lock();
      let Some(targets) = self.subject.next_targets() else { return };
      *cached = Some(value.clone());
      targets
    };
    dispatch_next(&targets, value);
  }

  #[inline]
  fn on_error(&self, err: Fault) { self.subject.on_error(err) }

  #[inline]
  fn on_completed(&self) { self.subject.on_completed() }
}

impl<T: Clone + Send + 'static> Observable<T> for BehaviorSubject<T> {
  fn subscribe(&self, observer: ArcObserver<T>) -> Subscription {
    let registered = {
      let cached = self.value.lock();
      self
        .subject
        .try_add(observer.clone())
        .map(|sub| (sub, cached.clone()))
    };
    match registered {
      Some((sub, current)) => {
        if let Some(current) = current {
          observer.on_next(current);
        }
        sub
      }
      None => self.subject.subscribe(observer),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn collect(subject: &BehaviorSubject<i32>) -> (Subscription, Arc<Mutex<Vec<i32>>>) {
    let results = Arc::new(Mutex::new(vec![]));
    let c_results = results.clone();
    let sub = subject.subscribe_fn(move |v| c_results.lock().push(v));
    (sub, results)
  }

  #[test]
  fn replays_initial_value() {
    let subject = BehaviorSubject::with_value(42);
    let (_sub, results) = collect(&subject);
    subject.on_next(100);
    subject.on_next(200);
    assert_eq!(*results.lock(), vec![42, 100, 200]);
  }

  #[test]
  fn replays_only_the_latest_value() {
    let subject = BehaviorSubject::new();
    let (_early, early) = collect(&subject);
    assert!(early.lock().is_empty());

    subject.on_next(1);
    subject.on_next(2);
    let (_late, late) = collect(&subject);
    assert_eq!(*late.lock(), vec![2]);
    assert_eq!(*early.lock(), vec![1, 2]);
  }

  #[test]
  fn unsubscribe() {
    let subject = BehaviorSubject::with_value(42);
    let (sub, results) = collect(&subject);
    sub.unsubscribe();
    subject.on_next(100);
    assert_eq!(*results.lock(), vec![42]);
  }

  #[test]
  fn value_rethrows_terminal_error() {
    let subject = BehaviorSubject::with_value(1);
    assert_eq!(subject.value().unwrap(), Some(1));

    subject.on_error(Fault::msg("dead"));
    assert_eq!(subject.value().unwrap_err().to_string(), "dead");
    // the cached value is kept until disposal
    assert_eq!(subject.try_get_value(), Some(1));
  }

  #[test]
  fn dispose_clears_value() {
    let subject = BehaviorSubject::with_value(7);
    subject.dispose();
    assert_eq!(subject.try_get_value(), None);
    assert_eq!(subject.value().unwrap(), None);

    let (sub, results) = collect(&subject);
    assert!(sub.is_closed());
    assert!(results.lock().is_empty());
  }

  #[test]
  fn completed_subject_does_not_replay() {
    let subject = BehaviorSubject::with_value(3);
    subject.on_completed();
    let (sub, results) = collect(&subject);
    assert!(sub.is_closed());
    assert!(results.lock().is_empty());
  }

  #[test]
  fn racing_subscriber_sees_each_value_once() {
    for _ in 0..200 {
      let subject = BehaviorSubject::with_value(0);
      let emitter = {
        let subject = subject.clone();
        std::thread::spawn(move || {
          for v in 1..50 {
            subject.on_next(v);
          }
        })
      };
      let (_sub, results) = collect(&subject);
      emitter.join().unwrap();

      let mut seen = results.lock().clone();
      seen.sort_unstable();
      let first = seen[0];
      assert_eq!(seen, (first..50).collect::<Vec<_>>());
    }
  }
}
