use std::{
  fmt::{Display, Formatter},
  sync::{Arc, Weak},
};

use parking_lot::Mutex;
use tracing::trace;

use super::snapshot::Snapshot;
use crate::{
  error::Fault,
  observable::Observable,
  observer::{ArcObserver, Observer},
  subscription::Subscription,
};

/// Subject: A hot observable that multicasts values to many observers.
///
/// The `Subject` struct acts as both an `Observer` and an `Observable`.
/// Clones share the same observer list.
///
/// # Dispatch
///
/// Every notification takes a snapshot of the observer list under the
/// subject's lock and invokes the observers after releasing it. Observers
/// added or removed while a dispatch runs do not affect that dispatch, and an
/// observer may subscribe to or unsubscribe from the subject it is being
/// called by without deadlocking.
///
/// Concurrent `on_next` calls from different threads are not serialized
/// against each other; their notifications may interleave across observers.
///
/// # Panics in observers
///
/// A panicking observer unwinds out of `on_next` and the remaining observers
/// of that dispatch are skipped. The subject itself stays usable. Isolation
/// of faulty handlers is done one layer up, by the [`Hub`](crate::hub::Hub).
///
/// # Lifecycle
///
/// `on_error` / `on_completed` move the subject into a terminal state, clear
/// its observers and forward the notification to the observers registered at
/// that moment. Later subscribers are told about the terminal state right
/// away and get an inert subscription. After [`Subject::dispose`] every
/// notification is ignored.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, Mutex};
///
/// use rxhub::prelude::*;
///
/// let subject = Subject::<i32>::new();
/// let results = Arc::new(Mutex::new(vec![]));
/// let c_results = results.clone();
///
/// subject.subscribe_fn(move |v| c_results.lock().unwrap().push(v));
///
/// subject.on_next(1);
/// subject.on_next(2);
/// assert_eq!(*results.lock().unwrap(), vec![1, 2]);
/// ```
pub struct Subject<T> {
  core: Arc<SubjectCore<T>>,
}

struct SubjectCore<T> {
  state: Mutex<State<T>>,
}

struct State<T> {
  observers: Snapshot<ArcObserver<T>>,
  lifecycle: Lifecycle,
}

enum Lifecycle {
  Active,
  Completed,
  Errored(Fault),
  Disposed,
}

// ============================================================================
// Factory Methods
// ============================================================================

impl<T> Subject<T> {
  pub fn new() -> Self {
    Subject {
      core: Arc::new(SubjectCore {
        state: Mutex::new(State { observers: Snapshot::default(), lifecycle: Lifecycle::Active }),
      }),
    }
  }

  /// Get the number of current subscribers.
  pub fn observer_count(&self) -> usize { self.core.state.lock().observers.len() }

  /// Check if there are no subscribers.
  pub fn is_empty(&self) -> bool { self.core.state.lock().observers.is_empty() }

  /// `true` once `on_error`, `on_completed` or `dispose` ran.
  pub fn is_terminated(&self) -> bool {
    !matches!(self.core.state.lock().lifecycle, Lifecycle::Active)
  }

  pub fn is_disposed(&self) -> bool {
    matches!(self.core.state.lock().lifecycle, Lifecycle::Disposed)
  }

  /// The error the subject terminated with, if any.
  pub fn fault(&self) -> Option<Fault> {
    match &self.core.state.lock().lifecycle {
      Lifecycle::Errored(fault) => Some(fault.clone()),
      _ => None,
    }
  }

  /// Drop every observer without notifying them and reject all further
  /// notifications.
  pub fn dispose(&self) {
    let dropped = {
      let mut state = self.core.state.lock();
      state.lifecycle = Lifecycle::Disposed;
      state.observers.take()
    };
    trace!(observers = dropped.len(), "subject disposed");
  }

  /// Whether `self` and `other` share the same observer list.
  pub fn ptr_eq(&self, other: &Subject<T>) -> bool { Arc::ptr_eq(&self.core, &other.core) }
}

impl<T> Subject<T> {
  /// The observers an `on_next` issued now reaches; `None` once terminated.
  pub(super) fn next_targets(&self) -> Option<Arc<Vec<(usize, ArcObserver<T>)>>> {
    let state = self.core.state.lock();
    if !matches!(state.lifecycle, Lifecycle::Active) {
      trace!("value dropped by a terminated subject");
      return None;
    }
    Some(state.observers.snapshot())
  }
}

impl<T: 'static> Subject<T> {
  /// Register `observer` while the subject is active. Terminal states are
  /// left to [`Observable::subscribe`], which notifies the observer.
  pub(super) fn try_add(&self, observer: ArcObserver<T>) -> Option<Subscription> {
    let mut state = self.core.state.lock();
    if !matches!(state.lifecycle, Lifecycle::Active) {
      return None;
    }
    let id = state.observers.add(observer);
    let weak: Weak<SubjectCore<T>> = Arc::downgrade(&self.core);
    Some(Subscription::new(move || {
      if let Some(core) = weak.upgrade() {
        core.state.lock().observers.remove(id);
      }
    }))
  }
}

/// Send `value` to every target: n-1 clones and one move.
pub(super) fn dispatch_next<T: Clone>(targets: &[(usize, ArcObserver<T>)], value: T) {
  let mut iter = targets.iter().peekable();
  while let Some((_, observer)) = iter.next() {
    if iter.peek().is_some() {
      observer.on_next(value.clone());
    } else {
      observer.on_next(value);
      break;
    }
  }
}

// ============================================================================
// Standard Traits
// ============================================================================

impl<T> Clone for Subject<T> {
  fn clone(&self) -> Self { Self { core: self.core.clone() } }
}

impl<T> Default for Subject<T> {
  fn default() -> Self { Self::new() }
}

impl<T> Display for Subject<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "Subject(observers: {})", self.observer_count())
  }
}

// ============================================================================
// Observer Implementation
// ============================================================================

impl<T: Clone> Observer<T> for Subject<T> {
  fn on_next(&self, value: T) {
    if let Some(targets) = self.next_targets() {
      dispatch_next(&targets, value);
    }
  }

  fn on_error(&self, err: Fault) {
    let observers = {
      let mut state = self.core.state.lock();
      if !matches!(state.lifecycle, Lifecycle::Active) {
        trace!("error dropped by a terminated subject");
        return;
      }
      state.lifecycle = Lifecycle::Errored(err.clone());
      state.observers.take()
    };
    for (_, observer) in observers.iter() {
      observer.on_error(err.clone());
    }
  }

  fn on_completed(&self) {
    let observers = {
      let mut state = self.core.state.lock();
      if !matches!(state.lifecycle, Lifecycle::Active) {
        return;
      }
      state.lifecycle = Lifecycle::Completed;
      state.observers.take()
    };
    for (_, observer) in observers.iter() {
      observer.on_completed();
    }
  }
}

// ============================================================================
// Observable Implementation
// ============================================================================

impl<T: 'static> Observable<T> for Subject<T> {
  fn subscribe(&self, observer: ArcObserver<T>) -> Subscription {
    if let Some(subscription) = self.try_add(observer.clone()) {
      return subscription;
    }
    let terminal = match &self.core.state.lock().lifecycle {
      Lifecycle::Errored(fault) => Some(fault.clone()),
      Lifecycle::Disposed => return Subscription::inert(),
      _ => None,
    };
    match terminal {
      Some(fault) => observer.on_error(fault),
      None => observer.on_completed(),
    }
    Subscription::inert()
  }
}

// ============================================================================
// Tests
// ============================================================================
