//! Change-tracked value cell
//!
//! A [`BackingField`] stores a value together with its previous value and a
//! dirty flag, and announces mutations through two subjects:
//! [`BackingField::value_changing`] fires before a commit and may veto it,
//! [`BackingField::value_changed`] fires after it.
//!
//! A candidate value counts as a change when the field was never set, when
//! exactly one of the current and candidate values is `None`, or when the
//! [`Comparer`] reports the two as different.

use std::{
  cmp::Ordering,
  fmt::{Debug, Formatter},
  future::Future,
  sync::{
    atomic::{AtomicBool, Ordering as AtomicOrdering},
    Arc,
  },
};

use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::{observer::Observer, subject::Subject};

// ============================================================================
// Comparer
// ============================================================================

/// Equality strategy used to decide whether a new value is a change.
pub struct Comparer<T>(Arc<dyn Fn(&T, &T) -> bool + Send + Sync>);

impl<T: 'static> Comparer<T> {
  /// Two values are the same when `ordering` answers `Equal`.
  pub fn ordering(ordering: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static) -> Self {
    Comparer(Arc::new(move |a, b| ordering(a, b) == Ordering::Equal))
  }

  /// Two values are the same when `eq` answers `true`.
  pub fn equality(eq: impl Fn(&T, &T) -> bool + Send + Sync + 'static) -> Self {
    Comparer(Arc::new(eq))
  }

  #[inline]
  pub fn same(&self, a: &T, b: &T) -> bool { (self.0)(a, b) }
}

impl<T: PartialEq + 'static> Comparer<T> {
  /// Structural equality through `PartialEq`.
  pub fn structural() -> Self { Comparer(Arc::new(|a: &T, b: &T| a == b)) }
}

impl<T: Ord + 'static> Comparer<T> {
  pub fn ord() -> Self { Comparer::ordering(T::cmp) }
}

impl<U: ?Sized + 'static> Comparer<Arc<U>> {
  /// Reference identity, for payloads that have no notion of equality.
  pub fn reference() -> Self { Comparer(Arc::new(|a: &Arc<U>, b: &Arc<U>| Arc::ptr_eq(a, b))) }
}

impl<T> Clone for Comparer<T> {
  fn clone(&self) -> Self { Comparer(self.0.clone()) }
}

impl<T: PartialEq + 'static> Default for Comparer<T> {
  fn default() -> Self { Comparer::structural() }
}

// ============================================================================
// Change events
// ============================================================================

/// Raised before a change is committed. Any observer may veto the change
/// with [`ValueChanging::cancel`].
#[derive(Clone, Debug)]
pub struct ValueChanging<T> {
  pub previous: Option<T>,
  pub next: Option<T>,
  cancel: Arc<AtomicBool>,
}

impl<T> ValueChanging<T> {
  fn new(previous: Option<T>, next: Option<T>) -> Self {
    Self { previous, next, cancel: Arc::new(AtomicBool::new(false)) }
  }

  pub fn cancel(&self) { self.cancel.store(true, AtomicOrdering::SeqCst) }

  pub fn is_cancelled(&self) -> bool { self.cancel.load(AtomicOrdering::SeqCst) }
}

/// Raised after a change is committed.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueChanged<T> {
  pub previous: Option<T>,
  pub current: Option<T>,
}

// ============================================================================
// BackingField
// ============================================================================

pub struct BackingField<T> {
  state: Mutex<FieldState<T>>,
  comparer: Comparer<T>,
  ignore_null_values: AtomicBool,
  // Serializes the compare-and-commit step of async updates.
  gate: Semaphore,
  changing: Subject<ValueChanging<T>>,
  changed: Subject<ValueChanged<T>>,
}

struct FieldState<T> {
  value: Option<T>,
  previous: Option<T>,
  is_set: bool,
  is_changed: bool,
}

impl<T: PartialEq + 'static> BackingField<T> {
  /// An unset field compared with `PartialEq`.
  pub fn new() -> Self { Self::with_comparer(Comparer::structural()) }

  /// A field holding `value`; the initial value is not a change.
  pub fn with_value(value: impl Into<Option<T>>) -> Self {
    let field = Self::new();
    {
      let mut state = field.state.lock();
      state.value = value.into();
      state.is_set = true;
    }
    field
  }
}

impl<T: PartialEq + 'static> Default for BackingField<T> {
  fn default() -> Self { Self::new() }
}

impl<T: 'static> BackingField<T> {
  pub fn with_comparer(comparer: Comparer<T>) -> Self {
    Self {
      state: Mutex::new(FieldState { value: None, previous: None, is_set: false, is_changed: false }),
      comparer,
      ignore_null_values: AtomicBool::new(false),
      gate: Semaphore::new(1),
      changing: Subject::new(),
      changed: Subject::new(),
    }
  }

  /// When enabled, a transition to `None` is never treated as a change.
  pub fn ignore_null_values(self, ignore: bool) -> Self {
    self.set_ignore_null_values(ignore);
    self
  }

  pub fn set_ignore_null_values(&self, ignore: bool) {
    self.ignore_null_values.store(ignore, AtomicOrdering::SeqCst)
  }

  pub fn is_changed(&self) -> bool { self.state.lock().is_changed }

  pub fn is_value_set(&self) -> bool { self.state.lock().is_set }

  /// Clear the dirty flag.
  pub fn mark_resolved(&self) { self.state.lock().is_changed = false; }

  /// Fires before a commit; observers may veto through
  /// [`ValueChanging::cancel`].
  pub fn value_changing(&self) -> &Subject<ValueChanging<T>> { &self.changing }

  /// Fires after a commit.
  pub fn value_changed(&self) -> &Subject<ValueChanged<T>> { &self.changed }

  /// Whether `next` would be a change of the current value.
  pub fn is_different(&self, next: &Option<T>) -> bool { self.differs(&self.state.lock(), next) }

  fn differs(&self, state: &FieldState<T>, next: &Option<T>) -> bool {
    if next.is_none() && self.ignore_null_values.load(AtomicOrdering::SeqCst) {
      return false;
    }
    if !state.is_set {
      return true;
    }
    match (&state.value, next) {
      (None, None) => false,
      (Some(current), Some(next)) => !self.comparer.same(current, next),
      _ => true,
    }
  }
}

impl<T: Clone + 'static> BackingField<T> {
  pub fn value(&self) -> Option<T> { self.state.lock().value.clone() }

  pub fn previous_value(&self) -> Option<T> { self.state.lock().previous.clone() }

  /// Apply `next` if it is a change and nobody vetoes it.
  ///
  /// Returns `true` when the value was committed.
  pub fn update_value(&self, next: impl Into<Option<T>>) -> bool {
    let next = next.into();
    let previous = {
      let state = self.state.lock();
      if !self.differs(&state, &next) {
        return false;
      }
      state.value.clone()
    };
    if self.raise_changing(previous, next.clone()).is_cancelled() {
      return false;
    }
    self.commit(next);
    true
  }

  /// Async variant of [`BackingField::update_value`].
  ///
  /// The comparison is repeated under a single-slot semaphore so that
  /// concurrent writers of the same value commit it only once.
  pub async fn update_value_async(&self, next: impl Into<Option<T>>) -> bool {
    self
      .update_value_async_with(next, |_| async { true })
      .await
  }

  /// Like [`BackingField::update_value_async`], awaiting `before_change`
  /// after `value_changing` fired and before the commit. Answering `false`
  /// aborts the update.
  pub async fn update_value_async_with<F, Fut>(
    &self, next: impl Into<Option<T>>, before_change: F,
  ) -> bool
  where
    F: FnOnce(ValueChanging<T>) -> Fut,
    Fut: Future<Output = bool>,
  {
    let next = next.into();
    if !self.is_different(&next) {
      return false;
    }

    let Ok(_permit) = self.gate.acquire().await else {
      return false;
    };
    let previous = {
      let state = self.state.lock();
      if !self.differs(&state, &next) {
        return false;
      }
      state.value.clone()
    };

    let args = self.raise_changing(previous, next.clone());
    if args.is_cancelled() || !before_change(args.clone()).await || args.is_cancelled() {
      return false;
    }
    self.commit(next);
    true
  }

  fn raise_changing(&self, previous: Option<T>, next: Option<T>) -> ValueChanging<T> {
    let args = ValueChanging::new(previous, next);
    if !self.changing.is_empty() {
      self.changing.on_next(args.clone());
    }
    args
  }

  fn commit(&self, next: Option<T>) {
    let previous = {
      let mut state = self.state.lock();
      let previous = std::mem::replace(&mut state.value, next.clone());
      state.previous = previous.clone();
      state.is_set = true;
      state.is_changed = true;
      previous
    };
    self.changed.on_next(ValueChanged { previous, current: next });
  }
}

impl<T: Debug> Debug for BackingField<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let state = self.state.lock();
    f.debug_struct("BackingField")
      .field("value", &state.value)
      .field("previous", &state.previous)
      .field("is_set", &state.is_set)
      .field("is_changed", &state.is_changed)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::AtomicUsize;

  use super::*;
  use crate::observable::Observable;

  #[test]
  fn equal_value_is_not_a_change() {
    let field = BackingField::new();
    assert!(!field.is_changed());
    assert!(field.update_value(5));
    assert!(field.is_changed());
    assert!(!field.update_value(5));
    assert!(field.is_changed());

    field.mark_resolved();
    assert!(!field.is_changed());
    assert!(!field.update_value(5));
    assert!(!field.is_changed());
  }

  #[test]
  fn first_assignment_of_default_is_a_change() {
    let field = BackingField::<i32>::new();
    assert!(!field.is_value_set());
    assert!(field.update_value(0));
    assert!(field.is_value_set());

    let empty = BackingField::<i32>::new();
    assert!(empty.update_value(None));
    assert!(empty.is_value_set());
    assert!(!empty.update_value(None));
  }

  #[test]
  fn one_sided_none_is_a_change() {
    let field = BackingField::with_value(1);
    assert!(!field.is_changed());
    assert!(field.update_value(None));
    assert_eq!(field.value(), None);
    assert_eq!(field.previous_value(), Some(1));
    assert!(field.update_value(2));
  }

  #[test]
  fn ignore_null_values() {
    let field = BackingField::with_value("a").ignore_null_values(true);
    assert!(!field.update_value(None));
    assert_eq!(field.value(), Some("a"));
    assert!(field.update_value("b"));
  }

  #[test]
  fn custom_comparers() {
    let field = BackingField::with_comparer(Comparer::ordering(|a: &String, b: &String| {
      a.to_lowercase().cmp(&b.to_lowercase())
    }));
    assert!(field.update_value("Hello".to_string()));
    assert!(!field.update_value("HELLO".to_string()));

    let field = BackingField::with_comparer(Comparer::equality(|a: &f64, b: &f64| {
      (a - b).abs() < 0.01
    }));
    assert!(field.update_value(1.0));
    assert!(!field.update_value(1.001));
    assert!(field.update_value(1.5));
  }

  #[test]
  fn reference_comparer() {
    let field = BackingField::with_comparer(Comparer::<Arc<Vec<u8>>>::reference());
    let payload = Arc::new(vec![1, 2]);
    assert!(field.update_value(payload.clone()));
    assert!(!field.update_value(payload));
    assert!(field.update_value(Arc::new(vec![1, 2])));
  }

  #[test]
  fn events_fire_around_commit() {
    let field = BackingField::with_value(1);
    let log = Arc::new(parking_lot::Mutex::new(vec![]));

    let c_log = log.clone();
    field
      .value_changing()
      .subscribe_fn(move |e: ValueChanging<i32>| {
        c_log.lock().push(format!("changing {:?}->{:?}", e.previous, e.next))
      });
    let c_log = log.clone();
    field
      .value_changed()
      .subscribe_fn(move |e: ValueChanged<i32>| {
        c_log.lock().push(format!("changed {:?}->{:?}", e.previous, e.current))
      });

    assert!(field.update_value(2));
    assert_eq!(
      *log.lock(),
      vec!["changing Some(1)->Some(2)".to_string(), "changed Some(1)->Some(2)".to_string()]
    );
  }

  #[test]
  fn changing_observer_can_veto() {
    let field = BackingField::with_value(1);
    field
      .value_changing()
      .subscribe_fn(|e: ValueChanging<i32>| {
        if e.next == Some(13) {
          e.cancel();
        }
      });
    let changed = Arc::new(AtomicUsize::new(0));
    let c_changed = changed.clone();
    field.value_changed().subscribe_fn(move |_| {
      c_changed.fetch_add(1, AtomicOrdering::SeqCst);
    });

    assert!(!field.update_value(13));
    assert_eq!(field.value(), Some(1));
    assert!(!field.is_changed());
    assert!(field.update_value(14));
    assert_eq!(changed.load(AtomicOrdering::SeqCst), 1);
  }

  #[tokio::test]
  async fn async_hook_can_veto() {
    let field = BackingField::with_value(1);
    assert!(!field.update_value_async_with(2, |_| async { false }).await);
    assert_eq!(field.value(), Some(1));

    assert!(field.update_value_async_with(2, |e| async move { e.next == Some(2) }).await);
    assert_eq!(field.value(), Some(2));
    assert!(!field.update_value_async(2).await);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_async_writers_commit_once() {
    for _ in 0..50 {
      let field = Arc::new(BackingField::with_value(0));
      let changed = Arc::new(AtomicUsize::new(0));
      let c_changed = changed.clone();
      field.value_changed().subscribe_fn(move |_| {
        c_changed.fetch_add(1, AtomicOrdering::SeqCst);
      });

      let writers: Vec<_> = (0..2)
        .map(|_| {
          let field = field.clone();
          tokio::spawn(async move { field.update_value_async(7).await })
        })
        .collect();
      let mut commits = 0;
      for writer in writers {
        if writer.await.unwrap() {
          commits += 1;
        }
      }

      assert_eq!(commits, 1);
      assert_eq!(changed.load(AtomicOrdering::SeqCst), 1);
      assert_eq!(field.value(), Some(7));
    }
  }
}
