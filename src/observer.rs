//! Observer trait and implementations
//!
//! The Observer trait defines the consumer of data in the reactive pattern.
//! It provides three methods: `on_next` (for values), `on_error` (for errors),
//! and `on_completed` (for stream completion).
//!
//! Observers are shared between the subject that dispatches to them and the
//! subscription that removes them, so every method takes `&self` and
//! implementors must be `Send + Sync`. Interior state goes behind a lock.

use std::{marker::PhantomData, sync::Arc};

use crate::error::Fault;

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer trait: The consumer of data in reactive programming
pub trait Observer<T>: Send + Sync {
  /// Receive the next value from the observable
  fn on_next(&self, value: T);

  /// Handle an error from the observable. No value follows an error.
  fn on_error(&self, err: Fault);

  /// Handle completion of the observable. No value follows completion.
  fn on_completed(&self);
}

/// Shared observer handle as stored by subjects.
pub type ArcObserver<T> = Arc<dyn Observer<T>>;

impl<T, O> Observer<T> for Arc<O>
where
  O: Observer<T> + ?Sized,
{
  #[inline]
  fn on_next(&self, value: T) { (**self).on_next(value) }

  #[inline]
  fn on_error(&self, err: Fault) { (**self).on_error(err) }

  #[inline]
  fn on_completed(&self) { (**self).on_completed() }
}

// ============================================================================
// FnObserver - Closure adapter
// ============================================================================

/// Closure adapter: the closure becomes the `on_next` handler, while errors
/// and completion are ignored.
pub struct FnObserver<F, T> {
  next: F,
  _item: PhantomData<fn(T)>,
}

impl<F, T> FnObserver<F, T>
where
  F: Fn(T) + Send + Sync,
{
  pub fn new(next: F) -> Self { Self { next, _item: PhantomData } }
}

impl<F, T> Observer<T> for FnObserver<F, T>
where
  F: Fn(T) + Send + Sync,
{
  #[inline]
  fn on_next(&self, value: T) { (self.next)(value) }

  #[inline]
  fn on_error(&self, _err: Fault) {}

  #[inline]
  fn on_completed(&self) {}
}

// ============================================================================
// ObserverFns - one closure per notification
// ============================================================================

/// Observer assembled from three closures.
pub struct ObserverFns<N, E, C, T> {
  next: N,
  error: E,
  complete: C,
  _item: PhantomData<fn(T)>,
}

impl<N, E, C, T> ObserverFns<N, E, C, T>
where
  N: Fn(T) + Send + Sync,
  E: Fn(Fault) + Send + Sync,
  C: Fn() + Send + Sync,
{
  pub fn new(next: N, error: E, complete: C) -> Self {
    Self { next, error, complete, _item: PhantomData }
  }
}

impl<N, E, C, T> Observer<T> for ObserverFns<N, E, C, T>
where
  N: Fn(T) + Send + Sync,
  E: Fn(Fault) + Send + Sync,
  C: Fn() + Send + Sync,
{
  #[inline]
  fn on_next(&self, value: T) { (self.next)(value) }

  #[inline]
  fn on_error(&self, err: Fault) { (self.error)(err) }

  #[inline]
  fn on_completed(&self) { (self.complete)() }
}
