//! Error types
//!
//! [`Fault`] is the error channel of every [`Observer`](crate::observer::Observer)
//! and the payload of [`Outcome::Exception`](crate::outcome::Outcome). It is a
//! cheap-to-clone, type-erased error so one fault can be multicast to many
//! observers. [`HubError`] and [`RxError`] describe failures of the library
//! itself.

use std::{
  error::Error,
  fmt::{Debug, Display, Formatter},
  sync::Arc,
};

use thiserror::Error;

// ============================================================================
// Fault
// ============================================================================

/// A shared, type-erased error value.
#[derive(Clone)]
pub struct Fault(Arc<dyn Error + Send + Sync + 'static>);

impl Fault {
  pub fn new<E>(err: E) -> Self
  where
    E: Error + Send + Sync + 'static,
  {
    Fault(Arc::new(err))
  }

  /// Build a fault that only carries a message.
  pub fn msg(message: impl Into<String>) -> Self { Fault(Arc::new(Message(message.into()))) }

  /// Build a fault from a caught panic payload.
  pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
    let text = if let Some(s) = payload.downcast_ref::<&str>() {
      (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
      s.clone()
    } else {
      "unknown panic payload".to_string()
    };
    Fault::new(RxError::Panicked(text))
  }

  pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> { self.0.downcast_ref::<E>() }

  pub fn ptr_eq(&self, other: &Fault) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl Debug for Fault {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_tuple("Fault").field(&self.0.to_string()).finish()
  }
}

impl Display for Fault {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Display::fmt(&self.0, f) }
}

impl Error for Fault {
  fn source(&self) -> Option<&(dyn Error + 'static)> { Some(&*self.0) }
}

impl From<HubError> for Fault {
  fn from(err: HubError) -> Self { Fault::new(err) }
}

impl From<RxError> for Fault {
  fn from(err: RxError) -> Self { Fault::new(err) }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

// ============================================================================
// Library errors
// ============================================================================

/// Errors raised by the reactive primitives and operators.
#[derive(Debug, Error)]
pub enum RxError {
  #[error("no tokio runtime is available on this thread")]
  NoRuntime,

  #[error("handler panicked: {0}")]
  Panicked(String),
}

/// Errors raised by the [`Hub`](crate::hub::Hub).
#[derive(Debug, Error)]
pub enum HubError {
  #[error("the empty hub id is reserved for the global hub")]
  ReservedId,

  #[error("a live hub with id `{0}` already exists")]
  DuplicateId(String),

  #[error("hub `{0}` is disposed")]
  Disposed(String),

  #[error("no tokio runtime is available to dispatch on")]
  NoRuntime,

  #[error("delivery of `{message}` failed for {count} subscriber(s)")]
  DeliveryFailed { message: &'static str, count: usize },
}
