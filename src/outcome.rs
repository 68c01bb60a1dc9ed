//! Outcome of an interception or delivery step.

use std::fmt::{Display, Formatter};

use crate::error::Fault;

/// Result of running an interceptor or of a whole publish.
///
/// Interceptors normally answer [`Outcome::Success`] or [`Outcome::Fail`];
/// the hub produces [`Outcome::Exception`] when an interceptor errors or
/// panics and [`Outcome::Cancelled`] when the publish never ran.
#[derive(Clone, Debug, Default)]
pub enum Outcome {
  #[default]
  Success,
  Fail,
  Exception(Fault),
  Cancelled,
}

impl Outcome {
  #[inline]
  pub fn is_success(&self) -> bool { matches!(self, Outcome::Success) }

  /// `Success` when `ok` is true, `Fail` otherwise.
  #[inline]
  pub fn from_bool(ok: bool) -> Self { if ok { Outcome::Success } else { Outcome::Fail } }

  /// Keep the first non-success outcome of the two.
  pub fn and(self, other: Outcome) -> Outcome { if self.is_success() { other } else { self } }

  pub fn fault(&self) -> Option<&Fault> {
    match self {
      Outcome::Exception(fault) => Some(fault),
      _ => None,
    }
  }
}

impl From<bool> for Outcome {
  fn from(ok: bool) -> Self { Outcome::from_bool(ok) }
}

impl From<Result<(), Fault>> for Outcome {
  fn from(res: Result<(), Fault>) -> Self {
    match res {
      Ok(()) => Outcome::Success,
      Err(fault) => Outcome::Exception(fault),
    }
  }
}

impl Display for Outcome {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Outcome::Success => f.write_str("success"),
      Outcome::Fail => f.write_str("fail"),
      Outcome::Exception(fault) => write!(f, "exception: {fault}"),
      Outcome::Cancelled => f.write_str("cancelled"),
    }
  }
}
