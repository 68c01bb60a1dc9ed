//! # rxhub: an in-process reactive event substrate
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use rxhub::prelude::*;
//!
//! let temperature = Subject::<i32>::new();
//! let alerts = Arc::new(Mutex::new(vec![]));
//! let c_alerts = alerts.clone();
//!
//! temperature
//!   .distinct()
//!   .filter(|t| *t > 30)
//!   .subscribe_fn(move |t| c_alerts.lock().unwrap().push(t));
//!
//! for t in [25, 31, 31, 29, 35] {
//!   temperature.on_next(t);
//! }
//! assert_eq!(*alerts.lock().unwrap(), vec![31, 35]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Subject`] / [`BehaviorSubject`] | Multicast a stream to registered observers |
//! | [`BackingField`] | A change-tracked value with before/after change streams |
//! | [`ObservableExt`] | Operators: filter, map, map_async, distinct, throttle |
//! | [`Hub`] | Typed publish/subscribe with interceptors and global broadcast |
//! | [`Token`] | Scopes registrations; cancelling it removes them |
//!
//! Hub dispatch, throttle timers and async transforms run on the ambient
//! tokio runtime; subjects and the synchronous operators need no runtime.
//!
//! [`Subject`]: subject::Subject
//! [`BehaviorSubject`]: subject::BehaviorSubject
//! [`BackingField`]: backing_field::BackingField
//! [`ObservableExt`]: ops::ObservableExt
//! [`Hub`]: hub::Hub
//! [`Token`]: token::Token

pub mod backing_field;
pub mod error;
pub mod hub;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod outcome;
pub mod prelude;
pub mod scheduler;
pub mod subject;
pub mod subscription;
pub mod token;

// Re-export the prelude module
pub use prelude::*;

#[cfg(doctest)]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
