//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Change tracking
pub use crate::backing_field::{BackingField, Comparer, ValueChanged, ValueChanging};
// Errors and outcomes
pub use crate::error::{Fault, HubError, RxError};
// Hub
pub use crate::hub::{
  Delivery, DeliveryFailed, DeliveryMode, Envelope, Hub, HubBuilder, HubOptions, Kind, Message,
  RegistrationCounts,
};
// Core traits
pub use crate::observable::{BoxedObservable, Observable};
pub use crate::observer::{ArcObserver, FnObserver, Observer, ObserverFns};
// Operators
pub use crate::ops::{
  from_broadcast, from_handler, Distinct, Filter, FromBroadcast, FromHandler, Handler, Map,
  MapAsync, ObservableExt, Throttle,
};
pub use crate::outcome::Outcome;
// Scheduling
pub use crate::scheduler::{Scheduler, TaskHandle};
// Subject
pub use crate::subject::{BehaviorSubject, Subject};
// Subscription
pub use crate::subscription::{Subscription, SubscriptionGuard};
pub use crate::token::Token;
