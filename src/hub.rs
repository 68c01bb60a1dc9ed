//! Typed publish/subscribe hub.
//!
//! Handlers and interceptors register under a [`Kind`] and stay registered
//! until the [`Token`] they were registered with is cancelled. A publish
//! matches every registration whose kind equals the message type or lies on
//! its lineage in either direction, runs the matching interceptors in
//! ascending `order` and, if all of them succeed, hands the message to every
//! matching handler.
//!
//! ```rust
//! use rxhub::{kind, prelude::*};
//!
//! struct OrderEvent;
//! struct OrderPlaced(u32);
//! kind!(OrderEvent);
//! kind!(OrderPlaced: OrderEvent);
//! impl Message for OrderPlaced {}
//!
//! #[tokio::main]
//! async fn main() -> Result<(), HubError> {
//!   let hub = Hub::new();
//!   let token = Token::new();
//!
//!   hub.intercept::<OrderEvent, _, _>(|_| async { Outcome::Success }, 0, &token)?;
//!   hub.subscribe::<OrderEvent, _, _>(
//!     |envelope| async move {
//!       if let Some(OrderPlaced(id)) = envelope.downcast_ref::<OrderPlaced>() {
//!         println!("order {id} placed");
//!       }
//!       Ok(())
//!     },
//!     &token,
//!   )?;
//!
//!   assert!(hub.publish(OrderPlaced(7)).await.is_success());
//!   token.cancel();
//!   Ok(())
//! }
//! ```
//!
//! Messages whose [`Message::is_global`] is true are delivered to every live
//! hub, including the [global hub](Hub::global).

mod delivery;
mod message;
mod registry;
mod table;

use std::{
  fmt::{Debug, Display, Formatter},
  future::Future,
  panic::AssertUnwindSafe,
  sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
  },
};

pub use delivery::Delivery;
use futures::{
  future::{join_all, BoxFuture},
  FutureExt,
};
pub use message::{DeliveryFailed, Envelope, Kind, Message};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, warn};

use self::{
  message::KindInfo,
  registry::registry,
  table::{Handler, Interceptor, Slot, Table},
};
use crate::{
  error::{Fault, HubError},
  outcome::Outcome,
  scheduler::Scheduler,
  token::Token,
};

// ============================================================================
// Configuration
// ============================================================================

/// How the handlers matched by one publish are invoked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeliveryMode {
  /// All handlers run concurrently within the dispatch task.
  #[default]
  Concurrent,
  /// Handlers run one after another, in registration order.
  Sequential,
}

#[derive(Clone, Debug)]
pub struct HubOptions {
  pub delivery: DeliveryMode,
  /// Publish a [`DeliveryFailed`] diagnostic when handlers fail.
  pub report_failures: bool,
  /// Deliver global messages to every live hub.
  pub global_fanout: bool,
}

impl Default for HubOptions {
  fn default() -> Self {
    HubOptions { delivery: DeliveryMode::Concurrent, report_failures: true, global_fanout: true }
  }
}

/// Builder for a named or configured [`Hub`].
#[derive(Debug, Default)]
pub struct HubBuilder {
  id: Option<String>,
  options: HubOptions,
}

impl HubBuilder {
  pub fn id(mut self, id: impl Into<String>) -> Self {
    self.id = Some(id.into());
    self
  }

  pub fn delivery(mut self, mode: DeliveryMode) -> Self {
    self.options.delivery = mode;
    self
  }

  pub fn report_failures(mut self, report: bool) -> Self {
    self.options.report_failures = report;
    self
  }

  pub fn global_fanout(mut self, fanout: bool) -> Self {
    self.options.global_fanout = fanout;
    self
  }

  pub fn options(mut self, options: HubOptions) -> Self {
    self.options = options;
    self
  }

  /// Fails when the id is empty or already used by a live hub.
  pub fn build(self) -> Result<Hub, HubError> {
    let Some(id) = self.id else { return Ok(Hub::anonymous(self.options)) };
    if id.is_empty() {
      return Err(HubError::ReservedId);
    }
    let inner = Arc::new(HubInner::new(id, false, self.options));
    registry().insert(&inner.id, &inner)?;
    Ok(Hub { inner })
  }
}

/// Number of live registrations on a hub.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistrationCounts {
  pub interceptors: usize,
  pub handlers: usize,
}

// ============================================================================
// Hub
// ============================================================================

static GLOBAL: Lazy<Hub> = Lazy::new(|| Hub {
  inner: Arc::new(HubInner::new(String::new(), true, HubOptions::default())),
});

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

/// A typed message hub. Clones share the same registrations.
#[derive(Clone)]
pub struct Hub {
  inner: Arc<HubInner>,
}

pub(crate) struct HubInner {
  id: String,
  global: bool,
  options: HubOptions,
  disposed: AtomicBool,
  tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
  interceptors: Table<Interceptor>,
  handlers: Table<Handler>,
}

impl Hub {
  /// A hub with a generated id (`hub-N`) and default options.
  pub fn new() -> Hub { Hub::anonymous(HubOptions::default()) }

  /// A hub registered under `id`.
  pub fn with_id(id: impl Into<String>) -> Result<Hub, HubError> { Hub::builder().id(id).build() }

  pub fn builder() -> HubBuilder { HubBuilder::default() }

  /// The process-wide hub with the empty id.
  ///
  /// It tracks every other live hub: global messages published anywhere
  /// reach them all, and disposing it disposes them all. The global hub
  /// itself is never disposed and keeps accepting registrations.
  pub fn global() -> Hub { GLOBAL.clone() }

  fn anonymous(options: HubOptions) -> Hub {
    loop {
      let id = format!("hub-{}", NEXT_ID.fetch_add(1, Ordering::Relaxed));
      let inner = Arc::new(HubInner::new(id, false, options.clone()));
      if registry().insert(&inner.id, &inner).is_ok() {
        return Hub { inner };
      }
    }
  }

  pub fn id(&self) -> &str { &self.inner.id }

  pub fn is_global(&self) -> bool { self.inner.global }

  pub fn is_disposed(&self) -> bool { self.inner.is_disposed() }

  pub fn options(&self) -> &HubOptions { &self.inner.options }

  /// Ids of the live hubs known to the global hub, sorted. Empty on any
  /// other hub.
  pub fn instances(&self) -> Vec<String> {
    if self.inner.global {
      registry().ids()
    } else {
      Vec::new()
    }
  }

  pub fn registration_counts(&self) -> RegistrationCounts {
    let tables = self.inner.tables.lock();
    RegistrationCounts { interceptors: tables.interceptors.len(), handlers: tables.handlers.len() }
  }

  // ==========================================================================
  // Registration
  // ==========================================================================

  /// Deliver every published message matching `K` to `deliver` until `token`
  /// is cancelled.
  ///
  /// Returning `Err` or panicking counts as a delivery failure; it never
  /// reaches the publisher or other handlers.
  pub fn subscribe<K, F, Fut>(&self, deliver: F, token: &Token) -> Result<(), HubError>
  where
    K: Kind,
    F: Fn(Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Fault>> + Send + 'static,
  {
    let handler = Handler { filter: None, deliver: Box::new(move |envelope| deliver(envelope).boxed()) };
    self.register::<K>(
      token,
      "handler",
      |tables, kind| tables.handlers.add(kind, handler),
      |tables, slot| tables.handlers.remove(slot),
    )
  }

  /// Like [`Hub::subscribe`], skipping messages rejected by `filter`.
  pub fn subscribe_where<K, P, F, Fut>(&self, filter: P, deliver: F, token: &Token) -> Result<(), HubError>
  where
    K: Kind,
    P: Fn(&Envelope) -> bool + Send + Sync + 'static,
    F: Fn(Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Fault>> + Send + 'static,
  {
    let handler = Handler {
      filter: Some(Box::new(filter)),
      deliver: Box::new(move |envelope| deliver(envelope).boxed()),
    };
    self.register::<K>(
      token,
      "handler",
      |tables, kind| tables.handlers.add(kind, handler),
      |tables, slot| tables.handlers.remove(slot),
    )
  }

  /// Run `intercept` before delivery of every message matching `K`.
  ///
  /// Interceptors run one at a time in ascending `order`, ties in
  /// registration order. Anything but [`Outcome::Success`] stops the
  /// publish.
  pub fn intercept<K, F, Fut>(&self, intercept: F, order: i32, token: &Token) -> Result<(), HubError>
  where
    K: Kind,
    F: Fn(Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
  {
    let interceptor = Interceptor { order, run: Box::new(move |envelope| intercept(envelope).boxed()) };
    self.register::<K>(
      token,
      "interceptor",
      |tables, kind| tables.interceptors.add(kind, interceptor),
      |tables, slot| tables.interceptors.remove(slot),
    )
  }

  fn register<K: Kind>(
    &self, token: &Token, what: &'static str, add: impl FnOnce(&mut Tables, KindInfo) -> Slot,
    remove: fn(&mut Tables, Slot) -> bool,
  ) -> Result<(), HubError> {
    if self.is_disposed() {
      warn!(hub = %self.inner.id, what, "registration on a disposed hub");
      return Err(HubError::Disposed(self.inner.id.clone()));
    }
    if token.is_cancelled() {
      return Ok(());
    }

    let kind = KindInfo::of::<K>();
    debug!(hub = %self.inner.id, kind = kind.name, what, "register");
    let slot = add(&mut *self.inner.tables.lock(), kind);

    let hub = Arc::downgrade(&self.inner);
    token.register(move || {
      let Some(hub) = hub.upgrade() else { return };
      if remove(&mut *hub.tables.lock(), slot) {
        debug!(hub = %hub.id, what, "unregister");
      }
    });
    Ok(())
  }

  // ==========================================================================
  // Publishing
  // ==========================================================================

  /// Publish `message` without waiting for it to be delivered.
  ///
  /// Dispatch runs on the ambient tokio runtime; the returned [`Delivery`]
  /// resolves once the interceptors ran and every matching handler was
  /// attempted. Outside a runtime nothing is dispatched and the delivery
  /// resolves to an [`HubError::NoRuntime`] exception.
  pub fn publish<M: Message>(&self, message: M) -> Delivery {
    let envelope = Envelope::new(message);
    if self.is_disposed() {
      debug!(hub = %self.inner.id, message = envelope.type_name(), "publish on a disposed hub");
      return Delivery::resolved(Outcome::Cancelled);
    }
    let scheduler = match Scheduler::current() {
      Ok(scheduler) => scheduler,
      Err(_) => {
        warn!(hub = %self.inner.id, message = envelope.type_name(), "publish outside a tokio runtime");
        return Delivery::resolved(Outcome::Exception(HubError::NoRuntime.into()));
      }
    };

    let targets = if envelope.is_global() && self.inner.options.global_fanout {
      global_targets()
    } else {
      vec![self.inner.clone()]
    };
    debug!(
      hub = %self.inner.id,
      message = envelope.type_name(),
      targets = targets.len(),
      "publish"
    );

    let (delivery, resolver) = Delivery::channel();
    scheduler.spawn(async move {
      let dispatches = targets.into_iter().map(|hub| hub.dispatch(envelope.clone()));
      let outcome = join_all(dispatches)
        .await
        .into_iter()
        .fold(Outcome::Success, Outcome::and);
      resolver.resolve(outcome);
    });
    delivery
  }

  // ==========================================================================
  // Teardown
  // ==========================================================================

  /// Drop every registration but keep the hub usable.
  pub fn unsubscribe_all(&self) { self.inner.clear() }

  /// Drop every registration and stop accepting new ones.
  ///
  /// Publishes already in flight finish against the registrations they
  /// matched. Disposing the global hub disposes every registered hub and
  /// clears the global hub's own registrations.
  pub fn dispose(&self) {
    if self.inner.global {
      let hubs = registry().drain();
      debug!(count = hubs.len(), "disposing every registered hub");
      for hub in hubs {
        hub.shutdown();
      }
      self.inner.clear();
    } else if self.inner.shutdown() {
      registry().remove(&self.inner.id, &self.inner);
    }
  }
}

impl Default for Hub {
  fn default() -> Self { Hub::new() }
}

impl Display for Hub {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    if self.inner.global {
      f.write_str("Hub(<global>)")
    } else {
      write!(f, "Hub({})", self.inner.id)
    }
  }
}

impl Debug for Hub {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Hub")
      .field("id", &self.inner.id)
      .field("global", &self.inner.global)
      .field("disposed", &self.is_disposed())
      .field("registrations", &self.registration_counts())
      .finish()
  }
}

/// Every live, undisposed hub plus the global hub.
fn global_targets() -> Vec<Arc<HubInner>> {
  let mut hubs = registry().live();
  hubs.retain(|hub| !hub.is_disposed());
  hubs.push(GLOBAL.inner.clone());
  hubs
}

// ============================================================================
// Dispatch
// ============================================================================

impl HubInner {
  fn new(id: String, global: bool, options: HubOptions) -> Self {
    HubInner { id, global, options, disposed: AtomicBool::new(false), tables: Mutex::default() }
  }

  fn is_disposed(&self) -> bool { self.disposed.load(Ordering::Acquire) }

  fn clear(&self) {
    let mut tables = self.tables.lock();
    tables.interceptors.clear();
    tables.handlers.clear();
  }

  /// Mark disposed and clear. False when it already was disposed.
  fn shutdown(&self) -> bool {
    if self.disposed.swap(true, Ordering::AcqRel) {
      return false;
    }
    self.clear();
    debug!(hub = %self.id, "hub disposed");
    true
  }

  async fn dispatch(self: Arc<Self>, envelope: Envelope) -> Outcome {
    if self.is_disposed() {
      return Outcome::Cancelled;
    }

    let mut interceptors = self.tables.lock().interceptors.matching(envelope.kind());
    interceptors.sort_by_key(|interceptor| interceptor.order);
    for interceptor in interceptors {
      let order = interceptor.order;
      let message = envelope.clone();
      let outcome = guarded(move || (interceptor.run)(message))
        .await
        .unwrap_or_else(Outcome::Exception);
      if !outcome.is_success() {
        debug!(hub = %self.id, message = envelope.type_name(), order, %outcome, "publish intercepted");
        return outcome;
      }
    }

    let handlers = self.tables.lock().handlers.matching(envelope.kind());
    let faults: Vec<Fault> = match self.options.delivery {
      DeliveryMode::Concurrent => {
        let deliveries = handlers
          .into_iter()
          .map(|handler| deliver(handler, envelope.clone()));
        join_all(deliveries)
          .await
          .into_iter()
          .filter_map(Result::err)
          .collect()
      }
      DeliveryMode::Sequential => {
        let mut faults = Vec::new();
        for handler in handlers {
          if let Err(fault) = deliver(handler, envelope.clone()).await {
            faults.push(fault);
          }
        }
        faults
      }
    };

    if !faults.is_empty() {
      self.report(&envelope, faults);
    }
    Outcome::Success
  }

  fn report(self: &Arc<Self>, envelope: &Envelope, faults: Vec<Fault>) {
    for fault in &faults {
      warn!(hub = %self.id, message = envelope.type_name(), %fault, "subscriber delivery failed");
    }
    if !self.options.report_failures || envelope.is::<DeliveryFailed>() {
      return;
    }
    let diagnostic = DeliveryFailed { message_type: envelope.type_name(), faults };
    drop(Hub { inner: self.clone() }.publish(diagnostic));
  }
}

async fn deliver(handler: Arc<Handler>, envelope: Envelope) -> Result<(), Fault> {
  if let Some(filter) = &handler.filter {
    let accepted =
      std::panic::catch_unwind(AssertUnwindSafe(|| filter(&envelope))).map_err(Fault::from_panic)?;
    if !accepted {
      return Ok(());
    }
  }
  guarded(move || (handler.deliver)(envelope)).await?
}

/// Run a user callback and its future, turning panics into faults.
async fn guarded<T>(call: impl FnOnce() -> BoxFuture<'static, T>) -> Result<T, Fault> {
  let future = std::panic::catch_unwind(AssertUnwindSafe(call)).map_err(Fault::from_panic)?;
  AssertUnwindSafe(future).catch_unwind().await.map_err(Fault::from_panic)
}
