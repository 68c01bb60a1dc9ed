use std::{
  any::{type_name, Any, TypeId},
  fmt::{Debug, Formatter},
  sync::Arc,
};

use crate::error::{Fault, HubError};

/// A routable type: something the hub can register handlers and
/// interceptors under.
///
/// `ancestors` lists the base kinds and marker kinds this type belongs to.
/// The list is not closed transitively, so a kind deriving from a derived
/// kind lists the whole chain. Use [`kind!`](crate::kind) to implement it.
pub trait Kind: Any {
  fn ancestors() -> Vec<TypeId>
  where
    Self: Sized,
  {
    Vec::new()
  }
}

/// A value that can be published through a [`Hub`](super::Hub).
pub trait Message: Kind + Send + Sync {
  /// Global messages are delivered to every live hub, not only the one they
  /// were published on. Read once per publish.
  fn is_global(&self) -> bool { false }
}

/// Implement [`Kind`] for one or more types.
///
/// ```rust
/// use rxhub::{kind, prelude::*};
///
/// struct Auditable;
/// struct OrderEvent;
/// struct OrderPlaced {
///   id: u32,
/// }
///
/// kind!(Auditable, OrderEvent);
/// kind!(OrderPlaced: OrderEvent, Auditable);
/// impl Message for OrderPlaced {}
/// ```
#[macro_export]
macro_rules! kind {
  ($ty:ty : $($base:ty),+ $(,)?) => {
    impl $crate::hub::Kind for $ty {
      fn ancestors() -> ::std::vec::Vec<::std::any::TypeId> {
        ::std::vec![$(::std::any::TypeId::of::<$base>()),+]
      }
    }
  };
  ($($ty:ty),+ $(,)?) => {
    $(impl $crate::hub::Kind for $ty {})+
  };
}

/// Static routing identity of a kind.
#[derive(Clone, Debug)]
pub(crate) struct KindInfo {
  pub id: TypeId,
  pub name: &'static str,
  pub ancestors: Vec<TypeId>,
}

impl KindInfo {
  pub fn of<K: Kind>() -> Self {
    KindInfo { id: TypeId::of::<K>(), name: type_name::<K>(), ancestors: K::ancestors() }
  }

  /// Registrations match in both directions: a handler for a base kind sees
  /// derived messages, a handler for a derived kind sees base messages.
  pub fn matches(&self, published: &KindInfo) -> bool {
    self.id == published.id
      || published.ancestors.contains(&self.id)
      || self.ancestors.contains(&published.id)
  }
}

/// A published message as seen by handlers and interceptors.
///
/// Cloning is cheap; every clone refers to the same message.
#[derive(Clone)]
pub struct Envelope {
  message: Arc<dyn Any + Send + Sync>,
  kind: Arc<KindInfo>,
  global: bool,
}

impl Envelope {
  pub(crate) fn new<M: Message>(message: M) -> Self {
    let global = message.is_global();
    Envelope { message: Arc::new(message), kind: Arc::new(KindInfo::of::<M>()), global }
  }

  pub(crate) fn kind(&self) -> &KindInfo { &self.kind }

  pub fn downcast_ref<M: Any>(&self) -> Option<&M> { self.message.downcast_ref::<M>() }

  /// Shared handle to the message when it is an `M`.
  pub fn downcast<M: Any + Send + Sync>(&self) -> Option<Arc<M>> {
    self.message.clone().downcast::<M>().ok()
  }

  pub fn is<M: Any>(&self) -> bool { self.message.is::<M>() }

  /// Name of the concrete message type.
  pub fn type_name(&self) -> &'static str { self.kind.name }

  pub fn is_global(&self) -> bool { self.global }
}

impl Debug for Envelope {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Envelope")
      .field("type", &self.kind.name)
      .field("global", &self.global)
      .finish()
  }
}

/// Diagnostic published when one or more subscribers of a message failed.
///
/// Failures of `DeliveryFailed` subscribers themselves are logged but never
/// reported again.
#[derive(Clone, Debug)]
pub struct DeliveryFailed {
  pub message_type: &'static str,
  pub faults: Vec<Fault>,
}

impl DeliveryFailed {
  pub fn error(&self) -> HubError {
    HubError::DeliveryFailed { message: self.message_type, count: self.faults.len() }
  }
}

impl Kind for DeliveryFailed {}

impl Message for DeliveryFailed {}
