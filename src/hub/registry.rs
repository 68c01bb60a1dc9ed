use std::{
  collections::HashMap,
  sync::{Arc, Weak},
};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::debug;

use super::HubInner;
use crate::error::HubError;

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::default);

/// The process-wide registry of live, non-global hubs.
pub(super) fn registry() -> &'static Registry { &REGISTRY }

/// Hubs are held weakly; entries whose hub was dropped without being
/// disposed are pruned whenever the registry is touched.
#[derive(Default)]
pub(super) struct Registry {
  instances: Mutex<HashMap<String, Weak<HubInner>>>,
}

impl Registry {
  pub fn insert(&self, id: &str, hub: &Arc<HubInner>) -> Result<(), HubError> {
    let mut instances = self.instances.lock();
    if instances.get(id).is_some_and(|weak| weak.strong_count() > 0) {
      return Err(HubError::DuplicateId(id.to_string()));
    }
    instances.insert(id.to_string(), Arc::downgrade(hub));
    debug!(hub = id, live = instances.len(), "hub registered");
    Ok(())
  }

  /// Remove `hub`, unless its id has since been taken by another instance.
  pub fn remove(&self, id: &str, hub: &Arc<HubInner>) {
    let mut instances = self.instances.lock();
    if instances.get(id).is_some_and(|weak| weak.as_ptr() == Arc::as_ptr(hub)) {
      instances.remove(id);
      debug!(hub = id, live = instances.len(), "hub unregistered");
    }
  }

  /// Snapshot of the live hubs.
  pub fn live(&self) -> Vec<Arc<HubInner>> {
    let mut instances = self.instances.lock();
    instances.retain(|_, weak| weak.strong_count() > 0);
    instances.values().filter_map(Weak::upgrade).collect()
  }

  /// Empty the registry and hand back the hubs that were still alive.
  pub fn drain(&self) -> Vec<Arc<HubInner>> {
    let drained = std::mem::take(&mut *self.instances.lock());
    drained.into_values().filter_map(|weak| weak.upgrade()).collect()
  }

  pub fn ids(&self) -> Vec<String> {
    let mut instances = self.instances.lock();
    instances.retain(|_, weak| weak.strong_count() > 0);
    let mut ids: Vec<_> = instances.keys().cloned().collect();
    ids.sort();
    ids
  }
}
