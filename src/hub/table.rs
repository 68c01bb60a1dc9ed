use std::{any::TypeId, collections::HashMap, sync::Arc};

use futures::future::BoxFuture;

use super::message::{Envelope, KindInfo};
use crate::{error::Fault, outcome::Outcome, subject::Snapshot};

pub(crate) type InterceptFn = dyn Fn(Envelope) -> BoxFuture<'static, Outcome> + Send + Sync;
pub(crate) type DeliverFn = dyn Fn(Envelope) -> BoxFuture<'static, Result<(), Fault>> + Send + Sync;
pub(crate) type FilterFn = dyn Fn(&Envelope) -> bool + Send + Sync;

pub(crate) struct Interceptor {
  pub order: i32,
  pub run: Box<InterceptFn>,
}

pub(crate) struct Handler {
  pub filter: Option<Box<FilterFn>>,
  pub deliver: Box<DeliverFn>,
}

/// Where a registration lives, for removal.
///
/// `seq` is unique for the lifetime of the table, so a slot whose entry was
/// already cleared never matches a later registration.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Slot {
  kind: TypeId,
  seq: u64,
}

struct Group<E> {
  kind: KindInfo,
  entries: Snapshot<(u64, Arc<E>)>,
}

/// Registrations of one sort, grouped by the kind they were registered
/// under.
///
/// Each group is a copy-on-write list; [`Table::matching`] clones the
/// matching entries out so the caller can dispatch without the lock.
pub(crate) struct Table<E> {
  groups: HashMap<TypeId, Group<E>>,
  next_seq: u64,
}

impl<E> Default for Table<E> {
  fn default() -> Self { Table { groups: HashMap::new(), next_seq: 0 } }
}

impl<E> Table<E> {
  pub fn add(&mut self, kind: KindInfo, entry: E) -> Slot {
    let seq = self.next_seq;
    self.next_seq += 1;
    let type_id = kind.id;
    let group = self
      .groups
      .entry(type_id)
      .or_insert_with(|| Group { kind, entries: Snapshot::default() });
    group.entries.add((seq, Arc::new(entry)));
    Slot { kind: type_id, seq }
  }

  pub fn remove(&mut self, slot: Slot) -> bool {
    let Some(group) = self.groups.get_mut(&slot.kind) else { return false };
    let before = group.entries.len();
    group.entries.retain(|(seq, _)| *seq != slot.seq);
    let removed = group.entries.len() < before;
    if group.entries.is_empty() {
      self.groups.remove(&slot.kind);
    }
    removed
  }

  /// Every entry whose group matches `published`, in registration order.
  ///
  /// An entry lives in exactly one group, so the result holds no duplicates.
  pub fn matching(&self, published: &KindInfo) -> Vec<Arc<E>> {
    let mut found: Vec<(u64, Arc<E>)> = self
      .groups
      .values()
      .filter(|group| group.kind.matches(published))
      .flat_map(|group| group.entries.snapshot().iter().map(|(_, e)| e.clone()).collect::<Vec<_>>())
      .collect();
    found.sort_by_key(|(seq, _)| *seq);
    found.into_iter().map(|(_, entry)| entry).collect()
  }

  pub fn len(&self) -> usize { self.groups.values().map(|g| g.entries.len()).sum() }

  pub fn clear(&mut self) { self.groups.clear() }
}
