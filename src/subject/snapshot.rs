use std::sync::Arc;

/// Copy-on-write, insertion-ordered list with id-based removal.
///
/// Dispatchers take a [`Snapshot::snapshot`] (an `Arc` clone) while holding
/// the owner's lock and iterate it after releasing the lock. Mutations go
/// through `Arc::make_mut`, so the backing vector is only copied when a
/// dispatch still holds the previous version.
///
/// The same item may be inserted more than once; every insertion gets its
/// own id.
pub(crate) struct Snapshot<Ob> {
  next_id: usize,
  entries: Arc<Vec<(usize, Ob)>>,
}

impl<Ob> Default for Snapshot<Ob> {
  fn default() -> Self { Self { next_id: 0, entries: Arc::default() } }
}

impl<Ob: Clone> Snapshot<Ob> {
  /// Append an item and return its unique id.
  pub fn add(&mut self, item: Ob) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    Arc::make_mut(&mut self.entries).push((id, item));
    id
  }

  /// Remove the item with `id`.
  pub fn remove(&mut self, id: usize) -> Option<Ob> {
    let pos = self.entries.iter().position(|(i, _)| *i == id)?;
    Some(Arc::make_mut(&mut self.entries).remove(pos).1)
  }

  /// Keep only the items `keep` accepts.
  pub fn retain(&mut self, mut keep: impl FnMut(&Ob) -> bool) {
    if self.entries.iter().all(|(_, ob)| keep(ob)) {
      return;
    }
    Arc::make_mut(&mut self.entries).retain(|(_, ob)| keep(ob));
  }
}

impl<Ob> Snapshot<Ob> {
  /// Immutable view of the current entries.
  #[inline]
  pub fn snapshot(&self) -> Arc<Vec<(usize, Ob)>> { self.entries.clone() }

  /// Take every entry out, leaving the list empty.
  pub fn take(&mut self) -> Arc<Vec<(usize, Ob)>> { std::mem::take(&mut self.entries) }

  #[inline]
  pub fn len(&self) -> usize { self.entries.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}
