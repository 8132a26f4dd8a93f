use std::collections::HashMap;

use crate::ItemId;

/// Maps logical indices to stable ids and back.
///
/// Implementations must keep the two directions inverse: for every `i < item_count()`,
/// `index_for_id(id_for_index(i)) == Some(i)`. Ids that are not currently present (removed or
/// filtered out) return `None`.
pub trait IdentityMap {
    fn item_count(&self) -> usize;

    fn id_for_index(&self, index: usize) -> ItemId;

    fn index_for_id(&self, id: ItemId) -> Option<usize>;
}

/// Lets an [`ItemFactory`] ask for another window rebuild while one is executing.
///
/// The request is queued for the next tick instead of recursing into the rebuild.
#[derive(Debug, Default)]
pub struct BindContext {
    rebuild_requested: bool,
}

impl BindContext {
    pub fn request_rebuild(&mut self) {
        self.rebuild_requested = true;
    }

    pub fn rebuild_requested(&self) -> bool {
        self.rebuild_requested
    }
}

/// Creates and recycles the view items realized for visible rows.
pub trait ItemFactory {
    type Handle;

    fn make_item(&mut self) -> Self::Handle;

    fn bind_item(&mut self, handle: &mut Self::Handle, index: usize, cx: &mut BindContext);

    fn unbind_item(&mut self, handle: &mut Self::Handle, index: usize);

    fn destroy_item(&mut self, handle: Self::Handle);
}

/// A ready-made [`IdentityMap`] over an ordered list of ids.
///
/// Useful for adapters whose data source is a plain `Vec`: mutate the order with the provided
/// methods and the reverse map stays consistent.
#[derive(Clone, Debug, Default)]
pub struct IdList {
    ids: Vec<ItemId>,
    positions: HashMap<ItemId, usize>,
}

impl IdList {
    pub fn new(ids: impl IntoIterator<Item = ItemId>) -> Self {
        let mut list = Self::default();
        list.replace(ids);
        list
    }

    /// Creates a list whose ids equal their initial indices.
    pub fn sequential(count: usize) -> Self {
        Self::new(0..count as ItemId)
    }

    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    /// Replaces the whole order. Duplicate ids keep their first position only.
    pub fn replace(&mut self, ids: impl IntoIterator<Item = ItemId>) {
        self.ids.clear();
        self.positions.clear();
        for id in ids {
            if self.positions.contains_key(&id) {
                continue;
            }
            self.positions.insert(id, self.ids.len());
            self.ids.push(id);
        }
    }

    pub fn insert(&mut self, index: usize, id: ItemId) -> bool {
        if self.positions.contains_key(&id) {
            return false;
        }
        let index = index.min(self.ids.len());
        self.ids.insert(index, id);
        self.reindex_from(index);
        true
    }

    pub fn push(&mut self, id: ItemId) -> bool {
        let len = self.ids.len();
        self.insert(len, id)
    }

    pub fn remove_id(&mut self, id: ItemId) -> Option<usize> {
        let index = self.positions.remove(&id)?;
        self.ids.remove(index);
        self.reindex_from(index);
        Some(index)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(ItemId) -> bool) {
        self.ids.retain(|&id| keep(id));
        self.positions.clear();
        self.reindex_from(0);
    }

    pub fn reverse(&mut self) {
        self.ids.reverse();
        self.reindex_from(0);
    }

    fn reindex_from(&mut self, start: usize) {
        for (i, &id) in self.ids.iter().enumerate().skip(start) {
            self.positions.insert(id, i);
        }
    }
}

impl IdentityMap for IdList {
    fn item_count(&self) -> usize {
        self.ids.len()
    }

    // Out-of-range indices map to `ItemId::MAX`, which `index_for_id` never resolves.
    fn id_for_index(&self, index: usize) -> ItemId {
        self.ids.get(index).copied().unwrap_or(ItemId::MAX)
    }

    fn index_for_id(&self, id: ItemId) -> Option<usize> {
        self.positions.get(&id).copied()
    }
}

impl<T: IdentityMap + ?Sized> IdentityMap for &T {
    fn item_count(&self) -> usize {
        (**self).item_count()
    }

    fn id_for_index(&self, index: usize) -> ItemId {
        (**self).id_for_index(index)
    }

    fn index_for_id(&self, id: ItemId) -> Option<usize> {
        (**self).index_for_id(id)
    }
}
