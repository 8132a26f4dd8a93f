use std::cell::Cell;
use std::collections::HashSet;
use std::sync::Arc;

use crate::{IdentityMap, ItemId};

/// A callback fired once per observable selection change.
pub type SelectionChangeCallback = Arc<dyn Fn(&SelectionModel) + Send + Sync>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SelectionMode {
    /// Every mutation is ignored.
    None,
    /// At most one index is selected.
    #[default]
    Single,
    /// Any number of indices; enables range selection and `select_all`.
    Multiple,
}

/// Which edge of the current selection anchors the next range selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RangeDirection {
    /// The last range grew towards higher indices; the anchor is the minimum.
    #[default]
    Down,
    /// The last range grew towards lower indices; the anchor is the maximum.
    Up,
}

/// Tracks selected items by transient index and by stable id.
///
/// Indices are kept in insertion order, which drives "first selected" semantics. Ids are kept
/// in the same order and are the only part that survives a structural change of the data
/// source: call [`SelectionModel::mark_stale`] when the source changes and
/// [`SelectionModel::sync`] before reading indices again.
#[derive(Clone)]
pub struct SelectionModel {
    mode: SelectionMode,
    indices: Vec<usize>,
    ids: Vec<ItemId>,
    index_set: HashSet<usize>,
    id_set: HashSet<ItemId>,
    // (min, max) of `indices`; `None` means unknown.
    bounds: Cell<Option<(usize, usize)>>,
    direction: RangeDirection,
    stale: bool,
    revision: Cell<u64>,
    on_change: Option<SelectionChangeCallback>,
    notify_depth: Cell<usize>,
    notify_pending: Cell<bool>,
}

impl Default for SelectionModel {
    fn default() -> Self {
        Self::new(SelectionMode::default())
    }
}

impl core::fmt::Debug for SelectionModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SelectionModel")
            .field("mode", &self.mode)
            .field("indices", &self.indices)
            .field("ids", &self.ids)
            .field("direction", &self.direction)
            .field("stale", &self.stale)
            .field("revision", &self.revision.get())
            .finish_non_exhaustive()
    }
}

impl SelectionModel {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            indices: Vec::new(),
            ids: Vec::new(),
            index_set: HashSet::new(),
            id_set: HashSet::new(),
            bounds: Cell::new(None),
            direction: RangeDirection::default(),
            stale: false,
            revision: Cell::new(0),
            on_change: None,
            notify_depth: Cell::new(0),
            notify_pending: Cell::new(false),
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Changes the mode, trimming the current selection to what the new mode allows.
    pub fn set_mode(&mut self, mode: SelectionMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        let keep = match mode {
            SelectionMode::None => 0,
            SelectionMode::Single => 1,
            SelectionMode::Multiple => return,
        };
        if self.indices.len() > keep {
            let indices: Vec<usize> = self.indices.iter().copied().take(keep).collect();
            let ids: Vec<ItemId> = self.ids.iter().copied().take(keep).collect();
            self.commit(indices, ids);
            self.notify();
        }
    }

    pub fn set_on_change(
        &mut self,
        on_change: Option<impl Fn(&SelectionModel) + Send + Sync + 'static>,
    ) {
        self.on_change = on_change.map(|f| Arc::new(f) as _);
    }

    /// Increments once per change notification. `set_without_notify` does not bump it.
    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Selected indices in selection order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Selected ids, parallel to [`Self::indices`].
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, ItemId)> + '_ {
        self.indices.iter().copied().zip(self.ids.iter().copied())
    }

    pub fn contains(&self, index: usize) -> bool {
        self.index_set.contains(&index)
    }

    pub fn contains_id(&self, id: ItemId) -> bool {
        self.id_set.contains(&id)
    }

    pub fn first_index(&self) -> Option<usize> {
        self.indices.first().copied()
    }

    pub fn first_id(&self) -> Option<ItemId> {
        self.ids.first().copied()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.indices.last().copied()
    }

    pub fn min_index(&self) -> Option<usize> {
        self.bounds().map(|(min, _)| min)
    }

    pub fn max_index(&self) -> Option<usize> {
        self.bounds().map(|(_, max)| max)
    }

    pub fn range_direction(&self) -> RangeDirection {
        self.direction
    }

    /// The edge the next range selection starts from.
    pub fn anchor_index(&self) -> Option<usize> {
        match self.direction {
            RangeDirection::Down => self.min_index(),
            RangeDirection::Up => self.max_index(),
        }
    }

    /// Re-points the range anchor at `anchor` if it is one of the selection's edges.
    pub fn set_anchor_index(&mut self, anchor: usize) {
        if self.max_index() == Some(anchor) && self.min_index() != Some(anchor) {
            self.direction = RangeDirection::Up;
        } else if self.min_index() == Some(anchor) {
            self.direction = RangeDirection::Down;
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Flags the index side as out of date after a structural change of the data source.
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Resyncs if the model was marked stale. Returns whether the selection changed.
    pub fn sync(&mut self, source: &impl IdentityMap) -> bool {
        if !self.stale {
            return false;
        }
        self.refresh(source)
    }

    /// Re-derives indices from ids.
    ///
    /// Ids that no longer resolve are dropped; ids whose index moved take the new index. The
    /// id order is preserved. Fires at most one notification.
    pub fn refresh(&mut self, source: &impl IdentityMap) -> bool {
        self.stale = false;
        let mut changed = false;
        let mut indices = Vec::with_capacity(self.ids.len());
        let mut ids = Vec::with_capacity(self.ids.len());
        let mut seen = HashSet::with_capacity(self.ids.len());

        for (pos, &id) in self.ids.iter().enumerate() {
            let Some(index) = source.index_for_id(id) else {
                ltrace!(id, "selection: dropping detached id");
                changed = true;
                continue;
            };
            if !seen.insert(index) {
                lwarn!(id, index, "selection: identity map resolved two ids to one index");
                changed = true;
                continue;
            }
            if self.indices.get(pos) != Some(&index) {
                changed = true;
            }
            indices.push(index);
            ids.push(id);
        }

        self.commit(indices, ids);
        if changed {
            self.notify();
        }
        changed
    }

    /// Adds `index`. In single mode this replaces the selection.
    pub fn add(&mut self, source: &impl IdentityMap, index: usize) -> bool {
        if !self.in_bounds(source, index) {
            return false;
        }
        match self.mode {
            SelectionMode::None => false,
            SelectionMode::Single => self.set(source, [index]),
            SelectionMode::Multiple => {
                if self.index_set.contains(&index) {
                    return false;
                }
                self.push(index, source.id_for_index(index));
                self.notify();
                true
            }
        }
    }

    pub fn remove(&mut self, index: usize) -> bool {
        if !self.index_set.remove(&index) {
            return false;
        }
        if let Some(pos) = self.indices.iter().position(|&i| i == index) {
            self.indices.remove(pos);
            let id = self.ids.remove(pos);
            self.id_set.remove(&id);
        }
        self.bounds.set(None);
        self.notify();
        true
    }

    /// Flips membership of a single index without touching the rest of the selection.
    pub fn toggle(&mut self, source: &impl IdentityMap, index: usize) -> bool {
        if self.contains(index) {
            self.remove(index)
        } else {
            self.add(source, index)
        }
    }

    /// Replaces the selection with `indices`, in order.
    ///
    /// Setting the same ordered sequence again is a no-op and does not notify.
    pub fn set(
        &mut self,
        source: &impl IdentityMap,
        indices: impl IntoIterator<Item = usize>,
    ) -> bool {
        let changed = self.set_inner(source, indices);
        if changed {
            self.notify();
        }
        changed
    }

    /// Same as [`Self::set`] but never fires the change callback.
    pub fn set_without_notify(
        &mut self,
        source: &impl IdentityMap,
        indices: impl IntoIterator<Item = usize>,
    ) -> bool {
        self.set_inner(source, indices)
    }

    /// Replaces the selection by id. Ids that do not resolve are skipped.
    pub fn set_ids(
        &mut self,
        source: &impl IdentityMap,
        ids: impl IntoIterator<Item = ItemId>,
    ) -> bool {
        let indices: Vec<usize> = ids
            .into_iter()
            .filter_map(|id| source.index_for_id(id))
            .collect();
        self.set(source, indices)
    }

    pub fn clear(&mut self) -> bool {
        self.direction = RangeDirection::default();
        if self.indices.is_empty() {
            return false;
        }
        self.commit(Vec::new(), Vec::new());
        self.notify();
        true
    }

    /// Selects every index of `source`. Only valid in multiple mode.
    pub fn select_all(&mut self, source: &impl IdentityMap) -> bool {
        if self.mode != SelectionMode::Multiple {
            return false;
        }
        self.set(source, 0..source.item_count())
    }

    /// Selects the contiguous span between the range anchor and `target`.
    ///
    /// The anchor is the minimum of the current selection after a downward range and the
    /// maximum after an upward one; the direction flips when `target` lands on the other side of
    /// the anchor. The anchor itself comes first in the resulting order.
    pub fn select_range(&mut self, source: &impl IdentityMap, target: usize) -> bool {
        if self.mode != SelectionMode::Multiple || !self.in_bounds(source, target) {
            return false;
        }
        let Some(origin) = self.anchor_index() else {
            return self.set(source, [target]);
        };

        if target < origin {
            self.direction = RangeDirection::Up;
            self.set(source, (target..=origin).rev())
        } else {
            self.direction = RangeDirection::Down;
            self.set(source, origin..=target)
        }
    }

    /// Batches multiple updates into a single change notification.
    pub fn batch_update(&mut self, f: impl FnOnce(&mut Self)) {
        let depth = self.notify_depth.get();
        self.notify_depth.set(depth.saturating_add(1));

        f(self);

        let depth = self.notify_depth.get();
        debug_assert!(depth > 0, "notify_depth underflow");
        let next = depth.saturating_sub(1);
        self.notify_depth.set(next);

        if next == 0 && self.notify_pending.replace(false) {
            self.notify_now();
        }
    }

    fn set_inner(
        &mut self,
        source: &impl IdentityMap,
        indices: impl IntoIterator<Item = usize>,
    ) -> bool {
        let limit = match self.mode {
            SelectionMode::None => return false,
            SelectionMode::Single => 1,
            SelectionMode::Multiple => usize::MAX,
        };
        let count = source.item_count();
        let iter = indices.into_iter();
        let hint = iter.size_hint().0.min(limit).min(count);

        let mut next = Vec::with_capacity(hint);
        let mut seen = HashSet::with_capacity(hint);
        for index in iter {
            if next.len() >= limit {
                break;
            }
            if index >= count {
                ltrace!(index, count, "selection: ignoring out-of-range index");
                continue;
            }
            if seen.insert(index) {
                next.push(index);
            }
        }

        if !self.stale && next == self.indices {
            return false;
        }

        let mut ids = Vec::with_capacity(next.len());
        ids.extend(next.iter().map(|&i| source.id_for_index(i)));
        self.index_set = seen;
        self.id_set.clear();
        self.id_set.reserve(ids.len());
        self.id_set.extend(ids.iter().copied());
        self.indices = next;
        self.ids = ids;
        self.bounds.set(None);
        self.stale = false;
        true
    }

    fn commit(&mut self, indices: Vec<usize>, ids: Vec<ItemId>) {
        debug_assert_eq!(indices.len(), ids.len());
        self.index_set.clear();
        self.index_set.extend(indices.iter().copied());
        self.id_set.clear();
        self.id_set.extend(ids.iter().copied());
        self.indices = indices;
        self.ids = ids;
        self.bounds.set(None);
    }

    fn push(&mut self, index: usize, id: ItemId) {
        let bounds = if self.indices.is_empty() {
            Some((index, index))
        } else {
            self.bounds
                .get()
                .map(|(min, max)| (min.min(index), max.max(index)))
        };
        self.indices.push(index);
        self.ids.push(id);
        self.index_set.insert(index);
        self.id_set.insert(id);
        self.bounds.set(bounds);
    }

    fn bounds(&self) -> Option<(usize, usize)> {
        if self.indices.is_empty() {
            return None;
        }
        if let Some(bounds) = self.bounds.get() {
            return Some(bounds);
        }
        let mut min = usize::MAX;
        let mut max = 0;
        for &i in &self.indices {
            min = min.min(i);
            max = max.max(i);
        }
        self.bounds.set(Some((min, max)));
        Some((min, max))
    }

    fn in_bounds(&self, source: &impl IdentityMap, index: usize) -> bool {
        let ok = index < source.item_count();
        if !ok {
            ltrace!(index, "selection: ignoring out-of-range index");
        }
        ok
    }

    fn notify_now(&self) {
        self.revision.set(self.revision.get().wrapping_add(1));
        if let Some(cb) = &self.on_change {
            cb(self);
        }
    }

    fn notify(&self) {
        if self.notify_depth.get() > 0 {
            self.notify_pending.set(true);
            return;
        }
        self.notify_now();
    }
}
