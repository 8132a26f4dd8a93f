use crate::ItemId;

/// Stable handle to a slot inside a [`RecyclePool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

/// A pooled view item.
#[derive(Clone, Debug)]
pub struct Slot<H> {
    handle: H,
    bound_index: Option<usize>,
    bound_id: Option<ItemId>,
    is_selected: bool,
    /// Top edge in content coordinates.
    top: f32,
    height: f32,
    free: bool,
}

impl<H> Slot<H> {
    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    pub fn bound_index(&self) -> Option<usize> {
        self.bound_index
    }

    pub fn bound_id(&self) -> Option<ItemId> {
        self.bound_id
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    pub fn top(&self) -> f32 {
        self.top
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub(crate) fn bind(&mut self, index: usize, id: ItemId) {
        self.bound_index = Some(index);
        self.bound_id = Some(id);
    }

    pub(crate) fn set_selected(&mut self, selected: bool) -> bool {
        let changed = self.is_selected != selected;
        self.is_selected = selected;
        changed
    }

    /// Returns whether the geometry changed.
    pub(crate) fn place(&mut self, top: f32, height: f32) -> bool {
        let changed = self.top != top || self.height != height;
        self.top = top;
        self.height = height;
        changed
    }
}

/// A bounded set of reusable view items.
///
/// Slots are created on demand up to `capacity`, handed back to a free list when their row
/// leaves the window, and only destroyed when the capacity shrinks or the pool is torn down.
#[derive(Clone, Debug)]
pub struct RecyclePool<H> {
    slots: Vec<Option<Slot<H>>>,
    vacant: Vec<usize>,
    free: Vec<SlotId>,
    capacity: usize,
    live: usize,
}

impl<H> Default for RecyclePool<H> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<H> RecyclePool<H> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            vacant: Vec::new(),
            free: Vec::new(),
            capacity,
            live: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Updates the cap without destroying anything. Pair with [`Self::shrink_to_capacity`].
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// Live slots (bound + free).
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    pub fn bound_len(&self) -> usize {
        self.live - self.free.len()
    }

    pub fn get(&self, id: SlotId) -> Option<&Slot<H>> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut Slot<H>> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &Slot<H>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (SlotId(i), s)))
    }

    /// Takes a slot from the free list, or creates one with `make` while under capacity.
    ///
    /// Returns the slot and whether it was freshly created, or `None` when the pool is full.
    pub fn acquire(&mut self, make: impl FnOnce() -> H) -> Option<(SlotId, bool)> {
        if let Some(id) = self.free.pop() {
            if let Some(slot) = self.get_mut(id) {
                slot.free = false;
            }
            return Some((id, false));
        }
        if self.live >= self.capacity {
            return None;
        }
        let slot = Slot {
            handle: make(),
            bound_index: None,
            bound_id: None,
            is_selected: false,
            top: 0.0,
            height: 0.0,
            free: false,
        };
        let id = match self.vacant.pop() {
            Some(i) => {
                self.slots[i] = Some(slot);
                SlotId(i)
            }
            None => {
                self.slots.push(Some(slot));
                SlotId(self.slots.len() - 1)
            }
        };
        self.live += 1;
        Some((id, true))
    }

    /// Returns a slot to the free list. The caller is responsible for unbinding it first.
    pub fn release(&mut self, id: SlotId) {
        let Some(slot) = self.get_mut(id) else {
            return;
        };
        if slot.free {
            return;
        }
        slot.free = true;
        slot.bound_index = None;
        slot.bound_id = None;
        slot.is_selected = false;
        self.free.push(id);
    }

    /// Destroys free slots until the pool fits its capacity. Bound slots are never destroyed.
    pub fn shrink_to_capacity(&mut self, mut destroy: impl FnMut(H)) -> usize {
        let mut destroyed = 0;
        while self.live > self.capacity {
            let Some(id) = self.free.pop() else {
                break;
            };
            if let Some(slot) = self.slots[id.0].take() {
                destroy(slot.handle);
                self.vacant.push(id.0);
                self.live -= 1;
                destroyed += 1;
            }
        }
        destroyed
    }

    /// Destroys every slot, bound or not.
    pub fn clear(&mut self, mut destroy: impl FnMut(H)) {
        for slot in self.slots.drain(..).flatten() {
            destroy(slot.handle);
        }
        self.vacant.clear();
        self.free.clear();
        self.live = 0;
    }
}
