use core::mem;

use crate::layout::Layout;
use crate::pool::{RecyclePool, SlotId};
use crate::{
    Align, BindContext, ControllerOptions, IdentityMap, ItemFactory, ItemId, RefreshStats, Result,
    SelectionModel, Vec2, VisibleRange,
};

/// A bound slot as seen by the rendering collaborator.
#[derive(Debug)]
pub struct SlotView<'a, H> {
    pub slot: SlotId,
    pub index: usize,
    pub id: ItemId,
    /// Top edge relative to the viewport (content top minus scroll offset).
    pub local_top: f32,
    pub height: f32,
    pub is_selected: bool,
    pub handle: &'a H,
}

/// Maps a scroll offset to a window of rows and keeps a bounded pool of view items bound to it.
///
/// The controller never touches more than `visible_item_count() + slack` view items, no matter
/// how many rows the source has. It owns the data source so that binding, unbinding and id
/// lookups go through one place; mutate the source with [`Self::source_mut`] and follow up with
/// [`Self::items_changed`] (or [`Self::items_resized`] for append/truncate-only changes).
pub struct VirtualizationController<S>
where
    S: IdentityMap + ItemFactory,
{
    options: ControllerOptions,
    layout: Layout,
    source: S,
    pool: RecyclePool<S::Handle>,
    // Bound slots, ascending by index.
    active: Vec<SlotId>,
    window: VisibleRange,
    viewport: Vec2,
    offset: f32,
    // Scroll adjustments from `measure` not yet picked up by the owner of the scroll position.
    adjustment: f32,
    rebuild_pending: bool,
}

impl<S> VirtualizationController<S>
where
    S: IdentityMap + ItemFactory,
{
    /// Creates a controller. Fails when the layout cannot render anything meaningful.
    pub fn new(source: S, options: ControllerOptions) -> Result<Self> {
        options.validate()?;
        let layout = Layout::new(options.layout, &source);
        ldebug!(
            count = layout.count(),
            slack = options.slack,
            "VirtualizationController::new"
        );
        Ok(Self {
            options,
            layout,
            source,
            pool: RecyclePool::new(0),
            active: Vec::new(),
            window: VisibleRange::EMPTY,
            viewport: Vec2::ZERO,
            offset: 0.0,
            adjustment: 0.0,
            rebuild_pending: false,
        })
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    /// Swaps the configuration. The layout is rebuilt and every slot is rebound.
    pub fn set_options(&mut self, options: ControllerOptions) -> Result<RefreshStats> {
        options.validate()?;
        self.options = options;
        self.layout = Layout::new(options.layout, &self.source);
        ldebug!(count = self.layout.count(), "set_options: layout rebuilt");
        Ok(self.refresh(true))
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn pool(&self) -> &RecyclePool<S::Handle> {
        &self.pool
    }

    pub fn item_count(&self) -> usize {
        self.layout.count()
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// The rows currently realized as slots.
    pub fn window(&self) -> VisibleRange {
        self.window
    }

    /// How many rows the current viewport can show at once.
    pub fn visible_item_count(&self) -> usize {
        self.layout.visible_item_count(self.viewport.y)
    }

    /// Upper bound on live slots.
    pub fn slot_capacity(&self) -> usize {
        let visible = self.visible_item_count();
        if visible == 0 {
            return 0;
        }
        visible.saturating_add(self.options.slack)
    }

    pub fn bound_len(&self) -> usize {
        self.active.len()
    }

    pub fn content_height(&self) -> f32 {
        self.layout.content_height()
    }

    /// `content_height - viewport_height`, never negative.
    pub fn max_scroll_offset(&self) -> f32 {
        (self.layout.content_height() - self.viewport.y).max(0.0)
    }

    pub fn row_top(&self, index: usize) -> Option<f32> {
        (index < self.layout.count()).then(|| self.layout.row_top(index))
    }

    pub fn row_height(&self, index: usize) -> Option<f32> {
        (index < self.layout.count()).then(|| self.layout.row_height(index))
    }

    pub fn is_measured(&self, index: usize) -> bool {
        match self.layout.as_measured() {
            Some(m) => m.is_measured(index),
            None => index < self.layout.count(),
        }
    }

    /// Whether a rebuild was requested (by a bind callback or [`Self::request_rebuild`]) and
    /// has not run yet.
    pub fn rebuild_pending(&self) -> bool {
        self.rebuild_pending
    }

    pub fn request_rebuild(&mut self) {
        self.rebuild_pending = true;
    }

    /// Clears and returns the pending rebuild flag.
    pub fn take_rebuild_request(&mut self) -> bool {
        mem::take(&mut self.rebuild_pending)
    }

    /// Applies a new viewport size. Non-finite or negative sizes are treated as zero.
    pub fn resize(&mut self, viewport: Vec2) -> RefreshStats {
        let viewport = Vec2::new(sanitize_len(viewport.x), sanitize_len(viewport.y));
        if viewport == self.viewport {
            return RefreshStats::default();
        }
        ltrace!(width = viewport.x, height = viewport.y, "resize");
        self.viewport = viewport;
        self.refresh(false)
    }

    /// Moves the window to `offset`. The offset is kept as given so elastic overscroll shows
    /// through; only the window is clamped.
    pub fn on_scroll(&mut self, offset: f32) -> RefreshStats {
        if !offset.is_finite() {
            lwarn!(offset, "on_scroll: ignoring non-finite offset");
            return RefreshStats::default();
        }
        self.offset = offset;
        self.refresh(false)
    }

    /// Computes the offset that brings `index` into view, clamped to the scroll range.
    pub fn scroll_to_index_offset(&self, index: usize, align: Align) -> f32 {
        let count = self.layout.count();
        if count == 0 {
            return 0.0;
        }
        let index = index.min(count - 1);
        let top = self.layout.row_top(index);
        let bottom = top + self.layout.row_height(index);
        let view = self.viewport.y;

        let target = match align {
            Align::Start => top,
            Align::End => bottom - view,
            Align::Center => top + (bottom - top) / 2.0 - view / 2.0,
            Align::Auto => {
                let cur = self.offset;
                if top >= cur && bottom <= cur + view {
                    cur
                } else if top < cur {
                    top
                } else {
                    bottom - view
                }
            }
        };
        target.clamp(0.0, self.max_scroll_offset())
    }

    /// Scrolls the least distance that reveals `index`. Returns the applied offset.
    pub fn scroll_to_index(&mut self, index: usize) -> f32 {
        self.scroll_to_index_aligned(index, Align::Auto)
    }

    pub fn scroll_to_index_aligned(&mut self, index: usize, align: Align) -> f32 {
        let offset = self.scroll_to_index_offset(index, align);
        if offset != self.offset {
            self.on_scroll(offset);
        }
        self.offset
    }

    /// Index of the row under a viewport-local position, if any.
    pub fn index_at_local_position(&self, pos: Vec2) -> Option<usize> {
        if !pos.is_finite() || pos.y < 0.0 || pos.y > self.viewport.y {
            return None;
        }
        self.layout.index_at(self.offset + pos.y)
    }

    /// Follows an arbitrary structural change of the source (insert, remove, reorder, filter).
    ///
    /// Measured heights are re-read from the id cache. Slots are rebound on the next refresh.
    pub fn items_changed(&mut self) {
        self.layout.sync(&self.source);
        ldebug!(count = self.layout.count(), "items_changed");
        self.rebuild_pending = true;
    }

    /// Follows a change that only appended or truncated rows at the end.
    pub fn items_resized(&mut self) {
        let count = self.source.item_count();
        self.layout.set_count(&self.source, count);
        self.rebuild_pending = true;
    }

    /// Records the realized height of a row (measured layout only).
    ///
    /// Rows below shift; their bound slots are moved without rebinding. Heights under one pixel
    /// are raised to one pixel. Returns the scroll adjustment applied to keep visible content in
    /// place (zero when none).
    pub fn measure(&mut self, index: usize, height: f32) -> f32 {
        let applied = self.record_height(index, height);
        self.refresh(false);
        applied
    }

    /// Records several heights and refreshes once. Returns the total scroll adjustment.
    pub fn measure_many(&mut self, measurements: impl IntoIterator<Item = (usize, f32)>) -> f32 {
        let mut applied = 0.0;
        for (index, height) in measurements {
            applied += self.record_height(index, height);
        }
        self.refresh(false);
        applied
    }

    /// Returns and clears the scroll adjustment applied by `measure` since the last call.
    ///
    /// Callers that keep their own copy of the offset (scroll physics) shift it by this amount
    /// before writing it back with [`Self::on_scroll`].
    pub fn take_scroll_adjustment(&mut self) -> f32 {
        mem::take(&mut self.adjustment)
    }

    pub fn measurement_cache_len(&self) -> usize {
        self.layout.as_measured().map_or(0, |m| m.cache_len())
    }

    /// Exports measured heights keyed by id (useful for persistence).
    pub fn export_measurements(&self) -> Vec<(ItemId, f32)> {
        self.layout
            .as_measured()
            .map(|m| m.export_cache())
            .unwrap_or_default()
    }

    /// Replaces the measurement cache and re-derives per-index heights from it.
    pub fn import_measurements(&mut self, entries: impl IntoIterator<Item = (ItemId, f32)>) {
        let Some(m) = self.layout.as_measured_mut() else {
            return;
        };
        m.import_cache(entries);
        self.layout.sync(&self.source);
        self.refresh(false);
    }

    pub fn reset_measurements(&mut self) {
        let Some(m) = self.layout.as_measured_mut() else {
            return;
        };
        m.clear_cache();
        self.layout.sync(&self.source);
        self.refresh(false);
    }

    /// Re-evaluates the window and diffs it against the bound slots.
    ///
    /// Slots whose row left the window (or whose row now holds a different id) are unbound and
    /// returned to the free list; slots that stayed are repositioned in place; newly visible rows
    /// take free slots first and only then create new ones. With `force_rebind` every bound slot
    /// is unbound and rebound even if its row did not change.
    pub fn refresh(&mut self, force_rebind: bool) -> RefreshStats {
        let count = self.source.item_count();
        if count != self.layout.count() {
            lwarn!(
                expected = self.layout.count(),
                actual = count,
                "refresh: item count changed without items_changed(); resyncing"
            );
            self.layout.sync(&self.source);
        }

        let capacity = self.slot_capacity();
        self.pool.set_capacity(capacity);

        let mut next = self.layout.window(self.offset, self.viewport.y);
        if next.len() > capacity {
            lwarn!(window = next.len(), capacity, "refresh: window exceeds slot capacity");
            next.end_index = next.start_index.saturating_add(capacity);
        }

        let mut stats = RefreshStats::default();
        let mut cx = BindContext::default();

        let mut kept = Vec::with_capacity(self.active.len());
        for sid in mem::take(&mut self.active) {
            let Some(slot) = self.pool.get_mut(sid) else {
                continue;
            };
            let Some(index) = slot.bound_index() else {
                self.pool.release(sid);
                continue;
            };
            let keep = !force_rebind
                && next.contains(index)
                && slot.bound_id() == Some(self.source.id_for_index(index));
            if keep {
                kept.push(sid);
            } else {
                self.source.unbind_item(slot.handle_mut(), index);
                self.pool.release(sid);
                stats.unbound += 1;
            }
        }

        let mut active = Vec::with_capacity(next.len());
        let mut kept = kept.into_iter().peekable();
        for index in next.start_index..next.end_index {
            let top = self.layout.row_top(index);
            let height = self.layout.row_height(index);

            if let Some(&sid) = kept.peek() {
                if let Some(slot) = self.pool.get_mut(sid) {
                    if slot.bound_index() == Some(index) {
                        kept.next();
                        if slot.place(top, height) {
                            stats.moved += 1;
                        }
                        active.push(sid);
                        continue;
                    }
                }
            }

            let source = &mut self.source;
            let Some((sid, created)) = self.pool.acquire(|| source.make_item()) else {
                lwarn!(index, capacity, "refresh: slot pool exhausted");
                break;
            };
            if created {
                stats.created += 1;
            }
            let id = self.source.id_for_index(index);
            if let Some(slot) = self.pool.get_mut(sid) {
                slot.bind(index, id);
                slot.place(top, height);
                self.source.bind_item(slot.handle_mut(), index, &mut cx);
            }
            stats.bound += 1;
            active.push(sid);
        }

        // Only reachable if the pool ran dry mid-window.
        for sid in kept {
            if let Some(slot) = self.pool.get_mut(sid) {
                if let Some(index) = slot.bound_index() {
                    self.source.unbind_item(slot.handle_mut(), index);
                    stats.unbound += 1;
                }
            }
            self.pool.release(sid);
        }

        self.window = if active.is_empty() {
            VisibleRange::EMPTY
        } else {
            VisibleRange {
                start_index: next.start_index,
                end_index: next.start_index + active.len(),
            }
        };
        self.active = active;

        let source = &mut self.source;
        self.pool.shrink_to_capacity(|h| source.destroy_item(h));
        if cx.rebuild_requested() {
            ltrace!("refresh: bind callback requested another rebuild; deferring");
            self.rebuild_pending = true;
        }

        ltrace!(
            start = self.window.start_index,
            end = self.window.end_index,
            bound = stats.bound,
            unbound = stats.unbound,
            moved = stats.moved,
            created = stats.created,
            live = self.pool.len(),
            "refresh"
        );
        stats
    }

    /// Mirrors selection membership into the bound slots. Returns how many slots flipped.
    pub fn sync_selection(&mut self, selection: &SelectionModel) -> usize {
        let mut flipped = 0;
        for &sid in &self.active {
            if let Some(slot) = self.pool.get_mut(sid) {
                let selected = slot.bound_id().is_some_and(|id| selection.contains_id(id));
                if slot.set_selected(selected) {
                    flipped += 1;
                }
            }
        }
        flipped
    }

    /// Visits bound slots in index order.
    pub fn for_each_slot(&self, mut f: impl FnMut(SlotView<'_, S::Handle>)) {
        for &sid in &self.active {
            let Some(slot) = self.pool.get(sid) else {
                continue;
            };
            let (Some(index), Some(id)) = (slot.bound_index(), slot.bound_id()) else {
                continue;
            };
            f(SlotView {
                slot: sid,
                index,
                id,
                local_top: slot.top() - self.offset,
                height: slot.height(),
                is_selected: slot.is_selected(),
                handle: slot.handle(),
            });
        }
    }

    /// Collects bound indices into `out` (clears `out` first).
    pub fn collect_bound_indices(&self, out: &mut Vec<usize>) {
        out.clear();
        self.for_each_slot(|s| out.push(s.index));
    }

    /// Unbinds and destroys every slot. The controller can be refreshed again afterwards.
    pub fn teardown(&mut self) {
        for sid in mem::take(&mut self.active) {
            if let Some(slot) = self.pool.get_mut(sid) {
                if let Some(index) = slot.bound_index() {
                    self.source.unbind_item(slot.handle_mut(), index);
                }
            }
        }
        let source = &mut self.source;
        self.pool.clear(|h| source.destroy_item(h));
        self.window = VisibleRange::EMPTY;
        self.rebuild_pending = false;
    }

    fn record_height(&mut self, index: usize, height: f32) -> f32 {
        if index >= self.layout.count() || !height.is_finite() || height < 0.0 {
            ltrace!(index, height, "measure: ignoring invalid measurement");
            return 0.0;
        }
        let id = self.source.id_for_index(index);
        let top = self.layout.row_top(index);
        let Some(m) = self.layout.as_measured_mut() else {
            ltrace!(index, "measure: fixed-step layout ignores measurements");
            return 0.0;
        };
        let delta = m.set_height(index, id, height);
        if delta != 0.0 && self.options.adjust_scroll_on_resize && top < self.offset {
            self.offset += delta;
            self.adjustment += delta;
            return delta;
        }
        0.0
    }
}

impl<S> Drop for VirtualizationController<S>
where
    S: IdentityMap + ItemFactory,
{
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<S> core::fmt::Debug for VirtualizationController<S>
where
    S: IdentityMap + ItemFactory,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VirtualizationController")
            .field("options", &self.options)
            .field("count", &self.layout.count())
            .field("window", &self.window)
            .field("viewport", &self.viewport)
            .field("offset", &self.offset)
            .field("live_slots", &self.pool.len())
            .field("adjustment", &self.adjustment)
            .field("rebuild_pending", &self.rebuild_pending)
            .finish_non_exhaustive()
    }
}

fn sanitize_len(v: f32) -> f32 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}
