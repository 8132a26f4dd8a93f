use core::mem;

use listkit::{
    IdentityMap, ItemFactory, ItemId, PhysicsOptions, PhysicsState, RefreshStats, Scheduler,
    ScrollPhysics, SelectionMode, SelectionModel, Vec2, ViewSnapshot, VirtualizationController,
};

use crate::{ClickTracker, InteractionOptions, NavigationCommand, PointerButton, PointerEvent};

/// What the host should react to after feeding input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionEvent {
    SelectionChanged,
    /// A double click landed on a row that was already selected: open/activate the selection.
    ItemsChosen { indices: Vec<usize>, ids: Vec<ItemId> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Task {
    Rebuild,
    Settle,
}

#[derive(Clone, Copy, Debug)]
struct Gesture {
    pointer_id: u64,
    origin: Vec2,
    dragging: bool,
    index: Option<usize>,
    clicks: u32,
    was_selected: bool,
}

/// Wires pointer and keyboard input to the selection model and the scroll physics, and keeps
/// the virtualization controller in step with both.
///
/// Single-threaded and tick-driven: call [`Self::tick`] every frame while
/// [`Self::needs_tick`] is true. Deferred work (rebuild requests, settle animation) is
/// scheduled on an internal [`Scheduler`] and dropped on [`Self::detach`].
pub struct InteractionCoordinator<S>
where
    S: IdentityMap + ItemFactory,
{
    options: InteractionOptions,
    controller: VirtualizationController<S>,
    selection: SelectionModel,
    physics: ScrollPhysics,
    scheduler: Scheduler<Task>,
    clicks: ClickTracker,
    gesture: Option<Gesture>,
    focus: Option<usize>,
    attached: bool,
    now_ms: u64,
    events: Vec<InteractionEvent>,
}

impl<S> InteractionCoordinator<S>
where
    S: IdentityMap + ItemFactory,
{
    pub fn new(
        controller: VirtualizationController<S>,
        selection_mode: SelectionMode,
        physics: PhysicsOptions,
        options: InteractionOptions,
    ) -> Self {
        let mut this = Self {
            options,
            controller,
            selection: SelectionModel::new(selection_mode),
            physics: ScrollPhysics::new(physics),
            scheduler: Scheduler::new(),
            clicks: ClickTracker::new(options.double_click_ms, options.double_click_distance),
            gesture: None,
            focus: None,
            attached: true,
            now_ms: 0,
            events: Vec::new(),
        };
        this.sync_limits();
        this.physics.set_offset(Vec2::new(0.0, this.controller.offset()));
        this
    }

    pub fn options(&self) -> &InteractionOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: InteractionOptions) {
        self.options = options;
        self.clicks = ClickTracker::new(options.double_click_ms, options.double_click_distance);
    }

    pub fn controller(&self) -> &VirtualizationController<S> {
        &self.controller
    }

    /// Direct access for configuration and data-source mutation. After changing the source,
    /// call [`Self::items_changed`].
    pub fn controller_mut(&mut self) -> &mut VirtualizationController<S> {
        &mut self.controller
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionModel {
        &mut self.selection
    }

    pub fn physics(&self) -> &ScrollPhysics {
        &self.physics
    }

    pub fn set_physics_options(&mut self, options: PhysicsOptions) {
        self.physics.set_options(options);
    }

    /// The most recently activated row; origin for relative keyboard navigation.
    pub fn focus_index(&self) -> Option<usize> {
        self.focus
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Whether deferred work is pending (keep ticking while true).
    pub fn needs_tick(&self) -> bool {
        self.attached && !self.scheduler.is_paused() && !self.scheduler.is_empty()
    }

    /// Takes the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<InteractionEvent> {
        mem::take(&mut self.events)
    }

    pub fn resize(&mut self, viewport: Vec2) -> RefreshStats {
        self.follow_measurements();
        let stats = self.controller.resize(viewport);
        self.sync_limits();
        self.apply_offset();
        self.controller.sync_selection(&self.selection);
        stats
    }

    /// Records the realized height of a row. Returns the scroll adjustment applied to keep
    /// visible content in place; the physics offset follows it.
    pub fn measure(&mut self, index: usize, height: f32) -> f32 {
        let applied = self.controller.measure(index, height);
        self.after_measure();
        applied
    }

    /// Records several heights with one refresh. Returns the total scroll adjustment.
    pub fn measure_many(&mut self, measurements: impl IntoIterator<Item = (usize, f32)>) -> f32 {
        let applied = self.controller.measure_many(measurements);
        self.after_measure();
        applied
    }

    /// Replaces the selection (e.g. from host code) and mirrors it into the slots.
    pub fn set_selection(&mut self, indices: impl IntoIterator<Item = usize>) -> bool {
        self.selection.sync(self.controller.source());
        let changed = self.selection.set(self.controller.source(), indices);
        if changed {
            self.focus = self.selection.last_index();
            self.selection_changed();
        }
        changed
    }

    /// Follows a structural change of the data source (insert, remove, reorder, filter).
    ///
    /// Selection is resynced by id and slots are rebound on the next tick.
    pub fn items_changed(&mut self) {
        self.controller.items_changed();
        self.selection.mark_stale();
        self.scheduler.schedule(Task::Rebuild, self.now_ms);
    }

    /// Requests a rebuild on the next tick. Repeated requests collapse into one.
    pub fn request_rebuild(&mut self) {
        self.controller.request_rebuild();
        self.scheduler.schedule(Task::Rebuild, self.now_ms);
    }

    /// Runs due deferred work. Returns whether more ticks are needed. Does nothing while
    /// detached.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        self.now_ms = now_ms;
        if !self.attached {
            return false;
        }
        self.follow_measurements();
        if self.controller.rebuild_pending() && !self.scheduler.is_scheduled(Task::Rebuild) {
            self.scheduler.schedule(Task::Rebuild, now_ms);
        }
        for task in self.scheduler.pop_due(now_ms) {
            match task {
                Task::Rebuild => self.run_rebuild(now_ms),
                Task::Settle => self.run_settle(now_ms),
            }
        }
        self.needs_tick()
    }

    pub fn pointer_down(&mut self, ev: PointerEvent) {
        if !ev.is_primary || ev.button != PointerButton::Primary || self.gesture.is_some() {
            return;
        }
        self.now_ms = ev.timestamp_ms;
        self.follow_measurements();
        self.selection.sync(self.controller.source());
        self.scheduler.cancel(Task::Settle);
        self.physics.pointer_down(ev.position, ev.timestamp_ms);

        let index = self.controller.index_at_local_position(ev.position);
        let selection = &self.selection;
        let click = self.clicks.press(ev.position, ev.timestamp_ms, index, || {
            index.is_some_and(|i| selection.contains(i))
        });
        ltrace!(?index, clicks = click.count, "pointer_down");
        self.gesture = Some(Gesture {
            pointer_id: ev.pointer_id,
            origin: ev.position,
            dragging: false,
            index,
            clicks: click.count,
            was_selected: click.was_selected,
        });
    }

    pub fn pointer_move(&mut self, ev: PointerEvent) {
        self.follow_measurements();
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        if gesture.pointer_id != ev.pointer_id {
            return;
        }
        self.now_ms = ev.timestamp_ms;
        if !gesture.dragging {
            let travel = (ev.position - gesture.origin).length_squared();
            if travel < self.options.drag_threshold_sq() {
                return;
            }
            ldebug!(travel, "pointer_move: drag started");
            gesture.dragging = true;
            self.clicks.reset();
        }
        self.physics.pointer_move(ev.position, ev.timestamp_ms);
        self.apply_offset();
    }

    pub fn pointer_up(&mut self, ev: PointerEvent) {
        let Some(gesture) = self.gesture else {
            return;
        };
        if gesture.pointer_id != ev.pointer_id {
            return;
        }
        self.gesture = None;
        self.now_ms = ev.timestamp_ms;
        self.follow_measurements();
        self.physics.pointer_up(ev.timestamp_ms);
        self.after_release(ev.timestamp_ms);

        if !gesture.dragging {
            self.click(gesture, ev);
        }
    }

    pub fn pointer_cancel(&mut self, ev: PointerEvent) {
        let Some(gesture) = self.gesture else {
            return;
        };
        if gesture.pointer_id != ev.pointer_id {
            return;
        }
        self.gesture = None;
        self.now_ms = ev.timestamp_ms;
        self.clicks.reset();
        self.follow_measurements();
        self.physics.pointer_cancel(ev.timestamp_ms);
        self.after_release(ev.timestamp_ms);
    }

    /// Scrolls by a wheel delta with hard clamping. Cancels any settle animation.
    pub fn on_wheel(&mut self, delta: Vec2) {
        if self.gesture.is_some() {
            return;
        }
        self.follow_measurements();
        self.scheduler.cancel(Task::Settle);
        self.physics.scroll_by(delta * self.options.wheel_step);
        self.apply_offset();
    }

    /// Applies a keyboard navigation command. Returns whether the selection changed.
    ///
    /// With `extend` (shift held) movement extends the selection as a range.
    pub fn navigate(&mut self, command: NavigationCommand, extend: bool) -> bool {
        self.selection.sync(self.controller.source());
        let count = self.controller.item_count();

        let target = match command {
            NavigationCommand::SelectAll => {
                let changed = self.selection.select_all(self.controller.source());
                if changed {
                    self.selection_changed();
                }
                return changed;
            }
            NavigationCommand::Cancel => {
                let changed = self.selection.clear();
                if changed {
                    self.selection_changed();
                }
                return changed;
            }
            _ if count == 0 => return false,
            NavigationCommand::Home => 0,
            NavigationCommand::End => count - 1,
            NavigationCommand::Previous => self.origin().map_or(0, |i| i.saturating_sub(1)),
            NavigationCommand::Next => self.origin().map_or(0, |i| i + 1),
            NavigationCommand::PageUp => self
                .origin()
                .map_or(0, |i| i.saturating_sub(self.page_step())),
            NavigationCommand::PageDown => self
                .origin()
                .map_or(0, |i| i.saturating_add(self.page_step())),
        };
        let target = target.min(count - 1);

        let source = self.controller.source();
        let changed = if extend && self.selection.mode() == SelectionMode::Multiple {
            self.selection.select_range(source, target)
        } else {
            self.selection.set(source, [target])
        };
        self.focus = Some(target);
        ltrace!(?command, target, extend, "navigate");

        self.scheduler.cancel(Task::Settle);
        self.follow_measurements();
        let offset = self.controller.scroll_to_index(target);
        self.physics
            .set_offset(Vec2::new(self.physics.offset().x, offset));
        if changed {
            self.selection_changed();
        }
        changed
    }

    /// Captures scroll offset, selected ids and the range anchor.
    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            offset: self.physics.offset(),
            selected_ids: self.selection.ids().to_vec(),
            anchor_index: self.selection.anchor_index(),
        }
    }

    /// Restores a snapshot. Ids that no longer resolve are dropped; the offset is clamped to the
    /// current content.
    pub fn restore(&mut self, snapshot: &ViewSnapshot) {
        let source = self.controller.source();
        let changed = self
            .selection
            .set_ids(source, snapshot.selected_ids.iter().copied());
        if let Some(anchor) = snapshot.anchor_index {
            self.selection.set_anchor_index(anchor);
        }
        self.focus = self.selection.last_index();

        self.scheduler.cancel(Task::Settle);
        self.follow_measurements();
        self.sync_limits();
        self.physics.set_offset(snapshot.offset);
        self.apply_offset();
        self.controller.sync_selection(&self.selection);
        if changed {
            self.events.push(InteractionEvent::SelectionChanged);
        }
    }

    /// Re-enables scheduling after [`Self::detach`].
    pub fn attach(&mut self) {
        self.attached = true;
        self.scheduler.resume();
        if self.controller.rebuild_pending() {
            self.scheduler.schedule(Task::Rebuild, self.now_ms);
        }
    }

    /// Drops every pending task and stops motion. Safe to call repeatedly.
    ///
    /// Work requested while detached stays queued and runs after [`Self::attach`].
    pub fn detach(&mut self) {
        if self.attached {
            ldebug!(pending = self.scheduler.len(), "detach");
        }
        self.attached = false;
        self.scheduler.cancel_all();
        self.physics.stop();
        self.gesture = None;
        self.clicks.reset();
    }

    /// Holds pending tasks without dropping them. Idempotent.
    pub fn pause(&mut self) {
        self.scheduler.pause();
    }

    /// Idempotent.
    pub fn resume(&mut self) {
        self.scheduler.resume();
    }

    fn click(&mut self, gesture: Gesture, ev: PointerEvent) {
        let Some(index) = gesture.index else {
            if !ev.modifiers.shift && !ev.modifiers.is_toggle() && self.selection.clear() {
                self.selection_changed();
            }
            return;
        };
        if gesture.clicks >= 2 {
            if gesture.was_selected && self.selection.contains(index) {
                ldebug!(index, "items chosen");
                self.events.push(InteractionEvent::ItemsChosen {
                    indices: self.selection.indices().to_vec(),
                    ids: self.selection.ids().to_vec(),
                });
            }
            return;
        }

        let source = self.controller.source();
        let changed = if ev.modifiers.shift && self.selection.mode() == SelectionMode::Multiple {
            self.selection.select_range(source, index)
        } else if ev.modifiers.is_toggle() {
            self.selection.toggle(source, index)
        } else {
            self.selection.set(source, [index])
        };
        self.focus = Some(index);
        if changed {
            self.selection_changed();
        }
    }

    fn after_release(&mut self, now_ms: u64) {
        if self.physics.state() == PhysicsState::Settling {
            self.scheduler
                .schedule(Task::Settle, now_ms + self.options.tick_interval_ms);
        }
        self.apply_offset();
    }

    fn run_rebuild(&mut self, now_ms: u64) {
        self.controller.take_rebuild_request();
        if self.selection.sync(self.controller.source()) {
            self.events.push(InteractionEvent::SelectionChanged);
        }
        if let Some(focus) = self.focus {
            let count = self.controller.item_count();
            self.focus = (count > 0).then(|| focus.min(count - 1));
        }
        self.controller.refresh(false);
        self.sync_limits();
        self.apply_offset();
        self.controller.sync_selection(&self.selection);
        ltrace!(window = ?self.controller.window(), "rebuild");

        // A bind callback asked for another pass; run it next tick instead of recursing.
        if self.controller.rebuild_pending() {
            self.scheduler
                .schedule(Task::Rebuild, now_ms + self.options.tick_interval_ms);
        }
    }

    fn run_settle(&mut self, now_ms: u64) {
        let more = self.physics.settle(now_ms);
        self.apply_offset();
        if more {
            self.scheduler
                .schedule(Task::Settle, now_ms + self.options.tick_interval_ms);
        }
    }

    fn origin(&self) -> Option<usize> {
        self.focus.or_else(|| self.selection.last_index())
    }

    fn page_step(&self) -> usize {
        self.controller.visible_item_count().saturating_sub(2).max(1)
    }

    fn sync_limits(&mut self) {
        self.physics
            .fit_limits(Vec2::ZERO, Vec2::new(0.0, self.controller.max_scroll_offset()));
    }

    fn after_measure(&mut self) {
        self.follow_measurements();
        self.sync_limits();
        self.apply_offset();
    }

    // Picks up scroll adjustments the controller made while measuring rows above the viewport.
    fn follow_measurements(&mut self) {
        let delta = self.controller.take_scroll_adjustment();
        if delta != 0.0 {
            self.physics.shift_offset(Vec2::new(0.0, delta));
            self.sync_limits();
        }
    }

    fn apply_offset(&mut self) {
        let y = self.physics.offset().y;
        if y != self.controller.offset() {
            self.controller.on_scroll(y);
            self.controller.sync_selection(&self.selection);
        }
    }

    fn selection_changed(&mut self) {
        self.controller.sync_selection(&self.selection);
        self.events.push(InteractionEvent::SelectionChanged);
    }
}

impl<S> core::fmt::Debug for InteractionCoordinator<S>
where
    S: IdentityMap + ItemFactory,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InteractionCoordinator")
            .field("controller", &self.controller)
            .field("selection", &self.selection)
            .field("physics", &self.physics)
            .field("focus", &self.focus)
            .field("attached", &self.attached)
            .finish_non_exhaustive()
    }
}
