use crate::*;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use proptest::prelude::*;

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        // Deterministic, dependency-free PRNG for tests.
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range_u64(&mut self, start: u64, end_exclusive: u64) -> u64 {
        debug_assert!(start < end_exclusive);
        let span = end_exclusive - start;
        start + (self.next_u64() % span)
    }

    fn gen_range_usize(&mut self, start: usize, end_exclusive: usize) -> usize {
        self.gen_range_u64(start as u64, end_exclusive as u64) as usize
    }

    fn gen_f32(&mut self, start: f32, end: f32) -> f32 {
        let unit = (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32;
        start + (end - start) * unit
    }
}

#[derive(Debug, Default)]
struct Row {
    serial: usize,
    index: Option<usize>,
}

#[derive(Debug, Default)]
struct Source {
    ids: IdList,
    made: usize,
    destroyed: usize,
    binds: usize,
    unbinds: usize,
    rebuild_on_bind: Option<usize>,
}

impl Source {
    fn sequential(count: usize) -> Self {
        Self {
            ids: IdList::sequential(count),
            ..Self::default()
        }
    }
}

impl IdentityMap for Source {
    fn item_count(&self) -> usize {
        self.ids.item_count()
    }

    fn id_for_index(&self, index: usize) -> ItemId {
        self.ids.id_for_index(index)
    }

    fn index_for_id(&self, id: ItemId) -> Option<usize> {
        self.ids.index_for_id(id)
    }
}

impl ItemFactory for Source {
    type Handle = Row;

    fn make_item(&mut self) -> Row {
        self.made += 1;
        Row {
            serial: self.made,
            index: None,
        }
    }

    fn bind_item(&mut self, handle: &mut Row, index: usize, cx: &mut BindContext) {
        assert!(handle.index.is_none(), "slot bound twice without unbind");
        handle.index = Some(index);
        self.binds += 1;
        if self.rebuild_on_bind == Some(index) {
            cx.request_rebuild();
        }
    }

    fn unbind_item(&mut self, handle: &mut Row, index: usize) {
        assert_eq!(handle.index, Some(index));
        handle.index = None;
        self.unbinds += 1;
    }

    fn destroy_item(&mut self, handle: Row) {
        assert!(handle.index.is_none(), "destroyed a bound slot");
        self.destroyed += 1;
    }
}

fn fixed(count: usize, row_height: f32, viewport_h: f32) -> VirtualizationController<Source> {
    let mut c = VirtualizationController::new(
        Source::sequential(count),
        ControllerOptions::fixed(row_height),
    )
    .unwrap();
    c.resize(Vec2::new(100.0, viewport_h));
    c
}

fn measured(count: usize, default_h: f32, viewport_h: f32) -> VirtualizationController<Source> {
    let mut c = VirtualizationController::new(
        Source::sequential(count),
        ControllerOptions::measured(default_h),
    )
    .unwrap();
    c.resize(Vec2::new(100.0, viewport_h));
    c
}

fn bound_indices(c: &VirtualizationController<Source>) -> Vec<usize> {
    let mut out = Vec::new();
    c.collect_bound_indices(&mut out);
    out
}

fn counter(sel: &mut SelectionModel) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_for_cb = Arc::clone(&calls);
    sel.set_on_change(Some(move |_: &SelectionModel| {
        calls_for_cb.fetch_add(1, Ordering::Relaxed);
    }));
    calls
}

// ---------------------------------------------------------------------------------------------
// Identity

proptest! {
    #[test]
    fn id_list_keeps_index_and_id_inverse(
        initial in prop::collection::vec(0u64..500, 0..60),
        ops in prop::collection::vec((0u8..4, 0u64..500, 0usize..80), 0..40),
    ) {
        let mut list = IdList::new(initial);
        for (op, id, index) in ops {
            match op {
                0 => { list.insert(index, id); }
                1 => { list.remove_id(id); }
                2 => list.retain(|x| x % 3 != id % 3),
                _ => list.reverse(),
            }
        }
        for i in 0..list.item_count() {
            prop_assert_eq!(list.index_for_id(list.id_for_index(i)), Some(i));
        }
        prop_assert_eq!(list.index_for_id(ItemId::MAX), None);
    }
}

#[test]
fn id_list_replace_drops_duplicate_ids() {
    let list = IdList::new([7, 3, 7, 1]);
    assert_eq!(list.ids(), &[7, 3, 1]);
    assert_eq!(list.index_for_id(1), Some(2));
}

// ---------------------------------------------------------------------------------------------
// Selection

#[test]
fn selection_keeps_insertion_order() {
    let src = IdList::sequential(10);
    let mut sel = SelectionModel::new(SelectionMode::Multiple);
    sel.set(&src, [3, 1, 2]);
    assert_eq!(sel.indices(), &[3, 1, 2]);
    assert_eq!(sel.first_index(), Some(3));
    assert_eq!(sel.first_id(), Some(3));
    assert_eq!(sel.min_index(), Some(1));
    assert_eq!(sel.max_index(), Some(3));
}

proptest! {
    #[test]
    fn selection_order_matches_first_occurrences(input in prop::collection::vec(0usize..40, 0..40)) {
        let src = IdList::sequential(30);
        let mut sel = SelectionModel::new(SelectionMode::Multiple);
        sel.set(&src, input.iter().copied());

        let mut expected = Vec::new();
        for i in input {
            if i < 30 && !expected.contains(&i) {
                expected.push(i);
            }
        }
        prop_assert_eq!(sel.indices(), expected.as_slice());
        prop_assert_eq!(sel.indices().len(), sel.ids().len());
        for (index, id) in sel.iter() {
            prop_assert!(sel.contains(index));
            prop_assert!(sel.contains_id(id));
        }
    }
}

#[test]
fn setting_the_same_sequence_twice_notifies_once() {
    let src = IdList::sequential(10);
    let mut sel = SelectionModel::new(SelectionMode::Multiple);
    let calls = counter(&mut sel);

    assert!(sel.set(&src, [4, 2]));
    assert!(!sel.set(&src, [4, 2]));
    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert_eq!(sel.revision(), 1);

    // Same members, different order: a change.
    assert!(sel.set(&src, [2, 4]));
    assert_eq!(calls.load(Ordering::Relaxed), 2);
}

#[test]
fn set_without_notify_is_silent() {
    let src = IdList::sequential(10);
    let mut sel = SelectionModel::new(SelectionMode::Multiple);
    let calls = counter(&mut sel);
    assert!(sel.set_without_notify(&src, [1, 2, 3]));
    assert_eq!(sel.len(), 3);
    assert_eq!(calls.load(Ordering::Relaxed), 0);
    assert_eq!(sel.revision(), 0);
}

#[test]
fn out_of_range_indices_are_ignored() {
    let src = IdList::sequential(5);
    let mut sel = SelectionModel::new(SelectionMode::Multiple);
    assert!(!sel.add(&src, 5));
    sel.set(&src, [1, 99, 3]);
    assert_eq!(sel.indices(), &[1, 3]);
    assert!(!sel.select_range(&src, 42));
}

#[test]
fn resync_drops_detached_ids_with_one_notification() {
    let mut src = IdList::new([1, 5, 7, 9]);
    let mut sel = SelectionModel::new(SelectionMode::Multiple);
    sel.set_ids(&src, [5, 9]);
    assert_eq!(sel.ids(), &[5, 9]);
    let calls = counter(&mut sel);

    src.remove_id(9);
    sel.mark_stale();
    assert!(sel.sync(&src));
    assert_eq!(sel.ids(), &[5]);
    assert_eq!(sel.indices(), &[1]);
    assert_eq!(calls.load(Ordering::Relaxed), 1);

    // Nothing stale: no work, no notification.
    assert!(!sel.sync(&src));
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}

#[test]
fn resync_follows_moved_ids() {
    let mut src = IdList::new([10, 20, 30, 40]);
    let mut sel = SelectionModel::new(SelectionMode::Multiple);
    sel.set(&src, [3, 0]);
    assert_eq!(sel.ids(), &[40, 10]);

    src.reverse();
    assert!(sel.refresh(&src));
    assert_eq!(sel.indices(), &[0, 3]);
    assert_eq!(sel.ids(), &[40, 10]);
    assert!(sel.contains(0) && sel.contains(3));

    // Already in sync.
    assert!(!sel.refresh(&src));
}

#[test]
fn range_selection_flips_direction_around_the_original_edge() {
    let src = IdList::sequential(20);
    let mut sel = SelectionModel::new(SelectionMode::Multiple);
    sel.set(&src, [2]);

    assert!(sel.select_range(&src, 8));
    assert_eq!(sel.indices(), &[2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(sel.range_direction(), RangeDirection::Down);
    assert_eq!(sel.anchor_index(), Some(2));

    assert!(sel.select_range(&src, 0));
    let mut sorted = sel.indices().to_vec();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1, 2]);
    assert_eq!(sel.first_index(), Some(2));
    assert_eq!(sel.range_direction(), RangeDirection::Up);
    assert_eq!(sel.anchor_index(), Some(2));

    // Growing back down from the max edge.
    assert!(sel.select_range(&src, 5));
    assert_eq!(sel.indices(), &[2, 3, 4, 5]);
    assert_eq!(sel.range_direction(), RangeDirection::Down);
}

#[test]
fn range_selection_on_empty_selection_selects_target() {
    let src = IdList::sequential(10);
    let mut sel = SelectionModel::new(SelectionMode::Multiple);
    assert!(sel.select_range(&src, 4));
    assert_eq!(sel.indices(), &[4]);
}

#[test]
fn selection_modes_limit_mutations() {
    let src = IdList::sequential(10);

    let mut none = SelectionModel::new(SelectionMode::None);
    assert!(!none.add(&src, 1));
    assert!(!none.set(&src, [1, 2]));
    assert!(none.is_empty());

    let mut single = SelectionModel::new(SelectionMode::Single);
    single.add(&src, 1);
    single.add(&src, 4);
    assert_eq!(single.indices(), &[4]);
    single.set(&src, [6, 7, 8]);
    assert_eq!(single.indices(), &[6]);
    assert!(!single.select_all(&src));
    assert!(!single.select_range(&src, 9));

    let mut multi = SelectionModel::new(SelectionMode::Multiple);
    assert!(multi.select_all(&src));
    assert_eq!(multi.len(), 10);
    multi.set_mode(SelectionMode::Single);
    assert_eq!(multi.indices(), &[0]);
}

#[test]
fn toggle_and_remove_keep_sets_consistent() {
    let src = IdList::new([100, 101, 102, 103, 104]);
    let mut sel = SelectionModel::new(SelectionMode::Multiple);
    sel.set(&src, [0, 2, 4]);
    assert_eq!(sel.max_index(), Some(4));

    assert!(sel.toggle(&src, 4));
    assert!(!sel.contains(4));
    assert!(!sel.contains_id(104));
    assert_eq!(sel.max_index(), Some(2));

    assert!(sel.toggle(&src, 3));
    assert_eq!(sel.indices(), &[0, 2, 3]);
    assert_eq!(sel.ids(), &[100, 102, 103]);
    assert_eq!(sel.last_index(), Some(3));

    assert!(!sel.remove(1));
    assert!(sel.clear());
    assert!(!sel.clear());
    assert_eq!(sel.min_index(), None);
}

#[test]
fn batch_update_coalesces_notifications() {
    let src = IdList::sequential(10);
    let mut sel = SelectionModel::new(SelectionMode::Multiple);
    let calls = counter(&mut sel);

    sel.batch_update(|sel| {
        sel.add(&src, 1);
        sel.add(&src, 2);
        sel.batch_update(|sel| {
            sel.remove(1);
        });
        sel.add(&src, 5);
    });
    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert_eq!(sel.indices(), &[2, 5]);

    sel.batch_update(|_| {});
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}

#[test]
fn stale_set_always_notifies() {
    let mut src = IdList::new([1, 2, 3]);
    let mut sel = SelectionModel::new(SelectionMode::Multiple);
    sel.set(&src, [0]);
    let calls = counter(&mut sel);

    src.replace([9, 2, 3]);
    sel.mark_stale();
    assert!(sel.set(&src, [0]));
    assert_eq!(sel.ids(), &[9]);
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}

// ---------------------------------------------------------------------------------------------
// Pool

#[test]
fn pool_prefers_free_slots_and_respects_capacity() {
    let mut pool: RecyclePool<u32> = RecyclePool::new(2);
    let mut made = 0;
    let (a, created_a) = pool.acquire(|| { made += 1; made }).unwrap();
    let (b, created_b) = pool.acquire(|| { made += 1; made }).unwrap();
    assert!(created_a && created_b);
    assert!(pool.acquire(|| 0).is_none());

    pool.release(a);
    pool.release(a);
    assert_eq!(pool.free_len(), 1);
    let (c, created_c) = pool.acquire(|| 0).unwrap();
    assert_eq!(c, a);
    assert!(!created_c);

    pool.release(b);
    pool.release(c);
    pool.set_capacity(1);
    let mut destroyed = Vec::new();
    assert_eq!(pool.shrink_to_capacity(|h| destroyed.push(h)), 1);
    assert_eq!(pool.len(), 1);
    assert_eq!(destroyed.len(), 1);
}

// ---------------------------------------------------------------------------------------------
// Options

#[test]
fn misconfigured_layouts_fail_fast() {
    let src = || Source::sequential(3);
    assert_eq!(
        VirtualizationController::new(src(), ControllerOptions::fixed(0.0)).err(),
        Some(Error::InvalidRowHeight(0.0))
    );
    let missing = ControllerOptions {
        layout: LayoutOptions::Measured {
            default_height: None,
        },
        ..ControllerOptions::measured(1.0)
    };
    assert_eq!(
        VirtualizationController::new(src(), missing).err(),
        Some(Error::MissingDefaultHeight)
    );
    assert!(matches!(
        VirtualizationController::new(src(), ControllerOptions::measured(f32::NAN)).err(),
        Some(Error::InvalidDefaultHeight(_))
    ));
}

// ---------------------------------------------------------------------------------------------
// Controller: fixed step

#[test]
fn fixed_step_window_follows_offset() {
    let mut c = fixed(100, 20.0, 200.0);
    assert_eq!(c.visible_item_count(), 11);
    assert_eq!(c.window(), VisibleRange { start_index: 0, end_index: 11 });
    assert_eq!(c.content_height(), 2000.0);
    assert_eq!(c.max_scroll_offset(), 1800.0);

    let stats = c.on_scroll(35.0);
    assert_eq!(c.window(), VisibleRange { start_index: 1, end_index: 12 });
    assert_eq!(stats.unbound, 1);
    assert_eq!(stats.bound, 1);
    assert_eq!(stats.created, 0);

    c.on_scroll(1800.0);
    assert_eq!(c.window(), VisibleRange { start_index: 90, end_index: 100 });
    assert_eq!(bound_indices(&c), (90..100).collect::<Vec<_>>());
}

#[test]
fn slots_report_viewport_local_tops() {
    let mut c = fixed(50, 10.0, 45.0);
    c.on_scroll(15.0);
    let mut tops = Vec::new();
    c.for_each_slot(|s| tops.push((s.index, s.id, s.local_top, s.height)));
    assert_eq!(tops.first(), Some(&(1, 1, -5.0, 10.0)));
    assert_eq!(tops.last().map(|t| t.0), Some(6));
}

#[test]
fn million_rows_stay_within_slot_bound() {
    // 380px at 20px per row shows 20 rows when the offset is not row-aligned.
    let mut c = fixed(1_000_000, 20.0, 380.0);
    assert_eq!(c.visible_item_count(), 20);
    let cap = 20 + c.options().slack;

    let mut rng = Lcg::new(0x5eed);
    for _ in 0..2_000 {
        let offset = rng.gen_f32(0.0, c.max_scroll_offset());
        c.on_scroll(offset);
        assert!(c.bound_len() <= cap);
        assert!(c.pool().len() <= cap);
    }
    c.on_scroll(c.max_scroll_offset());
    assert_eq!(c.window().end_index, 1_000_000);
    assert!(c.source().made <= cap);
}

proptest! {
    #[test]
    fn pool_never_exceeds_visible_plus_slack(
        count in 0usize..5_000,
        row_height in 1.0f32..64.0,
        viewport in 0.0f32..900.0,
        offsets in prop::collection::vec(-500.0f32..200_000.0, 1..30),
    ) {
        let mut c = fixed(count, row_height, viewport);
        for offset in offsets {
            c.on_scroll(offset);
            prop_assert!(c.pool().len() <= c.slot_capacity());
            let bound = bound_indices(&c);
            prop_assert!(bound.windows(2).all(|w| w[1] == w[0] + 1));
            prop_assert_eq!(bound.len(), c.window().len());
        }
    }
}

#[test]
fn randomized_fixed_window_matches_formula() {
    let mut rng = Lcg::new(42);
    for _ in 0..200 {
        let count = rng.gen_range_usize(0, 400);
        let h = rng.gen_range_usize(1, 40) as f32;
        let vp = rng.gen_range_usize(1, 600) as f32;
        let mut c = fixed(count, h, vp);
        let offset = rng.gen_range_usize(0, 20_000) as f32;
        c.on_scroll(offset);

        let first = (offset / h).floor() as usize;
        let last = first + (vp / h).ceil() as usize;
        let start = first.min(count);
        let end = (last + 1).min(count).max(start);
        let expected = if start == end {
            VisibleRange::EMPTY
        } else {
            VisibleRange {
                start_index: start,
                end_index: end,
            }
        };
        assert_eq!(c.window(), expected);
    }
}

#[test]
fn empty_source_returns_every_slot_to_the_free_list() {
    let mut c = fixed(30, 10.0, 50.0);
    assert_eq!(c.bound_len(), 6);

    c.source_mut().ids.replace([]);
    c.items_changed();
    c.refresh(false);
    assert!(c.window().is_empty());
    assert_eq!(c.bound_len(), 0);
    assert_eq!(c.pool().bound_len(), 0);
    assert_eq!(c.pool().free_len(), 6);
    assert_eq!(c.source().unbinds, 6);
}

#[test]
fn forced_refresh_rebinds_without_creating() {
    let mut c = fixed(30, 10.0, 50.0);
    let n = c.bound_len();
    let stats = c.refresh(true);
    assert_eq!(stats.unbound, n);
    assert_eq!(stats.bound, n);
    assert_eq!(stats.created, 0);
    assert!(c.refresh(false).is_noop());
}

#[test]
fn reorder_rebinds_only_rows_whose_id_changed() {
    let mut c = fixed(10, 10.0, 40.0);
    c.source_mut().ids.replace([0, 1, 2, 9, 8, 7, 6, 5, 4, 3]);
    c.items_changed();
    let stats = c.refresh(false);
    // Rows 0..=2 keep their ids, rows 3 and 4 now hold 9 and 8.
    assert_eq!(stats.unbound, 2);
    assert_eq!(stats.bound, 2);
    assert!(c.take_rebuild_request());
}

#[test]
fn shrinking_the_viewport_destroys_only_free_slots() {
    let mut c = fixed(100, 10.0, 100.0);
    assert_eq!(c.pool().len(), 11);
    c.resize(Vec2::new(100.0, 30.0));
    assert_eq!(c.bound_len(), 4);
    assert!(c.pool().len() <= c.slot_capacity());
    assert_eq!(c.source().destroyed, 11 - c.pool().len());

    c.resize(Vec2::new(f32::NAN, -5.0));
    assert_eq!(c.viewport(), Vec2::ZERO);
    assert_eq!(c.bound_len(), 0);
    assert_eq!(c.pool().len(), 0);
}

#[test]
fn bind_requested_rebuild_is_deferred_not_recursive() {
    let mut source = Source::sequential(40);
    source.rebuild_on_bind = Some(2);
    let mut c = VirtualizationController::new(source, ControllerOptions::fixed(10.0)).unwrap();
    c.resize(Vec2::new(10.0, 50.0));

    assert_eq!(c.source().binds, 6);
    assert!(c.rebuild_pending());
    assert!(c.take_rebuild_request());
    assert!(!c.take_rebuild_request());
}

#[test]
fn scroll_to_index_aligns_and_clamps() {
    let mut c = fixed(100, 10.0, 50.0);
    assert_eq!(c.scroll_to_index_offset(20, Align::Start), 200.0);
    assert_eq!(c.scroll_to_index_offset(20, Align::End), 160.0);
    assert_eq!(c.scroll_to_index_offset(20, Align::Center), 180.0);
    assert_eq!(c.scroll_to_index_offset(99, Align::Start), 950.0);
    assert_eq!(c.scroll_to_index_offset(500, Align::Start), 950.0);

    // Already visible: stays put.
    c.on_scroll(100.0);
    assert_eq!(c.scroll_to_index(12), 100.0);
    assert_eq!(c.scroll_to_index(30), 260.0);
    assert_eq!(c.scroll_to_index(3), 30.0);
    assert!(c.window().contains(3));
}

#[test]
fn local_position_maps_to_index() {
    let mut c = fixed(100, 10.0, 50.0);
    c.on_scroll(25.0);
    assert_eq!(c.index_at_local_position(Vec2::new(3.0, 0.0)), Some(2));
    assert_eq!(c.index_at_local_position(Vec2::new(3.0, 6.0)), Some(3));
    assert_eq!(c.index_at_local_position(Vec2::new(3.0, 60.0)), None);
    assert_eq!(c.index_at_local_position(Vec2::new(3.0, -1.0)), None);
}

#[test]
fn selection_state_mirrors_into_slots() {
    let mut c = fixed(20, 10.0, 30.0);
    let mut sel = SelectionModel::new(SelectionMode::Multiple);
    sel.set(c.source(), [1, 3, 15]);
    assert_eq!(c.sync_selection(&sel), 2);
    assert_eq!(c.sync_selection(&sel), 0);

    let mut flags = Vec::new();
    c.for_each_slot(|s| flags.push((s.index, s.is_selected)));
    assert_eq!(flags, vec![(0, false), (1, true), (2, false), (3, true)]);
}

#[test]
fn teardown_destroys_every_slot() {
    let mut c = fixed(20, 10.0, 30.0);
    let made = c.source().made;
    c.teardown();
    assert_eq!(c.source().destroyed, made);
    assert_eq!(c.source().unbinds, made);
    assert!(c.pool().is_empty());
}

// ---------------------------------------------------------------------------------------------
// Controller: measured step

#[test]
fn measuring_a_row_moves_later_slots_without_rebinding() {
    let mut c = measured(100, 20.0, 200.0);
    assert_eq!(c.window(), VisibleRange { start_index: 0, end_index: 11 });
    assert_eq!(c.source().binds, 11);

    assert_eq!(c.measure(0, 40.0), 0.0);
    assert_eq!(c.source().binds, 11);
    assert_eq!(c.window(), VisibleRange { start_index: 0, end_index: 10 });
    assert_eq!(c.row_top(3), Some(80.0));
    assert_eq!(c.content_height(), 2020.0);
    assert!(c.is_measured(0));
    assert!(!c.is_measured(1));

    let mut tops = Vec::new();
    c.for_each_slot(|s| tops.push((s.index, s.local_top)));
    assert_eq!(tops[3], (3, 80.0));
}

#[test]
fn measuring_above_the_offset_keeps_content_in_place() {
    let mut c = measured(100, 20.0, 200.0);
    c.on_scroll(400.0);
    assert_eq!(c.measure(5, 50.0), 30.0);
    assert_eq!(c.offset(), 430.0);
    assert_eq!(c.window().start_index, 20);

    // Rows at or below the offset do not adjust.
    assert_eq!(c.measure(30, 5.0), 0.0);
    assert_eq!(c.offset(), 430.0);

    let mut c = VirtualizationController::new(
        Source::sequential(100),
        ControllerOptions::measured(20.0).with_adjust_scroll_on_resize(false),
    )
    .unwrap();
    c.resize(Vec2::new(100.0, 200.0));
    c.on_scroll(400.0);
    assert_eq!(c.measure(5, 50.0), 0.0);
    assert_eq!(c.offset(), 400.0);
}

#[test]
fn measured_heights_follow_ids_across_reorder() {
    let mut c = measured(10, 10.0, 100.0);
    let applied = c.measure_many([(0, 30.0), (1, 15.0)]);
    assert_eq!(applied, 0.0);
    assert_eq!(c.measurement_cache_len(), 2);

    c.source_mut().ids.reverse();
    c.items_changed();
    c.refresh(false);
    assert_eq!(c.row_height(9), Some(30.0));
    assert_eq!(c.row_height(8), Some(15.0));
    assert_eq!(c.row_height(0), Some(10.0));
    assert_eq!(c.content_height(), 125.0);
}

#[test]
fn measurements_export_and_import_by_id() {
    let mut a = measured(20, 10.0, 50.0);
    a.measure_many([(2, 40.0), (4, 25.0)]);
    let mut saved = a.export_measurements();
    saved.sort_by_key(|&(id, _)| id);
    assert_eq!(saved, vec![(2, 40.0), (4, 25.0)]);

    let mut b = measured(20, 10.0, 50.0);
    b.import_measurements(saved.into_iter().chain([(7, f32::NAN)]));
    assert_eq!(b.measurement_cache_len(), 2);
    assert_eq!(b.row_height(2), Some(40.0));
    assert_eq!(b.content_height(), a.content_height());

    b.reset_measurements();
    assert_eq!(b.content_height(), 200.0);
}

#[test]
fn appended_rows_use_cached_heights() {
    let mut c = measured(3, 10.0, 100.0);
    c.import_measurements([(4, 50.0)]);
    for id in 3..6 {
        c.source_mut().ids.push(id);
    }
    c.items_resized();
    c.refresh(false);
    assert_eq!(c.item_count(), 6);
    assert_eq!(c.row_height(4), Some(50.0));
    assert_eq!(c.content_height(), 100.0);
}

#[test]
fn randomized_measured_layout_matches_brute_force() {
    let mut rng = Lcg::new(7);
    for _ in 0..50 {
        let count = rng.gen_range_usize(1, 200);
        let mut c = measured(count, 12.0, 150.0);
        let mut heights = vec![12.0f32; count];
        for _ in 0..rng.gen_range_usize(0, 60) {
            let i = rng.gen_range_usize(0, count);
            let h = rng.gen_range_usize(1, 80) as f32;
            heights[i] = h;
            c.measure(i, h);
        }
        let total: f32 = heights.iter().sum();
        assert!((c.content_height() - total).abs() < 1e-3);

        let mut top = 0.0;
        for (i, &h) in heights.iter().enumerate() {
            assert!((c.row_top(i).unwrap() - top).abs() < 1e-3);
            top += h;
        }
        assert!(c.pool().len() <= c.slot_capacity());
    }
}

#[test]
fn collapsed_rows_do_not_crowd_visible_rows_out_of_the_window() {
    let mut c = measured(1000, 20.0, 100.0);
    c.measure_many((1..=300).map(|i| (i, 0.0)));
    assert_eq!(c.row_height(1), Some(1.0));
    assert_eq!(c.row_top(301), Some(320.0));

    let bound = bound_indices(&c);
    for index in 0..c.item_count() {
        let top = c.row_top(index).unwrap();
        if top < 100.0 {
            assert!(bound.contains(&index), "row {index} at {top} is visible but unbound");
        }
    }
    assert!(bound.len() <= c.slot_capacity());
}

#[test]
fn huge_viewports_saturate_instead_of_overflowing() {
    let mut c = fixed(10, 20.0, 100.0);
    c.resize(Vec2::new(100.0, 1.0e30));
    assert_eq!(c.visible_item_count(), usize::MAX);
    assert_eq!(c.slot_capacity(), usize::MAX);
    assert_eq!(c.window(), VisibleRange { start_index: 0, end_index: 10 });
    assert_eq!(c.bound_len(), 10);

    let mut m = measured(10, 20.0, 100.0);
    m.resize(Vec2::new(100.0, f32::MAX));
    assert_eq!(m.window(), VisibleRange { start_index: 0, end_index: 10 });
    assert_eq!(m.bound_len(), 10);
}

// ---------------------------------------------------------------------------------------------
// Physics

fn physics(boundary: BoundaryPolicy) -> ScrollPhysics {
    let mut p = ScrollPhysics::new(PhysicsOptions::default().with_boundary(boundary));
    p.set_limits(Vec2::ZERO, Vec2::new(0.0, 500.0)).unwrap();
    p
}

#[test]
fn shifting_during_a_drag_keeps_the_grab_point() {
    let mut p = physics(BoundaryPolicy::Clamped);
    p.pointer_down(Vec2::new(0.0, 300.0), 0);
    p.pointer_move(Vec2::new(0.0, 200.0), 16);
    assert_eq!(p.offset().y, 100.0);

    p.shift_offset(Vec2::new(0.0, 40.0));
    assert_eq!(p.state(), PhysicsState::Tracking);
    assert_eq!(p.offset().y, 140.0);
    p.pointer_move(Vec2::new(0.0, 180.0), 32);
    assert_eq!(p.offset().y, 160.0);
}

#[test]
fn clamped_drag_never_leaves_bounds() {
    let mut p = physics(BoundaryPolicy::Clamped);
    p.pointer_down(Vec2::new(0.0, 0.0), 0);
    p.pointer_move(Vec2::new(0.0, 400.0), 16);
    p.pointer_move(Vec2::new(0.0, 800.0), 32);
    assert_eq!(p.state(), PhysicsState::Tracking);
    assert_eq!(p.offset().y, 0.0);

    p.pointer_move(Vec2::new(0.0, -2000.0), 48);
    assert_eq!(p.offset().y, 500.0);
}

#[test]
fn elastic_overscroll_springs_back_monotonically() {
    let mut p = physics(BoundaryPolicy::Elastic);
    p.pointer_down(Vec2::new(0.0, 0.0), 0);
    p.pointer_move(Vec2::new(0.0, 50.0), 16);
    p.pointer_move(Vec2::new(0.0, 100.0), 32);
    assert!((p.offset().y + 50.0).abs() < 1e-3);

    // Hold still, then release.
    p.pointer_up(1_032);
    assert_eq!(p.state(), PhysicsState::Settling);

    let mut prev = p.offset().y;
    let mut now = 1_032;
    let mut ticks = 0;
    while p.settle(now + 16) {
        now += 16;
        ticks += 1;
        let y = p.offset().y;
        assert!(y >= prev, "spring-back went backwards: {prev} -> {y}");
        assert!(y <= 0.0);
        prev = y;
        assert!(ticks < 120, "spring-back did not terminate");
    }
    assert_eq!(p.offset().y, 0.0);
    assert_eq!(p.state(), PhysicsState::Idle);
}

#[test]
fn grabbing_overscrolled_content_does_not_jump() {
    let mut p = physics(BoundaryPolicy::Elastic);
    p.pointer_down(Vec2::ZERO, 0);
    p.pointer_move(Vec2::new(0.0, 100.0), 16);
    p.pointer_up(500);
    p.settle(516);
    let y = p.offset().y;
    assert!(y < 0.0);

    p.pointer_down(Vec2::new(0.0, 100.0), 520);
    p.pointer_move(Vec2::new(0.0, 100.0), 536);
    assert!((p.offset().y - y).abs() < 1e-2);
}

#[test]
fn unrestricted_drag_ignores_limits() {
    let mut p = physics(BoundaryPolicy::Unrestricted);
    p.pointer_down(Vec2::ZERO, 0);
    p.pointer_move(Vec2::new(0.0, 300.0), 16);
    assert_eq!(p.offset().y, -300.0);
}

fn fling(p: &mut ScrollPhysics) {
    p.pointer_down(Vec2::new(0.0, 500.0), 0);
    p.pointer_move(Vec2::new(0.0, 400.0), 16);
    p.pointer_move(Vec2::new(0.0, 300.0), 32);
    p.pointer_move(Vec2::new(0.0, 200.0), 48);
    p.pointer_up(48);
}

#[test]
fn settling_depends_on_elapsed_time_not_frame_slicing() {
    let mut limits = ScrollPhysics::new(
        PhysicsOptions::default().with_boundary(BoundaryPolicy::Unrestricted),
    );
    limits.set_limits(Vec2::ZERO, Vec2::new(0.0, 100_000.0)).unwrap();
    let mut a = limits.clone();
    let mut b = limits;
    fling(&mut a);
    fling(&mut b);
    assert!(a.is_settling());
    assert!(a.velocity().y > 0.0);

    let end = 48 + 1_010;
    let mut now = 48;
    while now < end {
        now = (now + 16).min(end);
        a.settle(now);
    }
    let mut rng = Lcg::new(99);
    let mut now = 48;
    while now < end {
        now = (now + rng.gen_range_u64(1, 70)).min(end);
        b.settle(now);
    }
    assert!((a.offset().y - b.offset().y).abs() < 1e-3);
    assert!((a.velocity().y - b.velocity().y).abs() < 1e-3);
}

#[test]
fn inertia_decays_and_stops() {
    let mut p = ScrollPhysics::new(
        PhysicsOptions::default().with_boundary(BoundaryPolicy::Unrestricted),
    );
    p.set_limits(Vec2::ZERO, Vec2::new(0.0, 100_000.0)).unwrap();
    fling(&mut p);
    let v0 = p.velocity().y;

    let mut now = 48;
    let mut prev = p.offset().y;
    while p.settle(now + 16) {
        now += 16;
        assert!(p.offset().y >= prev);
        prev = p.offset().y;
        assert!(now < 60_000);
    }
    assert!(p.offset().y > 300.0);
    assert!(v0 > 0.0);
    assert_eq!(p.velocity(), Vec2::ZERO);
}

#[test]
fn clamped_inertia_stops_at_the_bound() {
    let mut p = physics(BoundaryPolicy::Clamped);
    p.set_offset(Vec2::new(0.0, 450.0));
    p.pointer_down(Vec2::new(0.0, 500.0), 0);
    p.pointer_move(Vec2::new(0.0, 480.0), 16);
    p.pointer_move(Vec2::new(0.0, 460.0), 32);
    p.pointer_up(32);
    let mut now = 32;
    while p.settle(now + 16) {
        now += 16;
        assert!(p.offset().y <= 500.0);
    }
    assert_eq!(p.offset().y, 500.0);
    assert_eq!(p.state(), PhysicsState::Idle);
}

#[test]
fn release_without_motion_goes_idle() {
    let mut p = physics(BoundaryPolicy::Elastic);
    p.pointer_down(Vec2::ZERO, 0);
    p.pointer_up(10);
    assert_eq!(p.state(), PhysicsState::Idle);
    assert!(!p.settle(100));
}

#[test]
fn inverted_limits_are_rejected_or_swapped() {
    let mut p = ScrollPhysics::default();
    assert_eq!(
        p.set_limits(Vec2::new(0.0, 10.0), Vec2::new(0.0, 5.0)),
        Err(Error::InvertedLimits {
            axis: Axis::Y,
            low: 10.0,
            high: 5.0
        })
    );
    p.fit_limits(Vec2::new(0.0, 10.0), Vec2::new(0.0, 5.0));
    assert_eq!(p.low().y, 5.0);
    assert_eq!(p.high().y, 10.0);
}

#[test]
fn scroll_by_clamps_and_cancels_settling() {
    let mut p = physics(BoundaryPolicy::Elastic);
    p.pointer_down(Vec2::ZERO, 0);
    p.pointer_move(Vec2::new(0.0, 60.0), 16);
    p.pointer_up(16);
    assert!(p.is_settling());

    p.scroll_by(Vec2::new(0.0, 1_000.0));
    assert_eq!(p.state(), PhysicsState::Idle);
    assert_eq!(p.offset().y, 500.0);
}

#[test]
fn shrinking_limits_pull_a_resting_offset_back() {
    let mut p = physics(BoundaryPolicy::Elastic);
    p.set_offset(Vec2::new(0.0, 400.0));
    p.fit_limits(Vec2::ZERO, Vec2::new(0.0, 100.0));
    assert_eq!(p.offset().y, 100.0);
}

// ---------------------------------------------------------------------------------------------
// Scheduler

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Task {
    Rebuild,
    Settle,
}

#[test]
fn rescheduling_collapses_duplicate_requests() {
    let mut s = Scheduler::new();
    s.schedule(Task::Rebuild, 16);
    s.schedule(Task::Rebuild, 16);
    s.schedule(Task::Rebuild, 32);
    assert_eq!(s.len(), 1);
    assert!(s.pop_due(16).is_empty());
    assert_eq!(s.pop_due(32), vec![Task::Rebuild]);
    assert!(s.is_empty());
}

#[test]
fn due_tasks_come_out_in_deadline_order() {
    let mut s = Scheduler::new();
    s.schedule(Task::Settle, 20);
    s.schedule(Task::Rebuild, 10);
    assert_eq!(s.next_due(), Some(10));
    assert_eq!(s.pop_due(100), vec![Task::Rebuild, Task::Settle]);
}

#[test]
fn pause_holds_and_cancel_drops() {
    let mut s = Scheduler::new();
    s.schedule(Task::Settle, 0);
    s.pause();
    s.pause();
    assert!(s.pop_due(100).is_empty());
    assert!(s.is_scheduled(Task::Settle));
    s.resume();
    s.resume();
    assert_eq!(s.pop_due(100), vec![Task::Settle]);

    s.schedule(Task::Rebuild, 5);
    s.schedule(Task::Settle, 5);
    assert!(s.cancel(Task::Rebuild));
    assert!(!s.cancel(Task::Rebuild));
    s.cancel_all();
    assert!(s.pop_due(100).is_empty());
}
