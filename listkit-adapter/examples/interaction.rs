// Example: driving selection and scroll physics from raw pointer/keyboard input.
use listkit::{
    BindContext, ControllerOptions, IdList, IdentityMap, ItemFactory, ItemId, PhysicsOptions,
    SelectionMode, Vec2, VirtualizationController,
};
use listkit_adapter::{
    InteractionCoordinator, InteractionOptions, Modifiers, NavigationCommand, PointerEvent,
};

struct Files {
    ids: IdList,
}

impl IdentityMap for Files {
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

impl ItemFactory for Files {
    type Handle = ();

    fn make_item(&mut self) {}

    fn bind_item(&mut self, _: &mut (), _index: usize, _cx: &mut BindContext) {}

    fn unbind_item(&mut self, _: &mut (), _index: usize) {}

    fn destroy_item(&mut self, _: ()) {}
}

fn main() {
    let files = Files {
        ids: IdList::sequential(5_000),
    };
    let controller =
        VirtualizationController::new(files, ControllerOptions::fixed(24.0)).expect("valid layout");
    let mut c = InteractionCoordinator::new(
        controller,
        SelectionMode::Multiple,
        PhysicsOptions::default(),
        InteractionOptions::default(),
    );
    c.resize(Vec2::new(300.0, 480.0));

    // Click row 2, shift-click row 6.
    let press =
        |y: f32, t: u64, m: Modifiers| PointerEvent::new(Vec2::new(40.0, y), t).with_modifiers(m);
    c.pointer_down(press(60.0, 0, Modifiers::NONE));
    c.pointer_up(press(60.0, 10, Modifiers::NONE));
    c.pointer_down(press(150.0, 800, Modifiers::SHIFT));
    c.pointer_up(press(150.0, 810, Modifiers::SHIFT));
    println!("selected: {:?}", c.selection().indices());

    // Fling upwards and let it settle.
    c.pointer_down(PointerEvent::new(Vec2::new(40.0, 400.0), 2_000));
    for (i, y) in [360.0, 300.0, 220.0, 120.0].into_iter().enumerate() {
        c.pointer_move(PointerEvent::new(Vec2::new(40.0, y), 2_000 + 16 * (i as u64 + 1)));
    }
    c.pointer_up(PointerEvent::new(Vec2::new(40.0, 120.0), 2_064));
    let mut now = 2_080;
    while c.tick(now) {
        now += 16;
    }
    println!(
        "settled at offset {:.1} after {}ms, window {:?}",
        c.controller().offset(),
        now - 2_064,
        c.controller().window()
    );

    c.navigate(NavigationCommand::End, false);
    println!(
        "end: selected {:?}, offset {}",
        c.selection().indices(),
        c.controller().offset()
    );

    let snapshot = c.snapshot();
    println!("snapshot: {snapshot:?}");
    for event in c.drain_events() {
        println!("event: {event:?}");
    }
}
