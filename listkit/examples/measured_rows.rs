// Example: variable-height rows measured after layout, with the cache following ids.
use listkit::{
    BindContext, ControllerOptions, IdList, IdentityMap, ItemFactory, ItemId, Vec2,
    VirtualizationController,
};

struct Messages {
    ids: IdList,
}

impl IdentityMap for Messages {
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

impl ItemFactory for Messages {
    type Handle = Option<ItemId>;

    fn make_item(&mut self) -> Option<ItemId> {
        None
    }

    fn bind_item(&mut self, slot: &mut Option<ItemId>, index: usize, _cx: &mut BindContext) {
        *slot = Some(self.ids.id_for_index(index));
    }

    fn unbind_item(&mut self, slot: &mut Option<ItemId>, _index: usize) {
        *slot = None;
    }

    fn destroy_item(&mut self, _slot: Option<ItemId>) {}
}

// Pretend layout: longer messages wrap onto more lines.
fn realized_height(id: ItemId) -> f32 {
    16.0 * (1 + id % 4) as f32
}

fn main() {
    let messages = Messages {
        ids: IdList::sequential(10_000),
    };
    let mut c = VirtualizationController::new(messages, ControllerOptions::measured(16.0))
        .expect("valid layout");
    c.resize(Vec2::new(400.0, 300.0));
    c.on_scroll(2_000.0);

    // Measure whatever got realized, as a renderer would after its layout pass.
    let mut realized = Vec::new();
    c.for_each_slot(|s| realized.push((s.index, s.id)));
    let adjust = c.measure_many(
        realized
            .iter()
            .map(|&(index, id)| (index, realized_height(id))),
    );
    println!("measured {} rows, scroll adjusted by {adjust}px", realized.len());
    println!("content height: {}", c.content_height());

    // Reverse the list: measured heights stay with their ids.
    let first = realized[0];
    c.source_mut().ids.reverse();
    c.items_changed();
    c.refresh(false);
    let moved_to = c.source().index_for_id(first.1).unwrap_or_default();
    println!(
        "id {} moved {} -> {moved_to}, height {:?}",
        first.1,
        first.0,
        c.row_height(moved_to)
    );

    let saved = c.export_measurements();
    println!("persisted {} measurements", saved.len());
}
