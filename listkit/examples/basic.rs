// Example: a million fixed-height rows backed by a handful of pooled view items.
use listkit::{
    Align, BindContext, ControllerOptions, IdList, IdentityMap, ItemFactory, ItemId, Vec2,
    VirtualizationController,
};

struct Rows {
    ids: IdList,
    created: usize,
}

impl IdentityMap for Rows {
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

impl ItemFactory for Rows {
    type Handle = String;

    fn make_item(&mut self) -> String {
        self.created += 1;
        String::new()
    }

    fn bind_item(&mut self, label: &mut String, index: usize, _cx: &mut BindContext) {
        *label = format!("row #{index}");
    }

    fn unbind_item(&mut self, label: &mut String, _index: usize) {
        label.clear();
    }

    fn destroy_item(&mut self, _label: String) {}
}

fn main() {
    let rows = Rows {
        ids: IdList::sequential(1_000_000),
        created: 0,
    };
    let mut c = VirtualizationController::new(rows, ControllerOptions::fixed(18.0))
        .expect("valid layout");
    c.resize(Vec2::new(320.0, 240.0));

    for offset in [0.0, 9_000.0, 123_456.0, 4_000_000.0] {
        let stats = c.on_scroll(offset);
        println!("offset={offset} window={:?} stats={stats:?}", c.window());
    }

    let off = c.scroll_to_index_aligned(999_999, Align::End);
    println!("after scroll_to_index: offset={off}");
    c.for_each_slot(|s| println!("  {:>7.1}px {}", s.local_top, s.handle));
    println!(
        "view items created: {} (capacity {})",
        c.source().created,
        c.slot_capacity()
    );
}
