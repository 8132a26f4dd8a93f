use listkit::Vec2;

/// Where a press falls within a multi-click sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClickInfo {
    /// 1 for a single click, 2 for a double click, and so on.
    pub count: u32,
    /// Whether the pressed row was selected before the first click of the sequence.
    pub was_selected: bool,
}

#[derive(Clone, Copy, Debug)]
struct LastClick {
    at_ms: u64,
    position: Vec2,
    index: Option<usize>,
    count: u32,
    was_selected: bool,
}

/// Groups presses into multi-click sequences by time, distance and row.
#[derive(Clone, Debug)]
pub struct ClickTracker {
    max_interval_ms: u64,
    max_distance_sq: f32,
    last: Option<LastClick>,
}

impl ClickTracker {
    pub fn new(max_interval_ms: u64, max_distance: f32) -> Self {
        Self {
            max_interval_ms,
            max_distance_sq: max_distance * max_distance,
            last: None,
        }
    }

    /// Records a press on `index`. `is_selected` is only consulted when a new sequence starts.
    pub fn press(
        &mut self,
        position: Vec2,
        at_ms: u64,
        index: Option<usize>,
        is_selected: impl FnOnce() -> bool,
    ) -> ClickInfo {
        let continues = self.last.filter(|last| {
            at_ms.saturating_sub(last.at_ms) <= self.max_interval_ms
                && (position - last.position).length_squared() <= self.max_distance_sq
                && last.index == index
        });
        let next = match continues {
            Some(last) => LastClick {
                at_ms,
                position,
                index,
                count: last.count.saturating_add(1),
                was_selected: last.was_selected,
            },
            None => LastClick {
                at_ms,
                position,
                index,
                count: 1,
                was_selected: is_selected(),
            },
        };
        self.last = Some(next);
        ClickInfo {
            count: next.count,
            was_selected: next.was_selected,
        }
    }

    /// Ends the current sequence (a drag happened, or the gesture was cancelled).
    pub fn reset(&mut self) {
        self.last = None;
    }
}
