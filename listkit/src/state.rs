use crate::{ItemId, Vec2};

/// Persistable view state: where the list was scrolled to and what was selected.
///
/// Selection is captured by id so it survives reorders and filtering between save and restore.
/// Writing and reading the blob is up to the host; with `feature = "serde"`, this type
/// implements `Serialize`/`Deserialize`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewSnapshot {
    pub offset: Vec2,
    /// Selected ids in selection order.
    pub selected_ids: Vec<ItemId>,
    /// The edge range selection extends from, if anything was selected.
    pub anchor_index: Option<usize>,
}

impl ViewSnapshot {
    pub fn is_empty(&self) -> bool {
        self.offset == Vec2::ZERO && self.selected_ids.is_empty()
    }
}
