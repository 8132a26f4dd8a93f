use std::collections::HashMap;

use crate::fenwick::Fenwick;
use crate::{IdentityMap, ItemId, LayoutOptions, VisibleRange};

// Measured rows are never shorter than this. The slot pool is sized from the shortest row, so
// collapsed rows would otherwise crowd visible ones out of the window.
const MIN_ROW_HEIGHT: f32 = 1.0;

/// Uniform rows: every offset ↔ index translation is `O(1)`.
#[derive(Clone, Debug)]
pub(crate) struct FixedStep {
    row_height: f32,
    count: usize,
}

/// Variable rows: heights start as an estimate and are replaced once measured.
#[derive(Clone, Debug)]
pub(crate) struct MeasuredStep {
    default_height: f32,
    heights: Vec<f32>,
    measured: Vec<bool>,
    sums: Fenwick,
    cache: HashMap<ItemId, f32>,
    min_height: f32,
}

/// The two layout strategies behind one contract.
#[derive(Clone, Debug)]
pub(crate) enum Layout {
    Fixed(FixedStep),
    Measured(MeasuredStep),
}

impl Layout {
    /// Builds a layout from already validated options.
    pub(crate) fn new(options: LayoutOptions, source: &impl IdentityMap) -> Self {
        let mut layout = match options {
            LayoutOptions::Fixed { row_height } => Self::Fixed(FixedStep {
                row_height,
                count: 0,
            }),
            LayoutOptions::Measured { default_height } => {
                let default_height = default_height.unwrap_or(MIN_ROW_HEIGHT).max(MIN_ROW_HEIGHT);
                Self::Measured(MeasuredStep {
                    default_height,
                    heights: Vec::new(),
                    measured: Vec::new(),
                    sums: Fenwick::default(),
                    cache: HashMap::new(),
                    min_height: default_height,
                })
            }
        };
        layout.sync(source);
        layout
    }

    pub(crate) fn count(&self) -> usize {
        match self {
            Self::Fixed(f) => f.count,
            Self::Measured(m) => m.heights.len(),
        }
    }

    pub(crate) fn content_height(&self) -> f32 {
        match self {
            Self::Fixed(f) => f.count as f32 * f.row_height,
            Self::Measured(m) => m.sums.total() as f32,
        }
    }

    pub(crate) fn row_top(&self, index: usize) -> f32 {
        match self {
            Self::Fixed(f) => index as f32 * f.row_height,
            Self::Measured(m) => m.sums.prefix_sum(index) as f32,
        }
    }

    pub(crate) fn row_height(&self, index: usize) -> f32 {
        match self {
            Self::Fixed(f) => f.row_height,
            Self::Measured(m) => m.heights.get(index).copied().unwrap_or(0.0),
        }
    }

    /// Index of the row under content coordinate `y`, if any.
    pub(crate) fn index_at(&self, y: f32) -> Option<usize> {
        let count = self.count();
        if count == 0 || !y.is_finite() || y < 0.0 || y >= self.content_height() {
            return None;
        }
        let index = match self {
            Self::Fixed(f) => (y / f.row_height).floor() as usize,
            Self::Measured(m) => m.sums.lower_bound(y as f64),
        };
        Some(index.min(count - 1))
    }

    /// Upper bound on how many rows a viewport of this height can show at once.
    pub(crate) fn visible_item_count(&self, viewport_height: f32) -> usize {
        if viewport_height <= 0.0 {
            return 0;
        }
        let step = match self {
            Self::Fixed(f) => f.row_height,
            Self::Measured(m) => m.min_height,
        };
        ((viewport_height / step).ceil() as usize).saturating_add(1)
    }

    /// Rows intersecting `[offset, offset + viewport_height]`, clamped to `[0, count)`.
    pub(crate) fn window(&self, offset: f32, viewport_height: f32) -> VisibleRange {
        let count = self.count();
        if count == 0 || viewport_height <= 0.0 || !offset.is_finite() {
            return VisibleRange::EMPTY;
        }
        match self {
            Self::Fixed(f) => {
                let first = (offset / f.row_height).floor() as i64;
                let last = first.saturating_add((viewport_height / f.row_height).ceil() as i64);
                clamp_window(first, last, count)
            }
            Self::Measured(m) => {
                let end_y = offset + viewport_height;
                if end_y <= 0.0 || offset >= m.sums.total() as f32 {
                    return VisibleRange::EMPTY;
                }
                let first = if offset <= 0.0 {
                    0
                } else {
                    m.sums.lower_bound(offset as f64)
                };
                let last = m.sums.lower_bound(end_y as f64);
                clamp_window(first as i64, last as i64, count)
            }
        }
    }

    /// Re-reads the item count (and, for measured rows, the per-index heights by id).
    pub(crate) fn sync(&mut self, source: &impl IdentityMap) {
        let count = source.item_count();
        match self {
            Self::Fixed(f) => f.count = count,
            Self::Measured(m) => m.sync(source, count),
        }
    }

    /// Follows a count change that kept existing rows in place (append or truncate at the end).
    ///
    /// Cheaper than [`Self::sync`]: existing heights are preserved, appended rows use the
    /// measurement cache or the estimate.
    pub(crate) fn set_count(&mut self, source: &impl IdentityMap, count: usize) {
        match self {
            Self::Fixed(f) => f.count = count,
            Self::Measured(m) => {
                if count <= m.heights.len() {
                    m.truncate(count);
                } else {
                    for i in m.heights.len()..count {
                        m.push_row(source.id_for_index(i));
                    }
                }
            }
        }
    }

    pub(crate) fn as_measured_mut(&mut self) -> Option<&mut MeasuredStep> {
        match self {
            Self::Fixed(_) => None,
            Self::Measured(m) => Some(m),
        }
    }

    pub(crate) fn as_measured(&self) -> Option<&MeasuredStep> {
        match self {
            Self::Fixed(_) => None,
            Self::Measured(m) => Some(m),
        }
    }
}

impl MeasuredStep {
    fn sync(&mut self, source: &impl IdentityMap, count: usize) {
        self.heights.clear();
        self.measured.clear();
        self.heights.reserve_exact(count);
        self.measured.reserve_exact(count);
        let mut min_height = self.default_height;

        for i in 0..count {
            let id = source.id_for_index(i);
            match self.cache.get(&id) {
                Some(&h) => {
                    self.heights.push(h);
                    self.measured.push(true);
                    min_height = min_height.min(h);
                }
                None => {
                    self.heights.push(self.default_height);
                    self.measured.push(false);
                }
            }
        }
        self.min_height = min_height;
        self.sums = Fenwick::from_heights(&self.heights);
        debug_assert_eq!(self.sums.len(), count);
    }

    pub(crate) fn is_measured(&self, index: usize) -> bool {
        self.measured.get(index).copied().unwrap_or(false)
    }

    /// Records a measured height (raised to `MIN_ROW_HEIGHT`) and returns `new - old`.
    pub(crate) fn set_height(&mut self, index: usize, id: ItemId, height: f32) -> f32 {
        let Some(cur) = self.heights.get(index).copied() else {
            return 0.0;
        };
        let height = height.max(MIN_ROW_HEIGHT);
        self.measured[index] = true;
        self.cache.insert(id, height);
        self.min_height = self.min_height.min(height);
        if cur == height {
            return 0.0;
        }
        self.heights[index] = height;
        let delta = height - cur;
        self.sums.add(index, delta as f64);
        delta
    }

    pub(crate) fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub(crate) fn export_cache(&self) -> Vec<(ItemId, f32)> {
        self.cache.iter().map(|(&id, &h)| (id, h)).collect()
    }

    pub(crate) fn import_cache(&mut self, entries: impl IntoIterator<Item = (ItemId, f32)>) {
        self.cache.clear();
        self.cache.extend(
            entries
                .into_iter()
                .filter(|&(_, h)| h.is_finite() && h >= 0.0)
                .map(|(id, h)| (id, h.max(MIN_ROW_HEIGHT))),
        );
    }

    pub(crate) fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn truncate(&mut self, count: usize) {
        self.heights.truncate(count);
        self.measured.truncate(count);
        self.sums.truncate(count);
    }

    fn push_row(&mut self, id: ItemId) {
        let (h, measured) = match self.cache.get(&id) {
            Some(&h) => (h, true),
            None => (self.default_height, false),
        };
        self.min_height = self.min_height.min(h);
        self.heights.push(h);
        self.measured.push(measured);
        self.sums.push(h as f64);
    }
}

fn clamp_window(first: i64, last_inclusive: i64, count: usize) -> VisibleRange {
    let count = count as i64;
    let start = first.clamp(0, count);
    let end = last_inclusive.saturating_add(1).clamp(start, count);
    VisibleRange {
        start_index: start as usize,
        end_index: end as usize,
    }
}
