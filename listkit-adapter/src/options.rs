/// Configuration for [`crate::InteractionCoordinator`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractionOptions {
    /// Pointer travel (px) below which a press-release is a click, not a drag.
    pub drag_threshold: f32,
    /// Maximum gap between clicks of one multi-click sequence.
    pub double_click_ms: u64,
    /// Maximum distance (px) between clicks of one multi-click sequence.
    pub double_click_distance: f32,
    /// Delay between scheduled settle ticks.
    pub tick_interval_ms: u64,
    /// Multiplier applied to wheel deltas.
    pub wheel_step: f32,
}

impl Default for InteractionOptions {
    fn default() -> Self {
        Self {
            drag_threshold: 5.0,
            double_click_ms: 500,
            double_click_distance: 8.0,
            tick_interval_ms: 16,
            wheel_step: 1.0,
        }
    }
}

impl InteractionOptions {
    pub fn with_drag_threshold(mut self, px: f32) -> Self {
        self.drag_threshold = px;
        self
    }

    pub fn with_double_click(mut self, max_ms: u64, max_distance: f32) -> Self {
        self.double_click_ms = max_ms;
        self.double_click_distance = max_distance;
        self
    }

    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    pub fn with_wheel_step(mut self, step: f32) -> Self {
        self.wheel_step = step;
        self
    }

    pub(crate) fn drag_threshold_sq(&self) -> f32 {
        let t = if self.drag_threshold.is_finite() {
            self.drag_threshold.max(0.0)
        } else {
            0.0
        };
        t * t
    }
}
