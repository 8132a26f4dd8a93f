use crate::{Error, Result};

/// How row heights are known.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LayoutOptions {
    /// Every row has the same height.
    Fixed { row_height: f32 },
    /// Rows report their height after they are realized; `default_height` is the estimate
    /// used until then.
    Measured { default_height: Option<f32> },
}

/// Configuration for [`crate::VirtualizationController`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerOptions {
    pub layout: LayoutOptions,
    /// Extra slots allowed on top of the visible row count.
    pub slack: usize,
    /// Whether measuring a row that starts above the scroll offset shifts the offset by the
    /// height delta, keeping visible content in place.
    pub adjust_scroll_on_resize: bool,
}

impl ControllerOptions {
    pub fn fixed(row_height: f32) -> Self {
        Self {
            layout: LayoutOptions::Fixed { row_height },
            slack: 2,
            adjust_scroll_on_resize: true,
        }
    }

    pub fn measured(default_height: f32) -> Self {
        Self {
            layout: LayoutOptions::Measured {
                default_height: Some(default_height),
            },
            slack: 2,
            adjust_scroll_on_resize: true,
        }
    }

    pub fn with_slack(mut self, slack: usize) -> Self {
        self.slack = slack;
        self
    }

    pub fn with_adjust_scroll_on_resize(mut self, adjust: bool) -> Self {
        self.adjust_scroll_on_resize = adjust;
        self
    }

    /// Rejects layouts the controller cannot render.
    pub fn validate(&self) -> Result<()> {
        match self.layout {
            LayoutOptions::Fixed { row_height } => {
                if !(row_height.is_finite() && row_height > 0.0) {
                    return Err(Error::InvalidRowHeight(row_height));
                }
            }
            LayoutOptions::Measured { default_height } => {
                let h = default_height.ok_or(Error::MissingDefaultHeight)?;
                if !(h.is_finite() && h > 0.0) {
                    return Err(Error::InvalidDefaultHeight(h));
                }
            }
        }
        Ok(())
    }
}

/// What happens when a drag pushes the offset past the scroll limits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundaryPolicy {
    /// Hard stop at the limits.
    Clamped,
    /// Resist with diminishing returns, then spring back on release.
    #[default]
    Elastic,
    /// No limits at all.
    Unrestricted,
}

/// Configuration for [`crate::ScrollPhysics`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhysicsOptions {
    pub boundary: BoundaryPolicy,
    /// Width of the elastic resistance curve, in pixels.
    pub elastic_width: f32,
    /// Spring-back smoothing time, in seconds.
    pub elasticity: f32,
    /// Enables inertial scrolling after release.
    pub inertia: bool,
    /// Fraction of velocity kept after one second of inertia.
    pub deceleration_rate: f32,
    /// Scales the velocity/snap thresholds for high-density displays.
    pub pixels_per_point: f32,
    /// How fast the tracked velocity follows new samples, per second.
    pub velocity_smoothing: f32,
    /// Samples further apart than this decay the tracked velocity before blending.
    pub max_sample_gap_ms: u64,
}

impl Default for PhysicsOptions {
    fn default() -> Self {
        Self {
            boundary: BoundaryPolicy::Elastic,
            elastic_width: 100.0,
            elasticity: 0.1,
            inertia: true,
            deceleration_rate: 0.135,
            pixels_per_point: 1.0,
            velocity_smoothing: 10.0,
            max_sample_gap_ms: 100,
        }
    }
}

impl PhysicsOptions {
    pub fn with_boundary(mut self, boundary: BoundaryPolicy) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_elastic_width(mut self, width: f32) -> Self {
        self.elastic_width = width;
        self
    }

    pub fn with_elasticity(mut self, elasticity: f32) -> Self {
        self.elasticity = elasticity;
        self
    }

    pub fn with_inertia(mut self, inertia: bool) -> Self {
        self.inertia = inertia;
        self
    }

    pub fn with_deceleration_rate(mut self, rate: f32) -> Self {
        self.deceleration_rate = rate;
        self
    }

    pub fn with_pixels_per_point(mut self, pixels_per_point: f32) -> Self {
        self.pixels_per_point = pixels_per_point;
        self
    }

    pub fn with_velocity_smoothing(mut self, smoothing: f32) -> Self {
        self.velocity_smoothing = smoothing;
        self
    }

    pub fn with_max_sample_gap_ms(mut self, gap_ms: u64) -> Self {
        self.max_sample_gap_ms = gap_ms;
        self
    }

    /// Returns a copy with out-of-range values pulled back into range.
    pub(crate) fn sanitized(mut self) -> Self {
        if !(self.elastic_width.is_finite() && self.elastic_width > 0.0) {
            self.elastic_width = 1.0;
        }
        if !(self.elasticity.is_finite() && self.elasticity > 0.0) {
            self.elasticity = 0.0001;
        }
        if !self.deceleration_rate.is_finite() {
            self.deceleration_rate = 0.0;
        }
        self.deceleration_rate = self.deceleration_rate.clamp(0.0, 1.0);
        if !(self.pixels_per_point.is_finite() && self.pixels_per_point > 0.0) {
            self.pixels_per_point = 1.0;
        }
        if !(self.velocity_smoothing.is_finite() && self.velocity_smoothing >= 0.0) {
            self.velocity_smoothing = 0.0;
        }
        self
    }
}
