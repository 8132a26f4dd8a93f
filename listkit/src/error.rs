use crate::Axis;

/// Configuration errors.
///
/// Only configuration-time entry points return these. Per-frame operations correct caller
/// mistakes in place instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("inverted scroll limits on the {axis} axis: low {low} > high {high}")]
    InvertedLimits { axis: Axis, low: f32, high: f32 },

    #[error("fixed-step layout needs a finite, positive row height (got {0})")]
    InvalidRowHeight(f32),

    #[error("measured-step layout needs a default height for rows that were never measured")]
    MissingDefaultHeight,

    #[error("measured-step default height must be finite and positive (got {0})")]
    InvalidDefaultHeight(f32),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
