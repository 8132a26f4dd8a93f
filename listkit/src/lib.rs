//! A headless list engine: recycling virtualization, id-stable selection and scroll physics.
//!
//! For input handling (click/drag disambiguation, keyboard navigation), see the
//! `listkit-adapter` crate.
//!
//! The crate renders nothing itself. It keeps a bounded pool of view items bound to the rows
//! intersecting the viewport, no matter how many rows the data source holds, and tracks a
//! selection that survives reorders and filtering because it is keyed by stable ids.
//!
//! A UI layer is expected to provide:
//! - the data source, through [`IdentityMap`] (index ↔ id) and [`ItemFactory`] (view items)
//! - viewport size and scroll offset (or pointer samples, via [`ScrollPhysics`])
//! - measured row heights when using the measured layout
//!
//! Everything runs on one thread, driven by frame ticks. Deferred work goes through an explicit
//! [`Scheduler`] owned by the control.
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod controller;
mod error;
mod fenwick;
mod identity;
mod layout;
mod options;
mod physics;
mod pool;
mod scheduler;
mod selection;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use controller::{SlotView, VirtualizationController};
pub use error::{Error, Result};
pub use identity::{BindContext, IdList, IdentityMap, ItemFactory};
pub use options::{BoundaryPolicy, ControllerOptions, LayoutOptions, PhysicsOptions};
pub use physics::{BASE_STEP, PhysicsState, ScrollPhysics};
pub use pool::{RecyclePool, Slot, SlotId};
pub use scheduler::Scheduler;
pub use selection::{RangeDirection, SelectionChangeCallback, SelectionMode, SelectionModel};
pub use state::ViewSnapshot;
pub use types::{Align, Axis, ItemId, RefreshStats, Vec2, VisibleRange};
