//! Input handling for the `listkit` crate.
//!
//! `listkit` provides the engine pieces (virtualization, selection, scroll physics) and stays
//! unaware of input devices. This crate adds the one component that talks to all of them:
//!
//! - Click vs. drag disambiguation and multi-click sequences
//! - Modifier-aware selection (shift extends a range, ctrl/cmd toggles)
//! - Keyboard navigation that keeps the active row in view
//! - A tick-driven schedule for settle animation and deferred rebuilds
//!
//! This crate is framework-agnostic: hosts translate their native events into
//! [`PointerEvent`] / [`NavigationCommand`] and render from the controller's slots.
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod clicks;
mod coordinator;
mod input;
mod options;


pub use clicks::{ClickInfo, ClickTracker};
pub use coordinator::{InteractionCoordinator, InteractionEvent};
pub use input::{Modifiers, NavigationCommand, PointerButton, PointerEvent};
pub use options::InteractionOptions;
