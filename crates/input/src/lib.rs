//! Pointer input: one drag mode per mouse-down, mapped to camera actions and picks.
//!
//! # Invariants
//! - The drag mode is decided at press time from the held modifiers and does not
//!   change until release.
//! - A release within the click threshold of the press is a click, never a drag.

pub mod action;
pub mod drag;

pub use action::{CameraAction, PointerOutcome};
pub use drag::{DragController, DragMode, Modifiers};

pub fn crate_info() -> &'static str {
    "mapview-input v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("input"));
    }
}
