//! Rendering adapter: the map viewer, its per-frame draw plan and a renderer-agnostic
//! interface.
//!
//! `MapViewer` owns the loaded map and drives asset loading one tick at a time.
//! `FramePlan` is what a backend draws; backends never mutate the viewer.
//!
//! # Invariants
//! - Passes are drawn in `RenderPass::ORDER`: ground, cliffs, opaque models,
//!   über-splats, water, translucent models.
//! - Nothing is drawn for an asset that has not finished loading.
//! - After `MapViewer::shutdown` no load completion has any effect.

mod frame;
mod renderer;
mod viewer;

pub use frame::{DrawItem, FramePlan, ModelInstance, PassPlan, RenderPass, SplatLayer};
pub use renderer::{DebugTextRenderer, Renderer};
pub use viewer::{
    CliffDraw, Diagnostic, LoadStage, MapViewer, SplatDraw, TickReport, ViewerError, ViewerInputs,
};

pub fn crate_info() -> &'static str {
    "mapview-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
