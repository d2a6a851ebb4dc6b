//! wgpu render backend for the map viewer.
//!
//! Uploads the viewer's terrain, models and splats as they finish loading and
//! draws a [`mapview_render::FramePlan`] in one render pass.
//!
//! # Invariants
//! - The backend never mutates viewer state.
//! - Draw calls follow the plan's pass order.
//! - Nothing is uploaded after the viewer shuts down; earlier uploads are released.

mod gpu;
mod mesh;
mod shaders;

pub use gpu::{GpuStats, WgpuRenderer};

/// Returns the crate name and version.
pub fn crate_info() -> &'static str {
    "mapview-render-wgpu v0.1.0"
}
