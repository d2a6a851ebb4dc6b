//! Shared types for the map viewer: identifiers, tints, map bounds, the orbit camera
//! and the viewer configuration.
//!
//! # Invariants
//! - World space is Z-up; one terrain cell is `CELL_SIZE` units wide.
//! - Nothing in this crate touches the GPU or the filesystem except `ViewerConfig::load`.

pub mod camera;
pub mod config;
pub mod types;

pub use camera::{OrbitCamera, Ray};
pub use config::{ConfigError, ViewerConfig};
pub use types::{CELL_SIZE, EntityId, LAYER_BIAS, MapBounds, Tint, Transform};

pub fn crate_info() -> &'static str {
    "mapview-common v0.1.0"
}
