//! Terrain: the corner grid, its ramp/cliff classification and the CPU-side descriptors
//! the GPU backend uploads (ground instances, cliff instance sets, water cells, shadow map).
//!
//! # Invariants
//! - Classification runs once, on a `RawGrid`, and yields an immutable `ClassifiedGrid`
//!   (cliff decorations are stamped before any mesh is built).
//! - A cell owned by a ramp never produces a plain cliff model.
//! - Malformed geometry renders flat; no pass in this crate panics on map data.

pub mod cliff;
pub mod grid;
pub mod ground;
pub mod ramp;
pub mod shadow;
pub mod tables;
pub mod water;
pub mod waves;

pub use cliff::{
    CliffCode, CliffDecoration, CliffInstance, CliffInstanceSet, CliffModelPlacer, CliffPlacement,
    CliffVariations, stamp_decorations,
};
pub use grid::{ClassifiedCorner, ClassifiedGrid, Corner, RampType, RawGrid};
pub use ground::{GroundInstance, GroundMesh, GroundMeshBuilder, ground_variation};
pub use ramp::{RAMP_CODES, RampClassifier, RampCode, ramp_code};
pub use shadow::{AlphaFootprint, ShadowBaker, ShadowMap};
pub use tables::{
    CliffType, GroundTile, TerrainPalette, TilesetTables, WaterRow, blight_texture_path,
};
pub use water::{
    WaterAnimator, WaterCell, WaterMesh, WaterParams, boundary_attenuation, build_water_mesh,
    water_color,
};
pub use waves::{WAVES_CLIFF, WAVES_ROLLING, WavePlacement, place_shore_waves};

#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error("grid must have at least 2x2 corners, got {columns}x{rows}")]
    TooSmall { columns: usize, rows: usize },
    #[error("grid of {columns}x{rows} corners is too large to address")]
    TooLarge { columns: usize, rows: usize },
    #[error("grid of {columns}x{rows} corners needs {expected} entries, got {actual}")]
    CornerCount {
        columns: usize,
        rows: usize,
        expected: usize,
        actual: usize,
    },
    #[error("tileset table error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no water row for tileset '{0}'")]
    MissingWaterRow(char),
}

pub fn crate_info() -> &'static str {
    "mapview-terrain v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("terrain"));
    }
}
