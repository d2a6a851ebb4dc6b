//! Scene: everything placed on top of the terrain.
//!
//! Map placements are resolved against object attributes into fixed-shape entities,
//! which then wait for their models. Splat decals and selection circles are batched
//! here as CPU descriptors; the GPU backend only uploads them.
//!
//! # Invariants
//! - An entity whose type has no attributes is skipped with a warning, never fatal.
//! - No splat batch holds more vertices than the configured ceiling.
//! - Only entities with a positive selection radius can be selected.

mod attributes;
mod map;
mod placement;
mod scene;
mod selection;
mod sequence;
mod splat;

pub use attributes::{
    AttributeLookup, AttributeTable, DestructibleAttributes, DoodadAttributes, ItemAttributes,
    ObjectAttributes, TerrainDoodadAttributes, UberSplatRow, UberSplatTable, UnitAttributes,
    UnitShadow,
};
pub use map::{DoodadPlacement, MapDescription, TerrainDoodadPlacement, UnitPlacement};
pub use placement::{
    EntityCategory, EntityPlacer, PendingDecoration, PlacedEntity, Placements, SelectionShape,
    ShadowStamp, TextureOverride, model_path_for, shadow_texture_path,
};
pub use scene::{ModelState, Scene, SceneEntity};
pub use selection::{
    SELECTION_GREEN, Selectable, Selection, box_select, pick_unit, selection_circle_texture,
};
pub use sequence::{SplitMix64, select_sequence};
pub use splat::{
    MAX_BATCH_VERTICES, SplatBatch, SplatQuad, SplatSet, SplatVertex, build_splat_batches,
};

/// Errors from loading scene inputs.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("terrain error: {0}")]
    Terrain(#[from] mapview_terrain::TerrainError),
}

pub fn crate_info() -> &'static str {
    "mapview-scene v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("scene"));
    }
}
