use std::path::Path;

use glam::{Vec2, Vec3};
use mapview_common::MapBounds;
use mapview_terrain::RawGrid;
use serde::{Deserialize, Serialize};

use crate::SceneError;

/// A static prop or destructible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoodadPlacement {
    pub type_id: String,
    #[serde(default)]
    pub variation: u32,
    pub location: Vec3,
    #[serde(default)]
    pub angle: f32,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
}

/// A unit, item or start location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitPlacement {
    pub type_id: String,
    pub location: Vec3,
    #[serde(default)]
    pub angle: f32,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
    /// Owning player; doubles as the team colour index.
    #[serde(default)]
    pub player: u32,
}

/// A cliff-replacing terrain doodad, anchored at its bottom-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainDoodadPlacement {
    pub type_id: String,
    pub cell: (usize, usize),
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

/// Everything the viewer reads from one map, already unpacked from its container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDescription {
    pub tileset: char,
    #[serde(default)]
    pub editor_version: u32,
    #[serde(default)]
    pub bounds: MapBounds,
    #[serde(default)]
    pub flags: u32,
    pub grid: RawGrid,
    /// Ground tile ids, indexed by `Corner::ground_texture`.
    #[serde(default)]
    pub ground_tilesets: Vec<String>,
    /// Cliff type ids, indexed by `Corner::cliff_texture`.
    #[serde(default)]
    pub cliff_tilesets: Vec<String>,
    #[serde(default)]
    pub doodads: Vec<DoodadPlacement>,
    #[serde(default)]
    pub terrain_doodads: Vec<TerrainDoodadPlacement>,
    #[serde(default)]
    pub units: Vec<UnitPlacement>,
    /// Precomputed shadow bitmap, one byte per shadow texel.
    #[serde(default)]
    pub shadow: Option<Vec<u8>>,
}

impl MapDescription {
    pub fn from_json_str(text: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let text = std::fs::read_to_string(path)?;
        let map = Self::from_json_str(&text)?;
        tracing::info!(
            path = %path.display(),
            columns = map.grid.columns(),
            rows = map.grid.rows(),
            doodads = map.doodads.len(),
            units = map.units.len(),
            "map description loaded"
        );
        Ok(map)
    }

    /// A level map of the given corner size with nothing placed on it.
    pub fn flat(tileset: char, columns: usize, rows: usize) -> Result<Self, SceneError> {
        Ok(Self {
            tileset,
            editor_version: 0,
            bounds: MapBounds::default(),
            flags: 0,
            grid: RawGrid::flat(columns, rows)?,
            ground_tilesets: Vec::new(),
            cliff_tilesets: Vec::new(),
            doodads: Vec::new(),
            terrain_doodads: Vec::new(),
            units: Vec::new(),
            shadow: None,
        })
    }

    /// World-space centre of the map, where the camera starts.
    pub fn center(&self) -> Vec2 {
        let size = Vec2::new(
            (self.grid.columns() - 1) as f32,
            (self.grid.rows() - 1) as f32,
        ) * mapview_common::CELL_SIZE;
        self.grid.center_offset() + size / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_map() {
        let json = r#"{
            "tileset": "L",
            "grid": {"columns": 2, "rows": 2, "corners": [{}, {}, {}, {}]},
            "units": [{"type_id": "hfoo", "location": [10, 20, 0], "player": 3}]
        }"#;
        let map = MapDescription::from_json_str(json).unwrap();
        assert_eq!(map.tileset, 'L');
        assert_eq!(map.units[0].player, 3);
        assert_eq!(map.units[0].scale, Vec3::ONE);
        assert!(map.shadow.is_none());
    }

    #[test]
    fn rejects_short_grid() {
        let json = r#"{"tileset": "L", "grid": {"columns": 2, "rows": 2, "corners": [{}]}}"#;
        assert!(MapDescription::from_json_str(json).is_err());
    }

    #[test]
    fn center_of_flat_map() {
        let map = MapDescription::flat('A', 3, 5).unwrap();
        assert_eq!(map.center(), Vec2::new(128.0, 256.0));
    }
}
