use serde::{Deserialize, Serialize};

use crate::TerrainError;
use crate::cliff::CliffVariations;

/// A ground tile texture row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTile {
    pub id: String,
    pub dir: String,
    pub file: String,
}

impl GroundTile {
    pub fn texture_path(&self) -> String {
        format!("{}\\{}.blp", self.dir, self.file)
    }
}

/// A cliff type row: model directories, cliff texture and the ground tile drawn
/// beside its cliffs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliffType {
    pub id: String,
    pub cliff_model_dir: String,
    pub ramp_model_dir: String,
    pub tex_dir: String,
    pub tex_file: String,
    pub ground_tile: String,
}

impl CliffType {
    pub fn texture_path(&self) -> String {
        format!("{}\\{}.blp", self.tex_dir, self.tex_file)
    }
}

/// Water parameters for one tileset, keyed `<letter>Sha`. Colours are 0-255 RGBA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterRow {
    pub id: String,
    pub height: f32,
    /// Texture frames per second.
    pub tex_rate: f32,
    pub num_tex: u32,
    pub tex_file: String,
    #[serde(default)]
    pub shore_dir: String,
    #[serde(default)]
    pub shore_s_file: String,
    #[serde(default)]
    pub shore_oc_file: String,
    #[serde(default)]
    pub shore_ic_file: String,
    pub smin: [u8; 4],
    pub smax: [u8; 4],
    pub dmin: [u8; 4],
    pub dmax: [u8; 4],
}

/// Per-tileset parameter tables, read from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilesetTables {
    pub ground_tiles: Vec<GroundTile>,
    pub cliff_types: Vec<CliffType>,
    pub water: Vec<WaterRow>,
    /// Overrides the built-in cliff variation counts when present.
    pub cliff_variations: Option<CliffVariations>,
}

impl TilesetTables {
    pub fn from_json_str(text: &str) -> Result<Self, TerrainError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn ground_tile(&self, id: &str) -> Option<&GroundTile> {
        self.ground_tiles.iter().find(|t| t.id == id)
    }

    pub fn cliff_type(&self, id: &str) -> Option<&CliffType> {
        self.cliff_types.iter().find(|t| t.id == id)
    }

    pub fn water_row(&self, tileset: char) -> Result<&WaterRow, TerrainError> {
        let id = format!("{tileset}Sha");
        self.water
            .iter()
            .find(|w| w.id == id)
            .ok_or(TerrainError::MissingWaterRow(tileset))
    }

    pub fn variations(&self) -> CliffVariations {
        self.cliff_variations.clone().unwrap_or_else(CliffVariations::builtin)
    }
}

const BLIGHTS: &[(char, &str)] = &[
    ('A', "Ashen"),
    ('B', "Barrens"),
    ('C', "Felwood"),
    ('D', "Cave"),
    ('F', "Lordf"),
    ('G', "Dungeon"),
    ('I', "Ice"),
    ('J', "DRuins"),
    ('K', "Citadel"),
    ('L', "Lords"),
    ('N', "North"),
    ('O', "Outland"),
    ('Q', "VillageFall"),
    ('V', "Village"),
    ('W', "Lordw"),
    ('X', "Village"),
    ('Y', "Village"),
    ('Z', "Ruins"),
];

/// Blight overlay texture for a tileset letter.
pub fn blight_texture_path(tileset: char) -> Option<String> {
    BLIGHTS
        .iter()
        .find(|(letter, _)| *letter == tileset)
        .map(|(_, name)| format!("TerrainArt\\Blight\\{name}_Blight.blp"))
}

/// The map's ground and cliff slots resolved against the tileset tables.
///
/// Slot indices are the ones stored in corners; unresolved slots stay `None` so
/// later slots keep their index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerrainPalette {
    pub ground: Vec<Option<GroundTile>>,
    pub cliffs: Vec<Option<CliffType>>,
    pub blight: Option<String>,
}

impl TerrainPalette {
    pub fn resolve(
        tables: &TilesetTables,
        tileset: char,
        ground_ids: &[String],
        cliff_ids: &[String],
    ) -> Self {
        let ground = ground_ids
            .iter()
            .map(|id| {
                let tile = tables.ground_tile(id).cloned();
                if tile.is_none() {
                    tracing::warn!(id, "unknown ground tile");
                }
                tile
            })
            .collect();
        let cliffs = cliff_ids
            .iter()
            .map(|id| {
                let cliff = tables.cliff_type(id).cloned();
                if cliff.is_none() {
                    tracing::warn!(id, "unknown cliff type");
                }
                cliff
            })
            .collect();
        let blight = blight_texture_path(tileset);
        if blight.is_none() {
            tracing::warn!(%tileset, "no blight texture for tileset");
        }
        Self { ground, cliffs, blight }
    }

    /// Ground slot reserved for blight, directly after the map's ground tiles.
    pub fn blight_index(&self) -> u8 {
        self.ground.len() as u8
    }

    /// Texture paths for every ground slot, blight last.
    pub fn ground_texture_paths(&self) -> Vec<Option<String>> {
        self.ground
            .iter()
            .map(|t| t.as_ref().map(GroundTile::texture_path))
            .chain(std::iter::once(self.blight.clone()))
            .collect()
    }

    pub fn cliff_texture_paths(&self) -> Vec<Option<String>> {
        self.cliffs
            .iter()
            .map(|c| c.as_ref().map(CliffType::texture_path))
            .collect()
    }

    /// Cliff texture 15 is stored by old editors for the second cliff type.
    pub fn cliff_slot(texture: u8) -> u8 {
        if texture == 15 { 1 } else { texture }
    }

    pub fn cliff_type(&self, slot: u8) -> Option<&CliffType> {
        self.cliffs.get(slot as usize)?.as_ref()
    }

    /// Ground slot drawn next to cliffs of the given cliff texture.
    pub fn cliff_ground_index(&self, cliff_texture: u8) -> Option<u8> {
        let cliff = self.cliff_type(Self::cliff_slot(cliff_texture))?;
        self.ground
            .iter()
            .position(|t| t.as_ref().is_some_and(|t| t.id == cliff.ground_tile))
            .map(|i| i as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLES: &str = r#"{
        "ground_tiles": [
            {"id": "Ldrt", "dir": "TerrainArt\\LordaeronSummer", "file": "Lords_Dirt"},
            {"id": "Lgrs", "dir": "TerrainArt\\LordaeronSummer", "file": "Lords_Grass"}
        ],
        "cliff_types": [
            {"id": "CLdi", "cliff_model_dir": "Cliffs", "ramp_model_dir": "CliffTrans",
             "tex_dir": "ReplaceableTextures\\Cliff", "tex_file": "Cliff0", "ground_tile": "Lgrs"}
        ],
        "water": [
            {"id": "LSha", "height": -0.7, "tex_rate": 20, "num_tex": 45,
             "tex_file": "ReplaceableTextures\\Water\\Water",
             "smin": [0, 0, 0, 64], "smax": [0, 0, 0, 128],
             "dmin": [0, 0, 0, 128], "dmax": [0, 0, 0, 255]}
        ]
    }"#;

    #[test]
    fn parses_tables() {
        let tables = TilesetTables::from_json_str(TABLES).unwrap();
        assert_eq!(tables.ground_tiles.len(), 2);
        assert_eq!(tables.water_row('L').unwrap().num_tex, 45);
        assert!(matches!(tables.water_row('X'), Err(TerrainError::MissingWaterRow('X'))));
    }

    #[test]
    fn palette_keeps_slot_indices() {
        let tables = TilesetTables::from_json_str(TABLES).unwrap();
        let ground = ["Zzzz".to_string(), "Lgrs".to_string()];
        let cliffs = ["CLdi".to_string()];
        let palette = TerrainPalette::resolve(&tables, 'L', &ground, &cliffs);
        assert!(palette.ground[0].is_none());
        assert_eq!(palette.blight_index(), 2);
        assert_eq!(palette.cliff_ground_index(0), Some(1));
        assert_eq!(palette.cliff_ground_index(15), None);
        let paths = palette.ground_texture_paths();
        assert_eq!(paths[1].as_deref(), Some("TerrainArt\\LordaeronSummer\\Lords_Grass.blp"));
        assert_eq!(paths[2].as_deref(), Some("TerrainArt\\Blight\\Lords_Blight.blp"));
    }

    #[test]
    fn blight_table() {
        assert_eq!(
            blight_texture_path('Q').as_deref(),
            Some("TerrainArt\\Blight\\VillageFall_Blight.blp")
        );
        assert!(blight_texture_path('?').is_none());
    }

    #[test]
    fn cliff_slot_remaps_fifteen() {
        assert_eq!(TerrainPalette::cliff_slot(15), 1);
        assert_eq!(TerrainPalette::cliff_slot(0), 0);
    }
}
