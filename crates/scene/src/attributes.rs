use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::SceneError;

fn one() -> f32 {
    1.0
}

fn white() -> [u8; 3] {
    [255, 255, 255]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoodadAttributes {
    pub file: String,
    /// Number of visual variants; the placement's variation picks one.
    #[serde(default)]
    pub num_var: u32,
    /// Replacement for the model's replaceable texture `tex_id`.
    #[serde(default)]
    pub tex_file: Option<String>,
    #[serde(default)]
    pub tex_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestructibleAttributes {
    pub file: String,
    #[serde(default)]
    pub num_var: u32,
    #[serde(default = "white")]
    pub tint: [u8; 3],
    /// Shadow texture name under `ReplaceableTextures\Shadows`.
    #[serde(default)]
    pub shadow: Option<String>,
    #[serde(default)]
    pub tex_file: Option<String>,
    #[serde(default)]
    pub tex_id: u32,
}

/// Projected shadow decal drawn under a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitShadow {
    pub texture: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitAttributes {
    pub file: String,
    #[serde(default = "one")]
    pub model_scale: f32,
    /// Overrides the owning player's colour when non-negative.
    #[serde(default)]
    pub team_color: Option<i32>,
    #[serde(default = "white")]
    pub tint: [u8; 3],
    #[serde(default)]
    pub move_height: f32,
    /// Key into the über-splat table.
    #[serde(default)]
    pub uber_splat: Option<String>,
    #[serde(default)]
    pub unit_shadow: Option<UnitShadow>,
    /// Shadow texture stamped into the shadow map.
    #[serde(default)]
    pub building_shadow: Option<String>,
    /// Comma-separated animation properties, e.g. `upgrade,first`.
    #[serde(default)]
    pub anim_props: String,
    /// Selection scale; the selection radius is 36 times this.
    #[serde(default)]
    pub selection_scale: f32,
    #[serde(default)]
    pub selection_z: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAttributes {
    pub file: String,
    #[serde(default = "one")]
    pub model_scale: f32,
    #[serde(default)]
    pub team_color: Option<i32>,
    #[serde(default = "white")]
    pub tint: [u8; 3],
    #[serde(default)]
    pub selection_scale: f32,
    #[serde(default)]
    pub selection_z: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainDoodadAttributes {
    pub file: String,
    /// Texture whose size (in texels / 4) gives the covered footprint in cells.
    pub path_tex: String,
}

/// Attributes of one object type, by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ObjectAttributes {
    Doodad(DoodadAttributes),
    Destructible(DestructibleAttributes),
    Unit(UnitAttributes),
    Item(ItemAttributes),
    TerrainDoodad(TerrainDoodadAttributes),
}

impl ObjectAttributes {
    pub fn category_name(&self) -> &'static str {
        match self {
            ObjectAttributes::Doodad(_) => "doodad",
            ObjectAttributes::Destructible(_) => "destructible",
            ObjectAttributes::Unit(_) => "unit",
            ObjectAttributes::Item(_) => "item",
            ObjectAttributes::TerrainDoodad(_) => "terrain_doodad",
        }
    }
}

/// Type id to attributes. Absence is not an error.
pub trait AttributeLookup {
    fn attributes(&self, type_id: &str) -> Option<&ObjectAttributes>;
}

/// Attribute rows read from a JSON object keyed by type id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeTable {
    rows: BTreeMap<String, ObjectAttributes>,
}

impl AttributeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn insert(&mut self, type_id: impl Into<String>, attributes: ObjectAttributes) {
        self.rows.insert(type_id.into(), attributes);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl AttributeLookup for AttributeTable {
    fn attributes(&self, type_id: &str) -> Option<&ObjectAttributes> {
        self.rows.get(type_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UberSplatRow {
    pub dir: String,
    pub file: String,
    /// Half extent of the decal in world units.
    pub scale: f32,
}

impl UberSplatRow {
    pub fn texture_path(&self) -> String {
        format!("{}\\{}.blp", self.dir, self.file)
    }
}

/// Über-splat decals keyed by the name units refer to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UberSplatTable {
    rows: BTreeMap<String, UberSplatRow>,
}

impl UberSplatTable {
    pub fn from_json_str(text: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn insert(&mut self, name: impl Into<String>, row: UberSplatRow) {
        self.rows.insert(name.into(), row);
    }

    pub fn get(&self, name: &str) -> Option<&UberSplatRow> {
        self.rows.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_rows_parse() {
        let json = r#"{
            "hfoo": {"category": "unit", "file": "units\\human\\Footman\\Footman", "selection_scale": 1.0,
                     "unit_shadow": {"texture": "Shadow", "x": 50, "y": 50, "width": 120, "height": 120}},
            "LTlt": {"category": "doodad", "file": "Doodads\\Tree", "num_var": 10},
            "ratc": {"category": "item", "file": "Objects\\Item"}
        }"#;
        let table = AttributeTable::from_json_str(json).unwrap();
        assert_eq!(table.len(), 3);
        match table.attributes("hfoo") {
            Some(ObjectAttributes::Unit(unit)) => {
                assert_eq!(unit.model_scale, 1.0);
                assert_eq!(unit.tint, [255, 255, 255]);
                assert_eq!(unit.unit_shadow.as_ref().unwrap().width, 120.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(table.attributes("LTlt").unwrap().category_name(), "doodad");
        assert!(table.attributes("nope").is_none());
    }

    #[test]
    fn unknown_category_is_rejected() {
        let json = r#"{"x": {"category": "spell", "file": "a"}}"#;
        assert!(AttributeTable::from_json_str(json).is_err());
    }

    #[test]
    fn uber_splat_path() {
        let table = UberSplatTable::from_json_str(
            r#"{"HMED": {"dir": "Splats", "file": "HumanUberSplat", "scale": 160}}"#,
        )
        .unwrap();
        assert_eq!(table.get("HMED").unwrap().texture_path(), "Splats\\HumanUberSplat.blp");
    }
}
