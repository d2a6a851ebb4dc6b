use std::collections::BTreeMap;
use std::fmt;

use glam::Vec3;
use mapview_common::{CELL_SIZE, LAYER_BIAS};
use serde::{Deserialize, Serialize};

use crate::grid::{ClassifiedGrid, RampType};
use crate::tables::TerrainPalette;

/// Four-letter cliff model name, corners in order top-left, top-right, bottom-right,
/// bottom-left, each letter the layer delta above the quad minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CliffCode([u8; 4]);

impl CliffCode {
    /// `None` for a level quad or any delta above 3; such cells render flat.
    pub fn from_layers(bottom_left: u8, bottom_right: u8, top_left: u8, top_right: u8) -> Option<Self> {
        let base = bottom_left.min(bottom_right).min(top_left).min(top_right);
        let mut code = [0u8; 4];
        for (slot, layer) in code.iter_mut().zip([top_left, top_right, bottom_right, bottom_left]) {
            let delta = layer - base;
            if delta > 3 {
                return None;
            }
            *slot = b'A' + delta;
        }
        if &code == b"AAAA" {
            return None;
        }
        Some(Self(code))
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("")
    }
}

impl fmt::Display for CliffCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Highest variation suffix declared per model directory and cliff code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliffVariations {
    pub directories: BTreeMap<String, BTreeMap<String, u8>>,
}

const CLIFF_VARIATIONS: &[(&str, u8)] = &[
    ("AAAB", 1), ("AAAC", 1), ("AABA", 1), ("AABB", 2), ("AABC", 0), ("AACA", 1),
    ("AACB", 0), ("AACC", 1), ("ABAA", 1), ("ABAB", 1), ("ABAC", 0), ("ABBA", 2),
    ("ABBB", 1), ("ABCA", 0), ("ABCB", 0), ("ABCC", 0), ("ACAA", 1), ("ACAB", 0),
    ("ACAC", 1), ("ACBA", 0), ("ACBB", 0), ("ACBC", 0), ("ACCA", 1), ("ACCB", 0),
    ("BAAA", 1), ("BAAB", 1), ("BAAC", 0), ("BABA", 1), ("BABB", 1), ("BABC", 0),
    ("BACA", 0), ("BACB", 0), ("BACC", 0), ("BBAA", 2), ("BBAB", 1), ("BBAC", 0),
    ("BBBA", 1), ("BBCA", 0), ("BCAA", 0), ("BCAB", 0), ("BCBA", 0), ("CAAA", 1),
    ("CAAB", 0), ("CAAC", 1), ("CABA", 0), ("CABB", 0), ("CACA", 1), ("CACB", 0),
    ("CBAA", 0), ("CBAB", 0), ("CBBA", 0), ("CCAA", 1), ("CCAB", 0), ("CCBA", 0),
];

impl CliffVariations {
    /// Variation counts for the stock `Cliffs` and `CityCliffs` model sets.
    pub fn builtin() -> Self {
        let table: BTreeMap<String, u8> = CLIFF_VARIATIONS
            .iter()
            .map(|(code, max)| (code.to_string(), *max))
            .collect();
        let mut directories = BTreeMap::new();
        directories.insert("Cliffs".to_string(), table.clone());
        directories.insert("CityCliffs".to_string(), table);
        Self { directories }
    }

    /// Repeatable suffix: the corner's variation capped at the declared maximum, or 0.
    pub fn variation(&self, directory: &str, code: &CliffCode, corner_variation: u8) -> u8 {
        self.directories
            .get(directory)
            .and_then(|codes| codes.get(code.as_str()))
            .map_or(0, |max| corner_variation.min(*max))
    }
}

/// A terrain doodad that replaces the cliff/ground geometry under it.
#[derive(Debug, Clone, PartialEq)]
pub struct CliffDecoration {
    pub model_path: String,
    /// Bottom-left corner of the footprint.
    pub cell: (usize, usize),
    /// Footprint size in cells.
    pub size: (usize, usize),
}

/// One placed cliff or ramp model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CliffInstance {
    pub position: Vec3,
    /// Cliff-type slot used to pick the texture.
    pub texture: u8,
}

/// All instances of one model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliffInstanceSet {
    pub instances: Vec<CliffInstance>,
    /// Decorations draw with the textures their model declares.
    pub own_textures: bool,
}

/// Cliff, ramp and decoration instances keyed by model path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliffPlacement {
    pub sets: BTreeMap<String, CliffInstanceSet>,
}

impl CliffPlacement {
    fn push(&mut self, path: String, instance: CliffInstance, own_textures: bool) {
        let set = self.sets.entry(path).or_default();
        set.own_textures = own_textures;
        set.instances.push(instance);
    }

    pub fn instance_count(&self) -> usize {
        self.sets.values().map(|s| s.instances.len()).sum()
    }

    pub fn model_paths(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }
}

/// Mark decoration footprints as covered and place their models.
///
/// Must run before ground and cliff building so that covered cells stay empty.
pub fn stamp_decorations(grid: &mut ClassifiedGrid, decorations: &[CliffDecoration]) -> CliffPlacement {
    let mut placement = CliffPlacement::default();
    for deco in decorations {
        let (x, y) = deco.cell;
        let Some(origin) = grid.corner(x, y).copied() else {
            tracing::warn!(path = %deco.model_path, x, y, "cliff decoration outside the map");
            continue;
        };
        let (w, h) = deco.size;
        for i in 0..h {
            for j in 0..w {
                if let Some(c) = grid.corner_mut(x + j, y + i) {
                    c.ramp_type = RampType::Covered;
                }
            }
        }
        let offset = grid.center_offset();
        let position = Vec3::new(
            (x as f32 + w as f32 / 2.0) * CELL_SIZE + offset.x,
            (y as f32 + h as f32 / 2.0) * CELL_SIZE + offset.y,
            (origin.corner.layer_height as i32 - LAYER_BIAS) as f32 * CELL_SIZE,
        );
        placement.push(
            deco.model_path.clone(),
            CliffInstance {
                position,
                texture: 0,
            },
            true,
        );
    }
    placement
}

/// Turns classified cliff and ramp cells into model instance sets.
pub struct CliffModelPlacer<'a> {
    pub palette: &'a TerrainPalette,
    pub variations: &'a CliffVariations,
}

impl<'a> CliffModelPlacer<'a> {
    pub fn new(palette: &'a TerrainPalette, variations: &'a CliffVariations) -> Self {
        Self { palette, variations }
    }

    /// Add every cliff and ramp model of `grid` to `placement`.
    pub fn place(&self, grid: &ClassifiedGrid, placement: &mut CliffPlacement) {
        let _span = tracing::info_span!("place_cliffs").entered();
        let before = placement.instance_count();
        let (columns, rows) = (grid.columns(), grid.rows());

        for y in 0..rows - 1 {
            for x in 0..columns - 1 {
                let owner = grid.at(x, y);
                let origin = grid.cell_world_origin(x, y);

                if owner.ramp_type.is_set() {
                    if !owner.ramp_type.is_owner() {
                        continue;
                    }
                    let Some(code) = owner.ramp_code else {
                        continue;
                    };
                    let texture = TerrainPalette::cliff_slot(owner.corner.cliff_texture);
                    let Some(cliff) = self.palette.cliff_type(texture) else {
                        tracing::debug!(x, y, texture, "ramp without a cliff type");
                        continue;
                    };
                    // Ramps sit on the lowest of the corners they span.
                    let span = match owner.ramp_type {
                        RampType::Vertical => [(x, y + 2), (x + 1, y), (x + 1, y + 2)],
                        _ => [(x, y + 1), (x + 2, y), (x + 2, y + 1)],
                    };
                    let base = span
                        .iter()
                        .filter_map(|&(cx, cy)| grid.corner(cx, cy))
                        .map(|c| c.corner.layer_height)
                        .fold(owner.corner.layer_height, u8::min);
                    let dir = &cliff.ramp_model_dir;
                    let path = format!("Doodads\\Terrain\\{dir}\\{dir}{code}0.mdx");
                    placement.push(
                        path,
                        CliffInstance {
                            position: layer_position(origin, base),
                            texture,
                        },
                        false,
                    );
                } else if owner.cliff {
                    let bottom_left = owner.corner.layer_height;
                    let bottom_right = grid.at(x + 1, y).corner.layer_height;
                    let top_left = grid.at(x, y + 1).corner.layer_height;
                    let top_right = grid.at(x + 1, y + 1).corner.layer_height;
                    let Some(code) = CliffCode::from_layers(bottom_left, bottom_right, top_left, top_right)
                    else {
                        continue;
                    };
                    let base = bottom_left.min(bottom_right).min(top_left).min(top_right);
                    let texture = TerrainPalette::cliff_slot(owner.corner.cliff_texture);
                    let Some(cliff) = self.palette.cliff_type(texture) else {
                        tracing::debug!(x, y, texture, "cliff without a cliff type");
                        continue;
                    };
                    let dir = &cliff.cliff_model_dir;
                    let variation = self.variations.variation(dir, &code, owner.corner.cliff_variation);
                    let path = format!("Doodads\\Terrain\\{dir}\\{dir}{code}{variation}.mdx");
                    placement.push(
                        path,
                        CliffInstance {
                            position: layer_position(origin, base),
                            texture,
                        },
                        false,
                    );
                }
            }
        }

        tracing::debug!(
            placed = placement.instance_count() - before,
            models = placement.sets.len(),
            "cliff models placed"
        );
    }
}

fn layer_position(origin: glam::Vec2, layer: u8) -> Vec3 {
    origin.extend((layer as i32 - LAYER_BIAS) as f32 * CELL_SIZE)
}
