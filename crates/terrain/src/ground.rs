use glam::Vec2;

use crate::grid::ClassifiedGrid;
use crate::tables::TerrainPalette;

/// Unit quad drawn once per cell; the vertex shader lifts it from the height maps.
pub const QUAD_POSITIONS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 1, 3, 2];

/// Per-cell ground attributes.
///
/// `textures` hold ground slot + 1 (0 means unused); `textures[0] == 0` hides the cell.
/// `variations[0]` is the tile variation of the base texture, the others are corner
/// masks (bottom-right 1, bottom-left 2, top-right 4, top-left 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroundInstance {
    pub textures: [u8; 4],
    pub variations: [u8; 4],
}

impl GroundInstance {
    pub fn is_visible(&self) -> bool {
        self.textures[0] != 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroundMesh {
    pub columns: usize,
    pub rows: usize,
    pub center_offset: Vec2,
    /// Rendered height per corner, in layers (ground, cliff level and ramp lift).
    pub corner_heights: Vec<f32>,
    /// Fine ground height per corner, used for normals.
    pub cliff_heights: Vec<f32>,
    pub water_heights: Vec<f32>,
    /// One per cell, row-major.
    pub instances: Vec<GroundInstance>,
}

impl GroundMesh {
    pub fn cell_count(&self) -> usize {
        self.instances.len()
    }

    pub fn visible_cells(&self) -> usize {
        self.instances.iter().filter(|i| i.is_visible()).count()
    }
}

/// Tile index inside a ground texture for a corner's stored variation.
///
/// Extended (512x256) textures carry 16 extra tiles after the 16 transition tiles.
pub fn ground_variation(extended: bool, variation: u8) -> u8 {
    if extended {
        match variation {
            0..=15 => 16 + variation,
            16 => 15,
            _ => 0,
        }
    } else if variation == 0 {
        0
    } else {
        15
    }
}

pub struct GroundMeshBuilder<'a> {
    pub palette: &'a TerrainPalette,
    /// Whether each ground slot (blight included) is an extended texture.
    pub extended: &'a [bool],
}

impl<'a> GroundMeshBuilder<'a> {
    pub fn new(palette: &'a TerrainPalette, extended: &'a [bool]) -> Self {
        Self { palette, extended }
    }

    pub fn build(&self, grid: &ClassifiedGrid) -> GroundMesh {
        let _span = tracing::info_span!("build_ground").entered();
        let (columns, rows) = (grid.columns(), grid.rows());
        let mut corner_heights = Vec::with_capacity(columns * rows);
        let mut cliff_heights = Vec::with_capacity(columns * rows);
        let mut water_heights = Vec::with_capacity(columns * rows);
        let mut instances = Vec::with_capacity((columns - 1) * (rows - 1));

        for y in 0..rows {
            for x in 0..columns {
                let c = grid.at(x, y);
                corner_heights.push(c.height());
                cliff_heights.push(c.corner.ground_height);
                water_heights.push(c.corner.water_height);

                if y < rows - 1 && x < columns - 1 {
                    instances.push(self.cell_instance(grid, x, y));
                }
            }
        }

        let mesh = GroundMesh {
            columns,
            rows,
            center_offset: grid.center_offset(),
            corner_heights,
            cliff_heights,
            water_heights,
            instances,
        };
        tracing::debug!(
            cells = mesh.cell_count(),
            visible = mesh.visible_cells(),
            "ground mesh built"
        );
        mesh
    }

    fn cell_instance(&self, grid: &ClassifiedGrid, x: usize, y: usize) -> GroundInstance {
        let owner = grid.at(x, y);
        if owner.ramp_type.is_set() || owner.cliff {
            return GroundInstance::default();
        }

        let bottom_left = self.corner_texture(grid, x, y);
        let bottom_right = self.corner_texture(grid, x + 1, y);
        let top_left = self.corner_texture(grid, x, y + 1);
        let top_right = self.corner_texture(grid, x + 1, y + 1);

        let mut textures = vec![bottom_left, bottom_right, top_left, top_right];
        textures.sort_unstable();
        textures.dedup();

        let mut instance = GroundInstance::default();
        let base = textures[0];
        let extended = self.extended.get(base as usize).copied().unwrap_or(false);
        instance.textures[0] = base + 1;
        instance.variations[0] = ground_variation(extended, owner.corner.ground_variation);

        for (slot, &texture) in textures.iter().enumerate().skip(1) {
            let mut mask = 0u8;
            if bottom_right == texture {
                mask |= 0b0001;
            }
            if bottom_left == texture {
                mask |= 0b0010;
            }
            if top_right == texture {
                mask |= 0b0100;
            }
            if top_left == texture {
                mask |= 0b1000;
            }
            instance.textures[slot] = texture + 1;
            instance.variations[slot] = mask;
        }
        instance
    }

    /// Ground slot drawn at a corner: the paired ground of a nearby cliff or ramp,
    /// else blight, else the corner's own texture.
    fn corner_texture(&self, grid: &ClassifiedGrid, column: usize, row: usize) -> u8 {
        let cells_x = grid.columns() as i64 - 1;
        let cells_y = grid.rows() as i64 - 1;
        for dy in -1..1i64 {
            for dx in -1..1i64 {
                let cx = column as i64 + dx;
                let cy = row as i64 + dy;
                if cx > 0 && cx < cells_x - 1 && cy > 0 && cy < cells_y - 1 {
                    let c = grid.at(cx as usize, cy as usize);
                    if c.cliff || c.ramp_type.is_set() {
                        if let Some(index) = self.palette.cliff_ground_index(c.corner.cliff_texture) {
                            return index;
                        }
                    }
                }
            }
        }
        let c = grid.at(column, row);
        if c.corner.blight {
            return self.palette.blight_index();
        }
        c.corner.ground_texture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::RawGrid;
    use crate::ramp::RampClassifier;
    use crate::tables::{CliffType, GroundTile, TilesetTables};

    fn palette() -> TerrainPalette {
        let tables = TilesetTables {
            ground_tiles: ["Ldrt", "Lgrs", "Lrok"]
                .iter()
                .map(|id| GroundTile {
                    id: id.to_string(),
                    dir: "TerrainArt".into(),
                    file: id.to_string(),
                })
                .collect(),
            cliff_types: vec![CliffType {
                id: "CLdi".into(),
                cliff_model_dir: "Cliffs".into(),
                ramp_model_dir: "CliffTrans".into(),
                tex_dir: "ReplaceableTextures\\Cliff".into(),
                tex_file: "Cliff0".into(),
                ground_tile: "Lrok".into(),
            }],
            ..TilesetTables::default()
        };
        let ground: Vec<String> = ["Ldrt", "Lgrs", "Lrok"].iter().map(|s| s.to_string()).collect();
        TerrainPalette::resolve(&tables, 'L', &ground, &["CLdi".to_string()])
    }

    #[test]
    fn variation_mapping() {
        assert_eq!(ground_variation(true, 0), 16);
        assert_eq!(ground_variation(true, 15), 31);
        assert_eq!(ground_variation(true, 16), 15);
        assert_eq!(ground_variation(true, 17), 0);
        assert_eq!(ground_variation(false, 0), 0);
        assert_eq!(ground_variation(false, 3), 15);
    }

    #[test]
    fn single_cell_map_has_one_instance() {
        let grid = RampClassifier::classify(&RawGrid::flat(2, 2).unwrap());
        let palette = palette();
        let mesh = GroundMeshBuilder::new(&palette, &[]).build(&grid);
        assert_eq!(mesh.cell_count(), 1);
        assert_eq!(mesh.instances[0].textures, [1, 0, 0, 0]);
        assert_eq!(mesh.corner_heights, vec![0.0; 4]);
    }

    #[test]
    fn textures_are_sorted_with_corner_masks() {
        let mut raw = RawGrid::flat(2, 2).unwrap();
        raw.corner_mut(0, 0).unwrap().ground_texture = 1;
        raw.corner_mut(1, 1).unwrap().ground_texture = 2;
        raw.corner_mut(0, 0).unwrap().ground_variation = 5;
        let grid = RampClassifier::classify(&raw);
        let palette = palette();
        let extended = [true, false, false, false];
        let mesh = GroundMeshBuilder::new(&palette, &extended).build(&grid);
        let cell = mesh.instances[0];
        assert_eq!(cell.textures, [1, 2, 3, 0]);
        assert_eq!(cell.variations, [21, 0b0010, 0b0100, 0]);
    }

    #[test]
    fn blight_uses_reserved_slot() {
        let mut raw = RawGrid::flat(2, 2).unwrap();
        raw.corner_mut(1, 0).unwrap().blight = true;
        let grid = RampClassifier::classify(&raw);
        let palette = palette();
        let mesh = GroundMeshBuilder::new(&palette, &[]).build(&grid);
        let cell = mesh.instances[0];
        assert_eq!(cell.textures, [1, palette.blight_index() + 1, 0, 0]);
        assert_eq!(cell.variations[1], 0b0001);
    }

    #[test]
    fn cliff_cells_are_hidden_and_neighbours_take_cliff_ground() {
        let mut raw = RawGrid::flat(6, 6).unwrap();
        raw.corner_mut(3, 3).unwrap().layer_height = 3;
        let grid = RampClassifier::classify(&raw);
        let palette = palette();
        let mesh = GroundMeshBuilder::new(&palette, &[]).build(&grid);
        let cell = |x: usize, y: usize| mesh.instances[y * 5 + x];
        assert!(!cell(2, 2).is_visible());
        assert!(!cell(3, 3).is_visible());
        // Corner (3,3) sits next to cliff cells, so it takes the cliff's ground slot 2.
        let beside = cell(3, 1);
        assert!(beside.is_visible());
        assert!(beside.textures.contains(&3));
        assert_eq!(mesh.corner_heights[3 * 6 + 3], 1.0);
    }
}
