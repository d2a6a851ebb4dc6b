use glam::{Vec2, Vec3};
use mapview_common::{CELL_SIZE, LAYER_BIAS, MapBounds};
use serde::{Deserialize, Serialize};

use crate::TerrainError;
use crate::ramp::RampCode;

/// One grid vertex as stored in the map description.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Corner {
    /// Fine height offset, in layers.
    pub ground_height: f32,
    /// Water surface height, in layers, before the tileset offset.
    pub water_height: f32,
    /// Discrete cliff level.
    pub layer_height: u8,
    pub ground_texture: u8,
    pub ground_variation: u8,
    pub cliff_texture: u8,
    pub cliff_variation: u8,
    pub ramp: bool,
    pub blight: bool,
    pub water: bool,
    /// Outside the playable area.
    pub boundary: bool,
}

impl Corner {
    pub fn flat() -> Self {
        Self {
            layer_height: LAYER_BIAS as u8,
            ..Self::default()
        }
    }

    /// Ground plus cliff level, in layers, with layer 2 at zero.
    fn surface(&self) -> f32 {
        self.ground_height + self.layer_height as f32 - LAYER_BIAS as f32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GridRecord {
    columns: usize,
    rows: usize,
    #[serde(default)]
    center_offset: Vec2,
    corners: Vec<Corner>,
}

/// Unclassified corner grid, row-major with row 0 at the bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridRecord", into = "GridRecord")]
pub struct RawGrid {
    columns: usize,
    rows: usize,
    center_offset: Vec2,
    corners: Vec<Corner>,
}

impl TryFrom<GridRecord> for RawGrid {
    type Error = TerrainError;

    fn try_from(record: GridRecord) -> Result<Self, Self::Error> {
        RawGrid::new(record.columns, record.rows, record.center_offset, record.corners)
    }
}

impl From<RawGrid> for GridRecord {
    fn from(grid: RawGrid) -> Self {
        GridRecord {
            columns: grid.columns,
            rows: grid.rows,
            center_offset: grid.center_offset,
            corners: grid.corners,
        }
    }
}

impl RawGrid {
    pub fn new(
        columns: usize,
        rows: usize,
        center_offset: Vec2,
        corners: Vec<Corner>,
    ) -> Result<Self, TerrainError> {
        let expected = corner_total(columns, rows)?;
        if corners.len() != expected {
            return Err(TerrainError::CornerCount {
                columns,
                rows,
                expected,
                actual: corners.len(),
            });
        }
        Ok(Self {
            columns,
            rows,
            center_offset,
            corners,
        })
    }

    /// A level grid at layer 2 with no water, ramps or blight.
    pub fn flat(columns: usize, rows: usize) -> Result<Self, TerrainError> {
        let total = corner_total(columns, rows)?;
        Self::new(columns, rows, Vec2::ZERO, vec![Corner::flat(); total])
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn center_offset(&self) -> Vec2 {
        self.center_offset
    }

    pub fn corner(&self, x: usize, y: usize) -> Option<&Corner> {
        if x < self.columns && y < self.rows {
            self.corners.get(y * self.columns + x)
        } else {
            None
        }
    }

    pub fn corner_mut(&mut self, x: usize, y: usize) -> Option<&mut Corner> {
        if x < self.columns && y < self.rows {
            self.corners.get_mut(y * self.columns + x)
        } else {
            None
        }
    }

    pub fn corners(&self) -> &[Corner] {
        &self.corners
    }

    /// World-space position of a corner in the ground plane.
    pub fn cell_world_origin(&self, x: usize, y: usize) -> Vec2 {
        cell_world_origin(self.center_offset, x, y)
    }

    /// Terrain height in world units at a world position, 0 off the map.
    pub fn height_at(&self, x: f32, y: f32) -> f32 {
        interpolate_height(self.columns, self.rows, self.center_offset, x, y, |cx, cy| {
            self.corners[cy * self.columns + cx].surface()
        })
    }

    /// Surface normal from the fine ground heights, +Z off the map.
    pub fn ground_normal(&self, x: f32, y: f32) -> Vec3 {
        let Some((cell_x, cell_y, sq_x, sq_y)) =
            locate_cell(self.columns, self.rows, self.center_offset, x, y)
        else {
            return Vec3::Z;
        };
        let h = |cx: usize, cy: usize| self.corners[cy * self.columns + cx].ground_height;
        let bottom_left = h(cell_x, cell_y);
        let bottom_right = h(cell_x + 1, cell_y);
        let top_left = h(cell_x, cell_y + 1);
        let top_right = h(cell_x + 1, cell_y + 1);

        let (a, b) = if sq_x + sq_y < 1.0 {
            (
                Vec3::new(1.0, 0.0, bottom_right - bottom_left),
                Vec3::new(0.0, 1.0, top_left - bottom_left),
            )
        } else {
            (
                Vec3::new(-1.0, 0.0, top_right - top_left),
                Vec3::new(0.0, 1.0, top_right - bottom_right),
            )
        };
        a.cross(b).normalize_or(Vec3::Z)
    }
}

fn corner_total(columns: usize, rows: usize) -> Result<usize, TerrainError> {
    if columns < 2 || rows < 2 {
        return Err(TerrainError::TooSmall { columns, rows });
    }
    columns
        .checked_mul(rows)
        .ok_or(TerrainError::TooLarge { columns, rows })
}

/// How a corner takes part in a ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RampType {
    #[default]
    None,
    /// Owner of a ramp spanning three rows.
    Vertical,
    /// Owner of a ramp spanning three columns.
    Horizontal,
    /// Covered by a ramp owned elsewhere, or by a cliff decoration footprint.
    Covered,
}

impl RampType {
    pub fn is_set(self) -> bool {
        self != RampType::None
    }

    pub fn is_owner(self) -> bool {
        matches!(self, RampType::Vertical | RampType::Horizontal)
    }
}

/// A corner after ramp and cliff classification.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassifiedCorner {
    /// Source attributes; `cliff_texture` may have been rewritten for ramps.
    pub corner: Corner,
    /// Extra height, in layers, lifting the inside of a ramp.
    pub ramp_adjust: f32,
    pub ramp_type: RampType,
    /// Set on ramp owners only.
    pub ramp_code: Option<RampCode>,
    /// The cell owned by this corner is a plain cliff.
    pub cliff: bool,
}

impl ClassifiedCorner {
    fn from_raw(corner: Corner) -> Self {
        Self {
            corner,
            ..Self::default()
        }
    }

    /// Rendered ground height in layers.
    pub fn height(&self) -> f32 {
        self.corner.surface() + self.ramp_adjust
    }
}

/// Corner grid after classification. Produced by `RampClassifier::classify`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedGrid {
    columns: usize,
    rows: usize,
    center_offset: Vec2,
    corners: Vec<ClassifiedCorner>,
}

impl ClassifiedGrid {
    pub(crate) fn from_raw(raw: &RawGrid) -> Self {
        Self {
            columns: raw.columns,
            rows: raw.rows,
            center_offset: raw.center_offset,
            corners: raw.corners.iter().copied().map(ClassifiedCorner::from_raw).collect(),
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn center_offset(&self) -> Vec2 {
        self.center_offset
    }

    pub fn corner(&self, x: usize, y: usize) -> Option<&ClassifiedCorner> {
        if x < self.columns && y < self.rows {
            self.corners.get(y * self.columns + x)
        } else {
            None
        }
    }

    pub(crate) fn corner_mut(&mut self, x: usize, y: usize) -> Option<&mut ClassifiedCorner> {
        if x < self.columns && y < self.rows {
            self.corners.get_mut(y * self.columns + x)
        } else {
            None
        }
    }

    /// Unchecked accessor for loops already bounded by the grid size.
    pub(crate) fn at(&self, x: usize, y: usize) -> &ClassifiedCorner {
        &self.corners[y * self.columns + x]
    }

    pub(crate) fn at_mut(&mut self, x: usize, y: usize) -> &mut ClassifiedCorner {
        &mut self.corners[y * self.columns + x]
    }

    pub fn cell_world_origin(&self, x: usize, y: usize) -> Vec2 {
        cell_world_origin(self.center_offset, x, y)
    }

    /// Water depth in layers at a corner, 0 for dry corners.
    pub fn corner_depth(&self, x: usize, y: usize, water_offset: f32) -> f32 {
        let c = self.at(x, y);
        if c.corner.water {
            water_offset + c.corner.water_height - c.height()
        } else {
            0.0
        }
    }

    /// Terrain height in world units, ignoring ramp adjustment.
    pub fn height_at(&self, x: f32, y: f32) -> f32 {
        interpolate_height(self.columns, self.rows, self.center_offset, x, y, |cx, cy| {
            self.at(cx, cy).corner.surface()
        })
    }

    /// Inside the camera insets and not flagged as boundary.
    pub fn in_playable_area(&self, position: Vec2, bounds: &MapBounds) -> bool {
        let cell = (position - self.center_offset) / CELL_SIZE;
        if !bounds.in_playable_area(cell, self.columns as u32, self.rows as u32) {
            return false;
        }
        let x = (cell.x.floor() as usize).min(self.columns - 1);
        let y = (cell.y.floor() as usize).min(self.rows - 1);
        !self.at(x, y).corner.boundary
    }
}

fn cell_world_origin(center_offset: Vec2, x: usize, y: usize) -> Vec2 {
    Vec2::new(
        x as f32 * CELL_SIZE + center_offset.x,
        y as f32 * CELL_SIZE + center_offset.y,
    )
}

/// Cell index and fractional position inside it, or `None` off the map.
fn locate_cell(
    columns: usize,
    rows: usize,
    center_offset: Vec2,
    x: f32,
    y: f32,
) -> Option<(usize, usize, f32, f32)> {
    let fx = (x - center_offset.x) / CELL_SIZE;
    let fy = (y - center_offset.y) / CELL_SIZE;
    if fx < 0.0 || fy < 0.0 {
        return None;
    }
    let cell_x = fx.trunc() as usize;
    let cell_y = fy.trunc() as usize;
    if cell_x >= columns - 1 || cell_y >= rows - 1 {
        return None;
    }
    Some((cell_x, cell_y, fx - cell_x as f32, fy - cell_y as f32))
}

/// Triangle interpolation over the two halves of a cell.
fn interpolate_height(
    columns: usize,
    rows: usize,
    center_offset: Vec2,
    x: f32,
    y: f32,
    height: impl Fn(usize, usize) -> f32,
) -> f32 {
    let Some((cell_x, cell_y, sq_x, sq_y)) = locate_cell(columns, rows, center_offset, x, y) else {
        return 0.0;
    };
    let bottom_left = height(cell_x, cell_y);
    let bottom_right = height(cell_x + 1, cell_y);
    let top_left = height(cell_x, cell_y + 1);
    let top_right = height(cell_x + 1, cell_y + 1);

    let h = if sq_x + sq_y < 1.0 {
        bottom_left + (bottom_right - bottom_left) * sq_x + (top_left - bottom_left) * sq_y
    } else {
        top_right + (bottom_right - top_right) * (1.0 - sq_y) + (top_left - top_right) * (1.0 - sq_x)
    };
    h * CELL_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sloped() -> RawGrid {
        let mut grid = RawGrid::flat(3, 3).unwrap();
        grid.corner_mut(1, 0).unwrap().ground_height = 1.0;
        grid.corner_mut(1, 1).unwrap().ground_height = 1.0;
        grid
    }

    #[test]
    fn rejects_bad_sizes() {
        assert!(matches!(
            RawGrid::flat(1, 4),
            Err(TerrainError::TooSmall { .. })
        ));
        let err = RawGrid::new(2, 2, Vec2::ZERO, vec![Corner::flat(); 3]).unwrap_err();
        assert!(matches!(err, TerrainError::CornerCount { expected: 4, .. }));
    }

    #[test]
    fn oversized_dimensions_are_rejected_without_overflow() {
        let err = RawGrid::new(usize::MAX, 2, Vec2::ZERO, Vec::new()).unwrap_err();
        assert!(matches!(err, TerrainError::TooLarge { columns: usize::MAX, rows: 2 }));
        assert!(matches!(
            RawGrid::flat(2, usize::MAX / 2 + 1),
            Err(TerrainError::TooLarge { .. })
        ));

        let record = r#"{"columns": 18446744073709551615, "rows": 3, "corners": []}"#;
        assert!(serde_json::from_str::<RawGrid>(record).is_err());
    }

    #[test]
    fn flat_grid_is_at_zero() {
        let grid = RawGrid::flat(4, 4).unwrap();
        assert_eq!(grid.height_at(100.0, 200.0), 0.0);
        assert_eq!(grid.ground_normal(100.0, 200.0), Vec3::Z);
    }

    #[test]
    fn height_interpolates_across_cell() {
        let grid = sloped();
        assert!((grid.height_at(0.0, 0.0) - 0.0).abs() < 1e-4);
        assert!((grid.height_at(64.0, 0.0) - 64.0).abs() < 1e-4);
        assert!((grid.height_at(127.0, 10.0) - 127.0).abs() < 1e-3);
    }

    #[test]
    fn off_map_queries_fall_back() {
        let grid = sloped();
        assert_eq!(grid.height_at(-5.0, 10.0), 0.0);
        assert_eq!(grid.height_at(300.0, 10.0), 0.0);
        assert_eq!(grid.ground_normal(1000.0, 1000.0), Vec3::Z);
    }

    #[test]
    fn normal_tilts_away_from_slope() {
        let grid = sloped();
        let n = grid.ground_normal(30.0, 30.0);
        assert!(n.x < 0.0);
        assert!(n.z > 0.0);
    }

    #[test]
    fn serde_validates_corner_count() {
        let json = r#"{"columns":2,"rows":2,"corners":[{},{},{}]}"#;
        assert!(serde_json::from_str::<RawGrid>(json).is_err());
        let json = r#"{"columns":2,"rows":2,"corners":[{},{},{},{"layer_height":3}]}"#;
        let grid: RawGrid = serde_json::from_str(json).unwrap();
        assert_eq!(grid.corner(1, 1).unwrap().layer_height, 3);
    }

    #[test]
    fn cell_origin_uses_center_offset() {
        let grid = RawGrid::new(2, 2, Vec2::new(-128.0, -64.0), vec![Corner::flat(); 4]).unwrap();
        assert_eq!(grid.cell_world_origin(1, 1), Vec2::new(0.0, 64.0));
    }
}
