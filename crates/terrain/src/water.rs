use glam::{Vec2, Vec3};
use mapview_common::{CELL_SIZE, MapBounds};

use crate::grid::ClassifiedGrid;
use crate::tables::WaterRow;

/// Depth (in layers) below which water uses the minimum shallow colour.
pub const MIN_DEPTH: f32 = 10.0 / 128.0;
/// Shallow/deep threshold.
pub const DEEP_LEVEL: f32 = 64.0 / 128.0;
/// Depth at which water reaches the maximum deep colour.
pub const MAX_DEPTH: f32 = 72.0 / 128.0;

/// Water constants for the map's tileset.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterParams {
    /// Added to every corner's water height, in layers.
    pub height_offset: f32,
    /// Frames advanced per rendered frame.
    pub increment: f32,
    pub frame_paths: Vec<String>,
    pub min_shallow: [f32; 4],
    pub max_shallow: [f32; 4],
    pub min_deep: [f32; 4],
    pub max_deep: [f32; 4],
}

impl WaterParams {
    pub fn from_row(row: &WaterRow, target_fps: f32) -> Self {
        let rgba = |c: [u8; 4]| c.map(f32::from);
        Self {
            height_offset: row.height,
            increment: row.tex_rate / target_fps,
            frame_paths: (0..row.num_tex)
                .map(|i| format!("{}{:02}.blp", row.tex_file, i))
                .collect(),
            min_shallow: rgba(row.smin),
            max_shallow: rgba(row.smax),
            min_deep: rgba(row.dmin),
            max_deep: rgba(row.dmax),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frame_paths.len()
    }
}

fn mix(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    std::array::from_fn(|i| (a[i] + (b[i] - a[i]) * t) / 255.0)
}

/// Surface colour (0..1 RGBA) for a water depth in layers.
pub fn water_color(params: &WaterParams, depth: f32) -> [f32; 4] {
    let value = depth.clamp(0.0, 1.0);
    if value <= DEEP_LEVEL {
        let t = (value - MIN_DEPTH).max(0.0) / (DEEP_LEVEL - MIN_DEPTH);
        mix(params.min_shallow, params.max_shallow, t)
    } else {
        let t = (value - DEEP_LEVEL).clamp(0.0, MAX_DEPTH - DEEP_LEVEL) / (MAX_DEPTH - DEEP_LEVEL);
        mix(params.min_deep, params.max_deep, t)
    }
}

/// Colour multiplier that fades water toward the playable-area edge.
///
/// `bounds` is `[min_x, min_y, max_x, max_y]` in world units.
pub fn boundary_attenuation(position: Vec2, bounds: [f32; 4]) -> f32 {
    let d = (position - Vec2::new(bounds[0], bounds[1])).min(Vec2::new(bounds[2], bounds[3]) - position);
    (d.min_element() / 64.0 + 1.0).clamp(0.0, 1.0) * 0.8 + 0.2
}

/// Cyclic water texture frame.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterAnimator {
    frame: f32,
    increment: f32,
    count: usize,
}

impl WaterAnimator {
    pub fn new(params: &WaterParams) -> Self {
        Self {
            frame: 0.0,
            increment: params.increment,
            count: params.frame_count(),
        }
    }

    /// Step one rendered frame.
    pub fn advance(&mut self) {
        if self.count == 0 {
            return;
        }
        self.frame = (self.frame + self.increment).rem_euclid(self.count as f32);
    }

    pub fn frame(&self) -> usize {
        if self.count == 0 {
            0
        } else {
            (self.frame as usize).min(self.count - 1)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterCorner {
    /// Surface position in world units.
    pub position: Vec3,
    pub depth: f32,
    pub color: [f32; 4],
}

/// One drawn water cell; corners in quad order (bottom-left, bottom-right,
/// top-left, top-right).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterCell {
    pub x: usize,
    pub y: usize,
    pub corners: [WaterCorner; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaterMesh {
    pub cells: Vec<WaterCell>,
    /// Playable area in world units, for `boundary_attenuation`.
    pub bounds: [f32; 4],
}

/// Collect water cells: any corner flagged as water and some corner with positive depth.
pub fn build_water_mesh(grid: &ClassifiedGrid, params: &WaterParams, bounds: &MapBounds) -> WaterMesh {
    let _span = tracing::info_span!("build_water").entered();
    let (columns, rows) = (grid.columns(), grid.rows());
    let offset = grid.center_offset();
    let mut cells = Vec::new();

    for y in 0..rows - 1 {
        for x in 0..columns - 1 {
            let quad = [(x, y), (x + 1, y), (x, y + 1), (x + 1, y + 1)];
            if !quad.iter().any(|&(cx, cy)| grid.at(cx, cy).corner.water) {
                continue;
            }
            let corners = quad.map(|(cx, cy)| {
                let c = grid.at(cx, cy);
                let surface = c.corner.water_height + params.height_offset;
                WaterCorner {
                    position: Vec3::new(
                        cx as f32 * CELL_SIZE + offset.x,
                        cy as f32 * CELL_SIZE + offset.y,
                        surface * CELL_SIZE,
                    ),
                    depth: grid.corner_depth(cx, cy, params.height_offset),
                    color: water_color(params, surface - c.height()),
                }
            });
            let deepest = corners.iter().map(|c| c.depth).fold(f32::MIN, f32::max);
            if deepest <= 0.0 {
                continue;
            }
            cells.push(WaterCell { x, y, corners });
        }
    }

    tracing::debug!(cells = cells.len(), "water mesh built");
    WaterMesh {
        cells,
        bounds: bounds.world_rect(columns as u32, rows as u32, offset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::RawGrid;
    use crate::ramp::RampClassifier;

    fn row() -> WaterRow {
        WaterRow {
            id: "LSha".into(),
            height: -0.5,
            tex_rate: 15.0,
            num_tex: 4,
            tex_file: "Water".into(),
            shore_dir: String::new(),
            shore_s_file: String::new(),
            shore_oc_file: String::new(),
            shore_ic_file: String::new(),
            smin: [0, 0, 0, 0],
            smax: [100, 100, 100, 100],
            dmin: [120, 120, 120, 120],
            dmax: [255, 255, 255, 255],
        }
    }

    #[test]
    fn params_from_row() {
        let p = WaterParams::from_row(&row(), 60.0);
        assert_eq!(p.increment, 0.25);
        assert_eq!(p.frame_paths[3], "Water03.blp");
    }

    #[test]
    fn animator_wraps_modulo_frame_count() {
        let p = WaterParams::from_row(&row(), 60.0);
        let mut anim = WaterAnimator::new(&p);
        for _ in 0..16 {
            anim.advance();
        }
        assert_eq!(anim.frame(), 0);
        for _ in 0..6 {
            anim.advance();
        }
        assert_eq!(anim.frame(), 1);
    }

    #[test]
    fn color_is_monotonic_within_each_range() {
        let p = WaterParams::from_row(&row(), 60.0);
        let mut last = water_color(&p, 0.0)[0];
        for i in 1..=64 {
            let c = water_color(&p, i as f32 / 128.0)[0];
            assert!(c >= last, "shallow not monotonic at {i}");
            last = c;
        }
        let mut last = water_color(&p, DEEP_LEVEL + 1e-4)[0];
        for i in 65..=128 {
            let c = water_color(&p, i as f32 / 128.0)[0];
            assert!(c >= last, "deep not monotonic at {i}");
            last = c;
        }
    }

    #[test]
    fn color_is_continuous_at_threshold() {
        let p = WaterParams::from_row(&row(), 60.0);
        let at = water_color(&p, DEEP_LEVEL);
        let below = water_color(&p, DEEP_LEVEL - 1e-5);
        for i in 0..4 {
            assert!((at[i] - below[i]).abs() < 1e-3);
            assert!((at[i] - p.max_shallow[i] / 255.0).abs() < 1e-6);
        }
    }

    #[test]
    fn attenuation_fades_outside_bounds() {
        let bounds = [0.0, 0.0, 1000.0, 1000.0];
        assert_eq!(boundary_attenuation(Vec2::new(500.0, 500.0), bounds), 1.0);
        assert!((boundary_attenuation(Vec2::new(-32.0, 500.0), bounds) - 0.6).abs() < 1e-5);
        assert!((boundary_attenuation(Vec2::new(-200.0, 500.0), bounds) - 0.2).abs() < 1e-5);
    }

    #[test]
    fn dry_map_has_no_water() {
        let grid = RampClassifier::classify(&RawGrid::flat(3, 3).unwrap());
        let p = WaterParams::from_row(&row(), 60.0);
        let mesh = build_water_mesh(&grid, &p, &MapBounds::default());
        assert!(mesh.cells.is_empty());
    }

    #[test]
    fn cells_need_positive_depth() {
        let mut raw = RawGrid::flat(3, 2).unwrap();
        for x in 0..3 {
            raw.corner_mut(x, 0).unwrap().water = true;
        }
        // Only the first corner's surface is above the ground.
        raw.corner_mut(0, 0).unwrap().water_height = 1.0;
        let grid = RampClassifier::classify(&raw);
        let p = WaterParams::from_row(&row(), 60.0);
        let mesh = build_water_mesh(&grid, &p, &MapBounds::default());
        assert_eq!(mesh.cells.len(), 1);
        assert_eq!((mesh.cells[0].x, mesh.cells[0].y), (0, 0));
        assert!((mesh.cells[0].corners[0].depth - 0.5).abs() < 1e-6);
        assert_eq!(mesh.cells[0].corners[0].position.z, 64.0);
    }
}
