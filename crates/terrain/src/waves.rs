use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use glam::Vec3;
use mapview_common::{CELL_SIZE, MapBounds, Tint};

use crate::grid::ClassifiedGrid;
use crate::tables::WaterRow;
use crate::water::WaterParams;

/// Map flag: waves along cliff shores.
pub const WAVES_CLIFF: u32 = 0x0800;
/// Map flag: waves along gentle shores.
pub const WAVES_ROLLING: u32 = 0x1000;

/// Corners deeper than this (in layers) count as open water.
const WAVES_DEPTH: f32 = 25.0 / 128.0;

#[derive(Debug, Clone, PartialEq)]
pub struct WavePlacement {
    pub model_path: String,
    pub position: Vec3,
    /// Rotation around +Z.
    pub angle: f32,
    pub tint: Tint,
}

fn corner_angle(a: bool, b: bool, c: bool) -> f32 {
    if a {
        -3.0 * FRAC_PI_4
    } else if b {
        -FRAC_PI_4
    } else if c {
        FRAC_PI_4
    } else {
        3.0 * FRAC_PI_4
    }
}

fn shore_angle(a: bool, b: bool, c: bool, d: bool) -> Option<f32> {
    match (a, b, c, d) {
        (true, true, _, _) => Some(-FRAC_PI_2),
        (_, true, true, _) => Some(0.0),
        (_, _, true, true) => Some(FRAC_PI_2),
        (true, _, _, true) => Some(PI),
        _ => None,
    }
}

/// Shore wave models for water cells, chosen by how many corners are open water.
///
/// Corners go counter-clockwise from the bottom-left. Cells whose layers differ need
/// `WAVES_CLIFF`, level cells need `WAVES_ROLLING`.
pub fn place_shore_waves(
    grid: &ClassifiedGrid,
    params: &WaterParams,
    row: &WaterRow,
    flags: u32,
    bounds: &MapBounds,
    outside_tint: f32,
) -> Vec<WavePlacement> {
    let cliff_waves = flags & WAVES_CLIFF != 0;
    let rolling_waves = flags & WAVES_ROLLING != 0;
    if !cliff_waves && !rolling_waves {
        return Vec::new();
    }

    let model = |file: &str| format!("{}\\{file}\\{file}0.mdx", row.shore_dir);
    let shoreline = model(&row.shore_s_file);
    let outside_corner = model(&row.shore_oc_file);
    let inside_corner = model(&row.shore_ic_file);
    let offset = grid.center_offset();
    let mut waves = Vec::new();

    for y in 0..grid.rows() - 1 {
        for x in 0..grid.columns() - 1 {
            let quad = [(x, y), (x + 1, y), (x + 1, y + 1), (x, y + 1)];
            let corners = quad.map(|(cx, cy)| grid.at(cx, cy));
            if !corners.iter().any(|c| c.corner.water) {
                continue;
            }
            let layer = corners[0].corner.layer_height;
            let is_cliff = corners.iter().any(|c| c.corner.layer_height != layer);
            if (is_cliff && !cliff_waves) || (!is_cliff && !rolling_waves) {
                continue;
            }

            let [a, b, c, d] =
                quad.map(|(cx, cy)| grid.corner_depth(cx, cy, params.height_offset) > WAVES_DEPTH);
            let deep = [a, b, c, d].iter().filter(|&&v| v).count();
            let (path, angle) = match deep {
                1 => (&inside_corner, corner_angle(a, b, c)),
                2 => match shore_angle(a, b, c, d) {
                    Some(angle) => (&shoreline, angle),
                    None => continue,
                },
                3 => (&outside_corner, corner_angle(!a, !b, !c) + PI),
                _ => continue,
            };

            let water = corners.iter().map(|c| c.corner.water_height).sum::<f32>() / 4.0;
            let position = Vec3::new(
                x as f32 * CELL_SIZE + offset.x + CELL_SIZE / 2.0,
                y as f32 * CELL_SIZE + offset.y + CELL_SIZE / 2.0,
                (water + params.height_offset) * CELL_SIZE + 1.0,
            );
            let tint = if grid.in_playable_area(position.truncate(), bounds) {
                Tint::WHITE
            } else {
                Tint::WHITE.darkened(outside_tint)
            };
            waves.push(WavePlacement {
                model_path: path.clone(),
                position,
                angle,
                tint,
            });
        }
    }
    tracing::debug!(count = waves.len(), "shore waves placed");
    waves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::RawGrid;
    use crate::ramp::RampClassifier;

    fn row() -> WaterRow {
        WaterRow {
            id: "LSha".into(),
            height: 0.0,
            tex_rate: 1.0,
            num_tex: 1,
            tex_file: "Water".into(),
            shore_dir: "Doodads\\Terrain\\Shore".into(),
            shore_s_file: "Shoreline".into(),
            shore_oc_file: "ShoreOC".into(),
            shore_ic_file: "ShoreIC".into(),
            smin: [0; 4],
            smax: [0; 4],
            dmin: [0; 4],
            dmax: [0; 4],
        }
    }

    /// 2x2 map with the given corners (bottom-left, bottom-right, top-right,
    /// top-left) under deep water.
    fn pond(deep: [bool; 4]) -> ClassifiedGrid {
        let mut raw = RawGrid::flat(2, 2).unwrap();
        for ((x, y), is_deep) in [(0, 0), (1, 0), (1, 1), (0, 1)].into_iter().zip(deep) {
            let c = raw.corner_mut(x, y).unwrap();
            c.water = true;
            c.water_height = if is_deep { 1.0 } else { 0.0 };
        }
        RampClassifier::classify(&raw)
    }

    fn place(grid: &ClassifiedGrid, flags: u32) -> Vec<WavePlacement> {
        let row = row();
        let params = WaterParams::from_row(&row, 60.0);
        place_shore_waves(grid, &params, &row, flags, &MapBounds::default(), 0.2)
    }

    #[test]
    fn no_flags_no_waves() {
        assert!(place(&pond([true, false, false, false]), 0).is_empty());
    }

    #[test]
    fn one_deep_corner_is_inside_corner() {
        let waves = place(&pond([false, true, false, false]), WAVES_ROLLING);
        assert_eq!(waves.len(), 1);
        assert_eq!(waves[0].model_path, "Doodads\\Terrain\\Shore\\ShoreIC\\ShoreIC0.mdx");
        assert_eq!(waves[0].angle, -FRAC_PI_4);
        // Average water height 0.25 layers, one unit above the surface.
        assert_eq!(waves[0].position, Vec3::new(64.0, 64.0, 33.0));
    }

    #[test]
    fn adjacent_pair_is_shoreline() {
        let waves = place(&pond([false, false, true, true]), WAVES_ROLLING);
        assert_eq!(waves.len(), 1);
        assert!(waves[0].model_path.ends_with("Shoreline0.mdx"));
        assert_eq!(waves[0].angle, FRAC_PI_2);
    }

    #[test]
    fn diagonal_pair_has_no_wave() {
        assert!(place(&pond([true, false, true, false]), WAVES_ROLLING).is_empty());
    }

    #[test]
    fn three_deep_corners_is_outside_corner() {
        let waves = place(&pond([true, true, true, false]), WAVES_ROLLING);
        assert_eq!(waves.len(), 1);
        assert!(waves[0].model_path.ends_with("ShoreOC0.mdx"));
        assert_eq!(waves[0].angle, 3.0 * FRAC_PI_4 + PI);
    }

    #[test]
    fn cliff_cells_need_cliff_flag() {
        let mut raw = RawGrid::flat(2, 2).unwrap();
        for y in 0..2 {
            for x in 0..2 {
                let c = raw.corner_mut(x, y).unwrap();
                c.water = true;
                c.water_height = 1.1;
            }
        }
        raw.corner_mut(0, 0).unwrap().layer_height = 3;
        let grid = RampClassifier::classify(&raw);
        assert!(place(&grid, WAVES_ROLLING).is_empty());
        assert_eq!(place(&grid, WAVES_CLIFF).len(), 1);
    }
}
