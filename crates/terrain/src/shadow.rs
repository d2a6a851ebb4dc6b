use glam::Vec2;
use mapview_common::{CELL_SIZE, MapBounds};

use crate::grid::ClassifiedGrid;

/// Single-channel shadow texture; 0 is lit, 255 fully shaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowMap {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl ShadowMap {
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x < self.width && y < self.height {
            Some(self.data[y * self.width + x])
        } else {
            None
        }
    }
}

/// Which texels of a shadow texture cast shadow (alpha != 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaFootprint {
    pub width: usize,
    pub height: usize,
    mask: Vec<bool>,
}

impl AlphaFootprint {
    /// Build from tightly packed RGBA8 pixels, top row first.
    pub fn from_rgba(width: usize, height: usize, rgba: &[u8]) -> Self {
        let mask = (0..width * height)
            .map(|i| rgba.get(i * 4 + 3).is_some_and(|&a| a != 0))
            .collect();
        Self { width, height, mask }
    }

    /// Texel offset from the entity position to the footprint's top-left corner.
    pub fn anchor(&self) -> (i64, i64) {
        (
            (self.width as f32 * 0.3).round() as i64,
            (self.height as f32 * 0.7).round() as i64,
        )
    }

    fn casts(&self, x: usize, y: usize) -> bool {
        self.mask[y * self.width + x]
    }
}

/// Composites the map shadow texture once per load.
///
/// Every write takes the per-texel maximum, so stamping order never matters and
/// stamping twice is the same as stamping once.
#[derive(Debug, Clone)]
pub struct ShadowBaker {
    map: ShadowMap,
    /// Texels per cell edge.
    resolution: usize,
    center_offset: Vec2,
}

impl ShadowBaker {
    /// Start from the map's base bitmap, halved; a bitmap that is too short is ignored.
    pub fn new(grid: &ClassifiedGrid, resolution: usize, base: Option<&[u8]>) -> Self {
        let width = (grid.columns() - 1) * resolution;
        let height = (grid.rows() - 1) * resolution;
        let size = width * height;
        let data = match base {
            Some(bytes) if bytes.len() >= size => bytes[..size].iter().map(|b| b / 2).collect(),
            Some(bytes) => {
                tracing::warn!(len = bytes.len(), expected = size, "base shadow bitmap too short");
                vec![0; size]
            }
            None => vec![0; size],
        };
        Self {
            map: ShadowMap {
                width,
                height,
                data,
            },
            resolution,
            center_offset: grid.center_offset(),
        }
    }

    fn raise(&mut self, x: usize, y: usize, value: u8) {
        let texel = &mut self.map.data[y * self.map.width + x];
        *texel = (*texel).max(value);
    }

    /// Stamp a footprint at a world position.
    pub fn stamp(&mut self, footprint: &AlphaFootprint, position: Vec2, value: u8) {
        let texel = CELL_SIZE / self.resolution as f32;
        let (ox, oy) = footprint.anchor();
        let x0 = ((position.x - self.center_offset.x) / texel).floor() as i64 - ox;
        let y0 = ((position.y - self.center_offset.y) / texel).floor() as i64 + oy;
        let (width, height) = (self.map.width as i64, self.map.height as i64);

        for fy in 0..footprint.height {
            let ty = y0 - fy as i64;
            if ty < 0 || ty >= height {
                continue;
            }
            for fx in 0..footprint.width {
                let tx = x0 + fx as i64;
                if tx < 0 || tx >= width {
                    continue;
                }
                if footprint.casts(fx, fy) {
                    self.raise(tx as usize, ty as usize, value);
                }
            }
        }
    }

    /// Shade everything outside the playable area, plus boundary corners inside it.
    pub fn bake(mut self, grid: &ClassifiedGrid, bounds: &MapBounds, outside: u8) -> ShadowMap {
        let _span = tracing::info_span!("bake_shadows").entered();
        let res = self.resolution;
        let (x0, x1, y0, y1) = bounds.playable_cells(grid.columns() as u32, grid.rows() as u32);
        let (x0, x1) = (x0 as usize * res, (x1 as usize * res).min(self.map.width));
        let (y0, y1) = (y0 as usize * res, (y1 as usize * res).min(self.map.height));

        for y in 0..self.map.height {
            for x in 0..self.map.width {
                let inside = x >= x0 && x < x1 && y >= y0 && y < y1;
                if !inside || grid.at(x / res, y / res).corner.boundary {
                    self.raise(x, y, outside);
                }
            }
        }
        tracing::debug!(width = self.map.width, height = self.map.height, "shadow map baked");
        self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::RawGrid;
    use crate::ramp::RampClassifier;

    fn grid(columns: usize, rows: usize) -> ClassifiedGrid {
        RampClassifier::classify(&RawGrid::flat(columns, rows).unwrap())
    }

    fn square(size: usize) -> AlphaFootprint {
        AlphaFootprint::from_rgba(size, size, &vec![255; size * size * 4])
    }

    #[test]
    fn base_bitmap_is_halved() {
        let g = grid(2, 2);
        let base = vec![200u8; 16];
        let map = ShadowBaker::new(&g, 4, Some(&base)).bake(&g, &MapBounds::default(), 204);
        assert_eq!(map.width, 4);
        assert!(map.data.iter().all(|&v| v == 100));
    }

    #[test]
    fn short_bitmap_is_ignored() {
        let g = grid(2, 2);
        let map = ShadowBaker::new(&g, 4, Some(&[255u8; 3])).bake(&g, &MapBounds::default(), 204);
        assert!(map.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn footprint_anchor_rounds() {
        let f = square(10);
        assert_eq!(f.anchor(), (3, 7));
    }

    #[test]
    fn stamping_twice_is_idempotent() {
        let g = grid(5, 5);
        let f = square(4);
        let mut once = ShadowBaker::new(&g, 4, None);
        once.stamp(&f, Vec2::new(200.0, 200.0), 128);
        let mut twice = once.clone();
        twice.stamp(&f, Vec2::new(200.0, 200.0), 128);
        let bounds = MapBounds::default();
        assert_eq!(once.bake(&g, &bounds, 204), twice.bake(&g, &bounds, 204));
    }

    #[test]
    fn compositing_takes_maximum() {
        let g = grid(5, 5);
        let base = vec![250u8; 16 * 16];
        let mut baker = ShadowBaker::new(&g, 4, Some(&base));
        baker.stamp(&square(4), Vec2::new(200.0, 200.0), 128);
        let map = baker.bake(&g, &MapBounds::default(), 204);
        assert!(map.data.iter().all(|&v| v == 125 || v == 128));
        // Footprint top-left lands at texel (6 - 1, 6 + 3).
        assert_eq!(map.get(5, 9), Some(128));
        assert_eq!(map.get(5, 10), Some(125));
    }

    #[test]
    fn outside_area_is_shaded() {
        let g = grid(5, 5);
        let bounds = MapBounds {
            left: 1,
            right: 0,
            bottom: 0,
            top: 0,
        };
        let map = ShadowBaker::new(&g, 4, None).bake(&g, &bounds, 204);
        assert_eq!(map.get(3, 0), Some(204));
        assert_eq!(map.get(4, 0), Some(0));
    }

    #[test]
    fn boundary_corners_are_shaded() {
        let mut raw = RawGrid::flat(3, 3).unwrap();
        raw.corner_mut(1, 1).unwrap().boundary = true;
        let g = RampClassifier::classify(&raw);
        let map = ShadowBaker::new(&g, 4, None).bake(&g, &MapBounds::default(), 204);
        assert_eq!(map.get(4, 4), Some(204));
        assert_eq!(map.get(3, 3), Some(0));
    }
}
