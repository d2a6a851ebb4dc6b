use glam::Vec2;
use mapview_common::CELL_SIZE;

/// Vertices a batch can hold while indexing with `u16`.
pub const MAX_BATCH_VERTICES: usize = 1 << 16;

/// One decal rectangle in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplatQuad {
    pub min: Vec2,
    pub max: Vec2,
    /// Height above the terrain surface.
    pub lift: f32,
}

impl SplatQuad {
    /// A square of half extent `radius` centred on `center`.
    pub fn centered(center: Vec2, radius: f32, lift: f32) -> Self {
        Self {
            min: center - Vec2::splat(radius),
            max: center + Vec2::splat(radius),
            lift,
        }
    }
}

/// Decals sharing one texture and colour.
#[derive(Debug, Clone, PartialEq)]
pub struct SplatSet {
    pub texture: String,
    pub color: [f32; 4],
    pub quads: Vec<SplatQuad>,
}

impl SplatSet {
    pub fn new(texture: impl Into<String>, color: [f32; 4]) -> Self {
        Self {
            texture: texture.into(),
            color,
            quads: Vec::new(),
        }
    }
}

/// Terrain-following decal vertex; z of `position` is the lift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplatVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// One indexed draw. Never holds more vertices than the ceiling it was built with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplatBatch {
    pub vertices: Vec<SplatVertex>,
    pub indices: Vec<u16>,
}

impl SplatBatch {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Tessellate decals onto the cell grid so they can follow the terrain, splitting
/// into batches of at most `ceiling` vertices. A single decal bigger than the
/// ceiling is dropped. The ceiling never exceeds what 16-bit indices address.
pub fn build_splat_batches(set: &SplatSet, center_offset: Vec2, ceiling: usize) -> Vec<SplatBatch> {
    let ceiling = ceiling.min(MAX_BATCH_VERTICES);
    let mut batches = Vec::new();
    let mut current = SplatBatch::default();

    for quad in &set.quads {
        let size = quad.max - quad.min;
        if size.x <= 0.0 || size.y <= 0.0 {
            tracing::debug!(texture = %set.texture, ?quad, "empty splat skipped");
            continue;
        }
        let lo = ((quad.min - center_offset) / CELL_SIZE).floor();
        let hi = ((quad.max - center_offset) / CELL_SIZE).ceil();
        let (ix0, iy0, ix1, iy1) = (lo.x as i64, lo.y as i64, hi.x as i64, hi.y as i64);
        let (Some(step), Some(lines)) = (corner_span(ix0, ix1), corner_span(iy0, iy1)) else {
            tracing::warn!(texture = %set.texture, ?quad, "splat spans too many cells");
            continue;
        };
        let new_vertices = step.saturating_mul(lines);
        if new_vertices > ceiling {
            tracing::warn!(texture = %set.texture, new_vertices, ceiling, "splat too large for one batch");
            continue;
        }
        if current.vertices.len() + new_vertices > ceiling {
            batches.push(std::mem::take(&mut current));
        }

        let start = current.vertices.len();
        for iy in iy0..=iy1 {
            let y = iy as f32 * CELL_SIZE + center_offset.y;
            for ix in ix0..=ix1 {
                let x = ix as f32 * CELL_SIZE + center_offset.x;
                current.vertices.push(SplatVertex {
                    position: [x, y, quad.lift],
                    uv: [
                        (x - quad.min.x) / size.x,
                        1.0 - (y - quad.min.y) / size.y,
                    ],
                });
            }
        }
        for i in 0..lines - 1 {
            for j in 0..step - 1 {
                let i0 = (start + i * step + j) as u16;
                let s = step as u16;
                current
                    .indices
                    .extend_from_slice(&[i0, i0 + 1, i0 + s, i0 + 1, i0 + s + 1, i0 + s]);
            }
        }
    }

    if !current.is_empty() {
        batches.push(current);
    }
    tracing::trace!(texture = %set.texture, batches = batches.len(), "splat batches built");
    batches
}

/// Corners from `lo` to `hi` inclusive.
fn corner_span(lo: i64, hi: i64) -> Option<usize> {
    let span = hi.checked_sub(lo)?.checked_add(1)?;
    usize::try_from(span).ok().filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cell-aligned one-cell decals along a row.
    fn row_of(count: usize) -> SplatSet {
        let mut set = SplatSet::new("t.blp", [1.0; 4]);
        for i in 0..count {
            let min = Vec2::new(i as f32 * 256.0, 0.0);
            set.quads.push(SplatQuad {
                min,
                max: min + Vec2::splat(128.0),
                lift: 1.0,
            });
        }
        set
    }

    #[test]
    fn aligned_quad_is_four_vertices() {
        let batches = build_splat_batches(&row_of(1), Vec2::ZERO, 65_000);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].vertex_count(), 4);
        assert_eq!(batches[0].indices, vec![0, 1, 2, 1, 3, 2]);
        assert_eq!(batches[0].vertices[0].uv, [0.0, 1.0]);
        assert_eq!(batches[0].vertices[3].uv, [1.0, 0.0]);
        assert_eq!(batches[0].vertices[3].position, [128.0, 128.0, 1.0]);
    }

    #[test]
    fn unaligned_quad_spans_extra_cells() {
        let mut set = SplatSet::new("t.blp", [1.0; 4]);
        set.quads.push(SplatQuad::centered(Vec2::new(64.0, 64.0), 100.0, 0.0));
        let batches = build_splat_batches(&set, Vec2::ZERO, 65_000);
        // -36..164 covers cells -1..2 on both axes: 4x4 corners, 3x3 cells.
        assert_eq!(batches[0].vertex_count(), 16);
        assert_eq!(batches[0].indices.len(), 9 * 6);
    }

    #[test]
    fn batches_respect_ceiling_and_cover_every_quad_once() {
        let set = row_of(5);
        let batches = build_splat_batches(&set, Vec2::ZERO, 10);
        assert!(batches.len() >= 2);
        for batch in &batches {
            assert!(batch.vertex_count() <= 10);
            assert!(batch.indices.iter().all(|&i| (i as usize) < batch.vertex_count()));
        }
        let cells: usize = batches.iter().map(|b| b.indices.len() / 6).sum();
        assert_eq!(cells, 5);
        let mut xs: Vec<f32> = batches
            .iter()
            .flat_map(|b| b.vertices.iter().map(|v| v.position[0]))
            .filter(|x| x % 256.0 == 0.0)
            .collect();
        xs.sort_by(f32::total_cmp);
        xs.dedup();
        assert_eq!(xs, vec![0.0, 256.0, 512.0, 768.0, 1024.0]);
    }

    #[test]
    fn oversized_quad_is_dropped() {
        let mut set = row_of(1);
        set.quads.push(SplatQuad::centered(Vec2::ZERO, 1000.0, 0.0));
        let batches = build_splat_batches(&set, Vec2::ZERO, 16);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].vertex_count(), 4);
    }

    #[test]
    fn unbounded_ceiling_still_fits_u16_indices() {
        // 20 000 one-cell decals are 80 000 corners.
        let batches = build_splat_batches(&row_of(20_000), Vec2::ZERO, usize::MAX);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].vertex_count(), MAX_BATCH_VERTICES);
        for batch in &batches {
            assert!(batch.indices.iter().all(|&i| (i as usize) < batch.vertex_count()));
        }
        let cells: usize = batches.iter().map(|b| b.indices.len() / 6).sum();
        assert_eq!(cells, 20_000);
    }

    #[test]
    fn huge_extents_are_dropped_without_overflow() {
        let mut set = row_of(1);
        set.quads.push(SplatQuad {
            min: Vec2::splat(-f32::MAX),
            max: Vec2::splat(f32::MAX),
            lift: 0.0,
        });
        let batches = build_splat_batches(&set, Vec2::ZERO, usize::MAX);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].vertex_count(), 4);
    }

    #[test]
    fn degenerate_quad_is_skipped() {
        let mut set = SplatSet::new("t.blp", [1.0; 4]);
        set.quads.push(SplatQuad::centered(Vec2::ZERO, 0.0, 0.0));
        assert!(build_splat_batches(&set, Vec2::ZERO, 100).is_empty());
    }
}
