//! CPU-side vertex building. Everything here is plain data so it can be tested
//! without a device.

use std::collections::BTreeMap;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};
use mapview_assets::MeshData;
use mapview_common::CELL_SIZE;
use mapview_scene::SplatBatch;
use mapview_terrain::ground::QUAD_INDICES;
use mapview_terrain::{GroundMesh, ShadowMap, WaterMesh, boundary_attenuation};

/// Darkest a fully shadowed ground corner gets.
const SHADOW_STRENGTH: f32 = 0.5;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct InstanceData {
    pub model_0: [f32; 4],
    pub model_1: [f32; 4],
    pub model_2: [f32; 4],
    pub model_3: [f32; 4],
    pub tint: [f32; 4],
}

impl InstanceData {
    pub fn new(matrix: Mat4, tint: [f32; 4]) -> Self {
        let cols = matrix.to_cols_array_2d();
        Self {
            model_0: cols[0],
            model_1: cols[1],
            model_2: cols[2],
            model_3: cols[3],
            tint,
        }
    }

    pub fn identity() -> Self {
        Self::new(Mat4::IDENTITY, [1.0; 4])
    }
}

/// Indexed triangles for one texture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBatch {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshBatch {
    fn push_quad(&mut self, corners: [Vertex; 4]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&corners);
        self.indices
            .extend(QUAD_INDICES.iter().map(|&i| base + u32::from(i)));
    }
}

/// UV rectangle `(origin, size)` of a tile inside a ground texture.
///
/// Ground textures are 4x4 tiles; extended ones put a second 4x4 block to the right,
/// addressed by tiles 16..32.
pub fn ground_tile_uv(tile: u8, extended: bool) -> (Vec2, Vec2) {
    let columns = if extended { 8.0 } else { 4.0 };
    let block = f32::from(tile / 16);
    let within = tile % 16;
    let column = block * 4.0 + f32::from(within % 4);
    let row = f32::from(within / 4);
    let size = Vec2::new(1.0 / columns, 0.25);
    (Vec2::new(column, row) * size, size)
}

fn shade(shadow: Option<&ShadowMap>, x: usize, y: usize, columns: usize, rows: usize) -> f32 {
    let Some(map) = shadow else {
        return 1.0;
    };
    let tx = (x * map.width / (columns - 1).max(1)).min(map.width.saturating_sub(1));
    let ty = (y * map.height / (rows - 1).max(1)).min(map.height.saturating_sub(1));
    let value = map.get(tx, ty).unwrap_or(0);
    1.0 - f32::from(value) / 255.0 * SHADOW_STRENGTH
}

/// One batch per ground slot. Each visible cell contributes one quad to every slot
/// it uses; layers are drawn in slot order so transitions blend over the base.
pub fn ground_batches(
    ground: &GroundMesh,
    extended: &[bool],
    shadow: Option<&ShadowMap>,
) -> BTreeMap<u8, MeshBatch> {
    let mut batches: BTreeMap<u8, MeshBatch> = BTreeMap::new();
    let (columns, rows) = (ground.columns, ground.rows);
    let corner = |x: usize, y: usize| {
        let h = ground.corner_heights[y * columns + x] * CELL_SIZE;
        let xy = ground.center_offset + Vec2::new(x as f32, y as f32) * CELL_SIZE;
        let s = shade(shadow, x, y, columns, rows);
        (Vec3::new(xy.x, xy.y, h), [s, s, s, 1.0])
    };

    for (index, instance) in ground.instances.iter().enumerate() {
        if !instance.is_visible() {
            continue;
        }
        let (x, y) = (index % (columns - 1), index / (columns - 1));
        let quad = [(x, y), (x + 1, y), (x, y + 1), (x + 1, y + 1)].map(|(cx, cy)| corner(cx, cy));
        for layer in 0..4 {
            let texture = instance.textures[layer];
            if texture == 0 {
                continue;
            }
            let slot = texture - 1;
            let wide = extended.get(slot as usize).copied().unwrap_or(false);
            let (origin, size) = ground_tile_uv(instance.variations[layer], wide);
            // Texture rows run top-down; quad rows run bottom-up.
            let uvs = [
                origin + Vec2::new(0.0, size.y),
                origin + size,
                origin,
                origin + Vec2::new(size.x, 0.0),
            ];
            let corners = std::array::from_fn(|i| Vertex {
                position: quad[i].0.to_array(),
                uv: uvs[i].to_array(),
                color: quad[i].1,
            });
            batches.entry(slot).or_default().push_quad(corners);
        }
    }
    batches
}

/// Water surface with per-corner colour, faded toward the playable edge. The frame
/// texture repeats once per cell.
pub fn water_batch(water: &WaterMesh) -> MeshBatch {
    let mut batch = MeshBatch::default();
    for cell in &water.cells {
        let corners = cell.corners.each_ref().map(|c| {
            let fade = boundary_attenuation(c.position.truncate(), water.bounds);
            let mut color = c.color;
            color[3] *= fade;
            Vertex {
                position: c.position.to_array(),
                uv: (c.position.truncate() / CELL_SIZE).to_array(),
                color,
            }
        });
        batch.push_quad(corners);
    }
    batch
}

/// Splat vertices lifted onto the terrain: the stored z is added to the ground height.
pub fn splat_batch(batch: &SplatBatch, color: [f32; 4], height_at: impl Fn(f32, f32) -> f32) -> MeshBatch {
    MeshBatch {
        vertices: batch
            .vertices
            .iter()
            .map(|v| {
                let [x, y, lift] = v.position;
                Vertex {
                    position: [x, y, height_at(x, y) + lift],
                    uv: v.uv,
                    color,
                }
            })
            .collect(),
        indices: batch.indices.iter().map(|&i| u32::from(i)).collect(),
    }
}

/// Model geometry; missing UVs default to the origin.
pub fn model_batch(mesh: &MeshData) -> MeshBatch {
    MeshBatch {
        vertices: mesh
            .positions
            .iter()
            .enumerate()
            .map(|(i, &position)| Vertex {
                position,
                uv: mesh.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                color: [1.0; 4],
            })
            .collect(),
        indices: mesh.indices.iter().map(|&i| u32::from(i)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapview_scene::SplatVertex;
    use mapview_terrain::GroundInstance;

    fn flat_ground(instances: Vec<GroundInstance>) -> GroundMesh {
        GroundMesh {
            columns: 3,
            rows: 2,
            center_offset: Vec2::ZERO,
            corner_heights: vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            cliff_heights: vec![0.0; 6],
            water_heights: vec![0.0; 6],
            instances,
        }
    }

    #[test]
    fn tile_uvs() {
        assert_eq!(ground_tile_uv(0, false), (Vec2::ZERO, Vec2::new(0.25, 0.25)));
        assert_eq!(ground_tile_uv(5, false).0, Vec2::new(0.25, 0.25));
        // Tile 16 starts the right-hand block of an extended texture.
        assert_eq!(ground_tile_uv(16, true).0, Vec2::new(0.5, 0.0));
        assert_eq!(ground_tile_uv(15, true).0, Vec2::new(0.375, 0.75));
    }

    #[test]
    fn ground_layers_batch_by_slot() {
        let base = GroundInstance {
            textures: [1, 2, 0, 0],
            variations: [0, 0b0011, 0, 0],
        };
        let hidden = GroundInstance::default();
        let batches = ground_batches(&flat_ground(vec![base, hidden]), &[false, false], None);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[&0].vertices.len(), 4);
        assert_eq!(batches[&1].indices.len(), 6);
        // Top corners sit one layer up.
        assert_eq!(batches[&0].vertices[2].position, [0.0, 128.0, 128.0]);
    }

    #[test]
    fn shadow_darkens_ground() {
        let base = GroundInstance {
            textures: [1, 0, 0, 0],
            variations: [0; 4],
        };
        let shadow = ShadowMap {
            width: 8,
            height: 4,
            data: vec![255; 32],
        };
        let batches = ground_batches(&flat_ground(vec![base]), &[false], Some(&shadow));
        assert_eq!(batches[&0].vertices[0].color[0], 0.5);
    }

    #[test]
    fn splats_follow_terrain() {
        let batch = SplatBatch {
            vertices: vec![SplatVertex {
                position: [10.0, 20.0, 3.0],
                uv: [0.0, 1.0],
            }],
            indices: vec![0, 0, 0],
        };
        let mesh = splat_batch(&batch, [1.0, 1.0, 1.0, 0.5], |x, _| x);
        assert_eq!(mesh.vertices[0].position, [10.0, 20.0, 13.0]);
        assert_eq!(mesh.vertices[0].color[3], 0.5);
        assert_eq!(mesh.indices, vec![0, 0, 0]);
    }

    #[test]
    fn instance_layout_is_column_major() {
        let data = InstanceData::new(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)), [1.0; 4]);
        assert_eq!(data.model_3, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(std::mem::size_of::<InstanceData>(), 80);
    }
}
