use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// World units per terrain cell edge.
pub const CELL_SIZE: f32 = 128.0;

/// Layer heights are stored with this bias; layer 2 sits at world height zero.
pub const LAYER_BIAS: i32 = 2;

/// Unique identifier for a placed entity (doodad, destructible, unit, item).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for logs and overlays.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Build a transform from a map placement: rotation is a yaw around +Z.
    pub fn from_placement(position: Vec3, angle: f32, scale: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::from_rotation_z(angle),
            scale,
        }
    }

    pub fn matrix(&self) -> glam::Mat4 {
        glam::Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// 8-bit RGB vertex tint applied to a model instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tint(pub [u8; 3]);

impl Tint {
    pub const WHITE: Tint = Tint([255, 255, 255]);

    /// Scale every channel by `factor`, rounding to the nearest integer.
    pub fn darkened(self, factor: f32) -> Tint {
        let scale = |c: u8| (c as f32 * factor).round().clamp(0.0, 255.0) as u8;
        Tint([scale(self.0[0]), scale(self.0[1]), scale(self.0[2])])
    }

    pub fn to_f32(self) -> [f32; 4] {
        [
            self.0[0] as f32 / 255.0,
            self.0[1] as f32 / 255.0,
            self.0[2] as f32 / 255.0,
            1.0,
        ]
    }
}

impl Default for Tint {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Camera-bound insets, in cells, measured from each map edge.
///
/// Everything inside the insets is the playable area; the rest is cosmetic border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MapBounds {
    pub left: u32,
    pub right: u32,
    pub bottom: u32,
    pub top: u32,
}

impl MapBounds {
    /// Playable rectangle in cell coordinates: `[x0, x1) x [y0, y1)`.
    pub fn playable_cells(&self, columns: u32, rows: u32) -> (u32, u32, u32, u32) {
        let x1 = columns.saturating_sub(self.right + 1);
        let y1 = rows.saturating_sub(self.top + 1);
        (self.left, x1.max(self.left), self.bottom, y1.max(self.bottom))
    }

    /// Is the fractional cell coordinate inside the camera insets?
    ///
    /// `columns`/`rows` count corners, not cells.
    pub fn in_playable_area(&self, cell: Vec2, columns: u32, rows: u32) -> bool {
        let (x0, x1, y0, y1) = self.playable_cells(columns, rows);
        cell.x >= x0 as f32 && cell.x < x1 as f32 && cell.y >= y0 as f32 && cell.y < y1 as f32
    }

    /// Playable rectangle in world units: `[min_x, min_y, max_x, max_y]`.
    pub fn world_rect(&self, columns: u32, rows: u32, center_offset: Vec2) -> [f32; 4] {
        let (x0, x1, y0, y1) = self.playable_cells(columns, rows);
        [
            x0 as f32 * CELL_SIZE + center_offset.x,
            y0 as f32 * CELL_SIZE + center_offset.y,
            x1 as f32 * CELL_SIZE + center_offset.x,
            y1 as f32 * CELL_SIZE + center_offset.y,
        ]
    }
}
