use std::collections::BTreeMap;

use glam::{Vec2, Vec3};
use mapview_common::{EntityId, OrbitCamera, Ray};

use crate::splat::{SplatBatch, SplatQuad, SplatSet, build_splat_batches};

/// Selection circles are drawn in this colour.
pub const SELECTION_GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
/// Pick volumes are this many radii tall.
const PICK_ELONGATION: f32 = 1.5;
/// Circles float this far above the declared selection height.
const CIRCLE_LIFT: f32 = 5.0;

/// What picking needs to know about a selectable entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selectable {
    pub id: EntityId,
    /// Model position, including any move height.
    pub position: Vec3,
    pub radius: f32,
    /// Declared selection height above the terrain.
    pub height: f32,
}

pub fn selection_circle_texture(radius: f32) -> &'static str {
    if radius < 100.0 {
        "ReplaceableTextures\\Selection\\SelectionCircleSmall.blp"
    } else if radius < 300.0 {
        "ReplaceableTextures\\Selection\\SelectionCircleMed.blp"
    } else {
        "ReplaceableTextures\\Selection\\SelectionCircleLarge.blp"
    }
}

/// Nearest unit whose pick ellipsoid the ray passes through.
///
/// Each unit is an axis-aligned ellipsoid of radii `(r, r, 1.5r)` centred half a
/// radius above its position. The test runs in ellipsoid-normalized space: the ray
/// hits when its closest approach to the centre is within unit distance.
pub fn pick_unit(ray: &Ray, units: &[Selectable]) -> Option<EntityId> {
    let mut best: Option<(EntityId, f32)> = None;
    for unit in units.iter().filter(|u| u.radius > 0.0) {
        let r = unit.radius;
        let size = Vec3::new(r, r, r * PICK_ELONGATION);
        let center = (unit.position + Vec3::Z * (r / 2.0) - ray.origin) / size;
        let dir = ray.direction / size;
        let along = dir.dot(center).max(0.0) / dir.length_squared();
        if best.is_some_and(|(_, t)| along > t) {
            continue;
        }
        if (dir * along).distance_squared(center) < 1.0 {
            best = Some((unit.id, along));
        }
    }
    best.map(|(id, _)| id)
}

/// Units whose selection point projects inside the screen rectangle spanned by `a`
/// and `b` (pixels, any corner order).
pub fn box_select(
    camera: &OrbitCamera,
    a: Vec2,
    b: Vec2,
    units: &[Selectable],
    height_at: impl Fn(f32, f32) -> f32,
) -> Vec<EntityId> {
    let (min, max) = (a.min(b), a.max(b));
    units
        .iter()
        .filter(|u| {
            let p = u.position;
            let point = Vec3::new(p.x, p.y, u.height + height_at(p.x, p.y));
            camera
                .world_to_screen(point)
                .is_some_and(|s| s.x >= min.x && s.x < max.x && s.y >= min.y && s.y < max.y)
        })
        .map(|u| u.id)
        .collect()
}

/// The current selection and its circle decals.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    selected: Vec<EntityId>,
    circles: BTreeMap<&'static str, SplatSet>,
    generation: u64,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection. Units without a selection radius are left out.
    pub fn select<'a>(&mut self, units: impl IntoIterator<Item = &'a Selectable>) {
        self.deselect();
        for unit in units.into_iter().filter(|u| u.radius > 0.0) {
            let texture = selection_circle_texture(unit.radius);
            self.circles
                .entry(texture)
                .or_insert_with(|| SplatSet::new(texture, SELECTION_GREEN))
                .quads
                .push(SplatQuad::centered(
                    unit.position.truncate(),
                    unit.radius,
                    unit.height + CIRCLE_LIFT,
                ));
            self.selected.push(unit.id);
        }
        tracing::debug!(count = self.selected.len(), "selection changed");
    }

    /// Drop the selection and its circles.
    pub fn deselect(&mut self) {
        self.selected.clear();
        self.circles.clear();
        self.generation += 1;
    }

    /// The selection after toggling `id` in or out of it.
    pub fn toggled(&self, id: EntityId) -> Vec<EntityId> {
        let mut ids = self.selected.clone();
        match ids.iter().position(|&s| s == id) {
            Some(at) => {
                ids.remove(at);
            }
            None => ids.push(id),
        }
        ids
    }

    pub fn selected(&self) -> &[EntityId] {
        &self.selected
    }

    pub fn is_selected(&self, id: EntityId) -> bool {
        self.selected.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Bumped on every change so GPU copies can tell they are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn circles(&self) -> impl Iterator<Item = &SplatSet> {
        self.circles.values()
    }

    /// Circle decals as batches, one entry per circle texture.
    pub fn batches(&self, center_offset: Vec2, ceiling: usize) -> Vec<(&SplatSet, Vec<SplatBatch>)> {
        self.circles
            .values()
            .map(|set| (set, build_splat_batches(set, center_offset, ceiling)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(x: f32, y: f32, radius: f32) -> Selectable {
        Selectable {
            id: EntityId::new(),
            position: Vec3::new(x, y, 0.0),
            radius,
            height: 0.0,
        }
    }

    fn down_at(x: f32, y: f32) -> Ray {
        Ray::new(Vec3::new(x, y, 1000.0), Vec3::NEG_Z)
    }

    #[test]
    fn circle_size_classes() {
        assert!(selection_circle_texture(54.0).ends_with("Small.blp"));
        assert!(selection_circle_texture(100.0).ends_with("Med.blp"));
        assert!(selection_circle_texture(299.0).ends_with("Med.blp"));
        assert!(selection_circle_texture(300.0).ends_with("Large.blp"));
    }

    #[test]
    fn ray_through_unit_hits() {
        let units = [unit(0.0, 0.0, 36.0), unit(500.0, 0.0, 36.0)];
        assert_eq!(pick_unit(&down_at(10.0, 10.0), &units), Some(units[0].id));
        assert_eq!(pick_unit(&down_at(500.0, 30.0), &units), Some(units[1].id));
        assert_eq!(pick_unit(&down_at(250.0, 0.0), &units), None);
    }

    #[test]
    fn zero_radius_is_never_picked() {
        let units = [unit(0.0, 0.0, 0.0)];
        assert_eq!(pick_unit(&down_at(0.0, 0.0), &units), None);
    }

    #[test]
    fn nearest_along_ray_wins() {
        let mut low = unit(0.0, 0.0, 36.0);
        let mut high = unit(0.0, 0.0, 36.0);
        high.position.z = 200.0;
        low.position.z = 0.0;
        assert_eq!(pick_unit(&down_at(0.0, 0.0), &[low, high]), Some(high.id));
        let sideways = Ray::new(Vec3::new(-1000.0, 0.0, 18.0), Vec3::X);
        assert_eq!(pick_unit(&sideways, &[low, high]), Some(low.id));
    }

    #[test]
    fn select_builds_circles_and_skips_unselectable() {
        let units = [unit(0.0, 0.0, 54.0), unit(10.0, 0.0, 0.0), unit(20.0, 0.0, 400.0)];
        let mut sel = Selection::new();
        sel.select(&units);
        assert_eq!(sel.selected(), &[units[0].id, units[2].id]);
        assert_eq!(sel.circles().count(), 2);
        let small = sel.circles().find(|s| s.texture.ends_with("Small.blp")).unwrap();
        assert_eq!(small.color, SELECTION_GREEN);
        assert_eq!(small.quads[0].lift, 5.0);
        assert_eq!(small.quads[0].min, Vec2::new(-54.0, -54.0));
        let batches = sel.batches(Vec2::ZERO, 65_000);
        assert!(batches.iter().all(|(_, b)| !b.is_empty()));
    }

    #[test]
    fn deselect_removes_circles() {
        let units = [unit(0.0, 0.0, 54.0)];
        let mut sel = Selection::new();
        sel.select(&units);
        let before = sel.generation();
        sel.deselect();
        assert!(sel.is_empty());
        assert_eq!(sel.circles().count(), 0);
        assert!(sel.generation() > before);
    }

    #[test]
    fn toggling() {
        let units = [unit(0.0, 0.0, 54.0), unit(100.0, 0.0, 54.0)];
        let mut sel = Selection::new();
        sel.select(&units[..1]);
        assert_eq!(sel.toggled(units[1].id), vec![units[0].id, units[1].id]);
        assert!(sel.toggled(units[0].id).is_empty());
    }

    #[test]
    fn box_select_uses_projection() {
        let camera = OrbitCamera::default();
        let units = [unit(0.0, 0.0, 36.0), unit(50_000.0, 0.0, 36.0)];
        let center = camera.world_to_screen(Vec3::ZERO).unwrap();
        let hits = box_select(
            &camera,
            center - Vec2::splat(5.0),
            center + Vec2::splat(5.0),
            &units,
            |_, _| 0.0,
        );
        assert_eq!(hits, vec![units[0].id]);
        let none = box_select(&camera, Vec2::ZERO, Vec2::new(2.0, 2.0), &units, |_, _| 0.0);
        assert!(none.is_empty());
    }
}
