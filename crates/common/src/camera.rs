use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

/// A world-space ray with a unit-length direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Orbit camera looking at a ground point, Z-up.
///
/// `yaw` turns around +Z, `pitch` is the elevation above the ground plane.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub center: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Viewport size in pixels.
    pub viewport: Vec2,
    pub sensitivity: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            yaw: -std::f32::consts::FRAC_PI_2,
            pitch: 60.0_f32.to_radians(),
            distance: 2000.0,
            min_distance: 8.0,
            max_distance: 3000.0,
            fov: std::f32::consts::FRAC_PI_4,
            near: 8.0,
            far: 200_000.0,
            viewport: Vec2::new(1280.0, 720.0),
            sensitivity: 0.005,
        }
    }
}

impl OrbitCamera {
    pub fn aspect(&self) -> f32 {
        if self.viewport.y <= 0.0 {
            1.0
        } else {
            self.viewport.x / self.viewport.y
        }
    }

    pub fn position(&self) -> Vec3 {
        let horizontal = self.distance * self.pitch.cos();
        self.center
            + Vec3::new(
                horizontal * self.yaw.cos(),
                horizontal * self.yaw.sin(),
                self.distance * self.pitch.sin(),
            )
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.center, Vec3::Z)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect(), self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Orbit by a pixel delta.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * self.sensitivity;
        self.pitch += dy * self.sensitivity;
        self.pitch = self
            .pitch
            .clamp(5.0_f32.to_radians(), 89.0_f32.to_radians());
    }

    /// Slide the look-at point in the ground plane by a pixel delta, scaled by distance.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let scale = self.distance / self.viewport.y.max(1.0);
        let forward = Vec3::new(-self.yaw.cos(), -self.yaw.sin(), 0.0);
        let right = Vec3::new(-self.yaw.sin(), self.yaw.cos(), 0.0);
        self.center += (-right * dx + forward * dy) * scale;
    }

    /// One wheel notch: positive steps zoom out by 1.2x, negative steps zoom in.
    pub fn zoom(&mut self, steps: f32) {
        self.distance = (self.distance * 1.2_f32.powf(steps))
            .clamp(self.min_distance, self.max_distance);
    }

    /// Ray through the pixel at `screen` (origin top-left).
    pub fn screen_ray(&self, screen: Vec2) -> Ray {
        let ndc = Vec2::new(
            screen.x / self.viewport.x.max(1.0) * 2.0 - 1.0,
            1.0 - screen.y / self.viewport.y.max(1.0) * 2.0,
        );
        let inverse = self.view_projection().inverse();
        let near = inverse * ndc.extend(0.0).extend(1.0);
        let far = inverse * ndc.extend(0.5).extend(1.0);
        let near = near.xyz() / near.w;
        let far = far.xyz() / far.w;
        Ray::new(near, far - near)
    }

    /// Project a world point to pixels; `None` when behind the camera.
    pub fn world_to_screen(&self, point: Vec3) -> Option<Vec2> {
        let clip = self.view_projection() * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.viewport.x,
            (1.0 - ndc.y) * 0.5 * self.viewport.y,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_sits_above_center() {
        let cam = OrbitCamera::default();
        assert!(cam.position().z > cam.center.z);
        let vp = cam.view_projection();
        assert!(!vp.col(0).x.is_nan());
    }

    #[test]
    fn zoom_is_clamped() {
        let mut cam = OrbitCamera::default();
        for _ in 0..100 {
            cam.zoom(1.0);
        }
        assert_eq!(cam.distance, cam.max_distance);
        for _ in 0..200 {
            cam.zoom(-1.0);
        }
        assert_eq!(cam.distance, cam.min_distance);
    }

    #[test]
    fn center_pixel_ray_hits_center() {
        let cam = OrbitCamera {
            center: Vec3::new(100.0, 50.0, 0.0),
            ..OrbitCamera::default()
        };
        let ray = cam.screen_ray(cam.viewport * 0.5);
        let t = -ray.origin.z / ray.direction.z;
        let hit = ray.at(t);
        assert!((hit - cam.center).length() < 1.0, "hit {hit:?}");
    }

    #[test]
    fn projection_round_trips_center() {
        let cam = OrbitCamera::default();
        let screen = cam.world_to_screen(cam.center).expect("center is visible");
        assert!((screen - cam.viewport * 0.5).length() < 0.5);
    }

    #[test]
    fn pan_moves_only_in_ground_plane() {
        let mut cam = OrbitCamera::default();
        cam.pan(10.0, -20.0);
        assert_ne!(cam.center, Vec3::ZERO);
        assert_eq!(cam.center.z, 0.0);
    }
}
