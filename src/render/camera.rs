use eframe::egui::{Pos2, Rect, Vec2, pos2};
use glam::{Mat4, Vec3, Vec4Swizzles};

const FOV_Y: f32 = 50.0 * std::f32::consts::PI / 180.0;
const NEAR: f32 = 1.0;
const FAR: f32 = 5000.0;
const MIN_DISTANCE: f32 = 40.0;
const MAX_DISTANCE: f32 = 2000.0;
const PITCH_LIMIT: f32 = 1.45;
const ORBIT_SPEED: f32 = 0.008;

/// Perspective camera orbiting `target`. Flat layouts keep yaw and pitch at
/// zero so the camera looks straight down the z axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    orbit_enabled: bool,
}

impl OrbitCamera {
    pub fn new(is_3d: bool) -> Self {
        Self {
            target: Vec3::ZERO,
            yaw: 0.0,
            pitch: if is_3d { 0.3 } else { 0.0 },
            distance: 400.0,
            orbit_enabled: is_3d,
        }
    }

    pub fn eye(&self) -> Vec3 {
        let offset = Vec3::new(
            self.distance * self.pitch.cos() * self.yaw.sin(),
            self.distance * self.pitch.sin(),
            self.distance * self.pitch.cos() * self.yaw.cos(),
        );
        self.target + offset
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye()).normalize_or(Vec3::NEG_Z)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        let proj = Mat4::perspective_rh_gl(FOV_Y, aspect, NEAR, FAR);
        let view = Mat4::look_at_rh(self.eye(), self.target, Vec3::Y);
        proj * view
    }

    pub fn orbit(&mut self, drag: Vec2) {
        if !self.orbit_enabled {
            return;
        }
        self.yaw -= drag.x * ORBIT_SPEED;
        self.pitch = (self.pitch + drag.y * ORBIT_SPEED).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Moves the target so the scene follows a screen-space drag.
    pub fn pan(&mut self, rect: Rect, drag: Vec2) {
        if rect.height() <= 0.0 {
            return;
        }
        let units_per_pixel = 1.0 / self.pixels_per_unit_at_distance(rect, self.distance);
        let forward = self.forward();
        let right = forward.cross(Vec3::Y).normalize_or(Vec3::X);
        let up = right.cross(forward);
        self.target += (-right * drag.x + up * drag.y) * units_per_pixel;
    }

    pub fn zoom(&mut self, scroll: f32) {
        let factor = (1.0 - scroll * 0.0018).clamp(0.85, 1.15);
        self.distance = (self.distance * factor).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Screen position of `world` and its pixels-per-world-unit scale there.
    pub fn project(&self, rect: Rect, world: Vec3) -> Option<(Pos2, f32)> {
        let clip = self.view_proj(rect.aspect_ratio()) * world.extend(1.0);
        if clip.w <= NEAR * 0.5 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        let screen = pos2(
            rect.left() + (ndc.x + 1.0) * 0.5 * rect.width(),
            rect.top() + (1.0 - ndc.y) * 0.5 * rect.height(),
        );
        Some((screen, self.pixels_per_unit_at_distance(rect, clip.w)))
    }

    /// Intersects the pointer ray with the camera-facing plane through
    /// `anchor`; used to drag nodes parallel to the screen.
    pub fn unproject_on_plane(&self, rect: Rect, screen: Pos2, anchor: Vec3) -> Option<Vec3> {
        let inverse = self.view_proj(rect.aspect_ratio()).inverse();
        let ndc_x = (screen.x - rect.left()) / rect.width() * 2.0 - 1.0;
        let ndc_y = 1.0 - (screen.y - rect.top()) / rect.height() * 2.0;

        let origin = self.eye();
        let far = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
        let direction = (far - origin).normalize_or_zero();

        let normal = self.forward();
        let denominator = direction.dot(normal);
        if denominator.abs() <= f32::EPSILON {
            return None;
        }
        let t = (anchor - origin).dot(normal) / denominator;
        let hit = origin + direction * t;
        hit.is_finite().then_some(hit)
    }

    fn pixels_per_unit_at_distance(&self, rect: Rect, depth: f32) -> f32 {
        let focal = rect.height() * 0.5 / (FOV_Y * 0.5).tan();
        focal / depth.max(NEAR)
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    fn viewport() -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0))
    }

    #[test]
    fn target_projects_to_the_center() {
        let camera = OrbitCamera::new(true);
        let (screen, scale) = camera.project(viewport(), Vec3::ZERO).unwrap();
        assert!((screen.x - 400.0).abs() < 0.01);
        assert!((screen.y - 300.0).abs() < 0.01);
        assert!(scale > 0.0);
    }

    #[test]
    fn unproject_inverts_project_on_the_anchor_plane() {
        let mut camera = OrbitCamera::new(true);
        camera.orbit(vec2(40.0, -25.0));
        let rect = viewport();
        let anchor = Vec3::new(20.0, -15.0, 10.0);

        let (screen, _) = camera.project(rect, anchor).unwrap();
        let back = camera.unproject_on_plane(rect, screen, anchor).unwrap();
        assert!(back.distance(anchor) < 0.5, "{back:?}");
    }

    #[test]
    fn flat_camera_ignores_orbit() {
        let mut camera = OrbitCamera::new(false);
        camera.orbit(vec2(100.0, 100.0));
        assert_eq!(camera.yaw, 0.0);
        assert_eq!(camera.pitch, 0.0);
        assert!(camera.eye().x.abs() < 1e-3 && camera.eye().y.abs() < 1e-3);
    }

    #[test]
    fn zoom_and_pitch_are_clamped() {
        let mut camera = OrbitCamera::new(true);
        for _ in 0..200 {
            camera.zoom(500.0);
            camera.orbit(vec2(0.0, 500.0));
        }
        assert!(camera.distance >= MIN_DISTANCE);
        assert!(camera.pitch <= PITCH_LIMIT);
    }

    #[test]
    fn pan_moves_the_target_against_the_drag() {
        let mut camera = OrbitCamera::new(false);
        camera.pan(viewport(), vec2(50.0, 0.0));
        assert!(camera.target.x < 0.0);
        let (screen, _) = camera.project(viewport(), Vec3::ZERO).unwrap();
        assert!((screen.x - 450.0).abs() < 0.5);
    }

    #[test]
    fn pan_on_a_collapsed_viewport_keeps_the_target_finite() {
        let mut camera = OrbitCamera::new(false);
        let collapsed = Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 0.0));
        camera.pan(collapsed, vec2(30.0, 12.0));
        assert_eq!(camera.target, Vec3::ZERO);
    }
}
