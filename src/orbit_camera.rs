use glam::Vec3;
use winit::event::MouseButton;

use crate::camera::Camera;
use crate::input::Input;

const MIN_ELEVATION: f32 = -std::f32::consts::FRAC_PI_2 + 0.01;
const MAX_ELEVATION: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// A damped camera controller that orbits around a target point.
///
/// Dragging and scrolling add to an angular and zoom velocity instead of
/// moving the camera directly. Each update applies `damping` of the
/// remaining velocity and decays it by the same factor, so the camera keeps
/// gliding briefly after the pointer stops.
///
/// # Example
/// ```ignore
/// let mut orbit = OrbitCamera::from_camera(&camera);
///
/// // In frame loop:
/// orbit.update(&input);
/// orbit.apply(&mut camera);
/// ```
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    /// Horizontal angle in radians.
    pub azimuth: f32,
    /// Vertical angle in radians, clamped short of the poles.
    pub elevation: f32,
    /// Fraction of the pending motion applied per update.
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    azimuth_velocity: f32,
    elevation_velocity: f32,
    zoom_velocity: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 5.0,
            azimuth: 0.0,
            elevation: 0.0,
            damping: 0.05,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            min_distance: 0.5,
            max_distance: 50.0,
            azimuth_velocity: 0.0,
            elevation_velocity: 0.0,
            zoom_velocity: 0.0,
        }
    }
}

impl OrbitCamera {
    /// Start orbiting from wherever the camera currently is.
    pub fn from_camera(camera: &Camera) -> Self {
        let offset = camera.position - camera.target;
        let distance = offset.length().max(1e-3);
        Self {
            target: camera.target,
            distance,
            azimuth: offset.x.atan2(offset.z),
            elevation: (offset.y / distance).clamp(-1.0, 1.0).asin(),
            ..Self::default()
        }
    }

    pub fn damping(mut self, damping: f32) -> Self {
        self.damping = damping.clamp(0.0, 1.0);
        self
    }

    /// Feed this frame's pointer motion in.
    ///
    /// Pass `capture = false` while another widget owns the pointer.
    pub fn handle_input(&mut self, input: &Input, capture: bool) {
        if !capture {
            return;
        }
        if input.mouse_down(MouseButton::Left) {
            let delta = input.mouse_delta();
            self.azimuth_velocity -= delta.x * self.rotate_speed;
            self.elevation_velocity += delta.y * self.rotate_speed;
        }
        let scroll = input.scroll_delta();
        if scroll.y.abs() > 0.0 {
            self.zoom_velocity -= scroll.y * self.zoom_speed;
        }
    }

    /// Apply one damping step.
    pub fn update(&mut self) {
        let d = self.damping;
        self.azimuth += self.azimuth_velocity * d;
        self.elevation =
            (self.elevation + self.elevation_velocity * d).clamp(MIN_ELEVATION, MAX_ELEVATION);
        self.distance = (self.distance * (1.0 + self.zoom_velocity * d))
            .clamp(self.min_distance, self.max_distance);

        let decay = 1.0 - d;
        self.azimuth_velocity *= decay;
        self.elevation_velocity *= decay;
        self.zoom_velocity *= decay;
    }

    pub fn is_moving(&self) -> bool {
        self.azimuth_velocity.abs() > 1e-5
            || self.elevation_velocity.abs() > 1e-5
            || self.zoom_velocity.abs() > 1e-5
    }

    pub fn position(&self) -> Vec3 {
        let offset = Vec3::new(
            self.distance * self.elevation.cos() * self.azimuth.sin(),
            self.distance * self.elevation.sin(),
            self.distance * self.elevation.cos() * self.azimuth.cos(),
        );
        self.target + offset
    }

    /// Write position and target into `camera`, keeping its lens settings.
    pub fn apply(&self, camera: &mut Camera) {
        camera.position = self.position();
        camera.target = self.target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_camera_round_trips_position() {
        let camera = Camera::default();
        let orbit = OrbitCamera::from_camera(&camera);
        assert!(orbit.position().distance(camera.position) < 1e-4);
    }

    #[test]
    fn velocity_decays_instead_of_stopping() {
        let mut orbit = OrbitCamera::from_camera(&Camera::default());
        orbit.azimuth_velocity = 1.0;
        let start = orbit.azimuth;

        orbit.update();
        let first = orbit.azimuth - start;
        assert!((first - 0.05).abs() < 1e-6);

        orbit.update();
        let second = orbit.azimuth - start - first;
        assert!(second > 0.0 && second < first);
        assert!(orbit.is_moving());

        for _ in 0..1000 {
            orbit.update();
        }
        assert!(!orbit.is_moving());
    }

    #[test]
    fn elevation_never_reaches_the_pole() {
        let mut orbit = OrbitCamera::default();
        orbit.elevation_velocity = 1000.0;
        orbit.update();
        assert!(orbit.elevation <= MAX_ELEVATION);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut orbit = OrbitCamera::default();
        orbit.zoom_velocity = 10_000.0;
        orbit.update();
        assert_eq!(orbit.distance, orbit.max_distance);
    }

    #[test]
    fn apply_keeps_lens() {
        let mut camera = Camera::default().with_fov(40.0);
        let mut orbit = OrbitCamera::from_camera(&camera);
        orbit.azimuth += 0.5;
        orbit.apply(&mut camera);
        assert!((camera.fov.to_degrees() - 40.0).abs() < 1e-4);
        assert_eq!(camera.target, Vec3::ZERO);
    }
}
