//! The scene's single directional light and its shadow camera.

use glam::{Mat4, Vec3};
use serde::Deserialize;

use crate::ui::{ControlPanel, Folder, Tweak};

/// A shadow-casting directional light.
///
/// Light travels from `position` toward `target`. The shadow camera is an
/// orthographic box looking down that line, `shadow_extent` wide on each
/// side of the axis.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LightParams {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub cast_shadow: bool,
    pub shadow_near: f32,
    pub shadow_far: f32,
    pub shadow_extent: f32,
    pub shadow_map_size: u32,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            position: [-4.0, 6.5, 2.5],
            target: [0.0, 2.0, 0.0],
            cast_shadow: true,
            shadow_near: 0.5,
            shadow_far: 15.0,
            shadow_extent: 5.0,
            shadow_map_size: 1024,
        }
    }
}

const MIN_DEPTH_RANGE: f32 = 0.01;

impl LightParams {
    /// Unit vector pointing from the lit surface toward the light.
    pub fn to_light(&self) -> Vec3 {
        (Vec3::from(self.position) - Vec3::from(self.target)).normalize_or(Vec3::Y)
    }

    /// Far plane, kept strictly beyond the near plane.
    pub fn effective_far(&self) -> f32 {
        self.shadow_far.max(self.shadow_near + MIN_DEPTH_RANGE)
    }

    pub fn view_matrix(&self) -> Mat4 {
        let eye = Vec3::from(self.position);
        let forward = -self.to_light();
        // look_at degenerates when looking straight along the up axis
        let up = if forward.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        // position == target falls back to a straight-down light
        Mat4::look_to_rh(eye, forward, up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        let e = self.shadow_extent;
        Mat4::orthographic_rh(-e, e, -e, e, self.shadow_near, self.effective_far())
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Colour premultiplied by intensity.
    pub fn radiance(&self) -> Vec3 {
        Vec3::from(self.color) * self.intensity
    }
}

impl Tweak for LightParams {
    fn folder(&self) -> Folder {
        Folder::RealisticRendering
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        let mut changed = panel.checkbox("castShadow", &mut self.cast_shadow);
        changed |= panel.slider(
            "directLightIntensity",
            &mut self.intensity,
            0.0..=10.0,
            0.001,
        );
        for (label, value) in ["directLighX", "directLighY", "directLighZ"]
            .into_iter()
            .zip(self.position.iter_mut())
        {
            changed |= panel.slider(label, value, -10.0..=10.0, 0.001);
        }
        for (label, value) in [
            "directLighTargetPositionX",
            "directLighTargetPositionY",
            "directLighTargetPositionZ",
        ]
        .into_iter()
        .zip(self.target.iter_mut())
        {
            changed |= panel.slider(label, value, -10.0..=10.0, 0.001);
        }
        changed |= panel.slider(
            "directLighShadowCameraFar",
            &mut self.shadow_far,
            -10.0..=20.0,
            0.001,
        );
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_ndc(m: Mat4, p: Vec3) -> Vec3 {
        let clip = m * p.extend(1.0);
        clip.truncate() / clip.w
    }

    #[test]
    fn target_lands_in_shadow_map_center() {
        let light = LightParams::default();
        let ndc = to_ndc(light.view_projection(), Vec3::from(light.target));
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn points_past_far_plane_are_clipped() {
        let light = LightParams::default();
        let beyond = Vec3::from(light.position) - light.to_light() * (light.shadow_far + 1.0);
        assert!(to_ndc(light.view_projection(), beyond).z > 1.0);
    }

    #[test]
    fn negative_far_is_kept_beyond_near() {
        let light = LightParams {
            shadow_far: -10.0,
            ..LightParams::default()
        };
        assert!(light.effective_far() > light.shadow_near);
        assert!(light.projection_matrix().is_finite());
    }

    #[test]
    fn straight_down_light_still_has_a_view() {
        let light = LightParams {
            position: [0.0, 10.0, 0.0],
            target: [0.0, 0.0, 0.0],
            ..LightParams::default()
        };
        assert!(light.view_matrix().is_finite());
    }

    #[test]
    fn to_light_points_at_the_light() {
        let light = LightParams::default();
        let expected = (Vec3::new(-4.0, 6.5, 2.5) - Vec3::new(0.0, 2.0, 0.0)).normalize();
        assert!(light.to_light().distance(expected) < 1e-6);
    }

    #[test]
    fn light_on_its_target_stays_finite() {
        let light = LightParams {
            position: [1.0, 2.0, 3.0],
            target: [1.0, 2.0, 3.0],
            ..LightParams::default()
        };
        assert_eq!(light.to_light(), Vec3::Y);
        assert!(light.view_projection().is_finite());
    }
}
