//! The loaded model and its per-object GPU state.

use std::f32::consts::PI;

use glam::{Mat4, Quat, Vec3};
use serde::Deserialize;

use crate::geometry::ModelData;
use crate::gpu::GpuContext;
use crate::material::{Material, MaterialDesc};
use crate::mesh::{Mesh, Transform, normal_matrix};
use crate::texture::{ColorSpace, Texture};
use crate::ui::{ControlPanel, Folder, Tweak};

/// Placement of the model in the world.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    pub scale: f32,
    pub position: [f32; 3],
    /// Turns about Y, in half revolutions (`0..=2`).
    pub rotate_model: f32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            scale: 10.0,
            position: [0.0, -1.0, 0.0],
            rotate_model: 0.0,
        }
    }
}

impl ModelParams {
    pub fn transform(&self) -> Transform {
        Transform::new()
            .position(Vec3::from(self.position))
            .rotation(Quat::from_rotation_y(PI * self.rotate_model))
            .uniform_scale(self.scale)
    }
}

impl Tweak for ModelParams {
    fn folder(&self) -> Folder {
        Folder::RealisticRendering
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        panel.slider("rotate model", &mut self.rotate_model, 0.0..=2.0, 0.01)
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
    receive_shadow: f32,
    _pad: [f32; 3],
}

impl ObjectUniform {
    fn new(model: Mat4, receive_shadow: bool) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal: normal_matrix(model).to_cols_array_2d(),
            receive_shadow: if receive_shadow { 1.0 } else { 0.0 },
            _pad: [0.0; 3],
        }
    }
}

/// One drawable: a mesh, its material and its transform buffer.
#[derive(Debug)]
pub struct SceneObject {
    pub name: String,
    pub mesh: Mesh,
    pub material: Material,
    pub casts_shadow: bool,
    pub receives_shadow: bool,
    buffer: wgpu::Buffer,
    pub(crate) bind_group: wgpu::BindGroup,
}

/// Every object in the world plus the layouts the passes draw them with.
pub struct Scene {
    pub params: ModelParams,
    objects: Vec<SceneObject>,
    textures: Vec<Texture>,
    white: Texture,
    object_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
}

impl Scene {
    pub fn new(gpu: &GpuContext, params: ModelParams) -> Self {
        let object_layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Object Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        Self {
            params,
            objects: Vec::new(),
            textures: Vec::new(),
            white: Texture::white(gpu),
            object_layout,
            material_layout: Material::bind_group_layout(&gpu.device),
        }
    }

    pub fn object_layout(&self) -> &wgpu::BindGroupLayout {
        &self.object_layout
    }

    pub fn material_layout(&self) -> &wgpu::BindGroupLayout {
        &self.material_layout
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Upload a decoded model. Every primitive becomes one object.
    pub fn add_model(&mut self, gpu: &GpuContext, model: ModelData, env_intensity: f32) {
        let first_texture = self.textures.len();
        for (i, image) in model.images.iter().enumerate() {
            self.textures.push(Texture::from_image(
                gpu,
                image,
                ColorSpace::Srgb,
                &format!("Model Texture {i}"),
            ));
        }

        let matrix = self.params.transform().matrix();
        for primitive in model.primitives {
            let desc = primitive.material;
            let follows = desc.follows_env_intensity();
            let material = self.build_material(gpu, desc, first_texture, env_intensity);
            let uniform = ObjectUniform::new(matrix, follows);
            let (buffer, bind_group) = self.object_buffer(gpu, &uniform);
            self.objects.push(SceneObject {
                name: primitive.name,
                mesh: primitive.geometry.upload(gpu),
                material,
                casts_shadow: follows,
                receives_shadow: follows,
                buffer,
                bind_group,
            });
        }
        log::debug!("scene holds {} objects", self.objects.len());
    }

    fn build_material(
        &self,
        gpu: &GpuContext,
        desc: MaterialDesc,
        first_texture: usize,
        env_intensity: f32,
    ) -> Material {
        let lookup = |slot: Option<usize>| {
            slot.and_then(|i| self.textures.get(first_texture + i))
                .unwrap_or(&self.white)
        };
        let base = lookup(desc.base_color_texture);
        let emissive = lookup(desc.emissive_texture);
        Material::new(gpu, &self.material_layout, desc, base, emissive, env_intensity)
    }

    fn object_buffer(
        &self,
        gpu: &GpuContext,
        uniform: &ObjectUniform,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        use wgpu::util::DeviceExt;

        let buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Object Uniforms"),
                contents: bytemuck::bytes_of(uniform),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object Bind Group"),
            layout: &self.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        (buffer, bind_group)
    }

    /// Push the environment intensity to every lit, environment-receiving
    /// material. Returns how many were touched.
    pub fn set_env_intensity(&mut self, gpu: &GpuContext, value: f32) -> usize {
        let mut touched = 0;
        for object in &mut self.objects {
            if object.material.desc.follows_env_intensity() {
                object.material.set_env_intensity(gpu, value);
                touched += 1;
            }
        }
        touched
    }

    /// Rewrite object transforms from the current params.
    pub fn update(&self, gpu: &GpuContext) {
        let matrix = self.params.transform().matrix();
        for object in &self.objects {
            let uniform = ObjectUniform::new(matrix, object.receives_shadow);
            gpu.queue
                .write_buffer(&object.buffer, 0, bytemuck::bytes_of(&uniform));
        }
    }
}

impl Tweak for Scene {
    fn folder(&self) -> Folder {
        self.params.folder()
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        self.params.tweak(panel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::PanelInput;
    use glam::Vec2;

    #[test]
    fn default_transform_places_model_below_origin() {
        let m = ModelParams::default().transform().matrix();
        let origin = m.transform_point3(Vec3::ZERO);
        assert_eq!(origin, Vec3::new(0.0, -1.0, 0.0));
        let unit = m.transform_vector3(Vec3::X);
        assert!((unit.length() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn rotate_model_is_in_half_turns() {
        let params = ModelParams {
            rotate_model: 0.5,
            ..ModelParams::default()
        };
        let x = params.transform().rotation * Vec3::X;
        assert!(x.distance(Vec3::NEG_Z) < 1e-5);
    }

    #[test]
    fn object_uniform_is_aligned() {
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 144);
    }

    #[test]
    fn hidden_panel_leaves_params_alone() {
        let mut panel = ControlPanel::new("Tweak It", 340.0);
        panel.set_visible(false);
        panel.begin(PanelInput::default(), Vec2::new(1280.0, 720.0));
        let mut params = ModelParams::default();
        assert!(!params.tweak(&mut panel));
        panel.end();
        assert_eq!(params, ModelParams::default());
    }
}
