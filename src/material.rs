//! Surface materials and the tags that decide how the scene treats them.

use crate::gpu::GpuContext;
use crate::texture::Texture;

/// What kind of surface an object is, fixed when the object is created.
///
/// Lighting updates dispatch on this tag instead of inspecting the material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MaterialClass {
    /// Lit PBR surface. Casts and receives shadows.
    #[default]
    Standard,
    /// Emits its base colour, ignores lights.
    Unlit,
    /// Screen-space overlay, never lit and never shadowed.
    Overlay,
}

impl MaterialClass {
    pub fn is_lit(self) -> bool {
        self == MaterialClass::Standard
    }
}

/// Material parameters as imported, before any GPU resources exist.
///
/// Texture slots index into [`ModelData::images`](crate::geometry::ModelData).
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDesc {
    pub class: MaterialClass,
    pub receives_environment: bool,
    pub base_color: [f32; 4],
    pub base_color_texture: Option<usize>,
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: [f32; 3],
    pub emissive_texture: Option<usize>,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            class: MaterialClass::Standard,
            receives_environment: true,
            base_color: [1.0; 4],
            base_color_texture: None,
            metallic: 0.0,
            roughness: 1.0,
            emissive: [0.0; 3],
            emissive_texture: None,
        }
    }
}

impl MaterialDesc {
    pub fn from_gltf(material: &gltf::Material) -> Self {
        let pbr = material.pbr_metallic_roughness();
        let class = if material.unlit() {
            MaterialClass::Unlit
        } else {
            MaterialClass::Standard
        };
        Self {
            class,
            receives_environment: class.is_lit(),
            base_color: pbr.base_color_factor(),
            base_color_texture: pbr
                .base_color_texture()
                .map(|info| info.texture().source().index()),
            metallic: pbr.metallic_factor(),
            roughness: pbr.roughness_factor(),
            emissive: material.emissive_factor(),
            emissive_texture: material
                .emissive_texture()
                .map(|info| info.texture().source().index()),
        }
    }

    /// True when environment-intensity changes should reach this material.
    pub fn follows_env_intensity(&self) -> bool {
        self.class == MaterialClass::Standard && self.receives_environment
    }
}

/// Material block as laid out in the mesh shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    pub emissive: [f32; 3],
    pub env_intensity: f32,
    pub metallic: f32,
    pub roughness: f32,
    /// 0 = standard, 1 = unlit.
    pub unlit: f32,
    pub _pad: f32,
}

impl MaterialUniform {
    pub fn new(desc: &MaterialDesc, env_intensity: f32) -> Self {
        Self {
            base_color: desc.base_color,
            emissive: desc.emissive,
            env_intensity: if desc.receives_environment {
                env_intensity
            } else {
                0.0
            },
            metallic: desc.metallic,
            roughness: desc.roughness,
            unlit: if desc.class == MaterialClass::Unlit {
                1.0
            } else {
                0.0
            },
            _pad: 0.0,
        }
    }
}

/// A material resident on the GPU.
#[derive(Debug)]
pub struct Material {
    pub desc: MaterialDesc,
    uniform: MaterialUniform,
    buffer: wgpu::Buffer,
    pub(crate) bind_group: wgpu::BindGroup,
}

impl Material {
    /// Bind layout: uniform, sampler, base colour texture, emissive texture.
    pub fn bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        let texture = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                texture(2),
                texture(3),
            ],
        })
    }

    pub fn new(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        desc: MaterialDesc,
        base_color: &Texture,
        emissive: &Texture,
        env_intensity: f32,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let uniform = MaterialUniform::new(&desc, env_intensity);
        let buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material Uniforms"),
                contents: bytemuck::bytes_of(&uniform),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&base_color.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&base_color.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&emissive.view),
                },
            ],
        });

        Self {
            desc,
            uniform,
            buffer,
            bind_group,
        }
    }

    pub fn env_intensity(&self) -> f32 {
        self.uniform.env_intensity
    }

    pub fn set_env_intensity(&mut self, gpu: &GpuContext, value: f32) {
        self.uniform.env_intensity = value;
        gpu.queue
            .write_buffer(&self.buffer, 0, bytemuck::bytes_of(&self.uniform));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 48);
    }

    #[test]
    fn only_lit_environment_receivers_follow_intensity() {
        let standard = MaterialDesc::default();
        assert!(standard.follows_env_intensity());

        let opted_out = MaterialDesc {
            receives_environment: false,
            ..MaterialDesc::default()
        };
        assert!(!opted_out.follows_env_intensity());

        let unlit = MaterialDesc {
            class: MaterialClass::Unlit,
            ..MaterialDesc::default()
        };
        assert!(!unlit.follows_env_intensity());
    }

    #[test]
    fn only_standard_is_lit() {
        assert!(MaterialClass::Standard.is_lit());
        assert!(!MaterialClass::Unlit.is_lit());
        assert!(!MaterialClass::Overlay.is_lit());
    }

    #[test]
    fn non_receivers_get_zero_env_light() {
        let desc = MaterialDesc {
            receives_environment: false,
            ..MaterialDesc::default()
        };
        assert_eq!(MaterialUniform::new(&desc, 4.0).env_intensity, 0.0);
        assert_eq!(
            MaterialUniform::new(&MaterialDesc::default(), 4.0).env_intensity,
            4.0
        );
    }
}
