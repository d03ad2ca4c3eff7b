//! Scene pass: environment background plus lit, shadowed meshes into the
//! HDR target.
//!
//! # Bind groups
//!
//! | Group | Contents                                         | Owner          |
//! |-------|--------------------------------------------------|----------------|
//! | 0     | frame uniforms, shadow map, comparison sampler   | [`MeshPass`]   |
//! | 1     | environment uniforms, map, sampler               | [`Environment`]|
//! | 2     | object transform                                 | [`Scene`]      |
//! | 3     | material uniforms and textures                   | [`Material`](crate::material::Material) |
//!
//! The background pipeline uses groups 0 and 1 only.

use serde::Deserialize;

use crate::camera::Camera;
use crate::environment::{BACKGROUND_WGSL, ENVIRONMENT_WGSL, Environment};
use crate::gpu::GpuContext;
use crate::light::LightParams;
use crate::mesh::Vertex3d;
use crate::render_graph::HDR_FORMAT;
use crate::scene::Scene;
use crate::shadow_pass::ShadowPass;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Renderer settings read once at startup.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendererParams {
    /// 4× multisampling of the scene pass.
    pub msaa: bool,
}

impl Default for RendererParams {
    fn default() -> Self {
        Self { msaa: true }
    }
}

impl RendererParams {
    pub fn sample_count(&self) -> u32 {
        if self.msaa { 4 } else { 1 }
    }
}

/// Per-frame camera and light data.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    /// xyz toward the light, w = 1 when shadows are on.
    pub light_dir: [f32; 4],
    /// rgb radiance, w = one shadow-map texel in uv units.
    pub light_color: [f32; 4],
}

impl FrameUniforms {
    pub fn new(camera: &Camera, light: &LightParams, shadow_size: u32) -> Self {
        let view_proj = camera.view_projection();
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            light_view_proj: light.view_projection().to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
            light_dir: light
                .to_light()
                .extend(if light.cast_shadow { 1.0 } else { 0.0 })
                .to_array(),
            light_color: light
                .radiance()
                .extend(1.0 / shadow_size.max(1) as f32)
                .to_array(),
        }
    }
}

struct Attachments {
    color: Option<wgpu::TextureView>,
    depth: wgpu::TextureView,
    size: (u32, u32),
}

impl Attachments {
    fn new(gpu: &GpuContext, samples: u32) -> Self {
        let size = wgpu::Extent3d {
            width: gpu.width(),
            height: gpu.height(),
            depth_or_array_layers: 1,
        };
        let color = (samples > 1).then(|| {
            gpu.device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("Scene MSAA Color"),
                    size,
                    mip_level_count: 1,
                    sample_count: samples,
                    dimension: wgpu::TextureDimension::D2,
                    format: HDR_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });
        let depth = gpu
            .device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Scene Depth"),
                size,
                mip_level_count: 1,
                sample_count: samples,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            color,
            depth,
            size: (gpu.width(), gpu.height()),
        }
    }
}

/// Draws the background and every scene object.
pub struct MeshPass {
    samples: u32,
    background_pipeline: wgpu::RenderPipeline,
    mesh_pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_layout: wgpu::BindGroupLayout,
    frame_bind_group: wgpu::BindGroup,
    attachments: Attachments,
}

impl MeshPass {
    pub fn new(
        gpu: &GpuContext,
        params: &RendererParams,
        scene: &Scene,
        environment: &Environment,
        shadow: &ShadowPass,
    ) -> Self {
        let device = &gpu.device;
        let samples = params.sample_count();

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
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
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let frame_bind_group = Self::frame_bind_group(gpu, &frame_layout, &frame_buffer, shadow);

        let multisample = wgpu::MultisampleState {
            count: samples,
            ..Default::default()
        };

        let background_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Background Shader"),
            source: wgpu::ShaderSource::Wgsl(
                format!("{FRAME_WGSL}{ENVIRONMENT_WGSL}{BACKGROUND_WGSL}").into(),
            ),
        });
        let background_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Background Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, environment.layout()],
            push_constant_ranges: &[],
        });
        let background_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Background Pipeline"),
            layout: Some(&background_layout),
            vertex: wgpu::VertexState {
                module: &background_shader,
                entry_point: Some("vs_background"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &background_shader,
                entry_point: Some("fs_background"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample,
            multiview: None,
            cache: None,
        });

        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(
                format!("{FRAME_WGSL}{ENVIRONMENT_WGSL}{MESH_WGSL}").into(),
            ),
        });
        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[
                &frame_layout,
                environment.layout(),
                scene.object_layout(),
                scene.material_layout(),
            ],
            push_constant_ranges: &[],
        });
        let mesh_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&mesh_layout),
            vertex: wgpu::VertexState {
                module: &mesh_shader,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &mesh_shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample,
            multiview: None,
            cache: None,
        });

        Self {
            samples,
            background_pipeline,
            mesh_pipeline,
            frame_buffer,
            frame_layout,
            frame_bind_group,
            attachments: Attachments::new(gpu, samples),
        }
    }

    fn frame_bind_group(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
        shadow: &ShadowPass,
    ) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow.sampler),
                },
            ],
        })
    }

    /// Rebind after the shadow map was reallocated.
    pub fn rebind_shadow(&mut self, gpu: &GpuContext, shadow: &ShadowPass) {
        self.frame_bind_group =
            Self::frame_bind_group(gpu, &self.frame_layout, &self.frame_buffer, shadow);
    }

    /// Reallocate the MSAA and depth attachments after a resize.
    pub fn ensure_size(&mut self, gpu: &GpuContext) {
        if self.attachments.size != (gpu.width(), gpu.height()) {
            self.attachments = Attachments::new(gpu, self.samples);
        }
    }

    /// Render into `target`, which must be single-sampled [`HDR_FORMAT`].
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        camera: &Camera,
        light: &LightParams,
        shadow_size: u32,
        environment: &Environment,
        scene: &Scene,
    ) {
        let uniforms = FrameUniforms::new(camera, light, shadow_size);
        gpu.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&uniforms));

        let (view, resolve_target) = match &self.attachments.color {
            Some(msaa) => (msaa, Some(target)),
            None => (target, None),
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.attachments.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        pass.set_bind_group(1, &environment.bind_group, &[]);

        pass.set_pipeline(&self.background_pipeline);
        pass.draw(0..3, 0..1);

        pass.set_pipeline(&self.mesh_pipeline);
        for object in scene.objects() {
            pass.set_bind_group(2, &object.bind_group, &[]);
            pass.set_bind_group(3, &object.material.bind_group, &[]);
            object.mesh.draw(&mut pass);
        }
    }
}

const FRAME_WGSL: &str = r#"
struct Frame {
    view_proj: mat4x4f,
    inv_view_proj: mat4x4f,
    light_view_proj: mat4x4f,
    camera_pos: vec4f,
    light_dir: vec4f,
    light_color: vec4f,
}

@group(0) @binding(0) var<uniform> frame: Frame;
@group(0) @binding(1) var shadow_map: texture_depth_2d;
@group(0) @binding(2) var shadow_sampler: sampler_comparison;
"#;

const MESH_WGSL: &str = r#"
struct Object {
    model: mat4x4f,
    normal: mat4x4f,
    receive_shadow: f32,
}

struct Material {
    base_color: vec4f,
    emissive: vec3f,
    env_intensity: f32,
    metallic: f32,
    roughness: f32,
    unlit: f32,
    _pad: f32,
}

@group(2) @binding(0) var<uniform> object: Object;
@group(3) @binding(0) var<uniform> material: Material;
@group(3) @binding(1) var material_sampler: sampler;
@group(3) @binding(2) var base_color_texture: texture_2d<f32>;
@group(3) @binding(3) var emissive_texture: texture_2d<f32>;

struct VertexOutput {
    @builtin(position) position: vec4f,
    @location(0) world_pos: vec3f,
    @location(1) normal: vec3f,
    @location(2) uv: vec2f,
}

@vertex
fn vs(
    @location(0) position: vec3f,
    @location(1) normal: vec3f,
    @location(2) uv: vec2f,
) -> VertexOutput {
    let world = object.model * vec4f(position, 1.0);
    var out: VertexOutput;
    out.position = frame.view_proj * world;
    out.world_pos = world.xyz;
    out.normal = (object.normal * vec4f(normal, 0.0)).xyz;
    out.uv = uv;
    return out;
}

// 3x3 PCF
fn shadow_factor(world_pos: vec3f) -> f32 {
    if frame.light_dir.w < 0.5 || object.receive_shadow < 0.5 {
        return 1.0;
    }
    let clip = frame.light_view_proj * vec4f(world_pos, 1.0);
    let ndc = clip.xyz / clip.w;
    let uv = vec2f(ndc.x * 0.5 + 0.5, -ndc.y * 0.5 + 0.5);
    if uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0 || ndc.z > 1.0 {
        return 1.0;
    }
    let texel = frame.light_color.w;
    var lit = 0.0;
    for (var y = -1; y <= 1; y++) {
        for (var x = -1; x <= 1; x++) {
            let offset = vec2f(f32(x), f32(y)) * texel;
            lit += textureSampleCompareLevel(shadow_map, shadow_sampler, uv + offset, ndc.z);
        }
    }
    return lit / 9.0;
}

fn fresnel_schlick(cos_theta: f32, f0: vec3f) -> vec3f {
    return f0 + (1.0 - f0) * pow(1.0 - cos_theta, 5.0);
}

@fragment
fn fs(in: VertexOutput) -> @location(0) vec4f {
    let base = material.base_color * textureSample(base_color_texture, material_sampler, in.uv);
    let emissive = material.emissive * textureSample(emissive_texture, material_sampler, in.uv).rgb;

    if material.unlit > 0.5 {
        return vec4f(base.rgb + emissive, base.a);
    }

    let n = normalize(in.normal);
    let v = normalize(frame.camera_pos.xyz - in.world_pos);
    let l = normalize(frame.light_dir.xyz);
    let h = normalize(l + v);

    let roughness = clamp(material.roughness, 0.04, 1.0);
    let metallic = clamp(material.metallic, 0.0, 1.0);
    let f0 = mix(vec3f(0.04), base.rgb, metallic);

    let n_dot_l = max(dot(n, l), 0.0);
    let n_dot_v = max(dot(n, v), 1e-4);
    let n_dot_h = max(dot(n, h), 0.0);
    let h_dot_v = max(dot(h, v), 0.0);

    // GGX / Smith / Schlick
    let a = roughness * roughness;
    let a2 = a * a;
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    let d = a2 / (PI * denom * denom);
    let k = (roughness + 1.0) * (roughness + 1.0) / 8.0;
    let g = (n_dot_v / (n_dot_v * (1.0 - k) + k)) * (n_dot_l / (n_dot_l * (1.0 - k) + k));
    let f = fresnel_schlick(h_dot_v, f0);
    let specular = d * g * f / max(4.0 * n_dot_v * n_dot_l, 1e-4);
    let kd = (vec3f(1.0) - f) * (1.0 - metallic);

    let direct = (kd * base.rgb / PI + specular)
        * frame.light_color.rgb * n_dot_l * shadow_factor(in.world_pos);

    let r = reflect(-v, n);
    let env_f = fresnel_schlick(n_dot_v, f0);
    let env_specular = sample_env(r, roughness * env.max_mip) * env_f;
    let env_diffuse = sample_env(n, max(env.max_mip - 1.0, 0.0)) * base.rgb * (1.0 - metallic);
    let ambient = (env_diffuse + env_specular) * material.env_intensity;

    return vec4f(direct + ambient + emissive, base.a);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_uniforms_match_wgsl_size() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 3 * 64 + 3 * 16);
    }

    #[test]
    fn frame_uniforms_flag_shadows() {
        let camera = Camera::default();
        let mut light = LightParams::default();
        let on = FrameUniforms::new(&camera, &light, 1024);
        assert_eq!(on.light_dir[3], 1.0);
        assert_eq!(on.light_color[3], 1.0 / 1024.0);

        light.cast_shadow = false;
        assert_eq!(FrameUniforms::new(&camera, &light, 1024).light_dir[3], 0.0);
    }

    #[test]
    fn msaa_is_four_samples_or_none() {
        assert_eq!(RendererParams::default().sample_count(), 4);
        assert_eq!(RendererParams { msaa: false }.sample_count(), 1);
    }
}
