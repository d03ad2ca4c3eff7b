//! Equirectangular HDR environment: background and image-based lighting.
//!
//! The HDR image is decoded and filtered into a mip chain on a worker
//! thread ([`HdrEnvironment::decode`]). The render thread only uploads the
//! prepared half-float levels. Rough reflections and background blur both
//! read coarser mips.

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::gpu::GpuContext;
use crate::texture::{MipLevel, Texture};
use crate::ui::{ControlPanel, Folder, Tweak};

/// Environment parameters exposed on the panel.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnvironmentParams {
    /// Applied to every lit material that receives the environment.
    pub env_map_intensity: f32,
    pub background_blurriness: f32,
    pub background_intensity: f32,
}

impl Default for EnvironmentParams {
    fn default() -> Self {
        Self {
            env_map_intensity: 1.0,
            background_blurriness: 0.0,
            background_intensity: 1.0,
        }
    }
}

impl Tweak for EnvironmentParams {
    fn folder(&self) -> Folder {
        Folder::RealisticRendering
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        let mut changed = panel.slider(
            "backgroundBluriness",
            &mut self.background_blurriness,
            0.0..=1.0,
            0.01,
        );
        changed |= panel.slider(
            "backgroundIntensity",
            &mut self.background_intensity,
            1.0..=10.0,
            0.1,
        );
        changed |= panel.slider(
            "envMapIntensity for every material of model",
            &mut self.env_map_intensity,
            1.0..=10.0,
            0.001,
        );
        changed
    }
}

/// One level of the prepared chain, as `f16` bit patterns in RGBA order.
#[derive(Clone, Debug, PartialEq)]
pub struct HdrLevel {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<u16>,
}

/// A decoded environment map, box-filtered down to 1×1.
#[derive(Clone, Debug)]
pub struct HdrEnvironment {
    pub levels: Vec<HdrLevel>,
}

impl HdrEnvironment {
    pub fn decode(path: &Path) -> Result<Self> {
        let image = image::open(path)?.to_rgba32f();
        let (width, height) = image.dimensions();
        Ok(Self::from_rgba32f(width, height, image.into_raw()))
    }

    /// Build the chain from linear RGBA floats.
    pub fn from_rgba32f(width: u32, height: u32, rgba: Vec<f32>) -> Self {
        let mut levels = Vec::new();
        let (mut w, mut h, mut current) = (width.max(1), height.max(1), rgba);

        loop {
            levels.push(HdrLevel {
                width: w,
                height: h,
                texels: current
                    .iter()
                    .map(|&v| half::f16::from_f32(v).to_bits())
                    .collect(),
            });
            if w == 1 && h == 1 {
                break;
            }
            let (nw, nh) = ((w / 2).max(1), (h / 2).max(1));
            current = downsample(&current, w, h, nw, nh);
            (w, h) = (nw, nh);
        }

        Self { levels }
    }

    pub fn width(&self) -> u32 {
        self.levels.first().map_or(0, |l| l.width)
    }

    pub fn height(&self) -> u32 {
        self.levels.first().map_or(0, |l| l.height)
    }
}

fn downsample(src: &[f32], w: u32, h: u32, nw: u32, nh: u32) -> Vec<f32> {
    let (w, h) = (w as usize, h as usize);
    let mut out = Vec::with_capacity(nw as usize * nh as usize * 4);
    for y in 0..nh as usize {
        for x in 0..nw as usize {
            let xs = [(2 * x).min(w - 1), (2 * x + 1).min(w - 1)];
            let ys = [(2 * y).min(h - 1), (2 * y + 1).min(h - 1)];
            for c in 0..4 {
                let mut sum = 0.0;
                for &sy in &ys {
                    for &sx in &xs {
                        sum += src.get((sy * w + sx) * 4 + c).copied().unwrap_or(0.0);
                    }
                }
                out.push(sum * 0.25);
            }
        }
    }
    out
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct EnvironmentUniform {
    background_intensity: f32,
    background_blurriness: f32,
    max_mip: f32,
    _pad: f32,
}

/// The environment map on the GPU, bound as group 1 of the scene pass.
pub struct Environment {
    pub params: EnvironmentParams,
    texture: Texture,
    uniform_buffer: wgpu::Buffer,
    layout: wgpu::BindGroupLayout,
    pub(crate) bind_group: wgpu::BindGroup,
    loaded: bool,
}

impl Environment {
    /// A black 1×1 stand-in until the real map arrives.
    pub fn new(gpu: &GpuContext, params: EnvironmentParams) -> Self {
        let texture = upload(
            gpu,
            &HdrEnvironment {
                levels: vec![HdrLevel {
                    width: 1,
                    height: 1,
                    texels: vec![0, 0, 0, half::f16::ONE.to_bits()],
                }],
            },
        );

        let uniform_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Environment Uniforms"),
            size: std::mem::size_of::<EnvironmentUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Environment Bind Group Layout"),
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
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let bind_group = bind(gpu, &layout, &uniform_buffer, &texture);
        let env = Self {
            params,
            texture,
            uniform_buffer,
            layout,
            bind_group,
            loaded: false,
        };
        env.update(gpu);
        env
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Replace the stand-in with a decoded map.
    pub fn set_map(&mut self, gpu: &GpuContext, map: &HdrEnvironment) {
        self.texture = upload(gpu, map);
        self.bind_group = bind(gpu, &self.layout, &self.uniform_buffer, &self.texture);
        self.loaded = true;
        self.update(gpu);
        log::debug!(
            "environment uploaded: {}x{}, {} mips",
            map.width(),
            map.height(),
            map.levels.len()
        );
    }

    /// Write the current params to the GPU.
    pub fn update(&self, gpu: &GpuContext) {
        let uniform = EnvironmentUniform {
            background_intensity: self.params.background_intensity,
            background_blurriness: self.params.background_blurriness.clamp(0.0, 1.0),
            max_mip: (self.texture.mip_count().max(1) - 1) as f32,
            _pad: 0.0,
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
    }
}

impl Tweak for Environment {
    fn folder(&self) -> Folder {
        self.params.folder()
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        self.params.tweak(panel)
    }
}

fn upload(gpu: &GpuContext, map: &HdrEnvironment) -> Texture {
    let levels: Vec<MipLevel> = map
        .levels
        .iter()
        .map(|l| MipLevel {
            width: l.width,
            height: l.height,
            bytes: bytemuck::cast_slice(&l.texels),
        })
        .collect();
    Texture::from_levels(
        gpu,
        &levels,
        wgpu::TextureFormat::Rgba16Float,
        8,
        wgpu::AddressMode::Repeat,
        "Environment Map",
    )
}

fn bind(
    gpu: &GpuContext,
    layout: &wgpu::BindGroupLayout,
    uniforms: &wgpu::Buffer,
    texture: &Texture,
) -> wgpu::BindGroup {
    gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Environment Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            },
        ],
    })
}

/// WGSL shared by the background and mesh shaders: the environment group
/// and equirectangular lookup.
pub(crate) const ENVIRONMENT_WGSL: &str = r#"
struct Environment {
    background_intensity: f32,
    background_blurriness: f32,
    max_mip: f32,
    _pad: f32,
}

@group(1) @binding(0) var<uniform> env: Environment;
@group(1) @binding(1) var env_texture: texture_2d<f32>;
@group(1) @binding(2) var env_sampler: sampler;

const PI: f32 = 3.14159265359;

fn equirect_uv(dir: vec3f) -> vec2f {
    let d = normalize(dir);
    let u = atan2(d.z, d.x) / (2.0 * PI) + 0.5;
    let v = 0.5 - asin(clamp(d.y, -1.0, 1.0)) / PI;
    return vec2f(u, v);
}

fn sample_env(dir: vec3f, lod: f32) -> vec3f {
    return textureSampleLevel(env_texture, env_sampler, equirect_uv(dir), lod).rgb;
}
"#;

/// Full-screen background. Needs the frame group (0) for the inverse
/// view-projection.
pub(crate) const BACKGROUND_WGSL: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4f,
    @location(0) ndc: vec2f,
}

@vertex
fn vs_background(@builtin(vertex_index) vi: u32) -> VertexOutput {
    let uv = vec2f(f32((vi << 1u) & 2u), f32(vi & 2u));
    let ndc = uv * 2.0 - 1.0;
    var out: VertexOutput;
    out.position = vec4f(ndc, 1.0, 1.0);
    out.ndc = ndc;
    return out;
}

@fragment
fn fs_background(in: VertexOutput) -> @location(0) vec4f {
    let far = frame.inv_view_proj * vec4f(in.ndc, 1.0, 1.0);
    let dir = far.xyz / far.w - frame.camera_pos.xyz;
    let lod = env.background_blurriness * env.max_mip;
    return vec4f(sample_env(dir, lod) * env.background_intensity, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_reaches_one_texel() {
        let env = HdrEnvironment::from_rgba32f(8, 4, vec![1.0; 8 * 4 * 4]);
        let sizes: Vec<_> = env.levels.iter().map(|l| (l.width, l.height)).collect();
        assert_eq!(sizes, vec![(8, 4), (4, 2), (2, 1), (1, 1)]);
        for level in &env.levels {
            assert_eq!(level.texels.len(), (level.width * level.height * 4) as usize);
        }
    }

    #[test]
    fn box_filter_averages_neighbours() {
        // 2x1: one bright texel, one dark.
        let rgba = vec![4.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let env = HdrEnvironment::from_rgba32f(2, 1, rgba);
        let last = &env.levels[1];
        assert_eq!((last.width, last.height), (1, 1));
        assert_eq!(half::f16::from_bits(last.texels[0]).to_f32(), 2.0);
        assert_eq!(half::f16::from_bits(last.texels[3]).to_f32(), 1.0);
    }

    #[test]
    fn values_above_one_survive() {
        let env = HdrEnvironment::from_rgba32f(1, 1, vec![12.5, 0.0, 0.0, 1.0]);
        assert_eq!(half::f16::from_bits(env.levels[0].texels[0]).to_f32(), 12.5);
    }

    #[test]
    fn defaults_match_the_scene() {
        let p = EnvironmentParams::default();
        assert_eq!(
            (p.env_map_intensity, p.background_blurriness, p.background_intensity),
            (1.0, 0.0, 1.0)
        );
    }
}
