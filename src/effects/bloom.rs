use serde::Deserialize;

use crate::gpu::GpuContext;
use crate::post_process::ShaderPass;
use crate::render_graph::{HDR_FORMAT, RenderContext, RenderNode, RenderTarget};
use crate::ui::{ControlPanel, Folder, Tweak};

const MIP_COUNT: usize = 5;
const KERNEL_SIZES: [u32; MIP_COUNT] = [3, 5, 7, 9, 11];
const BLOOM_FACTORS: [f32; MIP_COUNT] = [1.0, 0.8, 0.6, 0.4, 0.2];
const SMOOTH_WIDTH: f32 = 0.01;

/// Unreal-style bloom: bright-pass, a blurred mip chain, weighted sum added
/// back onto the frame.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BloomParams {
    pub enabled: bool,
    pub strength: f32,
    pub radius: f32,
    pub threshold: f32,
}

impl Default for BloomParams {
    fn default() -> Self {
        Self {
            enabled: false,
            strength: 1.5,
            radius: 0.4,
            threshold: 0.85,
        }
    }
}

impl Tweak for BloomParams {
    fn folder(&self) -> Folder {
        Folder::PostProcessing
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        let mut changed = panel.checkbox("unreal bloom", &mut self.enabled);
        changed |= panel.slider("unreal bloom glowStrength", &mut self.strength, 0.0..=2.0, 0.001);
        changed |= panel.slider("unreal bloom glowRadius", &mut self.radius, 0.0..=2.0, 0.001);
        changed |= panel.slider(
            "unreal bloom glowThreshold",
            &mut self.threshold,
            0.0..=1.0,
            0.001,
        );
        changed
    }
}

/// Sizes of the blur levels: half the window, then halving again.
fn level_sizes(width: u32, height: u32) -> [(u32, u32); MIP_COUNT] {
    let mut sizes = [(1, 1); MIP_COUNT];
    let (mut w, mut h) = (width as f32, height as f32);
    for size in &mut sizes {
        w = (w / 2.0).round();
        h = (h / 2.0).round();
        *size = ((w as u32).max(1), (h as u32).max(1));
    }
    sizes
}

/// Weight of blur level `factor` once `radius` shifts energy toward the
/// wider levels.
fn lerp_bloom_factor(factor: f32, radius: f32) -> f32 {
    let mirror = 1.2 - factor;
    factor + (mirror - factor) * radius
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct HighPassUniforms {
    resolution: [f32; 2],
    threshold: f32,
    smooth_width: f32,
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct BlurUniforms {
    resolution: [f32; 2],
    direction: [f32; 2],
    kernel_radius: u32,
    _pad: u32,
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CompositeUniforms {
    resolution: [f32; 2],
    strength: f32,
    _pad: f32,
    factors: [f32; 4],
    last_factor: f32,
    _pad2: [f32; 3],
}

struct BlurLevel {
    horizontal: RenderTarget,
    vertical: RenderTarget,
    horizontal_uniforms: wgpu::Buffer,
    vertical_uniforms: wgpu::Buffer,
}

pub struct BloomNode {
    pub params: BloomParams,
    high_pass: ShaderPass,
    blur: ShaderPass,
    composite: ShaderPass,
    bright: RenderTarget,
    levels: Vec<BlurLevel>,
}

impl BloomNode {
    pub fn new(gpu: &GpuContext, params: BloomParams) -> Self {
        let high_pass = ShaderPass::new(
            gpu,
            "Bloom High Pass",
            HIGH_PASS_FS,
            std::mem::size_of::<HighPassUniforms>() as u64,
            0,
            HDR_FORMAT,
        );
        let blur = ShaderPass::new(
            gpu,
            "Bloom Blur",
            BLUR_FS,
            std::mem::size_of::<BlurUniforms>() as u64,
            0,
            HDR_FORMAT,
        );
        let composite = ShaderPass::new(
            gpu,
            "Bloom Composite",
            COMPOSITE_FS,
            std::mem::size_of::<CompositeUniforms>() as u64,
            MIP_COUNT as u32,
            HDR_FORMAT,
        );
        let (bright, levels) = Self::create_targets(gpu, &blur);
        Self {
            params,
            high_pass,
            blur,
            composite,
            bright,
            levels,
        }
    }

    fn create_targets(gpu: &GpuContext, blur: &ShaderPass) -> (RenderTarget, Vec<BlurLevel>) {
        let sizes = level_sizes(gpu.width(), gpu.height());
        let (bw, bh) = sizes[0];
        let bright = RenderTarget::new(gpu, "Bloom Bright", HDR_FORMAT, bw, bh);

        let levels = sizes
            .iter()
            .zip(KERNEL_SIZES)
            .enumerate()
            .map(|(i, (&(w, h), kernel_radius))| {
                let level = BlurLevel {
                    horizontal: RenderTarget::new(
                        gpu,
                        &format!("Bloom Blur H{i}"),
                        HDR_FORMAT,
                        w,
                        h,
                    ),
                    vertical: RenderTarget::new(
                        gpu,
                        &format!("Bloom Blur V{i}"),
                        HDR_FORMAT,
                        w,
                        h,
                    ),
                    horizontal_uniforms: blur.create_uniform_buffer(gpu),
                    vertical_uniforms: blur.create_uniform_buffer(gpu),
                };
                let blur_uniforms = |direction| BlurUniforms {
                    resolution: [w as f32, h as f32],
                    direction,
                    kernel_radius,
                    _pad: 0,
                };
                gpu.queue.write_buffer(
                    &level.horizontal_uniforms,
                    0,
                    bytemuck::bytes_of(&blur_uniforms([1.0, 0.0])),
                );
                gpu.queue.write_buffer(
                    &level.vertical_uniforms,
                    0,
                    bytemuck::bytes_of(&blur_uniforms([0.0, 1.0])),
                );
                level
            })
            .collect();

        (bright, levels)
    }
}

impl Tweak for BloomNode {
    fn folder(&self) -> Folder {
        self.params.folder()
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        self.params.tweak(panel)
    }
}

impl RenderNode for BloomNode {
    fn name(&self) -> &str {
        "bloom"
    }

    fn enabled(&self) -> bool {
        self.params.enabled
    }

    fn execute(
        &self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        input: &wgpu::TextureView,
    ) {
        let p = &self.params;

        self.high_pass.write_uniforms(
            ctx.gpu,
            &HighPassUniforms {
                resolution: [self.bright.width() as f32, self.bright.height() as f32],
                threshold: p.threshold,
                smooth_width: SMOOTH_WIDTH,
            },
        );
        self.high_pass
            .render(ctx.gpu, ctx.encoder, &self.bright.view, input, &[]);

        let mut source = &self.bright.view;
        for level in &self.levels {
            self.blur.render_with(
                ctx.gpu,
                ctx.encoder,
                &level.horizontal.view,
                source,
                &[],
                &level.horizontal_uniforms,
            );
            self.blur.render_with(
                ctx.gpu,
                ctx.encoder,
                &level.vertical.view,
                &level.horizontal.view,
                &[],
                &level.vertical_uniforms,
            );
            source = &level.vertical.view;
        }

        let factors = BLOOM_FACTORS.map(|f| lerp_bloom_factor(f, p.radius));
        self.composite.write_uniforms(
            ctx.gpu,
            &CompositeUniforms {
                resolution: super::resolution(ctx.gpu),
                strength: p.strength,
                _pad: 0.0,
                factors: [factors[0], factors[1], factors[2], factors[3]],
                last_factor: factors[4],
                _pad2: [0.0; 3],
            },
        );
        let blurred: Vec<&wgpu::TextureView> =
            self.levels.iter().map(|l| &l.vertical.view).collect();
        self.composite
            .render(ctx.gpu, ctx.encoder, target, input, &blurred);
    }

    fn resize(&mut self, gpu: &GpuContext) {
        let (bright, levels) = Self::create_targets(gpu, &self.blur);
        self.bright = bright;
        self.levels = levels;
    }
}

const HIGH_PASS_FS: &str = r#"
struct Uniforms {
    resolution: vec2f,
    threshold: f32,
    smooth_width: f32,
}

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var input_texture: texture_2d<f32>;
@group(0) @binding(2) var input_sampler: sampler;

@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let texel = textureSample(input_texture, input_sampler, pos.xy / u.resolution);
    let luma = dot(texel.rgb, vec3f(0.299, 0.587, 0.114));
    let alpha = smoothstep(u.threshold, u.threshold + u.smooth_width, luma);
    return mix(vec4f(0.0), texel, alpha);
}
"#;

const BLUR_FS: &str = r#"
struct Uniforms {
    resolution: vec2f,
    direction: vec2f,
    kernel_radius: u32,
    _pad: u32,
}

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var input_texture: texture_2d<f32>;
@group(0) @binding(2) var input_sampler: sampler;

fn gaussian_pdf(x: f32, sigma: f32) -> f32 {
    return 0.39894 * exp(-0.5 * x * x / (sigma * sigma)) / sigma;
}

@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = pos.xy / u.resolution;
    let inv_size = 1.0 / u.resolution;
    let sigma = f32(u.kernel_radius);

    var weight_sum = gaussian_pdf(0.0, sigma);
    var sum = textureSampleLevel(input_texture, input_sampler, uv, 0.0).rgb * weight_sum;
    for (var i = 1u; i < u.kernel_radius; i++) {
        let x = f32(i);
        let w = gaussian_pdf(x, sigma);
        let offset = u.direction * inv_size * x;
        let a = textureSampleLevel(input_texture, input_sampler, uv + offset, 0.0).rgb;
        let b = textureSampleLevel(input_texture, input_sampler, uv - offset, 0.0).rgb;
        sum += (a + b) * w;
        weight_sum += 2.0 * w;
    }
    return vec4f(sum / weight_sum, 1.0);
}
"#;

const COMPOSITE_FS: &str = r#"
struct Uniforms {
    resolution: vec2f,
    strength: f32,
    _pad: f32,
    factors: vec4f,
    last_factor: f32,
}

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var input_texture: texture_2d<f32>;
@group(0) @binding(2) var input_sampler: sampler;
@group(0) @binding(3) var blur0: texture_2d<f32>;
@group(0) @binding(4) var blur1: texture_2d<f32>;
@group(0) @binding(5) var blur2: texture_2d<f32>;
@group(0) @binding(6) var blur3: texture_2d<f32>;
@group(0) @binding(7) var blur4: texture_2d<f32>;

@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = pos.xy / u.resolution;
    let base = textureSample(input_texture, input_sampler, uv);
    let bloom = u.factors.x * textureSample(blur0, input_sampler, uv).rgb
        + u.factors.y * textureSample(blur1, input_sampler, uv).rgb
        + u.factors.z * textureSample(blur2, input_sampler, uv).rgb
        + u.factors.w * textureSample(blur3, input_sampler, uv).rgb
        + u.last_factor * textureSample(blur4, input_sampler, uv).rgb;
    return vec4f(base.rgb + u.strength * bloom, base.a);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_halve_from_half_resolution() {
        assert_eq!(
            level_sizes(1280, 720),
            [(640, 360), (320, 180), (160, 90), (80, 45), (40, 23)]
        );
    }

    #[test]
    fn tiny_windows_keep_levels_non_empty() {
        for (w, h) in level_sizes(3, 1) {
            assert!(w >= 1 && h >= 1);
        }
    }

    #[test]
    fn zero_radius_keeps_base_factors() {
        for f in BLOOM_FACTORS {
            assert_eq!(lerp_bloom_factor(f, 0.0), f);
        }
    }

    #[test]
    fn full_radius_mirrors_factors() {
        assert!((lerp_bloom_factor(1.0, 1.0) - 0.2).abs() < 1e-6);
        assert!((lerp_bloom_factor(0.2, 1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn uniform_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<HighPassUniforms>(), 16);
        assert_eq!(std::mem::size_of::<BlurUniforms>(), 24);
        assert_eq!(std::mem::size_of::<CompositeUniforms>(), 48);
    }

    #[test]
    fn defaults() {
        let p = BloomParams::default();
        assert!(!p.enabled);
        assert_eq!((p.strength, p.radius, p.threshold), (1.5, 0.4, 0.85));
    }
}
