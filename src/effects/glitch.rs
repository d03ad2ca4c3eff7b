use serde::Deserialize;

use crate::gpu::GpuContext;
use crate::post_process::ShaderPass;
use crate::render_graph::{HDR_FORMAT, RenderContext, RenderNode};
use crate::ui::{ControlPanel, Folder, Tweak};

/// Frames per glitch cycle at the nominal frame rate.
const CYCLE_FRAMES: u64 = 180;
const FRAME_RATE: f32 = 60.0;

/// Digital glitch: short strong bursts, a tail of weak ones, then quiet.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GlitchParams {
    pub enabled: bool,
    /// Glitch every frame instead of in bursts.
    pub go_wild: bool,
}

impl Tweak for GlitchParams {
    fn folder(&self) -> Folder {
        Folder::PostProcessing
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        panel.checkbox("glitchPass", &mut self.enabled)
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct GlitchUniforms {
    resolution: [f32; 2],
    amount: f32,
    angle: f32,
    seed: f32,
    seed_x: f32,
    seed_y: f32,
    distortion_x: f32,
    distortion_y: f32,
    col_s: f32,
    bypass: u32,
    _pad: f32,
}

/// Integer hash mapped into `[0, 1)`.
fn random(n: u64) -> f32 {
    let mut x = n.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    x ^= x >> 31;
    x = x.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x ^= x >> 29;
    (x >> 40) as f32 / (1u64 << 24) as f32
}

fn random_range(n: u64, min: f32, max: f32) -> f32 {
    min + random(n) * (max - min)
}

/// Glitch state for animation frame `frame`.
///
/// Each cycle opens with a strong burst on its first frame, follows with a
/// fifth of a cycle of weak glitches, then bypasses until the next cycle.
fn glitch_frame(frame: u64, go_wild: bool) -> GlitchUniforms {
    let phase = frame % CYCLE_FRAMES;
    let r = |salt: u64| random(frame.wrapping_mul(16).wrapping_add(salt));
    let signed = |salt: u64| random_range(frame.wrapping_mul(16).wrapping_add(salt), -1.0, 1.0);

    if phase == 0 || go_wild {
        GlitchUniforms {
            amount: r(1) / 30.0,
            angle: random_range(frame * 16 + 2, -std::f32::consts::PI, std::f32::consts::PI),
            seed: r(3),
            seed_x: signed(4),
            seed_y: signed(5),
            distortion_x: r(6),
            distortion_y: r(7),
            col_s: 0.05,
            ..Default::default()
        }
    } else if phase < CYCLE_FRAMES / 5 {
        GlitchUniforms {
            amount: r(1) / 90.0,
            angle: random_range(frame * 16 + 2, -std::f32::consts::PI, std::f32::consts::PI),
            distortion_x: r(6),
            distortion_y: r(7),
            seed_x: random_range(frame * 16 + 4, -0.3, 0.3),
            seed_y: random_range(frame * 16 + 5, -0.3, 0.3),
            ..Default::default()
        }
    } else {
        GlitchUniforms {
            bypass: 1,
            ..Default::default()
        }
    }
}

pub struct GlitchNode {
    pub params: GlitchParams,
    pass: ShaderPass,
}

impl GlitchNode {
    pub fn new(gpu: &GpuContext, params: GlitchParams) -> Self {
        let pass = ShaderPass::new(
            gpu,
            "Glitch",
            GLITCH_FS,
            std::mem::size_of::<GlitchUniforms>() as u64,
            0,
            HDR_FORMAT,
        );
        Self { params, pass }
    }
}

impl Tweak for GlitchNode {
    fn folder(&self) -> Folder {
        self.params.folder()
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        self.params.tweak(panel)
    }
}

impl RenderNode for GlitchNode {
    fn name(&self) -> &str {
        "glitch"
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
        let frame = (ctx.time.max(0.0) * FRAME_RATE) as u64;
        let uniforms = GlitchUniforms {
            resolution: super::resolution(ctx.gpu),
            ..glitch_frame(frame, self.params.go_wild)
        };
        self.pass.write_uniforms(ctx.gpu, &uniforms);
        self.pass.render(ctx.gpu, ctx.encoder, target, input, &[]);
    }
}

const GLITCH_FS: &str = r#"
struct Uniforms {
    resolution: vec2f,
    amount: f32,
    angle: f32,
    seed: f32,
    seed_x: f32,
    seed_y: f32,
    distortion_x: f32,
    distortion_y: f32,
    col_s: f32,
    bypass: u32,
    _pad: f32,
}

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var input_texture: texture_2d<f32>;
@group(0) @binding(2) var input_sampler: sampler;

fn rand(co: vec2f) -> f32 {
    return fract(sin(dot(co, vec2f(12.9898, 78.233))) * 43758.5453);
}

// Blocky noise standing in for a displacement texture.
fn displacement(p: vec2f) -> vec2f {
    let cell = floor(fract(p) * 64.0);
    return vec2f(rand(cell), rand(cell + 17.0));
}

@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = pos.xy / u.resolution;
    let passthrough = textureSample(input_texture, input_sampler, uv);
    if u.bypass != 0u {
        return passthrough;
    }

    var p = uv;
    let xs = floor(pos.x / 0.5);
    let ys = floor(pos.y / 0.5);
    let normal = displacement(p * u.seed * u.seed);

    if p.y < u.distortion_x + u.col_s && p.y > u.distortion_x - u.col_s * u.seed {
        if u.seed_x > 0.0 {
            p.y = 1.0 - (p.y + u.distortion_y);
        } else {
            p.y = u.distortion_y;
        }
    }
    if p.x < u.distortion_y + u.col_s && p.x > u.distortion_y - u.col_s * u.seed {
        if u.seed_y > 0.0 {
            p.x = u.distortion_x;
        } else {
            p.x = 1.0 - (p.x + u.distortion_x);
        }
    }
    p.x += normal.x * u.seed_x * (u.seed / 5.0);
    p.y += normal.y * u.seed_y * (u.seed / 5.0);

    let offset = u.amount * vec2f(cos(u.angle), sin(u.angle));
    let cr = textureSample(input_texture, input_sampler, p + offset);
    let cga = textureSample(input_texture, input_sampler, p);
    let cb = textureSample(input_texture, input_sampler, p - offset);
    let snow = 200.0 * u.amount * vec4f(rand(vec2f(xs * u.seed, ys * u.seed * 50.0)) * 0.2);
    return vec4f(cr.r, cga.g, cb.b, cga.a) + snow;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_are_three_vec4s() {
        assert_eq!(std::mem::size_of::<GlitchUniforms>(), 48);
    }

    #[test]
    fn random_stays_in_unit_interval() {
        for n in 0..10_000 {
            let r = random(n);
            assert!((0.0..1.0).contains(&r), "random({n}) = {r}");
        }
    }

    #[test]
    fn cycles_open_with_a_strong_burst() {
        let g = glitch_frame(CYCLE_FRAMES * 3, false);
        assert_eq!(g.bypass, 0);
        assert_eq!(g.col_s, 0.05);
    }

    #[test]
    fn weak_tail_then_quiet() {
        let weak = glitch_frame(CYCLE_FRAMES + 1, false);
        assert_eq!(weak.bypass, 0);
        assert_eq!(weak.col_s, 0.0);
        assert!(weak.amount < 1.0 / 90.0);

        let quiet = glitch_frame(CYCLE_FRAMES + CYCLE_FRAMES / 2, false);
        assert_eq!(quiet.bypass, 1);
    }

    #[test]
    fn go_wild_never_bypasses() {
        for frame in 0..CYCLE_FRAMES {
            assert_eq!(glitch_frame(frame, true).bypass, 0);
        }
    }
}
