use serde::Deserialize;

use crate::gpu::GpuContext;
use crate::post_process::ShaderPass;
use crate::render_graph::{HDR_FORMAT, RenderContext, RenderNode};
use crate::ui::{ControlPanel, Folder, Tweak};

/// Halftone dots over a greyscale version of the frame.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DotScreenParams {
    pub enabled: bool,
    pub center: [f32; 2],
    pub angle: f32,
    pub scale: f32,
    /// Size in pixels of the virtual texture the pattern is laid over.
    pub pattern_size: [f32; 2],
}

impl Default for DotScreenParams {
    fn default() -> Self {
        Self {
            enabled: false,
            center: [0.5, 0.5],
            angle: 1.57,
            scale: 1.0,
            pattern_size: [256.0, 256.0],
        }
    }
}

impl Tweak for DotScreenParams {
    fn folder(&self) -> Folder {
        Folder::PostProcessing
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        panel.checkbox("dotScreenPass", &mut self.enabled)
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct DotScreenUniforms {
    resolution: [f32; 2],
    center: [f32; 2],
    pattern_size: [f32; 2],
    angle: f32,
    scale: f32,
}

pub struct DotScreenNode {
    pub params: DotScreenParams,
    pass: ShaderPass,
}

impl DotScreenNode {
    pub fn new(gpu: &GpuContext, params: DotScreenParams) -> Self {
        let pass = ShaderPass::new(
            gpu,
            "Dot Screen",
            DOT_SCREEN_FS,
            std::mem::size_of::<DotScreenUniforms>() as u64,
            0,
            HDR_FORMAT,
        );
        Self { params, pass }
    }
}

impl Tweak for DotScreenNode {
    fn folder(&self) -> Folder {
        self.params.folder()
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        self.params.tweak(panel)
    }
}

impl RenderNode for DotScreenNode {
    fn name(&self) -> &str {
        "dot screen"
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
        self.pass.write_uniforms(
            ctx.gpu,
            &DotScreenUniforms {
                resolution: super::resolution(ctx.gpu),
                center: p.center,
                pattern_size: p.pattern_size,
                angle: p.angle,
                scale: p.scale,
            },
        );
        self.pass.render(ctx.gpu, ctx.encoder, target, input, &[]);
    }
}

const DOT_SCREEN_FS: &str = r#"
struct Uniforms {
    resolution: vec2f,
    center: vec2f,
    pattern_size: vec2f,
    angle: f32,
    scale: f32,
}

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var input_texture: texture_2d<f32>;
@group(0) @binding(2) var input_sampler: sampler;

fn pattern(uv: vec2f) -> f32 {
    let s = sin(u.angle);
    let c = cos(u.angle);
    let tex = uv * u.pattern_size - u.center;
    let point = vec2f(c * tex.x - s * tex.y, s * tex.x + c * tex.y) * u.scale;
    return sin(point.x) * sin(point.y) * 4.0;
}

@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = pos.xy / u.resolution;
    let color = textureSample(input_texture, input_sampler, uv);
    let average = (color.r + color.g + color.b) / 3.0;
    return vec4f(vec3f(average * 10.0 - 5.0 + pattern(uv)), color.a);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_pack_into_two_vec4s() {
        assert_eq!(std::mem::size_of::<DotScreenUniforms>(), 32);
    }

    #[test]
    fn pattern_is_centred_and_rotated_a_quarter_turn() {
        let p = DotScreenParams::default();
        assert_eq!(p.center, [0.5, 0.5]);
        assert!((p.angle - std::f32::consts::FRAC_PI_2).abs() < 0.001);
        assert!(!p.enabled);
    }
}
