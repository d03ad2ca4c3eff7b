use serde::Deserialize;

use crate::gpu::GpuContext;
use crate::post_process::ShaderPass;
use crate::render_graph::{HDR_FORMAT, RenderContext, RenderNode};
use crate::ui::{ControlPanel, Folder, Tweak};

/// Adds a constant colour to every pixel.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TintParams {
    pub enabled: bool,
    pub tint: [f32; 3],
}

impl Default for TintParams {
    fn default() -> Self {
        Self {
            enabled: false,
            tint: [0.2, 0.0, 0.0],
        }
    }
}

impl Tweak for TintParams {
    fn folder(&self) -> Folder {
        Folder::PostProcessing
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        let mut changed = panel.checkbox("tintPass (our custom pass)", &mut self.enabled);
        let [r, g, b] = &mut self.tint;
        changed |= panel.slider("uTint red", r, -1.0..=1.0, 0.001);
        changed |= panel.slider("uTint green", g, -1.0..=1.0, 0.001);
        changed |= panel.slider("uTint blue", b, -1.0..=1.0, 0.001);
        changed
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct TintUniforms {
    tint: [f32; 3],
    _pad: f32,
    resolution: [f32; 2],
    _pad2: [f32; 2],
}

pub struct TintNode {
    pub params: TintParams,
    pass: ShaderPass,
}

impl TintNode {
    pub fn new(gpu: &GpuContext, params: TintParams) -> Self {
        let pass = ShaderPass::new(
            gpu,
            "Tint",
            TINT_FS,
            std::mem::size_of::<TintUniforms>() as u64,
            0,
            HDR_FORMAT,
        );
        Self { params, pass }
    }
}

impl Tweak for TintNode {
    fn folder(&self) -> Folder {
        self.params.folder()
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        self.params.tweak(panel)
    }
}

impl RenderNode for TintNode {
    fn name(&self) -> &str {
        "tint"
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
        self.pass.write_uniforms(
            ctx.gpu,
            &TintUniforms {
                tint: self.params.tint,
                _pad: 0.0,
                resolution: super::resolution(ctx.gpu),
                _pad2: [0.0; 2],
            },
        );
        self.pass.render(ctx.gpu, ctx.encoder, target, input, &[]);
    }
}

const TINT_FS: &str = r#"
struct Uniforms {
    tint: vec3f,
    resolution: vec2f,
}

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var input_texture: texture_2d<f32>;
@group(0) @binding(2) var input_sampler: sampler;

@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let color = textureSample(input_texture, input_sampler, pos.xy / u.resolution);
    return vec4f(color.rgb + u.tint, color.a);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_layout_matches_wgsl_alignment() {
        // vec3f at 0, vec2f at 16, struct rounded to 32
        assert_eq!(std::mem::size_of::<TintUniforms>(), 32);
    }

    #[test]
    fn default_tint_is_a_little_red() {
        let p = TintParams::default();
        assert_eq!(p.tint, [0.2, 0.0, 0.0]);
        assert!(!p.enabled);
    }
}
