use serde::Deserialize;

use crate::gpu::GpuContext;
use crate::post_process::ShaderPass;
use crate::render_graph::{RenderContext, RenderNode};
use crate::ui::{ControlPanel, Folder, Tweak};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GammaParams {
    pub enabled: bool,
}

impl Default for GammaParams {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct GammaUniforms {
    resolution: [f32; 2],
    encode: u32,
    _pad: u32,
}

/// Last node of the chain; writes the surface.
///
/// Encodes linear values to sRGB unless the surface format already does it.
/// Disabled, it still copies the image to the screen.
pub struct GammaNode {
    pub params: GammaParams,
    pass: ShaderPass,
    surface_is_srgb: bool,
}

impl GammaNode {
    pub fn new(gpu: &GpuContext, params: GammaParams) -> Self {
        let pass = ShaderPass::new(
            gpu,
            "Gamma Correction",
            GAMMA_FS,
            std::mem::size_of::<GammaUniforms>() as u64,
            0,
            gpu.config.format,
        );
        Self {
            params,
            pass,
            surface_is_srgb: gpu.surface_is_srgb(),
        }
    }

    fn encodes(&self) -> bool {
        self.params.enabled && !self.surface_is_srgb
    }
}

impl Tweak for GammaNode {
    fn folder(&self) -> Folder {
        Folder::PostProcessing
    }

    fn tweak(&mut self, _panel: &mut ControlPanel) -> bool {
        false
    }
}

impl RenderNode for GammaNode {
    fn name(&self) -> &str {
        "gamma"
    }

    fn execute(
        &self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        input: &wgpu::TextureView,
    ) {
        self.pass.write_uniforms(
            ctx.gpu,
            &GammaUniforms {
                resolution: super::resolution(ctx.gpu),
                encode: self.encodes() as u32,
                _pad: 0,
            },
        );
        self.pass.render(ctx.gpu, ctx.encoder, target, input, &[]);
    }
}

const GAMMA_FS: &str = r#"
struct Uniforms {
    resolution: vec2f,
    encode: u32,
    _pad: u32,
}

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var input_texture: texture_2d<f32>;
@group(0) @binding(2) var input_sampler: sampler;

fn linear_to_srgb(c: vec3f) -> vec3f {
    let low = c * 12.92;
    let high = 1.055 * pow(max(c, vec3f(0.0)), vec3f(1.0 / 2.4)) - 0.055;
    return select(high, low, c <= vec3f(0.0031308));
}

@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let color = textureSample(input_texture, input_sampler, pos.xy / u.resolution);
    if u.encode == 0u {
        return color;
    }
    return vec4f(linear_to_srgb(color.rgb), color.a);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_by_default() {
        assert!(GammaParams::default().enabled);
    }

    #[test]
    fn uniforms_fit_one_vec4() {
        assert_eq!(std::mem::size_of::<GammaUniforms>(), 16);
    }
}
