use serde::Deserialize;

use crate::gpu::GpuContext;
use crate::post_process::ShaderPass;
use crate::render_graph::{HDR_FORMAT, RenderContext, RenderNode};
use crate::ui::{ControlPanel, Folder, Tweak};

/// Pulls the red and blue channels apart along `angle`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RgbShiftParams {
    pub enabled: bool,
    /// Offset in uv units.
    pub amount: f32,
    /// Radians.
    pub angle: f32,
}

impl Default for RgbShiftParams {
    fn default() -> Self {
        Self {
            enabled: false,
            amount: 0.005,
            angle: 0.0,
        }
    }
}

impl RgbShiftParams {
    fn offset(&self) -> [f32; 2] {
        [
            self.amount * self.angle.cos(),
            self.amount * self.angle.sin(),
        ]
    }
}

impl Tweak for RgbShiftParams {
    fn folder(&self) -> Folder {
        Folder::PostProcessing
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        panel.checkbox("rgbShiftPass", &mut self.enabled)
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct RgbShiftUniforms {
    resolution: [f32; 2],
    offset: [f32; 2],
}

pub struct RgbShiftNode {
    pub params: RgbShiftParams,
    pass: ShaderPass,
}

impl RgbShiftNode {
    pub fn new(gpu: &GpuContext, params: RgbShiftParams) -> Self {
        let pass = ShaderPass::new(
            gpu,
            "RGB Shift",
            RGB_SHIFT_FS,
            std::mem::size_of::<RgbShiftUniforms>() as u64,
            0,
            HDR_FORMAT,
        );
        Self { params, pass }
    }
}

impl Tweak for RgbShiftNode {
    fn folder(&self) -> Folder {
        self.params.folder()
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        self.params.tweak(panel)
    }
}

impl RenderNode for RgbShiftNode {
    fn name(&self) -> &str {
        "rgb shift"
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
            &RgbShiftUniforms {
                resolution: super::resolution(ctx.gpu),
                offset: self.params.offset(),
            },
        );
        self.pass.render(ctx.gpu, ctx.encoder, target, input, &[]);
    }
}

const RGB_SHIFT_FS: &str = r#"
struct Uniforms {
    resolution: vec2f,
    offset: vec2f,
}

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var input_texture: texture_2d<f32>;
@group(0) @binding(2) var input_sampler: sampler;

@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = pos.xy / u.resolution;
    let r = textureSample(input_texture, input_sampler, uv + u.offset);
    let ga = textureSample(input_texture, input_sampler, uv);
    let b = textureSample(input_texture, input_sampler, uv - u.offset);
    return vec4f(r.r, ga.g, b.b, ga.a);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_angle_shifts_horizontally() {
        let p = RgbShiftParams::default();
        assert_eq!(p.offset(), [0.005, 0.0]);
    }

    #[test]
    fn offset_length_is_amount() {
        let p = RgbShiftParams {
            amount: 0.02,
            angle: 1.1,
            ..Default::default()
        };
        let [x, y] = p.offset();
        assert!(((x * x + y * y).sqrt() - 0.02).abs() < 1e-6);
    }
}
